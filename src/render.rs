//! Unit-aware display strings derived from the normalized model
//!
//! Everything here is pure: the same record, place and context always produce
//! the same strings, so toggling units is a re-render of held data.

use std::fmt;

use chrono::Locale;

use crate::data::{
    round_half_up, Astro, DailyForecast, DualUnit, NormalizedWeather, Place, Temperature,
    UnitSystem, Visibility, Wind,
};

/// Shown wherever a value is missing
pub const PLACEHOLDER: &str = "—";

/// Days shown in the forecast strip (today is the current block)
pub const FORECAST_DAYS_SHOWN: usize = 6;

/// Inputs that change how a record is displayed
#[derive(Debug, Clone, Copy)]
pub struct RenderContext {
    pub units: UnitSystem,
    pub locale: Locale,
}

impl RenderContext {
    pub fn new(units: UnitSystem, locale: Locale) -> Self {
        Self { units, locale }
    }
}

impl Default for RenderContext {
    fn default() -> Self {
        Self::new(UnitSystem::Metric, Locale::en_US)
    }
}

/// Parses a POSIX-style locale tag such as "de_DE", "fr-FR" or "en_US.UTF-8"
pub fn locale_from_tag(tag: &str) -> Option<Locale> {
    let base = tag.split(['.', '@']).next().unwrap_or_default();
    let normalized = base.trim().replace('-', "_");
    Locale::try_from(normalized.as_str()).ok()
}

/// Nearest integer with a degree sign, e.g. "24°"
pub fn fmt_temp(temp: Option<&Temperature>, units: UnitSystem) -> String {
    match temp {
        Some(t) => format!("{}°", round_half_up(t.value_in(units))),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_wind(wind: Option<&Wind>, units: UnitSystem) -> String {
    match wind {
        Some(w) => {
            let unit = match units {
                UnitSystem::Metric => "km/h",
                UnitSystem::Imperial => "mph",
            };
            format!("{} {}", round_half_up(w.value_in(units)), unit)
        }
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_visibility(visibility: Option<&Visibility>, units: UnitSystem) -> String {
    match visibility {
        Some(v) => {
            let unit = match units {
                UnitSystem::Metric => "km",
                UnitSystem::Imperial => "mi",
            };
            // one decimal, half-up like every other magnitude
            let tenths = round_half_up(v.value_in(units) * 10.0);
            format!("{:.1} {}", tenths as f64 / 10.0, unit)
        }
        None => PLACEHOLDER.to_string(),
    }
}

/// Pressure is always hPa regardless of unit system
pub fn fmt_pressure(pressure: Option<i32>) -> String {
    match pressure {
        Some(p) => format!("{} hPa", p),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_humidity(humidity: Option<u8>) -> String {
    match humidity {
        Some(h) => format!("{}%", h),
        None => PLACEHOLDER.to_string(),
    }
}

pub fn fmt_uv(uvi: Option<f64>) -> String {
    match uvi {
        Some(u) => round_half_up(u).to_string(),
        None => PLACEHOLDER.to_string(),
    }
}

/// First letter upper-cased; blank descriptions become the placeholder
pub fn capitalize_description(description: Option<&str>) -> String {
    let Some(text) = description.map(str::trim).filter(|t| !t.is_empty()) else {
        return PLACEHOLDER.to_string();
    };
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => PLACEHOLDER.to_string(),
    }
}

/// Non-empty name/state/country joined with ", "
pub fn place_title(place: &Place) -> String {
    place.display_name()
}

/// Time-of-day greeting, with the user's name when one is set
pub fn greeting(hour: u32, name: &str) -> String {
    let greet = if hour < 12 {
        "Good morning"
    } else if hour < 18 {
        "Good afternoon"
    } else {
        "Good evening"
    };

    let name = name.trim();
    if name.is_empty() {
        greet.to_string()
    } else {
        format!("{}, {}!", greet, name)
    }
}

fn blank_or(value: &str) -> String {
    if value.trim().is_empty() {
        PLACEHOLDER.to_string()
    } else {
        value.to_string()
    }
}

/// One entry of the forecast strip
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastRow {
    /// Localized short weekday, e.g. "Tue"
    pub weekday: String,
    /// Localized short month and day, e.g. "Jul 16"
    pub month_day: String,
    pub icon_url: String,
    pub description: String,
    pub max: String,
    pub min: String,
}

fn forecast_row(day: &DailyForecast, weather: &NormalizedWeather, ctx: &RenderContext) -> ForecastRow {
    let local = weather.location.zone.localize(day.dt);
    let condition = day.primary_condition();

    ForecastRow {
        weekday: local
            .map(|dt| dt.format_localized("%a", ctx.locale).to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        month_day: local
            .map(|dt| dt.format_localized("%b %-d", ctx.locale).to_string())
            .unwrap_or_else(|| PLACEHOLDER.to_string()),
        icon_url: condition.map(|c| c.icon.clone()).unwrap_or_default(),
        description: capitalize_description(condition.map(|c| c.description.as_str())),
        max: fmt_temp(Some(&day.temp.max), ctx.units),
        min: fmt_temp(Some(&day.temp.min), ctx.units),
    }
}

/// Daily entries after today, at most `FORECAST_DAYS_SHOWN`
pub fn forecast_rows(weather: &NormalizedWeather, ctx: &RenderContext) -> Vec<ForecastRow> {
    weather
        .daily
        .iter()
        .skip(1)
        .take(FORECAST_DAYS_SHOWN)
        .map(|day| forecast_row(day, weather, ctx))
        .collect()
}

/// "Updated Jul 15 17:30" in the location's local time
pub fn updated_label(weather: &NormalizedWeather, ctx: &RenderContext) -> String {
    match weather.location.zone.localize(weather.current.dt) {
        Some(local) => format!(
            "Updated {}",
            local.format_localized("%b %-d %H:%M", ctx.locale)
        ),
        None => format!("Updated {}", PLACEHOLDER),
    }
}

/// Astronomy strings with blanks replaced by the placeholder
#[derive(Debug, Clone, PartialEq)]
pub struct AstroView {
    pub sunrise: String,
    pub sunset: String,
    pub moonrise: String,
    pub moonset: String,
}

impl From<&Astro> for AstroView {
    fn from(astro: &Astro) -> Self {
        Self {
            sunrise: blank_or(&astro.sunrise),
            sunset: blank_or(&astro.sunset),
            moonrise: blank_or(&astro.moonrise),
            moonset: blank_or(&astro.moonset),
        }
    }
}

/// Every string the dashboard shows for one record
#[derive(Debug, Clone, PartialEq)]
pub struct DashboardView {
    pub title: String,
    pub description: String,
    pub icon_url: String,
    pub temperature: String,
    pub feels_like: String,
    pub humidity: String,
    pub wind: String,
    pub visibility: String,
    pub pressure: String,
    pub uv: String,
    pub updated: String,
    pub astro: Option<AstroView>,
    pub forecast: Vec<ForecastRow>,
    /// Diagnostics only
    pub source: &'static str,
}

/// Derives the complete dashboard for a record and place
pub fn render_dashboard(
    weather: &NormalizedWeather,
    place: &Place,
    ctx: &RenderContext,
) -> DashboardView {
    let current = &weather.current;
    let condition = current.primary_condition();

    DashboardView {
        title: place_title(place),
        description: capitalize_description(condition.map(|c| c.description.as_str())),
        icon_url: condition.map(|c| c.icon.clone()).unwrap_or_default(),
        temperature: fmt_temp(Some(&current.temp), ctx.units),
        feels_like: fmt_temp(Some(&current.feels_like), ctx.units),
        humidity: fmt_humidity(Some(current.humidity)),
        wind: fmt_wind(Some(&current.wind), ctx.units),
        visibility: fmt_visibility(Some(&current.visibility), ctx.units),
        pressure: fmt_pressure(Some(current.pressure)),
        uv: fmt_uv(Some(current.uvi)),
        updated: updated_label(weather, ctx),
        astro: weather.astro.as_ref().map(AstroView::from),
        forecast: forecast_rows(weather, ctx),
        source: weather.source.as_str(),
    }
}

impl fmt::Display for DashboardView {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}  {}  (feels like {})", self.temperature, self.description, self.feels_like)?;
        writeln!(
            f,
            "Humidity {}  Wind {}  Visibility {}  Pressure {}  UV {}",
            self.humidity, self.wind, self.visibility, self.pressure, self.uv
        )?;
        if let Some(astro) = &self.astro {
            writeln!(
                f,
                "Sunrise {}  Sunset {}  Moonrise {}  Moonset {}",
                astro.sunrise, astro.sunset, astro.moonrise, astro.moonset
            )?;
        }
        if !self.forecast.is_empty() {
            writeln!(f)?;
            for row in &self.forecast {
                writeln!(
                    f,
                    "{:<4} {:<8} {:>5} / {:<5} {}",
                    row.weekday, row.month_day, row.max, row.min, row.description
                )?;
            }
        }
        writeln!(f)?;
        write!(f, "{}", self.updated)
    }
}
