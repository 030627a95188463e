//! Normalized weather model shared by every provider adapter
//!
//! Adapters translate their upstream payloads into these types at the boundary.
//! Measurements that are shown in two unit systems carry both values, so the
//! renderer only ever selects a field and never converts.

pub mod aggregate;
pub mod locate;
pub mod openweather;
pub mod provider;
pub mod weatherapi;

pub use locate::{IpLocator, LocateError};
pub use openweather::OpenWeatherProvider;
pub use provider::{ProviderError, WeatherProvider, GEOCODE_CACHE_TTL, WEATHER_CACHE_TTL};
pub use weatherapi::WeatherApiProvider;

use chrono::{DateTime, FixedOffset, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Display unit system selected by the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UnitSystem {
    #[default]
    Metric,
    Imperial,
}

impl UnitSystem {
    /// Parses a unit system name ("metric"/"imperial", plus short aliases)
    pub fn from_name(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "metric" | "m" | "c" | "celsius" => Some(UnitSystem::Metric),
            "imperial" | "i" | "f" | "fahrenheit" => Some(UnitSystem::Imperial),
            _ => None,
        }
    }

    /// Name used in cache keys and provider query strings
    pub fn as_str(&self) -> &'static str {
        match self {
            UnitSystem::Metric => "metric",
            UnitSystem::Imperial => "imperial",
        }
    }

    /// The other unit system
    pub fn toggled(self) -> Self {
        match self {
            UnitSystem::Metric => UnitSystem::Imperial,
            UnitSystem::Imperial => UnitSystem::Metric,
        }
    }
}

/// Rounds half-way cases towards positive infinity
pub fn round_half_up(value: f64) -> i64 {
    (value + 0.5).floor() as i64
}

/// A named location with coordinates
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Place {
    pub name: String,
    #[serde(default)]
    pub state: String,
    #[serde(default)]
    pub country: String,
    pub lat: f64,
    pub lon: f64,
}

impl Place {
    /// Place used when nothing is remembered and IP location fails
    pub fn default_place() -> Self {
        Self {
            name: "Bengaluru".to_string(),
            state: String::new(),
            country: "IN".to_string(),
            lat: 12.9716,
            lon: 77.5946,
        }
    }

    /// Placeholder place named after its own coordinates
    pub fn coordinate_label(lat: f64, lon: f64) -> Self {
        Self {
            name: format!("{:.2}, {:.2}", lat, lon),
            state: String::new(),
            country: String::new(),
            lat,
            lon,
        }
    }

    /// Place returned when reverse geocoding finds no match
    pub fn unknown(lat: f64, lon: f64) -> Self {
        Self {
            name: "Unknown".to_string(),
            state: String::new(),
            country: String::new(),
            lat,
            lon,
        }
    }

    /// Non-empty name/state/country joined with ", "
    pub fn display_name(&self) -> String {
        [&self.name, &self.state, &self.country]
            .iter()
            .filter(|part| !part.is_empty())
            .map(|part| part.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether this place refers to the same spot at cache-key precision
    pub fn same_spot(&self, lat: f64, lon: f64) -> bool {
        coord_key(self.lat, self.lon) == coord_key(lat, lon)
    }
}

/// Coordinates rounded to 2 decimals, as used in cache keys
pub fn coord_key(lat: f64, lon: f64) -> String {
    format!("{:.2},{:.2}", lat, lon)
}

/// Reads the field of a two-unit measurement matching a unit system
pub trait DualUnit {
    fn value_in(&self, units: UnitSystem) -> f64;
}

/// Temperature in both Celsius and Fahrenheit
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Temperature {
    pub c: f64,
    pub f: f64,
}

impl Temperature {
    pub fn from_celsius(c: f64) -> Self {
        Self {
            c,
            f: c * 9.0 / 5.0 + 32.0,
        }
    }

    pub fn from_fahrenheit(f: f64) -> Self {
        Self {
            c: (f - 32.0) * 5.0 / 9.0,
            f,
        }
    }

    /// Builds from a single value expressed in `units`
    pub fn from_units(value: f64, units: UnitSystem) -> Self {
        match units {
            UnitSystem::Metric => Self::from_celsius(value),
            UnitSystem::Imperial => Self::from_fahrenheit(value),
        }
    }
}

impl DualUnit for Temperature {
    fn value_in(&self, units: UnitSystem) -> f64 {
        match units {
            UnitSystem::Metric => self.c,
            UnitSystem::Imperial => self.f,
        }
    }
}

const KM_PER_MILE: f64 = 1.609344;

/// Wind speed in both km/h and mph
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Wind {
    pub kph: f64,
    pub mph: f64,
}

impl Wind {
    pub fn from_kph(kph: f64) -> Self {
        Self {
            kph,
            mph: kph / KM_PER_MILE,
        }
    }

    pub fn from_mph(mph: f64) -> Self {
        Self {
            kph: mph * KM_PER_MILE,
            mph,
        }
    }

    /// Builds from a speed in the provider's native unit for `units`
    /// (metres per second for metric, miles per hour for imperial)
    pub fn from_units(value: f64, units: UnitSystem) -> Self {
        match units {
            UnitSystem::Metric => Self::from_kph(value * 3.6),
            UnitSystem::Imperial => Self::from_mph(value),
        }
    }
}

impl DualUnit for Wind {
    fn value_in(&self, units: UnitSystem) -> f64 {
        match units {
            UnitSystem::Metric => self.kph,
            UnitSystem::Imperial => self.mph,
        }
    }
}

/// Visibility in both kilometres and miles
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Visibility {
    pub km: f64,
    pub mi: f64,
}

impl Visibility {
    pub fn from_meters(meters: f64) -> Self {
        Self {
            km: meters / 1000.0,
            mi: meters / (KM_PER_MILE * 1000.0),
        }
    }
}

impl DualUnit for Visibility {
    fn value_in(&self, units: UnitSystem) -> f64 {
        match units {
            UnitSystem::Metric => self.km,
            UnitSystem::Imperial => self.mi,
        }
    }
}

/// Textual condition plus a ready-to-render icon URL
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Condition {
    pub description: String,
    /// Absolute URL
    pub icon: String,
}

/// Conditions at observation time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurrentConditions {
    /// Observation time, epoch seconds
    pub dt: i64,
    pub temp: Temperature,
    pub feels_like: Temperature,
    /// Relative humidity percentage (0-100)
    pub humidity: u8,
    /// hPa
    pub pressure: i32,
    pub visibility: Visibility,
    pub wind: Wind,
    pub uvi: f64,
    pub weather: Vec<Condition>,
}

impl CurrentConditions {
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// Temperature spread for one forecast day
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DailyTemperature {
    pub min: Temperature,
    pub max: Temperature,
    pub day: Temperature,
}

/// One forecast day
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyForecast {
    /// A moment inside the forecast day, epoch seconds
    pub dt: i64,
    pub temp: DailyTemperature,
    pub humidity: u8,
    pub pressure: i32,
    pub wind: Wind,
    pub weather: Vec<Condition>,
}

impl DailyForecast {
    pub fn primary_condition(&self) -> Option<&Condition> {
        self.weather.first()
    }
}

/// Sun and moon times as the provider formats them (local time)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Astro {
    pub sunrise: String,
    pub sunset: String,
    pub moonrise: String,
    pub moonset: String,
}

/// How to convert epoch timestamps into the location's local time
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeZoneRef {
    /// IANA zone identifier, e.g. "Asia/Kolkata"
    TzId(String),
    /// Fixed offset from UTC in seconds
    Offset(i32),
}

impl TimeZoneRef {
    /// Converts an epoch timestamp into local wall-clock time
    ///
    /// Unknown zone ids and out-of-range offsets fall back to UTC.
    pub fn localize(&self, epoch_seconds: i64) -> Option<DateTime<FixedOffset>> {
        let utc = DateTime::<Utc>::from_timestamp(epoch_seconds, 0)?;
        let local = match self {
            TimeZoneRef::TzId(id) => id
                .parse::<chrono_tz::Tz>()
                .ok()
                .map(|tz| utc.with_timezone(&tz).fixed_offset()),
            TimeZoneRef::Offset(seconds) => {
                FixedOffset::east_opt(*seconds).map(|offset| utc.with_timezone(&offset))
            }
        };
        Some(local.unwrap_or_else(|| utc.fixed_offset()))
    }
}

/// Where the weather record is for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Location {
    pub zone: TimeZoneRef,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub country: String,
}

/// Which adapter path produced a record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Source {
    #[serde(rename = "weatherapi")]
    WeatherApi,
    #[serde(rename = "onecall")]
    OneCall,
    #[serde(rename = "5day")]
    FiveDay,
}

impl Source {
    pub fn as_str(&self) -> &'static str {
        match self {
            Source::WeatherApi => "weatherapi",
            Source::OneCall => "onecall",
            Source::FiveDay => "5day",
        }
    }
}

/// The provider-independent weather record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedWeather {
    pub location: Location,
    pub current: CurrentConditions,
    /// Ascending by date, index 0 is today, at most 7 entries
    pub daily: Vec<DailyForecast>,
    #[serde(default)]
    pub astro: Option<Astro>,
    #[serde(rename = "_source")]
    pub source: Source,
}

/// Epoch seconds for noon UTC on a calendar date
///
/// Noon keeps the date stable when shifted by any real-world UTC offset.
pub fn noon_utc(date: NaiveDate) -> i64 {
    date.and_hms_opt(12, 0, 0)
        .map(|dt| dt.and_utc().timestamp())
        .unwrap_or_default()
}
