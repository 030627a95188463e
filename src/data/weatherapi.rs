//! WeatherAPI.com weather client with Nominatim geocoding
//!
//! WeatherAPI delivers both unit systems natively and a 7-day forecast with an
//! astronomy block, so normalization is mostly a field mapping. Geocoding goes
//! through OpenStreetMap's Nominatim, which requires a descriptive User-Agent.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;

use super::provider::{
    cached, geocode_cache_key, get_json, store, validate_coordinates, weather_cache_key,
    ProviderError, WeatherProvider, GEOCODE_CACHE_TTL, WEATHER_CACHE_TTL,
};
use super::{
    noon_utc, round_half_up, Astro, Condition, CurrentConditions, DailyForecast,
    DailyTemperature, Location, NormalizedWeather, Place, Source, Temperature, TimeZoneRef,
    UnitSystem, Visibility, Wind,
};
use crate::cache::ExpiringCache;

/// Base URL for the WeatherAPI.com API
const WEATHERAPI_BASE_URL: &str = "https://api.weatherapi.com/v1";

/// Base URL for the Nominatim geocoder
const NOMINATIM_BASE_URL: &str = "https://nominatim.openstreetmap.org";

/// Identifies this client to Nominatim
const USER_AGENT: &str = concat!("wxdash/", env!("CARGO_PKG_VERSION"));

/// Days of forecast requested
const FORECAST_DAYS: u8 = 7;

/// Icon shown when the provider sends none (sunny)
const FALLBACK_ICON: &str = "https://cdn.weatherapi.com/weather/64x64/day/113.png";

/// Client for WeatherAPI.com forecasts and Nominatim geocoding
#[derive(Debug, Clone)]
pub struct WeatherApiProvider {
    client: Client,
    api_key: String,
    weather_base_url: String,
    geocode_base_url: String,
    cache: Option<ExpiringCache>,
}

impl WeatherApiProvider {
    /// Create a new provider using the public endpoints and no cache
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            weather_base_url: WEATHERAPI_BASE_URL.to_string(),
            geocode_base_url: NOMINATIM_BASE_URL.to_string(),
            cache: None,
        }
    }

    /// Back geocoding and weather lookups with an expiring cache
    pub fn with_cache(mut self, cache: ExpiringCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Point the client at different endpoints (used by tests)
    pub fn with_base_urls(
        mut self,
        weather_base_url: impl Into<String>,
        geocode_base_url: impl Into<String>,
    ) -> Self {
        self.weather_base_url = weather_base_url.into();
        self.geocode_base_url = geocode_base_url.into();
        self
    }

    async fn fetch_forecast(&self, lat: f64, lon: f64) -> Result<ForecastResponse, ProviderError> {
        let url = format!("{}/forecast.json", self.weather_base_url);
        let params = [
            ("key", self.api_key.clone()),
            ("q", format!("{},{}", lat, lon)),
            ("days", FORECAST_DAYS.to_string()),
            ("aqi", "no".to_string()),
            ("alerts", "no".to_string()),
        ];
        get_json(&self.client, "WeatherAPI forecast", &url, &params, None).await
    }
}

#[async_trait]
impl WeatherProvider for WeatherApiProvider {
    fn source(&self) -> Source {
        Source::WeatherApi
    }

    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<Place>, ProviderError> {
        let key = geocode_cache_key(self.source(), query, limit);
        if let Some(places) = cached(self.cache.as_ref(), &key) {
            return Ok(places);
        }

        let url = format!("{}/search", self.geocode_base_url);
        let params = [
            ("q", query.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
            ("limit", limit.to_string()),
        ];
        let results: Vec<NominatimPlace> =
            get_json(&self.client, "Nominatim search", &url, &params, Some(USER_AGENT)).await?;

        let places = parse_search_results(results);
        store(self.cache.as_ref(), &key, &places, GEOCODE_CACHE_TTL);
        Ok(places)
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Place, ProviderError> {
        validate_coordinates(lat, lon)?;

        let url = format!("{}/reverse", self.geocode_base_url);
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("format", "json".to_string()),
            ("addressdetails", "1".to_string()),
        ];
        let result: NominatimReverse =
            get_json(&self.client, "Nominatim reverse", &url, &params, Some(USER_AGENT)).await?;

        Ok(parse_reverse_result(result, lat, lon))
    }

    async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<NormalizedWeather, ProviderError> {
        validate_coordinates(lat, lon)?;

        let key = weather_cache_key(self.source(), lat, lon, units);
        if let Some(weather) = cached(self.cache.as_ref(), &key) {
            return Ok(weather);
        }

        let response = self.fetch_forecast(lat, lon).await?;
        let weather = parse_forecast(response)?;

        store(self.cache.as_ref(), &key, &weather, WEATHER_CACHE_TTL);
        Ok(weather)
    }
}

/// Rewrites protocol-relative icon paths into absolute https URLs
fn absolute_icon_url(icon: &str) -> String {
    if icon.is_empty() {
        FALLBACK_ICON.to_string()
    } else if let Some(rest) = icon.strip_prefix("//") {
        format!("https://{}", rest)
    } else if icon.starts_with('/') {
        format!("https://cdn.weatherapi.com{}", icon)
    } else {
        icon.to_string()
    }
}

fn condition(raw: &ApiCondition) -> Condition {
    Condition {
        description: raw.text.clone(),
        icon: absolute_icon_url(&raw.icon),
    }
}

/// Map a WeatherAPI forecast payload onto the normalized model
fn parse_forecast(response: ForecastResponse) -> Result<NormalizedWeather, ProviderError> {
    let current = response.current;
    let forecast_days = response.forecast.forecastday;

    if forecast_days.is_empty() {
        return Err(ProviderError::MissingField("forecast.forecastday".to_string()));
    }

    let astro = forecast_days[0].astro.as_ref().map(|a| Astro {
        sunrise: a.sunrise.clone(),
        sunset: a.sunset.clone(),
        moonrise: a.moonrise.clone(),
        moonset: a.moonset.clone(),
    });

    let daily = forecast_days
        .iter()
        .take(FORECAST_DAYS as usize)
        .map(parse_forecast_day)
        .collect::<Result<Vec<_>, _>>()?;

    let zone = match response.location.tz_id {
        Some(tz_id) if !tz_id.is_empty() => TimeZoneRef::TzId(tz_id),
        _ => TimeZoneRef::Offset(0),
    };

    Ok(NormalizedWeather {
        location: Location {
            zone,
            name: response.location.name,
            country: response.location.country,
        },
        current: CurrentConditions {
            dt: current.last_updated_epoch,
            temp: Temperature {
                c: current.temp_c,
                f: current.temp_f,
            },
            feels_like: Temperature {
                c: current.feelslike_c,
                f: current.feelslike_f,
            },
            humidity: round_half_up(current.humidity).clamp(0, 100) as u8,
            pressure: round_half_up(current.pressure_mb) as i32,
            visibility: Visibility {
                km: current.vis_km,
                mi: current.vis_miles,
            },
            wind: Wind {
                kph: current.wind_kph,
                mph: current.wind_mph,
            },
            uvi: current.uv,
            weather: vec![condition(&current.condition)],
        },
        daily,
        astro,
        source: Source::WeatherApi,
    })
}

fn parse_forecast_day(day: &ApiForecastDay) -> Result<DailyForecast, ProviderError> {
    let date = NaiveDate::parse_from_str(&day.date, "%Y-%m-%d")
        .map_err(|_| ProviderError::InvalidDate(day.date.clone()))?;
    let summary = &day.day;

    Ok(DailyForecast {
        dt: noon_utc(date),
        temp: DailyTemperature {
            min: Temperature {
                c: summary.mintemp_c,
                f: summary.mintemp_f,
            },
            max: Temperature {
                c: summary.maxtemp_c,
                f: summary.maxtemp_f,
            },
            day: Temperature {
                c: summary.avgtemp_c,
                f: summary.avgtemp_f,
            },
        },
        humidity: round_half_up(summary.avghumidity).clamp(0, 100) as u8,
        pressure: midday_pressure(&day.hour),
        wind: Wind {
            kph: summary.maxwind_kph,
            mph: summary.maxwind_mph,
        },
        weather: vec![condition(&summary.condition)],
    })
}

/// Pressure at 12:00, else the mean of whatever hours report one, else 0
fn midday_pressure(hours: &[ApiHour]) -> i32 {
    if let Some(pressure) = hours.get(12).and_then(|h| h.pressure_mb) {
        return round_half_up(pressure) as i32;
    }
    let readings: Vec<f64> = hours.iter().filter_map(|h| h.pressure_mb).collect();
    if readings.is_empty() {
        return 0;
    }
    round_half_up(readings.iter().sum::<f64>() / readings.len() as f64) as i32
}

fn parse_search_results(results: Vec<NominatimPlace>) -> Vec<Place> {
    results
        .into_iter()
        .filter_map(|p| {
            let lat = p.lat.parse::<f64>().ok()?;
            let lon = p.lon.parse::<f64>().ok()?;
            let name = p
                .display_name
                .split(',')
                .next()
                .unwrap_or_default()
                .trim()
                .to_string();
            let address = p.address.unwrap_or_default();
            Some(Place {
                name,
                state: address.state.unwrap_or_default(),
                country: address
                    .country_code
                    .map(|c| c.to_uppercase())
                    .unwrap_or_default(),
                lat,
                lon,
            })
        })
        .collect()
}

fn parse_reverse_result(result: NominatimReverse, lat: f64, lon: f64) -> Place {
    let Some(address) = result.address else {
        return Place::unknown(lat, lon);
    };

    Place {
        name: address
            .city
            .or(address.town)
            .or(address.village)
            .unwrap_or_else(|| "Unknown".to_string()),
        state: address.state.unwrap_or_default(),
        country: address
            .country_code
            .map(|c| c.to_uppercase())
            .unwrap_or_default(),
        lat,
        lon,
    }
}

/// WeatherAPI forecast response structure
#[derive(Debug, Deserialize)]
struct ForecastResponse {
    location: ApiLocation,
    current: ApiCurrent,
    forecast: ApiForecast,
}

#[derive(Debug, Deserialize)]
struct ApiLocation {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    tz_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiCurrent {
    last_updated_epoch: i64,
    temp_c: f64,
    temp_f: f64,
    feelslike_c: f64,
    feelslike_f: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    pressure_mb: f64,
    #[serde(default)]
    vis_km: f64,
    #[serde(default)]
    vis_miles: f64,
    #[serde(default)]
    wind_kph: f64,
    #[serde(default)]
    wind_mph: f64,
    #[serde(default)]
    uv: f64,
    #[serde(default)]
    condition: ApiCondition,
}

#[derive(Debug, Default, Deserialize)]
struct ApiCondition {
    #[serde(default)]
    text: String,
    #[serde(default)]
    icon: String,
}

#[derive(Debug, Deserialize)]
struct ApiForecast {
    #[serde(default)]
    forecastday: Vec<ApiForecastDay>,
}

#[derive(Debug, Deserialize)]
struct ApiForecastDay {
    date: String,
    day: ApiDay,
    #[serde(default)]
    astro: Option<ApiAstro>,
    #[serde(default)]
    hour: Vec<ApiHour>,
}

#[derive(Debug, Deserialize)]
struct ApiDay {
    maxtemp_c: f64,
    maxtemp_f: f64,
    mintemp_c: f64,
    mintemp_f: f64,
    avgtemp_c: f64,
    avgtemp_f: f64,
    #[serde(default)]
    maxwind_kph: f64,
    #[serde(default)]
    maxwind_mph: f64,
    #[serde(default)]
    avghumidity: f64,
    #[serde(default)]
    condition: ApiCondition,
}

#[derive(Debug, Deserialize)]
struct ApiAstro {
    #[serde(default)]
    sunrise: String,
    #[serde(default)]
    sunset: String,
    #[serde(default)]
    moonrise: String,
    #[serde(default)]
    moonset: String,
}

#[derive(Debug, Deserialize)]
struct ApiHour {
    #[serde(default)]
    pressure_mb: Option<f64>,
}

/// One Nominatim search hit
#[derive(Debug, Deserialize)]
struct NominatimPlace {
    #[serde(default)]
    display_name: String,
    lat: String,
    lon: String,
    #[serde(default)]
    address: Option<NominatimAddress>,
}

#[derive(Debug, Default, Deserialize)]
struct NominatimAddress {
    city: Option<String>,
    town: Option<String>,
    village: Option<String>,
    state: Option<String>,
    country_code: Option<String>,
}

/// Nominatim reverse lookup; `address` is absent when nothing matched
#[derive(Debug, Deserialize)]
struct NominatimReverse {
    #[serde(default)]
    address: Option<NominatimAddress>,
}
