//! OpenWeatherMap client (One Call 2.5 with 5 day / 3 hour fallback)
//!
//! One Call answers in the requested unit system only, so the second unit is
//! derived at the boundary. When One Call refuses the request (commonly 401 for
//! keys without a subscription), the 3-hour forecast is aggregated into days.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::aggregate::{bucket_by_day, DayBucket, Sample, DEFAULT_ICON_CODE};
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

/// Base URL for the OpenWeatherMap API
const OPENWEATHER_BASE_URL: &str = "https://api.openweathermap.org";

/// Days kept from the One Call daily array
const MAX_DAILY: usize = 7;

/// Icon URL for an OpenWeatherMap icon code
pub fn icon_url(code: &str) -> String {
    format!("https://openweathermap.org/img/wn/{}@2x.png", code)
}

/// Client for OpenWeatherMap weather and geocoding
#[derive(Debug, Clone)]
pub struct OpenWeatherProvider {
    client: Client,
    api_key: String,
    base_url: String,
    cache: Option<ExpiringCache>,
}

impl OpenWeatherProvider {
    /// Create a new provider against the public API with no cache
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            base_url: OPENWEATHER_BASE_URL.to_string(),
            cache: None,
        }
    }

    /// Back geocoding and weather lookups with an expiring cache
    pub fn with_cache(mut self, cache: ExpiringCache) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Point the client at a different host (used by tests)
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    async fn fetch_onecall(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<NormalizedWeather, ProviderError> {
        let url = format!("{}/data/2.5/onecall", self.base_url);
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("exclude", "minutely,hourly,alerts".to_string()),
            ("units", units.as_str().to_string()),
            ("appid", self.api_key.clone()),
        ];
        let response: OneCallResponse =
            get_json(&self.client, "One Call", &url, &params, None).await?;
        parse_onecall(response, units)
    }

    async fn fetch_five_day(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<NormalizedWeather, ProviderError> {
        let url = format!("{}/data/2.5/forecast", self.base_url);
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("units", units.as_str().to_string()),
            ("appid", self.api_key.clone()),
        ];
        let response: FiveDayResponse =
            get_json(&self.client, "5 day forecast", &url, &params, None).await?;
        parse_five_day(response, units)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherProvider {
    fn source(&self) -> Source {
        Source::OneCall
    }

    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<Place>, ProviderError> {
        let key = geocode_cache_key(self.source(), query, limit);
        if let Some(places) = cached(self.cache.as_ref(), &key) {
            return Ok(places);
        }

        let url = format!("{}/geo/1.0/direct", self.base_url);
        let params = [
            ("q", query.to_string()),
            ("limit", limit.to_string()),
            ("appid", self.api_key.clone()),
        ];
        let results: Vec<GeoPlace> =
            get_json(&self.client, "Geocoding", &url, &params, None).await?;

        let places: Vec<Place> = results.into_iter().map(Place::from).collect();
        store(self.cache.as_ref(), &key, &places, GEOCODE_CACHE_TTL);
        Ok(places)
    }

    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Place, ProviderError> {
        validate_coordinates(lat, lon)?;

        let url = format!("{}/geo/1.0/reverse", self.base_url);
        let params = [
            ("lat", lat.to_string()),
            ("lon", lon.to_string()),
            ("limit", "1".to_string()),
            ("appid", self.api_key.clone()),
        ];
        let results: Vec<GeoPlace> =
            get_json(&self.client, "Reverse geocoding", &url, &params, None).await?;

        Ok(results
            .into_iter()
            .next()
            .map(Place::from)
            .unwrap_or_else(|| Place::unknown(lat, lon)))
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

        let weather = match self.fetch_onecall(lat, lon, units).await {
            Ok(weather) => weather,
            Err(ProviderError::Status { status, .. }) => {
                tracing::warn!(
                    "One Call unavailable (HTTP {}), aggregating 3-hour forecast instead",
                    status
                );
                self.fetch_five_day(lat, lon, units).await?
            }
            Err(e) => return Err(e),
        };

        store(self.cache.as_ref(), &key, &weather, WEATHER_CACHE_TTL);
        Ok(weather)
    }
}

impl From<GeoPlace> for Place {
    fn from(geo: GeoPlace) -> Self {
        Place {
            name: geo.name,
            state: geo.state.unwrap_or_default(),
            country: geo.country,
            lat: geo.lat,
            lon: geo.lon,
        }
    }
}

/// A blank icon code falls back to clear sky
fn conditions(raw: &[OwmCondition]) -> Vec<Condition> {
    raw.iter()
        .map(|c| Condition {
            description: c.description.clone(),
            icon: icon_url(if c.icon.is_empty() {
                DEFAULT_ICON_CODE
            } else {
                &c.icon
            }),
        })
        .collect()
}

/// Formats an epoch as "05:59 AM" in the location's offset; missing or zero is "—"
fn clock_time(epoch: Option<i64>, zone: &TimeZoneRef) -> String {
    epoch
        .filter(|ts| *ts > 0)
        .and_then(|ts| zone.localize(ts))
        .map(|local| local.format("%I:%M %p").to_string())
        .unwrap_or_else(|| "—".to_string())
}

/// Map a One Call payload onto the normalized model
fn parse_onecall(
    response: OneCallResponse,
    units: UnitSystem,
) -> Result<NormalizedWeather, ProviderError> {
    if response.daily.is_empty() {
        return Err(ProviderError::MissingField("daily".to_string()));
    }

    let zone = TimeZoneRef::Offset(response.timezone_offset);
    let current = response.current;

    let astro = response.daily.first().map(|today| Astro {
        sunrise: clock_time(today.sunrise.or(current.sunrise), &zone),
        sunset: clock_time(today.sunset.or(current.sunset), &zone),
        moonrise: clock_time(today.moonrise, &zone),
        moonset: clock_time(today.moonset, &zone),
    });

    let daily = response
        .daily
        .iter()
        .take(MAX_DAILY)
        .map(|day| DailyForecast {
            dt: day.dt,
            temp: DailyTemperature {
                min: Temperature::from_units(day.temp.min, units),
                max: Temperature::from_units(day.temp.max, units),
                day: Temperature::from_units(day.temp.day, units),
            },
            humidity: round_half_up(day.humidity).clamp(0, 100) as u8,
            pressure: round_half_up(day.pressure) as i32,
            wind: Wind::from_units(day.wind_speed, units),
            weather: conditions(&day.weather),
        })
        .collect();

    Ok(NormalizedWeather {
        location: Location {
            zone,
            name: String::new(),
            country: String::new(),
        },
        current: CurrentConditions {
            dt: current.dt,
            temp: Temperature::from_units(current.temp, units),
            feels_like: Temperature::from_units(current.feels_like, units),
            humidity: round_half_up(current.humidity).clamp(0, 100) as u8,
            pressure: round_half_up(current.pressure) as i32,
            visibility: Visibility::from_meters(current.visibility.unwrap_or_default()),
            wind: Wind::from_units(current.wind_speed, units),
            uvi: current.uvi.unwrap_or_default(),
            weather: conditions(&current.weather),
        },
        daily,
        astro,
        source: Source::OneCall,
    })
}

/// Map a 5 day / 3 hour payload onto the normalized model
///
/// The first sample stands in for current conditions; UV is unavailable and
/// reported as 0. Days come from `aggregate::bucket_by_day`.
fn parse_five_day(
    response: FiveDayResponse,
    units: UnitSystem,
) -> Result<NormalizedWeather, ProviderError> {
    let now = response
        .list
        .first()
        .ok_or_else(|| ProviderError::MissingField("list".to_string()))?;

    let samples: Vec<Sample> = response
        .list
        .iter()
        .map(|item| Sample {
            day: item.dt_txt.chars().take(10).collect(),
            temp: item.main.temp,
            humidity: item.main.humidity,
            pressure: item.main.pressure,
            wind: item.wind.speed,
            icon: item.weather.first().map(|w| w.icon.clone()),
            description: item
                .weather
                .first()
                .map(|w| w.description.clone())
                .unwrap_or_default(),
        })
        .collect();

    let daily = bucket_by_day(&samples)
        .iter()
        .map(|bucket| daily_from_bucket(bucket, units))
        .collect::<Result<Vec<_>, _>>()?;

    Ok(NormalizedWeather {
        location: Location {
            zone: TimeZoneRef::Offset(response.city.timezone),
            name: response.city.name.clone(),
            country: response.city.country.clone(),
        },
        current: CurrentConditions {
            dt: now.dt,
            temp: Temperature::from_units(now.main.temp, units),
            feels_like: Temperature::from_units(now.main.feels_like, units),
            humidity: round_half_up(now.main.humidity).clamp(0, 100) as u8,
            pressure: round_half_up(now.main.pressure) as i32,
            visibility: Visibility::from_meters(now.visibility.unwrap_or_default()),
            wind: Wind::from_units(now.wind.speed, units),
            uvi: 0.0,
            weather: conditions(&now.weather),
        },
        daily,
        astro: None,
        source: Source::FiveDay,
    })
}

fn daily_from_bucket(bucket: &DayBucket, units: UnitSystem) -> Result<DailyForecast, ProviderError> {
    let date = chrono::NaiveDate::parse_from_str(&bucket.day, "%Y-%m-%d")
        .map_err(|_| ProviderError::InvalidDate(bucket.day.clone()))?;

    Ok(DailyForecast {
        dt: noon_utc(date),
        temp: DailyTemperature {
            min: Temperature::from_units(bucket.temp_min, units),
            max: Temperature::from_units(bucket.temp_max, units),
            day: Temperature::from_units(bucket.temp_day, units),
        },
        humidity: bucket.humidity,
        pressure: bucket.pressure,
        wind: Wind::from_units(bucket.wind, units),
        weather: vec![Condition {
            description: bucket.description.clone(),
            icon: icon_url(&bucket.icon),
        }],
    })
}

/// One Call 2.5 response structure
#[derive(Debug, Deserialize)]
struct OneCallResponse {
    #[serde(default)]
    timezone_offset: i32,
    current: OneCallCurrent,
    #[serde(default)]
    daily: Vec<OneCallDaily>,
}

#[derive(Debug, Deserialize)]
struct OneCallCurrent {
    dt: i64,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    uvi: Option<f64>,
    #[serde(default)]
    visibility: Option<f64>,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OneCallDaily {
    dt: i64,
    #[serde(default)]
    sunrise: Option<i64>,
    #[serde(default)]
    sunset: Option<i64>,
    #[serde(default)]
    moonrise: Option<i64>,
    #[serde(default)]
    moonset: Option<i64>,
    temp: OneCallDailyTemp,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: f64,
    #[serde(default)]
    wind_speed: f64,
    #[serde(default)]
    weather: Vec<OwmCondition>,
}

#[derive(Debug, Deserialize)]
struct OneCallDailyTemp {
    day: f64,
    min: f64,
    max: f64,
}

#[derive(Debug, Deserialize)]
struct OwmCondition {
    #[serde(default)]
    description: String,
    #[serde(default)]
    icon: String,
}

/// 5 day / 3 hour forecast response structure
#[derive(Debug, Deserialize)]
struct FiveDayResponse {
    #[serde(default)]
    list: Vec<FiveDayItem>,
    city: FiveDayCity,
}

#[derive(Debug, Deserialize)]
struct FiveDayItem {
    dt: i64,
    main: FiveDayMain,
    #[serde(default)]
    weather: Vec<OwmCondition>,
    wind: FiveDayWind,
    #[serde(default)]
    visibility: Option<f64>,
    /// "YYYY-MM-DD HH:MM:SS"
    dt_txt: String,
}

#[derive(Debug, Deserialize)]
struct FiveDayMain {
    temp: f64,
    feels_like: f64,
    #[serde(default)]
    pressure: f64,
    #[serde(default)]
    humidity: f64,
}

#[derive(Debug, Deserialize)]
struct FiveDayWind {
    #[serde(default)]
    speed: f64,
}

#[derive(Debug, Deserialize)]
struct FiveDayCity {
    #[serde(default)]
    name: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    timezone: i32,
}

/// One geocoding hit from /geo/1.0
#[derive(Debug, Deserialize)]
struct GeoPlace {
    name: String,
    #[serde(default)]
    state: Option<String>,
    #[serde(default)]
    country: String,
    lat: f64,
    lon: f64,
}
