//! Common interface implemented by every weather/geocoding provider
//!
//! The load pipeline and the renderer only see this trait and the normalized
//! model; provider-specific payload shapes never leave the adapter modules.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

use super::{coord_key, NormalizedWeather, Place, Source, UnitSystem};
use crate::cache::ExpiringCache;

/// How long geocoding results stay cached (7 days)
pub const GEOCODE_CACHE_TTL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// How long weather records stay cached (10 minutes)
pub const WEATHER_CACHE_TTL: Duration = Duration::from_secs(10 * 60);

/// Errors that can occur when talking to a provider
#[derive(Debug, Error)]
pub enum ProviderError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Endpoint answered with a non-success status
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        endpoint: &'static str,
        status: StatusCode,
    },

    /// Missing expected field in response
    #[error("Missing expected field in response: {0}")]
    MissingField(String),

    /// Invalid date format in response
    #[error("Invalid date format: {0}")]
    InvalidDate(String),

    /// Coordinates outside the valid range
    #[error("Invalid coordinates: {lat}, {lon}")]
    InvalidCoordinates { lat: f64, lon: f64 },
}

/// A source of geocoding and weather data
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Tag of the provider's primary weather endpoint
    fn source(&self) -> Source;

    /// Places matching a free-text query, in provider relevance order
    async fn geocode(&self, query: &str, limit: usize) -> Result<Vec<Place>, ProviderError>;

    /// Best-effort place for coordinates; `name` is "Unknown" when nothing matches
    async fn reverse_geocode(&self, lat: f64, lon: f64) -> Result<Place, ProviderError>;

    /// Current conditions and daily forecast, normalized
    async fn fetch_weather(
        &self,
        lat: f64,
        lon: f64,
        units: UnitSystem,
    ) -> Result<NormalizedWeather, ProviderError>;
}

/// Cache key for a geocoding query
pub(crate) fn geocode_cache_key(source: Source, query: &str, limit: usize) -> String {
    format!(
        "geocode:{}:{}:{}",
        source.as_str(),
        query.trim().to_lowercase(),
        limit
    )
}

/// Cache key for a weather record
pub(crate) fn weather_cache_key(source: Source, lat: f64, lon: f64, units: UnitSystem) -> String {
    format!(
        "weather:{}:{},{}",
        source.as_str(),
        coord_key(lat, lon),
        units.as_str()
    )
}

/// Rejects coordinates outside [-90, 90] x [-180, 180]
pub(crate) fn validate_coordinates(lat: f64, lon: f64) -> Result<(), ProviderError> {
    if (-90.0..=90.0).contains(&lat) && (-180.0..=180.0).contains(&lon) {
        Ok(())
    } else {
        Err(ProviderError::InvalidCoordinates { lat, lon })
    }
}

/// Reads a cached value, if a cache is configured
pub(crate) fn cached<T: DeserializeOwned>(cache: Option<&ExpiringCache>, key: &str) -> Option<T> {
    let value = cache?.get(key);
    if value.is_some() {
        tracing::debug!("Cache hit for {}", key);
    }
    value
}

/// Writes a value to the cache, logging instead of failing
pub(crate) fn store<T: Serialize>(
    cache: Option<&ExpiringCache>,
    key: &str,
    value: &T,
    ttl: Duration,
) {
    if let Some(cache) = cache {
        if let Err(e) = cache.set(key, value, Some(ttl)) {
            tracing::warn!("Failed to cache {}: {}", key, e);
        }
    }
}

/// Sends a GET request and decodes a JSON body
///
/// Any non-2xx status is reported as `ProviderError::Status` so callers can
/// decide whether to fall back to another endpoint.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &Client,
    endpoint: &'static str,
    url: &str,
    params: &[(&str, String)],
    user_agent: Option<&str>,
) -> Result<T, ProviderError> {
    let mut request = client.get(url).query(params);
    if let Some(agent) = user_agent {
        request = request.header(reqwest::header::USER_AGENT, agent);
    }

    let response = request.send().await?;
    let status = response.status();
    if !status.is_success() {
        tracing::debug!("{} returned HTTP {}", endpoint, status);
        return Err(ProviderError::Status { endpoint, status });
    }

    let text = response.text().await?;
    Ok(serde_json::from_str(&text)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cache_keys_round_coordinates_and_normalize_query() {
        assert_eq!(
            weather_cache_key(Source::WeatherApi, 12.9716, 77.5946, UnitSystem::Metric),
            "weather:weatherapi:12.97,77.59,metric"
        );
        assert_eq!(
            geocode_cache_key(Source::OneCall, "  London ", 8),
            "geocode:onecall:london:8"
        );
    }

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(12.97, 77.59).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert!(matches!(
            validate_coordinates(91.0, 0.0),
            Err(ProviderError::InvalidCoordinates { .. })
        ));
        assert!(validate_coordinates(0.0, -180.5).is_err());
    }

    #[test]
    fn test_cached_without_cache_is_none() {
        let value: Option<String> = cached(None, "anything");
        assert!(value.is_none());
    }

    #[test]
    fn test_store_then_cached_roundtrip() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let cache = ExpiringCache::with_dir(temp_dir.path().to_path_buf());

        store(Some(&cache), "k", &vec![1, 2, 3], WEATHER_CACHE_TTL);

        let value: Option<Vec<i32>> = cached(Some(&cache), "k");
        assert_eq!(value, Some(vec![1, 2, 3]));
    }
}
