//! Approximate location from the caller's public IP address

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;

use super::Place;

/// ipapi.co JSON endpoint for the calling address
const IPAPI_URL: &str = "https://ipapi.co/json/";

/// Errors that can occur while locating by IP
#[derive(Debug, Error)]
pub enum LocateError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// Failed to parse JSON response
    #[error("Failed to parse JSON response: {0}")]
    ParseError(#[from] serde_json::Error),

    /// Service answered without usable coordinates
    #[error("IP location unavailable: {0}")]
    Unavailable(String),
}

/// Client for the IP geolocation service
#[derive(Debug, Clone)]
pub struct IpLocator {
    client: Client,
    url: String,
}

impl Default for IpLocator {
    fn default() -> Self {
        Self::new()
    }
}

impl IpLocator {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
            url: IPAPI_URL.to_string(),
        }
    }

    /// Use a different endpoint (used by tests)
    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Looks up the place associated with the caller's IP
    pub async fn locate(&self) -> Result<Place, LocateError> {
        let response = self.client.get(&self.url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(LocateError::Unavailable(format!("HTTP {}", status)));
        }

        let text = response.text().await?;
        let data: IpApiResponse = serde_json::from_str(&text)?;
        parse_response(data)
    }
}

fn parse_response(data: IpApiResponse) -> Result<Place, LocateError> {
    if data.error.unwrap_or(false) {
        return Err(LocateError::Unavailable(
            data.reason.unwrap_or_else(|| "unknown reason".to_string()),
        ));
    }

    let (Some(lat), Some(lon)) = (data.latitude, data.longitude) else {
        return Err(LocateError::Unavailable("missing coordinates".to_string()));
    };

    Ok(Place {
        name: data.city.unwrap_or_else(|| "Your location".to_string()),
        state: data.region.unwrap_or_default(),
        country: data.country_code.unwrap_or_default(),
        lat,
        lon,
    })
}

#[derive(Debug, Deserialize)]
struct IpApiResponse {
    city: Option<String>,
    region: Option<String>,
    country_code: Option<String>,
    latitude: Option<f64>,
    longitude: Option<f64>,
    #[serde(default)]
    error: Option<bool>,
    #[serde(default)]
    reason: Option<String>,
}
