//! Persisted user settings and provider selection
//!
//! Settings live in the same key-value store as cached data, under the keys
//! `units`, `theme` and `userName`, without expiry.

use std::sync::Arc;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cache::{CacheError, ExpiringCache};
use crate::data::{OpenWeatherProvider, UnitSystem, WeatherApiProvider, WeatherProvider};

pub const UNITS_KEY: &str = "units";
pub const THEME_KEY: &str = "theme";
pub const USER_NAME_KEY: &str = "userName";

/// Error types for configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The selected provider needs an API key that was not supplied
    #[error("No API key for {provider}; pass --{flag} or set {env}")]
    MissingApiKey {
        provider: &'static str,
        flag: &'static str,
        env: &'static str,
    },

    /// Settings could not be written
    #[error("Failed to save settings: {0}")]
    Save(#[from] CacheError),

    /// No cache directory could be determined
    #[error("Could not determine a cache directory; pass --cache-dir")]
    NoCacheDir,
}

/// Color scheme
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

impl Theme {
    pub fn toggled(self) -> Self {
        match self {
            Theme::Light => Theme::Dark,
            Theme::Dark => Theme::Light,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Light => "light",
            Theme::Dark => "dark",
        }
    }
}

/// User preferences, loaded once at startup and saved on change
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Settings {
    pub units: UnitSystem,
    pub theme: Theme,
    /// Name used in the greeting; empty for none
    pub user_name: String,
}

impl Settings {
    /// Reads settings, defaulting any that are missing or unreadable
    pub fn load(cache: &ExpiringCache) -> Self {
        Self {
            units: cache.get(UNITS_KEY).unwrap_or_default(),
            theme: cache.get(THEME_KEY).unwrap_or_default(),
            user_name: cache.get(USER_NAME_KEY).unwrap_or_default(),
        }
    }

    pub fn save(&self, cache: &ExpiringCache) -> Result<(), ConfigError> {
        cache.set(UNITS_KEY, &self.units, None)?;
        cache.set(THEME_KEY, &self.theme, None)?;
        cache.set(USER_NAME_KEY, &self.user_name.trim(), None)?;
        Ok(())
    }

    pub fn toggle_units(&mut self) -> UnitSystem {
        self.units = self.units.toggled();
        self.units
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = self.theme.toggled();
        self.theme
    }
}

/// Which upstream service supplies weather and geocoding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ProviderKind {
    /// WeatherAPI.com with Nominatim geocoding
    #[default]
    #[value(name = "weatherapi")]
    WeatherApi,
    /// OpenWeatherMap One Call with 3-hour fallback
    #[value(name = "openweather")]
    OpenWeather,
}

impl ProviderKind {
    fn key_source(&self) -> (&'static str, &'static str, &'static str) {
        match self {
            ProviderKind::WeatherApi => ("WeatherAPI", "weatherapi-key", "WEATHERAPI_KEY"),
            ProviderKind::OpenWeather => {
                ("OpenWeatherMap", "openweather-key", "OPENWEATHER_API_KEY")
            }
        }
    }
}

/// Builds the adapter for `kind`, backed by `cache`
pub fn build_provider(
    kind: ProviderKind,
    api_key: Option<&str>,
    cache: ExpiringCache,
) -> Result<Arc<dyn WeatherProvider>, ConfigError> {
    let Some(key) = api_key.map(str::trim).filter(|k| !k.is_empty()) else {
        let (provider, flag, env) = kind.key_source();
        return Err(ConfigError::MissingApiKey {
            provider,
            flag,
            env,
        });
    };

    let provider: Arc<dyn WeatherProvider> = match kind {
        ProviderKind::WeatherApi => Arc::new(WeatherApiProvider::new(key).with_cache(cache)),
        ProviderKind::OpenWeather => Arc::new(OpenWeatherProvider::new(key).with_cache(cache)),
    };
    Ok(provider)
}
