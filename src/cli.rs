//! Command-line interface parsing for wxdash
//!
//! Flags choose the provider and its key, the starting place, display units
//! and locale, and whether to run the dashboard or print it once and exit.

use std::path::PathBuf;

use chrono::Locale;
use clap::Parser;
use thiserror::Error;

use crate::config::ProviderKind;
use crate::data::UnitSystem;
use crate::render::locale_from_tag;

/// Error types for CLI argument parsing
#[derive(Debug, Error)]
pub enum CliError {
    /// The unit system name is not recognized
    #[error("Invalid units: '{0}'. Valid units: metric, imperial")]
    InvalidUnits(String),

    /// The coordinates are malformed or out of range
    #[error("Invalid coordinates: '{0}'. Expected LAT,LON with -90..90 and -180..180")]
    InvalidCoords(String),

    /// The locale tag has no known date formats
    #[error("Unknown locale: '{0}'. Examples: en_US, de_DE, fr_FR")]
    InvalidLocale(String),

    /// A place search was requested with an empty query
    #[error("Place query must not be empty")]
    EmptyPlace,
}

/// wxdash - current weather and a 6-day forecast in the terminal
#[derive(Parser, Debug)]
#[command(name = "wxdash")]
#[command(about = "Terminal weather dashboard backed by WeatherAPI or OpenWeatherMap")]
#[command(version)]
pub struct Cli {
    /// Weather and geocoding provider
    #[arg(long, value_enum, env = "WXDASH_PROVIDER", default_value_t = ProviderKind::WeatherApi)]
    pub provider: ProviderKind,

    /// API key for WeatherAPI.com
    #[arg(long, env = "WEATHERAPI_KEY", hide_env_values = true)]
    pub weatherapi_key: Option<String>,

    /// API key for OpenWeatherMap
    #[arg(long, env = "OPENWEATHER_API_KEY", hide_env_values = true)]
    pub openweather_key: Option<String>,

    /// Start at the first geocoding match for a place name
    ///
    /// Examples:
    ///   wxdash --place "London"
    ///   wxdash --place "Springfield, IL"
    #[arg(long, value_name = "QUERY", conflicts_with_all = ["coords", "here"])]
    pub place: Option<String>,

    /// Start at explicit coordinates, e.g. --coords=-33.87,151.21
    #[arg(long, value_name = "LAT,LON", allow_hyphen_values = true, conflicts_with = "here")]
    pub coords: Option<String>,

    /// Start at the location of this machine's public IP address
    #[arg(long)]
    pub here: bool,

    /// Display units (saved as the new default)
    ///
    /// Valid units: metric, imperial
    #[arg(long, value_name = "UNITS")]
    pub units: Option<String>,

    /// Locale for weekday and month names
    #[arg(long, value_name = "LOCALE", default_value = "en_US")]
    pub locale: String,

    /// Print the dashboard to stdout and exit instead of starting the TUI
    #[arg(long)]
    pub once: bool,

    /// Directory for cached responses and settings (defaults to the XDG cache dir)
    #[arg(long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,
}

/// Where the first load should point
#[derive(Debug, Clone, PartialEq)]
pub enum StartTarget {
    /// Last viewed place, else IP location, else the default place
    Remembered,
    /// First geocoding result for a query
    Search(String),
    Coords { lat: f64, lon: f64 },
    /// IP location, falling back to the remembered place
    Here,
}

/// Configuration derived from CLI arguments for application startup
#[derive(Debug, Clone)]
pub struct StartupConfig {
    pub provider: ProviderKind,
    /// Key for the selected provider, if one was given
    pub api_key: Option<String>,
    pub target: StartTarget,
    /// Unit override; `None` keeps the saved setting
    pub units: Option<UnitSystem>,
    pub locale: Locale,
    pub once: bool,
    pub cache_dir: Option<PathBuf>,
}

/// Parses a unit system argument
pub fn parse_units_arg(s: &str) -> Result<UnitSystem, CliError> {
    UnitSystem::from_name(s).ok_or_else(|| CliError::InvalidUnits(s.to_string()))
}

/// Parses "LAT,LON" into a coordinate pair within valid ranges
pub fn parse_coords_arg(s: &str) -> Result<(f64, f64), CliError> {
    let invalid = || CliError::InvalidCoords(s.to_string());

    let (lat, lon) = s.split_once(',').ok_or_else(invalid)?;
    let lat: f64 = lat.trim().parse().map_err(|_| invalid())?;
    let lon: f64 = lon.trim().parse().map_err(|_| invalid())?;

    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(invalid());
    }
    Ok((lat, lon))
}

/// Parses a locale tag such as "en_US" or "de-DE.UTF-8"
pub fn parse_locale_arg(s: &str) -> Result<Locale, CliError> {
    locale_from_tag(s).ok_or_else(|| CliError::InvalidLocale(s.to_string()))
}

impl StartupConfig {
    /// Creates a StartupConfig from parsed CLI arguments.
    ///
    /// # Returns
    /// * `Ok(StartupConfig)` with validated units, coordinates and locale
    /// * `Err(CliError)` if any of them is malformed
    pub fn from_cli(cli: &Cli) -> Result<Self, CliError> {
        let target = if let Some(query) = &cli.place {
            let query = query.trim();
            if query.is_empty() {
                return Err(CliError::EmptyPlace);
            }
            StartTarget::Search(query.to_string())
        } else if let Some(coords) = &cli.coords {
            let (lat, lon) = parse_coords_arg(coords)?;
            StartTarget::Coords { lat, lon }
        } else if cli.here {
            StartTarget::Here
        } else {
            StartTarget::Remembered
        };

        let units = cli.units.as_deref().map(parse_units_arg).transpose()?;

        let api_key = match cli.provider {
            ProviderKind::WeatherApi => cli.weatherapi_key.clone(),
            ProviderKind::OpenWeather => cli.openweather_key.clone(),
        };

        Ok(StartupConfig {
            provider: cli.provider,
            api_key,
            target,
            units,
            locale: parse_locale_arg(&cli.locale)?,
            once: cli.once,
            cache_dir: cli.cache_dir.clone(),
        })
    }
}
