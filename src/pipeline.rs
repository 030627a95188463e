//! Coordinate-driven load pipeline
//!
//! A load serves any unexpired weather for the coordinates straight away, then
//! fetches fresh weather and resolves the place concurrently. Each render is a
//! `LoadEvent` on a tokio channel; the receiver replaces its whole view per
//! event, so a cached render followed by a fresh one for the same coordinates
//! is harmless.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::cache::ExpiringCache;
use crate::data::{
    coord_key, IpLocator, NormalizedWeather, Place, ProviderError, UnitSystem, WeatherProvider,
    WEATHER_CACHE_TTL,
};

/// Store key of the last successfully loaded place
pub const LAST_PLACE_KEY: &str = "lastPlace";

/// Notice shown when a load fails and nothing could be rendered
pub const LOAD_FAILED_NOTICE: &str = "Sorry, couldn't fetch weather right now.";

/// Key under which the pipeline keeps the weather for a spot and unit system
pub fn pipeline_cache_key(lat: f64, lon: f64, units: UnitSystem) -> String {
    format!("weather:{},{}", coord_key(lat, lon), units.as_str())
}

/// Whether a render came from the store or from the provider
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Freshness {
    Cached,
    Fresh,
}

/// Messages sent from a load task to the view
#[derive(Debug, Clone)]
pub enum LoadEvent {
    /// A complete record to display in place of the current view
    Rendered {
        weather: NormalizedWeather,
        place: Place,
        freshness: Freshness,
    },
    /// Nothing could be shown for the requested coordinates
    Failed { notice: String },
}

/// How a load finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    /// Fresh data was rendered and persisted
    Fresh,
    /// The refresh failed but a cached render had already been shown
    StaleOnly,
    /// Nothing was rendered; a failure notice was sent
    Failed,
}

/// Where the initial place came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartupSource {
    LastViewed,
    IpLocated,
    Default,
}

/// Orchestrates cache, provider and persistence for coordinate loads
#[derive(Clone)]
pub struct LoadPipeline {
    provider: Arc<dyn WeatherProvider>,
    cache: ExpiringCache,
}

impl LoadPipeline {
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: ExpiringCache) -> Self {
        Self { provider, cache }
    }

    pub fn provider(&self) -> Arc<dyn WeatherProvider> {
        Arc::clone(&self.provider)
    }

    pub fn cache(&self) -> &ExpiringCache {
        &self.cache
    }

    /// The place persisted by the last successful load, if any
    pub fn last_place(&self) -> Option<Place> {
        self.cache.get(LAST_PLACE_KEY)
    }

    /// Picks the initial place: last viewed, else IP location, else the default
    pub async fn startup_place(&self, locator: &IpLocator) -> (Place, StartupSource) {
        if let Some(place) = self.last_place() {
            return (place, StartupSource::LastViewed);
        }

        match locator.locate().await {
            Ok(place) => (place, StartupSource::IpLocated),
            Err(e) => {
                tracing::warn!("IP location failed, using default place: {}", e);
                (Place::default_place(), StartupSource::Default)
            }
        }
    }

    /// Loads weather for coordinates, sending one or two renders to `events`
    ///
    /// `known` is the place the coordinates came from (a search result, the
    /// last place); without it the provider is asked to reverse geocode.
    pub async fn load_by_coords(
        &self,
        lat: f64,
        lon: f64,
        known: Option<Place>,
        units: UnitSystem,
        events: &mpsc::Sender<LoadEvent>,
    ) -> LoadOutcome {
        let key = pipeline_cache_key(lat, lon, units);

        let mut rendered = false;
        if let Some(weather) = self.cache.get::<NormalizedWeather>(&key) {
            tracing::debug!("Serving cached weather for {}", key);
            let place = self.best_known_place(known.as_ref(), lat, lon);
            rendered = events
                .send(LoadEvent::Rendered {
                    weather,
                    place,
                    freshness: Freshness::Cached,
                })
                .await
                .is_ok();
        }

        match self.fetch_fresh(lat, lon, known, units).await {
            Ok((weather, place)) => {
                tracing::info!(
                    "Loaded {} weather for {} ({})",
                    weather.source.as_str(),
                    place.display_name(),
                    coord_key(lat, lon)
                );
                self.persist(&key, &weather, &place, lat, lon);
                // A closed receiver means the view is gone; persistence still counts.
                let _ = events
                    .send(LoadEvent::Rendered {
                        weather,
                        place,
                        freshness: Freshness::Fresh,
                    })
                    .await;
                LoadOutcome::Fresh
            }
            Err(e) if rendered => {
                tracing::warn!("Refresh failed, keeping cached render: {}", e);
                LoadOutcome::StaleOnly
            }
            Err(e) => {
                tracing::error!("Weather load failed for {}: {}", coord_key(lat, lon), e);
                let _ = events
                    .send(LoadEvent::Failed {
                        notice: LOAD_FAILED_NOTICE.to_string(),
                    })
                    .await;
                LoadOutcome::Failed
            }
        }
    }

    /// Known place, else the last place at the same spot, else a coordinate label
    fn best_known_place(&self, known: Option<&Place>, lat: f64, lon: f64) -> Place {
        if let Some(place) = known {
            return place.clone();
        }
        self.last_place()
            .filter(|place| place.same_spot(lat, lon))
            .unwrap_or_else(|| Place::coordinate_label(lat, lon))
    }

    async fn fetch_fresh(
        &self,
        lat: f64,
        lon: f64,
        known: Option<Place>,
        units: UnitSystem,
    ) -> Result<(NormalizedWeather, Place), ProviderError> {
        let provider = &self.provider;
        let resolve_place = async move {
            match known {
                Some(place) => Ok(place),
                None => provider.reverse_geocode(lat, lon).await,
            }
        };

        futures::try_join!(provider.fetch_weather(lat, lon, units), resolve_place)
    }

    fn persist(&self, key: &str, weather: &NormalizedWeather, place: &Place, lat: f64, lon: f64) {
        if let Err(e) = self.cache.set(key, weather, Some(WEATHER_CACHE_TTL)) {
            tracing::warn!("Failed to cache weather under {}: {}", key, e);
        }

        let last = Place {
            lat,
            lon,
            ..place.clone()
        };
        if let Err(e) = self.cache.set(LAST_PLACE_KEY, &last, None) {
            tracing::warn!("Failed to persist last place: {}", e);
        }
    }
}
