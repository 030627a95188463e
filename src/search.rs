//! Debounced type-ahead place search
//!
//! Every dispatch bumps a generation counter and aborts the pending task.
//! A task sleeps for the quiet period, re-checks its generation, geocodes, and
//! only reports results that are still the latest. Receivers should also check
//! `is_current`, since a message can be in flight when a newer dispatch lands.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::data::{Place, WeatherProvider};

/// Quiet period after the last keystroke before geocoding
pub const SEARCH_DEBOUNCE: Duration = Duration::from_millis(250);

/// Shorter queries clear the suggestion list
pub const MIN_QUERY_CHARS: usize = 2;

/// Maximum suggestions requested from the geocoder
pub const SUGGESTION_LIMIT: usize = 8;

/// Messages sent from search tasks to the view
#[derive(Debug, Clone, PartialEq)]
pub enum SearchMessage {
    Suggestions {
        generation: u64,
        query: String,
        places: Vec<Place>,
    },
    Cleared {
        generation: u64,
    },
}

impl SearchMessage {
    pub fn generation(&self) -> u64 {
        match self {
            SearchMessage::Suggestions { generation, .. } => *generation,
            SearchMessage::Cleared { generation } => *generation,
        }
    }
}

/// Owns the debounce timer and generation counter for one search box
pub struct SuggestionSearch {
    provider: Arc<dyn WeatherProvider>,
    sender: mpsc::Sender<SearchMessage>,
    generation: Arc<AtomicU64>,
    pending: Option<JoinHandle<()>>,
    debounce: Duration,
}

impl SuggestionSearch {
    pub fn new(provider: Arc<dyn WeatherProvider>, sender: mpsc::Sender<SearchMessage>) -> Self {
        Self {
            provider,
            sender,
            generation: Arc::new(AtomicU64::new(0)),
            pending: None,
            debounce: SEARCH_DEBOUNCE,
        }
    }

    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    /// Schedules a lookup for `query`, superseding any earlier one
    ///
    /// Returns the generation assigned to this dispatch.
    pub fn dispatch(&mut self, query: &str) -> u64 {
        let generation = self.supersede();
        let query = query.trim().to_string();

        if query.chars().count() < MIN_QUERY_CHARS {
            if let Err(e) = self.sender.try_send(SearchMessage::Cleared { generation }) {
                tracing::debug!("Dropped search clear: {}", e);
            }
            return generation;
        }

        let provider = Arc::clone(&self.provider);
        let sender = self.sender.clone();
        let latest = Arc::clone(&self.generation);
        let debounce = self.debounce;

        self.pending = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            if latest.load(Ordering::SeqCst) != generation {
                return;
            }

            match provider.geocode(&query, SUGGESTION_LIMIT).await {
                Ok(places) => {
                    if latest.load(Ordering::SeqCst) == generation {
                        let _ = sender
                            .send(SearchMessage::Suggestions {
                                generation,
                                query,
                                places,
                            })
                            .await;
                    }
                }
                // Suggestions are best effort
                Err(e) => tracing::debug!("Suggestion lookup for {:?} failed: {}", query, e),
            }
        }));

        generation
    }

    /// Drops any pending lookup without scheduling a new one
    pub fn cancel(&mut self) {
        self.supersede();
    }

    /// Whether `generation` belongs to the most recent dispatch
    pub fn is_current(&self, generation: u64) -> bool {
        self.generation.load(Ordering::SeqCst) == generation
    }

    fn supersede(&mut self) -> u64 {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }
}

impl Drop for SuggestionSearch {
    fn drop(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }
}
