//! Cache module for storing provider responses and app state on disk
//!
//! This module provides an expiring key-value cache that persists JSON values to the
//! filesystem with optional per-entry TTLs. Expiry is lazy: an expired entry is
//! deleted the next time it is read, and corrupt entries read as cache misses.

mod manager;

pub use manager::{CacheError, ExpiringCache};
