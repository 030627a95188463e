//! Expiring cache for persisting provider responses and app state to disk
//!
//! Provides an `ExpiringCache` that stores serializable values as JSON files with
//! an optional expiry timestamp. Expired entries are purged lazily on read.

use chrono::Utc;
use directories::ProjectDirs;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when writing to the cache
#[derive(Debug, Error)]
pub enum CacheError {
    /// Directory creation or file write failed
    #[error("Cache I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// Value could not be serialized to JSON
    #[error("Failed to serialize cache entry: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Wrapper struct for cached values stored on disk
#[derive(Debug, Serialize, Deserialize)]
struct CacheEntry<T> {
    /// The cached value
    value: T,
    /// Expiry as epoch milliseconds; `None` never expires
    expiry: Option<i64>,
}

/// Key-value store with per-entry time-to-live
///
/// Each key maps to one JSON file in the cache directory (`~/.cache/wxdash/` on
/// Linux). Reads never fail: a missing, corrupt, or expired entry reads as absent,
/// and an expired entry is deleted as part of that read.
#[derive(Debug, Clone)]
pub struct ExpiringCache {
    /// Directory where cache files are stored
    cache_dir: PathBuf,
}

impl ExpiringCache {
    /// Creates a new cache using the XDG-compliant cache directory
    ///
    /// Returns `None` if the cache directory cannot be determined (e.g., no home directory).
    pub fn new() -> Option<Self> {
        let project_dirs = ProjectDirs::from("", "", "wxdash")?;
        let cache_dir = project_dirs.cache_dir().to_path_buf();
        Some(Self { cache_dir })
    }

    /// Creates a new cache rooted at a custom directory
    pub fn with_dir(cache_dir: PathBuf) -> Self {
        Self { cache_dir }
    }

    /// Directory backing this cache
    pub fn dir(&self) -> &Path {
        &self.cache_dir
    }

    /// Returns the path to the file holding `key`
    fn entry_path(&self, key: &str) -> PathBuf {
        self.cache_dir.join(format!("{}.json", file_stem(key)))
    }

    /// Stores `value` under `key`, replacing any existing entry
    ///
    /// # Arguments
    /// * `key` - Cache key (e.g., "weather:12.97,77.59,metric")
    /// * `value` - The value to cache
    /// * `ttl` - How long the entry stays readable; `None` never expires
    pub fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        fs::create_dir_all(&self.cache_dir)?;

        let expiry = ttl.map(|ttl| {
            let ttl_ms = i64::try_from(ttl.as_millis()).unwrap_or(i64::MAX);
            Utc::now().timestamp_millis().saturating_add(ttl_ms)
        });
        let entry = CacheEntry { value, expiry };
        let json = serde_json::to_string(&entry)?;

        fs::write(self.entry_path(key), json)?;
        Ok(())
    }

    /// Reads the value stored under `key`
    ///
    /// Returns `None` when the entry is missing, cannot be parsed as `T`, or has
    /// expired. Expired entries are removed from disk before returning.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let path = self.entry_path(key);
        let content = fs::read_to_string(&path).ok()?;
        let entry: CacheEntry<serde_json::Value> = match serde_json::from_str(&content) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("Ignoring malformed cache entry {}: {}", key, e);
                return None;
            }
        };

        if let Some(expiry) = entry.expiry {
            if Utc::now().timestamp_millis() > expiry {
                tracing::debug!("Cache entry {} expired, purging", key);
                if let Err(e) = fs::remove_file(&path) {
                    tracing::warn!("Failed to purge expired cache entry {}: {}", key, e);
                }
                return None;
            }
        }

        serde_json::from_value(entry.value).ok()
    }

    /// Deletes the entry for `key`; a missing entry is not an error
    pub fn remove(&self, key: &str) -> Result<(), CacheError> {
        match fs::remove_file(self.entry_path(key)) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// Longest escaped stem kept verbatim; well under the usual 255-byte name limit
const MAX_STEM_LEN: usize = 200;

/// Escapes a cache key into a portable file name
///
/// ASCII alphanumerics, `-`, `_` and `.` pass through; every other byte becomes `%XX`.
/// Stems longer than `MAX_STEM_LEN` keep a readable prefix and end in the
/// SHA-256 of the whole key.
fn file_stem(key: &str) -> String {
    let mut stem = String::with_capacity(key.len());
    for byte in key.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' => {
                stem.push(byte as char)
            }
            _ => stem.push_str(&format!("%{:02X}", byte)),
        }
    }

    if stem.len() <= MAX_STEM_LEN {
        return stem;
    }

    let digest = hex::encode(Sha256::digest(key.as_bytes()));
    // the escaped stem is pure ASCII, so any byte index is a char boundary
    stem.truncate(MAX_STEM_LEN - digest.len() - 1);
    stem.push('~');
    stem.push_str(&digest);
    stem
}
