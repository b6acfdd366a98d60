//! Per-namespace TTL cache

use serde::de::{DeserializeOwned, IgnoredAny};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use super::{CacheEntry, CacheError};
use crate::clock::Clock;
use crate::store::KeyValueStore;

/// Storage size assumed by `stats()` when computing usage percentages (5 MiB)
///
/// This is an estimate of a typical browser storage quota, not a queried value.
pub const DEFAULT_ASSUMED_QUOTA: u64 = 5 * 1024 * 1024;

/// Result of a cache mutation
///
/// Distinguishes a mutation that changed the store from one that had nothing
/// to do, and carries the error when the store refused.
#[must_use]
#[derive(Debug)]
pub enum Outcome {
    /// The store was modified
    Done,
    /// Nothing needed to change (e.g. the key was already absent)
    NoOp,
    /// The store rejected the operation; the failure has already been logged
    Failed(CacheError),
}

impl Outcome {
    /// True unless the operation failed
    pub fn is_ok(&self) -> bool {
        !matches!(self, Outcome::Failed(_))
    }
}

/// Storage statistics for one namespace
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheStats {
    /// Number of keys in the namespace, including unparseable ones
    pub key_count: usize,
    /// Entries past their TTL that have not been removed yet
    pub expired_count: usize,
    /// Total length of the serialized, parseable entries
    pub total_size_bytes: u64,
    /// `total_size_bytes` in KiB, rounded to two decimals
    pub total_size_kb: f64,
    /// `total_size_bytes` as a whole percentage of the assumed quota
    pub storage_usage_percent: u64,
}

/// Cache for a single namespace over the shared store
///
/// Cloning is cheap and shares the underlying store and clock.
#[derive(Clone)]
pub struct LocalCache {
    namespace: String,
    default_ttl: Duration,
    assumed_quota: u64,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for LocalCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalCache")
            .field("namespace", &self.namespace)
            .field("default_ttl", &self.default_ttl)
            .field("assumed_quota", &self.assumed_quota)
            .finish_non_exhaustive()
    }
}

impl LocalCache {
    /// Creates a cache for `namespace` whose entries live for `default_ttl`
    pub fn new(
        namespace: impl Into<String>,
        default_ttl: Duration,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            namespace: namespace.into(),
            default_ttl,
            assumed_quota: DEFAULT_ASSUMED_QUOTA,
            store,
            clock,
        }
    }

    /// Overrides the quota used for `storage_usage_percent`
    pub fn with_assumed_quota(mut self, bytes: u64) -> Self {
        self.assumed_quota = bytes.max(1);
        self
    }

    pub fn namespace(&self) -> &str {
        &self.namespace
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    fn prefix(&self) -> String {
        format!("{}:", self.namespace)
    }

    fn namespaced(&self, key: &str) -> String {
        format!("{}:{}", self.namespace, key)
    }

    /// Stores `data` under `key`, fresh for `ttl` or the namespace default
    pub fn set<T: Serialize>(&self, key: &str, data: &T, ttl: Option<Duration>) -> Outcome {
        let ttl = ttl.unwrap_or(self.default_ttl);
        let entry = CacheEntry::new(data, self.clock.now_ms(), duration_ms(ttl));

        let result = serde_json::to_string(&entry)
            .map_err(CacheError::from)
            .and_then(|json| {
                self.store
                    .set_item(&self.namespaced(key), &json)
                    .map_err(CacheError::from)
            });

        match result {
            Ok(()) => Outcome::Done,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, key, error = %e, "cache write failed");
                Outcome::Failed(e)
            }
        }
    }

    /// Returns the payload for `key` if present and fresh
    ///
    /// A stale entry is removed from the store. An unparseable entry is treated
    /// as a miss and left for `cleanup()`.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let full_key = self.namespaced(key);
        let raw = self.read_raw(&full_key)?;

        let entry: CacheEntry<T> = match serde_json::from_str(&raw) {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!(namespace = %self.namespace, key, error = %e, "ignoring corrupted cache entry");
                return None;
            }
        };

        if entry.is_stale(self.clock.now_ms()) {
            if let Err(e) = self.store.remove_item(&full_key) {
                tracing::warn!(namespace = %self.namespace, key, error = %e, "failed to drop stale cache entry");
            }
            return None;
        }

        Some(entry.data)
    }

    /// Returns the stored entry for `key` without checking or enforcing freshness
    pub fn peek<T: DeserializeOwned>(&self, key: &str) -> Option<CacheEntry<T>> {
        let raw = self.read_raw(&self.namespaced(key))?;
        serde_json::from_str(&raw).ok()
    }

    /// Removes `key` from this namespace
    pub fn delete(&self, key: &str) -> Outcome {
        let full_key = self.namespaced(key);
        if let Ok(None) = self.store.get_item(&full_key) {
            return Outcome::NoOp;
        }

        match self.store.remove_item(&full_key) {
            Ok(()) => Outcome::Done,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, key, error = %e, "cache delete failed");
                Outcome::Failed(e.into())
            }
        }
    }

    /// Removes every key in this namespace
    ///
    /// Keeps going after a failed removal and reports the first failure.
    pub fn clear(&self) -> Outcome {
        let keys = match self.store_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "cache clear failed");
                return Outcome::Failed(e);
            }
        };

        if keys.is_empty() {
            return Outcome::NoOp;
        }

        let mut failure = None;
        for full_key in keys {
            if let Err(e) = self.store.remove_item(&full_key) {
                tracing::warn!(namespace = %self.namespace, key = %full_key, error = %e, "cache clear failed");
                if failure.is_none() {
                    failure = Some(e);
                }
            }
        }

        match failure {
            Some(e) => Outcome::Failed(e.into()),
            None => Outcome::Done,
        }
    }

    /// Bare key names in this namespace, in store enumeration order
    pub fn keys(&self) -> Vec<String> {
        let prefix = self.prefix();
        match self.store_keys() {
            Ok(keys) => keys
                .into_iter()
                .filter_map(|k| k.strip_prefix(&prefix).map(str::to_string))
                .collect(),
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "failed to enumerate cache keys");
                Vec::new()
            }
        }
    }

    /// Computes size and expiry statistics without modifying the store
    pub fn stats(&self) -> CacheStats {
        let now = self.clock.now_ms();
        let key_count = self.keys().len();
        let mut expired_count = 0;
        let mut total_size_bytes = 0u64;

        for full_key in self.store_keys().unwrap_or_default() {
            let Some(raw) = self.read_raw(&full_key) else {
                continue;
            };
            let Ok(entry) = serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw) else {
                continue;
            };
            total_size_bytes += raw.len() as u64;
            if entry.is_stale(now) {
                expired_count += 1;
            }
        }

        let kb = total_size_bytes as f64 / 1024.0;
        CacheStats {
            key_count,
            expired_count,
            total_size_bytes,
            total_size_kb: (kb * 100.0).round() / 100.0,
            storage_usage_percent: (total_size_bytes as f64 / self.assumed_quota as f64 * 100.0)
                .round() as u64,
        }
    }

    /// Deletes every stale or unparseable entry in this namespace
    ///
    /// Returns how many entries were actually removed.
    pub fn cleanup(&self) -> usize {
        let now = self.clock.now_ms();
        let keys = match self.store_keys() {
            Ok(keys) => keys,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, error = %e, "cache cleanup could not enumerate keys");
                return 0;
            }
        };

        let mut removed = 0;
        for full_key in keys {
            let Some(raw) = self.read_raw(&full_key) else {
                continue;
            };
            let expired = match serde_json::from_str::<CacheEntry<IgnoredAny>>(&raw) {
                Ok(entry) => entry.is_stale(now),
                Err(_) => true,
            };
            if !expired {
                continue;
            }
            match self.store.remove_item(&full_key) {
                Ok(()) => removed += 1,
                Err(e) => {
                    tracing::warn!(namespace = %self.namespace, key = %full_key, error = %e, "cache cleanup failed to remove entry");
                }
            }
        }
        removed
    }

    /// Full store keys belonging to this namespace
    fn store_keys(&self) -> Result<Vec<String>, CacheError> {
        let prefix = self.prefix();
        let keys = self.store.keys()?;
        Ok(keys.into_iter().filter(|k| k.starts_with(&prefix)).collect())
    }

    /// Reads a raw value, logging and hiding store failures
    fn read_raw(&self, full_key: &str) -> Option<String> {
        match self.store.get_item(full_key) {
            Ok(raw) => raw,
            Err(e) => {
                tracing::warn!(namespace = %self.namespace, key = %full_key, error = %e, "cache read failed");
                None
            }
        }
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`
fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}
