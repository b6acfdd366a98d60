//! Persistent hit/miss counters
//!
//! Counts survive restarts by being written to the shared store under
//! `METRICS_KEY` after every change. Nothing records hits or misses
//! automatically: callers decide which lookups count.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crate::clock::Clock;
use crate::store::KeyValueStore;

/// Store key holding the persisted counters
pub const METRICS_KEY: &str = "cache_metrics";

/// Persisted form of the counters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MetricsSnapshot {
    pub hits: u64,
    pub misses: u64,
    /// Milliseconds since the epoch of the last change
    pub updated_at: i64,
}

/// Cumulative cache hit/miss counter
pub struct CacheMetrics {
    hits: AtomicU64,
    misses: AtomicU64,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
}

impl fmt::Debug for CacheMetrics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CacheMetrics")
            .field("hits", &self.hits())
            .field("misses", &self.misses())
            .finish_non_exhaustive()
    }
}

impl CacheMetrics {
    /// Creates a counter, restoring any previously persisted counts
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let metrics = Self {
            hits: AtomicU64::new(0),
            misses: AtomicU64::new(0),
            store,
            clock,
        };
        metrics.load_persisted();
        metrics
    }

    /// Restores counts from the store; leaves them untouched if nothing usable is stored
    pub fn load_persisted(&self) {
        let Ok(Some(raw)) = self.store.get_item(METRICS_KEY) else {
            return;
        };
        match serde_json::from_str::<MetricsSnapshot>(&raw) {
            Ok(snapshot) => {
                self.hits.store(snapshot.hits, Ordering::Relaxed);
                self.misses.store(snapshot.misses, Ordering::Relaxed);
            }
            Err(e) => tracing::debug!(error = %e, "ignoring unreadable cache metrics"),
        }
    }

    pub fn record_hit(&self) {
        self.hits.fetch_add(1, Ordering::Relaxed);
        self.persist();
    }

    pub fn record_miss(&self) {
        self.misses.fetch_add(1, Ordering::Relaxed);
        self.persist();
    }

    pub fn hits(&self) -> u64 {
        self.hits.load(Ordering::Relaxed)
    }

    pub fn misses(&self) -> u64 {
        self.misses.load(Ordering::Relaxed)
    }

    /// Percentage of recorded lookups that were hits, to one decimal place
    ///
    /// Returns 0 when nothing has been recorded.
    pub fn hit_rate(&self) -> f64 {
        let hits = self.hits();
        let total = hits + self.misses();
        if total == 0 {
            return 0.0;
        }
        (hits as f64 / total as f64 * 1000.0).round() / 10.0
    }

    /// Zeroes both counters and persists immediately
    pub fn reset(&self) {
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        self.persist();
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            hits: self.hits(),
            misses: self.misses(),
            updated_at: self.clock.now_ms(),
        }
    }

    fn persist(&self) {
        let result = serde_json::to_string(&self.snapshot())
            .map_err(|e| e.to_string())
            .and_then(|json| {
                self.store
                    .set_item(METRICS_KEY, &json)
                    .map_err(|e| e.to_string())
            });
        if let Err(e) = result {
            tracing::debug!(error = %e, "failed to persist cache metrics");
        }
    }
}
