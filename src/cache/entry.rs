//! Serialized form of a single cache entry

use serde::{Deserialize, Serialize};

/// A cached payload together with its freshness window
///
/// Stored as `{"data": ..., "storedAt": <ms since epoch>, "ttl": <ms>}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry<T> {
    /// The cached payload
    pub data: T,
    /// When the entry was written, in milliseconds since the Unix epoch
    pub stored_at: i64,
    /// How long the entry stays fresh after `stored_at`, in milliseconds
    pub ttl: u64,
}

impl<T> CacheEntry<T> {
    pub fn new(data: T, stored_at: i64, ttl: u64) -> Self {
        Self {
            data,
            stored_at,
            ttl,
        }
    }

    /// Milliseconds elapsed since the entry was written
    pub fn age_ms(&self, now_ms: i64) -> i64 {
        now_ms.saturating_sub(self.stored_at)
    }

    /// An entry is fresh while its age is at most its TTL (the boundary is fresh)
    pub fn is_fresh(&self, now_ms: i64) -> bool {
        let ttl = i64::try_from(self.ttl).unwrap_or(i64::MAX);
        self.age_ms(now_ms) <= ttl
    }

    pub fn is_stale(&self, now_ms: i64) -> bool {
        !self.is_fresh(now_ms)
    }

    /// Last instant, in milliseconds since the epoch, at which the entry is fresh
    pub fn expires_at(&self) -> i64 {
        let ttl = i64::try_from(self.ttl).unwrap_or(i64::MAX);
        self.stored_at.saturating_add(ttl)
    }
}
