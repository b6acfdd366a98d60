//! Read-through wrapper around remote fetches with offline fallback
//!
//! A fresh cache hit never reaches the network. On a miss the wrapper either
//! serves the last stored entry regardless of age (offline, or the call
//! failed outright) or performs the call and caches successful data.
//!
//! Concurrent misses for the same key are not de-duplicated: each one calls
//! the remote function and the last write to the cache wins.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::future::Future;

use crate::cache::{LocalCache, Outcome};
use crate::connectivity::OnlineStatus;
use crate::remote::{RemoteError, RemoteResponse};

/// Uniform result of a cached call
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallOutcome<T> {
    pub data: Option<T>,
    pub error: Option<RemoteError>,
    /// The data came from the local cache rather than the remote call
    pub from_cache: bool,
    /// The cached data was past its TTL when served
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub expired: bool,
}

impl<T> CallOutcome<T> {
    fn fresh_hit(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            from_cache: true,
            expired: false,
        }
    }

    fn stale_hit(data: T) -> Self {
        Self {
            data: Some(data),
            error: None,
            from_cache: true,
            expired: true,
        }
    }

    fn failed(error: RemoteError) -> Self {
        Self {
            data: None,
            error: Some(error),
            from_cache: false,
            expired: false,
        }
    }

    fn remote(response: RemoteResponse<T>) -> Self {
        Self {
            data: response.data,
            error: response.error,
            from_cache: false,
            expired: false,
        }
    }
}

/// Wraps remote calls with caching, reading connectivity from a shared flag
#[derive(Debug, Clone)]
pub struct CachedClient {
    status: OnlineStatus,
}

impl CachedClient {
    pub fn new(status: OnlineStatus) -> Self {
        Self { status }
    }

    pub fn is_online(&self) -> bool {
        self.status.is_online()
    }

    /// Serves `key` from `cache`, falling back to `remote` on a miss
    ///
    /// # Behavior
    /// 1. A fresh cached value is returned without calling `remote`
    /// 2. Offline: the stored entry is returned regardless of age, or an
    ///    `OFFLINE` error if nothing is stored
    /// 3. Online: `remote` is awaited; successful data is cached with the
    ///    namespace TTL, an envelope error is passed through uncached, and a
    ///    failed call falls back to the stored entry if there is one
    pub async fn cached_call<T, F, Fut>(
        &self,
        cache: &LocalCache,
        key: &str,
        remote: F,
    ) -> CallOutcome<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<RemoteResponse<T>, RemoteError>>,
    {
        if let Some(data) = cache.get::<T>(key) {
            return CallOutcome::fresh_hit(data);
        }

        if !self.is_online() {
            return stale_fallback(cache, key).unwrap_or_else(|| CallOutcome::failed(RemoteError::offline()));
        }

        match remote().await {
            Ok(response) => {
                if response.error.is_none() {
                    if let Some(data) = &response.data {
                        let _ = cache.set(key, data, None);
                    }
                }
                CallOutcome::remote(response)
            }
            Err(error) => {
                tracing::warn!(namespace = cache.namespace(), key, %error, "remote call failed");
                stale_fallback(cache, key).unwrap_or_else(|| CallOutcome::failed(error))
            }
        }
    }

    /// Drops the cached copy of `key`, e.g. after the remote row was modified
    pub fn invalidate(&self, cache: &LocalCache, key: &str) -> Outcome {
        cache.delete(key)
    }

    /// Drops every cached entry in `cache`'s namespace
    pub fn invalidate_all(&self, cache: &LocalCache) -> Outcome {
        cache.clear()
    }
}

/// Serves whatever entry is stored for `key`, ignoring its age
fn stale_fallback<T: DeserializeOwned>(cache: &LocalCache, key: &str) -> Option<CallOutcome<T>> {
    cache
        .peek::<T>(key)
        .map(|entry| CallOutcome::stale_hit(entry.data))
}
