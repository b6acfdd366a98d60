//! Namespaced TTL cache layered over a shared key-value store
//!
//! Each `LocalCache` owns one namespace and a default TTL. All caches share a
//! single physical `KeyValueStore`, isolated only by the `"<namespace>:"` key
//! prefix. Storage failures are logged and reported through `Outcome`; they
//! are never propagated as errors to the caller.

mod entry;
mod local;
mod metrics;
mod registry;

pub use entry::CacheEntry;
pub use local::{CacheStats, LocalCache, Outcome, DEFAULT_ASSUMED_QUOTA};
pub use metrics::{CacheMetrics, MetricsSnapshot, METRICS_KEY};
pub use registry::{CacheRegistry, Namespace, ParseNamespaceError};

use thiserror::Error;

use crate::store::StoreError;

/// Why a cache mutation did not take effect
#[derive(Debug, Error)]
pub enum CacheError {
    /// The underlying store rejected the operation
    #[error(transparent)]
    Store(#[from] StoreError),

    /// The payload could not be serialized to JSON
    #[error("failed to encode cache entry: {0}")]
    Encode(#[from] serde_json::Error),
}
