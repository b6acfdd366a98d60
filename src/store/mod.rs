//! Persistent key-value substrate underneath the cache
//!
//! The cache core talks to storage through the synchronous `KeyValueStore`
//! trait, which mirrors browser-style persistent storage: string keys, string
//! values, full key enumeration and a byte quota that can reject writes.
//! Two implementations are provided: an in-memory store and a directory of
//! JSON files in the XDG cache location.

mod file;
mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use thiserror::Error;

/// Errors raised by a key-value store
#[derive(Debug, Error)]
pub enum StoreError {
    /// Filesystem read or write failed
    #[error("storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    /// The write would push the store past its byte quota
    #[error("storage quota exceeded: {needed} bytes needed, quota is {quota} bytes")]
    QuotaExceeded { needed: u64, quota: u64 },

    /// A previous holder of the store lock panicked
    #[error("storage lock poisoned")]
    Poisoned,
}

/// Synchronous string key-value storage shared by every cache namespace
///
/// Implementations are namespace-agnostic; isolation between caches is purely
/// a key-prefix convention applied by the caller.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, or `None` if absent
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Stores `value` under `key`, replacing any previous value
    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Removes `key`. Removing an absent key succeeds.
    fn remove_item(&self, key: &str) -> Result<(), StoreError>;

    /// Enumerates every key currently in the store
    fn keys(&self) -> Result<Vec<String>, StoreError>;
}
