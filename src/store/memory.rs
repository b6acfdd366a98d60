//! In-process store with optional quota

use std::sync::Mutex;

use super::{KeyValueStore, StoreError};

/// Insertion-ordered in-memory store
///
/// Overwriting a key keeps its original position in the enumeration order.
/// When a quota is set, the sum of key and value lengths may not exceed it.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<Vec<(String, String)>>,
    quota: Option<u64>,
}

impl MemoryStore {
    /// Creates an empty store without a quota
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty store that rejects writes beyond `quota` bytes
    pub fn with_quota(quota: u64) -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
            quota: Some(quota),
        }
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;

        if let Some(quota) = self.quota {
            let others: usize = entries
                .iter()
                .filter(|(k, _)| k != key)
                .map(|(k, v)| k.len() + v.len())
                .sum();
            let needed = (others + key.len() + value.len()) as u64;
            if needed > quota {
                return Err(StoreError::QuotaExceeded { needed, quota });
            }
        }

        match entries.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => entries.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), StoreError> {
        let mut entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        entries.retain(|(k, _)| k != key);
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>, StoreError> {
        let entries = self.entries.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(entries.iter().map(|(k, _)| k.clone()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_get_missing_key_returns_none() {
        let store = MemoryStore::new();
        assert!(store.get_item("nope").unwrap().is_none());
    }

    #[test]
    fn test_set_then_get() {
        let store = MemoryStore::new();
        store.set_item("tasks:open", "[1,2]").unwrap();
        assert_eq!(store.get_item("tasks:open").unwrap().as_deref(), Some("[1,2]"));
    }

    #[test]
    fn test_keys_follow_insertion_order_across_overwrites() {
        let store = MemoryStore::new();
        store.set_item("b", "1").unwrap();
        store.set_item("a", "1").unwrap();
        store.set_item("b", "2").unwrap();

        assert_eq!(store.keys().unwrap(), vec!["b".to_string(), "a".to_string()]);
        assert_eq!(store.get_item("b").unwrap().as_deref(), Some("2"));
    }

    #[test]
    fn test_remove_missing_key_is_ok() {
        let store = MemoryStore::new();
        store.set_item("a", "1").unwrap();
        store.remove_item("missing").unwrap();
        assert_eq!(store.keys().unwrap(), vec!["a".to_string()]);
    }

    #[test]
    fn test_quota_rejects_oversized_write() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "12345").unwrap();

        let err = store.set_item("j", "123456789").unwrap_err();
        assert!(matches!(err, StoreError::QuotaExceeded { quota: 10, .. }));
        assert!(store.get_item("j").unwrap().is_none());
    }

    #[test]
    fn test_quota_counts_replaced_value_once() {
        let store = MemoryStore::with_quota(10);
        store.set_item("k", "123456789").unwrap();
        // Replacing the same key frees the old value first
        store.set_item("k", "987654321").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("987654321"));
    }
}
