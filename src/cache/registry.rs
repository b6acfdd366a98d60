//! Logical cache partitions and the caches built for them

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

use super::{LocalCache, DEFAULT_ASSUMED_QUOTA};
use crate::clock::Clock;
use crate::store::KeyValueStore;

/// A logical cache partition sharing the physical store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Namespace {
    /// Stock levels per product and department
    Inventory,
    /// Task lists by department and time slot
    Tasks,
    /// Product catalogue
    Products,
    /// Expiry and low-stock alerts
    Alerts,
    /// Staff profiles
    Users,
}

/// Error returned when a string names no known namespace
#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid namespace: '{0}'. Valid namespaces: inventory, tasks, products, alerts, users")]
pub struct ParseNamespaceError(pub String);

impl Namespace {
    /// Every namespace, in cleanup order
    pub const ALL: [Namespace; 5] = [
        Namespace::Inventory,
        Namespace::Tasks,
        Namespace::Products,
        Namespace::Alerts,
        Namespace::Users,
    ];

    /// Key prefix used in the shared store
    pub fn as_str(&self) -> &'static str {
        match self {
            Namespace::Inventory => "inventory",
            Namespace::Tasks => "tasks",
            Namespace::Products => "products",
            Namespace::Alerts => "alerts",
            Namespace::Users => "users",
        }
    }

    /// How long entries in this namespace stay fresh unless overridden
    pub fn default_ttl(&self) -> Duration {
        let minutes = match self {
            Namespace::Inventory => 5,
            Namespace::Tasks => 2,
            Namespace::Products => 30,
            Namespace::Alerts => 1,
            Namespace::Users => 15,
        };
        Duration::from_secs(minutes * 60)
    }
}

impl fmt::Display for Namespace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Namespace {
    type Err = ParseNamespaceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Namespace::ALL
            .into_iter()
            .find(|ns| ns.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| ParseNamespaceError(s.to_string()))
    }
}

/// One `LocalCache` per namespace over a single shared store
///
/// Built once at the application root and passed to whoever needs a cache.
#[derive(Debug, Clone)]
pub struct CacheRegistry {
    caches: Vec<(Namespace, LocalCache)>,
}

impl CacheRegistry {
    /// Builds caches with each namespace's default TTL
    pub fn new(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        Self::with_settings(store, clock, &HashMap::new(), DEFAULT_ASSUMED_QUOTA)
    }

    /// Builds caches applying per-namespace TTL overrides and an assumed storage quota
    pub fn with_settings(
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
        ttl_overrides: &HashMap<Namespace, Duration>,
        assumed_quota: u64,
    ) -> Self {
        let caches = Namespace::ALL
            .into_iter()
            .map(|ns| {
                let ttl = ttl_overrides
                    .get(&ns)
                    .copied()
                    .unwrap_or_else(|| ns.default_ttl());
                let cache = LocalCache::new(ns.as_str(), ttl, store.clone(), clock.clone())
                    .with_assumed_quota(assumed_quota);
                (ns, cache)
            })
            .collect();
        Self { caches }
    }

    /// The cache for `namespace`
    pub fn cache(&self, namespace: Namespace) -> &LocalCache {
        // Caches are built in `Namespace::ALL` order, which matches declaration order
        &self.caches[namespace as usize].1
    }

    pub fn iter(&self) -> impl Iterator<Item = (Namespace, &LocalCache)> {
        self.caches.iter().map(|(ns, cache)| (*ns, cache))
    }

    /// Clones of every cache, e.g. for handing to the cleanup scheduler
    pub fn caches(&self) -> Vec<LocalCache> {
        self.caches.iter().map(|(_, cache)| cache.clone()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn create_registry(overrides: &HashMap<Namespace, Duration>) -> CacheRegistry {
        CacheRegistry::with_settings(
            Arc::new(MemoryStore::new()),
            Arc::new(ManualClock::new(0)),
            overrides,
            DEFAULT_ASSUMED_QUOTA,
        )
    }

    #[test]
    fn test_parse_namespace() {
        assert_eq!("tasks".parse::<Namespace>(), Ok(Namespace::Tasks));
        assert_eq!("Inventory".parse::<Namespace>(), Ok(Namespace::Inventory));
        let err = "bakery".parse::<Namespace>().unwrap_err();
        assert!(err.to_string().contains("bakery"));
    }

    #[test]
    fn test_display_matches_prefix() {
        for ns in Namespace::ALL {
            assert_eq!(ns.to_string().parse::<Namespace>(), Ok(ns));
        }
    }

    #[test]
    fn test_registry_uses_default_ttls() {
        let registry = create_registry(&HashMap::new());

        assert_eq!(
            registry.cache(Namespace::Alerts).default_ttl(),
            Duration::from_secs(60)
        );
        assert_eq!(registry.cache(Namespace::Users).namespace(), "users");
        assert_eq!(registry.iter().count(), 5);
    }

    #[test]
    fn test_registry_applies_overrides() {
        let overrides = HashMap::from([(Namespace::Tasks, Duration::from_secs(7))]);
        let registry = create_registry(&overrides);

        assert_eq!(
            registry.cache(Namespace::Tasks).default_ttl(),
            Duration::from_secs(7)
        );
        assert_eq!(
            registry.cache(Namespace::Products).default_ttl(),
            Namespace::Products.default_ttl()
        );
    }

    #[test]
    fn test_registry_caches_share_one_store() {
        let registry = create_registry(&HashMap::new());
        let _ = registry.cache(Namespace::Tasks).set("k", &1, None);

        assert_eq!(registry.cache(Namespace::Tasks).get::<i32>("k"), Some(1));
        assert!(registry.cache(Namespace::Inventory).get::<i32>("k").is_none());
    }
}
