//! Application root wiring the cache stack together
//!
//! `App` owns the shared store, the namespace caches, the metrics counter and
//! the cached-call wrapper, and executes CLI commands against them. Nothing
//! here is global: everything is built from a `CacheConfig` and handed down.

use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;

use crate::cache::{CacheMetrics, CacheRegistry, LocalCache, Namespace, Outcome};
use crate::cached_client::{CallOutcome, CachedClient};
use crate::cleanup::{self, CleanupConfig, CleanupHandle};
use crate::cli::{CliError, Command};
use crate::clock::{Clock, SystemClock};
use crate::config::CacheConfig;
use crate::connectivity::OnlineStatus;
use crate::remote::{RemoteError, RestClient};
use crate::store::KeyValueStore;

/// Main application struct owning the cache stack
pub struct App {
    registry: CacheRegistry,
    metrics: CacheMetrics,
    client: CachedClient,
    rest: Option<RestClient>,
    cleanup: CleanupConfig,
}

impl App {
    /// Creates an App over the file store described by `config`
    pub fn new(config: &CacheConfig) -> Result<Self, CliError> {
        let store = Arc::new(config.open_store()?);
        Ok(Self::with_store(config, store, Arc::new(SystemClock)))
    }

    /// Creates an App over a custom store and clock
    pub fn with_store(
        config: &CacheConfig,
        store: Arc<dyn KeyValueStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let registry = CacheRegistry::with_settings(
            store.clone(),
            clock.clone(),
            &config.ttl_overrides,
            config.assumed_quota,
        );
        let rest = config
            .backend
            .as_ref()
            .map(|backend| RestClient::new(&backend.url, &backend.api_key));

        Self {
            registry,
            metrics: CacheMetrics::new(store, clock),
            client: CachedClient::new(OnlineStatus::new(config.start_online)),
            rest,
            cleanup: config.cleanup.clone(),
        }
    }

    pub fn registry(&self) -> &CacheRegistry {
        &self.registry
    }

    pub fn metrics(&self) -> &CacheMetrics {
        &self.metrics
    }

    /// Executes a command, returning its JSON report
    pub async fn run(&self, command: Command) -> Result<Value, CliError> {
        match command {
            Command::Set {
                namespace,
                key,
                value,
                ttl_ms,
            } => {
                let data: Value = serde_json::from_str(&value)?;
                let ttl = ttl_ms.map(Duration::from_millis);
                match self.registry.cache(namespace).set(&key, &data, ttl) {
                    Outcome::Failed(e) => Err(e.into()),
                    _ => Ok(json!({ "stored": true })),
                }
            }
            Command::Get { namespace, key } => {
                let data = self.registry.cache(namespace).get::<Value>(&key);
                Ok(json!({ "data": data }))
            }
            Command::Peek { namespace, key } => {
                let entry = self.registry.cache(namespace).peek::<Value>(&key);
                Ok(serde_json::to_value(entry)?)
            }
            Command::Delete { namespace, key } => {
                outcome_report(self.registry.cache(namespace).delete(&key))
            }
            Command::Keys { namespace } => Ok(json!(self.registry.cache(namespace).keys())),
            Command::Clear { namespace } => outcome_report(self.registry.cache(namespace).clear()),
            Command::Stats { namespace } => {
                let mut report = serde_json::Map::new();
                for (ns, cache) in self.selected(namespace) {
                    report.insert(ns.to_string(), serde_json::to_value(cache.stats())?);
                }
                Ok(Value::Object(report))
            }
            Command::Cleanup { namespace } => {
                let caches: Vec<_> = self
                    .selected(namespace)
                    .into_iter()
                    .map(|(_, cache)| cache.clone())
                    .collect();
                Ok(json!({ "removed": cleanup::run_once(&caches) }))
            }
            Command::Metrics { reset } => {
                if reset {
                    self.metrics.reset();
                }
                Ok(json!({
                    "hits": self.metrics.hits(),
                    "misses": self.metrics.misses(),
                    "hitRate": self.metrics.hit_rate(),
                }))
            }
            Command::Fetch {
                namespace,
                table,
                select,
                key,
            } => {
                let key = key.unwrap_or_else(|| format!("{}?select={}", table, select));
                let outcome = self.fetch(namespace, &key, &table, &select).await;
                Ok(serde_json::to_value(outcome)?)
            }
            Command::Watch { .. } => {
                let handle = CleanupHandle::spawn(self.registry.caches(), self.cleanup.clone());
                tracing::info!(interval = ?self.cleanup.interval, "cleanup scheduler running");
                tokio::signal::ctrl_c().await?;
                handle.shutdown().await;
                Ok(json!({ "stopped": true }))
            }
        }
    }

    /// Fetches `table` through the namespace cache, recording a hit or miss
    ///
    /// Only a fresh cache hit counts as a hit; stale fallbacks and remote
    /// calls count as misses.
    pub async fn fetch(
        &self,
        namespace: Namespace,
        key: &str,
        table: &str,
        select: &str,
    ) -> CallOutcome<Value> {
        let cache = self.registry.cache(namespace);
        let outcome = self
            .client
            .cached_call(cache, key, || async {
                match &self.rest {
                    Some(rest) => rest.fetch_table(table, select).await,
                    None => Err(RemoteError::new("CONFIG", "no backend URL configured")),
                }
            })
            .await;

        if outcome.from_cache && !outcome.expired {
            self.metrics.record_hit();
        } else {
            self.metrics.record_miss();
        }
        outcome
    }

    /// The requested namespace, or all of them
    fn selected(&self, namespace: Option<Namespace>) -> Vec<(Namespace, &LocalCache)> {
        match namespace {
            Some(ns) => vec![(ns, self.registry.cache(ns))],
            None => self.registry.iter().collect(),
        }
    }
}

/// Reports a mutation outcome, turning store failures into errors
fn outcome_report(outcome: Outcome) -> Result<Value, CliError> {
    match outcome {
        Outcome::Done => Ok(json!({ "changed": true })),
        Outcome::NoOp => Ok(json!({ "changed": false })),
        Outcome::Failed(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn create_app(online: bool) -> (App, Arc<ManualClock>) {
        let config = CacheConfig {
            start_online: online,
            ..CacheConfig::default()
        };
        let clock = Arc::new(ManualClock::new(1_700_000_000_000));
        let app = App::with_store(&config, Arc::new(MemoryStore::new()), clock.clone());
        (app, clock)
    }

    fn set(namespace: Namespace, key: &str, value: &str) -> Command {
        Command::Set {
            namespace,
            key: key.to_string(),
            value: value.to_string(),
            ttl_ms: None,
        }
    }

    #[tokio::test]
    async fn test_set_then_get() {
        let (app, _clock) = create_app(true);
        app.run(set(Namespace::Inventory, "milk", r#"{"quantity":12}"#))
            .await
            .unwrap();

        let report = app
            .run(Command::Get {
                namespace: Namespace::Inventory,
                key: "milk".to_string(),
            })
            .await
            .unwrap();

        assert_eq!(report, json!({ "data": { "quantity": 12 } }));
    }

    #[tokio::test]
    async fn test_set_rejects_invalid_json() {
        let (app, _clock) = create_app(true);
        let err = app
            .run(set(Namespace::Tasks, "k", "{oops"))
            .await
            .unwrap_err();
        assert!(matches!(err, CliError::InvalidJson(_)));
    }

    #[tokio::test]
    async fn test_delete_reports_change() {
        let (app, _clock) = create_app(true);
        app.run(set(Namespace::Tasks, "k", "1")).await.unwrap();
        let delete = || Command::Delete {
            namespace: Namespace::Tasks,
            key: "k".to_string(),
        };

        assert_eq!(app.run(delete()).await.unwrap(), json!({ "changed": true }));
        assert_eq!(app.run(delete()).await.unwrap(), json!({ "changed": false }));
    }

    #[tokio::test]
    async fn test_stats_and_cleanup_over_all_namespaces() {
        let (app, clock) = create_app(true);
        app.run(set(Namespace::Alerts, "a", "1")).await.unwrap();
        app.run(set(Namespace::Products, "p", "2")).await.unwrap();
        clock.advance(2 * 60_000);

        let stats = app.run(Command::Stats { namespace: None }).await.unwrap();
        assert_eq!(stats["alerts"]["expiredCount"], json!(1));
        assert_eq!(stats["products"]["expiredCount"], json!(0));
        assert_eq!(stats.as_object().unwrap().len(), 5);
        assert!(stats["alerts"].get("storageUsagePercent").is_some());

        let removed = app.run(Command::Cleanup { namespace: None }).await.unwrap();
        assert_eq!(removed, json!({ "removed": 1 }));
    }

    #[tokio::test]
    async fn test_fetch_records_hits_and_misses() {
        let (app, _clock) = create_app(true);
        let _ = app
            .registry()
            .cache(Namespace::Tasks)
            .set("today", &json!(["restock dairy"]), None);

        let hit = app.fetch(Namespace::Tasks, "today", "tasks", "*").await;
        assert!(hit.from_cache);

        // No backend configured: the call fails and nothing is cached
        let miss = app.fetch(Namespace::Tasks, "tomorrow", "tasks", "*").await;
        assert_eq!(miss.error.map(|e| e.code), Some("CONFIG".to_string()));

        assert_eq!((app.metrics().hits(), app.metrics().misses()), (1, 1));
        assert_eq!(app.metrics().hit_rate(), 50.0);
    }

    #[tokio::test]
    async fn test_fetch_offline_serves_stale_entry() {
        let (app, clock) = create_app(false);
        let _ = app
            .registry()
            .cache(Namespace::Tasks)
            .set("today", &json!(["old"]), None);
        clock.advance(10 * 60_000);

        let outcome = app.fetch(Namespace::Tasks, "today", "tasks", "*").await;

        assert_eq!(outcome.data, Some(json!(["old"])));
        assert!(outcome.from_cache && outcome.expired);
        assert_eq!(app.metrics().misses(), 1);
    }

    #[tokio::test]
    async fn test_metrics_reset() {
        let (app, _clock) = create_app(true);
        app.metrics().record_hit();

        let report = app.run(Command::Metrics { reset: true }).await.unwrap();

        assert_eq!(report, json!({ "hits": 0, "misses": 0, "hitRate": 0.0 }));
    }
}
