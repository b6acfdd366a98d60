//! Background removal of stale cache entries
//!
//! `get` only drops the single stale entry it touches, so abandoned entries
//! would otherwise accumulate. The scheduler sweeps every registered
//! namespace on a fixed interval for the lifetime of the process, or until
//! the handle is shut down.

use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::cache::LocalCache;

/// Configuration for the cleanup scheduler
#[derive(Debug, Clone)]
pub struct CleanupConfig {
    /// Time between sweeps
    pub interval: Duration,
    /// Whether the scheduler runs at all
    pub enabled: bool,
}

impl Default for CleanupConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300), // 5 minutes
            enabled: true,
        }
    }
}

/// Runs `cleanup()` on each cache in turn, returning the total removed
pub fn run_once(caches: &[LocalCache]) -> usize {
    caches.iter().map(LocalCache::cleanup).sum()
}

/// Handle for controlling the background cleanup task
pub struct CleanupHandle {
    /// Flag to signal shutdown
    shutdown_tx: mpsc::Sender<()>,
    task: Option<JoinHandle<()>>,
}

impl CleanupHandle {
    /// Spawns the periodic sweep over `caches`
    ///
    /// The first sweep happens one full interval after spawning.
    pub fn spawn(caches: Vec<LocalCache>, config: CleanupConfig) -> Self {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel::<()>(1);

        let task = config.enabled.then(|| {
            tokio::spawn(async move {
                let mut interval = tokio::time::interval(config.interval);
                // Skip the first tick (immediate)
                interval.tick().await;

                loop {
                    tokio::select! {
                        _ = interval.tick() => {
                            let removed = run_once(&caches);
                            tracing::debug!(removed, namespaces = caches.len(), "cache cleanup pass finished");
                        }
                        _ = shutdown_rx.recv() => {
                            break;
                        }
                    }
                }
            })
        });

        Self { shutdown_tx, task }
    }

    /// Whether a background task was started
    pub fn is_running(&self) -> bool {
        self.task.as_ref().is_some_and(|task| !task.is_finished())
    }

    /// Stops the background task and waits for it to exit
    pub async fn shutdown(mut self) {
        let _ = self.shutdown_tx.send(()).await;
        if let Some(task) = self.task.take() {
            let _ = task.await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::store::{KeyValueStore, MemoryStore};
    use std::sync::Arc;

    fn stale_caches() -> (Vec<LocalCache>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        let clock = Arc::new(ManualClock::new(0));
        let caches: Vec<LocalCache> = ["tasks", "alerts"]
            .into_iter()
            .map(|ns| LocalCache::new(ns, Duration::from_secs(60), store.clone(), clock.clone()))
            .collect();
        for cache in &caches {
            let _ = cache.set("old", &1, None);
            let _ = cache.set("new", &2, Some(Duration::from_secs(3600)));
        }
        clock.advance(120_000);
        (caches, store)
    }

    #[test]
    fn test_cleanup_config_default() {
        let config = CleanupConfig::default();
        assert_eq!(config.interval, Duration::from_secs(300));
        assert!(config.enabled);
    }

    #[test]
    fn test_run_once_sweeps_every_cache() {
        let (caches, store) = stale_caches();

        assert_eq!(run_once(&caches), 2);
        assert_eq!(
            store.keys().unwrap(),
            vec!["tasks:new".to_string(), "alerts:new".to_string()]
        );
        assert_eq!(run_once(&caches), 0);
    }

    #[tokio::test]
    async fn test_spawn_disabled_starts_nothing() {
        let (caches, _store) = stale_caches();
        let handle = CleanupHandle::spawn(
            caches,
            CleanupConfig {
                enabled: false,
                ..Default::default()
            },
        );

        assert!(!handle.is_running());
        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_spawned_task_sweeps_after_interval() {
        let (caches, store) = stale_caches();
        let handle = CleanupHandle::spawn(caches, CleanupConfig::default());
        assert!(handle.is_running());

        // Nothing happens before the first full interval
        tokio::time::sleep(Duration::from_secs(299)).await;
        assert_eq!(store.keys().unwrap().len(), 4);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.keys().unwrap().len(), 2);

        handle.shutdown().await;
    }
}
