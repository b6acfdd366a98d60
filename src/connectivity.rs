//! Online/offline state shared with the cached-call wrapper
//!
//! The host environment seeds the initial state and then delivers transition
//! events over a tokio channel. The monitor task applies them for as long as
//! the sender side is alive; readers only ever observe the flag.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Connectivity transitions reported by the host
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityEvent {
    Online,
    Offline,
}

/// Shared network reachability flag
#[derive(Debug, Clone)]
pub struct OnlineStatus {
    online: Arc<AtomicBool>,
}

impl OnlineStatus {
    /// Creates a flag seeded with the host's current connectivity
    pub fn new(online: bool) -> Self {
        Self {
            online: Arc::new(AtomicBool::new(online)),
        }
    }

    pub fn is_online(&self) -> bool {
        self.online.load(Ordering::SeqCst)
    }

    /// Applies a transition, returning whether the state changed
    fn apply(&self, event: ConnectivityEvent) -> bool {
        let online = event == ConnectivityEvent::Online;
        self.online.swap(online, Ordering::SeqCst) != online
    }
}

/// Background task feeding connectivity events into an `OnlineStatus`
pub struct ConnectivityMonitor;

impl ConnectivityMonitor {
    /// Spawns a task applying every event from `events` to `status`
    ///
    /// The task ends when all senders for `events` are dropped.
    pub fn spawn(
        status: OnlineStatus,
        mut events: mpsc::Receiver<ConnectivityEvent>,
    ) -> JoinHandle<()> {
        tokio::spawn(async move {
            while let Some(event) = events.recv().await {
                if status.apply(event) {
                    tracing::info!(?event, "connectivity changed");
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_initial_state() {
        assert!(OnlineStatus::new(true).is_online());
        assert!(!OnlineStatus::new(false).is_online());
    }

    #[test]
    fn test_clones_share_state() {
        let status = OnlineStatus::new(true);
        let reader = status.clone();

        assert!(status.apply(ConnectivityEvent::Offline));
        assert!(!reader.is_online());
        assert!(!status.apply(ConnectivityEvent::Offline), "repeat event is not a change");
    }

    #[tokio::test]
    async fn test_monitor_applies_events_in_order() {
        let status = OnlineStatus::new(true);
        let (tx, rx) = mpsc::channel(4);
        let handle = ConnectivityMonitor::spawn(status.clone(), rx);

        tx.send(ConnectivityEvent::Offline).await.unwrap();
        tx.send(ConnectivityEvent::Online).await.unwrap();
        tx.send(ConnectivityEvent::Offline).await.unwrap();
        drop(tx);
        handle.await.unwrap();

        assert!(!status.is_online());
    }
}
