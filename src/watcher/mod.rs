//! Source change detection.
//!
//! # Responsibilities
//! - Detect that a domain's source may have changed
//! - Emit one `ChangeEvent` per detected change into the reload queue
//! - Prefer native notifications, fall back to polling when they are unavailable
//!
//! # Data Flow
//! ```text
//! push.rs: notify callback → raw event queue → settle delay per domain → ChangeEvent
//!     (registration fails or notifications stop) ↓
//! poll.rs: interval tick → scan version markers → compare with last seen → ChangeEvent
//! ```
//!
//! # Design Decisions
//! - Events may be spurious; the coordinator discards versions that are not newer
//! - Fallback to polling is permanent for the life of the watcher
//! - Polling starts from the versions held by the store, not from its own first scan
//! - The active strategy is published through a shared cell for status reporting

pub mod poll;
pub mod push;

use std::path::PathBuf;
use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::config::{StrategyPreference, WatchConfig};
use crate::domain::{ChangeEvent, Domain};
use crate::observability::metrics;
use crate::source::SourceAccessor;
use crate::store::SnapshotStore;

pub use poll::PollWatcher;
pub use push::{PushExit, PushWatcher};

/// Errors raised while registering native notifications.
#[derive(Debug, Error)]
pub enum WatchError {
    #[error("source backend does not support native notifications")]
    Unsupported,

    #[error("watch root '{0}' is not a directory")]
    MissingRoot(PathBuf),

    #[error("native watcher failed: {0}")]
    Notify(#[from] notify::Error),
}

impl WatchError {
    /// Short label for metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            WatchError::Unsupported => "unsupported",
            WatchError::MissingRoot(_) => "missing_root",
            WatchError::Notify(_) => "notify_error",
        }
    }
}

/// Change detection strategy currently in use.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchStrategy {
    Inactive = 0,
    Push = 1,
    Poll = 2,
}

impl From<u8> for WatchStrategy {
    fn from(val: u8) -> Self {
        match val {
            1 => WatchStrategy::Push,
            2 => WatchStrategy::Poll,
            _ => WatchStrategy::Inactive,
        }
    }
}

impl WatchStrategy {
    pub fn as_str(self) -> &'static str {
        match self {
            WatchStrategy::Inactive => "inactive",
            WatchStrategy::Push => "push",
            WatchStrategy::Poll => "poll",
        }
    }
}

/// Shared, lock-free view of the active strategy.
#[derive(Debug, Clone, Default)]
pub struct StrategyCell(Arc<AtomicU8>);

impl StrategyCell {
    pub fn get(&self) -> WatchStrategy {
        WatchStrategy::from(self.0.load(Ordering::Acquire))
    }

    fn set(&self, strategy: WatchStrategy) {
        self.0.store(strategy as u8, Ordering::Release);
    }
}

/// Running watcher task.
pub struct WatcherHandle {
    strategy: StrategyCell,
    join: JoinHandle<()>,
}

impl WatcherHandle {
    pub fn strategy(&self) -> WatchStrategy {
        self.strategy.get()
    }

    /// Wait for the watcher task to exit.
    pub async fn stopped(self) {
        if let Err(e) = self.join.await {
            tracing::error!(error = %e, "Source watcher task failed");
        }
    }
}

/// Watches every domain's source and feeds change events to the reload queue.
pub struct SourceWatcher {
    source: Arc<dyn SourceAccessor>,
    store: Arc<SnapshotStore>,
    config: WatchConfig,
    strategy: StrategyCell,
}

impl SourceWatcher {
    pub fn new(
        source: Arc<dyn SourceAccessor>,
        store: Arc<SnapshotStore>,
        config: WatchConfig,
        strategy: StrategyCell,
    ) -> Self {
        Self {
            source,
            store,
            config,
            strategy,
        }
    }

    /// Register native notifications if possible and start the watcher task.
    ///
    /// Registration happens before this returns, so changes made after
    /// `spawn` are observed by the push strategy.
    pub fn spawn(
        self,
        events: mpsc::Sender<ChangeEvent>,
        shutdown: broadcast::Receiver<()>,
    ) -> WatcherHandle {
        let push = match self.config.strategy {
            StrategyPreference::Poll => {
                tracing::info!("Native notifications disabled by configuration");
                None
            }
            StrategyPreference::Auto | StrategyPreference::Push => {
                match PushWatcher::register(self.source.clone(), self.config.settle_delay()) {
                    Ok(push) => Some(push),
                    Err(e) => {
                        tracing::warn!(error = %e, "Native notifications unavailable, falling back to polling");
                        metrics::record_watch_fallback(e.reason());
                        None
                    }
                }
            }
        };

        self.launch(push, events, shutdown)
    }

    fn launch(
        self,
        push: Option<PushWatcher>,
        events: mpsc::Sender<ChangeEvent>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> WatcherHandle {
        let strategy = self.strategy.clone();
        strategy.set(if push.is_some() {
            WatchStrategy::Push
        } else {
            WatchStrategy::Poll
        });

        let SourceWatcher {
            source,
            store,
            config,
            ..
        } = self;
        let cell = strategy.clone();

        let join = tokio::spawn(async move {
            if let Some(push) = push {
                match push.run(&events, &mut shutdown).await {
                    PushExit::Shutdown | PushExit::Closed => return,
                    PushExit::Lost => {
                        tracing::warn!("Native notifications stopped, falling back to polling");
                        metrics::record_watch_fallback("notifications_lost");
                        cell.set(WatchStrategy::Poll);
                    }
                }
            }

            // Versions currently served; anything that moved since they were
            // loaded is reported on the first scan.
            let loaded = Domain::ALL
                .iter()
                .filter_map(|&domain| store.try_read(domain).map(|s| (domain, s.source_version)))
                .collect::<Vec<_>>();
            PollWatcher::new(source, config.poll_interval())
                .with_baseline(loaded)
                .run(events, shutdown)
                .await;
        });

        WatcherHandle { strategy, join }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ChangeOrigin, ConfigDocument, Snapshot};
    use crate::lifecycle::Shutdown;
    use crate::source::MemorySource;
    use std::time::Duration;

    fn loaded_store(source: &MemorySource) -> Arc<SnapshotStore> {
        let store = Arc::new(SnapshotStore::new());
        for domain in Domain::ALL {
            let version = source.put(domain, "{}");
            let doc = ConfigDocument::new(domain, serde_json::json!({}));
            store.initialize(domain, Snapshot::new(doc, version)).unwrap();
        }
        store
    }

    fn fast_config(strategy: StrategyPreference) -> WatchConfig {
        WatchConfig {
            strategy,
            poll_interval_ms: 20,
            settle_delay_ms: 20,
            event_buffer: 8,
        }
    }

    #[tokio::test]
    async fn test_backend_without_root_falls_back_to_poll() {
        let source = Arc::new(MemorySource::new());
        source.put(Domain::Ui, "{}");
        let shutdown = Shutdown::new();
        let (tx, mut rx) = mpsc::channel(8);

        let watcher = SourceWatcher::new(
            source.clone(),
            Arc::new(SnapshotStore::new()),
            fast_config(StrategyPreference::Auto),
            StrategyCell::default(),
        );
        let handle = watcher.spawn(tx, shutdown.subscribe());
        assert_eq!(handle.strategy(), WatchStrategy::Poll);

        // let the baseline scan happen first
        tokio::time::sleep(Duration::from_millis(60)).await;
        source.put(Domain::Ui, r#"{"layout": {}}"#);

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.domain, Domain::Ui);

        shutdown.trigger();
        handle.stopped().await;
    }

    #[tokio::test]
    async fn test_change_before_first_scan_is_reported() {
        let source = Arc::new(MemorySource::new());
        let store = loaded_store(&source);
        let shutdown = Shutdown::new();
        let (tx, mut rx) = mpsc::channel(8);

        // lands after loading, before the watcher exists
        source.put(Domain::Ui, r#"{"layout": {}}"#);

        let watcher = SourceWatcher::new(
            source.clone(),
            store,
            fast_config(StrategyPreference::Poll),
            StrategyCell::default(),
        );
        let handle = watcher.spawn(tx, shutdown.subscribe());

        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.domain, Domain::Ui);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert!(rx.try_recv().is_err());

        shutdown.trigger();
        handle.stopped().await;
    }

    #[tokio::test]
    async fn test_lost_notifications_switch_to_polling() {
        let source = Arc::new(MemorySource::new());
        let store = loaded_store(&source);
        let shutdown = Shutdown::new();
        let (tx, mut rx) = mpsc::channel(8);

        let (push, raw) = PushWatcher::detached(source.clone(), Duration::from_millis(20));
        let watcher = SourceWatcher::new(
            source.clone(),
            store,
            fast_config(StrategyPreference::Auto),
            StrategyCell::default(),
        );
        let handle = watcher.launch(Some(push), tx, shutdown.subscribe());
        assert_eq!(handle.strategy(), WatchStrategy::Push);

        raw.send(Err(notify::Error::generic("watch descriptor removed"))).unwrap();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        while handle.strategy() != WatchStrategy::Poll {
            assert!(tokio::time::Instant::now() < deadline, "still on push");
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        source.put(Domain::Business, r#"{"owner": {}}"#);
        let event = tokio::time::timeout(Duration::from_secs(2), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.domain, Domain::Business);
        assert_eq!(event.origin, ChangeOrigin::Poll);

        shutdown.trigger();
        handle.stopped().await;
    }

    #[test]
    fn test_strategy_cell_defaults_to_inactive() {
        let cell = StrategyCell::default();
        assert_eq!(cell.get(), WatchStrategy::Inactive);
        cell.set(WatchStrategy::Push);
        assert_eq!(cell.get().as_str(), "push");
    }
}
