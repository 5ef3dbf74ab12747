//! Engine facade.
//!
//! # Responsibilities
//! - Own the store, coordinator and broadcaster of one engine instance
//! - Load every domain at bootstrap; the engine is ready once this returns
//! - Start the watcher and dispatcher tasks
//! - Serve reads, forced reloads and typed helpers to embedders
//!
//! # Data Flow
//! ```text
//! bootstrap: SourceAccessor → ConfigLoader → SnapshotStore::initialize (every domain)
//! start:     SourceWatcher ──mpsc──→ ReloadDispatcher → ReloadCoordinator
//! reads:     snapshot(domain) → SnapshotStore::read (lock-free)
//! ```

mod accessors;

use futures_util::future::join_all;
use std::sync::Arc;
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;

use crate::broadcast::{ChangeBroadcaster, ConfigChange, NotificationChannel};
use crate::config::{EngineConfig, ReloadConfig, WatchConfig};
use crate::domain::{ChangeEvent, ConfigLoader, Domain, Snapshot};
use crate::lifecycle::startup::{self, StartupError};
use crate::lifecycle::Shutdown;
use crate::reload::{ForcedReload, ReloadCoordinator, ReloadDispatcher, ReloadStatus};
use crate::source::SourceAccessor;
use crate::store::{SnapshotStore, StoreError};
use crate::watcher::{SourceWatcher, StrategyCell, WatchStrategy, WatcherHandle};

/// A running (or ready to run) configuration engine.
pub struct ConfigEngine {
    source: Arc<dyn SourceAccessor>,
    store: Arc<SnapshotStore>,
    coordinator: Arc<ReloadCoordinator>,
    broadcaster: Arc<ChangeBroadcaster>,
    watch: WatchConfig,
    reload: ReloadConfig,
    strategy: StrategyCell,
}

/// Background tasks started by `ConfigEngine::start`.
pub struct EngineTasks {
    watcher: WatcherHandle,
    dispatcher: JoinHandle<()>,
}

impl EngineTasks {
    pub fn strategy(&self) -> WatchStrategy {
        self.watcher.strategy()
    }

    /// Wait for both tasks to exit after shutdown was triggered.
    pub async fn stopped(self) {
        self.watcher.stopped().await;
        if let Err(e) = self.dispatcher.await {
            tracing::error!(error = %e, "Reload dispatcher task failed");
        }
    }
}

impl ConfigEngine {
    /// Load every domain and build the engine.
    ///
    /// Fails if any domain cannot be loaded; no task is started.
    pub fn bootstrap(
        source: Arc<dyn SourceAccessor>,
        channel: Arc<dyn NotificationChannel>,
        config: &EngineConfig,
    ) -> Result<Self, StartupError> {
        let loader = ConfigLoader::new();
        let store = Arc::new(SnapshotStore::new());
        startup::load_all(source.as_ref(), &loader, &store)?;

        let broadcaster = Arc::new(ChangeBroadcaster::new(channel, &config.broadcast));
        let coordinator = Arc::new(ReloadCoordinator::new(
            source.clone(),
            loader,
            store.clone(),
            broadcaster.clone(),
            config.reload.io_timeout(),
        ));

        tracing::info!(domains = Domain::COUNT, "Configuration engine ready");
        Ok(Self {
            source,
            store,
            coordinator,
            broadcaster,
            watch: config.watch.clone(),
            reload: config.reload.clone(),
            strategy: StrategyCell::default(),
        })
    }

    /// Start watching sources. Call once; both tasks stop on `shutdown`.
    pub fn start(&self, shutdown: &Shutdown) -> EngineTasks {
        let (events_tx, events_rx) = mpsc::channel(self.watch.event_buffer.max(1));

        let dispatcher = ReloadDispatcher::new(events_rx, self.coordinator.clone(), self.reload.workers);
        let dispatcher = tokio::spawn(dispatcher.run(shutdown.subscribe()));

        let watcher = SourceWatcher::new(
            self.source.clone(),
            self.store.clone(),
            self.watch.clone(),
            self.strategy.clone(),
        )
        .spawn(events_tx, shutdown.subscribe());

        tracing::info!(strategy = watcher.strategy().as_str(), "Source watching started");
        EngineTasks { watcher, dispatcher }
    }

    /// Current snapshot of a domain. Never blocks.
    pub fn snapshot(&self, domain: Domain) -> Result<Arc<Snapshot>, StoreError> {
        self.store.read(domain)
    }

    /// Snapshot the current one replaced, if any.
    pub fn previous(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.store.previous(domain)
    }

    pub fn is_ready(&self) -> bool {
        self.store.is_ready()
    }

    pub fn watch_strategy(&self) -> WatchStrategy {
        self.strategy.get()
    }

    /// Receive every successful reload from now on.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.broadcaster.subscribe()
    }

    pub fn broadcaster(&self) -> &ChangeBroadcaster {
        &self.broadcaster
    }

    /// Reload one domain now, through the same path as detected changes.
    pub async fn reload(&self, domain: Domain) -> ReloadStatus {
        self.coordinator.handle_and_wait(ChangeEvent::forced(domain)).await
    }

    /// Reload every domain and report each result separately.
    ///
    /// A domain that fails keeps its current snapshot; the others still reload.
    pub async fn force_reload_all(&self) -> ForcedReload {
        let passes = Domain::ALL.map(|domain| async move { (domain, self.reload(domain).await) });
        let results = join_all(passes).await.into_iter().collect();
        let forced = ForcedReload { results };

        let reloaded = forced.results.values().filter(|s| s.is_reloaded()).count();
        for (domain, error) in forced.failures() {
            tracing::warn!(domain = %domain, error = %error, "Forced reload failed for domain");
        }
        tracing::info!(reloaded, failed = forced.failures().len(), "Forced reload finished");
        forced
    }
}
