//! Per-domain reload state machine.
//!
//! # States
//! - Idle: no reload running for the domain
//! - Reloading: one pass in flight
//! - Pending: a pass is in flight and another change arrived meanwhile
//!
//! # State Transitions
//! ```text
//! Idle      → Reloading: change event accepted
//! Reloading → Pending:   change event while a pass runs (coalesced)
//! Pending   → Pending:   further change events (coalesced)
//! Reloading → Idle:      pass finished, nothing new arrived
//! Pending   → Reloading: pass finished, run exactly one more pass
//! ```

use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;

use crate::broadcast::ChangeBroadcaster;
use crate::domain::{ChangeEvent, ConfigError, ConfigLoader, Domain, Snapshot};
use crate::observability::metrics;
use crate::reload::status::{ReloadOutcome, ReloadStatus};
use crate::source::{self, SourceAccessor};
use crate::store::SnapshotStore;

/// Reload state of one domain.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReloadState {
    Idle = 0,
    Reloading = 1,
    Pending = 2,
}

impl From<u8> for ReloadState {
    fn from(val: u8) -> Self {
        match val {
            1 => ReloadState::Reloading,
            2 => ReloadState::Pending,
            _ => ReloadState::Idle,
        }
    }
}

/// Final status of a `handle` call, tagged with the generation of its last pass.
type Completion = Option<(u64, ReloadStatus)>;

struct DomainSlot {
    state: AtomicU8,
    /// Number of passes started so far.
    generation: AtomicU64,
    /// Latest completion, for callers that were coalesced.
    completed: watch::Sender<Completion>,
}

impl DomainSlot {
    fn new() -> Self {
        Self {
            state: AtomicU8::new(ReloadState::Idle as u8),
            generation: AtomicU64::new(0),
            completed: watch::channel(None).0,
        }
    }

    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    /// Claim the generation of a pass about to read the source.
    fn next_pass(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::AcqRel) + 1
    }

    /// Publish a completion unless a later pass already completed.
    fn complete(&self, generation: u64, status: &ReloadStatus) {
        self.completed.send_if_modified(|last| match last {
            Some((seen, _)) if *seen >= generation => false,
            _ => {
                *last = Some((generation, status.clone()));
                true
            }
        });
    }

    /// Wait for a completion whose last pass started after generation `after`.
    async fn completed_after(
        &self,
        mut completed: watch::Receiver<Completion>,
        after: u64,
    ) -> Option<ReloadStatus> {
        let done = completed
            .wait_for(|c| matches!(c, Some((generation, _)) if *generation > after))
            .await
            .ok()?;
        done.as_ref().map(|(_, status)| status.clone())
    }

    /// Returns true when the caller now owns the reload for this domain.
    fn try_begin(&self) -> bool {
        let mut current = self.state.load(Ordering::Acquire);
        loop {
            let next = match ReloadState::from(current) {
                ReloadState::Idle => ReloadState::Reloading,
                ReloadState::Reloading | ReloadState::Pending => ReloadState::Pending,
            };
            match self.state.compare_exchange_weak(
                current,
                next as u8,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return ReloadState::from(current) == ReloadState::Idle,
                Err(actual) => current = actual,
            }
        }
    }

    /// Returns true when the domain went back to Idle; false means another
    /// pass is owed.
    fn try_finish(&self) -> bool {
        match self.state.compare_exchange(
            ReloadState::Reloading as u8,
            ReloadState::Idle as u8,
            Ordering::AcqRel,
            Ordering::Acquire,
        ) {
            Ok(_) => true,
            Err(_) => {
                self.state.store(ReloadState::Reloading as u8, Ordering::Release);
                false
            }
        }
    }
}

/// Turns change events into snapshot publishes.
pub struct ReloadCoordinator {
    source: Arc<dyn SourceAccessor>,
    loader: ConfigLoader,
    store: Arc<SnapshotStore>,
    broadcaster: Arc<ChangeBroadcaster>,
    io_timeout: Duration,
    slots: [DomainSlot; Domain::COUNT],
}

impl ReloadCoordinator {
    pub fn new(
        source: Arc<dyn SourceAccessor>,
        loader: ConfigLoader,
        store: Arc<SnapshotStore>,
        broadcaster: Arc<ChangeBroadcaster>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            source,
            loader,
            store,
            broadcaster,
            io_timeout,
            slots: std::array::from_fn(|_| DomainSlot::new()),
        }
    }

    fn slot(&self, domain: Domain) -> &DomainSlot {
        &self.slots[domain.index()]
    }

    /// Current reload state of a domain.
    pub fn state(&self, domain: Domain) -> ReloadState {
        ReloadState::from(self.slot(domain).state.load(Ordering::Acquire))
    }

    /// Process one change event.
    ///
    /// Returns `Coalesced` immediately if the domain is already reloading;
    /// the running call then performs one extra pass before going Idle.
    pub async fn handle(&self, event: ChangeEvent) -> ReloadStatus {
        let domain = event.domain;
        let slot = self.slot(domain);

        if !slot.try_begin() {
            tracing::debug!(domain = %domain, origin = event.origin.as_str(), "Reload in flight, change coalesced");
            metrics::record_reload(domain, "coalesced");
            return ReloadStatus::Coalesced;
        }

        let mut generation = slot.next_pass();
        let mut status = self.reload_pass(event).await;
        while !slot.try_finish() {
            tracing::debug!(domain = %domain, "Change arrived during reload, running another pass");
            generation = slot.next_pass();
            status = self.reload_pass(event).await;
        }

        slot.complete(generation, &status);
        status
    }

    /// Like `handle`, but when coalesced waits for a reload pass that started
    /// after this call and returns the status of the call that ran it.
    pub async fn handle_and_wait(&self, event: ChangeEvent) -> ReloadStatus {
        let slot = self.slot(event.domain);
        let completed = slot.completed.subscribe();
        let seen = slot.generation();

        match self.handle(event).await {
            ReloadStatus::Coalesced => slot
                .completed_after(completed, seen)
                .await
                .unwrap_or(ReloadStatus::Coalesced),
            status => status,
        }
    }

    async fn reload_pass(&self, event: ChangeEvent) -> ReloadStatus {
        let domain = event.domain;
        let started = std::time::Instant::now();

        let loaded = source::fetch_raw_blocking(self.source.clone(), domain, self.io_timeout)
            .await
            .and_then(|raw| {
                self.loader
                    .load(domain, Some(&raw.bytes))
                    .map(|document| (document, raw.version))
            });

        let (document, version) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => return self.fail(domain, e),
        };

        if let Some(current) = self.store.try_read(domain) {
            if version <= current.source_version {
                tracing::debug!(
                    domain = %domain,
                    version = version.get(),
                    current = current.source_version.get(),
                    "Source version not newer, discarding"
                );
                metrics::record_reload(domain, "unchanged");
                return ReloadStatus::Unchanged;
            }
        }

        let current = Arc::new(Snapshot::new(document, version));
        let previous = self.store.publish(domain, current.clone());
        let outcome = ReloadOutcome {
            domain,
            previous,
            current,
        };

        self.broadcaster.announce(&outcome).await;

        tracing::info!(
            domain = %domain,
            origin = event.origin.as_str(),
            version = version.get(),
            elapsed = ?started.elapsed(),
            "Configuration reloaded"
        );
        metrics::record_reload(domain, "reloaded");
        ReloadStatus::Reloaded(outcome)
    }

    fn fail(&self, domain: Domain, error: ConfigError) -> ReloadStatus {
        tracing::error!(
            domain = %domain,
            error = %error,
            "Failed to reload configuration. Keeping current snapshot."
        );
        metrics::record_reload(domain, error.kind());
        ReloadStatus::Failed(error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::NoopChannel;
    use crate::config::BroadcastConfig;
    use crate::domain::SourceVersion;
    use crate::source::MemorySource;

    fn coordinator(source: Arc<MemorySource>) -> (ReloadCoordinator, Arc<SnapshotStore>, Arc<ChangeBroadcaster>) {
        let store = Arc::new(SnapshotStore::new());
        let broadcaster = Arc::new(ChangeBroadcaster::new(
            Arc::new(NoopChannel),
            &BroadcastConfig::default(),
        ));
        let coordinator = ReloadCoordinator::new(
            source,
            ConfigLoader::new(),
            store.clone(),
            broadcaster.clone(),
            Duration::from_secs(2),
        );
        (coordinator, store, broadcaster)
    }

    #[test]
    fn test_state_transitions() {
        let slot = DomainSlot::new();
        assert!(slot.try_begin());
        assert!(!slot.try_begin());
        assert!(!slot.try_begin());
        assert_eq!(ReloadState::from(slot.state.load(Ordering::Acquire)), ReloadState::Pending);

        // pending pass owed once, however many events arrived
        assert!(!slot.try_finish());
        assert!(slot.try_finish());
        assert_eq!(ReloadState::from(slot.state.load(Ordering::Acquire)), ReloadState::Idle);
    }

    #[tokio::test]
    async fn test_coalesced_waiter_skips_completions_of_earlier_passes() {
        let slot = DomainSlot::new();
        let first = slot.next_pass();

        let completed = slot.completed.subscribe();
        let seen = slot.generation();

        // the pass that was already running finishes late
        slot.complete(first, &ReloadStatus::Unchanged);
        let early = tokio::time::timeout(Duration::from_millis(50), slot.completed_after(completed.clone(), seen)).await;
        assert!(early.is_err(), "woke on a pass that began before the call");

        let second = slot.next_pass();
        slot.complete(second, &ReloadStatus::Failed(ConfigError::SourceMissing(Domain::Ui)));
        let status = slot.completed_after(completed, seen).await.unwrap();
        assert!(matches!(status, ReloadStatus::Failed(ConfigError::SourceMissing(Domain::Ui))));
    }

    #[test]
    fn test_late_completion_does_not_replace_newer_one() {
        let slot = DomainSlot::new();
        let older = slot.next_pass();
        let newer = slot.next_pass();

        slot.complete(newer, &ReloadStatus::Unchanged);
        slot.complete(older, &ReloadStatus::Coalesced);

        let latest = slot.completed.borrow();
        assert!(matches!(latest.as_ref(), Some((g, ReloadStatus::Unchanged)) if *g == newer));
    }

    #[tokio::test]
    async fn test_first_reload_publishes() {
        let source = Arc::new(MemorySource::new());
        source.put_versioned(Domain::App, r#"{"system": {"version": "1"}}"#, SourceVersion::new(10));
        let (coordinator, store, broadcaster) = coordinator(source);
        let mut listener = broadcaster.subscribe();

        let status = coordinator.handle(ChangeEvent::forced(Domain::App)).await;

        assert!(status.is_reloaded());
        assert_eq!(store.read(Domain::App).unwrap().source_version, SourceVersion::new(10));
        assert_eq!(listener.recv().await.unwrap().domain, Domain::App);
        assert_eq!(coordinator.state(Domain::App), ReloadState::Idle);
    }

    #[tokio::test]
    async fn test_same_version_is_discarded() {
        let source = Arc::new(MemorySource::new());
        source.put_versioned(Domain::Ui, "{}", SourceVersion::new(5));
        let (coordinator, store, broadcaster) = coordinator(source.clone());
        coordinator.handle(ChangeEvent::forced(Domain::Ui)).await;
        let loaded_at = store.read(Domain::Ui).unwrap().loaded_at;
        let mut listener = broadcaster.subscribe();

        source.put_versioned(Domain::Ui, r#"{"layout": {}}"#, SourceVersion::new(5));
        let status = coordinator.handle(ChangeEvent::forced(Domain::Ui)).await;

        assert!(matches!(status, ReloadStatus::Unchanged));
        let current = store.read(Domain::Ui).unwrap();
        assert_eq!(current.loaded_at, loaded_at);
        assert_eq!(current.document.value(), &serde_json::json!({}));
        assert!(listener.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_parse_failure_keeps_snapshot() {
        let source = Arc::new(MemorySource::new());
        source.put(Domain::Business, r#"{"owner": {"name": "Ana"}}"#);
        let (coordinator, store, _) = coordinator(source.clone());
        coordinator.handle(ChangeEvent::forced(Domain::Business)).await;
        let before = store.read(Domain::Business).unwrap();

        source.put(Domain::Business, "{ not json");
        let status = coordinator.handle(ChangeEvent::forced(Domain::Business)).await;

        assert!(matches!(status, ReloadStatus::Failed(ConfigError::Parse { .. })));
        let after = store.read(Domain::Business).unwrap();
        assert!(Arc::ptr_eq(&before, &after));
        assert_eq!(coordinator.state(Domain::Business), ReloadState::Idle);
    }

    #[tokio::test]
    async fn test_missing_source_reported() {
        let source = Arc::new(MemorySource::new());
        let (coordinator, store, _) = coordinator(source);

        let status = coordinator.handle(ChangeEvent::forced(Domain::FeatureFlags)).await;

        assert!(matches!(
            status,
            ReloadStatus::Failed(ConfigError::SourceMissing(Domain::FeatureFlags))
        ));
        assert!(store.read(Domain::FeatureFlags).is_err());
    }
}
