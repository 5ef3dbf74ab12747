//! Per-domain current/previous snapshot slots.

use arc_swap::ArcSwapOption;
use std::sync::{Arc, Mutex, PoisonError};
use thiserror::Error;

use crate::domain::{Domain, Snapshot};
use crate::observability::metrics;

/// Errors returned by the snapshot store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// No snapshot has been stored for the domain yet.
    #[error("domain '{0}' has no snapshot yet")]
    NotInitialized(Domain),

    /// `initialize` was called twice without a publish in between.
    #[error("domain '{0}' is already initialized")]
    AlreadyInitialized(Domain),
}

#[derive(Default)]
struct Slot {
    current: ArcSwapOption<Snapshot>,
    previous: ArcSwapOption<Snapshot>,
    /// Held by writers. `true` while the last write was an `initialize`.
    write_lock: Mutex<bool>,
}

/// Holds the current and previous snapshot of every domain.
#[derive(Default)]
pub struct SnapshotStore {
    slots: [Slot; Domain::COUNT],
}

impl SnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn slot(&self, domain: Domain) -> &Slot {
        &self.slots[domain.index()]
    }

    /// Most recently published snapshot.
    pub fn read(&self, domain: Domain) -> Result<Arc<Snapshot>, StoreError> {
        self.slot(domain)
            .current
            .load_full()
            .ok_or(StoreError::NotInitialized(domain))
    }

    pub fn try_read(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.slot(domain).current.load_full()
    }

    /// Snapshot that the current one replaced, if any.
    pub fn previous(&self, domain: Domain) -> Option<Arc<Snapshot>> {
        self.slot(domain).previous.load_full()
    }

    /// Store the startup snapshot of a domain.
    pub fn initialize(&self, domain: Domain, snapshot: Snapshot) -> Result<(), StoreError> {
        let slot = self.slot(domain);
        let mut initialized = slot.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        if *initialized {
            return Err(StoreError::AlreadyInitialized(domain));
        }

        let version = snapshot.source_version;
        let replaced = slot.current.swap(Some(Arc::new(snapshot)));
        if replaced.is_some() {
            slot.previous.store(replaced);
        }
        *initialized = true;

        metrics::record_snapshot_version(domain, version);
        tracing::debug!(domain = %domain, version = version.get(), "Snapshot initialized");
        Ok(())
    }

    /// Atomically replace the current snapshot; returns the one it replaced.
    pub fn publish(&self, domain: Domain, snapshot: Arc<Snapshot>) -> Option<Arc<Snapshot>> {
        let slot = self.slot(domain);
        let mut initialized = slot.write_lock.lock().unwrap_or_else(PoisonError::into_inner);

        let version = snapshot.source_version;
        let replaced = slot.current.swap(Some(snapshot));
        slot.previous.store(replaced.clone());
        *initialized = false;

        metrics::record_snapshot_version(domain, version);
        replaced
    }

    /// Whether every known domain has a snapshot.
    pub fn is_ready(&self) -> bool {
        self.slots.iter().all(|slot| slot.current.load().is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ConfigDocument, SourceVersion};
    use serde_json::json;

    fn snapshot(domain: Domain, version: u64) -> Snapshot {
        Snapshot::new(
            ConfigDocument::new(domain, json!({ "version": version })),
            SourceVersion::new(version),
        )
    }

    #[test]
    fn test_read_before_initialize() {
        let store = SnapshotStore::new();
        assert_eq!(store.read(Domain::App).unwrap_err(), StoreError::NotInitialized(Domain::App));
        assert!(!store.is_ready());
    }

    #[test]
    fn test_double_initialize_rejected() {
        let store = SnapshotStore::new();
        store.initialize(Domain::App, snapshot(Domain::App, 1)).unwrap();
        assert_eq!(
            store.initialize(Domain::App, snapshot(Domain::App, 2)).unwrap_err(),
            StoreError::AlreadyInitialized(Domain::App)
        );
        assert_eq!(store.read(Domain::App).unwrap().source_version, SourceVersion::new(1));
    }

    #[test]
    fn test_initialize_allowed_again_after_publish() {
        let store = SnapshotStore::new();
        store.initialize(Domain::Ui, snapshot(Domain::Ui, 1)).unwrap();
        store.publish(Domain::Ui, Arc::new(snapshot(Domain::Ui, 2)));
        store.initialize(Domain::Ui, snapshot(Domain::Ui, 3)).unwrap();
        assert_eq!(store.read(Domain::Ui).unwrap().source_version, SourceVersion::new(3));
    }

    #[test]
    fn test_publish_moves_current_to_previous() {
        let store = SnapshotStore::new();
        store.initialize(Domain::Business, snapshot(Domain::Business, 1)).unwrap();
        assert!(store.previous(Domain::Business).is_none());

        let replaced = store.publish(Domain::Business, Arc::new(snapshot(Domain::Business, 2)));
        assert_eq!(replaced.unwrap().source_version, SourceVersion::new(1));
        assert_eq!(store.read(Domain::Business).unwrap().source_version, SourceVersion::new(2));
        assert_eq!(
            store.previous(Domain::Business).unwrap().source_version,
            SourceVersion::new(1)
        );
    }

    #[test]
    fn test_ready_once_all_domains_present() {
        let store = SnapshotStore::new();
        for domain in Domain::ALL {
            assert!(!store.is_ready());
            store.initialize(domain, snapshot(domain, 1)).unwrap();
        }
        assert!(store.is_ready());
    }

    #[test]
    fn test_domains_are_independent() {
        let store = SnapshotStore::new();
        store.initialize(Domain::App, snapshot(Domain::App, 1)).unwrap();
        store.publish(Domain::App, Arc::new(snapshot(Domain::App, 5)));
        assert!(store.read(Domain::Ui).is_err());
        assert!(store.previous(Domain::Ui).is_none());
    }
}
