//! Snapshot storage.
//!
//! # Data Flow
//! ```text
//! startup: initialize(domain, snapshot)   (once per domain)
//! reload:  publish(domain, snapshot)      (swap current, keep previous)
//! readers: read(domain) → Arc<Snapshot>   (lock-free load)
//! ```
//!
//! # Design Decisions
//! - Reads never take a lock: each slot is an `ArcSwapOption`
//! - Writers for the same domain are serialized by a per-slot mutex so
//!   current/previous move together
//! - The store is an injected value, not a process-wide singleton

pub mod snapshot_store;

pub use snapshot_store::{SnapshotStore, StoreError};
