//! Reload coordination subsystem.
//!
//! # Data Flow
//! ```text
//! SourceWatcher → mpsc (bounded) → dispatch.rs ReloadDispatcher
//!     → worker permit → coordinator.rs ReloadCoordinator::handle(event)
//!         → fetch raw (blocking pool, timeout) → ConfigLoader
//!         → version newer? → SnapshotStore::publish → ChangeBroadcaster::announce
//! ```
//!
//! # Design Decisions
//! - At most one reload pass per domain at a time; different domains run in parallel
//! - Events arriving during a pass collapse into exactly one follow-up pass
//! - A failed pass never touches the store; the last good snapshot stays current
//! - Publishing requires a strictly newer version marker, so versions never go back

pub mod coordinator;
pub mod dispatch;
pub mod status;

pub use coordinator::{ReloadCoordinator, ReloadState};
pub use dispatch::ReloadDispatcher;
pub use status::{DomainReport, ForcedReload, ReloadOutcome, ReloadStatus};
