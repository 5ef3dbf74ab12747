//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (startup.rs):
//!     Load settings → Load every domain → Start watcher + dispatcher → Start admin listener
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Stop watching → Finish in-flight reloads → Close listener
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//!     SIGHUP → Force a reload of every domain
//! ```
//!
//! # Design Decisions
//! - Ordered startup: settings first, then snapshots, then tasks, then listeners
//! - Any startup load failure is fatal; later failures only log

pub mod shutdown;
pub mod signals;
pub mod startup;

pub use shutdown::Shutdown;
pub use startup::StartupError;
