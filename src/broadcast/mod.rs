//! Change broadcast subsystem.
//!
//! # Data Flow
//! ```text
//! ReloadCoordinator (successful publish)
//!     → broadcaster.rs announce(outcome)
//!         → in-process listeners (bounded tokio broadcast queue)
//!         → channel.rs NotificationChannel::publish(topic, payload)
//!             → TopicHub → WebSocket clients
//! ```
//!
//! # Design Decisions
//! - Best effort: a failed external delivery is logged, the snapshot stays published
//! - External delivery is bounded by a timeout so it cannot stall later reloads
//! - Per-domain order follows publish order because announce runs inside
//!   the domain's serialized reload pass

pub mod broadcaster;
pub mod channel;

pub use broadcaster::{ChangeBroadcaster, ConfigChange, ConfigUpdateMessage};
pub use channel::{NoopChannel, NotificationChannel, NotificationError, TopicHub};
