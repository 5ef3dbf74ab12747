//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! watcher / coordinator / broadcaster produce:
//!     → logging.rs (structured log events via tracing)
//!     → metrics.rs (counters and gauges via the metrics facade)
//!
//! Consumers:
//!     → stdout (pretty or JSON)
//!     → Prometheus scrape endpoint (optional)
//! ```
//!
//! # Design Decisions
//! - Domain keys and event origins are the only metric labels
//! - Reload failures after startup surface here, never to readers
//! - Metrics are no-ops until a recorder is installed

pub mod logging;
pub mod metrics;
