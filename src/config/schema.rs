//! Engine settings schema.
//!
//! This module defines the settings of the reload engine itself (where the
//! sources live, how they are watched, where the admin API listens). The
//! configuration *documents* it serves are modelled in `crate::domain`.
//! All types derive Serde traits for deserialization from a TOML file.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::Duration;

use crate::domain::Domain;

/// Root settings for the engine.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct EngineConfig {
    /// Where the configuration sources are read from.
    pub sources: SourcesConfig,

    /// Change detection settings.
    pub watch: WatchConfig,

    /// Reload worker settings.
    pub reload: ReloadConfig,

    /// Change broadcast settings.
    pub broadcast: BroadcastConfig,

    /// Admin HTTP API settings.
    pub admin: AdminConfig,

    /// Logging and metrics settings.
    pub observability: ObservabilityConfig,
}

/// Source location settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SourcesConfig {
    /// Directory holding one file per domain.
    pub directory: String,

    /// Per-domain file name overrides (e.g. `ui = "look.json"`).
    pub files: BTreeMap<Domain, String>,
}

impl Default for SourcesConfig {
    fn default() -> Self {
        Self {
            directory: "config".to_string(),
            files: BTreeMap::new(),
        }
    }
}

/// Which change detection strategy to try first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StrategyPreference {
    /// Try native notifications, fall back to polling.
    #[default]
    Auto,
    /// Same as `Auto`; the fallback cannot be disabled.
    Push,
    /// Skip native notifications entirely.
    Poll,
}

/// Change detection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WatchConfig {
    pub strategy: StrategyPreference,

    /// Polling period in milliseconds.
    pub poll_interval_ms: u64,

    /// Wait after a native notification before emitting, in milliseconds.
    pub settle_delay_ms: u64,

    /// Capacity of the change event channel.
    pub event_buffer: usize,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            strategy: StrategyPreference::Auto,
            poll_interval_ms: 5_000,
            settle_delay_ms: 500,
            event_buffer: 64,
        }
    }
}

impl WatchConfig {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

/// Reload worker settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ReloadConfig {
    /// Maximum reloads running at once.
    pub workers: usize,

    /// Upper bound for reading one source, in milliseconds.
    pub io_timeout_ms: u64,
}

impl Default for ReloadConfig {
    fn default() -> Self {
        Self {
            workers: 2,
            io_timeout_ms: 5_000,
        }
    }
}

impl ReloadConfig {
    pub fn io_timeout(&self) -> Duration {
        Duration::from_millis(self.io_timeout_ms)
    }
}

/// Change broadcast settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Queue depth for in-process listeners.
    pub listener_capacity: usize,

    /// Topic used on the external notification channel.
    pub topic: String,

    /// Upper bound for one external delivery, in milliseconds.
    pub delivery_timeout_ms: u64,
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            listener_capacity: 64,
            topic: "/topic/config-updates".to_string(),
            delivery_timeout_ms: 2_000,
        }
    }
}

impl BroadcastConfig {
    pub fn delivery_timeout(&self) -> Duration {
        Duration::from_millis(self.delivery_timeout_ms)
    }
}

/// Admin API settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdminConfig {
    pub enabled: bool,

    /// Bind address (e.g., "127.0.0.1:8081").
    pub bind_address: String,

    /// Bearer token required on the REST routes.
    pub api_key: String,
}

impl Default for AdminConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            bind_address: "127.0.0.1:8081".to_string(),
            api_key: "admin-secret-key".to_string(),
        }
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Default level when `RUST_LOG` is not set.
    pub log_level: String,

    pub log_format: LogFormat,

    /// Enable the Prometheus exporter.
    pub metrics_enabled: bool,

    /// Prometheus exporter bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
