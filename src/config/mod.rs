//! Engine settings subsystem.
//!
//! # Data Flow
//! ```text
//! settings file (TOML)
//!     → loader.rs (parse & deserialize)
//!     → validation.rs (semantic checks)
//!     → EngineConfig (validated, immutable)
//!     → handed to source, watcher, reload, broadcast and admin setup
//! ```
//!
//! # Design Decisions
//! - Settings are read once at startup; only the configuration documents reload
//! - All fields have defaults to allow minimal settings files
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, parse_config, SettingsError};
pub use schema::{
    AdminConfig, BroadcastConfig, EngineConfig, LogFormat, ObservabilityConfig, ReloadConfig,
    SourcesConfig, StrategyPreference, WatchConfig,
};
