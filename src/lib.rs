//! Live configuration hot-reload engine.
//!
//! Loads a fixed set of configuration documents at startup, keeps them in
//! memory as immutable snapshots, reloads a document when its source changes
//! and broadcasts the change to listeners and WebSocket clients.

// Core
pub mod domain;
pub mod source;
pub mod store;

// Change pipeline
pub mod broadcast;
pub mod reload;
pub mod watcher;

// Surfaces
pub mod admin;
pub mod engine;

// Cross-cutting concerns
pub mod config;
pub mod lifecycle;
pub mod observability;

pub use config::EngineConfig;
pub use domain::{ConfigError, Domain, FeatureKey, Snapshot};
pub use engine::ConfigEngine;
pub use lifecycle::Shutdown;
