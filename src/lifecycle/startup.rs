//! Startup orchestration.
//!
//! # Responsibilities
//! - Load every domain before anything else runs
//! - Start the watcher and dispatcher
//! - Bind the admin listener and serve until shutdown
//!
//! # Design Decisions
//! - Fail fast: a domain that cannot be loaded at startup is fatal
//! - Domains load in order, not concurrently
//! - Listeners start last (requests only once every domain is ready)

use std::sync::Arc;
use thiserror::Error;
use tokio::net::TcpListener;

use crate::admin::{self, AppState};
use crate::broadcast::TopicHub;
use crate::config::EngineConfig;
use crate::domain::{ConfigError, ConfigLoader, Domain, Snapshot};
use crate::engine::ConfigEngine;
use crate::lifecycle::{signals, Shutdown};
use crate::source::{self, FileSource, SourceAccessor};
use crate::store::{SnapshotStore, StoreError};

/// Errors that abort startup.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("failed to load initial configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("failed to store initial snapshot: {0}")]
    Store(#[from] StoreError),

    #[error("admin listener failed: {0}")]
    Io(#[from] std::io::Error),
}

/// Load every domain and store it as the startup snapshot.
pub fn load_all(
    source: &dyn SourceAccessor,
    loader: &ConfigLoader,
    store: &SnapshotStore,
) -> Result<(), StartupError> {
    for domain in Domain::ALL {
        let raw = source::fetch_raw(source, domain)?;
        let document = loader.load(domain, Some(&raw.bytes))?;
        let version = raw.version;
        store.initialize(domain, Snapshot::new(document, version))?;

        tracing::info!(domain = %domain, version = version.get(), "Configuration loaded");
    }
    Ok(())
}

/// Run the engine from file sources until shutdown.
pub async fn run(config: EngineConfig) -> Result<(), StartupError> {
    let file_source = FileSource::from_config(&config.sources);
    tracing::info!(directory = ?file_source.directory(), "Loading configuration sources");
    let source: Arc<dyn SourceAccessor> = Arc::new(file_source);

    let hub = Arc::new(TopicHub::new(config.broadcast.listener_capacity));
    let engine = Arc::new(ConfigEngine::bootstrap(source, hub.clone(), &config)?);
    let shutdown = Arc::new(Shutdown::new());

    let tasks = engine.start(&shutdown);
    let signals = tokio::spawn(signals::listen(engine.clone(), shutdown.clone()));

    let served = if config.admin.enabled {
        serve_admin(&config, engine.clone(), hub, shutdown.clone()).await
    } else {
        shutdown.wait().await;
        Ok(())
    };

    // a failed listener still stops the background tasks
    shutdown.trigger();
    tasks.stopped().await;
    signals.abort();

    served?;
    tracing::info!("Shutdown complete");
    Ok(())
}

async fn serve_admin(
    config: &EngineConfig,
    engine: Arc<ConfigEngine>,
    hub: Arc<TopicHub>,
    shutdown: Arc<Shutdown>,
) -> Result<(), StartupError> {
    let listener = TcpListener::bind(&config.admin.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Admin API listening");

    let state = AppState::new(engine, hub, config, shutdown.clone());
    let router = admin::setup_admin_router(state);

    axum::serve(listener, router)
        .with_graceful_shutdown(async move { shutdown.wait().await })
        .await?;

    tracing::info!("Admin API stopped");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::MemorySource;

    #[test]
    fn test_load_all_initializes_every_domain() {
        let source = MemorySource::new();
        for domain in Domain::ALL {
            source.put(domain, "{}");
        }
        let store = SnapshotStore::new();

        load_all(&source, &ConfigLoader::new(), &store).unwrap();
        assert!(store.is_ready());
    }

    #[test]
    fn test_load_all_fails_on_missing_domain() {
        let source = MemorySource::new();
        source.put(Domain::App, "{}");
        let store = SnapshotStore::new();

        let err = load_all(&source, &ConfigLoader::new(), &store).unwrap_err();
        assert!(matches!(
            err,
            StartupError::Config(ConfigError::SourceMissing(Domain::Business))
        ));
        assert!(!store.is_ready());
    }
}
