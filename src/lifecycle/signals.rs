//! OS signal handling.
//!
//! # Responsibilities
//! - Register signal handlers (SIGTERM, SIGINT, SIGHUP)
//! - SIGHUP forces a reload of every domain
//! - SIGTERM and Ctrl-C trigger graceful shutdown

use std::sync::Arc;

use crate::engine::ConfigEngine;
use crate::lifecycle::Shutdown;

/// Handle signals until shutdown.
#[cfg(unix)]
pub async fn listen(engine: Arc<ConfigEngine>, shutdown: Arc<Shutdown>) {
    use tokio::signal::unix::{signal, SignalKind};

    let (mut hangup, mut terminate) = match (signal(SignalKind::hangup()), signal(SignalKind::terminate())) {
        (Ok(hangup), Ok(terminate)) => (hangup, terminate),
        (Err(e), _) | (_, Err(e)) => {
            tracing::error!(error = %e, "Failed to register signal handlers, only Ctrl-C is handled");
            wait_for_ctrl_c(&shutdown).await;
            return;
        }
    };

    loop {
        tokio::select! {
            Some(()) = hangup.recv() => {
                tracing::info!("SIGHUP received, reloading every domain");
                let forced = engine.force_reload_all().await;
                if !forced.all_succeeded() {
                    tracing::warn!(failed = forced.failures().len(), "Forced reload finished with failures");
                }
            }
            _ = terminate.recv() => {
                tracing::info!("SIGTERM received");
                break;
            }
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Ctrl-C received");
                break;
            }
            _ = shutdown.wait() => return,
        }
    }

    shutdown.trigger();
}

#[cfg(not(unix))]
pub async fn listen(_engine: Arc<ConfigEngine>, shutdown: Arc<Shutdown>) {
    wait_for_ctrl_c(&shutdown).await;
}

async fn wait_for_ctrl_c(shutdown: &Shutdown) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(e) = result {
                tracing::error!(error = %e, "Failed to listen for Ctrl-C");
                return;
            }
            tracing::info!("Ctrl-C received");
            shutdown.trigger();
        }
        _ = shutdown.wait() => {}
    }
}
