//! confwatch daemon.
//!
//! ```text
//!   config files ──notify/poll──▶ watcher ──mpsc──▶ dispatcher ──▶ coordinator
//!                                                                     │
//!                                     readers ◀── snapshot store ◀────┤
//!                                                                     ▼
//!                          WebSocket clients ◀── topic hub ◀── change broadcaster
//! ```

use clap::Parser;
use std::path::PathBuf;

use confwatch::config::{self, EngineConfig};
use confwatch::lifecycle::startup;
use confwatch::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "confwatch")]
#[command(about = "Live configuration hot-reload engine", long_about = None)]
struct Args {
    /// Engine settings file (TOML). Defaults are used when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let settings = match &args.config {
        Some(path) => config::load_config(path)?,
        None => EngineConfig::default(),
    };

    logging::init(&settings.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "confwatch starting");
    tracing::info!(
        directory = %settings.sources.directory,
        strategy = ?settings.watch.strategy,
        poll_interval_ms = settings.watch.poll_interval_ms,
        workers = settings.reload.workers,
        "Configuration loaded"
    );

    if settings.observability.metrics_enabled {
        match settings.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %settings.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    startup::run(settings).await?;
    Ok(())
}
