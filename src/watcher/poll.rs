//! Polling change detection.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{self, MissedTickBehavior};

use crate::domain::{ChangeEvent, ChangeOrigin, Domain, SourceVersion};
use crate::source::SourceAccessor;

/// Version marker of one domain as seen by a scan. `None` means missing.
pub type Observation = (Domain, std::io::Result<Option<SourceVersion>>);

/// Periodically compares version markers against the last ones seen.
pub struct PollWatcher {
    source: Arc<dyn SourceAccessor>,
    interval: Duration,
    last_seen: HashMap<Domain, Option<SourceVersion>>,
}

impl PollWatcher {
    pub fn new(source: Arc<dyn SourceAccessor>, interval: Duration) -> Self {
        Self {
            source,
            interval,
            last_seen: HashMap::new(),
        }
    }

    /// Start from versions already known to be loaded, so a change made
    /// before the first scan is still reported. Domains left out take
    /// their first scan as the baseline.
    pub fn with_baseline(mut self, baseline: impl IntoIterator<Item = (Domain, SourceVersion)>) -> Self {
        self.last_seen
            .extend(baseline.into_iter().map(|(domain, version)| (domain, Some(version))));
        self
    }

    pub async fn run(mut self, events: mpsc::Sender<ChangeEvent>, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(interval = ?self.interval, "Polling source watcher starting");

        let mut ticker = time::interval(self.interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    for domain in self.poll_once().await {
                        if events.send(ChangeEvent::new(domain, ChangeOrigin::Poll)).await.is_err() {
                            tracing::debug!("Change event queue closed, polling stopped");
                            return;
                        }
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Polling watcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }
    }

    async fn poll_once(&mut self) -> Vec<Domain> {
        let source = self.source.clone();
        match tokio::task::spawn_blocking(move || scan(source.as_ref())).await {
            Ok(observations) => self.observe(observations),
            Err(e) => {
                tracing::error!(error = %e, "Source scan task failed");
                Vec::new()
            }
        }
    }

    /// Record a scan and return the domains whose marker changed. The first
    /// observation of a domain without a baseline is only recorded.
    pub fn observe(&mut self, observations: Vec<Observation>) -> Vec<Domain> {
        let mut changed = Vec::new();
        for (domain, observed) in observations {
            let version = match observed {
                Ok(version) => version,
                Err(e) => {
                    tracing::debug!(domain = %domain, error = %e, "Failed to read version marker");
                    continue;
                }
            };

            match self.last_seen.insert(domain, version) {
                Some(previous) if previous != version => {
                    tracing::debug!(domain = %domain, "Version marker changed");
                    changed.push(domain);
                }
                _ => {}
            }
        }
        changed
    }
}

/// Read every domain's version marker.
pub fn scan(source: &dyn SourceAccessor) -> Vec<Observation> {
    Domain::ALL
        .iter()
        .map(|&domain| {
            let observed = if source.exists(domain) {
                source.version(domain).map(Some)
            } else {
                Ok(None)
            };
            (domain, observed)
        })
        .collect()
}
