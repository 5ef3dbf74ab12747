//! Change event dispatch onto a bounded worker pool.

use std::sync::Arc;
use tokio::sync::{broadcast, mpsc, Semaphore};
use tokio::task::JoinSet;

use crate::domain::ChangeEvent;
use crate::observability::metrics;
use crate::reload::coordinator::ReloadCoordinator;

/// Drains the watcher's event queue and hands events to the coordinator.
pub struct ReloadDispatcher {
    events: mpsc::Receiver<ChangeEvent>,
    coordinator: Arc<ReloadCoordinator>,
    workers: Arc<Semaphore>,
}

impl ReloadDispatcher {
    pub fn new(
        events: mpsc::Receiver<ChangeEvent>,
        coordinator: Arc<ReloadCoordinator>,
        workers: usize,
    ) -> Self {
        Self {
            events,
            coordinator,
            workers: Arc::new(Semaphore::new(workers.max(1))),
        }
    }

    /// Run until shutdown or until every event sender is gone, then wait for
    /// in-flight reloads to finish.
    pub async fn run(mut self, mut shutdown: broadcast::Receiver<()>) {
        tracing::info!(workers = self.workers.available_permits(), "Reload dispatcher starting");
        let mut in_flight = JoinSet::new();

        'dispatch: loop {
            tokio::select! {
                event = self.events.recv() => {
                    let Some(event) = event else {
                        tracing::debug!("Change event queue closed");
                        break;
                    };
                    metrics::record_change_event(event.domain, event.origin);

                    // Backpressure: stop pulling events while every worker is busy.
                    let permit = tokio::select! {
                        permit = self.workers.clone().acquire_owned() => match permit {
                            Ok(permit) => permit,
                            Err(_) => break 'dispatch,
                        },
                        _ = shutdown.recv() => break 'dispatch,
                    };

                    let coordinator = self.coordinator.clone();
                    in_flight.spawn(async move {
                        let _permit = permit;
                        coordinator.handle(event).await
                    });
                }
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    if let Err(e) = joined {
                        tracing::error!(error = %e, "Reload task failed");
                    }
                }
                _ = shutdown.recv() => {
                    tracing::info!("Reload dispatcher received shutdown signal, exiting loop");
                    break;
                }
            }
        }

        let pending = in_flight.len();
        if pending > 0 {
            tracing::info!(pending, "Waiting for in-flight reloads");
        }
        while let Some(joined) = in_flight.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "Reload task failed");
            }
        }
        tracing::info!("Reload dispatcher stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::{ChangeBroadcaster, NoopChannel};
    use crate::config::BroadcastConfig;
    use crate::domain::{ChangeOrigin, ConfigLoader, Domain};
    use crate::lifecycle::Shutdown;
    use crate::source::MemorySource;
    use crate::store::SnapshotStore;
    use std::time::Duration;

    #[tokio::test]
    async fn test_events_reach_store_and_shutdown_drains() {
        let source = Arc::new(MemorySource::new());
        source.put(Domain::App, "{}");
        source.put(Domain::Ui, "{}");
        let store = Arc::new(SnapshotStore::new());
        let broadcaster = Arc::new(ChangeBroadcaster::new(
            Arc::new(NoopChannel),
            &BroadcastConfig::default(),
        ));
        let coordinator = Arc::new(ReloadCoordinator::new(
            source,
            ConfigLoader::new(),
            store.clone(),
            broadcaster.clone(),
            Duration::from_secs(2),
        ));
        let mut changes = broadcaster.subscribe();

        let (tx, rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let dispatcher = ReloadDispatcher::new(rx, coordinator, 2);
        let handle = tokio::spawn(dispatcher.run(shutdown.subscribe()));

        tx.send(ChangeEvent::new(Domain::App, ChangeOrigin::Poll)).await.unwrap();
        tx.send(ChangeEvent::new(Domain::Ui, ChangeOrigin::Push)).await.unwrap();

        let mut seen = vec![
            changes.recv().await.unwrap().domain,
            changes.recv().await.unwrap().domain,
        ];
        seen.sort();
        assert_eq!(seen, vec![Domain::App, Domain::Ui]);
        assert!(store.read(Domain::App).is_ok());

        shutdown.trigger();
        tokio::time::timeout(Duration::from_secs(2), handle)
            .await
            .expect("dispatcher did not stop")
            .unwrap();
    }
}
