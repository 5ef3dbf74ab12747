//! Native change notifications.

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc};
use tokio::time::Instant;

use crate::domain::{ChangeEvent, ChangeOrigin, Domain};
use crate::source::SourceAccessor;
use crate::watcher::WatchError;

/// Why the push loop returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PushExit {
    /// Shutdown was signalled.
    Shutdown,
    /// Nobody consumes change events anymore.
    Closed,
    /// Notifications can no longer be trusted; switch to polling.
    Lost,
}

type RawEvents = mpsc::UnboundedReceiver<notify::Result<Event>>;

/// Registered native watcher plus the per-domain settle timers.
pub struct PushWatcher {
    // Dropping the watcher unregisters it.
    _watcher: Option<RecommendedWatcher>,
    raw: RawEvents,
    source: Arc<dyn SourceAccessor>,
    settle: Duration,
}

impl PushWatcher {
    /// Register on the source's watch root.
    pub fn register(source: Arc<dyn SourceAccessor>, settle: Duration) -> Result<Self, WatchError> {
        let root = source.watch_root().ok_or(WatchError::Unsupported)?.to_path_buf();
        if !root.is_dir() {
            return Err(WatchError::MissingRoot(root));
        }

        let (tx, raw) = mpsc::unbounded_channel();
        let mut watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                let _ = tx.send(res);
            },
            notify::Config::default(),
        )?;
        watcher.watch(&root, RecursiveMode::NonRecursive)?;

        tracing::info!(path = ?root, settle = ?settle, "Native source watcher registered");
        Ok(Self::from_parts(Some(watcher), raw, source, settle))
    }

    fn from_parts(
        watcher: Option<RecommendedWatcher>,
        raw: RawEvents,
        source: Arc<dyn SourceAccessor>,
        settle: Duration,
    ) -> Self {
        Self {
            _watcher: watcher,
            raw,
            source,
            settle,
        }
    }

    /// Watcher fed by hand instead of by the OS.
    #[cfg(test)]
    pub(crate) fn detached(
        source: Arc<dyn SourceAccessor>,
        settle: Duration,
    ) -> (Self, mpsc::UnboundedSender<notify::Result<Event>>) {
        let (tx, raw) = mpsc::unbounded_channel();
        (Self::from_parts(None, raw, source, settle), tx)
    }

    /// Forward settled changes until shutdown or until notifications are lost.
    pub async fn run(
        mut self,
        events: &mpsc::Sender<ChangeEvent>,
        shutdown: &mut broadcast::Receiver<()>,
    ) -> PushExit {
        let mut pending: HashMap<Domain, Instant> = HashMap::new();

        loop {
            let next_due = pending.values().min().copied();
            let wake_at = next_due.unwrap_or_else(|| Instant::now() + Duration::from_secs(3600));

            tokio::select! {
                _ = shutdown.recv() => {
                    tracing::info!("Source watcher received shutdown signal, exiting loop");
                    return PushExit::Shutdown;
                }
                raw = self.raw.recv() => match raw {
                    Some(Ok(event)) => self.track(&event, &mut pending),
                    Some(Err(e)) => {
                        tracing::warn!(error = %e, "Native watcher reported an error");
                        return PushExit::Lost;
                    }
                    None => return PushExit::Lost,
                },
                _ = tokio::time::sleep_until(wake_at), if next_due.is_some() => {
                    let now = Instant::now();
                    let due: Vec<Domain> = pending
                        .iter()
                        .filter(|(_, at)| **at <= now)
                        .map(|(domain, _)| *domain)
                        .collect();

                    for domain in due {
                        pending.remove(&domain);
                        tracing::debug!(domain = %domain, "Source change settled");
                        if events.send(ChangeEvent::new(domain, ChangeOrigin::Push)).await.is_err() {
                            return PushExit::Closed;
                        }
                    }
                }
            }
        }
    }

    /// Start the settle timer of every domain the event touches. A timer
    /// already running is not extended.
    fn track(&self, event: &Event, pending: &mut HashMap<Domain, Instant>) {
        if event.need_rescan() {
            tracing::debug!("Native watcher overflow signal discarded");
            return;
        }

        if !(event.kind.is_modify() || event.kind.is_create()) {
            return;
        }

        let due = Instant::now() + self.settle;
        for path in &event.paths {
            if let Some(domain) = self.source.domain_for_entry(path) {
                pending.entry(domain).or_insert(due);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::lifecycle::Shutdown;
    use crate::source::{FileSource, MemorySource};

    #[test]
    fn test_register_requires_watch_root() {
        let source = Arc::new(MemorySource::new());
        let err = PushWatcher::register(source, Duration::from_millis(10)).err().unwrap();
        assert!(matches!(err, WatchError::Unsupported));
    }

    #[test]
    fn test_register_requires_existing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FileSource::new(dir.path().join("absent")));
        let err = PushWatcher::register(source, Duration::from_millis(10)).err().unwrap();
        assert!(matches!(err, WatchError::MissingRoot(_)));
    }

    #[tokio::test]
    async fn test_watcher_error_means_notifications_lost() {
        let source = Arc::new(MemorySource::new());
        let (push, raw) = PushWatcher::detached(source, Duration::from_millis(10));
        let (tx, _rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let mut shutdown_rx = shutdown.subscribe();

        raw.send(Err(notify::Error::generic("inotify queue gone"))).unwrap();
        let exit = tokio::time::timeout(Duration::from_secs(1), push.run(&tx, &mut shutdown_rx))
            .await
            .unwrap();
        assert_eq!(exit, PushExit::Lost);
    }

    #[tokio::test]
    async fn test_closed_notification_stream_means_notifications_lost() {
        let source = Arc::new(MemorySource::new());
        let (push, raw) = PushWatcher::detached(source, Duration::from_millis(10));
        let (tx, _rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let mut shutdown_rx = shutdown.subscribe();

        drop(raw);
        let exit = tokio::time::timeout(Duration::from_secs(1), push.run(&tx, &mut shutdown_rx))
            .await
            .unwrap();
        assert_eq!(exit, PushExit::Lost);
    }

    #[tokio::test]
    async fn test_burst_of_writes_settles_into_one_event() {
        let dir = tempfile::tempdir().unwrap();
        let source = Arc::new(FileSource::new(dir.path()));
        let path = source.path_for(Domain::FeatureFlags);
        std::fs::write(&path, "{}").unwrap();

        let push = PushWatcher::register(source, Duration::from_millis(150)).unwrap();
        let (tx, mut rx) = mpsc::channel(8);
        let shutdown = Shutdown::new();
        let mut shutdown_rx = shutdown.subscribe();
        let task = tokio::spawn(async move { push.run(&tx, &mut shutdown_rx).await });

        for i in 0..3 {
            std::fs::write(&path, format!(r#"{{"n": {}}}"#, i)).unwrap();
        }
        std::fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let event = tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(event.domain, Domain::FeatureFlags);
        assert_eq!(event.origin, ChangeOrigin::Push);

        tokio::time::sleep(Duration::from_millis(400)).await;
        assert!(rx.try_recv().is_err());

        shutdown.trigger();
        assert_eq!(task.await.unwrap(), PushExit::Shutdown);
    }
}
