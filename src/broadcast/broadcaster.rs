//! Fan-out of successful reloads.

use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};
use tokio::sync::broadcast;

use crate::broadcast::channel::NotificationChannel;
use crate::config::BroadcastConfig;
use crate::domain::{Domain, Snapshot};
use crate::observability::metrics;
use crate::reload::ReloadOutcome;

/// Change delivered to in-process listeners.
#[derive(Debug, Clone)]
pub struct ConfigChange {
    pub domain: Domain,
    pub previous: Option<Arc<Snapshot>>,
    pub current: Arc<Snapshot>,
    pub announced_at: SystemTime,
}

/// Payload sent on the external channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigUpdateMessage {
    #[serde(rename = "type")]
    pub domain: Domain,
    pub config: serde_json::Value,
    pub version: u64,
    /// Milliseconds since the epoch.
    pub timestamp: u64,
}

impl ConfigUpdateMessage {
    pub fn new(snapshot: &Snapshot, at: SystemTime) -> Self {
        Self {
            domain: snapshot.domain(),
            config: snapshot.document.value().clone(),
            version: snapshot.source_version.get(),
            timestamp: at.duration_since(UNIX_EPOCH).unwrap_or_default().as_millis() as u64,
        }
    }
}

/// Delivers reload outcomes to listeners and the external channel.
pub struct ChangeBroadcaster {
    listeners: broadcast::Sender<ConfigChange>,
    channel: Arc<dyn NotificationChannel>,
    topic: String,
    delivery_timeout: Duration,
}

impl ChangeBroadcaster {
    pub fn new(channel: Arc<dyn NotificationChannel>, config: &BroadcastConfig) -> Self {
        let (listeners, _) = broadcast::channel(config.listener_capacity.max(1));
        Self {
            listeners,
            channel,
            topic: config.topic.clone(),
            delivery_timeout: config.delivery_timeout(),
        }
    }

    /// Register an in-process listener.
    ///
    /// A listener that falls more than `listener_capacity` changes behind
    /// receives `RecvError::Lagged` and should re-read the store.
    pub fn subscribe(&self) -> broadcast::Receiver<ConfigChange> {
        self.listeners.subscribe()
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Deliver one outcome. Never fails; delivery problems are logged.
    ///
    /// Callers must not announce two outcomes of the same domain concurrently;
    /// the reload coordinator guarantees this.
    pub async fn announce(&self, outcome: &ReloadOutcome) {
        let now = SystemTime::now();
        let change = ConfigChange {
            domain: outcome.domain,
            previous: outcome.previous.clone(),
            current: outcome.current.clone(),
            announced_at: now,
        };

        match self.listeners.send(change) {
            Ok(receivers) => tracing::debug!(domain = %outcome.domain, receivers, "Change sent to listeners"),
            Err(_) => tracing::debug!(domain = %outcome.domain, "No in-process listeners"),
        }

        let message = ConfigUpdateMessage::new(&outcome.current, now);
        let payload = match serde_json::to_value(&message) {
            Ok(payload) => payload,
            Err(e) => {
                tracing::error!(domain = %outcome.domain, error = %e, "Failed to encode change notification");
                metrics::record_notification_failure(&self.topic);
                return;
            }
        };

        let delivery = self.channel.publish(&self.topic, payload);
        match tokio::time::timeout(self.delivery_timeout, delivery).await {
            Ok(Ok(())) => {
                tracing::info!(domain = %outcome.domain, topic = %self.topic, "Subscribers notified");
            }
            Ok(Err(e)) => {
                tracing::warn!(domain = %outcome.domain, topic = %self.topic, error = %e, "Change notification failed");
                metrics::record_notification_failure(&self.topic);
            }
            Err(_) => {
                tracing::warn!(
                    domain = %outcome.domain,
                    topic = %self.topic,
                    timeout = ?self.delivery_timeout,
                    "Change notification timed out"
                );
                metrics::record_notification_failure(&self.topic);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::broadcast::channel::{NotificationError, TopicHub};
    use crate::domain::{ConfigDocument, SourceVersion};
    use async_trait::async_trait;
    use serde_json::json;

    struct FailingChannel;

    #[async_trait]
    impl NotificationChannel for FailingChannel {
        async fn publish(&self, topic: &str, _payload: serde_json::Value) -> Result<(), NotificationError> {
            Err(NotificationError::Delivery {
                topic: topic.to_string(),
                reason: "unreachable".into(),
            })
        }
    }

    fn outcome(version: u64) -> ReloadOutcome {
        let current = Arc::new(Snapshot::new(
            ConfigDocument::new(Domain::Ui, json!({"branding": {"primaryColor": "#000"}})),
            SourceVersion::new(version),
        ));
        ReloadOutcome {
            domain: Domain::Ui,
            previous: None,
            current,
        }
    }

    #[tokio::test]
    async fn test_listeners_and_channel_receive_change() {
        let hub = Arc::new(TopicHub::new(8));
        let config = BroadcastConfig::default();
        let mut external = hub.subscribe(&config.topic);
        let broadcaster = ChangeBroadcaster::new(hub.clone(), &config);
        let mut listener = broadcaster.subscribe();

        broadcaster.announce(&outcome(3)).await;

        let change = listener.recv().await.unwrap();
        assert_eq!(change.domain, Domain::Ui);
        assert_eq!(change.current.source_version, SourceVersion::new(3));

        let message: ConfigUpdateMessage = serde_json::from_str(&external.recv().await.unwrap()).unwrap();
        assert_eq!(message.domain, Domain::Ui);
        assert_eq!(message.version, 3);
        assert_eq!(message.config["branding"]["primaryColor"], "#000");
    }

    #[tokio::test]
    async fn test_channel_failure_does_not_stop_listeners() {
        let broadcaster = ChangeBroadcaster::new(Arc::new(FailingChannel), &BroadcastConfig::default());
        let mut listener = broadcaster.subscribe();

        broadcaster.announce(&outcome(1)).await;
        broadcaster.announce(&outcome(2)).await;

        assert_eq!(listener.recv().await.unwrap().current.source_version, SourceVersion::new(1));
        assert_eq!(listener.recv().await.unwrap().current.source_version, SourceVersion::new(2));
    }

    #[test]
    fn test_message_uses_type_field() {
        let message = ConfigUpdateMessage::new(&outcome(9).current, UNIX_EPOCH);
        let value = serde_json::to_value(&message).unwrap();
        assert_eq!(value["type"], "ui");
        assert_eq!(value["timestamp"], 0);
    }
}
