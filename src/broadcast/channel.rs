//! External notification channels.
//!
//! # Responsibilities
//! - Define the publish(topic, payload) seam to the outside world
//! - Provide an in-process topic hub that WebSocket clients subscribe to
//!
//! # Design Decisions
//! - Fire-and-forget: a topic nobody listens to is not an error
//! - Payloads are serialized once and shared as text between subscribers

use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::broadcast;

/// Errors raised by a notification channel.
#[derive(Debug, Error)]
pub enum NotificationError {
    #[error("failed to encode payload for '{topic}': {source}")]
    Encode {
        topic: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("delivery to '{topic}' failed: {reason}")]
    Delivery { topic: String, reason: String },
}

/// Transport used to push change notifications to remote subscribers.
#[async_trait]
pub trait NotificationChannel: Send + Sync {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), NotificationError>;
}

/// Channel that drops every message.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopChannel;

#[async_trait]
impl NotificationChannel for NoopChannel {
    async fn publish(&self, _topic: &str, _payload: serde_json::Value) -> Result<(), NotificationError> {
        Ok(())
    }
}

/// In-process fan-out of serialized payloads, one broadcast queue per topic.
#[derive(Debug, Clone)]
pub struct TopicHub {
    topics: Arc<DashMap<String, broadcast::Sender<Arc<str>>>>,
    capacity: usize,
}

impl TopicHub {
    pub fn new(capacity: usize) -> Self {
        Self {
            topics: Arc::new(DashMap::new()),
            capacity: capacity.max(1),
        }
    }

    fn sender(&self, topic: &str) -> broadcast::Sender<Arc<str>> {
        self.topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Receive every payload published to `topic` from now on.
    pub fn subscribe(&self, topic: &str) -> broadcast::Receiver<Arc<str>> {
        self.sender(topic).subscribe()
    }

    /// Number of live subscribers on `topic`.
    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|s| s.receiver_count())
            .unwrap_or(0)
    }
}

#[async_trait]
impl NotificationChannel for TopicHub {
    async fn publish(&self, topic: &str, payload: serde_json::Value) -> Result<(), NotificationError> {
        let text = serde_json::to_string(&payload).map_err(|source| NotificationError::Encode {
            topic: topic.to_string(),
            source,
        })?;

        match self.sender(topic).send(Arc::from(text)) {
            Ok(receivers) => tracing::debug!(topic, receivers, "Notification published"),
            Err(_) => tracing::debug!(topic, "Notification published with no subscribers"),
        }
        Ok(())
    }
}
