//! WebSocket delivery of change notifications.
//!
//! # Data Flow
//! ```text
//! ChangeBroadcaster → TopicHub (topic) → per-connection receiver → WebSocket text frame
//! ```
//!
//! # Design Decisions
//! - One hub subscription per connection; a slow client only lags itself
//! - Incoming frames are ignored apart from close
//! - Connections close on shutdown so the listener can drain

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use tokio::sync::broadcast::error::RecvError;
use uuid::Uuid;

use crate::admin::AppState;

pub async fn config_updates(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| stream_updates(socket, state))
}

async fn stream_updates(mut socket: WebSocket, state: AppState) {
    let connection = Uuid::new_v4();
    let mut updates = state.hub.subscribe(&state.topic);
    tracing::debug!(%connection, topic = %state.topic, "WebSocket subscriber connected");

    loop {
        tokio::select! {
            update = updates.recv() => match update {
                Ok(text) => {
                    if socket.send(Message::Text(text.to_string().into())).await.is_err() {
                        break;
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(%connection, skipped, "WebSocket subscriber lagged, notifications dropped");
                }
                Err(RecvError::Closed) => break,
            },
            incoming = socket.recv() => match incoming {
                Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                Some(Ok(_)) => {}
            },
            _ = state.shutdown.wait() => {
                let _ = socket.send(Message::Close(None)).await;
                break;
            }
        }
    }

    tracing::debug!(%connection, "WebSocket subscriber disconnected");
}
