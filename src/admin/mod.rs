//! Admin HTTP API.
//!
//! # Routes
//! - `GET  /api/config/current`: every domain's current document
//! - `GET  /api/config/status`: readiness, watch strategy, per-domain versions
//! - `GET  /api/config/{domain}`: one snapshot with its version
//! - `POST /api/config/reload`: forced reload of every domain
//! - `GET  /api/config/feature/{feature}`: one feature flag
//! - `GET  /ws/config-updates`: WebSocket stream of change notifications
//!
//! The REST routes require `Authorization: Bearer <api_key>`.

pub mod auth;
pub mod handlers;
pub mod websocket;

use axum::{
    middleware,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

use crate::broadcast::TopicHub;
use crate::config::EngineConfig;
use crate::engine::ConfigEngine;
use crate::lifecycle::Shutdown;
use self::auth::admin_auth_middleware;
use self::handlers::*;

/// State shared by the admin handlers.
#[derive(Clone)]
pub struct AppState {
    pub engine: Arc<ConfigEngine>,
    pub hub: Arc<TopicHub>,
    pub topic: String,
    pub api_key: Arc<str>,
    pub shutdown: Arc<Shutdown>,
}

impl AppState {
    pub fn new(
        engine: Arc<ConfigEngine>,
        hub: Arc<TopicHub>,
        config: &EngineConfig,
        shutdown: Arc<Shutdown>,
    ) -> Self {
        Self {
            engine,
            hub,
            topic: config.broadcast.topic.clone(),
            api_key: Arc::from(config.admin.api_key.as_str()),
            shutdown,
        }
    }
}

pub fn setup_admin_router(state: AppState) -> Router {
    let api = Router::new()
        .route("/api/config/current", get(get_current))
        .route("/api/config/status", get(get_status))
        .route("/api/config/reload", post(post_reload))
        .route("/api/config/feature/{feature}", get(get_feature))
        .route("/api/config/{domain}", get(get_domain))
        .route_layer(middleware::from_fn_with_state(state.clone(), admin_auth_middleware));

    Router::new()
        .merge(api)
        .route("/ws/config-updates", get(websocket::config_updates))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}
