use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use std::collections::BTreeMap;

use crate::admin::AppState;
use crate::domain::{ConfigError, Domain, FeatureKey, Snapshot};
use crate::reload::DomainReport;
use crate::store::StoreError;

/// Error body returned by the admin API.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, Json(serde_json::json!({ "error": self.message }))).into_response()
    }
}

impl From<ConfigError> for ApiError {
    fn from(e: ConfigError) -> Self {
        let status = match e {
            ConfigError::UnknownDomain(_) | ConfigError::UnknownFeature(_) => StatusCode::NOT_FOUND,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        Self {
            status,
            message: e.to_string(),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        Self {
            status: StatusCode::SERVICE_UNAVAILABLE,
            message: e.to_string(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotView {
    pub domain: Domain,
    pub version: u64,
    pub loaded_at: u64,
    pub config: serde_json::Value,
}

impl From<&Snapshot> for SnapshotView {
    fn from(snapshot: &Snapshot) -> Self {
        Self {
            domain: snapshot.domain(),
            version: snapshot.source_version.get(),
            loaded_at: snapshot.loaded_at_millis(),
            config: snapshot.document.value().clone(),
        }
    }
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DomainStatus {
    pub version: u64,
    pub loaded_at: u64,
    pub has_previous: bool,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStatus {
    pub version: &'static str,
    pub ready: bool,
    pub watch_strategy: &'static str,
    pub subscribers: usize,
    pub domains: BTreeMap<Domain, DomainStatus>,
}

#[derive(Serialize)]
pub struct ReloadSummary {
    pub success: bool,
    pub results: BTreeMap<Domain, DomainReport>,
}

#[derive(Serialize)]
pub struct FeatureStatus {
    pub feature: &'static str,
    pub enabled: bool,
}

pub async fn get_current(State(state): State<AppState>) -> Json<BTreeMap<Domain, serde_json::Value>> {
    let current = Domain::ALL
        .into_iter()
        .filter_map(|domain| {
            let snapshot = state.engine.snapshot(domain).ok()?;
            Some((domain, snapshot.document.value().clone()))
        })
        .collect();
    Json(current)
}

pub async fn get_status(State(state): State<AppState>) -> Json<SystemStatus> {
    let engine = &state.engine;
    let domains = Domain::ALL
        .into_iter()
        .filter_map(|domain| {
            let snapshot = engine.snapshot(domain).ok()?;
            Some((
                domain,
                DomainStatus {
                    version: snapshot.source_version.get(),
                    loaded_at: snapshot.loaded_at_millis(),
                    has_previous: engine.previous(domain).is_some(),
                },
            ))
        })
        .collect();

    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        ready: engine.is_ready(),
        watch_strategy: engine.watch_strategy().as_str(),
        subscribers: state.hub.subscriber_count(&state.topic),
        domains,
    })
}

pub async fn get_domain(
    State(state): State<AppState>,
    Path(domain): Path<String>,
) -> Result<Json<SnapshotView>, ApiError> {
    let domain: Domain = domain.parse()?;
    let snapshot = state.engine.snapshot(domain)?;
    Ok(Json(SnapshotView::from(snapshot.as_ref())))
}

pub async fn post_reload(State(state): State<AppState>) -> Json<ReloadSummary> {
    let forced = state.engine.force_reload_all().await;
    Json(ReloadSummary {
        success: forced.all_succeeded(),
        results: forced.report(),
    })
}

pub async fn get_feature(
    State(state): State<AppState>,
    Path(feature): Path<String>,
) -> Result<Json<FeatureStatus>, ApiError> {
    let key: FeatureKey = feature.parse()?;
    Ok(Json(FeatureStatus {
        feature: key.name(),
        enabled: state.engine.feature_enabled(key),
    }))
}
