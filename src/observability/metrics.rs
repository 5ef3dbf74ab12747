//! Metrics collection and exposition.
//!
//! # Metrics
//! - `confwatch_change_events_total` (counter): change events by domain, origin
//! - `confwatch_reloads_total` (counter): reload passes by domain, result
//! - `confwatch_notifications_failed_total` (counter): external deliveries that failed
//! - `confwatch_snapshot_version` (gauge): version marker of the current snapshot
//! - `confwatch_watch_fallbacks_total` (counter): push → poll fallbacks

use metrics::{counter, gauge};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;

use crate::domain::{ChangeOrigin, Domain, SourceVersion};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_change_event(domain: Domain, origin: ChangeOrigin) {
    counter!(
        "confwatch_change_events_total",
        "domain" => domain.key(),
        "origin" => origin.as_str()
    )
    .increment(1);
}

/// `result` is one of `reloaded`, `unchanged`, `coalesced` or an error kind.
pub fn record_reload(domain: Domain, result: &'static str) {
    counter!(
        "confwatch_reloads_total",
        "domain" => domain.key(),
        "result" => result
    )
    .increment(1);
}

pub fn record_notification_failure(topic: &str) {
    counter!(
        "confwatch_notifications_failed_total",
        "topic" => topic.to_string()
    )
    .increment(1);
}

pub fn record_snapshot_version(domain: Domain, version: SourceVersion) {
    gauge!("confwatch_snapshot_version", "domain" => domain.key()).set(version.get() as f64);
}

pub fn record_watch_fallback(reason: &'static str) {
    counter!("confwatch_watch_fallbacks_total", "reason" => reason).increment(1);
}
