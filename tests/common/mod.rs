//! Shared fixtures for integration tests.

#![allow(dead_code)]

use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, SystemTime};

use confwatch::config::{EngineConfig, StrategyPreference};
use confwatch::domain::Domain;
use confwatch::source::{FileSource, MemorySource};

pub const APP_JSON: &str = r#"{
    "system": {"projectName": "Acme Portal", "version": "2.1.0", "environment": "production"},
    "features": {"notifications": {"email": true, "push": false, "sms": false}}
}"#;

pub const BUSINESS_JSON: &str = r#"{
    "owner": {"name": "Ana Ruiz", "title": "Founder"},
    "contacts": {"business": {"companyName": "Acme Consulting"}}
}"#;

pub const UI_JSON: &str = r##"{
    "preferences": {"theme": "dark", "language": "en"},
    "branding": {"primaryColor": "#112233"}
}"##;

pub const FEATURES_JSON: &str = r#"{
    "features": {
        "modules": {"invoicing": true, "analytics": false},
        "beta": {"newDashboard": true}
    }
}"#;

pub fn sample(domain: Domain) -> &'static str {
    match domain {
        Domain::App => APP_JSON,
        Domain::Business => BUSINESS_JSON,
        Domain::Ui => UI_JSON,
        Domain::FeatureFlags => FEATURES_JSON,
    }
}

/// In-memory source holding the sample document of every domain.
pub fn memory_source() -> Arc<MemorySource> {
    let source = Arc::new(MemorySource::new());
    for domain in Domain::ALL {
        source.put(domain, sample(domain));
    }
    source
}

/// Engine settings with intervals short enough for tests.
pub fn fast_config(strategy: StrategyPreference) -> EngineConfig {
    let mut config = EngineConfig::default();
    config.watch.strategy = strategy;
    config.watch.poll_interval_ms = 25;
    config.watch.settle_delay_ms = 50;
    config.reload.io_timeout_ms = 2_000;
    config.broadcast.delivery_timeout_ms = 500;
    config
}

/// Write a domain's file and push its modification time `bump` into the
/// future, so the new version is newer even on coarse-mtime filesystems.
pub fn write_source(source: &FileSource, domain: Domain, content: &str, bump: Duration) {
    let mut file = File::create(source.path_for(domain)).unwrap();
    file.write_all(content.as_bytes()).unwrap();
    file.set_modified(SystemTime::now() + bump).unwrap();
}

/// File source over `dir` with every sample document written.
pub fn file_source(dir: &Path) -> FileSource {
    let source = FileSource::new(dir);
    for domain in Domain::ALL {
        write_source(&source, domain, sample(domain), Duration::ZERO);
    }
    source
}

/// Poll `check` until it holds or `timeout` elapses.
pub async fn eventually<F: Fn() -> bool>(timeout: Duration, check: F) -> bool {
    let deadline = tokio::time::Instant::now() + timeout;
    while tokio::time::Instant::now() < deadline {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    check()
}
