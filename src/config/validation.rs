//! Engine settings validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate value ranges (intervals > 0, workers >= 1)
//! - Validate addresses and the admin key
//! - Detect two domains pointing at the same file
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: EngineConfig → Result<(), Vec<ValidationError>>

use std::collections::BTreeSet;
use std::fmt;
use std::net::SocketAddr;

use crate::config::schema::EngineConfig;
use crate::domain::Domain;

/// One rejected setting.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

pub fn validate_config(config: &EngineConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.sources.directory.trim().is_empty() {
        errors.push(ValidationError::new("sources.directory", "must not be empty"));
    }

    let mut seen = BTreeSet::new();
    for domain in Domain::ALL {
        let entry = config
            .sources
            .files
            .get(&domain)
            .map(String::as_str)
            .unwrap_or(domain.default_entry());
        if entry.is_empty() || entry.contains(['/', '\\']) {
            errors.push(ValidationError::new(
                "sources.files",
                format!("entry for '{}' must be a plain file name, got '{}'", domain, entry),
            ));
        }
        if !seen.insert(entry) {
            errors.push(ValidationError::new(
                "sources.files",
                format!("entry '{}' is used by more than one domain", entry),
            ));
        }
    }

    if config.watch.poll_interval_ms == 0 {
        errors.push(ValidationError::new("watch.poll_interval_ms", "must be greater than 0"));
    }
    if config.watch.event_buffer == 0 {
        errors.push(ValidationError::new("watch.event_buffer", "must be at least 1"));
    }
    if config.reload.workers == 0 {
        errors.push(ValidationError::new("reload.workers", "must be at least 1"));
    }
    if config.reload.io_timeout_ms == 0 {
        errors.push(ValidationError::new("reload.io_timeout_ms", "must be greater than 0"));
    }
    if config.broadcast.listener_capacity == 0 {
        errors.push(ValidationError::new("broadcast.listener_capacity", "must be at least 1"));
    }
    if config.broadcast.topic.is_empty() {
        errors.push(ValidationError::new("broadcast.topic", "must not be empty"));
    }

    if config.admin.enabled {
        if config.admin.bind_address.parse::<SocketAddr>().is_err() {
            errors.push(ValidationError::new(
                "admin.bind_address",
                format!("'{}' is not a socket address", config.admin.bind_address),
            ));
        }
        if config.admin.api_key.is_empty() {
            errors.push(ValidationError::new("admin.api_key", "must be set when admin is enabled"));
        }
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::new(
            "observability.metrics_address",
            format!("'{}' is not a socket address", config.observability.metrics_address),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(validate_config(&EngineConfig::default()).is_ok());
    }

    #[test]
    fn test_collects_every_error() {
        let mut config = EngineConfig::default();
        config.watch.poll_interval_ms = 0;
        config.reload.workers = 0;
        config.admin.bind_address = "not-an-address".into();

        let errors = validate_config(&config).unwrap_err();
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["watch.poll_interval_ms", "reload.workers", "admin.bind_address"]
        );
    }

    #[test]
    fn test_duplicate_entries_rejected() {
        let mut config = EngineConfig::default();
        config.sources.files.insert(Domain::Ui, "app-config.json".into());

        let errors = validate_config(&config).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].field, "sources.files");
    }

    #[test]
    fn test_admin_checks_skipped_when_disabled() {
        let mut config = EngineConfig::default();
        config.admin.enabled = false;
        config.admin.api_key.clear();
        assert!(validate_config(&config).is_ok());
    }
}
