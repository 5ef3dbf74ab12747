//! Engine settings loading from disk.

use std::fs;
use std::path::Path;
use thiserror::Error;

use crate::config::schema::EngineConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for settings loading.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load and validate settings from a TOML file.
pub fn load_config(path: &Path) -> Result<EngineConfig, SettingsError> {
    let content = fs::read_to_string(path)?;
    parse_config(&content)
}

/// Parse and validate settings from TOML text.
pub fn parse_config(content: &str) -> Result<EngineConfig, SettingsError> {
    let config: EngineConfig = toml::from_str(content)?;
    validate_config(&config).map_err(SettingsError::Validation)?;
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{LogFormat, StrategyPreference};
    use crate::domain::Domain;

    #[test]
    fn test_minimal_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.watch.poll_interval_ms, 5_000);
        assert_eq!(config.watch.settle_delay_ms, 500);
        assert_eq!(config.reload.workers, 2);
        assert_eq!(config.sources.directory, "config");
    }

    #[test]
    fn test_full_file() {
        let config = parse_config(
            r#"
            [sources]
            directory = "/srv/conf"
            [sources.files]
            ui = "look.json"
            features = "flags.json"

            [watch]
            strategy = "poll"
            poll_interval_ms = 1000

            [observability]
            log_format = "json"
            "#,
        )
        .unwrap();

        assert_eq!(config.sources.directory, "/srv/conf");
        assert_eq!(config.sources.files.get(&Domain::Ui).unwrap(), "look.json");
        assert_eq!(config.sources.files.get(&Domain::FeatureFlags).unwrap(), "flags.json");
        assert_eq!(config.watch.strategy, StrategyPreference::Poll);
        assert_eq!(config.watch.poll_interval_ms, 1000);
        assert_eq!(config.observability.log_format, LogFormat::Json);
    }

    #[test]
    fn test_validation_error_message() {
        let err = parse_config("[reload]\nworkers = 0\n").unwrap_err();
        assert!(matches!(err, SettingsError::Validation(_)));
        assert_eq!(err.to_string(), "Validation failed: reload.workers: must be at least 1");
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_config("[watch\n").unwrap_err();
        assert!(matches!(err, SettingsError::Parse(_)));
    }
}
