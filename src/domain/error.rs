//! Errors raised while loading or querying configuration documents.

use thiserror::Error;

use crate::domain::Domain;

/// Errors that can occur while loading a domain's document.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    /// The raw source for the domain could not be located.
    #[error("source for domain '{0}' not found")]
    SourceMissing(Domain),

    /// The source exists but reading it failed or timed out.
    #[error("source for domain '{domain}' unavailable: {reason}")]
    SourceUnavailable { domain: Domain, reason: String },

    /// The content could not be decoded into the domain's expected shape.
    #[error("failed to parse '{domain}' document: {reason}")]
    Parse { domain: Domain, reason: String },

    /// A domain name did not match any known domain.
    #[error("unknown domain '{0}'")]
    UnknownDomain(String),

    /// A feature flag name did not match any known flag.
    #[error("unknown feature flag '{0}'")]
    UnknownFeature(String),
}

impl ConfigError {
    /// Domain the error refers to, when there is one.
    pub fn domain(&self) -> Option<Domain> {
        match self {
            ConfigError::SourceMissing(domain)
            | ConfigError::SourceUnavailable { domain, .. }
            | ConfigError::Parse { domain, .. } => Some(*domain),
            ConfigError::UnknownDomain(_) | ConfigError::UnknownFeature(_) => None,
        }
    }

    /// Short label for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            ConfigError::SourceMissing(_) => "source_missing",
            ConfigError::SourceUnavailable { .. } => "source_unavailable",
            ConfigError::Parse { .. } => "parse_error",
            ConfigError::UnknownDomain(_) => "unknown_domain",
            ConfigError::UnknownFeature(_) => "unknown_feature",
        }
    }
}
