//! Configuration domains and their documents.
//!
//! # Data Flow
//! ```text
//! raw bytes (one source entry per domain)
//!     → loader.rs (decode JSON, check the domain's shape)
//!     → ConfigDocument (immutable, Arc-backed)
//!     → Snapshot (document + source version + load instant)
//!     → store (current / previous per domain)
//! ```
//!
//! # Design Decisions
//! - The set of domains is fixed at compile time; nothing is keyed by strings
//! - Documents stay as JSON values; the typed model view is decoded once at load
//! - Shape validation uses the typed models, business rules are not checked

pub mod document;
pub mod error;
pub mod features;
pub mod loader;
pub mod models;

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

pub use document::{ChangeEvent, ChangeOrigin, ConfigDocument, Snapshot, SourceVersion};
pub use error::ConfigError;
pub use features::FeatureKey;
pub use loader::ConfigLoader;

/// One independently reloadable configuration document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    App,
    Business,
    Ui,
    #[serde(rename = "features")]
    FeatureFlags,
}

impl Domain {
    /// Every known domain, in startup order.
    pub const ALL: [Domain; 4] = [Domain::App, Domain::Business, Domain::Ui, Domain::FeatureFlags];

    /// Number of known domains.
    pub const COUNT: usize = Self::ALL.len();

    /// Stable key used in APIs, logs and metrics labels.
    pub fn key(self) -> &'static str {
        match self {
            Domain::App => "app",
            Domain::Business => "business",
            Domain::Ui => "ui",
            Domain::FeatureFlags => "features",
        }
    }

    /// Default entry name of this domain's source inside the source directory.
    pub fn default_entry(self) -> &'static str {
        match self {
            Domain::App => "app-config.json",
            Domain::Business => "business-config.json",
            Domain::Ui => "ui-config.json",
            Domain::FeatureFlags => "feature-flags.json",
        }
    }

    /// Dense index for per-domain arrays.
    pub fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Domain {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "app" => Ok(Domain::App),
            "business" => Ok(Domain::Business),
            "ui" => Ok(Domain::Ui),
            "features" | "feature_flags" | "feature-flags" => Ok(Domain::FeatureFlags),
            _ => Err(ConfigError::UnknownDomain(s.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_domain_keys_round_trip() {
        for domain in Domain::ALL {
            assert_eq!(domain.key().parse::<Domain>().unwrap(), domain);
        }
        assert_eq!("Feature-Flags".parse::<Domain>().unwrap(), Domain::FeatureFlags);
    }

    #[test]
    fn test_unknown_domain() {
        let err = "billing".parse::<Domain>().unwrap_err();
        assert_eq!(err, ConfigError::UnknownDomain("billing".into()));
    }

    #[test]
    fn test_indexes_are_dense() {
        let indexes: Vec<usize> = Domain::ALL.iter().map(|d| d.index()).collect();
        assert_eq!(indexes, vec![0, 1, 2, 3]);
    }
}
