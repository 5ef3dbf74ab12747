//! Decoding raw source bytes into documents.
//!
//! # Responsibilities
//! - Decode JSON content
//! - Reject content that does not fit the domain's typed model
//! - Report a missing source distinctly from malformed content
//!
//! # Design Decisions
//! - Pure: fetching the bytes is the caller's job (see `source::fetch_raw`)
//! - Used unchanged by both the startup path and the reload path

use crate::domain::models::ConfigModel;
use crate::domain::{ConfigDocument, ConfigError, Domain};

/// Stateless parser from raw bytes to a domain document.
#[derive(Debug, Clone, Copy, Default)]
pub struct ConfigLoader;

impl ConfigLoader {
    pub fn new() -> Self {
        Self
    }

    /// Parse `raw` into the document for `domain`.
    ///
    /// `None` means the source could not be located.
    pub fn load(&self, domain: Domain, raw: Option<&[u8]>) -> Result<ConfigDocument, ConfigError> {
        let bytes = raw.ok_or(ConfigError::SourceMissing(domain))?;

        let value: serde_json::Value =
            serde_json::from_slice(bytes).map_err(|e| ConfigError::Parse {
                domain,
                reason: e.to_string(),
            })?;

        if !value.is_object() {
            return Err(ConfigError::Parse {
                domain,
                reason: "document root must be an object".to_string(),
            });
        }

        let model = ConfigModel::decode(domain, &value)?;
        Ok(ConfigDocument::with_model(domain, value, model))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_source() {
        let err = ConfigLoader::new().load(Domain::Ui, None).unwrap_err();
        assert_eq!(err, ConfigError::SourceMissing(Domain::Ui));
    }

    #[test]
    fn test_malformed_json() {
        let err = ConfigLoader::new()
            .load(Domain::App, Some(b"{\"system\": "))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { domain: Domain::App, .. }));
    }

    #[test]
    fn test_non_object_root() {
        let err = ConfigLoader::new().load(Domain::App, Some(b"[1, 2]")).unwrap_err();
        assert!(matches!(err, ConfigError::Parse { .. }));
    }

    #[test]
    fn test_wrong_field_type_is_rejected() {
        let raw = br#"{"features": {"modules": {"invoicing": "yes"}}}"#;
        let err = ConfigLoader::new()
            .load(Domain::FeatureFlags, Some(raw))
            .unwrap_err();
        assert!(matches!(err, ConfigError::Parse { domain: Domain::FeatureFlags, .. }));
    }

    #[test]
    fn test_valid_document() {
        let raw = br##"{"branding": {"primaryColor": "#ff0000"}, "extra": 1}"##;
        let doc = ConfigLoader::new().load(Domain::Ui, Some(raw)).unwrap();
        assert_eq!(doc.domain(), Domain::Ui);
        assert_eq!(doc.value()["extra"], 1);
    }
}
