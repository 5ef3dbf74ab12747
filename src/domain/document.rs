//! Documents, snapshots and change events.

use serde::{Serialize, Serializer};
use std::sync::Arc;
use std::time::{Instant, SystemTime, UNIX_EPOCH};

use crate::domain::models::ConfigModel;
use crate::domain::Domain;

/// Opaque, comparable marker of a source's revision.
///
/// File sources use the modification time in nanoseconds since the epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct SourceVersion(u64);

impl SourceVersion {
    pub const fn new(value: u64) -> Self {
        Self(value)
    }

    /// Build a version from a modification timestamp.
    pub fn from_modified(modified: SystemTime) -> Self {
        let nanos = modified
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    pub fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for SourceVersion {
    fn from(value: u64) -> Self {
        Self(value)
    }
}

/// A parsed configuration document for one domain. Never mutated after construction.
#[derive(Debug, Clone, PartialEq)]
pub struct ConfigDocument {
    domain: Domain,
    value: Arc<serde_json::Value>,
    model: Arc<ConfigModel>,
}

impl ConfigDocument {
    /// Wrap a value, decoding its typed view. A value that does not fit the
    /// domain's model gets the model's defaults as its view.
    pub fn new(domain: Domain, value: serde_json::Value) -> Self {
        let model = ConfigModel::decode(domain, &value).unwrap_or_else(|e| {
            tracing::warn!(domain = %domain, error = %e, "Document does not fit its model, using defaults");
            ConfigModel::defaults(domain)
        });
        Self::with_model(domain, value, model)
    }

    pub(crate) fn with_model(domain: Domain, value: serde_json::Value, model: ConfigModel) -> Self {
        Self {
            domain,
            value: Arc::new(value),
            model: Arc::new(model),
        }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// The raw structured value.
    pub fn value(&self) -> &serde_json::Value {
        &self.value
    }

    /// Look up a nested value by JSON pointer (e.g. `/branding/primaryColor`).
    pub fn pointer(&self, pointer: &str) -> Option<&serde_json::Value> {
        self.value.pointer(pointer)
    }

    /// Typed view decoded at load time.
    pub fn model(&self) -> &ConfigModel {
        &self.model
    }
}

impl Serialize for ConfigDocument {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.as_ref().serialize(serializer)
    }
}

/// An immutable, versioned, fully parsed document plus load metadata.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub document: ConfigDocument,
    pub source_version: SourceVersion,
    pub loaded_at: SystemTime,
}

impl Snapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(document: ConfigDocument, source_version: SourceVersion) -> Self {
        Self {
            document,
            source_version,
            loaded_at: SystemTime::now(),
        }
    }

    pub fn domain(&self) -> Domain {
        self.document.domain()
    }

    /// Load time in milliseconds since the epoch.
    pub fn loaded_at_millis(&self) -> u64 {
        self.loaded_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis() as u64
    }
}

/// What produced a change event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeOrigin {
    /// Native change notification.
    Push,
    /// Polling detected a new version marker.
    Poll,
    /// Administrative reload request.
    Forced,
}

impl ChangeOrigin {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeOrigin::Push => "push",
            ChangeOrigin::Poll => "poll",
            ChangeOrigin::Forced => "forced",
        }
    }
}

/// Signal that a domain's source may have changed. May be spurious.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChangeEvent {
    pub domain: Domain,
    pub detected_at: Instant,
    pub origin: ChangeOrigin,
}

impl ChangeEvent {
    pub fn new(domain: Domain, origin: ChangeOrigin) -> Self {
        Self {
            domain,
            detected_at: Instant::now(),
            origin,
        }
    }

    /// A synthetic event used by administrative reloads.
    pub fn forced(domain: Domain) -> Self {
        Self::new(domain, ChangeOrigin::Forced)
    }
}
