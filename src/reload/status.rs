//! Results of reload passes.

use serde::Serialize;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::domain::{ConfigError, Domain, Snapshot};

/// A successful publish: the snapshot that was replaced and its replacement.
#[derive(Debug, Clone)]
pub struct ReloadOutcome {
    pub domain: Domain,
    pub previous: Option<Arc<Snapshot>>,
    pub current: Arc<Snapshot>,
}

/// What one `handle` call did.
#[derive(Debug, Clone)]
pub enum ReloadStatus {
    /// A newer snapshot was published and announced.
    Reloaded(ReloadOutcome),
    /// The source version was not newer than the current snapshot.
    Unchanged,
    /// Loading failed; the previous snapshot is still current.
    Failed(ConfigError),
    /// A reload was already running; it will pick this change up.
    Coalesced,
}

impl ReloadStatus {
    pub fn is_reloaded(&self) -> bool {
        matches!(self, ReloadStatus::Reloaded(_))
    }

    /// Short label for logs and metrics.
    pub fn label(&self) -> &'static str {
        match self {
            ReloadStatus::Reloaded(_) => "reloaded",
            ReloadStatus::Unchanged => "unchanged",
            ReloadStatus::Failed(e) => e.kind(),
            ReloadStatus::Coalesced => "coalesced",
        }
    }
}

/// Serializable per-domain result of a forced reload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DomainReport {
    Reloaded { version: u64 },
    Unchanged,
    Failed { error: String },
    Coalesced,
}

impl From<&ReloadStatus> for DomainReport {
    fn from(status: &ReloadStatus) -> Self {
        match status {
            ReloadStatus::Reloaded(outcome) => DomainReport::Reloaded {
                version: outcome.current.source_version.get(),
            },
            ReloadStatus::Unchanged => DomainReport::Unchanged,
            ReloadStatus::Failed(e) => DomainReport::Failed { error: e.to_string() },
            ReloadStatus::Coalesced => DomainReport::Coalesced,
        }
    }
}

/// Result of reloading every domain; failures are reported per domain.
#[derive(Debug, Clone, Default)]
pub struct ForcedReload {
    pub results: BTreeMap<Domain, ReloadStatus>,
}

impl ForcedReload {
    pub fn status(&self, domain: Domain) -> Option<&ReloadStatus> {
        self.results.get(&domain)
    }

    /// Domains whose reload attempt failed, with the reason.
    pub fn failures(&self) -> Vec<(Domain, &ConfigError)> {
        self.results
            .iter()
            .filter_map(|(domain, status)| match status {
                ReloadStatus::Failed(e) => Some((*domain, e)),
                _ => None,
            })
            .collect()
    }

    pub fn all_succeeded(&self) -> bool {
        self.failures().is_empty()
    }

    pub fn report(&self) -> BTreeMap<Domain, DomainReport> {
        self.results
            .iter()
            .map(|(domain, status)| (*domain, DomainReport::from(status)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_keeps_per_domain_results() {
        let mut forced = ForcedReload::default();
        forced.results.insert(Domain::App, ReloadStatus::Unchanged);
        forced
            .results
            .insert(Domain::Ui, ReloadStatus::Failed(ConfigError::SourceMissing(Domain::Ui)));

        assert!(!forced.all_succeeded());
        assert_eq!(forced.failures().len(), 1);

        let report = serde_json::to_value(forced.report()).unwrap();
        assert_eq!(report["app"]["status"], "unchanged");
        assert_eq!(report["ui"]["status"], "failed");
        assert_eq!(report["ui"]["error"], "source for domain 'ui' not found");
    }
}
