//! Raw source access.
//!
//! # Responsibilities
//! - Tell whether a domain's source exists
//! - Read its bytes and its version marker
//! - Expose the containing location so the push watcher can register on it
//!
//! # Design Decisions
//! - The engine only sees the `SourceAccessor` trait; files are one backend
//! - Access is synchronous; async callers go through `spawn_blocking`
//! - The version is read before the bytes, so a write racing the read is
//!   picked up by the next change event instead of being masked

pub mod file;
pub mod memory;

use std::io;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use crate::domain::{ConfigError, Domain, SourceVersion};

pub use file::FileSource;
pub use memory::MemorySource;

/// Backing store for the raw configuration sources.
pub trait SourceAccessor: Send + Sync + 'static {
    /// Whether the source for `domain` can currently be located.
    fn exists(&self, domain: Domain) -> bool;

    /// Raw bytes of the source.
    fn read(&self, domain: Domain) -> io::Result<Vec<u8>>;

    /// Current version marker of the source.
    fn version(&self, domain: Domain) -> io::Result<SourceVersion>;

    /// Location a native watcher should register on, if the backend has one.
    fn watch_root(&self) -> Option<&Path> {
        None
    }

    /// Map a changed entry reported by a native watcher back to a domain.
    fn domain_for_entry(&self, _entry: &Path) -> Option<Domain> {
        None
    }
}

/// Bytes of a source together with the version they were read at.
#[derive(Debug, Clone)]
pub struct RawSource {
    pub bytes: Vec<u8>,
    pub version: SourceVersion,
}

/// Fetch a domain's raw source, mapping I/O failures onto load errors.
pub fn fetch_raw(source: &dyn SourceAccessor, domain: Domain) -> Result<RawSource, ConfigError> {
    if !source.exists(domain) {
        return Err(ConfigError::SourceMissing(domain));
    }
    let version = source.version(domain).map_err(|e| io_error(domain, e))?;
    let bytes = source.read(domain).map_err(|e| io_error(domain, e))?;
    Ok(RawSource { bytes, version })
}

/// `fetch_raw` on the blocking pool, bounded by `timeout`.
pub async fn fetch_raw_blocking(
    source: Arc<dyn SourceAccessor>,
    domain: Domain,
    timeout: Duration,
) -> Result<RawSource, ConfigError> {
    let task = tokio::task::spawn_blocking(move || fetch_raw(source.as_ref(), domain));

    match tokio::time::timeout(timeout, task).await {
        Ok(Ok(result)) => result,
        Ok(Err(join_error)) => Err(ConfigError::SourceUnavailable {
            domain,
            reason: format!("source read task failed: {}", join_error),
        }),
        Err(_) => Err(ConfigError::SourceUnavailable {
            domain,
            reason: format!("source read timed out after {:?}", timeout),
        }),
    }
}

fn io_error(domain: Domain, error: io::Error) -> ConfigError {
    if error.kind() == io::ErrorKind::NotFound {
        ConfigError::SourceMissing(domain)
    } else {
        ConfigError::SourceUnavailable {
            domain,
            reason: error.to_string(),
        }
    }
}
