//! In-process sources, for embedding and tests.
//!
//! There is no native change notification here, so a watcher over a
//! `MemorySource` always runs the polling strategy.

use dashmap::DashMap;
use std::io;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use crate::domain::{Domain, SourceVersion};
use crate::source::SourceAccessor;

#[derive(Debug, Clone)]
struct Entry {
    bytes: Vec<u8>,
    version: SourceVersion,
}

/// A thread-safe map of domain -> content with explicit versions.
#[derive(Debug, Default)]
pub struct MemorySource {
    entries: DashMap<Domain, Entry>,
    next_version: AtomicU64,
    read_delay_ms: AtomicU64,
    reads: [AtomicU64; Domain::COUNT],
}

impl MemorySource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store content under the next version number.
    pub fn put(&self, domain: Domain, content: impl Into<Vec<u8>>) -> SourceVersion {
        let version = SourceVersion::new(self.next_version.fetch_add(1, Ordering::SeqCst) + 1);
        self.put_versioned(domain, content, version);
        version
    }

    /// Store content under an explicit version. Versions may go backwards.
    pub fn put_versioned(&self, domain: Domain, content: impl Into<Vec<u8>>, version: SourceVersion) {
        self.next_version.fetch_max(version.get(), Ordering::SeqCst);
        self.entries.insert(
            domain,
            Entry {
                bytes: content.into(),
                version,
            },
        );
    }

    pub fn remove(&self, domain: Domain) {
        self.entries.remove(&domain);
    }

    /// Make every `read` sleep first, simulating slow storage.
    pub fn set_read_delay(&self, delay: Duration) {
        self.read_delay_ms.store(delay.as_millis() as u64, Ordering::Relaxed);
    }

    /// Number of times a domain's bytes have been read.
    pub fn reads(&self, domain: Domain) -> u64 {
        self.reads[domain.index()].load(Ordering::SeqCst)
    }
}

impl SourceAccessor for MemorySource {
    fn exists(&self, domain: Domain) -> bool {
        self.entries.contains_key(&domain)
    }

    fn read(&self, domain: Domain) -> io::Result<Vec<u8>> {
        self.reads[domain.index()].fetch_add(1, Ordering::SeqCst);

        let delay = self.read_delay_ms.load(Ordering::Relaxed);
        if delay > 0 {
            std::thread::sleep(Duration::from_millis(delay));
        }

        self.entries
            .get(&domain)
            .map(|e| e.bytes.clone())
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no source for {}", domain)))
    }

    fn version(&self, domain: Domain) -> io::Result<SourceVersion> {
        self.entries
            .get(&domain)
            .map(|e| e.version)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, format!("no source for {}", domain)))
    }
}
