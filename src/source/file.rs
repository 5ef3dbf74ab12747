//! Sources stored as files in a single directory.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::config::SourcesConfig;
use crate::domain::{Domain, SourceVersion};
use crate::source::SourceAccessor;

/// One file per domain inside `directory`; the version is the file's mtime.
#[derive(Debug, Clone)]
pub struct FileSource {
    directory: PathBuf,
    entries: BTreeMap<Domain, String>,
}

impl FileSource {
    /// Create a source with the default entry names.
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        let entries = Domain::ALL
            .into_iter()
            .map(|d| (d, d.default_entry().to_string()))
            .collect();
        Self {
            directory: directory.into(),
            entries,
        }
    }

    /// Build from the `[sources]` settings section.
    pub fn from_config(config: &SourcesConfig) -> Self {
        let mut source = Self::new(&config.directory);
        for (domain, entry) in &config.files {
            source = source.with_entry(*domain, entry.clone());
        }
        source
    }

    /// Override the entry name of one domain.
    pub fn with_entry(mut self, domain: Domain, entry: impl Into<String>) -> Self {
        self.entries.insert(domain, entry.into());
        self
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Full path of a domain's file.
    pub fn path_for(&self, domain: Domain) -> PathBuf {
        let entry = self
            .entries
            .get(&domain)
            .map(String::as_str)
            .unwrap_or(domain.default_entry());
        self.directory.join(entry)
    }
}

impl SourceAccessor for FileSource {
    fn exists(&self, domain: Domain) -> bool {
        self.path_for(domain).is_file()
    }

    fn read(&self, domain: Domain) -> io::Result<Vec<u8>> {
        fs::read(self.path_for(domain))
    }

    fn version(&self, domain: Domain) -> io::Result<SourceVersion> {
        let modified = fs::metadata(self.path_for(domain))?.modified()?;
        Ok(SourceVersion::from_modified(modified))
    }

    fn watch_root(&self) -> Option<&Path> {
        Some(&self.directory)
    }

    fn domain_for_entry(&self, entry: &Path) -> Option<Domain> {
        let name = entry.file_name()?.to_str()?;
        self.entries
            .iter()
            .find(|(_, file)| file.as_str() == name)
            .map(|(domain, _)| *domain)
    }
}
