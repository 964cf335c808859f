//! Configuration for romvault
//!
//! Centralized configuration with sensible defaults.

use std::path::{Path, PathBuf};

use crate::error::{Result, RomVaultError};

/// Main configuration for a romvault instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory of the local object store
    /// Internal structure:
    ///   {store_root}/
    ///     ├── .staging/        (in-flight uploads, renamed into place)
    ///     └── roms/            (stored blobs, one per name + fingerprint)
    pub store_root: PathBuf,

    /// Where temporary containers, downloads and extracted archives go.
    /// `None` uses the system temp directory.
    pub scratch_dir: Option<PathBuf>,

    // -------------------------------------------------------------------------
    // Fingerprint Configuration
    // -------------------------------------------------------------------------
    /// Read size used while fingerprinting (in bytes)
    pub chunk_size: usize,

    // -------------------------------------------------------------------------
    // Ingestion Configuration
    // -------------------------------------------------------------------------
    /// Number of entries processed concurrently (1 = sequential)
    pub workers: usize,

    /// What a failed entry does to the rest of the run
    pub failure_policy: FailurePolicy,

    /// Extract to disk first, or stream entries straight out of the archive
    pub ingest_mode: IngestMode,

    /// Upload extensions treated as archives (lowercase, no dot)
    pub archive_extensions: Vec<String>,
}

/// Failure policy for an ingestion run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    /// Stop at the first failed entry and return its error
    Abort,

    /// Record the failure in the report and carry on with the next entry
    Continue,
}

/// How entries are read out of an incoming archive
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IngestMode {
    /// Extract every entry to a scratch directory, then process the files
    Extract,

    /// Read entries directly from the archive (sequential only)
    Stream,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            store_root: PathBuf::from("./romvault_data"),
            scratch_dir: None,
            chunk_size: 4096,
            workers: 1,
            failure_policy: FailurePolicy::Abort,
            ingest_mode: IngestMode::Extract,
            archive_extensions: vec!["zip".to_string()],
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values that would otherwise fail deep inside a run
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(RomVaultError::Config("chunk_size must be > 0".to_string()));
        }
        if self.workers == 0 {
            return Err(RomVaultError::Config("workers must be > 0".to_string()));
        }
        if self.archive_extensions.is_empty() {
            return Err(RomVaultError::Config(
                "at least one archive extension is required".to_string(),
            ));
        }
        Ok(())
    }

    /// Scratch directory to create temporary files in
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(std::env::temp_dir)
    }

    /// Whether `path` has one of the configured archive extensions
    pub fn is_archive_path(&self, path: &Path) -> bool {
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                self.archive_extensions
                    .iter()
                    .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(ext))
            })
            .unwrap_or(false)
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the local object store root
    pub fn store_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.store_root = path.into();
        self
    }

    /// Set the scratch directory for temporary files
    pub fn scratch_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.scratch_dir = Some(path.into());
        self
    }

    /// Set the fingerprint read size (in bytes)
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the number of ingestion workers
    pub fn workers(mut self, count: usize) -> Self {
        self.config.workers = count;
        self
    }

    /// Set the failure policy
    pub fn failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.config.failure_policy = policy;
        self
    }

    /// Set the ingestion mode
    pub fn ingest_mode(mut self, mode: IngestMode) -> Self {
        self.config.ingest_mode = mode;
        self
    }

    /// Replace the accepted archive extensions
    pub fn archive_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.archive_extensions = extensions
            .into_iter()
            .map(|ext| ext.into().trim_start_matches('.').to_ascii_lowercase())
            .collect();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
