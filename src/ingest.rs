//! Ingestion Pipeline
//!
//! Drives every entry of an incoming archive through
//! fingerprint → existence check → store-if-absent.
//!
//! ## Concurrency Model
//!
//! - `workers == 1`: entries are processed one after another, in archive order
//! - `workers > 1`: extracted entries are fed through a channel to a scoped
//!   worker pool. A worker owns an entry's whole check-then-store sequence,
//!   so an entry is always checked before it is written. Nothing is locked
//!   across entries or across runs: two runs racing on the same new content
//!   may both upload it, which is wasteful but harmless since the bytes are
//!   identical.
//! - Streaming mode is always sequential (one open archive handle).
//!
//! ## Failure Policy
//!
//! `FailurePolicy::Abort` returns the first failure, tagged with the entry
//! name. `FailurePolicy::Continue` records it in the report and moves on.
//! Archive-level failures (unreadable or malformed zip, illegal entry
//! names) always abort, in both ingest modes.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use crossbeam::channel;
use serde::Serialize;
use tracing::{debug, info, info_span, warn};

use crate::archive::{extract_archive, ArchiveReader, ExtractedArchive, LogicalEntry};
use crate::config::{Config, FailurePolicy, IngestMode};
use crate::error::{Result, RomVaultError};
use crate::fingerprint::Fingerprint;
use crate::key::{derive_key, StorageKey};
use crate::vault::RomVault;

/// What happened to one entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryOutcome {
    /// No blob existed; one was uploaded
    Stored,

    /// A blob already existed; nothing was written
    Present,
}

/// Per-entry result of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntryReport {
    pub name: String,
    pub fingerprint: Fingerprint,
    pub key: StorageKey,
    pub outcome: EntryOutcome,
}

/// An entry that failed under `FailurePolicy::Continue`
#[derive(Debug, Clone, Serialize)]
pub struct EntryFailure {
    pub name: String,
    pub error: String,
}

/// Summary of an ingestion run
#[derive(Debug, Clone, Default, Serialize)]
pub struct IngestReport {
    /// Archive that was ingested, when known
    pub archive: Option<String>,

    /// True when the upload was not an archive and was ignored
    pub skipped: bool,

    pub entries: Vec<EntryReport>,
    pub failures: Vec<EntryFailure>,
}

impl IngestReport {
    /// Entries uploaded in this run
    pub fn stored_count(&self) -> usize {
        self.count(EntryOutcome::Stored)
    }

    /// Entries that were already in the store
    pub fn present_count(&self) -> usize {
        self.count(EntryOutcome::Present)
    }

    fn count(&self, outcome: EntryOutcome) -> usize {
        self.entries.iter().filter(|e| e.outcome == outcome).count()
    }
}

/// Runs archives and entries into a vault
pub struct Ingestor {
    vault: Arc<RomVault>,
    config: Config,
}

impl Ingestor {
    pub fn new(vault: Arc<RomVault>, config: &Config) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            vault,
            config: config.clone(),
        })
    }

    /// Get the vault entries are stored into
    pub fn vault(&self) -> &Arc<RomVault> {
        &self.vault
    }

    /// Ingest an uploaded archive
    ///
    /// Uploads without an archive extension are skipped, not rejected.
    pub fn ingest_archive(&self, archive: &Path) -> Result<IngestReport> {
        let label = archive.display().to_string();

        if !self.config.is_archive_path(archive) {
            info!(archive = %label, "not an archive, skipping");
            return Ok(IngestReport {
                archive: Some(label),
                skipped: true,
                ..IngestReport::default()
            });
        }

        let started = Instant::now();
        let mut report = match self.config.ingest_mode {
            IngestMode::Extract => {
                let extracted = extract_archive(archive, self.vault.scratch_dir())?;
                info!(archive = %label, entries = extracted.entries().len(), "extracted");
                self.ingest_extracted(&extracted)?
            }
            IngestMode::Stream => self.ingest_stream(archive)?,
        };
        report.archive = Some(label.clone());

        info!(
            archive = %label,
            stored = report.stored_count(),
            present = report.present_count(),
            failed = report.failures.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "ingestion finished"
        );
        Ok(report)
    }

    /// Ingest every entry of an extracted archive
    pub fn ingest_extracted(&self, extracted: &ExtractedArchive) -> Result<IngestReport> {
        self.ingest_entries(extracted.entries())
    }

    /// Ingest a set of logical entries
    pub fn ingest_entries(&self, entries: &[LogicalEntry]) -> Result<IngestReport> {
        if self.config.workers <= 1 || entries.len() <= 1 {
            self.ingest_sequential(entries)
        } else {
            self.ingest_parallel(entries)
        }
    }

    /// Fingerprint one entry, then store it unless it is already present
    pub fn ingest_entry(&self, entry: &LogicalEntry) -> Result<EntryReport> {
        let _span = info_span!("ingest_entry", name = %entry.name).entered();
        let started = Instant::now();

        // Step 1: Fingerprint (reader closed before anything else happens)
        let fingerprint = {
            let mut source = entry.open()?;
            self.vault.fingerprint(&mut source)?
        };
        debug!(fingerprint = %fingerprint, "fingerprinted");

        // Step 2: Check, Step 3: store if absent
        let (key, outcome) = if self.vault.exists(&entry.name, &fingerprint)? {
            info!(name = %entry.name, "already stored, moving on");
            (derive_key(&entry.name, &fingerprint), EntryOutcome::Present)
        } else {
            let key = self.vault.store(&entry.dir, &entry.name, &fingerprint)?;
            (key, EntryOutcome::Stored)
        };

        debug!(elapsed_ms = started.elapsed().as_millis() as u64, "entry done");
        Ok(EntryReport {
            name: entry.name.clone(),
            fingerprint,
            key,
            outcome,
        })
    }

    // =========================================================================
    // Private Helpers
    // =========================================================================

    fn ingest_sequential(&self, entries: &[LogicalEntry]) -> Result<IngestReport> {
        let mut report = IngestReport::default();
        for entry in entries {
            match self.ingest_entry(entry) {
                Ok(entry_report) => report.entries.push(entry_report),
                Err(e) => self.record_failure(&mut report, &entry.name, e)?,
            }
        }
        Ok(report)
    }

    fn ingest_parallel(&self, entries: &[LogicalEntry]) -> Result<IngestReport> {
        let (job_tx, job_rx) = channel::unbounded::<&LogicalEntry>();
        let (done_tx, done_rx) = channel::unbounded::<(String, Result<EntryReport>)>();

        for entry in entries {
            job_tx
                .send(entry)
                .map_err(|_| RomVaultError::Worker("job queue closed".to_string()))?;
        }
        drop(job_tx);

        let abort = AtomicBool::new(false);
        let policy = self.config.failure_policy;
        let workers = self.config.workers.min(entries.len());
        debug!(workers, entries = entries.len(), "starting worker pool");

        crossbeam::thread::scope(|scope| {
            for _ in 0..workers {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let abort = &abort;

                scope.spawn(move |_| {
                    for entry in job_rx.iter() {
                        if abort.load(Ordering::SeqCst) {
                            break;
                        }
                        let result = self.ingest_entry(entry);
                        if result.is_err() && policy == FailurePolicy::Abort {
                            abort.store(true, Ordering::SeqCst);
                        }
                        if done_tx.send((entry.name.clone(), result)).is_err() {
                            break;
                        }
                    }
                });
            }
        })
        .map_err(|_| RomVaultError::Worker("ingestion worker panicked".to_string()))?;
        drop(done_tx);

        let mut report = IngestReport::default();
        let mut first_error = None;
        for (name, result) in done_rx.iter() {
            match result {
                Ok(entry_report) => report.entries.push(entry_report),
                Err(e) if policy == FailurePolicy::Abort => {
                    if first_error.is_none() {
                        first_error = Some(RomVaultError::for_entry(name, e));
                    }
                }
                Err(e) => self.record_failure(&mut report, &name, e)?,
            }
        }
        if let Some(err) = first_error {
            return Err(err);
        }

        // Completion order is arbitrary; report in name order
        report.entries.sort_by(|a, b| a.name.cmp(&b.name));
        report.failures.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(report)
    }

    fn ingest_stream(&self, archive: &Path) -> Result<IngestReport> {
        let mut reader = ArchiveReader::open(archive)?;
        let mut report = IngestReport::default();
        if reader.is_empty() {
            debug!(archive = %archive.display(), "archive has no entries");
            return Ok(report);
        }

        // Entry names are checked up front: a bad name fails the whole
        // archive before anything is stored, as extraction does
        let mut names = Vec::with_capacity(reader.len());
        for index in 0..reader.len() {
            if let Some(name) = reader.entry_name(index)? {
                names.push((index, name));
            }
        }

        for (index, name) in names {
            match self.ingest_stream_entry(&mut reader, index, &name) {
                Ok(entry_report) => report.entries.push(entry_report),
                Err(e) => self.record_failure(&mut report, &name, e)?,
            }
        }
        Ok(report)
    }

    /// Streaming variant of `ingest_entry`: the entry is read once to
    /// fingerprint it and, only if absent, a second time to package it
    fn ingest_stream_entry(&self, reader: &mut ArchiveReader, index: usize, name: &str) -> Result<EntryReport> {
        let _span = info_span!("ingest_entry", name).entered();

        let fingerprint = reader.with_entry(index, |entry| self.vault.fingerprint(entry))?;
        debug!(fingerprint = %fingerprint, "fingerprinted");

        let (key, outcome) = if self.vault.exists(name, &fingerprint)? {
            info!(name, "already stored, moving on");
            (derive_key(name, &fingerprint), EntryOutcome::Present)
        } else {
            let key = reader.with_entry(index, |entry| {
                self.vault.store_from_reader(entry, name, &fingerprint)
            })?;
            (key, EntryOutcome::Stored)
        };

        Ok(EntryReport {
            name: name.to_string(),
            fingerprint,
            key,
            outcome,
        })
    }

    fn record_failure(&self, report: &mut IngestReport, name: &str, err: RomVaultError) -> Result<()> {
        match self.config.failure_policy {
            FailurePolicy::Abort => Err(RomVaultError::for_entry(name, err)),
            FailurePolicy::Continue => {
                warn!(name, error = %err, "entry failed, continuing");
                report.failures.push(EntryFailure {
                    name: name.to_string(),
                    error: err.to_string(),
                });
                Ok(())
            }
        }
    }
}
