//! romvault CLI
//!
//! Ingests ROM archives into a local vault and checks what is stored.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use clap::{Args as ClapArgs, Parser, Subcommand};
use romvault::{
    Config, FailurePolicy, Fingerprint, IngestMode, Ingestor, Result, RomVault, RomVaultError,
    VerifyOutcome,
};
use serde::Serialize;
use tracing_subscriber::{fmt, EnvFilter};

/// romvault
#[derive(Parser, Debug)]
#[command(name = "romvault")]
#[command(about = "Content-addressed, deduplicating ROM store")]
#[command(version)]
struct Args {
    /// Store root directory
    #[arg(short, long, global = true, default_value = "./romvault_data")]
    store: PathBuf,

    /// Scratch directory for temporary files (defaults to the system temp dir)
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,

    /// Read size used while fingerprinting, in bytes
    #[arg(long, global = true, default_value = "4096")]
    chunk_size: usize,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Ingest one or more zip archives
    Ingest {
        /// Archives to ingest
        #[arg(required = true)]
        archives: Vec<PathBuf>,

        /// Entries processed concurrently
        #[arg(short, long, default_value = "1")]
        workers: usize,

        /// Record failed entries and carry on instead of aborting
        #[arg(long)]
        keep_going: bool,

        /// Read entries straight from the archive instead of extracting
        #[arg(long)]
        stream: bool,
    },

    /// Verify the stored copy of a ROM against a fingerprint
    Verify {
        /// Logical ROM name
        name: String,

        #[command(flatten)]
        expected: Expected,
    },

    /// Check whether a local file is already stored
    Exists {
        /// File to fingerprint; its file name is the ROM name
        file: PathBuf,
    },

    /// Print the fingerprint of local files
    Fingerprint {
        #[arg(required = true)]
        files: Vec<PathBuf>,
    },

    /// Print the storage key a local file would be stored under
    Key {
        file: PathBuf,
    },
}

/// Expected fingerprint, given explicitly or taken from a local file
#[derive(ClapArgs, Debug)]
struct Expected {
    /// Fingerprint this file and use the result
    #[arg(long, conflicts_with_all = ["size", "crc32", "sha1"])]
    file: Option<PathBuf>,

    /// Expected size in bytes
    #[arg(long, requires_all = ["crc32", "sha1"])]
    size: Option<u64>,

    /// Expected CRC-32 (decimal)
    #[arg(long)]
    crc32: Option<u32>,

    /// Expected SHA-1 (hex)
    #[arg(long)]
    sha1: Option<String>,
}

#[derive(Serialize)]
struct FileFingerprint<'a> {
    name: &'a str,
    fingerprint: &'a Fingerprint,
    key: String,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,romvault=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();

    match run(args) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            tracing::error!(category = ?e.category(), "{}", e);
            std::process::exit(1);
        }
    }
}

fn run(args: Args) -> Result<i32> {
    let mut builder = Config::builder()
        .store_root(&args.store)
        .chunk_size(args.chunk_size);
    if let Some(scratch) = &args.scratch {
        builder = builder.scratch_dir(scratch);
    }

    match args.command {
        Commands::Ingest {
            archives,
            workers,
            keep_going,
            stream,
        } => {
            let policy = if keep_going {
                FailurePolicy::Continue
            } else {
                FailurePolicy::Abort
            };
            let mode = if stream { IngestMode::Stream } else { IngestMode::Extract };
            let config = builder
                .workers(workers)
                .failure_policy(policy)
                .ingest_mode(mode)
                .build();

            tracing::info!("romvault v{}", romvault::VERSION);
            tracing::info!("Store root: {}", config.store_root.display());

            // One vault (and store handle) for the whole process
            let vault = Arc::new(RomVault::open(&config)?);
            let ingestor = Ingestor::new(vault, &config)?;

            let mut failed = false;
            for archive in &archives {
                let report = ingestor.ingest_archive(archive)?;
                failed |= !report.failures.is_empty();
                if args.json {
                    print_json(&report)?;
                } else {
                    println!(
                        "{}: {} stored, {} present, {} failed{}",
                        archive.display(),
                        report.stored_count(),
                        report.present_count(),
                        report.failures.len(),
                        if report.skipped { " (skipped: not an archive)" } else { "" }
                    );
                    for failure in &report.failures {
                        println!("  FAILED {}: {}", failure.name, failure.error);
                    }
                }
            }
            Ok(if failed { 1 } else { 0 })
        }

        Commands::Verify { name, expected } => {
            let config = builder.build();
            let vault = RomVault::open(&config)?;
            let expected = expected.resolve(&vault)?;

            let outcome = vault.verify(&name, &expected)?;
            if args.json {
                print_json(&outcome)?;
            } else {
                match &outcome {
                    VerifyOutcome::Absent => println!("{}: not in store", name),
                    VerifyOutcome::Matched { key } => println!("{}: OK ({})", name, key),
                    VerifyOutcome::Mismatched {
                        key,
                        expected,
                        actual,
                        fields,
                    } => {
                        let fields: Vec<String> = fields.iter().map(|f| f.to_string()).collect();
                        println!("{}: MISMATCH in {} ({})", name, fields.join(", "), key);
                        println!("  expected: {}", expected);
                        println!("  stored:   {}", actual);
                    }
                }
            }
            Ok(match outcome {
                VerifyOutcome::Matched { .. } => 0,
                VerifyOutcome::Mismatched { .. } => 1,
                VerifyOutcome::Absent => 2,
            })
        }

        Commands::Exists { file } => {
            let config = builder.build();
            let vault = RomVault::open(&config)?;
            let name = file_name(&file)?;
            let fingerprint = fingerprint_file(&vault, &file)?;

            let present = vault.exists(name, &fingerprint)?;
            if args.json {
                print_json(&serde_json::json!({
                    "name": name,
                    "key": vault.key_for(name, &fingerprint),
                    "exists": present,
                }))?;
            } else {
                let state = if present { "present" } else { "absent" };
                println!("{} {}", state, vault.key_for(name, &fingerprint));
            }
            Ok(if present { 0 } else { 2 })
        }

        Commands::Fingerprint { files } => {
            let config = builder.build();
            let vault = RomVault::open(&config)?;
            for file in &files {
                let name = file_name(file)?;
                let fingerprint = fingerprint_file(&vault, file)?;
                if args.json {
                    print_json(&FileFingerprint {
                        name,
                        fingerprint: &fingerprint,
                        key: vault.key_for(name, &fingerprint).into_string(),
                    })?;
                } else {
                    println!("{}  {}", fingerprint, name);
                }
            }
            Ok(0)
        }

        Commands::Key { file } => {
            let config = builder.build();
            let vault = RomVault::open(&config)?;
            let name = file_name(&file)?;
            let fingerprint = fingerprint_file(&vault, &file)?;
            println!("{}", vault.key_for(name, &fingerprint));
            Ok(0)
        }
    }
}

impl Expected {
    fn resolve(self, vault: &RomVault) -> Result<Fingerprint> {
        if let Some(file) = &self.file {
            return fingerprint_file(vault, file);
        }
        match (self.size, self.crc32, self.sha1.as_deref()) {
            (Some(size), Some(crc32), Some(sha1)) => Fingerprint::from_parts(size, crc32, sha1),
            _ => Err(RomVaultError::InvalidFingerprint(
                "give either --file or all of --size, --crc32 and --sha1".to_string(),
            )),
        }
    }
}

fn file_name(path: &Path) -> Result<&str> {
    path.file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| RomVaultError::InvalidName(path.display().to_string()))
}

fn fingerprint_file(vault: &RomVault, path: &Path) -> Result<Fingerprint> {
    let mut reader = BufReader::new(File::open(path)?);
    vault.fingerprint(&mut reader)
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| RomVaultError::Io(std::io::Error::new(std::io::ErrorKind::Other, e)))?;
    println!("{}", rendered);
    Ok(())
}
