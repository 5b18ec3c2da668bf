//! Binary cache builder.
//!
//! This module turns a vcpkg packages directory into a binary cache laid
//! out for the "files" provider:
//!
//! ```text
//! {cache_root}/{hash[0:2]}/{hash}.zip
//! ```
//!
//! # Architecture
//!
//! * [`abi`]: Resolves each package's port name and ABI hash.
//! * [`archive`]: Writes one package tree into a zip container.
//! * [`entry`]: Computes the sharded entry location for a hash.
//!
//! [`CacheStore`] drives the three over every package, one package at a
//! time and in name order, and collects a [`BuildSummary`].
//!
//! # Failure Policy
//!
//! A missing or empty packages root is fatal and returned as
//! [`CacheError`]. Anything that goes wrong with a single package is
//! recorded in the summary and the run moves on to the next package.
//!
//! # Example
//!
//! ```no_run
//! use vcpkg_cache::cache::CacheStore;
//! use std::path::Path;
//!
//! let summary = CacheStore::new(Path::new("vcpkg-cache"))
//!     .with_dry_run(true)
//!     .build_from_packages(Path::new("vcpkg/packages"))
//!     .unwrap();
//! println!("would create {} entries", summary.would_create);
//! ```

pub mod abi;
pub mod archive;
pub mod entry;

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::progress::ProgressCallback;
use crate::scanner::walker::display_name;
use crate::scanner::{PackageWalker, ScanError};

pub use abi::{resolve_identity, AbiError, AbiIdentity};
pub use archive::{ArchiveBuilder, ArchiveError, ArchiveStats};
pub use entry::{entry_path, relative_entry_path};

/// Fatal errors that stop a cache build before any package is processed.
#[derive(Debug, thiserror::Error)]
pub enum CacheError {
    /// The packages directory does not exist.
    #[error("Packages directory not found: {0}")]
    PackagesRootNotFound(PathBuf),

    /// The packages path is not a directory.
    #[error("Packages path is not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The packages directory has no package subdirectories.
    #[error("No package directories found in {0}")]
    NoPackages(PathBuf),

    /// The packages directory could not be listed.
    #[error("Failed to list packages in {path}: {source}")]
    ListFailed {
        path: PathBuf,
        #[source]
        source: ScanError,
    },

    /// The cache root could not be created.
    #[error("Failed to create cache directory {path}: {source}")]
    CreateCacheRoot {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors for a single package. Recorded, never fatal.
#[derive(Debug, thiserror::Error)]
pub enum PackageError {
    #[error(transparent)]
    Abi(#[from] AbiError),

    #[error("Failed to create shard directory {path}: {source}")]
    CreateShard {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error(transparent)]
    Archive(#[from] ArchiveError),
}

/// What happened to one package.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PackageOutcome {
    /// A new cache entry was written.
    Created {
        identity: AbiIdentity,
        entry: PathBuf,
        stats: ArchiveStats,
    },
    /// An entry with this hash already exists.
    Skipped { identity: AbiIdentity, entry: PathBuf },
    /// Dry run: an entry would have been written.
    WouldCreate { identity: AbiIdentity, entry: PathBuf },
    /// The package could not be cached.
    Failed { error: String },
}

/// Outcome of one package, named by its directory.
#[derive(Debug, Clone, Serialize)]
pub struct PackageReport {
    /// Package directory name (`zlib_x64-linux`)
    pub package: String,
    /// What happened
    #[serde(flatten)]
    pub outcome: PackageOutcome,
}

/// Result of a cache build run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct BuildSummary {
    /// Cache root the run wrote into
    pub cache_root: PathBuf,
    /// Number of package directories found
    pub total_packages: usize,
    /// Per-package outcomes in processing order
    pub packages: Vec<PackageReport>,
    /// Entries written
    pub created: usize,
    /// Entries already present
    pub skipped: usize,
    /// Entries a dry run would write
    pub would_create: usize,
    /// One message per failed package, in processing order
    pub errors: Vec<String>,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Whether the run stopped early on Ctrl+C
    pub interrupted: bool,
    /// Wall-clock duration of the run
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl BuildSummary {
    /// Number of packages that failed.
    #[must_use]
    pub fn error_count(&self) -> usize {
        self.errors.len()
    }

    /// Whether every processed package succeeded or was skipped.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }

    /// The cache root as an absolute path.
    #[must_use]
    pub fn absolute_cache_root(&self) -> PathBuf {
        std::path::absolute(&self.cache_root).unwrap_or_else(|_| self.cache_root.clone())
    }

    /// Value for `VCPKG_BINARY_SOURCES` pointing vcpkg at this cache.
    #[must_use]
    pub fn binary_sources(&self) -> String {
        format!("clear;files,{},readwrite", self.absolute_cache_root().display())
    }

    fn record(&mut self, package: String, outcome: PackageOutcome) {
        match &outcome {
            PackageOutcome::Created { .. } => self.created += 1,
            PackageOutcome::Skipped { .. } => self.skipped += 1,
            PackageOutcome::WouldCreate { .. } => self.would_create += 1,
            PackageOutcome::Failed { error } => {
                self.errors.push(format!("Error processing {package}: {error}"));
            }
        }
        self.packages.push(PackageReport { package, outcome });
    }
}

pub(crate) mod duration_ms {
    use serde::Serializer;
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }
}

/// Builds cache entries for every package under a packages root.
#[derive(Clone)]
pub struct CacheStore {
    cache_root: PathBuf,
    dry_run: bool,
    known_triplets: Vec<String>,
    archiver: ArchiveBuilder,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for CacheStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheStore")
            .field("cache_root", &self.cache_root)
            .field("dry_run", &self.dry_run)
            .field("known_triplets", &self.known_triplets)
            .field("shutdown_flag", &self.shutdown_flag)
            .field(
                "progress_callback",
                &self.progress_callback.as_ref().map(|_| "<callback>"),
            )
            .finish()
    }
}

impl CacheStore {
    /// Create a store writing into `cache_root`.
    #[must_use]
    pub fn new(cache_root: &Path) -> Self {
        Self {
            cache_root: cache_root.to_path_buf(),
            dry_run: false,
            known_triplets: Vec::new(),
            archiver: ArchiveBuilder::new(),
            shutdown_flag: None,
            progress_callback: None,
        }
    }

    /// Report intended actions without touching the cache.
    #[must_use]
    pub fn with_dry_run(mut self, dry_run: bool) -> Self {
        self.dry_run = dry_run;
        self
    }

    /// Triplets used to split package directory names (see [`abi::port_name`]).
    #[must_use]
    pub fn with_known_triplets(mut self, triplets: Vec<String>) -> Self {
        self.known_triplets = triplets;
        self
    }

    /// Set the shutdown flag for graceful termination.
    #[must_use]
    pub fn with_shutdown_flag(mut self, flag: Arc<AtomicBool>) -> Self {
        self.shutdown_flag = Some(flag);
        self
    }

    /// Set the progress callback.
    #[must_use]
    pub fn with_progress_callback(mut self, callback: Arc<dyn ProgressCallback>) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    /// The cache root this store writes into.
    #[must_use]
    pub fn cache_root(&self) -> &Path {
        &self.cache_root
    }

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Build cache entries for every package directory under `packages_root`.
    ///
    /// # Errors
    ///
    /// Only the fatal preconditions in [`CacheError`]; per-package failures
    /// are reported in the returned summary.
    pub fn build_from_packages(&self, packages_root: &Path) -> Result<BuildSummary, CacheError> {
        let start = Instant::now();

        let packages = PackageWalker::new(packages_root)
            .package_dirs()
            .map_err(|e| match e {
                ScanError::NotFound(p) => CacheError::PackagesRootNotFound(p),
                ScanError::NotADirectory(p) => CacheError::NotADirectory(p),
                other => CacheError::ListFailed {
                    path: packages_root.to_path_buf(),
                    source: other,
                },
            })?;

        if packages.is_empty() {
            return Err(CacheError::NoPackages(packages_root.to_path_buf()));
        }

        log::info!("Found {} packages", packages.len());
        log::info!("Cache output: {}", self.cache_root.display());

        if !self.dry_run {
            fs::create_dir_all(&self.cache_root).map_err(|source| CacheError::CreateCacheRoot {
                path: self.cache_root.clone(),
                source,
            })?;
        }

        let mut summary = BuildSummary {
            cache_root: self.cache_root.clone(),
            total_packages: packages.len(),
            dry_run: self.dry_run,
            ..BuildSummary::default()
        };

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_start("packages", packages.len());
        }

        for (index, package_dir) in packages.iter().enumerate() {
            if self.is_shutdown_requested() {
                log::warn!(
                    "Interrupted after {} of {} packages",
                    index,
                    packages.len()
                );
                summary.interrupted = true;
                break;
            }

            let package = display_name(package_dir);
            if let Some(ref cb) = self.progress_callback {
                cb.on_progress(index + 1, &package);
            }

            log::info!("Processing: {}", package);
            let outcome = match self.process_package(package_dir) {
                Ok(outcome) => outcome,
                Err(e) => {
                    match &e {
                        PackageError::Abi(abi) if abi.is_missing_metadata() => {
                            log::warn!("  ERROR: {}", e);
                        }
                        _ => log::error!("  ERROR: {}", e),
                    }
                    PackageOutcome::Failed {
                        error: e.to_string(),
                    }
                }
            };
            summary.record(package, outcome);
        }

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_end("packages");
        }

        summary.duration = start.elapsed();
        Ok(summary)
    }

    /// Cache one package directory.
    ///
    /// # Errors
    ///
    /// [`PackageError`] if the identity cannot be resolved or the archive
    /// cannot be written.
    pub fn process_package(&self, package_dir: &Path) -> Result<PackageOutcome, PackageError> {
        let identity = resolve_identity(package_dir, &self.known_triplets)?;
        log::info!("  Port: {}", identity.port);
        log::info!("  ABI Hash: {}", identity.hash);

        let entry = entry_path(&self.cache_root, &identity.hash);
        let relative = relative_entry_path(&identity.hash);

        if !self.dry_run && entry.exists() {
            log::info!(
                "  Skipped: Cache file already exists at {}",
                relative.display()
            );
            return Ok(PackageOutcome::Skipped { identity, entry });
        }

        if self.dry_run {
            log::info!("  Would create: {}", relative.display());
            return Ok(PackageOutcome::WouldCreate { identity, entry });
        }

        if let Some(shard_dir) = entry.parent() {
            fs::create_dir_all(shard_dir).map_err(|source| PackageError::CreateShard {
                path: shard_dir.to_path_buf(),
                source,
            })?;
        }

        log::debug!("  Compressing {}...", display_name(package_dir));
        let stats = self.archiver.build(package_dir, &entry)?;
        log::info!(
            "  Created: {} ({})",
            relative.display(),
            bytesize::ByteSize::b(stats.archive_size)
        );

        Ok(PackageOutcome::Created {
            identity,
            entry,
            stats,
        })
    }
}
