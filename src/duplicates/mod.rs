//! Shared-library deduplication.
//!
//! This module walks every package under a packages root, looks at its
//! `lib/` and `debug/lib/` directories and replaces byte-identical members
//! of each library family with relative symlinks:
//!
//! - [`groups`]: Family grouping of one directory's file names
//! - [`resolver`]: Canonical selection, hashing and relinking of one group
//!
//! [`Deduplicator`] drives both and aggregates a [`DedupSummary`].
//!
//! # Example
//!
//! ```no_run
//! use vcpkg_cache::duplicates::Deduplicator;
//! use std::path::Path;
//!
//! let summary = Deduplicator::new(true).run(Path::new("vcpkg/packages")).unwrap();
//! println!("{} files would be relinked", summary.would_relink);
//! ```

pub mod groups;
pub mod resolver;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::Serialize;

use crate::progress::ProgressCallback;
use crate::scanner::walker::display_name;
use crate::scanner::{PackageWalker, ScanError};

pub use groups::{discover_groups, family_key, LibraryGroup};
pub use resolver::{DuplicateResolver, GroupOutcome, GroupReport, MemberAction, MemberReport};

/// Fatal errors that stop a dedup run.
#[derive(Debug, thiserror::Error)]
pub enum DedupError {
    /// The packages root does not exist.
    #[error("Directory not found: {0}")]
    RootNotFound(PathBuf),

    /// The packages root is not a directory.
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    /// The packages root could not be listed.
    #[error("Failed to list packages in {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: ScanError,
    },
}

/// Groups found in one library directory.
#[derive(Debug, Clone, Serialize)]
pub struct LibraryDirReport {
    /// The library directory
    pub path: PathBuf,
    /// One report per family group
    pub groups: Vec<GroupReport>,
    /// Listing error, if the directory could not be read
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Result of a dedup run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct DedupSummary {
    /// Packages root that was scanned
    pub root: PathBuf,
    /// Package directories found
    pub packages: usize,
    /// Library directories examined
    pub library_dirs: usize,
    /// Family groups examined (including single-member ones)
    pub groups: usize,
    /// Members replaced with links
    pub relinked: usize,
    /// Members a dry run would replace
    pub would_relink: usize,
    /// Members left alone because their content differs
    pub differing: usize,
    /// Unreadable files, failed relinks and unreadable directories
    pub failures: usize,
    /// Per-directory reports in processing order
    pub directories: Vec<LibraryDirReport>,
    /// Whether this was a dry run
    pub dry_run: bool,
    /// Whether the run stopped early on Ctrl+C
    pub interrupted: bool,
    /// Wall-clock duration of the run
    #[serde(with = "crate::cache::duration_ms")]
    pub duration: Duration,
}

impl DedupSummary {
    /// Whether no failure was recorded.
    #[must_use]
    pub fn all_succeeded(&self) -> bool {
        self.failures == 0
    }

    fn record(&mut self, report: LibraryDirReport) {
        self.library_dirs += 1;
        self.groups += report.groups.len();
        if report.error.is_some() {
            self.failures += 1;
        }
        for group in &report.groups {
            self.relinked += group.relinked();
            self.would_relink += group.would_relink();
            self.differing += group.differing();
            self.failures += group.failures();
        }
        self.directories.push(report);
    }
}

/// Deduplicates shared libraries across a packages root.
#[derive(Clone)]
pub struct Deduplicator {
    resolver: DuplicateResolver,
    shutdown_flag: Option<Arc<AtomicBool>>,
    progress_callback: Option<Arc<dyn ProgressCallback>>,
}

impl std::fmt::Debug for Deduplicator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Deduplicator")
            .field("resolver", &self.resolver)
            .field("shutdown_flag", &self.shutdown_flag)
            .finish_non_exhaustive()
    }
}

impl Deduplicator {
    /// Create a deduplicator. In dry-run mode nothing on disk is changed.
    #[must_use]
    pub fn new(dry_run: bool) -> Self {
        Self {
            resolver: DuplicateResolver::new(dry_run),
            shutdown_flag: None,
            progress_callback: None,
        }
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

    fn is_shutdown_requested(&self) -> bool {
        self.shutdown_flag
            .as_ref()
            .is_some_and(|f| f.load(Ordering::SeqCst))
    }

    /// Deduplicate every package's library directories under `root`.
    ///
    /// # Errors
    ///
    /// [`DedupError`] if the root is missing, not a directory or cannot be
    /// listed. An empty root is not an error.
    pub fn run(&self, root: &Path) -> Result<DedupSummary, DedupError> {
        let start = Instant::now();

        let packages = PackageWalker::new(root).package_dirs().map_err(|e| match e {
            ScanError::NotFound(p) => DedupError::RootNotFound(p),
            ScanError::NotADirectory(p) => DedupError::NotADirectory(p),
            other => DedupError::Io {
                path: root.to_path_buf(),
                source: other,
            },
        })?;

        if self.resolver.is_dry_run() {
            log::info!("--- Starting in DRY RUN mode. No files will be changed. ---");
        }

        let mut summary = DedupSummary {
            root: root.to_path_buf(),
            packages: packages.len(),
            dry_run: self.resolver.is_dry_run(),
            ..DedupSummary::default()
        };

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_start("packages", packages.len());
        }

        'packages: for (index, package_dir) in packages.iter().enumerate() {
            let package = display_name(package_dir);
            if let Some(ref cb) = self.progress_callback {
                cb.on_progress(index + 1, &package);
            }

            for lib_dir in PackageWalker::library_dirs(package_dir) {
                if self.is_shutdown_requested() {
                    log::warn!("Interrupted before {}", lib_dir.display());
                    summary.interrupted = true;
                    break 'packages;
                }
                log::info!("\nScanning directory: {}", lib_dir.display());
                summary.record(self.process_library_dir(&lib_dir));
            }
        }

        if let Some(ref cb) = self.progress_callback {
            cb.on_phase_end("packages");
        }

        summary.duration = start.elapsed();
        if summary.interrupted {
            log::warn!("Deduplication interrupted.");
        } else {
            log::info!("\n--- Deduplication complete. ---");
        }
        Ok(summary)
    }

    /// Discover and resolve the groups of one library directory.
    #[must_use]
    pub fn process_library_dir(&self, lib_dir: &Path) -> LibraryDirReport {
        match discover_groups(lib_dir) {
            Ok(groups) => LibraryDirReport {
                path: lib_dir.to_path_buf(),
                groups: groups.iter().map(|g| self.resolver.resolve(g)).collect(),
                error: None,
            },
            Err(e) => {
                log::error!("  Could not list {}: {}", lib_dir.display(), e);
                LibraryDirReport {
                    path: lib_dir.to_path_buf(),
                    groups: Vec::new(),
                    error: Some(e.to_string()),
                }
            }
        }
    }
}
