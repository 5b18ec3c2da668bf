//! Zip archive builder for cache entries.
//!
//! # Overview
//!
//! [`ArchiveBuilder`] turns an installed package directory into the zip
//! container vcpkg's files provider restores from. On restore the install
//! tree must come back exactly as it was, so the archive records:
//!
//! - every directory, including empty ones, as a `name/` entry
//! - symbolic links as entries whose content is the link target
//! - the POSIX permission bits of every entry (`mode << 16` in the
//!   external attributes)
//!
//! Only the `rwx` bits are stored; the zip writer masks setuid, setgid
//! and sticky. Entries that carry them are counted in
//! [`ArchiveStats::dropped_mode_bits`] and logged at warn level.
//!
//! Symlinks are never followed. Entry names are relative to the package
//! root and always use `/` separators.
//!
//! # Write Protocol
//!
//! The archive is first written to `{destination}.partial` and renamed
//! into place once the central directory is complete. A failed build
//! removes the partial file, so the cache never holds a truncated entry
//! that a later run would mistake for a finished one.
//!
//! # Example
//!
//! ```no_run
//! use vcpkg_cache::cache::archive::ArchiveBuilder;
//! use std::path::Path;
//!
//! let stats = ArchiveBuilder::new()
//!     .build(Path::new("packages/zlib_x64-linux"), Path::new("cache/b3/b3e6.zip"))
//!     .unwrap();
//! println!("{} files, {} bytes", stats.files, stats.archive_size);
//! ```

use std::ffi::OsString;
use std::fs::{self, File, Metadata};
use std::io::{self, BufWriter, Write};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::result::ZipError;
use zip::write::{SimpleFileOptions, ZipWriter};
use zip::{CompressionMethod, DateTime};

/// Entries at or above this size need zip64 extensions.
const ZIP64_THRESHOLD: u64 = u32::MAX as u64;

/// setuid, setgid and sticky.
const SPECIAL_MODE_BITS: u32 = 0o7000;

/// Suffix of the in-progress archive next to the destination.
pub const PARTIAL_SUFFIX: &str = ".partial";

/// Errors building an archive.
#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    /// Directory traversal failed.
    #[error("failed to walk {path}: {source}")]
    Walk {
        path: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    /// Reading a source file or writing the destination failed.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// The zip writer rejected an entry.
    #[error("zip error for {path}: {source}")]
    Zip {
        path: PathBuf,
        #[source]
        source: ZipError,
    },

    /// A path or link target cannot be stored as a zip entry name.
    #[error("path is not valid UTF-8: {0}")]
    NonUtf8Path(PathBuf),
}

impl ArchiveError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }

    fn zip(path: &Path, source: ZipError) -> Self {
        Self::Zip {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// What went into one archive.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize)]
pub struct ArchiveStats {
    /// Directory entries written
    pub directories: usize,
    /// Regular file entries written
    pub files: usize,
    /// Symlink entries written
    pub symlinks: usize,
    /// Special files (fifos, sockets, devices) left out
    pub skipped: usize,
    /// Entries whose setuid, setgid or sticky bits were not stored
    pub dropped_mode_bits: usize,
    /// Total uncompressed size of regular files
    pub content_bytes: u64,
    /// Size of the finished archive on disk
    pub archive_size: u64,
}

/// Builder for cache entry archives.
#[derive(Debug, Clone)]
pub struct ArchiveBuilder {
    options: SimpleFileOptions,
}

impl Default for ArchiveBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl ArchiveBuilder {
    /// Create a builder using deflate at its default level.
    ///
    /// Entry timestamps are pinned to the zip epoch (1980-01-01) so the same
    /// tree always produces the same bytes.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: SimpleFileOptions::default()
                .compression_method(CompressionMethod::Deflated)
                .last_modified_time(DateTime::default()),
        }
    }

    /// Archive `root` into `destination`, replacing any existing file.
    ///
    /// # Errors
    ///
    /// Any unreadable source entry or unwritable destination aborts the
    /// build; no file is left at `destination` in that case.
    pub fn build(&self, root: &Path, destination: &Path) -> Result<ArchiveStats, ArchiveError> {
        let partial = partial_path(destination);

        let result = self.write_archive(root, &partial).and_then(|mut stats| {
            fs::rename(&partial, destination).map_err(|e| ArchiveError::io(destination, e))?;
            stats.archive_size = fs::metadata(destination)
                .map(|m| m.len())
                .unwrap_or_default();
            Ok(stats)
        });

        if result.is_err() {
            match fs::remove_file(&partial) {
                Ok(()) => log::debug!("Removed partial archive {}", partial.display()),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => log::warn!(
                    "Failed to remove partial archive {}: {}",
                    partial.display(),
                    e
                ),
            }
        }

        result
    }

    fn write_archive(&self, root: &Path, output: &Path) -> Result<ArchiveStats, ArchiveError> {
        let file = File::create(output).map_err(|e| ArchiveError::io(output, e))?;
        let mut zip = ZipWriter::new(BufWriter::new(file));
        let mut stats = ArchiveStats::default();

        let walker = WalkDir::new(root)
            .follow_links(false)
            .min_depth(1)
            .sort_by_file_name();

        for entry in walker {
            let entry = entry.map_err(|e| ArchiveError::Walk {
                path: e.path().map_or_else(|| root.to_path_buf(), Path::to_path_buf),
                source: e,
            })?;
            let path = entry.path();
            let name = entry_name(root, path)?;
            let metadata = entry.metadata().map_err(|e| ArchiveError::Walk {
                path: path.to_path_buf(),
                source: e,
            })?;
            let mode = permission_bits(&metadata);
            if mode & SPECIAL_MODE_BITS != 0 {
                log::warn!(
                    "Mode {:o} of {} loses its setuid/setgid/sticky bits in the archive",
                    mode,
                    path.display()
                );
                stats.dropped_mode_bits += 1;
            }
            let options = self.options.unix_permissions(mode & 0o777);
            let file_type = entry.file_type();

            if file_type.is_dir() {
                zip.add_directory(format!("{name}/"), options)
                    .map_err(|e| ArchiveError::zip(path, e))?;
                stats.directories += 1;
            } else if file_type.is_symlink() {
                let target = fs::read_link(path).map_err(|e| ArchiveError::io(path, e))?;
                let target = target
                    .to_str()
                    .ok_or_else(|| ArchiveError::NonUtf8Path(path.to_path_buf()))?;
                log::trace!("Adding symlink {} -> {}", name, target);
                zip.add_symlink(name, target, options)
                    .map_err(|e| ArchiveError::zip(path, e))?;
                stats.symlinks += 1;
            } else if file_type.is_file() {
                let mut source = File::open(path).map_err(|e| ArchiveError::io(path, e))?;
                let options = options.large_file(metadata.len() >= ZIP64_THRESHOLD);
                zip.start_file(name, options)
                    .map_err(|e| ArchiveError::zip(path, e))?;
                let copied =
                    io::copy(&mut source, &mut zip).map_err(|e| ArchiveError::io(path, e))?;
                stats.files += 1;
                stats.content_bytes += copied;
            } else {
                log::warn!("Skipping special file: {}", path.display());
                stats.skipped += 1;
            }
        }

        let mut writer = zip.finish().map_err(|e| ArchiveError::zip(output, e))?;
        writer.flush().map_err(|e| ArchiveError::io(output, e))?;

        Ok(stats)
    }
}

/// `{destination}.partial`
#[must_use]
pub fn partial_path(destination: &Path) -> PathBuf {
    let mut name = OsString::from(destination.as_os_str());
    name.push(PARTIAL_SUFFIX);
    PathBuf::from(name)
}

/// Zip entry name of `path`: relative to `root`, `/`-separated.
fn entry_name(root: &Path, path: &Path) -> Result<String, ArchiveError> {
    let relative = path.strip_prefix(root).unwrap_or(path);
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(
                part.to_str()
                    .ok_or_else(|| ArchiveError::NonUtf8Path(path.to_path_buf()))?,
            ),
            Component::CurDir => {}
            _ => return Err(ArchiveError::NonUtf8Path(path.to_path_buf())),
        }
    }
    Ok(parts.join("/"))
}

#[cfg(unix)]
fn permission_bits(metadata: &Metadata) -> u32 {
    use std::os::unix::fs::PermissionsExt;
    metadata.permissions().mode() & 0o7777
}

#[cfg(not(unix))]
fn permission_bits(metadata: &Metadata) -> u32 {
    if metadata.is_dir() {
        0o755
    } else if metadata.file_type().is_symlink() {
        0o777
    } else if metadata.permissions().readonly() {
        0o444
    } else {
        0o644
    }
}
