//! Replace a duplicate library with a symlink to its canonical copy.
//!
//! # Overview
//!
//! [`relink_to_canonical`] turns `dir/member` into a relative symlink
//! pointing at `canonical` (a file name in the same directory).
//!
//! # Safety
//!
//! The link is created under a temporary name next to the member and then
//! renamed over it, so the member is replaced in a single step: at every
//! point `dir/member` is either the original file or the finished link.
//! The member is re-checked to still be a regular file right before the
//! swap; a member that changed into a link or directory is left alone.
//!
//! # Example
//!
//! ```no_run
//! use vcpkg_cache::actions::relink::relink_to_canonical;
//! use std::path::Path;
//!
//! relink_to_canonical(Path::new("lib"), "libfoo.so.1", "libfoo.so.1.2.3").unwrap();
//! ```

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use thiserror::Error;

/// Error type for relink operations.
#[derive(Debug, Error)]
pub enum RelinkError {
    /// The member no longer exists.
    #[error("file not found: {0}")]
    NotFound(PathBuf),

    /// The member is no longer a regular file.
    #[error("not a regular file: {0}")]
    NotRegularFile(PathBuf),

    /// Permission denied while creating or swapping the link.
    #[error("permission denied: {0}")]
    PermissionDenied(PathBuf),

    /// Creating the temporary symlink failed.
    #[error("failed to create symlink {path} -> {target}: {source}")]
    LinkFailed {
        path: PathBuf,
        target: String,
        #[source]
        source: io::Error,
    },

    /// Renaming the symlink over the member failed.
    #[error("failed to replace {path}: {source}")]
    ReplaceFailed {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl RelinkError {
    /// Get the path associated with this error.
    #[must_use]
    pub fn path(&self) -> &Path {
        match self {
            Self::NotFound(p)
            | Self::NotRegularFile(p)
            | Self::PermissionDenied(p)
            | Self::LinkFailed { path: p, .. }
            | Self::ReplaceFailed { path: p, .. } => p,
        }
    }
}

/// Name of the temporary link created next to `member`.
#[must_use]
pub fn temp_link_name(member: &str) -> String {
    format!(".{member}.relink-tmp")
}

/// Replace `dir/member` with a symlink to `canonical`.
///
/// The link target is the bare file name `canonical`, so the link stays
/// valid if the directory is moved or archived.
///
/// # Errors
///
/// Returns [`RelinkError`] if the member is missing or not a regular file,
/// or if the link cannot be created or swapped in. On error the member is
/// left as it was.
pub fn relink_to_canonical(dir: &Path, member: &str, canonical: &str) -> Result<(), RelinkError> {
    let member_path = dir.join(member);

    let metadata = fs::symlink_metadata(&member_path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => RelinkError::NotFound(member_path.clone()),
        io::ErrorKind::PermissionDenied => RelinkError::PermissionDenied(member_path.clone()),
        _ => RelinkError::ReplaceFailed {
            path: member_path.clone(),
            source: e,
        },
    })?;
    if !metadata.file_type().is_file() {
        return Err(RelinkError::NotRegularFile(member_path));
    }

    let temp_path = dir.join(temp_link_name(member));
    // A leftover from an interrupted run is always ours to replace
    if fs::symlink_metadata(&temp_path).is_ok() {
        log::debug!("Removing stale temporary link {}", temp_path.display());
        let _ = fs::remove_file(&temp_path);
    }

    create_symlink(canonical, &temp_path).map_err(|e| match e.kind() {
        io::ErrorKind::PermissionDenied => RelinkError::PermissionDenied(temp_path.clone()),
        _ => RelinkError::LinkFailed {
            path: temp_path.clone(),
            target: canonical.to_string(),
            source: e,
        },
    })?;

    if let Err(e) = fs::rename(&temp_path, &member_path) {
        let _ = fs::remove_file(&temp_path);
        return Err(match e.kind() {
            io::ErrorKind::PermissionDenied => RelinkError::PermissionDenied(member_path),
            _ => RelinkError::ReplaceFailed {
                path: member_path,
                source: e,
            },
        });
    }

    log::debug!("Relinked {} -> {}", member_path.display(), canonical);
    Ok(())
}

#[cfg(unix)]
fn create_symlink(target: &str, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(windows)]
fn create_symlink(target: &str, link: &Path) -> io::Result<()> {
    // symlink_file requires admin rights or developer mode on some Windows versions
    std::os::windows::fs::symlink_file(target, link)
}

#[cfg(not(any(unix, windows)))]
fn create_symlink(_target: &str, _link: &Path) -> io::Result<()> {
    Err(io::Error::new(
        io::ErrorKind::Unsupported,
        "symbolic links are not supported on this platform",
    ))
}
