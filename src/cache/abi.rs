//! ABI identity resolution.
//!
//! vcpkg keys every binary cache entry on the SHA-256 of the
//! `vcpkg_abi_info.txt` file written during install. The file lives at
//! `share/{port}/vcpkg_abi_info.txt` inside the package directory, where
//! `{port}` is the package directory name without its triplet suffix.
//!
//! The metadata file is hashed as an opaque byte blob; its content is
//! never parsed.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::Hasher;

/// Name of the metadata file whose hash is the cache key.
pub const ABI_INFO_FILE: &str = "vcpkg_abi_info.txt";

/// Port name and ABI hash of one package.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbiIdentity {
    /// Port name (`ada-idna` for `ada-idna_x64-linux`)
    pub port: String,
    /// Lowercase hex SHA-256 of `vcpkg_abi_info.txt`
    pub hash: String,
}

/// Errors resolving a package's ABI identity.
#[derive(Debug, thiserror::Error)]
pub enum AbiError {
    /// The package has no `share` directory.
    #[error("No share directory found in {0}")]
    MissingShareDir(PathBuf),

    /// The package has no `share/{port}/vcpkg_abi_info.txt`.
    #[error("Could not find {0}")]
    MissingAbiInfo(PathBuf),

    /// The metadata file exists but could not be read.
    #[error("I/O error for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl AbiError {
    /// Whether this error means the package carries no ABI metadata.
    #[must_use]
    pub fn is_missing_metadata(&self) -> bool {
        matches!(self, Self::MissingShareDir(_) | Self::MissingAbiInfo(_))
    }
}

/// Derive the port name from a package directory name.
///
/// Without known triplets the name is split once from the right on `_`:
/// `ada-idna_x64-linux` gives `ada-idna`, and a name without `_` is its
/// own port name. A triplet that itself contains `_` is misread by this
/// rule, so callers may pass the triplets they know about; the longest one
/// that matches as a `_{triplet}` suffix wins, and the split rule is the
/// fallback.
///
/// # Example
///
/// ```
/// use vcpkg_cache::cache::abi::port_name;
///
/// assert_eq!(port_name("ada-idna_x64-linux", &[]), "ada-idna");
/// assert_eq!(port_name("zlib", &[]), "zlib");
///
/// let known = vec!["x64_custom".to_string()];
/// assert_eq!(port_name("zlib_x64_custom", &known), "zlib");
/// assert_eq!(port_name("zlib_x64_custom", &[]), "zlib_x64");
/// ```
#[must_use]
pub fn port_name<'a>(package_name: &'a str, known_triplets: &[String]) -> &'a str {
    let known_match = known_triplets
        .iter()
        .filter(|triplet| !triplet.is_empty())
        .filter_map(|triplet| {
            let port = package_name.strip_suffix(triplet.as_str())?.strip_suffix('_')?;
            (!port.is_empty()).then_some((triplet.len(), port))
        })
        .max_by_key(|(len, _)| *len);

    if let Some((_, port)) = known_match {
        return port;
    }

    match package_name.rsplit_once('_') {
        Some((port, _triplet)) => port,
        None => package_name,
    }
}

/// Resolve the ABI identity of one package directory.
///
/// # Errors
///
/// [`AbiError::MissingShareDir`] / [`AbiError::MissingAbiInfo`] when the
/// metadata is absent, [`AbiError::Io`] when it cannot be read.
pub fn resolve_identity(
    package_dir: &Path,
    known_triplets: &[String],
) -> Result<AbiIdentity, AbiError> {
    let share_dir = package_dir.join("share");
    if !share_dir.exists() {
        return Err(AbiError::MissingShareDir(package_dir.to_path_buf()));
    }

    let package_name = package_dir
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let port = port_name(&package_name, known_triplets).to_string();

    let abi_info = share_dir.join(&port).join(ABI_INFO_FILE);
    if !abi_info.exists() {
        return Err(AbiError::MissingAbiInfo(abi_info));
    }

    let content = fs::read(&abi_info).map_err(|source| AbiError::Io {
        path: abi_info.clone(),
        source,
    })?;
    let hash = Hasher::new().digest_bytes(&content);

    log::debug!("Resolved {} -> port {} hash {}", package_name, port, hash);
    Ok(AbiIdentity { port, hash })
}
