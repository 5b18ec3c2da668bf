//! SHA-256 file hasher with streaming support.
//!
//! # Overview
//!
//! [`Hasher`] computes the content identity shared by both pipelines:
//! cache keys are the SHA-256 of `vcpkg_abi_info.txt`, and duplicate
//! libraries are confirmed by comparing SHA-256 digests of whole files.
//!
//! Files are read in fixed [`BLOCK_SIZE`] chunks, so memory use does not
//! grow with file size.
//!
//! # Example
//!
//! ```no_run
//! use vcpkg_cache::scanner::Hasher;
//! use std::path::Path;
//!
//! let hasher = Hasher::new();
//! let digest = hasher.digest_file(Path::new("lib/libfoo.so.1.2.3")).unwrap();
//! println!("{} ({} bytes)", digest.hash, digest.size);
//! ```

use std::fs::File;
use std::io::{self, Read};
use std::path::Path;

use sha2::{Digest, Sha256};

use super::HashError;

/// Size of each read while streaming a file through the digest.
pub const BLOCK_SIZE: usize = 64 * 1024;

/// Size and content hash of one file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileDigest {
    /// Number of bytes read from the file
    pub size: u64,
    /// Lowercase hex SHA-256 (64 characters)
    pub hash: String,
}

/// Streaming SHA-256 hasher.
#[derive(Debug, Clone)]
pub struct Hasher {
    block_size: usize,
}

impl Default for Hasher {
    fn default() -> Self {
        Self::new()
    }
}

impl Hasher {
    /// Create a hasher that reads [`BLOCK_SIZE`] bytes at a time.
    #[must_use]
    pub fn new() -> Self {
        Self {
            block_size: BLOCK_SIZE,
        }
    }

    /// Create a hasher with a custom read block size (minimum 1 byte).
    #[must_use]
    pub fn with_block_size(block_size: usize) -> Self {
        Self {
            block_size: block_size.max(1),
        }
    }

    /// Hash the full content of a file.
    ///
    /// # Errors
    ///
    /// Returns [`HashError`] if the file cannot be opened or read.
    pub fn digest_file(&self, path: &Path) -> Result<FileDigest, HashError> {
        let mut file = File::open(path).map_err(|e| HashError::from_io(path, e))?;
        let mut hasher = Sha256::new();
        let mut buffer = vec![0u8; self.block_size];
        let mut size = 0u64;

        loop {
            let read = match file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
                Err(e) => return Err(HashError::from_io(path, e)),
            };
            hasher.update(&buffer[..read]);
            size += read as u64;
        }

        let hash = hex::encode(hasher.finalize());
        log::trace!("Hashed {} ({} bytes): {}", path.display(), size, hash);

        Ok(FileDigest { size, hash })
    }

    /// Hash an in-memory buffer exactly as given.
    #[must_use]
    pub fn digest_bytes(&self, data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }
}
