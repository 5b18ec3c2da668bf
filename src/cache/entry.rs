//! Cache entry location.
//!
//! The files provider shards entries by the first two hex characters of
//! the ABI hash: `{cache_root}/{hash[0:2]}/{hash}.zip`.

use std::path::{Path, PathBuf};

/// File extension of cache entries.
pub const ENTRY_EXTENSION: &str = "zip";

/// Shard directory name for a hash (its first two characters).
#[must_use]
pub fn shard(hash: &str) -> &str {
    hash.get(..2).unwrap_or(hash)
}

/// Path of a cache entry relative to the cache root, e.g. `b3/b3e6….zip`.
#[must_use]
pub fn relative_entry_path(hash: &str) -> PathBuf {
    Path::new(shard(hash)).join(format!("{hash}.{ENTRY_EXTENSION}"))
}

/// Absolute location of the cache entry for `hash` under `cache_root`.
#[must_use]
pub fn entry_path(cache_root: &Path, hash: &str) -> PathBuf {
    cache_root.join(relative_entry_path(hash))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_path_sharding() {
        let hash = "b3e6227a9c0f";
        assert_eq!(shard(hash), "b3");
        assert_eq!(
            entry_path(Path::new("/cache"), hash),
            PathBuf::from("/cache/b3/b3e6227a9c0f.zip")
        );
    }

    #[test]
    fn test_shard_short_hash() {
        assert_eq!(shard("a"), "a");
        assert_eq!(relative_entry_path("a"), PathBuf::from("a/a.zip"));
    }
}
