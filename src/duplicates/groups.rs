//! Shared library family grouping.
//!
//! # Overview
//!
//! Installed library directories often carry several names for one shared
//! object: `libfoo.so`, `libfoo.so.1` and `libfoo.so.1.2.3`. Everything
//! before the first `.so` is the *family key*; files sharing a key form a
//! [`LibraryGroup`] and are candidates for relinking.
//!
//! # Example
//!
//! ```
//! use vcpkg_cache::duplicates::groups::family_key;
//!
//! assert_eq!(family_key("libfoo.so.1.2.3"), Some("libfoo"));
//! assert_eq!(family_key("libfoo.a"), None);
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::Serialize;

use crate::scanner::ScanError;

/// Marker separating a library's family key from its version suffix.
pub const SHARED_LIB_MARKER: &str = ".so";

/// Family key of a file name, or `None` if it is not a shared library.
///
/// Names starting with the marker (`.so.1`) have an empty key and are not
/// grouped.
#[must_use]
pub fn family_key(file_name: &str) -> Option<&str> {
    let index = file_name.find(SHARED_LIB_MARKER)?;
    let key = &file_name[..index];
    (!key.is_empty()).then_some(key)
}

/// File names in one directory sharing a family key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LibraryGroup {
    /// Directory holding the members
    pub dir: PathBuf,
    /// Family key (`libfoo`)
    pub family: String,
    /// Member file names, sorted
    pub members: Vec<String>,
}

impl LibraryGroup {
    /// Create a group, sorting its members.
    #[must_use]
    pub fn new(dir: &Path, family: &str, mut members: Vec<String>) -> Self {
        members.sort();
        Self {
            dir: dir.to_path_buf(),
            family: family.to_string(),
            members,
        }
    }

    /// Number of members.
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Check if this group is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Whether there is anything to relink (2+ members).
    #[must_use]
    pub fn needs_resolution(&self) -> bool {
        self.members.len() > 1
    }

    /// Full path of a member.
    #[must_use]
    pub fn member_path(&self, name: &str) -> PathBuf {
        self.dir.join(name)
    }
}

/// Group the immediate entries of `dir` by family key.
///
/// Groups are returned sorted by family key. Entries without the marker
/// and names that are not valid UTF-8 are ignored.
///
/// # Errors
///
/// Returns [`ScanError`] if the directory cannot be listed.
pub fn discover_groups(dir: &Path) -> Result<Vec<LibraryGroup>, ScanError> {
    let entries = fs::read_dir(dir).map_err(|e| ScanError::from_io(dir, e))?;

    let mut families: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for entry in entries {
        let entry = entry.map_err(|e| ScanError::from_io(dir, e))?;
        let Some(name) = entry.file_name().to_str().map(str::to_string) else {
            log::debug!(
                "Skipping non UTF-8 file name in {}: {:?}",
                dir.display(),
                entry.file_name()
            );
            continue;
        };
        if let Some(key) = family_key(&name) {
            families.entry(key.to_string()).or_default().push(name);
        }
    }

    Ok(families
        .into_iter()
        .map(|(family, members)| LibraryGroup::new(dir, &family, members))
        .collect())
}
