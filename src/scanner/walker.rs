//! Package tree walker.
//!
//! # Overview
//!
//! A vcpkg packages root holds one directory per installed package
//! (`zlib_x64-linux`, `ada-idna_x64-linux`, ...). [`PackageWalker`] lists
//! those directories in name order and, for each package, the library
//! directories that may hold versioned shared objects.
//!
//! Listing is shallow: only the immediate children of the root are
//! considered packages.

use std::fs;
use std::path::{Path, PathBuf};

use super::ScanError;

/// Library directories checked inside every package, relative to the
/// package root.
pub const LIBRARY_SUBDIRS: [&str; 2] = ["lib", "debug/lib"];

/// Walker over the package directories of a packages root.
#[derive(Debug, Clone)]
pub struct PackageWalker {
    /// Packages root
    root: PathBuf,
}

impl PackageWalker {
    /// Create a walker for the given packages root.
    #[must_use]
    pub fn new(root: &Path) -> Self {
        Self {
            root: root.to_path_buf(),
        }
    }

    /// The packages root this walker lists.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Check that the root exists and is a directory.
    ///
    /// # Errors
    ///
    /// [`ScanError::NotFound`] or [`ScanError::NotADirectory`].
    pub fn validate_root(&self) -> Result<(), ScanError> {
        let metadata = fs::metadata(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;
        if !metadata.is_dir() {
            return Err(ScanError::NotADirectory(self.root.clone()));
        }
        Ok(())
    }

    /// List the immediate subdirectories of the root, sorted by name.
    ///
    /// Symlinks pointing at directories are included. Entries that vanish
    /// while listing are skipped.
    ///
    /// # Errors
    ///
    /// Returns [`ScanError`] if the root is missing, is not a directory, or
    /// cannot be read.
    pub fn package_dirs(&self) -> Result<Vec<PathBuf>, ScanError> {
        self.validate_root()?;

        let entries = fs::read_dir(&self.root).map_err(|e| ScanError::from_io(&self.root, e))?;

        let mut packages = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| ScanError::from_io(&self.root, e))?;
            let path = entry.path();
            match fs::metadata(&path) {
                Ok(meta) if meta.is_dir() => packages.push(path),
                Ok(_) => log::trace!("Ignoring non-directory entry: {}", path.display()),
                Err(e) => log::debug!("Skipping unreadable entry {}: {}", path.display(), e),
            }
        }

        packages.sort();
        log::debug!(
            "Found {} package directories in {}",
            packages.len(),
            self.root.display()
        );
        Ok(packages)
    }

    /// The existing library directories of one package.
    ///
    /// Candidates are `{package}/lib` and `{package}/debug/lib`; missing
    /// candidates are skipped silently.
    #[must_use]
    pub fn library_dirs(package: &Path) -> Vec<PathBuf> {
        LIBRARY_SUBDIRS
            .iter()
            .map(|sub| package.join(sub))
            .filter(|candidate| {
                let exists = candidate.is_dir();
                if !exists {
                    log::trace!("No library directory at {}", candidate.display());
                }
                exists
            })
            .collect()
    }
}

/// The final path component as an owned string, for logs and reports.
#[must_use]
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs::File;
    use tempfile::TempDir;

    fn create_packages_root() -> TempDir {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("zlib_x64-linux/lib")).unwrap();
        fs::create_dir_all(dir.path().join("ada-idna_x64-linux/debug/lib")).unwrap();
        fs::create_dir_all(dir.path().join("ada-idna_x64-linux/lib")).unwrap();
        fs::create_dir_all(dir.path().join("bzip2_x64-linux/include")).unwrap();
        File::create(dir.path().join("README.txt")).unwrap();
        dir
    }

    #[test]
    fn test_package_dirs_sorted_and_directories_only() {
        let dir = create_packages_root();
        let walker = PackageWalker::new(dir.path());

        let names: Vec<String> = walker
            .package_dirs()
            .unwrap()
            .iter()
            .map(|p| display_name(p))
            .collect();

        assert_eq!(
            names,
            vec!["ada-idna_x64-linux", "bzip2_x64-linux", "zlib_x64-linux"]
        );
    }

    #[test]
    fn test_library_dirs_skips_missing_candidates() {
        let dir = create_packages_root();

        let ada = PackageWalker::library_dirs(&dir.path().join("ada-idna_x64-linux"));
        assert_eq!(ada.len(), 2);
        assert!(ada[0].ends_with("lib"));
        assert!(ada[1].ends_with("debug/lib"));

        let zlib = PackageWalker::library_dirs(&dir.path().join("zlib_x64-linux"));
        assert_eq!(zlib.len(), 1);

        let bzip2 = PackageWalker::library_dirs(&dir.path().join("bzip2_x64-linux"));
        assert!(bzip2.is_empty());
    }

    #[test]
    fn test_package_dirs_missing_root() {
        let dir = TempDir::new().unwrap();
        let walker = PackageWalker::new(&dir.path().join("nope"));
        assert!(matches!(walker.package_dirs(), Err(ScanError::NotFound(_))));
    }

    #[test]
    fn test_package_dirs_root_is_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("file.txt");
        File::create(&file).unwrap();

        let walker = PackageWalker::new(&file);
        assert!(matches!(
            walker.package_dirs(),
            Err(ScanError::NotADirectory(_))
        ));
    }

    #[test]
    fn test_package_dirs_empty_root() {
        let dir = TempDir::new().unwrap();
        let walker = PackageWalker::new(dir.path());
        assert!(walker.package_dirs().unwrap().is_empty());
    }

    #[test]
    #[cfg(unix)]
    fn test_package_dirs_follows_directory_symlinks() {
        let dir = create_packages_root();
        std::os::unix::fs::symlink(
            dir.path().join("zlib_x64-linux"),
            dir.path().join("zlib-alias_x64-linux"),
        )
        .unwrap();

        let walker = PackageWalker::new(dir.path());
        assert_eq!(walker.package_dirs().unwrap().len(), 4);
    }
}
