//! File actions module.
//!
//! This module provides the only operation that mutates a packages tree:
//! replacing a duplicate shared library with a relative symlink to its
//! canonical copy.
//!
//! ```no_run
//! use vcpkg_cache::actions::relink_to_canonical;
//! use std::path::Path;
//!
//! relink_to_canonical(Path::new("zlib_x64-linux/lib"), "libz.so.1", "libz.so.1.3.1").unwrap();
//! ```

pub mod relink;

pub use relink::{relink_to_canonical, RelinkError};
