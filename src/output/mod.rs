//! Run report formatters.
//!
//! - [`text`]: closing summaries for humans
//! - [`json`]: one JSON document per run for scripting
//!
//! # Example
//!
//! ```no_run
//! use vcpkg_cache::cache::CacheStore;
//! use vcpkg_cache::error::ExitCode;
//! use vcpkg_cache::output::JsonOutput;
//! use std::path::Path;
//!
//! let summary = CacheStore::new(Path::new("vcpkg-cache"))
//!     .build_from_packages(Path::new("vcpkg/packages"))
//!     .unwrap();
//! let output = JsonOutput::build(&summary, ExitCode::Success);
//! println!("{}", output.to_json_pretty().unwrap());
//! ```

pub mod json;
pub mod text;

pub use json::{JsonOutput, JsonOutputError, JsonReport};
pub use text::{write_build_summary, write_dedup_summary};
