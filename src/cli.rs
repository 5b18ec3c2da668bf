//! Command-line interface definitions.
//!
//! Global options (verbosity, config file, output format) come first, then
//! one of the subcommands:
//!
//! ```bash
//! # Cache every package under vcpkg/packages into vcpkg-cache/
//! vcpkg-cache build
//!
//! # See what would be cached, with explicit paths
//! vcpkg-cache build -p /opt/vcpkg/packages -c /srv/cache --dry-run
//!
//! # Replace duplicate shared libraries with symlinks, showing hashes
//! vcpkg-cache -v dedup /opt/vcpkg/packages
//!
//! # Print the effective configuration
//! vcpkg-cache config
//! ```

use clap::{Args, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

/// Build vcpkg binary caches and deduplicate shared libraries.
#[derive(Debug, Parser)]
#[command(name = "vcpkg-cache")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Increase verbosity level (-v for debug, -vv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Configuration file to use instead of the platform default
    #[arg(long, value_name = "PATH", global = true, env = "VCPKG_CACHE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Report format
    #[arg(long, value_enum, default_value = "text", global = true)]
    pub output: OutputFormat,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands.
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Archive every installed package into the binary cache
    Build(BuildArgs),
    /// Replace identical shared library copies with symlinks
    Dedup(DedupArgs),
    /// Print the effective configuration as TOML
    Config,
}

/// Arguments for the build subcommand.
#[derive(Debug, Args)]
pub struct BuildArgs {
    /// Directory holding one subdirectory per installed package
    ///
    /// Defaults to the configured `packages_dir` (vcpkg/packages).
    #[arg(short, long, value_name = "DIR")]
    pub packages_dir: Option<PathBuf>,

    /// Binary cache root to write entries into
    ///
    /// Defaults to the configured `cache_dir` (vcpkg-cache).
    #[arg(short, long, value_name = "DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Report what would be created without writing anything
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Known triplet used to split package directory names (repeatable)
    ///
    /// Added to the configured `known_triplets`.
    #[arg(long = "triplet", value_name = "TRIPLET")]
    pub triplets: Vec<String>,
}

/// Arguments for the dedup subcommand.
#[derive(Debug, Args)]
pub struct DedupArgs {
    /// Packages root, e.g. vcpkg/packages
    #[arg(value_name = "PACKAGES_ROOT")]
    pub packages_root: PathBuf,

    /// Report what would be relinked without changing any file
    #[arg(short = 'n', long)]
    pub dry_run: bool,
}

/// Report format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum OutputFormat {
    /// Human-readable summary
    #[default]
    Text,
    /// JSON report for scripting
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Text => write!(f, "text"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}
