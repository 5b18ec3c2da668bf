//! vcpkg-cache: binary cache builder and shared-library deduplicator for
//! vcpkg package trees.
//!
//! Two independent pipelines share one streaming SHA-256 hasher:
//!
//! - [`cache`]: archive every package into `{cache}/{hash[0:2]}/{hash}.zip`
//!   keyed by the hash of its `vcpkg_abi_info.txt`, the layout vcpkg's
//!   "files" binary source reads.
//! - [`duplicates`]: replace byte-identical `libfoo.so*` copies in `lib/`
//!   and `debug/lib/` with relative symlinks to the longest-named file.
//!
//! [`run_app`] wires both to the command line.

pub mod actions;
pub mod cache;
pub mod cli;
pub mod config;
pub mod duplicates;
pub mod error;
pub mod logging;
pub mod output;
pub mod progress;
pub mod scanner;
pub mod signal;

use std::io::{self, Write};
use std::sync::Arc;

use anyhow::{Context, Result};

use crate::cache::CacheStore;
use crate::cli::{BuildArgs, Cli, Commands, DedupArgs, OutputFormat};
use crate::config::Config;
use crate::duplicates::Deduplicator;
use crate::error::ExitCode;
use crate::output::JsonOutput;
use crate::progress::Progress;

/// Run the command described by `cli`.
///
/// Logging must already be initialized. Reports go to stdout.
///
/// # Errors
///
/// Fatal errors only: invalid configuration, a missing or unusable packages
/// root, or an uncreatable cache root. Per-package and per-file failures
/// are reported and turned into [`ExitCode::PartialSuccess`].
pub fn run_app(cli: Cli) -> Result<ExitCode> {
    let config = Config::load(cli.config.as_deref())?;

    match cli.command {
        Commands::Build(ref args) => handle_build(&cli, args, config),
        Commands::Dedup(ref args) => handle_dedup(&cli, args),
        Commands::Config => {
            print!("{}", config.to_toml()?);
            Ok(ExitCode::Success)
        }
    }
}

fn handle_build(cli: &Cli, args: &BuildArgs, config: Config) -> Result<ExitCode> {
    let packages_dir = args.packages_dir.clone().unwrap_or(config.packages_dir);
    let cache_dir = args.cache_dir.clone().unwrap_or(config.cache_dir);
    let mut triplets = config.known_triplets;
    triplets.extend(args.triplets.iter().cloned());

    let handler = signal::install_handler()?;
    let progress = Arc::new(Progress::new(cli.quiet || cli.output == OutputFormat::Json));

    if args.dry_run {
        log::info!("Dry run: nothing will be written to {}", cache_dir.display());
    }

    let summary = CacheStore::new(&cache_dir)
        .with_dry_run(args.dry_run)
        .with_known_triplets(triplets)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress)
        .build_from_packages(&packages_dir)
        .context("Cache build failed")?;

    let exit_code = ExitCode::from_run(summary.interrupted, summary.error_count());

    let mut stdout = io::stdout().lock();
    match cli.output {
        OutputFormat::Text => output::write_build_summary(&mut stdout, &summary)?,
        OutputFormat::Json => JsonOutput::build(&summary, exit_code).write_to(&mut stdout)?,
    }
    stdout.flush()?;

    Ok(exit_code)
}

fn handle_dedup(cli: &Cli, args: &DedupArgs) -> Result<ExitCode> {
    let handler = signal::install_handler()?;
    let progress = Arc::new(Progress::new(
        cli.quiet || cli.verbose > 0 || cli.output == OutputFormat::Json,
    ));

    let summary = Deduplicator::new(args.dry_run)
        .with_shutdown_flag(handler.get_flag())
        .with_progress_callback(progress)
        .run(&args.packages_root)
        .context("Deduplication failed")?;

    if summary.packages == 0 {
        log::warn!(
            "No package directories found in '{}'.",
            args.packages_root.display()
        );
    }

    let exit_code = ExitCode::from_run(summary.interrupted, summary.failures);

    let mut stdout = io::stdout().lock();
    match cli.output {
        OutputFormat::Text => output::write_dedup_summary(&mut stdout, &summary)?,
        OutputFormat::Json => JsonOutput::dedup(&summary, exit_code).write_to(&mut stdout)?,
    }
    stdout.flush()?;

    Ok(exit_code)
}
