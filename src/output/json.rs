//! JSON run reports for scripting.
//!
//! # Output Schema
//!
//! ```json
//! {
//!   "command": "build",
//!   "exit_code": 0,
//!   "exit_code_name": "VC000",
//!   "binary_sources": "clear;files,/srv/vcpkg-cache,readwrite",
//!   "report": { "cache_root": "...", "packages": [ ... ], "created": 1, ... }
//! }
//! ```
//!
//! `binary_sources` is only present for build reports of a real run that
//! created at least one entry.

use std::io::Write;

use serde::Serialize;

use crate::cache::BuildSummary;
use crate::duplicates::DedupSummary;
use crate::error::ExitCode;

/// Summary carried by a JSON report.
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(untagged)]
pub enum JsonReport<'a> {
    Build(&'a BuildSummary),
    Dedup(&'a DedupSummary),
}

/// Top-level JSON document.
#[derive(Debug, Clone, Serialize)]
pub struct JsonOutput<'a> {
    /// Subcommand that produced the report
    pub command: &'static str,
    /// The exit code number
    pub exit_code: i32,
    /// The machine-readable exit code name (e.g., "VC000")
    pub exit_code_name: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub binary_sources: Option<String>,
    pub report: JsonReport<'a>,
}

impl<'a> JsonOutput<'a> {
    /// Report for a cache build.
    #[must_use]
    pub fn build(summary: &'a BuildSummary, exit_code: ExitCode) -> Self {
        Self {
            command: "build",
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            binary_sources: (!summary.dry_run && summary.created > 0)
                .then(|| summary.binary_sources()),
            report: JsonReport::Build(summary),
        }
    }

    /// Report for a dedup run.
    #[must_use]
    pub fn dedup(summary: &'a DedupSummary, exit_code: ExitCode) -> Self {
        Self {
            command: "dedup",
            exit_code: exit_code.as_i32(),
            exit_code_name: exit_code.code_prefix(),
            binary_sources: None,
            report: JsonReport::Dedup(summary),
        }
    }

    /// Serialize to a pretty-printed JSON string.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json_pretty(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Write the pretty-printed report followed by a newline.
    ///
    /// # Errors
    ///
    /// Returns [`JsonOutputError`] on serialization or write failure.
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), JsonOutputError> {
        let json = self.to_json_pretty()?;
        writer.write_all(json.as_bytes())?;
        writer.write_all(b"\n")?;
        Ok(())
    }
}

/// Error type for JSON output.
#[derive(thiserror::Error, Debug)]
pub enum JsonOutputError {
    #[error("JSON serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("I/O error while writing JSON: {0}")]
    Io(#[from] std::io::Error),
}
