//! Exit codes and structured error output.

use serde::Serialize;

/// Process exit codes.
///
/// - 0: every package or library directory was handled
/// - 1: fatal error before or outside the per-item loop
/// - 3: the run completed but some items failed
/// - 130: interrupted by Ctrl+C
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ExitCode {
    Success = 0,
    GeneralError = 1,
    PartialSuccess = 3,
    Interrupted = 130,
}

impl ExitCode {
    /// Get the numeric exit code.
    #[must_use]
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    /// Get the machine-readable code prefix.
    #[must_use]
    pub fn code_prefix(self) -> &'static str {
        match self {
            Self::Success => "VC000",
            Self::GeneralError => "VC001",
            Self::PartialSuccess => "VC003",
            Self::Interrupted => "VC130",
        }
    }

    /// Exit code for a finished run.
    #[must_use]
    pub fn from_run(interrupted: bool, failures: usize) -> Self {
        if interrupted {
            Self::Interrupted
        } else if failures > 0 {
            Self::PartialSuccess
        } else {
            Self::Success
        }
    }
}

/// Fatal error rendered for `--output json`.
#[derive(Debug, Serialize)]
pub struct StructuredError {
    /// The error code (e.g., "VC001")
    pub code: String,
    /// The exit code number
    pub exit_code: i32,
    /// Human-readable error message, including its causes
    pub message: String,
}

impl StructuredError {
    /// Create a structured error from an anyhow error and an exit code.
    #[must_use]
    pub fn new(err: &anyhow::Error, exit_code: ExitCode) -> Self {
        Self {
            code: exit_code.code_prefix().to_string(),
            exit_code: exit_code.as_i32(),
            message: format!("{err:#}"),
        }
    }
}
