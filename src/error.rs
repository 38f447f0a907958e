//! Error types.
//!
//! Two layers:
//!
//! - [`MeltError`]: what went wrong while processing one input file. The
//!   pipeline returns these so the caller can decide to skip or abort.
//! - [`AppError`]: what the binary reports, carrying a process exit code.

use std::path::PathBuf;

use thiserror::Error;

use crate::domain::{FitTarget, ModelParams};

/// Exit code for unreadable or malformed input.
pub const EXIT_INPUT: u8 = 2;
/// Exit code for data that cannot be normalized (flat absorbance).
pub const EXIT_DEGENERATE: u8 = 3;
/// Exit code for a fit that failed or ended at a singular solution.
pub const EXIT_FIT: u8 = 4;
/// Exit code for terminal/display failures.
pub const EXIT_DISPLAY: u8 = 5;

/// Per-file processing failure.
#[derive(Debug, Error)]
pub enum MeltError {
    #[error("Failed to read '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed data in '{}' line {line}: {message}", path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },

    #[error("Unusable data in '{}': {message}", path.display())]
    Shape { path: PathBuf, message: String },

    #[error(
        "Degenerate absorbance range in '{}': every value equals {value}, cannot normalize",
        path.display()
    )]
    DegenerateRange { path: PathBuf, value: f64 },

    #[error(
        "Fit failed for '{}' ({target} series) from initial guess [{guess}]: {reason}",
        path.display()
    )]
    Convergence {
        path: PathBuf,
        target: FitTarget,
        guess: ModelParams,
        reason: String,
    },
}

impl MeltError {
    pub fn exit_code(&self) -> u8 {
        match self {
            MeltError::Io { .. } | MeltError::Parse { .. } | MeltError::Shape { .. } => EXIT_INPUT,
            MeltError::DegenerateRange { .. } => EXIT_DEGENERATE,
            MeltError::Convergence { .. } => EXIT_FIT,
        }
    }
}

/// Failure of the whole run, carrying the process exit code.
#[derive(Clone, Debug, Error)]
#[error("{message}")]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<MeltError> for AppError {
    fn from(err: MeltError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
    }
}
