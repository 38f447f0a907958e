//! Command-line parsing for the melting-curve fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! modeling/math code. Flags are turned into a `MeltConfig` by
//! `app::config_from_args`.

use std::path::PathBuf;

use clap::Parser;

use crate::domain::{DisplayMode, OnError};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "melt",
    version,
    about = "Fit two-state melting curves to CD/UV data and plot the fits"
)]
pub struct Cli {
    /// Whitespace-delimited data files (temperature in °C, absorbance).
    #[arg(required = true, num_args = 1.., value_name = "FILE")]
    pub data_files: Vec<PathBuf>,

    /// Initial guess: folded baseline slope.
    #[arg(long, default_value_t = 30.0, allow_negative_numbers = true)]
    pub mds: f64,

    /// Initial guess: folded baseline intercept.
    #[arg(long, default_value_t = 0.85, allow_negative_numbers = true)]
    pub bds: f64,

    /// Initial guess: unfolded baseline slope.
    #[arg(long, default_value_t = 0.0006, allow_negative_numbers = true)]
    pub mss: f64,

    /// Initial guess: unfolded baseline intercept.
    #[arg(long, default_value_t = 0.95, allow_negative_numbers = true)]
    pub bss: f64,

    /// Initial guess: enthalpy of unfolding (kcal/mol).
    #[arg(long = "delH", default_value_t = -40.0, allow_negative_numbers = true)]
    pub del_h: f64,

    /// Initial guess: melting temperature (K).
    #[arg(long = "Tm", default_value_t = 340.0, allow_negative_numbers = true)]
    pub tm: f64,

    /// What to do when a file cannot be loaded or fitted.
    #[arg(long, value_enum, default_value_t = OnError::Skip)]
    pub on_error: OnError,

    /// How to show the figure.
    #[arg(long, value_enum, default_value_t = DisplayMode::Tui)]
    pub display: DisplayMode,

    /// ASCII plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// ASCII plot height per panel (rows).
    #[arg(long, default_value_t = 20)]
    pub height: usize,

    /// Fit evaluation budget (0 = automatic).
    #[arg(long, default_value_t = 0)]
    pub max_evals: usize,

    /// Debug-level logging (RUST_LOG overrides).
    #[arg(short, long)]
    pub verbose: bool,
}
