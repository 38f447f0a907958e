//! Shared domain types.
//!
//! These types are intentionally kept lightweight: every entity lives for a
//! single run and nothing is persisted.

use std::fmt;
use std::path::PathBuf;

use clap::ValueEnum;
use nalgebra::DMatrix;

/// Reference temperature (K) for `delG_25`.
pub const T_25C: f64 = 298.15;
/// Reference temperature (K) for `delG_37`.
pub const T_37C: f64 = 310.15;

/// Number of model parameters.
pub const N_PARAMS: usize = 6;

/// Parameters of the two-state hairpin model.
///
/// The same type is used for the user-supplied initial guess (shared by all
/// files) and for the per-file fitted output.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelParams {
    /// Slope of the folded (duplex) baseline.
    pub mds: f64,
    /// Intercept of the folded (duplex) baseline.
    pub bds: f64,
    /// Slope of the unfolded (single-strand) baseline.
    pub mss: f64,
    /// Intercept of the unfolded (single-strand) baseline.
    pub bss: f64,
    /// Enthalpy of unfolding (kcal/mol).
    pub del_h: f64,
    /// Melting temperature (K, on the `t + 273.16` scale).
    pub tm: f64,
}

impl Default for ModelParams {
    fn default() -> Self {
        Self {
            mds: 30.0,
            bds: 0.85,
            mss: 0.0006,
            bss: 0.95,
            del_h: -40.0,
            tm: 340.0,
        }
    }
}

impl ModelParams {
    /// Parameters in fitting order: `[mds, bds, mss, bss, delH, Tm]`.
    pub fn to_array(self) -> [f64; N_PARAMS] {
        [self.mds, self.bds, self.mss, self.bss, self.del_h, self.tm]
    }

    pub fn from_array(p: [f64; N_PARAMS]) -> Self {
        Self {
            mds: p[0],
            bds: p[1],
            mss: p[2],
            bss: p[3],
            del_h: p[4],
            tm: p[5],
        }
    }

    pub fn is_finite(&self) -> bool {
        self.to_array().iter().all(|v| v.is_finite())
    }
}

impl fmt::Display for ModelParams {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "mds={}, bds={}, mss={}, bss={}, delH={}, Tm={}",
            self.mds, self.bds, self.mss, self.bss, self.del_h, self.tm
        )
    }
}

/// Which absorbance series a fit was run against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FitTarget {
    /// Instrument units as read from the file.
    Raw,
    /// Min-max scaled to `[0, 1]`.
    Normalized,
}

impl fmt::Display for FitTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FitTarget::Raw => write!(f, "raw"),
            FitTarget::Normalized => write!(f, "normalized"),
        }
    }
}

/// A melting curve loaded from one input file.
///
/// Points keep file order; they need not be sorted.
#[derive(Debug, Clone)]
pub struct MeltCurve {
    pub path: PathBuf,
    /// Temperature (°C).
    pub temperature: Vec<f64>,
    /// Absorbance / CD signal in instrument units.
    pub absorbance: Vec<f64>,
}

impl MeltCurve {
    /// Label used in the console log and figure legends.
    pub fn label(&self) -> String {
        self.path.display().to_string()
    }

    /// Temperature span `(min, max)`.
    pub fn temperature_range(&self) -> Option<(f64, f64)> {
        let min = self.temperature.iter().copied().fold(f64::INFINITY, f64::min);
        let max = self.temperature.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        if min.is_finite() && max.is_finite() {
            Some((min, max))
        } else {
            None
        }
    }
}

/// Output of one nonlinear least-squares fit.
#[derive(Debug, Clone)]
pub struct FitResult {
    pub target: FitTarget,
    pub params: ModelParams,
    /// `6 x 6` parameter covariance. Filled with `+inf` for an exactly
    /// determined fit (six points).
    pub covariance: DMatrix<f64>,
    /// `sqrt(diag(covariance))`.
    pub std_errors: [f64; N_PARAMS],
    pub sse: f64,
    pub rmse: f64,
    pub iterations: usize,
    pub evaluations: usize,
}

/// Thermodynamic quantities derived from a raw fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thermodynamics {
    pub del_h: f64,
    pub tm: f64,
    /// `delH / Tm`.
    pub del_s: f64,
    /// `delH - 298.15 * delS`.
    pub del_g_25: f64,
    /// `delH - 310.15 * delS`.
    pub del_g_37: f64,
}

impl Thermodynamics {
    pub fn from_params(params: &ModelParams) -> Self {
        let del_s = params.del_h / params.tm;
        Self {
            del_h: params.del_h,
            tm: params.tm,
            del_s,
            del_g_25: params.del_h - T_25C * del_s,
            del_g_37: params.del_h - T_37C * del_s,
        }
    }
}

/// Everything computed for one input file.
#[derive(Debug, Clone)]
pub struct FileAnalysis {
    pub curve: MeltCurve,
    /// Min-max scaled absorbance, same order as `curve`.
    pub normalized: Vec<f64>,
    pub raw_fit: FitResult,
    pub normalized_fit: FitResult,
    /// Derived from `raw_fit` only.
    pub thermo: Thermodynamics,
}

/// What to do when one file fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OnError {
    /// Report the failure and continue with the remaining files.
    Skip,
    /// Stop at the first failed file.
    Abort,
}

/// How the accumulated figure is shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum DisplayMode {
    /// Interactive terminal window; blocks until closed.
    Tui,
    /// Print the panels to stdout.
    Ascii,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus defaults).
#[derive(Debug, Clone)]
pub struct MeltConfig {
    pub data_files: Vec<PathBuf>,
    pub initial_guess: ModelParams,
    pub on_error: OnError,
    pub display: DisplayMode,
    pub plot_width: usize,
    pub plot_height: usize,
    /// Fit evaluation budget; `0` picks `200 * (N_PARAMS + 1)`.
    pub max_evals: usize,
}
