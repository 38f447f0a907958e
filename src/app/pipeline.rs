//! Per-file melting analysis.
//!
//! One file goes through: load -> normalize -> raw fit -> normalized fit ->
//! thermodynamics. The step is all-or-nothing: nothing is returned (and so
//! nothing is printed or plotted) unless both fits succeed.
//!
//! The CLI loop and the tests both call into this module; presentation lives
//! in `report` and `plot`.

use std::path::Path;

use tracing::{debug, info};

use crate::data::normalize_min_max;
use crate::domain::{FileAnalysis, FitTarget, MeltCurve, ModelParams, Thermodynamics};
use crate::error::MeltError;
use crate::fit::{FitOptions, fit_model};
use crate::io::load_melt_curve;
use crate::report::format_fit_diagnostics;

/// Load and analyze one data file.
pub fn process_file(path: &Path, guess: &ModelParams, opts: &FitOptions) -> Result<FileAnalysis, MeltError> {
    let curve = load_melt_curve(path)?;
    info!(file = %path.display(), points = curve.temperature.len(), "fitting melting curve");
    analyze_curve(curve, guess, opts)
}

/// Analyze a curve already in memory.
///
/// Both fits start from the same `guess`.
pub fn analyze_curve(curve: MeltCurve, guess: &ModelParams, opts: &FitOptions) -> Result<FileAnalysis, MeltError> {
    // Normalize before fitting so a flat series is reported as degenerate
    // data, not as a fit failure.
    let normalized = normalize_min_max(&curve.path, &curve.absorbance)?;

    let fit = |signal: &[f64], target: FitTarget| {
        fit_model(&curve.temperature, signal, target, guess, opts).map_err(|err| MeltError::Convergence {
            path: curve.path.clone(),
            target,
            guess: *guess,
            reason: err.to_string(),
        })
    };

    let raw_fit = fit(&curve.absorbance, FitTarget::Raw)?;
    debug!(file = %curve.path.display(), "{}", format_fit_diagnostics(&raw_fit));
    let normalized_fit = fit(&normalized, FitTarget::Normalized)?;
    debug!(file = %curve.path.display(), "{}", format_fit_diagnostics(&normalized_fit));

    let thermo = Thermodynamics::from_params(&raw_fit.params);

    Ok(FileAnalysis {
        curve,
        normalized,
        raw_fit,
        normalized_fit,
        thermo,
    })
}
