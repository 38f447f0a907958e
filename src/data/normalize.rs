//! Min-max normalization of an absorbance series.
//!
//! Each file is scaled by its own extremes; there is no cross-file scaling.

use std::path::Path;

use crate::error::MeltError;

/// Scale `values` to `[0, 1]` via `(v - min) / (max - min)`.
///
/// A flat series (`max == min`) cannot be scaled and is reported as
/// [`MeltError::DegenerateRange`] rather than producing NaN.
pub fn normalize_min_max(path: &Path, values: &[f64]) -> Result<Vec<f64>, MeltError> {
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let span = max - min;

    if !(span.is_finite() && span > 0.0) {
        return Err(MeltError::DegenerateRange {
            path: path.to_path_buf(),
            value: if min.is_finite() { min } else { f64::NAN },
        });
    }

    Ok(values.iter().map(|&v| (v - min) / span).collect())
}
