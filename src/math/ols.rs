//! Linear least squares solver.
//!
//! The Levenberg–Marquardt loop solves one small damped linear problem per
//! trial step:
//!
//! ```text
//! minimize ||J δ + r||² + μ ||D δ||²
//! ```
//!
//! which we write as a single stacked least-squares system `[J; √μ D] δ = [-r; 0]`
//! and hand to this solver.
//!
//! Implementation choices:
//! - SVD so tall (more rows than columns) and nearly collinear systems both work.
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Singular values are cut off *relative* to the largest one. Model columns
//!   live on very different scales (baseline slopes vs. `Tm`), so an absolute
//!   cutoff would either drop real directions or keep noise.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    if x.nrows() != y.len() || x.ncols() == 0 {
        return None;
    }
    if x.iter().chain(y.iter()).any(|v| !v.is_finite()) {
        return None;
    }

    let svd = x.clone().svd(true, true);
    let s_max = svd.singular_values.max();
    if !(s_max.is_finite() && s_max > 0.0) {
        return None;
    }

    // Try progressively looser tolerances if strict solve fails.
    for &rel in &[1e-14, 1e-12, 1e-10] {
        if let Ok(beta) = svd.solve(y, rel * s_max) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
