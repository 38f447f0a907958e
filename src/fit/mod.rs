//! Curve fitting orchestration.
//!
//! Responsibilities:
//!
//! - adapt a melting curve to the generic least-squares interface
//! - run Levenberg–Marquardt from the shared initial guess
//! - turn the solver output into a `FitResult` (params, covariance, diagnostics)

pub mod fitter;

pub use fitter::*;
