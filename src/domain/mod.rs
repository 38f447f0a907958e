//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the six-parameter two-state model (`ModelParams`)
//! - loaded melting curves (`MeltCurve`)
//! - fit outputs (`FitResult`, `Thermodynamics`)
//! - run configuration (`MeltConfig`, `OnError`, `DisplayMode`)

pub mod types;

pub use types::*;
