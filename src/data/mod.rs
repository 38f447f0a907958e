//! Derived data series.

pub mod normalize;

pub use normalize::*;
