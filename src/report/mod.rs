//! Reporting: the per-file result lines and log-facing summaries.

pub mod format;

pub use format::*;
