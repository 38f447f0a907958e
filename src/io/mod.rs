//! Input helpers.
//!
//! - whitespace table ingest + validation (`ingest`)

pub mod ingest;

pub use ingest::*;
