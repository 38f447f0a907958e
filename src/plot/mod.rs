//! Figure assembly and terminal rendering.
//!
//! - `figure`: the append-only two-panel accumulator
//! - `axis`: major/minor tick placement shared by both renderers
//! - `ascii`: deterministic text rendering

pub mod ascii;
pub mod axis;
pub mod figure;

pub use ascii::render_figure;
pub use figure::{MeltFigure, Panel, Series, SeriesKind};
