//! The two-panel melting figure.
//!
//! `MeltFigure` is an explicit accumulator: each processed file appends its
//! series, in input order, and the renderers only read from it.
//!
//! - top panel: raw signal ("CD mdeg") with the raw fit
//! - bottom panel: normalized signal ("Fraction folded") with the normalized fit

use crate::domain::{FileAnalysis, ModelParams};
use crate::models::uv_hairpin;

pub const RAW_Y_LABEL: &str = "CD mdeg";
pub const NORMALIZED_Y_LABEL: &str = "Fraction folded";
pub const X_LABEL: &str = "Temperature (°C)";

/// Samples used to draw each fitted curve.
pub const FIT_GRID_POINTS: usize = 101;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeriesKind {
    /// Observed data, drawn as markers.
    Points,
    /// Fitted model, drawn as a line.
    Line,
}

#[derive(Debug, Clone)]
pub struct Series {
    pub label: String,
    pub kind: SeriesKind,
    /// Input order of the file this series belongs to (drives styling).
    pub file_index: usize,
    pub points: Vec<(f64, f64)>,
}

#[derive(Debug, Clone)]
pub struct Panel {
    pub y_label: &'static str,
    /// Only the bottom panel carries the shared x label.
    pub x_label: Option<&'static str>,
    pub series: Vec<Series>,
}

impl Panel {
    fn new(y_label: &'static str, x_label: Option<&'static str>) -> Self {
        Self {
            y_label,
            x_label,
            series: Vec::new(),
        }
    }

    pub fn x_range(&self) -> Option<(f64, f64)> {
        range(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.0)))
    }

    pub fn y_range(&self) -> Option<(f64, f64)> {
        range(self.series.iter().flat_map(|s| s.points.iter().map(|p| p.1)))
    }
}

#[derive(Debug, Clone)]
pub struct MeltFigure {
    pub raw: Panel,
    pub normalized: Panel,
    files: usize,
}

impl Default for MeltFigure {
    fn default() -> Self {
        Self::new()
    }
}

impl MeltFigure {
    pub fn new() -> Self {
        Self {
            raw: Panel::new(RAW_Y_LABEL, None),
            normalized: Panel::new(NORMALIZED_Y_LABEL, Some(X_LABEL)),
            files: 0,
        }
    }

    /// Append one file's data and fitted curves to both panels.
    pub fn add_file(&mut self, analysis: &FileAnalysis) {
        let file_index = self.files;
        self.files += 1;

        let label = analysis.curve.label();
        let t = &analysis.curve.temperature;
        let (t_min, t_max) = analysis.curve.temperature_range().unwrap_or((0.0, 100.0));

        let raw_points = t.iter().copied().zip(analysis.curve.absorbance.iter().copied()).collect();
        let norm_points = t.iter().copied().zip(analysis.normalized.iter().copied()).collect();

        push_pair(
            &mut self.raw,
            &label,
            file_index,
            raw_points,
            sample_fit(&analysis.raw_fit.params, t_min, t_max, FIT_GRID_POINTS),
        );
        push_pair(
            &mut self.normalized,
            &label,
            file_index,
            norm_points,
            sample_fit(&analysis.normalized_fit.params, t_min, t_max, FIT_GRID_POINTS),
        );
    }

    pub fn file_count(&self) -> usize {
        self.files
    }

    pub fn is_empty(&self) -> bool {
        self.files == 0
    }

    /// Panels top to bottom.
    pub fn panels(&self) -> [&Panel; 2] {
        [&self.raw, &self.normalized]
    }

    /// Shared temperature axis across both panels.
    pub fn x_range(&self) -> Option<(f64, f64)> {
        match (self.raw.x_range(), self.normalized.x_range()) {
            (Some(a), Some(b)) => Some((a.0.min(b.0), a.1.max(b.1))),
            (a, b) => a.or(b),
        }
    }
}

fn push_pair(
    panel: &mut Panel,
    label: &str,
    file_index: usize,
    data: Vec<(f64, f64)>,
    fit: Vec<(f64, f64)>,
) {
    panel.series.push(Series {
        label: label.to_string(),
        kind: SeriesKind::Points,
        file_index,
        points: data,
    });
    panel.series.push(Series {
        label: format!("{label} fit"),
        kind: SeriesKind::Line,
        file_index,
        points: fit,
    });
}

/// Evaluate the model on an evenly spaced temperature grid.
pub fn sample_fit(params: &ModelParams, t_min: f64, t_max: f64, n: usize) -> Vec<(f64, f64)> {
    let n = n.max(2);
    let mut out = Vec::with_capacity(n);
    for i in 0..n {
        let u = i as f64 / (n as f64 - 1.0);
        let t = t_min + u * (t_max - t_min);
        out.push((t, uv_hairpin(t, params)));
    }
    out
}

fn range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min = f64::INFINITY;
    let mut max = f64::NEG_INFINITY;
    for v in values.filter(|v| v.is_finite()) {
        min = min.min(v);
        max = max.max(v);
    }
    if min.is_finite() && max.is_finite() {
        Some((min, max))
    } else {
        None
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::domain::{FitResult, FitTarget, MeltCurve, N_PARAMS, Thermodynamics};
    use crate::models::predict_all;
    use nalgebra::DMatrix;
    use std::path::PathBuf;

    fn fit_result(target: FitTarget, params: ModelParams) -> FitResult {
        FitResult {
            target,
            params,
            covariance: DMatrix::zeros(N_PARAMS, N_PARAMS),
            std_errors: [0.0; N_PARAMS],
            sse: 0.0,
            rmse: 0.0,
            iterations: 0,
            evaluations: 1,
        }
    }

    /// A synthetic, already-fitted file for figure and renderer tests.
    pub(crate) fn analysis(name: &str, tm: f64) -> FileAnalysis {
        let params = ModelParams {
            mds: -0.002,
            bds: 1.1,
            mss: 0.001,
            bss: 0.3,
            del_h: -45.0,
            tm,
        };
        let temperature: Vec<f64> = (0..15).map(|i| 10.0 + 5.0 * i as f64).collect();
        let absorbance = predict_all(&temperature, &params);
        let lo = absorbance.iter().copied().fold(f64::INFINITY, f64::min);
        let hi = absorbance.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let normalized = absorbance.iter().map(|v| (v - lo) / (hi - lo)).collect();
        let norm_params = ModelParams {
            mds: -0.002 / (hi - lo),
            bds: (1.1 - lo) / (hi - lo),
            mss: 0.001 / (hi - lo),
            bss: (0.3 - lo) / (hi - lo),
            ..params
        };

        FileAnalysis {
            curve: MeltCurve {
                path: PathBuf::from(name),
                temperature,
                absorbance,
            },
            normalized,
            raw_fit: fit_result(FitTarget::Raw, params),
            normalized_fit: fit_result(FitTarget::Normalized, norm_params),
            thermo: Thermodynamics::from_params(&params),
        }
    }

    #[test]
    fn each_file_adds_one_data_and_one_fit_series_per_panel() {
        let mut fig = MeltFigure::new();
        fig.add_file(&analysis("a.txt", 335.0));
        fig.add_file(&analysis("b.txt", 340.0));

        assert_eq!(fig.file_count(), 2);
        for panel in fig.panels() {
            let labels: Vec<&str> = panel.series.iter().map(|s| s.label.as_str()).collect();
            assert_eq!(labels, ["a.txt", "a.txt fit", "b.txt", "b.txt fit"]);
            assert_eq!(panel.series[0].kind, SeriesKind::Points);
            assert_eq!(panel.series[1].kind, SeriesKind::Line);
            assert_eq!(panel.series[3].file_index, 1);
            assert_eq!(panel.series[1].points.len(), FIT_GRID_POINTS);
        }
        assert_eq!(fig.raw.y_label, RAW_Y_LABEL);
        assert_eq!(fig.normalized.x_label, Some(X_LABEL));
        assert_eq!(fig.raw.x_label, None);
    }

    #[test]
    fn normalized_panel_spans_unit_interval() {
        let mut fig = MeltFigure::new();
        fig.add_file(&analysis("a.txt", 335.0));
        let points = &fig.normalized.series[0].points;
        let lo = points.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let hi = points.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        assert!(lo.abs() < 1e-12 && (hi - 1.0).abs() < 1e-12);
        assert_eq!(fig.x_range(), Some((10.0, 80.0)));
    }

    #[test]
    fn fit_grid_covers_temperature_span() {
        let grid = sample_fit(&ModelParams::default(), 10.0, 80.0, 5);
        let t: Vec<f64> = grid.iter().map(|p| p.0).collect();
        assert_eq!(t, vec![10.0, 27.5, 45.0, 62.5, 80.0]);
    }
}
