//! Melting-curve ingest and validation.
//!
//! This module turns a plain whitespace-delimited numeric table into a clean
//! `MeltCurve` that is safe to fit.
//!
//! Format:
//! - one observation per line: `temperature absorbance [extra columns...]`
//! - fields separated by any run of whitespace; no header line
//! - blank lines and anything after `#` are ignored
//! - every row must have the same number of columns, at least two
//!
//! Validation is strict: the first bad line fails the whole file (with its
//! line number). Skipping rows would silently change the fitted curve.

use std::fs;
use std::path::Path;

use crate::domain::MeltCurve;
use crate::error::MeltError;

/// Load a melting curve from `path`.
pub fn load_melt_curve(path: &Path) -> Result<MeltCurve, MeltError> {
    let text = fs::read_to_string(path).map_err(|source| MeltError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    parse_melt_curve(path, &text)
}

/// Parse file contents already in memory. `path` is only used for messages.
pub fn parse_melt_curve(path: &Path, text: &str) -> Result<MeltCurve, MeltError> {
    let mut temperature = Vec::new();
    let mut absorbance = Vec::new();
    let mut n_cols: Option<usize> = None;

    for (idx, raw_line) in text.lines().enumerate() {
        let line_no = idx + 1;
        let content = raw_line.split('#').next().unwrap_or("").trim();
        if content.is_empty() {
            continue;
        }

        let fields = content
            .split_whitespace()
            .map(|tok| parse_field(tok).ok_or_else(|| parse_error(path, line_no, tok)))
            .collect::<Result<Vec<f64>, MeltError>>()?;

        match n_cols {
            None => {
                if fields.len() < 2 {
                    return Err(MeltError::Shape {
                        path: path.to_path_buf(),
                        message: format!(
                            "line {line_no} has {} column(s); need temperature and absorbance",
                            fields.len()
                        ),
                    });
                }
                n_cols = Some(fields.len());
            }
            Some(expected) if expected != fields.len() => {
                return Err(MeltError::Parse {
                    path: path.to_path_buf(),
                    line: line_no,
                    message: format!("expected {expected} columns, found {}", fields.len()),
                });
            }
            Some(_) => {}
        }

        temperature.push(fields[0]);
        absorbance.push(fields[1]);
    }

    if temperature.len() < 2 {
        return Err(MeltError::Shape {
            path: path.to_path_buf(),
            message: format!("{} data row(s); need at least 2", temperature.len()),
        });
    }

    if count_distinct(&temperature) < 2 {
        return Err(MeltError::Shape {
            path: path.to_path_buf(),
            message: "all rows share one temperature; need at least 2 distinct temperatures".to_string(),
        });
    }

    Ok(MeltCurve {
        path: path.to_path_buf(),
        temperature,
        absorbance,
    })
}

fn parse_field(tok: &str) -> Option<f64> {
    let v = tok.parse::<f64>().ok()?;
    if v.is_finite() { Some(v) } else { None }
}

fn parse_error(path: &Path, line: usize, tok: &str) -> MeltError {
    MeltError::Parse {
        path: path.to_path_buf(),
        line,
        message: format!("'{tok}' is not a finite number"),
    }
}

fn count_distinct(values: &[f64]) -> usize {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    sorted.dedup();
    sorted.len()
}
