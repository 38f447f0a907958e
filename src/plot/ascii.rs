//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Each panel is drawn as:
//! - a y-axis gutter: major tick labels with `+`, minor ticks as `-`
//! - the grid: fitted curves first (line characters), then data markers over them
//! - an x axis: `+` at major ticks, `'` at minor ticks, labels underneath
//! - a legend with one data and one fit entry per file
//!
//! Styles cycle per file: markers `o x * # @ %`, lines `- ~ = : . ^`.

use crate::plot::axis::{Ticks, ticks};
use crate::plot::figure::{MeltFigure, Panel, SeriesKind};

const POINT_MARKERS: [char; 6] = ['o', 'x', '*', '#', '@', '%'];
const LINE_CHARS: [char; 6] = ['-', '~', '=', ':', '.', '^'];

/// Width of the y tick-label column.
const LABEL_WIDTH: usize = 9;

pub fn point_marker(file_index: usize) -> char {
    POINT_MARKERS[file_index % POINT_MARKERS.len()]
}

pub fn line_char(file_index: usize) -> char {
    LINE_CHARS[file_index % LINE_CHARS.len()]
}

/// Render both panels stacked, sharing the temperature axis.
pub fn render_figure(figure: &MeltFigure, width: usize, height: usize) -> String {
    let width = width.max(20);
    let height = height.max(5);

    let (t_min, t_max) = figure
        .x_range()
        .filter(|(a, b)| b > a)
        .unwrap_or((0.0, 100.0));
    let x_ticks = ticks(t_min, t_max, (width / 12).max(2));

    let mut out = String::new();
    for (i, panel) in figure.panels().into_iter().enumerate() {
        if i > 0 {
            out.push('\n');
        }
        out.push_str(&render_panel(panel, t_min, t_max, &x_ticks, width, height));
    }
    out
}

fn render_panel(panel: &Panel, t_min: f64, t_max: f64, x_ticks: &Ticks, width: usize, height: usize) -> String {
    let (y_min, y_max) = panel
        .y_range()
        .filter(|(a, b)| b > a)
        .unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);
    let y_ticks = ticks(y_min, y_max, (height / 4).max(2));

    let mut grid = vec![vec![' '; width]; height];

    // Draw curves first (so points can overlay).
    for s in panel.series.iter().filter(|s| s.kind == SeriesKind::Line) {
        draw_curve(&mut grid, &s.points, line_char(s.file_index), t_min, t_max, y_min, y_max);
    }
    for s in panel.series.iter().filter(|s| s.kind == SeriesKind::Points) {
        let marker = point_marker(s.file_index);
        for &(t, y) in &s.points {
            if !(t.is_finite() && y.is_finite()) {
                continue;
            }
            let x = map_x(t, t_min, t_max, width);
            let row = map_y(y, y_min, y_max, height);
            grid[row][x] = marker;
        }
    }

    // Gutter marks per row: major ticks win over minor ones.
    let mut gutter: Vec<(String, char)> = vec![(String::new(), '|'); height];
    for &v in &y_ticks.minor {
        let row = map_y(v, y_min, y_max, height);
        gutter[row].1 = '-';
    }
    for &v in &y_ticks.major {
        let row = map_y(v, y_min, y_max, height);
        gutter[row] = (y_ticks.format(v), '+');
    }

    let mut out = String::new();
    out.push_str(&format!("{} | y=[{y_min:.3}, {y_max:.3}]\n", panel.y_label));

    for (row, (label, mark)) in grid.into_iter().zip(gutter) {
        let line: String = row.into_iter().collect();
        out.push_str(format!("{label:>LABEL_WIDTH$} {mark}{line}").trim_end());
        out.push('\n');
    }

    out.push_str(&x_axis_lines(x_ticks, t_min, t_max, width));

    if let Some(x_label) = panel.x_label {
        let pad = LABEL_WIDTH + 2 + width.saturating_sub(x_label.chars().count()) / 2;
        out.push_str(&format!("{:pad$}{x_label}\n", ""));
    }

    for s in &panel.series {
        let key = match s.kind {
            SeriesKind::Points => format!(" {} ", point_marker(s.file_index)),
            SeriesKind::Line => line_char(s.file_index).to_string().repeat(3),
        };
        out.push_str(&format!("  {key} {}\n", s.label));
    }

    out
}

/// Axis line with tick marks plus a row of major tick labels.
fn x_axis_lines(x_ticks: &Ticks, t_min: f64, t_max: f64, width: usize) -> String {
    let mut axis = vec!['-'; width];
    for &v in &x_ticks.minor {
        axis[map_x(v, t_min, t_max, width)] = '\'';
    }

    let mut labels = vec![' '; width + LABEL_WIDTH];
    let mut next_free = 0usize;
    for &v in &x_ticks.major {
        let col = map_x(v, t_min, t_max, width);
        axis[col] = '+';

        let text = x_ticks.format(v);
        let len = text.chars().count();
        let start = col.saturating_sub(len / 2);
        if start < next_free || start + len > labels.len() {
            continue;
        }
        for (i, ch) in text.chars().enumerate() {
            labels[start + i] = ch;
        }
        next_free = start + len + 1;
    }

    let axis: String = axis.into_iter().collect();
    let labels: String = labels.into_iter().collect();
    let indent = " ".repeat(LABEL_WIDTH + 1);
    format!(
        "{indent}+{axis}\n{}\n",
        format!("{indent} {labels}").trim_end()
    )
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(
    grid: &mut [Vec<char>],
    curve: &[(f64, f64)],
    ch: char,
    t_min: f64,
    t_max: f64,
    y_min: f64,
    y_max: f64,
) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        if !(t.is_finite() && y.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, ch);
        } else if grid[yy][x] == ' ' {
            grid[yy][x] = ch;
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}
