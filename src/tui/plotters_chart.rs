//! Plotters-powered melting panel widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`.
//! Plotters gives us axes, tick labels and a light mesh (used as minor ticks)
//! without hand-placing labels in terminal cells.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::plot::axis::{Ticks, minor_divisions};
use crate::plot::{Panel, SeriesKind};

/// High-contrast per-file palette (data and fit share a color).
const PALETTE: [(u8, u8, u8); 6] = [
    (0, 255, 255),
    (255, 215, 0),
    (255, 0, 255),
    (0, 255, 0),
    (255, 96, 96),
    (255, 255, 255),
];

pub fn file_rgb(file_index: usize) -> (u8, u8, u8) {
    PALETTE[file_index % PALETTE.len()]
}

/// Ratatui color for legend entries.
pub fn file_color(file_index: usize) -> Color {
    let (r, g, b) = file_rgb(file_index);
    Color::Rgb(r, g, b)
}

/// One figure panel, ready to draw.
///
/// Bounds and ticks are computed outside the render call.
pub struct MeltPlottersChart<'a> {
    pub panel: &'a Panel,
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_ticks: &'a Ticks,
    pub y_ticks: &'a Ticks,
}

impl Widget for MeltPlottersChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let x_decimals = self.x_ticks.decimals();
        let y_decimals = self.y_ticks.decimals();
        let x_minor = minor_divisions(self.x_ticks.step) - 1;
        let y_minor = minor_divisions(self.y_ticks.step) - 1;
        let x_labels = self.x_ticks.major.len().max(2);
        let y_labels = self.y_ticks.major.len().max(2);
        let panel = self.panel;

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, if panel.x_label.is_some() { 3 } else { 2 })
                .build_cartesian_2d(x0..x1, y0..y1)?;

            let fmt_x = |v: &f64| format!("{v:.x_decimals$}");
            let fmt_y = |v: &f64| format!("{v:.y_decimals$}");

            // Light mesh lines mark the minor ticks.
            let mut mesh = chart.configure_mesh();
            mesh.y_desc(panel.y_label)
                .x_labels(x_labels)
                .y_labels(y_labels)
                .x_max_light_lines(x_minor)
                .y_max_light_lines(y_minor)
                .x_label_formatter(&fmt_x)
                .y_label_formatter(&fmt_y)
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&RGBColor(110, 110, 110))
                .light_line_style(&RGBColor(55, 55, 55));
            if let Some(x_label) = panel.x_label {
                mesh.x_desc(x_label);
            }
            mesh.draw()?;

            // Fitted curves first so data points stay on top.
            for s in panel.series.iter().filter(|s| s.kind == SeriesKind::Line) {
                let (r, g, b) = file_rgb(s.file_index);
                chart.draw_series(LineSeries::new(s.points.iter().copied(), &RGBColor(r, g, b)))?;
            }

            // `Circle` radii are mis-scaled by the ratatui backend; a colored
            // `Pixel` renders as a clean dot.
            for s in panel.series.iter().filter(|s| s.kind == SeriesKind::Points) {
                let (r, g, b) = file_rgb(s.file_index);
                let color = RGBColor(r, g, b);
                chart.draw_series(s.points.iter().map(|&(x, y)| Pixel::new((x, y), color)))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
