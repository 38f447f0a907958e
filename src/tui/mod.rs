//! Ratatui-based figure viewer.
//!
//! Shows the accumulated two-panel figure (raw signal on top, fraction folded
//! below) with a legend beside each chart. The call blocks until the user
//! closes the viewer with `q` or `Esc`.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph},
};
use tracing::debug;

use crate::error::{AppError, EXIT_DISPLAY};
use crate::plot::axis::{Ticks, ticks};
use crate::plot::{MeltFigure, Panel, SeriesKind};

mod plotters_chart;

use plotters_chart::{MeltPlottersChart, file_color};

/// Width of the legend column beside each chart.
const LEGEND_WIDTH: u16 = 32;

/// Show `figure` until the user closes the viewer.
pub fn show(figure: &MeltFigure) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(EXIT_DISPLAY, format!("Failed to initialize terminal: {e}")))?;

    let viewer = Viewer::new(figure);
    viewer.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(EXIT_DISPLAY, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(EXIT_DISPLAY, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

/// Precomputed bounds and ticks for one panel.
struct PanelView<'a> {
    panel: &'a Panel,
    y_bounds: [f64; 2],
    y_ticks: Ticks,
}

struct Viewer<'a> {
    figure: &'a MeltFigure,
    x_bounds: [f64; 2],
    x_ticks: Ticks,
    panels: [PanelView<'a>; 2],
}

impl<'a> Viewer<'a> {
    fn new(figure: &'a MeltFigure) -> Self {
        let (t0, t1) = figure
            .x_range()
            .filter(|(a, b)| b > a)
            .unwrap_or((0.0, 100.0));
        let [raw, normalized] = figure.panels();
        Self {
            figure,
            x_bounds: [t0, t1],
            x_ticks: ticks(t0, t1, 6),
            panels: [panel_view(raw), panel_view(normalized)],
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(EXIT_DISPLAY, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(EXIT_DISPLAY, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(EXIT_DISPLAY, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if is_quit_key(key.code) {
                        debug!("viewer closed");
                        break;
                    }
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Fill(1), Constraint::Fill(1), Constraint::Length(3)])
            .split(frame.area());

        for (view, area) in self.panels.iter().zip(chunks.iter()) {
            self.draw_panel(frame, *area, view);
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_panel(&self, frame: &mut ratatui::Frame<'_>, area: Rect, view: &PanelView<'_>) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Min(0), Constraint::Length(LEGEND_WIDTH)])
            .split(area);

        let block = Block::default().title(view.panel.y_label).borders(Borders::ALL);
        let inner = block.inner(columns[0]);
        frame.render_widget(block, columns[0]);
        frame.render_widget(Clear, inner);

        if view.panel.series.is_empty() {
            let msg = Paragraph::new("No data.").style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
        } else {
            let widget = MeltPlottersChart {
                panel: view.panel,
                x_bounds: self.x_bounds,
                y_bounds: view.y_bounds,
                x_ticks: &self.x_ticks,
                y_ticks: &view.y_ticks,
            };
            frame.render_widget(widget, inner);
        }

        let legend = List::new(legend_items(view.panel))
            .block(Block::default().title("Legend").borders(Borders::ALL));
        frame.render_widget(legend, columns[1]);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let status = format!("{} file(s)", self.figure.file_count());
        let line = Line::from(vec![
            Span::styled("q/Esc close", Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn panel_view(panel: &Panel) -> PanelView<'_> {
    let (mut y0, mut y1) = panel
        .y_range()
        .filter(|(a, b)| b > a)
        .unwrap_or((0.0, 1.0));
    let pad = ((y1 - y0).abs() * 0.05).max(1e-12);
    y0 -= pad;
    y1 += pad;
    PanelView {
        panel,
        y_bounds: [y0, y1],
        y_ticks: ticks(y0, y1, 4),
    }
}

fn legend_items(panel: &Panel) -> Vec<ListItem<'static>> {
    panel
        .series
        .iter()
        .map(|s| {
            let key = match s.kind {
                SeriesKind::Points => " • ",
                SeriesKind::Line => "───",
            };
            ListItem::new(Line::from(vec![
                Span::styled(key, Style::default().fg(file_color(s.file_index))),
                Span::raw(" "),
                Span::raw(s.label.clone()),
            ]))
        })
        .collect()
}

fn is_quit_key(code: KeyCode) -> bool {
    matches!(code, KeyCode::Char('q') | KeyCode::Esc)
}
