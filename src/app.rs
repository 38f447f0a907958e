//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments and sets up logging
//! - analyzes every data file in command-line order
//! - prints the thermodynamic results
//! - shows the accumulated figure

use std::io::{self, IsTerminal, Write};

use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::Cli;
use crate::domain::{DisplayMode, MeltConfig, ModelParams, OnError};
use crate::error::{AppError, EXIT_DISPLAY, MeltError};
use crate::fit::FitOptions;
use crate::plot::{MeltFigure, render_figure};
use crate::report::{format_run_summary, format_thermodynamics};

pub mod pipeline;

/// Entry point for the `melt` binary.
pub fn run() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config = config_from_args(&cli);
    let outcome = analyze_all(&config, &mut io::stdout())?;

    info!(
        "{}",
        format_run_summary(
            outcome.figure.file_count(),
            &outcome
                .failures
                .iter()
                .map(failure_label)
                .collect::<Vec<_>>(),
        )
    );

    if !outcome.figure.is_empty() {
        let mode = resolve_display(config.display, io::stdout().is_terminal());
        show_figure(&outcome.figure, mode, &config)?;
    }

    match outcome.failures.into_iter().next() {
        Some(err) => Err(err.into()),
        None => Ok(()),
    }
}

fn init_logging(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();
}

pub fn config_from_args(cli: &Cli) -> MeltConfig {
    MeltConfig {
        data_files: cli.data_files.clone(),
        initial_guess: ModelParams {
            mds: cli.mds,
            bds: cli.bds,
            mss: cli.mss,
            bss: cli.bss,
            del_h: cli.del_h,
            tm: cli.tm,
        },
        on_error: cli.on_error,
        display: cli.display,
        plot_width: cli.width,
        plot_height: cli.height,
        max_evals: cli.max_evals,
    }
}

/// Figure of the successful files plus every per-file failure, in order.
#[derive(Debug)]
pub struct RunOutcome {
    pub figure: MeltFigure,
    pub failures: Vec<MeltError>,
}

/// Process files strictly in order, writing each file's result lines to `out`.
///
/// With [`OnError::Abort`] the loop stops at the first failure.
pub fn analyze_all<W: Write>(config: &MeltConfig, out: &mut W) -> Result<RunOutcome, AppError> {
    let opts = FitOptions {
        max_evals: config.max_evals,
    };
    let mut figure = MeltFigure::new();
    let mut failures = Vec::new();

    for path in &config.data_files {
        match pipeline::process_file(path, &config.initial_guess, &opts) {
            Ok(analysis) => {
                info!(file = %path.display(), "results");
                writeln!(out, "{}", format_thermodynamics(&analysis.thermo))
                    .map_err(|e| AppError::new(EXIT_DISPLAY, format!("Failed to write results: {e}")))?;
                figure.add_file(&analysis);
            }
            Err(err) => {
                error!(file = %path.display(), "{err}");
                failures.push(err);
                if config.on_error == OnError::Abort {
                    break;
                }
            }
        }
    }

    Ok(RunOutcome { figure, failures })
}

/// The interactive viewer needs a terminal; otherwise fall back to text.
pub fn resolve_display(requested: DisplayMode, stdout_is_terminal: bool) -> DisplayMode {
    match requested {
        DisplayMode::Tui if !stdout_is_terminal => {
            warn!("stdout is not a terminal; printing an ASCII figure instead of the viewer");
            DisplayMode::Ascii
        }
        mode => mode,
    }
}

fn show_figure(figure: &MeltFigure, mode: DisplayMode, config: &MeltConfig) -> Result<(), AppError> {
    match mode {
        DisplayMode::Tui => crate::tui::show(figure),
        DisplayMode::Ascii => {
            let plot = render_figure(figure, config.plot_width, config.plot_height);
            let mut stdout = io::stdout();
            writeln!(stdout, "{plot}")
                .map_err(|e| AppError::new(EXIT_DISPLAY, format!("Failed to write figure: {e}")))
        }
    }
}

fn failure_label(err: &MeltError) -> String {
    match err {
        MeltError::Io { path, .. }
        | MeltError::Parse { path, .. }
        | MeltError::Shape { path, .. }
        | MeltError::DegenerateRange { path, .. }
        | MeltError::Convergence { path, .. } => path.display().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{EXIT_DEGENERATE, EXIT_FIT, EXIT_INPUT};
    use crate::models::predict_all;
    use std::fmt::Write as _;
    use std::path::{Path, PathBuf};

    fn good_file(dir: &Path, name: &str) -> PathBuf {
        let t: Vec<f64> = (0..20).map(|i| 10.0 + 70.0 * i as f64 / 19.0).collect();
        let y = predict_all(&t, &ModelParams::default());
        let mut text = String::new();
        for (t, y) in t.iter().zip(&y) {
            writeln!(text, "{t}\t{y}").unwrap();
        }
        let path = dir.join(name);
        std::fs::write(&path, text).unwrap();
        path
    }

    fn flat_file(dir: &Path) -> PathBuf {
        let path = dir.join("flat.txt");
        std::fs::write(&path, "10 1.0\n20 1.0\n30 1.0\n40 1.0\n").unwrap();
        path
    }

    fn two_temperature_file(dir: &Path) -> PathBuf {
        let path = dir.join("two_temps.txt");
        let rows = "20 1.0\n".repeat(4) + &"60 0.5\n".repeat(4);
        std::fs::write(&path, rows).unwrap();
        path
    }

    fn config(files: Vec<PathBuf>, on_error: OnError) -> MeltConfig {
        let cli = Cli::try_parse_from(["melt", "a.txt"]).unwrap();
        MeltConfig {
            data_files: files,
            on_error,
            ..config_from_args(&cli)
        }
    }

    #[test]
    fn config_carries_guess_and_options() {
        let cli = Cli::try_parse_from([
            "melt", "--delH", "-50", "--Tm", "330", "--max-evals", "500", "--width", "80", "x.txt",
        ])
        .unwrap();
        let cfg = config_from_args(&cli);
        assert_eq!(cfg.initial_guess.del_h, -50.0);
        assert_eq!(cfg.initial_guess.tm, 330.0);
        assert_eq!(cfg.initial_guess.mds, 30.0);
        assert_eq!(cfg.max_evals, 500);
        assert_eq!(cfg.plot_width, 80);
        assert_eq!(cfg.data_files, vec![PathBuf::from("x.txt")]);
    }

    #[test]
    fn skip_mode_keeps_going_and_records_failures_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            good_file(dir.path(), "a.txt"),
            flat_file(dir.path()),
            dir.path().join("missing.txt"),
            good_file(dir.path(), "b.txt"),
        ];

        let mut out = Vec::new();
        let outcome = analyze_all(&config(files, OnError::Skip), &mut out).unwrap();

        assert_eq!(outcome.figure.file_count(), 2);
        let codes: Vec<u8> = outcome.failures.iter().map(|e| e.exit_code()).collect();
        assert_eq!(codes, [EXIT_DEGENERATE, EXIT_INPUT]);

        let stdout = String::from_utf8(out).unwrap();
        let labels: Vec<&str> = stdout.lines().map(|l| l.split(": ").next().unwrap_or("")).collect();
        assert_eq!(
            labels,
            ["delH", "Tm", "delS", "delG_25", "delG_37", "delH", "Tm", "delS", "delG_25", "delG_37"]
        );
        // File names never go to stdout.
        assert!(!stdout.contains("a.txt"));
    }

    #[test]
    fn skip_mode_continues_past_a_singular_fit() {
        let dir = tempfile::tempdir().unwrap();
        let singular = two_temperature_file(dir.path());
        let files = vec![
            good_file(dir.path(), "a.txt"),
            singular.clone(),
            good_file(dir.path(), "b.txt"),
        ];

        let mut out = Vec::new();
        let outcome = analyze_all(&config(files, OnError::Skip), &mut out).unwrap();

        assert_eq!(outcome.figure.file_count(), 2);
        let codes: Vec<u8> = outcome.failures.iter().map(|e| e.exit_code()).collect();
        assert_eq!(codes, [EXIT_FIT]);
        assert_eq!(failure_label(&outcome.failures[0]), singular.display().to_string());
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 10);
    }

    #[test]
    fn abort_mode_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let files = vec![
            good_file(dir.path(), "a.txt"),
            flat_file(dir.path()),
            good_file(dir.path(), "b.txt"),
        ];

        let mut out = Vec::new();
        let outcome = analyze_all(&config(files, OnError::Abort), &mut out).unwrap();
        assert_eq!(outcome.figure.file_count(), 1);
        assert_eq!(outcome.failures.len(), 1);
        assert_eq!(String::from_utf8(out).unwrap().lines().count(), 5);
    }

    #[test]
    fn legends_follow_command_line_order() {
        let dir = tempfile::tempdir().unwrap();
        let b = good_file(dir.path(), "b.txt");
        let a = good_file(dir.path(), "a.txt");
        let outcome = analyze_all(&config(vec![b.clone(), a.clone()], OnError::Skip), &mut Vec::new()).unwrap();

        let labels: Vec<String> = outcome.figure.raw.series.iter().map(|s| s.label.clone()).collect();
        let b = b.display().to_string();
        let a = a.display().to_string();
        assert_eq!(labels, [b.clone(), format!("{b} fit"), a.clone(), format!("{a} fit")]);
    }

    #[test]
    fn tui_falls_back_to_ascii_without_a_terminal() {
        assert_eq!(resolve_display(DisplayMode::Tui, false), DisplayMode::Ascii);
        assert_eq!(resolve_display(DisplayMode::Tui, true), DisplayMode::Tui);
        assert_eq!(resolve_display(DisplayMode::Ascii, true), DisplayMode::Ascii);
    }

    #[test]
    fn failure_labels_are_paths() {
        let err = MeltError::Shape {
            path: PathBuf::from("one_col.txt"),
            message: "x".to_string(),
        };
        assert_eq!(failure_label(&err), "one_col.txt");
    }
}
