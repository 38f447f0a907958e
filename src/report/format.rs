//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting code stays clean and testable
//! - output changes are localized (the result lines are a stable contract)

use crate::domain::{FitResult, Thermodynamics};

const PARAM_NAMES: [&str; 6] = ["mds", "bds", "mss", "bss", "delH", "Tm"];

/// The five per-file result lines, in fixed order.
///
/// Values use Rust's shortest round-trip formatting, so nothing is lost in
/// the console output.
pub fn format_thermodynamics(thermo: &Thermodynamics) -> String {
    format!(
        "delH: {}\nTm: {}\ndelS: {}\ndelG_25: {}\ndelG_37: {}",
        thermo.del_h, thermo.tm, thermo.del_s, thermo.del_g_25, thermo.del_g_37
    )
}

/// Multi-line fit diagnostics (parameters with standard errors).
pub fn format_fit_diagnostics(fit: &FitResult) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{} fit: SSE={:.6e} RMSE={:.6e} iterations={} evaluations={}\n",
        fit.target, fit.sse, fit.rmse, fit.iterations, fit.evaluations
    ));
    for ((name, value), se) in PARAM_NAMES
        .iter()
        .zip(fit.params.to_array())
        .zip(fit.std_errors)
    {
        out.push_str(&format!("  {name:<5} {value:>14.6} ± {}\n", fmt_se(se)));
    }
    out
}

/// One-line run summary for the log.
pub fn format_run_summary(succeeded: usize, failed: &[String]) -> String {
    let total = succeeded + failed.len();
    if failed.is_empty() {
        format!("processed {succeeded} of {total} file(s)")
    } else {
        format!(
            "processed {succeeded} of {total} file(s); failed: {}",
            failed.join(", ")
        )
    }
}

fn fmt_se(se: f64) -> String {
    if se.is_finite() {
        format!("{se:.6}")
    } else {
        "inf".to_string()
    }
}
