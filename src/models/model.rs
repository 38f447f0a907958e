//! Model evaluation for the two-state hairpin transition.
//!
//! With `T = t + 273.16` and `R = 8.314 / 4184` kcal/(mol·K):
//!
//! ```text
//! x = (1/Tm - 1/T) · delH / R
//! f = exp(x) / (1 + exp(x))                       (folded fraction)
//! y = (mds·t + bds)·f + (mss·t + bss)·(1 - f)
//! ```
//!
//! Numerical notes:
//! - `f` is evaluated as `1 / (1 + exp(-x))`. When `exp` overflows this
//!   saturates to exactly `1.0` or `0.0` instead of producing `inf / inf`.
//! - Non-positive `Tm` or `t = -273.16` are not guarded; they yield inf/nan
//!   and the fitter reports the fit as failed.

use crate::domain::{ModelParams, N_PARAMS};

/// Gas constant in kcal/(mol·K).
pub const GAS_CONSTANT: f64 = 8.314 / 4184.0;

/// Offset converting °C to the model's Kelvin scale.
pub const CELSIUS_OFFSET: f64 = 273.16;

/// Exponent of the van't Hoff equilibrium constant at temperature `t` (°C).
pub fn vant_hoff_exponent(t: f64, del_h: f64, tm: f64) -> f64 {
    ((1.0 / tm) - (1.0 / (t + CELSIUS_OFFSET))) * del_h / GAS_CONSTANT
}

/// Equilibrium folded fraction at temperature `t` (°C).
pub fn folded_fraction(t: f64, del_h: f64, tm: f64) -> f64 {
    let x = vant_hoff_exponent(t, del_h, tm);
    1.0 / (1.0 + (-x).exp())
}

/// Predicted signal at temperature `t` (°C).
pub fn uv_hairpin(t: f64, p: &ModelParams) -> f64 {
    let f = folded_fraction(t, p.del_h, p.tm);
    (p.mds * t + p.bds) * f + (p.mss * t + p.bss) * (1.0 - f)
}

/// Evaluate the model on every temperature in `t`.
#[cfg(test)]
pub(crate) fn predict_all(t: &[f64], p: &ModelParams) -> Vec<f64> {
    t.iter().map(|&ti| uv_hairpin(ti, p)).collect()
}

/// Folded-state baseline `mds·t + bds`.
pub fn folded_baseline(t: f64, p: &ModelParams) -> f64 {
    p.mds * t + p.bds
}

/// Unfolded-state baseline `mss·t + bss`.
pub fn unfolded_baseline(t: f64, p: &ModelParams) -> f64 {
    p.mss * t + p.bss
}

/// Partial derivatives of [`uv_hairpin`] with respect to
/// `[mds, bds, mss, bss, delH, Tm]`.
pub fn gradient(t: f64, p: &ModelParams) -> [f64; N_PARAMS] {
    let kelvin = t + CELSIUS_OFFSET;
    let f = folded_fraction(t, p.del_h, p.tm);
    let df_dx = f * (1.0 - f);
    let gap = folded_baseline(t, p) - unfolded_baseline(t, p);

    let dx_ddel_h = ((1.0 / p.tm) - (1.0 / kelvin)) / GAS_CONSTANT;
    let dx_dtm = -p.del_h / (GAS_CONSTANT * p.tm * p.tm);

    [
        t * f,
        f,
        t * (1.0 - f),
        1.0 - f,
        gap * df_dx * dx_ddel_h,
        gap * df_dx * dx_dtm,
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_params() -> ModelParams {
        ModelParams::default()
    }

    #[test]
    fn folded_fraction_is_half_at_melting_temperature() {
        let p = default_params();
        let t_mid = p.tm - CELSIUS_OFFSET;
        let f = folded_fraction(t_mid, p.del_h, p.tm);
        assert!((f - 0.5).abs() < 1e-12, "f(Tm) = {f}");

        let y = uv_hairpin(t_mid, &p);
        let expected = 0.5 * (folded_baseline(t_mid, &p) + unfolded_baseline(t_mid, &p));
        assert!((y - expected).abs() < 1e-9);
    }

    #[test]
    fn model_follows_baselines_far_from_transition() {
        let p = default_params();
        // Folding is favorable (delH < 0): cold means folded.
        let cold = -100.0;
        let hot = 400.0;
        assert!((uv_hairpin(cold, &p) - folded_baseline(cold, &p)).abs() < 1e-6);
        assert!((uv_hairpin(hot, &p) - unfolded_baseline(hot, &p)).abs() < 1e-6);
    }

    #[test]
    fn output_stays_between_baselines() {
        let p = ModelParams {
            mds: -0.01,
            bds: 1.2,
            mss: 0.002,
            bss: 0.4,
            del_h: -55.0,
            tm: 335.0,
        };
        for i in 0..=90 {
            let t = i as f64;
            let y = uv_hairpin(t, &p);
            let a = folded_baseline(t, &p);
            let b = unfolded_baseline(t, &p);
            let (lo, hi) = if a < b { (a, b) } else { (b, a) };
            assert!(y >= lo - 1e-12 && y <= hi + 1e-12, "t={t}: {y} not in [{lo}, {hi}]");
        }
    }

    #[test]
    fn overflow_saturates_instead_of_nan() {
        let p = ModelParams {
            del_h: -1.0e6,
            ..default_params()
        };
        assert_eq!(folded_fraction(0.0, p.del_h, p.tm), 1.0);
        assert_eq!(folded_fraction(200.0, p.del_h, p.tm), 0.0);
        assert!(uv_hairpin(0.0, &p).is_finite());
        assert!(uv_hairpin(200.0, &p).is_finite());
    }

    #[test]
    fn degenerate_inputs_propagate_special_values() {
        let p = ModelParams {
            tm: 0.0,
            ..default_params()
        };
        assert!(!vant_hoff_exponent(25.0, p.del_h, p.tm).is_finite());
        assert!(!vant_hoff_exponent(-CELSIUS_OFFSET, -40.0, 340.0).is_finite());
    }

    #[test]
    fn gradient_matches_central_differences() {
        let p = ModelParams {
            mds: 0.004,
            bds: 0.85,
            mss: 0.0006,
            bss: 0.95,
            del_h: -40.0,
            tm: 340.0,
        };
        for &t in &[20.0, 55.0, 66.8, 75.0] {
            let analytic = gradient(t, &p);
            let base = p.to_array();
            for j in 0..N_PARAMS {
                let h = 1e-6 * base[j].abs().max(1.0);
                let mut up = base;
                let mut down = base;
                up[j] += h;
                down[j] -= h;
                let numeric = (uv_hairpin(t, &ModelParams::from_array(up))
                    - uv_hairpin(t, &ModelParams::from_array(down)))
                    / (2.0 * h);
                let tol = 1e-6 * numeric.abs().max(1.0);
                assert!(
                    (analytic[j] - numeric).abs() < tol,
                    "t={t} j={j}: analytic {} vs numeric {numeric}",
                    analytic[j]
                );
            }
        }
    }
}
