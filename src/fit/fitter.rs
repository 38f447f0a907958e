//! Fitting routine for a single absorbance series.
//!
//! Given:
//! - temperatures `t_i` (°C)
//! - observed signal `y_i` (raw or normalized)
//! - an initial guess for the six model parameters
//!
//! we minimize `Σ (uv_hairpin(t_i; p) - y_i)²` with Levenberg–Marquardt and
//! estimate the parameter covariance from the Jacobian at the solution.
//!
//! Raw and normalized fits share this code path; only `target` and the
//! signal slice differ.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, warn};

use crate::domain::{FitResult, FitTarget, ModelParams, N_PARAMS};
use crate::math::{
    DEFAULT_TOL, LeastSquaresProblem, LmError, LmOptions, covariance, levenberg_marquardt,
    scaled_condition_number,
};
use crate::models::{gradient, uv_hairpin};

/// Scaled Jacobian condition number beyond which `JᵀJ` carries no precision.
const MAX_CONDITION: f64 = 1.0 / DEFAULT_TOL;

/// Fitting options shared by every file in a run.
#[derive(Debug, Clone, Default)]
pub struct FitOptions {
    /// Residual evaluation budget; `0` uses the solver default.
    pub max_evals: usize,
}

impl FitOptions {
    fn lm_options(&self) -> LmOptions {
        let mut opts = LmOptions::for_params(N_PARAMS);
        if self.max_evals > 0 {
            opts.max_evals = self.max_evals;
        }
        opts
    }
}

/// A melting curve seen as a least-squares problem.
struct MeltProblem<'a> {
    temperature: &'a [f64],
    signal: &'a [f64],
}

fn params_of(p: &DVector<f64>) -> ModelParams {
    ModelParams::from_array([p[0], p[1], p[2], p[3], p[4], p[5]])
}

impl LeastSquaresProblem for MeltProblem<'_> {
    fn residual_count(&self) -> usize {
        self.temperature.len()
    }

    fn residuals(&self, p: &DVector<f64>) -> DVector<f64> {
        let params = params_of(p);
        DVector::from_iterator(
            self.temperature.len(),
            self.temperature
                .iter()
                .zip(self.signal)
                .map(|(&t, &y)| uv_hairpin(t, &params) - y),
        )
    }

    fn jacobian(&self, p: &DVector<f64>) -> DMatrix<f64> {
        let params = params_of(p);
        let mut jac = DMatrix::<f64>::zeros(self.temperature.len(), N_PARAMS);
        for (i, &t) in self.temperature.iter().enumerate() {
            let row = gradient(t, &params);
            for (j, &v) in row.iter().enumerate() {
                jac[(i, j)] = v;
            }
        }
        jac
    }
}

/// Fit the two-state model to one series.
///
/// With more points than parameters, a solution whose Jacobian is singular
/// or ill-conditioned is an error: its parameters are not determined by the
/// data. With exactly six points the fit is accepted and the covariance is
/// filled with `+inf`.
pub fn fit_model(
    temperature: &[f64],
    signal: &[f64],
    target: FitTarget,
    guess: &ModelParams,
    opts: &FitOptions,
) -> Result<FitResult, LmError> {
    let n = temperature.len().min(signal.len());
    let problem = MeltProblem {
        temperature: &temperature[..n],
        signal: &signal[..n],
    };

    let sol = levenberg_marquardt(&problem, &guess.to_array(), &opts.lm_options())?;
    let params = params_of(&sol.params);
    if !params.is_finite() {
        return Err(LmError::NonFiniteSolution);
    }

    let covariance = if n > N_PARAMS {
        let condition = scaled_condition_number(&sol.jacobian);
        match covariance(&sol.jacobian, sol.cost) {
            Some(cov) if condition <= MAX_CONDITION => cov,
            _ => {
                debug!(%target, %params, condition, "rejecting ill-conditioned solution");
                return Err(LmError::SingularJacobian { condition });
            }
        }
    } else {
        warn!(%target, "covariance of the parameters could not be estimated");
        DMatrix::from_element(N_PARAMS, N_PARAMS, f64::INFINITY)
    };

    let mut std_errors = [f64::INFINITY; N_PARAMS];
    for (j, se) in std_errors.iter_mut().enumerate() {
        *se = covariance[(j, j)].sqrt();
    }

    let rmse = (sol.cost / n as f64).sqrt();
    debug!(
        %target,
        iterations = sol.iterations,
        evaluations = sol.evaluations,
        termination = ?sol.termination,
        sse = sol.cost,
        rmse,
        "fit converged"
    );

    Ok(FitResult {
        target,
        params,
        covariance,
        std_errors,
        sse: sol.cost,
        rmse,
        iterations: sol.iterations,
        evaluations: sol.evaluations,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::predict_all;
    use rand::SeedableRng;
    use rand::rngs::StdRng;
    use rand_distr::{Distribution, Normal};

    fn temperatures(n: usize, t0: f64, t1: f64) -> Vec<f64> {
        (0..n)
            .map(|i| t0 + (t1 - t0) * i as f64 / (n as f64 - 1.0))
            .collect()
    }

    fn rel_err(a: f64, b: f64) -> f64 {
        ((a - b) / b).abs()
    }

    #[test]
    fn exact_guess_recovers_default_parameters() {
        let truth = ModelParams::default();
        let t = temperatures(20, 10.0, 80.0);
        let y = predict_all(&t, &truth);

        let fit = fit_model(&t, &y, FitTarget::Raw, &truth, &FitOptions::default()).unwrap();
        assert!(rel_err(fit.params.del_h, -40.0) < 0.01);
        assert!(rel_err(fit.params.tm, 340.0) < 0.01);
        assert!(fit.sse < 1e-12);
    }

    #[test]
    fn perturbed_guess_recovers_known_parameters() {
        let truth = ModelParams {
            mds: -0.002,
            bds: 1.10,
            mss: 0.001,
            bss: 0.30,
            del_h: -45.0,
            tm: 335.0,
        };
        let t = temperatures(36, 10.0, 90.0);
        let y = predict_all(&t, &truth);

        let guess = ModelParams {
            mds: -0.001,
            bds: 1.05,
            mss: 0.0,
            bss: 0.35,
            del_h: -42.0,
            tm: 333.0,
        };
        let fit = fit_model(&t, &y, FitTarget::Raw, &guess, &FitOptions::default()).unwrap();

        assert!(rel_err(fit.params.del_h, truth.del_h) < 1e-4, "delH = {}", fit.params.del_h);
        assert!(rel_err(fit.params.tm, truth.tm) < 1e-4, "Tm = {}", fit.params.tm);
        assert!(rel_err(fit.params.bds, truth.bds) < 1e-4);
        assert!(rel_err(fit.params.bss, truth.bss) < 1e-4);
        assert!(fit.rmse < 1e-6);
    }

    #[test]
    fn noisy_curve_gives_finite_covariance() {
        let truth = ModelParams {
            mds: -0.002,
            bds: 1.10,
            mss: 0.001,
            bss: 0.30,
            del_h: -45.0,
            tm: 335.0,
        };
        let t = temperatures(60, 10.0, 90.0);
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 0.002).unwrap();
        let y: Vec<f64> = predict_all(&t, &truth)
            .into_iter()
            .map(|v| v + noise.sample(&mut rng))
            .collect();

        let fit = fit_model(&t, &y, FitTarget::Raw, &truth, &FitOptions::default()).unwrap();
        assert!(rel_err(fit.params.tm, truth.tm) < 0.01, "Tm = {}", fit.params.tm);
        assert!(rel_err(fit.params.del_h, truth.del_h) < 0.2, "delH = {}", fit.params.del_h);
        assert!(fit.std_errors.iter().all(|s| s.is_finite() && *s > 0.0));
        // The noise level should be reflected in the residual scale.
        assert!(fit.rmse > 0.001 && fit.rmse < 0.004, "rmse = {}", fit.rmse);
    }

    #[test]
    fn non_positive_tm_guess_fails_instead_of_returning_garbage() {
        let t = temperatures(20, 10.0, 80.0);
        let y = predict_all(&t, &ModelParams::default());
        let guess = ModelParams {
            tm: 0.0,
            ..ModelParams::default()
        };
        let err = fit_model(&t, &y, FitTarget::Raw, &guess, &FitOptions::default()).unwrap_err();
        assert!(
            matches!(err, LmError::NonFiniteStart | LmError::NonFiniteJacobian { .. }),
            "{err:?}"
        );
    }

    #[test]
    fn too_few_points_is_underdetermined() {
        let t = [20.0, 30.0, 40.0];
        let y = [1.0, 0.9, 0.8];
        let err = fit_model(&t, &y, FitTarget::Normalized, &ModelParams::default(), &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, LmError::Underdetermined { residuals: 3, params: 6 }));
    }

    #[test]
    fn collapsed_transition_is_a_fit_failure() {
        // Two temperatures cannot pin down six parameters, however many rows.
        let t = [20.0, 20.0, 20.0, 20.0, 60.0, 60.0, 60.0, 60.0];
        let y = [1.0, 1.0, 1.0, 1.0, 0.5, 0.5, 0.5, 0.5];
        let err = fit_model(&t, &y, FitTarget::Raw, &ModelParams::default(), &FitOptions::default())
            .unwrap_err();
        assert!(matches!(err, LmError::SingularJacobian { .. }), "{err:?}");
        assert!(err.to_string().contains("singular"));
    }

    #[test]
    fn noisy_default_shape_never_reports_a_flat_sigmoid() {
        // From the default guess this curve can collapse to delH ~ 0, where
        // the folded and unfolded columns coincide. That must not be Ok.
        let truth = ModelParams {
            mds: 5e-4,
            ..ModelParams::default()
        };
        let t = temperatures(71, 10.0, 80.0);
        let mut rng = StdRng::seed_from_u64(11);
        let noise = Normal::new(0.0, 1e-3).unwrap();
        let y: Vec<f64> = predict_all(&t, &truth)
            .into_iter()
            .map(|v| v + noise.sample(&mut rng))
            .collect();

        match fit_model(&t, &y, FitTarget::Raw, &ModelParams::default(), &FitOptions::default()) {
            Ok(fit) => {
                assert!(fit.std_errors.iter().all(|s| s.is_finite()), "{:?}", fit.std_errors);
                assert!(fit.params.del_h < 0.0, "delH = {}", fit.params.del_h);
            }
            // Any failure is acceptable; it becomes a per-file error upstream.
            Err(err) => assert!(!matches!(err, LmError::Underdetermined { .. }), "{err:?}"),
        }
    }

    #[test]
    fn exact_six_point_fit_reports_infinite_covariance() {
        let truth = ModelParams::default();
        let t = temperatures(6, 10.0, 80.0);
        let y = predict_all(&t, &truth);
        let fit = fit_model(&t, &y, FitTarget::Raw, &truth, &FitOptions::default()).unwrap();
        assert!(fit.std_errors.iter().all(|s| s.is_infinite()));
    }
}
