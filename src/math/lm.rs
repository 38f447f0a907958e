//! Levenberg–Marquardt nonlinear least squares.
//!
//! Minimizes `Σ r_i(p)²` for a problem that supplies residuals and an analytic
//! Jacobian. The loop follows the classic MINPACK recipe:
//!
//! - Marquardt scaling: `D = diag(max_k ||J_k[:, j]||)` (running maximum of
//!   Jacobian column norms), so parameters on wildly different scales are damped
//!   evenly
//! - each trial step solves the damped linear problem as a stacked least-squares
//!   system (see [`solve_least_squares`])
//! - steps are accepted on the gain ratio `ρ = actual / predicted` reduction, and
//!   the damping is updated with Nielsen's rule
//!
//! Termination mirrors the usual `ftol` / `xtol` / `gtol` triple. A start with
//! exactly zero residuals terminates immediately.

use nalgebra::{DMatrix, DVector};
use thiserror::Error;

use crate::math::solve_least_squares;

/// Machine-precision based default tolerance (`sqrt(f64::EPSILON)`).
pub const DEFAULT_TOL: f64 = 1.49012e-8;

/// Accept a step only if it realizes at least this share of the predicted reduction.
const MIN_GAIN_RATIO: f64 = 1e-4;

/// Damping beyond this means the linear model no longer predicts any descent.
const MAX_DAMPING: f64 = 1e300;

/// A nonlinear least-squares problem.
pub trait LeastSquaresProblem {
    /// Number of residuals `m`.
    fn residual_count(&self) -> usize;

    /// Residual vector `r(p)` of length `m`.
    fn residuals(&self, params: &DVector<f64>) -> DVector<f64>;

    /// Jacobian `∂r_i/∂p_j` (`m x n`).
    fn jacobian(&self, params: &DVector<f64>) -> DMatrix<f64>;
}

#[derive(Debug, Clone)]
pub struct LmOptions {
    /// Maximum residual evaluations (including the initial one).
    pub max_evals: usize,
    /// Relative cost reduction tolerance.
    pub ftol: f64,
    /// Relative (scaled) step tolerance.
    pub xtol: f64,
    /// Scaled gradient tolerance.
    pub gtol: f64,
    /// Initial damping relative to the largest squared scale.
    pub initial_damping: f64,
}

impl LmOptions {
    /// Defaults for a problem with `n_params` parameters.
    pub fn for_params(n_params: usize) -> Self {
        Self {
            max_evals: 200 * (n_params + 1),
            ftol: DEFAULT_TOL,
            xtol: DEFAULT_TOL,
            gtol: 0.0,
            initial_damping: 1e-3,
        }
    }
}

/// Why the solver stopped successfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Termination {
    ZeroResidual,
    CostReduction,
    StepSize,
    Gradient,
}

#[derive(Debug, Clone)]
pub struct LmSolution {
    pub params: DVector<f64>,
    pub residuals: DVector<f64>,
    /// Jacobian at `params` (used for the covariance estimate).
    pub jacobian: DMatrix<f64>,
    /// `Σ r_i²` at `params`.
    pub cost: f64,
    pub iterations: usize,
    pub evaluations: usize,
    pub termination: Termination,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum LmError {
    #[error("{residuals} residuals cannot determine {params} parameters")]
    Underdetermined { residuals: usize, params: usize },

    #[error("model is not finite at the initial guess")]
    NonFiniteStart,

    #[error("model Jacobian is not finite at iteration {iteration}")]
    NonFiniteJacobian { iteration: usize },

    #[error("evaluation budget of {max_evals} exhausted (sum of squares {cost:e})")]
    MaxEvaluations { max_evals: usize, cost: f64 },

    #[error("solver produced non-finite parameters")]
    NonFiniteSolution,

    #[error("no step reduces the sum of squares (damping {damping:e})")]
    Stalled { damping: f64 },

    #[error("Jacobian is singular at the solution (scaled condition number {condition:e})")]
    SingularJacobian { condition: f64 },
}

/// Run Levenberg–Marquardt from `initial`.
pub fn levenberg_marquardt<P: LeastSquaresProblem>(
    problem: &P,
    initial: &[f64],
    opts: &LmOptions,
) -> Result<LmSolution, LmError> {
    let n = initial.len();
    let m = problem.residual_count();
    if n == 0 || m < n {
        return Err(LmError::Underdetermined {
            residuals: m,
            params: n,
        });
    }

    let mut x = DVector::from_column_slice(initial);
    if !all_finite(x.iter()) {
        return Err(LmError::NonFiniteStart);
    }
    let mut r = problem.residuals(&x);
    let mut evaluations = 1usize;
    if r.len() != m || !all_finite(r.iter()) {
        return Err(LmError::NonFiniteStart);
    }
    let mut cost = r.norm_squared();

    let mut scale = DVector::<f64>::zeros(n);
    let mut damping = 0.0_f64;
    let mut nu = 2.0_f64;
    let mut iterations = 0usize;

    loop {
        let jac = problem.jacobian(&x);
        if !all_finite(jac.iter()) {
            return Err(LmError::NonFiniteJacobian { iteration: iterations });
        }

        if cost == 0.0 {
            return Ok(solution(x, r, jac, cost, iterations, evaluations, Termination::ZeroResidual));
        }

        let grad = jac.transpose() * &r;

        for j in 0..n {
            let norm = jac.column(j).norm();
            let norm = if norm > 0.0 { norm } else { 1.0 };
            scale[j] = scale[j].max(norm);
        }

        // Scaled gradient: largest cosine between r and a Jacobian column.
        let r_norm = cost.sqrt();
        let gnorm = (0..n)
            .map(|j| {
                let col = jac.column(j).norm();
                if col > 0.0 { (grad[j] / (col * r_norm)).abs() } else { 0.0 }
            })
            .fold(0.0_f64, f64::max);
        if gnorm <= opts.gtol {
            return Ok(solution(x, r, jac, cost, iterations, evaluations, Termination::Gradient));
        }

        if iterations == 0 {
            let s_max = scale.iter().fold(0.0_f64, |acc, &s| acc.max(s * s));
            damping = opts.initial_damping * s_max;
        }
        iterations += 1;

        loop {
            let Some(step) = damped_step(&jac, &r, &scale, damping) else {
                damping *= nu;
                nu *= 2.0;
                if !damping.is_finite() || damping > MAX_DAMPING {
                    return Err(LmError::Stalled { damping });
                }
                continue;
            };

            let x_norm = scale.component_mul(&x).norm();
            let step_norm = scale.component_mul(&step).norm();

            let x_new = &x + &step;
            let r_new = problem.residuals(&x_new);
            evaluations += 1;
            let cost_new = if r_new.len() == m && all_finite(r_new.iter()) {
                r_new.norm_squared()
            } else {
                f64::INFINITY
            };

            let predicted = cost - (&r + &jac * &step).norm_squared();
            let actual = cost - cost_new;
            let rho = if predicted > 0.0 { actual / predicted } else { -1.0 };

            if rho > MIN_GAIN_RATIO {
                let prev_cost = cost;
                x = x_new;
                r = r_new;
                cost = cost_new;
                damping *= (1.0_f64 / 3.0).max(1.0 - (2.0 * rho - 1.0).powi(3));
                nu = 2.0;

                if actual <= opts.ftol * prev_cost && predicted <= opts.ftol * prev_cost {
                    let jac = problem.jacobian(&x);
                    return Ok(solution(x, r, jac, cost, iterations, evaluations, Termination::CostReduction));
                }
                if step_norm <= opts.xtol * x_norm {
                    let jac = problem.jacobian(&x);
                    return Ok(solution(x, r, jac, cost, iterations, evaluations, Termination::StepSize));
                }
                if evaluations >= opts.max_evals {
                    return Err(LmError::MaxEvaluations {
                        max_evals: opts.max_evals,
                        cost,
                    });
                }
                break;
            }

            // Rejected: the current point is already as good as steps this small get.
            if step_norm <= opts.xtol * x_norm {
                return Ok(solution(x, r, jac, cost, iterations, evaluations, Termination::StepSize));
            }
            if evaluations >= opts.max_evals {
                return Err(LmError::MaxEvaluations {
                    max_evals: opts.max_evals,
                    cost,
                });
            }

            damping *= nu;
            nu *= 2.0;
            if !damping.is_finite() || damping > MAX_DAMPING {
                return Err(LmError::Stalled { damping });
            }
        }
    }
}

/// Parameter covariance `s² (JᵀJ)⁻¹` with `s² = cost / (m - n)`.
///
/// Returns `None` when `m <= n` or the Jacobian is numerically rank deficient.
pub fn covariance(jacobian: &DMatrix<f64>, cost: f64) -> Option<DMatrix<f64>> {
    let (m, n) = jacobian.shape();
    if m <= n || !cost.is_finite() {
        return None;
    }

    let svd = jacobian.clone().svd(false, true);
    let v_t = svd.v_t?;
    let s = &svd.singular_values;
    let s_max = s.max();
    let threshold = f64::EPSILON * m.max(n) as f64 * s_max;
    if !(s_max > 0.0) || s.iter().any(|&sv| sv <= threshold) {
        return None;
    }

    let inv_sq = DMatrix::from_diagonal(&s.map(|sv| 1.0 / (sv * sv)));
    let s2 = cost / (m - n) as f64;
    Some(v_t.transpose() * inv_sq * &v_t * s2)
}

/// Condition number of the Jacobian after scaling every column to unit norm.
///
/// Column scaling removes the spread between parameter units (baseline
/// slopes vs. `Tm`), so what remains measures near-collinearity. A zero
/// column or a zero singular value gives `+inf`.
pub fn scaled_condition_number(jacobian: &DMatrix<f64>) -> f64 {
    let mut scaled = jacobian.clone();
    for mut col in scaled.column_iter_mut() {
        let norm = col.norm();
        if !(norm.is_finite() && norm > 0.0) {
            return f64::INFINITY;
        }
        col /= norm;
    }

    let s = scaled.singular_values();
    let s_min = s.min();
    if s_min > 0.0 { s.max() / s_min } else { f64::INFINITY }
}

fn damped_step(
    jac: &DMatrix<f64>,
    r: &DVector<f64>,
    scale: &DVector<f64>,
    damping: f64,
) -> Option<DVector<f64>> {
    let (m, n) = jac.shape();
    let sqrt_mu = damping.sqrt();

    let mut a = DMatrix::<f64>::zeros(m + n, n);
    a.view_mut((0, 0), (m, n)).copy_from(jac);
    for j in 0..n {
        a[(m + j, j)] = sqrt_mu * scale[j];
    }

    let mut b = DVector::<f64>::zeros(m + n);
    for i in 0..m {
        b[i] = -r[i];
    }

    solve_least_squares(&a, &b)
}

fn solution(
    params: DVector<f64>,
    residuals: DVector<f64>,
    jacobian: DMatrix<f64>,
    cost: f64,
    iterations: usize,
    evaluations: usize,
    termination: Termination,
) -> LmSolution {
    LmSolution {
        params,
        residuals,
        jacobian,
        cost,
        iterations,
        evaluations,
        termination,
    }
}

fn all_finite<'a>(mut values: impl Iterator<Item = &'a f64>) -> bool {
    values.all(|v| v.is_finite())
}
