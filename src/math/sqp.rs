//! Sequential quadratic programming for quadratic objectives with nonlinear
//! equality constraints.
//!
//! The problems solved here are:
//!
//! ```text
//! minimize    f(z) = ½ zᵀ H z − gᵀ z
//! subject to  c(z) = 0
//! ```
//!
//! Each iteration linearizes `c` and solves the KKT system
//!
//! ```text
//! [ W  Jᵀ ] [ p ]   [ −∇f ]
//! [ J  0  ] [ λ ] = [ −c  ]
//! ```
//!
//! where `W` is the Hessian of the Lagrangian. The constraint curvature part of
//! `W` is built by forward differences of `Jᵀλ` using the multipliers of the
//! previous iteration; the first iteration uses `H` alone.
//!
//! Globalization uses an ℓ1 merit function `f + μ‖c‖₁` with Armijo
//! backtracking. If no step satisfies the Armijo condition the full step is
//! taken, so the iteration count stays bounded by `max_iterations`.

use std::time::{Duration, Instant};

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;
use crate::math::solve_kkt;

/// Armijo sufficient-decrease constant.
const ARMIJO: f64 = 1e-4;
/// Maximum number of step halvings in the line search.
const MAX_BACKTRACKS: usize = 30;
/// Relative forward-difference step for the Lagrangian Hessian.
const FD_STEP: f64 = 1e-7;

/// A set of equality constraints `c(z) = 0` with an analytic Jacobian.
pub trait EqualityConstraints {
    /// Number of constraint rows.
    fn len(&self) -> usize;

    fn residuals(&self, z: &DVector<f64>) -> DVector<f64>;

    /// `len() × z.len()` Jacobian of [`residuals`](Self::residuals).
    fn jacobian(&self, z: &DVector<f64>) -> DMatrix<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `Σ λ_i ∇²c_i(z)`, by default from forward differences of the Jacobian.
    fn weighted_hessian(&self, z: &DVector<f64>, multipliers: &DVector<f64>) -> DMatrix<f64> {
        let n = z.len();
        let base = self.jacobian(z).tr_mul(multipliers);
        let mut out = DMatrix::<f64>::zeros(n, n);
        let mut nudged = z.clone();
        for j in 0..n {
            let h = FD_STEP * (1.0 + z[j].abs());
            nudged[j] = z[j] + h;
            let shifted = self.jacobian(&nudged).tr_mul(multipliers);
            nudged[j] = z[j];
            out.set_column(j, &((shifted - &base) / h));
        }
        // Symmetrize to remove one-sided differencing noise.
        (&out + out.transpose()) * 0.5
    }
}

/// `f(z) = ½ zᵀ H z − gᵀ z`.
#[derive(Debug, Clone)]
pub struct QuadraticObjective {
    pub hessian: DMatrix<f64>,
    pub gradient_offset: DVector<f64>,
}

impl QuadraticObjective {
    pub fn value(&self, z: &DVector<f64>) -> f64 {
        0.5 * z.dot(&(&self.hessian * z)) - self.gradient_offset.dot(z)
    }

    pub fn gradient(&self, z: &DVector<f64>) -> DVector<f64> {
        &self.hessian * z - &self.gradient_offset
    }
}

/// Stopping rules for [`minimize`].
#[derive(Debug, Clone, PartialEq)]
pub struct SqpOptions {
    pub max_iterations: usize,
    /// Converged when `‖c‖∞` is at most this...
    pub constraint_tolerance: f64,
    /// ...and the last step satisfies `‖p‖∞ ≤ step_tolerance · (1 + ‖z‖∞)`.
    pub step_tolerance: f64,
    /// Optional wall-clock cap for one solve.
    pub time_limit: Option<Duration>,
}

impl Default for SqpOptions {
    fn default() -> Self {
        Self {
            max_iterations: 200,
            constraint_tolerance: 1e-10,
            step_tolerance: 1e-10,
            time_limit: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SqpReport {
    pub solution: DVector<f64>,
    pub iterations: usize,
    /// Final `‖c‖∞`.
    pub violation: f64,
}

/// Minimize `objective` subject to `constraints`, starting from `start`.
///
/// Fails with [`FitError::FitDiverged`] when the iteration cap or time limit
/// is hit before both tolerances are met, and propagates
/// [`FitError::NumericalIllConditioning`] from the KKT solves.
pub fn minimize<C>(
    objective: &QuadraticObjective,
    constraints: &C,
    start: DVector<f64>,
    options: &SqpOptions,
) -> Result<SqpReport, FitError>
where
    C: EqualityConstraints + ?Sized,
{
    let started = Instant::now();
    let mut z = start;
    let mut residuals = constraints.residuals(&z);
    let mut violation = residuals.amax();
    let mut multipliers: Option<DVector<f64>> = None;
    let mut penalty = 0.0_f64;

    for iteration in 1..=options.max_iterations {
        if let Some(limit) = options.time_limit {
            if started.elapsed() >= limit {
                log::debug!("SQP time limit of {limit:?} hit after {} iterations", iteration - 1);
                return Err(FitError::FitDiverged {
                    iterations: iteration - 1,
                    violation,
                });
            }
        }

        let jacobian = constraints.jacobian(&z);
        let gradient = objective.gradient(&z);

        let step = match &multipliers {
            Some(lambda) => {
                let w = &objective.hessian + constraints.weighted_hessian(&z, lambda);
                match solve_kkt(&w, &jacobian, &(-&gradient), &(-&residuals)) {
                    Ok(step) => step,
                    // An indefinite Lagrangian can make the system singular; fall back.
                    Err(_) => solve_kkt(&objective.hessian, &jacobian, &(-&gradient), &(-&residuals))?,
                }
            }
            None => solve_kkt(&objective.hessian, &jacobian, &(-&gradient), &(-&residuals))?,
        };
        let direction = step.x;
        // Multipliers of `H p + Jᵀλ = −∇f` are those of the original problem.
        let lambda = step.multipliers;

        penalty = penalty.max(1.5 * lambda.amax() + 1e-8);
        let norm1 = residuals.lp_norm(1);
        let merit0 = objective.value(&z) + penalty * norm1;
        let slope = gradient.dot(&direction) - penalty * norm1;

        let mut alpha = 1.0;
        let mut accepted = None;
        for _ in 0..MAX_BACKTRACKS {
            let trial = &z + &direction * alpha;
            let trial_residuals = constraints.residuals(&trial);
            let merit = objective.value(&trial) + penalty * trial_residuals.lp_norm(1);
            if merit <= merit0 + ARMIJO * alpha * slope {
                accepted = Some((trial, trial_residuals));
                break;
            }
            alpha *= 0.5;
        }
        let (next, next_residuals) = match accepted {
            Some(found) => found,
            None => {
                alpha = 1.0;
                let trial = &z + &direction;
                let trial_residuals = constraints.residuals(&trial);
                (trial, trial_residuals)
            }
        };

        let step_norm = direction.amax() * alpha;
        z = next;
        residuals = next_residuals;
        violation = residuals.amax();
        multipliers = Some(lambda);

        log::debug!(
            "SQP iter {iteration}: violation={violation:.3e} step={step_norm:.3e} alpha={alpha} merit_mu={penalty:.3e}"
        );

        if violation <= options.constraint_tolerance && step_norm <= options.step_tolerance * (1.0 + z.amax()) {
            return Ok(SqpReport {
                solution: z,
                iterations: iteration,
                violation,
            });
        }
    }

    Err(FitError::FitDiverged {
        iterations: options.max_iterations,
        violation,
    })
}
