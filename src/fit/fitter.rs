//! Constrained least-squares fitting of one surface.
//!
//! Given:
//! - source points `q_i` with parameters `u_i`
//! - a degree and clamped knot vector
//! - a constraint set and smoothness weight `λ`
//!
//! we minimize
//!
//! ```text
//! Σ ‖C(u_i) − q_i‖² + λ · penalty(P)
//! ```
//!
//! over the control points `P`. With only linear constraints this is one KKT
//! solve ([`SolverPath::Linear`]). With curvature constraints an SQP iteration
//! runs ([`SolverPath::Sequential`]), started from the linear solution or from
//! a polygon supplied by the caller (a refined curve's shape-preserving
//! polygon). Both paths share the same quadratic objective and constraint set.

use nalgebra::{DMatrix, DVector, Point2, Vector2};

use crate::curve::BSplineCurve;
use crate::domain::{ContinuityConfig, ControlPolygon, KnotVector, ParameterSet, Surface, SurfacePoints};
use crate::error::FitError;
use crate::fit::constraints::{ConstraintRequest, ConstraintSet, LeadingEdgeTarget, assemble_constraints};
use crate::fit::parameterize::parameterize;
use crate::fit::penalty::roughness_matrix;
use crate::math::{EqualityConstraints, QuadraticObjective, SqpOptions, basis_row, minimize, solve_kkt};
use crate::report::{DeviationReport, analyze_deviation};

/// Which solver produced a fit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverPath {
    /// One KKT solve: only linear constraints are active.
    Linear,
    /// SQP seeded with the linear solution: curvature constraints are active.
    Sequential,
}

impl SolverPath {
    pub fn for_constraints(constraints: &ConstraintSet) -> Self {
        if constraints.is_nonlinear() {
            SolverPath::Sequential
        } else {
            SolverPath::Linear
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct SolverReport {
    pub path: SolverPath,
    pub iterations: usize,
    /// `‖c‖∞` before the end points were snapped.
    pub violation: f64,
}

/// A fitted surface curve together with the data it was fitted to.
#[derive(Debug, Clone)]
pub struct FittedCurve {
    pub surface: Surface,
    pub curve: BSplineCurve,
    pub parameters: ParameterSet,
    /// The points the least-squares fit ran on.
    pub source: SurfacePoints,
    /// The points deviation is measured against. Equal to `source` except
    /// for thickened curves, which are fitted to resampled offset data but
    /// judged against the offset original data.
    pub reference: SurfacePoints,
    pub solver: SolverReport,
}

impl FittedCurve {
    pub fn degree(&self) -> usize {
        self.curve.degree()
    }

    pub fn knots(&self) -> &KnotVector {
        self.curve.knots()
    }

    pub fn control_points(&self) -> &[Point2<f64>] {
        self.curve.control_points()
    }

    pub fn evaluate(&self, u: f64) -> Point2<f64> {
        self.curve.evaluate(u)
    }

    pub fn derivatives(&self, u: f64, order: usize) -> Vec<Vector2<f64>> {
        self.curve.derivatives(u, order)
    }

    /// Deviation of the reference points from this curve.
    pub fn deviation(&self, samples: usize) -> Result<DeviationReport, FitError> {
        analyze_deviation(&self.curve, self.reference.points(), samples)
    }
}

/// The least-squares part of a fit: data, parameters and curve layout.
#[derive(Debug, Clone, Copy)]
pub struct FitProblem<'a> {
    pub points: &'a SurfacePoints,
    pub parameters: &'a ParameterSet,
    pub degree: usize,
    pub knots: &'a KnotVector,
    pub smoothness: f64,
}

/// `½ zᵀHz − gᵀz` with `H = diag(BᵀB + λR, BᵀB + λR)` and `g = [Bᵀq_x; Bᵀq_y]`.
pub fn build_objective(problem: &FitProblem<'_>) -> Result<QuadraticObjective, FitError> {
    let pts = problem.points.points();
    let u = problem.parameters.values();
    if pts.len() != u.len() {
        return Err(FitError::invalid(format!(
            "{} points but {} parameter values",
            pts.len(),
            u.len()
        )));
    }
    if !(problem.smoothness >= 0.0 && problem.smoothness.is_finite()) {
        return Err(FitError::invalid(format!(
            "smoothness weight must be finite and >= 0, got {}",
            problem.smoothness
        )));
    }

    let n = problem.knots.control_point_count(problem.degree);
    let m = pts.len();

    let mut b = DMatrix::<f64>::zeros(m, n);
    for (i, &ui) in u.iter().enumerate() {
        let row = basis_row(problem.knots.values(), problem.degree, n, ui);
        for (j, v) in row.into_iter().enumerate() {
            b[(i, j)] = v;
        }
    }
    let qx = DVector::from_iterator(m, pts.iter().map(|p| p.x));
    let qy = DVector::from_iterator(m, pts.iter().map(|p| p.y));

    let mut block = b.tr_mul(&b);
    if problem.smoothness > 0.0 {
        block += roughness_matrix(n) * problem.smoothness;
    }

    let mut hessian = DMatrix::<f64>::zeros(2 * n, 2 * n);
    hessian.view_mut((0, 0), (n, n)).copy_from(&block);
    hessian.view_mut((n, n), (n, n)).copy_from(&block);

    let mut gradient_offset = DVector::<f64>::zeros(2 * n);
    gradient_offset.rows_mut(0, n).copy_from(&b.tr_mul(&qx));
    gradient_offset.rows_mut(n, n).copy_from(&b.tr_mul(&qy));

    Ok(QuadraticObjective {
        hessian,
        gradient_offset,
    })
}

/// Solve for the control points of one surface.
///
/// Pinned points are written back exactly and the G1 point is projected onto
/// its line, so the end constraints hold to the last bit. `start` is only
/// used by the SQP path, and only when it has one point per control point.
pub fn solve_control_points(
    problem: &FitProblem<'_>,
    constraints: &ConstraintSet,
    start: Option<&[Point2<f64>]>,
    solver: &SqpOptions,
) -> Result<(Vec<Point2<f64>>, SolverReport), FitError> {
    let n = problem.knots.control_point_count(problem.degree);
    if constraints.control_point_count() != n {
        return Err(FitError::invalid(format!(
            "constraints were built for {} control points, the knot vector has {n}",
            constraints.control_point_count()
        )));
    }

    let objective = build_objective(problem)?;
    let path = SolverPath::for_constraints(constraints);
    let seed = match (path, start) {
        (SolverPath::Sequential, Some(points)) if points.len() == n => DVector::from_iterator(
            2 * n,
            points.iter().map(|p| p.x).chain(points.iter().map(|p| p.y)),
        ),
        _ => {
            let (c, d) = constraints.linear_system();
            solve_kkt(&objective.hessian, &c, &objective.gradient_offset, &d)?.x
        }
    };

    let (z, report) = match path {
        SolverPath::Linear => {
            let violation = constraints.residuals(&seed).amax();
            (
                seed,
                SolverReport {
                    path: SolverPath::Linear,
                    iterations: 1,
                    violation,
                },
            )
        }
        SolverPath::Sequential => {
            let result = minimize(&objective, constraints, seed, solver)?;
            (
                result.solution,
                SolverReport {
                    path: SolverPath::Sequential,
                    iterations: result.iterations,
                    violation: result.violation,
                },
            )
        }
    };

    let mut points: Vec<Point2<f64>> = (0..n).map(|i| Point2::new(z[i], z[n + i])).collect();
    constraints.snap(&mut points);
    Ok((points, report))
}

/// One surface to fit: its data and curve layout.
#[derive(Debug, Clone)]
pub struct SurfaceJob {
    pub surface: Surface,
    pub points: SurfacePoints,
    pub degree: usize,
    pub knots: KnotVector,
    /// Where the last control point is pinned.
    pub te_point: Point2<f64>,
    pub te_tangent: Option<Vector2<f64>>,
    /// Starting polygon for the SQP path.
    pub start: Option<Vec<Point2<f64>>>,
}

/// Settings shared by both surfaces of one fit.
#[derive(Debug, Clone, Copy)]
pub struct FitContext<'a> {
    pub continuity: &'a ContinuityConfig,
    pub le_direction: Vector2<f64>,
    pub le_target: Option<LeadingEdgeTarget>,
    pub solver: &'a SqpOptions,
}

/// Parameterize, constrain and fit one surface.
pub fn fit_surface(job: &SurfaceJob, ctx: &FitContext<'_>) -> Result<FittedCurve, FitError> {
    let parameters = parameterize(&job.points)?;
    let constraints = assemble_constraints(&ConstraintRequest {
        surface: job.surface,
        degree: job.degree,
        knots: &job.knots,
        le_direction: ctx.le_direction,
        te_point: job.te_point,
        continuity: ctx.continuity,
        te_tangent: job.te_tangent,
        le_target: ctx.le_target,
    })?;

    let problem = FitProblem {
        points: &job.points,
        parameters: &parameters,
        degree: job.degree,
        knots: &job.knots,
        smoothness: ctx.continuity.smoothness_weight,
    };
    let (points, solver) = solve_control_points(&problem, &constraints, job.start.as_deref(), ctx.solver)?;
    let curve = BSplineCurve::new(job.degree, job.knots.clone(), ControlPolygon::new(points))?;

    log::debug!(
        "{} surface fitted: degree {}, {} control points, {:?} solver, {} iterations",
        job.surface.label(),
        job.degree,
        curve.control_point_count(),
        solver.path,
        solver.iterations
    );

    Ok(FittedCurve {
        surface: job.surface,
        curve,
        parameters,
        source: job.points.clone(),
        reference: job.points.clone(),
        solver,
    })
}
