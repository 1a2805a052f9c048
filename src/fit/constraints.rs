//! Equality constraints for one surface fit.
//!
//! Unknowns are laid out as `z = [x_0 .. x_{n-1}, y_0 .. y_{n-1}]`.
//!
//! Always present:
//! - `P_0` pinned to the leading edge (origin)
//! - `P_1` on the shared leading-edge tangent line (G1)
//! - `P_{n-1}` pinned to the trailing-edge point
//!
//! Optional:
//! - trailing-edge tangency: `P_{n-1} − P_{n-2}` parallel to a given tangent
//! - G2: outward curvature at `u = 0` equals a shared target
//! - G3: outward `dκ/ds` at `u = 0` equals a shared (antisymmetric) target
//!
//! The curvature constraints are written in polynomial form to avoid
//! divisions inside the solver:
//!
//! ```text
//! G2:  −σ (d1 × d2) − κ₀ |d1|³ = 0
//! G3:  −σ ((d1 × d3)|d1|² − 3 (d1 × d2)(d1 · d2)) − τ₀ |d1|⁶ = 0
//! ```
//!
//! where `d_k = C^{(k)}(0)` is a fixed linear combination of the first few
//! control points and `σ` is the surface sign.

use nalgebra::{DMatrix, DVector, Point2, Vector2};

use crate::curve::{BSplineCurve, cross};
use crate::domain::{ContinuityConfig, KnotVector, Surface};
use crate::error::FitError;
use crate::math::{EqualityConstraints, basis_derivative_rows};

/// Shared leading-edge targets for the G2/G3 constraints.
///
/// Computed once from the linear seed fits of both surfaces and then reused
/// unchanged by every re-fit of the session.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LeadingEdgeTarget {
    /// Outward curvature both surfaces must share.
    pub curvature: f64,
    /// Outward curvature slope for the upper surface; the lower surface gets the negation.
    pub curvature_slope: f64,
}

impl LeadingEdgeTarget {
    /// Average the outward leading-edge quantities of two seed curves.
    pub fn from_seeds(upper: &BSplineCurve, lower: &BSplineCurve) -> Self {
        let kappa_u = outward_curvature(upper, Surface::Upper);
        let kappa_l = outward_curvature(lower, Surface::Lower);
        let slope_u = outward_curvature_slope(upper, Surface::Upper);
        let slope_l = outward_curvature_slope(lower, Surface::Lower);
        Self {
            curvature: 0.5 * (kappa_u + kappa_l),
            curvature_slope: 0.5 * (slope_u - slope_l),
        }
    }

    pub fn slope_for(&self, surface: Surface) -> f64 {
        match surface {
            Surface::Upper => self.curvature_slope,
            Surface::Lower => -self.curvature_slope,
        }
    }
}

/// Leading-edge curvature oriented so a convex nose is positive on both surfaces.
pub fn outward_curvature(curve: &BSplineCurve, surface: Surface) -> f64 {
    -surface.sign() * curve.signed_curvature(0.0)
}

/// Leading-edge `dκ/ds` in the same orientation as [`outward_curvature`].
pub fn outward_curvature_slope(curve: &BSplineCurve, surface: Surface) -> f64 {
    -surface.sign() * curve.curvature_slope(0.0)
}

#[derive(Debug, Clone, PartialEq)]
pub enum Constraint {
    /// `P_index = point`.
    Pin { index: usize, point: Point2<f64> },
    /// `(P_index − origin) × direction = 0`.
    OnLine {
        index: usize,
        origin: Point2<f64>,
        direction: Vector2<f64>,
    },
    /// `direction × (P_to − P_from) = 0`.
    Direction {
        from: usize,
        to: usize,
        direction: Vector2<f64>,
    },
    /// Outward leading-edge curvature equals `target`.
    Curvature { sign: f64, target: f64 },
    /// Outward leading-edge curvature slope equals `target`.
    CurvatureSlope { sign: f64, target: f64 },
}

impl Constraint {
    pub fn is_linear(&self) -> bool {
        !matches!(self, Constraint::Curvature { .. } | Constraint::CurvatureSlope { .. })
    }

    pub fn rows(&self) -> usize {
        match self {
            Constraint::Pin { .. } => 2,
            _ => 1,
        }
    }
}

/// Everything needed to build the constraints of one surface.
#[derive(Debug, Clone)]
pub struct ConstraintRequest<'a> {
    pub surface: Surface,
    pub degree: usize,
    pub knots: &'a KnotVector,
    pub le_direction: Vector2<f64>,
    pub te_point: Point2<f64>,
    pub continuity: &'a ContinuityConfig,
    pub te_tangent: Option<Vector2<f64>>,
    pub le_target: Option<LeadingEdgeTarget>,
}

/// One row of a linear constraint: `Σ coeff · z[index] = rhs`.
#[derive(Debug, Clone)]
struct LinearRow {
    terms: Vec<(usize, f64)>,
    rhs: f64,
}

/// Residual and sparse gradient of one constraint row.
type Row = (f64, Vec<(usize, f64)>);

/// The assembled constraints of one surface.
#[derive(Debug, Clone)]
pub struct ConstraintSet {
    constraints: Vec<Constraint>,
    n: usize,
    /// `stencil[k][i] = N_i^{(k)}(0)` for the first few control points, `k = 0..=3`.
    stencil: Vec<Vec<f64>>,
}

/// Check that the requested continuity fits the curve layout.
///
/// G2 needs degree ≥ 2 and G3 degree ≥ 3. The control points fixed by the
/// leading-edge conditions must also be distinct from the trailing-edge ones.
pub fn check_layout(degree: usize, n: usize, continuity: &ContinuityConfig) -> Result<(), FitError> {
    if continuity.enable_g2 && degree < 2 {
        return Err(FitError::conflict(format!("G2 continuity needs degree >= 2, got {degree}")));
    }
    if continuity.enable_g3 && degree < 3 {
        return Err(FitError::conflict(format!("G3 continuity needs degree >= 3, got {degree}")));
    }

    let le_last = if continuity.enable_g3 {
        3
    } else if continuity.enable_g2 {
        2
    } else {
        1
    };
    let te_count = if continuity.enable_te_tangent { 2 } else { 1 };
    if n < le_last + 1 + te_count {
        return Err(FitError::conflict(format!(
            "{n} control points are too few: the leading edge fixes P0..P{le_last} and the trailing edge fixes the last {te_count}"
        )));
    }
    Ok(())
}

/// Build the constraint set for one surface.
pub fn assemble_constraints(req: &ConstraintRequest<'_>) -> Result<ConstraintSet, FitError> {
    let n = req.knots.control_point_count(req.degree);
    check_layout(req.degree, n, req.continuity)?;

    let direction = req
        .le_direction
        .try_normalize(1e-14)
        .ok_or_else(|| FitError::invalid("leading-edge tangent direction is zero"))?;

    let mut constraints = vec![
        Constraint::Pin {
            index: 0,
            point: Point2::origin(),
        },
        Constraint::OnLine {
            index: 1,
            origin: Point2::origin(),
            direction,
        },
        Constraint::Pin {
            index: n - 1,
            point: req.te_point,
        },
    ];

    if req.continuity.enable_te_tangent {
        let tangent = req
            .te_tangent
            .and_then(|t| t.try_normalize(1e-14))
            .ok_or_else(|| FitError::invalid("trailing-edge tangency requested but no tangent is available"))?;
        constraints.push(Constraint::Direction {
            from: n - 2,
            to: n - 1,
            direction: tangent,
        });
    }

    if req.continuity.is_nonlinear() {
        let target = req.le_target.ok_or_else(|| {
            FitError::invalid("G2/G3 continuity requested without shared leading-edge targets")
        })?;
        let sign = req.surface.sign();
        if req.continuity.enable_g2 {
            constraints.push(Constraint::Curvature {
                sign,
                target: target.curvature,
            });
        }
        if req.continuity.enable_g3 {
            constraints.push(Constraint::CurvatureSlope {
                sign,
                target: target.slope_for(req.surface),
            });
        }
    }

    let width = n.min(4);
    let stencil = basis_derivative_rows(req.knots.values(), req.degree, n, 0.0, 3)
        .into_iter()
        .map(|row| row[..width].to_vec())
        .collect();

    log::debug!(
        "{} surface: {} constraints ({} rows) for {n} control points",
        req.surface.label(),
        constraints.len(),
        constraints.iter().map(Constraint::rows).sum::<usize>()
    );

    Ok(ConstraintSet { constraints, n, stencil })
}

impl ConstraintSet {
    pub fn constraints(&self) -> &[Constraint] {
        &self.constraints
    }

    pub fn control_point_count(&self) -> usize {
        self.n
    }

    pub fn is_nonlinear(&self) -> bool {
        self.constraints.iter().any(|c| !c.is_linear())
    }

    /// `(C, d)` for the linear rows, in constraint order.
    pub fn linear_system(&self) -> (DMatrix<f64>, DVector<f64>) {
        let rows: Vec<LinearRow> = self
            .constraints
            .iter()
            .filter(|c| c.is_linear())
            .flat_map(|c| self.linear_rows(c))
            .collect();

        let mut c = DMatrix::<f64>::zeros(rows.len(), 2 * self.n);
        let mut d = DVector::<f64>::zeros(rows.len());
        for (r, row) in rows.iter().enumerate() {
            for &(j, v) in &row.terms {
                c[(r, j)] += v;
            }
            d[r] = row.rhs;
        }
        (c, d)
    }

    /// `C^{(k)}(0)` for `k = 0..=3`, from the packed unknowns.
    pub fn leading_edge_derivatives(&self, z: &DVector<f64>) -> [Vector2<f64>; 4] {
        let mut out = [Vector2::zeros(); 4];
        for (k, row) in self.stencil.iter().enumerate().take(4) {
            out[k] = row
                .iter()
                .enumerate()
                .fold(Vector2::zeros(), |acc, (i, c)| acc + Vector2::new(z[i], z[self.n + i]) * *c);
        }
        out
    }

    /// Write pinned points exactly and project line-constrained points onto their line.
    pub fn snap(&self, points: &mut [Point2<f64>]) {
        for c in &self.constraints {
            match c {
                Constraint::Pin { index, point } => points[*index] = *point,
                Constraint::OnLine {
                    index,
                    origin,
                    direction,
                } => {
                    let t = (points[*index] - origin).dot(direction) / direction.norm_squared();
                    points[*index] = origin + direction * t;
                }
                _ => {}
            }
        }
    }

    fn linear_rows(&self, c: &Constraint) -> Vec<LinearRow> {
        let n = self.n;
        match *c {
            Constraint::Pin { index, point } => vec![
                LinearRow {
                    terms: vec![(index, 1.0)],
                    rhs: point.x,
                },
                LinearRow {
                    terms: vec![(n + index, 1.0)],
                    rhs: point.y,
                },
            ],
            Constraint::OnLine {
                index,
                origin,
                direction: d,
            } => vec![LinearRow {
                terms: vec![(index, -d.y), (n + index, d.x)],
                rhs: d.x * origin.y - d.y * origin.x,
            }],
            Constraint::Direction { from, to, direction: t } => vec![LinearRow {
                terms: vec![(to, -t.y), (from, t.y), (n + to, t.x), (n + from, -t.x)],
                rhs: 0.0,
            }],
            Constraint::Curvature { .. } | Constraint::CurvatureSlope { .. } => Vec::new(),
        }
    }

    /// Residuals and gradients of every row, in constraint order.
    fn rows_at(&self, z: &DVector<f64>) -> Vec<Row> {
        let mut out = Vec::new();
        let mut d: Option<[Vector2<f64>; 4]> = None;

        for c in &self.constraints {
            match *c {
                Constraint::Curvature { sign, target } => {
                    let [_, d1, d2, _] = *d.get_or_insert_with(|| self.leading_edge_derivatives(z));
                    let speed = d1.norm();
                    let residual = -sign * cross(&d1, &d2) - target * speed * speed * speed;
                    let g1 = -sign * Vector2::new(d2.y, -d2.x) - d1 * (3.0 * target * speed);
                    let g2 = -sign * Vector2::new(-d1.y, d1.x);
                    out.push((residual, self.chain(&[Vector2::zeros(), g1, g2, Vector2::zeros()])));
                }
                Constraint::CurvatureSlope { sign, target } => {
                    let [_, d1, d2, d3] = *d.get_or_insert_with(|| self.leading_edge_derivatives(z));
                    let r2 = d1.norm_squared();
                    let e = cross(&d1, &d3);
                    let cr = cross(&d1, &d2);
                    let dot = d1.dot(&d2);
                    let f = e * r2 - 3.0 * cr * dot;
                    let residual = -sign * f - target * r2 * r2 * r2;

                    let df1 = Vector2::new(d3.y, -d3.x) * r2 + d1 * (2.0 * e)
                        - (Vector2::new(d2.y, -d2.x) * dot + d2 * cr) * 3.0;
                    let df2 = -(Vector2::new(-d1.y, d1.x) * dot + d1 * cr) * 3.0;
                    let df3 = Vector2::new(-d1.y, d1.x) * r2;

                    let g1 = -sign * df1 - d1 * (6.0 * target * r2 * r2);
                    let g2 = -sign * df2;
                    let g3 = -sign * df3;
                    out.push((residual, self.chain(&[Vector2::zeros(), g1, g2, g3])));
                }
                _ => {
                    for row in self.linear_rows(c) {
                        let value: f64 = row.terms.iter().map(|&(j, v)| v * z[j]).sum();
                        out.push((value - row.rhs, row.terms));
                    }
                }
            }
        }
        out
    }

    /// Map gradients with respect to `d_k` onto the control-point unknowns.
    fn chain(&self, grads: &[Vector2<f64>; 4]) -> Vec<(usize, f64)> {
        let width = self.stencil.first().map_or(0, Vec::len);
        let mut terms = Vec::with_capacity(2 * width);
        for i in 0..width {
            let mut gx = 0.0;
            let mut gy = 0.0;
            for (k, g) in grads.iter().enumerate() {
                let c = self.stencil.get(k).map_or(0.0, |row| row[i]);
                gx += c * g.x;
                gy += c * g.y;
            }
            terms.push((i, gx));
            terms.push((self.n + i, gy));
        }
        terms
    }
}

impl EqualityConstraints for ConstraintSet {
    fn len(&self) -> usize {
        self.constraints.iter().map(Constraint::rows).sum()
    }

    fn residuals(&self, z: &DVector<f64>) -> DVector<f64> {
        let rows = self.rows_at(z);
        DVector::from_iterator(rows.len(), rows.into_iter().map(|(r, _)| r))
    }

    fn jacobian(&self, z: &DVector<f64>) -> DMatrix<f64> {
        let rows = self.rows_at(z);
        let mut j = DMatrix::<f64>::zeros(rows.len(), 2 * self.n);
        for (r, (_, terms)) in rows.iter().enumerate() {
            for &(col, v) in terms {
                j[(r, col)] += v;
            }
        }
        j
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::uniform_clamped_knots;

    fn continuity(g2: bool, g3: bool, te: bool) -> ContinuityConfig {
        ContinuityConfig {
            enable_g2: g2,
            enable_g3: g3,
            enable_te_tangent: te,
            smoothness_weight: 0.0,
        }
    }

    fn request<'a>(knots: &'a KnotVector, cont: &'a ContinuityConfig) -> ConstraintRequest<'a> {
        ConstraintRequest {
            surface: Surface::Upper,
            degree: 4,
            knots,
            le_direction: Vector2::y(),
            te_point: Point2::new(1.0, 0.0),
            continuity: cont,
            te_tangent: Some(Vector2::new(1.0, -0.1)),
            le_target: Some(LeadingEdgeTarget {
                curvature: 40.0,
                curvature_slope: 150.0,
            }),
        }
    }

    fn sample_z(n: usize) -> DVector<f64> {
        let xs: Vec<f64> = (0..n).map(|i| (i as f64 / (n - 1) as f64).powi(2) + 0.01 * i as f64).collect();
        let ys: Vec<f64> = (0..n).map(|i| 0.08 * (1.0 + (i as f64 * 0.7).sin())).collect();
        DVector::from_iterator(2 * n, xs.into_iter().chain(ys))
    }

    #[test]
    fn base_constraints_are_always_present() {
        let knots = uniform_clamped_knots(4, 9).unwrap();
        let cont = continuity(false, false, false);
        let set = assemble_constraints(&request(&knots, &cont)).unwrap();
        assert_eq!(set.constraints().len(), 3);
        assert_eq!(set.len(), 5);
        assert!(!set.is_nonlinear());
    }

    #[test]
    fn degree_too_low_for_g3_conflicts() {
        let knots = uniform_clamped_knots(2, 9).unwrap();
        let cont = continuity(false, true, false);
        let req = ConstraintRequest {
            degree: 2,
            ..request(&knots, &cont)
        };
        assert!(matches!(assemble_constraints(&req), Err(FitError::ConstraintConflict(_))));
    }

    #[test]
    fn overlapping_end_conditions_conflict() {
        // G3 fixes P0..P3 and TE tangency fixes the last two points.
        assert!(check_layout(4, 5, &continuity(true, true, true)).is_err());
        assert!(check_layout(4, 6, &continuity(true, true, true)).is_ok());
        assert!(check_layout(1, 3, &continuity(false, false, false)).is_ok());
        assert!(check_layout(1, 2, &continuity(false, false, false)).is_err());
    }

    #[test]
    fn jacobian_matches_finite_differences() {
        let knots = uniform_clamped_knots(4, 9).unwrap();
        let cont = continuity(true, true, true);
        let set = assemble_constraints(&request(&knots, &cont)).unwrap();
        let z = sample_z(9);

        let j = set.jacobian(&z);
        let base = set.residuals(&z);
        for col in 0..z.len() {
            let h = 1e-6;
            let mut zp = z.clone();
            zp[col] += h;
            let mut zm = z.clone();
            zm[col] -= h;
            let fd = (set.residuals(&zp) - set.residuals(&zm)) / (2.0 * h);
            for row in 0..base.len() {
                let scale = 1.0 + j.row(row).amax();
                assert!(
                    (fd[row] - j[(row, col)]).abs() < 1e-5 * scale,
                    "row {row} col {col}: fd={} analytic={}",
                    fd[row],
                    j[(row, col)]
                );
            }
        }
    }

    #[test]
    fn curvature_residual_vanishes_on_target() {
        let knots = uniform_clamped_knots(4, 9).unwrap();
        let z = sample_z(9);
        let pts: Vec<_> = (0..9).map(|i| Point2::new(z[i], z[9 + i])).collect();
        let curve = BSplineCurve::new(4, knots.clone(), crate::domain::ControlPolygon::new(pts)).unwrap();
        let cont = continuity(true, true, false);
        let target = LeadingEdgeTarget {
            curvature: outward_curvature(&curve, Surface::Upper),
            curvature_slope: outward_curvature_slope(&curve, Surface::Upper),
        };
        let req = ConstraintRequest {
            le_target: Some(target),
            ..request(&knots, &cont)
        };
        let set = assemble_constraints(&req).unwrap();
        let r = set.residuals(&z);
        // The last two rows are G2 and G3.
        let n = r.len();
        assert!(r[n - 2].abs() < 1e-9 * (1.0 + target.curvature.abs()));
        assert!(r[n - 1].abs() < 1e-6 * (1.0 + target.curvature_slope.abs()));
    }

    #[test]
    fn snap_enforces_pins_and_line() {
        let knots = uniform_clamped_knots(3, 6).unwrap();
        let cont = continuity(false, false, false);
        let req = ConstraintRequest {
            degree: 3,
            te_point: Point2::new(1.0, 0.002),
            ..request(&knots, &cont)
        };
        let set = assemble_constraints(&req).unwrap();
        let mut pts = vec![
            Point2::new(1e-9, -1e-9),
            Point2::new(3e-10, 0.03),
            Point2::new(0.2, 0.06),
            Point2::new(0.5, 0.05),
            Point2::new(0.8, 0.02),
            Point2::new(1.0 + 1e-10, 0.002),
        ];
        set.snap(&mut pts);
        assert_eq!(pts[0], Point2::origin());
        assert_eq!(pts[1].x, 0.0);
        assert_eq!(pts[5], Point2::new(1.0, 0.002));
    }

    #[test]
    fn symmetric_seeds_give_zero_slope_target() {
        let knots = uniform_clamped_knots(4, 9).unwrap();
        let z = sample_z(9);
        let pts: Vec<_> = (0..9).map(|i| Point2::new(z[i], z[9 + i])).collect();
        let upper = BSplineCurve::new(4, knots, crate::domain::ControlPolygon::new(pts)).unwrap();
        let lower = upper.mirrored();
        let target = LeadingEdgeTarget::from_seeds(&upper, &lower);
        assert!((target.curvature - outward_curvature(&upper, Surface::Upper)).abs() < 1e-9);
        assert!(target.curvature_slope.abs() < 1e-9 * (1.0 + outward_curvature_slope(&upper, Surface::Upper).abs()));
    }
}
