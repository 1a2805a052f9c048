//! Clamped planar B-spline curves.
//!
//! The curve owns its degree, knot vector and control polygon, and exposes
//! the primitive operations everything else is built on:
//!
//! - `evaluate(u)` and `derivatives(u, k)`
//! - signed curvature and its arc-length derivative
//! - shape-preserving knot insertion and (single-span) degree elevation

use nalgebra::{Point2, Vector2};

use crate::domain::{ControlPolygon, KnotVector};
use crate::error::FitError;
use crate::math::{basis_funs, ders_basis_funs, find_span};

/// Knot values closer than this are treated as equal.
const KNOT_EPS: f64 = 1e-12;

#[derive(Debug, Clone, PartialEq)]
pub struct BSplineCurve {
    degree: usize,
    knots: KnotVector,
    control: ControlPolygon,
}

impl BSplineCurve {
    /// Build a curve after checking `knots.len() == n + degree + 1` and `n > degree`.
    pub fn new(degree: usize, knots: KnotVector, control: ControlPolygon) -> Result<Self, FitError> {
        if degree < 1 {
            return Err(FitError::invalid("curve degree must be at least 1"));
        }
        let n = control.len();
        if n <= degree {
            return Err(FitError::invalid(format!(
                "{n} control points cannot carry a degree {degree} curve"
            )));
        }
        if knots.len() != n + degree + 1 {
            return Err(FitError::invalid(format!(
                "knot vector has {} entries, expected {} for {n} control points of degree {degree}",
                knots.len(),
                n + degree + 1
            )));
        }
        Ok(Self { degree, knots, control })
    }

    pub fn degree(&self) -> usize {
        self.degree
    }

    pub fn knots(&self) -> &KnotVector {
        &self.knots
    }

    pub fn control_polygon(&self) -> &ControlPolygon {
        &self.control
    }

    pub fn control_points(&self) -> &[Point2<f64>] {
        self.control.points()
    }

    pub fn control_point_count(&self) -> usize {
        self.control.len()
    }

    /// Point on the curve at `u ∈ [0, 1]` (clamped).
    pub fn evaluate(&self, u: f64) -> Point2<f64> {
        let u = u.clamp(0.0, 1.0);
        let knots = self.knots.values();
        let n = self.control.len();
        let span = find_span(knots, self.degree, n, u);
        let basis = basis_funs(knots, self.degree, span, u);

        let pts = self.control.points();
        let mut acc = Vector2::zeros();
        for (j, b) in basis.iter().enumerate() {
            acc += pts[span - self.degree + j].coords * *b;
        }
        Point2::from(acc)
    }

    /// `C(u), C'(u), ..., C^{(order)}(u)` as vectors.
    ///
    /// Derivatives above the degree are zero.
    pub fn derivatives(&self, u: f64, order: usize) -> Vec<Vector2<f64>> {
        let u = u.clamp(0.0, 1.0);
        let knots = self.knots.values();
        let n = self.control.len();
        let span = find_span(knots, self.degree, n, u);
        let ders = ders_basis_funs(knots, self.degree, span, u, order);

        let pts = self.control.points();
        ders.iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .fold(Vector2::zeros(), |acc, (j, b)| acc + pts[span - self.degree + j].coords * *b)
            })
            .collect()
    }

    /// Unit tangent at `u`, or `None` where the first derivative vanishes.
    pub fn tangent(&self, u: f64) -> Option<Vector2<f64>> {
        self.derivatives(u, 1)[1].try_normalize(1e-14)
    }

    /// Signed curvature `κ = (C' × C'') / |C'|³` (positive when turning left).
    pub fn signed_curvature(&self, u: f64) -> f64 {
        let d = self.derivatives(u, 2);
        curvature_of(&d[1], &d[2])
    }

    /// Arc-length derivative of the signed curvature, `dκ/ds`.
    pub fn curvature_slope(&self, u: f64) -> f64 {
        let d = self.derivatives(u, 3);
        curvature_slope_of(&d[1], &d[2], &d[3])
    }

    /// `count` points at uniformly spaced parameters on `[0, 1]`.
    pub fn sample(&self, count: usize) -> Vec<Point2<f64>> {
        uniform_parameters(count).into_iter().map(|u| self.evaluate(u)).collect()
    }

    /// Number of non-empty knot spans.
    pub fn span_count(&self) -> usize {
        self.knots.values().windows(2).filter(|w| w[1] - w[0] > KNOT_EPS).count()
    }

    pub fn is_single_span(&self) -> bool {
        self.span_count() == 1
    }

    /// Bounds `[U[i], U[i+1])` of the knot span containing `u`.
    pub fn span_bounds(&self, u: f64) -> (f64, f64) {
        let knots = self.knots.values();
        let span = find_span(knots, self.degree, self.control.len(), u.clamp(0.0, 1.0));
        (knots[span], knots[span + 1])
    }

    /// Insert one knot at `u` (Boehm's algorithm); the curve shape is unchanged.
    pub fn insert_knot(&self, u: f64) -> Result<Self, FitError> {
        let knots = self.knots.values();
        let p = self.degree;
        if !(u > KNOT_EPS && u < 1.0 - KNOT_EPS) {
            return Err(FitError::invalid(format!("knot {u} is not strictly inside (0, 1)")));
        }
        let multiplicity = knots.iter().filter(|k| (*k - u).abs() < KNOT_EPS).count();
        if multiplicity >= p {
            return Err(FitError::invalid(format!(
                "knot {u} already has multiplicity {multiplicity} for degree {p}"
            )));
        }

        let pts = self.control.points();
        let n = pts.len();
        let k = find_span(knots, p, n, u);

        let mut new_knots = Vec::with_capacity(knots.len() + 1);
        new_knots.extend_from_slice(&knots[..=k]);
        new_knots.push(u);
        new_knots.extend_from_slice(&knots[k + 1..]);

        let mut new_pts = Vec::with_capacity(n + 1);
        new_pts.extend_from_slice(&pts[..=k - p]);
        for i in (k - p + 1)..=k {
            let alpha = (u - knots[i]) / (knots[i + p] - knots[i]);
            new_pts.push(Point2::from(pts[i - 1].coords * (1.0 - alpha) + pts[i].coords * alpha));
        }
        new_pts.extend_from_slice(&pts[k..]);

        Self::new(p, KnotVector::new(new_knots), ControlPolygon::new(new_pts))
    }

    /// Raise the degree of a single-span (Bézier) curve by one.
    ///
    /// The shape is unchanged and the control polygon grows by one point.
    pub fn elevate_degree(&self) -> Result<Self, FitError> {
        if !self.is_single_span() {
            return Err(FitError::invalid(format!(
                "degree elevation needs a single-span curve, this one has {} spans",
                self.span_count()
            )));
        }

        let p = self.degree;
        let pts = self.control.points();
        let q = p + 1;

        let mut new_pts = Vec::with_capacity(q + 1);
        new_pts.push(pts[0]);
        for i in 1..q {
            let a = i as f64 / q as f64;
            new_pts.push(Point2::from(pts[i - 1].coords * a + pts[i].coords * (1.0 - a)));
        }
        new_pts.push(pts[p]);

        let mut knots = vec![0.0; q + 1];
        knots.extend(std::iter::repeat_n(1.0, q + 1));

        Self::new(q, KnotVector::new(knots), ControlPolygon::new(new_pts))
    }

    /// Mirror about the chord line.
    pub fn mirrored(&self) -> Self {
        Self {
            degree: self.degree,
            knots: self.knots.clone(),
            control: ControlPolygon::new(self.control.points().iter().map(|p| Point2::new(p.x, -p.y)).collect()),
        }
    }
}

/// 2-D cross product `a × b`.
pub fn cross(a: &Vector2<f64>, b: &Vector2<f64>) -> f64 {
    a.x * b.y - a.y * b.x
}

/// Signed curvature from the first two derivatives.
pub fn curvature_of(d1: &Vector2<f64>, d2: &Vector2<f64>) -> f64 {
    let speed = d1.norm();
    if speed < 1e-300 {
        return 0.0;
    }
    cross(d1, d2) / (speed * speed * speed)
}

/// `dκ/ds = (E·r² − 3·C·D) / r⁶` with `E = d1×d3`, `C = d1×d2`, `D = d1·d2`, `r² = |d1|²`.
pub fn curvature_slope_of(d1: &Vector2<f64>, d2: &Vector2<f64>, d3: &Vector2<f64>) -> f64 {
    let r2 = d1.norm_squared();
    if r2 < 1e-300 {
        return 0.0;
    }
    let e = cross(d1, d3);
    let c = cross(d1, d2);
    let dot = d1.dot(d2);
    (e * r2 - 3.0 * c * dot) / (r2 * r2 * r2)
}

/// `count` uniformly spaced parameters on `[0, 1]`, both ends included.
pub fn uniform_parameters(count: usize) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..count).map(|i| i as f64 / (count - 1) as f64).collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cubic() -> BSplineCurve {
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 0.0, 0.3, 0.6, 1.0, 1.0, 1.0, 1.0]);
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.05),
            Point2::new(0.2, 0.09),
            Point2::new(0.5, 0.08),
            Point2::new(0.8, 0.04),
            Point2::new(1.0, 0.0),
        ];
        BSplineCurve::new(3, knots, ControlPolygon::new(pts)).unwrap()
    }

    #[test]
    fn clamped_curve_interpolates_end_points() {
        let c = cubic();
        assert!((c.evaluate(0.0) - Point2::new(0.0, 0.0)).norm() < 1e-15);
        assert!((c.evaluate(1.0) - Point2::new(1.0, 0.0)).norm() < 1e-15);
    }

    #[test]
    fn rejects_mismatched_knot_length() {
        let knots = KnotVector::new(vec![0.0, 0.0, 1.0, 1.0]);
        let pts = ControlPolygon::new(vec![Point2::origin(), Point2::new(1.0, 0.0), Point2::new(2.0, 0.0)]);
        assert!(BSplineCurve::new(1, knots, pts).is_err());
    }

    #[test]
    fn quadratic_bezier_curvature_at_start() {
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
        let pts = vec![Point2::new(0.0, 0.0), Point2::new(1.0, 1.0), Point2::new(2.0, 0.0)];
        let c = BSplineCurve::new(2, knots, ControlPolygon::new(pts)).unwrap();
        let expected = -8.0 / 8.0_f64.powf(1.5);
        assert!((c.signed_curvature(0.0) - expected).abs() < 1e-12);
    }

    #[test]
    fn curvature_slope_matches_finite_difference() {
        let c = cubic();
        let h = 1e-5;
        for &u in &[0.1, 0.45, 0.8] {
            let speed = c.derivatives(u, 1)[1].norm();
            let fd = (c.signed_curvature(u + h) - c.signed_curvature(u - h)) / (2.0 * h * speed);
            let analytic = c.curvature_slope(u);
            assert!(
                (fd - analytic).abs() < 1e-4 * (1.0 + analytic.abs()),
                "u={u}: fd={fd} analytic={analytic}"
            );
        }
    }

    #[test]
    fn knot_insertion_preserves_shape() {
        let c = cubic();
        let refined = c.insert_knot(0.45).unwrap();
        assert_eq!(refined.control_point_count(), c.control_point_count() + 1);
        assert_eq!(refined.knots().len(), c.knots().len() + 1);
        for i in 0..=100 {
            let u = i as f64 / 100.0;
            assert!((refined.evaluate(u) - c.evaluate(u)).norm() < 1e-12, "u={u}");
        }
    }

    #[test]
    fn knot_insertion_rejects_end_values() {
        assert!(cubic().insert_knot(0.0).is_err());
        assert!(cubic().insert_knot(1.0).is_err());
    }

    #[test]
    fn degree_elevation_preserves_shape() {
        let knots = KnotVector::new(vec![0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
        let pts = vec![
            Point2::new(0.0, 0.0),
            Point2::new(0.0, 0.1),
            Point2::new(0.6, 0.1),
            Point2::new(1.0, 0.0),
        ];
        let c = BSplineCurve::new(3, knots, ControlPolygon::new(pts)).unwrap();
        let e = c.elevate_degree().unwrap();
        assert_eq!(e.degree(), 4);
        assert_eq!(e.control_point_count(), 5);
        for i in 0..=50 {
            let u = i as f64 / 50.0;
            assert!((e.evaluate(u) - c.evaluate(u)).norm() < 1e-12);
        }
    }

    #[test]
    fn degree_elevation_requires_single_span() {
        assert!(matches!(cubic().elevate_degree(), Err(FitError::InvalidInput(_))));
    }

    #[test]
    fn mirrored_curve_flips_curvature() {
        let c = cubic();
        let m = c.mirrored();
        assert!((c.signed_curvature(0.3) + m.signed_curvature(0.3)).abs() < 1e-12);
    }
}
