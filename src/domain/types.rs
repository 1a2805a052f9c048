//! Shared domain types.
//!
//! These types are intentionally small newtypes over `Vec`s of `nalgebra`
//! points and scalars so that the invariants of each stage (normalized
//! points, clamped knots, parameter values) have a name in signatures.

use nalgebra::{Point2, Vector2};

use crate::domain::Settings;
use crate::math::SqpOptions;

/// Which airfoil surface a curve belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Surface {
    Upper,
    Lower,
}

impl Surface {
    /// Direction of "outward" from the chord line: `+1` for upper, `-1` for lower.
    ///
    /// Used for the thickening offset sign and to orient leading-edge curvature so
    /// that a convex nose has positive curvature on both sides.
    pub fn sign(self) -> f64 {
        match self {
            Surface::Upper => 1.0,
            Surface::Lower => -1.0,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Surface::Upper => "upper",
            Surface::Lower => "lower",
        }
    }

    pub fn other(self) -> Surface {
        match self {
            Surface::Upper => Surface::Lower,
            Surface::Lower => Surface::Upper,
        }
    }
}

/// Ordered points of one surface, leading edge first.
///
/// Expected to be normalized to unit chord with the leading edge at the origin
/// and the trailing edge at `x = 1`. Validation happens in the parameterizer,
/// which is the first stage that depends on it.
#[derive(Debug, Clone, PartialEq)]
pub struct SurfacePoints(Vec<Point2<f64>>);

impl SurfacePoints {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self(points)
    }

    pub fn from_xy(xy: &[(f64, f64)]) -> Self {
        Self(xy.iter().map(|&(x, y)| Point2::new(x, y)).collect())
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn first(&self) -> Option<Point2<f64>> {
        self.0.first().copied()
    }

    pub fn last(&self) -> Option<Point2<f64>> {
        self.0.last().copied()
    }

    /// Mirror about the chord line (`y -> -y`).
    pub fn mirrored(&self) -> Self {
        Self(self.0.iter().map(|p| Point2::new(p.x, -p.y)).collect())
    }

    /// Estimate the trailing-edge tangent from the last `count` points.
    ///
    /// The direction runs from `points[len - count]` to the final point, so it
    /// points out of the trailing edge. Returns `None` when there are not
    /// enough points or the chord of that window is degenerate.
    pub fn trailing_edge_tangent(&self, count: usize) -> Option<Vector2<f64>> {
        let count = count.max(2);
        if self.0.len() < count {
            return None;
        }
        let start = self.0[self.0.len() - count];
        let end = self.0[self.0.len() - 1];
        (end - start).try_normalize(1e-12)
    }
}

/// Parameter values `u_i ∈ [0, 1]`, one per source point.
#[derive(Debug, Clone, PartialEq)]
pub struct ParameterSet(Vec<f64>);

impl ParameterSet {
    pub(crate) fn new(values: Vec<f64>) -> Self {
        Self(values)
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A clamped, non-decreasing knot vector on `[0, 1]`.
#[derive(Debug, Clone, PartialEq)]
pub struct KnotVector(Vec<f64>);

impl KnotVector {
    pub(crate) fn new(knots: Vec<f64>) -> Self {
        Self(knots)
    }

    /// Wrap externally supplied knots (e.g. from a `.bsp` file) after checking
    /// they are non-decreasing and long enough for `degree`.
    pub fn try_from_vec(knots: Vec<f64>, degree: usize) -> Option<Self> {
        if degree < 1 || knots.len() < 2 * (degree + 1) {
            return None;
        }
        if knots.iter().any(|k| !k.is_finite()) || knots.windows(2).any(|w| w[1] < w[0]) {
            return None;
        }
        Some(Self(knots))
    }

    pub fn values(&self) -> &[f64] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of control points this knot vector supports for `degree`.
    pub fn control_point_count(&self, degree: usize) -> usize {
        self.0.len().saturating_sub(degree + 1)
    }

    /// Distinct interior knots (excludes the clamped end values).
    pub fn interior(&self, degree: usize) -> &[f64] {
        let n = self.0.len();
        if n <= 2 * (degree + 1) {
            return &[];
        }
        &self.0[degree + 1..n - degree - 1]
    }
}

/// Ordered control points of one curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlPolygon(Vec<Point2<f64>>);

impl ControlPolygon {
    pub fn new(points: Vec<Point2<f64>>) -> Self {
        Self(points)
    }

    pub fn points(&self) -> &[Point2<f64>] {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Which continuity constraints a fit enforces, and how smooth it is.
///
/// G1 (shared leading-edge tangent) and end-point pinning are always on.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ContinuityConfig {
    pub enable_g2: bool,
    pub enable_g3: bool,
    pub enable_te_tangent: bool,
    /// Weight of the roughness penalty (`>= 0`).
    pub smoothness_weight: f64,
}

impl ContinuityConfig {
    /// Whether any nonlinear (curvature) constraint is requested.
    pub fn is_nonlinear(&self) -> bool {
        self.enable_g2 || self.enable_g3
    }

    /// The same configuration with the curvature constraints switched off.
    pub fn linear_part(&self) -> Self {
        Self {
            enable_g2: false,
            enable_g3: false,
            ..*self
        }
    }
}

impl Default for ContinuityConfig {
    fn default() -> Self {
        Self {
            enable_g2: false,
            enable_g3: false,
            enable_te_tangent: false,
            smoothness_weight: 0.0,
        }
    }
}

/// Everything an engine call needs, passed explicitly.
///
/// This is derived from [`Settings`] (plus CLI overrides in the binary).
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub degree: usize,
    /// Initial control-point count per surface.
    pub control_points: usize,
    pub continuity: ContinuityConfig,
    /// How many trailing samples define the trailing-edge tangent.
    pub te_vector_points: usize,
    /// Refinement never grows a surface beyond this many control points.
    pub max_control_points: usize,
    /// Degree elevation never goes beyond this degree.
    pub max_degree: usize,
    /// Dense sample count for deviation analysis.
    pub deviation_samples: usize,
    /// Samples per surface taken before a thickening re-fit.
    pub thickening_samples: usize,
    pub solver: SqpOptions,
}

impl FitConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            degree: settings.bspline_degree,
            control_points: settings.bspline_control_points,
            continuity: ContinuityConfig {
                smoothness_weight: settings.smoothness_penalty,
                ..ContinuityConfig::default()
            },
            te_vector_points: settings.te_vector_points,
            max_control_points: settings.max_control_points,
            max_degree: settings.max_bspline_degree,
            deviation_samples: settings.num_points_curve_error,
            thickening_samples: settings.plot_points_per_surface,
            solver: settings.solver_options(),
        }
    }
}

impl Default for FitConfig {
    fn default() -> Self {
        Self::from_settings(&Settings::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_edge_tangent_uses_last_window() {
        let pts = SurfacePoints::from_xy(&[(0.0, 0.0), (0.5, 0.05), (0.9, 0.02), (1.0, 0.0)]);
        let t = pts.trailing_edge_tangent(2).unwrap();
        assert!(t.x > 0.0 && t.y < 0.0);
        assert!((t.norm() - 1.0).abs() < 1e-12);
        assert!(pts.trailing_edge_tangent(5).is_none());
    }

    #[test]
    fn knot_vector_rejects_decreasing_values() {
        assert!(KnotVector::try_from_vec(vec![0.0, 0.0, 0.5, 0.4, 1.0, 1.0], 1).is_none());
        assert!(KnotVector::try_from_vec(vec![0.0, 0.0, 0.4, 1.0, 1.0], 1).is_some());
    }

    #[test]
    fn interior_knots_exclude_clamped_ends() {
        let kv = KnotVector::new(vec![0.0, 0.0, 0.0, 0.25, 0.75, 1.0, 1.0, 1.0]);
        assert_eq!(kv.interior(2), &[0.25, 0.75]);
        assert_eq!(kv.control_point_count(2), 5);
    }
}
