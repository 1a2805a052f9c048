//! Adaptive refinement.
//!
//! Each refinement adds exactly one control point to one surface, either by
//! inserting a knot where the fit deviates most or, for single-span curves,
//! by raising the degree. Both operations keep the curve's shape, so the
//! refined polygon still satisfies every constraint and is used as the SQP
//! starting point when the surface is re-fitted on the new layout.

use crate::curve::BSplineCurve;
use crate::domain::FitConfig;
use crate::error::FitError;
use crate::fit::fitter::FittedCurve;
use crate::report::DeviationReport;

/// Spans narrower than this are not split; the wider neighbour is used instead.
pub const MIN_SPAN_WIDTH: f64 = 1e-4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RefineStrategy {
    /// Insert a knot at the midpoint of the span with the worst deviation.
    #[default]
    InsertKnot,
    /// Raise the degree of a single-span curve by one.
    ElevateDegree,
}

/// A refined surface before it is re-fitted: same shape, one more control point.
#[derive(Debug, Clone)]
pub struct RefinedLayout {
    pub curve: BSplineCurve,
    pub inserted_knot: Option<f64>,
}

/// Summary of one refinement step.
#[derive(Debug, Clone, PartialEq)]
pub struct RefineOutcome {
    pub strategy: RefineStrategy,
    pub inserted_knot: Option<f64>,
    pub degree: usize,
    pub control_points: usize,
    pub max_before: f64,
    pub max_after: f64,
}

/// New knot for a deviation peak at parameter `u`.
pub fn insertion_knot(curve: &BSplineCurve, u: f64) -> f64 {
    let (a, b) = curve.span_bounds(u);
    if b - a >= MIN_SPAN_WIDTH {
        return 0.5 * (a + b);
    }

    let mut distinct: Vec<f64> = curve.knots().values().to_vec();
    distinct.dedup_by(|x, y| (*x - *y).abs() < 1e-12);

    let pos = distinct.iter().position(|k| (k - a).abs() < 1e-12).unwrap_or(0);
    let left = (pos > 0).then(|| (distinct[pos - 1], a));
    let right = distinct.get(pos + 2).map(|&next| (b, next));

    let (lo, hi) = match (left, right) {
        (Some(l), Some(r)) => {
            if l.1 - l.0 >= r.1 - r.0 {
                l
            } else {
                r
            }
        }
        (Some(l), None) => l,
        (None, Some(r)) => r,
        (None, None) => (a, b),
    };
    0.5 * (lo + hi)
}

/// Work out the layout of the refined surface.
///
/// Fails with [`FitError::RefinementLimit`] when the new control-point count
/// exceeds `config.max_control_points` (or the new degree exceeds
/// `config.max_degree`), and with [`FitError::InvalidInput`] when degree
/// elevation is asked of a multi-span curve.
pub fn refined_layout(
    fitted: &FittedCurve,
    report: &DeviationReport,
    strategy: RefineStrategy,
    config: &FitConfig,
) -> Result<RefinedLayout, FitError> {
    let curve = &fitted.curve;
    let next_count = curve.control_point_count() + 1;
    if next_count > config.max_control_points {
        return Err(FitError::RefinementLimit(format!(
            "{} surface already has {} control points (limit {})",
            fitted.surface.label(),
            curve.control_point_count(),
            config.max_control_points
        )));
    }

    let (refined, inserted_knot) = match strategy {
        RefineStrategy::InsertKnot => {
            let knot = insertion_knot(curve, report.max_parameter);
            log::debug!(
                "{} surface: max deviation {:.3e} at u={:.6}, inserting knot {knot:.6}",
                fitted.surface.label(),
                report.max,
                report.max_parameter
            );
            (curve.insert_knot(knot)?, Some(knot))
        }
        RefineStrategy::ElevateDegree => {
            if curve.degree() + 1 > config.max_degree {
                return Err(FitError::RefinementLimit(format!(
                    "{} surface is already degree {} (limit {})",
                    fitted.surface.label(),
                    curve.degree(),
                    config.max_degree
                )));
            }
            (curve.elevate_degree()?, None)
        }
    };

    if refined.control_point_count() <= refined.degree() {
        return Err(FitError::RefinementLimit(format!(
            "{} control points cannot carry degree {}",
            refined.control_point_count(),
            refined.degree()
        )));
    }
    Ok(RefinedLayout {
        curve: refined,
        inserted_knot,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ControlPolygon, KnotVector};
    use nalgebra::Point2;

    fn curve_with_knots(knots: Vec<f64>) -> BSplineCurve {
        let degree = 2;
        let n = knots.len() - degree - 1;
        let pts = (0..n).map(|i| Point2::new(i as f64, 0.0)).collect();
        BSplineCurve::new(degree, KnotVector::try_from_vec(knots, degree).unwrap(), ControlPolygon::new(pts)).unwrap()
    }

    #[test]
    fn knot_goes_to_span_midpoint() {
        let c = curve_with_knots(vec![0.0, 0.0, 0.0, 0.5, 1.0, 1.0, 1.0]);
        assert!((insertion_knot(&c, 0.7) - 0.75).abs() < 1e-15);
        assert!((insertion_knot(&c, 0.1) - 0.25).abs() < 1e-15);
    }

    #[test]
    fn narrow_span_defers_to_wider_neighbour() {
        let c = curve_with_knots(vec![0.0, 0.0, 0.0, 0.3, 0.30005, 0.8, 1.0, 1.0, 1.0]);
        // The span [0.3, 0.30005) is too narrow; the right neighbour [0.30005, 0.8) is wider.
        let k = insertion_knot(&c, 0.30002);
        assert!((k - 0.550025).abs() < 1e-12);
    }
}
