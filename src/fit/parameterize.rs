//! Parameter values for surface points.
//!
//! Airfoil points cluster near the leading edge, where curvature is highest.
//! Using `u = sqrt(x)` spreads that region over a larger share of the
//! parameter range, so uniform knots resolve the nose without extra spans.

use crate::domain::{ParameterSet, SurfacePoints};
use crate::error::FitError;

/// Allowed distance of the end points from their normalized positions.
pub const NORMALIZATION_TOL: f64 = 1e-6;

/// Map each point to `u = sqrt(x)`, clamped to `[0, 1]`.
///
/// Requires at least two finite points, non-decreasing `x`, the first point at
/// the origin and the last at `x = 1`.
pub fn parameterize(points: &SurfacePoints) -> Result<ParameterSet, FitError> {
    let pts = points.points();
    if pts.len() < 2 {
        return Err(FitError::invalid(format!(
            "need at least 2 points to parameterize a surface, got {}",
            pts.len()
        )));
    }
    if let Some(i) = pts.iter().position(|p| !p.x.is_finite() || !p.y.is_finite()) {
        return Err(FitError::invalid(format!("point {i} is not finite")));
    }
    if let Some(i) = pts.windows(2).position(|w| w[1].x < w[0].x) {
        return Err(FitError::invalid(format!(
            "x must be non-decreasing from the leading edge (x[{}] = {} > x[{}] = {})",
            i,
            pts[i].x,
            i + 1,
            pts[i + 1].x
        )));
    }

    let first = pts[0];
    let last = pts[pts.len() - 1];
    if first.x.abs() > NORMALIZATION_TOL || first.y.abs() > NORMALIZATION_TOL {
        return Err(FitError::invalid(format!(
            "data is not normalized: leading edge at ({}, {}) instead of the origin",
            first.x, first.y
        )));
    }
    if (last.x - 1.0).abs() > NORMALIZATION_TOL {
        return Err(FitError::invalid(format!(
            "data is not normalized: trailing edge at x = {} instead of 1",
            last.x
        )));
    }

    let n = pts.len();
    let values = pts
        .iter()
        .enumerate()
        .map(|(i, p)| match i {
            0 => 0.0,
            _ if i == n - 1 => 1.0,
            _ => p.x.clamp(0.0, 1.0).sqrt(),
        })
        .collect();

    Ok(ParameterSet::new(values))
}
