//! Trailing-edge thickening.
//!
//! A sharp trailing edge is opened by offsetting both surfaces away from the
//! camber with a quintic blend:
//!
//! ```text
//! offset(x) = t · x³ (10 − 15x + 6x²)
//! ```
//!
//! The blend is zero with zero slope and curvature at the leading edge and
//! reaches exactly `t` at `x = 1`, so the nose is untouched.

use nalgebra::Point2;

use crate::curve::{BSplineCurve, uniform_parameters};
use crate::domain::{Surface, SurfacePoints};
use crate::error::FitError;

/// Quintic smoothstep on `[0, 1]`.
pub fn blend(x: f64) -> f64 {
    let x = x.clamp(0.0, 1.0);
    x * x * x * (10.0 - 15.0 * x + 6.0 * x * x)
}

pub fn thickness_offset(x: f64, thickness: f64) -> f64 {
    thickness * blend(x)
}

/// Convert a half-thickness in millimetres to chord units.
pub fn normalized_thickness(thickness_mm: f64, chord_mm: f64) -> Result<f64, FitError> {
    if !(chord_mm.is_finite() && chord_mm > 0.0) {
        return Err(FitError::invalid(format!("chord length must be positive, got {chord_mm} mm")));
    }
    if !(thickness_mm.is_finite() && thickness_mm >= 0.0) {
        return Err(FitError::invalid(format!(
            "trailing-edge thickness must be finite and >= 0, got {thickness_mm} mm"
        )));
    }
    Ok(thickness_mm / chord_mm)
}

/// Sample a sharp curve and push the samples outward by the blended offset.
///
/// Sample `x` values are clamped to `[0, 1]` and made non-decreasing so the
/// result is valid input for the parameterizer.
pub fn offset_samples(
    curve: &BSplineCurve,
    surface: Surface,
    thickness: f64,
    samples: usize,
) -> Result<SurfacePoints, FitError> {
    if samples < 2 {
        return Err(FitError::invalid(format!("thickening needs at least 2 samples, got {samples}")));
    }

    let sign = surface.sign();
    let mut last_x = 0.0_f64;
    let points = uniform_parameters(samples)
        .into_iter()
        .map(|u| {
            let p = curve.evaluate(u);
            let x = p.x.clamp(0.0, 1.0).max(last_x);
            last_x = x;
            Point2::new(x, p.y + sign * thickness_offset(x, thickness))
        })
        .collect();

    Ok(SurfacePoints::new(points))
}

/// Push measured points outward by the blended offset at their own `x`.
pub fn offset_points(points: &SurfacePoints, surface: Surface, thickness: f64) -> SurfacePoints {
    let sign = surface.sign();
    SurfacePoints::new(
        points
            .points()
            .iter()
            .map(|p| Point2::new(p.x, p.y + sign * thickness_offset(p.x, thickness)))
            .collect(),
    )
}
