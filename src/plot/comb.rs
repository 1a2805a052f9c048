//! Curvature comb geometry.
//!
//! Each tooth starts on the curve and points along the curvature normal with a
//! length of `scale · |κ|`. Teeth are placed uniformly in parameter within
//! every knot span, `density` per span, so short spans near the nose get as
//! many teeth as long ones.

use nalgebra::{Point2, Vector2};

use crate::curve::BSplineCurve;
use crate::error::FitError;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CombTooth {
    pub u: f64,
    pub base: Point2<f64>,
    pub tip: Point2<f64>,
    pub curvature: f64,
}

/// Compute the comb teeth of `curve`, ordered by parameter.
///
/// Span end parameters are shared between neighbouring spans and appear once.
pub fn curvature_comb(curve: &BSplineCurve, density: usize, scale: f64) -> Result<Vec<CombTooth>, FitError> {
    if density < 2 {
        return Err(FitError::invalid(format!("comb density must be at least 2, got {density}")));
    }
    if !scale.is_finite() {
        return Err(FitError::invalid(format!("comb scale must be finite, got {scale}")));
    }

    let mut breaks: Vec<f64> = curve.knots().values().to_vec();
    breaks.dedup_by(|a, b| (*a - *b).abs() < 1e-12);

    let mut teeth = Vec::with_capacity(breaks.len().saturating_sub(1) * (density - 1) + 1);
    for (i, w) in breaks.windows(2).enumerate() {
        let (a, b) = (w[0], w[1]);
        let first = if i == 0 { 0 } else { 1 };
        for j in first..density {
            let u = a + (b - a) * j as f64 / (density - 1) as f64;
            teeth.push(tooth(curve, u, scale));
        }
    }
    Ok(teeth)
}

fn tooth(curve: &BSplineCurve, u: f64, scale: f64) -> CombTooth {
    let base = curve.evaluate(u);
    let curvature = curve.signed_curvature(u);
    let tip = match curve.tangent(u) {
        Some(t) => {
            let left = Vector2::new(-t.y, t.x);
            base - left * (scale * curvature)
        }
        None => base,
    };
    CombTooth { u, base, tip, curvature }
}
