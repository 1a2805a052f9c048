//! Reporting utilities: deviation analysis and formatted terminal output.

pub mod format;

use kiddo::{KdTree, SquaredEuclidean};
use nalgebra::Point2;
use rayon::prelude::*;

use crate::curve::{BSplineCurve, uniform_parameters};
use crate::error::FitError;

pub use format::*;

/// Newton steps used to polish each nearest-sample guess.
const NEWTON_STEPS: usize = 8;

/// Deviation of source points from a fitted curve.
#[derive(Debug, Clone, PartialEq)]
pub struct DeviationReport {
    /// Perpendicular distance of each source point to the curve.
    pub distances: Vec<f64>,
    /// Curve parameter of each point's foot point.
    pub parameters: Vec<f64>,
    pub max: f64,
    pub max_index: usize,
    pub max_parameter: f64,
    pub rms: f64,
    pub sum_sq: f64,
}

/// Measure how far each source point lies from `curve`.
///
/// The curve is sampled at `samples` uniform parameters and the samples are
/// indexed in a KD-tree. Each point starts from its nearest sample and is
/// refined by a Newton projection confined to the neighbouring sample
/// interval.
pub fn analyze_deviation(
    curve: &BSplineCurve,
    points: &[Point2<f64>],
    samples: usize,
) -> Result<DeviationReport, FitError> {
    if samples < 2 {
        return Err(FitError::invalid(format!(
            "deviation analysis needs at least 2 curve samples, got {samples}"
        )));
    }
    if points.is_empty() {
        return Err(FitError::invalid("deviation analysis needs at least one source point"));
    }

    let params = uniform_parameters(samples);
    let dense: Vec<[f64; 2]> = params
        .iter()
        .map(|&u| {
            let p = curve.evaluate(u);
            [p.x, p.y]
        })
        .collect();
    let tree: KdTree<f64, 2> = (&dense).into();

    let feet: Vec<(f64, f64)> = points
        .par_iter()
        .map(|q| {
            let found = tree.nearest_one::<SquaredEuclidean>(&[q.x, q.y]);
            let (nearest, d_sq) = (found.item as usize, found.distance);

            let lo = params[nearest.saturating_sub(1)];
            let hi = params[(nearest + 1).min(samples - 1)];
            let (u, dist) = project(curve, q, params[nearest], lo, hi);
            if dist * dist <= d_sq {
                (u, dist)
            } else {
                (params[nearest], d_sq.sqrt())
            }
        })
        .collect();

    let (parameters, distances): (Vec<f64>, Vec<f64>) = feet.into_iter().unzip();

    let (max_index, max) = distances
        .iter()
        .copied()
        .enumerate()
        .fold((0, f64::NEG_INFINITY), |best, cur| if cur.1 > best.1 { cur } else { best });
    let sum_sq: f64 = distances.iter().map(|d| d * d).sum();
    let rms = (sum_sq / distances.len() as f64).sqrt();

    Ok(DeviationReport {
        max,
        max_index,
        max_parameter: parameters[max_index],
        rms,
        sum_sq,
        distances,
        parameters,
    })
}

/// Newton iteration on `(C(u) − q) · C'(u) = 0`, clamped to `[lo, hi]`.
fn project(curve: &BSplineCurve, q: &Point2<f64>, start: f64, lo: f64, hi: f64) -> (f64, f64) {
    let mut u = start;
    for _ in 0..NEWTON_STEPS {
        let d = curve.derivatives(u, 2);
        let r = d[0] - q.coords;
        let f1 = r.dot(&d[1]);
        let f2 = d[1].norm_squared() + r.dot(&d[2]);
        if f2.abs() < 1e-300 {
            break;
        }
        let next = (u - f1 / f2).clamp(lo, hi);
        if (next - u).abs() < 1e-15 {
            u = next;
            break;
        }
        u = next;
    }
    (u, (curve.evaluate(u) - q).norm())
}
