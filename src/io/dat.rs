//! Resampled Selig `.dat` writer.
//!
//! Points run from the upper trailing edge to the leading edge and back along
//! the lower surface; the shared leading-edge point is written once. Sample
//! spacing follows the curvature-adaptive scheme in [`crate::plot::sampling`].

use std::fmt::Write as _;
use std::path::Path;

use nalgebra::Point2;

use crate::curve::BSplineCurve;
use crate::error::{AppError, FitError};
use crate::plot::adaptive_samples;

/// Selig-ordered points for a curve pair.
pub fn selig_points(
    upper: &BSplineCurve,
    lower: &BSplineCurve,
    points_per_surface: usize,
    curvature_weight: f64,
) -> Result<Vec<Point2<f64>>, FitError> {
    let mut out = adaptive_samples(upper, points_per_surface, curvature_weight)?;
    out.reverse();
    let lower = adaptive_samples(lower, points_per_surface, curvature_weight)?;
    out.extend(lower.into_iter().skip(1));
    Ok(out)
}

pub fn format_dat(name: &str, points: &[Point2<f64>]) -> String {
    let mut out = String::with_capacity(32 * (points.len() + 1));
    out.push_str(name.trim());
    out.push('\n');
    for p in points {
        let _ = writeln!(out, "{:.8} {:.8}", p.x, p.y);
    }
    out
}

pub fn write_dat(
    path: &Path,
    name: &str,
    upper: &BSplineCurve,
    lower: &BSplineCurve,
    points_per_surface: usize,
    curvature_weight: f64,
) -> Result<(), AppError> {
    let points = selig_points(upper, lower, points_per_surface, curvature_weight)?;
    std::fs::write(path, format_dat(name, &points))
        .map_err(|e| AppError::new(2, format!("Failed to write DAT file '{}': {e}", path.display())))
}
