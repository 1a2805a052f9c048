//! Airfoil coordinate `.dat` reader (Selig and Lednicer layouts).
//!
//! Selig: an optional name line followed by `x y` pairs running from the
//! trailing edge over the upper surface to the leading edge and back along
//! the lower surface.
//!
//! Lednicer: a name line, a line holding the upper and lower point counts
//! (e.g. `61. 61.`), then the upper surface and the lower surface, each
//! listed leading edge to trailing edge.
//!
//! Both layouts are brought into Selig order, split at the minimum-`x` point
//! and normalized:
//!
//! - translate the leading edge to the origin
//! - rotate and scale so the trailing-edge midpoint lands on `(1, 0)`
//!
//! Both surfaces come out ordered leading edge first.

use std::path::Path;

use nalgebra::{Point2, Rotation2};

use crate::domain::SurfacePoints;
use crate::error::{AppError, ParseError};

/// Which layout a coordinate file used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CoordinateFormat {
    Selig,
    Lednicer,
}

#[derive(Debug, Clone)]
pub struct AirfoilCoordinates {
    pub name: String,
    pub format: CoordinateFormat,
    pub upper: SurfacePoints,
    pub lower: SurfacePoints,
}

pub fn read_coordinates(path: &Path) -> Result<AirfoilCoordinates, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read airfoil file '{}': {e}", path.display())))?;
    let fallback = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "airfoil".to_string());
    parse_coordinates(&text, &fallback).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))
}

/// Parse Selig or Lednicer text. `fallback_name` is used when there is no name line.
pub fn parse_coordinates(text: &str, fallback_name: &str) -> Result<AirfoilCoordinates, ParseError> {
    let mut name = None;
    let mut rows: Vec<(usize, Point2<f64>)> = Vec::new();

    for (idx, line) in text.lines().enumerate() {
        let line = line.trim().trim_start_matches('\u{feff}');
        if line.is_empty() {
            continue;
        }
        let parts: Vec<&str> = line.split_whitespace().collect();
        let coords = match parts.as_slice() {
            [x, y] => x.parse::<f64>().ok().zip(y.parse::<f64>().ok()),
            _ => None,
        };
        match coords {
            Some((x, y)) if x.is_finite() && y.is_finite() => rows.push((idx + 1, Point2::new(x, y))),
            _ if rows.is_empty() && name.is_none() => name = Some(line.to_string()),
            _ => return Err(ParseError::line(idx + 1, format!("not an 'x y' coordinate pair: {line}"))),
        }
    }

    let (format, ordered) = match rows.first().and_then(|&(_, p)| lednicer_counts(p)) {
        Some((n_upper, n_lower)) => (CoordinateFormat::Lednicer, lednicer_to_selig(&rows[1..], n_upper, n_lower)?),
        None => (CoordinateFormat::Selig, rows.iter().map(|&(_, p)| p).collect()),
    };

    let mut raw: Vec<Point2<f64>> = Vec::with_capacity(ordered.len());
    for p in ordered {
        if raw.last() != Some(&p) {
            raw.push(p);
        }
    }
    if raw.len() < 5 {
        return Err(ParseError::malformed(format!(
            "need at least 5 coordinate pairs, found {}",
            raw.len()
        )));
    }

    let le = raw
        .iter()
        .enumerate()
        .fold(0, |best, (i, p)| if p.x < raw[best].x { i } else { best });
    if le == 0 || le == raw.len() - 1 {
        return Err(ParseError::malformed(
            "leading edge (minimum x) is at an end of the point list; not Selig order",
        ));
    }

    let normalized = normalize(&raw, le)?;
    let mut upper: Vec<Point2<f64>> = normalized[..=le].to_vec();
    upper.reverse();
    let lower = normalized[le..].to_vec();

    Ok(AirfoilCoordinates {
        name: name.unwrap_or_else(|| fallback_name.to_string()),
        format,
        upper: SurfacePoints::new(upper),
        lower: SurfacePoints::new(lower),
    })
}

/// A Lednicer count line holds two whole numbers, both above one.
fn lednicer_counts(p: Point2<f64>) -> Option<(usize, usize)> {
    let whole = |v: f64| v > 1.0 && v.fract() == 0.0 && v < u32::MAX as f64;
    (whole(p.x) && whole(p.y)).then(|| (p.x as usize, p.y as usize))
}

/// Upper block reversed (trailing edge first), then the lower block.
fn lednicer_to_selig(
    rows: &[(usize, Point2<f64>)],
    n_upper: usize,
    n_lower: usize,
) -> Result<Vec<Point2<f64>>, ParseError> {
    if rows.len() != n_upper + n_lower {
        let line = rows.last().map_or(0, |&(line, _)| line);
        return Err(ParseError::line(
            line,
            format!(
                "Lednicer header announces {n_upper} + {n_lower} points, found {}",
                rows.len()
            ),
        ));
    }
    let (upper, lower) = rows.split_at(n_upper);
    Ok(upper
        .iter()
        .rev()
        .chain(lower.iter())
        .map(|&(_, p)| p)
        .collect())
}

fn normalize(raw: &[Point2<f64>], le: usize) -> Result<Vec<Point2<f64>>, ParseError> {
    let origin = raw[le];
    let first = raw[0] - origin;
    let last = raw[raw.len() - 1] - origin;
    let te_mid = (first + last) * 0.5;
    let chord = te_mid.norm();
    if !(chord > 1e-12) {
        return Err(ParseError::malformed("trailing edge coincides with the leading edge"));
    }

    let rotation = Rotation2::new(-te_mid.y.atan2(te_mid.x));
    Ok(raw
        .iter()
        .enumerate()
        .map(|(i, p)| {
            if i == le {
                return Point2::origin();
            }
            let v = rotation * (p - origin) / chord;
            Point2::new(v.x, v.y)
        })
        .collect())
}
