//! `.bsp` B-spline model files (AirfoilEditor sectioned format).
//!
//! ```text
//! <name>
//! Top Start
//!  0.0000000000  0.0000000000
//! ...
//! Top End
//! Top Knots Start
//!  0.0000000000
//! ...
//! Top Knots End
//! Bottom Start / Bottom End / Bottom Knots Start / Bottom Knots End
//! ```
//!
//! The degree is not stored; it is implied by `knots − control points − 1`.

use std::fmt::Write as _;
use std::path::Path;

use nalgebra::Point2;

use crate::curve::BSplineCurve;
use crate::domain::{ControlPolygon, KnotVector};
use crate::error::{AppError, ParseError};

/// A curve pair loaded from a `.bsp` file.
#[derive(Debug, Clone)]
pub struct BspModel {
    pub name: String,
    pub upper: BSplineCurve,
    pub lower: BSplineCurve,
}

pub fn format_bsp(name: &str, upper: &BSplineCurve, lower: &BSplineCurve) -> String {
    let mut out = String::new();
    out.push_str(name.trim());
    out.push('\n');
    for (label, curve) in [("Top", upper), ("Bottom", lower)] {
        let _ = writeln!(out, "{label} Start");
        for p in curve.control_points() {
            let _ = writeln!(out, "{:13.10} {:13.10}", p.x, p.y);
        }
        let _ = writeln!(out, "{label} End");
        let _ = writeln!(out, "{label} Knots Start");
        for k in curve.knots().values() {
            let _ = writeln!(out, "{k:13.10}");
        }
        let _ = writeln!(out, "{label} Knots End");
    }
    out
}

pub fn write_bsp(path: &Path, name: &str, upper: &BSplineCurve, lower: &BSplineCurve) -> Result<(), AppError> {
    std::fs::write(path, format_bsp(name, upper, lower))
        .map_err(|e| AppError::new(2, format!("Failed to write BSP file '{}': {e}", path.display())))
}

pub fn read_bsp(path: &Path) -> Result<BspModel, AppError> {
    let text = std::fs::read_to_string(path)
        .map_err(|e| AppError::new(2, format!("Failed to read BSP file '{}': {e}", path.display())))?;
    parse_bsp(&text).map_err(|e| AppError::new(2, format!("{}: {e}", path.display())))
}

pub fn parse_bsp(text: &str) -> Result<BspModel, ParseError> {
    let lines: Vec<&str> = text
        .lines()
        .map(|l| l.trim().trim_start_matches('\u{feff}'))
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() < 9 {
        return Err(ParseError::malformed("BSP file is too short or malformed"));
    }

    let name = lines[0].to_string();
    let upper = read_curve(&lines, "Top")?;
    let lower = read_curve(&lines, "Bottom")?;
    Ok(BspModel { name, upper, lower })
}

fn read_curve(lines: &[&str], label: &str) -> Result<BSplineCurve, ParseError> {
    let cp_rows = parse_rows(
        slice_section(lines, &format!("{label} Start"), &format!("{label} End"))?,
        2,
        label,
    )?;
    let knot_label = format!("{label} Knots");
    let knots: Vec<f64> = parse_rows(
        slice_section(lines, &format!("{knot_label} Start"), &format!("{knot_label} End"))?,
        1,
        &knot_label,
    )?
    .into_iter()
    .map(|row| row[0])
    .collect();

    let points: Vec<Point2<f64>> = cp_rows.into_iter().map(|row| Point2::new(row[0], row[1])).collect();
    let degree = knots
        .len()
        .checked_sub(points.len() + 1)
        .filter(|&d| d >= 1)
        .ok_or_else(|| {
            ParseError::section(
                label,
                format!("{} knots cannot carry {} control points", knots.len(), points.len()),
            )
        })?;
    let knots = KnotVector::try_from_vec(knots, degree)
        .ok_or_else(|| ParseError::section(knot_label.as_str(), "knots must be finite and non-decreasing"))?;

    BSplineCurve::new(degree, knots, ControlPolygon::new(points)).map_err(|e| ParseError::section(label, e.to_string()))
}

fn slice_section<'a>(lines: &'a [&'a str], start: &str, end: &str) -> Result<&'a [&'a str], ParseError> {
    let missing = || ParseError::MissingSection {
        start: start.to_string(),
        end: end.to_string(),
    };
    let s = lines.iter().position(|l| *l == start).ok_or_else(missing)?;
    let e = lines[s + 1..].iter().position(|l| *l == end).ok_or_else(missing)? + s + 1;
    Ok(&lines[s + 1..e])
}

fn parse_rows(lines: &[&str], cols: usize, section: &str) -> Result<Vec<Vec<f64>>, ParseError> {
    let rows = lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() != cols {
                return Err(ParseError::section(
                    section,
                    format!("line {} has {} columns, expected {cols}", i + 1, parts.len()),
                ));
            }
            parts
                .iter()
                .map(|p| p.parse::<f64>())
                .collect::<Result<Vec<f64>, _>>()
                .map_err(|_| ParseError::section(section, format!("invalid numeric value on line {}: {line}", i + 1)))
        })
        .collect::<Result<Vec<_>, ParseError>>()?;
    if rows.is_empty() {
        return Err(ParseError::section(section, "empty"));
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Naca4;
    use crate::domain::FitConfig;
    use crate::fit::AirfoilFitSession;

    fn session() -> AirfoilFitSession {
        let (upper, lower) = Naca4::parse("2412").unwrap().surfaces(81).unwrap();
        AirfoilFitSession::fit(upper, lower, FitConfig::default()).unwrap()
    }

    #[test]
    fn layout_matches_airfoil_editor() {
        let s = session();
        let text = format_bsp("NACA 2412", &s.curves().upper.curve, &s.curves().lower.curve);
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "NACA 2412");
        assert_eq!(lines[1], "Top Start");
        assert_eq!(lines[2], " 0.0000000000  0.0000000000");
        assert_eq!(lines[11], "Top End");
        assert_eq!(lines[12], "Top Knots Start");
        assert_eq!(lines[13], " 0.0000000000");
        assert_eq!(*lines.last().unwrap(), "Bottom Knots End");
    }

    #[test]
    fn file_round_trip_restores_layout() {
        let s = session();
        let path = std::env::temp_dir().join(format!("afit-bsp-{}.bsp", std::process::id()));
        write_bsp(&path, "NACA 2412", &s.curves().upper.curve, &s.curves().lower.curve).unwrap();
        let model = read_bsp(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert_eq!(model.name, "NACA 2412");
        assert_eq!(model.upper.degree(), 4);
        assert_eq!(model.lower.control_point_count(), 9);
        for (a, b) in model.upper.control_points().iter().zip(s.curves().upper.control_points()) {
            assert!((a - b).norm() < 1e-10);
        }
    }

    #[test]
    fn malformed_sections_are_reported() {
        let text = "foil\nTop Start\n0 0\n1\nTop End\nTop Knots Start\n0\n0\n1\n1\nTop Knots End\n";
        let err = parse_bsp(text).unwrap_err();
        assert!(matches!(&err, ParseError::Section { section, .. } if section == "Top"));
        assert!(err.to_string().contains("columns"));

        let missing = "foil\nTop Start\n0 0\n1 0\nTop End\nTop Knots Start\n0\n0\n1\n1\nTop Knots End\n";
        assert!(matches!(
            parse_bsp(missing).unwrap_err(),
            ParseError::MissingSection { start, .. } if start == "Bottom Start"
        ));
    }
}
