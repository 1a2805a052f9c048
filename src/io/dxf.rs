//! DXF export of the fitted curves as SPLINE entities.
//!
//! Control points are scaled from chord units to millimetres and the drawing
//! units are declared as millimetres (`$INSUNITS` = 4). Each surface is one
//! open SPLINE carrying the exact degree, knots and control polygon, so CAD
//! tools get the fitted curve rather than a polyline approximation.
//!
//! Layers:
//! - `AIRFOIL_UPPER` (red) and `AIRFOIL_LOWER` (blue)
//! - `TRAILING_EDGE_CONNECTOR` (yellow): a LINE closing a blunt trailing edge

use std::fmt::{Display, Write as _};
use std::path::Path;

use nalgebra::Point2;

use crate::curve::BSplineCurve;
use crate::error::{AppError, FitError, ParseError};

pub const UPPER_LAYER: &str = "AIRFOIL_UPPER";
pub const LOWER_LAYER: &str = "AIRFOIL_LOWER";
pub const TE_LAYER: &str = "TRAILING_EDGE_CONNECTOR";

/// `$INSUNITS` code for millimetres.
const UNITS_MM: u8 = 4;
/// SPLINE flag: planar.
const SPLINE_PLANAR: u8 = 8;

/// One SPLINE entity as stored in a DXF file (coordinates in drawing units).
#[derive(Debug, Clone, PartialEq)]
pub struct DxfSpline {
    pub layer: String,
    pub degree: usize,
    pub knots: Vec<f64>,
    pub control_points: Vec<Point2<f64>>,
}

fn pair(out: &mut String, code: u16, value: impl Display) {
    let _ = writeln!(out, "{code:>3}\n{value}");
}

pub fn format_dxf(upper: &BSplineCurve, lower: &BSplineCurve, chord_mm: f64) -> Result<String, FitError> {
    if !(chord_mm.is_finite() && chord_mm > 0.0) {
        return Err(FitError::invalid(format!(
            "chord length must be positive for DXF export, got {chord_mm} mm"
        )));
    }

    let mut out = String::new();
    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "HEADER");
    pair(&mut out, 9, "$ACADVER");
    pair(&mut out, 1, "AC1015");
    pair(&mut out, 9, "$INSUNITS");
    pair(&mut out, 70, UNITS_MM);
    pair(&mut out, 0, "ENDSEC");

    pair(&mut out, 0, "SECTION");
    pair(&mut out, 2, "ENTITIES");
    let mut handle = 0x100_u32;
    for (curve, layer, color) in [(upper, UPPER_LAYER, 1), (lower, LOWER_LAYER, 5)] {
        write_spline(&mut out, handle, curve, layer, color, chord_mm);
        handle += 1;
    }

    let (u_te, l_te) = (upper.evaluate(1.0) * chord_mm, lower.evaluate(1.0) * chord_mm);
    if (u_te - l_te).norm() > 1e-9 * chord_mm {
        pair(&mut out, 0, "LINE");
        pair(&mut out, 5, format!("{handle:X}"));
        pair(&mut out, 100, "AcDbEntity");
        pair(&mut out, 8, TE_LAYER);
        pair(&mut out, 62, 2);
        pair(&mut out, 100, "AcDbLine");
        for (base, p) in [(10, u_te), (11, l_te)] {
            pair(&mut out, base, p.x);
            pair(&mut out, base + 10, p.y);
            pair(&mut out, base + 20, 0.0);
        }
    }
    pair(&mut out, 0, "ENDSEC");
    pair(&mut out, 0, "EOF");
    Ok(out)
}

fn write_spline(out: &mut String, handle: u32, curve: &BSplineCurve, layer: &str, color: u8, scale: f64) {
    pair(out, 0, "SPLINE");
    pair(out, 5, format!("{handle:X}"));
    pair(out, 100, "AcDbEntity");
    pair(out, 8, layer);
    pair(out, 62, color);
    pair(out, 100, "AcDbSpline");
    pair(out, 210, 0.0);
    pair(out, 220, 0.0);
    pair(out, 230, 1.0);
    pair(out, 70, SPLINE_PLANAR);
    pair(out, 71, curve.degree());
    pair(out, 72, curve.knots().values().len());
    pair(out, 73, curve.control_point_count());
    pair(out, 74, 0);
    for k in curve.knots().values() {
        pair(out, 40, k);
    }
    for p in curve.control_points() {
        pair(out, 10, p.x * scale);
        pair(out, 20, p.y * scale);
        pair(out, 30, 0.0);
    }
}

pub fn write_dxf(path: &Path, upper: &BSplineCurve, lower: &BSplineCurve, chord_mm: f64) -> Result<(), AppError> {
    let text = format_dxf(upper, lower, chord_mm)?;
    std::fs::write(path, text)
        .map_err(|e| AppError::new(2, format!("Failed to write DXF file '{}': {e}", path.display())))
}

/// Read back the SPLINE entities of a DXF file.
///
/// Only the groups this module writes are interpreted; everything else is
/// skipped.
pub fn parse_dxf_splines(text: &str) -> Result<Vec<DxfSpline>, ParseError> {
    let lines: Vec<&str> = text.lines().collect();
    if lines.len() % 2 != 0 {
        return Err(ParseError::malformed("DXF group codes and values must come in pairs"));
    }

    let mut splines = Vec::new();
    let mut current: Option<(DxfSpline, usize, usize)> = None;

    for (i, chunk) in lines.chunks(2).enumerate() {
        let line = 2 * i + 1;
        let code: u16 = chunk[0]
            .trim()
            .parse()
            .map_err(|_| ParseError::line(line, format!("invalid group code '{}'", chunk[0].trim())))?;
        let value = chunk[1].trim();
        let number = || {
            value
                .parse::<f64>()
                .map_err(|_| ParseError::line(line + 1, format!("group {code}: invalid number '{value}'")))
        };

        if code == 0 {
            if let Some(done) = current.take() {
                splines.push(finish_spline(done, line)?);
            }
            if value == "SPLINE" {
                current = Some((
                    DxfSpline {
                        layer: String::new(),
                        degree: 0,
                        knots: Vec::new(),
                        control_points: Vec::new(),
                    },
                    0,
                    0,
                ));
            }
            continue;
        }

        let Some((spline, knot_count, point_count)) = current.as_mut() else {
            continue;
        };
        match code {
            8 => spline.layer = value.to_string(),
            71 => spline.degree = number()? as usize,
            72 => *knot_count = number()? as usize,
            73 => *point_count = number()? as usize,
            40 => spline.knots.push(number()?),
            10 => spline.control_points.push(Point2::new(number()?, 0.0)),
            20 => match spline.control_points.last_mut() {
                Some(p) => p.y = number()?,
                None => return Err(ParseError::line(line, "y coordinate before x coordinate")),
            },
            _ => {}
        }
    }
    if let Some(done) = current.take() {
        splines.push(finish_spline(done, lines.len())?);
    }
    Ok(splines)
}

fn finish_spline(
    (spline, knot_count, point_count): (DxfSpline, usize, usize),
    line: usize,
) -> Result<DxfSpline, ParseError> {
    if spline.knots.len() != knot_count || spline.control_points.len() != point_count {
        return Err(ParseError::line(
            line,
            format!(
                "SPLINE on layer '{}' announces {knot_count} knots and {point_count} control points, found {} and {}",
                spline.layer,
                spline.knots.len(),
                spline.control_points.len()
            ),
        ));
    }
    Ok(spline)
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
    fn splines_round_trip_scaled_to_millimetres() {
        let s = session();
        let pair = s.curves();
        let path = std::env::temp_dir().join(format!("afit-dxf-{}.dxf", std::process::id()));
        write_dxf(&path, &pair.upper.curve, &pair.lower.curve, 200.0).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let _ = std::fs::remove_file(&path);

        assert!(text.contains("$INSUNITS\n 70\n4\n"));
        assert!(text.ends_with("  0\nEOF\n"));
        assert!(!text.contains(TE_LAYER));

        let splines = parse_dxf_splines(&text).unwrap();
        assert_eq!(splines.len(), 2);
        for (spline, fitted, layer) in [(&splines[0], &pair.upper, UPPER_LAYER), (&splines[1], &pair.lower, LOWER_LAYER)] {
            assert_eq!(spline.layer, layer);
            assert_eq!(spline.degree, fitted.degree());
            assert_eq!(spline.knots.as_slice(), fitted.knots().values());
            assert_eq!(spline.control_points.len(), fitted.control_points().len());
            for (a, b) in spline.control_points.iter().zip(fitted.control_points()) {
                assert!((a - b * 200.0).norm() < 1e-9);
            }
        }
    }

    #[test]
    fn blunt_trailing_edge_gets_a_connector() {
        let mut s = session();
        s.thicken(1.0, 200.0).unwrap();
        let pair = s.curves();
        let text = format_dxf(&pair.upper.curve, &pair.lower.curve, 200.0).unwrap();

        assert!(text.contains(&format!("  8\n{TE_LAYER}\n")));
        assert_eq!(parse_dxf_splines(&text).unwrap().len(), 2);
    }

    #[test]
    fn chord_must_be_positive() {
        let s = session();
        let pair = s.curves();
        assert!(matches!(
            format_dxf(&pair.upper.curve, &pair.lower.curve, 0.0),
            Err(FitError::InvalidInput(_))
        ));
    }

    #[test]
    fn truncated_spline_is_reported() {
        let text = "  0\nSPLINE\n  8\nX\n 71\n1\n 72\n4\n 73\n2\n 40\n0\n 40\n0\n 40\n1\n 10\n0\n 20\n0\n  0\nEOF\n";
        let err = parse_dxf_splines(text).unwrap_err();
        assert!(err.to_string().contains("announces 4 knots"), "{err}");
    }
}
