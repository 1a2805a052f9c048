//! Formatted terminal output.
//!
//! We keep formatting code in one place so:
//! - the engine stays clean and testable
//! - output changes are localized

use crate::curve::BSplineCurve;
use crate::domain::{FitConfig, Surface};
use crate::fit::{AirfoilFitSession, FittedCurve, RefineOutcome, RefineStrategy, outward_curvature};
use crate::report::DeviationReport;

/// Format the run summary: configuration, per-surface layout and deviations.
pub fn format_fit_summary(
    name: &str,
    session: &AirfoilFitSession,
    deviations: &(DeviationReport, DeviationReport),
) -> String {
    let config = session.config();
    let mut out = String::new();

    out.push_str(&format!("=== afit - B-spline airfoil fit: {name} ===\n"));
    out.push_str(&format_config(config));
    if let Some(target) = session.le_target() {
        out.push_str(&format!(
            "LE targets: curvature={:.6} slope={:.6}\n",
            target.curvature, target.curvature_slope
        ));
    }
    if session.is_thickened() {
        out.push_str(&format!(
            "Trailing edge: thickened, {:.6} chord per side\n",
            session.thickness()
        ));
    } else {
        out.push_str("Trailing edge: sharp\n");
    }

    out.push('\n');
    out.push_str(&format_surface_header());
    let pair = session.curves();
    for (fitted, report) in [(&pair.upper, &deviations.0), (&pair.lower, &deviations.1)] {
        out.push_str(&format_surface_row(fitted, report));
    }
    out.push('\n');

    for fitted in [&pair.upper, &pair.lower] {
        out.push_str(&format!(
            "{} knots: {}\n",
            fitted.surface.label(),
            fmt_vec(fitted.knots().values())
        ));
    }
    out
}

fn format_config(config: &FitConfig) -> String {
    let c = &config.continuity;
    format!(
        "Degree: {} | control points: {} | smoothness: {}\nContinuity: G1{}{}{}\n",
        config.degree,
        config.control_points,
        c.smoothness_weight,
        if c.enable_g2 { " G2" } else { "" },
        if c.enable_g3 { " G3" } else { "" },
        if c.enable_te_tangent { " + TE tangency" } else { "" },
    )
}

fn format_surface_header() -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "{:<8} {:>6} {:>4} {:>11} {:>6} {:>12} {:>12} {:>10} {:>12}",
        "surface", "degree", "n", "solver", "iters", "max_dev", "rms_dev", "at_u", "le_kappa"
    ));
    out.push('\n');
    out.push_str(&format!(
        "{:-<8} {:-<6} {:-<4} {:-<11} {:-<6} {:-<12} {:-<12} {:-<10} {:-<12}",
        "", "", "", "", "", "", "", "", ""
    ));
    out.push('\n');
    out
}

fn format_surface_row(fitted: &FittedCurve, report: &DeviationReport) -> String {
    format!(
        "{:<8} {:>6} {:>4} {:>11} {:>6} {:>12.4e} {:>12.4e} {:>10.6} {:>12.6}\n",
        fitted.surface.label(),
        fitted.degree(),
        fitted.curve.control_point_count(),
        format!("{:?}", fitted.solver.path),
        fitted.solver.iterations,
        report.max,
        report.rms,
        report.max_parameter,
        outward_curvature(&fitted.curve, fitted.surface),
    )
}

pub fn format_refine_outcome(surface: Surface, outcome: &RefineOutcome) -> String {
    let how = match (outcome.strategy, outcome.inserted_knot) {
        (RefineStrategy::InsertKnot, Some(k)) => format!("knot {k:.6}"),
        (RefineStrategy::InsertKnot, None) => "knot".to_string(),
        (RefineStrategy::ElevateDegree, _) => format!("degree -> {}", outcome.degree),
    };
    format!(
        "refine {:<5}: {how}, n={} | max deviation {:.4e} -> {:.4e}\n",
        surface.label(),
        outcome.control_points,
        outcome.max_before,
        outcome.max_after
    )
}

/// Summary of a stored curve pair (e.g. loaded from a `.bsp` file).
pub fn format_model_summary(
    name: &str,
    upper: &BSplineCurve,
    lower: &BSplineCurve,
    deviations: Option<&(DeviationReport, DeviationReport)>,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== afit - B-spline model: {name} ===\n"));
    for (surface, curve, report) in [
        (Surface::Upper, upper, deviations.map(|d| &d.0)),
        (Surface::Lower, lower, deviations.map(|d| &d.1)),
    ] {
        out.push_str(&format!(
            "{:<6} degree={} n={} spans={} le_kappa={:.6}",
            surface.label(),
            curve.degree(),
            curve.control_point_count(),
            curve.span_count(),
            outward_curvature(curve, surface),
        ));
        if let Some(r) = report {
            out.push_str(&format!(" | max_dev={:.4e} rms_dev={:.4e}", r.max, r.rms));
        }
        out.push('\n');
    }
    out
}

fn fmt_vec(v: &[f64]) -> String {
    let parts: Vec<String> = v.iter().map(|x| format!("{x:.6}")).collect();
    format!("[{}]", parts.join(", "))
}
