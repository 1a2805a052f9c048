//! Airfoil fit session: the upper/lower curve pair and the operations on it.
//!
//! A session is created by [`AirfoilFitSession::fit`] and then mutated in
//! place by [`refine`](AirfoilFitSession::refine) and
//! [`thicken`](AirfoilFitSession::thicken). Every mutation computes the new
//! curves first and commits only on success; a failed call leaves the
//! session exactly as it was.
//!
//! Both surfaces are fitted as two explicit parallel tasks (`rayon::join`)
//! and joined before anything is stored.

use nalgebra::{Point2, Vector2};

use crate::domain::{FitConfig, Surface, SurfacePoints};
use crate::error::FitError;
use crate::fit::constraints::{LeadingEdgeTarget, check_layout};
use crate::fit::fitter::{FitContext, FittedCurve, SurfaceJob, fit_surface};
use crate::fit::knots::uniform_clamped_knots;
use crate::fit::refine::{RefineOutcome, RefineStrategy, refined_layout};
use crate::fit::thicken::{normalized_thickness, offset_points, offset_samples};
use crate::report::DeviationReport;

/// Upper and lower fitted curves.
#[derive(Debug, Clone)]
pub struct CurvePair {
    pub upper: FittedCurve,
    pub lower: FittedCurve,
}

impl CurvePair {
    pub fn get(&self, surface: Surface) -> &FittedCurve {
        match surface {
            Surface::Upper => &self.upper,
            Surface::Lower => &self.lower,
        }
    }

    fn set(&mut self, curve: FittedCurve) {
        match curve.surface {
            Surface::Upper => self.upper = curve,
            Surface::Lower => self.lower = curve,
        }
    }
}

#[derive(Debug, Clone)]
struct Thickened {
    /// Half-thickness in chord units.
    thickness: f64,
    pair: CurvePair,
}

#[derive(Debug, Clone)]
pub struct AirfoilFitSession {
    config: FitConfig,
    le_direction: Vector2<f64>,
    te_tangent_upper: Option<Vector2<f64>>,
    te_tangent_lower: Option<Vector2<f64>>,
    le_target: Option<LeadingEdgeTarget>,
    sharp: CurvePair,
    thickened: Option<Thickened>,
}

impl AirfoilFitSession {
    /// Fit both surfaces of a normalized airfoil.
    ///
    /// With G2/G3 enabled, both surfaces are first fitted with the linear
    /// constraints only; the shared leading-edge targets are taken from those
    /// seeds and then held fixed for the life of the session.
    pub fn fit(upper: SurfacePoints, lower: SurfacePoints, config: FitConfig) -> Result<Self, FitError> {
        let knots = uniform_clamped_knots(config.degree, config.control_points)?;
        check_layout(config.degree, config.control_points, &config.continuity)?;

        let le_direction = Vector2::y();
        let te_tangent_upper = upper.trailing_edge_tangent(config.te_vector_points);
        let te_tangent_lower = lower.trailing_edge_tangent(config.te_vector_points);

        let upper_job = SurfaceJob {
            surface: Surface::Upper,
            te_point: end_point(&upper, Surface::Upper)?,
            points: upper,
            degree: config.degree,
            knots: knots.clone(),
            te_tangent: te_tangent_upper,
            start: None,
        };
        let lower_job = SurfaceJob {
            surface: Surface::Lower,
            te_point: end_point(&lower, Surface::Lower)?,
            points: lower,
            degree: config.degree,
            knots,
            te_tangent: te_tangent_lower,
            start: None,
        };

        let le_target = if config.continuity.is_nonlinear() {
            let linear = config.continuity.linear_part();
            let seeds = fit_pair(
                &upper_job,
                &lower_job,
                &FitContext {
                    continuity: &linear,
                    le_direction,
                    le_target: None,
                    solver: &config.solver,
                },
            )?;
            let target = LeadingEdgeTarget::from_seeds(&seeds.upper.curve, &seeds.lower.curve);
            log::debug!(
                "leading-edge targets: curvature {:.6}, curvature slope {:.6}",
                target.curvature,
                target.curvature_slope
            );
            Some(target)
        } else {
            None
        };

        let sharp = fit_pair(
            &upper_job,
            &lower_job,
            &FitContext {
                continuity: &config.continuity,
                le_direction,
                le_target,
                solver: &config.solver,
            },
        )?;

        log::info!(
            "fitted airfoil: degree {}, {}+{} control points, {:?} solver (G2 {}, G3 {}, TE tangency {})",
            config.degree,
            sharp.upper.curve.control_point_count(),
            sharp.lower.curve.control_point_count(),
            sharp.upper.solver.path,
            config.continuity.enable_g2,
            config.continuity.enable_g3,
            config.continuity.enable_te_tangent
        );

        Ok(Self {
            config,
            le_direction,
            te_tangent_upper,
            te_tangent_lower,
            le_target,
            sharp,
            thickened: None,
        })
    }

    pub fn config(&self) -> &FitConfig {
        &self.config
    }

    /// The current curves: thickened if thickening is applied, sharp otherwise.
    pub fn curves(&self) -> &CurvePair {
        match &self.thickened {
            Some(t) => &t.pair,
            None => &self.sharp,
        }
    }

    /// The sharp-trailing-edge curves, whether or not thickening is applied.
    pub fn sharp_curves(&self) -> &CurvePair {
        &self.sharp
    }

    pub fn curve(&self, surface: Surface) -> &FittedCurve {
        self.curves().get(surface)
    }

    pub fn le_direction(&self) -> Vector2<f64> {
        self.le_direction
    }

    pub fn le_target(&self) -> Option<LeadingEdgeTarget> {
        self.le_target
    }

    /// Applied trailing-edge half-thickness in chord units (0 when sharp).
    pub fn thickness(&self) -> f64 {
        self.thickened.as_ref().map_or(0.0, |t| t.thickness)
    }

    pub fn is_thickened(&self) -> bool {
        self.thickened.is_some()
    }

    /// Deviation of the current curve of `surface` from the points it was fitted to.
    pub fn deviation(&self, surface: Surface) -> Result<DeviationReport, FitError> {
        self.curve(surface).deviation(self.config.deviation_samples)
    }

    pub fn deviations(&self) -> Result<(DeviationReport, DeviationReport), FitError> {
        let (upper, lower) = rayon::join(|| self.deviation(Surface::Upper), || self.deviation(Surface::Lower));
        Ok((upper?, lower?))
    }

    /// Add one control point to `surface` and re-fit it.
    ///
    /// The sharp curve is refined against the original data, starting the
    /// re-fit from the shape-preserving refined polygon. If thickening is
    /// applied, it is recomputed for the refined surface.
    pub fn refine(&mut self, surface: Surface, strategy: RefineStrategy) -> Result<RefineOutcome, FitError> {
        let sharp = self.sharp.get(surface);
        let before = sharp.deviation(self.config.deviation_samples)?;
        let layout = refined_layout(sharp, &before, strategy, &self.config)?;

        let job = SurfaceJob {
            surface,
            points: sharp.source.clone(),
            degree: layout.curve.degree(),
            knots: layout.curve.knots().clone(),
            te_point: end_point(&sharp.source, surface)?,
            te_tangent: self.te_tangent(surface),
            start: Some(layout.curve.control_points().to_vec()),
        };
        let refitted = fit_surface(&job, &self.context())?;
        let after = refitted.deviation(self.config.deviation_samples)?;

        let rethickened = match &self.thickened {
            Some(t) => Some(self.thicken_one(&refitted, t.thickness)?),
            None => None,
        };

        let outcome = RefineOutcome {
            strategy,
            inserted_knot: layout.inserted_knot,
            degree: refitted.degree(),
            control_points: refitted.curve.control_point_count(),
            max_before: before.max,
            max_after: after.max,
        };
        log::info!(
            "refined {} surface: {} control points, degree {}, max deviation {:.3e} -> {:.3e}",
            surface.label(),
            outcome.control_points,
            outcome.degree,
            outcome.max_before,
            outcome.max_after
        );

        self.sharp.set(refitted);
        if let (Some(t), Some(curve)) = (self.thickened.as_mut(), rethickened) {
            t.pair.set(curve);
        }
        Ok(outcome)
    }

    /// Open the trailing edge to a half-thickness of `thickness_mm`.
    ///
    /// Always computed from the sharp curves, so repeated calls replace the
    /// previous thickening. A thickness of zero removes it.
    pub fn thicken(&mut self, thickness_mm: f64, chord_mm: f64) -> Result<(), FitError> {
        let thickness = normalized_thickness(thickness_mm, chord_mm)?;
        if thickness == 0.0 {
            self.remove_thickening();
            return Ok(());
        }

        let (upper, lower) = rayon::join(
            || self.thicken_one(&self.sharp.upper, thickness),
            || self.thicken_one(&self.sharp.lower, thickness),
        );
        let pair = CurvePair {
            upper: upper?,
            lower: lower?,
        };

        log::info!(
            "thickened trailing edge: {thickness_mm} mm of {chord_mm} mm chord ({thickness:.6} chord units per side)"
        );
        self.thickened = Some(Thickened { thickness, pair });
        Ok(())
    }

    /// Return to the sharp curves.
    pub fn remove_thickening(&mut self) {
        if self.thickened.take().is_some() {
            log::info!("trailing-edge thickening removed");
        }
    }

    fn te_tangent(&self, surface: Surface) -> Option<Vector2<f64>> {
        match surface {
            Surface::Upper => self.te_tangent_upper,
            Surface::Lower => self.te_tangent_lower,
        }
    }

    fn context(&self) -> FitContext<'_> {
        FitContext {
            continuity: &self.config.continuity,
            le_direction: self.le_direction,
            le_target: self.le_target,
            solver: &self.config.solver,
        }
    }

    /// Re-fit one sharp surface to its offset samples. Deviation is then
    /// measured against the sharp curve's reference data, offset the same way.
    fn thicken_one(&self, sharp: &FittedCurve, thickness: f64) -> Result<FittedCurve, FitError> {
        let surface = sharp.surface;
        let points = offset_samples(&sharp.curve, surface, thickness, self.config.thickening_samples)?;
        let sharp_te = sharp
            .control_points()
            .last()
            .copied()
            .unwrap_or_else(|| Point2::new(1.0, 0.0));

        let job = SurfaceJob {
            surface,
            points,
            degree: sharp.degree(),
            knots: sharp.knots().clone(),
            te_point: sharp_te + Vector2::new(0.0, surface.sign() * thickness),
            te_tangent: self.te_tangent(surface),
            start: None,
        };
        let mut fitted = fit_surface(&job, &self.context())?;
        fitted.reference = offset_points(&sharp.reference, surface, thickness);
        Ok(fitted)
    }
}

fn fit_pair(upper: &SurfaceJob, lower: &SurfaceJob, ctx: &FitContext<'_>) -> Result<CurvePair, FitError> {
    let (upper, lower) = rayon::join(|| fit_surface(upper, ctx), || fit_surface(lower, ctx));
    Ok(CurvePair {
        upper: upper?,
        lower: lower?,
    })
}

fn end_point(points: &SurfacePoints, surface: Surface) -> Result<Point2<f64>, FitError> {
    points
        .last()
        .ok_or_else(|| FitError::invalid(format!("{} surface has no points", surface.label())))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Naca4;
    use crate::domain::ContinuityConfig;
    use crate::fit::{outward_curvature, outward_curvature_slope};

    fn naca(code: &str) -> (SurfacePoints, SurfacePoints) {
        Naca4::parse(code).unwrap().surfaces(81).unwrap()
    }

    fn config(continuity: ContinuityConfig) -> FitConfig {
        FitConfig {
            degree: 4,
            control_points: 9,
            continuity,
            deviation_samples: 5000,
            thickening_samples: 400,
            ..FitConfig::default()
        }
    }

    fn smooth() -> ContinuityConfig {
        ContinuityConfig {
            smoothness_weight: 1e-3,
            ..ContinuityConfig::default()
        }
    }

    fn fit(code: &str, continuity: ContinuityConfig) -> AirfoilFitSession {
        let (upper, lower) = naca(code);
        AirfoilFitSession::fit(upper, lower, config(continuity)).unwrap()
    }

    #[test]
    fn naca0012_fits_closely_with_exact_ends() {
        let session = fit("0012", smooth());

        for surface in [Surface::Upper, Surface::Lower] {
            let c = session.curve(surface);
            let cps = c.control_points();
            assert_eq!(cps.len(), 9);
            assert_eq!(cps[0], Point2::origin());
            assert_eq!(cps[1].x, 0.0);
            assert_eq!(cps[8], Point2::new(1.0, 0.0));
            assert!((c.evaluate(0.0) - Point2::origin()).norm() < 1e-6);
            assert!((c.evaluate(1.0) - Point2::new(1.0, 0.0)).norm() < 1e-6);

            let report = session.deviation(surface).unwrap();
            assert!(report.max < 1e-3, "{} max deviation {}", surface.label(), report.max);
        }
        assert!(session.le_target().is_none());
    }

    #[test]
    fn symmetric_input_gives_mirrored_polygons() {
        let session = fit("0012", smooth());
        let pair = session.curves();
        for (u, l) in pair.upper.control_points().iter().zip(pair.lower.control_points()) {
            assert!((u.x - l.x).abs() < 1e-9);
            assert!((u.y + l.y).abs() < 1e-9);
        }
    }

    #[test]
    fn g2_matches_leading_edge_curvature_and_keeps_te() {
        let linear = fit("2412", smooth());
        let g2 = fit(
            "2412",
            ContinuityConfig {
                enable_g2: true,
                ..smooth()
            },
        );

        let target = g2.le_target().unwrap().curvature;
        let ku = outward_curvature(&g2.curve(Surface::Upper).curve, Surface::Upper);
        let kl = outward_curvature(&g2.curve(Surface::Lower).curve, Surface::Lower);
        assert!(target > 0.0);
        assert!((ku - target).abs() < 1e-6 * target);
        assert!((kl - target).abs() < 1e-6 * target);

        for surface in [Surface::Upper, Surface::Lower] {
            let a = linear.curve(surface).control_points();
            let b = g2.curve(surface).control_points();
            assert_eq!(a.last(), b.last());
            assert!(g2.deviation(surface).unwrap().max < 5e-3);
        }
    }

    #[test]
    fn g3_matches_curvature_slope() {
        let session = fit(
            "2412",
            ContinuityConfig {
                enable_g2: true,
                enable_g3: true,
                ..smooth()
            },
        );
        let target = session.le_target().unwrap();
        for surface in [Surface::Upper, Surface::Lower] {
            let curve = &session.curve(surface).curve;
            let kappa = outward_curvature(curve, surface);
            let slope = outward_curvature_slope(curve, surface);
            assert!((kappa - target.curvature).abs() < 1e-6 * target.curvature);
            let want = target.slope_for(surface);
            assert!((slope - want).abs() < 1e-5 * (1.0 + want.abs()), "{slope} vs {want}");
        }
    }

    #[test]
    fn g3_below_cubic_is_a_conflict() {
        let (upper, lower) = naca("0012");
        let cfg = FitConfig {
            degree: 2,
            ..config(ContinuityConfig {
                enable_g2: true,
                enable_g3: true,
                ..smooth()
            })
        };
        let err = AirfoilFitSession::fit(upper, lower, cfg).unwrap_err();
        assert!(matches!(err, FitError::ConstraintConflict(_)));
    }

    #[test]
    fn refinement_adds_one_point_and_does_not_worsen() {
        let mut session = fit("2412", smooth());
        let lower_before = session.curve(Surface::Lower).control_points().to_vec();

        let mut previous = session.deviation(Surface::Upper).unwrap().max;
        for step in 0..4 {
            let outcome = session.refine(Surface::Upper, RefineStrategy::InsertKnot).unwrap();
            assert_eq!(outcome.control_points, 10 + step);
            assert_eq!(session.curve(Surface::Upper).control_points().len(), 10 + step);
            assert!(outcome.inserted_knot.is_some());
            assert!(outcome.max_after <= previous * 1.1, "step {step}: {} > {previous}", outcome.max_after);
            previous = outcome.max_after;
        }

        assert_eq!(session.curve(Surface::Lower).control_points(), lower_before.as_slice());
        let cps = session.curve(Surface::Upper).control_points();
        assert_eq!(cps[0], Point2::origin());
        assert_eq!(cps[cps.len() - 1], Point2::new(1.0, 0.0));
    }

    #[test]
    fn refinement_limit_keeps_session() {
        let (upper, lower) = naca("0012");
        let cfg = FitConfig {
            max_control_points: 9,
            ..config(smooth())
        };
        let mut session = AirfoilFitSession::fit(upper, lower, cfg).unwrap();
        let before = session.curve(Surface::Upper).control_points().to_vec();

        let err = session.refine(Surface::Upper, RefineStrategy::InsertKnot).unwrap_err();
        assert!(matches!(err, FitError::RefinementLimit(_)));
        assert_eq!(session.curve(Surface::Upper).control_points(), before.as_slice());
    }

    #[test]
    fn degree_elevation_needs_a_single_span() {
        let mut session = fit("0012", smooth());
        let err = session.refine(Surface::Upper, RefineStrategy::ElevateDegree).unwrap_err();
        assert!(matches!(err, FitError::InvalidInput(_)));

        let (upper, lower) = naca("0012");
        let cfg = FitConfig {
            control_points: 5,
            ..config(smooth())
        };
        let mut bezier = AirfoilFitSession::fit(upper, lower, cfg).unwrap();
        let outcome = bezier.refine(Surface::Lower, RefineStrategy::ElevateDegree).unwrap();
        assert_eq!(outcome.degree, 5);
        assert_eq!(outcome.control_points, 6);
        assert!(outcome.inserted_knot.is_none());
        assert_eq!(bezier.curve(Surface::Upper).degree(), 4);
    }

    #[test]
    fn thickening_opens_te_and_keeps_le() {
        let mut session = fit("2412", smooth());
        let sharp = session.curves().clone();

        session.thicken(1.0, 200.0).unwrap();
        assert!(session.is_thickened());
        assert!((session.thickness() - 0.005).abs() < 1e-15);

        let upper = session.curve(Surface::Upper);
        let lower = session.curve(Surface::Lower);
        let gap = upper.evaluate(1.0) - lower.evaluate(1.0);
        assert!(gap.x.abs() < 1e-12);
        assert!((gap.y - 0.01).abs() < 1e-9);

        for c in [upper, lower] {
            assert!((c.evaluate(0.0) - Point2::origin()).norm() < 1e-12);
            assert_eq!(c.control_points()[1].x, 0.0);
            assert_eq!(c.knots(), sharp.get(c.surface).knots());
        }

        let once = session.curves().upper.control_points().to_vec();
        session.thicken(1.0, 200.0).unwrap();
        assert_eq!(session.curves().upper.control_points(), once.as_slice());

        session.remove_thickening();
        assert!(!session.is_thickened());
        assert_eq!(session.curves().upper.control_points(), sharp.upper.control_points());
        assert_eq!(session.curves().lower.control_points(), sharp.lower.control_points());
    }

    #[test]
    fn zero_thickness_removes_thickening() {
        let mut session = fit("0012", smooth());
        session.thicken(0.5, 200.0).unwrap();
        session.thicken(0.0, 200.0).unwrap();
        assert!(!session.is_thickened());
        assert!(session.thicken(1.0, 0.0).is_err());
    }

    #[test]
    fn refining_a_thickened_session_rethickens() {
        let mut session = fit("0012", smooth());
        session.thicken(1.0, 200.0).unwrap();
        session.refine(Surface::Upper, RefineStrategy::InsertKnot).unwrap();

        assert!(session.is_thickened());
        assert_eq!(session.sharp_curves().upper.control_points().len(), 10);
        assert_eq!(session.curve(Surface::Upper).control_points().len(), 10);
        let te = session.curve(Surface::Upper).evaluate(1.0);
        assert!((te.y - 0.005).abs() < 1e-9);
    }

    #[test]
    fn thickened_deviation_is_measured_against_offset_data() {
        let (upper, lower) = naca("2412");
        let coarse = FitConfig {
            degree: 3,
            control_points: 5,
            ..config(ContinuityConfig::default())
        };
        let mut session = AirfoilFitSession::fit(upper, lower, coarse).unwrap();
        let sharp = session.deviation(Surface::Upper).unwrap();
        assert!(sharp.max > 1e-4, "coarse fit should be visibly off: {}", sharp.max);

        session.thicken(1.0, 200.0).unwrap();
        let thick = session.deviation(Surface::Upper).unwrap();
        let fitted = session.curve(Surface::Upper);

        assert_eq!(thick.distances.len(), session.sharp_curves().upper.source.len());
        assert_eq!(fitted.reference.last(), Some(Point2::new(1.0, 0.005)));
        assert!(thick.max > 0.5 * sharp.max && thick.max < 1.5 * sharp.max, "{} vs {}", thick.max, sharp.max);
    }

    #[test]
    fn refinement_under_g2_keeps_the_target() {
        let mut session = fit(
            "2412",
            ContinuityConfig {
                enable_g2: true,
                ..smooth()
            },
        );
        let sharp = session.sharp_curves().upper.clone();
        let report = sharp.deviation(session.config().deviation_samples).unwrap();
        let layout = refined_layout(&sharp, &report, RefineStrategy::InsertKnot, session.config()).unwrap();
        for i in 0..=20 {
            let u = i as f64 / 20.0;
            assert!((layout.curve.evaluate(u) - sharp.evaluate(u)).norm() < 1e-12);
        }

        session.refine(Surface::Upper, RefineStrategy::InsertKnot).unwrap();
        let target = session.le_target().unwrap().curvature;
        let refined = session.curve(Surface::Upper);
        assert_eq!(refined.control_points().len(), 10);
        assert!((outward_curvature(&refined.curve, Surface::Upper) - target).abs() < 1e-6 * target);
    }

    #[test]
    fn diverged_solves_leave_the_session_untouched() {
        let (upper, lower) = naca("2412");
        let g2 = ContinuityConfig {
            enable_g2: true,
            ..smooth()
        };
        let mut capped = config(g2);
        capped.solver.max_iterations = 1;
        let err = AirfoilFitSession::fit(upper, lower, capped).unwrap_err();
        assert!(matches!(err, FitError::FitDiverged { iterations: 1, .. }), "{err}");

        let mut session = fit("2412", g2);
        let before = session.curves().clone();
        session.config.solver.max_iterations = 1;

        let err = session.refine(Surface::Upper, RefineStrategy::InsertKnot).unwrap_err();
        assert!(matches!(err, FitError::FitDiverged { .. }), "{err}");
        let err = session.thicken(1.0, 200.0).unwrap_err();
        assert!(matches!(err, FitError::FitDiverged { .. }), "{err}");

        assert!(!session.is_thickened());
        for surface in [Surface::Upper, Surface::Lower] {
            assert_eq!(session.curve(surface).control_points(), before.get(surface).control_points());
            assert_eq!(session.curve(surface).knots(), before.get(surface).knots());
        }
    }
}
