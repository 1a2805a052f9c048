//! Shared "fit pipeline" logic behind `afit fit`.
//!
//! Keeping this in one place keeps the workflow testable without a process:
//! load/generate -> fit -> refine -> thicken -> deviations
//!
//! `app` then only deals with printing and exports.

use crate::cli::SourceArgs;
use crate::data::Naca4;
use crate::domain::{FitConfig, Surface, SurfacePoints};
use crate::error::AppError;
use crate::fit::{AirfoilFitSession, RefineOutcome, RefineStrategy};
use crate::io::read_coordinates;
use crate::report::DeviationReport;

/// A named pair of normalized surfaces.
#[derive(Debug, Clone)]
pub struct AirfoilData {
    pub name: String,
    pub upper: SurfacePoints,
    pub lower: SurfacePoints,
}

/// What to do after the initial fit.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FitRequest {
    pub refine_upper: usize,
    pub refine_lower: usize,
    pub strategy: RefineStrategy,
    pub te_thickness_mm: f64,
    pub chord_mm: f64,
}

/// All computed outputs of a single `afit fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub name: String,
    pub session: AirfoilFitSession,
    pub refinements: Vec<(Surface, RefineOutcome)>,
    pub deviations: (DeviationReport, DeviationReport),
}

/// Read a Selig/Lednicer file or generate a NACA airfoil.
pub fn load_airfoil(source: &SourceArgs, naca_points: usize) -> Result<AirfoilData, AppError> {
    match (&source.dat, &source.naca) {
        (Some(path), _) => {
            let foil = read_coordinates(path)?;
            log::info!(
                "Loaded '{}' from {} ({} upper, {} lower points)",
                foil.name,
                path.display(),
                foil.upper.len(),
                foil.lower.len()
            );
            Ok(AirfoilData {
                name: foil.name,
                upper: foil.upper,
                lower: foil.lower,
            })
        }
        (None, Some(code)) => {
            let profile = Naca4::parse(code)?;
            let (upper, lower) = profile.surfaces(naca_points)?;
            Ok(AirfoilData {
                name: profile.name(),
                upper,
                lower,
            })
        }
        (None, None) => Err(AppError::new(2, "Either --dat or --naca is required.")),
    }
}

/// Execute the full fitting pipeline and return the computed outputs.
pub fn run_fit(data: AirfoilData, config: FitConfig, request: &FitRequest) -> Result<RunOutput, AppError> {
    let mut session = AirfoilFitSession::fit(data.upper, data.lower, config)?;

    let mut refinements = Vec::with_capacity(request.refine_upper + request.refine_lower);
    for (surface, steps) in [(Surface::Upper, request.refine_upper), (Surface::Lower, request.refine_lower)] {
        for _ in 0..steps {
            let outcome = session.refine(surface, request.strategy)?;
            refinements.push((surface, outcome));
        }
    }

    if request.te_thickness_mm > 0.0 {
        session.thicken(request.te_thickness_mm, request.chord_mm)?;
    }

    let deviations = session.deviations()?;
    Ok(RunOutput {
        name: data.name,
        session,
        refinements,
        deviations,
    })
}
