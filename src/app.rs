//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads settings (defaults + optional JSON file)
//! - runs the fit pipeline
//! - prints reports and writes optional exports

use clap::Parser;

use crate::cli::{Command, FitArgs, InspectArgs};
use crate::domain::{FitConfig, Settings};
use crate::error::AppError;
use crate::fit::RefineStrategy;
use crate::io::{read_bsp, read_coordinates, write_bsp, write_comb_csv, write_dat, write_dxf};
use crate::plot::curvature_comb;
use crate::report::{analyze_deviation, format_fit_summary, format_model_summary, format_refine_outcome};

pub mod pipeline;

/// Entry point for the `afit` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();
    let loaded = Settings::load();
    if loaded.source.is_none() {
        log::debug!("No settings file found; using built-in defaults");
    }

    match cli.command {
        Command::Fit(args) => handle_fit(args, &loaded.settings),
        Command::Inspect(args) => handle_inspect(args, &loaded.settings),
    }
}

fn handle_fit(args: FitArgs, settings: &Settings) -> Result<(), AppError> {
    let config = fit_config_from_args(&args, settings);
    let request = pipeline::FitRequest {
        refine_upper: args.refine_upper,
        refine_lower: args.refine_lower,
        strategy: if args.elevate_degree {
            RefineStrategy::ElevateDegree
        } else {
            RefineStrategy::InsertKnot
        },
        te_thickness_mm: args.te_thickness_mm.unwrap_or(settings.te_thickness_mm),
        chord_mm: args.chord_mm.unwrap_or(settings.chord_length_mm),
    };

    let data = pipeline::load_airfoil(&args.source, args.samples)?;
    let run = pipeline::run_fit(data, config, &request)?;

    for (surface, outcome) in &run.refinements {
        print!("{}", format_refine_outcome(*surface, outcome));
    }
    println!("{}", format_fit_summary(&run.name, &run.session, &run.deviations));
    for report in [&run.deviations.0, &run.deviations.1] {
        if report.max > settings.deviation_tolerance {
            log::warn!(
                "Max deviation {:.3e} exceeds tolerance {:.3e}; consider refining",
                report.max,
                settings.deviation_tolerance
            );
        }
    }

    // Optional exports.
    let pair = run.session.curves();
    if let Some(path) = &args.export_bsp {
        write_bsp(path, &run.name, &pair.upper.curve, &pair.lower.curve)?;
        log::info!("Wrote {}", path.display());
    }
    if let Some(path) = &args.export_dxf {
        write_dxf(path, &pair.upper.curve, &pair.lower.curve, request.chord_mm)?;
        log::info!("Wrote {} ({} mm chord)", path.display(), request.chord_mm);
    }
    if let Some(path) = &args.export_dat {
        let points = args.dat_points.unwrap_or(settings.plot_points_per_surface);
        write_dat(
            path,
            &run.name,
            &pair.upper.curve,
            &pair.lower.curve,
            points,
            settings.plot_curvature_weight,
        )?;
        log::info!("Wrote {}", path.display());
    }
    if let Some(path) = &args.comb_csv {
        let density = settings.clamp_comb_density(args.comb_density.unwrap_or(settings.comb_density_default));
        let scale = args.comb_scale.unwrap_or(settings.comb_scale_default);
        let upper = curvature_comb(&pair.upper.curve, density, scale)?;
        let lower = curvature_comb(&pair.lower.curve, density, scale)?;
        write_comb_csv(path, &upper, &lower)?;
        log::info!("Wrote {}", path.display());
    }

    Ok(())
}

fn handle_inspect(args: InspectArgs, settings: &Settings) -> Result<(), AppError> {
    let model = read_bsp(&args.bsp)?;

    let deviations = match &args.dat {
        Some(path) => {
            let foil = read_coordinates(path)?;
            let samples = settings.num_points_curve_error;
            let upper = analyze_deviation(&model.upper, foil.upper.points(), samples)?;
            let lower = analyze_deviation(&model.lower, foil.lower.points(), samples)?;
            Some((upper, lower))
        }
        None => None,
    };

    println!(
        "{}",
        format_model_summary(&model.name, &model.upper, &model.lower, deviations.as_ref())
    );
    Ok(())
}

/// Settings-derived engine config with CLI overrides applied.
pub fn fit_config_from_args(args: &FitArgs, settings: &Settings) -> FitConfig {
    let mut config = FitConfig::from_settings(settings);
    if let Some(degree) = args.degree {
        config.degree = degree;
    }
    if let Some(n) = args.control_points {
        config.control_points = n;
    }
    if let Some(weight) = args.smoothness {
        config.continuity.smoothness_weight = weight;
    }
    if let Some(points) = args.te_vector_points {
        config.te_vector_points = points;
    }
    config.continuity.enable_g2 = args.g2 || args.g3;
    config.continuity.enable_g3 = args.g3;
    config.continuity.enable_te_tangent = args.te_tangency;
    config
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::Cli;

    fn fit_args(argv: &[&str]) -> FitArgs {
        let mut full = vec!["afit", "fit"];
        full.extend_from_slice(argv);
        match Cli::try_parse_from(full).unwrap().command {
            Command::Fit(args) => args,
            Command::Inspect(_) => panic!("expected fit"),
        }
    }

    #[test]
    fn cli_overrides_settings() {
        let settings = Settings::default();
        let args = fit_args(&["--naca", "0012", "--degree", "5", "--smoothness", "0.01", "--g3"]);
        let config = fit_config_from_args(&args, &settings);

        assert_eq!(config.degree, 5);
        assert_eq!(config.control_points, settings.bspline_control_points);
        assert_eq!(config.continuity.smoothness_weight, 0.01);
        assert!(config.continuity.enable_g2 && config.continuity.enable_g3);
        assert!(!config.continuity.enable_te_tangent);
    }

    #[test]
    fn defaults_come_from_settings() {
        let (settings, _) = Settings::default()
            .with_overrides_json(r#"{"DEFAULT_BSPLINE_CP": 12}"#)
            .unwrap();
        let config = fit_config_from_args(&fit_args(&["--naca", "0012"]), &settings);
        assert_eq!(config.control_points, 12);
        assert_eq!(config.degree, 4);
    }
}
