//! Command-line parsing for the `afit` airfoil fitter.
//!
//! The goal of this module is to keep **argument parsing** separate from the
//! engine. Every numeric option is optional: when absent, the value comes from
//! [`Settings`](crate::domain::Settings) (defaults plus config file).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "afit", version, about = "Constrained B-spline fitting for airfoil coordinates")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit both surfaces, optionally refine/thicken, print a summary and export.
    Fit(FitArgs),
    /// Print the layout of a saved `.bsp` model, optionally against reference data.
    Inspect(InspectArgs),
}

/// Where the airfoil coordinates come from.
#[derive(Debug, Args, Clone)]
#[group(required = true, multiple = false)]
pub struct SourceArgs {
    /// Airfoil coordinate file (Selig or Lednicer).
    #[arg(long, value_name = "FILE")]
    pub dat: Option<PathBuf>,

    /// Generate a NACA 4-digit airfoil instead (e.g. 2412).
    #[arg(long, value_name = "DIGITS")]
    pub naca: Option<String>,
}

#[derive(Debug, Parser, Clone)]
pub struct FitArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// B-spline degree.
    #[arg(long)]
    pub degree: Option<usize>,

    /// Initial control points per surface.
    #[arg(long)]
    pub control_points: Option<usize>,

    /// Smoothness penalty weight (>= 0).
    #[arg(long)]
    pub smoothness: Option<f64>,

    /// Match leading-edge curvature between the surfaces.
    #[arg(long)]
    pub g2: bool,

    /// Also match the leading-edge curvature slope (implies --g2).
    #[arg(long)]
    pub g3: bool,

    /// Align the last control-polygon leg with the data's trailing-edge tangent.
    #[arg(long)]
    pub te_tangency: bool,

    /// Trailing points used to estimate the trailing-edge tangent.
    #[arg(long)]
    pub te_vector_points: Option<usize>,

    /// Refinement steps on the upper surface.
    #[arg(long, default_value_t = 0)]
    pub refine_upper: usize,

    /// Refinement steps on the lower surface.
    #[arg(long, default_value_t = 0)]
    pub refine_lower: usize,

    /// Refine by degree elevation instead of knot insertion (single-span curves only).
    #[arg(long)]
    pub elevate_degree: bool,

    /// Trailing-edge half-thickness in millimetres.
    #[arg(long)]
    pub te_thickness_mm: Option<f64>,

    /// Chord length in millimetres (scales the thickness).
    #[arg(long)]
    pub chord_mm: Option<f64>,

    /// Points per surface when generating a NACA airfoil.
    #[arg(long, default_value_t = crate::data::DEFAULT_NACA_POINTS)]
    pub samples: usize,

    /// Write the fitted model as a `.bsp` file.
    #[arg(long, value_name = "FILE")]
    pub export_bsp: Option<PathBuf>,

    /// Write both curves as DXF SPLINE entities, scaled by the chord length.
    #[arg(long, value_name = "FILE")]
    pub export_dxf: Option<PathBuf>,

    /// Write a resampled Selig `.dat` file.
    #[arg(long, value_name = "FILE")]
    pub export_dat: Option<PathBuf>,

    /// Points per surface in the exported `.dat`.
    #[arg(long)]
    pub dat_points: Option<usize>,

    /// Write curvature-comb geometry as CSV.
    #[arg(long, value_name = "FILE")]
    pub comb_csv: Option<PathBuf>,

    /// Comb teeth per knot span (clamped to the configured range).
    #[arg(long)]
    pub comb_density: Option<usize>,

    /// Comb tooth length per unit curvature.
    #[arg(long)]
    pub comb_scale: Option<f64>,
}

#[derive(Debug, Parser, Clone)]
pub struct InspectArgs {
    /// `.bsp` model file.
    #[arg(value_name = "BSP")]
    pub bsp: PathBuf,

    /// Airfoil coordinate file (Selig or Lednicer) to measure the model against.
    #[arg(long, value_name = "FILE")]
    pub dat: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_needs_exactly_one_source() {
        assert!(Cli::try_parse_from(["afit", "fit"]).is_err());
        assert!(Cli::try_parse_from(["afit", "fit", "--naca", "0012", "--dat", "a.dat"]).is_err());

        let cli = Cli::try_parse_from(["afit", "fit", "--naca", "2412", "--g2", "--refine-upper", "3"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.source.naca.as_deref(), Some("2412"));
        assert!(args.g2 && !args.g3);
        assert_eq!(args.refine_upper, 3);
        assert_eq!(args.degree, None);
        assert_eq!(args.export_dxf, None);

        let cli = Cli::try_parse_from(["afit", "fit", "--dat", "foil.dat", "--export-dxf", "foil.dxf"]).unwrap();
        let Command::Fit(args) = cli.command else {
            panic!("expected fit");
        };
        assert_eq!(args.export_dxf, Some(PathBuf::from("foil.dxf")));
    }

    #[test]
    fn inspect_takes_a_positional_model() {
        let cli = Cli::try_parse_from(["afit", "inspect", "foil.bsp", "--dat", "foil.dat"]).unwrap();
        let Command::Inspect(args) = cli.command else {
            panic!("expected inspect");
        };
        assert_eq!(args.bsp, PathBuf::from("foil.bsp"));
        assert_eq!(args.dat, Some(PathBuf::from("foil.dat")));
    }
}
