//! `airfoil-fitter` library crate.
//!
//! The binary (`afit`) is a thin wrapper around this library so that:
//!
//! - the fitting engine is testable without spawning processes
//! - the engine can be embedded in other front-ends (GUI, batch tools)
//! - file formats and the CLI stay separate from the math

pub mod app;
pub mod cli;
pub mod curve;
pub mod data;
pub mod domain;
pub mod error;
pub mod fit;
pub mod io;
pub mod math;
pub mod plot;
pub mod report;
