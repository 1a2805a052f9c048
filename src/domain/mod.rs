//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - surface data and curve building blocks (`SurfacePoints`, `KnotVector`, ...)
//! - the per-call engine configuration (`ContinuityConfig`, `FitConfig`)
//! - tunable defaults and their JSON override layer (`Settings`)

pub mod settings;
pub mod types;

pub use settings::*;
pub use types::*;
