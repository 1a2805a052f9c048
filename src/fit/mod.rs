//! Curve fitting engine.
//!
//! Responsibilities:
//!
//! - parameterize surface points and build clamped knot vectors
//! - assemble leading/trailing-edge constraints and fit each surface
//! - refine a surface where it deviates most
//! - thicken the trailing edge and re-fit
//!
//! [`AirfoilFitSession`] ties these together for an upper/lower pair.

pub mod constraints;
pub mod fitter;
pub mod knots;
pub mod parameterize;
pub mod penalty;
pub mod refine;
pub mod session;
pub mod thicken;

pub use constraints::*;
pub use fitter::*;
pub use knots::*;
pub use parameterize::*;
pub use penalty::*;
pub use refine::*;
pub use session::*;
pub use thicken::*;
