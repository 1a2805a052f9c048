//! Curve representation.
//!
//! A single clamped B-spline per airfoil surface. Curves are plain values:
//! refinement and thickening build new curves rather than editing in place.

pub mod bspline;

pub use bspline::*;
