//! Plot-ready geometry (no rendering).
//!
//! - curvature combs (`comb`)
//! - curvature-adaptive sample parameters (`sampling`)

pub mod comb;
pub mod sampling;

pub use comb::*;
pub use sampling::*;
