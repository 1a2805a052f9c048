//! Built-in airfoil data.
//!
//! - NACA 4-digit generator (`naca`) used as synthetic input and test fixture

pub mod naca;

pub use naca::*;
