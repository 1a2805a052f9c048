//! Input/output adapters around the engine.
//!
//! - Selig/Lednicer `.dat` reader + normalization (`coordinates`)
//! - `.bsp` B-spline model read/write (`bsp`)
//! - resampled Selig `.dat` writer (`dat`)
//! - DXF SPLINE export scaled to millimetres (`dxf`)
//! - curvature-comb CSV export (`export`)

pub mod bsp;
pub mod coordinates;
pub mod dat;
pub mod dxf;
pub mod export;

pub use bsp::*;
pub use coordinates::*;
pub use dat::*;
pub use dxf::*;
pub use export::*;
