//! Numerical building blocks: B-spline basis functions, KKT least squares
//! and the SQP solver.

pub mod basis;
pub mod lsq;
pub mod sqp;

pub use basis::*;
pub use lsq::*;
pub use sqp::*;
