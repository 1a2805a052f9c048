//! Equality-constrained least squares via the KKT system.
//!
//! The fitting problems in this crate have the form:
//!
//! ```text
//! minimize    ½ xᵀ H x − gᵀ x
//! subject to  C x = d
//! ```
//!
//! whose stationarity conditions are the symmetric indefinite system
//!
//! ```text
//! [ H  Cᵀ ] [ x ]   [ g ]
//! [ C  0  ] [ μ ] = [ d ]
//! ```
//!
//! Implementation choices:
//! - We solve with an SVD so that near-singular systems are detected rather
//!   than silently producing garbage. The reciprocal condition number
//!   `σ_min / σ_max` is checked against [`RCOND_LIMIT`].
//! - The matrices are small (twice the control-point count plus a handful of
//!   constraints), so SVD cost is negligible next to building `BᵀB`.

use nalgebra::{DMatrix, DVector};

use crate::error::FitError;

/// Systems with `σ_min / σ_max` below this are rejected as ill-conditioned.
pub const RCOND_LIMIT: f64 = 1e-13;

/// Solution of a KKT system: primal variables and Lagrange multipliers.
#[derive(Debug, Clone)]
pub struct KktSolution {
    pub x: DVector<f64>,
    pub multipliers: DVector<f64>,
}

/// Solve `[H Jᵀ; J 0] [x; λ] = [top; bottom]`.
///
/// `hessian` is `n×n`, `jacobian` is `m×n` (`m` may be zero).
pub fn solve_kkt(
    hessian: &DMatrix<f64>,
    jacobian: &DMatrix<f64>,
    top: &DVector<f64>,
    bottom: &DVector<f64>,
) -> Result<KktSolution, FitError> {
    let n = hessian.nrows();
    let m = jacobian.nrows();
    if hessian.ncols() != n || top.len() != n || bottom.len() != m || (m > 0 && jacobian.ncols() != n) {
        return Err(FitError::invalid(format!(
            "KKT dimensions disagree (H {}x{}, J {}x{}, rhs {}+{})",
            hessian.nrows(),
            hessian.ncols(),
            jacobian.nrows(),
            jacobian.ncols(),
            top.len(),
            bottom.len()
        )));
    }

    let size = n + m;
    let mut kkt = DMatrix::<f64>::zeros(size, size);
    kkt.view_mut((0, 0), (n, n)).copy_from(hessian);
    if m > 0 {
        kkt.view_mut((n, 0), (m, n)).copy_from(jacobian);
        kkt.view_mut((0, n), (n, m)).copy_from(&jacobian.transpose());
    }

    let mut rhs = DVector::<f64>::zeros(size);
    rhs.rows_mut(0, n).copy_from(top);
    if m > 0 {
        rhs.rows_mut(n, m).copy_from(bottom);
    }

    let svd = kkt.svd(true, true);
    let s_max = svd.singular_values.max();
    let s_min = svd.singular_values.min();
    let rcond = if s_max > 0.0 && s_max.is_finite() { s_min / s_max } else { 0.0 };
    if !(rcond >= RCOND_LIMIT) {
        return Err(FitError::NumericalIllConditioning { rcond });
    }

    let sol = svd
        .solve(&rhs, 0.0)
        .map_err(|_| FitError::NumericalIllConditioning { rcond })?;
    if sol.iter().any(|v| !v.is_finite()) {
        return Err(FitError::NumericalIllConditioning { rcond });
    }

    Ok(KktSolution {
        x: sol.rows(0, n).into_owned(),
        multipliers: sol.rows(n, m).into_owned(),
    })
}
