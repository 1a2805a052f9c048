//! Roughness penalty over the control polygon.
//!
//! `Σ w_k ‖P_{k+1} − 2P_k + P_{k−1}‖²` over interior `k`, with `w_k = k / n`.
//! The weights grow toward the trailing edge so that the nose, where the
//! data demands high curvature, is penalized least.

use nalgebra::{DMatrix, Point2};

/// Weight of the second difference centred on control point `k`.
pub fn penalty_weight(k: usize, n: usize) -> f64 {
    k as f64 / n as f64
}

/// Evaluate the penalty for a control polygon.
pub fn smoothness_penalty(points: &[Point2<f64>]) -> f64 {
    let n = points.len();
    if n < 3 {
        return 0.0;
    }
    (1..n - 1)
        .map(|k| {
            let d = points[k + 1].coords - points[k].coords * 2.0 + points[k - 1].coords;
            penalty_weight(k, n) * d.norm_squared()
        })
        .sum()
}

/// `Dᵀ W D` for one coordinate, so that the penalty equals `xᵀRx + yᵀRy`.
pub fn roughness_matrix(n: usize) -> DMatrix<f64> {
    let mut r = DMatrix::<f64>::zeros(n, n);
    if n < 3 {
        return r;
    }
    let stencil = [1.0, -2.0, 1.0];
    for k in 1..n - 1 {
        let w = penalty_weight(k, n);
        for (a, sa) in stencil.iter().enumerate() {
            for (b, sb) in stencil.iter().enumerate() {
                r[(k - 1 + a, k - 1 + b)] += w * sa * sb;
            }
        }
    }
    r
}
