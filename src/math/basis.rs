//! B-spline basis functions on a clamped knot vector.
//!
//! The routines follow the classic formulations:
//!
//! - `find_span`: the knot span index `i` with `U[i] <= u < U[i+1]`
//! - `basis_funs`: the `p + 1` non-zero basis values on that span
//! - `ders_basis_funs`: those values plus their derivatives up to order `k`
//!
//! Numerical notes:
//! - `u` is clamped to `[U[p], U[m-p-1]]`; `u = 1` maps to the last non-empty span
//!   so the curve end point is reachable.
//! - Derivatives above the degree are identically zero and are returned as such.

/// Find the knot span for `u`.
///
/// `n_ctrl` is the number of control points (`knots.len() - degree - 1`).
pub fn find_span(knots: &[f64], degree: usize, n_ctrl: usize, u: f64) -> usize {
    let n = n_ctrl - 1;
    if u >= knots[n + 1] {
        return n;
    }
    if u <= knots[degree] {
        return degree;
    }

    let mut low = degree;
    let mut high = n + 1;
    let mut mid = (low + high) / 2;
    while u < knots[mid] || u >= knots[mid + 1] {
        if u < knots[mid] {
            high = mid;
        } else {
            low = mid;
        }
        mid = (low + high) / 2;
    }
    mid
}

/// Non-zero basis functions `N_{span-p..=span, p}(u)`.
pub fn basis_funs(knots: &[f64], degree: usize, span: usize, u: f64) -> Vec<f64> {
    let p = degree;
    let mut n = vec![0.0; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    n[0] = 1.0;
    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            let temp = n[r] / (right[r + 1] + left[j - r]);
            n[r] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        n[j] = saved;
    }
    n
}

/// Basis functions and their derivatives up to `order` on `span`.
///
/// `out[k][j]` is the `k`-th derivative of `N_{span-p+j, p}` at `u`.
/// Rows above the degree are all zero.
pub fn ders_basis_funs(knots: &[f64], degree: usize, span: usize, u: f64, order: usize) -> Vec<Vec<f64>> {
    let p = degree;
    let nd = order.min(p);
    let mut ders = vec![vec![0.0; p + 1]; order + 1];

    let mut ndu = vec![vec![0.0; p + 1]; p + 1];
    let mut left = vec![0.0; p + 1];
    let mut right = vec![0.0; p + 1];

    ndu[0][0] = 1.0;
    for j in 1..=p {
        left[j] = u - knots[span + 1 - j];
        right[j] = knots[span + j] - u;
        let mut saved = 0.0;
        for r in 0..j {
            // Lower triangle: knot differences.
            ndu[j][r] = right[r + 1] + left[j - r];
            let temp = ndu[r][j - 1] / ndu[j][r];
            // Upper triangle: basis values.
            ndu[r][j] = saved + right[r + 1] * temp;
            saved = left[j - r] * temp;
        }
        ndu[j][j] = saved;
    }

    for j in 0..=p {
        ders[0][j] = ndu[j][p];
    }

    let mut a = vec![vec![0.0; p + 1]; 2];
    for r in 0..=p {
        let (mut s1, mut s2) = (0usize, 1usize);
        a[0][0] = 1.0;

        for k in 1..=nd {
            let mut d = 0.0;
            let rk = r as isize - k as isize;
            let pk = p - k;

            if r >= k {
                let rk = rk as usize;
                a[s2][0] = a[s1][0] / ndu[pk + 1][rk];
                d = a[s2][0] * ndu[rk][pk];
            }

            let j1 = if rk >= -1 { 1 } else { (-rk) as usize };
            let j2 = if r as isize - 1 <= pk as isize { k - 1 } else { p - r };

            for j in j1..=j2 {
                let idx = (rk + j as isize) as usize;
                a[s2][j] = (a[s1][j] - a[s1][j - 1]) / ndu[pk + 1][idx];
                d += a[s2][j] * ndu[idx][pk];
            }

            if r <= pk {
                a[s2][k] = -a[s1][k - 1] / ndu[pk + 1][r];
                d += a[s2][k] * ndu[r][pk];
            }

            ders[k][r] = d;
            std::mem::swap(&mut s1, &mut s2);
        }
    }

    let mut factor = p as f64;
    for k in 1..=nd {
        for value in ders[k].iter_mut() {
            *value *= factor;
        }
        factor *= (p - k) as f64;
    }

    ders
}

/// Full row `[N_0(u), ..., N_{n-1}(u)]` of the collocation matrix.
pub fn basis_row(knots: &[f64], degree: usize, n_ctrl: usize, u: f64) -> Vec<f64> {
    let span = find_span(knots, degree, n_ctrl, u);
    let local = basis_funs(knots, degree, span, u);
    let mut row = vec![0.0; n_ctrl];
    for (j, value) in local.into_iter().enumerate() {
        row[span - degree + j] = value;
    }
    row
}

/// Full rows of basis derivatives: `out[k][i] = N_i^{(k)}(u)` for `k = 0..=order`.
pub fn basis_derivative_rows(knots: &[f64], degree: usize, n_ctrl: usize, u: f64, order: usize) -> Vec<Vec<f64>> {
    let span = find_span(knots, degree, n_ctrl, u);
    let local = ders_basis_funs(knots, degree, span, u, order);
    local
        .into_iter()
        .map(|ders| {
            let mut row = vec![0.0; n_ctrl];
            for (j, value) in ders.into_iter().enumerate() {
                row[span - degree + j] = value;
            }
            row
        })
        .collect()
}
