//! Knot vector construction.
//!
//! Fits start from a uniform clamped knot vector; refinement later inserts
//! knots where the deviation is worst, so uniform spacing is only the seed.

use crate::domain::KnotVector;
use crate::error::FitError;

/// Clamped knot vector of length `n + d + 1`: `d + 1` zeros, `d + 1` ones and
/// `n - d - 1` uniformly spaced interior knots.
pub fn uniform_clamped_knots(degree: usize, control_points: usize) -> Result<KnotVector, FitError> {
    if degree < 1 {
        return Err(FitError::invalid("B-spline degree must be at least 1"));
    }
    if control_points <= degree {
        return Err(FitError::invalid(format!(
            "{control_points} control points cannot carry a degree {degree} curve (need more than {degree})"
        )));
    }

    let m = control_points + degree + 1;
    let interior = control_points - degree - 1;
    let mut knots = vec![0.0; m];
    for i in 1..=interior {
        knots[degree + i] = i as f64 / (interior + 1) as f64;
    }
    for k in knots.iter_mut().skip(m - degree - 1) {
        *k = 1.0;
    }

    Ok(KnotVector::new(knots))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamped_structure_holds_for_many_shapes() {
        for degree in 1..=7 {
            for n in (degree + 1)..(degree + 12) {
                let kv = uniform_clamped_knots(degree, n).unwrap();
                let k = kv.values();
                assert_eq!(k.len(), n + degree + 1);
                assert!(k.windows(2).all(|w| w[1] >= w[0]));
                assert!(k[..=degree].iter().all(|v| *v == 0.0));
                assert!(k[k.len() - degree - 1..].iter().all(|v| *v == 1.0));
                assert_eq!(kv.control_point_count(degree), n);
            }
        }
    }

    #[test]
    fn interior_knots_are_uniform() {
        let kv = uniform_clamped_knots(4, 9).unwrap();
        assert_eq!(kv.interior(4), &[0.2, 0.4, 0.6, 0.8]);
    }

    #[test]
    fn bezier_has_no_interior_knots() {
        let kv = uniform_clamped_knots(3, 4).unwrap();
        assert_eq!(kv.values(), &[0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn invalid_shapes_are_rejected() {
        assert!(matches!(uniform_clamped_knots(0, 5), Err(FitError::InvalidInput(_))));
        assert!(matches!(uniform_clamped_knots(4, 4), Err(FitError::InvalidInput(_))));
    }
}
