//! NACA 4-digit airfoil generator.
//!
//! Produces normalized surface points for a `MPTT` designation:
//!
//! - `M`: maximum camber in percent of chord
//! - `P`: position of maximum camber in tenths of chord
//! - `TT`: maximum thickness in percent of chord
//!
//! Notes:
//! - The closed-trailing-edge thickness coefficient (`-0.1036`) is used, so
//!   both surfaces meet at `(1, 0)`.
//! - Thickness is added vertically to the camber line instead of along its
//!   normal. That keeps `x` identical on both surfaces and monotonic, which
//!   the parameterizer requires.
//! - Points use cosine spacing, clustering samples at both ends.

use crate::domain::SurfacePoints;
use crate::error::FitError;

const A0: f64 = 0.2969;
const A1: f64 = -0.1260;
const A2: f64 = -0.3516;
const A3: f64 = 0.2843;
const A4: f64 = -0.1036;

/// Default number of points per surface (leading and trailing edge included).
pub const DEFAULT_NACA_POINTS: usize = 81;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Naca4 {
    /// Maximum camber (chord units).
    pub max_camber: f64,
    /// Chordwise position of maximum camber (chord units).
    pub camber_position: f64,
    /// Maximum thickness (chord units).
    pub thickness: f64,
}

impl Naca4 {
    /// Parse a designation such as `"2412"` or `"NACA 0012"`.
    pub fn parse(code: &str) -> Result<Self, FitError> {
        let trimmed = code.trim();
        let digits = trimmed
            .strip_prefix("NACA")
            .or_else(|| trimmed.strip_prefix("naca"))
            .unwrap_or(trimmed)
            .trim();
        if digits.len() != 4 || !digits.bytes().all(|b| b.is_ascii_digit()) {
            return Err(FitError::invalid(format!("'{code}' is not a NACA 4-digit designation")));
        }

        let d: Vec<f64> = digits.bytes().map(|b| f64::from(b - b'0')).collect();
        let profile = Self {
            max_camber: d[0] / 100.0,
            camber_position: d[1] / 10.0,
            thickness: (d[2] * 10.0 + d[3]) / 100.0,
        };
        if profile.thickness <= 0.0 {
            return Err(FitError::invalid(format!("'{code}' has zero thickness")));
        }
        if profile.max_camber > 0.0 && profile.camber_position == 0.0 {
            return Err(FitError::invalid(format!("'{code}' has camber but no camber position")));
        }
        Ok(profile)
    }

    /// Designation in `NACA MPTT` form.
    pub fn name(&self) -> String {
        format!(
            "NACA {}{}{:02}",
            (self.max_camber * 100.0).round() as u32,
            (self.camber_position * 10.0).round() as u32,
            (self.thickness * 100.0).round() as u32
        )
    }

    /// Half-thickness at `x`.
    pub fn thickness_at(&self, x: f64) -> f64 {
        let x = x.clamp(0.0, 1.0);
        5.0 * self.thickness * (A0 * x.sqrt() + x * (A1 + x * (A2 + x * (A3 + x * A4))))
    }

    /// Camber line height at `x`.
    pub fn camber_at(&self, x: f64) -> f64 {
        let (m, p) = (self.max_camber, self.camber_position);
        if m == 0.0 {
            return 0.0;
        }
        let x = x.clamp(0.0, 1.0);
        if x < p {
            m / (p * p) * (2.0 * p * x - x * x)
        } else {
            m / ((1.0 - p) * (1.0 - p)) * ((1.0 - 2.0 * p) + 2.0 * p * x - x * x)
        }
    }

    /// Upper and lower surfaces, each ordered leading edge to trailing edge.
    pub fn surfaces(&self, points_per_surface: usize) -> Result<(SurfacePoints, SurfacePoints), FitError> {
        if points_per_surface < 2 {
            return Err(FitError::invalid(format!(
                "need at least 2 points per surface, got {points_per_surface}"
            )));
        }

        let last = points_per_surface - 1;
        let mut upper = Vec::with_capacity(points_per_surface);
        let mut lower = Vec::with_capacity(points_per_surface);
        for i in 0..points_per_surface {
            let (x, yc, yt) = if i == 0 {
                (0.0, 0.0, 0.0)
            } else if i == last {
                (1.0, 0.0, 0.0)
            } else {
                let beta = std::f64::consts::PI * i as f64 / last as f64;
                let x = 0.5 * (1.0 - beta.cos());
                (x, self.camber_at(x), self.thickness_at(x))
            };
            upper.push((x, yc + yt));
            lower.push((x, yc - yt));
        }

        Ok((SurfacePoints::from_xy(&upper), SurfacePoints::from_xy(&lower)))
    }
}
