//! Tunable defaults and their user override file.
//!
//! Every numeric default lives in [`Settings`]. Users can override individual
//! values with a JSON object whose keys are the upper-case names below, e.g.
//!
//! ```text
//! { "DEFAULT_BSPLINE_DEGREE": 5, "NUM_POINTS_CURVE_ERROR": 20000 }
//! ```
//!
//! Lookup order for the override file:
//! 1. `$AIRFOILFITTER_CONFIG` (a `.env` file is honoured)
//! 2. `airfoilfitter.config.json` next to the executable
//! 3. `airfoilfitter.config.json` in the working directory
//!
//! The engine never reads this itself: the binary loads it once and derives
//! a [`FitConfig`](crate::domain::FitConfig) from it.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ParseError;
use crate::math::SqpOptions;

/// Environment variable pointing at an override file.
pub const CONFIG_ENV_VAR: &str = "AIRFOILFITTER_CONFIG";

/// Override file name searched next to the executable and in the working directory.
pub const USER_CONFIG_FILENAME: &str = "airfoilfitter.config.json";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Settings {
    /// Degree of the B-spline curves (3-7 recommended for airfoils).
    #[serde(rename = "DEFAULT_BSPLINE_DEGREE")]
    pub bspline_degree: usize,
    /// Initial control points per surface (must be >= degree + 1).
    #[serde(rename = "DEFAULT_BSPLINE_CP")]
    pub bspline_control_points: usize,
    /// Roughness penalty weight (higher = smoother, lower = more accurate).
    #[serde(rename = "DEFAULT_SMOOTHNESS_PENALTY")]
    pub smoothness_penalty: f64,

    #[serde(rename = "DEFAULT_CHORD_LENGTH_MM")]
    pub chord_length_mm: f64,
    /// Trailing-edge half-thickness applied after fitting (0 = sharp).
    #[serde(rename = "DEFAULT_TE_THICKNESS_MM")]
    pub te_thickness_mm: f64,

    /// Dense curve samples used for deviation analysis.
    #[serde(rename = "NUM_POINTS_CURVE_ERROR")]
    pub num_points_curve_error: usize,
    #[serde(rename = "PLOT_POINTS_PER_SURFACE")]
    pub plot_points_per_surface: usize,
    /// 0 = uniform sampling, 1 = fully curvature-driven.
    #[serde(rename = "PLOT_CURVATURE_WEIGHT")]
    pub plot_curvature_weight: f64,

    #[serde(rename = "COMB_DENSITY_MIN")]
    pub comb_density_min: usize,
    #[serde(rename = "COMB_DENSITY_MAX")]
    pub comb_density_max: usize,
    #[serde(rename = "COMB_DENSITY_DEFAULT")]
    pub comb_density_default: usize,
    #[serde(rename = "COMB_SCALE_DEFAULT")]
    pub comb_scale_default: f64,

    /// Trailing samples used to estimate the trailing-edge tangent.
    #[serde(rename = "DEFAULT_TE_VECTOR_POINTS")]
    pub te_vector_points: usize,

    #[serde(rename = "MAX_CONTROL_POINTS")]
    pub max_control_points: usize,
    #[serde(rename = "MAX_BSPLINE_DEGREE")]
    pub max_bspline_degree: usize,

    #[serde(rename = "SOLVER_MAX_ITERATIONS")]
    pub solver_max_iterations: usize,
    #[serde(rename = "SOLVER_CONSTRAINT_TOLERANCE")]
    pub solver_constraint_tolerance: f64,
    #[serde(rename = "SOLVER_STEP_TOLERANCE")]
    pub solver_step_tolerance: f64,
    /// Wall-clock cap for one nonlinear solve in milliseconds (0 = no cap).
    #[serde(rename = "SOLVER_TIME_LIMIT_MS")]
    pub solver_time_limit_ms: u64,

    /// Max deviation (chord units) above which a fit is reported as loose.
    #[serde(rename = "DEVIATION_TOLERANCE")]
    pub deviation_tolerance: f64,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            bspline_degree: 4,
            bspline_control_points: 9,
            smoothness_penalty: 0.0,
            chord_length_mm: 200.0,
            te_thickness_mm: 0.0,
            num_points_curve_error: 35_000,
            plot_points_per_surface: 500,
            plot_curvature_weight: 0.85,
            comb_density_min: 100,
            comb_density_max: 1000,
            comb_density_default: 200,
            comb_scale_default: 0.020,
            te_vector_points: 2,
            max_control_points: 60,
            max_bspline_degree: 11,
            solver_max_iterations: 200,
            solver_constraint_tolerance: 1e-10,
            solver_step_tolerance: 1e-10,
            solver_time_limit_ms: 0,
            deviation_tolerance: 1e-3,
        }
    }
}

/// Settings plus the file they were read from (if any).
#[derive(Debug, Clone)]
pub struct LoadedSettings {
    pub settings: Settings,
    pub source: Option<PathBuf>,
}

impl Settings {
    /// Load defaults and apply the first override file found.
    ///
    /// A broken override file is reported and ignored; it never aborts startup.
    pub fn load() -> LoadedSettings {
        dotenvy::dotenv().ok();

        for path in candidate_paths() {
            if !path.is_file() {
                continue;
            }
            match Self::from_file(&path) {
                Ok(settings) => {
                    log::info!("Settings loaded from {}", path.display());
                    return LoadedSettings {
                        settings,
                        source: Some(path),
                    };
                }
                Err(e) => {
                    log::warn!("Failed to read settings '{}': {e}", path.display());
                    break;
                }
            }
        }

        LoadedSettings {
            settings: Self::default(),
            source: None,
        }
    }

    /// Read an override file on top of the defaults.
    pub fn from_file(path: &Path) -> Result<Self, ParseError> {
        let text = std::fs::read_to_string(path)?;
        // Accept a UTF-8 BOM, which some Windows editors insert.
        let text = text.trim_start_matches('\u{feff}');
        let (settings, ignored) = Self::default().with_overrides_json(text)?;
        for key in ignored {
            log::warn!("Ignoring setting '{key}' in '{}'", path.display());
        }
        Ok(settings)
    }

    /// Apply a JSON object of overrides.
    ///
    /// Returns the updated settings and the keys that were ignored, either
    /// because they are unknown or because their value has the wrong type.
    /// Integer keys only accept integers; float keys also accept integers.
    pub fn with_overrides_json(&self, text: &str) -> Result<(Self, Vec<String>), ParseError> {
        let payload: Value = serde_json::from_str(text)?;
        let Value::Object(overrides) = payload else {
            return Err(ParseError::malformed("top-level JSON object expected"));
        };

        let Value::Object(mut current) = serde_json::to_value(self)? else {
            return Err(ParseError::malformed("settings did not serialize to an object"));
        };

        let mut ignored = Vec::new();
        for (key, value) in overrides {
            match coerce(&current, &key, &value) {
                Some(v) => {
                    current.insert(key, v);
                }
                None => ignored.push(key),
            }
        }

        let settings = serde_json::from_value(Value::Object(current))?;
        Ok((settings, ignored))
    }

    pub fn solver_options(&self) -> SqpOptions {
        SqpOptions {
            max_iterations: self.solver_max_iterations,
            constraint_tolerance: self.solver_constraint_tolerance,
            step_tolerance: self.solver_step_tolerance,
            time_limit: match self.solver_time_limit_ms {
                0 => None,
                ms => Some(Duration::from_millis(ms)),
            },
        }
    }

    /// Clamp a requested comb density into the configured range.
    pub fn clamp_comb_density(&self, density: usize) -> usize {
        let lo = self.comb_density_min.min(self.comb_density_max);
        density.clamp(lo, self.comb_density_max.max(lo))
    }
}

/// Coerce an override to the type of the existing value, or reject it.
fn coerce(current: &Map<String, Value>, key: &str, value: &Value) -> Option<Value> {
    let existing = current.get(key)?;
    if existing.is_u64() {
        return value.as_u64().map(Value::from);
    }
    if existing.is_f64() {
        return value.as_f64().map(Value::from);
    }
    None
}

fn candidate_paths() -> Vec<PathBuf> {
    let mut out = Vec::new();

    if let Ok(raw) = std::env::var(CONFIG_ENV_VAR) {
        let raw = raw.trim();
        if !raw.is_empty() {
            out.push(PathBuf::from(raw));
        }
    }
    if let Some(dir) = std::env::current_exe().ok().and_then(|p| p.parent().map(Path::to_path_buf)) {
        out.push(dir.join(USER_CONFIG_FILENAME));
    }
    out.push(PathBuf::from(USER_CONFIG_FILENAME));

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn overrides_apply_known_keys() {
        let (s, ignored) = Settings::default()
            .with_overrides_json(r#"{"DEFAULT_BSPLINE_DEGREE": 5, "PLOT_CURVATURE_WEIGHT": 1}"#)
            .unwrap();
        assert_eq!(s.bspline_degree, 5);
        assert_eq!(s.plot_curvature_weight, 1.0);
        assert!(ignored.is_empty());
    }

    #[test]
    fn overrides_reject_unknown_and_mistyped_keys() {
        let (s, mut ignored) = Settings::default()
            .with_overrides_json(r#"{"NOPE": 1, "DEFAULT_BSPLINE_CP": 2.5, "NUM_POINTS_CURVE_ERROR": true}"#)
            .unwrap();
        ignored.sort();
        assert_eq!(ignored, vec!["DEFAULT_BSPLINE_CP", "NOPE", "NUM_POINTS_CURVE_ERROR"]);
        assert_eq!(s, Settings::default());
    }

    #[test]
    fn overrides_require_an_object() {
        assert!(matches!(
            Settings::default().with_overrides_json("[1, 2]"),
            Err(ParseError::Malformed(_))
        ));
        assert!(matches!(
            Settings::default().with_overrides_json("{not json"),
            Err(ParseError::Json(_))
        ));
    }

    #[test]
    fn time_limit_zero_means_uncapped() {
        let s = Settings::default();
        assert!(s.solver_options().time_limit.is_none());
        let s = Settings {
            solver_time_limit_ms: 250,
            ..Settings::default()
        };
        assert_eq!(s.solver_options().time_limit, Some(Duration::from_millis(250)));
    }

    #[test]
    fn comb_density_is_bounded() {
        let s = Settings::default();
        assert_eq!(s.clamp_comb_density(5), 100);
        assert_eq!(s.clamp_comb_density(5000), 1000);
        assert_eq!(s.clamp_comb_density(300), 300);
    }
}
