//! Error types.
//!
//! - `FitError` is what the fitting engine returns. Every failure is reported
//!   synchronously to the caller; the engine never retries on its own.
//! - `ParseError` is what the text readers (`.dat`, `.bsp`, DXF, settings
//!   JSON) return before the caller attaches a path to it.
//! - `AppError` is what the `afit` binary reports: a message plus a process
//!   exit code.

use thiserror::Error;

/// Failures raised by the fitting engine.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Malformed or non-monotonic point data, or an impossible degree/count pair.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The requested continuity cannot be expressed with the given curve layout.
    #[error("constraint conflict: {0}")]
    ConstraintConflict(String),

    /// The nonlinear solver stopped without meeting its tolerances.
    #[error("fit diverged after {iterations} iterations (constraint violation {violation:.3e})")]
    FitDiverged { iterations: usize, violation: f64 },

    /// Refinement would exceed a configured cap or break `n > degree`.
    #[error("refinement limit: {0}")]
    RefinementLimit(String),

    /// The KKT system is singular or too close to singular to trust.
    #[error("numerically ill-conditioned system (reciprocal condition {rcond:.3e})")]
    NumericalIllConditioning { rcond: f64 },
}

impl FitError {
    pub fn invalid(message: impl Into<String>) -> Self {
        FitError::InvalidInput(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        FitError::ConstraintConflict(message.into())
    }
}

/// Failures while reading one of the text formats.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line {line}: {message}")]
    Line { line: usize, message: String },

    #[error("section '{section}': {message}")]
    Section { section: String, message: String },

    #[error("missing section markers '{start}'/'{end}'")]
    MissingSection { start: String, end: String },

    #[error("{0}")]
    Malformed(String),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl ParseError {
    pub fn malformed(message: impl Into<String>) -> Self {
        ParseError::Malformed(message.into())
    }

    pub fn line(line: usize, message: impl Into<String>) -> Self {
        ParseError::Line {
            line,
            message: message.into(),
        }
    }

    pub fn section(section: impl Into<String>, message: impl Into<String>) -> Self {
        ParseError::Section {
            section: section.into(),
            message: message.into(),
        }
    }
}

#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match &err {
            FitError::InvalidInput(_) => 2,
            FitError::ConstraintConflict(_) => 3,
            FitError::FitDiverged { .. } | FitError::NumericalIllConditioning { .. } => 4,
            FitError::RefinementLimit(_) => 5,
        };
        AppError::new(exit_code, err.to_string())
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fit_errors_map_to_distinct_exit_codes() {
        let cases = [
            (FitError::invalid("x"), 2),
            (FitError::conflict("x"), 3),
            (FitError::FitDiverged { iterations: 3, violation: 1.0 }, 4),
            (FitError::RefinementLimit("cap".into()), 5),
        ];
        for (err, code) in cases {
            assert_eq!(AppError::from(err).exit_code(), code);
        }
    }

    #[test]
    fn parse_errors_name_their_location() {
        assert_eq!(ParseError::line(4, "not a pair").to_string(), "line 4: not a pair");
        assert_eq!(
            ParseError::section("Top Knots", "empty").to_string(),
            "section 'Top Knots': empty"
        );
        let json = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        assert!(matches!(ParseError::from(json), ParseError::Json(_)));
    }
}
