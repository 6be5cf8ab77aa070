//! Error types
//!
//! `ForageError` covers input, configuration, rendering and packaging
//! failures. `RegressionError` is kept separate so that a degenerate
//! regression input is never confused with a fitted-but-poor model.

use thiserror::Error;

/// Failures raised by the forage pipeline and its artifact writers
#[derive(Debug, Error)]
pub enum ForageError {
    #[error("parameter '{name}' = {value} outside [{min}, {max}]")]
    InvalidParameter {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("unknown pasture type '{0}'")]
    UnknownPastureType(String),

    #[error("input file {path}: {reason}")]
    InputFile { path: String, reason: String },

    #[error("configuration document {path}: {reason}")]
    ConfigDocument { path: String, reason: String },

    #[error("rendering failed: {0}")]
    Render(String),

    #[error("archive failed: {0}")]
    Archive(String),
}

/// Degenerate regression inputs
#[derive(Debug, Clone, PartialEq, Error)]
pub enum RegressionError {
    #[error("dependent variable '{0}' not present in table")]
    MissingDependent(String),

    #[error("only {usable} usable independent variable(s), need at least 2")]
    InsufficientPredictors { usable: usize },

    #[error("only {0} observation(s), need at least 2")]
    TooFewObservations(usize),
}

/// Check that `value` lies in the closed range `[min, max]`
pub fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ForageError> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(ForageError::InvalidParameter { name, value, min, max })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range_bounds_inclusive() {
        assert!(check_range("x", 0.1, 0.1, 0.9).is_ok());
        assert!(check_range("x", 0.9, 0.1, 0.9).is_ok());
        assert!(check_range("x", f64::NAN, 0.1, 0.9).is_err());

        let err = check_range("utilization_rate", 0.95, 0.1, 0.9).unwrap_err();
        assert!(err.to_string().contains("utilization_rate"));
    }
}
