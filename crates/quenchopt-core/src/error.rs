//! Error types for energy minimization.
//!
//! This module defines the errors raised by potential oracles and by the
//! optimizers that drive them.

use thiserror::Error;

/// Errors that can occur while evaluating a potential.
#[derive(Debug, Clone, Error)]
pub enum PotentialError {
    /// The potential could not be evaluated at the requested configuration.
    ///
    /// Oracles use this for domain errors, overflow, or failures in an
    /// external energy code.
    #[error("Potential evaluation failed: {reason}")]
    Evaluation {
        /// Description of the failure
        reason: String,
    },

    /// The potential produced a NaN or infinite value.
    #[error("Potential returned a non-finite {what}")]
    NonFinite {
        /// Which quantity was non-finite ("energy" or "gradient")
        what: String,
    },

    /// The gradient does not have the dimension of the configuration.
    #[error("Gradient dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension
        expected: usize,
        /// Actual dimension
        actual: usize,
    },
}

impl PotentialError {
    /// Create an Evaluation error with a custom reason.
    pub fn evaluation<S: Into<String>>(reason: S) -> Self {
        Self::Evaluation {
            reason: reason.into(),
        }
    }

    /// Create a NonFinite error naming the offending quantity.
    pub fn non_finite<S: Into<String>>(what: S) -> Self {
        Self::NonFinite { what: what.into() }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}

/// Errors that can occur during optimization.
#[derive(Debug, Clone, Error)]
pub enum OptimizerError {
    /// Step-size control failed too many times.
    ///
    /// Raised by the step controller once the number of exhausted
    /// backtracking searches exceeds its threshold. The driver turns this
    /// into a failed result instead of returning it to the caller.
    #[error("Line search failed: {failures} step-size control failures at iteration {iteration}")]
    LineSearchFailed {
        /// Number of step-size control failures counted so far
        failures: usize,
        /// Iteration at which the run was abandoned
        iteration: usize,
    },

    /// Invalid optimizer configuration.
    #[error("Invalid optimizer configuration: {reason}")]
    InvalidConfiguration {
        /// Description of the configuration error
        reason: String,
        /// Name of the invalid parameter
        parameter: String,
        /// Value that was invalid
        value: String,
    },

    /// Vector or snapshot dimensions do not match the optimizer.
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimensions
        expected: String,
        /// Actual dimensions
        actual: String,
    },

    /// Propagated potential error.
    #[error("Potential evaluation failed: {0}")]
    Potential(#[from] PotentialError),
}

impl OptimizerError {
    /// Create a LineSearchFailed error.
    pub fn line_search_failed(failures: usize, iteration: usize) -> Self {
        Self::LineSearchFailed {
            failures,
            iteration,
        }
    }

    /// Create an InvalidConfiguration error.
    pub fn invalid_configuration<S1, S2, S3>(reason: S1, parameter: S2, value: S3) -> Self
    where
        S1: Into<String>,
        S2: Into<String>,
        S3: Into<String>,
    {
        Self::InvalidConfiguration {
            reason: reason.into(),
            parameter: parameter.into(),
            value: value.into(),
        }
    }

    /// Create a DimensionMismatch error.
    pub fn dimension_mismatch<S1, S2>(expected: S1, actual: S2) -> Self
    where
        S1: std::fmt::Display,
        S2: std::fmt::Display,
    {
        Self::DimensionMismatch {
            expected: expected.to_string(),
            actual: actual.to_string(),
        }
    }

    /// Returns `true` for the fatal step-size control failure.
    pub fn is_line_search_failure(&self) -> bool {
        matches!(self, Self::LineSearchFailed { .. })
    }
}

/// Result type alias for potential evaluations.
pub type PotentialResult<T> = std::result::Result<T, PotentialError>;

/// Result type alias for optimizer operations.
pub type Result<T> = std::result::Result<T, OptimizerError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_potential_error_display() {
        let err = PotentialError::evaluation("overflow in pair term");
        assert_eq!(
            err.to_string(),
            "Potential evaluation failed: overflow in pair term"
        );

        let err = PotentialError::dimension_mismatch(9, 6);
        assert_eq!(
            err.to_string(),
            "Gradient dimension mismatch: expected 9, got 6"
        );

        let err = PotentialError::non_finite("energy");
        assert!(err.to_string().contains("non-finite energy"));
    }

    #[test]
    fn test_optimizer_error_creation() {
        let err = OptimizerError::line_search_failed(11, 10);
        assert!(err.is_line_search_failure());
        assert!(err.to_string().contains("11 step-size control failures"));

        let err = OptimizerError::invalid_configuration("must be positive", "max_step", "-0.1");
        assert!(matches!(err, OptimizerError::InvalidConfiguration { .. }));
        assert!(!err.is_line_search_failure());
        assert!(err.to_string().contains("Invalid optimizer configuration"));

        let err = OptimizerError::dimension_mismatch(3, 4);
        assert_eq!(err.to_string(), "Dimension mismatch: expected 3, got 4");
    }

    #[test]
    fn test_potential_error_propagation() {
        let potential_err = PotentialError::evaluation("atoms overlap");
        let optimizer_err: OptimizerError = potential_err.into();

        assert!(matches!(optimizer_err, OptimizerError::Potential(_)));
        assert!(optimizer_err.to_string().contains("atoms overlap"));
    }
}
