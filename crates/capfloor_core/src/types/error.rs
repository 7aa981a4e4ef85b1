//! Error types for structured error handling.
//!
//! This module provides:
//! - `InterpolationError`: Errors from interpolation operations
//! - `SolverError`: Errors from root-finding and least-squares solvers

use thiserror::Error;

/// Interpolation-related errors.
///
/// Provides structured error handling for interpolation operations
/// with descriptive context for each failure mode.
///
/// # Variants
/// - `OutOfBounds`: Query point outside valid interpolation domain
/// - `InsufficientData`: Not enough data points for interpolation
/// - `NonMonotonicData`: Node abscissas not strictly increasing
/// - `InvalidInput`: General invalid input error
///
/// # Examples
/// ```
/// use capfloor_core::types::InterpolationError;
///
/// let err = InterpolationError::OutOfBounds { x: 5.0, min: 0.0, max: 3.0 };
/// assert!(format!("{}", err).contains("outside valid domain"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum InterpolationError {
    /// Query point outside valid interpolation domain.
    #[error("Query point {x} outside valid domain [{min}, {max}]")]
    OutOfBounds {
        /// The query point that was out of bounds
        x: f64,
        /// Minimum valid value
        min: f64,
        /// Maximum valid value
        max: f64,
    },

    /// Insufficient data points for interpolation.
    #[error("Insufficient data points: got {got}, need at least {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Node abscissas are not strictly increasing.
    #[error("Data is not strictly increasing at index {index}")]
    NonMonotonicData {
        /// Index where monotonicity violation was detected
        index: usize,
    },

    /// Invalid input data or parameters.
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Root-finding and least-squares solver errors.
///
/// Provides structured error handling for solver operations
/// with descriptive context for each failure mode.
///
/// # Variants
/// - `MaxIterationsExceeded`: Solver failed to converge within iteration limit
/// - `DerivativeNearZero`: Derivative too small for Newton-Raphson
/// - `NoBracket`: Function values at bracket endpoints have same sign
/// - `SingularMatrix`: A linear system could not be solved with the chosen decomposition
/// - `DimensionMismatch`: Vector/matrix sizes are inconsistent
/// - `NumericalInstability`: General numerical instability
/// - `FunctionEvaluation`: The objective could not be evaluated
/// - `InvalidStart`: Starting point rejected by the allowed-domain predicate
///
/// # Examples
/// ```
/// use capfloor_core::types::SolverError;
///
/// let err = SolverError::MaxIterationsExceeded { iterations: 100 };
/// assert!(format!("{}", err).contains("100 iterations"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SolverError {
    /// Solver failed to converge within maximum iterations.
    #[error("Failed to converge after {iterations} iterations")]
    MaxIterationsExceeded {
        /// Number of iterations attempted
        iterations: usize,
    },

    /// Derivative near zero (division by zero risk in Newton-Raphson).
    #[error("Derivative near zero at x = {x}")]
    DerivativeNearZero {
        /// The x value where derivative was near zero
        x: f64,
    },

    /// No valid bracket (function values at endpoints have same sign).
    #[error("No bracket: f({a}) and f({b}) have same sign")]
    NoBracket {
        /// Left bracket endpoint
        a: f64,
        /// Right bracket endpoint
        b: f64,
    },

    /// Linear system could not be solved.
    #[error("Singular matrix: {decomposition} decomposition failed for {size}x{size} system")]
    SingularMatrix {
        /// Name of the decomposition that failed
        decomposition: String,
        /// Dimension of the square system
        size: usize,
    },

    /// Inconsistent vector or matrix dimensions.
    #[error("Dimension mismatch for {what}: expected {expected}, got {got}")]
    DimensionMismatch {
        /// What was being checked
        what: String,
        /// Expected size
        expected: usize,
        /// Actual size
        got: usize,
    },

    /// Numerical instability during computation.
    #[error("Numerical instability: {0}")]
    NumericalInstability(String),

    /// The objective function could not be evaluated.
    #[error("Function evaluation failed: {0}")]
    FunctionEvaluation(String),

    /// The starting point is outside the allowed parameter domain.
    #[error("Invalid starting point: {0}")]
    InvalidStart(String),
}

impl SolverError {
    /// Create a dimension mismatch error.
    pub fn dimension_mismatch(what: impl Into<String>, expected: usize, got: usize) -> Self {
        SolverError::DimensionMismatch {
            what: what.into(),
            expected,
            got,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // InterpolationError Tests
    // ========================================

    #[test]
    fn test_interpolation_error_out_of_bounds_display() {
        let err = InterpolationError::OutOfBounds {
            x: 5.0,
            min: 0.0,
            max: 3.0,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("5"));
        assert!(msg.contains("outside valid domain"));
    }

    #[test]
    fn test_interpolation_error_insufficient_data_display() {
        let err = InterpolationError::InsufficientData { got: 1, need: 2 };
        assert_eq!(
            format!("{}", err),
            "Insufficient data points: got 1, need at least 2"
        );
    }

    #[test]
    fn test_interpolation_error_non_monotonic_display() {
        let err = InterpolationError::NonMonotonicData { index: 3 };
        assert!(format!("{}", err).contains("index 3"));
    }

    // ========================================
    // SolverError Tests
    // ========================================

    #[test]
    fn test_solver_error_max_iterations_display() {
        let err = SolverError::MaxIterationsExceeded { iterations: 100 };
        assert_eq!(format!("{}", err), "Failed to converge after 100 iterations");
    }

    #[test]
    fn test_solver_error_singular_matrix_display() {
        let err = SolverError::SingularMatrix {
            decomposition: "Cholesky".to_string(),
            size: 4,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Cholesky"));
        assert!(msg.contains("4x4"));
    }

    #[test]
    fn test_solver_error_dimension_mismatch_helper() {
        let err = SolverError::dimension_mismatch("start", 3, 2);
        assert_eq!(
            err,
            SolverError::DimensionMismatch {
                what: "start".to_string(),
                expected: 3,
                got: 2
            }
        );
        assert!(format!("{}", err).contains("expected 3, got 2"));
    }

    #[test]
    fn test_solver_error_trait_implementation() {
        let err = SolverError::NumericalInstability("NaN".to_string());
        let _: &dyn std::error::Error = &err;
    }
}
