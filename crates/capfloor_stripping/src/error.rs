//! Caplet stripping error types.
//!
//! Every failure carries the diagnostic context needed to locate the bad
//! input: the cap index, the offending value, or the solver state.

use capfloor_core::market_data::MarketDataError;
use capfloor_core::types::{InterpolationError, SolverError};
use capfloor_models::analytical::AnalyticalError;
use capfloor_models::instruments::InstrumentError;
use capfloor_models::models::SABRError;
use thiserror::Error;

/// Errors raised while building pricers, binding volatility functions or
/// calibrating.
///
/// # Variants
///
/// - `InconsistentIndex`: Caps reference different rate indices
/// - `CapletCollision`: Two caplets share (fixing, strike) but not market data
/// - `LengthMismatch`: Input array has the wrong length
/// - `InvalidMarketData`: Negative vol, non-positive error, price below intrinsic
/// - `InsufficientData`: Fewer observations than parameters for least squares
/// - `Configuration`: Volatility model or method cannot be set up as requested
/// - `ConvergenceFailure`: Root finding or least squares (after the SVD retry) failed
/// - Wrapped lower-layer errors
///
/// # Examples
///
/// ```
/// use capfloor_stripping::StrippingError;
///
/// let err = StrippingError::InsufficientData {
///     observations: 3,
///     parameters: 5,
/// };
/// assert!(format!("{}", err).contains("penalty"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum StrippingError {
    /// Caps reference more than one rate index.
    #[error("Cap {cap} references index {found}, expected {expected}")]
    InconsistentIndex {
        /// Index of the first cap
        expected: String,
        /// Index of the offending cap
        found: String,
        /// Position of the offending cap
        cap: usize,
    },

    /// Caplets with equal fixing and strike resolve to different market data.
    #[error("Caplets fixing at {fixing_time} with strike {strike} have different forwards or accruals")]
    CapletCollision {
        /// Fixing time in years
        fixing_time: f64,
        /// Strike rate
        strike: f64,
    },

    /// An input array has the wrong length.
    #[error("Wrong number of {what}: expected {expected}, got {got}")]
    LengthMismatch {
        /// What was being checked
        what: String,
        /// Expected length
        expected: usize,
        /// Actual length
        got: usize,
    },

    /// A market quote or error weight is out of range.
    #[error("Invalid market data for cap {cap}: {message}")]
    InvalidMarketData {
        /// Position of the offending cap
        cap: usize,
        /// What is wrong
        message: String,
    },

    /// Fewer observations than model parameters for a plain least-squares fit.
    #[error(
        "Number of observations ({observations}) is less than number of model parameters \
         ({parameters}); use the penalty method"
    )]
    InsufficientData {
        /// Number of market observations
        observations: usize,
        /// Number of model parameters
        parameters: usize,
    },

    /// Model or method configuration error.
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A requested solve did not converge (least squares after its SVD retry).
    #[error("Calibration failed after {iterations} iterations: residual = {residual}")]
    ConvergenceFailure {
        /// Iterations of the last attempt
        iterations: usize,
        /// At the last iterate: chi-square for least squares, largest
        /// absolute residual for root finding
        residual: f64,
    },

    /// General invalid input error.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Wrapped solver error.
    #[error("Solver error: {0}")]
    Solver(#[from] SolverError),

    /// Wrapped interpolation error.
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// Wrapped market data error.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),

    /// Wrapped instrument error.
    #[error("Instrument error: {0}")]
    Instrument(#[from] InstrumentError),

    /// Wrapped Black formula error.
    #[error("Analytical error: {0}")]
    Analytical(#[from] AnalyticalError),

    /// Wrapped SABR error.
    #[error("SABR error: {0}")]
    Sabr(#[from] SABRError),
}

impl StrippingError {
    /// Create a length mismatch error.
    pub fn length_mismatch(what: impl Into<String>, expected: usize, got: usize) -> Self {
        Self::LengthMismatch {
            what: what.into(),
            expected,
            got,
        }
    }

    /// Create an invalid market data error.
    pub fn invalid_market_data(cap: usize, message: impl Into<String>) -> Self {
        Self::InvalidMarketData {
            cap,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration(message.into())
    }

    /// Check if this is a convergence failure.
    pub fn is_convergence_failure(&self) -> bool {
        matches!(self, Self::ConvergenceFailure { .. })
    }

    /// Check if this is an input validation error.
    pub fn is_validation_error(&self) -> bool {
        matches!(
            self,
            Self::LengthMismatch { .. } | Self::InvalidMarketData { .. } | Self::InvalidInput(_)
        )
    }
}

/// Errors crossing the `VectorFunction` boundary must be solver errors.
impl From<StrippingError> for SolverError {
    fn from(err: StrippingError) -> Self {
        match err {
            StrippingError::Solver(inner) => inner,
            other => SolverError::FunctionEvaluation(other.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ========================================
    // Display Tests
    // ========================================

    #[test]
    fn test_inconsistent_index_display() {
        let err = StrippingError::InconsistentIndex {
            expected: "EURIBOR3M".to_string(),
            found: "EURIBOR6M".to_string(),
            cap: 2,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("Cap 2"));
        assert!(msg.contains("EURIBOR6M"));
    }

    #[test]
    fn test_length_mismatch_helper() {
        let err = StrippingError::length_mismatch("cap prices", 4, 3);
        assert_eq!(
            format!("{}", err),
            "Wrong number of cap prices: expected 4, got 3"
        );
        assert!(err.is_validation_error());
    }

    #[test]
    fn test_convergence_failure_display() {
        let err = StrippingError::ConvergenceFailure {
            iterations: 200,
            residual: 0.5,
        };
        let msg = format!("{}", err);
        assert!(msg.contains("200"));
        assert!(msg.contains("0.5"));
        assert!(err.is_convergence_failure());
        assert!(!err.is_validation_error());
    }

    // ========================================
    // Conversion Tests
    // ========================================

    #[test]
    fn test_from_solver_error_round_trip() {
        let solver = SolverError::MaxIterationsExceeded { iterations: 7 };
        let err: StrippingError = solver.clone().into();
        assert_eq!(SolverError::from(err), solver);
    }

    #[test]
    fn test_into_solver_error_wraps_message() {
        let err = StrippingError::invalid_market_data(1, "negative volatility");
        match SolverError::from(err) {
            SolverError::FunctionEvaluation(msg) => assert!(msg.contains("negative volatility")),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn test_from_analytical_error() {
        let err: StrippingError = AnalyticalError::EmptyBundle.into();
        assert!(matches!(err, StrippingError::Analytical(_)));
    }
}
