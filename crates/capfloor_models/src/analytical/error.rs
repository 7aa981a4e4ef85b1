//! Error types for analytical pricing operations.
//!
//! This module provides:
//! - `AnalyticalError`: Errors specific to the Black formula and its inversion

use thiserror::Error;

/// Analytical pricing errors.
///
/// # Variants
/// - `InvalidVolatility`: Negative or non-finite volatility
/// - `InvalidForward`: Non-positive forward
/// - `InvalidStrike`: Negative strike
/// - `InvalidExpiry`: Negative expiry
/// - `EmptyBundle`: Implied volatility requested for no options
/// - `NoConvergence`: Implied volatility does not exist or was not found
///
/// # Examples
/// ```
/// use capfloor_models::analytical::AnalyticalError;
///
/// let err = AnalyticalError::InvalidVolatility { volatility: -0.2 };
/// assert!(format!("{}", err).contains("volatility"));
/// ```
#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalyticalError {
    /// Invalid volatility (negative or non-finite).
    #[error("Invalid volatility: σ = {volatility}")]
    InvalidVolatility {
        /// The invalid volatility value
        volatility: f64,
    },

    /// Invalid forward (non-positive).
    #[error("Invalid forward: F = {forward}")]
    InvalidForward {
        /// The invalid forward value
        forward: f64,
    },

    /// Invalid strike (negative).
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Invalid expiry (negative).
    #[error("Invalid expiry: T = {expiry}")]
    InvalidExpiry {
        /// The invalid expiry value
        expiry: f64,
    },

    /// No options supplied to a bundle inversion.
    #[error("Implied volatility requested for an empty option bundle")]
    EmptyBundle,

    /// The target price is outside the attainable range or the search failed.
    #[error("No implied volatility for price {price}: attainable range is [{lower}, {upper}]")]
    NoConvergence {
        /// Target price
        price: f64,
        /// Price at zero volatility (intrinsic value)
        lower: f64,
        /// Price at infinite volatility
        upper: f64,
    },
}
