//! Instrument error types.
//!
//! This module provides structured error handling for instrument
//! construction and for resolving instruments against market data.

use capfloor_core::market_data::MarketDataError;
use thiserror::Error;

/// Instrument-related errors.
///
/// # Variants
/// - `InvalidStrike`: Strike is negative or non-finite
/// - `InvalidExpiry`: Expiry (fixing time) is negative or non-finite
/// - `InvalidForward`: Forward rate is non-positive
/// - `InvalidPeriod`: Accrual period is empty or inverted
/// - `InvalidNotional`: Notional amount is non-positive
/// - `InvalidParameter`: General parameter validation failure
/// - `MarketData`: Forward or discount factor lookup failed
///
/// # Examples
/// ```
/// use capfloor_models::instruments::InstrumentError;
///
/// let err = InstrumentError::InvalidStrike { strike: -0.01 };
/// assert!(format!("{}", err).contains("-0.01"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum InstrumentError {
    /// Invalid strike rate.
    #[error("Invalid strike: K = {strike}")]
    InvalidStrike {
        /// The invalid strike value
        strike: f64,
    },

    /// Invalid expiry time.
    #[error("Invalid expiry: T = {expiry}")]
    InvalidExpiry {
        /// The invalid expiry value
        expiry: f64,
    },

    /// Invalid forward rate.
    #[error("Invalid forward: F = {forward}")]
    InvalidForward {
        /// The invalid forward value
        forward: f64,
    },

    /// Invalid accrual period.
    #[error("Invalid period: [{start}, {end}]")]
    InvalidPeriod {
        /// Period start
        start: f64,
        /// Period end
        end: f64,
    },

    /// Invalid notional amount.
    #[error("Invalid notional: N = {notional}")]
    InvalidNotional {
        /// The invalid notional value
        notional: f64,
    },

    /// Invalid parameter (general validation failure).
    #[error("Invalid parameter: {message}")]
    InvalidParameter {
        /// Description of the parameter error
        message: String,
    },

    /// Market data lookup failed.
    #[error("Market data error: {0}")]
    MarketData(#[from] MarketDataError),
}
