//! Market data error types.

use crate::types::InterpolationError;
use thiserror::Error;

/// Market data operation errors.
///
/// # Variants
///
/// - `InvalidMaturity`: Negative (or otherwise unusable) time
/// - `InvalidPeriod`: Accrual period with non-positive length
/// - `OutOfBounds`: Query outside the curve's pillars without extrapolation
/// - `Interpolation`: Wrapped interpolation error
/// - `InsufficientData`: Not enough pillars
/// - `MissingCurve`: A requested curve is not in the curve set
/// - `NoDiscountCurve`: No discount curve has been designated
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::MarketDataError;
///
/// let err = MarketDataError::InvalidMaturity { t: -1.0 };
/// assert!(format!("{}", err).contains("-1"));
/// ```
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarketDataError {
    /// Invalid maturity.
    #[error("Invalid maturity: t = {t}")]
    InvalidMaturity {
        /// The invalid time
        t: f64,
    },

    /// Invalid accrual period.
    #[error("Invalid period: start = {start}, end = {end}, accrual = {accrual}")]
    InvalidPeriod {
        /// Period start
        start: f64,
        /// Period end
        end: f64,
        /// Accrual fraction
        accrual: f64,
    },

    /// Query point outside the pillar range.
    #[error("Out of bounds: {x} not in [{min}, {max}]")]
    OutOfBounds {
        /// The query point
        x: f64,
        /// First pillar
        min: f64,
        /// Last pillar
        max: f64,
    },

    /// Interpolation error.
    #[error("Interpolation error: {0}")]
    Interpolation(#[from] InterpolationError),

    /// Insufficient data for construction.
    #[error("Insufficient data: got {got}, need {need}")]
    InsufficientData {
        /// Number of points provided
        got: usize,
        /// Minimum number of points required
        need: usize,
    },

    /// Named curve not found.
    #[error("Curve not found: {name}")]
    MissingCurve {
        /// Curve name
        name: String,
    },

    /// No discount curve designated.
    #[error("No discount curve set")]
    NoDiscountCurve,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_messages() {
        assert_eq!(
            format!("{}", MarketDataError::MissingCurve { name: "SOFR".into() }),
            "Curve not found: SOFR"
        );
        assert!(format!(
            "{}",
            MarketDataError::InvalidPeriod {
                start: 1.0,
                end: 0.5,
                accrual: -0.5
            }
        )
        .contains("start = 1"));
    }

    #[test]
    fn test_from_interpolation_error() {
        let err: MarketDataError = InterpolationError::InsufficientData { got: 1, need: 2 }.into();
        assert!(matches!(err, MarketDataError::Interpolation(_)));
    }
}
