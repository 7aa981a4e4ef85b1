//! The curve provider contract used by cap pricers.

use crate::market_data::curves::CurveName;
use crate::market_data::error::MarketDataError;

/// Supplies discount factors and index forward rates.
///
/// Cap and floor pricing needs exactly two things from the rates market:
/// the discount factor to each payment date and the simply compounded
/// forward of the underlying index over each accrual period.
pub trait CurveProvider {
    /// Discount factor to time `t`.
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError>;

    /// Simply compounded forward of `index` over `[start, end]` with year
    /// fraction `accrual`.
    fn forward_rate(
        &self,
        index: &CurveName,
        start: f64,
        end: f64,
        accrual: f64,
    ) -> Result<f64, MarketDataError>;
}

impl<P: CurveProvider + ?Sized> CurveProvider for &P {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        (**self).discount_factor(t)
    }

    fn forward_rate(
        &self,
        index: &CurveName,
        start: f64,
        end: f64,
        accrual: f64,
    ) -> Result<f64, MarketDataError> {
        (**self).forward_rate(index, start, end, accrual)
    }
}
