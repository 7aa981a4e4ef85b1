//! Yield curve trait definition.

use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Yield curve: discount factors and the rates implied by them.
///
/// Generic over `T: Float` so the same curve code runs on `f64` and on
/// dual numbers.
///
/// # Invariants
///
/// - `D(0) = 1`
/// - `D(t) > 0` for all `t >= 0`
///
/// # Example
///
/// ```
/// use capfloor_core::market_data::curves::{FlatCurve, YieldCurve};
///
/// let curve = FlatCurve::new(0.05_f64);
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - (-0.05_f64).exp()).abs() < 1e-15);
/// assert!((curve.zero_rate(2.0).unwrap() - 0.05).abs() < 1e-12);
/// ```
pub trait YieldCurve<T: Float> {
    /// Discount factor `D(t)`.
    ///
    /// # Errors
    ///
    /// `MarketDataError::InvalidMaturity` if `t < 0`.
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError>;

    /// Continuously compounded zero rate `-ln D(t) / t`.
    fn zero_rate(&self, t: T) -> Result<T, MarketDataError> {
        if t <= T::zero() {
            return Err(invalid_maturity(t));
        }
        Ok(-self.discount_factor(t)?.ln() / t)
    }

    /// Continuously compounded forward rate between `t1` and `t2`.
    fn forward_rate(&self, t1: T, t2: T) -> Result<T, MarketDataError> {
        let dt = t2 - t1;
        if dt <= T::zero() {
            return Err(invalid_maturity(t2));
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok((df1 / df2).ln() / dt)
    }

    /// Simply compounded forward rate `(D(t1)/D(t2) - 1) / accrual`.
    ///
    /// This is the fixing of a floating-rate period accruing from `t1` to `t2`
    /// with year fraction `accrual`.
    fn simple_forward_rate(&self, t1: T, t2: T, accrual: T) -> Result<T, MarketDataError> {
        if t2 <= t1 || accrual <= T::zero() {
            return Err(MarketDataError::InvalidPeriod {
                start: t1.to_f64().unwrap_or(f64::NAN),
                end: t2.to_f64().unwrap_or(f64::NAN),
                accrual: accrual.to_f64().unwrap_or(f64::NAN),
            });
        }
        let df1 = self.discount_factor(t1)?;
        let df2 = self.discount_factor(t2)?;
        Ok((df1 / df2 - T::one()) / accrual)
    }
}

pub(crate) fn invalid_maturity<T: Float>(t: T) -> MarketDataError {
    MarketDataError::InvalidMaturity {
        t: t.to_f64().unwrap_or(f64::NAN),
    }
}
