//! Market-resolved data for one caplet or floorlet.

use super::error::InstrumentError;
use crate::analytical::{black_intrinsic, black_price, black_vega};

/// Everything the Black formula needs to price one caplet or floorlet.
///
/// The discounted year fraction `D` is the discount factor to payment times
/// the accrual fraction times the notional, so the present value of the
/// option at Black volatility σ is `D · Black(F, K, T, σ)`.
///
/// # Examples
/// ```
/// use capfloor_models::instruments::OptionDatum;
///
/// let caplet = OptionDatum::new(0.03, 0.025, 1.0, 0.49, true).unwrap();
/// assert!(caplet.price(0.3) > caplet.intrinsic());
/// assert!((caplet.intrinsic() - 0.49 * 0.005).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct OptionDatum {
    forward: f64,
    strike: f64,
    expiry: f64,
    discounted_year_fraction: f64,
    is_cap: bool,
}

impl OptionDatum {
    /// Create option data.
    ///
    /// # Errors
    /// - `InstrumentError::InvalidForward` if `forward <= 0`
    /// - `InstrumentError::InvalidStrike` if `strike < 0`
    /// - `InstrumentError::InvalidExpiry` if `expiry < 0`
    /// - `InstrumentError::InvalidNotional` if the discounted year fraction is not positive
    pub fn new(
        forward: f64,
        strike: f64,
        expiry: f64,
        discounted_year_fraction: f64,
        is_cap: bool,
    ) -> Result<Self, InstrumentError> {
        if !(forward > 0.0) || !forward.is_finite() {
            return Err(InstrumentError::InvalidForward { forward });
        }
        if !(strike >= 0.0) || !strike.is_finite() {
            return Err(InstrumentError::InvalidStrike { strike });
        }
        if !(expiry >= 0.0) || !expiry.is_finite() {
            return Err(InstrumentError::InvalidExpiry { expiry });
        }
        if !(discounted_year_fraction > 0.0) || !discounted_year_fraction.is_finite() {
            return Err(InstrumentError::InvalidNotional {
                notional: discounted_year_fraction,
            });
        }
        Ok(Self {
            forward,
            strike,
            expiry,
            discounted_year_fraction,
            is_cap,
        })
    }

    /// Forward rate of the accrual period.
    #[inline]
    pub fn forward(&self) -> f64 {
        self.forward
    }

    /// Strike rate.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// Time to fixing in years.
    #[inline]
    pub fn expiry(&self) -> f64 {
        self.expiry
    }

    /// Discount factor × accrual fraction × notional.
    #[inline]
    pub fn discounted_year_fraction(&self) -> f64 {
        self.discounted_year_fraction
    }

    /// True for a caplet (call on the rate), false for a floorlet.
    #[inline]
    pub fn is_cap(&self) -> bool {
        self.is_cap
    }

    /// Present value at Black volatility `vol`.
    pub fn price(&self, vol: f64) -> f64 {
        self.discounted_year_fraction
            * black_price(self.forward, self.strike, self.expiry, vol, self.is_cap)
    }

    /// Present-value vega at Black volatility `vol`.
    pub fn vega(&self, vol: f64) -> f64 {
        self.discounted_year_fraction * black_vega(self.forward, self.strike, self.expiry, vol)
    }

    /// Present value at zero volatility.
    pub fn intrinsic(&self) -> f64 {
        self.discounted_year_fraction * black_intrinsic(self.forward, self.strike, self.is_cap)
    }

    /// Present value in the infinite-volatility limit (`D·F` for caplets, `D·K` for floorlets).
    pub fn upper_bound(&self) -> f64 {
        let limit = if self.is_cap {
            self.forward
        } else {
            self.strike
        };
        self.discounted_year_fraction * limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_validation() {
        assert!(OptionDatum::new(0.0, 0.02, 1.0, 0.5, true).is_err());
        assert!(OptionDatum::new(0.03, -0.01, 1.0, 0.5, true).is_err());
        assert!(OptionDatum::new(0.03, 0.02, -1.0, 0.5, true).is_err());
        assert!(OptionDatum::new(0.03, 0.02, 1.0, 0.0, true).is_err());
        assert!(OptionDatum::new(0.03, 0.02, 1.0, f64::NAN, true).is_err());
        assert!(OptionDatum::new(0.03, 0.0, 0.0, 0.5, false).is_ok());
    }

    #[test]
    fn test_price_scales_with_discounted_year_fraction() {
        let a = OptionDatum::new(0.03, 0.025, 2.0, 1.0, true).unwrap();
        let b = OptionDatum::new(0.03, 0.025, 2.0, 0.25, true).unwrap();
        assert_relative_eq!(b.price(0.3), 0.25 * a.price(0.3), epsilon = 1e-18);
        assert_relative_eq!(b.vega(0.3), 0.25 * a.vega(0.3), epsilon = 1e-18);
    }

    #[test]
    fn test_bounds() {
        let floorlet = OptionDatum::new(0.03, 0.04, 1.0, 0.5, false).unwrap();
        assert_relative_eq!(floorlet.intrinsic(), 0.005, epsilon = 1e-15);
        assert_relative_eq!(floorlet.upper_bound(), 0.02, epsilon = 1e-15);
        let p = floorlet.price(0.4);
        assert!(p > floorlet.intrinsic() && p < floorlet.upper_bound());
    }
}
