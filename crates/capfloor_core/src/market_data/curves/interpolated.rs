//! Pillar-based yield curve.

use super::traits::invalid_maturity;
use super::YieldCurve;
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Interpolation scheme between curve pillars.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum CurveInterpolation {
    /// Linear in zero rates.
    Linear,
    /// Linear in `ln D(t)`: piecewise constant forward rates.
    #[default]
    LogLinear,
}

/// Yield curve defined by zero rates at pillar times.
///
/// Before the first pillar the first zero rate applies. Beyond the last
/// pillar the curve extrapolates with the last forward (log-linear) or the
/// last zero rate (linear) when `allow_extrapolation` is set, and returns
/// `MarketDataError::OutOfBounds` otherwise.
///
/// # Example
///
/// ```
/// use capfloor_core::market_data::curves::{CurveInterpolation, InterpolatedCurve, YieldCurve};
///
/// let curve = InterpolatedCurve::new(
///     &[0.5, 1.0, 2.0, 5.0],
///     &[0.02, 0.025, 0.03, 0.035],
///     CurveInterpolation::LogLinear,
///     true,
/// )
/// .unwrap();
/// let df = curve.discount_factor(1.0).unwrap();
/// assert!((df - (-0.025_f64).exp()).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct InterpolatedCurve<T: Float> {
    tenors: Vec<T>,
    rates: Vec<T>,
    method: CurveInterpolation,
    allow_extrapolation: bool,
}

impl<T: Float> InterpolatedCurve<T> {
    /// Build a curve from pillar times (strictly increasing, positive) and zero rates.
    ///
    /// # Errors
    ///
    /// - `MarketDataError::InsufficientData` for fewer than 2 pillars or mismatched lengths
    /// - `MarketDataError::InvalidMaturity` for non-positive or unsorted pillars
    pub fn new(
        tenors: &[T],
        rates: &[T],
        method: CurveInterpolation,
        allow_extrapolation: bool,
    ) -> Result<Self, MarketDataError> {
        if tenors.len() < 2 {
            return Err(MarketDataError::InsufficientData {
                got: tenors.len(),
                need: 2,
            });
        }
        if rates.len() != tenors.len() {
            return Err(MarketDataError::InsufficientData {
                got: rates.len(),
                need: tenors.len(),
            });
        }
        if let Some(bad) = tenors
            .iter()
            .enumerate()
            .find(|(i, t)| **t <= T::zero() || (*i > 0 && **t <= tenors[i - 1]))
        {
            return Err(invalid_maturity(*bad.1));
        }

        Ok(Self {
            tenors: tenors.to_vec(),
            rates: rates.to_vec(),
            method,
            allow_extrapolation,
        })
    }

    /// Pillar times.
    pub fn tenors(&self) -> &[T] {
        &self.tenors
    }

    /// Interpolation scheme.
    pub fn method(&self) -> CurveInterpolation {
        self.method
    }

    /// `(first pillar, last pillar)`.
    pub fn domain(&self) -> (T, T) {
        (self.tenors[0], self.tenors[self.tenors.len() - 1])
    }

    /// `-ln D(t)` for `t` within the curve.
    fn log_discount(&self, t: T) -> Result<T, MarketDataError> {
        let n = self.tenors.len();
        let (first, last) = self.domain();

        if t <= first {
            return Ok(self.rates[0] * t);
        }
        if t > last {
            if !self.allow_extrapolation {
                return Err(MarketDataError::OutOfBounds {
                    x: t.to_f64().unwrap_or(f64::NAN),
                    min: first.to_f64().unwrap_or(f64::NAN),
                    max: last.to_f64().unwrap_or(f64::NAN),
                });
            }
            let y_last = self.rates[n - 1] * last;
            return Ok(match self.method {
                CurveInterpolation::Linear => self.rates[n - 1] * t,
                CurveInterpolation::LogLinear => {
                    let y_prev = self.rates[n - 2] * self.tenors[n - 2];
                    let fwd = (y_last - y_prev) / (last - self.tenors[n - 2]);
                    y_last + fwd * (t - last)
                }
            });
        }

        let i = self.tenors.partition_point(|x| *x < t) - 1;
        let (t0, t1) = (self.tenors[i], self.tenors[i + 1]);
        let w = (t - t0) / (t1 - t0);
        Ok(match self.method {
            CurveInterpolation::Linear => {
                let r = self.rates[i] + (self.rates[i + 1] - self.rates[i]) * w;
                r * t
            }
            CurveInterpolation::LogLinear => {
                let y0 = self.rates[i] * t0;
                let y1 = self.rates[i + 1] * t1;
                y0 + (y1 - y0) * w
            }
        })
    }
}

impl<T: Float> YieldCurve<T> for InterpolatedCurve<T> {
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        if t < T::zero() {
            return Err(invalid_maturity(t));
        }
        Ok((-self.log_discount(t)?).exp())
    }
}
