//! Curve identifiers and static dispatch over curve implementations.

use super::{FlatCurve, InterpolatedCurve, YieldCurve};
use crate::market_data::error::MarketDataError;
use num_traits::Float;

/// Curve identifiers for the multi-curve setting.
///
/// Discounting typically uses an overnight curve (`Ois`, `Sofr`, `Estr`);
/// cap and floor forwards are projected from the curve of their index tenor.
///
/// # Example
///
/// ```
/// use capfloor_core::market_data::curves::CurveName;
///
/// assert_eq!(CurveName::Euribor6M.as_str(), "EURIBOR6M");
/// assert_eq!(CurveName::Custom("USD-LIBOR-3M").to_string(), "USD-LIBOR-3M");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CurveName {
    /// Overnight index swap curve
    Ois,
    /// Secured Overnight Financing Rate
    Sofr,
    /// Euro short-term rate
    Estr,
    /// 3-month EURIBOR projection curve
    Euribor3M,
    /// 6-month EURIBOR projection curve
    Euribor6M,
    /// 3-month LIBOR projection curve
    Libor3M,
    /// 6-month LIBOR projection curve
    Libor6M,
    /// Generic forward curve
    Forward,
    /// Generic discount curve
    Discount,
    /// User-defined curve
    Custom(&'static str),
}

impl CurveName {
    /// String form of the name.
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            CurveName::Ois => "OIS",
            CurveName::Sofr => "SOFR",
            CurveName::Estr => "ESTR",
            CurveName::Euribor3M => "EURIBOR3M",
            CurveName::Euribor6M => "EURIBOR6M",
            CurveName::Libor3M => "LIBOR3M",
            CurveName::Libor6M => "LIBOR6M",
            CurveName::Forward => "FORWARD",
            CurveName::Discount => "DISCOUNT",
            CurveName::Custom(name) => name,
        }
    }
}

impl std::fmt::Display for CurveName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Static dispatch over concrete yield curves.
///
/// # Example
///
/// ```
/// use capfloor_core::market_data::curves::{CurveEnum, YieldCurve};
///
/// let curve = CurveEnum::flat(0.05_f64);
/// assert!((curve.discount_factor(1.0).unwrap() - (-0.05_f64).exp()).abs() < 1e-15);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub enum CurveEnum<T: Float> {
    /// Flat curve
    Flat(FlatCurve<T>),
    /// Pillar-based curve
    Interpolated(InterpolatedCurve<T>),
}

impl<T: Float> CurveEnum<T> {
    /// Flat curve at `rate`.
    #[inline]
    pub fn flat(rate: T) -> Self {
        CurveEnum::Flat(FlatCurve::new(rate))
    }
}

impl<T: Float> YieldCurve<T> for CurveEnum<T> {
    fn discount_factor(&self, t: T) -> Result<T, MarketDataError> {
        match self {
            CurveEnum::Flat(c) => c.discount_factor(t),
            CurveEnum::Interpolated(c) => c.discount_factor(t),
        }
    }

    fn zero_rate(&self, t: T) -> Result<T, MarketDataError> {
        match self {
            CurveEnum::Flat(c) => c.zero_rate(t),
            CurveEnum::Interpolated(c) => c.zero_rate(t),
        }
    }
}

impl<T: Float> From<FlatCurve<T>> for CurveEnum<T> {
    fn from(curve: FlatCurve<T>) -> Self {
        CurveEnum::Flat(curve)
    }
}

impl<T: Float> From<InterpolatedCurve<T>> for CurveEnum<T> {
    fn from(curve: InterpolatedCurve<T>) -> Self {
        CurveEnum::Interpolated(curve)
    }
}
