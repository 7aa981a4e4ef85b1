//! Interest rate option instruments.
//!
//! This module provides:
//! - [`RateIndex`]: Floating rate index (projection curve plus tenor)
//! - [`CapletFloorlet`]: Option on one accrual period of the index
//! - [`CapFloor`]: Strip of caplets (or floorlets) sharing one strike
//! - [`CapletKey`]: Caplet identity and canonical ordering
//!
//! # Examples
//!
//! ```
//! use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
//! use capfloor_models::instruments::rates::{CapFloor, RateIndex};
//!
//! let index = RateIndex::euribor_6m();
//! let cap = CapFloor::from_schedule(index, 0.0, 5.0, 0.03, true).unwrap();
//! // The first caplet has already fixed
//! assert_eq!(cap.num_caplets(), 9);
//! assert_eq!(cap.start(), 0.5);
//! assert_eq!(cap.end(), 5.0);
//!
//! let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
//! let data = cap.option_data(&curves).unwrap();
//! assert_eq!(data.len(), 9);
//! ```

mod capfloor;

pub use capfloor::{CapFloor, CapletFloorlet, CapletKey};

use capfloor_core::market_data::CurveName;

use super::InstrumentError;

/// Floating rate index underlying a cap or floor.
///
/// An index is the projection curve its forwards are read from together with
/// its tenor. Two caps reference the same index only if both agree.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::CurveName;
/// use capfloor_models::instruments::rates::RateIndex;
///
/// let index = RateIndex::euribor_3m();
/// assert_eq!(index.name(), "EURIBOR3M");
/// assert_eq!(index.tenor_months(), 3);
/// assert_eq!(index.tenor_years(), 0.25);
/// assert_eq!(*index.curve(), CurveName::Euribor3M);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct RateIndex {
    curve: CurveName,
    tenor_months: u32,
}

impl RateIndex {
    /// Create an index projecting from `curve` with the given tenor.
    ///
    /// # Errors
    /// `InstrumentError::InvalidParameter` if `tenor_months` is zero.
    pub fn new(curve: CurveName, tenor_months: u32) -> Result<Self, InstrumentError> {
        if tenor_months == 0 {
            return Err(InstrumentError::InvalidParameter {
                message: format!("index {} needs a positive tenor", curve),
            });
        }
        Ok(Self {
            curve,
            tenor_months,
        })
    }

    /// 3-month EURIBOR.
    pub fn euribor_3m() -> Self {
        Self {
            curve: CurveName::Euribor3M,
            tenor_months: 3,
        }
    }

    /// 6-month EURIBOR.
    pub fn euribor_6m() -> Self {
        Self {
            curve: CurveName::Euribor6M,
            tenor_months: 6,
        }
    }

    /// 3-month LIBOR.
    pub fn libor_3m() -> Self {
        Self {
            curve: CurveName::Libor3M,
            tenor_months: 3,
        }
    }

    /// 6-month LIBOR.
    pub fn libor_6m() -> Self {
        Self {
            curve: CurveName::Libor6M,
            tenor_months: 6,
        }
    }

    /// Projection curve.
    #[inline]
    pub fn curve(&self) -> &CurveName {
        &self.curve
    }

    /// Index name (the projection curve's name).
    #[inline]
    pub fn name(&self) -> &'static str {
        self.curve.as_str()
    }

    /// Tenor in months.
    #[inline]
    pub fn tenor_months(&self) -> u32 {
        self.tenor_months
    }

    /// Tenor in years (months / 12).
    #[inline]
    pub fn tenor_years(&self) -> f64 {
        f64::from(self.tenor_months) / 12.0
    }
}

impl std::fmt::Display for RateIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.curve)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_presets() {
        assert_eq!(RateIndex::euribor_6m().tenor_years(), 0.5);
        assert_eq!(RateIndex::libor_3m().name(), "LIBOR3M");
        assert_eq!(RateIndex::libor_6m().to_string(), "LIBOR6M");
    }

    #[test]
    fn test_zero_tenor_rejected() {
        assert!(RateIndex::new(CurveName::Forward, 0).is_err());
    }

    #[test]
    fn test_equality_needs_curve_and_tenor() {
        let a = RateIndex::new(CurveName::Forward, 3).unwrap();
        let b = RateIndex::new(CurveName::Forward, 6).unwrap();
        let c = RateIndex::new(CurveName::Forward, 3).unwrap();
        assert_ne!(a, b);
        assert_eq!(a, c);
    }
}
