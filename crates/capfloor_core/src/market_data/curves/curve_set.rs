//! Named curve container.

use std::collections::HashMap;

use super::{CurveEnum, CurveName, YieldCurve};
use crate::market_data::error::MarketDataError;
use crate::market_data::provider::CurveProvider;
use num_traits::Float;

/// Named yield curves plus a designated discount curve.
///
/// `CurveSet<f64>` implements [`CurveProvider`]: discounting uses the
/// designated curve and index forwards are projected from the curve
/// registered under the index's name, falling back to the discount curve
/// when no projection curve is registered.
///
/// # Example
///
/// ```
/// use capfloor_core::market_data::curves::{CurveEnum, CurveName, CurveSet, YieldCurve};
///
/// let mut curves = CurveSet::new();
/// curves.insert(CurveName::Ois, CurveEnum::flat(0.03));
/// curves.set_discount_curve(CurveName::Ois);
/// let df = curves.discount_curve().unwrap().discount_factor(1.0).unwrap();
/// assert!(df < 1.0);
/// ```
#[derive(Debug, Clone)]
pub struct CurveSet<T: Float> {
    curves: HashMap<CurveName, CurveEnum<T>>,
    discount_curve_name: Option<CurveName>,
}

impl<T: Float> Default for CurveSet<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Float> CurveSet<T> {
    /// Empty curve set.
    pub fn new() -> Self {
        Self {
            curves: HashMap::new(),
            discount_curve_name: None,
        }
    }

    /// Single-curve set: one curve used for discounting and projection.
    pub fn single(name: CurveName, curve: CurveEnum<T>) -> Self {
        let mut set = Self::new();
        set.insert(name, curve);
        set.set_discount_curve(name);
        set
    }

    /// Add or replace a curve; returns the previous curve under that name.
    pub fn insert(&mut self, name: CurveName, curve: CurveEnum<T>) -> Option<CurveEnum<T>> {
        self.curves.insert(name, curve)
    }

    /// Curve by name.
    pub fn get(&self, name: &CurveName) -> Option<&CurveEnum<T>> {
        self.curves.get(name)
    }

    /// Whether a curve is registered under `name`.
    pub fn contains(&self, name: &CurveName) -> bool {
        self.curves.contains_key(name)
    }

    /// Designate the discount curve.
    pub fn set_discount_curve(&mut self, name: CurveName) {
        self.discount_curve_name = Some(name);
    }

    /// The designated discount curve.
    pub fn discount_curve(&self) -> Option<&CurveEnum<T>> {
        self.discount_curve_name.and_then(|n| self.curves.get(&n))
    }

    /// Number of curves.
    pub fn len(&self) -> usize {
        self.curves.len()
    }

    /// Whether the set is empty.
    pub fn is_empty(&self) -> bool {
        self.curves.is_empty()
    }

    fn require_discount(&self) -> Result<&CurveEnum<T>, MarketDataError> {
        self.discount_curve().ok_or(MarketDataError::NoDiscountCurve)
    }
}

impl CurveProvider for CurveSet<f64> {
    fn discount_factor(&self, t: f64) -> Result<f64, MarketDataError> {
        self.require_discount()?.discount_factor(t)
    }

    fn forward_rate(
        &self,
        index: &CurveName,
        start: f64,
        end: f64,
        accrual: f64,
    ) -> Result<f64, MarketDataError> {
        let curve = match self.curves.get(index) {
            Some(c) => c,
            None => self.require_discount()?,
        };
        curve.simple_forward_rate(start, end, accrual)
    }
}
