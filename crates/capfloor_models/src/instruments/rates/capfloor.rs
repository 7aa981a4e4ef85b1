//! Interest rate caplets and cap/floor strips.
//!
//! This module provides:
//! - [`CapletFloorlet`]: Option on the index fixing of one accrual period
//! - [`CapFloor`]: Series of caplets (floorlets) sharing strike and index
//!
//! # Payoff
//!
//! For each period `[s, e]` with accrual fraction τ, paid at `e`:
//! - **Caplet**: max(L(s, e) - K, 0) × τ × Notional
//! - **Floorlet**: max(K - L(s, e), 0) × τ × Notional
//!
//! where L is the simply compounded index fixing at the start of the period.
//!
//! # Identity
//!
//! Two caplets are the same instrument when they share strike and fixing
//! time. [`CapletFloorlet::key`] exposes that identity; its ordering (fixing
//! time first, then strike) is the canonical caplet ordering.

use std::cmp::Ordering;

use capfloor_core::market_data::CurveProvider;

use super::RateIndex;
use crate::instruments::{InstrumentError, OptionDatum};

/// Relative tolerance when checking that a tenor divides a cap's life.
const SCHEDULE_TOLERANCE: f64 = 1e-6;

/// Identity of a caplet: `(fixing time, strike)`.
///
/// Ordered by fixing time, then strike.
#[derive(Debug, Clone, Copy)]
pub struct CapletKey {
    /// Fixing (expiry) time in years
    pub fixing_time: f64,
    /// Strike rate
    pub strike: f64,
}

impl PartialEq for CapletKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for CapletKey {}

impl PartialOrd for CapletKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for CapletKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.fixing_time
            .total_cmp(&other.fixing_time)
            .then(self.strike.total_cmp(&other.strike))
    }
}

/// A single caplet or floorlet.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
/// use capfloor_models::instruments::rates::{CapletFloorlet, RateIndex};
///
/// let caplet = CapletFloorlet::new(RateIndex::euribor_6m(), 1.0, 1.5, 0.02, true).unwrap();
/// assert_eq!(caplet.fixing_time(), 1.0);
/// assert_eq!(caplet.accrual(), 0.5);
///
/// let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.02));
/// let datum = caplet.option_datum(&curves).unwrap();
/// assert!((datum.discounted_year_fraction() - 0.5 * (-0.03_f64).exp()).abs() < 1e-14);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CapletFloorlet {
    index: RateIndex,
    fixing_time: f64,
    start: f64,
    end: f64,
    payment_time: f64,
    accrual: f64,
    notional: f64,
    strike: f64,
    is_cap: bool,
}

impl CapletFloorlet {
    /// Create a caplet (`is_cap = true`) or floorlet on `[start, end]`.
    ///
    /// The index fixes at `start`, pays at `end`, accrues `end - start` and
    /// has unit notional.
    ///
    /// # Errors
    /// - `InstrumentError::InvalidExpiry` if `start < 0`
    /// - `InstrumentError::InvalidPeriod` if `end <= start`
    /// - `InstrumentError::InvalidStrike` if `strike < 0`
    pub fn new(
        index: RateIndex,
        start: f64,
        end: f64,
        strike: f64,
        is_cap: bool,
    ) -> Result<Self, InstrumentError> {
        if !(start >= 0.0) || !start.is_finite() {
            return Err(InstrumentError::InvalidExpiry { expiry: start });
        }
        if !(end > start) || !end.is_finite() {
            return Err(InstrumentError::InvalidPeriod { start, end });
        }
        if !(strike >= 0.0) || !strike.is_finite() {
            return Err(InstrumentError::InvalidStrike { strike });
        }
        Ok(Self {
            index,
            fixing_time: start,
            start,
            end,
            payment_time: end,
            accrual: end - start,
            notional: 1.0,
            strike,
            is_cap,
        })
    }

    /// Same option with a different notional.
    ///
    /// # Errors
    /// `InstrumentError::InvalidNotional` if `notional <= 0`.
    pub fn with_notional(self, notional: f64) -> Result<Self, InstrumentError> {
        if !(notional > 0.0) || !notional.is_finite() {
            return Err(InstrumentError::InvalidNotional { notional });
        }
        Ok(Self { notional, ..self })
    }

    /// Same option with an explicit accrual fraction (day count adjusted).
    ///
    /// # Errors
    /// `InstrumentError::InvalidParameter` if `accrual <= 0`.
    pub fn with_accrual(self, accrual: f64) -> Result<Self, InstrumentError> {
        if !(accrual > 0.0) || !accrual.is_finite() {
            return Err(InstrumentError::InvalidParameter {
                message: format!("accrual fraction {} must be positive", accrual),
            });
        }
        Ok(Self { accrual, ..self })
    }

    /// Reference index.
    #[inline]
    pub fn index(&self) -> RateIndex {
        self.index
    }

    /// Fixing (expiry) time.
    #[inline]
    pub fn fixing_time(&self) -> f64 {
        self.fixing_time
    }

    /// Accrual start.
    #[inline]
    pub fn start(&self) -> f64 {
        self.start
    }

    /// Accrual end.
    #[inline]
    pub fn end(&self) -> f64 {
        self.end
    }

    /// Payment time.
    #[inline]
    pub fn payment_time(&self) -> f64 {
        self.payment_time
    }

    /// Accrual fraction.
    #[inline]
    pub fn accrual(&self) -> f64 {
        self.accrual
    }

    /// Notional.
    #[inline]
    pub fn notional(&self) -> f64 {
        self.notional
    }

    /// Strike rate.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.strike
    }

    /// True for a caplet, false for a floorlet.
    #[inline]
    pub fn is_cap(&self) -> bool {
        self.is_cap
    }

    /// Instrument identity `(fixing time, strike)`.
    #[inline]
    pub fn key(&self) -> CapletKey {
        CapletKey {
            fixing_time: self.fixing_time,
            strike: self.strike,
        }
    }

    /// Resolve against market curves.
    ///
    /// # Errors
    /// Curve lookup failures, or `InstrumentError::InvalidForward` if the
    /// projected forward is not positive.
    pub fn option_datum<P: CurveProvider + ?Sized>(
        &self,
        curves: &P,
    ) -> Result<OptionDatum, InstrumentError> {
        let forward = curves.forward_rate(self.index.curve(), self.start, self.end, self.accrual)?;
        let df = curves.discount_factor(self.payment_time)?;
        OptionDatum::new(
            forward,
            self.strike,
            self.fixing_time,
            df * self.accrual * self.notional,
            self.is_cap,
        )
    }
}

/// A cap (or floor): caplets (floorlets) on consecutive periods of one
/// index, all struck at the same rate.
///
/// Caplets are held in ascending fixing order. The cap's start is the first
/// caplet's accrual start and its end the last caplet's accrual end.
#[derive(Debug, Clone, PartialEq)]
pub struct CapFloor {
    caplets: Vec<CapletFloorlet>,
}

impl CapFloor {
    /// Assemble a cap from its caplets.
    ///
    /// # Errors
    /// `InstrumentError::InvalidParameter` if `caplets` is empty, mixes
    /// strikes, indices or cap/floor flags, or repeats a fixing time.
    pub fn new(mut caplets: Vec<CapletFloorlet>) -> Result<Self, InstrumentError> {
        let first = *caplets.first().ok_or_else(|| InstrumentError::InvalidParameter {
            message: "a cap needs at least one caplet".to_string(),
        })?;
        for c in &caplets {
            if c.strike != first.strike {
                return Err(InstrumentError::InvalidParameter {
                    message: format!("caplet strikes {} and {} differ", first.strike, c.strike),
                });
            }
            if c.index != first.index {
                return Err(InstrumentError::InvalidParameter {
                    message: format!("caplet indices {} and {} differ", first.index, c.index),
                });
            }
            if c.is_cap != first.is_cap {
                return Err(InstrumentError::InvalidParameter {
                    message: "caplets and floorlets cannot be mixed".to_string(),
                });
            }
        }

        caplets.sort_by(|a, b| a.fixing_time.total_cmp(&b.fixing_time));
        if let Some(w) = caplets
            .windows(2)
            .find(|w| w[0].fixing_time == w[1].fixing_time)
        {
            return Err(InstrumentError::InvalidParameter {
                message: format!("two caplets fix at t = {}", w[0].fixing_time),
            });
        }
        Ok(Self { caplets })
    }

    /// Regular strip on `[start, end]` with periods of the index tenor.
    ///
    /// A caplet fixing at or before time zero has already fixed and is left
    /// out, so a spot-starting cap begins one tenor after `start`.
    ///
    /// # Errors
    /// - `InstrumentError::InvalidPeriod` if `start < 0` or `end <= start`
    /// - `InstrumentError::InvalidParameter` if the tenor does not divide
    ///   `end - start`, or no caplet is left
    /// - `InstrumentError::InvalidStrike` for a negative strike
    pub fn from_schedule(
        index: RateIndex,
        start: f64,
        end: f64,
        strike: f64,
        is_cap: bool,
    ) -> Result<Self, InstrumentError> {
        if !(start >= 0.0) || !(end > start) || !end.is_finite() {
            return Err(InstrumentError::InvalidPeriod { start, end });
        }
        let tau = index.tenor_years();
        let periods = ((end - start) / tau).round();
        if periods < 1.0 || ((end - start) - periods * tau).abs() > SCHEDULE_TOLERANCE * (end - start)
        {
            return Err(InstrumentError::InvalidParameter {
                message: format!(
                    "[{}, {}] is not a whole number of {}M periods",
                    start,
                    end,
                    index.tenor_months()
                ),
            });
        }

        let n = periods as usize;
        let mut caplets = Vec::with_capacity(n);
        for i in 0..n {
            let s = start + i as f64 * tau;
            let e = if i + 1 == n {
                end
            } else {
                start + (i + 1) as f64 * tau
            };
            if s <= 0.0 {
                continue;
            }
            caplets.push(CapletFloorlet::new(index, s, e, strike, is_cap)?);
        }
        if caplets.is_empty() {
            return Err(InstrumentError::InvalidParameter {
                message: format!("no caplet of [{}, {}] fixes after time zero", start, end),
            });
        }
        Self::new(caplets)
    }

    /// Caplets in ascending fixing order.
    #[inline]
    pub fn caplets(&self) -> &[CapletFloorlet] {
        &self.caplets
    }

    /// Number of caplets.
    #[inline]
    pub fn num_caplets(&self) -> usize {
        self.caplets.len()
    }

    /// Common strike.
    #[inline]
    pub fn strike(&self) -> f64 {
        self.caplets[0].strike
    }

    /// True for a cap, false for a floor.
    #[inline]
    pub fn is_cap(&self) -> bool {
        self.caplets[0].is_cap
    }

    /// Reference index.
    #[inline]
    pub fn index(&self) -> RateIndex {
        self.caplets[0].index
    }

    /// Accrual start of the first caplet.
    #[inline]
    pub fn start(&self) -> f64 {
        self.caplets[0].start
    }

    /// Accrual end of the last caplet.
    #[inline]
    pub fn end(&self) -> f64 {
        self.caplets[self.caplets.len() - 1].end
    }

    /// Resolve every caplet against market curves.
    pub fn option_data<P: CurveProvider + ?Sized>(
        &self,
        curves: &P,
    ) -> Result<Vec<OptionDatum>, InstrumentError> {
        self.caplets.iter().map(|c| c.option_datum(curves)).collect()
    }

    /// Present value with every caplet at Black volatility `vol`.
    pub fn price<P: CurveProvider + ?Sized>(
        &self,
        curves: &P,
        vol: f64,
    ) -> Result<f64, InstrumentError> {
        Ok(self.option_data(curves)?.iter().map(|d| d.price(vol)).sum())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};

    fn curves() -> CurveSet<f64> {
        let mut set = CurveSet::new();
        set.insert(CurveName::Ois, CurveEnum::flat(0.01));
        set.insert(CurveName::Euribor6M, CurveEnum::flat(0.02));
        set.set_discount_curve(CurveName::Ois);
        set
    }

    // ==========================================================
    // CapletFloorlet
    // ==========================================================

    #[test]
    fn test_caplet_validation() {
        let idx = RateIndex::euribor_6m();
        assert!(CapletFloorlet::new(idx, -0.5, 0.0, 0.02, true).is_err());
        assert!(CapletFloorlet::new(idx, 1.0, 1.0, 0.02, true).is_err());
        assert!(CapletFloorlet::new(idx, 1.0, 1.5, -0.02, true).is_err());
        let c = CapletFloorlet::new(idx, 1.0, 1.5, 0.02, true).unwrap();
        assert!(c.with_notional(0.0).is_err());
        assert!(c.with_accrual(-0.5).is_err());
    }

    #[test]
    fn test_caplet_option_datum() {
        let c = CapletFloorlet::new(RateIndex::euribor_6m(), 2.0, 2.5, 0.025, true)
            .unwrap()
            .with_notional(1e6)
            .unwrap();
        let d = c.option_datum(&curves()).unwrap();
        assert_relative_eq!(d.forward(), ((0.02_f64 * 0.5).exp() - 1.0) / 0.5, epsilon = 1e-14);
        assert_relative_eq!(
            d.discounted_year_fraction(),
            (-0.01_f64 * 2.5).exp() * 0.5 * 1e6,
            epsilon = 1e-8
        );
        assert_eq!(d.expiry(), 2.0);
        assert!(d.is_cap());
    }

    #[test]
    fn test_key_ordering() {
        let idx = RateIndex::euribor_6m();
        let a = CapletFloorlet::new(idx, 1.0, 1.5, 0.03, true).unwrap().key();
        let b = CapletFloorlet::new(idx, 1.0, 1.5, 0.02, true).unwrap().key();
        let c = CapletFloorlet::new(idx, 0.5, 1.0, 0.04, true).unwrap().key();
        let mut keys = vec![a, b, c];
        keys.sort();
        assert_eq!(keys, vec![c, b, a]);
    }

    // ==========================================================
    // CapFloor
    // ==========================================================

    #[test]
    fn test_from_schedule_forward_starting() {
        let cap = CapFloor::from_schedule(RateIndex::euribor_3m(), 1.0, 3.0, 0.02, false).unwrap();
        assert_eq!(cap.num_caplets(), 8);
        assert_eq!(cap.start(), 1.0);
        assert_eq!(cap.end(), 3.0);
        assert!(!cap.is_cap());
        assert_relative_eq!(cap.caplets()[7].fixing_time(), 2.75, epsilon = 1e-14);
    }

    #[test]
    fn test_from_schedule_rejects_broken_periods() {
        assert!(CapFloor::from_schedule(RateIndex::euribor_6m(), 0.0, 1.3, 0.02, true).is_err());
        assert!(CapFloor::from_schedule(RateIndex::euribor_6m(), 0.0, 0.5, 0.02, true).is_err());
        assert!(CapFloor::from_schedule(RateIndex::euribor_6m(), 2.0, 1.0, 0.02, true).is_err());
    }

    #[test]
    fn test_new_sorts_and_validates() {
        let idx = RateIndex::euribor_6m();
        let late = CapletFloorlet::new(idx, 1.0, 1.5, 0.02, true).unwrap();
        let early = CapletFloorlet::new(idx, 0.5, 1.0, 0.02, true).unwrap();
        let cap = CapFloor::new(vec![late, early]).unwrap();
        assert_eq!(cap.caplets()[0], early);

        let other_strike = CapletFloorlet::new(idx, 1.5, 2.0, 0.03, true).unwrap();
        assert!(CapFloor::new(vec![early, other_strike]).is_err());
        let floorlet = CapletFloorlet::new(idx, 1.5, 2.0, 0.02, false).unwrap();
        assert!(CapFloor::new(vec![early, floorlet]).is_err());
        let other_index = CapletFloorlet::new(RateIndex::libor_6m(), 1.5, 2.0, 0.02, true).unwrap();
        assert!(CapFloor::new(vec![early, other_index]).is_err());
        assert!(CapFloor::new(vec![early, early]).is_err());
        assert!(CapFloor::new(vec![]).is_err());
    }

    #[test]
    fn test_cap_price_is_sum_of_caplets() {
        let cap = CapFloor::from_schedule(RateIndex::euribor_6m(), 0.0, 3.0, 0.02, true).unwrap();
        let curves = curves();
        let total = cap.price(&curves, 0.3).unwrap();
        let sum: f64 = cap
            .caplets()
            .iter()
            .map(|c| c.option_datum(&curves).unwrap().price(0.3))
            .sum();
        assert_relative_eq!(total, sum, epsilon = 1e-16);
    }

    #[test]
    fn test_missing_discount_curve_propagates() {
        let cap = CapFloor::from_schedule(RateIndex::euribor_6m(), 0.0, 1.0, 0.02, true).unwrap();
        let empty: CurveSet<f64> = CurveSet::new();
        assert!(matches!(
            cap.option_data(&empty),
            Err(InstrumentError::MarketData(_))
        ));
    }
}
