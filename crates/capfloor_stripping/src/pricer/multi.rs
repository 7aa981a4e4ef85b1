//! Pricer over the exact caplet universe of a cap set.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;

use capfloor_core::market_data::CurveProvider;
use capfloor_core::math::solvers::SolverConfig;
use capfloor_core::types::SolverError;
use capfloor_models::analytical::ImpliedVolSolver;
use capfloor_models::instruments::rates::{CapFloor, CapletKey, RateIndex};
use capfloor_models::instruments::OptionDatum;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::CapFloorPricer;
use crate::error::StrippingError;
use crate::volatility::VolatilityPoint;

/// Relative forward difference above which two caplets with the same key collide.
const COLLISION_TOLERANCE: f64 = 1e-12;

/// Cap vega below which the cap implied volatility is insensitive to its caplets.
const MIN_CAP_VEGA: f64 = 1e-300;

/// Decomposes caps into their unique caplets and aggregates caplet values
/// back to caps.
///
/// Caplets are identified by (fixing time, strike) and held in ascending
/// fixing order, then ascending strike. Each cap keeps its own resolved
/// [`OptionDatum`]s, so caps and floors at the same strike share caplet
/// volatilities but are priced with their own payoffs.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
/// use capfloor_models::instruments::rates::{CapFloor, RateIndex};
/// use capfloor_stripping::pricer::{CapFloorPricer, MultiCapFloorPricer};
/// use nalgebra::DVector;
///
/// let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
/// let index = RateIndex::euribor_6m();
/// let caps = vec![
///     CapFloor::from_schedule(index, 0.0, 2.0, 0.03, true).unwrap(),
///     CapFloor::from_schedule(index, 0.0, 3.0, 0.03, true).unwrap(),
/// ];
/// let pricer = MultiCapFloorPricer::new(caps, &curves).unwrap();
///
/// // The 3y cap contains every caplet of the 2y cap
/// assert_eq!(pricer.num_caplets(), 5);
/// assert_eq!(pricer.cap_to_caplet_map()[0], vec![0, 1, 2]);
///
/// let prices = pricer.price_from_caplet_vols(&DVector::from_element(5, 0.3)).unwrap();
/// assert!(prices[1] > prices[0]);
/// ```
#[derive(Debug, Clone)]
pub struct MultiCapFloorPricer {
    index: RateIndex,
    caps: Vec<CapFloor>,
    keys: Vec<CapletKey>,
    forwards: Vec<f64>,
    cap_to_caplet: Vec<Vec<usize>>,
    cap_data: Vec<Vec<OptionDatum>>,
    intrinsic: DVector<f64>,
    solver: ImpliedVolSolver,
}

impl MultiCapFloorPricer {
    /// Decompose `caps`, resolving every caplet against `curves`.
    ///
    /// # Errors
    ///
    /// - `StrippingError::InvalidInput` if `caps` is empty
    /// - `StrippingError::InconsistentIndex` if the caps reference different indices
    /// - `StrippingError::CapletCollision` if caplets with the same fixing and
    ///   strike have different forwards
    /// - Curve lookup failures
    pub fn new<P: CurveProvider + ?Sized>(
        caps: Vec<CapFloor>,
        curves: &P,
    ) -> Result<Self, StrippingError> {
        let index = caps
            .first()
            .map(CapFloor::index)
            .ok_or_else(|| StrippingError::InvalidInput("at least one cap is required".to_string()))?;
        for (i, cap) in caps.iter().enumerate() {
            if cap.index() != index {
                return Err(StrippingError::InconsistentIndex {
                    expected: index.to_string(),
                    found: cap.index().to_string(),
                    cap: i,
                });
            }
        }

        let cap_data = caps
            .iter()
            .map(|cap| cap.option_data(curves))
            .collect::<Result<Vec<_>, _>>()?;

        let mut universe: BTreeMap<CapletKey, f64> = BTreeMap::new();
        for (cap, data) in caps.iter().zip(&cap_data) {
            for (caplet, datum) in cap.caplets().iter().zip(data) {
                match universe.entry(caplet.key()) {
                    Entry::Vacant(slot) => {
                        slot.insert(datum.forward());
                    }
                    Entry::Occupied(slot) => {
                        let known = *slot.get();
                        if (known - datum.forward()).abs() > COLLISION_TOLERANCE * known.abs() {
                            return Err(StrippingError::CapletCollision {
                                fixing_time: caplet.fixing_time(),
                                strike: caplet.strike(),
                            });
                        }
                    }
                }
            }
        }

        let keys: Vec<CapletKey> = universe.keys().copied().collect();
        let forwards: Vec<f64> = universe.values().copied().collect();
        let cap_to_caplet = caps
            .iter()
            .map(|cap| {
                cap.caplets()
                    .iter()
                    .map(|caplet| {
                        keys.binary_search(&caplet.key()).map_err(|_| {
                            StrippingError::InvalidInput("caplet missing from universe".to_string())
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()?;

        let intrinsic = DVector::from_iterator(
            caps.len(),
            cap_data
                .iter()
                .map(|data| data.iter().map(OptionDatum::intrinsic).sum::<f64>()),
        );

        debug!(
            index = %index,
            caps = caps.len(),
            caplets = keys.len(),
            "decomposed caps into caplet universe"
        );

        Ok(Self {
            index,
            caps,
            keys,
            forwards,
            cap_to_caplet,
            cap_data,
            intrinsic,
            solver: ImpliedVolSolver::default(),
        })
    }

    /// Same pricer with a different cap implied volatility solver configuration.
    pub fn with_implied_vol_config(mut self, config: SolverConfig) -> Self {
        self.solver = ImpliedVolSolver::new(config);
        self
    }

    /// Rate index shared by every cap.
    #[inline]
    pub fn index(&self) -> RateIndex {
        self.index
    }

    /// Caps, in construction order.
    #[inline]
    pub fn caps(&self) -> &[CapFloor] {
        &self.caps
    }

    /// Universe caplets in canonical order.
    #[inline]
    pub fn expiry_strike_array(&self) -> &[CapletKey] {
        &self.keys
    }

    /// Forward of each universe caplet.
    #[inline]
    pub fn caplet_forwards(&self) -> &[f64] {
        &self.forwards
    }

    /// For each cap, the universe indices of its caplets.
    #[inline]
    pub fn cap_to_caplet_map(&self) -> &[Vec<usize>] {
        &self.cap_to_caplet
    }

    /// Resolved caplet data of cap `cap`.
    pub fn cap_option_data(&self, cap: usize) -> Option<&[OptionDatum]> {
        self.cap_data.get(cap).map(Vec::as_slice)
    }

    /// Distinct strikes, ascending.
    pub fn strikes(&self) -> Vec<f64> {
        let mut strikes: Vec<f64> = self.keys.iter().map(|k| k.strike).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();
        strikes
    }

    /// Distinct fixing times, ascending.
    pub fn expiries(&self) -> Vec<f64> {
        let mut expiries: Vec<f64> = self.keys.iter().map(|k| k.fixing_time).collect();
        expiries.dedup();
        expiries
    }

    /// Sum universe caplet values into caps.
    ///
    /// # Errors
    ///
    /// `StrippingError::LengthMismatch` if `caplet_values` is not one value per universe caplet.
    pub fn aggregate_to_caps(&self, caplet_values: &[f64]) -> Result<DVector<f64>, StrippingError> {
        self.check_caplet_len(caplet_values.len())?;
        Ok(DVector::from_iterator(
            self.caps.len(),
            self.cap_to_caplet
                .iter()
                .map(|indices| indices.iter().map(|&j| caplet_values[j]).sum::<f64>()),
        ))
    }

    fn check_caplet_len(&self, got: usize) -> Result<(), StrippingError> {
        if got != self.keys.len() {
            return Err(StrippingError::length_mismatch(
                "caplet volatilities",
                self.keys.len(),
                got,
            ));
        }
        Ok(())
    }

    fn check_cap_len(&self, what: &str, got: usize) -> Result<(), StrippingError> {
        if got != self.caps.len() {
            return Err(StrippingError::length_mismatch(what, self.caps.len(), got));
        }
        Ok(())
    }
}

impl CapFloorPricer for MultiCapFloorPricer {
    fn num_caps(&self) -> usize {
        self.caps.len()
    }

    fn num_caplets(&self) -> usize {
        self.keys.len()
    }

    fn volatility_points(&self) -> Vec<VolatilityPoint> {
        self.keys
            .iter()
            .zip(&self.forwards)
            .map(|(key, &forward)| VolatilityPoint::new(key.fixing_time, key.strike, forward))
            .collect()
    }

    fn intrinsic_cap_values(&self) -> DVector<f64> {
        self.intrinsic.clone()
    }

    fn price_from_caplet_vols(&self, vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.check_caplet_len(vols.len())?;
        Ok(DVector::from_iterator(
            self.caps.len(),
            self.cap_data.iter().zip(&self.cap_to_caplet).map(|(data, indices)| {
                data.iter()
                    .zip(indices)
                    .map(|(datum, &j)| datum.price(vols[j]))
                    .sum::<f64>()
            }),
        ))
    }

    fn vega_from_caplet_vols(&self, vols: &DVector<f64>) -> Result<DMatrix<f64>, StrippingError> {
        self.check_caplet_len(vols.len())?;
        let mut vega = DMatrix::zeros(self.caps.len(), self.keys.len());
        for (i, (data, indices)) in self.cap_data.iter().zip(&self.cap_to_caplet).enumerate() {
            for (datum, &j) in data.iter().zip(indices) {
                vega[(i, j)] = datum.vega(vols[j]);
            }
        }
        Ok(vega)
    }

    fn price(&self, cap_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.check_cap_len("cap volatilities", cap_vols.len())?;
        Ok(DVector::from_iterator(
            self.caps.len(),
            self.cap_data
                .iter()
                .zip(cap_vols.iter())
                .map(|(data, &vol)| data.iter().map(|d| d.price(vol)).sum::<f64>()),
        ))
    }

    fn vega(&self, cap_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.check_cap_len("cap volatilities", cap_vols.len())?;
        Ok(DVector::from_iterator(
            self.caps.len(),
            self.cap_data
                .iter()
                .zip(cap_vols.iter())
                .map(|(data, &vol)| data.iter().map(|d| d.vega(vol)).sum::<f64>()),
        ))
    }

    fn implied_vols(&self, cap_prices: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.check_cap_len("cap prices", cap_prices.len())?;
        let vols = self
            .cap_data
            .iter()
            .zip(cap_prices.iter())
            .map(|(data, &price)| self.solver.implied_volatility(data, price))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(DVector::from_vec(vols))
    }

    fn cap_vol_vega(&self, vols: &DVector<f64>) -> Result<DMatrix<f64>, StrippingError> {
        let prices = self.price_from_caplet_vols(vols)?;
        let cap_vols = self.implied_vols(&prices)?;
        let cap_vegas = self.vega(&cap_vols)?;
        let mut jac = self.vega_from_caplet_vols(vols)?;
        for (i, &cap_vega) in cap_vegas.iter().enumerate() {
            if !(cap_vega > MIN_CAP_VEGA) {
                return Err(SolverError::DerivativeNearZero { x: cap_vols[i] }.into());
            }
            jac.row_mut(i).unscale_mut(cap_vega);
        }
        Ok(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};

    fn curves() -> CurveSet<f64> {
        let mut curves = CurveSet::new();
        curves.insert(CurveName::Ois, CurveEnum::flat(0.02));
        curves.insert(CurveName::Euribor3M, CurveEnum::flat(0.03));
        curves.insert(CurveName::Euribor6M, CurveEnum::flat(0.032));
        curves.set_discount_curve(CurveName::Ois);
        curves
    }

    fn cap(end: f64, strike: f64) -> CapFloor {
        CapFloor::from_schedule(RateIndex::euribor_3m(), 0.0, end, strike, true).unwrap()
    }

    fn overlapping_caps() -> Vec<CapFloor> {
        vec![
            cap(1.0, 0.03),
            cap(2.0, 0.03),
            cap(1.0, 0.04),
            CapFloor::from_schedule(RateIndex::euribor_3m(), 0.0, 2.0, 0.03, false).unwrap(),
        ]
    }

    // ========================================
    // Construction Tests
    // ========================================

    #[test]
    fn test_universe_is_deduplicated_and_ordered() {
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves()).unwrap();
        // 7 fixings at 3%, 3 at 4%
        assert_eq!(pricer.num_caplets(), 10);
        let keys = pricer.expiry_strike_array();
        assert!(keys.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(pricer.strikes(), vec![0.03, 0.04]);
        assert_eq!(pricer.expiries().len(), 7);
        // The floor shares the 2y cap's caplets
        assert_eq!(pricer.cap_to_caplet_map()[1], pricer.cap_to_caplet_map()[3]);
    }

    #[test]
    fn test_rejects_mixed_indices() {
        let caps = vec![
            cap(1.0, 0.03),
            CapFloor::from_schedule(RateIndex::euribor_6m(), 0.0, 2.0, 0.03, true).unwrap(),
        ];
        let err = MultiCapFloorPricer::new(caps, &curves()).unwrap_err();
        assert!(matches!(err, StrippingError::InconsistentIndex { cap: 1, .. }));
    }

    #[test]
    fn test_rejects_empty() {
        assert!(matches!(
            MultiCapFloorPricer::new(Vec::new(), &curves()),
            Err(StrippingError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_collision_on_different_forward() {
        use capfloor_models::instruments::rates::CapletFloorlet;
        let index = RateIndex::euribor_3m();
        let a = CapFloor::new(vec![CapletFloorlet::new(index, 0.5, 0.75, 0.03, true).unwrap()]).unwrap();
        let b = CapFloor::new(vec![CapletFloorlet::new(index, 0.5, 1.0, 0.03, true).unwrap()]).unwrap();
        let err = MultiCapFloorPricer::new(vec![a, b], &curves()).unwrap_err();
        assert!(matches!(err, StrippingError::CapletCollision { .. }));
    }

    // ========================================
    // Aggregation Tests
    // ========================================

    #[test]
    fn test_price_matches_direct_cap_pricing() {
        let curves = curves();
        let caps = overlapping_caps();
        let pricer = MultiCapFloorPricer::new(caps.clone(), &curves).unwrap();
        let flat = DVector::from_element(pricer.num_caplets(), 0.35);
        let prices = pricer.price_from_caplet_vols(&flat).unwrap();
        for (i, cap) in caps.iter().enumerate() {
            assert_relative_eq!(prices[i], cap.price(&curves, 0.35).unwrap(), max_relative = 1e-14);
        }
        let cap_vols = DVector::from_element(caps.len(), 0.35);
        assert_eq!(pricer.price(&cap_vols).unwrap(), prices);
    }

    #[test]
    fn test_aggregate_to_caps() {
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves()).unwrap();
        let ones = vec![1.0; pricer.num_caplets()];
        let counts = pricer.aggregate_to_caps(&ones).unwrap();
        assert_eq!(counts.as_slice(), &[3.0, 7.0, 3.0, 7.0]);
        assert!(pricer.aggregate_to_caps(&ones[1..]).is_err());
    }

    #[test]
    fn test_length_checks() {
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves()).unwrap();
        let err = pricer
            .price_from_caplet_vols(&DVector::from_element(3, 0.2))
            .unwrap_err();
        assert_eq!(err, StrippingError::length_mismatch("caplet volatilities", 10, 3));
        assert!(pricer.implied_vols(&DVector::from_element(2, 0.01)).is_err());
    }

    #[test]
    fn test_intrinsic_values() {
        let curves = curves();
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves).unwrap();
        let zero = DVector::zeros(pricer.num_caplets());
        let at_zero_vol = pricer.price_from_caplet_vols(&zero).unwrap();
        assert_relative_eq!(pricer.intrinsic_cap_values(), at_zero_vol, epsilon = 1e-16);
    }

    // ========================================
    // Sensitivity Tests
    // ========================================

    #[test]
    fn test_vega_matrix_matches_finite_differences() {
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves()).unwrap();
        let n = pricer.num_caplets();
        let vols = DVector::from_fn(n, |j, _| 0.25 + 0.01 * j as f64);
        let vega = pricer.vega_from_caplet_vols(&vols).unwrap();
        let h = 1e-6;
        for j in 0..n {
            let mut up = vols.clone();
            up[j] += h;
            let mut down = vols.clone();
            down[j] -= h;
            let fd = (pricer.price_from_caplet_vols(&up).unwrap()
                - pricer.price_from_caplet_vols(&down).unwrap())
                / (2.0 * h);
            for i in 0..pricer.num_caps() {
                assert_relative_eq!(vega[(i, j)], fd[i], epsilon = 1e-9);
            }
        }
    }

    #[test]
    fn test_cap_vol_vega_matches_finite_differences() {
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves()).unwrap();
        let n = pricer.num_caplets();
        let vols = DVector::from_fn(n, |j, _| 0.3 + 0.005 * j as f64);
        let jac = pricer.cap_vol_vega(&vols).unwrap();
        let h = 1e-5;
        for j in 0..n {
            let mut up = vols.clone();
            up[j] += h;
            let mut down = vols.clone();
            down[j] -= h;
            let iv = |v: &DVector<f64>| {
                pricer
                    .implied_vols(&pricer.price_from_caplet_vols(v).unwrap())
                    .unwrap()
            };
            let fd = (iv(&up) - iv(&down)) / (2.0 * h);
            for i in 0..pricer.num_caps() {
                assert_relative_eq!(jac[(i, j)], fd[i], epsilon = 1e-6);
            }
        }
    }

    #[test]
    fn test_implied_vol_round_trip() {
        let pricer = MultiCapFloorPricer::new(overlapping_caps(), &curves()).unwrap();
        let cap_vols = DVector::from_vec(vec![0.2, 0.25, 0.3, 0.35]);
        let prices = pricer.price(&cap_vols).unwrap();
        let implied = pricer.implied_vols(&prices).unwrap();
        assert_relative_eq!(implied, cap_vols, epsilon = 1e-9);
    }
}
