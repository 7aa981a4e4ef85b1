//! Pricer over a complete expiry × strike caplet grid.

use capfloor_core::market_data::CurveProvider;
use capfloor_models::instruments::rates::CapFloor;
use nalgebra::{DMatrix, DVector};

use super::{CapFloorPricer, MultiCapFloorPricer};
use crate::error::StrippingError;
use crate::volatility::VolatilityPoint;

/// [`MultiCapFloorPricer`] whose caplet volatility vector covers every
/// (expiry, strike) pair of the cap set.
///
/// Slot `e * num_strikes + s` holds expiry `e` and strike `s`. Slots that no
/// cap contains are phantom caplets: their volatilities are ignored when
/// pricing and their vega columns are zero.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
/// use capfloor_models::instruments::rates::{CapFloor, RateIndex};
/// use capfloor_stripping::pricer::{CapFloorPricer, MultiCapFloorPricerGrid};
///
/// let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
/// let index = RateIndex::euribor_6m();
/// let caps = vec![
///     CapFloor::from_schedule(index, 0.0, 2.0, 0.02, true).unwrap(),
///     CapFloor::from_schedule(index, 0.0, 1.0, 0.04, true).unwrap(),
/// ];
/// let grid = MultiCapFloorPricerGrid::new(caps, &curves).unwrap();
///
/// assert_eq!(grid.grid_shape(), (3, 2));
/// // 0.04 is not quoted beyond 1y
/// assert_eq!(grid.num_phantoms(), 2);
/// assert!(grid.is_phantom(3));
/// ```
#[derive(Debug, Clone)]
pub struct MultiCapFloorPricerGrid {
    pricer: MultiCapFloorPricer,
    expiries: Vec<f64>,
    strikes: Vec<f64>,
    universe_to_grid: Vec<usize>,
    grid_to_universe: Vec<Option<usize>>,
    expiry_forwards: Vec<f64>,
}

impl MultiCapFloorPricerGrid {
    /// Decompose `caps` and lay the caplets out on the full grid.
    ///
    /// # Errors
    ///
    /// As [`MultiCapFloorPricer::new`].
    pub fn new<P: CurveProvider + ?Sized>(
        caps: Vec<CapFloor>,
        curves: &P,
    ) -> Result<Self, StrippingError> {
        Self::from_pricer(MultiCapFloorPricer::new(caps, curves)?)
    }

    /// Lay an existing pricer's caplets out on the full grid.
    pub fn from_pricer(pricer: MultiCapFloorPricer) -> Result<Self, StrippingError> {
        let expiries = pricer.expiries();
        let strikes = pricer.strikes();
        let n_strikes = strikes.len();

        let mut grid_to_universe = vec![None; expiries.len() * n_strikes];
        let mut universe_to_grid = Vec::with_capacity(pricer.num_caplets());
        let mut expiry_forwards = vec![0.0; expiries.len()];

        for (j, (key, &forward)) in pricer
            .expiry_strike_array()
            .iter()
            .zip(pricer.caplet_forwards())
            .enumerate()
        {
            let e = expiries
                .binary_search_by(|t| t.total_cmp(&key.fixing_time))
                .map_err(|_| StrippingError::InvalidInput("expiry missing from grid".to_string()))?;
            let s = strikes
                .binary_search_by(|k| k.total_cmp(&key.strike))
                .map_err(|_| StrippingError::InvalidInput("strike missing from grid".to_string()))?;
            let slot = e * n_strikes + s;
            grid_to_universe[slot] = Some(j);
            universe_to_grid.push(slot);
            expiry_forwards[e] = forward;
        }

        Ok(Self {
            pricer,
            expiries,
            strikes,
            universe_to_grid,
            grid_to_universe,
            expiry_forwards,
        })
    }

    /// Underlying exact-universe pricer.
    #[inline]
    pub fn pricer(&self) -> &MultiCapFloorPricer {
        &self.pricer
    }

    /// Grid expiries, ascending.
    #[inline]
    pub fn expiries(&self) -> &[f64] {
        &self.expiries
    }

    /// Grid strikes, ascending.
    #[inline]
    pub fn strikes(&self) -> &[f64] {
        &self.strikes
    }

    /// `(num_expiries, num_strikes)`.
    #[inline]
    pub fn grid_shape(&self) -> (usize, usize) {
        (self.expiries.len(), self.strikes.len())
    }

    /// Whether grid slot `slot` is a phantom caplet.
    pub fn is_phantom(&self, slot: usize) -> bool {
        matches!(self.grid_to_universe.get(slot), Some(None))
    }

    /// Number of phantom slots.
    pub fn num_phantoms(&self) -> usize {
        self.grid_to_universe.iter().filter(|u| u.is_none()).count()
    }

    /// Grid slot of each universe caplet.
    #[inline]
    pub fn universe_to_grid(&self) -> &[usize] {
        &self.universe_to_grid
    }

    /// Grid volatilities restricted to the real caplets.
    pub fn to_universe(&self, grid_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.check_grid_len(grid_vols.len())?;
        Ok(DVector::from_iterator(
            self.universe_to_grid.len(),
            self.universe_to_grid.iter().map(|&slot| grid_vols[slot]),
        ))
    }

    /// Spread universe values onto the grid, with `fill` in phantom slots.
    pub fn to_grid(&self, values: &DVector<f64>, fill: f64) -> Result<DVector<f64>, StrippingError> {
        if values.len() != self.universe_to_grid.len() {
            return Err(StrippingError::length_mismatch(
                "caplet values",
                self.universe_to_grid.len(),
                values.len(),
            ));
        }
        let mut grid = DVector::from_element(self.grid_to_universe.len(), fill);
        for (j, &slot) in self.universe_to_grid.iter().enumerate() {
            grid[slot] = values[j];
        }
        Ok(grid)
    }

    fn check_grid_len(&self, got: usize) -> Result<(), StrippingError> {
        if got != self.grid_to_universe.len() {
            return Err(StrippingError::length_mismatch(
                "grid caplet volatilities",
                self.grid_to_universe.len(),
                got,
            ));
        }
        Ok(())
    }

    fn expand_columns(&self, universe: DMatrix<f64>) -> DMatrix<f64> {
        let mut grid = DMatrix::zeros(universe.nrows(), self.grid_to_universe.len());
        for (j, &slot) in self.universe_to_grid.iter().enumerate() {
            grid.set_column(slot, &universe.column(j));
        }
        grid
    }
}

impl CapFloorPricer for MultiCapFloorPricerGrid {
    fn num_caps(&self) -> usize {
        self.pricer.num_caps()
    }

    fn num_caplets(&self) -> usize {
        self.grid_to_universe.len()
    }

    fn volatility_points(&self) -> Vec<VolatilityPoint> {
        let n_strikes = self.strikes.len();
        (0..self.grid_to_universe.len())
            .map(|slot| {
                let e = slot / n_strikes;
                VolatilityPoint::new(
                    self.expiries[e],
                    self.strikes[slot % n_strikes],
                    self.expiry_forwards[e],
                )
            })
            .collect()
    }

    fn intrinsic_cap_values(&self) -> DVector<f64> {
        self.pricer.intrinsic_cap_values()
    }

    fn price_from_caplet_vols(&self, vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.pricer.price_from_caplet_vols(&self.to_universe(vols)?)
    }

    fn vega_from_caplet_vols(&self, vols: &DVector<f64>) -> Result<DMatrix<f64>, StrippingError> {
        let universe = self.pricer.vega_from_caplet_vols(&self.to_universe(vols)?)?;
        Ok(self.expand_columns(universe))
    }

    fn price(&self, cap_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.pricer.price(cap_vols)
    }

    fn vega(&self, cap_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.pricer.vega(cap_vols)
    }

    fn implied_vols(&self, cap_prices: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        self.pricer.implied_vols(cap_prices)
    }

    fn cap_vol_vega(&self, vols: &DVector<f64>) -> Result<DMatrix<f64>, StrippingError> {
        let universe = self.pricer.cap_vol_vega(&self.to_universe(vols)?)?;
        Ok(self.expand_columns(universe))
    }
}
