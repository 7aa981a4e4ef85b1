//! Sequential bootstrap of co-starting caps.

use std::sync::Arc;

use capfloor_core::market_data::CurveProvider;
use capfloor_models::analytical::ImpliedVolSolver;
use capfloor_models::instruments::rates::CapFloor;
use capfloor_models::instruments::OptionDatum;
use nalgebra::DVector;
use tracing::{debug, info};

use super::result::{CapletStrippingResult, StrippingMethod};
use crate::config::StrippingConfig;
use crate::error::StrippingError;
use crate::pricer::{CapFloorPricer, MultiCapFloorPricer};
use crate::volatility::{DirectVolatility, DiscreteVolatilityFunction};

/// Absolute tolerance when comparing cap start and end times.
const TIME_TOLERANCE: f64 = 1e-10;

/// One block of caplets: those in a cap but not in the next shorter cap.
#[derive(Debug, Clone)]
struct Block {
    cap: usize,
    caplets: Vec<usize>,
    data: Vec<OptionDatum>,
}

/// Strips piecewise-constant caplet volatilities from co-starting caps at
/// one strike.
///
/// Caps are sorted by maturity. The difference between successive cap
/// prices is the price of the caplets the longer cap adds; one Black
/// volatility is solved for each such block.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
/// use capfloor_models::instruments::rates::{CapFloor, RateIndex};
/// use capfloor_stripping::stripping::CapletBootstrapper;
/// use nalgebra::DVector;
///
/// let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
/// let index = RateIndex::euribor_6m();
/// let caps: Vec<CapFloor> = [1.0, 2.0, 3.0]
///     .iter()
///     .map(|&end| CapFloor::from_schedule(index, 0.0, end, 0.03, true).unwrap())
///     .collect();
///
/// let bootstrapper = CapletBootstrapper::new(caps, &curves).unwrap();
/// let result = bootstrapper
///     .bootstrap_cap_vols(&DVector::from_vec(vec![0.3, 0.28, 0.27]))
///     .unwrap();
///
/// let vols = result.caplet_vols().unwrap();
/// assert!((vols[0] - 0.3).abs() < 1e-10);
/// // The 2y-3y block carries less vol than the cap
/// assert!(vols[4] < 0.27);
/// ```
#[derive(Debug, Clone)]
pub struct CapletBootstrapper {
    pricer: Arc<MultiCapFloorPricer>,
    vol_func: Arc<DiscreteVolatilityFunction>,
    blocks: Vec<Block>,
    solver: ImpliedVolSolver,
}

impl CapletBootstrapper {
    /// Decompose `caps` into maturity blocks.
    ///
    /// # Errors
    ///
    /// - `StrippingError::Configuration` unless every cap has the same start,
    ///   strike and cap/floor type, no two caps mature together, and each
    ///   cap's caplets extend those of the next shorter cap
    /// - Any error from building the pricer
    pub fn new<P: CurveProvider + ?Sized>(
        caps: Vec<CapFloor>,
        curves: &P,
    ) -> Result<Self, StrippingError> {
        Self::with_config(caps, curves, StrippingConfig::default())
    }

    /// As [`new`](Self::new) with explicit solver settings.
    pub fn with_config<P: CurveProvider + ?Sized>(
        caps: Vec<CapFloor>,
        curves: &P,
        config: StrippingConfig,
    ) -> Result<Self, StrippingError> {
        config.validate()?;
        let first = caps
            .first()
            .ok_or_else(|| StrippingError::InvalidInput("at least one cap is required".to_string()))?;
        let (start, strike, is_cap) = (first.start(), first.strike(), first.is_cap());
        for cap in &caps {
            if (cap.start() - start).abs() > TIME_TOLERANCE {
                return Err(StrippingError::configuration(format!(
                    "bootstrapping needs co-starting caps, found starts {} and {}",
                    start,
                    cap.start()
                )));
            }
            if cap.strike() != strike || cap.is_cap() != is_cap {
                return Err(StrippingError::configuration(
                    "bootstrapping needs caps of one strike and type",
                ));
            }
        }

        let pricer = MultiCapFloorPricer::new(caps, curves)?.with_implied_vol_config(config.implied_vol);

        let mut order: Vec<usize> = (0..pricer.num_caps()).collect();
        order.sort_by(|&a, &b| pricer.caps()[a].end().total_cmp(&pricer.caps()[b].end()));
        if let Some(pair) = order.windows(2).find(|pair| {
            (pricer.caps()[pair[1]].end() - pricer.caps()[pair[0]].end()).abs() <= TIME_TOLERANCE
        }) {
            return Err(StrippingError::configuration(format!(
                "caps {} and {} have the same maturity",
                pair[0], pair[1]
            )));
        }

        let map = pricer.cap_to_caplet_map();
        let mut blocks = Vec::with_capacity(order.len());
        let mut covered: &[usize] = &[];
        for &cap in &order {
            let caplets = &map[cap];
            // Each cap must extend the next shorter one
            if !caplets.starts_with(covered) || caplets.len() == covered.len() {
                return Err(StrippingError::configuration(format!(
                    "cap {} does not extend the caplets of the next shorter cap",
                    cap
                )));
            }
            let data = pricer.cap_option_data(cap).unwrap_or_default();
            if data.len() != caplets.len() {
                return Err(StrippingError::configuration(format!(
                    "cap {} has {} option data for {} caplets",
                    cap,
                    data.len(),
                    caplets.len()
                )));
            }
            blocks.push(Block {
                cap,
                caplets: caplets[covered.len()..].to_vec(),
                data: data[covered.len()..].to_vec(),
            });
            covered = caplets.as_slice();
        }

        let vol_func = DiscreteVolatilityFunction::Direct(DirectVolatility::new(pricer.num_caplets()));
        debug!(caps = blocks.len(), caplets = pricer.num_caplets(), "bootstrap blocks ready");

        Ok(Self {
            pricer: Arc::new(pricer),
            vol_func: Arc::new(vol_func),
            blocks,
            solver: ImpliedVolSolver::new(config.implied_vol),
        })
    }

    /// Pricer over the caps.
    #[inline]
    pub fn pricer(&self) -> &Arc<MultiCapFloorPricer> {
        &self.pricer
    }

    /// Strip caplet volatilities from cap prices.
    ///
    /// # Errors
    ///
    /// - `StrippingError::LengthMismatch` if there is not one price per cap
    /// - `StrippingError::InvalidMarketData` if prices do not increase with
    ///   maturity or a block is priced below its intrinsic value
    /// - Implied volatility failures
    pub fn bootstrap_cap_prices(
        &self,
        prices: &DVector<f64>,
    ) -> Result<CapletStrippingResult<MultiCapFloorPricer>, StrippingError> {
        let n_caps = self.pricer.num_caps();
        if prices.len() != n_caps {
            return Err(StrippingError::length_mismatch("cap prices", n_caps, prices.len()));
        }

        let mut vols = DVector::zeros(self.pricer.num_caplets());
        let mut previous = 0.0;
        for block in &self.blocks {
            let price = prices[block.cap];
            let block_price = price - previous;
            if !(block_price > 0.0) {
                return Err(StrippingError::invalid_market_data(
                    block.cap,
                    format!("price {} does not exceed the shorter cap's {}", price, previous),
                ));
            }
            let intrinsic: f64 = block.data.iter().map(OptionDatum::intrinsic).sum();
            if block_price < intrinsic {
                return Err(StrippingError::invalid_market_data(
                    block.cap,
                    format!(
                        "forward-starting block price {} is below intrinsic value {}",
                        block_price, intrinsic
                    ),
                ));
            }

            let vol = self.solver.implied_volatility(&block.data, block_price)?;
            for &j in &block.caplets {
                vols[j] = vol;
            }
            previous = price;
        }

        let residual = self.pricer.price_from_caplet_vols(&vols)? - prices;
        let chi_sq = residual.norm_squared();
        info!(method = %StrippingMethod::Bootstrap, chi_sq, blocks = self.blocks.len(), "caplet stripping finished");

        Ok(CapletStrippingResult::new(
            vols,
            chi_sq,
            StrippingMethod::Bootstrap,
            self.blocks.len(),
            Arc::clone(&self.pricer),
            Arc::clone(&self.vol_func),
        ))
    }

    /// Strip caplet volatilities from cap implied volatilities.
    pub fn bootstrap_cap_vols(
        &self,
        vols: &DVector<f64>,
    ) -> Result<CapletStrippingResult<MultiCapFloorPricer>, StrippingError> {
        if let Some(i) = vols.iter().position(|v| !(*v >= 0.0) || !v.is_finite()) {
            return Err(StrippingError::invalid_market_data(
                i,
                format!("volatility {} is negative", vols[i]),
            ));
        }
        let prices = self.pricer.price(vols)?;
        self.bootstrap_cap_prices(&prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
    use capfloor_models::instruments::rates::{CapletFloorlet, RateIndex};

    fn curves() -> CurveSet<f64> {
        CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03))
    }

    fn cap(start: f64, end: f64, strike: f64) -> CapFloor {
        CapFloor::from_schedule(RateIndex::euribor_6m(), start, end, strike, true).unwrap()
    }

    #[test]
    fn test_recovers_piecewise_constant_vols() {
        // Built out of maturity order on purpose
        let caps = vec![cap(0.0, 3.0, 0.03), cap(0.0, 1.0, 0.03), cap(0.0, 2.0, 0.03)];
        let b = CapletBootstrapper::new(caps, &curves()).unwrap();
        let truth = DVector::from_vec(vec![0.4, 0.33, 0.33, 0.29, 0.29]);
        let prices = b.pricer().price_from_caplet_vols(&truth).unwrap();

        let result = b.bootstrap_cap_prices(&prices).unwrap();
        assert_eq!(result.method(), StrippingMethod::Bootstrap);
        assert_relative_eq!(result.caplet_vols().unwrap(), truth, epsilon = 1e-9);
        assert!(result.cap_price_residuals(&prices).unwrap().amax() < 1e-14);
    }

    #[test]
    fn test_rejects_non_increasing_prices() {
        let caps = vec![cap(0.0, 1.0, 0.03), cap(0.0, 2.0, 0.03)];
        let b = CapletBootstrapper::new(caps, &curves()).unwrap();
        let prices = DVector::from_vec(vec![0.002, 0.0019]);
        assert!(matches!(
            b.bootstrap_cap_prices(&prices),
            Err(StrippingError::InvalidMarketData { cap: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_block_below_intrinsic() {
        // Deep in-the-money: the second block is worth at least its intrinsic value
        let caps = vec![cap(0.0, 1.0, 0.01), cap(0.0, 2.0, 0.01)];
        let b = CapletBootstrapper::new(caps, &curves()).unwrap();
        let first = b.pricer().price(&DVector::from_element(2, 0.3)).unwrap()[0];
        let prices = DVector::from_vec(vec![first, first + 1e-6]);
        assert!(matches!(
            b.bootstrap_cap_prices(&prices),
            Err(StrippingError::InvalidMarketData { cap: 1, .. })
        ));
    }

    #[test]
    fn test_rejects_unsuitable_caps() {
        let not_co_starting = vec![cap(0.0, 1.0, 0.03), cap(1.0, 2.0, 0.03)];
        assert!(matches!(
            CapletBootstrapper::new(not_co_starting, &curves()),
            Err(StrippingError::Configuration(_))
        ));

        let two_strikes = vec![cap(0.0, 1.0, 0.03), cap(0.0, 2.0, 0.04)];
        assert!(matches!(
            CapletBootstrapper::new(two_strikes, &curves()),
            Err(StrippingError::Configuration(_))
        ));

        let same_maturity = vec![cap(0.0, 2.0, 0.03), cap(0.0, 2.0, 0.03)];
        assert!(matches!(
            CapletBootstrapper::new(same_maturity, &curves()),
            Err(StrippingError::Configuration(_))
        ));
    }

    #[test]
    fn test_rejects_caps_that_do_not_nest() {
        let index = RateIndex::euribor_6m();
        let strip = |periods: &[(f64, f64)]| {
            let caplets = periods
                .iter()
                .map(|&(s, e)| CapletFloorlet::new(index, s, e, 0.03, true).unwrap())
                .collect();
            CapFloor::new(caplets).unwrap()
        };
        // Same start and strike, but the longer cap skips [1, 2]
        let shorter = strip(&[(0.5, 1.0), (1.0, 1.5), (1.5, 2.0)]);
        let longer = strip(&[(0.5, 1.0), (2.0, 2.5)]);

        assert!(matches!(
            CapletBootstrapper::new(vec![shorter.clone(), longer.clone()], &curves()),
            Err(StrippingError::Configuration(_))
        ));
        assert!(matches!(
            CapletBootstrapper::new(vec![longer, shorter], &curves()),
            Err(StrippingError::Configuration(_))
        ));
    }

    #[test]
    fn test_accepts_gap_after_shorter_cap() {
        let index = RateIndex::euribor_6m();
        let strip = |periods: &[(f64, f64)]| {
            let caplets = periods
                .iter()
                .map(|&(s, e)| CapletFloorlet::new(index, s, e, 0.03, true).unwrap())
                .collect();
            CapFloor::new(caplets).unwrap()
        };
        let caps = vec![strip(&[(0.5, 1.0)]), strip(&[(0.5, 1.0), (1.5, 2.0)])];
        let b = CapletBootstrapper::new(caps, &curves()).unwrap();
        let truth = DVector::from_vec(vec![0.35, 0.3]);
        let prices = b.pricer().price_from_caplet_vols(&truth).unwrap();

        let result = b.bootstrap_cap_prices(&prices).unwrap();
        assert_relative_eq!(result.caplet_vols().unwrap(), truth, epsilon = 1e-9);
    }
}
