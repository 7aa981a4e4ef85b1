//! Ready-made calibrations built on [`CapletStrippingCore`].

use capfloor_core::market_data::CurveProvider;
use capfloor_core::math::penalty::penalty_matrix_2d;
use capfloor_core::math::transforms::ParameterTransform;
use capfloor_models::instruments::rates::CapFloor;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use super::domain::ParameterDomain;
use super::engine::CapletStrippingCore;
use super::result::CapletStrippingResult;
use crate::config::StrippingConfig;
use crate::error::StrippingError;
use crate::pricer::{CapFloorPricer, MultiCapFloorPricer, MultiCapFloorPricerGrid};
use crate::volatility::{co_starting_knots, CurveSpec, DiscreteVolatilityFunctionProvider};

/// Default curvature penalty strength in each grid direction.
pub const DEFAULT_SMOOTHING: f64 = 1.0;

/// Highest difference order the grid penalty uses.
const MAX_PENALTY_ORDER: usize = 2;

/// Arithmetic mean of the implied volatilities of `prices`.
fn mean_implied_vol<P: CapFloorPricer + ?Sized>(
    pricer: &P,
    prices: &DVector<f64>,
) -> Result<f64, StrippingError> {
    if prices.len() != pricer.num_caps() {
        return Err(StrippingError::length_mismatch("cap prices", pricer.num_caps(), prices.len()));
    }
    Ok(pricer.implied_vols(prices)?.mean())
}

// ================================================================================
// Direct stripper
// ================================================================================

/// One free volatility per node of the expiry × strike caplet grid, fitted by
/// penalised least squares.
///
/// The penalty is a curvature (second difference) penalty along each grid
/// direction, dropping to first differences for a direction with two nodes
/// and vanishing for one with a single node. Volatilities are kept
/// non-negative.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
/// use capfloor_models::instruments::rates::{CapFloor, RateIndex};
/// use capfloor_stripping::stripping::DirectStripper;
/// use nalgebra::DVector;
///
/// let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
/// let index = RateIndex::euribor_6m();
/// let caps: Vec<CapFloor> = [(1.0, 0.03), (2.0, 0.03), (2.0, 0.04)]
///     .iter()
///     .map(|&(end, strike)| CapFloor::from_schedule(index, 0.0, end, strike, true).unwrap())
///     .collect();
///
/// let stripper = DirectStripper::new(caps, &curves).unwrap();
/// assert_eq!(stripper.core().num_model_params(), 6);
///
/// let vols = DVector::from_vec(vec![0.3, 0.29, 0.27]);
/// let errors = DVector::from_element(3, 1e-3);
/// let result = stripper.solve_for_cap_vols(&vols, &errors, None).unwrap();
/// assert!(result.fit_parameters().iter().all(|v| *v >= 0.0));
/// ```
#[derive(Debug, Clone)]
pub struct DirectStripper {
    core: CapletStrippingCore<MultiCapFloorPricerGrid>,
    smoothing: [f64; 2],
    penalty: DMatrix<f64>,
}

impl DirectStripper {
    /// Stripper over the full caplet grid of `caps` with default settings.
    ///
    /// # Errors
    ///
    /// Any error from building the grid pricer.
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
        let pricer = MultiCapFloorPricer::new(caps, curves)?.with_implied_vol_config(config.implied_vol);
        let grid = MultiCapFloorPricerGrid::from_pricer(pricer)?;
        let core = CapletStrippingCore::new(grid, &DiscreteVolatilityFunctionProvider::Direct)?
            .with_config(config)?;
        let smoothing = [DEFAULT_SMOOTHING; 2];
        let penalty = grid_penalty(core.pricer().grid_shape(), smoothing)?;
        Ok(Self {
            core,
            smoothing,
            penalty,
        })
    }

    /// Same stripper with penalty strengths along expiry and strike.
    ///
    /// # Errors
    ///
    /// `StrippingError::InvalidInput` for a negative or non-finite strength.
    pub fn with_smoothing(mut self, expiry: f64, strike: f64) -> Result<Self, StrippingError> {
        if !(expiry >= 0.0 && strike >= 0.0) || !expiry.is_finite() || !strike.is_finite() {
            return Err(StrippingError::InvalidInput(format!(
                "smoothing strengths must be non-negative, got {} and {}",
                expiry, strike
            )));
        }
        self.smoothing = [expiry, strike];
        self.penalty = grid_penalty(self.core.pricer().grid_shape(), self.smoothing)?;
        Ok(self)
    }

    /// Penalty strengths `[expiry, strike]`.
    #[inline]
    pub fn smoothing(&self) -> [f64; 2] {
        self.smoothing
    }

    /// Penalty matrix over the grid volatilities.
    #[inline]
    pub fn penalty(&self) -> &DMatrix<f64> {
        &self.penalty
    }

    /// Underlying calibration engine.
    #[inline]
    pub fn core(&self) -> &CapletStrippingCore<MultiCapFloorPricerGrid> {
        &self.core
    }

    /// Fit cap prices. Without a `start`, every grid volatility starts at the
    /// mean cap implied volatility.
    pub fn solve_for_cap_prices(
        &self,
        prices: &DVector<f64>,
        errors: &DVector<f64>,
        start: Option<&DVector<f64>>,
    ) -> Result<CapletStrippingResult<MultiCapFloorPricerGrid>, StrippingError> {
        let start = match start {
            Some(start) => start.clone(),
            None => self.flat_start(mean_implied_vol(self.core.pricer().as_ref(), prices)?),
        };
        self.core.solve_for_cap_prices_with_penalty(
            prices,
            errors,
            &start,
            &self.penalty,
            &ParameterDomain::NonNegative,
        )
    }

    /// Fit cap volatilities. Without a `start`, every grid volatility starts
    /// at the mean of `vols`.
    pub fn solve_for_cap_vols(
        &self,
        vols: &DVector<f64>,
        errors: &DVector<f64>,
        start: Option<&DVector<f64>>,
    ) -> Result<CapletStrippingResult<MultiCapFloorPricerGrid>, StrippingError> {
        let start = match start {
            Some(start) => start.clone(),
            None if vols.is_empty() => {
                return Err(StrippingError::length_mismatch("cap volatilities", self.core.num_caps(), 0))
            }
            None => self.flat_start(vols.mean()),
        };
        self.core.solve_for_cap_vols_with_penalty(
            vols,
            errors,
            &start,
            &self.penalty,
            &ParameterDomain::NonNegative,
        )
    }

    fn flat_start(&self, vol: f64) -> DVector<f64> {
        DVector::from_element(self.core.num_model_params(), vol.max(0.0))
    }
}

/// Curvature penalty over a flattened `(num_expiries, num_strikes)` grid.
fn grid_penalty(shape: (usize, usize), smoothing: [f64; 2]) -> Result<DMatrix<f64>, StrippingError> {
    let (n_expiries, n_strikes) = shape;
    let order = |n: usize| MAX_PENALTY_ORDER.min(n.saturating_sub(1));
    // Order zero is the identity, which would shrink a single node towards zero
    let strength = |n: usize, lambda: f64| if n > 1 { lambda } else { 0.0 };
    Ok(penalty_matrix_2d(
        [n_expiries, n_strikes],
        [order(n_expiries), order(n_strikes)],
        [strength(n_expiries, smoothing[0]), strength(n_strikes, smoothing[1])],
    )?)
}

// ================================================================================
// Term structure stripper
// ================================================================================

/// Calibration of one strike's caps.
#[derive(Debug, Clone)]
pub struct StrikeFit {
    /// Strike of the group.
    pub strike: f64,
    /// Positions of the group's caps in the stripper's input.
    pub caps: Vec<usize>,
    /// Fit of the group's caplet term structure.
    pub result: CapletStrippingResult,
}

#[derive(Debug, Clone)]
struct StrikeGroup {
    strike: f64,
    caps: Vec<usize>,
    spec: CurveSpec,
    core: CapletStrippingCore,
}

/// Independent caplet volatility term structures, one per strike.
///
/// Each strike's caps must be co-starting. Knots sit at the common start and
/// at every cap maturity but the last, so each group is a square system and
/// is root found. Curves are interpolated in positive volatility space.
#[derive(Debug, Clone)]
pub struct TermStructureStripper {
    num_caps: usize,
    groups: Vec<StrikeGroup>,
}

impl TermStructureStripper {
    /// Group `caps` by strike.
    ///
    /// # Errors
    ///
    /// - `StrippingError::InvalidInput` if `caps` is empty
    /// - `StrippingError::Configuration` if a strike's caps do not share a start
    /// - Any error from building a pricer
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
        if caps.is_empty() {
            return Err(StrippingError::InvalidInput("at least one cap is required".to_string()));
        }

        let mut strikes: Vec<f64> = caps.iter().map(CapFloor::strike).collect();
        strikes.sort_by(f64::total_cmp);
        strikes.dedup();

        let groups = strikes
            .into_iter()
            .map(|strike| {
                let members: Vec<usize> = (0..caps.len()).filter(|&i| caps[i].strike() == strike).collect();
                let group_caps: Vec<CapFloor> = members.iter().map(|&i| caps[i].clone()).collect();
                let spec = CurveSpec::new(co_starting_knots(&group_caps)?)
                    .with_transform(ParameterTransform::GreaterThan(0.0));
                let pricer =
                    MultiCapFloorPricer::new(group_caps, curves)?.with_implied_vol_config(config.implied_vol);
                let core = CapletStrippingCore::new(
                    pricer,
                    &DiscreteVolatilityFunctionProvider::InterpolatedTermStructure(spec.clone()),
                )?
                .with_config(config)?;
                debug!(strike, caps = members.len(), knots = spec.num_parameters(), "term structure group");
                Ok(StrikeGroup {
                    strike,
                    caps: members,
                    spec,
                    core,
                })
            })
            .collect::<Result<Vec<_>, StrippingError>>()?;

        Ok(Self {
            num_caps: caps.len(),
            groups,
        })
    }

    /// Distinct strikes, ascending.
    pub fn strikes(&self) -> Vec<f64> {
        self.groups.iter().map(|g| g.strike).collect()
    }

    /// Engine of the `i`-th strike group.
    pub fn core(&self, i: usize) -> Option<&CapletStrippingCore> {
        self.groups.get(i).map(|g| &g.core)
    }

    /// Fit cap prices strike by strike.
    ///
    /// Each group starts from a flat curve at its mean cap implied volatility.
    pub fn solve_for_cap_prices(&self, prices: &DVector<f64>) -> Result<Vec<StrikeFit>, StrippingError> {
        self.check_len("cap prices", prices)?;
        self.groups
            .iter()
            .map(|group| {
                let market = select(prices, &group.caps);
                let start = group.flat_start(mean_implied_vol(group.core.pricer().as_ref(), &market)?)?;
                group.fit(group.core.solve_for_cap_prices(&market, &start)?)
            })
            .collect()
    }

    /// Fit cap volatilities strike by strike.
    pub fn solve_for_cap_vols(&self, vols: &DVector<f64>) -> Result<Vec<StrikeFit>, StrippingError> {
        self.check_len("cap volatilities", vols)?;
        self.groups
            .iter()
            .map(|group| {
                let market = select(vols, &group.caps);
                let start = group.flat_start(market.mean())?;
                group.fit(group.core.solve_for_cap_vols(&market, &start)?)
            })
            .collect()
    }

    fn check_len(&self, what: &str, values: &DVector<f64>) -> Result<(), StrippingError> {
        if values.len() != self.num_caps {
            return Err(StrippingError::length_mismatch(what, self.num_caps, values.len()));
        }
        Ok(())
    }
}

impl StrikeGroup {
    fn flat_start(&self, vol: f64) -> Result<DVector<f64>, StrippingError> {
        if !(vol > 0.0) {
            return Err(StrippingError::InvalidInput(format!(
                "strike {} has no positive mean volatility to start from",
                self.strike
            )));
        }
        self.spec.fitting_parameters(&vec![vol; self.spec.num_parameters()])
    }

    fn fit(&self, result: CapletStrippingResult) -> Result<StrikeFit, StrippingError> {
        Ok(StrikeFit {
            strike: self.strike,
            caps: self.caps.clone(),
            result,
        })
    }
}

fn select(values: &DVector<f64>, indices: &[usize]) -> DVector<f64> {
    DVector::from_iterator(indices.len(), indices.iter().map(|&i| values[i]))
}
