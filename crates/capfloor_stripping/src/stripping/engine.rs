//! The caplet stripping calibration engine.

use std::sync::Arc;

use capfloor_core::math::function::VectorFunction;
use capfloor_core::math::linalg::{is_symmetric, DecompositionMethod};
use capfloor_core::math::solvers::{
    LMConfig, LMResult, LevenbergMarquardtSolver, NewtonVectorRootFinder, RootFindResult,
};
use capfloor_core::types::SolverError;
use nalgebra::{DMatrix, DVector};
use tracing::{debug, info, info_span, warn};

use super::domain::ParameterDomain;
use super::functions::{CapPriceFunction, CapVolFunction, WeightedFunction};
use super::result::{CapletStrippingResult, StrippingMethod};
use crate::config::StrippingConfig;
use crate::error::StrippingError;
use crate::pricer::{CapFloorPricer, MultiCapFloorPricer};
use crate::volatility::{DiscreteVolatilityFunction, DiscreteVolatilityFunctionProvider};

/// Relative asymmetry tolerated in a penalty matrix.
const PENALTY_SYMMETRY_TOLERANCE: f64 = 1e-12;

/// Market quantity being fitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Objective {
    Prices,
    Vols,
}

impl Objective {
    fn name(self) -> &'static str {
        match self {
            Self::Prices => "cap prices",
            Self::Vols => "cap volatilities",
        }
    }
}

/// Calibrates a [`DiscreteVolatilityFunction`] to cap prices or cap
/// volatilities.
///
/// # Dispatch
///
/// The `solve_for_*` methods pick the solver:
/// - as many parameters as caps: Newton root finding, falling back to least
///   squares if it does not converge
/// - fewer parameters than caps: least squares
/// - more parameters than caps: rejected, use a penalty
///
/// Least squares that fails is retried once with SVD (when
/// [`StrippingConfig::svd_fallback`] is set) before the failure is reported.
///
/// Every input is validated before any numerics run: lengths, non-negative
/// volatilities, positive errors, prices at or above intrinsic value, and the
/// start and penalty sizes.
///
/// # Examples
///
/// ```
/// use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
/// use capfloor_core::math::function::VectorFunction;
/// use capfloor_core::math::transforms::ParameterTransform;
/// use capfloor_models::instruments::rates::{CapFloor, RateIndex};
/// use capfloor_stripping::prelude::*;
/// use nalgebra::DVector;
///
/// let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
/// let index = RateIndex::euribor_6m();
/// let caps: Vec<CapFloor> = [1.0, 2.0, 3.0]
///     .iter()
///     .map(|&end| CapFloor::from_schedule(index, 0.0, end, 0.03, true).unwrap())
///     .collect();
///
/// let spec = CurveSpec::new(co_starting_knots(&caps).unwrap())
///     .with_transform(ParameterTransform::GreaterThan(0.0));
/// let pricer = MultiCapFloorPricer::new(caps, &curves).unwrap();
/// let core = CapletStrippingCore::new(
///     pricer,
///     &DiscreteVolatilityFunctionProvider::InterpolatedTermStructure(spec.clone()),
/// )
/// .unwrap();
///
/// let truth = spec.fitting_parameters(&[0.35, 0.3, 0.28]).unwrap();
/// let prices = core.cap_price_function().evaluate(&truth).unwrap();
/// let start = spec.fitting_parameters(&[0.3, 0.3, 0.3]).unwrap();
///
/// let result = core.solve_for_cap_prices(&prices, &start).unwrap();
/// assert_eq!(result.method(), StrippingMethod::RootFind);
/// assert!((result.model_cap_prices().unwrap() - &prices).amax() < 1e-12);
/// ```
#[derive(Debug)]
pub struct CapletStrippingCore<P = MultiCapFloorPricer> {
    pricer: Arc<P>,
    vol_func: Arc<DiscreteVolatilityFunction>,
    config: StrippingConfig,
}

impl<P> Clone for CapletStrippingCore<P> {
    fn clone(&self) -> Self {
        Self {
            pricer: Arc::clone(&self.pricer),
            vol_func: Arc::clone(&self.vol_func),
            config: self.config,
        }
    }
}

impl<P: CapFloorPricer> CapletStrippingCore<P> {
    /// Bind `provider` to the caplets of `pricer`.
    ///
    /// # Errors
    ///
    /// Any error from binding the provider.
    pub fn new(pricer: P, provider: &DiscreteVolatilityFunctionProvider) -> Result<Self, StrippingError> {
        let vol_func = provider.bind(&pricer.volatility_points())?;
        Self::from_parts(Arc::new(pricer), Arc::new(vol_func))
    }

    /// Engine over an already bound volatility function, possibly shared with
    /// other engines.
    ///
    /// # Errors
    ///
    /// `StrippingError::LengthMismatch` if `vol_func` does not produce one
    /// volatility per caplet of `pricer`.
    pub fn from_parts(
        pricer: Arc<P>,
        vol_func: Arc<DiscreteVolatilityFunction>,
    ) -> Result<Self, StrippingError> {
        if vol_func.range_size() != pricer.num_caplets() {
            return Err(StrippingError::length_mismatch(
                "volatility function outputs",
                pricer.num_caplets(),
                vol_func.range_size(),
            ));
        }
        debug!(
            caps = pricer.num_caps(),
            caplets = pricer.num_caplets(),
            parameters = vol_func.domain_size(),
            "caplet stripping engine ready"
        );
        Ok(Self {
            pricer,
            vol_func,
            config: StrippingConfig::default(),
        })
    }

    /// Same engine with different solver settings.
    pub fn with_config(mut self, config: StrippingConfig) -> Result<Self, StrippingError> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    /// Solver settings.
    #[inline]
    pub fn config(&self) -> &StrippingConfig {
        &self.config
    }

    /// Number of caps.
    #[inline]
    pub fn num_caps(&self) -> usize {
        self.pricer.num_caps()
    }

    /// Number of model parameters.
    #[inline]
    pub fn num_model_params(&self) -> usize {
        self.vol_func.domain_size()
    }

    /// The pricer.
    #[inline]
    pub fn pricer(&self) -> &Arc<P> {
        &self.pricer
    }

    /// The bound volatility function.
    #[inline]
    pub fn vol_func(&self) -> &Arc<DiscreteVolatilityFunction> {
        &self.vol_func
    }

    /// Model parameters → cap prices, with its Jacobian.
    pub fn cap_price_function(&self) -> CapPriceFunction<'_, P> {
        CapPriceFunction::new(self.pricer.as_ref(), self.vol_func.as_ref())
    }

    /// Model parameters → cap volatilities, with its Jacobian.
    pub fn cap_vol_function(&self) -> CapVolFunction<'_, P> {
        CapVolFunction::new(self.pricer.as_ref(), self.vol_func.as_ref())
    }

    // ========================================
    // Dispatching solves
    // ========================================

    /// Fit cap prices, root finding when the system is square.
    pub fn solve_for_cap_prices(
        &self,
        prices: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.solve(Objective::Prices, prices, None, start)
    }

    /// Fit cap prices weighted by `1 / errors`.
    pub fn solve_for_cap_prices_weighted(
        &self,
        prices: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.solve(Objective::Prices, prices, Some(errors), start)
    }

    /// Fit cap volatilities, root finding when the system is square.
    pub fn solve_for_cap_vols(
        &self,
        vols: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.solve(Objective::Vols, vols, None, start)
    }

    /// Fit cap volatilities weighted by `1 / errors`.
    pub fn solve_for_cap_vols_weighted(
        &self,
        vols: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.solve(Objective::Vols, vols, Some(errors), start)
    }

    // ========================================
    // Root finding
    // ========================================

    /// Solve model cap prices = `prices` exactly.
    ///
    /// # Errors
    ///
    /// - `StrippingError::Configuration` unless there are as many parameters as caps
    /// - `StrippingError::ConvergenceFailure` if Newton does not converge
    pub fn root_find_for_cap_prices(
        &self,
        prices: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.root_find(Objective::Prices, prices, None, start)
    }

    /// Root find on cap prices scaled by `1 / errors`.
    pub fn root_find_for_cap_prices_weighted(
        &self,
        prices: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.root_find(Objective::Prices, prices, Some(errors), start)
    }

    /// Solve model cap volatilities = `vols` exactly.
    pub fn root_find_for_cap_vols(
        &self,
        vols: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.root_find(Objective::Vols, vols, None, start)
    }

    /// Root find on cap volatilities scaled by `1 / errors`.
    pub fn root_find_for_cap_vols_weighted(
        &self,
        vols: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.root_find(Objective::Vols, vols, Some(errors), start)
    }

    // ========================================
    // Least squares
    // ========================================

    /// Least-squares fit of cap prices.
    ///
    /// # Errors
    ///
    /// - `StrippingError::InsufficientData` if there are fewer caps than parameters
    /// - `StrippingError::ConvergenceFailure` if the fit fails, SVD retry included
    pub fn least_sqr_solve_for_cap_prices(
        &self,
        prices: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.least_sqr(Objective::Prices, prices, None, start)
    }

    /// Least-squares fit of cap prices weighted by `1 / errors`.
    pub fn least_sqr_solve_for_cap_prices_weighted(
        &self,
        prices: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.least_sqr(Objective::Prices, prices, Some(errors), start)
    }

    /// Least-squares fit of cap volatilities.
    pub fn least_sqr_solve_for_cap_vols(
        &self,
        vols: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.least_sqr(Objective::Vols, vols, None, start)
    }

    /// Least-squares fit of cap volatilities weighted by `1 / errors`.
    pub fn least_sqr_solve_for_cap_vols_weighted(
        &self,
        vols: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.least_sqr(Objective::Vols, vols, Some(errors), start)
    }

    // ========================================
    // Penalised least squares
    // ========================================

    /// Minimise `Σ ((model - price) / error)² + xᵀ P x` over `allowed`.
    ///
    /// The penalty strength is part of `penalty`. Any number of parameters is
    /// accepted.
    ///
    /// # Errors
    ///
    /// - `StrippingError::LengthMismatch` if `penalty` is not square in the parameters
    /// - `StrippingError::InvalidInput` if `penalty` is not symmetric or `start`
    ///   lies outside `allowed`
    /// - `StrippingError::ConvergenceFailure` if the fit fails, SVD retry included
    pub fn solve_for_cap_prices_with_penalty(
        &self,
        prices: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
        penalty: &DMatrix<f64>,
        allowed: &ParameterDomain,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.penalised(Objective::Prices, prices, errors, start, penalty, allowed)
    }

    /// Minimise `Σ ((model - vol) / error)² + xᵀ P x` over `allowed`.
    pub fn solve_for_cap_vols_with_penalty(
        &self,
        vols: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
        penalty: &DMatrix<f64>,
        allowed: &ParameterDomain,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        self.penalised(Objective::Vols, vols, errors, start, penalty, allowed)
    }

    // ========================================
    // Internals
    // ========================================

    fn solve(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        errors: Option<&DVector<f64>>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        let span = self.span(objective);
        let _guard = span.enter();
        let sigma = self.validate(objective, market, errors, start)?;

        let (m, u) = (self.num_caps(), self.num_model_params());
        if u == m {
            let outcome = self.newton(objective, market, &sigma, start)?;
            if outcome.converged() {
                return Ok(self.finish(StrippingMethod::RootFind, outcome.x, 0.0, outcome.iterations));
            }
            warn!(
                status = ?outcome.status,
                residual = outcome.residual_norm,
                iterations = outcome.iterations,
                "root finding failed, falling back to least squares"
            );
        } else {
            debug!(caps = m, parameters = u, "system is not square, using least squares");
        }

        self.check_observations()?;
        self.least_squares(objective, market, &sigma, start, None, &ParameterDomain::Unconstrained)
    }

    fn root_find(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        errors: Option<&DVector<f64>>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        let span = self.span(objective);
        let _guard = span.enter();
        let sigma = self.validate(objective, market, errors, start)?;

        let (m, u) = (self.num_caps(), self.num_model_params());
        if u != m {
            return Err(StrippingError::configuration(format!(
                "root finding needs as many model parameters ({}) as caps ({})",
                u, m
            )));
        }
        let outcome = self.newton(objective, market, &sigma, start)?;
        if !outcome.converged() {
            return Err(StrippingError::ConvergenceFailure {
                iterations: outcome.iterations,
                residual: outcome.residual_norm,
            });
        }
        Ok(self.finish(StrippingMethod::RootFind, outcome.x, 0.0, outcome.iterations))
    }

    fn least_sqr(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        errors: Option<&DVector<f64>>,
        start: &DVector<f64>,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        let span = self.span(objective);
        let _guard = span.enter();
        let sigma = self.validate(objective, market, errors, start)?;
        self.check_observations()?;
        self.least_squares(objective, market, &sigma, start, None, &ParameterDomain::Unconstrained)
    }

    fn penalised(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        errors: &DVector<f64>,
        start: &DVector<f64>,
        penalty: &DMatrix<f64>,
        allowed: &ParameterDomain,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        let span = self.span(objective);
        let _guard = span.enter();
        let sigma = self.validate(objective, market, Some(errors), start)?;

        let u = self.num_model_params();
        if penalty.nrows() != u {
            return Err(StrippingError::length_mismatch("penalty matrix rows", u, penalty.nrows()));
        }
        if penalty.ncols() != u {
            return Err(StrippingError::length_mismatch(
                "penalty matrix columns",
                u,
                penalty.ncols(),
            ));
        }
        let scale = penalty.amax().max(1.0);
        if !is_symmetric(penalty, PENALTY_SYMMETRY_TOLERANCE * scale) {
            return Err(StrippingError::InvalidInput(
                "penalty matrix must be symmetric".to_string(),
            ));
        }
        self.least_squares(objective, market, &sigma, start, Some(penalty), allowed)
    }

    fn span(&self, objective: Objective) -> tracing::Span {
        info_span!(
            "caplet_stripping",
            caps = self.num_caps(),
            parameters = self.num_model_params(),
            objective = objective.name()
        )
    }

    /// Check inputs and return the error weights (ones when unweighted).
    fn validate(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        errors: Option<&DVector<f64>>,
        start: &DVector<f64>,
    ) -> Result<DVector<f64>, StrippingError> {
        let m = self.num_caps();
        if market.len() != m {
            return Err(StrippingError::length_mismatch(objective.name(), m, market.len()));
        }
        match objective {
            Objective::Prices => {
                let intrinsic = self.pricer.intrinsic_cap_values();
                for (i, (&price, &floor)) in market.iter().zip(intrinsic.iter()).enumerate() {
                    if !price.is_finite() || price < floor {
                        return Err(StrippingError::invalid_market_data(
                            i,
                            format!("price {} is below intrinsic value {}", price, floor),
                        ));
                    }
                }
            }
            Objective::Vols => {
                if let Some(i) = market.iter().position(|v| !(*v >= 0.0) || !v.is_finite()) {
                    return Err(StrippingError::invalid_market_data(
                        i,
                        format!("volatility {} is negative", market[i]),
                    ));
                }
            }
        }

        let sigma = match errors {
            Some(errors) => {
                if errors.len() != m {
                    return Err(StrippingError::length_mismatch("errors", m, errors.len()));
                }
                if let Some(i) = errors.iter().position(|e| !(*e > 0.0) || !e.is_finite()) {
                    return Err(StrippingError::invalid_market_data(
                        i,
                        format!("error {} must be positive", errors[i]),
                    ));
                }
                errors.clone()
            }
            None => DVector::from_element(m, 1.0),
        };

        let u = self.num_model_params();
        if start.len() != u {
            return Err(StrippingError::length_mismatch("start parameters", u, start.len()));
        }
        Ok(sigma)
    }

    fn check_observations(&self) -> Result<(), StrippingError> {
        let (m, u) = (self.num_caps(), self.num_model_params());
        if m < u {
            return Err(StrippingError::InsufficientData {
                observations: m,
                parameters: u,
            });
        }
        Ok(())
    }

    fn newton(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        sigma: &DVector<f64>,
        start: &DVector<f64>,
    ) -> Result<RootFindResult, StrippingError> {
        let finder = NewtonVectorRootFinder::new(self.config.root_finder);
        let outcome = match objective {
            Objective::Prices => {
                let f = WeightedFunction::new(self.cap_price_function(), sigma)?;
                finder.find_root(&f, &f.scale(market), start.clone())?
            }
            Objective::Vols => {
                let f = WeightedFunction::new(self.cap_vol_function(), sigma)?;
                finder.find_root(&f, &f.scale(market), start.clone())?
            }
        };
        Ok(outcome)
    }

    fn least_squares(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        sigma: &DVector<f64>,
        start: &DVector<f64>,
        penalty: Option<&DMatrix<f64>>,
        allowed: &ParameterDomain,
    ) -> Result<CapletStrippingResult<P>, StrippingError> {
        if !allowed.contains(start) {
            return Err(StrippingError::InvalidInput(
                "start lies outside the allowed parameter domain".to_string(),
            ));
        }

        let config = self.config.least_squares;
        let first = self.levenberg_marquardt(objective, market, sigma, start.clone(), penalty, allowed, config);
        let outcome = match first {
            Ok(result) if result.converged => Ok(result),
            first if self.config.svd_fallback && config.decomposition != DecompositionMethod::Svd => {
                let restart = match &first {
                    Ok(result) => result.params.clone(),
                    Err(_) => start.clone(),
                };
                warn!(
                    decomposition = config.decomposition.name(),
                    error = ?first.as_ref().err(),
                    "least squares failed, retrying with SVD"
                );
                let svd = config.with_decomposition(DecompositionMethod::Svd);
                self.levenberg_marquardt(objective, market, sigma, restart, penalty, allowed, svd)
            }
            first => first,
        };

        match outcome {
            Ok(result) if result.converged => Ok(self.finish(
                StrippingMethod::LeastSquares,
                result.params,
                result.chi_sq,
                result.iterations,
            )),
            Ok(result) => Err(StrippingError::ConvergenceFailure {
                iterations: result.iterations,
                residual: result.chi_sq,
            }),
            Err(err) => Err(err.into()),
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn levenberg_marquardt(
        &self,
        objective: Objective,
        market: &DVector<f64>,
        sigma: &DVector<f64>,
        start: DVector<f64>,
        penalty: Option<&DMatrix<f64>>,
        allowed: &ParameterDomain,
        config: LMConfig,
    ) -> Result<LMResult, SolverError> {
        let solver = LevenbergMarquardtSolver::new(config);
        match objective {
            Objective::Prices => run_lm(&solver, &self.cap_price_function(), market, sigma, start, penalty, allowed),
            Objective::Vols => run_lm(&solver, &self.cap_vol_function(), market, sigma, start, penalty, allowed),
        }
    }

    fn finish(
        &self,
        method: StrippingMethod,
        params: DVector<f64>,
        chi_sq: f64,
        iterations: usize,
    ) -> CapletStrippingResult<P> {
        info!(%method, chi_sq, iterations, "caplet stripping finished");
        CapletStrippingResult::new(
            params,
            chi_sq,
            method,
            iterations,
            Arc::clone(&self.pricer),
            Arc::clone(&self.vol_func),
        )
    }
}

fn run_lm<F: VectorFunction>(
    solver: &LevenbergMarquardtSolver,
    f: &F,
    market: &DVector<f64>,
    sigma: &DVector<f64>,
    start: DVector<f64>,
    penalty: Option<&DMatrix<f64>>,
    allowed: &ParameterDomain,
) -> Result<LMResult, SolverError> {
    match penalty {
        Some(p) => solver.solve_with_penalty(f, market, sigma, start, p, |x: &DVector<f64>| {
            allowed.contains(x)
        }),
        None => solver.solve(f, market, sigma, start),
    }
}
