//! Outcome of a caplet stripping calibration.

use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

use capfloor_core::math::function::VectorFunction;

use crate::error::StrippingError;
use crate::pricer::{CapFloorPricer, MultiCapFloorPricer};
use crate::volatility::DiscreteVolatilityFunction;

/// How a calibration was solved.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StrippingMethod {
    /// Newton root finding, exact fit.
    RootFind,
    /// (Penalised) least squares.
    LeastSquares,
    /// Sequential bootstrap of co-starting caps.
    Bootstrap,
}

impl fmt::Display for StrippingMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::RootFind => "root-find",
            Self::LeastSquares => "least-squares",
            Self::Bootstrap => "bootstrap",
        })
    }
}

/// Outcome of a caplet stripping.
///
/// Holds the fitted parameters and chi-square together with the pricer and
/// volatility function used to fit them. Caplet volatilities, cap prices and
/// cap volatilities are recomputed from those on request.
#[derive(Debug)]
pub struct CapletStrippingResult<P = MultiCapFloorPricer> {
    fit_parameters: DVector<f64>,
    chi_sq: f64,
    method: StrippingMethod,
    iterations: usize,
    pricer: Arc<P>,
    vol_func: Arc<DiscreteVolatilityFunction>,
}

impl<P> Clone for CapletStrippingResult<P> {
    fn clone(&self) -> Self {
        Self {
            fit_parameters: self.fit_parameters.clone(),
            chi_sq: self.chi_sq,
            method: self.method,
            iterations: self.iterations,
            pricer: Arc::clone(&self.pricer),
            vol_func: Arc::clone(&self.vol_func),
        }
    }
}

impl<P: CapFloorPricer> CapletStrippingResult<P> {
    pub(crate) fn new(
        fit_parameters: DVector<f64>,
        chi_sq: f64,
        method: StrippingMethod,
        iterations: usize,
        pricer: Arc<P>,
        vol_func: Arc<DiscreteVolatilityFunction>,
    ) -> Self {
        Self {
            fit_parameters,
            chi_sq,
            method,
            iterations,
            pricer,
            vol_func,
        }
    }

    /// Fitted model parameters.
    #[inline]
    pub fn fit_parameters(&self) -> &DVector<f64> {
        &self.fit_parameters
    }

    /// Weighted residual sum of squares, penalty excluded; zero for a root find.
    #[inline]
    pub fn chi_sq(&self) -> f64 {
        self.chi_sq
    }

    /// Solution method.
    #[inline]
    pub fn method(&self) -> StrippingMethod {
        self.method
    }

    /// Solver iterations.
    #[inline]
    pub fn iterations(&self) -> usize {
        self.iterations
    }

    /// Pricer the parameters were fitted with.
    #[inline]
    pub fn pricer(&self) -> &Arc<P> {
        &self.pricer
    }

    /// Volatility function the parameters were fitted with.
    #[inline]
    pub fn vol_func(&self) -> &Arc<DiscreteVolatilityFunction> {
        &self.vol_func
    }

    /// Caplet volatilities, in the pricer's caplet order.
    pub fn caplet_vols(&self) -> Result<DVector<f64>, StrippingError> {
        Ok(self.vol_func.evaluate(&self.fit_parameters)?)
    }

    /// Model cap prices.
    pub fn model_cap_prices(&self) -> Result<DVector<f64>, StrippingError> {
        self.pricer.price_from_caplet_vols(&self.caplet_vols()?)
    }

    /// Model cap implied volatilities.
    pub fn model_cap_vols(&self) -> Result<DVector<f64>, StrippingError> {
        self.pricer.implied_vols(&self.model_cap_prices()?)
    }

    /// Model minus market cap prices.
    pub fn cap_price_residuals(&self, market: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        residuals(self.model_cap_prices()?, market, "cap prices")
    }

    /// Model minus market cap volatilities.
    pub fn cap_vol_residuals(&self, market: &DVector<f64>) -> Result<DVector<f64>, StrippingError> {
        residuals(self.model_cap_vols()?, market, "cap volatilities")
    }
}

fn residuals(
    model: DVector<f64>,
    market: &DVector<f64>,
    what: &str,
) -> Result<DVector<f64>, StrippingError> {
    if market.len() != model.len() {
        return Err(StrippingError::length_mismatch(what, model.len(), market.len()));
    }
    Ok(model - market)
}
