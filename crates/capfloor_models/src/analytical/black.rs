//! Black formula for options on a lognormal forward.
//!
//! ## Mathematical Formulas
//!
//! **Call**: C = F·N(d₁) - K·N(d₂)
//! **Put**: P = K·N(-d₂) - F·N(-d₁)
//! **Vega**: ∂C/∂σ = F·φ(d₁)·√T
//!
//! Where:
//! - d₁ = ln(F/K) / (σ√T) + σ√T/2
//! - d₂ = d₁ - σ√T
//!
//! The scalar functions return *undiscounted* values. An
//! [`OptionDatum`] multiplies them by its discounted year fraction.

use capfloor_core::math::solvers::{BrentSolver, NewtonRaphsonSolver, SolverConfig};
use tracing::trace;

use super::distributions::{norm_cdf, norm_pdf};
use super::error::AnalyticalError;
use crate::instruments::OptionDatum;

/// Below this total standard deviation an option is worth its intrinsic value.
const MIN_STD_DEV: f64 = 1e-16;

/// Starting point of the implied volatility search.
const VOL_GUESS: f64 = 0.3;

/// Relative slack when comparing a price with its intrinsic value.
const INTRINSIC_SLACK: f64 = 1e-12;

fn std_dev(expiry: f64, volatility: f64) -> f64 {
    if expiry > 0.0 && volatility > 0.0 {
        volatility * expiry.sqrt()
    } else {
        0.0
    }
}

/// Undiscounted Black price.
///
/// Zero (or negative) volatility or expiry gives the intrinsic value; a zero
/// strike call is worth the forward.
///
/// # Examples
/// ```
/// use capfloor_models::analytical::black_price;
///
/// let call = black_price(0.03, 0.03, 1.0, 0.2, true);
/// let put = black_price(0.03, 0.03, 1.0, 0.2, false);
/// // ATM put-call parity on the forward
/// assert!((call - put).abs() < 1e-15);
/// ```
pub fn black_price(forward: f64, strike: f64, expiry: f64, volatility: f64, is_call: bool) -> f64 {
    let sign = if is_call { 1.0 } else { -1.0 };
    let s = std_dev(expiry, volatility);
    if s < MIN_STD_DEV || strike <= 0.0 {
        return (sign * (forward - strike)).max(0.0);
    }

    let d1 = (forward / strike).ln() / s + 0.5 * s;
    let d2 = d1 - s;
    let price = sign * (forward * norm_cdf(sign * d1) - strike * norm_cdf(sign * d2));
    price.max(0.0)
}

/// Undiscounted Black vega, ∂price/∂σ (identical for calls and puts).
pub fn black_vega(forward: f64, strike: f64, expiry: f64, volatility: f64) -> f64 {
    let s = std_dev(expiry, volatility);
    if s < MIN_STD_DEV || strike <= 0.0 {
        return 0.0;
    }
    let d1 = (forward / strike).ln() / s + 0.5 * s;
    forward * norm_pdf(d1) * expiry.sqrt()
}

/// Undiscounted intrinsic value `max(±(F - K), 0)`.
#[inline]
pub fn black_intrinsic(forward: f64, strike: f64, is_call: bool) -> f64 {
    let sign = if is_call { 1.0 } else { -1.0 };
    (sign * (forward - strike)).max(0.0)
}

/// Implied volatility of a single undiscounted Black price.
///
/// # Errors
///
/// `AnalyticalError::NoConvergence` if `price` is below the intrinsic value or
/// not below the infinite-volatility limit (`F` for calls, `K` for puts).
///
/// # Examples
/// ```
/// use capfloor_models::analytical::{black_implied_volatility, black_price};
///
/// let p = black_price(0.03, 0.035, 2.0, 0.25, true);
/// let vol = black_implied_volatility(p, 0.03, 0.035, 2.0, true).unwrap();
/// assert!((vol - 0.25).abs() < 1e-10);
/// ```
pub fn black_implied_volatility(
    price: f64,
    forward: f64,
    strike: f64,
    expiry: f64,
    is_call: bool,
) -> Result<f64, AnalyticalError> {
    let datum = OptionDatum::new(forward, strike, expiry, 1.0, is_call).map_err(|_| {
        AnalyticalError::NoConvergence {
            price,
            lower: black_intrinsic(forward, strike, is_call),
            upper: if is_call { forward } else { strike },
        }
    })?;
    ImpliedVolSolver::default().implied_volatility(std::slice::from_ref(&datum), price)
}

/// Implied volatility solver for bundles of options sharing one volatility.
///
/// A cap quoted at a flat volatility is the canonical bundle: its price is
/// the sum of its caplet prices, each evaluated at the same σ. The bundle
/// price is strictly increasing in σ from the intrinsic value (σ = 0) to the
/// sum of the infinite-volatility limits, so the inversion is a bracketed
/// one-dimensional root search.
///
/// # Examples
/// ```
/// use capfloor_models::analytical::ImpliedVolSolver;
/// use capfloor_models::instruments::OptionDatum;
///
/// let caplets = [
///     OptionDatum::new(0.020, 0.025, 0.5, 0.49, true).unwrap(),
///     OptionDatum::new(0.024, 0.025, 1.0, 0.48, true).unwrap(),
///     OptionDatum::new(0.027, 0.025, 1.5, 0.47, true).unwrap(),
/// ];
/// let price: f64 = caplets.iter().map(|c| c.price(0.4)).sum();
///
/// let vol = ImpliedVolSolver::default()
///     .implied_volatility(&caplets, price)
///     .unwrap();
/// assert!((vol - 0.4).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Copy)]
pub struct ImpliedVolSolver {
    config: SolverConfig,
}

impl Default for ImpliedVolSolver {
    fn default() -> Self {
        Self::new(SolverConfig::high_precision())
    }
}

impl ImpliedVolSolver {
    /// Create a solver; the tolerance applies to the price error relative to
    /// the bundle's infinite-volatility limit.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Common volatility at which the (discounted) prices of `options` sum
    /// to `price`.
    ///
    /// A price equal to the intrinsic value gives zero volatility.
    ///
    /// # Errors
    ///
    /// - `AnalyticalError::EmptyBundle` if `options` is empty
    /// - `AnalyticalError::NoConvergence` if `price` is outside
    ///   `[intrinsic, upper)` or the search fails
    pub fn implied_volatility(
        &self,
        options: &[OptionDatum],
        price: f64,
    ) -> Result<f64, AnalyticalError> {
        if options.is_empty() {
            return Err(AnalyticalError::EmptyBundle);
        }

        let intrinsic: f64 = options.iter().map(OptionDatum::intrinsic).sum();
        let upper: f64 = options.iter().map(OptionDatum::upper_bound).sum();
        let no_convergence = || AnalyticalError::NoConvergence {
            price,
            lower: intrinsic,
            upper,
        };

        if !price.is_finite() || price >= upper {
            return Err(no_convergence());
        }
        let slack = INTRINSIC_SLACK * upper.max(f64::MIN_POSITIVE);
        if price < intrinsic - slack {
            return Err(no_convergence());
        }
        if price <= intrinsic + slack {
            return Ok(0.0);
        }

        // Scaled so that the tolerance is relative to the attainable range
        let scale = upper;
        let objective = |sigma: f64| -> f64 {
            let model: f64 = options.iter().map(|o| o.price(sigma)).sum();
            (model - price) / scale
        };
        let derivative = |sigma: f64| -> f64 {
            let vega: f64 = options.iter().map(|o| o.vega(sigma)).sum();
            vega / scale
        };

        let (lo, hi) = BrentSolver::new(self.config)
            .bracket(objective, 0.0, 2.0 * VOL_GUESS, Some(0.0))
            .map_err(|_| no_convergence())?;
        let sigma = NewtonRaphsonSolver::new(self.config)
            .find_root_bracketed(objective, derivative, VOL_GUESS.clamp(lo, hi), lo, hi)
            .map_err(|_| no_convergence())?;

        trace!(price, sigma, n_options = options.len(), "implied volatility");
        Ok(sigma)
    }
}
