//! Caplet volatility calibration.
//!
//! - [`CapletStrippingCore`]: fits any [`DiscreteVolatilityFunction`] to cap
//!   prices or cap volatilities by root finding or (penalised) least squares
//! - [`CapletBootstrapper`]: sequential stripping of co-starting caps
//! - [`DirectStripper`], [`TermStructureStripper`]: common set-ups of the core
//!
//! [`DiscreteVolatilityFunction`]: crate::volatility::DiscreteVolatilityFunction

mod bootstrap;
mod domain;
mod engine;
mod functions;
mod result;
mod strippers;

pub use bootstrap::CapletBootstrapper;
pub use domain::ParameterDomain;
pub use engine::CapletStrippingCore;
pub use functions::{CapPriceFunction, CapVolFunction, WeightedFunction};
pub use result::{CapletStrippingResult, StrippingMethod};
pub use strippers::{DirectStripper, StrikeFit, TermStructureStripper, DEFAULT_SMOOTHING};
