//! # capfloor_stripping (L2.5: Calibration)
//!
//! Caplet volatility stripping: recovering the volatilities of the individual
//! caplets from market prices or implied volatilities of caps and floors.
//!
//! ## Architecture Position
//!
//! Sits on top of `capfloor_core` (solvers, curves, interpolation) and
//! `capfloor_models` (Black and SABR formulas, cap/floor instruments), solving
//! the inverse problem from cap quotes to a caplet volatility surface.
//!
//! ## Modules
//!
//! - `pricer`: Decomposition of caps into a shared caplet universe and
//!   aggregation of caplet prices, vegas and implied volatilities
//! - `volatility`: Parameterisations of the caplet surface (direct,
//!   interpolated term structure, B-spline, SABR term structure)
//! - `stripping`: The calibration engine, its result, a bootstrapper and
//!   ready-made strippers
//! - `config`: Solver settings, loadable from TOML
//!
//! ## Example
//!
//! ```rust
//! use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
//! use capfloor_models::instruments::rates::{CapFloor, RateIndex};
//! use capfloor_stripping::prelude::*;
//! use nalgebra::DVector;
//!
//! let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.025));
//! let index = RateIndex::euribor_6m();
//! let caps: Vec<CapFloor> = [1.0, 2.0, 3.0, 5.0]
//!     .iter()
//!     .map(|&end| CapFloor::from_schedule(index, 0.0, end, 0.025, true).unwrap())
//!     .collect();
//!
//! let stripper = TermStructureStripper::new(caps, &curves).unwrap();
//! let fits = stripper
//!     .solve_for_cap_vols(&DVector::from_vec(vec![0.32, 0.3, 0.28, 0.25]))
//!     .unwrap();
//! assert_eq!(fits[0].result.method(), StrippingMethod::RootFind);
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod config;
pub mod pricer;
pub mod stripping;
pub mod volatility;

mod error;

pub use config::StrippingConfig;
pub use error::StrippingError;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::StrippingConfig;
    pub use crate::pricer::{CapFloorPricer, MultiCapFloorPricer, MultiCapFloorPricerGrid};
    pub use crate::stripping::{
        CapletBootstrapper, CapletStrippingCore, CapletStrippingResult, DirectStripper,
        ParameterDomain, StrippingMethod, TermStructureStripper,
    };
    pub use crate::volatility::{
        co_starting_knots, BasisSplineSpec, CurveSpec, DiscreteVolatilityFunction,
        DiscreteVolatilityFunctionProvider, SabrTermStructureSpec,
    };
    pub use crate::StrippingError;
}
