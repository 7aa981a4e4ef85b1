//! Market data: yield curves and the curve provider used by cap pricers.
//!
//! # Components
//!
//! - [`curves`]: Yield curve trait and implementations (FlatCurve, InterpolatedCurve, CurveSet)
//! - [`provider`]: The [`CurveProvider`] contract (discount factors and index forwards)
//! - [`error`]: Market data error types (MarketDataError)
//!
//! # Example
//!
//! ```
//! use capfloor_core::market_data::{CurveEnum, CurveName, CurveProvider, CurveSet};
//!
//! let mut curves = CurveSet::new();
//! curves.insert(CurveName::Ois, CurveEnum::flat(0.02));
//! curves.insert(CurveName::Euribor6M, CurveEnum::flat(0.03));
//! curves.set_discount_curve(CurveName::Ois);
//!
//! let df = curves.discount_factor(1.0).unwrap();
//! assert!((df - (-0.02_f64).exp()).abs() < 1e-12);
//!
//! let fwd = curves.forward_rate(&CurveName::Euribor6M, 1.0, 1.5, 0.5).unwrap();
//! assert!((fwd - ((0.03_f64 * 0.5).exp() - 1.0) / 0.5).abs() < 1e-12);
//! ```

pub mod curves;
pub mod error;
pub mod provider;

pub use curves::{
    CurveEnum, CurveInterpolation, CurveName, CurveSet, FlatCurve, InterpolatedCurve, YieldCurve,
};
pub use error::MarketDataError;
pub use provider::CurveProvider;
