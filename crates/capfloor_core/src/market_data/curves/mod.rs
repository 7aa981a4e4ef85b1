//! Yield curves.
//!
//! - [`YieldCurve`]: Discount factors, zero rates and forward rates
//! - [`FlatCurve`]: Constant continuously compounded rate
//! - [`InterpolatedCurve`]: Pillar-based curve (linear zero rates or log-linear discount factors)
//! - [`CurveEnum`]: Static dispatch over the above
//! - [`CurveName`]: Curve identifiers for the multi-curve setting
//! - [`CurveSet`]: Named curves plus a designated discount curve

mod curve_enum;
mod curve_set;
mod flat;
mod interpolated;
mod traits;

pub use curve_enum::{CurveEnum, CurveName};
pub use curve_set::CurveSet;
pub use flat::FlatCurve;
pub use interpolated::{CurveInterpolation, InterpolatedCurve};
pub use traits::YieldCurve;
