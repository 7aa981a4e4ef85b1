//! Interpolation expressed as linear weights on node values.
//!
//! Caplet-stripping parameterisations interpolate a handful of node values
//! (the fitted parameters) at many caplet expiries, and need the node
//! sensitivities for analytic Jacobians. Every scheme here is linear in the
//! node values, so an interpolator binds the node abscissas once and returns
//! [`NodeWeights`] for any query point.
//!
//! ## Available Interpolators
//!
//! - [`LinearInterpolator`]: Piecewise linear
//! - [`DoubleQuadraticInterpolator`]: Blend of overlapping quadratics (C¹)
//! - [`CubicSplineInterpolator`]: Natural cubic spline (C²)
//! - [`CombinedInterpolator`]: Any of the above plus flat or linear extrapolation
//!
//! ## Example
//!
//! ```
//! use capfloor_core::math::interpolators::{Interpolator, LinearInterpolator};
//!
//! let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0, 3.0]).unwrap();
//! assert_eq!(interp.domain(), (0.0, 3.0));
//!
//! let ys = [0.0, 1.0, 4.0, 9.0];
//! let y = interp.interpolate(&ys, 1.5).unwrap();
//! assert!((y - 2.5).abs() < 1e-10);
//! ```

mod combined;
mod cubic_spline;
mod double_quadratic;
mod linear;
mod traits;

pub use combined::{CombinedInterpolator, ExtrapolatorKind, InterpolatorEnum, InterpolatorKind};
pub use cubic_spline::CubicSplineInterpolator;
pub use double_quadratic::DoubleQuadraticInterpolator;
pub use linear::LinearInterpolator;
pub use traits::{Interpolator, NodeWeights};
