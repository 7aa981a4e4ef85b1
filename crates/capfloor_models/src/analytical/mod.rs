//! Analytical formulas for European options on a lognormal forward.
//!
//! This module provides:
//! - Standard normal distribution functions backed by `statrs`
//! - The Black formula: price, vega, intrinsic value
//! - Implied volatility for a single option and for a bundle of options
//!   sharing one volatility (a cap quoted at a flat vol)
//!
//! ## Design Principles
//!
//! - **Undiscounted core, discounted data**: the scalar functions work on
//!   forward prices; an [`OptionDatum`](crate::instruments::OptionDatum)
//!   scales them by its discounted year fraction
//! - **Bracketed inversion**: implied volatility is found by Newton steps
//!   kept inside a shrinking bracket, so it never diverges

pub mod black;
pub mod distributions;
pub mod error;

// Re-export main types at module level
pub use black::{
    black_implied_volatility, black_intrinsic, black_price, black_vega, ImpliedVolSolver,
};
pub use distributions::{norm_cdf, norm_pdf};
pub use error::AnalyticalError;
