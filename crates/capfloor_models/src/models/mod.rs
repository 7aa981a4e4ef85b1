//! Volatility smile models.
//!
//! - [`sabr::SABRModel`]: Hagan's SABR approximation for Black implied volatility,
//!   with forward-mode sensitivities to all of its inputs
//!
//! ## Example
//!
//! ```
//! use capfloor_models::models::{SABRModel, SABRParams};
//!
//! let params = SABRParams::new(0.02, 0.03, 0.3, -0.2, 0.5, 1.5).unwrap();
//! let model = SABRModel::new(params).unwrap();
//! assert!(model.implied_vol(0.025).unwrap() > 0.0);
//! ```

pub mod sabr;

pub use sabr::{SABRError, SABRModel, SABRParams, SABRVolAdjoint};
