//! # capfloor_models (L2: Models)
//!
//! Option formulas and instruments used to strip caplet volatilities.
//!
//! This crate provides:
//! - The Black formula on a lognormal forward: price, vega, intrinsic value
//!   and implied volatility for single options and common-vol bundles
//! - The SABR smile (Hagan et al. 2002) with parameter adjoints computed by
//!   forward-mode AD
//! - Rate indices, caplets/floorlets, cap/floor strips and the
//!   [`OptionDatum`](instruments::OptionDatum) value type
//!
//! ## Design Principles
//!
//! - **Value types**: caplets and option data are small `Copy` structs
//! - **Validated construction**: invalid inputs are rejected when an
//!   instrument is built, never during pricing
//! - **Generic smile formula**: the SABR formula is generic over
//!   `DualNum<f64>` so the same code yields values (`f64`) and
//!   sensitivities (`Dual64`)

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod analytical;
pub mod instruments;
pub mod models;
