//! Financial instrument definitions.
//!
//! # Instrument Types
//!
//! - [`rates::CapletFloorlet`]: Option on one index fixing
//! - [`rates::CapFloor`]: Strip of caplets or floorlets at one strike
//! - [`OptionDatum`]: A caplet resolved against market curves, ready for the
//!   Black formula
//!
//! # Examples
//!
//! ```
//! use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
//! use capfloor_models::instruments::rates::{CapFloor, RateIndex};
//!
//! let curves = CurveSet::single(CurveName::Euribor3M, CurveEnum::flat(0.025));
//! let floor = CapFloor::from_schedule(RateIndex::euribor_3m(), 0.0, 2.0, 0.02, false).unwrap();
//! let pv = floor.price(&curves, 0.35).unwrap();
//! assert!(pv > 0.0);
//! ```

mod error;
mod option_datum;
pub mod rates;

pub use error::InstrumentError;
pub use option_datum::OptionDatum;
