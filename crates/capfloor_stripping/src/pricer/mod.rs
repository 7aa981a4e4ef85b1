//! Cap/floor decomposition into a shared caplet universe.
//!
//! A set of caps (possibly overlapping, possibly at several strikes) is
//! decomposed into the unique caplets they contain. Caplet volatilities are
//! indexed by that universe; every cap-level quantity is an aggregation over
//! the caplets of each cap.
//!
//! # Pricers
//!
//! - [`MultiCapFloorPricer`]: Universe is exactly the caplets present in the caps
//! - [`MultiCapFloorPricerGrid`]: Universe is the full expiry × strike grid;
//!   slots no cap uses are phantom caplets with no effect on prices or vegas
//!
//! Both implement [`CapFloorPricer`], which is what the calibration engine
//! consumes.

mod grid;
mod multi;

pub use grid::MultiCapFloorPricerGrid;
pub use multi::MultiCapFloorPricer;

use nalgebra::{DMatrix, DVector};

use crate::error::StrippingError;
use crate::volatility::VolatilityPoint;

/// Cap-level operations over a caplet volatility vector.
///
/// The caplet volatility vector has length [`num_caplets`](Self::num_caplets)
/// and is ordered as [`volatility_points`](Self::volatility_points).
/// Implementations are immutable once built and safe to share across
/// threads.
pub trait CapFloorPricer: Send + Sync {
    /// Number of caps.
    fn num_caps(&self) -> usize;

    /// Length of the caplet volatility vector.
    fn num_caplets(&self) -> usize;

    /// Expiry, strike and forward of every caplet volatility slot.
    fn volatility_points(&self) -> Vec<VolatilityPoint>;

    /// Cap values at zero volatility.
    fn intrinsic_cap_values(&self) -> DVector<f64>;

    /// Cap prices with each caplet at its own volatility.
    fn price_from_caplet_vols(&self, vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError>;

    /// `∂(cap price)/∂(caplet vol)`, `num_caps × num_caplets`.
    fn vega_from_caplet_vols(&self, vols: &DVector<f64>) -> Result<DMatrix<f64>, StrippingError>;

    /// Cap prices with every caplet of cap `i` at `cap_vols[i]`.
    fn price(&self, cap_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError>;

    /// Cap vegas with every caplet of cap `i` at `cap_vols[i]`.
    fn vega(&self, cap_vols: &DVector<f64>) -> Result<DVector<f64>, StrippingError>;

    /// Cap implied volatilities from cap prices.
    fn implied_vols(&self, cap_prices: &DVector<f64>) -> Result<DVector<f64>, StrippingError>;

    /// `∂(cap implied vol)/∂(caplet vol)`, `num_caps × num_caplets`.
    fn cap_vol_vega(&self, vols: &DVector<f64>) -> Result<DMatrix<f64>, StrippingError>;
}
