//! Discrete volatility functions: model parameters → caplet volatilities.
//!
//! A [`DiscreteVolatilityFunctionProvider`] describes a parameterisation of
//! the caplet volatility surface. Binding it to the ordered
//! [`VolatilityPoint`]s of a pricer produces a [`DiscreteVolatilityFunction`],
//! a [`VectorFunction`] from the model parameters to one volatility per point
//! together with its analytic Jacobian.
//!
//! # Parameterisations
//!
//! | Provider | Parameters | Volatility |
//! |---|---|---|
//! | `Direct` | one per point | the parameter itself |
//! | `InterpolatedTermStructure` | one per knot | interpolated in expiry |
//! | `BasisSpline` | one per basis function | B-spline surface in expiry (and strike) |
//! | `SabrTermStructure` | α, β, ρ, ν knots | SABR smile with interpolated parameters |
//!
//! Providers deserialize from a `type`-tagged table:
//!
//! ```
//! use capfloor_stripping::volatility::DiscreteVolatilityFunctionProvider;
//!
//! let provider: DiscreteVolatilityFunctionProvider = toml::from_str(
//!     r#"
//!     type = "interpolated_term_structure"
//!     knots = [0.5, 1.0, 2.0, 5.0]
//!     transform = { greater_than = 0.0 }
//!     "#,
//! )
//! .unwrap();
//! assert!(matches!(
//!     provider,
//!     DiscreteVolatilityFunctionProvider::InterpolatedTermStructure(_)
//! ));
//! ```

mod basis_spline;
mod curve;
mod direct;
mod sabr;
mod term_structure;

pub use basis_spline::{BasisAxis, BasisSplineSpec, BasisSplineVolatility};
pub use curve::CurveSpec;
pub use direct::DirectVolatility;
pub use sabr::{SabrTermStructure, SabrTermStructureSpec};
pub use term_structure::InterpolatedTermStructure;

use capfloor_core::math::function::VectorFunction;
use capfloor_core::types::SolverError;
use capfloor_models::instruments::rates::CapFloor;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use crate::error::StrippingError;

/// Absolute tolerance when comparing cap start times.
const START_TOLERANCE: f64 = 1e-10;

/// A caplet whose volatility a [`DiscreteVolatilityFunction`] produces.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VolatilityPoint {
    /// Fixing time in years.
    pub expiry: f64,
    /// Strike.
    pub strike: f64,
    /// Forward rate.
    pub forward: f64,
}

impl VolatilityPoint {
    /// Create a point.
    #[inline]
    pub fn new(expiry: f64, strike: f64, forward: f64) -> Self {
        Self {
            expiry,
            strike,
            forward,
        }
    }
}

/// Parameterisation of the caplet volatility surface, not yet bound to caplets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DiscreteVolatilityFunctionProvider {
    /// One free volatility per caplet.
    Direct,
    /// Strike-independent term structure interpolated between knots.
    InterpolatedTermStructure(CurveSpec),
    /// B-spline surface, 1-D in expiry or 2-D in expiry and strike.
    BasisSpline(BasisSplineSpec),
    /// SABR smile whose parameters are term structures.
    SabrTermStructure(SabrTermStructureSpec),
}

impl DiscreteVolatilityFunctionProvider {
    /// Bind to an ordered list of caplets.
    ///
    /// # Errors
    ///
    /// - `StrippingError::Configuration` for unusable knots or basis settings
    /// - `StrippingError::InvalidInput` for points the model cannot price
    ///   (e.g. non-positive strikes under SABR)
    /// - Interpolation errors for invalid knot sequences
    pub fn bind(
        &self,
        points: &[VolatilityPoint],
    ) -> Result<DiscreteVolatilityFunction, StrippingError> {
        if points.is_empty() {
            return Err(StrippingError::InvalidInput(
                "cannot bind a volatility function to no caplets".to_string(),
            ));
        }
        Ok(match self {
            Self::Direct => DiscreteVolatilityFunction::Direct(DirectVolatility::new(points.len())),
            Self::InterpolatedTermStructure(spec) => {
                DiscreteVolatilityFunction::TermStructure(InterpolatedTermStructure::new(spec, points)?)
            }
            Self::BasisSpline(spec) => {
                DiscreteVolatilityFunction::BasisSpline(BasisSplineVolatility::new(spec, points)?)
            }
            Self::SabrTermStructure(spec) => {
                DiscreteVolatilityFunction::Sabr(SabrTermStructure::new(spec, points)?)
            }
        })
    }

    /// Short name for diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Direct => "direct",
            Self::InterpolatedTermStructure(_) => "interpolated_term_structure",
            Self::BasisSpline(_) => "basis_spline",
            Self::SabrTermStructure(_) => "sabr_term_structure",
        }
    }
}

/// A volatility parameterisation bound to a fixed ordered list of caplets.
#[derive(Debug, Clone)]
pub enum DiscreteVolatilityFunction {
    /// See [`DirectVolatility`].
    Direct(DirectVolatility),
    /// See [`InterpolatedTermStructure`].
    TermStructure(InterpolatedTermStructure),
    /// See [`BasisSplineVolatility`].
    BasisSpline(BasisSplineVolatility),
    /// See [`SabrTermStructure`].
    Sabr(SabrTermStructure),
}

impl DiscreteVolatilityFunction {
    /// Number of model parameters.
    #[inline]
    pub fn num_parameters(&self) -> usize {
        self.domain_size()
    }

    /// Number of caplet volatilities produced.
    #[inline]
    pub fn num_points(&self) -> usize {
        self.range_size()
    }
}

macro_rules! dispatch {
    ($self:ident, $f:ident => $body:expr) => {
        match $self {
            DiscreteVolatilityFunction::Direct($f) => $body,
            DiscreteVolatilityFunction::TermStructure($f) => $body,
            DiscreteVolatilityFunction::BasisSpline($f) => $body,
            DiscreteVolatilityFunction::Sabr($f) => $body,
        }
    };
}

impl VectorFunction for DiscreteVolatilityFunction {
    fn domain_size(&self) -> usize {
        dispatch!(self, f => f.domain_size())
    }

    fn range_size(&self) -> usize {
        dispatch!(self, f => f.range_size())
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        dispatch!(self, f => f.evaluate(x))
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        dispatch!(self, f => f.jacobian(x))
    }
}

/// Term structure knots for caps that all start at the same time.
///
/// The knots are the common start time followed by every distinct cap end
/// time except the last, so there is one knot per distinct maturity.
///
/// # Errors
///
/// - `StrippingError::InvalidInput` if `caps` is empty
/// - `StrippingError::Configuration` if the caps do not share a start time;
///   knots must then be supplied explicitly
pub fn co_starting_knots(caps: &[CapFloor]) -> Result<Vec<f64>, StrippingError> {
    let start = caps
        .first()
        .map(CapFloor::start)
        .ok_or_else(|| StrippingError::InvalidInput("at least one cap is required".to_string()))?;
    if let Some(cap) = caps
        .iter()
        .find(|cap| (cap.start() - start).abs() > START_TOLERANCE)
    {
        return Err(StrippingError::configuration(format!(
            "caps start at {} and {}; supply term structure knots explicitly",
            start,
            cap.start()
        )));
    }

    let mut ends: Vec<f64> = caps.iter().map(CapFloor::end).collect();
    ends.sort_by(f64::total_cmp);
    ends.dedup_by(|a, b| (*a - *b).abs() <= START_TOLERANCE);
    ends.pop();

    let mut knots = Vec::with_capacity(ends.len() + 1);
    knots.push(start);
    knots.extend(ends);
    Ok(knots)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capfloor_core::math::transforms::ParameterTransform;
    use capfloor_models::instruments::rates::RateIndex;

    fn points() -> Vec<VolatilityPoint> {
        let mut points = Vec::new();
        for &t in &[0.5, 1.0, 1.5, 2.0, 2.5] {
            for &k in &[0.02, 0.03, 0.04] {
                points.push(VolatilityPoint::new(t, k, 0.03));
            }
        }
        points
    }

    #[test]
    fn test_co_starting_knots() {
        let index = RateIndex::euribor_6m();
        let caps: Vec<CapFloor> = [3.0, 1.0, 2.0, 2.0, 4.0]
            .iter()
            .map(|&end| CapFloor::from_schedule(index, 0.0, end, 0.03, true).unwrap())
            .collect();
        assert_eq!(co_starting_knots(&caps).unwrap(), vec![0.5, 1.0, 2.0, 3.0]);
    }

    #[test]
    fn test_knots_need_common_start() {
        let index = RateIndex::euribor_6m();
        let caps = vec![
            CapFloor::from_schedule(index, 0.0, 2.0, 0.03, true).unwrap(),
            CapFloor::from_schedule(index, 1.0, 3.0, 0.03, true).unwrap(),
        ];
        assert!(matches!(
            co_starting_knots(&caps),
            Err(StrippingError::Configuration(_))
        ));
        assert!(co_starting_knots(&[]).is_err());
    }

    #[test]
    fn test_bind_sizes() {
        let points = points();
        let direct = DiscreteVolatilityFunctionProvider::Direct.bind(&points).unwrap();
        assert_eq!(direct.num_parameters(), 15);
        assert_eq!(direct.num_points(), 15);

        let ts = DiscreteVolatilityFunctionProvider::InterpolatedTermStructure(CurveSpec::new(vec![
            0.5, 1.5, 2.5,
        ]))
        .bind(&points)
        .unwrap();
        assert_eq!(ts.num_parameters(), 3);
        assert_eq!(ts.num_points(), 15);

        assert!(DiscreteVolatilityFunctionProvider::Direct.bind(&[]).is_err());
    }

    #[test]
    fn test_term_structure_is_flat_in_strike() {
        let ts = DiscreteVolatilityFunctionProvider::InterpolatedTermStructure(
            CurveSpec::new(vec![0.5, 1.5, 2.5]).with_transform(ParameterTransform::GreaterThan(0.0)),
        )
        .bind(&points())
        .unwrap();
        let vols = ts.evaluate(&DVector::from_vec(vec![-1.0, -1.5, -2.0])).unwrap();
        for e in 0..5 {
            assert_relative_eq!(vols[3 * e], vols[3 * e + 1], epsilon = 1e-15);
            assert_relative_eq!(vols[3 * e], vols[3 * e + 2], epsilon = 1e-15);
        }
    }

    #[test]
    fn test_provider_from_toml() {
        let provider: DiscreteVolatilityFunctionProvider = toml::from_str(
            r#"
            type = "basis_spline"
            expiry = { num_knots = 4, degree = 2 }
            "#,
        )
        .unwrap();
        assert_eq!(provider.name(), "basis_spline");
        let f = provider.bind(&points()).unwrap();
        assert_eq!(f.num_parameters(), 5);

        let direct: DiscreteVolatilityFunctionProvider = toml::from_str("type = \"direct\"").unwrap();
        assert_eq!(direct, DiscreteVolatilityFunctionProvider::Direct);
    }
}
