//! B-spline caplet volatility surfaces.

use capfloor_core::math::basis::{BSplineBasis, BSplineBasis2D};
use capfloor_core::math::function::{check_domain, VectorFunction};
use capfloor_core::types::SolverError;
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::VolatilityPoint;
use crate::error::StrippingError;

fn cubic() -> usize {
    3
}

/// Uniform B-spline basis along one axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisAxis {
    /// Covered range; defaults to the span of the bound points.
    #[serde(default)]
    pub range: Option<[f64; 2]>,
    /// Number of knots across the range (at least 2).
    pub num_knots: usize,
    /// Polynomial degree.
    #[serde(default = "cubic")]
    pub degree: usize,
}

impl BasisAxis {
    /// Cubic basis with `num_knots` knots over the span of the points.
    pub fn new(num_knots: usize) -> Self {
        Self {
            range: None,
            num_knots,
            degree: cubic(),
        }
    }

    /// Same axis with a different degree.
    pub fn with_degree(mut self, degree: usize) -> Self {
        self.degree = degree;
        self
    }

    /// Same axis over a fixed range.
    pub fn with_range(mut self, lower: f64, upper: f64) -> Self {
        self.range = Some([lower, upper]);
        self
    }

    fn basis(&self, values: impl Iterator<Item = f64>) -> Result<BSplineBasis, StrippingError> {
        let [lower, upper] = match self.range {
            Some(range) => range,
            None => values.fold([f64::INFINITY, f64::NEG_INFINITY], |[lo, hi], v| {
                [lo.min(v), hi.max(v)]
            }),
        };
        Ok(BSplineBasis::uniform(lower, upper, self.num_knots, self.degree)?)
    }
}

/// B-spline surface settings.
///
/// With only an expiry axis the volatility is a function of expiry alone;
/// with a strike axis too it is a tensor-product surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BasisSplineSpec {
    /// Basis along expiry.
    pub expiry: BasisAxis,
    /// Basis along strike, if any.
    #[serde(default)]
    pub strike: Option<BasisAxis>,
}

impl BasisSplineSpec {
    /// Volatility as a function of expiry only.
    pub fn term_structure(expiry: BasisAxis) -> Self {
        Self {
            expiry,
            strike: None,
        }
    }

    /// Volatility as a tensor-product surface in expiry and strike.
    pub fn surface(expiry: BasisAxis, strike: BasisAxis) -> Self {
        Self {
            expiry,
            strike: Some(strike),
        }
    }
}

/// Volatilities `σ = B w`, linear in the basis weights `w`.
#[derive(Debug, Clone)]
pub struct BasisSplineVolatility {
    basis: DMatrix<f64>,
}

impl BasisSplineVolatility {
    /// Evaluate the basis at every point.
    pub fn new(spec: &BasisSplineSpec, points: &[VolatilityPoint]) -> Result<Self, StrippingError> {
        let expiry = spec.expiry.basis(points.iter().map(|p| p.expiry))?;
        let rows: Vec<Vec<f64>> = match &spec.strike {
            None => points.iter().map(|p| expiry.evaluate_all(p.expiry)).collect(),
            Some(axis) => {
                let strike = axis.basis(points.iter().map(|p| p.strike))?;
                let surface = BSplineBasis2D::new(expiry, strike);
                points
                    .iter()
                    .map(|p| surface.evaluate_all(p.expiry, p.strike))
                    .collect()
            }
        };
        let u = rows.first().map_or(0, Vec::len);
        let basis = DMatrix::from_fn(rows.len(), u, |i, j| rows[i][j]);
        Ok(Self { basis })
    }

    /// Basis matrix (points × weights).
    #[inline]
    pub fn basis_matrix(&self) -> &DMatrix<f64> {
        &self.basis
    }
}

impl VectorFunction for BasisSplineVolatility {
    fn domain_size(&self) -> usize {
        self.basis.ncols()
    }

    fn range_size(&self) -> usize {
        self.basis.nrows()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_domain(self, x)?;
        Ok(&self.basis * x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        check_domain(self, x)?;
        Ok(self.basis.clone())
    }
}
