//! SABR smile with term structures of α, β, ρ and ν.

use capfloor_core::math::function::{check_domain, VectorFunction};
use capfloor_core::math::transforms::ParameterTransform;
use capfloor_core::types::SolverError;
use capfloor_models::models::{SABRModel, SABRParams};
use nalgebra::{DMatrix, DVector};
use serde::{Deserialize, Serialize};

use super::curve::CurveSpec;
use super::VolatilityPoint;
use crate::error::StrippingError;

/// The four SABR parameter curves.
///
/// The fitting parameter vector is the α knots, then β, ρ and ν.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SabrTermStructureSpec {
    /// Vol-of-forward level.
    pub alpha: CurveSpec,
    /// CEV exponent.
    pub beta: CurveSpec,
    /// Forward/vol correlation.
    pub rho: CurveSpec,
    /// Vol-of-vol.
    pub nu: CurveSpec,
}

impl SabrTermStructureSpec {
    /// Curves through the given knots, transformed so that every parameter
    /// vector yields α > 0, 0 < β < 1, -1 < ρ < 1 and ν > 0.
    pub fn new(alpha: Vec<f64>, beta: Vec<f64>, rho: Vec<f64>, nu: Vec<f64>) -> Self {
        Self {
            alpha: CurveSpec::new(alpha).with_transform(ParameterTransform::GreaterThan(0.0)),
            beta: CurveSpec::new(beta).with_transform(ParameterTransform::Range {
                lower: 0.0,
                upper: 1.0,
            }),
            rho: CurveSpec::new(rho).with_transform(ParameterTransform::Range {
                lower: -1.0,
                upper: 1.0,
            }),
            nu: CurveSpec::new(nu).with_transform(ParameterTransform::GreaterThan(0.0)),
        }
    }

    fn curves(&self) -> [&CurveSpec; 4] {
        [&self.alpha, &self.beta, &self.rho, &self.nu]
    }

    /// Total number of fitting parameters.
    pub fn num_parameters(&self) -> usize {
        self.curves().iter().map(|c| c.num_parameters()).sum()
    }

    /// Fitting parameters for the given knot values of each curve.
    pub fn fitting_parameters(
        &self,
        alpha: &[f64],
        beta: &[f64],
        rho: &[f64],
        nu: &[f64],
    ) -> Result<DVector<f64>, StrippingError> {
        let mut params = Vec::with_capacity(self.num_parameters());
        for (curve, values) in self.curves().into_iter().zip([alpha, beta, rho, nu]) {
            params.extend(curve.fitting_parameters(values)?.iter());
        }
        Ok(DVector::from_vec(params))
    }
}

/// One SABR parameter curve evaluated at every caplet expiry.
#[derive(Debug, Clone)]
struct BoundParameter {
    offset: usize,
    weights: DMatrix<f64>,
    transform: ParameterTransform,
}

impl BoundParameter {
    fn signal(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.weights * x.rows(self.offset, self.weights.ncols())
    }
}

/// Caplet volatilities from the SABR smile at each caplet's forward and
/// strike, with α, β, ρ, ν read off their term structures at the expiry.
///
/// The Jacobian chains the smile's parameter adjoints through the
/// transforms and interpolation weights.
#[derive(Debug, Clone)]
pub struct SabrTermStructure {
    points: Vec<VolatilityPoint>,
    parameters: [BoundParameter; 4],
}

impl SabrTermStructure {
    /// Bind `spec` to `points`.
    ///
    /// # Errors
    ///
    /// `StrippingError::InvalidInput` if a point has a non-positive strike or
    /// forward, as well as the curve binding errors.
    pub fn new(spec: &SabrTermStructureSpec, points: &[VolatilityPoint]) -> Result<Self, StrippingError> {
        if let Some(p) = points.iter().find(|p| !(p.strike > 0.0) || !(p.forward > 0.0)) {
            return Err(StrippingError::InvalidInput(format!(
                "SABR needs positive strikes and forwards, got strike {} and forward {} at expiry {}",
                p.strike, p.forward, p.expiry
            )));
        }

        let mut offset = 0;
        let mut bind = |curve: &CurveSpec| -> Result<BoundParameter, StrippingError> {
            let bound = curve.bind()?;
            let u = curve.num_parameters();
            let mut weights = DMatrix::zeros(points.len(), u);
            for (i, point) in points.iter().enumerate() {
                for (j, w) in bound.weights(point.expiry).into_iter().enumerate() {
                    weights[(i, j)] = w;
                }
            }
            let parameter = BoundParameter {
                offset,
                weights,
                transform: bound.transform(),
            };
            offset += u;
            Ok(parameter)
        };
        let parameters = [
            bind(&spec.alpha)?,
            bind(&spec.beta)?,
            bind(&spec.rho)?,
            bind(&spec.nu)?,
        ];

        Ok(Self {
            points: points.to_vec(),
            parameters,
        })
    }

    fn models(&self, x: &DVector<f64>) -> Result<Vec<(SABRModel, [f64; 4])>, SolverError> {
        let signals: Vec<DVector<f64>> = self.parameters.iter().map(|p| p.signal(x)).collect();
        self.points
            .iter()
            .enumerate()
            .map(|(i, point)| -> Result<(SABRModel, [f64; 4]), SolverError> {
                let [alpha, beta, rho, nu]: [f64; 4] = std::array::from_fn(|p| {
                    self.parameters[p].transform.inverse_transform(signals[p][i])
                });
                let gradients = std::array::from_fn(|p| {
                    self.parameters[p]
                        .transform
                        .inverse_transform_gradient(signals[p][i])
                });
                let params = SABRParams::new(point.forward, alpha, nu, rho, beta, point.expiry)
                    .map_err(StrippingError::from)?;
                let model = SABRModel::new(params).map_err(StrippingError::from)?;
                Ok((model, gradients))
            })
            .collect()
    }
}

impl VectorFunction for SabrTermStructure {
    fn domain_size(&self) -> usize {
        self.parameters.iter().map(|p| p.weights.ncols()).sum()
    }

    fn range_size(&self) -> usize {
        self.points.len()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_domain(self, x)?;
        let vols = self
            .models(x)?
            .iter()
            .zip(&self.points)
            .map(|((model, _), point)| model.implied_vol(point.strike))
            .collect::<Result<Vec<_>, _>>()
            .map_err(StrippingError::from)?;
        Ok(DVector::from_vec(vols))
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        check_domain(self, x)?;
        let mut jac = DMatrix::zeros(self.range_size(), self.domain_size());
        for (i, ((model, gradients), point)) in self.models(x)?.iter().zip(&self.points).enumerate() {
            let adj = model
                .implied_vol_adjoint(point.strike)
                .map_err(StrippingError::from)?;
            let sensitivities = [adj.d_alpha, adj.d_beta, adj.d_rho, adj.d_nu];
            for (p, parameter) in self.parameters.iter().enumerate() {
                let scale = sensitivities[p] * gradients[p];
                for j in 0..parameter.weights.ncols() {
                    jac[(i, parameter.offset + j)] += scale * parameter.weights[(i, j)];
                }
            }
        }
        Ok(jac)
    }
}
