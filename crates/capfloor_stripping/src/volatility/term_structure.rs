//! Interpolated caplet volatility term structure.

use capfloor_core::math::function::{check_domain, VectorFunction};
use capfloor_core::math::transforms::ParameterTransform;
use capfloor_core::types::SolverError;
use nalgebra::{DMatrix, DVector};

use super::curve::CurveSpec;
use super::VolatilityPoint;
use crate::error::StrippingError;

/// Caplet volatility as an interpolated curve in expiry, independent of
/// strike.
///
/// `vol_i = T⁻¹(Σⱼ W_ij x_j)` where `W` holds the interpolation weights of
/// every caplet expiry. The Jacobian is `diag(T⁻¹'(W x)) · W`.
#[derive(Debug, Clone)]
pub struct InterpolatedTermStructure {
    weights: DMatrix<f64>,
    transform: ParameterTransform,
}

impl InterpolatedTermStructure {
    /// Bind `spec` to the caplet expiries of `points`.
    pub fn new(spec: &CurveSpec, points: &[VolatilityPoint]) -> Result<Self, StrippingError> {
        let curve = spec.bind()?;
        let u = spec.num_parameters();
        let mut weights = DMatrix::zeros(points.len(), u);
        for (i, point) in points.iter().enumerate() {
            for (j, w) in curve.weights(point.expiry).into_iter().enumerate() {
                weights[(i, j)] = w;
            }
        }
        Ok(Self {
            weights,
            transform: curve.transform(),
        })
    }

    /// Interpolation weight matrix (caplets × knots).
    #[inline]
    pub fn weights(&self) -> &DMatrix<f64> {
        &self.weights
    }
}

impl VectorFunction for InterpolatedTermStructure {
    fn domain_size(&self) -> usize {
        self.weights.ncols()
    }

    fn range_size(&self) -> usize {
        self.weights.nrows()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_domain(self, x)?;
        Ok((&self.weights * x).map(|s| self.transform.inverse_transform(s)))
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        check_domain(self, x)?;
        let s = &self.weights * x;
        let mut jac = self.weights.clone();
        for (i, si) in s.iter().enumerate() {
            jac.row_mut(i)
                .scale_mut(self.transform.inverse_transform_gradient(*si));
        }
        Ok(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capfloor_core::math::function::finite_difference_jacobian;
    use capfloor_core::math::interpolators::InterpolatorKind;

    fn points() -> Vec<VolatilityPoint> {
        [0.25, 0.5, 1.0, 1.7, 2.5, 4.0]
            .iter()
            .map(|&t| VolatilityPoint::new(t, 0.03, 0.03))
            .collect()
    }

    #[test]
    fn test_identity_transform_is_linear() {
        let spec = CurveSpec::new(vec![0.25, 1.0, 2.5]).with_interpolator(InterpolatorKind::Linear);
        let ts = InterpolatedTermStructure::new(&spec, &points()).unwrap();
        let x = DVector::from_vec(vec![0.2, 0.3, 0.25]);
        let vols = ts.evaluate(&x).unwrap();
        assert_relative_eq!(vols[0], 0.2, epsilon = 1e-15);
        assert_relative_eq!(vols[1], 0.2 + 0.1 / 3.0, epsilon = 1e-15);
        assert_relative_eq!(vols[4], 0.25, epsilon = 1e-15);
        assert_eq!(ts.jacobian(&x).unwrap(), *ts.weights());
    }

    #[test]
    fn test_positive_transform_jacobian() {
        let spec = CurveSpec::new(vec![0.25, 1.0, 2.5])
            .with_transform(ParameterTransform::GreaterThan(0.0));
        let ts = InterpolatedTermStructure::new(&spec, &points()).unwrap();
        let x = DVector::from_vec(vec![-3.0, -1.0, -2.0]);
        assert!(ts.evaluate(&x).unwrap().iter().all(|v| *v > 0.0));

        let analytic = ts.jacobian(&x).unwrap();
        let fd = finite_difference_jacobian(&ts, &x, 1e-6).unwrap();
        assert_relative_eq!(analytic, fd, epsilon = 1e-8);
    }

    #[test]
    fn test_knot_values_recovered() {
        let spec = CurveSpec::new(vec![0.25, 1.0, 2.5])
            .with_transform(ParameterTransform::GreaterThan(0.0));
        let ts = InterpolatedTermStructure::new(&spec, &points()).unwrap();
        let x = spec.fitting_parameters(&[0.4, 0.35, 0.3]).unwrap();
        let vols = ts.evaluate(&x).unwrap();
        assert_relative_eq!(vols[0], 0.4, epsilon = 1e-12);
        assert_relative_eq!(vols[2], 0.35, epsilon = 1e-12);
        assert_relative_eq!(vols[4], 0.3, epsilon = 1e-12);
    }

    #[test]
    fn test_wrong_parameter_count() {
        let ts = InterpolatedTermStructure::new(&CurveSpec::new(vec![1.0, 2.0]), &points()).unwrap();
        assert!(ts.evaluate(&DVector::zeros(3)).is_err());
    }
}
