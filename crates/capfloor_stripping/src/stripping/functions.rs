//! Objective functions from model parameters to cap prices and cap volatilities.

use capfloor_core::math::function::{check_domain, VectorFunction};
use capfloor_core::types::SolverError;
use nalgebra::{DMatrix, DVector};

use crate::error::StrippingError;
use crate::pricer::CapFloorPricer;
use crate::volatility::DiscreteVolatilityFunction;

/// Model parameters → cap prices.
///
/// `∂(cap price)/∂x = V · J` where `V` is the pricer's caplet vega matrix and
/// `J` the volatility function's Jacobian.
#[derive(Debug)]
pub struct CapPriceFunction<'a, P: ?Sized> {
    pricer: &'a P,
    vol_func: &'a DiscreteVolatilityFunction,
}

impl<'a, P: CapFloorPricer + ?Sized> CapPriceFunction<'a, P> {
    /// Compose `vol_func` with `pricer`.
    pub fn new(pricer: &'a P, vol_func: &'a DiscreteVolatilityFunction) -> Self {
        Self { pricer, vol_func }
    }
}

impl<P: CapFloorPricer + ?Sized> VectorFunction for CapPriceFunction<'_, P> {
    fn domain_size(&self) -> usize {
        self.vol_func.domain_size()
    }

    fn range_size(&self) -> usize {
        self.pricer.num_caps()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let vols = self.vol_func.evaluate(x)?;
        Ok(self.pricer.price_from_caplet_vols(&vols)?)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        let vols = self.vol_func.evaluate(x)?;
        let vol_jac = self.vol_func.jacobian(x)?;
        Ok(self.pricer.vega_from_caplet_vols(&vols)? * vol_jac)
    }
}

/// Model parameters → cap implied volatilities.
///
/// `∂(cap vol)/∂x = W · J` where `W` is the pricer's cap-vol vega matrix.
/// Evaluation fails where a model cap price has no Black implied
/// volatility.
#[derive(Debug)]
pub struct CapVolFunction<'a, P: ?Sized> {
    pricer: &'a P,
    vol_func: &'a DiscreteVolatilityFunction,
}

impl<'a, P: CapFloorPricer + ?Sized> CapVolFunction<'a, P> {
    /// Compose `vol_func` with `pricer` and cap implied volatility.
    pub fn new(pricer: &'a P, vol_func: &'a DiscreteVolatilityFunction) -> Self {
        Self { pricer, vol_func }
    }
}

impl<P: CapFloorPricer + ?Sized> VectorFunction for CapVolFunction<'_, P> {
    fn domain_size(&self) -> usize {
        self.vol_func.domain_size()
    }

    fn range_size(&self) -> usize {
        self.pricer.num_caps()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let vols = self.vol_func.evaluate(x)?;
        let prices = self.pricer.price_from_caplet_vols(&vols)?;
        Ok(self.pricer.implied_vols(&prices)?)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        let vols = self.vol_func.evaluate(x)?;
        let vol_jac = self.vol_func.jacobian(x)?;
        Ok(self.pricer.cap_vol_vega(&vols)? * vol_jac)
    }
}

/// `f(x) / e` for a vector of positive errors `e`.
///
/// Used to scale a root-finding problem whose outputs differ in magnitude.
#[derive(Debug, Clone)]
pub struct WeightedFunction<F> {
    inner: F,
    weights: DVector<f64>,
}

impl<F: VectorFunction> WeightedFunction<F> {
    /// Divide every output of `inner` by the matching error.
    ///
    /// # Errors
    ///
    /// - `StrippingError::LengthMismatch` if there is not one error per output
    /// - `StrippingError::InvalidMarketData` for a non-positive error
    pub fn new(inner: F, errors: &DVector<f64>) -> Result<Self, StrippingError> {
        if errors.len() != inner.range_size() {
            return Err(StrippingError::length_mismatch(
                "errors",
                inner.range_size(),
                errors.len(),
            ));
        }
        if let Some(i) = errors.iter().position(|e| !(*e > 0.0) || !e.is_finite()) {
            return Err(StrippingError::invalid_market_data(
                i,
                format!("error {} must be positive", errors[i]),
            ));
        }
        Ok(Self {
            inner,
            weights: errors.map(|e| 1.0 / e),
        })
    }

    /// `target / e`, the target matching this function's scaling.
    pub fn scale(&self, target: &DVector<f64>) -> DVector<f64> {
        target.component_mul(&self.weights)
    }
}

impl<F: VectorFunction> VectorFunction for WeightedFunction<F> {
    fn domain_size(&self) -> usize {
        self.inner.domain_size()
    }

    fn range_size(&self) -> usize {
        self.inner.range_size()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        Ok(self.scale(&self.inner.evaluate(x)?))
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        check_domain(self, x)?;
        let mut jac = self.inner.jacobian(x)?;
        for (i, w) in self.weights.iter().enumerate() {
            jac.row_mut(i).scale_mut(*w);
        }
        Ok(jac)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use capfloor_core::market_data::{CurveEnum, CurveName, CurveSet};
    use capfloor_core::math::function::finite_difference_jacobian;
    use capfloor_core::math::transforms::ParameterTransform;
    use capfloor_models::instruments::rates::{CapFloor, RateIndex};

    use crate::pricer::MultiCapFloorPricer;
    use crate::volatility::{CurveSpec, DiscreteVolatilityFunctionProvider};

    fn setup() -> (MultiCapFloorPricer, DiscreteVolatilityFunction) {
        let curves = CurveSet::single(CurveName::Euribor6M, CurveEnum::flat(0.03));
        let index = RateIndex::euribor_6m();
        let caps: Vec<CapFloor> = [(1.0, 0.02), (2.0, 0.03), (3.0, 0.03), (3.0, 0.04)]
            .iter()
            .map(|&(end, strike)| CapFloor::from_schedule(index, 0.0, end, strike, true).unwrap())
            .collect();
        let pricer = MultiCapFloorPricer::new(caps, &curves).unwrap();
        let provider = DiscreteVolatilityFunctionProvider::InterpolatedTermStructure(
            CurveSpec::new(vec![0.5, 1.0, 2.0]).with_transform(ParameterTransform::GreaterThan(0.0)),
        );
        let vol_func = provider.bind(&pricer.volatility_points()).unwrap();
        (pricer, vol_func)
    }

    fn params() -> DVector<f64> {
        DVector::from_vec(vec![-1.2, -1.0, -1.4])
    }

    #[test]
    fn test_price_jacobian_matches_finite_differences() {
        let (pricer, vol_func) = setup();
        let f = CapPriceFunction::new(&pricer, &vol_func);
        assert_eq!((f.range_size(), f.domain_size()), (4, 3));
        let analytic = f.jacobian(&params()).unwrap();
        let fd = finite_difference_jacobian(&f, &params(), 1e-6).unwrap();
        assert_relative_eq!(analytic, fd, epsilon = 1e-9);
    }

    #[test]
    fn test_vol_jacobian_matches_finite_differences() {
        let (pricer, vol_func) = setup();
        let f = CapVolFunction::new(&pricer, &vol_func);
        let analytic = f.jacobian(&params()).unwrap();
        let fd = finite_difference_jacobian(&f, &params(), 1e-5).unwrap();
        assert_relative_eq!(analytic, fd, epsilon = 1e-6);
    }

    #[test]
    fn test_cap_vols_of_flat_caplet_vols() {
        let (pricer, vol_func) = setup();
        let f = CapVolFunction::new(&pricer, &vol_func);
        let flat = DVector::from_element(3, ParameterTransform::GreaterThan(0.0).transform(0.3));
        for v in f.evaluate(&flat).unwrap().iter() {
            assert_relative_eq!(*v, 0.3, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_weighted_function_scales_rows() {
        let (pricer, vol_func) = setup();
        let errors = DVector::from_vec(vec![1.0, 2.0, 4.0, 0.5]);
        let plain = CapPriceFunction::new(&pricer, &vol_func);
        let weighted = WeightedFunction::new(CapPriceFunction::new(&pricer, &vol_func), &errors).unwrap();

        let value = weighted.evaluate(&params()).unwrap();
        let jac = weighted.jacobian(&params()).unwrap();
        let plain_value = plain.evaluate(&params()).unwrap();
        let plain_jac = plain.jacobian(&params()).unwrap();
        for i in 0..4 {
            assert_relative_eq!(value[i] * errors[i], plain_value[i], max_relative = 1e-14);
            for j in 0..3 {
                assert_relative_eq!(jac[(i, j)] * errors[i], plain_jac[(i, j)], max_relative = 1e-14);
            }
        }
    }

    #[test]
    fn test_weighted_function_rejects_bad_errors() {
        let (pricer, vol_func) = setup();
        let f = || CapPriceFunction::new(&pricer, &vol_func);
        assert!(matches!(
            WeightedFunction::new(f(), &DVector::from_vec(vec![1.0, 0.0, 1.0, 1.0])),
            Err(StrippingError::InvalidMarketData { cap: 1, .. })
        ));
        assert!(matches!(
            WeightedFunction::new(f(), &DVector::from_element(3, 1.0)),
            Err(StrippingError::LengthMismatch { .. })
        ));
    }
}
