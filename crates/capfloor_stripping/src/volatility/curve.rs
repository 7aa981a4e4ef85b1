//! Interpolated parameter curves over expiry.

use capfloor_core::math::interpolators::{CombinedInterpolator, ExtrapolatorKind, InterpolatorKind};
use capfloor_core::math::transforms::ParameterTransform;
use nalgebra::DVector;
use serde::{Deserialize, Serialize};

use crate::error::StrippingError;

fn linear_extrapolation() -> ExtrapolatorKind {
    ExtrapolatorKind::Linear
}

/// A curve of one quantity against expiry, parameterised by its values at
/// fixed knots.
///
/// The curve value at `t` is `T⁻¹(Σⱼ wⱼ(t) yⱼ)` where `yⱼ` are the fitting
/// parameters, `wⱼ(t)` the interpolation weights and `T` the parameter
/// transform. With a `GreaterThan(0)` transform no parameter vector can
/// produce a negative value. A single knot gives a constant curve.
///
/// Defaults: double-quadratic interpolation, linear extrapolation at both
/// ends, no transform.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveSpec {
    /// Knot expiries, strictly increasing.
    pub knots: Vec<f64>,
    /// Interior interpolation.
    #[serde(default)]
    pub interpolator: InterpolatorKind,
    /// Extrapolation before the first knot.
    #[serde(default = "linear_extrapolation")]
    pub left_extrapolator: ExtrapolatorKind,
    /// Extrapolation after the last knot.
    #[serde(default = "linear_extrapolation")]
    pub right_extrapolator: ExtrapolatorKind,
    /// Transform between curve values and fitting parameters.
    #[serde(default)]
    pub transform: ParameterTransform,
}

impl CurveSpec {
    /// Curve through `knots` with the default interpolation and no transform.
    pub fn new(knots: Vec<f64>) -> Self {
        Self {
            knots,
            interpolator: InterpolatorKind::default(),
            left_extrapolator: ExtrapolatorKind::Linear,
            right_extrapolator: ExtrapolatorKind::Linear,
            transform: ParameterTransform::Identity,
        }
    }

    /// Same curve with a different interior interpolation.
    pub fn with_interpolator(mut self, interpolator: InterpolatorKind) -> Self {
        self.interpolator = interpolator;
        self
    }

    /// Same curve with different extrapolation at both ends.
    pub fn with_extrapolators(mut self, left: ExtrapolatorKind, right: ExtrapolatorKind) -> Self {
        self.left_extrapolator = left;
        self.right_extrapolator = right;
        self
    }

    /// Same curve with a parameter transform.
    pub fn with_transform(mut self, transform: ParameterTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Number of fitting parameters.
    #[inline]
    pub fn num_parameters(&self) -> usize {
        self.knots.len()
    }

    /// Fitting parameters that put the curve through `knot_values`.
    ///
    /// # Errors
    ///
    /// - `StrippingError::LengthMismatch` if there is not one value per knot
    /// - `StrippingError::InvalidInput` if a value violates the transform's limit
    pub fn fitting_parameters(&self, knot_values: &[f64]) -> Result<DVector<f64>, StrippingError> {
        if knot_values.len() != self.knots.len() {
            return Err(StrippingError::length_mismatch(
                "knot values",
                self.knots.len(),
                knot_values.len(),
            ));
        }
        if let Some(v) = knot_values.iter().find(|v| !self.transform.admits(**v)) {
            return Err(StrippingError::InvalidInput(format!(
                "knot value {} violates {:?}",
                v, self.transform
            )));
        }
        Ok(DVector::from_iterator(
            knot_values.len(),
            knot_values.iter().map(|v| self.transform.transform(*v)),
        ))
    }

    pub(crate) fn bind(&self) -> Result<BoundCurve, StrippingError> {
        let interpolator = match self.knots.len() {
            0 => {
                return Err(StrippingError::configuration(
                    "a parameter curve needs at least one knot",
                ))
            }
            1 => None,
            _ => Some(CombinedInterpolator::new(
                self.interpolator,
                &self.knots,
                self.left_extrapolator,
                self.right_extrapolator,
            )?),
        };
        Ok(BoundCurve {
            interpolator,
            transform: self.transform,
        })
    }
}

/// A [`CurveSpec`] ready to evaluate weights.
#[derive(Debug, Clone)]
pub(crate) struct BoundCurve {
    interpolator: Option<CombinedInterpolator>,
    transform: ParameterTransform,
}

impl BoundCurve {
    /// Value weights of the knots at `t`.
    pub(crate) fn weights(&self, t: f64) -> Vec<f64> {
        match &self.interpolator {
            Some(interp) => interp.node_sensitivities(t),
            None => vec![1.0],
        }
    }

    #[inline]
    pub(crate) fn transform(&self) -> ParameterTransform {
        self.transform
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_single_knot_is_constant() {
        let curve = CurveSpec::new(vec![1.0]).bind().unwrap();
        assert_eq!(curve.weights(0.1), vec![1.0]);
        assert_eq!(curve.weights(30.0), vec![1.0]);
    }

    #[test]
    fn test_no_knots_rejected() {
        assert!(matches!(
            CurveSpec::new(Vec::new()).bind(),
            Err(StrippingError::Configuration(_))
        ));
    }

    #[test]
    fn test_weights_reproduce_knot_values() {
        let curve = CurveSpec::new(vec![0.5, 1.0, 2.0, 5.0]).bind().unwrap();
        let w = curve.weights(2.0);
        assert_relative_eq!(w[2], 1.0, epsilon = 1e-14);
        assert_relative_eq!(w.iter().sum::<f64>(), 1.0, epsilon = 1e-14);
    }

    #[test]
    fn test_fitting_parameters_respect_transform() {
        let spec = CurveSpec::new(vec![1.0, 2.0]).with_transform(ParameterTransform::GreaterThan(0.0));
        let y = spec.fitting_parameters(&[0.2, 0.3]).unwrap();
        assert_relative_eq!(spec.transform.inverse_transform(y[1]), 0.3, epsilon = 1e-14);
        assert!(spec.fitting_parameters(&[0.2, -0.1]).is_err());
        assert!(spec.fitting_parameters(&[0.2]).is_err());
    }

    #[test]
    fn test_deserialise_defaults() {
        let spec: CurveSpec = toml::from_str("knots = [1.0, 2.0, 3.0]").unwrap();
        assert_eq!(spec, CurveSpec::new(vec![1.0, 2.0, 3.0]));
    }
}
