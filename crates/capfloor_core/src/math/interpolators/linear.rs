//! Piecewise linear interpolation.

use super::traits::{find_segment, validate_nodes, Interpolator, NodeWeights};
use crate::types::InterpolationError;

/// Piecewise linear interpolator.
///
/// # Example
///
/// ```
/// use capfloor_core::math::interpolators::{Interpolator, LinearInterpolator};
///
/// let interp = LinearInterpolator::new(&[0.0, 1.0, 2.0]).unwrap();
/// let y = interp.interpolate(&[0.0, 1.0, 4.0], 1.5).unwrap();
/// assert!((y - 2.5).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct LinearInterpolator {
    xs: Vec<f64>,
}

impl LinearInterpolator {
    /// Bind the interpolator to node abscissas.
    ///
    /// # Errors
    ///
    /// - `InterpolationError::InsufficientData` for fewer than 2 nodes
    /// - `InterpolationError::NonMonotonicData` if nodes are not strictly increasing
    pub fn new(xs: &[f64]) -> Result<Self, InterpolationError> {
        validate_nodes(xs)?;
        Ok(Self { xs: xs.to_vec() })
    }
}

impl Interpolator for LinearInterpolator {
    fn nodes(&self) -> &[f64] {
        &self.xs
    }

    fn weights(&self, x: f64) -> NodeWeights {
        let n = self.xs.len();
        let (min, max) = self.domain();
        let x = x.clamp(min, max);
        let i = find_segment(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let t = (x - self.xs[i]) / h;

        let mut w = NodeWeights::zeros(n);
        w.value[i] = 1.0 - t;
        w.value[i + 1] = t;
        w.derivative[i] = -1.0 / h;
        w.derivative[i + 1] = 1.0 / h;
        w
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_reproduces_nodes() {
        let xs = [0.5, 1.0, 3.0];
        let ys = [0.2, 0.3, 0.1];
        let interp = LinearInterpolator::new(&xs).unwrap();
        for (x, y) in xs.iter().zip(ys) {
            assert_relative_eq!(interp.interpolate(&ys, *x).unwrap(), y, epsilon = 1e-15);
        }
    }

    #[test]
    fn test_derivative_is_segment_slope() {
        let interp = LinearInterpolator::new(&[0.0, 2.0, 3.0]).unwrap();
        let w = interp.weights(2.5);
        assert_relative_eq!(w.apply_derivative(&[0.0, 4.0, 1.0]), -3.0);
    }

    #[test]
    fn test_out_of_bounds() {
        let interp = LinearInterpolator::new(&[0.0, 1.0]).unwrap();
        assert!(matches!(
            interp.interpolate(&[0.0, 1.0], 1.5),
            Err(InterpolationError::OutOfBounds { .. })
        ));
    }

    #[test]
    fn test_wrong_value_count() {
        let interp = LinearInterpolator::new(&[0.0, 1.0]).unwrap();
        assert!(matches!(
            interp.interpolate(&[0.0], 0.5),
            Err(InterpolationError::InvalidInput(_))
        ));
    }
}
