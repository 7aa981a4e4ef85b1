//! Interpolator trait and node-weight representation.

use crate::types::InterpolationError;

/// Linear weights of the node values at a query point.
///
/// Every interpolator here is linear in the node values, so the interpolated
/// value is `Σ value[j] · y[j]` and its first derivative in `x` is
/// `Σ derivative[j] · y[j]`. The value weights are also the node
/// sensitivities `∂y(x)/∂y[j]`.
#[derive(Debug, Clone, PartialEq)]
pub struct NodeWeights {
    /// Weights giving the interpolated value
    pub value: Vec<f64>,
    /// Weights giving the first derivative with respect to `x`
    pub derivative: Vec<f64>,
}

impl NodeWeights {
    /// All-zero weights for `n` nodes.
    pub fn zeros(n: usize) -> Self {
        Self {
            value: vec![0.0; n],
            derivative: vec![0.0; n],
        }
    }

    /// Apply the value weights to node values.
    #[inline]
    pub fn apply(&self, ys: &[f64]) -> f64 {
        self.value.iter().zip(ys).map(|(w, y)| w * y).sum()
    }

    /// Apply the derivative weights to node values.
    #[inline]
    pub fn apply_derivative(&self, ys: &[f64]) -> f64 {
        self.derivative.iter().zip(ys).map(|(w, y)| w * y).sum()
    }
}

/// Interpolation on a fixed set of node abscissas.
///
/// Nodes are bound at construction; node values are supplied per call so the
/// same interpolator serves every trial parameter vector of a calibration.
pub trait Interpolator {
    /// Node abscissas (strictly increasing).
    fn nodes(&self) -> &[f64];

    /// Value and derivative weights at `x`.
    ///
    /// `x` is clamped to [`domain`](Self::domain); extrapolation is handled by
    /// `CombinedInterpolator`.
    fn weights(&self, x: f64) -> NodeWeights;

    /// Valid interpolation range.
    fn domain(&self) -> (f64, f64) {
        let xs = self.nodes();
        (xs[0], xs[xs.len() - 1])
    }

    /// Interpolate node values at `x`.
    ///
    /// # Errors
    ///
    /// - `InterpolationError::InvalidInput` if `ys` has the wrong length
    /// - `InterpolationError::OutOfBounds` if `x` lies outside the domain
    fn interpolate(&self, ys: &[f64], x: f64) -> Result<f64, InterpolationError> {
        check_values(self.nodes(), ys)?;
        let (min, max) = self.domain();
        if x < min || x > max {
            return Err(InterpolationError::OutOfBounds { x, min, max });
        }
        Ok(self.weights(x).apply(ys))
    }
}

/// Validate node abscissas: at least two, finite, strictly increasing.
pub(crate) fn validate_nodes(xs: &[f64]) -> Result<(), InterpolationError> {
    if xs.len() < 2 {
        return Err(InterpolationError::InsufficientData {
            got: xs.len(),
            need: 2,
        });
    }
    if let Some(i) = xs.iter().position(|x| !x.is_finite()) {
        return Err(InterpolationError::InvalidInput(format!(
            "node {} is not finite",
            i
        )));
    }
    if let Some(i) = xs.windows(2).position(|w| w[1] <= w[0]) {
        return Err(InterpolationError::NonMonotonicData { index: i + 1 });
    }
    Ok(())
}

pub(crate) fn check_values(xs: &[f64], ys: &[f64]) -> Result<(), InterpolationError> {
    if xs.len() != ys.len() {
        return Err(InterpolationError::InvalidInput(format!(
            "expected {} node values, got {}",
            xs.len(),
            ys.len()
        )));
    }
    Ok(())
}

/// Segment index `i` with `xs[i] <= x <= xs[i+1]`, clamped to `[0, n-2]`.
#[inline]
pub(crate) fn find_segment(xs: &[f64], x: f64) -> usize {
    let pos = xs.partition_point(|&xi| xi <= x);
    pos.saturating_sub(1).min(xs.len() - 2)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_find_segment_clamps() {
        let xs = [0.0, 1.0, 2.0, 3.0];
        assert_eq!(find_segment(&xs, -1.0), 0);
        assert_eq!(find_segment(&xs, 0.0), 0);
        assert_eq!(find_segment(&xs, 1.5), 1);
        assert_eq!(find_segment(&xs, 3.0), 2);
        assert_eq!(find_segment(&xs, 9.0), 2);
    }

    #[test]
    fn test_validate_nodes() {
        assert!(validate_nodes(&[0.0, 1.0]).is_ok());
        assert_eq!(
            validate_nodes(&[0.0]),
            Err(InterpolationError::InsufficientData { got: 1, need: 2 })
        );
        assert_eq!(
            validate_nodes(&[0.0, 2.0, 2.0]),
            Err(InterpolationError::NonMonotonicData { index: 2 })
        );
        assert!(validate_nodes(&[0.0, f64::NAN]).is_err());
    }

    #[test]
    fn test_node_weights_apply() {
        let w = NodeWeights {
            value: vec![0.25, 0.75],
            derivative: vec![-1.0, 1.0],
        };
        assert_eq!(w.apply(&[4.0, 8.0]), 7.0);
        assert_eq!(w.apply_derivative(&[4.0, 8.0]), 4.0);
    }
}
