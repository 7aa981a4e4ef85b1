//! Natural cubic spline interpolation.

use nalgebra::DMatrix;

use super::traits::{find_segment, validate_nodes, Interpolator, NodeWeights};
use crate::types::InterpolationError;

/// Natural cubic spline interpolator with C² continuity.
///
/// The second derivatives at the nodes are linear in the node values,
/// `M = S y`, with `M₀ = Mₙ₋₁ = 0`. `S` is computed once when the nodes are
/// bound, so each evaluation costs a single segment lookup.
///
/// # Example
///
/// ```
/// use capfloor_core::math::interpolators::{CubicSplineInterpolator, Interpolator};
///
/// let xs = [0.0, 1.0, 2.0, 3.0];
/// let ys = [0.0, 1.0, 4.0, 9.0];
/// let interp = CubicSplineInterpolator::new(&xs).unwrap();
/// let y = interp.interpolate(&ys, 1.0).unwrap();
/// assert!((y - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CubicSplineInterpolator {
    xs: Vec<f64>,
    /// Maps node values to second derivatives (n × n)
    second_derivative: DMatrix<f64>,
}

impl CubicSplineInterpolator {
    /// Bind the spline to node abscissas.
    ///
    /// # Errors
    ///
    /// - `InterpolationError::InsufficientData` for fewer than 2 nodes
    /// - `InterpolationError::NonMonotonicData` if nodes are not strictly increasing
    pub fn new(xs: &[f64]) -> Result<Self, InterpolationError> {
        validate_nodes(xs)?;
        let n = xs.len();
        let mut second_derivative = DMatrix::zeros(n, n);

        if n > 2 {
            let h: Vec<f64> = xs.windows(2).map(|w| w[1] - w[0]).collect();
            let m = n - 2;
            let mut a = DMatrix::zeros(m, m);
            let mut b = DMatrix::zeros(m, n);
            for r in 0..m {
                let i = r + 1;
                a[(r, r)] = 2.0 * (h[i - 1] + h[i]);
                if r > 0 {
                    a[(r, r - 1)] = h[i - 1];
                }
                if r + 1 < m {
                    a[(r, r + 1)] = h[i];
                }
                b[(r, i - 1)] = 6.0 / h[i - 1];
                b[(r, i)] = -6.0 / h[i - 1] - 6.0 / h[i];
                b[(r, i + 1)] = 6.0 / h[i];
            }

            let interior = a.lu().solve(&b).ok_or_else(|| {
                InterpolationError::InvalidInput("spline system is singular".to_string())
            })?;
            second_derivative
                .view_mut((1, 0), (m, n))
                .copy_from(&interior);
        }

        Ok(Self {
            xs: xs.to_vec(),
            second_derivative,
        })
    }
}

impl Interpolator for CubicSplineInterpolator {
    fn nodes(&self) -> &[f64] {
        &self.xs
    }

    fn weights(&self, x: f64) -> NodeWeights {
        let n = self.xs.len();
        let (min, max) = self.domain();
        let x = x.clamp(min, max);
        let i = find_segment(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let a = (self.xs[i + 1] - x) / h;
        let b = (x - self.xs[i]) / h;

        let ca = (a * a * a - a) * h * h / 6.0;
        let cb = (b * b * b - b) * h * h / 6.0;
        let da = -(3.0 * a * a - 1.0) * h / 6.0;
        let db = (3.0 * b * b - 1.0) * h / 6.0;

        let mut w = NodeWeights::zeros(n);
        w.value[i] = a;
        w.value[i + 1] = b;
        w.derivative[i] = -1.0 / h;
        w.derivative[i + 1] = 1.0 / h;
        for j in 0..n {
            let s_i = self.second_derivative[(i, j)];
            let s_next = self.second_derivative[(i + 1, j)];
            w.value[j] += ca * s_i + cb * s_next;
            w.derivative[j] += da * s_i + db * s_next;
        }
        w
    }
}
