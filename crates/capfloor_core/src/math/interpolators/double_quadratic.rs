//! Double-quadratic interpolation.
//!
//! On segment `[x_i, x_{i+1}]` two quadratics are fitted: `q_L` through nodes
//! `i-1, i, i+1` and `q_R` through nodes `i, i+1, i+2`. The interpolant blends
//! them linearly:
//!
//! ```text
//! y(x) = w q_L(x) + (1 - w) q_R(x),    w = (x_{i+1} - x) / (x_{i+1} - x_i)
//! ```
//!
//! On the first segment only `q_R` exists and on the last only `q_L`. With two
//! nodes the scheme degenerates to linear interpolation. The result is C¹ and
//! does not overshoot as strongly as a cubic spline on term-structure data.

use super::traits::{find_segment, validate_nodes, Interpolator, NodeWeights};
use crate::types::InterpolationError;

/// Double-quadratic interpolator.
///
/// # Example
///
/// ```
/// use capfloor_core::math::interpolators::{DoubleQuadraticInterpolator, Interpolator};
///
/// // Exact for quadratics
/// let xs = [0.0, 1.0, 2.0, 4.0];
/// let ys: Vec<f64> = xs.iter().map(|x| x * x).collect();
/// let interp = DoubleQuadraticInterpolator::new(&xs).unwrap();
/// assert!((interp.interpolate(&ys, 3.0).unwrap() - 9.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DoubleQuadraticInterpolator {
    xs: Vec<f64>,
}

impl DoubleQuadraticInterpolator {
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

    /// Lagrange weights (value, derivative) of the quadratic through `start..start+3`.
    fn quadratic(&self, start: usize, x: f64) -> ([f64; 3], [f64; 3]) {
        let p = [self.xs[start], self.xs[start + 1], self.xs[start + 2]];
        let mut value = [0.0; 3];
        let mut deriv = [0.0; 3];
        for j in 0..3 {
            let (a, b) = match j {
                0 => (p[1], p[2]),
                1 => (p[0], p[2]),
                _ => (p[0], p[1]),
            };
            let denom = (p[j] - a) * (p[j] - b);
            value[j] = (x - a) * (x - b) / denom;
            deriv[j] = ((x - a) + (x - b)) / denom;
        }
        (value, deriv)
    }
}

impl Interpolator for DoubleQuadraticInterpolator {
    fn nodes(&self) -> &[f64] {
        &self.xs
    }

    fn weights(&self, x: f64) -> NodeWeights {
        let n = self.xs.len();
        let (min, max) = self.domain();
        let x = x.clamp(min, max);
        let i = find_segment(&self.xs, x);
        let h = self.xs[i + 1] - self.xs[i];
        let mut w = NodeWeights::zeros(n);

        if n == 2 {
            let t = (x - self.xs[0]) / h;
            w.value = vec![1.0 - t, t];
            w.derivative = vec![-1.0 / h, 1.0 / h];
            return w;
        }

        let has_left = i > 0;
        let has_right = i + 2 < n;

        match (has_left, has_right) {
            (true, true) => {
                let blend = (self.xs[i + 1] - x) / h;
                let d_blend = -1.0 / h;
                let (lv, ld) = self.quadratic(i - 1, x);
                let (rv, rd) = self.quadratic(i, x);
                // q_L(x) and q_R(x) enter the derivative through the blend weight
                for j in 0..3 {
                    w.value[i - 1 + j] += blend * lv[j];
                    w.derivative[i - 1 + j] += blend * ld[j] + d_blend * lv[j];
                    w.value[i + j] += (1.0 - blend) * rv[j];
                    w.derivative[i + j] += (1.0 - blend) * rd[j] - d_blend * rv[j];
                }
            }
            (false, _) => {
                let (rv, rd) = self.quadratic(i, x);
                for j in 0..3 {
                    w.value[i + j] = rv[j];
                    w.derivative[i + j] = rd[j];
                }
            }
            (true, false) => {
                let (lv, ld) = self.quadratic(i - 1, x);
                for j in 0..3 {
                    w.value[i - 1 + j] = lv[j];
                    w.derivative[i - 1 + j] = ld[j];
                }
            }
        }
        w
    }
}
