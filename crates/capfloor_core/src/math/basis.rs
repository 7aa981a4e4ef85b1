//! B-spline basis functions.
//!
//! [`BSplineBasis`] generates a full set of B-splines of a given degree on
//! uniformly spaced knots over `[x_min, x_max]`. The knot vector is extended
//! by `degree` knots on each side with the same spacing, so every point of the
//! range is covered by `degree + 1` non-zero functions and the set forms a
//! partition of unity there.
//!
//! [`BSplineBasis2D`] is the tensor product of two 1-D sets; its functions are
//! flattened with index `i * n₂ + j`.

use crate::types::InterpolationError;

/// A set of B-spline basis functions on a uniform knot grid.
///
/// # Example
///
/// ```
/// use capfloor_core::math::basis::BSplineBasis;
///
/// let basis = BSplineBasis::uniform(0.0, 10.0, 6, 3).unwrap();
/// assert_eq!(basis.len(), 8);
/// let sum: f64 = basis.evaluate_all(4.2).iter().sum();
/// assert!((sum - 1.0).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis {
    knots: Vec<f64>,
    degree: usize,
    x_min: f64,
    x_max: f64,
}

impl BSplineBasis {
    /// Create a basis with `n_knots` internal knots spanning `[x_min, x_max]`.
    ///
    /// The set contains `n_knots + degree - 1` functions.
    ///
    /// # Errors
    ///
    /// - `InterpolationError::InsufficientData` if `n_knots < 2`
    /// - `InterpolationError::InvalidInput` if `x_max <= x_min`
    pub fn uniform(
        x_min: f64,
        x_max: f64,
        n_knots: usize,
        degree: usize,
    ) -> Result<Self, InterpolationError> {
        if n_knots < 2 {
            return Err(InterpolationError::InsufficientData {
                got: n_knots,
                need: 2,
            });
        }
        if !(x_max > x_min) {
            return Err(InterpolationError::InvalidInput(format!(
                "basis range [{}, {}] is empty",
                x_min, x_max
            )));
        }

        let dx = (x_max - x_min) / (n_knots - 1) as f64;
        let total = n_knots + 2 * degree;
        let knots = (0..total)
            .map(|i| x_min + (i as f64 - degree as f64) * dx)
            .collect();

        Ok(Self {
            knots,
            degree,
            x_min,
            x_max,
        })
    }

    /// Number of basis functions.
    #[inline]
    pub fn len(&self) -> usize {
        self.knots.len() - self.degree - 1
    }

    /// Always false: a basis has at least one function.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Polynomial degree.
    #[inline]
    pub fn degree(&self) -> usize {
        self.degree
    }

    /// Covered range `(x_min, x_max)`.
    #[inline]
    pub fn range(&self) -> (f64, f64) {
        (self.x_min, self.x_max)
    }

    /// Values of every basis function at `x` (Cox–de Boor recursion).
    ///
    /// Points outside the covered range are clamped to it.
    pub fn evaluate_all(&self, x: f64) -> Vec<f64> {
        let x = x.clamp(self.x_min, self.x_max);
        let t = &self.knots;
        let n_intervals = t.len() - 1;

        // Degree 0: indicator of the half-open knot interval containing x
        let mut values = vec![0.0; n_intervals];
        let span = (0..n_intervals)
            .find(|&i| x >= t[i] && x < t[i + 1])
            .unwrap_or(n_intervals - 1 - self.degree);
        values[span] = 1.0;

        for p in 1..=self.degree {
            let mut next = vec![0.0; n_intervals - p];
            for (i, slot) in next.iter_mut().enumerate() {
                let left = (x - t[i]) / (t[i + p] - t[i]) * values[i];
                let right = (t[i + p + 1] - x) / (t[i + p + 1] - t[i + 1]) * values[i + 1];
                *slot = left + right;
            }
            values = next;
        }

        values
    }

    /// Value of the `j`-th basis function at `x`.
    pub fn evaluate(&self, j: usize, x: f64) -> f64 {
        self.evaluate_all(x).get(j).copied().unwrap_or(0.0)
    }
}

/// Tensor product of two 1-D B-spline sets.
#[derive(Debug, Clone, PartialEq)]
pub struct BSplineBasis2D {
    first: BSplineBasis,
    second: BSplineBasis,
}

impl BSplineBasis2D {
    /// Combine two 1-D sets.
    pub fn new(first: BSplineBasis, second: BSplineBasis) -> Self {
        Self { first, second }
    }

    /// Number of basis functions (`n₁ · n₂`).
    pub fn len(&self) -> usize {
        self.first.len() * self.second.len()
    }

    /// Always false: a basis has at least one function.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Shape `(n₁, n₂)` of the function grid.
    pub fn shape(&self) -> (usize, usize) {
        (self.first.len(), self.second.len())
    }

    /// Values of every basis function at `(x, y)`, flattened as `i * n₂ + j`.
    pub fn evaluate_all(&self, x: f64, y: f64) -> Vec<f64> {
        let fx = self.first.evaluate_all(x);
        let fy = self.second.evaluate_all(y);
        fx.iter()
            .flat_map(|a| fy.iter().map(move |b| a * b))
            .collect()
    }
}
