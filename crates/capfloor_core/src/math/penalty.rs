//! Finite-difference penalty matrices.
//!
//! A penalty matrix `P` adds the quadratic term `xᵀ P x` to a least-squares
//! objective, penalising roughness of the parameter vector. All builders
//! return symmetric positive semi-definite matrices.
//!
//! For a 2-D parameter grid of shape `(m₁, m₂)`, parameters are flattened
//! with index `i * m₂ + j`, where `i` runs along the first dimension.

use nalgebra::DMatrix;

use crate::math::linalg::kronecker;
use crate::types::SolverError;

/// k-th order forward-difference matrix of shape `(m - k) × m`.
///
/// Order 0 is the identity. Row `r` of the order-k matrix applied to `x`
/// gives `Δᵏ x_r` (e.g. order 2: `x_r - 2x_{r+1} + x_{r+2}`).
///
/// # Errors
///
/// Returns `SolverError::DimensionMismatch` if `k >= m` (and `m > 0`).
///
/// # Example
///
/// ```
/// use capfloor_core::math::penalty::difference_matrix;
///
/// let d = difference_matrix(4, 2).unwrap();
/// assert_eq!(d.shape(), (2, 4));
/// assert_eq!(d.row(0).iter().copied().collect::<Vec<_>>(), vec![1.0, -2.0, 1.0, 0.0]);
/// ```
pub fn difference_matrix(m: usize, k: usize) -> Result<DMatrix<f64>, SolverError> {
    if k == 0 {
        return Ok(DMatrix::identity(m, m));
    }
    if k >= m {
        return Err(SolverError::dimension_mismatch(
            "difference order (must be below size)",
            m.saturating_sub(1),
            k,
        ));
    }

    let mut d = DMatrix::identity(m, m);
    for order in 1..=k {
        let rows = m - order;
        let mut next = DMatrix::zeros(rows, m);
        for r in 0..rows {
            for c in 0..m {
                next[(r, c)] = d[(r + 1, c)] - d[(r, c)];
            }
        }
        d = next;
    }
    Ok(d)
}

/// Penalty matrix `λ DᵀD` for a k-th order difference on `m` parameters.
pub fn penalty_matrix(m: usize, k: usize, lambda: f64) -> Result<DMatrix<f64>, SolverError> {
    let d = difference_matrix(m, k)?;
    Ok(d.transpose() * d * lambda)
}

/// Penalty matrix on a flattened 2-D grid.
///
/// `P = λ₁ (D₁ᵀD₁ ⊗ I₂) + λ₂ (I₁ ⊗ D₂ᵀD₂)`, penalising differences of order
/// `orders[0]` along the first dimension and `orders[1]` along the second.
pub fn penalty_matrix_2d(
    sizes: [usize; 2],
    orders: [usize; 2],
    lambdas: [f64; 2],
) -> Result<DMatrix<f64>, SolverError> {
    let [m1, m2] = sizes;
    let p1 = penalty_matrix(m1, orders[0], lambdas[0])?;
    let p2 = penalty_matrix(m2, orders[1], lambdas[1])?;
    Ok(kronecker(&p1, &DMatrix::identity(m2, m2)) + kronecker(&DMatrix::identity(m1, m1), &p2))
}

/// Penalty matrix for parameters attached to non-uniformly spaced nodes.
///
/// Differences are divided by node spacing so that the penalty approximates
/// a derivative norm: order 1 uses `(x_{i+1} - x_i)/h_i`, order 2 uses the
/// standard three-point second-derivative stencil on an uneven grid.
///
/// # Errors
///
/// - `SolverError::DimensionMismatch` if there are too few nodes for the order,
///   or the order is not 0, 1 or 2
/// - `SolverError::NumericalInstability` if nodes are not strictly increasing
pub fn penalty_matrix_non_uniform(
    nodes: &[f64],
    k: usize,
    lambda: f64,
) -> Result<DMatrix<f64>, SolverError> {
    let m = nodes.len();
    if k > 2 {
        return Err(SolverError::dimension_mismatch("non-uniform difference order", 2, k));
    }
    if k == 0 {
        return Ok(DMatrix::identity(m, m) * lambda);
    }
    if m <= k {
        return Err(SolverError::dimension_mismatch("node count", k + 1, m));
    }
    if let Some(i) = nodes.windows(2).position(|w| w[1] <= w[0]) {
        return Err(SolverError::NumericalInstability(format!(
            "penalty nodes not strictly increasing at index {}",
            i + 1
        )));
    }

    let h: Vec<f64> = nodes.windows(2).map(|w| w[1] - w[0]).collect();
    let mut d = DMatrix::zeros(m - k, m);
    match k {
        1 => {
            for i in 0..m - 1 {
                d[(i, i)] = -1.0 / h[i];
                d[(i, i + 1)] = 1.0 / h[i];
            }
        }
        _ => {
            for i in 0..m - 2 {
                let (h0, h1) = (h[i], h[i + 1]);
                d[(i, i)] = 2.0 / (h0 * (h0 + h1));
                d[(i, i + 1)] = -2.0 / (h0 * h1);
                d[(i, i + 2)] = 2.0 / (h1 * (h0 + h1));
            }
        }
    }
    Ok(d.transpose() * d * lambda)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::math::linalg::is_symmetric;
    use approx::assert_relative_eq;
    use nalgebra::DVector;

    #[test]
    fn test_first_order_difference_rows() {
        let d = difference_matrix(3, 1).unwrap();
        assert_eq!(d.shape(), (2, 3));
        assert_eq!(d[(0, 0)], -1.0);
        assert_eq!(d[(0, 1)], 1.0);
        assert_eq!(d[(1, 2)], 1.0);
    }

    #[test]
    fn test_difference_order_too_large() {
        assert!(difference_matrix(2, 2).is_err());
    }

    #[test]
    fn test_second_order_penalty_ignores_lines() {
        let p = penalty_matrix(5, 2, 3.0).unwrap();
        let line = DVector::from_fn(5, |i, _| 0.5 + 0.1 * i as f64);
        let q = line.dot(&(&p * &line));
        assert_relative_eq!(q, 0.0, epsilon = 1e-14);

        let bumpy = DVector::from_vec(vec![0.0, 1.0, 0.0, 1.0, 0.0]);
        assert!(bumpy.dot(&(&p * &bumpy)) > 0.0);
        assert!(is_symmetric(&p, 1e-14));
    }

    #[test]
    fn test_2d_penalty_shape_and_separability() {
        let p = penalty_matrix_2d([3, 4], [1, 1], [1.0, 0.0]).unwrap();
        assert_eq!(p.shape(), (12, 12));
        // Varies only along the second dimension, which carries zero weight
        let x = DVector::from_fn(12, |idx, _| (idx % 4) as f64);
        assert_relative_eq!(x.dot(&(&p * &x)), 0.0, epsilon = 1e-14);
        // Varies along the first dimension
        let y = DVector::from_fn(12, |idx, _| (idx / 4) as f64);
        assert!(y.dot(&(&p * &y)) > 0.0);
    }

    #[test]
    fn test_non_uniform_matches_uniform_when_spacing_is_one() {
        let nodes = [0.0, 1.0, 2.0, 3.0];
        let uniform = penalty_matrix(4, 2, 1.0).unwrap();
        let scaled = penalty_matrix_non_uniform(&nodes, 2, 1.0).unwrap();
        for i in 0..4 {
            for j in 0..4 {
                assert_relative_eq!(uniform[(i, j)], scaled[(i, j)], epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_non_uniform_rejects_unsorted_nodes() {
        assert!(matches!(
            penalty_matrix_non_uniform(&[0.0, 2.0, 1.0], 1, 1.0),
            Err(SolverError::NumericalInstability(_))
        ));
    }
}
