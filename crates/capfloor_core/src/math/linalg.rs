//! Dense linear-algebra glue over nalgebra.
//!
//! The least-squares solvers solve square systems `A δ = b` built from
//! normal equations. [`DecompositionMethod`] selects how: Cholesky is the
//! fast default for symmetric positive-definite systems, LU handles general
//! square systems, and SVD gives a minimum-norm pseudo-inverse solution for
//! rank-deficient systems.

use nalgebra::{DMatrix, DVector};

use crate::types::SolverError;

/// Relative cut-off below which singular values are treated as zero.
pub const SVD_RELATIVE_CUTOFF: f64 = 1e-12;

/// Matrix decomposition used to solve linear systems.
///
/// # Example
///
/// ```
/// use capfloor_core::math::linalg::DecompositionMethod;
/// use nalgebra::{DMatrix, DVector};
///
/// let a = DMatrix::from_row_slice(2, 2, &[4.0, 1.0, 1.0, 3.0]);
/// let b = DVector::from_vec(vec![1.0, 2.0]);
/// let x = DecompositionMethod::Cholesky.solve(&a, &b).unwrap();
/// assert!(((&a * &x) - &b).norm() < 1e-12);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "lowercase")
)]
pub enum DecompositionMethod {
    /// Cholesky factorisation (symmetric positive definite only).
    #[default]
    Cholesky,
    /// LU factorisation with partial pivoting.
    Lu,
    /// Singular value decomposition with pseudo-inverse solve.
    Svd,
}

impl DecompositionMethod {
    /// Human-readable name used in errors and logs.
    pub fn name(&self) -> &'static str {
        match self {
            DecompositionMethod::Cholesky => "Cholesky",
            DecompositionMethod::Lu => "LU",
            DecompositionMethod::Svd => "SVD",
        }
    }

    /// Solve `a x = b`.
    ///
    /// # Errors
    ///
    /// - `SolverError::DimensionMismatch` if `a` is not square or `b` has the wrong length
    /// - `SolverError::SingularMatrix` if the decomposition cannot solve the system
    pub fn solve(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let n = a.nrows();
        if a.ncols() != n {
            return Err(SolverError::dimension_mismatch("matrix columns", n, a.ncols()));
        }
        if b.len() != n {
            return Err(SolverError::dimension_mismatch("right-hand side", n, b.len()));
        }

        let singular = || SolverError::SingularMatrix {
            decomposition: self.name().to_string(),
            size: n,
        };

        let x = match self {
            DecompositionMethod::Cholesky => a.clone().cholesky().map(|c| c.solve(b)),
            DecompositionMethod::Lu => a.clone().lu().solve(b),
            DecompositionMethod::Svd => {
                let svd = a.clone().svd(true, true);
                let cutoff = svd.singular_values.max() * SVD_RELATIVE_CUTOFF;
                svd.solve(b, cutoff).ok()
            }
        }
        .ok_or_else(singular)?;

        if x.iter().all(|v| v.is_finite()) {
            Ok(x)
        } else {
            Err(singular())
        }
    }
}

/// Kronecker product `a ⊗ b`.
pub fn kronecker(a: &DMatrix<f64>, b: &DMatrix<f64>) -> DMatrix<f64> {
    a.kronecker(b)
}

/// Check symmetry to within an absolute tolerance.
pub fn is_symmetric(a: &DMatrix<f64>, tolerance: f64) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    let n = a.nrows();
    (0..n).all(|i| (0..i).all(|j| (a[(i, j)] - a[(j, i)]).abs() <= tolerance))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // DecompositionMethod Tests
    // ========================================

    #[test]
    fn test_all_methods_agree_on_spd_system() {
        let a = DMatrix::from_row_slice(3, 3, &[4.0, 1.0, 0.5, 1.0, 3.0, 0.2, 0.5, 0.2, 2.0]);
        let b = DVector::from_vec(vec![1.0, -2.0, 0.5]);

        let x_chol = DecompositionMethod::Cholesky.solve(&a, &b).unwrap();
        let x_lu = DecompositionMethod::Lu.solve(&a, &b).unwrap();
        let x_svd = DecompositionMethod::Svd.solve(&a, &b).unwrap();

        for i in 0..3 {
            assert_relative_eq!(x_chol[i], x_lu[i], epsilon = 1e-12);
            assert_relative_eq!(x_chol[i], x_svd[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_cholesky_fails_on_singular_matrix() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![1.0, 1.0]);
        let err = DecompositionMethod::Cholesky.solve(&a, &b).unwrap_err();
        assert!(matches!(err, SolverError::SingularMatrix { size: 2, .. }));
    }

    #[test]
    fn test_svd_gives_minimum_norm_solution() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 1.0, 1.0]);
        let b = DVector::from_vec(vec![2.0, 2.0]);
        let x = DecompositionMethod::Svd.solve(&a, &b).unwrap();
        assert_relative_eq!(x[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(x[1], 1.0, epsilon = 1e-10);
    }

    #[test]
    fn test_solve_rejects_non_square() {
        let a = DMatrix::zeros(2, 3);
        let b = DVector::zeros(2);
        assert!(matches!(
            DecompositionMethod::Lu.solve(&a, &b),
            Err(SolverError::DimensionMismatch { .. })
        ));
    }

    #[test]
    fn test_default_is_cholesky() {
        assert_eq!(DecompositionMethod::default(), DecompositionMethod::Cholesky);
        assert_eq!(DecompositionMethod::Svd.name(), "SVD");
    }

    // ========================================
    // Helper Tests
    // ========================================

    #[test]
    fn test_kronecker_with_identity() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 3.0, 4.0]);
        let k = kronecker(&a, &DMatrix::identity(2, 2));
        assert_eq!(k.nrows(), 4);
        assert_eq!(k[(0, 0)], 1.0);
        assert_eq!(k[(0, 2)], 2.0);
        assert_eq!(k[(3, 1)], 3.0);
        assert_eq!(k[(0, 1)], 0.0);
    }

    #[test]
    fn test_is_symmetric() {
        let a = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        assert!(is_symmetric(&a, 0.0));
        let b = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.1, 1.0]);
        assert!(!is_symmetric(&b, 1e-3));
    }
}
