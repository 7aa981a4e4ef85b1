//! Multidimensional Newton root finding with backtracking.
//!
//! Solves `f(x) = target` for square systems (`domain_size == range_size`)
//! using the analytic Jacobian of a [`VectorFunction`]. Failure to converge
//! is reported through [`RootFindStatus`] rather than as an error, so callers
//! can inspect the outcome and fall back to least squares.

use nalgebra::DVector;
use tracing::{debug, trace};

use crate::math::function::{check_domain, VectorFunction};
use crate::math::linalg::DecompositionMethod;
use crate::types::SolverError;

/// Configuration for [`NewtonVectorRootFinder`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct VectorRootConfig {
    /// Absolute tolerance on `max |f(x) - target|`.
    pub abs_tolerance: f64,
    /// Tolerance relative to `max |target|`.
    pub rel_tolerance: f64,
    /// Newton iteration cap.
    pub max_iterations: usize,
    /// Step halvings allowed per iteration.
    pub max_backtracks: usize,
    /// Decomposition used for the Newton system.
    pub decomposition: DecompositionMethod,
}

impl Default for VectorRootConfig {
    fn default() -> Self {
        Self {
            abs_tolerance: 1e-12,
            rel_tolerance: 1e-10,
            max_iterations: 50,
            max_backtracks: 20,
            decomposition: DecompositionMethod::Lu,
        }
    }
}

/// Outcome of a vector root search.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RootFindStatus {
    /// Residual within tolerance
    Converged,
    /// Iteration cap reached
    MaxIterationsExceeded,
    /// Newton system could not be solved
    SingularJacobian,
    /// No step along the Newton direction reduced the residual
    NoDescent,
    /// The function or its Jacobian could not be evaluated
    EvaluationFailed,
}

/// Result of a vector root search.
#[derive(Debug, Clone, PartialEq)]
pub struct RootFindResult {
    /// Final iterate
    pub x: DVector<f64>,
    /// `max |f(x) - target|` at the final iterate
    pub residual_norm: f64,
    /// Newton iterations performed
    pub iterations: usize,
    /// Termination status
    pub status: RootFindStatus,
}

impl RootFindResult {
    /// Whether the search converged.
    pub fn converged(&self) -> bool {
        self.status == RootFindStatus::Converged
    }
}

/// Newton's method for `f(x) = target` with step-halving line search.
///
/// # Example
///
/// ```
/// use capfloor_core::math::function::VectorFunction;
/// use capfloor_core::math::solvers::NewtonVectorRootFinder;
/// use capfloor_core::types::SolverError;
/// use nalgebra::{DMatrix, DVector};
///
/// struct Squares;
///
/// impl VectorFunction for Squares {
///     fn domain_size(&self) -> usize { 2 }
///     fn range_size(&self) -> usize { 2 }
///     fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
///         Ok(x.map(|v| v * v))
///     }
///     fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
///         Ok(DMatrix::from_diagonal(&x.map(|v| 2.0 * v)))
///     }
/// }
///
/// let target = DVector::from_vec(vec![4.0, 9.0]);
/// let result = NewtonVectorRootFinder::with_defaults()
///     .find_root(&Squares, &target, DVector::from_vec(vec![1.0, 1.0]))
///     .unwrap();
/// assert!(result.converged());
/// assert!((result.x[1] - 3.0).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewtonVectorRootFinder {
    config: VectorRootConfig,
}

impl NewtonVectorRootFinder {
    /// Create a root finder with the given configuration.
    pub fn new(config: VectorRootConfig) -> Self {
        Self { config }
    }

    /// Create a root finder with the default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Root finder configuration.
    pub fn config(&self) -> &VectorRootConfig {
        &self.config
    }

    /// Solve `f(x) = target` from `x0`.
    ///
    /// # Errors
    ///
    /// Returns `SolverError::DimensionMismatch` if the system is not square or
    /// `target`/`x0` have the wrong length. Every numerical failure is
    /// reported through [`RootFindResult::status`].
    pub fn find_root<F: VectorFunction + ?Sized>(
        &self,
        f: &F,
        target: &DVector<f64>,
        x0: DVector<f64>,
    ) -> Result<RootFindResult, SolverError> {
        if f.domain_size() != f.range_size() {
            return Err(SolverError::dimension_mismatch(
                "square system (range size)",
                f.domain_size(),
                f.range_size(),
            ));
        }
        if target.len() != f.range_size() {
            return Err(SolverError::dimension_mismatch(
                "root-find target",
                f.range_size(),
                target.len(),
            ));
        }
        check_domain(f, &x0)?;

        let tolerance = self.config.abs_tolerance + self.config.rel_tolerance * target.amax();
        let mut x = x0;

        let finish = |x: DVector<f64>,
                      residual_norm: f64,
                      iterations: usize,
                      status: RootFindStatus|
         -> Result<RootFindResult, SolverError> {
            debug!(iterations, residual_norm, ?status, "vector root search finished");
            Ok(RootFindResult {
                x,
                residual_norm,
                iterations,
                status,
            })
        };

        let mut residual = match f.evaluate(&x) {
            Ok(v) => v - target,
            Err(_) => return finish(x, f64::INFINITY, 0, RootFindStatus::EvaluationFailed),
        };
        let mut norm = residual.amax();

        for iteration in 0..self.config.max_iterations {
            if norm <= tolerance {
                return finish(x, norm, iteration, RootFindStatus::Converged);
            }

            let jacobian = match f.jacobian(&x) {
                Ok(j) => j,
                Err(_) => return finish(x, norm, iteration, RootFindStatus::EvaluationFailed),
            };
            let step = match self.config.decomposition.solve(&jacobian, &(-&residual)) {
                Ok(s) => s,
                Err(_) => return finish(x, norm, iteration, RootFindStatus::SingularJacobian),
            };

            let mut scale = 1.0;
            let mut accepted = None;
            for _ in 0..=self.config.max_backtracks {
                let trial = &x + &step * scale;
                if let Ok(value) = f.evaluate(&trial) {
                    let trial_residual = value - target;
                    let trial_norm = trial_residual.amax();
                    if trial_norm.is_finite() && trial_norm < norm {
                        accepted = Some((trial, trial_residual, trial_norm));
                        break;
                    }
                }
                scale *= 0.5;
            }

            match accepted {
                Some((trial, trial_residual, trial_norm)) => {
                    trace!(iteration, scale, residual = trial_norm, "Newton step accepted");
                    x = trial;
                    residual = trial_residual;
                    norm = trial_norm;
                }
                None => return finish(x, norm, iteration, RootFindStatus::NoDescent),
            }
        }

        let status = if norm <= tolerance {
            RootFindStatus::Converged
        } else {
            RootFindStatus::MaxIterationsExceeded
        };
        finish(x, norm, self.config.max_iterations, status)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::DMatrix;

    /// f(x) = (x0 + x1, x0 * x1)
    struct SumProduct;

    impl VectorFunction for SumProduct {
        fn domain_size(&self) -> usize {
            2
        }

        fn range_size(&self) -> usize {
            2
        }

        fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
            Ok(DVector::from_vec(vec![x[0] + x[1], x[0] * x[1]]))
        }

        fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
            Ok(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, x[1], x[0]]))
        }
    }

    /// Rank-deficient everywhere
    struct Degenerate;

    impl VectorFunction for Degenerate {
        fn domain_size(&self) -> usize {
            2
        }

        fn range_size(&self) -> usize {
            2
        }

        fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
            let s = x[0] + x[1];
            Ok(DVector::from_vec(vec![s, 2.0 * s]))
        }

        fn jacobian(&self, _x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
            Ok(DMatrix::from_row_slice(2, 2, &[1.0, 1.0, 2.0, 2.0]))
        }
    }

    #[test]
    fn test_solves_sum_product_system() {
        let target = DVector::from_vec(vec![5.0, 6.0]);
        let result = NewtonVectorRootFinder::with_defaults()
            .find_root(&SumProduct, &target, DVector::from_vec(vec![1.0, 4.0]))
            .unwrap();
        assert!(result.converged());
        assert!((result.x[0] - 2.0).abs() < 1e-9);
        assert!((result.x[1] - 3.0).abs() < 1e-9);
    }

    #[test]
    fn test_singular_jacobian_is_reported_as_status() {
        let target = DVector::from_vec(vec![1.0, 3.0]);
        let result = NewtonVectorRootFinder::with_defaults()
            .find_root(&Degenerate, &target, DVector::zeros(2))
            .unwrap();
        assert!(!result.converged());
        assert_eq!(result.status, RootFindStatus::SingularJacobian);
    }

    #[test]
    fn test_already_at_root() {
        let target = DVector::from_vec(vec![5.0, 6.0]);
        let result = NewtonVectorRootFinder::with_defaults()
            .find_root(&SumProduct, &target, DVector::from_vec(vec![2.0, 3.0]))
            .unwrap();
        assert!(result.converged());
        assert_eq!(result.iterations, 0);
    }

    #[test]
    fn test_dimension_errors() {
        let finder = NewtonVectorRootFinder::with_defaults();
        assert!(finder
            .find_root(&SumProduct, &DVector::zeros(3), DVector::zeros(2))
            .is_err());
        assert!(finder
            .find_root(&SumProduct, &DVector::zeros(2), DVector::zeros(3))
            .is_err());
    }
}
