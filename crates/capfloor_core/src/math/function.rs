//! Vector-valued functions with Jacobians.
//!
//! [`VectorFunction`] is the contract shared by every parameterised map in the
//! workspace: volatility parameterisations (parameters → caplet vols), pricing
//! maps (parameters → cap prices) and the residual functions handed to the
//! solvers.
//!
//! # Contract
//!
//! For a function `f: ℝᵘ → ℝᵛ`:
//! - `domain_size()` returns `u`
//! - `range_size()` returns `v`
//! - `evaluate(x)` returns `f(x)` (length `v`)
//! - `jacobian(x)` returns `∂f/∂x` as a `v × u` matrix
//!
//! Evaluation is fallible: a parameter vector can leave the region where a
//! model is defined (e.g. a negative volatility). Solvers treat a failed trial
//! evaluation as a rejected step.

use nalgebra::{DMatrix, DVector};

use crate::types::SolverError;

/// Default relative bump for finite-difference Jacobians.
pub const DEFAULT_FD_BUMP: f64 = 1e-6;

/// A differentiable map ℝᵘ → ℝᵛ with an accompanying Jacobian.
///
/// Implementations must be pure: repeated calls with the same `x` return
/// the same values. The default `jacobian` uses central finite differences;
/// implementations with analytic Jacobians should override it.
///
/// # Example
///
/// ```
/// use capfloor_core::math::function::VectorFunction;
/// use capfloor_core::types::SolverError;
/// use nalgebra::{DMatrix, DVector};
///
/// struct Square;
///
/// impl VectorFunction for Square {
///     fn domain_size(&self) -> usize { 1 }
///     fn range_size(&self) -> usize { 1 }
///     fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
///         Ok(DVector::from_element(1, x[0] * x[0]))
///     }
/// }
///
/// let jac = Square.jacobian(&DVector::from_element(1, 3.0)).unwrap();
/// assert!((jac[(0, 0)] - 6.0).abs() < 1e-6);
/// ```
pub trait VectorFunction {
    /// Dimension of the input vector.
    fn domain_size(&self) -> usize;

    /// Dimension of the output vector.
    fn range_size(&self) -> usize;

    /// Evaluate the function at `x`.
    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError>;

    /// Jacobian `∂f/∂x` at `x` (`range_size × domain_size`).
    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        finite_difference_jacobian(self, x, DEFAULT_FD_BUMP)
    }
}

impl<F: VectorFunction + ?Sized> VectorFunction for &F {
    fn domain_size(&self) -> usize {
        (**self).domain_size()
    }

    fn range_size(&self) -> usize {
        (**self).range_size()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        (**self).evaluate(x)
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        (**self).jacobian(x)
    }
}

/// Central finite-difference Jacobian.
///
/// Each column `j` is `(f(x + h e_j) - f(x - h e_j)) / 2h` with
/// `h = bump * max(|x_j|, 1)`.
pub fn finite_difference_jacobian<F: VectorFunction + ?Sized>(
    f: &F,
    x: &DVector<f64>,
    bump: f64,
) -> Result<DMatrix<f64>, SolverError> {
    check_domain(f, x)?;
    let n = f.domain_size();
    let m = f.range_size();
    let mut jac = DMatrix::zeros(m, n);

    for j in 0..n {
        let h = bump * x[j].abs().max(1.0);
        let mut up = x.clone();
        up[j] += h;
        let mut down = x.clone();
        down[j] -= h;

        let f_up = f.evaluate(&up)?;
        let f_down = f.evaluate(&down)?;
        for i in 0..m {
            jac[(i, j)] = (f_up[i] - f_down[i]) / (2.0 * h);
        }
    }

    Ok(jac)
}

/// Check that `x` has the length the function expects.
pub fn check_domain<F: VectorFunction + ?Sized>(
    f: &F,
    x: &DVector<f64>,
) -> Result<(), SolverError> {
    if x.len() != f.domain_size() {
        return Err(SolverError::dimension_mismatch(
            "function argument",
            f.domain_size(),
            x.len(),
        ));
    }
    Ok(())
}
