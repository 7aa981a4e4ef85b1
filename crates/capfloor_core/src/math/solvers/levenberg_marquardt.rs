//! Levenberg-Marquardt nonlinear least-squares solver.
//!
//! Minimises the (optionally penalised) weighted sum of squares
//!
//! ```text
//! Φ(x) = Σᵢ ((fᵢ(x) - yᵢ) / σᵢ)² + xᵀ P x
//! ```
//!
//! using the analytic Jacobian of a [`VectorFunction`]. With weighted
//! residuals `r` and weighted Jacobian `J` each iteration solves
//!
//! ```text
//! (JᵀJ + P + λ D) δ = -(Jᵀr + P x)
//! ```
//!
//! where `D` is the diagonal of `JᵀJ + P` (Marquardt scaling). Steps that
//! leave the allowed domain, fail to evaluate, or do not reduce `Φ` are
//! rejected and `λ` is increased.
//!
//! # Convergence
//!
//! The solver reports convergence when any of the following holds:
//! - the gradient `Jᵀr + P x` is below `gradient_tolerance` (max norm)
//! - the step satisfies `‖δ‖ ≤ param_tolerance · (‖x‖ + param_tolerance)`
//! - an accepted step reduces `Φ` by less than `tolerance · Φ`
//!
//! Reaching `max_iterations` or `max_lambda` yields `converged == false`.

use nalgebra::{DMatrix, DVector};
use tracing::{debug, trace};

use crate::math::function::{check_domain, VectorFunction};
use crate::math::linalg::DecompositionMethod;
use crate::types::SolverError;

/// Smallest diagonal scaling relative to the largest diagonal element.
const DIAGONAL_FLOOR: f64 = 1e-12;

/// Configuration for [`LevenbergMarquardtSolver`].
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct LMConfig {
    /// Relative objective reduction below which an accepted step ends the search.
    pub tolerance: f64,
    /// Gradient max-norm below which the search ends.
    pub gradient_tolerance: f64,
    /// Relative step size below which the search ends.
    pub param_tolerance: f64,
    /// Iteration cap (accepted and rejected trial steps both count).
    pub max_iterations: usize,
    /// Initial damping factor.
    pub initial_lambda: f64,
    /// Multiplier applied to λ on a rejected step.
    pub lambda_up: f64,
    /// Multiplier applied to λ on an accepted step.
    pub lambda_down: f64,
    /// Lower bound for λ.
    pub min_lambda: f64,
    /// λ above which the search is abandoned.
    pub max_lambda: f64,
    /// Decomposition used for the damped normal equations.
    pub decomposition: DecompositionMethod,
}

impl Default for LMConfig {
    fn default() -> Self {
        Self {
            tolerance: 1e-12,
            gradient_tolerance: 1e-15,
            param_tolerance: 1e-10,
            max_iterations: 200,
            initial_lambda: 1e-3,
            lambda_up: 10.0,
            lambda_down: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
            decomposition: DecompositionMethod::Cholesky,
        }
    }
}

impl LMConfig {
    /// Default configuration with a given tolerance and iteration cap.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
            ..Default::default()
        }
    }

    /// Relaxed tolerances and fewer iterations.
    pub fn fast() -> Self {
        Self {
            tolerance: 1e-8,
            param_tolerance: 1e-8,
            max_iterations: 50,
            ..Default::default()
        }
    }

    /// Tight tolerances and more iterations.
    pub fn high_precision() -> Self {
        Self {
            tolerance: 1e-15,
            param_tolerance: 1e-13,
            max_iterations: 1000,
            ..Default::default()
        }
    }

    /// Same configuration with a different decomposition.
    pub fn with_decomposition(self, decomposition: DecompositionMethod) -> Self {
        Self {
            decomposition,
            ..self
        }
    }
}

/// Result of a Levenberg-Marquardt search.
#[derive(Debug, Clone, PartialEq)]
pub struct LMResult {
    /// Final parameters.
    pub params: DVector<f64>,
    /// Weighted sum of squared residuals (penalty excluded).
    pub chi_sq: f64,
    /// Penalty term `xᵀ P x` (zero without a penalty matrix).
    pub penalty: f64,
    /// Iterations performed.
    pub iterations: usize,
    /// Whether a convergence criterion was met.
    pub converged: bool,
    /// Final damping factor.
    pub final_lambda: f64,
}

impl LMResult {
    /// Total objective `chi_sq + penalty`.
    pub fn objective(&self) -> f64 {
        self.chi_sq + self.penalty
    }

    /// Root mean square of the weighted residuals.
    pub fn rmse(&self, n_observations: usize) -> f64 {
        if n_observations == 0 {
            return 0.0;
        }
        (self.chi_sq / n_observations as f64).sqrt()
    }
}

/// Levenberg-Marquardt solver for weighted, optionally penalised, least squares.
///
/// # Example
///
/// ```
/// use capfloor_core::math::function::VectorFunction;
/// use capfloor_core::math::solvers::LevenbergMarquardtSolver;
/// use capfloor_core::types::SolverError;
/// use nalgebra::{DMatrix, DVector};
///
/// // Fit y = a exp(-b t)
/// struct Decay(Vec<f64>);
///
/// impl VectorFunction for Decay {
///     fn domain_size(&self) -> usize { 2 }
///     fn range_size(&self) -> usize { self.0.len() }
///     fn evaluate(&self, p: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
///         Ok(DVector::from_iterator(self.0.len(), self.0.iter().map(|t| p[0] * (-p[1] * t).exp())))
///     }
///     fn jacobian(&self, p: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
///         Ok(DMatrix::from_fn(self.0.len(), 2, |i, j| {
///             let e = (-p[1] * self.0[i]).exp();
///             if j == 0 { e } else { -p[0] * self.0[i] * e }
///         }))
///     }
/// }
///
/// let model = Decay(vec![0.0, 1.0, 2.0, 3.0]);
/// let observed = model.evaluate(&DVector::from_vec(vec![2.0, 0.5])).unwrap();
/// let sigma = DVector::from_element(4, 1.0);
/// let result = LevenbergMarquardtSolver::with_defaults()
///     .solve(&model, &observed, &sigma, DVector::from_vec(vec![1.0, 1.0]))
///     .unwrap();
/// assert!(result.converged);
/// assert!((result.params[1] - 0.5).abs() < 1e-8);
/// ```
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardtSolver {
    config: LMConfig,
}

impl LevenbergMarquardtSolver {
    /// Create a solver with the given configuration.
    pub fn new(config: LMConfig) -> Self {
        Self { config }
    }

    /// Create a solver with the default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Solver configuration.
    pub fn config(&self) -> &LMConfig {
        &self.config
    }

    /// Minimise `Σ ((f(x) - observed) / sigma)²` from `start`.
    ///
    /// # Errors
    ///
    /// - `SolverError::DimensionMismatch` for inconsistent sizes
    /// - `SolverError::NumericalInstability` if any `sigma` is not positive
    /// - `SolverError::SingularMatrix` if the damped system cannot be solved
    /// - Any error raised by evaluating `f` at `start`
    pub fn solve<F: VectorFunction + ?Sized>(
        &self,
        f: &F,
        observed: &DVector<f64>,
        sigma: &DVector<f64>,
        start: DVector<f64>,
    ) -> Result<LMResult, SolverError> {
        self.run(f, observed, sigma, start, None, &|_| true)
    }

    /// Minimise `Σ ((f(x) - observed) / sigma)² + xᵀ P x` from `start`.
    ///
    /// Trial points for which `allowed` returns false are rejected.
    ///
    /// # Errors
    ///
    /// As [`solve`](Self::solve), plus:
    /// - `SolverError::DimensionMismatch` if `penalty` is not `n × n`
    /// - `SolverError::InvalidStart` if `allowed(start)` is false
    pub fn solve_with_penalty<F, A>(
        &self,
        f: &F,
        observed: &DVector<f64>,
        sigma: &DVector<f64>,
        start: DVector<f64>,
        penalty: &DMatrix<f64>,
        allowed: A,
    ) -> Result<LMResult, SolverError>
    where
        F: VectorFunction + ?Sized,
        A: Fn(&DVector<f64>) -> bool,
    {
        self.run(f, observed, sigma, start, Some(penalty), &allowed)
    }

    fn run<F: VectorFunction + ?Sized>(
        &self,
        f: &F,
        observed: &DVector<f64>,
        sigma: &DVector<f64>,
        start: DVector<f64>,
        penalty: Option<&DMatrix<f64>>,
        allowed: &dyn Fn(&DVector<f64>) -> bool,
    ) -> Result<LMResult, SolverError> {
        let n = f.domain_size();
        let m = f.range_size();
        check_domain(f, &start)?;
        if observed.len() != m {
            return Err(SolverError::dimension_mismatch("observed values", m, observed.len()));
        }
        if sigma.len() != m {
            return Err(SolverError::dimension_mismatch("sigma", m, sigma.len()));
        }
        if let Some(i) = sigma.iter().position(|s| !(*s > 0.0) || !s.is_finite()) {
            return Err(SolverError::NumericalInstability(format!(
                "sigma[{}] = {} must be positive",
                i, sigma[i]
            )));
        }
        if let Some(p) = penalty {
            if p.nrows() != n || p.ncols() != n {
                return Err(SolverError::dimension_mismatch(
                    "penalty matrix size",
                    n,
                    if p.nrows() != n { p.nrows() } else { p.ncols() },
                ));
            }
        }
        if !allowed(&start) {
            return Err(SolverError::InvalidStart(
                "start is outside the allowed parameter domain".to_string(),
            ));
        }

        let objective = |x: &DVector<f64>| -> Result<(DVector<f64>, f64, f64), SolverError> {
            let model = f.evaluate(x)?;
            let r = (model - observed).component_div(sigma);
            let chi_sq = r.norm_squared();
            let pen = penalty.map_or(0.0, |p| x.dot(&(p * x)));
            if chi_sq.is_finite() && pen.is_finite() {
                Ok((r, chi_sq, pen))
            } else {
                Err(SolverError::NumericalInstability(
                    "objective is not finite".to_string(),
                ))
            }
        };

        let mut x = start;
        let (mut r, mut chi_sq, mut pen) = objective(&x)?;
        let mut lambda = self.config.initial_lambda;
        let mut system: Option<(DMatrix<f64>, DVector<f64>)> = None;

        let finish = |x: DVector<f64>,
                      chi_sq: f64,
                      pen: f64,
                      iterations: usize,
                      converged: bool,
                      lambda: f64|
         -> Result<LMResult, SolverError> {
            debug!(
                iterations,
                chi_sq,
                penalty = pen,
                converged,
                decomposition = self.config.decomposition.name(),
                "Levenberg-Marquardt finished"
            );
            Ok(LMResult {
                params: x,
                chi_sq,
                penalty: pen,
                iterations,
                converged,
                final_lambda: lambda,
            })
        };

        for iteration in 0..self.config.max_iterations {
            // Normal equations are rebuilt only after an accepted step
            let (a, g) = match system.take() {
                Some(s) => s,
                None => {
                    let jac = f.jacobian(&x)?;
                    if jac.nrows() != m || jac.ncols() != n {
                        return Err(SolverError::dimension_mismatch("jacobian rows", m, jac.nrows()));
                    }
                    let jw = DMatrix::from_fn(m, n, |i, j| jac[(i, j)] / sigma[i]);
                    let mut a = jw.transpose() * &jw;
                    let mut g = jw.transpose() * &r;
                    if let Some(p) = penalty {
                        a += p;
                        g += p * &x;
                    }
                    (a, g)
                }
            };

            if g.amax() <= self.config.gradient_tolerance {
                return finish(x, chi_sq, pen, iteration, true, lambda);
            }

            let max_diag = a.diagonal().amax();
            let floor = (max_diag * DIAGONAL_FLOOR).max(f64::MIN_POSITIVE);
            let mut damped = a.clone();
            for i in 0..n {
                damped[(i, i)] += lambda * a[(i, i)].max(floor);
            }
            let delta = self.config.decomposition.solve(&damped, &(-&g))?;

            if delta.norm() <= self.config.param_tolerance * (x.norm() + self.config.param_tolerance) {
                return finish(x, chi_sq, pen, iteration, true, lambda);
            }

            let trial = &x + &delta;
            let accepted = if allowed(&trial) {
                objective(&trial)
                    .ok()
                    .filter(|(_, c, p)| c + p < chi_sq + pen)
            } else {
                None
            };

            match accepted {
                Some((trial_r, trial_chi, trial_pen)) => {
                    let old = chi_sq + pen;
                    let new = trial_chi + trial_pen;
                    trace!(iteration, objective = new, lambda, "step accepted");
                    x = trial;
                    r = trial_r;
                    chi_sq = trial_chi;
                    pen = trial_pen;
                    lambda = (lambda * self.config.lambda_down).max(self.config.min_lambda);
                    if old - new <= self.config.tolerance * old {
                        return finish(x, chi_sq, pen, iteration + 1, true, lambda);
                    }
                }
                None => {
                    lambda *= self.config.lambda_up;
                    trace!(iteration, lambda, "step rejected");
                    if lambda > self.config.max_lambda {
                        return finish(x, chi_sq, pen, iteration + 1, false, lambda);
                    }
                    system = Some((a, g));
                }
            }
        }

        finish(x, chi_sq, pen, self.config.max_iterations, false, lambda)
    }
}
