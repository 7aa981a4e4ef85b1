//! Newton-Raphson root finding, plain and safeguarded.

use tracing::trace;

use super::SolverConfig;
use crate::types::SolverError;

/// Derivatives below this magnitude stop a plain Newton iteration.
const MIN_DERIVATIVE: f64 = 1e-30;

/// Newton-Raphson root finder.
///
/// [`find_root`](Self::find_root) is the textbook iteration
/// `x ← x - f(x)/f'(x)`. [`find_root_bracketed`](Self::find_root_bracketed)
/// keeps a sign-change bracket and bisects whenever the Newton step would
/// leave it, which makes it safe for monotone but strongly curved functions
/// such as the Black price as a function of volatility.
///
/// # Example
///
/// ```
/// use capfloor_core::math::solvers::{NewtonRaphsonSolver, SolverConfig};
///
/// let solver = NewtonRaphsonSolver::new(SolverConfig::default());
/// let root = solver.find_root(|x| x * x - 2.0, |x| 2.0 * x, 1.0).unwrap();
/// assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
/// ```
#[derive(Debug, Clone, Default)]
pub struct NewtonRaphsonSolver {
    config: SolverConfig,
}

impl NewtonRaphsonSolver {
    /// Create a solver with the given configuration.
    pub fn new(config: SolverConfig) -> Self {
        Self { config }
    }

    /// Create a solver with the default configuration.
    pub fn with_defaults() -> Self {
        Self::default()
    }

    /// Solver configuration.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Find a root of `f` starting from `x0`.
    ///
    /// # Errors
    ///
    /// - `SolverError::DerivativeNearZero` if `|f'(x)|` vanishes
    /// - `SolverError::NumericalInstability` if an iterate is not finite
    /// - `SolverError::MaxIterationsExceeded` if `|f(x)|` never drops below tolerance
    pub fn find_root<F, G>(&self, f: F, f_prime: G, x0: f64) -> Result<f64, SolverError>
    where
        F: Fn(f64) -> f64,
        G: Fn(f64) -> f64,
    {
        let mut x = x0;
        for _ in 0..self.config.max_iterations {
            let fx = f(x);
            if fx.abs() < self.config.tolerance {
                return Ok(x);
            }
            let dfx = f_prime(x);
            if dfx.abs() < MIN_DERIVATIVE {
                return Err(SolverError::DerivativeNearZero { x });
            }
            x -= fx / dfx;
            if !x.is_finite() {
                return Err(SolverError::NumericalInstability(
                    "Newton iterate is not finite".to_string(),
                ));
            }
        }
        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        })
    }

    /// Find a root of `f` inside `[lower, upper]` starting from `x0`.
    ///
    /// The bracket must contain a sign change. Each iteration takes the
    /// Newton step if it stays strictly inside the current bracket and
    /// bisects otherwise; the bracket shrinks every iteration.
    ///
    /// # Errors
    ///
    /// - `SolverError::NoBracket` if `f(lower)` and `f(upper)` share a sign
    /// - `SolverError::MaxIterationsExceeded` if the iteration cap is reached
    pub fn find_root_bracketed<F, G>(
        &self,
        f: F,
        f_prime: G,
        x0: f64,
        lower: f64,
        upper: f64,
    ) -> Result<f64, SolverError>
    where
        F: Fn(f64) -> f64,
        G: Fn(f64) -> f64,
    {
        let f_lower = f(lower);
        let f_upper = f(upper);
        if f_lower.abs() < self.config.tolerance {
            return Ok(lower);
        }
        if f_upper.abs() < self.config.tolerance {
            return Ok(upper);
        }
        if f_lower * f_upper > 0.0 {
            return Err(SolverError::NoBracket { a: lower, b: upper });
        }

        // Orient so that f(neg) < 0 < f(pos)
        let (mut neg, mut pos) = if f_lower < 0.0 {
            (lower, upper)
        } else {
            (upper, lower)
        };
        let mut x = x0.clamp(lower.min(upper), lower.max(upper));

        for iteration in 0..self.config.max_iterations {
            let fx = f(x);
            if fx.abs() < self.config.tolerance {
                trace!(iteration, x, "bracketed Newton converged");
                return Ok(x);
            }
            if fx < 0.0 {
                neg = x;
            } else {
                pos = x;
            }
            if (pos - neg).abs() < self.config.tolerance * (1.0 + x.abs()) {
                return Ok(x);
            }

            let dfx = f_prime(x);
            let newton = x - fx / dfx;
            let (lo, hi) = (neg.min(pos), neg.max(pos));
            x = if dfx.abs() > MIN_DERIVATIVE && newton > lo && newton < hi {
                newton
            } else {
                0.5 * (neg + pos)
            };
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    // ========================================
    // Plain Newton Tests
    // ========================================

    #[test]
    fn test_find_cube_root() {
        let solver = NewtonRaphsonSolver::with_defaults();
        let root = solver
            .find_root(|x| x * x * x - 27.0, |x| 3.0 * x * x, 2.0)
            .unwrap();
        assert_relative_eq!(root, 3.0, epsilon = 1e-10);
    }

    #[test]
    fn test_zero_derivative() {
        let solver = NewtonRaphsonSolver::with_defaults();
        let err = solver.find_root(|x| x * x + 1.0, |x| 2.0 * x, 0.0).unwrap_err();
        assert_eq!(err, SolverError::DerivativeNearZero { x: 0.0 });
    }

    #[test]
    fn test_max_iterations() {
        let solver = NewtonRaphsonSolver::new(SolverConfig::new(1e-12, 5));
        // No real root: iterates wander without converging
        let err = solver
            .find_root(|x| x * x + 1.0, |x| 2.0 * x, 0.5)
            .unwrap_err();
        assert_eq!(err, SolverError::MaxIterationsExceeded { iterations: 5 });
    }

    // ========================================
    // Bracketed Newton Tests
    // ========================================

    #[test]
    fn test_bracketed_survives_bad_start() {
        // Plain Newton from x0 = 3 on atan overshoots and diverges
        let solver = NewtonRaphsonSolver::with_defaults();
        let f = |x: f64| x.atan();
        let df = |x: f64| 1.0 / (1.0 + x * x);
        assert!(solver.find_root(f, df, 3.0).is_err());

        let root = solver.find_root_bracketed(f, df, 3.0, -5.0, 4.0).unwrap();
        assert!(root.abs() < 1e-10);
    }

    #[test]
    fn test_bracketed_decreasing_function() {
        let solver = NewtonRaphsonSolver::with_defaults();
        let root = solver
            .find_root_bracketed(|x| 2.0 - x, |_| -1.0, 0.0, 0.0, 10.0)
            .unwrap();
        assert_relative_eq!(root, 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_bracketed_no_sign_change() {
        let solver = NewtonRaphsonSolver::with_defaults();
        let err = solver
            .find_root_bracketed(|x| x * x + 1.0, |x| 2.0 * x, 0.5, 0.0, 1.0)
            .unwrap_err();
        assert_eq!(err, SolverError::NoBracket { a: 0.0, b: 1.0 });
    }
}
