//! Brent's method root finding.

use super::SolverConfig;
use crate::types::SolverError;

/// Growth factor used when expanding a bracket outwards.
const BRACKET_GROWTH: f64 = 1.6;

/// Brent root finder (bisection, secant and inverse quadratic interpolation).
///
/// Converges for any continuous function given a sign-change bracket.
///
/// # Example
///
/// ```
/// use capfloor_core::math::solvers::{BrentSolver, SolverConfig};
///
/// let solver = BrentSolver::new(SolverConfig::default());
/// let f = |x: f64| x * x * x - x - 2.0;
/// let root = solver.find_root(f, 1.0, 2.0).unwrap();
/// assert!(f(root).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, Default)]
pub struct BrentSolver {
    config: SolverConfig,
}

impl BrentSolver {
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

    /// Find a root of `f` in `[a, b]`.
    ///
    /// # Errors
    ///
    /// - `SolverError::NoBracket` if `f(a)` and `f(b)` share a sign
    /// - `SolverError::MaxIterationsExceeded` if the iteration cap is reached
    pub fn find_root<F>(&self, f: F, a: f64, b: f64) -> Result<f64, SolverError>
    where
        F: Fn(f64) -> f64,
    {
        let tol = self.config.tolerance;
        let (mut a, mut b) = (a, b);
        let (mut fa, mut fb) = (f(a), f(b));

        if fa == 0.0 {
            return Ok(a);
        }
        if fb == 0.0 {
            return Ok(b);
        }
        if fa * fb > 0.0 {
            return Err(SolverError::NoBracket { a, b });
        }

        let (mut c, mut fc) = (b, fb);
        let mut d = b - a;
        let mut e = d;

        for _ in 0..self.config.max_iterations {
            if fb * fc > 0.0 {
                // Root lies between a and b; restart the contrapoint
                c = a;
                fc = fa;
                d = b - a;
                e = d;
            }
            if fc.abs() < fb.abs() {
                a = b;
                b = c;
                c = a;
                fa = fb;
                fb = fc;
                fc = fa;
            }

            let tol1 = 2.0 * f64::EPSILON * b.abs() + 0.5 * tol;
            let xm = 0.5 * (c - b);
            if xm.abs() <= tol1 || fb.abs() < tol {
                return Ok(b);
            }

            if e.abs() >= tol1 && fa.abs() > fb.abs() {
                let s = fb / fa;
                let (mut p, mut q) = if a == c {
                    // Secant
                    (2.0 * xm * s, 1.0 - s)
                } else {
                    // Inverse quadratic interpolation
                    let q = fa / fc;
                    let r = fb / fc;
                    (
                        s * (2.0 * xm * q * (q - r) - (b - a) * (r - 1.0)),
                        (q - 1.0) * (r - 1.0) * (s - 1.0),
                    )
                };
                if p > 0.0 {
                    q = -q;
                }
                p = p.abs();
                let min1 = 3.0 * xm * q - (tol1 * q).abs();
                let min2 = (e * q).abs();
                if 2.0 * p < min1.min(min2) {
                    e = d;
                    d = p / q;
                } else {
                    d = xm;
                    e = d;
                }
            } else {
                d = xm;
                e = d;
            }

            a = b;
            fa = fb;
            b += if d.abs() > tol1 { d } else { tol1.copysign(xm) };
            fb = f(b);
        }

        Err(SolverError::MaxIterationsExceeded {
            iterations: self.config.max_iterations,
        })
    }

    /// Expand `[a, b]` geometrically until it brackets a sign change.
    ///
    /// Returns the bracket, or `SolverError::NoBracket` after
    /// `max_iterations` expansions. Expansion is stopped at the optional
    /// `floor` on the left (e.g. zero for volatilities).
    pub fn bracket<F>(
        &self,
        f: F,
        a: f64,
        b: f64,
        floor: Option<f64>,
    ) -> Result<(f64, f64), SolverError>
    where
        F: Fn(f64) -> f64,
    {
        let (mut a, mut b) = (a.min(b), a.max(b));
        let (mut fa, mut fb) = (f(a), f(b));

        for _ in 0..self.config.max_iterations {
            if fa * fb <= 0.0 {
                return Ok((a, b));
            }
            let width = b - a;
            let at_floor = floor.is_some_and(|lo| a <= lo);
            if fa.abs() < fb.abs() && !at_floor {
                a -= BRACKET_GROWTH * width;
                if let Some(lo) = floor {
                    a = a.max(lo);
                }
                fa = f(a);
            } else {
                b += BRACKET_GROWTH * width;
                fb = f(b);
            }
        }

        Err(SolverError::NoBracket { a, b })
    }
}
