//! Scalar root-finder configuration.

/// Configuration for the scalar root finders.
///
/// # Example
///
/// ```
/// use capfloor_core::math::solvers::SolverConfig;
///
/// let config = SolverConfig::default();
/// assert_eq!(config.max_iterations, 100);
///
/// let tight = SolverConfig::high_precision();
/// assert!(tight.tolerance < config.tolerance);
/// ```
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SolverConfig {
    /// Absolute tolerance on `|f(x)|` (and on bracket width for bracketing methods).
    pub tolerance: f64,

    /// Iteration cap.
    pub max_iterations: usize,
}

impl Default for SolverConfig {
    /// `tolerance = 1e-10`, `max_iterations = 100`.
    fn default() -> Self {
        Self {
            tolerance: 1e-10,
            max_iterations: 100,
        }
    }
}

impl SolverConfig {
    /// Create a configuration.
    pub fn new(tolerance: f64, max_iterations: usize) -> Self {
        Self {
            tolerance,
            max_iterations,
        }
    }

    /// Tolerance 1e-14, up to 500 iterations.
    pub fn high_precision() -> Self {
        Self::new(1e-14, 500)
    }

    /// Tolerance 1e-6, up to 50 iterations.
    pub fn fast() -> Self {
        Self::new(1e-6, 50)
    }

    /// Check that the tolerance is positive and the iteration cap non-zero.
    pub fn is_valid(&self) -> bool {
        self.tolerance > 0.0 && self.tolerance.is_finite() && self.max_iterations > 0
    }
}
