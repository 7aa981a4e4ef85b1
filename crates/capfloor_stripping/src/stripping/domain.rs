//! Admissible regions for model parameters during least squares.

use std::fmt;
use std::sync::Arc;

use nalgebra::DVector;

/// Region of parameter space a penalised least-squares search may visit.
///
/// Trial steps outside the domain are rejected by the solver; the start
/// point must lie inside it.
///
/// # Examples
///
/// ```
/// use capfloor_stripping::stripping::ParameterDomain;
/// use nalgebra::DVector;
///
/// let x = DVector::from_vec(vec![0.2, -0.1]);
/// assert!(ParameterDomain::Unconstrained.contains(&x));
/// assert!(!ParameterDomain::NonNegative.contains(&x));
///
/// let capped = ParameterDomain::custom(|x| x.iter().all(|v| *v < 1.0));
/// assert!(capped.contains(&x));
/// ```
#[derive(Clone, Default)]
pub enum ParameterDomain {
    /// Every parameter vector is allowed.
    #[default]
    Unconstrained,
    /// Every component must be `>= 0`.
    NonNegative,
    /// Caller-supplied predicate.
    Custom(Arc<dyn Fn(&DVector<f64>) -> bool + Send + Sync>),
}

impl ParameterDomain {
    /// Domain defined by `predicate`.
    pub fn custom(predicate: impl Fn(&DVector<f64>) -> bool + Send + Sync + 'static) -> Self {
        Self::Custom(Arc::new(predicate))
    }

    /// Whether `x` lies in the domain.
    pub fn contains(&self, x: &DVector<f64>) -> bool {
        match self {
            Self::Unconstrained => true,
            Self::NonNegative => x.iter().all(|v| *v >= 0.0),
            Self::Custom(predicate) => predicate(x),
        }
    }
}

impl fmt::Debug for ParameterDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unconstrained => f.write_str("Unconstrained"),
            Self::NonNegative => f.write_str("NonNegative"),
            Self::Custom(_) => f.write_str("Custom(..)"),
        }
    }
}
