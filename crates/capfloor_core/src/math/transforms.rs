//! Parameter-limit transforms.
//!
//! Optimisers work in an unconstrained *fitting space*; models are defined on
//! a constrained *model space*. A [`ParameterTransform`] maps between the two:
//!
//! - `transform`: model → fitting
//! - `inverse_transform`: fitting → model
//! - `inverse_transform_gradient`: d(model)/d(fitting)
//!
//! | Variant | Model space | Inverse transform |
//! |---------|-------------|-------------------|
//! | `Identity` | ℝ | `y` |
//! | `GreaterThan(a)` | (a, ∞) | `a + ln(1 + eʸ)` |
//! | `LessThan(a)` | (-∞, a) | `a - ln(1 + e⁻ʸ)` reflected |
//! | `Range { lower, upper }` | (lower, upper) | `mid + half·tanh(y)` |

/// Beyond this magnitude the softplus is replaced by its asymptote.
const SOFTPLUS_CUTOFF: f64 = 50.0;

/// Bounded transforms clamp their input to avoid `atanh(±1)`.
const RANGE_EPS: f64 = 1e-15;

/// Maps a single parameter between model space and fitting space.
///
/// # Example
///
/// ```
/// use capfloor_core::math::transforms::ParameterTransform;
///
/// let t = ParameterTransform::GreaterThan(0.0);
/// let y = t.transform(0.25);
/// assert!((t.inverse_transform(y) - 0.25).abs() < 1e-14);
/// assert!(t.inverse_transform(-40.0) > 0.0);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ParameterTransform {
    /// No constraint.
    #[default]
    Identity,
    /// Model value strictly greater than the limit.
    GreaterThan(f64),
    /// Model value strictly less than the limit.
    LessThan(f64),
    /// Model value strictly inside `(lower, upper)`.
    Range {
        /// Lower limit
        lower: f64,
        /// Upper limit
        upper: f64,
    },
}

impl ParameterTransform {
    /// Map a model-space value into fitting space.
    pub fn transform(&self, x: f64) -> f64 {
        match *self {
            ParameterTransform::Identity => x,
            ParameterTransform::GreaterThan(a) => inverse_softplus(x - a),
            ParameterTransform::LessThan(a) => -inverse_softplus(a - x),
            ParameterTransform::Range { lower, upper } => {
                let (mid, half) = mid_half(lower, upper);
                let z = ((x - mid) / half).clamp(-1.0 + RANGE_EPS, 1.0 - RANGE_EPS);
                z.atanh()
            }
        }
    }

    /// Map a fitting-space value back into model space.
    pub fn inverse_transform(&self, y: f64) -> f64 {
        match *self {
            ParameterTransform::Identity => y,
            ParameterTransform::GreaterThan(a) => a + softplus(y),
            ParameterTransform::LessThan(a) => a - softplus(-y),
            ParameterTransform::Range { lower, upper } => {
                let (mid, half) = mid_half(lower, upper);
                mid + half * y.tanh()
            }
        }
    }

    /// Derivative of [`inverse_transform`](Self::inverse_transform) with respect to `y`.
    pub fn inverse_transform_gradient(&self, y: f64) -> f64 {
        match *self {
            ParameterTransform::Identity => 1.0,
            ParameterTransform::GreaterThan(_) => logistic(y),
            ParameterTransform::LessThan(_) => logistic(-y),
            ParameterTransform::Range { lower, upper } => {
                let (_, half) = mid_half(lower, upper);
                let t = y.tanh();
                half * (1.0 - t * t)
            }
        }
    }

    /// Whether a model-space value satisfies the limit.
    pub fn admits(&self, x: f64) -> bool {
        match *self {
            ParameterTransform::Identity => x.is_finite(),
            ParameterTransform::GreaterThan(a) => x > a,
            ParameterTransform::LessThan(a) => x < a,
            ParameterTransform::Range { lower, upper } => x > lower && x < upper,
        }
    }
}

fn mid_half(lower: f64, upper: f64) -> (f64, f64) {
    (0.5 * (lower + upper), 0.5 * (upper - lower))
}

fn softplus(y: f64) -> f64 {
    if y > SOFTPLUS_CUTOFF {
        y
    } else {
        y.exp().ln_1p()
    }
}

fn inverse_softplus(z: f64) -> f64 {
    if z > SOFTPLUS_CUTOFF {
        z
    } else {
        // z <= 0 is outside the model space; clamp to a very negative value
        let z = z.max(f64::MIN_POSITIVE);
        z.exp_m1().ln()
    }
}

fn logistic(y: f64) -> f64 {
    1.0 / (1.0 + (-y).exp())
}
