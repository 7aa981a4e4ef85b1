//! Interpolation with extrapolation beyond the first and last nodes.

use super::cubic_spline::CubicSplineInterpolator;
use super::double_quadratic::DoubleQuadraticInterpolator;
use super::linear::LinearInterpolator;
use super::traits::{check_values, Interpolator, NodeWeights};
use crate::types::InterpolationError;

/// Interior interpolation scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum InterpolatorKind {
    /// Piecewise linear
    Linear,
    /// Blend of overlapping quadratics (C¹)
    #[default]
    DoubleQuadratic,
    /// Natural cubic spline (C²)
    NaturalCubicSpline,
}

impl InterpolatorKind {
    /// Bind this scheme to node abscissas.
    pub fn bind(&self, xs: &[f64]) -> Result<InterpolatorEnum, InterpolationError> {
        Ok(match self {
            InterpolatorKind::Linear => InterpolatorEnum::Linear(LinearInterpolator::new(xs)?),
            InterpolatorKind::DoubleQuadratic => {
                InterpolatorEnum::DoubleQuadratic(DoubleQuadraticInterpolator::new(xs)?)
            }
            InterpolatorKind::NaturalCubicSpline => {
                InterpolatorEnum::CubicSpline(CubicSplineInterpolator::new(xs)?)
            }
        })
    }
}

/// Behaviour outside the node range.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(rename_all = "snake_case")
)]
pub enum ExtrapolatorKind {
    /// Hold the boundary value
    #[default]
    Flat,
    /// Continue with the boundary slope
    Linear,
}

/// Static dispatch over the bound interior interpolators.
#[derive(Debug, Clone, PartialEq)]
pub enum InterpolatorEnum {
    /// Piecewise linear
    Linear(LinearInterpolator),
    /// Double quadratic
    DoubleQuadratic(DoubleQuadraticInterpolator),
    /// Natural cubic spline
    CubicSpline(CubicSplineInterpolator),
}

impl Interpolator for InterpolatorEnum {
    fn nodes(&self) -> &[f64] {
        match self {
            InterpolatorEnum::Linear(i) => i.nodes(),
            InterpolatorEnum::DoubleQuadratic(i) => i.nodes(),
            InterpolatorEnum::CubicSpline(i) => i.nodes(),
        }
    }

    fn weights(&self, x: f64) -> NodeWeights {
        match self {
            InterpolatorEnum::Linear(i) => i.weights(x),
            InterpolatorEnum::DoubleQuadratic(i) => i.weights(x),
            InterpolatorEnum::CubicSpline(i) => i.weights(x),
        }
    }
}

/// Interior interpolator plus left and right extrapolators.
///
/// Defined for every real `x`. Node sensitivities `∂y(x)/∂y_j` are the value
/// weights, which makes the interpolator directly usable inside analytic
/// Jacobians.
///
/// # Example
///
/// ```
/// use capfloor_core::math::interpolators::{
///     CombinedInterpolator, ExtrapolatorKind, InterpolatorKind,
/// };
///
/// let interp = CombinedInterpolator::new(
///     InterpolatorKind::Linear,
///     &[1.0, 2.0],
///     ExtrapolatorKind::Flat,
///     ExtrapolatorKind::Linear,
/// )
/// .unwrap();
/// let ys = [0.2, 0.3];
/// assert!((interp.interpolate(&ys, 0.0).unwrap() - 0.2).abs() < 1e-15);
/// assert!((interp.interpolate(&ys, 3.0).unwrap() - 0.4).abs() < 1e-12);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct CombinedInterpolator {
    interior: InterpolatorEnum,
    left: ExtrapolatorKind,
    right: ExtrapolatorKind,
}

impl CombinedInterpolator {
    /// Bind an interpolation scheme and extrapolators to node abscissas.
    pub fn new(
        kind: InterpolatorKind,
        xs: &[f64],
        left: ExtrapolatorKind,
        right: ExtrapolatorKind,
    ) -> Result<Self, InterpolationError> {
        Ok(Self {
            interior: kind.bind(xs)?,
            left,
            right,
        })
    }

    /// Node abscissas.
    pub fn nodes(&self) -> &[f64] {
        self.interior.nodes()
    }

    /// Number of nodes.
    pub fn len(&self) -> usize {
        self.nodes().len()
    }

    /// Always false: at least two nodes are required.
    pub fn is_empty(&self) -> bool {
        self.nodes().is_empty()
    }

    /// Value and derivative weights at any `x`.
    pub fn weights(&self, x: f64) -> NodeWeights {
        let (min, max) = self.interior.domain();
        if x < min {
            extrapolate(&self.interior, self.left, min, x)
        } else if x > max {
            extrapolate(&self.interior, self.right, max, x)
        } else {
            self.interior.weights(x)
        }
    }

    /// Interpolated (or extrapolated) value at `x`.
    ///
    /// # Errors
    ///
    /// Returns `InterpolationError::InvalidInput` if `ys` has the wrong length.
    pub fn interpolate(&self, ys: &[f64], x: f64) -> Result<f64, InterpolationError> {
        check_values(self.nodes(), ys)?;
        Ok(self.weights(x).apply(ys))
    }

    /// Sensitivities `∂y(x)/∂y_j` of the value at `x` to each node value.
    pub fn node_sensitivities(&self, x: f64) -> Vec<f64> {
        self.weights(x).value
    }
}

fn extrapolate(
    interior: &InterpolatorEnum,
    kind: ExtrapolatorKind,
    edge: f64,
    x: f64,
) -> NodeWeights {
    let at_edge = interior.weights(edge);
    match kind {
        ExtrapolatorKind::Flat => NodeWeights {
            derivative: vec![0.0; at_edge.value.len()],
            value: at_edge.value,
        },
        ExtrapolatorKind::Linear => {
            let dx = x - edge;
            let value = at_edge
                .value
                .iter()
                .zip(&at_edge.derivative)
                .map(|(v, d)| v + dx * d)
                .collect();
            NodeWeights {
                value,
                derivative: at_edge.derivative,
            }
        }
    }
}
