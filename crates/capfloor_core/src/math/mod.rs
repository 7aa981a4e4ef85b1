//! Mathematical utilities for caplet stripping.
//!
//! This module provides:
//! - [`function`]: The `VectorFunction` abstraction (map ℝᵘ → ℝᵛ plus Jacobian)
//! - [`linalg`]: Decomposition selection and dense helpers over nalgebra
//! - [`interpolators`]: 1-D interpolation expressed as node weights (values and sensitivities)
//! - [`transforms`]: Parameter-limit transforms for unconstrained optimisation
//! - [`penalty`]: Finite-difference penalty (smoothness prior) matrices
//! - [`basis`]: B-spline basis functions in one and two dimensions
//! - [`solvers`]: Root-finding and nonlinear least-squares solvers

pub mod basis;
pub mod function;
pub mod interpolators;
pub mod linalg;
pub mod penalty;
pub mod solvers;
pub mod transforms;
