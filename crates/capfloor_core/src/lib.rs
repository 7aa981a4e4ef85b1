//! # capfloor_core: Numerical Foundation for Caplet Stripping
//!
//! ## Layer 1 (Foundation) Role
//!
//! capfloor_core is the bottom layer of the caplet-stripping workspace, providing:
//! - The [`VectorFunction`](math::function::VectorFunction) abstraction (ℝᵘ → ℝᵛ with Jacobian)
//! - Dense linear-algebra glue over nalgebra (`math::linalg`)
//! - 1-D interpolation with node sensitivities (`math::interpolators`)
//! - Positivity-preserving parameter transforms (`math::transforms`)
//! - Finite-difference penalty matrices (`math::penalty`)
//! - B-spline basis functions (`math::basis`)
//! - Scalar and vector root-finders, and (penalised) Levenberg-Marquardt (`math::solvers`)
//! - Yield curves and the curve provider contract (`market_data`)
//! - Error types: `SolverError`, `InterpolationError`, `MarketDataError` (`types::error`)
//!
//! ## Zero Dependency Principle
//!
//! Layer 1 has no dependencies on other capfloor_* crates, with minimal external dependencies:
//! - nalgebra: Dense matrices, Cholesky/SVD/LU decompositions
//! - num-traits: Traits for generic numerical computation
//! - thiserror: Error derivation
//! - tracing: Solver diagnostics
//! - serde: Configuration deserialisation (optional)
//!
//! ## Usage Examples
//!
//! ```rust
//! use capfloor_core::math::solvers::{LevenbergMarquardtSolver, LMConfig};
//! use capfloor_core::math::function::VectorFunction;
//! use capfloor_core::types::SolverError;
//! use nalgebra::{DMatrix, DVector};
//!
//! // f(x) = [x0 - 2, x1 - 3] with an analytic Jacobian
//! struct Shift;
//!
//! impl VectorFunction for Shift {
//!     fn domain_size(&self) -> usize { 2 }
//!     fn range_size(&self) -> usize { 2 }
//!     fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
//!         Ok(DVector::from_vec(vec![x[0] - 2.0, x[1] - 3.0]))
//!     }
//!     fn jacobian(&self, _x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
//!         Ok(DMatrix::identity(2, 2))
//!     }
//! }
//!
//! let solver = LevenbergMarquardtSolver::with_defaults();
//! let target = DVector::zeros(2);
//! let sigma = DVector::from_element(2, 1.0);
//! let result = solver
//!     .solve(&Shift, &target, &sigma, DVector::zeros(2))
//!     .unwrap();
//! assert!(result.converged);
//! assert!((result.params[0] - 2.0).abs() < 1e-8);
//! ```
//!
//! ## Feature Flags
//!
//! - `serde` (default): Enable deserialisation of solver configuration types

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![deny(rustdoc::private_intra_doc_links)]

pub mod market_data;
pub mod math;
pub mod types;
