//! Root-finding and least-squares solvers.
//!
//! ## Available Solvers
//!
//! ### Scalar Root-Finding
//!
//! - [`NewtonRaphsonSolver`]: Newton iteration, plain or safeguarded by a bracket
//! - [`BrentSolver`]: Bracketing method without derivatives, plus bracket expansion
//!
//! ### Vector Root-Finding
//!
//! - [`NewtonVectorRootFinder`]: Newton with backtracking for square systems;
//!   failures are reported through [`RootFindStatus`]
//!
//! ### Nonlinear Least-Squares
//!
//! - [`LevenbergMarquardtSolver`]: Weighted, optionally penalised, with a
//!   configurable decomposition for the damped normal equations
//!
//! ## Configuration
//!
//! Scalar solvers use [`SolverConfig`]; the vector solvers carry their own
//! [`VectorRootConfig`] and [`LMConfig`]. All configuration types deserialise
//! with serde when the `serde` feature is enabled.
//!
//! ## Example
//!
//! ```
//! use capfloor_core::math::solvers::{NewtonRaphsonSolver, SolverConfig};
//!
//! let solver = NewtonRaphsonSolver::new(SolverConfig::default());
//! let root = solver.find_root(|x| x * x - 2.0, |x| 2.0 * x, 1.0).unwrap();
//! assert!((root - std::f64::consts::SQRT_2).abs() < 1e-10);
//! ```

mod brent;
mod config;
mod levenberg_marquardt;
mod newton_raphson;
mod newton_vector;

pub use brent::BrentSolver;
pub use config::SolverConfig;
pub use levenberg_marquardt::{LMConfig, LMResult, LevenbergMarquardtSolver};
pub use newton_raphson::NewtonRaphsonSolver;
pub use newton_vector::{NewtonVectorRootFinder, RootFindResult, RootFindStatus, VectorRootConfig};
