//! Integration tests: solvers working with interpolated parameterisations.
//!
//! A small volatility-like term structure is parameterised by node values
//! interpolated onto a grid; the solvers must recover the nodes from the
//! values they generate.

use approx::assert_relative_eq;
use capfloor_core::math::function::{finite_difference_jacobian, VectorFunction};
use capfloor_core::math::interpolators::{CombinedInterpolator, ExtrapolatorKind, InterpolatorKind};
use capfloor_core::math::linalg::DecompositionMethod;
use capfloor_core::math::penalty::penalty_matrix;
use capfloor_core::math::solvers::{
    LMConfig, LevenbergMarquardtSolver, NewtonVectorRootFinder,
};
use capfloor_core::math::transforms::ParameterTransform;
use capfloor_core::types::SolverError;
use nalgebra::{DMatrix, DVector};

/// Node values (in fitting space) → squared interpolated values on a grid.
struct SquaredTermStructure {
    interp: CombinedInterpolator,
    grid: Vec<f64>,
    transform: ParameterTransform,
}

impl SquaredTermStructure {
    fn new(nodes: &[f64], grid: Vec<f64>) -> Self {
        Self {
            interp: CombinedInterpolator::new(
                InterpolatorKind::DoubleQuadratic,
                nodes,
                ExtrapolatorKind::Flat,
                ExtrapolatorKind::Flat,
            )
            .unwrap(),
            grid,
            transform: ParameterTransform::GreaterThan(0.0),
        }
    }

    fn model_nodes(&self, x: &DVector<f64>) -> Vec<f64> {
        x.iter().map(|y| self.transform.inverse_transform(*y)).collect()
    }
}

impl VectorFunction for SquaredTermStructure {
    fn domain_size(&self) -> usize {
        self.interp.len()
    }

    fn range_size(&self) -> usize {
        self.grid.len()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        let nodes = self.model_nodes(x);
        let values = self
            .grid
            .iter()
            .map(|t| {
                let v = self.interp.weights(*t).apply(&nodes);
                v * v
            })
            .collect::<Vec<_>>();
        Ok(DVector::from_vec(values))
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        let nodes = self.model_nodes(x);
        let mut jac = DMatrix::zeros(self.grid.len(), x.len());
        for (i, t) in self.grid.iter().enumerate() {
            let w = self.interp.weights(*t);
            let v = w.apply(&nodes);
            for j in 0..x.len() {
                jac[(i, j)] =
                    2.0 * v * w.value[j] * self.transform.inverse_transform_gradient(x[j]);
            }
        }
        Ok(jac)
    }
}

fn fitting_space(values: &[f64]) -> DVector<f64> {
    let t = ParameterTransform::GreaterThan(0.0);
    DVector::from_iterator(values.len(), values.iter().map(|v| t.transform(*v)))
}

#[test]
fn test_analytic_jacobian_matches_finite_differences() {
    let f = SquaredTermStructure::new(&[0.5, 1.0, 2.0, 5.0], vec![0.25, 0.75, 1.5, 3.0, 7.0]);
    let x = fitting_space(&[0.3, 0.35, 0.28, 0.22]);
    let analytic = f.jacobian(&x).unwrap();
    let fd = finite_difference_jacobian(&f, &x, 1e-6).unwrap();
    assert!((analytic - fd).amax() < 1e-8);
}

#[test]
fn test_root_finder_recovers_nodes_for_square_system() {
    let nodes = [0.5, 1.0, 2.0, 5.0];
    let f = SquaredTermStructure::new(&nodes, nodes.to_vec());
    let truth = fitting_space(&[0.3, 0.35, 0.28, 0.22]);
    let target = f.evaluate(&truth).unwrap();

    let result = NewtonVectorRootFinder::with_defaults()
        .find_root(&f, &target, fitting_space(&[0.25; 4]))
        .unwrap();
    assert!(result.converged());
    for j in 0..4 {
        assert_relative_eq!(result.x[j], truth[j], epsilon = 1e-8);
    }
}

#[test]
fn test_least_squares_recovers_nodes_from_overdetermined_grid() {
    let f = SquaredTermStructure::new(
        &[0.5, 1.0, 2.0, 5.0],
        vec![0.25, 0.5, 0.75, 1.0, 1.5, 2.0, 3.0, 4.0, 5.0, 6.0],
    );
    let truth = fitting_space(&[0.3, 0.35, 0.28, 0.22]);
    let observed = f.evaluate(&truth).unwrap();
    let sigma = DVector::from_element(observed.len(), 1e-4);

    for decomposition in [DecompositionMethod::Cholesky, DecompositionMethod::Svd] {
        let solver =
            LevenbergMarquardtSolver::new(LMConfig::default().with_decomposition(decomposition));
        let result = solver
            .solve(&f, &observed, &sigma, fitting_space(&[0.25; 4]))
            .unwrap();
        assert!(result.converged);
        assert!(result.chi_sq < 1e-10);
        for j in 0..4 {
            assert_relative_eq!(result.params[j], truth[j], epsilon = 1e-6);
        }
    }
}

#[test]
fn test_penalised_fit_trades_chi_square_for_smoothness() {
    let nodes = [0.5, 1.0, 1.5, 2.0, 3.0, 5.0];
    let f = SquaredTermStructure::new(&nodes, nodes.to_vec());
    let rough = fitting_space(&[0.3, 0.4, 0.25, 0.4, 0.25, 0.3]);
    let observed = f.evaluate(&rough).unwrap();
    let sigma = DVector::from_element(observed.len(), 1e-3);
    let penalty = penalty_matrix(nodes.len(), 2, 10.0).unwrap();

    let result = LevenbergMarquardtSolver::with_defaults()
        .solve_with_penalty(&f, &observed, &sigma, rough.clone(), &penalty, |_| true)
        .unwrap();
    assert!(result.penalty >= 0.0);
    assert!(result.chi_sq > 0.0);

    // Starting from the exact fit, the only way down is to smooth
    let rough_penalty = rough.dot(&(&penalty * &rough));
    assert!(result.objective() < rough_penalty);
    assert!(result.penalty < rough_penalty);
}
