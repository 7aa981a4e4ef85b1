//! Criterion benchmarks for capfloor_core interpolation and least squares.

use capfloor_core::math::function::VectorFunction;
use capfloor_core::math::interpolators::{CombinedInterpolator, ExtrapolatorKind, InterpolatorKind};
use capfloor_core::math::linalg::DecompositionMethod;
use capfloor_core::math::solvers::{LMConfig, LevenbergMarquardtSolver};
use capfloor_core::types::SolverError;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use nalgebra::{DMatrix, DVector};

fn nodes(n: usize) -> Vec<f64> {
    (0..n).map(|i| 0.25 + 10.0 * i as f64 / (n - 1) as f64).collect()
}

/// Interpolation weights for every kind at several node counts.
fn bench_interpolation_weights(c: &mut Criterion) {
    let mut group = c.benchmark_group("interpolation_weights");

    for size in [8, 32, 128] {
        let xs = nodes(size);
        for kind in [
            InterpolatorKind::Linear,
            InterpolatorKind::DoubleQuadratic,
            InterpolatorKind::NaturalCubicSpline,
        ] {
            let interp =
                CombinedInterpolator::new(kind, &xs, ExtrapolatorKind::Flat, ExtrapolatorKind::Linear)
                    .unwrap();
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", kind), size),
                &interp,
                |b, interp| b.iter(|| interp.weights(black_box(4.2))),
            );
        }
    }

    group.finish();
}

/// Linear model used to time the LM loop independent of model cost.
struct Dense(DMatrix<f64>);

impl VectorFunction for Dense {
    fn domain_size(&self) -> usize {
        self.0.ncols()
    }

    fn range_size(&self) -> usize {
        self.0.nrows()
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        Ok(&self.0 * x)
    }

    fn jacobian(&self, _x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        Ok(self.0.clone())
    }
}

/// Levenberg-Marquardt with Cholesky versus SVD.
fn bench_least_squares(c: &mut Criterion) {
    let mut group = c.benchmark_group("levenberg_marquardt");

    for params in [10, 40] {
        let rows = 3 * params;
        let m = DMatrix::from_fn(rows, params, |i, j| 1.0 / (1.0 + (i as f64 - 3.0 * j as f64).abs()));
        let model = Dense(m);
        let observed = DVector::from_fn(rows, |i, _| (i as f64 * 0.1).sin());
        let sigma = DVector::from_element(rows, 1.0);

        for decomposition in [DecompositionMethod::Cholesky, DecompositionMethod::Svd] {
            let solver = LevenbergMarquardtSolver::new(
                LMConfig::default().with_decomposition(decomposition),
            );
            group.bench_function(BenchmarkId::new(decomposition.name(), params), |b| {
                b.iter(|| {
                    solver
                        .solve(&model, black_box(&observed), &sigma, DVector::zeros(params))
                        .unwrap()
                })
            });
        }
    }

    group.finish();
}

criterion_group!(benches, bench_interpolation_weights, bench_least_squares);
criterion_main!(benches);
