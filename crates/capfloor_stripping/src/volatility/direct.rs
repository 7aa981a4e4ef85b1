use capfloor_core::math::function::{check_domain, VectorFunction};
use capfloor_core::types::SolverError;
use nalgebra::{DMatrix, DVector};

/// One free parameter per caplet: the parameters are the volatilities.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DirectVolatility {
    size: usize,
}

impl DirectVolatility {
    /// Identity over `size` caplets.
    pub fn new(size: usize) -> Self {
        Self { size }
    }
}

impl VectorFunction for DirectVolatility {
    fn domain_size(&self) -> usize {
        self.size
    }

    fn range_size(&self) -> usize {
        self.size
    }

    fn evaluate(&self, x: &DVector<f64>) -> Result<DVector<f64>, SolverError> {
        check_domain(self, x)?;
        Ok(x.clone())
    }

    fn jacobian(&self, x: &DVector<f64>) -> Result<DMatrix<f64>, SolverError> {
        check_domain(self, x)?;
        Ok(DMatrix::identity(self.size, self.size))
    }
}
