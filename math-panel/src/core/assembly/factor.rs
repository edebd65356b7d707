//! Factorization of the influence matrix
//!
//! The matrix is factorized once per wake geometry and reused for every
//! right-hand side of a sweep or a stability run. The backend is the
//! LAPACK one when the `ndarray-linalg` feature is on, the pure-Rust
//! pivoted LU otherwise.

use ndarray::{Array1, Array2};
use solvers::{DenseSolver, Factorization, RealField};

use crate::core::config::MatrixPrecision;
use crate::core::error::AnalysisError;

/// Factorized influence matrix
pub enum FactorizedSystem {
    /// `f64` factors
    Double(Box<dyn Factorization<f64>>),
    /// `f32` factors; right-hand sides are rounded on the way in
    Single(Box<dyn Factorization<f32>>),
}

impl std::fmt::Debug for FactorizedSystem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            FactorizedSystem::Double(h) => write!(f, "FactorizedSystem::Double({})", h.dim()),
            FactorizedSystem::Single(h) => write!(f, "FactorizedSystem::Single({})", h.dim()),
        }
    }
}

impl FactorizedSystem {
    /// Dimension of the system
    pub fn dim(&self) -> usize {
        match self {
            FactorizedSystem::Double(h) => h.dim(),
            FactorizedSystem::Single(h) => h.dim(),
        }
    }

    /// Precision of the factors
    pub fn precision(&self) -> MatrixPrecision {
        match self {
            FactorizedSystem::Double(_) => MatrixPrecision::Double,
            FactorizedSystem::Single(_) => MatrixPrecision::Single,
        }
    }

    /// Solve for one right-hand side
    pub fn solve(&self, rhs: &Array1<f64>) -> Result<Array1<f64>, AnalysisError> {
        match self {
            FactorizedSystem::Double(h) => Ok(h.solve(rhs)?),
            FactorizedSystem::Single(h) => {
                let b = rhs.mapv(f32::from_f64_lossy);
                Ok(h.solve(&b)?.mapv(f32::to_f64_lossy))
            }
        }
    }

    /// Solve for several right-hand sides with the same factors
    pub fn solve_many(&self, rhs: &[Array1<f64>]) -> Result<Vec<Array1<f64>>, AnalysisError> {
        match self {
            FactorizedSystem::Double(h) => Ok(h.solve_many(rhs)?),
            FactorizedSystem::Single(h) => {
                let b: Vec<Array1<f32>> = rhs.iter().map(|r| r.mapv(f32::from_f64_lossy)).collect();
                Ok(h
                    .solve_many(&b)?
                    .into_iter()
                    .map(|x| x.mapv(f32::to_f64_lossy))
                    .collect())
            }
        }
    }
}

/// Factorize with the default backend
pub fn factorize(
    matrix: &Array2<f64>,
    precision: MatrixPrecision,
) -> Result<FactorizedSystem, AnalysisError> {
    #[cfg(feature = "ndarray-linalg")]
    {
        factorize_with(&solvers::LapackLu, matrix, precision)
    }
    #[cfg(not(feature = "ndarray-linalg"))]
    {
        factorize_with(&solvers::PivotedLu, matrix, precision)
    }
}

/// Factorize with an explicit backend
pub fn factorize_with<B>(
    backend: &B,
    matrix: &Array2<f64>,
    precision: MatrixPrecision,
) -> Result<FactorizedSystem, AnalysisError>
where
    B: DenseSolver<f64> + DenseSolver<f32>,
    <B as DenseSolver<f64>>::Handle: 'static,
    <B as DenseSolver<f32>>::Handle: 'static,
{
    let name = <B as DenseSolver<f64>>::name(backend);
    log::debug!(
        "factorizing {}x{} matrix with {} ({:?})",
        matrix.nrows(),
        matrix.ncols(),
        name,
        precision
    );
    match precision {
        MatrixPrecision::Double => {
            let handle = <B as DenseSolver<f64>>::factorize(backend, matrix)?;
            Ok(FactorizedSystem::Double(Box::new(handle)))
        }
        MatrixPrecision::Single => {
            let single = matrix.mapv(f32::from_f64_lossy);
            let handle = <B as DenseSolver<f32>>::factorize(backend, &single)?;
            Ok(FactorizedSystem::Single(Box::new(handle)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn system() -> (Array2<f64>, Array1<f64>, Array1<f64>) {
        let a = array![[4.0, -1.0, 0.5], [1.0, 3.0, -0.2], [0.3, 0.1, -2.0]];
        let x = array![1.0, -2.0, 0.5];
        let b = a.dot(&x);
        (a, b, x)
    }

    #[test]
    fn test_double_precision_solve() {
        let (a, b, x) = system();
        let f = factorize_with(&solvers::PivotedLu, &a, MatrixPrecision::Double).unwrap();
        assert_eq!(f.dim(), 3);
        let solved = f.solve(&b).unwrap();
        for i in 0..3 {
            assert_relative_eq!(solved[i], x[i], epsilon = 1e-12);
        }
    }

    #[test]
    fn test_single_precision_solve_many() {
        let (a, b, x) = system();
        let f = factorize(&a, MatrixPrecision::Single).unwrap();
        assert_eq!(f.precision(), MatrixPrecision::Single);
        let solved = f.solve_many(&[b.clone(), b * 2.0]).unwrap();
        for i in 0..3 {
            assert_relative_eq!(solved[0][i], x[i], epsilon = 1e-5);
            assert_relative_eq!(solved[1][i], 2.0 * x[i], epsilon = 1e-5);
        }
    }

    #[test]
    fn test_singular_matrix_reported() {
        let a = array![[1.0, 2.0], [2.0, 4.0]];
        let err = factorize(&a, MatrixPrecision::Double).unwrap_err();
        assert!(matches!(err, AnalysisError::SingularMatrix(_)));
    }
}
