//! LAPACK-backed LU factorisation (`ndarray-linalg` feature)
//!
//! Wraps `getrf`/`getrs` through `ndarray-linalg`. The handle applies the same
//! relative pivot check as the pure-Rust backend so both report
//! ill-conditioned systems identically.

use super::lu::LuError;
use crate::traits::{DenseSolver, Factorization, RealField, check_pivots};
use ndarray::{Array1, Array2, OwnedRepr};
use ndarray_linalg::{Factorize, LUFactorized, Lapack, Solve};
use num_traits::Float;

/// LAPACK LU backend
#[derive(Debug, Clone, Copy, Default)]
pub struct LapackLu;

/// Factorised matrix held by LAPACK
pub struct LapackFactorization<T: RealField + Lapack> {
    factors: LUFactorized<OwnedRepr<T>>,
    n: usize,
}

impl<T> Factorization<T> for LapackFactorization<T>
where
    T: RealField + Lapack,
{
    fn dim(&self) -> usize {
        self.n
    }

    fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }
        self.factors
            .solve(b)
            .map_err(|e| LuError::Backend(e.to_string()))
    }
}

impl<T> DenseSolver<T> for LapackLu
where
    T: RealField + Lapack,
{
    type Handle = LapackFactorization<T>;

    fn name(&self) -> &'static str {
        "lapack-getrf"
    }

    fn factorize(&self, a: &Array2<T>) -> Result<Self::Handle, LuError> {
        let n = a.nrows();
        if n != a.ncols() {
            return Err(LuError::DimensionMismatch {
                expected: n,
                got: a.ncols(),
            });
        }
        let scale = a
            .iter()
            .fold(T::zero(), |acc, v| Float::max(acc, Float::abs(*v)));
        if n == 0 || scale == T::zero() {
            return Err(LuError::SingularMatrix);
        }

        let factors = a.factorize().map_err(|_| LuError::SingularMatrix)?;
        check_pivots(factors.a.diag().iter().copied(), scale)?;

        Ok(LapackFactorization { factors, n })
    }
}
