//! Dense LU with partial pivoting
//!
//! Influence matrices of the panel method are dense and non-symmetric;
//! they are factorized once and solved for many right-hand sides. The
//! trailing sub-matrix update runs on rayon with the `native` feature.

use crate::traits::{DenseSolver, Factorization, RealField, check_pivots};
use ndarray::{Array1, Array2};
use thiserror::Error;

/// Errors that can occur during LU factorization
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LuError {
    #[error("Matrix is singular or nearly singular")]
    SingularMatrix,
    #[error("Matrix is ill-conditioned: pivot {pivot} has relative magnitude {ratio:.3e}")]
    IllConditioned { pivot: usize, ratio: f64 },
    #[error("Matrix dimensions mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("Backend failure: {0}")]
    Backend(String),
}

/// LU factorization result
///
/// Stores L and U factors along with pivot information
#[derive(Debug, Clone)]
pub struct LuFactorization<T: RealField> {
    /// Combined L and U matrices (L is unit lower triangular, stored below diagonal)
    pub lu: Array2<T>,
    /// Row permutation: row `i` of `PA` is row `pivots[i]` of `A`
    pub pivots: Vec<usize>,
    /// Matrix dimension
    pub n: usize,
}

impl<T: RealField> LuFactorization<T> {
    /// Solve Ax = b using the pre-computed LU factorization
    pub fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        if b.len() != self.n {
            return Err(LuError::DimensionMismatch {
                expected: self.n,
                got: b.len(),
            });
        }

        let mut x = Array1::from_iter(self.pivots.iter().map(|&p| b[p]));

        // Forward substitution: Ly = Pb
        for i in 0..self.n {
            let mut sum = x[i];
            for j in 0..i {
                sum -= self.lu[[i, j]] * x[j];
            }
            x[i] = sum;
        }

        // Backward substitution: Ux = y
        for i in (0..self.n).rev() {
            let mut sum = x[i];
            for j in (i + 1)..self.n {
                sum -= self.lu[[i, j]] * x[j];
            }
            let u_ii = self.lu[[i, i]];
            if u_ii == T::zero() {
                return Err(LuError::SingularMatrix);
            }
            x[i] = sum / u_ii;
        }

        Ok(x)
    }
}

impl<T: RealField> Factorization<T> for LuFactorization<T> {
    fn dim(&self) -> usize {
        self.n
    }

    fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError> {
        LuFactorization::solve(self, b)
    }
}

/// Compute LU factorization with partial pivoting (pure Rust implementation)
pub fn lu_factorize<T: RealField>(a: &Array2<T>) -> Result<LuFactorization<T>, LuError> {
    let n = a.nrows();
    if n != a.ncols() {
        return Err(LuError::DimensionMismatch {
            expected: n,
            got: a.ncols(),
        });
    }

    let scale = a.iter().fold(T::zero(), |acc, v| acc.max(v.abs()));
    if n == 0 || scale == T::zero() || !scale.is_finite() {
        return Err(LuError::SingularMatrix);
    }

    let mut data: Vec<T> = a.iter().copied().collect();
    let mut pivots: Vec<usize> = (0..n).collect();

    for k in 0..n {
        // Find pivot
        let mut max_val = data[k * n + k].abs();
        let mut max_row = k;
        for i in (k + 1)..n {
            let val = data[i * n + k].abs();
            if val > max_val {
                max_val = val;
                max_row = i;
            }
        }

        if max_val == T::zero() {
            return Err(LuError::SingularMatrix);
        }

        if max_row != k {
            for j in 0..n {
                data.swap(k * n + j, max_row * n + j);
            }
            pivots.swap(k, max_row);
        }

        let (head, tail) = data.split_at_mut((k + 1) * n);
        let pivot_row = &head[k * n..];
        eliminate_below(pivot_row, tail, k);
    }

    let lu = Array2::from_shape_vec((n, n), data).map_err(|e| LuError::Backend(e.to_string()))?;
    check_pivots((0..n).map(|i| lu[[i, i]]), scale)?;

    Ok(LuFactorization { lu, pivots, n })
}

/// Eliminate column `k` from every row stored in `rows` using `pivot_row`.
#[cfg(feature = "native")]
fn eliminate_below<T: RealField>(pivot_row: &[T], rows: &mut [T], k: usize) {
    use rayon::prelude::*;

    let n = pivot_row.len();
    rows.par_chunks_mut(n)
        .for_each(|row| eliminate_row(pivot_row, row, k));
}

/// Sequential elimination (fallback)
#[cfg(not(feature = "native"))]
fn eliminate_below<T: RealField>(pivot_row: &[T], rows: &mut [T], k: usize) {
    let n = pivot_row.len();
    rows.chunks_mut(n)
        .for_each(|row| eliminate_row(pivot_row, row, k));
}

#[inline]
fn eliminate_row<T: RealField>(pivot_row: &[T], row: &mut [T], k: usize) {
    let mult = row[k] / pivot_row[k];
    row[k] = mult;
    if mult == T::zero() {
        return;
    }
    for j in (k + 1)..pivot_row.len() {
        row[j] -= mult * pivot_row[j];
    }
}

/// Solve Ax = b using LU decomposition
///
/// This is a convenience function that combines factorization and solve.
pub fn lu_solve<T: RealField>(a: &Array2<T>, b: &Array1<T>) -> Result<Array1<T>, LuError> {
    let factorization = lu_factorize(a)?;
    factorization.solve(b)
}

/// Pure-Rust partial-pivoting LU backend
#[derive(Debug, Clone, Copy, Default)]
pub struct PivotedLu;

impl<T: RealField> DenseSolver<T> for PivotedLu {
    type Handle = LuFactorization<T>;

    fn name(&self) -> &'static str {
        "pivoted-lu"
    }

    fn factorize(&self, a: &Array2<T>) -> Result<Self::Handle, LuError> {
        lu_factorize(a)
    }
}
