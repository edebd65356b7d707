//! Core traits for dense linear algebra
//!
//! This module defines the abstractions the panel solver talks to:
//! - [`RealField`]: scalar types usable by the factorisation backends (`f64`, `f32`)
//! - [`DenseSolver`]: a backend able to factorise a square matrix
//! - [`Factorization`]: a factorised matrix able to solve for one or many right-hand sides

use crate::direct::LuError;
use ndarray::{Array1, Array2};
use num_traits::{Float, FromPrimitive, NumAssign, ToPrimitive};
use std::fmt::{Debug, Display};

/// Trait for real scalar types used in the dense factorisations.
///
/// # Implementations
///
/// Provided for:
/// - `f64` (default matrix precision)
/// - `f32` (single precision, halves the matrix memory)
pub trait RealField:
    Float + NumAssign + FromPrimitive + ToPrimitive + Copy + Send + Sync + Debug + Display + 'static
{
    /// Relative pivot magnitude below which a factorisation is reported as
    /// singular or ill-conditioned.
    fn pivot_tolerance() -> Self;

    /// Convert from `f64`, rounding to the nearest representable value.
    fn from_f64_lossy(value: f64) -> Self;

    /// Widen to `f64`.
    fn to_f64_lossy(self) -> f64;
}

impl RealField for f64 {
    fn pivot_tolerance() -> Self {
        1e-13
    }

    fn from_f64_lossy(value: f64) -> Self {
        value
    }

    fn to_f64_lossy(self) -> f64 {
        self
    }
}

impl RealField for f32 {
    fn pivot_tolerance() -> Self {
        1e-6
    }

    fn from_f64_lossy(value: f64) -> Self {
        value as f32
    }

    fn to_f64_lossy(self) -> f64 {
        self as f64
    }
}

/// A factorised square matrix.
///
/// Implementations must be shareable across threads so that one
/// factorisation can serve every right-hand side of a sweep.
pub trait Factorization<T: RealField>: Send + Sync {
    /// Dimension of the factorised matrix
    fn dim(&self) -> usize;

    /// Solve `A x = b`
    fn solve(&self, b: &Array1<T>) -> Result<Array1<T>, LuError>;

    /// Solve for several right-hand sides with the same factorisation
    fn solve_many(&self, rhs: &[Array1<T>]) -> Result<Vec<Array1<T>>, LuError> {
        rhs.iter().map(|b| self.solve(b)).collect()
    }
}

/// A dense factorisation backend.
///
/// This is the narrow boundary behind which native libraries live; the
/// pure-Rust [`crate::PivotedLu`] is always available.
pub trait DenseSolver<T: RealField>: Send + Sync {
    /// Factorisation handle produced by this backend
    type Handle: Factorization<T>;

    /// Short backend name for diagnostics
    fn name(&self) -> &'static str;

    /// Factorise a square matrix
    fn factorize(&self, a: &Array2<T>) -> Result<Self::Handle, LuError>;
}

/// Check the diagonal of an `U` factor against the largest matrix entry.
///
/// Returns the index of the first pivot that is too small relative to
/// `scale`, which callers report as a singular or ill-conditioned matrix.
pub fn check_pivots<T: RealField>(
    diagonal: impl Iterator<Item = T>,
    scale: T,
) -> Result<(), LuError> {
    let threshold = T::pivot_tolerance() * scale;
    for (i, u_ii) in diagonal.enumerate() {
        if !u_ii.is_finite() {
            return Err(LuError::SingularMatrix);
        }
        if u_ii.abs() <= threshold {
            return Err(LuError::IllConditioned {
                pivot: i,
                ratio: if scale > T::zero() {
                    (u_ii.abs() / scale).to_f64_lossy()
                } else {
                    0.0
                },
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pivot_tolerance_ordering() {
        assert!(f64::pivot_tolerance() < f32::pivot_tolerance() as f64);
    }

    #[test]
    fn test_check_pivots() {
        assert!(check_pivots([1.0_f64, 0.5, 0.25].into_iter(), 1.0).is_ok());

        let err = check_pivots([1.0_f64, 1e-16, 0.25].into_iter(), 1.0).unwrap_err();
        match err {
            LuError::IllConditioned { pivot, .. } => assert_eq!(pivot, 1),
            other => panic!("unexpected error {other:?}"),
        }

        assert!(check_pivots([1.0_f64, f64::NAN].into_iter(), 1.0).is_err());
    }
}
