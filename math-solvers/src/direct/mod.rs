//! Direct solvers for linear systems
//!
//! This module provides direct (non-iterative) solvers:
//! - [`lu_solve`]: LU decomposition with partial pivoting
//! - [`PivotedLu`]: the pure-Rust backend behind [`crate::DenseSolver`]
//! - `LapackLu`: LAPACK backend (`ndarray-linalg` feature)

#[cfg(feature = "ndarray-linalg")]
mod lapack;
mod lu;

#[cfg(feature = "ndarray-linalg")]
pub use lapack::{LapackFactorization, LapackLu};
pub use lu::{LuError, LuFactorization, PivotedLu, lu_factorize, lu_solve};
