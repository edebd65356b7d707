//! Dense linear solvers for the panel method
//!
//! This crate isolates the factorisation of the (dense, non-symmetric)
//! influence matrix behind a small trait boundary so that the analysis code
//! never depends on a particular linear-algebra library.
//!
//! # Features
//!
//! - **Pure-Rust LU**: partial pivoting, rayon-parallel elimination (`native`)
//! - **LAPACK LU**: `getrf`/`getrs` through `ndarray-linalg` (`ndarray-linalg`)
//! - **Precision**: every backend works with `f64` and `f32`
//! - **Conditioning**: both backends report tiny relative pivots as errors
//!
//! # Example
//!
//! ```ignore
//! use math_panel_solvers::{DenseSolver, Factorization, PivotedLu};
//!
//! let handle = PivotedLu.factorize(&matrix)?;
//! let x1 = handle.solve(&rhs1)?;
//! let x2 = handle.solve(&rhs2)?;
//! ```

pub mod direct;
pub mod traits;

pub use direct::{LuError, LuFactorization, PivotedLu, lu_factorize, lu_solve};
#[cfg(feature = "ndarray-linalg")]
pub use direct::{LapackFactorization, LapackLu};
pub use traits::{DenseSolver, Factorization, RealField, check_pivots};
