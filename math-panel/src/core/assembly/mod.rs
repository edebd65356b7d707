//! Linear system of the panel method
//!
//! - [`system`]: dense influence matrices with the wake folded in
//! - [`boundary`]: onset flow, source strengths and right-hand side
//! - [`factor`]: factorization behind the `DenseSolver` backends
//! - [`field`]: velocities of a solved distribution

pub mod boundary;
pub mod factor;
pub mod field;
pub mod system;

pub use boundary::BoundaryState;
pub use factor::{FactorizedSystem, factorize, factorize_with};
pub use field::{Singularities, VelocityMatrix};
pub use system::{
    BoundaryKind, CollocationRow, LinearSystem, WakeCoupling, trailing_edge_densities,
    unknown_index, wake_couplings,
};
