//! # Panel: Triangular Panel-Method Library
//!
//! Potential-flow solver for wings, sails and hulls built from triangular
//! source/doublet panels.
//!
//! ## Features
//!
//! - Constant or linear doublets, Dirichlet or Neumann rows per surface
//! - Trailing wake sheet with optional free vortons
//! - Strip-theory viscous correction from section polars
//! - Stability and control derivatives from one factorization
//! - Parallel assembly with Rayon, lazy and cancellable sweeps
//!

#![warn(missing_docs)]
#![warn(clippy::all)]
#![allow(clippy::too_many_arguments)] // Scientific code often has many parameters

pub mod core;

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Git commit hash (set during build)
pub const GIT_HASH: &str = env!("GIT_HASH");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }
}
