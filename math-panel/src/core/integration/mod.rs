//! Numerical quadrature
//!
//! - `gauss`: symmetric triangle rules
//! - `quadrature`: brute-force panel integrals by recursive subdivision,
//!   used as a reference for the closed-form influence kernels

pub mod gauss;
pub mod quadrature;

pub use gauss::{TrianglePoint, triangle_quadrature};
pub use quadrature::{integrate_panel, reference_influence};
