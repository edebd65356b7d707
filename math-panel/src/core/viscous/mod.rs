//! Strip-theory viscous correction
//!
//! Every strip of a lifting surface is a station. Its inviscid lift is
//! compared with the lift a 2-D polar gives at the same effective angle,
//! and a virtual twist of the station absorbs the difference.

pub mod coupling;
pub mod polar;
pub mod span;

pub use coupling::{ViscousCoupling, apply_twist};
pub use polar::{
    Polar, PolarError, PolarProvider, PolarQuery, PolarSample, PolarTable, ThinAirfoilPolar,
};
pub use span::SpanDistribution;
