//! Pure Rust panel-method solver
//!
//! Triangular panels carry constant sources and constant or linear
//! doublets. Thick surfaces enforce a zero internal perturbation potential,
//! thin surfaces a zero normal velocity. A Kutta condition ties the
//! trailing wake to the trailing-edge panels.
//!
//! ## Architecture
//!
//! - `types`: vectors, doublet models and in-plane limits
//! - `constants`: physical and numerical constants
//! - `config`: immutable solver configuration (JSON)
//! - `error`: geometry, analysis and configuration errors
//! - `mesh`: panels, surfaces, strips and mesh generators
//! - `integration`: reference quadrature used to validate the kernels
//! - `influence`: source, doublet and vortex influence coefficients
//! - `wake`: trailing panel sheet and free vortons
//! - `assembly`: influence matrices, right-hand sides and factorization
//! - `viscous`: section polars and the virtual-twist coupling
//! - `analysis`: operating points, forces, stability derivatives and sweeps
//! - `parallel`: portable parallel iteration (rayon or sequential)
//! - `trace`: line-oriented progress sinks

pub mod analysis;
pub mod assembly;
pub mod config;
pub mod constants;
pub mod error;
pub mod influence;
pub mod integration;
pub mod mesh;
pub mod parallel;
pub mod trace;
pub mod types;
pub mod viscous;
pub mod wake;

// Re-exports for convenience
pub use analysis::{
    AeroCoefficients, CancellationToken, OperatingCondition, OperatingPointResult, SweepItem,
    SweepSummary, TaskState, VelocitySpec, run_operating_point, run_sweep,
};
pub use config::SolverConfig;
pub use error::{AnalysisError, ConfigError, GeometryError, ViscousFailure};
pub use influence::InfluenceEngine;
pub use mesh::{PanelMesh, WingSpec, generate_icosphere, generate_wing};
pub use trace::{BufferTrace, LogTrace, NullTrace, TraceSink};
pub use types::*;
pub use viscous::{PolarProvider, PolarTable, ThinAirfoilPolar};
