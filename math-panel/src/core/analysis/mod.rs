//! Operating-point analysis and sweeps
//!
//! - [`run_operating_point`]: one condition, start to finish
//! - [`run_sweep`]: lazy iterator over many conditions sharing the
//!   factorized system whenever the wake geometry allows it

pub mod cancel;
pub mod condition;
pub mod forces;
pub mod result;
pub mod stability;
pub mod sweep;
pub mod task;

pub use cancel::CancellationToken;
pub use condition::{OperatingCondition, VelocitySpec, WindAxes};
pub use forces::{SurfaceLoads, SurfaceTopology};
pub use result::{
    AeroCoefficients, Derivative, LoadTotals, OperatingPointResult, StabilityDerivatives,
    WakeSummary,
};
pub use sweep::{DiscardedPoint, Sweep, SweepItem, SweepSummary, run_sweep};
pub use task::{AnalysisTask, PreparedSystem, TaskState, run_operating_point};
