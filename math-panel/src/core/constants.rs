//! Physical and numerical constants

use std::f64::consts::PI;

/// 4π
pub const PI4: f64 = 4.0 * PI;

/// 2π
pub const PI2: f64 = 2.0 * PI;

/// Small epsilon for numerical comparisons
pub const EPSY: f64 = 1.0e-14;

/// Edges shorter than this (m) make a panel degenerate
pub const MIN_EDGE_LENGTH: f64 = 1.0e-7;

/// Internal angles below this (rad) make a panel degenerate (0.1°)
pub const MIN_PANEL_ANGLE: f64 = 0.1 * PI / 180.0;

/// Relative tolerance, in units of the largest panel edge, below which a
/// field point counts as lying on a vertex, an edge or the panel plane
pub const COINCIDENCE_FRACTION: f64 = 1.0e-10;

/// Nudge distance applied to vertex/edge field points, in units of the
/// largest panel edge
pub const NUDGE_FRACTION: f64 = 1.0e-6;

/// Standard gravity (m/s²)
pub const GRAVITY: f64 = 9.80665;

/// Sea-level air density (kg/m³)
pub const AIR_DENSITY: f64 = 1.225;

/// Sea-level air kinematic viscosity (m²/s)
pub const AIR_KINEMATIC_VISCOSITY: f64 = 1.5e-5;
