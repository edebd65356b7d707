//! Results of an operating point

use serde::{Deserialize, Serialize};

use super::condition::{OperatingCondition, WindAxes};
use crate::core::mesh::ReferenceDimensions;
use crate::core::types::Vector3d;
use crate::core::viscous::SpanDistribution;
use crate::core::wake::WakeState;

/// Resultant force and moment
///
/// Values are per unit dynamic pressure (m² and m³) until scaled by
/// [`LoadTotals::scaled`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct LoadTotals {
    /// Force in body axes
    pub force: Vector3d,
    /// Moment about the reference point, body axes
    pub moment: Vector3d,
}

impl LoadTotals {
    /// Both totals multiplied by `factor`
    pub fn scaled(&self, factor: f64) -> Self {
        Self {
            force: self.force * factor,
            moment: self.moment * factor,
        }
    }
}

impl std::ops::Add for LoadTotals {
    type Output = LoadTotals;

    fn add(self, other: LoadTotals) -> LoadTotals {
        LoadTotals {
            force: self.force + other.force,
            moment: self.moment + other.moment,
        }
    }
}

/// Force and moment coefficients in wind axes
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct AeroCoefficients {
    /// Lift
    pub cl: f64,
    /// Pressure (induced) drag
    pub cd_induced: f64,
    /// Profile drag from the section polars
    pub cd_viscous: f64,
    /// Total drag
    pub cd: f64,
    /// Side force
    pub cy: f64,
    /// Rolling moment, referred to the span
    pub roll: f64,
    /// Pitching moment, referred to the chord
    pub pitch: f64,
    /// Yawing moment, referred to the span
    pub yaw: f64,
}

impl AeroCoefficients {
    /// Coefficients of the pressure loads plus the profile drag
    pub fn from_loads(
        reference: &ReferenceDimensions,
        axes: &WindAxes,
        pressure: &LoadTotals,
        profile: &LoadTotals,
    ) -> Self {
        let s = reference.area;
        let total = *pressure + *profile;
        let cd_induced = pressure.force.dot(&axes.drag) / s;
        let cd_viscous = profile.force.dot(&axes.drag) / s;
        Self {
            cl: total.force.dot(&axes.lift) / s,
            cd_induced,
            cd_viscous,
            cd: cd_induced + cd_viscous,
            cy: total.force.dot(&axes.side) / s,
            roll: total.moment.x / (s * reference.span),
            pitch: total.moment.y / (s * reference.chord),
            yaw: total.moment.z / (s * reference.span),
        }
    }

    /// Lift-to-drag ratio, zero without drag
    pub fn lift_to_drag(&self) -> f64 {
        if self.cd.abs() > f64::EPSILON {
            self.cl / self.cd
        } else {
            0.0
        }
    }

    /// Forward difference `(self - base) / step`
    pub fn slope_from(&self, base: &AeroCoefficients, step: f64) -> AeroCoefficients {
        let d = |a: f64, b: f64| (a - b) / step;
        AeroCoefficients {
            cl: d(self.cl, base.cl),
            cd_induced: d(self.cd_induced, base.cd_induced),
            cd_viscous: d(self.cd_viscous, base.cd_viscous),
            cd: d(self.cd, base.cd),
            cy: d(self.cy, base.cy),
            roll: d(self.roll, base.roll),
            pitch: d(self.pitch, base.pitch),
            yaw: d(self.yaw, base.yaw),
        }
    }
}

/// Derivatives of the coefficients with respect to one variable
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Derivative {
    /// Variable name: `u`, `v`, `w` (per m/s), `p`, `q`, `r` (per rad/s)
    /// or a control name (per rad)
    pub variable: String,
    /// Coefficient slopes
    pub coefficients: AeroCoefficients,
}

/// Stability and control derivatives of an operating point
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StabilityDerivatives {
    /// One entry per perturbed variable
    pub derivatives: Vec<Derivative>,
}

impl StabilityDerivatives {
    /// Slopes with respect to `variable`
    pub fn get(&self, variable: &str) -> Option<&AeroCoefficients> {
        self.derivatives
            .iter()
            .find(|d| d.variable == variable)
            .map(|d| &d.coefficients)
    }
}

/// Wake rollup outcome
#[derive(Debug, Clone, Serialize)]
pub struct WakeSummary {
    /// Final state
    pub state: WakeState,
    /// Rollup iterations run
    pub iterations: usize,
    /// Active vortons at the end
    pub vortons: usize,
    /// Final wake direction
    pub direction: Vector3d,
}

/// Everything computed for one operating point
#[derive(Debug, Clone, Serialize)]
pub struct OperatingPointResult {
    /// Condition as requested
    pub condition: OperatingCondition,
    /// Flight speed (m/s)
    pub speed: f64,
    /// Dynamic pressure (Pa)
    pub dynamic_pressure: f64,
    /// Force and moment (N, N·m)
    pub loads: LoadTotals,
    /// Coefficients
    pub coefficients: AeroCoefficients,
    /// Doublet unknowns (m²/s)
    pub doublets: Vec<f64>,
    /// Source strength per panel (m/s)
    pub sources: Vec<f64>,
    /// Pressure coefficient per panel; the pressure jump on thin panels
    pub cp: Vec<f64>,
    /// Span-wise data of every lifting surface
    pub spans: Vec<SpanDistribution>,
    /// Wake rollup
    pub wake: WakeSummary,
    /// Virtual-twist iterations of the last rollup iteration
    pub viscous_iterations: usize,
    /// Stability derivatives, when requested
    pub stability: Option<StabilityDerivatives>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn reference() -> ReferenceDimensions {
        ReferenceDimensions {
            area: 2.0,
            chord: 0.5,
            span: 4.0,
            moment_point: Vector3d::zero(),
        }
    }

    #[test]
    fn test_coefficients_in_wind_axes() {
        let axes = WindAxes::new(0.0, 0.0);
        let pressure = LoadTotals {
            force: Vector3d::new(0.1, 0.0, 1.0),
            moment: Vector3d::new(0.0, -0.2, 0.0),
        };
        let profile = LoadTotals {
            force: Vector3d::new(0.02, 0.0, 0.0),
            moment: Vector3d::zero(),
        };
        let c = AeroCoefficients::from_loads(&reference(), &axes, &pressure, &profile);
        assert_relative_eq!(c.cl, 0.5, epsilon = 1e-12);
        assert_relative_eq!(c.cd_induced, 0.05, epsilon = 1e-12);
        assert_relative_eq!(c.cd_viscous, 0.01, epsilon = 1e-12);
        assert_relative_eq!(c.cd, 0.06, epsilon = 1e-12);
        assert_relative_eq!(c.pitch, -0.2, epsilon = 1e-12);
        assert_relative_eq!(c.lift_to_drag(), 0.5 / 0.06, epsilon = 1e-12);
    }

    #[test]
    fn test_slope() {
        let base = AeroCoefficients {
            cl: 0.5,
            ..AeroCoefficients::default()
        };
        let moved = AeroCoefficients {
            cl: 0.51,
            ..AeroCoefficients::default()
        };
        assert_relative_eq!(moved.slope_from(&base, 0.01).cl, 1.0, epsilon = 1e-9);
    }
}
