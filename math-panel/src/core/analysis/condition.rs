//! Operating conditions

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::core::error::AnalysisError;
use crate::core::types::Vector3d;

/// How the flight speed is chosen
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VelocitySpec {
    /// Given speed (m/s)
    Fixed(f64),
    /// Speed at which the lift balances the weight of `mass` (kg)
    Balanced {
        /// Mass (kg)
        mass: f64,
    },
}

/// One point of a sweep
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperatingCondition {
    /// Angle of attack (deg)
    pub alpha_deg: f64,
    /// Sideslip angle (deg)
    #[serde(default)]
    pub beta_deg: f64,
    /// Speed
    pub velocity: VelocitySpec,
    /// Body rates `(p, q, r)` (rad/s)
    #[serde(default)]
    pub rates: Vector3d,
    /// Control deflections by control name (deg)
    #[serde(default)]
    pub controls: BTreeMap<String, f64>,
    /// Compute stability derivatives
    #[serde(default)]
    pub stability: bool,
}

impl OperatingCondition {
    /// Symmetric, steady point
    pub fn new(alpha_deg: f64, velocity: VelocitySpec) -> Self {
        Self {
            alpha_deg,
            beta_deg: 0.0,
            velocity,
            rates: Vector3d::zero(),
            controls: BTreeMap::new(),
            stability: false,
        }
    }

    /// Same point with a sideslip angle
    pub fn with_beta(mut self, beta_deg: f64) -> Self {
        self.beta_deg = beta_deg;
        self
    }

    /// Same point with body rates
    pub fn with_rates(mut self, rates: Vector3d) -> Self {
        self.rates = rates;
        self
    }

    /// Same point with a control deflection
    pub fn with_control(mut self, name: &str, deflection_deg: f64) -> Self {
        self.controls.insert(name.to_string(), deflection_deg);
        self
    }

    /// Same point with stability derivatives
    pub fn with_stability(mut self) -> Self {
        self.stability = true;
        self
    }

    /// Reject speeds and masses the solver cannot use
    pub fn validate(&self) -> Result<(), AnalysisError> {
        let invalid = |msg: String| Err(AnalysisError::InvalidOperatingPoint(msg));
        if !(self.alpha_deg.is_finite() && self.beta_deg.is_finite() && self.rates.is_finite()) {
            return invalid("non-finite angles or rates".to_string());
        }
        match self.velocity {
            VelocitySpec::Fixed(v) if !(v.is_finite() && v > 0.0) => {
                invalid(format!("speed must be positive, got {v}"))
            }
            VelocitySpec::Balanced { mass } if !(mass.is_finite() && mass > 0.0) => {
                invalid(format!("mass must be positive, got {mass}"))
            }
            _ => Ok(()),
        }
    }

    /// Wind axes of the point
    pub fn wind_axes(&self) -> WindAxes {
        WindAxes::new(self.alpha_deg.to_radians(), self.beta_deg.to_radians())
    }
}

/// Unit vectors of the wind frame, in body axes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindAxes {
    /// Along the freestream
    pub drag: Vector3d,
    /// Completes the frame, to starboard at zero sideslip
    pub side: Vector3d,
    /// Normal to the freestream in the symmetry plane
    pub lift: Vector3d,
}

impl WindAxes {
    /// Frame for angle of attack `alpha` and sideslip `beta` (rad)
    pub fn new(alpha: f64, beta: f64) -> Self {
        let (sa, ca) = alpha.sin_cos();
        let (sb, cb) = beta.sin_cos();
        let drag = Vector3d::new(ca * cb, sb, sa * cb);
        let lift = Vector3d::new(-sa, 0.0, ca);
        let side = lift.cross(&drag);
        Self { drag, side, lift }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_wind_axes_orthonormal() {
        let axes = WindAxes::new(0.2, -0.1);
        assert_relative_eq!(axes.drag.norm(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(axes.side.norm(), 1.0, epsilon = 1e-12);
        assert!(axes.drag.dot(&axes.lift).abs() < 1e-12);
        assert!(axes.drag.dot(&axes.side).abs() < 1e-12);

        let level = WindAxes::new(0.0, 0.0);
        assert_eq!(level.side, Vector3d::unit_y());
    }

    #[test]
    fn test_condition_json() {
        let json = r#"{ "alpha_deg": 4.0, "velocity": { "balanced": { "mass": 12.0 } },
                        "controls": { "aileron": 5.0 } }"#;
        let condition: OperatingCondition = serde_json::from_str(json).unwrap();
        assert_eq!(condition.velocity, VelocitySpec::Balanced { mass: 12.0 });
        assert_eq!(condition.controls["aileron"], 5.0);
        assert!(condition.validate().is_ok());

        let fixed: OperatingCondition =
            serde_json::from_str(r#"{ "alpha_deg": 2.0, "velocity": { "fixed": -3.0 } }"#).unwrap();
        assert!(fixed.validate().is_err());
    }
}
