//! Solver configuration
//!
//! Every entry point receives an immutable [`SolverConfig`]; there is no
//! process-wide state. Configurations are plain JSON documents where every
//! field is optional:
//!
//! ```json
//! {
//!   "far_field_ratio": 10.0,
//!   "doublet_model": "linear",
//!   "wake": { "max_iterations": 20, "vortons": { "enabled": true } },
//!   "viscous": { "enabled": true, "relaxation": 0.5 }
//! }
//! ```

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use super::constants::{AIR_DENSITY, AIR_KINEMATIC_VISCOSITY};
use super::error::ConfigError;
use super::types::DoubletModel;

/// Near-field kernel used off the panel plane
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NearFieldMethod {
    /// Edge-wise arctangent formula everywhere (valid in and off plane)
    Exact,
    /// Closed-form solid angle off plane, exact formula near the plane
    #[default]
    Fast,
}

/// Matrix arithmetic precision
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatrixPrecision {
    /// `f64` factorisation
    #[default]
    Double,
    /// `f32` factorisation
    Single,
}

/// Reference direction for the trailing wake
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeAlignment {
    /// Along the body x axis; identical for all points of a sweep
    BodyAxis,
    /// Along the freestream, then re-aligned with the local flow
    #[default]
    Freestream,
}

/// Free-wake vortex-particle options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VortonConfig {
    /// Convert the trailing sheet into vortons between iterations
    pub enabled: bool,
    /// Vorton smoothing radius (m)
    pub core_radius: f64,
    /// Vortons further downstream than this many reference chords are deactivated
    pub cutoff_chords: f64,
    /// Positions closer than this (m) are merged
    pub merge_tolerance: f64,
}

impl Default for VortonConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            core_radius: 0.02,
            cutoff_chords: 10.0,
            merge_tolerance: 1e-6,
        }
    }
}

/// Trailing wake options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct WakeConfig {
    /// Number of panel rows per trailing edge
    pub panel_rows: usize,
    /// Total wake length, in reference chords
    pub length_chords: f64,
    /// Ratio between the lengths of consecutive rows
    pub progression: f64,
    /// Reference direction
    pub alignment: WakeAlignment,
    /// Maximum rollup iterations
    pub max_iterations: usize,
    /// Rollup is converged when the lift coefficient changes less than this
    pub lift_tolerance: f64,
    /// Vortex particles
    pub vortons: VortonConfig,
}

impl Default for WakeConfig {
    fn default() -> Self {
        Self {
            panel_rows: 10,
            length_chords: 30.0,
            progression: 1.2,
            alignment: WakeAlignment::default(),
            max_iterations: 1,
            lift_tolerance: 1e-4,
            vortons: VortonConfig::default(),
        }
    }
}

/// Strip-theory viscous coupling options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ViscousConfig {
    /// Run the virtual-twist loop
    pub enabled: bool,
    /// Fraction of the lift discrepancy applied per iteration
    pub relaxation: f64,
    /// Convergence threshold on the largest station discrepancy (deg)
    pub tolerance_deg: f64,
    /// Iteration budget before the point is discarded
    pub max_iterations: usize,
}

impl Default for ViscousConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            relaxation: 0.5,
            tolerance_deg: 0.01,
            max_iterations: 100,
        }
    }
}

/// Fluid properties
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FluidProperties {
    /// Density (kg/m³)
    pub density: f64,
    /// Kinematic viscosity (m²/s)
    pub kinematic_viscosity: f64,
}

impl Default for FluidProperties {
    fn default() -> Self {
        Self {
            density: AIR_DENSITY,
            kinematic_viscosity: AIR_KINEMATIC_VISCOSITY,
        }
    }
}

impl FluidProperties {
    /// Sea water at 15 °C
    pub fn sea_water() -> Self {
        Self {
            density: 1025.0,
            kinematic_viscosity: 1.19e-6,
        }
    }
}

/// Immutable solver configuration passed to every entry point
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverConfig {
    /// Distance, in largest-edge units, beyond which the multipole expansion is used
    #[serde(default = "default_far_field_ratio")]
    pub far_field_ratio: f64,
    /// Height, in largest-edge units, below which a point counts as near the plane
    #[serde(default = "default_near_field_threshold")]
    pub near_field_threshold: f64,
    /// Off-plane near-field kernel
    pub near_field_method: NearFieldMethod,
    /// Core radius of the wake vortex segments (m)
    #[serde(default = "default_vortex_core_radius")]
    pub vortex_core_radius: f64,
    /// Doublet distribution
    pub doublet_model: DoubletModel,
    /// Wake options
    pub wake: WakeConfig,
    /// Viscous coupling options
    pub viscous: ViscousConfig,
    /// Fluid
    pub fluid: FluidProperties,
    /// Worker threads, 0 uses every available core
    pub threads: usize,
    /// Matrix precision
    pub precision: MatrixPrecision,
    /// Ground plane height (m) for ground effect, `None` in free air
    pub ground_height: Option<f64>,
    /// Perturbation used for stability derivatives (m/s, rad/s, rad)
    #[serde(default = "default_stability_step")]
    pub stability_step: f64,
}

fn default_far_field_ratio() -> f64 {
    10.0
}

fn default_near_field_threshold() -> f64 {
    1e-5
}

fn default_vortex_core_radius() -> f64 {
    1e-4
}

fn default_stability_step() -> f64 {
    0.01
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            far_field_ratio: default_far_field_ratio(),
            near_field_threshold: default_near_field_threshold(),
            near_field_method: NearFieldMethod::default(),
            vortex_core_radius: default_vortex_core_radius(),
            doublet_model: DoubletModel::default(),
            wake: WakeConfig::default(),
            viscous: ViscousConfig::default(),
            fluid: FluidProperties::default(),
            threads: 0,
            precision: MatrixPrecision::default(),
            ground_height: None,
            stability_step: default_stability_step(),
        }
    }
}

impl SolverConfig {
    /// Load configuration from a JSON file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_json(&contents)
    }

    /// Parse configuration from a JSON string
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: SolverConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a JSON file
    pub fn to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let json = serde_json::to_string_pretty(self)?;
        fs::write(path, json)?;
        Ok(())
    }

    /// Reject values the numerical kernels cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        let positive = [
            ("far_field_ratio", self.far_field_ratio),
            ("near_field_threshold", self.near_field_threshold),
            ("wake.length_chords", self.wake.length_chords),
            ("wake.progression", self.wake.progression),
            ("viscous.relaxation", self.viscous.relaxation),
            ("viscous.tolerance_deg", self.viscous.tolerance_deg),
            ("fluid.density", self.fluid.density),
            ("fluid.kinematic_viscosity", self.fluid.kinematic_viscosity),
            ("stability_step", self.stability_step),
        ];
        for (name, value) in positive {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "{name} must be positive, got {value}"
                )));
            }
        }
        if self.vortex_core_radius < 0.0 || self.wake.vortons.core_radius < 0.0 {
            return Err(ConfigError::Invalid(
                "core radii must not be negative".to_string(),
            ));
        }
        if self.wake.panel_rows == 0 {
            return Err(ConfigError::Invalid(
                "wake.panel_rows must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Number of doublet unknowns per panel
    pub fn unknowns_per_panel(&self) -> usize {
        self.doublet_model.unknowns_per_panel()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        let config = SolverConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.far_field_ratio, 10.0);
        assert_eq!(config.doublet_model, DoubletModel::Uniform);
    }

    #[test]
    fn test_partial_json() {
        let config = SolverConfig::from_json(
            r#"{ "doublet_model": "linear", "wake": { "max_iterations": 7 }, "precision": "single" }"#,
        )
        .unwrap();
        assert_eq!(config.doublet_model, DoubletModel::Linear);
        assert_eq!(config.wake.max_iterations, 7);
        assert_eq!(config.wake.panel_rows, WakeConfig::default().panel_rows);
        assert_eq!(config.precision, MatrixPrecision::Single);
        assert_eq!(config.near_field_threshold, 1e-5);
    }

    #[test]
    fn test_file_round_trip() {
        let config = SolverConfig {
            fluid: FluidProperties::sea_water(),
            ground_height: Some(-0.4),
            ..SolverConfig::default()
        };
        let path = std::env::temp_dir().join(format!("panel_config_{}.json", std::process::id()));
        config.to_file(&path).unwrap();
        let loaded = SolverConfig::from_file(&path).unwrap();
        std::fs::remove_file(&path).ok();
        assert_eq!(loaded.fluid.density, 1025.0);
        assert_eq!(loaded.ground_height, Some(-0.4));
        assert!(SolverConfig::from_file(&path).is_err());
    }

    #[test]
    fn test_rejects_negative_ratio() {
        let err = SolverConfig::from_json(r#"{ "far_field_ratio": -1.0 }"#).unwrap_err();
        assert!(err.to_string().contains("far_field_ratio"));
    }
}
