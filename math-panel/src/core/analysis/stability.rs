//! Stability and control derivatives by forward differences
//!
//! Every perturbation only changes the right-hand side, so all of them
//! are solved together against the factorization of the base point.

use super::result::{AeroCoefficients, Derivative, StabilityDerivatives};
use crate::core::assembly::BoundaryState;
use crate::core::error::AnalysisError;
use crate::core::mesh::PanelMesh;
use crate::core::types::Vector3d;

/// Perturbed variable
#[derive(Debug, Clone, PartialEq)]
enum Perturbation {
    /// Body-axis velocity component
    Velocity(Vector3d),
    /// Body rate component
    Rate(Vector3d),
    /// Control deflection
    Control(usize),
}

/// Forward-difference derivatives around `base_state`
///
/// `base_state` is the solved state at unit speed; `speed` converts the
/// dimensional steps (m/s and rad/s) into it. `evaluate` solves every
/// perturbed state in one batch and returns their coefficients in order,
/// referred to the base dynamic pressure.
pub fn stability_derivatives<F>(
    mesh: &PanelMesh,
    base_state: &BoundaryState,
    base: &AeroCoefficients,
    speed: f64,
    step: f64,
    evaluate: F,
) -> Result<StabilityDerivatives, AnalysisError>
where
    F: FnOnce(&[BoundaryState]) -> Result<Vec<AeroCoefficients>, AnalysisError>,
{
    let mut variables = vec![
        ("u".to_string(), Perturbation::Velocity(Vector3d::unit_x())),
        ("v".to_string(), Perturbation::Velocity(Vector3d::unit_y())),
        ("w".to_string(), Perturbation::Velocity(Vector3d::unit_z())),
        ("p".to_string(), Perturbation::Rate(Vector3d::unit_x())),
        ("q".to_string(), Perturbation::Rate(Vector3d::unit_y())),
        ("r".to_string(), Perturbation::Rate(Vector3d::unit_z())),
    ];
    variables.extend(
        mesh.controls
            .iter()
            .enumerate()
            .map(|(i, c)| (c.name.clone(), Perturbation::Control(i))),
    );

    let states: Vec<BoundaryState> = variables
        .iter()
        .map(|(_, perturbation)| {
            let mut state = base_state.clone();
            match perturbation {
                Perturbation::Velocity(axis) => state.freestream += *axis * (step / speed),
                Perturbation::Rate(axis) => state.rotation += *axis * (step / speed),
                Perturbation::Control(i) => {
                    let control = &mesh.controls[*i];
                    state.rotate_normals(&control.panels, &control.hinge_axis, step);
                }
            }
            state
        })
        .collect();
    let perturbed = evaluate(&states)?;
    if perturbed.len() != variables.len() {
        return Err(AnalysisError::InvalidOperatingPoint(format!(
            "{} perturbed solutions for {} variables",
            perturbed.len(),
            variables.len()
        )));
    }

    let derivatives = variables
        .into_iter()
        .zip(&perturbed)
        .map(|((variable, _), coefficients)| {
            log::debug!("derivative d/d{variable}: dCL = {:.6}", coefficients.cl - base.cl);
            Derivative {
                variable,
                coefficients: coefficients.slope_from(base, step),
            }
        })
        .collect();
    Ok(StabilityDerivatives { derivatives })
}
