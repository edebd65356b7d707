//! Potential flow around a closed body
//!
//! The exact solution for a sphere peaks at 1.5 V on the equator and
//! produces no force.

use math_panel::core::analysis::{
    CancellationToken, OperatingCondition, VelocitySpec, run_operating_point,
};
use math_panel::core::config::SolverConfig;
use math_panel::core::mesh::generate_icosphere;
use math_panel::core::trace::NullTrace;
use math_panel::core::types::DoubletModel;
use math_panel::core::viscous::ThinAirfoilPolar;

fn peak_speed_ratio(cp: &[f64]) -> f64 {
    let min_cp = cp.iter().copied().fold(f64::INFINITY, f64::min);
    (1.0 - min_cp).sqrt()
}

#[test]
fn test_sphere_peak_velocity() {
    let mesh = generate_icosphere(1.0, 2);
    let config = SolverConfig::default();
    let result = run_operating_point(
        &mesh,
        &OperatingCondition::new(0.0, VelocitySpec::Fixed(10.0)),
        &config,
        &ThinAirfoilPolar::default(),
        &NullTrace,
        &CancellationToken::new(),
    )
    .unwrap();

    assert_eq!(result.cp.len(), mesh.num_panels());
    let ratio = peak_speed_ratio(&result.cp);
    assert!((ratio - 1.5).abs() < 0.06, "peak speed ratio {ratio}");
    // Stagnation points sit close to cp = 1
    let max_cp = result.cp.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(max_cp > 0.9 && max_cp <= 1.0 + 1e-9, "max cp {max_cp}");

    assert!(result.coefficients.cl.abs() < 0.02);
    assert!(result.coefficients.cd.abs() < 0.02);
    assert!(result.spans.is_empty());
    assert_eq!(result.wake.vortons, 0);
}

#[test]
fn test_sphere_linear_doublets() {
    let mesh = generate_icosphere(1.0, 2);
    let config = SolverConfig {
        doublet_model: DoubletModel::Linear,
        ..SolverConfig::default()
    };
    let result = run_operating_point(
        &mesh,
        &OperatingCondition::new(0.0, VelocitySpec::Fixed(1.0)),
        &config,
        &ThinAirfoilPolar::default(),
        &NullTrace,
        &CancellationToken::new(),
    )
    .unwrap();
    let ratio = peak_speed_ratio(&result.cp);
    assert!((ratio - 1.5).abs() < 0.1, "peak speed ratio {ratio}");
}
