//! Operating-point analysis of generated wings
//!
//! Flat plates and thick wings at small angles, checked against
//! lifting-line estimates, scaling laws and stability derivative signs.

use approx::assert_relative_eq;
use math_panel::core::analysis::{
    CancellationToken, OperatingCondition, OperatingPointResult, VelocitySpec, run_operating_point,
};
use math_panel::core::assembly::trailing_edge_densities;
use math_panel::core::config::{
    FluidProperties, SolverConfig, ViscousConfig, VortonConfig, WakeAlignment, WakeConfig,
};
use math_panel::core::constants::GRAVITY;
use math_panel::core::mesh::{FlapSpec, PanelMesh, WingSpec, generate_wing};
use math_panel::core::trace::NullTrace;
use math_panel::core::types::{DoubletModel, Vector3d};
use math_panel::core::viscous::ThinAirfoilPolar;
use math_panel::core::wake::WakeModel;

fn plate() -> PanelMesh {
    generate_wing(&WingSpec::rectangular(6.0, 1.0, 4, 12))
}

fn solve(mesh: &PanelMesh, condition: OperatingCondition, config: &SolverConfig) -> OperatingPointResult {
    let polar = ThinAirfoilPolar::default();
    let cancel = CancellationToken::new();
    run_operating_point(mesh, &condition, config, &polar, &NullTrace, &cancel).unwrap()
}

fn fixed(alpha_deg: f64, speed: f64) -> OperatingCondition {
    OperatingCondition::new(alpha_deg, VelocitySpec::Fixed(speed))
}

#[test]
fn test_flat_plate_at_zero_incidence() {
    let config = SolverConfig::default();
    assert!(!config.viscous.enabled);
    let result = solve(&plate(), fixed(0.0, 15.0), &config);
    let c = &result.coefficients;
    assert!(c.cl.abs() < 1e-9, "CL = {}", c.cl);
    assert!(c.cd_induced.abs() < 1e-9, "CDi = {}", c.cd_induced);
    assert_eq!(c.cd_viscous, 0.0);
    assert!(c.cd.abs() < 1e-9);
    assert!(c.pitch.abs() < 1e-9);
    assert_eq!(result.viscous_iterations, 0);

    let span = &result.spans[0];
    assert!(span.cl_inviscid.iter().all(|cl| cl.abs() < 1e-9));
    assert!(span.profile_drag.iter().all(|&cd| cd == 0.0));
    assert!(span.virtual_twist.iter().all(|&t| t == 0.0));
}

#[test]
fn test_flat_plate_profile_drag_at_zero_incidence() {
    let config = SolverConfig {
        viscous: ViscousConfig {
            enabled: true,
            ..ViscousConfig::default()
        },
        ..SolverConfig::default()
    };
    let result = solve(&plate(), fixed(0.0, 15.0), &config);
    let c = &result.coefficients;
    assert!(c.cl.abs() < 1e-9, "CL = {}", c.cl);
    assert!(c.cd_induced.abs() < 1e-9);
    assert_relative_eq!(c.cd_viscous, 0.008, epsilon = 1e-9);
    assert_relative_eq!(c.cd, c.cd_viscous, epsilon = 1e-9);
    assert_eq!(result.viscous_iterations, 1);
    assert!(result.spans[0].reynolds.iter().all(|&re| re > 9e5));
}

#[test]
fn test_plate_lift_slope() {
    let config = SolverConfig::default();
    let mesh = plate();
    let low = solve(&mesh, fixed(2.0, 10.0), &config).coefficients;
    let high = solve(&mesh, fixed(4.0, 10.0), &config).coefficients;
    assert!(low.cl > 0.0);
    assert!(high.cl > low.cl);

    // Lifting line for aspect ratio 6 gives about 4.7 per radian
    let slope = (high.cl - low.cl) / 2.0_f64.to_radians();
    assert!(slope > 3.0 && slope < 5.5, "slope = {slope}");

    // No leading-edge suction on a plate: pressure drag tilts with the lift
    assert!(high.cd_induced > 0.0);
}

#[test]
fn test_linear_doublets_lift() {
    let config = SolverConfig {
        doublet_model: DoubletModel::Linear,
        ..SolverConfig::default()
    };
    let mesh = generate_wing(&WingSpec::rectangular(6.0, 1.0, 3, 8));
    let result = solve(&mesh, fixed(4.0, 10.0), &config);
    assert_eq!(result.doublets.len(), 3 * mesh.num_panels());
    assert!(result.coefficients.cl > 0.1);
}

#[test]
fn test_thick_wing_lifts() {
    let mesh = generate_wing(&WingSpec::rectangular(6.0, 1.0, 8, 8).with_thickness(0.12));
    let config = SolverConfig::default();
    let zero = solve(&mesh, fixed(0.0, 10.0), &config).coefficients;
    let four = solve(&mesh, fixed(4.0, 10.0), &config).coefficients;
    assert!(zero.cl.abs() < 1e-3, "CL(0) = {}", zero.cl);
    assert!(four.cl > 0.15 && four.cl < 0.6, "CL(4) = {}", four.cl);
}

#[test]
fn test_coefficients_independent_of_speed() {
    let mesh = plate();
    let config = SolverConfig::default();
    let slow = solve(&mesh, fixed(5.0, 10.0), &config);
    let fast = solve(&mesh, fixed(5.0, 20.0), &config);
    assert_relative_eq!(slow.coefficients.cl, fast.coefficients.cl, epsilon = 1e-10);
    assert_relative_eq!(slow.coefficients.cd, fast.coefficients.cd, epsilon = 1e-10);
    assert_relative_eq!(fast.loads.force.z, 4.0 * slow.loads.force.z, max_relative = 1e-10);
    assert_relative_eq!(fast.dynamic_pressure, 4.0 * slow.dynamic_pressure, max_relative = 1e-12);
    for (a, b) in slow.doublets.iter().zip(&fast.doublets) {
        assert_relative_eq!(2.0 * a, *b, epsilon = 1e-9);
    }
}

#[test]
fn test_repeated_point_is_identical() {
    let mesh = plate();
    let config = SolverConfig::default();
    let first = solve(&mesh, fixed(3.0, 12.0), &config);
    let second = solve(&mesh, fixed(3.0, 12.0), &config);
    assert_eq!(first.coefficients, second.coefficients);
    assert_eq!(first.doublets, second.doublets);
}

#[test]
fn test_balanced_speed_carries_the_weight() {
    let mesh = plate();
    let config = SolverConfig::default();
    let mass = 3.0;
    let result = solve(
        &mesh,
        OperatingCondition::new(4.0, VelocitySpec::Balanced { mass }),
        &config,
    );
    let lift = result.coefficients.cl * result.dynamic_pressure * mesh.reference.area;
    assert_relative_eq!(lift, mass * GRAVITY, max_relative = 1e-8);
    assert!(result.speed > 0.0);

    let polar = ThinAirfoilPolar::default();
    let cancel = CancellationToken::new();
    let err = run_operating_point(
        &mesh,
        &OperatingCondition::new(-4.0, VelocitySpec::Balanced { mass }),
        &config,
        &polar,
        &NullTrace,
        &cancel,
    )
    .unwrap_err();
    assert!(err.to_string().contains("invalid operating point"));
}

#[test]
fn test_stability_derivative_signs() {
    let spec = WingSpec::rectangular(6.0, 1.0, 4, 12)
        .with_flap(FlapSpec {
            name: "flap".to_string(),
            hinge_fraction: 0.75,
            y_start: -3.0,
            y_end: 3.0,
        });
    let mesh = generate_wing(&spec);
    let config = SolverConfig::default();
    let result = solve(&mesh, fixed(3.0, 15.0).with_stability(), &config);
    let derivatives = result.stability.expect("stability requested");

    assert!(derivatives.get("w").unwrap().cl > 0.0);
    assert!(derivatives.get("q").unwrap().pitch < 0.0);
    assert!(derivatives.get("p").unwrap().roll < 0.0);
    assert!(derivatives.get("flap").unwrap().cl > 0.0);
    // Flat plate: every panel force is normal to it, so no side force
    assert!(derivatives.get("q").unwrap().cy.abs() < 1e-8);
}

#[test]
fn test_roll_rate_damps_and_water_scales_loads() {
    let mesh = plate();
    let air = SolverConfig::default();
    let steady = solve(&mesh, fixed(3.0, 10.0), &air);
    let rolling = solve(
        &mesh,
        fixed(3.0, 10.0).with_rates(Vector3d::new(0.5, 0.0, 0.0)),
        &air,
    );
    // The triangulation is not mirror-symmetric, so the steady moment is only small
    assert!(rolling.coefficients.roll < 0.0);
    assert!(steady.coefficients.roll.abs() < 0.1 * rolling.coefficients.roll.abs());

    let water = SolverConfig {
        fluid: FluidProperties::sea_water(),
        ..SolverConfig::default()
    };
    let hydro = solve(&mesh, fixed(3.0, 10.0), &water);
    assert_relative_eq!(hydro.coefficients.cl, steady.coefficients.cl, epsilon = 1e-12);
    assert_relative_eq!(
        hydro.loads.force.z / steady.loads.force.z,
        1025.0 / 1.225,
        max_relative = 1e-9
    );
}

#[test]
fn test_shed_row_conserves_circulation() {
    let mesh = plate();
    let config = SolverConfig::default();
    let result = solve(&mesh, fixed(5.0, 10.0), &config);

    let mut wake = WakeModel::new(&config.wake, mesh.reference.chord);
    wake.build_wake_panels(&mesh, &Vector3d::unit_x()).unwrap();
    let densities = trailing_edge_densities(&mesh, config.doublet_model, &result.doublets);
    assert!(densities.iter().all(|d| d[0] > 0.0));
    let shed = wake.insert_vorton_row(&densities);
    assert!(shed > 0);
    let total = wake.vorton_rows()[0].total_vortex();
    assert!(total.norm() < 1e-9, "net vorticity {:?}", total);
}

#[test]
fn test_free_wake_rollup() {
    let config = SolverConfig {
        wake: WakeConfig {
            panel_rows: 3,
            length_chords: 3.0,
            progression: 1.0,
            alignment: WakeAlignment::Freestream,
            max_iterations: 3,
            lift_tolerance: 1e-9,
            vortons: VortonConfig {
                enabled: true,
                core_radius: 0.05,
                cutoff_chords: 30.0,
                ..VortonConfig::default()
            },
            ..WakeConfig::default()
        },
        ..SolverConfig::default()
    };
    let mesh = generate_wing(&WingSpec::rectangular(6.0, 1.0, 3, 8));
    let result = solve(&mesh, fixed(5.0, 10.0), &config);
    assert_eq!(result.wake.iterations, 3);
    assert!(result.wake.vortons > 0);
    assert!(result.coefficients.cl > 0.0 && result.coefficients.cl.is_finite());
    // Wake follows the downwashed flow: no upward component
    assert!(result.wake.direction.z < 5.0_f64.to_radians().sin());
}
