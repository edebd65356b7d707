//! Sweeps: discarded points, cancellation and factorization reuse

use math_panel::core::analysis::{
    CancellationToken, OperatingCondition, SweepSummary, TaskState, VelocitySpec, run_sweep,
};
use math_panel::core::config::{SolverConfig, ViscousConfig, WakeAlignment, WakeConfig};
use math_panel::core::error::AnalysisError;
use math_panel::core::mesh::{PanelMesh, WingSpec, generate_wing};
use math_panel::core::trace::{BufferTrace, TraceSink};
use math_panel::core::viscous::ThinAirfoilPolar;

fn plate() -> PanelMesh {
    generate_wing(&WingSpec::rectangular(6.0, 1.0, 3, 6))
}

fn viscous_config() -> SolverConfig {
    SolverConfig {
        viscous: ViscousConfig {
            enabled: true,
            ..ViscousConfig::default()
        },
        ..SolverConfig::default()
    }
}

#[test]
fn test_out_of_range_station_discards_the_point() {
    let mut mesh = plate();
    mesh.surfaces[0].strips[2].foil = "tip".to_string();
    // Chord 1 m: Re = V / 1.5e-5, so 30 m/s leaves the tip polar
    let polar = ThinAirfoilPolar::default().with_foil_range("tip", 1e4, 1e6);
    let config = viscous_config();
    let trace = BufferTrace::new();
    let cancel = CancellationToken::new();
    let conditions = vec![
        OperatingCondition::new(2.0, VelocitySpec::Fixed(10.0)),
        OperatingCondition::new(4.0, VelocitySpec::Fixed(30.0)),
        OperatingCondition::new(6.0, VelocitySpec::Fixed(10.0)),
    ];

    let summary = SweepSummary::collect(run_sweep(&mesh, conditions, &config, &polar, &trace, &cancel));
    assert_eq!(summary.completed(), 2);
    assert_eq!(summary.discarded.len(), 1);
    assert_eq!(summary.cancelled, 0);

    let discarded = &summary.discarded[0];
    assert_eq!(discarded.index, 1);
    assert!(discarded.reason.contains("station 2"), "{}", discarded.reason);
    assert!(discarded.reason.contains("'tip'"));
    assert!(trace.contains("point 1 discarded"));
    assert!(trace.contains("point 2: done"));

    // Points on either side of the failure come back in sweep order
    let indices: Vec<usize> = summary.results.iter().map(|(i, _)| *i).collect();
    assert_eq!(indices, vec![0, 2]);
    let alphas: Vec<f64> = summary
        .results
        .iter()
        .map(|(_, r)| r.condition.alpha_deg)
        .collect();
    assert_eq!(alphas, vec![2.0, 6.0]);
    let (low, high) = (&summary.results[0].1, &summary.results[1].1);
    assert!(high.coefficients.cl > low.coefficients.cl);
    for (_, result) in &summary.results {
        assert!(result.coefficients.cd_viscous > 0.0);
    }
}

#[test]
fn test_speed_sweep_discards_the_fast_point() {
    let mut mesh = plate();
    mesh.surfaces[0].strips[2].foil = "tip".to_string();
    let polar = ThinAirfoilPolar::default().with_foil_range("tip", 1e4, 1e6);
    let config = viscous_config();
    let trace = BufferTrace::new();
    let cancel = CancellationToken::new();
    let conditions: Vec<OperatingCondition> = [5.0, 10.0, 30.0]
        .iter()
        .map(|&v| OperatingCondition::new(3.0, VelocitySpec::Fixed(v)))
        .collect();

    let summary = SweepSummary::collect(run_sweep(&mesh, conditions, &config, &polar, &trace, &cancel));
    assert_eq!(summary.completed(), 2);
    assert_eq!(summary.discarded[0].index, 2);
    assert!(trace.contains("point 2 discarded"));
}

#[test]
fn test_viscous_divergence_reports_station() {
    let mesh = plate();
    // A polar with half the lift slope never matches within two iterations
    let polar = ThinAirfoilPolar {
        lift_slope: std::f64::consts::PI,
        ..ThinAirfoilPolar::default()
    };
    let config = SolverConfig {
        viscous: ViscousConfig {
            enabled: true,
            max_iterations: 2,
            relaxation: 0.1,
            ..ViscousConfig::default()
        },
        ..SolverConfig::default()
    };
    let trace = BufferTrace::new();
    let cancel = CancellationToken::new();
    let mut sweep = run_sweep(
        &mesh,
        vec![OperatingCondition::new(4.0, VelocitySpec::Fixed(10.0))],
        &config,
        &polar,
        &trace,
        &cancel,
    );
    let item = sweep.next().unwrap();
    match item.result {
        Err(AnalysisError::ViscousDivergence(failure)) => {
            assert_eq!(failure.surface, "wing");
            assert!(failure.station.is_some());
            assert!(failure.reason.contains("no convergence"));
        }
        other => panic!("expected a viscous divergence, got {other:?}"),
    }
    assert!(sweep.next().is_none());
}

/// Cancels its token as soon as a given stage is reported
struct CancelAt {
    stage: String,
    token: CancellationToken,
    lines: BufferTrace,
}

impl TraceSink for CancelAt {
    fn line(&self, message: &str) {
        if message.contains(&self.stage) {
            self.token.cancel();
        }
        self.lines.line(message);
    }
}

#[test]
fn test_cancellation_mid_point() {
    let mesh = plate();
    let config = SolverConfig::default();
    let polar = ThinAirfoilPolar::default();
    let token = CancellationToken::new();
    let sink = CancelAt {
        stage: "factorized".to_string(),
        token: token.clone(),
        lines: BufferTrace::new(),
    };
    let conditions = vec![OperatingCondition::new(2.0, VelocitySpec::Fixed(10.0)); 3];

    let items: Vec<_> = run_sweep(&mesh, conditions, &config, &polar, &sink, &token).collect();
    assert_eq!(items.len(), 3);
    for item in &items {
        assert!(matches!(item.result, Err(AnalysisError::Cancelled)));
    }
    let cancelled = TaskState::Cancelled.to_string();
    assert!(sink.lines.contains(&format!("point 0: {cancelled}")));
    assert!(!sink.lines.contains("point 1"));
    assert!(!sink.lines.contains("forces computed"));
}

#[test]
fn test_body_axis_sweep_factorizes_once() {
    let mesh = plate();
    let config = SolverConfig {
        wake: WakeConfig {
            alignment: WakeAlignment::BodyAxis,
            ..WakeConfig::default()
        },
        ..SolverConfig::default()
    };
    let polar = ThinAirfoilPolar::default();
    let trace = BufferTrace::new();
    let cancel = CancellationToken::new();
    let conditions: Vec<OperatingCondition> = (0..4)
        .map(|i| OperatingCondition::new(i as f64 * 2.0, VelocitySpec::Fixed(12.0)))
        .collect();

    let summary = SweepSummary::collect(run_sweep(&mesh, conditions, &config, &polar, &trace, &cancel));
    assert_eq!(summary.completed(), 4);
    let factorizations = trace.lines().iter().filter(|l| l.ends_with(": factorized")).count();
    assert_eq!(factorizations, 1);

    let cl: Vec<f64> = summary.results.iter().map(|(_, r)| r.coefficients.cl).collect();
    assert!(cl.windows(2).all(|w| w[1] > w[0]));
}
