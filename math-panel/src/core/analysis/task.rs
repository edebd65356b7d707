//! Operating-point task
//!
//! ```text
//! Initializing ─▶ MatrixAssembled ─▶ Factorized ─▶ WakeRollup(i) ─▶ ViscousLoop(i, j)
//!                     ▲                                                     │
//!                     └────────────── next rollup iteration ◀───────────────┤
//!                                                                           ▼
//!                           Done ◀─ StabilityDerivatives ◀─ ForcesComputed ◀┘
//! ```
//!
//! Any transition may end in `Failed` or, when the cancellation token is
//! set, in `Cancelled`. Everything is solved at unit speed; body rates are
//! divided by the flight speed and loads are scaled by the dynamic
//! pressure at the end. A wake geometry already factorized by an earlier
//! point skips straight to `WakeRollup`.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use super::cancel::CancellationToken;
use super::condition::{OperatingCondition, VelocitySpec, WindAxes};
use super::forces::{SurfaceLoads, SurfaceTopology, mean_perturbation, profile_drag};
use super::result::{AeroCoefficients, LoadTotals, OperatingPointResult, StabilityDerivatives, WakeSummary};
use super::stability::stability_derivatives;
use crate::core::assembly::{
    BoundaryState, FactorizedSystem, LinearSystem, Singularities, VelocityMatrix, factorize,
    trailing_edge_densities,
};
use crate::core::config::{SolverConfig, WakeAlignment};
use crate::core::constants::GRAVITY;
use crate::core::error::AnalysisError;
use crate::core::influence::InfluenceEngine;
use crate::core::mesh::PanelMesh;
use crate::core::parallel::{current_workers, with_pool};
use crate::core::trace::TraceSink;
use crate::core::types::{PlaneSide, Vector3d};
use crate::core::viscous::{PolarProvider, SpanDistribution, ViscousCoupling, apply_twist};
use crate::core::wake::{WakeModel, WakeSheet};

/// Lifecycle of an operating-point task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskState {
    /// Validating inputs
    Initializing,
    /// Influence matrix assembled
    MatrixAssembled,
    /// Influence matrix factorized
    Factorized,
    /// Wake rollup iteration on a factorized system
    WakeRollup(usize),
    /// Virtual-twist iteration `j` of rollup iteration `i`
    ViscousLoop(usize, usize),
    /// Loads integrated
    ForcesComputed,
    /// Perturbed solves running
    StabilityDerivatives,
    /// Finished with a result
    Done,
    /// Finished with an error
    Failed,
    /// Stopped by the cancellation token
    Cancelled,
}

impl fmt::Display for TaskState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskState::Initializing => write!(f, "initializing"),
            TaskState::MatrixAssembled => write!(f, "matrix assembled"),
            TaskState::Factorized => write!(f, "factorized"),
            TaskState::WakeRollup(i) => write!(f, "wake iteration {i}"),
            TaskState::ViscousLoop(i, j) => write!(f, "viscous iteration {j} (wake {i})"),
            TaskState::ForcesComputed => write!(f, "forces computed"),
            TaskState::StabilityDerivatives => write!(f, "stability derivatives"),
            TaskState::Done => write!(f, "done"),
            TaskState::Failed => write!(f, "failed"),
            TaskState::Cancelled => write!(f, "cancelled"),
        }
    }
}

/// Assembled and factorized system for one wake geometry
///
/// Shared between the points of a sweep as long as the wake direction does
/// not change, which is always the case with [`WakeAlignment::BodyAxis`].
#[derive(Debug)]
pub struct PreparedSystem {
    /// Wake direction, `None` without trailing edges
    pub direction: Option<Vector3d>,
    /// Wake sheet the system was assembled with
    pub sheet: Option<WakeSheet>,
    /// Influence matrices
    pub system: LinearSystem,
    /// Factors of the doublet matrix
    pub factors: FactorizedSystem,
    /// Mean velocity influence at thin-panel centroids
    pub velocity: Option<VelocityMatrix>,
}

/// One solved state at unit speed
struct Solution {
    singularities: Singularities,
    loads: SurfaceLoads,
    pressure: LoadTotals,
}

/// Solution kept when the rollup loop ends
struct Converged {
    prepared: Arc<PreparedSystem>,
    state: BoundaryState,
    solution: Solution,
    speed: f64,
    viscous_iterations: usize,
}

/// Analysis of a single operating point
pub struct AnalysisTask<'a> {
    mesh: &'a PanelMesh,
    condition: OperatingCondition,
    config: &'a SolverConfig,
    polars: &'a dyn PolarProvider,
    trace: &'a dyn TraceSink,
    cancel: &'a CancellationToken,
    engine: InfluenceEngine,
    label: String,
    state: TaskState,
}

impl<'a> AnalysisTask<'a> {
    /// Task for one condition
    pub fn new(
        mesh: &'a PanelMesh,
        condition: OperatingCondition,
        config: &'a SolverConfig,
        polars: &'a dyn PolarProvider,
        trace: &'a dyn TraceSink,
        cancel: &'a CancellationToken,
    ) -> Self {
        let label = format!("alpha={:.2}°", condition.alpha_deg);
        Self {
            mesh,
            condition,
            config,
            polars,
            trace,
            cancel,
            engine: InfluenceEngine::new(config),
            label,
            state: TaskState::Initializing,
        }
    }

    /// Prefix of every trace line
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = label.into();
        self
    }

    /// Current state
    pub fn state(&self) -> TaskState {
        self.state
    }

    /// Run to completion, reusing and updating `cache`
    pub fn run(
        &mut self,
        cache: &mut Option<Arc<PreparedSystem>>,
    ) -> Result<OperatingPointResult, AnalysisError> {
        match self.execute(cache) {
            Ok(result) => {
                self.state = TaskState::Done;
                self.trace.line(&format!(
                    "{}: done, V={:.3} m/s CL={:.5} CD={:.5} Cm={:.5}",
                    self.label,
                    result.speed,
                    result.coefficients.cl,
                    result.coefficients.cd,
                    result.coefficients.pitch
                ));
                Ok(result)
            }
            Err(e) => {
                self.state = if e.is_cancellation() {
                    TaskState::Cancelled
                } else {
                    TaskState::Failed
                };
                self.trace.line(&format!("{}: {} ({})", self.label, self.state, e));
                Err(e)
            }
        }
    }

    fn enter(&mut self, next: TaskState) -> Result<(), AnalysisError> {
        self.cancel.check()?;
        match next {
            TaskState::ViscousLoop(..) => log::debug!("{}: {}", self.label, next),
            _ => log::info!("{}: {}", self.label, next),
        }
        self.trace.line(&format!("{}: {}", self.label, next));
        self.state = next;
        Ok(())
    }

    fn execute(
        &mut self,
        cache: &mut Option<Arc<PreparedSystem>>,
    ) -> Result<OperatingPointResult, AnalysisError> {
        self.enter(TaskState::Initializing)?;
        self.condition.validate()?;
        self.mesh.validate()?;

        let mesh = self.mesh;
        let workers = current_workers();
        let axes = self.condition.wind_axes();
        let topology = SurfaceTopology::new(mesh);
        let has_wake = !mesh.trailing_edges.is_empty();
        let mut wake = WakeModel::new(&self.config.wake, mesh.reference.chord);
        let mut direction = match self.config.wake.alignment {
            WakeAlignment::BodyAxis => Vector3d::unit_x(),
            WakeAlignment::Freestream => axes.drag,
        };
        let mut spans: Vec<SpanDistribution> = mesh
            .surfaces
            .iter()
            .enumerate()
            .filter(|(_, s)| !s.strips.is_empty())
            .map(|(i, s)| SpanDistribution::new(i, s))
            .collect();

        let mut speed = match self.condition.velocity {
            VelocitySpec::Fixed(v) => Some(v),
            VelocitySpec::Balanced { .. } => None,
        };
        let mut iteration = 0;
        let converged = loop {
            let prepared = self.prepare(&mut wake, has_wake.then_some(direction), cache, workers)?;
            self.enter(TaskState::WakeRollup(iteration))?;
            let v = match speed {
                Some(v) => v,
                None => {
                    let v = self.balanced_speed(&prepared, &axes, &topology)?;
                    speed = Some(v);
                    v
                }
            };
            let base = self.base_state(&prepared, &wake, &axes, v)?;
            let (state, solution, viscous_iterations) = self.solve_coupled(
                &prepared,
                &base,
                &axes,
                &topology,
                &mut spans,
                v,
                iteration,
                workers,
            )?;

            let cl = solution.pressure.force.dot(&axes.lift) / mesh.reference.area;
            if has_wake {
                wake.record_lift(cl);
            }
            if !has_wake || wake.is_finished() {
                break Converged {
                    prepared,
                    state,
                    solution,
                    speed: v,
                    viscous_iterations,
                };
            }

            if self.config.wake.vortons.enabled {
                self.shed_vortons(&mut wake, &prepared, &state, &solution);
            }
            if self.config.wake.alignment == WakeAlignment::Freestream {
                direction = self.local_flow_direction(&prepared, &state, &solution, &wake, direction);
            }
            iteration += 1;
        };

        self.enter(TaskState::ForcesComputed)?;
        let Converged {
            prepared,
            state,
            solution,
            speed,
            viscous_iterations,
        } = converged;
        let profile = profile_drag(mesh, &axes, &spans);
        let coefficients =
            AeroCoefficients::from_loads(&mesh.reference, &axes, &solution.pressure, &profile);
        let dynamic_pressure = 0.5 * self.config.fluid.density * speed * speed;
        let loads = (solution.pressure + profile).scaled(dynamic_pressure);
        log::info!(
            "{}: V={:.3} m/s CL={:.5} CDi={:.5} CDv={:.5}",
            self.label,
            speed,
            coefficients.cl,
            coefficients.cd_induced,
            coefficients.cd_viscous
        );

        let stability = if self.condition.stability {
            self.enter(TaskState::StabilityDerivatives)?;
            Some(self.stability(&prepared, &state, &coefficients, &profile, &axes, &topology, speed)?)
        } else {
            None
        };

        let Solution {
            singularities,
            loads: surface,
            ..
        } = solution;
        Ok(OperatingPointResult {
            condition: self.condition.clone(),
            speed,
            dynamic_pressure,
            loads,
            coefficients,
            doublets: singularities.doublets.iter().map(|mu| mu * speed).collect(),
            sources: singularities.sources.iter().map(|s| s * speed).collect(),
            cp: surface.cp,
            spans,
            wake: WakeSummary {
                state: wake.state(),
                iterations: wake.iterations(),
                vortons: wake.active_vortons(),
                direction: prepared.direction.unwrap_or(direction),
            },
            viscous_iterations,
            stability,
        })
    }

    /// Build the wake along `direction` and the matching factorized system,
    /// or reuse the cached one
    fn prepare(
        &mut self,
        wake: &mut WakeModel,
        direction: Option<Vector3d>,
        cache: &mut Option<Arc<PreparedSystem>>,
        workers: usize,
    ) -> Result<Arc<PreparedSystem>, AnalysisError> {
        let mesh = self.mesh;
        let sheet = match direction {
            Some(d) => Some(wake.build_wake_panels(mesh, &d)?.clone()),
            None => None,
        };
        if let Some(cached) = cache.as_ref()
            && cached.direction == direction
        {
            log::debug!("{}: reusing factorized system", self.label);
            return Ok(Arc::clone(cached));
        }

        let system = LinearSystem::assemble(mesh, sheet.as_ref(), &self.engine, workers)?;
        self.enter(TaskState::MatrixAssembled)?;
        let factors = factorize(&system.doublet_matrix, self.config.precision)?;
        self.enter(TaskState::Factorized)?;

        let thin: Vec<usize> = (0..mesh.num_panels()).filter(|&j| mesh.is_thin(j)).collect();
        let velocity = (!thin.is_empty()).then(|| {
            VelocityMatrix::assemble(mesh, sheet.as_ref(), &system, &self.engine, thin, workers)
        });
        let prepared = Arc::new(PreparedSystem {
            direction,
            sheet,
            system,
            factors,
            velocity,
        });
        *cache = Some(Arc::clone(&prepared));
        Ok(prepared)
    }

    /// Onset flow at unit speed with the control deflections and the
    /// vorton field of the current wake
    fn base_state(
        &self,
        prepared: &PreparedSystem,
        wake: &WakeModel,
        axes: &WindAxes,
        speed: f64,
    ) -> Result<BoundaryState, AnalysisError> {
        let mesh = self.mesh;
        let mut state = BoundaryState::new(
            mesh,
            axes.drag,
            self.condition.rates / speed,
            mesh.reference.moment_point,
        );
        for (name, deflection) in &self.condition.controls {
            let control = mesh
                .controls
                .iter()
                .find(|c| &c.name == name)
                .ok_or_else(|| {
                    AnalysisError::InvalidOperatingPoint(format!("unknown control '{name}'"))
                })?;
            state.rotate_normals(&control.panels, &control.hinge_axis, deflection.to_radians());
        }
        if wake.active_vortons() > 0 {
            let ground = self.config.ground_height;
            state = state.with_induced(mesh, &prepared.system, |p| wake.vorton_velocity(p, ground));
        }
        Ok(state)
    }

    fn solve(
        &self,
        prepared: &PreparedSystem,
        state: &BoundaryState,
        topology: &SurfaceTopology,
    ) -> Result<Solution, AnalysisError> {
        let rhs = state.rhs(self.mesh, &prepared.system);
        let doublets = prepared.factors.solve(&rhs)?.to_vec();
        Ok(self.post_process(prepared, state, topology, doublets))
    }

    /// Solutions of several states with one batched back-substitution
    fn solve_many(
        &self,
        prepared: &PreparedSystem,
        states: &[BoundaryState],
        topology: &SurfaceTopology,
    ) -> Result<Vec<Solution>, AnalysisError> {
        let rhs: Vec<_> = states
            .iter()
            .map(|state| state.rhs(self.mesh, &prepared.system))
            .collect();
        let solutions = prepared.factors.solve_many(&rhs)?;
        Ok(states
            .iter()
            .zip(solutions)
            .map(|(state, x)| self.post_process(prepared, state, topology, x.to_vec()))
            .collect())
    }

    fn post_process(
        &self,
        prepared: &PreparedSystem,
        state: &BoundaryState,
        topology: &SurfaceTopology,
        doublets: Vec<f64>,
    ) -> Solution {
        let mesh = self.mesh;
        let singularities = Singularities::new(&prepared.system, doublets, state.sources(mesh));
        let gradients =
            topology.doublet_gradients(mesh, prepared.system.model, &singularities.doublets);
        let perturbation = mean_perturbation(mesh, prepared.velocity.as_ref(), &singularities);
        let loads = SurfaceLoads::compute(mesh, state, &gradients, &perturbation, 1.0);
        let pressure = loads.totals(mesh);
        Solution {
            singularities,
            loads,
            pressure,
        }
    }

    /// Speed at which the inviscid lift carries the weight
    fn balanced_speed(
        &self,
        prepared: &PreparedSystem,
        axes: &WindAxes,
        topology: &SurfaceTopology,
    ) -> Result<f64, AnalysisError> {
        let VelocitySpec::Balanced { mass } = self.condition.velocity else {
            return Err(AnalysisError::InvalidOperatingPoint(
                "balanced speed requested for a fixed-speed point".to_string(),
            ));
        };
        let mesh = self.mesh;
        let mut state = BoundaryState::new(mesh, axes.drag, Vector3d::zero(), mesh.reference.moment_point);
        for (name, deflection) in &self.condition.controls {
            if let Some(control) = mesh.controls.iter().find(|c| &c.name == name) {
                state.rotate_normals(&control.panels, &control.hinge_axis, deflection.to_radians());
            }
        }
        let solution = self.solve(prepared, &state, topology)?;
        let cl = solution.pressure.force.dot(&axes.lift) / mesh.reference.area;
        if !(cl.is_finite() && cl > 0.0) {
            return Err(AnalysisError::InvalidOperatingPoint(format!(
                "no positive lift to balance the weight (CL={cl:.5})"
            )));
        }
        let speed = (2.0 * mass * GRAVITY / (self.config.fluid.density * mesh.reference.area * cl)).sqrt();
        log::info!("{}: balanced speed {:.3} m/s at CL={:.5}", self.label, speed, cl);
        Ok(speed)
    }

    /// Panel solution with the virtual-twist loop wrapped around it when
    /// the viscous correction is enabled
    #[allow(clippy::too_many_arguments)]
    fn solve_coupled(
        &mut self,
        prepared: &PreparedSystem,
        base: &BoundaryState,
        axes: &WindAxes,
        topology: &SurfaceTopology,
        spans: &mut [SpanDistribution],
        speed: f64,
        iteration: usize,
        workers: usize,
    ) -> Result<(BoundaryState, Solution, usize), AnalysisError> {
        let mesh = self.mesh;
        let config = self.config;
        let viscous = &config.viscous;
        if !viscous.enabled || spans.is_empty() {
            let solution = self.solve(prepared, base, topology)?;
            solution.loads.update_strip_lift(mesh, axes, spans);
            return Ok((base.clone(), solution, 0));
        }

        let coupling = ViscousCoupling::new(viscous, &config.fluid, self.polars);
        let max_iterations = viscous.max_iterations.max(1);
        let mut j = 0;
        loop {
            self.enter(TaskState::ViscousLoop(iteration, j))?;
            let mut state = base.clone();
            apply_twist(mesh, spans, &mut state);
            let solution = self.solve(prepared, &state, topology)?;
            solution.loads.update_strip_lift(mesh, axes, spans);
            let worst = coupling
                .evaluate(spans, speed, workers)
                .map_err(AnalysisError::ViscousDivergence)?;
            log::debug!("{}: viscous iteration {j}, discrepancy {worst:.5}°", self.label);
            j += 1;
            if worst < viscous.tolerance_deg {
                return Ok((state, solution, j));
            }
            if j >= max_iterations {
                return Err(AnalysisError::ViscousDivergence(
                    coupling.non_convergence(spans, worst),
                ));
            }
            coupling.relax(spans);
        }
    }

    /// Shed the trailing densities as a vorton row and move every vorton
    /// one row length downstream
    fn shed_vortons(
        &self,
        wake: &mut WakeModel,
        prepared: &PreparedSystem,
        state: &BoundaryState,
        solution: &Solution,
    ) {
        let mesh = self.mesh;
        let densities =
            trailing_edge_densities(mesh, prepared.system.model, &solution.singularities.doublets);
        let shed = wake.insert_vorton_row(&densities);
        let snapshot = wake.clone();
        let length = prepared
            .sheet
            .as_ref()
            .and_then(|s| s.row_lengths.last().copied())
            .unwrap_or(0.0);
        let dt = length / state.freestream.norm().max(f64::EPSILON);
        let ground = self.config.ground_height;
        let engine = &self.engine;
        wake.advect(
            |p| {
                state.onset_at(p)
                    + solution
                        .singularities
                        .velocity_at(mesh, prepared.sheet.as_ref(), engine, p)
                    + snapshot.vorton_velocity(p, ground)
            },
            dt,
        );
        log::debug!(
            "{}: shed {} vortons, {} active",
            self.label,
            shed,
            wake.active_vortons()
        );
    }

    /// Mean local flow direction just behind the trailing edges
    fn local_flow_direction(
        &self,
        prepared: &PreparedSystem,
        state: &BoundaryState,
        solution: &Solution,
        wake: &WakeModel,
        current: Vector3d,
    ) -> Vector3d {
        let Some(sheet) = prepared.sheet.as_ref() else {
            return current;
        };
        let mesh = self.mesh;
        let engine = self.engine.clone().with_side(PlaneSide::Mean);
        let ground = self.config.ground_height;
        let total: Vector3d = sheet
            .panels
            .iter()
            .filter(|w| w.row == 0)
            .map(|w| {
                let p = w.panel.centroid;
                state.onset_at(&p)
                    + solution.singularities.velocity_at(mesh, Some(sheet), &engine, &p)
                    + wake.vorton_velocity(&p, ground)
            })
            .sum();
        match total.normalize() {
            Some(dir) => {
                log::debug!(
                    "{}: wake re-aligned to ({:.4}, {:.4}, {:.4})",
                    self.label,
                    dir.x,
                    dir.y,
                    dir.z
                );
                dir
            }
            None => current,
        }
    }

    #[allow(clippy::too_many_arguments)]
    fn stability(
        &self,
        prepared: &PreparedSystem,
        state: &BoundaryState,
        base: &AeroCoefficients,
        profile: &LoadTotals,
        axes: &WindAxes,
        topology: &SurfaceTopology,
        speed: f64,
    ) -> Result<StabilityDerivatives, AnalysisError> {
        let mesh = self.mesh;
        stability_derivatives(mesh, state, base, speed, self.config.stability_step, |perturbed| {
            self.cancel.check()?;
            Ok(self
                .solve_many(prepared, perturbed, topology)?
                .iter()
                .map(|solution| {
                    AeroCoefficients::from_loads(&mesh.reference, axes, &solution.pressure, profile)
                })
                .collect())
        })
    }
}

/// Analyse one operating point in its own worker pool
pub fn run_operating_point(
    mesh: &PanelMesh,
    condition: &OperatingCondition,
    config: &SolverConfig,
    polars: &dyn PolarProvider,
    trace: &dyn TraceSink,
    cancel: &CancellationToken,
) -> Result<OperatingPointResult, AnalysisError> {
    with_pool(config.threads, || {
        let mut cache = None;
        AnalysisTask::new(mesh, condition.clone(), config, polars, trace, cancel).run(&mut cache)
    })
}
