//! Trailing wake: panel sheet and free vortex particles
//!
//! ```text
//! NoWake ─build─▶ WakePanelsBuilt ─insert─▶ VortonRowInserted
//!                      │                          │
//!                      └──── record_lift ─────────┴─▶ Converged | IterationLimitReached
//! ```
//!
//! The sheet is rebuilt wholesale on every `build_wake_panels` call; vorton
//! rows survive rebuilds and are only cleared by [`WakeModel::reset`].

pub mod sheet;
pub mod vorton;

pub use sheet::{WakePanel, WakeSheet, row_lengths};
pub use vorton::{Vorton, VortonRow};

use serde::Serialize;

use crate::core::config::WakeConfig;
use crate::core::error::GeometryError;
use crate::core::mesh::PanelMesh;
use crate::core::types::Vector3d;

/// Merged vortons weaker than this are dropped
const MIN_VORTON_STRENGTH: f64 = 1e-12;

/// Wake iteration state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WakeState {
    /// Nothing built yet
    NoWake,
    /// Panel sheet available
    WakePanelsBuilt,
    /// A vorton row was shed during the current iteration
    VortonRowInserted,
    /// Lift changed less than the tolerance
    Converged,
    /// Iteration budget exhausted before convergence
    IterationLimitReached,
}

/// Wake of one operating point
#[derive(Debug, Clone)]
pub struct WakeModel {
    config: WakeConfig,
    reference_chord: f64,
    state: WakeState,
    sheet: Option<WakeSheet>,
    rows: Vec<VortonRow>,
    lift_history: Vec<f64>,
}

impl WakeModel {
    /// Empty wake; lengths are scaled by `reference_chord`
    pub fn new(config: &WakeConfig, reference_chord: f64) -> Self {
        Self {
            config: config.clone(),
            reference_chord,
            state: WakeState::NoWake,
            sheet: None,
            rows: Vec::new(),
            lift_history: Vec::new(),
        }
    }

    /// Forget the sheet, the vortons and the lift history
    pub fn reset(&mut self) {
        self.state = WakeState::NoWake;
        self.sheet = None;
        self.rows.clear();
        self.lift_history.clear();
    }

    /// Current state
    pub fn state(&self) -> WakeState {
        self.state
    }

    /// Current panel sheet
    pub fn sheet(&self) -> Option<&WakeSheet> {
        self.sheet.as_ref()
    }

    /// Vorton rows, oldest first
    pub fn vorton_rows(&self) -> &[VortonRow] {
        &self.rows
    }

    /// Number of recorded iterations
    pub fn iterations(&self) -> usize {
        self.lift_history.len()
    }

    /// True once the rollup loop is over
    pub fn is_finished(&self) -> bool {
        matches!(
            self.state,
            WakeState::Converged | WakeState::IterationLimitReached
        )
    }

    /// Extrude the panel sheet along `direction`, replacing any previous one
    pub fn build_wake_panels(
        &mut self,
        mesh: &PanelMesh,
        direction: &Vector3d,
    ) -> Result<&WakeSheet, GeometryError> {
        let sheet = WakeSheet::build(
            mesh,
            direction,
            self.config.panel_rows,
            self.config.length_chords * self.reference_chord,
            self.config.progression,
        )?;
        if !self.is_finished() {
            self.state = WakeState::WakePanelsBuilt;
        }
        log::debug!(
            "wake sheet: {} panels along ({:.4}, {:.4}, {:.4})",
            sheet.panels.len(),
            sheet.direction.x,
            sheet.direction.y,
            sheet.direction.z
        );
        Ok(self.sheet.insert(sheet))
    }

    /// Shed the last sheet row as a vorton row
    ///
    /// `densities[t]` holds the doublet strengths at the two nodes of
    /// trailing edge `t`. Returns the number of vortons created.
    pub fn insert_vorton_row(&mut self, densities: &[[f64; 2]]) -> usize {
        let Some(sheet) = &self.sheet else {
            return 0;
        };
        let strength = |index: usize| {
            let w = &sheet.panels[index];
            let mu = densities.get(w.trailing_edge).copied().unwrap_or([0.0; 2]);
            w.slots.iter().map(|&s| mu[s]).sum::<f64>() / 3.0
        };
        let merge = self.config.vortons.merge_tolerance * self.reference_chord;
        let row = VortonRow::from_sheet(sheet, strength, merge, MIN_VORTON_STRENGTH);
        let count = row.vortons.len();
        self.rows.push(row);
        self.drop_inactive_rows();
        self.state = WakeState::VortonRowInserted;
        count
    }

    /// Move every active vorton by `velocity(position) * dt` and deactivate
    /// those past the cutoff distance
    pub fn advect<F>(&mut self, velocity: F, dt: f64)
    where
        F: Fn(&Vector3d) -> Vector3d,
    {
        let velocities: Vec<Vec<Vector3d>> = self
            .rows
            .iter()
            .map(|row| {
                row.vortons
                    .iter()
                    .map(|v| {
                        if v.active {
                            velocity(&v.position)
                        } else {
                            Vector3d::zero()
                        }
                    })
                    .collect()
            })
            .collect();

        let cutoff = self
            .sheet
            .as_ref()
            .map(|s| (s.direction, s.trailing_station));
        let limit = self.config.vortons.cutoff_chords * self.reference_chord;
        for (row, vel) in self.rows.iter_mut().zip(velocities) {
            for (v, u) in row.vortons.iter_mut().zip(vel) {
                if !v.active {
                    continue;
                }
                v.position += u * dt;
                if let Some((dir, station)) = cutoff
                    && v.position.dot(&dir) - station > limit
                {
                    v.active = false;
                }
            }
        }
        self.drop_inactive_rows();
    }

    fn drop_inactive_rows(&mut self) {
        let before = self.rows.len();
        self.rows.retain(|row| !row.is_inactive());
        if self.rows.len() < before {
            log::debug!("dropped {} inactive vorton rows", before - self.rows.len());
        }
    }

    /// Velocity induced by all active vortons
    pub fn vorton_velocity(&self, p: &Vector3d, ground: Option<f64>) -> Vector3d {
        let core = self.config.vortons.core_radius;
        self.rows
            .iter()
            .flat_map(|row| row.vortons.iter())
            .map(|v| v.velocity_at(p, core, ground))
            .sum()
    }

    /// Number of active vortons
    pub fn active_vortons(&self) -> usize {
        self.rows
            .iter()
            .flat_map(|row| row.vortons.iter())
            .filter(|v| v.active)
            .count()
    }

    /// Record the lift coefficient of the iteration just solved and decide
    /// whether the rollup is over
    pub fn record_lift(&mut self, cl: f64) -> WakeState {
        self.lift_history.push(cl);
        let n = self.lift_history.len();
        let max = self.config.max_iterations.max(1);
        if max == 1 {
            self.state = WakeState::Converged;
        } else if n >= 2
            && (self.lift_history[n - 1] - self.lift_history[n - 2]).abs()
                < self.config.lift_tolerance
        {
            self.state = WakeState::Converged;
        } else if n >= max {
            self.mark_limit_reached();
        }
        self.state
    }

    /// Stop the rollup without convergence
    pub fn mark_limit_reached(&mut self) {
        log::warn!(
            "wake rollup stopped after {} iterations without convergence",
            self.lift_history.len()
        );
        self.state = WakeState::IterationLimitReached;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::{WingSpec, generate_wing};
    use approx::assert_relative_eq;

    fn wake() -> (PanelMesh, WakeModel) {
        let mesh = generate_wing(&WingSpec::rectangular(2.0, 1.0, 2, 4));
        let config = WakeConfig {
            panel_rows: 3,
            length_chords: 6.0,
            max_iterations: 5,
            ..WakeConfig::default()
        };
        (mesh, WakeModel::new(&config, 1.0))
    }

    #[test]
    fn test_build_is_idempotent() {
        let (mesh, mut model) = wake();
        let dir = Vector3d::new(1.0, 0.0, 0.1);
        let first = model.build_wake_panels(&mesh, &dir).unwrap().clone();
        let second = model.build_wake_panels(&mesh, &dir).unwrap();
        assert_eq!(first.nodes, second.nodes);
        assert_eq!(first.panels.len(), second.panels.len());
        for (a, b) in first.panels.iter().zip(&second.panels) {
            assert_eq!(a.panel.vertices, b.panel.vertices);
            assert_eq!(a.slots, b.slots);
        }
        assert_eq!(model.state(), WakeState::WakePanelsBuilt);
    }

    #[test]
    fn test_vorton_row_conserves_circulation() {
        let (mesh, mut model) = wake();
        model.build_wake_panels(&mesh, &Vector3d::unit_x()).unwrap();
        let densities: Vec<[f64; 2]> = [0.3, 0.7, 0.7, 0.3]
            .iter()
            .map(|&mu| [mu, mu])
            .collect();
        model.insert_vorton_row(&densities);
        assert_eq!(model.state(), WakeState::VortonRowInserted);

        let row = &model.vorton_rows()[0];
        let total = row.total_vortex();
        assert!(total.norm() < 1e-12);

        // Streamwise vortex between columns 0 and 1 carries the strength jump
        let y = -0.5;
        let trailing: Vec<&Vorton> = row
            .vortons
            .iter()
            .filter(|v| (v.position.y - y).abs() < 1e-9 && v.vortex.x.abs() > 1e-9)
            .collect();
        assert_eq!(trailing.len(), 1);
        let length = model.sheet().unwrap().row_lengths.last().copied().unwrap();
        assert_relative_eq!(trailing[0].vortex.x.abs(), 0.4 * length, epsilon = 1e-12);

        // Middle columns share the same strength: no streamwise vortex at y = 0
        assert!(
            row.vortons
                .iter()
                .all(|v| (v.position.y).abs() > 1e-9 || v.vortex.x.abs() < 1e-12)
        );
        assert!(row.links.iter().any(|l| l.is_none()));
    }

    #[test]
    fn test_advect_deactivates_and_drops_rows() {
        let (mesh, mut model) = wake();
        model.build_wake_panels(&mesh, &Vector3d::unit_x()).unwrap();
        model.insert_vorton_row(&[[1.0, 1.0]; 4]);
        assert!(model.active_vortons() > 0);
        model.advect(|_| Vector3d::unit_x(), 1.0);
        assert!(!model.vorton_rows().is_empty());
        model.advect(|_| Vector3d::unit_x(), 100.0);
        assert!(model.vorton_rows().is_empty());
    }

    #[test]
    fn test_record_lift_convergence() {
        let (mesh, mut model) = wake();
        model.build_wake_panels(&mesh, &Vector3d::unit_x()).unwrap();
        assert_eq!(model.record_lift(0.50), WakeState::WakePanelsBuilt);
        assert_eq!(model.record_lift(0.45), WakeState::WakePanelsBuilt);
        assert_eq!(model.record_lift(0.44999), WakeState::Converged);

        model.reset();
        assert_eq!(model.state(), WakeState::NoWake);
        for cl in [0.1, 0.2, 0.3, 0.4] {
            model.record_lift(cl);
        }
        assert_eq!(model.record_lift(0.5), WakeState::IterationLimitReached);
    }
}
