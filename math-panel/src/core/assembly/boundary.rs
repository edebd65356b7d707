//! Onset flow and right-hand side
//!
//! The onset velocity seen by the body is the freestream minus the
//! rotation of the body frame, plus whatever the free vortons induce:
//!
//! ```text
//! V_onset(P) = V∞ - ω × (P - c) + V_vorton(P)
//! ```
//!
//! Control deflections and virtual twist only tilt the normals used here;
//! the influence matrix keeps the undeflected geometry.

use ndarray::Array1;

use super::system::{BoundaryKind, LinearSystem};
use crate::core::constants::PI4;
use crate::core::mesh::PanelMesh;
use crate::core::types::Vector3d;

/// Onset flow of one solve
#[derive(Debug, Clone)]
pub struct BoundaryState {
    /// Freestream velocity in body axes
    pub freestream: Vector3d,
    /// Body angular rate
    pub rotation: Vector3d,
    /// Centre of rotation
    pub rotation_centre: Vector3d,
    /// Per-panel normals after deflections and twist
    pub normals: Vec<Vector3d>,
    /// Extra onset velocity per collocation row (empty when none)
    pub induced_rows: Vec<Vector3d>,
    /// Extra onset velocity per panel centroid (empty when none)
    pub induced_centroids: Vec<Vector3d>,
}

impl BoundaryState {
    /// Undeflected state for a freestream and a body rotation
    pub fn new(
        mesh: &PanelMesh,
        freestream: Vector3d,
        rotation: Vector3d,
        rotation_centre: Vector3d,
    ) -> Self {
        Self {
            freestream,
            rotation,
            rotation_centre,
            normals: mesh.panels.iter().map(|p| p.normal).collect(),
            induced_rows: Vec::new(),
            induced_centroids: Vec::new(),
        }
    }

    /// Onset velocity at `p`, without the induced part
    pub fn onset_at(&self, p: &Vector3d) -> Vector3d {
        self.freestream - self.rotation.cross(&(*p - self.rotation_centre))
    }

    /// Onset velocity at the centroid of `panel`, induced part included
    pub fn onset_at_centroid(&self, mesh: &PanelMesh, panel: usize) -> Vector3d {
        let induced = self
            .induced_centroids
            .get(panel)
            .copied()
            .unwrap_or_default();
        self.onset_at(&mesh.panels[panel].centroid) + induced
    }

    /// Rotate the normals of `panels` by `angle` about `axis`
    pub fn rotate_normals(&mut self, panels: &[usize], axis: &Vector3d, angle: f64) {
        if angle == 0.0 {
            return;
        }
        for &p in panels {
            if let Some(n) = self.normals.get_mut(p) {
                *n = n.rotate(axis, angle);
            }
        }
    }

    /// Add the velocity `field` induces at every collocation point and
    /// panel centroid
    pub fn with_induced<F>(mut self, mesh: &PanelMesh, system: &LinearSystem, field: F) -> Self
    where
        F: Fn(&Vector3d) -> Vector3d,
    {
        self.induced_rows = system.rows.iter().map(|r| field(&r.point)).collect();
        self.induced_centroids = mesh.panels.iter().map(|p| field(&p.centroid)).collect();
        self
    }

    /// Source strengths: `-n·V_onset` on thick panels, zero on thin ones
    pub fn sources(&self, mesh: &PanelMesh) -> Vec<f64> {
        (0..mesh.num_panels())
            .map(|j| {
                if mesh.is_thin(j) {
                    0.0
                } else {
                    -self.normals[j].dot(&self.onset_at_centroid(mesh, j))
                }
            })
            .collect()
    }

    /// Right-hand side of `system` for this onset flow
    pub fn rhs(&self, mesh: &PanelMesh, system: &LinearSystem) -> Array1<f64> {
        let sigma = Array1::from(self.sources(mesh));
        let mut b = if system.source_matrix.ncols() > 0 {
            system.source_matrix.dot(&sigma)
        } else {
            Array1::zeros(system.rows.len())
        };
        for (r, row) in system.rows.iter().enumerate() {
            if row.kind == BoundaryKind::Neumann {
                let induced = self.induced_rows.get(r).copied().unwrap_or_default();
                let onset = self.onset_at(&row.point) + induced;
                b[r] -= PI4 * self.normals[row.panel].dot(&onset);
            }
        }
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SolverConfig;
    use crate::core::influence::InfluenceEngine;
    use crate::core::mesh::{WingSpec, generate_icosphere, generate_wing};
    use approx::assert_relative_eq;

    #[test]
    fn test_rotation_onset() {
        let mesh = generate_icosphere(1.0, 0);
        let state = BoundaryState::new(
            &mesh,
            Vector3d::unit_x(),
            Vector3d::new(0.0, 0.0, 1.0),
            Vector3d::zero(),
        );
        // Positive yaw rate speeds the flow up on the +y side
        let v = state.onset_at(&Vector3d::new(0.0, 2.0, 0.0));
        assert_relative_eq!(v.x, 3.0, epsilon = 1e-12);
        let v = state.onset_at(&Vector3d::new(2.0, 0.0, 0.0));
        assert_relative_eq!(v.y, -2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_sources_close_the_body() {
        let mesh = generate_icosphere(1.0, 2);
        let state = BoundaryState::new(&mesh, Vector3d::unit_x(), Vector3d::zero(), Vector3d::zero());
        let sigma = state.sources(&mesh);
        let net: f64 = sigma
            .iter()
            .zip(&mesh.panels)
            .map(|(s, p)| s * p.area)
            .sum();
        assert!(net.abs() < 1e-10);
    }

    #[test]
    fn test_thin_rhs_tracks_incidence() {
        let mesh = generate_wing(&WingSpec::rectangular(2.0, 1.0, 2, 2));
        let engine = InfluenceEngine::new(&SolverConfig::default());
        let system = LinearSystem::assemble(&mesh, None, &engine, 1).unwrap();
        let alpha = 0.1_f64;
        let state = BoundaryState::new(
            &mesh,
            Vector3d::new(alpha.cos(), 0.0, alpha.sin()),
            Vector3d::zero(),
            Vector3d::zero(),
        );
        let b = state.rhs(&mesh, &system);
        for value in b.iter() {
            assert_relative_eq!(*value, -PI4 * alpha.sin(), epsilon = 1e-12);
        }

        // Tilting every normal by alpha is the same as flying at alpha
        let mut level = BoundaryState::new(&mesh, Vector3d::unit_x(), Vector3d::zero(), Vector3d::zero());
        let all: Vec<usize> = (0..mesh.num_panels()).collect();
        // About +y the normal +z tips towards +x
        level.rotate_normals(&all, &Vector3d::unit_y(), alpha);
        let tilted = level.rhs(&mesh, &system);
        for value in tilted.iter() {
            assert_relative_eq!(*value, -PI4 * alpha.sin(), epsilon = 1e-12);
        }
    }
}
