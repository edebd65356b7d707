//! Velocity field of a solved singularity distribution

use ndarray::Array2;

use super::system::{LinearSystem, unknown_index};
use crate::core::constants::PI4;
use crate::core::influence::InfluenceEngine;
use crate::core::mesh::PanelMesh;
use crate::core::parallel::parallel_map_blocks;
use crate::core::types::{PlaneSide, Vector3d};
use crate::core::wake::WakeSheet;

/// Solved strengths of the body and its wake
#[derive(Debug, Clone)]
pub struct Singularities {
    /// Doublet unknowns
    pub doublets: Vec<f64>,
    /// Source strength per panel
    pub sources: Vec<f64>,
    /// Basis strengths per wake panel
    pub wake: Vec<[f64; 3]>,
}

impl Singularities {
    /// Strengths of a solution of `system`
    pub fn new(system: &LinearSystem, doublets: Vec<f64>, sources: Vec<f64>) -> Self {
        let wake = system.wake_strengths(&doublets);
        Self {
            doublets,
            sources,
            wake,
        }
    }

    /// Perturbation velocity induced at `p`
    pub fn velocity_at(
        &self,
        mesh: &PanelMesh,
        wake: Option<&WakeSheet>,
        engine: &InfluenceEngine,
        p: &Vector3d,
    ) -> Vector3d {
        let model = engine.model();
        let mut v = Vector3d::zero();
        for panel in &mesh.panels {
            let influence = engine.influence(panel, p);
            for (k, dv) in influence.doublet_velocities().iter().enumerate() {
                v += *dv * self.doublets[unknown_index(model, panel.index, k)];
            }
            let sigma = self.sources.get(panel.index).copied().unwrap_or(0.0);
            if sigma != 0.0 {
                v -= influence.source_velocity * sigma;
            }
        }
        if let Some(sheet) = wake {
            for (w, strength) in sheet.panels.iter().zip(&self.wake) {
                let influence = engine.wake_influence(&w.panel, p);
                for (k, dv) in influence.doublet_velocities().iter().enumerate() {
                    v += *dv * strength[k];
                }
            }
        }
        v / PI4
    }
}

/// Velocity influence at the centroids of a set of panels
///
/// Evaluated with the mean in-plane limit, i.e. the average of both sides
/// of a thin sheet.
#[derive(Debug, Clone)]
pub struct VelocityMatrix {
    /// Panels whose centroids are the rows
    pub panels: Vec<usize>,
    /// Doublet velocity (rows × unknowns), wake folded in
    pub doublet: Array2<Vector3d>,
    /// Source velocity (rows × panels)
    pub source: Array2<Vector3d>,
}

impl VelocityMatrix {
    /// Assemble the rows of `panels`
    pub fn assemble(
        mesh: &PanelMesh,
        wake: Option<&WakeSheet>,
        system: &LinearSystem,
        engine: &InfluenceEngine,
        panels: Vec<usize>,
        workers: usize,
    ) -> Self {
        let engine = engine.clone().with_side(PlaneSide::Mean);
        let model = engine.model();
        let n_unknowns = system.num_unknowns();
        let n_panels = mesh.num_panels();

        let rows: Vec<(Vec<Vector3d>, Vec<Vector3d>)> =
            parallel_map_blocks(panels.len(), workers, |range| {
                range
                    .map(|r| {
                        let point = mesh.panels[panels[r]].centroid;
                        let mut doublet = vec![Vector3d::zero(); n_unknowns];
                        let mut source = vec![Vector3d::zero(); n_panels];
                        for panel in &mesh.panels {
                            let influence = engine.influence(panel, &point);
                            for (k, dv) in influence.doublet_velocities().iter().enumerate() {
                                doublet[unknown_index(model, panel.index, k)] = *dv;
                            }
                            source[panel.index] = influence.source_velocity;
                        }
                        if let Some(sheet) = wake {
                            for (w, coupling) in sheet.panels.iter().zip(&system.wake_couplings) {
                                let influence = engine.wake_influence(&w.panel, &point);
                                for &(k, column, sign) in &coupling.terms {
                                    doublet[column] += influence.doublet_velocity[k] * sign;
                                }
                            }
                        }
                        (doublet, source)
                    })
                    .collect()
            });

        let mut doublet = Array2::from_elem((panels.len(), n_unknowns), Vector3d::zero());
        let mut source = Array2::from_elem((panels.len(), n_panels), Vector3d::zero());
        for (r, (d, s)) in rows.into_iter().enumerate() {
            for (c, v) in d.into_iter().enumerate() {
                doublet[[r, c]] = v;
            }
            for (c, v) in s.into_iter().enumerate() {
                source[[r, c]] = v;
            }
        }
        Self {
            panels,
            doublet,
            source,
        }
    }

    /// Perturbation velocity at every row for the given strengths
    pub fn velocities(&self, doublets: &[f64], sources: &[f64]) -> Vec<Vector3d> {
        (0..self.panels.len())
            .map(|r| {
                let mut v: Vector3d = self
                    .doublet
                    .row(r)
                    .iter()
                    .zip(doublets)
                    .map(|(dv, mu)| *dv * *mu)
                    .sum();
                v -= self
                    .source
                    .row(r)
                    .iter()
                    .zip(sources)
                    .map(|(sv, sigma)| *sv * *sigma)
                    .sum::<Vector3d>();
                v / PI4
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SolverConfig;
    use crate::core::mesh::{WingSpec, generate_wing};
    use approx::assert_relative_eq;

    #[test]
    fn test_matrix_matches_direct_evaluation() {
        let mesh = generate_wing(&WingSpec::rectangular(3.0, 1.0, 2, 3));
        let sheet = WakeSheet::build(&mesh, &Vector3d::unit_x(), 2, 10.0, 1.0).unwrap();
        let engine = InfluenceEngine::new(&SolverConfig::default());
        let system = LinearSystem::assemble(&mesh, Some(&sheet), &engine, 2).unwrap();
        let n = system.num_unknowns();
        let doublets: Vec<f64> = (0..n).map(|i| 0.1 * (i as f64 + 1.0)).collect();
        let sources = vec![0.0; mesh.num_panels()];
        let solution = Singularities::new(&system, doublets.clone(), sources.clone());

        let panels: Vec<usize> = (0..mesh.num_panels()).collect();
        let matrix = VelocityMatrix::assemble(&mesh, Some(&sheet), &system, &engine, panels, 2);
        let from_matrix = matrix.velocities(&doublets, &sources);

        let mean = engine.clone().with_side(PlaneSide::Mean);
        for (p, v) in mesh.panels.iter().zip(&from_matrix) {
            let direct = solution.velocity_at(&mesh, Some(&sheet), &mean, &p.centroid);
            assert_relative_eq!(v.x, direct.x, epsilon = 1e-10);
            assert_relative_eq!(v.y, direct.y, epsilon = 1e-10);
            assert_relative_eq!(v.z, direct.z, epsilon = 1e-10);
        }
    }
}
