//! Surface velocities, pressures and loads
//!
//! Thick panels carry the full surface velocity `V_t + ∇μ` and a pressure
//! coefficient `Cp = 1 - |V|² / V∞²`. Thin panels carry a pressure jump
//! between the lower and upper faces,
//!
//! ```text
//! ΔCp = Cp_lower - Cp_upper = 2 V_mean · ∇μ / V∞²
//! ```
//!
//! where `V_mean` is the onset plus the average perturbation of both faces.
//! Panel loads are expressed per unit dynamic pressure.

use std::collections::{HashMap, HashSet};

use super::condition::WindAxes;
use super::result::LoadTotals;
use crate::core::assembly::{BoundaryState, Singularities, VelocityMatrix, unknown_index};
use crate::core::mesh::{Panel, PanelMesh};
use crate::core::types::{DoubletModel, Vector3d};
use crate::core::viscous::SpanDistribution;

/// Node connectivity used to recover nodal doublet values
#[derive(Debug, Clone)]
pub struct SurfaceTopology {
    node_panels: Vec<Vec<usize>>,
    free: Vec<bool>,
    trailing: Vec<bool>,
}

impl SurfaceTopology {
    /// Connectivity of `mesh`
    ///
    /// Nodes on free edges of thin surfaces (edges with a single panel that
    /// are not trailing edges) are marked free: the doublet strength is zero
    /// there.
    pub fn new(mesh: &PanelMesh) -> Self {
        let n = mesh.nodes.len();
        let key = |a: usize, b: usize| if a < b { (a, b) } else { (b, a) };

        let mut trailing = vec![false; n];
        let mut trailing_edges = HashSet::new();
        for te in &mesh.trailing_edges {
            for &node in &te.nodes {
                if let Some(t) = trailing.get_mut(node) {
                    *t = true;
                }
            }
            trailing_edges.insert(key(te.nodes[0], te.nodes[1]));
        }

        let mut edge_use: HashMap<(usize, usize), usize> = HashMap::new();
        for panel in mesh.panels.iter().filter(|p| mesh.is_thin(p.index)) {
            for i in 0..3 {
                let edge = key(panel.nodes[i], panel.nodes[(i + 1) % 3]);
                *edge_use.entry(edge).or_default() += 1;
            }
        }
        let mut free = vec![false; n];
        for (&(a, b), &count) in &edge_use {
            if count == 1 && !trailing_edges.contains(&(a, b)) {
                free[a] = true;
                free[b] = true;
            }
        }

        Self {
            node_panels: mesh.node_panels(),
            free,
            trailing,
        }
    }

    /// True on a free edge of a thin surface
    pub fn is_free(&self, node: usize) -> bool {
        self.free.get(node).copied().unwrap_or(false)
    }

    /// Area-weighted doublet value at `node` as seen from `panel`
    ///
    /// Only panels of the same surface contribute; at trailing-edge nodes
    /// only panels on the same side do, so the upper and lower values stay
    /// apart.
    fn nodal_value(&self, mesh: &PanelMesh, mu: &[f64], panel: &Panel, node: usize) -> f64 {
        if self.is_free(node) {
            return 0.0;
        }
        let same_side = self.trailing.get(node).copied().unwrap_or(false);
        let (sum, area) = self
            .node_panels
            .get(node)
            .into_iter()
            .flatten()
            .map(|&j| &mesh.panels[j])
            .filter(|q| q.surface == panel.surface && (!same_side || q.side == panel.side))
            .fold((0.0, 0.0), |(s, a), q| (s + mu[q.index] * q.area, a + q.area));
        if area > 0.0 {
            sum / area
        } else {
            mu[panel.index]
        }
    }

    /// Surface gradient of the doublet strength on every panel
    pub fn doublet_gradients(&self, mesh: &PanelMesh, model: DoubletModel, mu: &[f64]) -> Vec<Vector3d> {
        mesh.panels
            .iter()
            .map(|panel| {
                (0..3)
                    .map(|k| {
                        let value = match model {
                            DoubletModel::Uniform => {
                                self.nodal_value(mesh, mu, panel, panel.nodes[k])
                            }
                            DoubletModel::Linear => mu[unknown_index(model, panel.index, k)],
                        };
                        panel.basis_gradient(k) * value
                    })
                    .sum()
            })
            .collect()
    }
}

/// Mean perturbation velocity at the centroid of every thin panel, zero
/// on thick panels
pub fn mean_perturbation(
    mesh: &PanelMesh,
    matrix: Option<&VelocityMatrix>,
    singularities: &Singularities,
) -> Vec<Vector3d> {
    let mut velocities = vec![Vector3d::zero(); mesh.num_panels()];
    if let Some(matrix) = matrix {
        let rows = matrix.velocities(&singularities.doublets, &singularities.sources);
        for (&panel, v) in matrix.panels.iter().zip(rows) {
            velocities[panel] = v;
        }
    }
    velocities
}

/// Pressure and load of every panel
#[derive(Debug, Clone, Default)]
pub struct SurfaceLoads {
    /// Pressure coefficient, or pressure jump on thin panels
    pub cp: Vec<f64>,
    /// Panel force per unit dynamic pressure (m²)
    pub forces: Vec<Vector3d>,
}

impl SurfaceLoads {
    /// Loads of every panel for a solved state
    ///
    /// `reference_speed` sets the dynamic pressure the coefficients are
    /// referred to.
    pub fn compute(
        mesh: &PanelMesh,
        boundary: &BoundaryState,
        gradients: &[Vector3d],
        mean_perturbation: &[Vector3d],
        reference_speed: f64,
    ) -> Self {
        let v2 = reference_speed * reference_speed;
        let (cp, forces) = mesh
            .panels
            .iter()
            .map(|panel| {
                let j = panel.index;
                let normal = boundary.normals[j];
                let onset = boundary.onset_at_centroid(mesh, j);
                if mesh.is_thin(j) {
                    let mean = onset + mean_perturbation[j];
                    let jump = 2.0 * mean.dot(&gradients[j]) / v2;
                    (jump, normal * (jump * panel.area))
                } else {
                    let tangential = onset - normal * normal.dot(&onset);
                    let surface = tangential + gradients[j];
                    let cp = 1.0 - surface.norm_sqr() / v2;
                    (cp, normal * (-cp * panel.area))
                }
            })
            .unzip();
        Self { cp, forces }
    }

    /// Resultant force and moment about the reference point
    pub fn totals(&self, mesh: &PanelMesh) -> LoadTotals {
        let centre = mesh.reference.moment_point;
        mesh.panels
            .iter()
            .zip(&self.forces)
            .fold(LoadTotals::default(), |acc, (panel, f)| LoadTotals {
                force: acc.force + *f,
                moment: acc.moment + (panel.centroid - centre).cross(f),
            })
    }

    /// Section lift coefficient of every station, normal to the flow and
    /// to the local span axis
    pub fn update_strip_lift(&self, mesh: &PanelMesh, axes: &WindAxes, spans: &mut [SpanDistribution]) {
        for span in spans.iter_mut() {
            let Some(surface) = mesh.surfaces.get(span.surface) else {
                continue;
            };
            for (i, strip) in surface.strips.iter().enumerate() {
                let lift_dir = axes
                    .drag
                    .cross(&strip.span_axis)
                    .normalize()
                    .unwrap_or(axes.lift);
                let lift: f64 = strip.panels.iter().map(|&p| self.forces[p].dot(&lift_dir)).sum();
                span.cl_inviscid[i] = lift / span.area(i);
            }
        }
    }
}

/// Profile drag of every station, applied at its quarter-chord point
pub fn profile_drag(mesh: &PanelMesh, axes: &WindAxes, spans: &[SpanDistribution]) -> LoadTotals {
    let centre = mesh.reference.moment_point;
    let mut totals = LoadTotals::default();
    for span in spans {
        let Some(surface) = mesh.surfaces.get(span.surface) else {
            continue;
        };
        for (i, strip) in surface.strips.iter().enumerate() {
            let force = axes.drag * (span.profile_drag[i] * span.area(i));
            totals.force += force;
            totals.moment += (strip.quarter_chord - centre).cross(&force);
        }
    }
    totals
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::{WingSpec, generate_icosphere, generate_wing};
    use approx::assert_relative_eq;

    #[test]
    fn test_free_nodes_of_a_plate() {
        let mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 2, 4));
        let topology = SurfaceTopology::new(&mesh);
        for (i, node) in mesh.nodes.iter().enumerate() {
            let on_leading_edge = node.x.abs() < 1e-12;
            let on_tip = (node.y.abs() - 2.0).abs() < 1e-12;
            let expected = on_leading_edge || on_tip;
            assert_eq!(topology.is_free(i), expected, "node {i} at {node:?}");
        }
    }

    #[test]
    fn test_linear_gradient_is_exact() {
        let mesh = generate_icosphere(1.0, 1);
        let topology = SurfaceTopology::new(&mesh);
        let model = DoubletModel::Linear;
        let mu: Vec<f64> = mesh
            .panels
            .iter()
            .flat_map(|p| p.vertices.iter().map(|v| v.x))
            .collect();
        let gradients = topology.doublet_gradients(&mesh, model, &mu);
        for (panel, g) in mesh.panels.iter().zip(&gradients) {
            let n = panel.normal;
            let expected = Vector3d::unit_x() - n * n.x;
            assert_relative_eq!(g.x, expected.x, epsilon = 1e-9);
            assert_relative_eq!(g.y, expected.y, epsilon = 1e-9);
            assert_relative_eq!(g.z, expected.z, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_uniform_pressure_has_no_resultant() {
        let mesh = generate_icosphere(1.0, 2);
        let loads = SurfaceLoads {
            cp: vec![1.0; mesh.num_panels()],
            forces: mesh.panels.iter().map(|p| p.normal * -p.area).collect(),
        };
        let totals = loads.totals(&mesh);
        assert!(totals.force.norm() < 1e-10);
        assert!(totals.moment.norm() < 1e-10);
    }

    #[test]
    fn test_stagnation_pressure_without_doublets() {
        let mesh = generate_icosphere(1.0, 2);
        let state = BoundaryState::new(&mesh, Vector3d::unit_x(), Vector3d::zero(), Vector3d::zero());
        let zero = vec![Vector3d::zero(); mesh.num_panels()];
        let loads = SurfaceLoads::compute(&mesh, &state, &zero, &zero, 1.0);
        for (panel, cp) in mesh.panels.iter().zip(&loads.cp) {
            assert_relative_eq!(*cp, panel.normal.x * panel.normal.x, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_profile_drag_along_the_flow() {
        let mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 2, 4));
        let mut span = SpanDistribution::new(0, &mesh.surfaces[0]);
        span.profile_drag.iter_mut().for_each(|cd| *cd = 0.01);
        let axes = WindAxes::new(0.0, 0.0);
        let drag = profile_drag(&mesh, &axes, &[span]);
        assert_relative_eq!(drag.force.x, 0.04, epsilon = 1e-12);
        assert!(drag.force.z.abs() < 1e-15);
        // Symmetric span: no rolling or yawing moment
        assert!(drag.moment.x.abs() < 1e-12);
        assert!(drag.moment.z.abs() < 1e-12);
    }
}
