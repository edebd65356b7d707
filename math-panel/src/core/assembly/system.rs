//! Dense influence-matrix assembly
//!
//! One row per collocation point, one column per doublet unknown. Rows of
//! thick panels enforce a zero internal perturbation potential (Dirichlet):
//!
//! ```text
//! Σ_j μ_j D_ij = Σ_j σ_j S_ij
//! ```
//!
//! Rows of thin panels enforce a zero normal velocity (Neumann):
//!
//! ```text
//! Σ_j μ_j n_i·∇D_ij = -4π n_i·V_onset + Σ_j σ_j n_i·∇S_ij
//! ```
//!
//! Wake panels carry no unknown of their own. The Kutta condition ties
//! their strength to the trailing-edge unknowns (upper minus lower), so
//! their influence is folded into those columns.

use ndarray::Array2;

use crate::core::error::GeometryError;
use crate::core::influence::{Influence, InfluenceEngine};
use crate::core::mesh::PanelMesh;
use crate::core::parallel::parallel_map_blocks;
use crate::core::types::{DoubletModel, Vector3d};
use crate::core::wake::WakeSheet;

/// Boundary condition enforced by a row
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoundaryKind {
    /// Zero internal perturbation potential (thick surfaces)
    Dirichlet,
    /// Zero normal velocity (thin surfaces)
    Neumann,
}

/// One collocation point
#[derive(Debug, Clone, Copy)]
pub struct CollocationRow {
    /// Panel owning the point
    pub panel: usize,
    /// Position
    pub point: Vector3d,
    /// Condition enforced at the point
    pub kind: BoundaryKind,
}

/// Kutta coupling of one wake panel: for each wake basis function, the
/// body unknowns whose signed sum gives its strength
#[derive(Debug, Clone, Default)]
pub struct WakeCoupling {
    /// `(wake basis, column, sign)` triples
    pub terms: Vec<(usize, usize, f64)>,
}

/// Column of the `k`-th doublet unknown of a panel
#[inline]
pub fn unknown_index(model: DoubletModel, panel: usize, k: usize) -> usize {
    panel * model.unknowns_per_panel() + k
}

/// Assembled (not yet factorized) system
#[derive(Debug, Clone)]
pub struct LinearSystem {
    /// Doublet model of the columns
    pub model: DoubletModel,
    /// Collocation layout, row by row
    pub rows: Vec<CollocationRow>,
    /// Doublet influence matrix, wake folded in
    pub doublet_matrix: Array2<f64>,
    /// Source influence (rows × panels); zero columns for thin panels
    pub source_matrix: Array2<f64>,
    /// Kutta coupling per wake panel, empty without wake
    pub wake_couplings: Vec<WakeCoupling>,
}

impl LinearSystem {
    /// Number of unknowns
    pub fn num_unknowns(&self) -> usize {
        self.doublet_matrix.ncols()
    }

    /// Collocation layout of a mesh: one point per unknown
    pub fn collocation(mesh: &PanelMesh, model: DoubletModel) -> Vec<CollocationRow> {
        mesh.panels
            .iter()
            .flat_map(|panel| {
                let kind = if mesh.is_thin(panel.index) {
                    BoundaryKind::Neumann
                } else {
                    BoundaryKind::Dirichlet
                };
                panel
                    .collocation_points(model)
                    .into_iter()
                    .map(move |point| CollocationRow {
                        panel: panel.index,
                        point,
                        kind,
                    })
            })
            .collect()
    }

    /// Assemble the influence matrices of `mesh` and its wake
    pub fn assemble(
        mesh: &PanelMesh,
        wake: Option<&WakeSheet>,
        engine: &InfluenceEngine,
        workers: usize,
    ) -> Result<Self, GeometryError> {
        mesh.validate()?;
        let model = engine.model();
        let rows = Self::collocation(mesh, model);
        let n_rows = rows.len();
        let n_panels = mesh.num_panels();
        let couplings = match wake {
            Some(sheet) => wake_couplings(mesh, sheet, model)?,
            None => Vec::new(),
        };
        let has_sources = (0..n_panels).any(|j| !mesh.is_thin(j));

        let assembled: Vec<(Vec<f64>, Vec<f64>)> =
            parallel_map_blocks(n_rows, workers, |range| {
                range
                    .map(|r| assemble_row(mesh, wake, &couplings, engine, &rows[r], has_sources))
                    .collect()
            });

        let mut doublet_matrix = Array2::zeros((n_rows, n_rows));
        let mut source_matrix = Array2::zeros((n_rows, if has_sources { n_panels } else { 0 }));
        for (r, (doublets, sources)) in assembled.into_iter().enumerate() {
            for (c, value) in doublets.into_iter().enumerate() {
                doublet_matrix[[r, c]] = value;
            }
            for (c, value) in sources.into_iter().enumerate() {
                source_matrix[[r, c]] = value;
            }
        }

        log::debug!(
            "assembled {} rows, {} wake panels folded",
            n_rows,
            couplings.len()
        );
        Ok(Self {
            model,
            rows,
            doublet_matrix,
            source_matrix,
            wake_couplings: couplings,
        })
    }

    /// Basis strengths of every wake panel for body unknowns `mu`
    pub fn wake_strengths(&self, mu: &[f64]) -> Vec<[f64; 3]> {
        self.wake_couplings
            .iter()
            .map(|coupling| {
                let mut s = [0.0; 3];
                for &(k, column, sign) in &coupling.terms {
                    s[k] += sign * mu[column];
                }
                s
            })
            .collect()
    }
}

/// Row quantity of an influence: potential for Dirichlet rows, normal
/// velocity for Neumann rows
fn project(influence: &Influence, kind: BoundaryKind, normal: &Vector3d) -> ([f64; 3], f64) {
    match kind {
        BoundaryKind::Dirichlet => (influence.doublet_potential, influence.source_potential),
        BoundaryKind::Neumann => (
            std::array::from_fn(|k| normal.dot(&influence.doublet_velocity[k])),
            normal.dot(&influence.source_velocity),
        ),
    }
}

fn assemble_row(
    mesh: &PanelMesh,
    wake: Option<&WakeSheet>,
    couplings: &[WakeCoupling],
    engine: &InfluenceEngine,
    row: &CollocationRow,
    has_sources: bool,
) -> (Vec<f64>, Vec<f64>) {
    let model = engine.model();
    let per_panel = model.unknowns_per_panel();
    let normal = mesh.panels[row.panel].normal;
    let mut doublets = vec![0.0; mesh.num_panels() * per_panel];
    let mut sources = vec![0.0; if has_sources { mesh.num_panels() } else { 0 }];

    for panel in &mesh.panels {
        let influence = engine.influence(panel, &row.point);
        let (d, s) = project(&influence, row.kind, &normal);
        for (k, value) in d.iter().take(per_panel).enumerate() {
            doublets[unknown_index(model, panel.index, k)] = *value;
        }
        if has_sources && !mesh.is_thin(panel.index) {
            sources[panel.index] = s;
        }
    }

    if let Some(sheet) = wake {
        for (w, coupling) in sheet.panels.iter().zip(couplings) {
            let influence = engine.wake_influence(&w.panel, &row.point);
            let (d, _) = project(&influence, row.kind, &normal);
            for &(k, column, sign) in &coupling.terms {
                doublets[column] += sign * d[k];
            }
        }
    }
    (doublets, sources)
}

/// Kutta couplings of every wake panel of `sheet`
pub fn wake_couplings(
    mesh: &PanelMesh,
    sheet: &WakeSheet,
    model: DoubletModel,
) -> Result<Vec<WakeCoupling>, GeometryError> {
    sheet
        .panels
        .iter()
        .map(|w| {
            let te = mesh.trailing_edges.get(w.trailing_edge).ok_or_else(|| {
                GeometryError::Reference(format!(
                    "wake panel {} sheds from missing trailing edge {}",
                    w.panel.index, w.trailing_edge
                ))
            })?;
            let sides = std::iter::once((te.upper, 1.0)).chain(te.lower.map(|p| (p, -1.0)));
            let mut terms = Vec::new();
            for (body, sign) in sides {
                match model {
                    DoubletModel::Uniform => terms.push((0, unknown_index(model, body, 0), sign)),
                    DoubletModel::Linear => {
                        let panel = &mesh.panels[body];
                        for (k, &slot) in w.slots.iter().enumerate() {
                            let node = te.nodes[slot];
                            let local = panel.local_node(node).ok_or_else(|| {
                                GeometryError::Reference(format!(
                                    "trailing-edge node {} is not a vertex of panel {}",
                                    node, body
                                ))
                            })?;
                            terms.push((k, unknown_index(model, body, local), sign));
                        }
                    }
                }
            }
            Ok(WakeCoupling { terms })
        })
        .collect()
}

/// Doublet strength at the two nodes of every trailing edge (upper minus
/// lower), as shed into the wake
pub fn trailing_edge_densities(mesh: &PanelMesh, model: DoubletModel, mu: &[f64]) -> Vec<[f64; 2]> {
    let at = |panel: usize, node: usize| match model {
        DoubletModel::Uniform => mu[unknown_index(model, panel, 0)],
        DoubletModel::Linear => mesh.panels[panel]
            .local_node(node)
            .map(|k| mu[unknown_index(model, panel, k)])
            .unwrap_or(0.0),
    };
    mesh.trailing_edges
        .iter()
        .map(|te| {
            std::array::from_fn(|s| {
                let node = te.nodes[s];
                at(te.upper, node) - te.lower.map(|p| at(p, node)).unwrap_or(0.0)
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::config::SolverConfig;
    use crate::core::constants::PI2;
    use crate::core::mesh::{WingSpec, generate_icosphere, generate_wing};
    use approx::assert_relative_eq;

    #[test]
    fn test_collocation_layout() {
        let mesh = generate_wing(&WingSpec::rectangular(2.0, 1.0, 2, 2));
        let rows = LinearSystem::collocation(&mesh, DoubletModel::Linear);
        assert_eq!(rows.len(), 3 * mesh.num_panels());
        assert!(rows.iter().all(|r| r.kind == BoundaryKind::Neumann));
        assert_eq!(rows[4].panel, 1);
    }

    #[test]
    fn test_sphere_dirichlet_diagonal() {
        let mesh = generate_icosphere(1.0, 1);
        let engine = InfluenceEngine::new(&SolverConfig::default());
        let system = LinearSystem::assemble(&mesh, None, &engine, 2).unwrap();
        let n = mesh.num_panels();
        assert_eq!(system.doublet_matrix.dim(), (n, n));
        assert_eq!(system.source_matrix.dim(), (n, n));
        for i in 0..n {
            assert_relative_eq!(system.doublet_matrix[[i, i]], -PI2, epsilon = 1e-9);
            // Closed surface: a uniform doublet seen from inside is -4π
            let row_sum: f64 = system.doublet_matrix.row(i).sum();
            assert_relative_eq!(row_sum, -2.0 * PI2, epsilon = 1e-6);
        }
    }

    #[test]
    fn test_wake_folded_into_trailing_columns() {
        let mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 2, 2));
        let sheet = WakeSheet::build(&mesh, &Vector3d::unit_x(), 3, 20.0, 1.2).unwrap();
        let engine = InfluenceEngine::new(&SolverConfig::default());
        let bare = LinearSystem::assemble(&mesh, None, &engine, 1).unwrap();
        let full = LinearSystem::assemble(&mesh, Some(&sheet), &engine, 1).unwrap();
        assert_eq!(full.wake_couplings.len(), sheet.panels.len());
        assert_eq!(full.source_matrix.ncols(), 0);

        let trailing: Vec<usize> = mesh.trailing_edges.iter().map(|te| te.upper).collect();
        for c in 0..mesh.num_panels() {
            let changed = (0..mesh.num_panels())
                .any(|r| (full.doublet_matrix[[r, c]] - bare.doublet_matrix[[r, c]]).abs() > 1e-12);
            assert_eq!(changed, trailing.contains(&c), "column {c}");
        }
    }

    #[test]
    fn test_linear_wake_couplings_reach_trailing_nodes() {
        let mesh = generate_wing(&WingSpec::rectangular(2.0, 1.0, 2, 2).with_thickness(0.12));
        let sheet = WakeSheet::build(&mesh, &Vector3d::unit_x(), 2, 10.0, 1.0).unwrap();
        let couplings = wake_couplings(&mesh, &sheet, DoubletModel::Linear).unwrap();
        for (w, coupling) in sheet.panels.iter().zip(&couplings) {
            // Three slots on the upper panel and three on the lower one
            assert_eq!(coupling.terms.len(), 6);
            let te = &mesh.trailing_edges[w.trailing_edge];
            let upper_sum: f64 = coupling
                .terms
                .iter()
                .filter(|t| t.1 / 3 == te.upper)
                .map(|t| t.2)
                .sum();
            assert_eq!(upper_sum, 3.0);
        }
    }

    #[test]
    fn test_trailing_edge_densities() {
        let mesh = generate_wing(&WingSpec::rectangular(2.0, 1.0, 1, 2).with_thickness(0.12));
        let mut mu = vec![0.0; mesh.num_panels()];
        for te in &mesh.trailing_edges {
            mu[te.upper] = 1.5;
            if let Some(lower) = te.lower {
                mu[lower] = -0.5;
            }
        }
        let densities = trailing_edge_densities(&mesh, DoubletModel::Uniform, &mu);
        assert_eq!(densities.len(), mesh.trailing_edges.len());
        for d in densities {
            assert_eq!(d, [2.0, 2.0]);
        }
    }
}
