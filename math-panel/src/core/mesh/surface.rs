//! Panel mesh as delivered by the mesh provider
//!
//! All cross references (panel → node, strip → panel, trailing edge → panel,
//! control → panel) are plain indices into the arenas of [`PanelMesh`].

use serde::{Deserialize, Serialize};

use super::panel::Panel;
use crate::core::error::GeometryError;
use crate::core::types::Vector3d;

/// Kind of surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SurfaceKind {
    /// Lifting wing or tail
    #[default]
    Wing,
    /// Closed non-lifting body (fuselage, hull)
    Hull,
    /// Thin membrane
    Sail,
}

/// One span station of a lifting surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Strip {
    /// Foil identifier used for polar lookups
    pub foil: String,
    /// Local chord (m)
    pub chord: f64,
    /// Width along the span (m)
    pub width: f64,
    /// Quarter-chord point
    pub quarter_chord: Vector3d,
    /// Unit spanwise axis; rotating about it by a positive angle raises the
    /// local incidence
    pub span_axis: Vector3d,
    /// Panels of the station
    pub panels: Vec<usize>,
}

/// Surface metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Surface {
    /// Display name
    pub name: String,
    /// Kind
    pub kind: SurfaceKind,
    /// Zero-thickness surface: doublets only, normal-velocity condition
    pub thin: bool,
    /// Span stations, ordered along the span
    pub strips: Vec<Strip>,
}

/// Trailing-edge segment shedding a wake column
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrailingEdge {
    /// The two nodes of the segment
    pub nodes: [usize; 2],
    /// Panel on the upper side (the only one on thin surfaces)
    pub upper: usize,
    /// Panel on the lower side of thick surfaces
    pub lower: Option<usize>,
}

/// Hinged control surface
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControlSurface {
    /// Display name
    pub name: String,
    /// Panels rotated by a deflection
    pub panels: Vec<usize>,
    /// Point on the hinge line
    pub hinge_point: Vector3d,
    /// Unit hinge direction; positive deflection is a right-hand rotation
    pub hinge_axis: Vector3d,
}

/// Reference dimensions used for coefficients
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReferenceDimensions {
    /// Reference area (m²)
    pub area: f64,
    /// Reference chord (m)
    pub chord: f64,
    /// Reference span (m)
    pub span: f64,
    /// Moment reference point (centre of gravity)
    pub moment_point: Vector3d,
}

/// Triangulated geometry with surface metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PanelMesh {
    /// Node positions
    pub nodes: Vec<Vector3d>,
    /// Panels
    pub panels: Vec<Panel>,
    /// Surfaces
    pub surfaces: Vec<Surface>,
    /// Trailing edges
    pub trailing_edges: Vec<TrailingEdge>,
    /// Control surfaces
    pub controls: Vec<ControlSurface>,
    /// Reference dimensions
    pub reference: ReferenceDimensions,
}

impl PanelMesh {
    /// Number of panels
    pub fn num_panels(&self) -> usize {
        self.panels.len()
    }

    /// True if the panel belongs to a thin surface
    pub fn is_thin(&self, panel: usize) -> bool {
        self.surfaces
            .get(self.panels[panel].surface)
            .map(|s| s.thin)
            .unwrap_or(false)
    }

    /// Total wetted area
    pub fn wetted_area(&self) -> f64 {
        self.panels.iter().map(|p| p.area).sum()
    }

    /// Panels using each node
    pub fn node_panels(&self) -> Vec<Vec<usize>> {
        let mut adjacency = vec![Vec::new(); self.nodes.len()];
        for panel in &self.panels {
            for &n in &panel.nodes {
                if let Some(list) = adjacency.get_mut(n) {
                    list.push(panel.index);
                }
            }
        }
        adjacency
    }

    /// Neighbours of each panel sharing at least one node, restricted to the
    /// same surface and side and to roughly parallel normals
    pub fn panel_neighbours(&self) -> Vec<Vec<usize>> {
        let adjacency = self.node_panels();
        self.panels
            .iter()
            .map(|panel| {
                let mut neighbours: Vec<usize> = panel
                    .nodes
                    .iter()
                    .flat_map(|&n| adjacency[n].iter().copied())
                    .filter(|&j| {
                        let other = &self.panels[j];
                        j != panel.index
                            && other.surface == panel.surface
                            && other.side == panel.side
                            && other.normal.dot(&panel.normal) > 0.5
                    })
                    .collect();
                neighbours.sort_unstable();
                neighbours.dedup();
                neighbours
            })
            .collect()
    }

    /// Check the mesh before any assembly
    pub fn validate(&self) -> Result<(), GeometryError> {
        if self.panels.is_empty() {
            return Err(GeometryError::EmptyMesh);
        }
        if let Some(node) = self.nodes.iter().position(|n| !n.is_finite()) {
            return Err(GeometryError::NonFiniteNode { node });
        }

        let count = self.nodes.len();
        for panel in &self.panels {
            if let Some(&node) = panel.nodes.iter().find(|&&n| n >= count) {
                return Err(GeometryError::NodeOutOfRange {
                    panel: panel.index,
                    node,
                    count,
                });
            }
            if let Some(reason) = panel.degeneracy_reason() {
                return Err(GeometryError::DegeneratePanel {
                    panel: panel.index,
                    reason,
                });
            }
        }
        if let Some((i, _)) = self.panels.iter().enumerate().find(|(i, p)| p.index != *i) {
            return Err(GeometryError::PanelOutOfRange {
                what: "panel arena".to_string(),
                panel: i,
                count: self.panels.len(),
            });
        }

        let n_panels = self.panels.len();
        let check = |what: String, panel: usize| {
            if panel >= n_panels {
                Err(GeometryError::PanelOutOfRange {
                    what,
                    panel,
                    count: n_panels,
                })
            } else {
                Ok(())
            }
        };
        for (i, te) in self.trailing_edges.iter().enumerate() {
            check(format!("trailing edge {i}"), te.upper)?;
            if let Some(lower) = te.lower {
                check(format!("trailing edge {i}"), lower)?;
            }
            if te.nodes.iter().any(|&n| n >= count) || te.nodes[0] == te.nodes[1] {
                return Err(GeometryError::Reference(format!(
                    "trailing edge {i} has invalid nodes {:?}",
                    te.nodes
                )));
            }
        }
        for surface in &self.surfaces {
            for (s, strip) in surface.strips.iter().enumerate() {
                for &p in &strip.panels {
                    check(format!("surface '{}' strip {s}", surface.name), p)?;
                }
                if !(strip.chord > 0.0 && strip.width > 0.0) {
                    return Err(GeometryError::Reference(format!(
                        "surface '{}' strip {s} has chord {} and width {}",
                        surface.name, strip.chord, strip.width
                    )));
                }
            }
        }
        for control in &self.controls {
            for &p in &control.panels {
                check(format!("control '{}'", control.name), p)?;
            }
            if control.hinge_axis.normalize().is_none() {
                return Err(GeometryError::Reference(format!(
                    "control '{}' has a zero hinge axis",
                    control.name
                )));
            }
        }

        let r = &self.reference;
        for (name, value) in [("area", r.area), ("chord", r.chord), ("span", r.span)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(GeometryError::Reference(format!(
                    "reference {name} must be positive, got {value}"
                )));
            }
        }
        if !r.moment_point.is_finite() {
            return Err(GeometryError::Reference(
                "moment reference point is not finite".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::mesh::generators::{WingSpec, generate_wing};

    #[test]
    fn test_generated_wing_is_valid() {
        let mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 3, 4));
        assert!(mesh.validate().is_ok());
        assert_eq!(mesh.num_panels(), 2 * 3 * 4);
    }

    #[test]
    fn test_reference_dimensions_checked() {
        let mut mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 2, 2));
        mesh.reference.chord = 0.0;
        assert!(matches!(mesh.validate(), Err(GeometryError::Reference(_))));
    }

    #[test]
    fn test_degenerate_panel_rejected() {
        let mut mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 2, 2));
        let collapsed = [mesh.nodes[0], mesh.nodes[0], mesh.nodes[1]];
        mesh.panels[1] = Panel::new(1, [0, 0, 1], collapsed);
        match mesh.validate() {
            Err(GeometryError::DegeneratePanel { panel, .. }) => assert_eq!(panel, 1),
            other => panic!("expected a degenerate panel, got {other:?}"),
        }
    }

    #[test]
    fn test_neighbours_share_nodes() {
        let mesh = generate_wing(&WingSpec::rectangular(4.0, 1.0, 2, 2));
        let neighbours = mesh.panel_neighbours();
        for (i, list) in neighbours.iter().enumerate() {
            assert!(!list.is_empty());
            for &j in list {
                let shared = mesh.panels[i]
                    .nodes
                    .iter()
                    .any(|n| mesh.panels[j].nodes.contains(n));
                assert!(shared);
            }
        }
    }
}
