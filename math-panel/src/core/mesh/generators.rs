//! Mesh generators for analytical test geometries
//!
//! Stand-ins for the external mesh provider: straight tapered wings (thin
//! plates or closed symmetric NACA 4-digit sections) and icosphere hulls.
//! Quadrilateral grid cells are always split into two triangles.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::panel::{Panel, PanelSide};
use super::surface::{
    ControlSurface, PanelMesh, ReferenceDimensions, Strip, Surface, SurfaceKind, TrailingEdge,
};
use crate::core::types::Vector3d;

/// Trailing-edge flap
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FlapSpec {
    /// Control name
    pub name: String,
    /// Hinge position as a fraction of the local chord
    pub hinge_fraction: f64,
    /// Spanwise extent `[y_start, y_end]` (m)
    pub y_start: f64,
    /// End of the spanwise extent (m)
    pub y_end: f64,
}

/// Straight tapered wing, symmetric about `y = 0`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WingSpec {
    /// Surface name
    pub name: String,
    /// Tip-to-tip span (m)
    pub span: f64,
    /// Root chord (m)
    pub root_chord: f64,
    /// Tip chord (m)
    pub tip_chord: f64,
    /// Leading-edge sweep (deg)
    pub sweep_deg: f64,
    /// Dihedral (deg)
    pub dihedral_deg: f64,
    /// Chordwise panels per side
    pub chord_panels: usize,
    /// Spanwise panels
    pub span_panels: usize,
    /// Thickness ratio of a NACA 00xx section, `None` for a thin plate
    pub thickness: Option<f64>,
    /// Foil identifier of every strip
    pub foil: String,
    /// Root leading-edge position
    pub origin: Vector3d,
    /// Flaps
    pub flaps: Vec<FlapSpec>,
}

impl WingSpec {
    /// Flat rectangular plate
    pub fn rectangular(span: f64, chord: f64, chord_panels: usize, span_panels: usize) -> Self {
        Self {
            name: "wing".to_string(),
            span,
            root_chord: chord,
            tip_chord: chord,
            sweep_deg: 0.0,
            dihedral_deg: 0.0,
            chord_panels,
            span_panels,
            thickness: None,
            foil: "default".to_string(),
            origin: Vector3d::zero(),
            flaps: Vec::new(),
        }
    }

    /// Same planform with a closed symmetric section
    pub fn with_thickness(mut self, ratio: f64) -> Self {
        self.thickness = Some(ratio);
        self
    }

    /// Add a trailing-edge flap
    pub fn with_flap(mut self, flap: FlapSpec) -> Self {
        self.flaps.push(flap);
        self
    }

    fn half_span(&self) -> f64 {
        0.5 * self.span
    }

    fn station_y(&self, j: usize) -> f64 {
        -self.half_span() + self.span * j as f64 / self.span_panels as f64
    }

    fn chord_at(&self, y: f64) -> f64 {
        let eta = (y.abs() / self.half_span()).min(1.0);
        self.root_chord + (self.tip_chord - self.root_chord) * eta
    }

    fn leading_edge_at(&self, y: f64) -> Vector3d {
        let a = y.abs();
        self.origin
            + Vector3d::new(
                a * self.sweep_deg.to_radians().tan(),
                y,
                a * self.dihedral_deg.to_radians().tan(),
            )
    }

    /// Mean aerodynamic chord of the trapezoidal planform
    pub fn mean_aerodynamic_chord(&self) -> f64 {
        let taper = self.tip_chord / self.root_chord;
        2.0 / 3.0 * self.root_chord * (1.0 + taper + taper * taper) / (1.0 + taper)
    }

    /// Planform area
    pub fn area(&self) -> f64 {
        0.5 * (self.root_chord + self.tip_chord) * self.span
    }
}

/// NACA 4-digit symmetric half-thickness with a closed trailing edge
fn naca_half_thickness(ratio: f64, xi: f64) -> f64 {
    let xi = xi.clamp(0.0, 1.0);
    5.0 * ratio
        * (0.2969 * xi.sqrt() - 0.1260 * xi - 0.3516 * xi.powi(2) + 0.2843 * xi.powi(3)
            - 0.1036 * xi.powi(4))
}

/// Generate a wing mesh
///
/// Thin wings produce one mid-surface with upward normals; thick wings
/// produce closed upper/lower surfaces sharing leading- and trailing-edge
/// nodes, closed at both tips, with outward normals.
pub fn generate_wing(spec: &WingSpec) -> PanelMesh {
    let nc = spec.chord_panels.max(1);
    let ns = spec.span_panels.max(1);
    let thick = spec.thickness.filter(|t| *t > 0.0);

    // Chordwise distribution: uniform on plates, cosine on thick sections
    let xi: Vec<f64> = (0..=nc)
        .map(|i| {
            let t = i as f64 / nc as f64;
            if thick.is_some() {
                0.5 * (1.0 - (std::f64::consts::PI * t).cos())
            } else {
                t
            }
        })
        .collect();

    let mut nodes: Vec<Vector3d> = Vec::new();
    let mut upper_ids = vec![vec![0usize; ns + 1]; nc + 1];
    let mut lower_ids = vec![vec![0usize; ns + 1]; nc + 1];

    for j in 0..=ns {
        let y = spec.station_y(j);
        let chord = spec.chord_at(y);
        let le = spec.leading_edge_at(y);
        for i in 0..=nc {
            let mid = le + Vector3d::new(xi[i] * chord, 0.0, 0.0);
            match thick {
                Some(ratio) if i > 0 && i < nc => {
                    let t = naca_half_thickness(ratio, xi[i]) * chord;
                    upper_ids[i][j] = nodes.len();
                    nodes.push(mid + Vector3d::new(0.0, 0.0, t));
                    lower_ids[i][j] = nodes.len();
                    nodes.push(mid - Vector3d::new(0.0, 0.0, t));
                }
                _ => {
                    upper_ids[i][j] = nodes.len();
                    lower_ids[i][j] = nodes.len();
                    nodes.push(mid);
                }
            }
        }
    }

    let mut panels: Vec<Panel> = Vec::new();
    let mut strips: Vec<Strip> = Vec::with_capacity(ns);
    let mut trailing_edges = Vec::with_capacity(ns);
    let mut flap_panels: Vec<Vec<usize>> = vec![Vec::new(); spec.flaps.len()];

    let push = |panels: &mut Vec<Panel>, ids: [usize; 3], side, strip, trailing| -> usize {
        let index = panels.len();
        let vertices = [nodes[ids[0]], nodes[ids[1]], nodes[ids[2]]];
        panels.push(Panel::new(index, ids, vertices).with_surface(0, strip, side, trailing));
        index
    };

    for j in 0..ns {
        let y_mid = 0.5 * (spec.station_y(j) + spec.station_y(j + 1));
        let mut strip_panels = Vec::new();
        let mut te_upper = 0;
        let mut te_lower = None;

        for i in 0..nc {
            let trailing = i + 1 == nc;
            let flap_ids: Vec<usize> = spec
                .flaps
                .iter()
                .enumerate()
                .filter(|(_, f)| {
                    xi[i] >= f.hinge_fraction - 1e-9 && y_mid >= f.y_start && y_mid <= f.y_end
                })
                .map(|(k, _)| k)
                .collect();

            let (a, b, c, d) = (
                upper_ids[i][j],
                upper_ids[i + 1][j],
                upper_ids[i + 1][j + 1],
                upper_ids[i][j + 1],
            );
            let side = if thick.is_some() {
                PanelSide::Top
            } else {
                PanelSide::Middle
            };
            let first = push(&mut panels, [a, b, c], side, Some(j), trailing);
            let second = push(&mut panels, [a, c, d], side, Some(j), false);
            strip_panels.extend([first, second]);
            if trailing {
                te_upper = first;
            }
            let mut cell = vec![first, second];

            if thick.is_some() {
                let (a, b, c, d) = (
                    lower_ids[i][j],
                    lower_ids[i + 1][j],
                    lower_ids[i + 1][j + 1],
                    lower_ids[i][j + 1],
                );
                let first = push(&mut panels, [a, c, b], PanelSide::Bottom, Some(j), trailing);
                let second = push(&mut panels, [a, d, c], PanelSide::Bottom, Some(j), false);
                strip_panels.extend([first, second]);
                if trailing {
                    te_lower = Some(first);
                }
                cell.extend([first, second]);
            }

            for k in flap_ids {
                flap_panels[k].extend(cell.iter().copied());
            }
        }

        let y0 = spec.station_y(j);
        let y1 = spec.station_y(j + 1);
        let chord = 0.5 * (spec.chord_at(y0) + spec.chord_at(y1));
        let le = (spec.leading_edge_at(y0) + spec.leading_edge_at(y1)) / 2.0;
        strips.push(Strip {
            foil: spec.foil.clone(),
            chord,
            width: spec.leading_edge_at(y1).distance_to(&spec.leading_edge_at(y0)),
            quarter_chord: le + Vector3d::new(0.25 * chord, 0.0, 0.0),
            span_axis: (spec.leading_edge_at(y1) - spec.leading_edge_at(y0))
                .normalize()
                .unwrap_or_else(Vector3d::unit_y),
            panels: strip_panels,
        });
        trailing_edges.push(TrailingEdge {
            nodes: [upper_ids[nc][j], upper_ids[nc][j + 1]],
            upper: te_upper,
            lower: te_lower,
        });
    }

    if thick.is_some() {
        // Tip caps: outward normals -y at the first station, +y at the last
        for (j, outward) in [(0usize, false), (ns, true)] {
            for i in 0..nc {
                let (u0, u1) = (upper_ids[i][j], upper_ids[i + 1][j]);
                let (l0, l1) = (lower_ids[i][j], lower_ids[i + 1][j]);
                let triangles = if outward {
                    [[u0, u1, l1], [u0, l1, l0]]
                } else {
                    [[u0, l1, u1], [u0, l0, l1]]
                };
                for ids in triangles {
                    if ids[0] == ids[1] || ids[1] == ids[2] || ids[0] == ids[2] {
                        continue;
                    }
                    push(&mut panels, ids, PanelSide::Body, None, false);
                }
            }
        }
    }

    let controls = spec
        .flaps
        .iter()
        .zip(flap_panels)
        .map(|(flap, panels)| {
            let hinge = |y: f64| {
                spec.leading_edge_at(y) + Vector3d::new(flap.hinge_fraction * spec.chord_at(y), 0.0, 0.0)
            };
            let start = hinge(flap.y_start);
            let axis = (hinge(flap.y_end) - start)
                .normalize()
                .unwrap_or_else(Vector3d::unit_y);
            ControlSurface {
                name: flap.name.clone(),
                panels,
                hinge_point: start,
                hinge_axis: axis,
            }
        })
        .collect();

    let mac = spec.mean_aerodynamic_chord();
    PanelMesh {
        nodes,
        panels,
        surfaces: vec![Surface {
            name: spec.name.clone(),
            kind: SurfaceKind::Wing,
            thin: thick.is_none(),
            strips,
        }],
        trailing_edges,
        controls,
        reference: ReferenceDimensions {
            area: spec.area(),
            chord: mac,
            span: spec.span,
            moment_point: spec.origin + Vector3d::new(0.25 * spec.root_chord, 0.0, 0.0),
        },
    }
}

/// Generate an icosphere hull (subdivided icosahedron)
///
/// More uniform panel sizes than a UV sphere. Normals point outward.
///
/// # Arguments
/// * `radius` - Sphere radius
/// * `subdivisions` - Number of subdivision iterations (0=20 panels, 1=80, 2=320)
pub fn generate_icosphere(radius: f64, subdivisions: usize) -> PanelMesh {
    let phi = (1.0 + 5.0_f64.sqrt()) / 2.0;

    let mut vertices: Vec<Vector3d> = [
        [-1.0, phi, 0.0],
        [1.0, phi, 0.0],
        [-1.0, -phi, 0.0],
        [1.0, -phi, 0.0],
        [0.0, -1.0, phi],
        [0.0, 1.0, phi],
        [0.0, -1.0, -phi],
        [0.0, 1.0, -phi],
        [phi, 0.0, -1.0],
        [phi, 0.0, 1.0],
        [-phi, 0.0, -1.0],
        [-phi, 0.0, 1.0],
    ]
    .iter()
    .filter_map(|&[x, y, z]| Vector3d::new(x, y, z).normalize())
    .collect();

    let mut faces: Vec<[usize; 3]> = vec![
        [0, 11, 5],
        [0, 5, 1],
        [0, 1, 7],
        [0, 7, 10],
        [0, 10, 11],
        [1, 5, 9],
        [5, 11, 4],
        [11, 10, 2],
        [10, 7, 6],
        [7, 1, 8],
        [3, 9, 4],
        [3, 4, 2],
        [3, 2, 6],
        [3, 6, 8],
        [3, 8, 9],
        [4, 9, 5],
        [2, 4, 11],
        [6, 2, 10],
        [8, 6, 7],
        [9, 8, 1],
    ];

    for _ in 0..subdivisions {
        let mut new_faces = Vec::with_capacity(faces.len() * 4);
        let mut midpoints: HashMap<(usize, usize), usize> = HashMap::new();

        for &[v0, v1, v2] in &faces {
            let m01 = midpoint(&mut vertices, &mut midpoints, v0, v1);
            let m12 = midpoint(&mut vertices, &mut midpoints, v1, v2);
            let m20 = midpoint(&mut vertices, &mut midpoints, v2, v0);

            new_faces.push([v0, m01, m20]);
            new_faces.push([v1, m12, m01]);
            new_faces.push([v2, m20, m12]);
            new_faces.push([m01, m12, m20]);
        }
        faces = new_faces;
    }

    let nodes: Vec<Vector3d> = vertices.iter().map(|v| *v * radius).collect();
    let panels: Vec<Panel> = faces
        .iter()
        .enumerate()
        .map(|(index, &ids)| {
            let mut ids = ids;
            let mut verts = [nodes[ids[0]], nodes[ids[1]], nodes[ids[2]]];
            let centroid = (verts[0] + verts[1] + verts[2]) / 3.0;
            let normal = (verts[1] - verts[0]).cross(&(verts[2] - verts[0]));
            if normal.dot(&centroid) < 0.0 {
                ids.swap(1, 2);
                verts.swap(1, 2);
            }
            Panel::new(index, ids, verts).with_surface(0, None, PanelSide::Body, false)
        })
        .collect();

    PanelMesh {
        nodes,
        panels,
        surfaces: vec![Surface {
            name: "hull".to_string(),
            kind: SurfaceKind::Hull,
            thin: false,
            strips: Vec::new(),
        }],
        trailing_edges: Vec::new(),
        controls: Vec::new(),
        reference: ReferenceDimensions {
            area: std::f64::consts::PI * radius * radius,
            chord: 2.0 * radius,
            span: 2.0 * radius,
            moment_point: Vector3d::zero(),
        },
    }
}

/// Get or create the unit-sphere midpoint of an edge
fn midpoint(
    vertices: &mut Vec<Vector3d>,
    cache: &mut HashMap<(usize, usize), usize>,
    v0: usize,
    v1: usize,
) -> usize {
    let key = if v0 < v1 { (v0, v1) } else { (v1, v0) };
    if let Some(&idx) = cache.get(&key) {
        return idx;
    }
    let mid = (vertices[v0] + vertices[v1]) / 2.0;
    let idx = vertices.len();
    vertices.push(mid.normalize().unwrap_or(mid));
    cache.insert(key, idx);
    idx
}
