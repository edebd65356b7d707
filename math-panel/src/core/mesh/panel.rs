//! Flat triangular panel
//!
//! A [`Panel`] caches everything the influence kernels need: the local frame
//! `(l, m, n)`, the vertices expressed in that frame relative to the
//! centroid and the coefficients of the three linear basis functions.

use serde::{Deserialize, Serialize};

use crate::core::constants::{MIN_EDGE_LENGTH, MIN_PANEL_ANGLE};
use crate::core::types::{DoubletModel, Vector3d};

/// Position of a panel on its surface
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PanelSide {
    /// Upper side of a thick lifting surface
    Top,
    /// Lower side of a thick lifting surface
    Bottom,
    /// Mid-surface of a thin lifting surface
    Middle,
    /// Closed, non-lifting body
    #[default]
    Body,
}

/// Barycentric position of the linear-model collocation points
const LINEAR_COLLOCATION: [[f64; 3]; 3] = [
    [4.0 / 6.0, 1.0 / 6.0, 1.0 / 6.0],
    [1.0 / 6.0, 4.0 / 6.0, 1.0 / 6.0],
    [1.0 / 6.0, 1.0 / 6.0, 4.0 / 6.0],
];

/// Triangular panel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Panel {
    /// Index in the mesh panel arena
    pub index: usize,
    /// Global node indices
    pub nodes: [usize; 3],
    /// Vertex positions
    pub vertices: [Vector3d; 3],
    /// Centroid
    pub centroid: Vector3d,
    /// First in-plane axis, along edge 0
    pub l: Vector3d,
    /// Second in-plane axis, `n × l`
    pub m: Vector3d,
    /// Unit normal (right-hand rule over the vertex order)
    pub normal: Vector3d,
    /// Area (zero when degenerate)
    pub area: f64,
    /// Length of edge `i` (vertex `i` to vertex `i+1`)
    pub edge_lengths: [f64; 3],
    /// Internal angle at vertex `i` (rad)
    pub angles: [f64; 3],
    /// Largest edge length
    pub max_edge: f64,
    /// Vertices in local `(x, y)` relative to the centroid
    pub local_vertices: [[f64; 2]; 3],
    /// `N_k(x, y) = basis[k][0] + basis[k][1] x + basis[k][2] y`
    pub basis: [[f64; 3]; 3],
    /// True when an edge or angle is below the minimum
    pub degenerate: bool,
    /// Owning surface
    pub surface: usize,
    /// Span station of the owning surface
    pub strip: Option<usize>,
    /// Position on the surface
    pub side: PanelSide,
    /// Panel touches a trailing edge
    pub trailing: bool,
}

impl Panel {
    /// Build a panel from three vertices.
    ///
    /// Never fails: a panel with a short edge or a sliver angle is flagged
    /// `degenerate`, reports zero area, and every influence query on it
    /// returns zero.
    pub fn new(index: usize, nodes: [usize; 3], vertices: [Vector3d; 3]) -> Self {
        let [v0, v1, v2] = vertices;
        let centroid = (v0 + v1 + v2) / 3.0;

        let edges = [v1 - v0, v2 - v1, v0 - v2];
        let edge_lengths = [edges[0].norm(), edges[1].norm(), edges[2].norm()];
        let max_edge = edge_lengths.iter().copied().fold(0.0, f64::max);

        let mut angles = [0.0; 3];
        for (i, angle) in angles.iter_mut().enumerate() {
            let a = edges[i];
            let b = -edges[(i + 2) % 3];
            let denom = edge_lengths[i] * edge_lengths[(i + 2) % 3];
            *angle = if denom > 0.0 {
                (a.dot(&b) / denom).clamp(-1.0, 1.0).acos()
            } else {
                0.0
            };
        }

        let cross = edges[0].cross(&(v2 - v0));
        let doubled_area = cross.norm();

        let degenerate = edge_lengths.iter().any(|&e| e.is_nan() || e < MIN_EDGE_LENGTH)
            || angles.iter().any(|&a| a.is_nan() || a < MIN_PANEL_ANGLE)
            || !doubled_area.is_finite();

        let (normal, l, m) = match (cross.normalize(), edges[0].normalize()) {
            (Some(n), Some(l)) if !degenerate => (n, l, n.cross(&l)),
            _ => (Vector3d::unit_z(), Vector3d::unit_x(), Vector3d::unit_y()),
        };

        let local = |v: Vector3d| {
            let d = v - centroid;
            [d.dot(&l), d.dot(&m)]
        };
        let local_vertices = [local(v0), local(v1), local(v2)];

        let basis = if degenerate {
            [[0.0; 3]; 3]
        } else {
            basis_coefficients(&local_vertices)
        };

        Self {
            index,
            nodes,
            vertices,
            centroid,
            l,
            m,
            normal,
            area: if degenerate { 0.0 } else { 0.5 * doubled_area },
            edge_lengths,
            angles,
            max_edge,
            local_vertices,
            basis,
            degenerate,
            surface: 0,
            strip: None,
            side: PanelSide::Body,
            trailing: false,
        }
    }

    /// Attach surface metadata
    pub fn with_surface(
        mut self,
        surface: usize,
        strip: Option<usize>,
        side: PanelSide,
        trailing: bool,
    ) -> Self {
        self.surface = surface;
        self.strip = strip;
        self.side = side;
        self.trailing = trailing;
        self
    }

    /// Field point in the local frame `(x, y, z)`, origin at the centroid
    #[inline]
    pub fn to_local(&self, p: &Vector3d) -> (f64, f64, f64) {
        let d = *p - self.centroid;
        (d.dot(&self.l), d.dot(&self.m), d.dot(&self.normal))
    }

    /// Values of the three basis functions at local `(x, y)`
    #[inline]
    pub fn basis_at(&self, x: f64, y: f64) -> [f64; 3] {
        let b = &self.basis;
        [
            b[0][0] + b[0][1] * x + b[0][2] * y,
            b[1][0] + b[1][1] * x + b[1][2] * y,
            b[2][0] + b[2][1] * x + b[2][2] * y,
        ]
    }

    /// In-plane gradient of basis function `k`, in global coordinates
    #[inline]
    pub fn basis_gradient(&self, k: usize) -> Vector3d {
        self.l * self.basis[k][1] + self.m * self.basis[k][2]
    }

    /// Point with barycentric weights `w`
    pub fn point_at(&self, w: [f64; 3]) -> Vector3d {
        self.vertices[0] * w[0] + self.vertices[1] * w[1] + self.vertices[2] * w[2]
    }

    /// Collocation points of the panel for a doublet model
    pub fn collocation_points(&self, model: DoubletModel) -> Vec<Vector3d> {
        match model {
            DoubletModel::Uniform => vec![self.centroid],
            DoubletModel::Linear => LINEAR_COLLOCATION
                .iter()
                .map(|&w| self.point_at(w))
                .collect(),
        }
    }

    /// Local index (0..3) of a global node, if the panel uses it
    pub fn local_node(&self, node: usize) -> Option<usize> {
        self.nodes.iter().position(|&n| n == node)
    }

    /// Human-readable reason when the panel is degenerate
    pub fn degeneracy_reason(&self) -> Option<String> {
        if !self.degenerate {
            return None;
        }
        if let Some(i) = self
            .edge_lengths
            .iter()
            .position(|&e| e.is_nan() || e < MIN_EDGE_LENGTH)
        {
            return Some(format!(
                "edge {} has length {:.3e} m",
                i, self.edge_lengths[i]
            ));
        }
        if let Some(i) = self.angles.iter().position(|&a| a.is_nan() || a < MIN_PANEL_ANGLE) {
            return Some(format!(
                "angle at vertex {} is {:.4}°",
                i,
                self.angles[i].to_degrees()
            ));
        }
        Some("non-finite geometry".to_string())
    }
}

/// Coefficients of the linear basis functions through the local vertices.
///
/// Solves `V c_k = e_k` with `V` rows `(1, x_i, y_i)`: the coefficients of
/// `N_k` are column `k` of `V⁻¹`.
fn basis_coefficients(v: &[[f64; 2]; 3]) -> [[f64; 3]; 3] {
    let [x0, y0] = v[0];
    let [x1, y1] = v[1];
    let [x2, y2] = v[2];
    let det = (x1 - x0) * (y2 - y0) - (x2 - x0) * (y1 - y0);

    // Cofactor expansion of V⁻¹, transposed into per-function rows
    let mut basis = [[0.0; 3]; 3];
    let rows = [(x1, y1, x2, y2), (x2, y2, x0, y0), (x0, y0, x1, y1)];
    for (k, &(xa, ya, xb, yb)) in rows.iter().enumerate() {
        basis[k] = [(xa * yb - xb * ya) / det, (ya - yb) / det, (xb - xa) / det];
    }
    basis
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn sample_panel() -> Panel {
        Panel::new(
            0,
            [0, 1, 2],
            [
                Vector3d::new(0.0, 0.0, 0.0),
                Vector3d::new(2.0, 0.0, 0.1),
                Vector3d::new(0.3, 1.5, -0.2),
            ],
        )
    }

    #[test]
    fn test_basis_is_kronecker_at_vertices() {
        let p = sample_panel();
        for i in 0..3 {
            let (x, y, z) = p.to_local(&p.vertices[i]);
            assert_relative_eq!(z, 0.0, epsilon = 1e-12);
            let n = p.basis_at(x, y);
            for k in 0..3 {
                let expected = if i == k { 1.0 } else { 0.0 };
                assert_relative_eq!(n[k], expected, epsilon = 1e-12);
            }
        }
    }

    #[test]
    fn test_basis_partition_of_unity() {
        let p = sample_panel();
        let n = p.basis_at(0.37, -0.21);
        assert_relative_eq!(n.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        let g = p.basis_gradient(0) + p.basis_gradient(1) + p.basis_gradient(2);
        assert_relative_eq!(g.norm(), 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_frame_is_orthonormal() {
        let p = sample_panel();
        assert_relative_eq!(p.l.norm(), 1.0, epsilon = 1e-14);
        assert_relative_eq!(p.m.norm(), 1.0, epsilon = 1e-14);
        assert_relative_eq!(p.l.dot(&p.m), 0.0, epsilon = 1e-14);
        assert_relative_eq!(p.l.cross(&p.m).dot(&p.normal), 1.0, epsilon = 1e-14);
        let angle_sum: f64 = p.angles.iter().sum();
        assert_relative_eq!(angle_sum, std::f64::consts::PI, epsilon = 1e-12);
    }

    #[test]
    fn test_area_of_right_triangle() {
        let p = Panel::new(
            0,
            [0, 1, 2],
            [
                Vector3d::new(0.0, 0.0, 0.0),
                Vector3d::new(1.0, 0.0, 0.0),
                Vector3d::new(0.0, 1.0, 0.0),
            ],
        );
        assert!(!p.degenerate);
        assert_relative_eq!(p.area, 0.5, epsilon = 1e-15);
        assert_relative_eq!(p.normal.z, 1.0, epsilon = 1e-15);
        assert_relative_eq!(p.max_edge, 2.0_f64.sqrt(), epsilon = 1e-15);
    }

    #[test]
    fn test_degenerate_sliver() {
        let p = Panel::new(
            3,
            [0, 1, 2],
            [
                Vector3d::new(0.0, 0.0, 0.0),
                Vector3d::new(1.0, 0.0, 0.0),
                Vector3d::new(2.0, 1e-9, 0.0),
            ],
        );
        assert!(p.degenerate);
        assert_eq!(p.area, 0.0);
        assert!(p.degeneracy_reason().unwrap().contains("angle"));
    }

    #[test]
    fn test_collocation_points_inside() {
        let p = sample_panel();
        let pts = p.collocation_points(DoubletModel::Linear);
        assert_eq!(pts.len(), 3);
        for pt in pts {
            let (x, y, z) = p.to_local(&pt);
            assert_relative_eq!(z, 0.0, epsilon = 1e-12);
            assert!(p.basis_at(x, y).iter().all(|&w| w > 0.1));
        }
        assert_eq!(p.collocation_points(DoubletModel::Uniform), vec![p.centroid]);
    }
}
