//! Trailing wake panels
//!
//! One column of `2 * rows` triangles is extruded from every trailing edge.
//! Each column owns its nodes, so neighbouring columns may carry different
//! doublet strengths. Row lengths follow a geometric progression.

use crate::core::error::GeometryError;
use crate::core::mesh::{Panel, PanelMesh};
use crate::core::types::Vector3d;

/// Wake triangle and its link to the shedding trailing edge
#[derive(Debug, Clone)]
pub struct WakePanel {
    /// Geometry
    pub panel: Panel,
    /// Index of the trailing edge of the column
    pub trailing_edge: usize,
    /// Row, 0 at the trailing edge
    pub row: usize,
    /// For each vertex, the trailing-edge node (0 or 1) it is extruded from
    pub slots: [usize; 3],
}

/// Extruded wake geometry
#[derive(Debug, Clone)]
pub struct WakeSheet {
    /// Unit extrusion direction
    pub direction: Vector3d,
    /// Wake nodes, column by column, row by row
    pub nodes: Vec<Vector3d>,
    /// Wake panels
    pub panels: Vec<WakePanel>,
    /// Streamwise length of every row
    pub row_lengths: Vec<f64>,
    /// Furthest trailing-edge coordinate along `direction`
    pub trailing_station: f64,
}

impl WakeSheet {
    /// Extrude `rows` rows of total length `length` from every trailing edge
    pub fn build(
        mesh: &PanelMesh,
        direction: &Vector3d,
        rows: usize,
        length: f64,
        progression: f64,
    ) -> Result<Self, GeometryError> {
        let direction = direction.normalize().ok_or_else(|| {
            GeometryError::Reference("wake direction has zero length".to_string())
        })?;
        let rows = rows.max(1);
        let row_lengths = row_lengths(rows, length, progression);

        let mut offsets = Vec::with_capacity(rows + 1);
        let mut x = 0.0;
        offsets.push(0.0);
        for h in &row_lengths {
            x += h;
            offsets.push(x);
        }

        let mut nodes = Vec::with_capacity(mesh.trailing_edges.len() * 2 * (rows + 1));
        let mut panels = Vec::with_capacity(mesh.trailing_edges.len() * 2 * rows);
        let mut trailing_station = f64::NEG_INFINITY;

        for (t, te) in mesh.trailing_edges.iter().enumerate() {
            let p = [mesh.nodes[te.nodes[0]], mesh.nodes[te.nodes[1]]];
            trailing_station = trailing_station
                .max(p[0].dot(&direction))
                .max(p[1].dot(&direction));

            // Order the edge so that the extruded triangles face the upper side
            let upper_normal = mesh.panels[te.upper].normal;
            let order = if (p[1] - p[0]).cross(&direction).dot(&upper_normal) >= 0.0 {
                [0, 1]
            } else {
                [1, 0]
            };

            let base = nodes.len();
            for offset in &offsets {
                for &s in &order {
                    nodes.push(p[s] + direction * *offset);
                }
            }
            let id = |r: usize, s: usize| base + 2 * r + s;

            for r in 0..rows {
                let (a0, a1, b0, b1) = (id(r, 0), id(r, 1), id(r + 1, 0), id(r + 1, 1));
                for (ids, slots) in [
                    ([a0, a1, b1], [order[0], order[1], order[1]]),
                    ([a0, b1, b0], [order[0], order[1], order[0]]),
                ] {
                    let index = panels.len();
                    let vertices = [nodes[ids[0]], nodes[ids[1]], nodes[ids[2]]];
                    panels.push(WakePanel {
                        panel: Panel::new(index, ids, vertices),
                        trailing_edge: t,
                        row: r,
                        slots,
                    });
                }
            }
        }

        Ok(Self {
            direction,
            nodes,
            panels,
            row_lengths,
            trailing_station,
        })
    }

    /// Number of rows per column
    pub fn rows(&self) -> usize {
        self.row_lengths.len()
    }

    /// Panels of the last row
    pub fn last_row(&self) -> impl Iterator<Item = &WakePanel> {
        let last = self.rows().saturating_sub(1);
        self.panels.iter().filter(move |w| w.row == last)
    }

    /// Total streamwise length
    pub fn length(&self) -> f64 {
        self.row_lengths.iter().sum()
    }
}

/// Lengths of `rows` rows with ratio `progression`, summing to `length`
pub fn row_lengths(rows: usize, length: f64, progression: f64) -> Vec<f64> {
    let rows = rows.max(1);
    let first = if (progression - 1.0).abs() < 1e-12 {
        length / rows as f64
    } else {
        length * (progression - 1.0) / (progression.powi(rows as i32) - 1.0)
    };
    (0..rows)
        .map(|r| first * progression.powi(r as i32))
        .collect()
}
