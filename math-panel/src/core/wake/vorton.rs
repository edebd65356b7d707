//! Vortex particles shed from the wake sheet

use serde::{Deserialize, Serialize};

use super::sheet::WakeSheet;
use crate::core::influence::vorton_velocity;
use crate::core::types::Vector3d;

/// Point vortex element
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vorton {
    /// Position
    pub position: Vector3d,
    /// Vector strength (circulation times length)
    pub vortex: Vector3d,
    /// Inactive vortons induce nothing and are not advected
    pub active: bool,
}

impl Vorton {
    /// Velocity induced at `p`, with the ground image when `ground` is set
    pub fn velocity_at(&self, p: &Vector3d, core: f64, ground: Option<f64>) -> Vector3d {
        if !self.active {
            return Vector3d::zero();
        }
        let mut v = vorton_velocity(&self.position, &self.vortex, p, core);
        if let Some(h) = ground {
            let image = -self.vortex.reflect_z();
            v += vorton_velocity(&self.position.mirror_z(h), &image, p, core);
        }
        v
    }
}

/// Vortons shed during one wake iteration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VortonRow {
    /// Merged vortons
    pub vortons: Vec<Vorton>,
    /// For each shed triangle edge (three per wake panel of the source row,
    /// in panel order), the vorton it was merged into; `None` once dropped
    pub links: Vec<Option<usize>>,
}

impl VortonRow {
    /// Convert the last row of `sheet`, translated one row downstream, into
    /// vortons
    ///
    /// `strength(panel)` gives the mean doublet strength of a wake panel.
    /// Every triangle edge becomes a vorton at its midpoint with vector
    /// strength `μ · edge`. Vortons closer than `merge_tolerance` are merged
    /// by summing their strengths; merged vortons weaker than `min_strength`
    /// are dropped.
    pub fn from_sheet<F>(
        sheet: &WakeSheet,
        strength: F,
        merge_tolerance: f64,
        min_strength: f64,
    ) -> Self
    where
        F: Fn(usize) -> f64,
    {
        let shift = sheet.direction * sheet.row_lengths.last().copied().unwrap_or(0.0);

        let mut raw: Vec<Vorton> = Vec::new();
        for wake in sheet.last_row() {
            let mu = strength(wake.panel.index);
            let v = &wake.panel.vertices;
            for i in 0..3 {
                let (a, b) = (v[i] + shift, v[(i + 1) % 3] + shift);
                raw.push(Vorton {
                    position: (a + b) / 2.0,
                    vortex: (b - a) * mu,
                    active: true,
                });
            }
        }

        let mut vortons: Vec<Vorton> = Vec::new();
        let mut links: Vec<Option<usize>> = Vec::with_capacity(raw.len());
        for r in raw {
            match vortons
                .iter()
                .position(|v| v.position.distance_to(&r.position) <= merge_tolerance)
            {
                Some(k) => {
                    vortons[k].vortex += r.vortex;
                    links.push(Some(k));
                }
                None => {
                    links.push(Some(vortons.len()));
                    vortons.push(r);
                }
            }
        }

        // Drop vanishing vortons and re-index the links
        let mut remap = vec![None; vortons.len()];
        let mut kept = Vec::with_capacity(vortons.len());
        for (k, v) in vortons.into_iter().enumerate() {
            if v.vortex.norm() > min_strength {
                remap[k] = Some(kept.len());
                kept.push(v);
            }
        }
        let links = links.into_iter().map(|l| l.and_then(|k| remap[k])).collect();

        Self {
            vortons: kept,
            links,
        }
    }

    /// True when no vorton of the row is active
    pub fn is_inactive(&self) -> bool {
        self.vortons.iter().all(|v| !v.active)
    }

    /// Sum of the vector strengths
    pub fn total_vortex(&self) -> Vector3d {
        self.vortons.iter().map(|v| v.vortex).sum()
    }
}
