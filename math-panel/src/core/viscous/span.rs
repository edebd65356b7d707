//! Span-wise station data of one lifting surface

use serde::{Deserialize, Serialize};

use crate::core::mesh::Surface;

/// Per-station arrays of one lifting surface
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpanDistribution {
    /// Surface index in the mesh
    pub surface: usize,
    /// Surface name
    pub name: String,
    /// Foil of every station
    pub foil: Vec<String>,
    /// Station chord (m)
    pub chord: Vec<f64>,
    /// Station width (m)
    pub width: Vec<f64>,
    /// Lift coefficient of the panel solution
    pub cl_inviscid: Vec<f64>,
    /// Lift coefficient read from the polar
    pub cl_viscous: Vec<f64>,
    /// Local Reynolds number
    pub reynolds: Vec<f64>,
    /// Effective angle of attack (deg)
    pub alpha_effective: Vec<f64>,
    /// Profile drag coefficient
    pub profile_drag: Vec<f64>,
    /// Upper-side transition (x/c)
    pub xtr_top: Vec<f64>,
    /// Lower-side transition (x/c)
    pub xtr_bot: Vec<f64>,
    /// Virtual twist (rad), positive raises the incidence
    pub virtual_twist: Vec<f64>,
}

impl SpanDistribution {
    /// Zeroed distribution over the strips of `surface`
    pub fn new(index: usize, surface: &Surface) -> Self {
        let n = surface.strips.len();
        Self {
            surface: index,
            name: surface.name.clone(),
            foil: surface.strips.iter().map(|s| s.foil.clone()).collect(),
            chord: surface.strips.iter().map(|s| s.chord).collect(),
            width: surface.strips.iter().map(|s| s.width).collect(),
            cl_inviscid: vec![0.0; n],
            cl_viscous: vec![0.0; n],
            reynolds: vec![0.0; n],
            alpha_effective: vec![0.0; n],
            profile_drag: vec![0.0; n],
            xtr_top: vec![1.0; n],
            xtr_bot: vec![1.0; n],
            virtual_twist: vec![0.0; n],
        }
    }

    /// Number of stations
    pub fn len(&self) -> usize {
        self.chord.len()
    }

    /// True without stations
    pub fn is_empty(&self) -> bool {
        self.chord.is_empty()
    }

    /// Station area
    pub fn area(&self, station: usize) -> f64 {
        self.chord[station] * self.width[station]
    }

    /// Profile drag area `Σ cd · c · w`
    pub fn drag_area(&self) -> f64 {
        (0..self.len())
            .map(|i| self.profile_drag[i] * self.area(i))
            .sum()
    }
}
