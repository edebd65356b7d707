//! Panel influence coefficients
//!
//! [`InfluenceEngine`] evaluates the potential and velocity induced at a
//! field point by one panel carrying a unit source and unit doublet
//! strengths. It dispatches between:
//!
//! - `far_field`: multipole expansion beyond `far_field_ratio` largest edges
//! - `near_field`: closed-form integrals, with the solid angle taken from
//!   the edge-wise arctangent formula close to the plane and from the
//!   Van Oosterom–Strackee formula elsewhere
//! - `vortex`: vortex segments and vortons for the wake
//!
//! Panel kernels are raw integrals; the physical potential of a panel is
//! `(μ D - σ S) / 4π`.

pub mod far_field;
pub mod near_field;
pub mod vortex;

pub use vortex::{vortex_segment_velocity, vorton_velocity};

use crate::core::config::{NearFieldMethod, SolverConfig};
use crate::core::constants::{COINCIDENCE_FRACTION, NUDGE_FRACTION, PI4};
use crate::core::mesh::Panel;
use crate::core::types::{DoubletModel, PlaneSide, Vector3d};

/// Influence of one panel at one field point
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Influence {
    /// Source potential `∫∫ 1/r dS`
    pub source_potential: f64,
    /// Gradient of the source potential
    pub source_velocity: Vector3d,
    /// Doublet potential per unknown (only the first is used by the
    /// uniform model)
    pub doublet_potential: [f64; 3],
    /// Gradient of the doublet potential per unknown
    pub doublet_velocity: [Vector3d; 3],
    /// Doublet model the coefficients belong to
    pub model: DoubletModel,
}

impl Influence {
    /// All coefficients zero
    pub fn zero(model: DoubletModel) -> Self {
        Self {
            source_potential: 0.0,
            source_velocity: Vector3d::zero(),
            doublet_potential: [0.0; 3],
            doublet_velocity: [Vector3d::zero(); 3],
            model,
        }
    }

    /// Number of meaningful doublet entries
    pub fn unknowns(&self) -> usize {
        self.model.unknowns_per_panel()
    }

    /// Velocities of the doublet unknowns
    pub fn doublet_velocities(&self) -> &[Vector3d] {
        &self.doublet_velocity[..self.unknowns()]
    }

    /// Add another influence, e.g. a ground image
    fn accumulate(&mut self, other: &Influence) {
        self.source_potential += other.source_potential;
        self.source_velocity += other.source_velocity;
        for k in 0..3 {
            self.doublet_potential[k] += other.doublet_potential[k];
            self.doublet_velocity[k] += other.doublet_velocity[k];
        }
    }
}

/// Evaluates panel influences according to an immutable configuration
#[derive(Debug, Clone)]
pub struct InfluenceEngine {
    far_field_ratio: f64,
    near_field_threshold: f64,
    method: NearFieldMethod,
    model: DoubletModel,
    vortex_core: f64,
    ground_height: Option<f64>,
    side: PlaneSide,
}

impl InfluenceEngine {
    /// Engine for a configuration; in-plane points take the interior limit
    pub fn new(config: &SolverConfig) -> Self {
        Self {
            far_field_ratio: config.far_field_ratio,
            near_field_threshold: config.near_field_threshold,
            method: config.near_field_method,
            model: config.doublet_model,
            vortex_core: config.vortex_core_radius,
            ground_height: config.ground_height,
            side: PlaneSide::Interior,
        }
    }

    /// Same engine with another in-plane limit
    pub fn with_side(mut self, side: PlaneSide) -> Self {
        self.side = side;
        self
    }

    /// Same engine with another doublet model
    pub fn with_model(mut self, model: DoubletModel) -> Self {
        self.model = model;
        self
    }

    /// Doublet model of the engine
    pub fn model(&self) -> DoubletModel {
        self.model
    }

    /// Ground plane height, if any
    pub fn ground_height(&self) -> Option<f64> {
        self.ground_height
    }

    /// Influence of a panel at a point, ground image included
    pub fn influence(&self, panel: &Panel, point: &Vector3d) -> Influence {
        self.evaluate(self.model, panel, point)
    }

    /// `∫∫ 1/r dS`
    pub fn source_potential(&self, panel: &Panel, point: &Vector3d) -> f64 {
        self.influence(panel, point).source_potential
    }

    /// Gradient of the source potential
    pub fn source_velocity(&self, panel: &Panel, point: &Vector3d) -> Vector3d {
        self.influence(panel, point).source_velocity
    }

    /// Doublet potentials of the three linear basis functions
    pub fn doublet_basis_potential(&self, panel: &Panel, point: &Vector3d) -> [f64; 3] {
        self.evaluate(DoubletModel::Linear, panel, point).doublet_potential
    }

    /// Doublet velocities of the three linear basis functions
    pub fn doublet_basis_velocity(&self, panel: &Panel, point: &Vector3d) -> [Vector3d; 3] {
        self.evaluate(DoubletModel::Linear, panel, point).doublet_velocity
    }

    /// Potential of a unit uniform doublet (the signed solid angle)
    pub fn doublet_potential(&self, panel: &Panel, point: &Vector3d) -> f64 {
        self.evaluate(DoubletModel::Uniform, panel, point).doublet_potential[0]
    }

    /// Velocity of a unit uniform doublet
    pub fn doublet_velocity(&self, panel: &Panel, point: &Vector3d) -> Vector3d {
        self.evaluate(DoubletModel::Uniform, panel, point).doublet_velocity[0]
    }

    fn evaluate(&self, model: DoubletModel, panel: &Panel, point: &Vector3d) -> Influence {
        let mut out = self.free_influence(model, panel, point);
        if let Some(h) = self.ground_height {
            let mut image = self.free_influence(model, panel, &point.mirror_z(h));
            image.source_velocity = image.source_velocity.reflect_z();
            for v in image.doublet_velocity.iter_mut() {
                *v = v.reflect_z();
            }
            out.accumulate(&image);
        }
        out
    }

    /// Influence of a wake panel: doublets only, with vortex cores on the
    /// uniform model
    pub fn wake_influence(&self, panel: &Panel, point: &Vector3d) -> Influence {
        let mut out = self.wake_free(panel, point);
        if let Some(h) = self.ground_height {
            let mut image = self.wake_free(panel, &point.mirror_z(h));
            for v in image.doublet_velocity.iter_mut() {
                *v = v.reflect_z();
            }
            out.accumulate(&image);
        }
        out
    }

    fn wake_free(&self, panel: &Panel, point: &Vector3d) -> Influence {
        let mut out = self.free_influence(self.model, panel, point);
        out.source_potential = 0.0;
        out.source_velocity = Vector3d::zero();
        if self.model == DoubletModel::Uniform && !panel.degenerate {
            let v = &panel.vertices;
            out.doublet_velocity[0] = -(0..3)
                .map(|i| vortex_segment_velocity(&v[i], &v[(i + 1) % 3], point, self.vortex_core))
                .sum::<Vector3d>()
                * PI4;
        }
        out
    }

    /// Influence of a panel in free air
    fn free_influence(&self, model: DoubletModel, panel: &Panel, point: &Vector3d) -> Influence {
        let mut out = Influence::zero(model);
        if panel.degenerate {
            return out;
        }

        let distance = point.distance_to(&panel.centroid);
        if distance > self.far_field_ratio * panel.max_edge {
            (out.source_potential, out.source_velocity) = far_field::source(panel, point);
            match model {
                DoubletModel::Uniform => {
                    (out.doublet_potential[0], out.doublet_velocity[0]) =
                        far_field::uniform_doublet(panel, point);
                }
                DoubletModel::Linear => {
                    (out.doublet_potential, out.doublet_velocity) =
                        far_field::linear_doublet(panel, point);
                }
            }
            return out;
        }

        let point = nudge(panel, point).unwrap_or(*point);
        let (x, y, z) = panel.to_local(&point);
        let tol = COINCIDENCE_FRACTION * panel.max_edge;
        let in_plane = z.abs() <= tol;
        let z = if in_plane { 0.0 } else { z };
        let edges = near_field::edge_terms(panel, x, y, z);

        let omega = if in_plane {
            near_field::in_plane_solid_angle(&edges, tol, self.side)
        } else if self.method == NearFieldMethod::Fast
            && z.abs() > self.near_field_threshold * panel.max_edge
        {
            near_field::solid_angle_vos(panel, &point)
        } else {
            z.signum() * near_field::solid_angle_exact(&edges, z)
        };

        (out.source_potential, out.source_velocity) = near_field::source(panel, &edges, z, omega);
        match model {
            DoubletModel::Uniform => {
                out.doublet_potential[0] = omega;
                out.doublet_velocity[0] = near_field::uniform_doublet_velocity(panel, &point);
            }
            DoubletModel::Linear => {
                (out.doublet_potential, out.doublet_velocity) = near_field::linear_doublet(
                    panel,
                    &point,
                    (x, y, z),
                    omega,
                    &out.source_velocity,
                );
            }
        }
        out
    }
}

/// Move a field point lying on a vertex or an edge of the panel (within
/// the coincidence tolerance) slightly away from it
///
/// Vertices are pushed radially away from the centroid, edges along their
/// outward in-plane normal. Returns `None` when no nudge is needed.
pub fn nudge(panel: &Panel, point: &Vector3d) -> Option<Vector3d> {
    if panel.degenerate {
        return None;
    }
    let tol = COINCIDENCE_FRACTION * panel.max_edge;
    let step = NUDGE_FRACTION * panel.max_edge;
    let (x, y, z) = panel.to_local(point);
    if z.abs() > tol {
        return None;
    }

    for v in &panel.vertices {
        if point.distance_to(v) <= tol {
            let radial = (*v - panel.centroid).normalize()?;
            return Some(*v + radial * step);
        }
    }

    let edges = near_field::edge_terms(panel, x, y, 0.0);
    for e in &edges {
        if e.d.abs() <= tol && e.s_a < 0.0 && e.s_b > 0.0 {
            return Some(*point + e.outward * step);
        }
    }
    None
}
