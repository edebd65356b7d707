//! Multipole approximations for distant field points
//!
//! A source panel is a point source of strength `A` at the centroid. The
//! uniform doublet is a point doublet `A n` at the centroid; basis function
//! `k` of the linear model is a point doublet `A n / 3` at its first-moment
//! centre `c + (v_k - c) / 4`.

use crate::core::mesh::Panel;
use crate::core::types::Vector3d;

/// Point-source potential and velocity
#[inline]
pub fn source(panel: &Panel, p: &Vector3d) -> (f64, Vector3d) {
    let r = *p - panel.centroid;
    let r2 = r.norm_sqr();
    let r1 = r2.sqrt();
    (panel.area / r1, r * (-panel.area / (r2 * r1)))
}

/// Point-doublet potential and velocity of strength `weight` at `at`
#[inline]
pub fn doublet(normal: &Vector3d, weight: f64, at: &Vector3d, p: &Vector3d) -> (f64, Vector3d) {
    let r = *p - *at;
    let r2 = r.norm_sqr();
    let r1 = r2.sqrt();
    let r3 = r2 * r1;
    let nr = normal.dot(&r);
    let potential = weight * nr / r3;
    let velocity = (*normal - r * (3.0 * nr / r2)) * (weight / r3);
    (potential, velocity)
}

/// Uniform doublet
pub fn uniform_doublet(panel: &Panel, p: &Vector3d) -> (f64, Vector3d) {
    doublet(&panel.normal, panel.area, &panel.centroid, p)
}

/// Linear doublet basis functions
pub fn linear_doublet(panel: &Panel, p: &Vector3d) -> ([f64; 3], [Vector3d; 3]) {
    let mut potential = [0.0; 3];
    let mut velocity = [Vector3d::zero(); 3];
    for k in 0..3 {
        let at = panel.centroid + (panel.vertices[k] - panel.centroid) / 4.0;
        (potential[k], velocity[k]) = doublet(&panel.normal, panel.area / 3.0, &at, p);
    }
    (potential, velocity)
}
