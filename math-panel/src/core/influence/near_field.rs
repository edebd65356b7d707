//! Closed-form near-field kernels of a flat triangle
//!
//! All quantities are raw integrals, without the `1/4π` factor:
//!
//! - source potential `S = ∫∫ 1/r dS` and its gradient
//! - doublet potential `D = ∫∫ n·(P-Q)/r³ dS`, the signed solid angle
//!   (tends to `+2π` just above the panel)
//! - linear doublet potentials `∫∫ N_k n·(P-Q)/r³ dS` and their gradients
//!
//! Edge `i` runs from vertex `i` to vertex `i+1`, counter-clockwise about
//! the panel normal.

use crate::core::constants::{EPSY, PI2};
use crate::core::mesh::Panel;
use crate::core::types::{PlaneSide, Vector3d};

/// In-plane quantities of one edge seen from the projected field point
#[derive(Debug, Clone, Copy)]
pub struct EdgeTerm {
    /// Tangential coordinate of the start vertex
    pub s_a: f64,
    /// Tangential coordinate of the end vertex
    pub s_b: f64,
    /// Signed distance to the edge line, positive on the inner side
    pub d: f64,
    /// Outward in-plane edge normal (global)
    pub outward: Vector3d,
    /// `∫ ds / r` along the edge
    pub log_term: f64,
}

/// Edge terms of a field point at local `(x, y, z)`
pub fn edge_terms(panel: &Panel, x: f64, y: f64, z: f64) -> [EdgeTerm; 3] {
    let lv = &panel.local_vertices;
    std::array::from_fn(|i| {
        let [ax, ay] = lv[i];
        let [bx, by] = lv[(i + 1) % 3];
        let len = panel.edge_lengths[i];
        let (tx, ty) = ((bx - ax) / len, (by - ay) / len);
        let (ux, uy) = (ty, -tx);

        let s_a = (ax - x) * tx + (ay - y) * ty;
        let s_b = (bx - x) * tx + (by - y) * ty;
        let d = (ax - x) * ux + (ay - y) * uy;
        let c = (d * d + z * z).sqrt();

        let log_term = if c > EPSY * len {
            (s_b / c).asinh() - (s_a / c).asinh()
        } else if s_a * s_b > 0.0 {
            // On the edge line, outside the segment
            s_b.signum() * (s_b.abs() / s_a.abs()).ln()
        } else {
            0.0
        };

        EdgeTerm {
            s_a,
            s_b,
            d,
            outward: panel.l * ux + panel.m * uy,
            log_term,
        }
    })
}

/// Unsigned solid angle from the edge-wise arctangent formula
///
/// Valid everywhere, including the panel plane where it returns `2π` inside
/// the triangle and `0` outside.
pub fn solid_angle_exact(edges: &[EdgeTerm; 3], z: f64) -> f64 {
    let az = z.abs();
    let f = |s: f64, d: f64| {
        let r = (s * s + d * d + z * z).sqrt();
        let den = (r + az) * (d * d * r + s * s * az);
        if den == 0.0 {
            0.0
        } else {
            (s * d * (s * s + d * d) / den).atan()
        }
    };
    edges
        .iter()
        .map(|e| f(e.s_b, e.d) - f(e.s_a, e.d))
        .sum::<f64>()
        .abs()
}

/// Signed solid angle from the Van Oosterom–Strackee formula
///
/// Ill-conditioned close to the panel plane.
pub fn solid_angle_vos(panel: &Panel, p: &Vector3d) -> f64 {
    let a = [
        panel.vertices[0] - *p,
        panel.vertices[1] - *p,
        panel.vertices[2] - *p,
    ];
    let r = [a[0].norm(), a[1].norm(), a[2].norm()];
    let num = a[0].dot(&a[1].cross(&a[2]));
    let den = r[0] * r[1] * r[2]
        + a[0].dot(&a[1]) * r[2]
        + a[0].dot(&a[2]) * r[1]
        + a[1].dot(&a[2]) * r[0];
    -2.0 * num.atan2(den)
}

/// True when the projected point lies strictly inside the triangle
pub fn inside(edges: &[EdgeTerm; 3], tol: f64) -> bool {
    edges.iter().all(|e| e.d > tol)
}

/// Signed solid angle of an in-plane point
pub fn in_plane_solid_angle(edges: &[EdgeTerm; 3], tol: f64, side: PlaneSide) -> f64 {
    if inside(edges, tol) {
        side.sign() * PI2
    } else {
        0.0
    }
}

/// Source potential and its gradient, given the signed solid angle
pub fn source(
    panel: &Panel,
    edges: &[EdgeTerm; 3],
    z: f64,
    omega: f64,
) -> (f64, Vector3d) {
    let mut potential = 0.0;
    let mut velocity = Vector3d::zero();
    for e in edges {
        potential += e.d * e.log_term;
        velocity -= e.outward * e.log_term;
    }
    potential -= z * omega;
    velocity -= panel.normal * omega;
    (potential, velocity)
}

/// Edge contribution to the doublet velocity for strengths varying
/// linearly from `mu_a` at `a` to `mu_b` at `b`
///
/// Equal strengths reduce to the Biot–Savart law of a straight segment
/// scaled by `4π`.
pub fn edge_integral(a: &Vector3d, b: &Vector3d, p: &Vector3d, mu_a: f64, mu_b: f64) -> Vector3d {
    let e = *b - *a;
    let ra = *p - *a;
    let rb = *p - *b;
    let axis = e.cross(&ra);
    let aa = e.norm_sqr();
    let bb = e.dot(&ra);
    let cc = ra.norm_sqr();
    let dd = axis.norm_sqr();
    if dd <= EPSY * aa * cc.max(aa) {
        return Vector3d::zero();
    }
    let r_a = cc.sqrt();
    let r_b = rb.norm();
    let i0 = (aa - bb) / (dd * r_b) + bb / (dd * r_a);
    let i1 = (bb - cc) / (dd * r_b) + cc / (dd * r_a);
    axis * (mu_a * (i0 - i1) + mu_b * i1)
}

/// Velocity of the uniform doublet, i.e. `-4π` times the unit vortex ring
pub fn uniform_doublet_velocity(panel: &Panel, p: &Vector3d) -> Vector3d {
    let v = &panel.vertices;
    -(0..3)
        .map(|i| edge_integral(&v[i], &v[(i + 1) % 3], p, 1.0, 1.0))
        .sum::<Vector3d>()
}

/// Potentials and velocities of the three linear doublet basis functions
pub fn linear_doublet(
    panel: &Panel,
    p: &Vector3d,
    (x, y, z): (f64, f64, f64),
    omega: f64,
    source_velocity: &Vector3d,
) -> ([f64; 3], [Vector3d; 3]) {
    let v = &panel.vertices;
    // Edge i with unit strength at its start, then at its end
    let rings: [Vector3d; 3] = std::array::from_fn(|i| {
        let (a, b) = (&v[i], &v[(i + 1) % 3]);
        edge_integral(a, b, p, 1.0, 0.0)
    });
    let tails: [Vector3d; 3] = std::array::from_fn(|i| {
        let (a, b) = (&v[i], &v[(i + 1) % 3]);
        edge_integral(a, b, p, 0.0, 1.0)
    });

    let n_at = panel.basis_at(x, y);
    let mut potential = [0.0; 3];
    let mut velocity = [Vector3d::zero(); 3];
    for k in 0..3 {
        let grad = panel.basis_gradient(k);
        potential[k] = n_at[k] * omega + z * grad.dot(source_velocity);

        // Vertex k starts edge k and ends edge k-1
        let edges = -(rings[k] + tails[(k + 2) % 3]);
        velocity[k] = edges + source_velocity.cross(&panel.normal.cross(&grad));
    }
    (potential, velocity)
}
