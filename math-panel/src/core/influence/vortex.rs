//! Vortex kernels for wake segments and vortons
//!
//! Unlike the panel kernels, these include the `1/4π` factor: they return
//! the velocity induced by a unit circulation (or by a vorton of the given
//! strength).

use crate::core::constants::PI4;
use crate::core::types::Vector3d;

/// Velocity induced at `p` by a straight vortex segment `a → b` of unit
/// circulation
///
/// Regularised with a Rankine-like core of radius `core`. Segments shorter
/// than the core induce nothing.
pub fn vortex_segment_velocity(a: &Vector3d, b: &Vector3d, p: &Vector3d, core: f64) -> Vector3d {
    let r0 = *b - *a;
    let len2 = r0.norm_sqr();
    if len2 < core * core || len2 == 0.0 {
        return Vector3d::zero();
    }
    let r1 = *p - *a;
    let r2 = *p - *b;
    let n1 = r1.norm();
    let n2 = r2.norm();
    if n1 == 0.0 || n2 == 0.0 {
        return Vector3d::zero();
    }
    let axis = r1.cross(&r2);
    let den = axis.norm_sqr() + core * core * len2;
    if den <= 0.0 {
        return Vector3d::zero();
    }
    let k = r0.dot(&(r1 / n1 - r2 / n2)) / (PI4 * den);
    axis * k
}

/// Velocity induced at `p` by a vorton of vector strength `alpha` located at
/// `position`, with smoothing radius `core`
pub fn vorton_velocity(position: &Vector3d, alpha: &Vector3d, p: &Vector3d, core: f64) -> Vector3d {
    let r = *p - *position;
    let d2 = r.norm_sqr() + core * core;
    if d2 == 0.0 {
        return Vector3d::zero();
    }
    alpha.cross(&r) / (PI4 * d2 * d2.sqrt())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::PI;

    #[test]
    fn test_infinite_line_limit() {
        // Long segment along x, point at distance h: v = 1/(2π h) along the swirl
        let a = Vector3d::new(-1e4, 0.0, 0.0);
        let b = Vector3d::new(1e4, 0.0, 0.0);
        let p = Vector3d::new(0.0, 0.5, 0.0);
        let v = vortex_segment_velocity(&a, &b, &p, 0.0);
        assert_relative_eq!(v.z, 1.0 / (2.0 * PI * 0.5), max_relative = 1e-6);
        assert_relative_eq!(v.y, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_core_removes_singularity() {
        let a = Vector3d::zero();
        let b = Vector3d::unit_x();
        let on_line = Vector3d::new(0.5, 0.0, 0.0);
        assert_eq!(vortex_segment_velocity(&a, &b, &on_line, 0.01), Vector3d::zero());
        let near = Vector3d::new(0.5, 1e-9, 0.0);
        assert!(vortex_segment_velocity(&a, &b, &near, 0.01).norm() < 1.0);
    }

    #[test]
    fn test_short_segment_ignored() {
        let v = vortex_segment_velocity(
            &Vector3d::zero(),
            &Vector3d::new(1e-3, 0.0, 0.0),
            &Vector3d::unit_y(),
            0.01,
        );
        assert_eq!(v, Vector3d::zero());
    }

    #[test]
    fn test_vorton_far_field() {
        let alpha = Vector3d::new(0.0, 0.0, 2.0);
        let p = Vector3d::new(3.0, 0.0, 0.0);
        let v = vorton_velocity(&Vector3d::zero(), &alpha, &p, 0.0);
        assert_relative_eq!(v.y, 2.0 / (4.0 * PI * 9.0), max_relative = 1e-12);
    }
}
