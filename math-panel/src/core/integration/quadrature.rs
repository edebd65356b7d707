//! Brute-force panel integrals
//!
//! The panel is split `levels` times into four similar children and a
//! triangle rule is applied on every child. Accurate only for field points
//! further than a few child sizes from the panel.

use super::gauss::triangle_quadrature;
use crate::core::influence::Influence;
use crate::core::mesh::Panel;
use crate::core::types::{DoubletModel, Vector3d};

/// Visit every quadrature point of a subdivided panel
///
/// `f` receives the point, its barycentric coordinates with respect to the
/// panel vertices and the area weight.
pub fn integrate_panel<F>(panel: &Panel, levels: usize, degree: usize, mut f: F)
where
    F: FnMut(Vector3d, [f64; 3], f64),
{
    let rule = triangle_quadrature(degree);
    let corners = [[1.0, 0.0, 0.0], [0.0, 1.0, 0.0], [0.0, 0.0, 1.0]];
    let mut children: Vec<[[f64; 3]; 3]> = vec![corners];
    for _ in 0..levels {
        children = children
            .iter()
            .flat_map(|&[a, b, c]| {
                let ab = mid(a, b);
                let bc = mid(b, c);
                let ca = mid(c, a);
                [[a, ab, ca], [ab, b, bc], [ca, bc, c], [ab, bc, ca]]
            })
            .collect();
    }

    let child_area = panel.area / children.len() as f64;
    for [a, b, c] in children {
        for q in &rule {
            let w = q.bary;
            let bary = [
                w[0] * a[0] + w[1] * b[0] + w[2] * c[0],
                w[0] * a[1] + w[1] * b[1] + w[2] * c[1],
                w[0] * a[2] + w[1] * b[2] + w[2] * c[2],
            ];
            f(panel.point_at(bary), bary, q.weight * child_area);
        }
    }
}

fn mid(a: [f64; 3], b: [f64; 3]) -> [f64; 3] {
    [0.5 * (a[0] + b[0]), 0.5 * (a[1] + b[1]), 0.5 * (a[2] + b[2])]
}

/// Influence of a panel obtained by quadrature of the raw kernels
pub fn reference_influence(
    panel: &Panel,
    point: &Vector3d,
    model: DoubletModel,
    levels: usize,
) -> Influence {
    let mut out = Influence::zero(model);
    let n = panel.normal;
    integrate_panel(panel, levels, 3, |q, bary, w| {
        let r = *point - q;
        let r2 = r.norm_sqr();
        let r1 = r2.sqrt();
        let r3 = r2 * r1;
        let nr = n.dot(&r);
        out.source_potential += w / r1;
        out.source_velocity -= r * (w / r3);

        let potential = w * nr / r3;
        let velocity = (n - r * (3.0 * nr / r2)) * (w / r3);
        match model {
            DoubletModel::Uniform => {
                out.doublet_potential[0] += potential;
                out.doublet_velocity[0] += velocity;
            }
            DoubletModel::Linear => {
                for k in 0..3 {
                    out.doublet_potential[k] += bary[k] * potential;
                    out.doublet_velocity[k] += velocity * bary[k];
                }
            }
        }
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_area_and_first_moment() {
        let panel = Panel::new(
            0,
            [0, 1, 2],
            [
                Vector3d::new(0.0, 0.0, 0.0),
                Vector3d::new(3.0, 0.0, 0.0),
                Vector3d::new(0.0, 2.0, 1.0),
            ],
        );
        let mut area = 0.0;
        let mut moment = Vector3d::zero();
        integrate_panel(&panel, 2, 1, |q, _, w| {
            area += w;
            moment += q * w;
        });
        assert_relative_eq!(area, panel.area, epsilon = 1e-12);
        let centroid = moment / area;
        assert_relative_eq!(centroid.x, panel.centroid.x, epsilon = 1e-12);
        assert_relative_eq!(centroid.z, panel.centroid.z, epsilon = 1e-12);
    }
}
