//! Triangle quadrature rules
//!
//! Symmetric Dunavant rules on the unit simplex. Weights sum to one, so an
//! integral over a panel is `area * Σ w f(point_at(bary))`.

// Allow excessive precision for high-precision mathematical constants
#![allow(clippy::excessive_precision)]

/// One quadrature point: barycentric coordinates and weight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrianglePoint {
    /// Barycentric weights of the three vertices
    pub bary: [f64; 3],
    /// Weight (the weights of a rule sum to one)
    pub weight: f64,
}

/// Triangle quadrature points
///
/// * `degree` 1: centroid, exact for linear functions
/// * `degree` 2: 4 points, exact up to cubics
/// * `degree` 3: 7 points, exact up to quintics
/// * higher: 13 points, exact up to degree 7
pub fn triangle_quadrature(degree: usize) -> Vec<TrianglePoint> {
    let table: &[[f64; 3]] = match degree {
        0 | 1 => &GAUCORWEI_TR1,
        2 => &GAUCORWEI_TR4,
        3 => &GAUCORWEI_TR7,
        _ => &GAUCORWEI_TR13,
    };
    table
        .iter()
        .map(|&[xi, eta, weight]| TrianglePoint {
            bary: [1.0 - xi - eta, xi, eta],
            weight,
        })
        .collect()
}

static GAUCORWEI_TR1: [[f64; 3]; 1] = [[0.333333333333333, 0.333333333333333, 1.0]];

static GAUCORWEI_TR4: [[f64; 3]; 4] = [
    [0.333333333333333, 0.333333333333333, -0.5625],
    [0.6, 0.2, 0.520833333333333],
    [0.2, 0.6, 0.520833333333333],
    [0.2, 0.2, 0.520833333333333],
];

static GAUCORWEI_TR7: [[f64; 3]; 7] = [
    [0.333333333333333, 0.333333333333333, 0.225],
    [0.797426985353087, 0.101286507323456, 0.125939180544827],
    [0.101286507323456, 0.797426985353087, 0.125939180544827],
    [0.101286507323456, 0.101286507323456, 0.125939180544827],
    [0.470142064105115, 0.059715871789770, 0.132394152788506],
    [0.059715871789770, 0.470142064105115, 0.132394152788506],
    [0.470142064105115, 0.470142064105115, 0.132394152788506],
];

static GAUCORWEI_TR13: [[f64; 3]; 13] = [
    [0.333333333333333, 0.333333333333333, -0.149570044467682],
    [0.260345966079040, 0.260345966079040, 0.175615257433208],
    [0.260345966079040, 0.479308067841920, 0.175615257433208],
    [0.479308067841920, 0.260345966079040, 0.175615257433208],
    [0.065130102902216, 0.065130102902216, 0.053347235608838],
    [0.065130102902216, 0.869739794195568, 0.053347235608838],
    [0.869739794195568, 0.065130102902216, 0.053347235608838],
    [0.638444188569810, 0.048690315425316, 0.077113760890257],
    [0.048690315425316, 0.638444188569810, 0.077113760890257],
    [0.638444188569810, 0.312865496004874, 0.077113760890257],
    [0.312865496004874, 0.638444188569810, 0.077113760890257],
    [0.048690315425316, 0.312865496004874, 0.077113760890257],
    [0.312865496004874, 0.048690315425316, 0.077113760890257],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_weights_sum_to_one() {
        for degree in 1..=4 {
            let rule = triangle_quadrature(degree);
            let sum: f64 = rule.iter().map(|p| p.weight).sum();
            assert!((sum - 1.0).abs() < 1e-12, "degree={}: sum={}", degree, sum);
            for p in &rule {
                assert!((p.bary.iter().sum::<f64>() - 1.0).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn test_quadratic_exact() {
        // ∫ xi² over the unit simplex (area 1/2) is 1/12, i.e. mean 1/6
        let rule = triangle_quadrature(2);
        let mean: f64 = rule.iter().map(|p| p.weight * p.bary[1] * p.bary[1]).sum();
        assert!((mean - 1.0 / 6.0).abs() < 1e-12);
    }
}
