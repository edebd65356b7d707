//! Core data types shared by the panel solver

use serde::{Deserialize, Serialize};
use std::ops::{Add, AddAssign, Div, Mul, Neg, Sub, SubAssign};

// ============================================================================
// Vector
// ============================================================================

/// 3D vector / point in body axes
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct Vector3d {
    /// X coordinate (downstream)
    pub x: f64,
    /// Y coordinate (starboard)
    pub y: f64,
    /// Z coordinate (up)
    pub z: f64,
}

impl Vector3d {
    /// Create a new vector
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// The zero vector
    pub const fn zero() -> Self {
        Self::new(0.0, 0.0, 0.0)
    }

    /// Unit vector along x
    pub const fn unit_x() -> Self {
        Self::new(1.0, 0.0, 0.0)
    }

    /// Unit vector along y
    pub const fn unit_y() -> Self {
        Self::new(0.0, 1.0, 0.0)
    }

    /// Unit vector along z
    pub const fn unit_z() -> Self {
        Self::new(0.0, 0.0, 1.0)
    }

    /// Dot product
    #[inline]
    pub fn dot(&self, other: &Vector3d) -> f64 {
        self.x * other.x + self.y * other.y + self.z * other.z
    }

    /// Cross product
    #[inline]
    pub fn cross(&self, other: &Vector3d) -> Vector3d {
        Vector3d {
            x: self.y * other.z - self.z * other.y,
            y: self.z * other.x - self.x * other.z,
            z: self.x * other.y - self.y * other.x,
        }
    }

    /// Squared length
    #[inline]
    pub fn norm_sqr(&self) -> f64 {
        self.dot(self)
    }

    /// Length
    #[inline]
    pub fn norm(&self) -> f64 {
        self.norm_sqr().sqrt()
    }

    /// Euclidean distance to another point
    #[inline]
    pub fn distance_to(&self, other: &Vector3d) -> f64 {
        (*self - *other).norm()
    }

    /// Normalize to unit length, `None` for a (near) zero vector
    pub fn normalize(&self) -> Option<Vector3d> {
        let len = self.norm();
        if len > 1e-300 && len.is_finite() {
            Some(*self / len)
        } else {
            None
        }
    }

    /// True when every component is finite
    pub fn is_finite(&self) -> bool {
        self.x.is_finite() && self.y.is_finite() && self.z.is_finite()
    }

    /// Rotate about a unit `axis` through the origin by `angle` (rad)
    pub fn rotate(&self, axis: &Vector3d, angle: f64) -> Vector3d {
        let (s, c) = angle.sin_cos();
        *self * c + axis.cross(self) * s + *axis * (axis.dot(self) * (1.0 - c))
    }

    /// Mirror image about the horizontal plane `z = height`
    pub fn mirror_z(&self, height: f64) -> Vector3d {
        Vector3d::new(self.x, self.y, 2.0 * height - self.z)
    }

    /// Reflect a direction about a horizontal plane
    pub fn reflect_z(&self) -> Vector3d {
        Vector3d::new(self.x, self.y, -self.z)
    }

    /// Component-wise conversion to an array
    pub fn to_array(&self) -> [f64; 3] {
        [self.x, self.y, self.z]
    }
}

impl Add for Vector3d {
    type Output = Vector3d;
    #[inline]
    fn add(self, o: Vector3d) -> Vector3d {
        Vector3d::new(self.x + o.x, self.y + o.y, self.z + o.z)
    }
}

impl AddAssign for Vector3d {
    #[inline]
    fn add_assign(&mut self, o: Vector3d) {
        self.x += o.x;
        self.y += o.y;
        self.z += o.z;
    }
}

impl Sub for Vector3d {
    type Output = Vector3d;
    #[inline]
    fn sub(self, o: Vector3d) -> Vector3d {
        Vector3d::new(self.x - o.x, self.y - o.y, self.z - o.z)
    }
}

impl SubAssign for Vector3d {
    #[inline]
    fn sub_assign(&mut self, o: Vector3d) {
        self.x -= o.x;
        self.y -= o.y;
        self.z -= o.z;
    }
}

impl Mul<f64> for Vector3d {
    type Output = Vector3d;
    #[inline]
    fn mul(self, s: f64) -> Vector3d {
        Vector3d::new(self.x * s, self.y * s, self.z * s)
    }
}

impl Div<f64> for Vector3d {
    type Output = Vector3d;
    #[inline]
    fn div(self, s: f64) -> Vector3d {
        Vector3d::new(self.x / s, self.y / s, self.z / s)
    }
}

impl Neg for Vector3d {
    type Output = Vector3d;
    #[inline]
    fn neg(self) -> Vector3d {
        Vector3d::new(-self.x, -self.y, -self.z)
    }
}

impl std::iter::Sum for Vector3d {
    fn sum<I: Iterator<Item = Vector3d>>(iter: I) -> Vector3d {
        iter.fold(Vector3d::zero(), |acc, v| acc + v)
    }
}

// ============================================================================
// Singularity models
// ============================================================================

/// Doublet distribution carried by each panel
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DoubletModel {
    /// One constant doublet strength per panel
    #[default]
    Uniform,
    /// Three nodal weights per panel with linear basis functions
    Linear,
}

impl DoubletModel {
    /// Number of doublet unknowns carried by one panel
    pub fn unknowns_per_panel(&self) -> usize {
        match self {
            DoubletModel::Uniform => 1,
            DoubletModel::Linear => 3,
        }
    }
}

/// Which limit to take when a field point lies in a panel's own plane
/// inside its boundary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum PlaneSide {
    /// Approach from the side the normal points to
    Exterior,
    /// Approach from the side opposite the normal
    #[default]
    Interior,
    /// Principal value, the average of both limits
    Mean,
}

impl PlaneSide {
    /// Sign applied to the ±2π solid-angle limit
    pub fn sign(&self) -> f64 {
        match self {
            PlaneSide::Exterior => 1.0,
            PlaneSide::Interior => -1.0,
            PlaneSide::Mean => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use std::f64::consts::FRAC_PI_2;

    #[test]
    fn test_cross_right_handed() {
        let z = Vector3d::unit_x().cross(&Vector3d::unit_y());
        assert_eq!(z, Vector3d::unit_z());
    }

    #[test]
    fn test_normalize_zero() {
        assert!(Vector3d::zero().normalize().is_none());
        let n = Vector3d::new(3.0, 0.0, 4.0).normalize().unwrap();
        assert_relative_eq!(n.norm(), 1.0, epsilon = 1e-15);
    }

    #[test]
    fn test_rotate_quarter_turn() {
        let v = Vector3d::unit_x().rotate(&Vector3d::unit_z(), FRAC_PI_2);
        assert_relative_eq!(v.x, 0.0, epsilon = 1e-15);
        assert_relative_eq!(v.y, 1.0, epsilon = 1e-15);
        assert_relative_eq!(v.z, 0.0, epsilon = 1e-15);
    }

    #[test]
    fn test_doublet_unknowns() {
        assert_eq!(DoubletModel::Uniform.unknowns_per_panel(), 1);
        assert_eq!(DoubletModel::Linear.unknowns_per_panel(), 3);
    }
}
