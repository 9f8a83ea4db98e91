//! Small circles: the set of points at a fixed angular radius from a center
//! point.

use super::euler::EulerTransform;
use super::point::{fp_eq, fp_le, SphericalPoint};

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalCircle {
    pub center: SphericalPoint,
    /// Angular radius, in radians, measured along the sphere's surface.
    pub radius: f64,
}

impl SphericalCircle {
    pub fn new(center: SphericalPoint, radius: f64) -> Self {
        SphericalCircle { center, radius }
    }

    pub fn equal(&self, other: &SphericalCircle) -> bool {
        self.center.equal(&other.center) && fp_eq(self.radius, other.radius)
    }

    pub fn contains_point(&self, point: &SphericalPoint) -> bool {
        fp_le(self.center.distance(point), self.radius)
    }

    pub fn apply_euler_transformation(&self, transform: &EulerTransform) -> SphericalCircle {
        SphericalCircle {
            center: transform.apply_point(&self.center),
            radius: self.radius,
        }
    }
}
