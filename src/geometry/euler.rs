//! ZXZ Euler rotations.
//!
//! Every spherical line and polygon is ultimately anchored by one of these:
//! a line is "the equator, rotated by this transform"; containment and
//! relationship tests work by rotating the scene into a frame where the
//! question becomes a simple equatorial one.

use super::point::{fp_zero, SphericalPoint};
use super::vector3::Vector3;
use crate::error::{invalid_argument, HarpResult};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl Axis {
    fn apply(self, angle: f64, u: Vector3) -> Vector3 {
        let (s, c) = angle.sin_cos();
        match self {
            Axis::X => Vector3::new(u.x, c * u.y - s * u.z, s * u.y + c * u.z),
            Axis::Y => Vector3::new(c * u.x + s * u.z, u.y, -s * u.x + c * u.z),
            Axis::Z => Vector3::new(c * u.x - s * u.y, s * u.x + c * u.y, u.z),
        }
    }
}

/// A ZXZ Euler transformation: three successive rotations by `phi` (Z),
/// `theta` (X), `psi` (Z).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EulerTransform {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
}

impl EulerTransform {
    pub const fn new(phi: f64, theta: f64, psi: f64) -> Self {
        EulerTransform { phi, theta, psi }
    }

    pub const fn identity() -> Self {
        EulerTransform::new(0.0, 0.0, 0.0)
    }

    /// Applies the transform to a 3-D vector via three successive axis
    /// rotations (Z, then X, then Z). An unrecognized axis cannot occur for
    /// this fixed ZXZ convention, but `apply_axes` below accepts arbitrary
    /// axis characters and fails with `InvalidArgument`, matching the
    /// source library's generic (non-ZXZ-specialized) rotation routine.
    pub fn apply(&self, v: &Vector3) -> Vector3 {
        let u = Axis::Z.apply(self.phi, *v);
        let u = Axis::X.apply(self.theta, u);
        Axis::Z.apply(self.psi, u)
    }

    /// General axis-sequence application, kept for parity with the source
    /// library's `vector3d_apply_euler_transformation`, which dispatches on
    /// an axis character per angle and fails on an unrecognized one.
    pub fn apply_axes(angles: [(f64, char); 3], v: &Vector3) -> HarpResult<Vector3> {
        let mut u = *v;
        for (angle, axis) in angles {
            if fp_zero(angle) {
                continue;
            }
            let axis = match axis {
                'X' => Axis::X,
                'Y' => Axis::Y,
                'Z' => Axis::Z,
                other => {
                    return Err(invalid_argument(format!(
                        "invalid Euler rotation axis '{other}'"
                    )))
                }
            };
            u = axis.apply(angle, u);
        }
        Ok(u)
    }

    pub fn apply_point(&self, p: &SphericalPoint) -> SphericalPoint {
        SphericalPoint::from_vector(&self.apply(&p.to_vector()))
    }

    /// Swaps `phi`/`psi` and negates angles in reverse order, then
    /// re-canonicalizes each via a spherical-point round trip (the longitude
    /// canonicalization of `SphericalPoint` is reused here because the
    /// source library re-derives the inverse angles through the same
    /// `harp_spherical_point_check` routine it uses for points).
    pub fn invert(&self) -> EulerTransform {
        let mut p0 = SphericalPoint::new(0.0, -self.psi);
        let mut p1 = SphericalPoint::new(0.0, -self.theta);
        let mut p2 = SphericalPoint::new(0.0, -self.phi);
        p0.canonicalize();
        p1.canonicalize();
        p2.canonicalize();
        EulerTransform::new(p0.lon, p1.lon, p2.lon)
    }

    /// Two fixed test points (the equator's origin, and a quarter-turn
    /// along it) are carried by both transforms; if the destinations match,
    /// the transforms are equal.
    pub fn equal(&self, other: &EulerTransform) -> bool {
        let p0 = SphericalPoint::new(0.0, 0.0);
        let p1 = SphericalPoint::new(0.0, std::f64::consts::FRAC_PI_2);
        self.apply_point(&p0).equal(&other.apply_point(&p0))
            && self.apply_point(&p1).equal(&other.apply_point(&p1))
    }

    /// Builds the transform carrying `(0,0)` to `begin` and `(L,0)` to
    /// `end`, where `L` is the great-circle distance between them.
    pub fn from_segment(begin: &SphericalPoint, end: &SphericalPoint) -> EulerTransform {
        inverse_from_segment(begin, end).invert()
    }
}

/// Builds the *inverse* transform directly (cheaper than inverting the
/// forward transform, and it's what the forward builder is defined in terms
/// of — mirrors the source library's two-step `harp_euler_transformation_
/// from_spherical_vector`, which always constructs the inverse first).
fn inverse_from_segment(begin: &SphericalPoint, end: &SphericalPoint) -> EulerTransform {
    if begin.equal(end) {
        return EulerTransform::identity();
    }
    let v_begin = begin.to_vector();
    let v_end = end.to_vector();
    let normal = v_begin.cross(&v_end);
    let pole = SphericalPoint::from_vector(&normal);

    let half_pi = std::f64::consts::FRAC_PI_2;
    let mut partial = EulerTransform::new(-pole.lon - half_pi, pole.lat - half_pi, 0.0);

    let rotated_begin = partial.apply_point(begin);
    partial.psi = -rotated_begin.lon;
    partial
}
