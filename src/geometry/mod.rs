//! Spherical-geometry engine: vectors, points, rotations, lines, small
//! circles and convex polygons on the unit sphere.
//!
//! Every shape in this module is ultimately expressed in terms of
//! [`vector3::Vector3`] and [`euler::EulerTransform`]; the higher-level types
//! ([`line::SphericalLine`], [`circle::SphericalCircle`],
//! [`polygon::SphericalPolygon`]) build on those two primitives rather than
//! working with latitude/longitude directly.

pub mod circle;
pub mod euler;
pub mod line;
pub mod point;
pub mod polygon;
pub mod vector3;

pub use circle::SphericalCircle;
pub use euler::EulerTransform;
pub use line::{LineRelationship, SphericalLine};
pub use point::{distance_m, SphericalPoint, EARTH_RADIUS_WGS84_SPHERE_M};
pub use polygon::{PolygonLineRelationship, PolygonRelationship, SphericalPolygon};
pub use vector3::Vector3;

/// Absolute tolerance used throughout the geometry engine for floating-point
/// comparisons (point equality, zero-length checks, longitude wraparound).
/// The source library uses a fixed `1e-10` for this role across all of its
/// spherical-geometry routines; we keep the same value rather than making it
/// configurable, since every relationship test implicitly assumes the same
/// tolerance is used on both sides of a comparison.
pub(crate) const FP_EPSILON: f64 = 1e-10;
