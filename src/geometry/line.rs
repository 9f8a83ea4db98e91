//! Great-circle line segments.
//!
//! A segment is stored as `(phi, theta, psi, length)`: the Euler transform
//! that carries the canonical segment `(0,0) -> (length,0)` to the actual
//! segment, plus the arc length itself. Every query (begin/end point,
//! containment, relationship to another line) is answered by applying or
//! inverting that one transform rather than by case-splitting on
//! latitude/longitude directly.

use super::euler::EulerTransform;
use super::point::{fp_eq, fp_ge, fp_gt, fp_le, fp_zero, SphericalPoint};
use super::vector3::Vector3;

/// Relationship between two spherical lines.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineRelationship {
    Equal,
    Contains,
    Contained,
    Overlap,
    Cross,
    Connected,
    Separate,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalLine {
    pub phi: f64,
    pub theta: f64,
    pub psi: f64,
    pub length: f64,
}

impl SphericalLine {
    pub(crate) fn euler(&self) -> EulerTransform {
        EulerTransform::new(self.phi, self.theta, self.psi)
    }

    /// Derives the line that carries `begin` to `(0,0)` and `end` to
    /// `(length,0)`.
    pub fn from_points(begin: &SphericalPoint, end: &SphericalPoint) -> SphericalLine {
        let length = begin.distance(end);
        if fp_zero(length) {
            // A zero-length segment still needs a well-defined frame: point
            // straight at `begin` with psi carrying the (irrelevant) second
            // axis.
            return SphericalLine {
                phi: std::f64::consts::FRAC_PI_2,
                theta: begin.lat,
                psi: begin.lon - std::f64::consts::FRAC_PI_2,
                length: 0.0,
            };
        }
        let e = EulerTransform::from_segment(begin, end);
        SphericalLine {
            phi: e.phi,
            theta: e.theta,
            psi: e.psi,
            length,
        }
    }

    pub fn begin(&self) -> SphericalPoint {
        self.euler().apply_point(&SphericalPoint::new(0.0, 0.0))
    }

    pub fn end(&self) -> SphericalPoint {
        self.euler().apply_point(&SphericalPoint::new(0.0, self.length))
    }

    fn swap_begin_end(&self) -> SphericalLine {
        let swapped = SphericalLine {
            phi: -self.length,
            theta: std::f64::consts::PI,
            psi: 0.0,
            length: self.length,
        };
        apply_euler_to_line(&swapped, &self.euler())
    }

    /// Rotates a point into this line's frame and checks it lands on the
    /// equator within `[0, length]`.
    pub fn contains_point(&self, p: &SphericalPoint) -> bool {
        let inv = self.euler().invert();
        let rotated = inv.apply_point(p);
        fp_zero(rotated.lat) && fp_ge(rotated.lon, 0.0) && fp_le(rotated.lon, self.length)
    }

    fn equal(&self, other: &SphericalLine) -> bool {
        if !fp_eq(self.length, other.length) {
            return false;
        }
        let e1 = self.euler();
        let other_phi = if fp_eq(other.length, 2.0 * std::f64::consts::PI) {
            self.phi
        } else {
            other.phi
        };
        let e2 = EulerTransform::new(other_phi, other.theta, other.psi);
        e1.equal(&e2)
    }

    /// Cartesian intersection of the two great-circle planes through `p`'s
    /// and `q`'s endpoints. Returns `(NaN, NaN)` if the planes coincide.
    pub fn intersection_point(p: &SphericalLine, q: &SphericalLine) -> SphericalPoint {
        let (p1, p2) = (p.begin().to_vector(), p.end().to_vector());
        let (q1, q2) = (q.begin().to_vector(), q.end().to_vector());
        let np = p1.cross(&p2);
        let nq = q1.cross(&q2);
        let u = np.cross(&nq);
        let norm = u.norm();
        if norm == 0.0 {
            return SphericalPoint::new(f64::NAN, f64::NAN);
        }
        let u = u.normalized();
        SphericalPoint::from_vector(&u)
    }

    /// `|(u-p) x (u-q)| / |p-q|` in 3-D.
    pub fn segment_point_distance(&self, point: &SphericalPoint) -> f64 {
        let p = self.begin().to_vector();
        let q = self.end().to_vector();
        let u = point.to_vector();
        let cross = u.sub(&p).cross(&u.sub(&q));
        let denom = p.sub(&q).norm();
        if denom == 0.0 {
            f64::NAN
        } else {
            cross.norm() / denom
        }
    }

    /// Classifies the relationship between two lines.
    pub fn relationship(line1: &SphericalLine, line2: &SphericalLine) -> LineRelationship {
        if line1.equal(line2) {
            return LineRelationship::Equal;
        }
        if line1.swap_begin_end().equal(line2) {
            return LineRelationship::Contains;
        }

        // Rotate the longer line onto the equator starting at (0,0), then
        // express the other line in that frame.
        let (longer_len, frame_source, other, switched) = if fp_ge(line1.length, line2.length) {
            (line1.length, line1, line2, false)
        } else if fp_ge(line2.length, line1.length) {
            (line2.length, line2, line1, true)
        } else {
            // length is NaN for at least one of the lines
            return LineRelationship::Separate;
        };
        if fp_zero(longer_len) {
            return LineRelationship::Separate;
        }

        let inv = frame_source.euler().invert();
        let rotated_other = apply_euler_to_line(other, &inv);
        let sl1 = SphericalLine {
            phi: 0.0,
            theta: 0.0,
            psi: 0.0,
            length: longer_len,
        };

        let p0 = sl1.begin();
        let p1 = sl1.end();
        let p2 = rotated_other.begin();
        let p3 = rotated_other.end();

        if fp_zero(p2.lat) && fp_zero(p3.lat) {
            let a1 = sl1.contains_point(&p2);
            let a2 = sl1.contains_point(&p3);
            if a1 && a2 {
                return if switched {
                    LineRelationship::Contained
                } else {
                    LineRelationship::Contains
                };
            } else if a1 {
                return if fp_eq(p0.lon, p2.lon) || fp_eq(p1.lon, p2.lon) {
                    LineRelationship::Connected
                } else {
                    LineRelationship::Overlap
                };
            } else if a2 {
                return if fp_eq(p0.lon, p3.lon) || fp_eq(p1.lon, p3.lon) {
                    LineRelationship::Connected
                } else {
                    LineRelationship::Overlap
                };
            }
            return LineRelationship::Separate;
        }

        let mut connected = false;
        if fp_gt(rotated_other.length, 0.0)
            && (p0.equal(&p2) || p0.equal(&p3) || p1.equal(&p2) || p1.equal(&p3))
        {
            connected = true;
        }

        let ascending = fp_ge(p2.lat, 0.0) && fp_le(p3.lat, 0.0);
        let descending = fp_le(p2.lat, 0.0) && fp_ge(p3.lat, 0.0);

        let crosses = if !(ascending || descending) {
            false
        } else {
            let inv2 = rotated_other.euler().invert();
            let mut node = SphericalPoint::new(0.0, (if ascending { std::f64::consts::PI } else { 0.0 }) - inv2.phi);
            node.canonicalize();
            fp_ge(node.lon, 0.0) && fp_le(node.lon, p1.lon)
        };

        if connected {
            LineRelationship::Connected
        } else if crosses {
            LineRelationship::Cross
        } else {
            LineRelationship::Separate
        }
    }
}

/// Transforms a line using an Euler transformation: rebuild its frame as
/// "frame-of-the-line, then the given transform", the way the source
/// library composes two ZXZ transforms by tracking where they send two test
/// points.
fn apply_euler_to_line(line: &SphericalLine, transform: &EulerTransform) -> SphericalLine {
    let begin = transform.apply_point(&line.begin());
    let end = transform.apply_point(&line.end());
    let new_line = SphericalLine::from_points(&begin, &end);
    SphericalLine {
        length: line.length,
        ..new_line
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn deg(lat: f64, lon: f64) -> SphericalPoint {
        SphericalPoint::from_degrees(lat, lon)
    }

    #[test]
    fn begin_end_round_trip() {
        let b = deg(10.0, 20.0);
        let e = deg(30.0, 40.0);
        let l = SphericalLine::from_points(&b, &e);
        let got_b = l.begin();
        let got_e = l.end();
        assert_relative_eq!(got_b.lat, b.lat, epsilon = 1e-9);
        assert_relative_eq!(got_b.lon, b.lon, epsilon = 1e-9);
        assert_relative_eq!(got_e.lat, e.lat, epsilon = 1e-9);
        assert_relative_eq!(got_e.lon, e.lon, epsilon = 1e-9);
    }

    #[test]
    fn contains_own_endpoints() {
        let b = deg(0.0, 0.0);
        let e = deg(0.0, 45.0);
        let l = SphericalLine::from_points(&b, &e);
        assert!(l.contains_point(&b));
        assert!(l.contains_point(&e));
        assert!(l.contains_point(&deg(0.0, 20.0)));
        assert!(!l.contains_point(&deg(10.0, 20.0)));
    }

    #[test]
    fn identical_lines_are_equal() {
        let b = deg(0.0, 0.0);
        let e = deg(0.0, 45.0);
        let l1 = SphericalLine::from_points(&b, &e);
        let l2 = SphericalLine::from_points(&b, &e);
        assert_eq!(SphericalLine::relationship(&l1, &l2), LineRelationship::Equal);
    }

    #[test]
    fn crossing_equatorial_lines_cross() {
        let l1 = SphericalLine::from_points(&deg(0.0, -10.0), &deg(0.0, 10.0));
        let l2 = SphericalLine::from_points(&deg(-10.0, 0.0), &deg(10.0, 0.0));
        assert_eq!(SphericalLine::relationship(&l1, &l2), LineRelationship::Cross);
    }

    #[test]
    fn disjoint_lines_are_separate() {
        let l1 = SphericalLine::from_points(&deg(0.0, -10.0), &deg(0.0, 10.0));
        let l2 = SphericalLine::from_points(&deg(40.0, -10.0), &deg(40.0, 10.0));
        assert_eq!(SphericalLine::relationship(&l1, &l2), LineRelationship::Separate);
    }

    #[test]
    fn shared_endpoint_is_connected() {
        let l1 = SphericalLine::from_points(&deg(0.0, 0.0), &deg(0.0, 10.0));
        let l2 = SphericalLine::from_points(&deg(0.0, 10.0), &deg(10.0, 10.0));
        assert_eq!(SphericalLine::relationship(&l1, &l2), LineRelationship::Connected);
    }

    #[test]
    fn intersection_point_is_nan_for_coincident_great_circles() {
        let l1 = SphericalLine::from_points(&deg(0.0, 0.0), &deg(0.0, 10.0));
        let l2 = SphericalLine::from_points(&deg(0.0, 20.0), &deg(0.0, 30.0));
        let u = SphericalLine::intersection_point(&l1, &l2);
        assert!(u.lat.is_nan() && u.lon.is_nan());
    }
}
