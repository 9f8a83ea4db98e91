//! Spherical points and the fixed WGS84-sphere constants used throughout the
//! geometry engine.

use super::vector3::Vector3;
use super::FP_EPSILON;

/// Mean radius of the WGS84 reference sphere, in meters. The geometry engine
/// works in a spherical (not ellipsoidal) approximation throughout, matching
/// the source library's choice to trade geodetic precision for a closed-form
/// great-circle algebra.
pub const EARTH_RADIUS_WGS84_SPHERE_M: f64 = 6_371_007.2;

pub const DEG2RAD: f64 = std::f64::consts::PI / 180.0;
pub const RAD2DEG: f64 = 180.0 / std::f64::consts::PI;

/// A point on the unit sphere, given as latitude/longitude in radians.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SphericalPoint {
    pub lat: f64,
    pub lon: f64,
}

impl SphericalPoint {
    pub const fn new(lat: f64, lon: f64) -> Self {
        SphericalPoint { lat, lon }
    }

    pub fn from_degrees(lat_deg: f64, lon_deg: f64) -> Self {
        let mut p = SphericalPoint::new(lat_deg * DEG2RAD, lon_deg * DEG2RAD);
        p.canonicalize();
        p
    }

    pub fn to_vector(&self) -> Vector3 {
        let (sin_lat, cos_lat) = self.lat.sin_cos();
        let (sin_lon, cos_lon) = self.lon.sin_cos();
        Vector3::new(cos_lat * cos_lon, cos_lat * sin_lon, sin_lat)
    }

    pub fn from_vector(v: &Vector3) -> Self {
        let rho = (v.x * v.x + v.y * v.y).sqrt();
        let lat = if rho == 0.0 {
            if v.z == 0.0 {
                0.0
            } else if v.z > 0.0 {
                std::f64::consts::FRAC_PI_2
            } else {
                -std::f64::consts::FRAC_PI_2
            }
        } else {
            (v.z / rho).atan()
        };
        let mut p = SphericalPoint::new(lat, v.y.atan2(v.x));
        p.canonicalize();
        p
    }

    /// Reduces lat/lon into canonical ranges: `lat` in `[-pi/2, pi/2]`,
    /// `lon` in `[0, 2*pi)`, with longitude forced to 0 at the poles.
    ///
    /// A latitude that wraps past a pole must flip the longitude by `pi` —
    /// this is the one step that is easy to get wrong by reducing `lat`
    /// modulo `2*pi` without touching `lon`.
    pub fn canonicalize(&mut self) {
        let lat_is_negative = self.lat < 0.0;
        let two_pi = 2.0 * std::f64::consts::PI;
        let pi = std::f64::consts::PI;
        let half_pi = std::f64::consts::FRAC_PI_2;

        self.lat -= (self.lat / two_pi).floor() * two_pi;
        self.lon -= (self.lon / two_pi).floor() * two_pi;

        if self.lon < 0.0 {
            self.lon += two_pi;
        }
        if self.lat > pi {
            self.lat -= two_pi;
        }
        if self.lat > half_pi {
            self.lat = pi - self.lat;
            self.lon += if self.lon < pi { pi } else { -pi };
        }
        if self.lat < -half_pi {
            self.lat = -pi - self.lat;
            self.lon += if self.lon < pi { pi } else { -pi };
        }

        if fp_eq(self.lat, half_pi) && lat_is_negative {
            self.lat = -half_pi;
        }
        if fp_eq(self.lon, two_pi) {
            self.lon = 0.0;
        }
        if fp_zero(self.lon) {
            self.lon = 0.0;
        }
        if fp_zero(self.lat) {
            self.lat = 0.0;
        }
    }

    pub fn canonicalized(mut self) -> Self {
        self.canonicalize();
        self
    }

    /// Vector equality under an absolute-epsilon comparison.
    pub fn equal(&self, other: &SphericalPoint) -> bool {
        self.to_vector().equal(&other.to_vector())
    }

    /// Great-circle distance in radians, collapsing sub-epsilon results to 0.
    pub fn distance(&self, other: &SphericalPoint) -> f64 {
        let d = (self.lat.sin() * other.lat.sin()
            + self.lat.cos() * other.lat.cos() * (self.lon - other.lon).cos())
        .clamp(-1.0, 1.0)
        .acos();
        if fp_zero(d) {
            0.0
        } else {
            d
        }
    }
}

/// Great-circle distance between two (lat, lon) pairs given in degrees,
/// returned in meters on the WGS84 sphere.
pub fn distance_m(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64) -> f64 {
    let a = SphericalPoint::from_degrees(lat1_deg, lon1_deg);
    let b = SphericalPoint::from_degrees(lat2_deg, lon2_deg);
    a.distance(&b) * EARTH_RADIUS_WGS84_SPHERE_M
}

pub(crate) fn fp_eq(a: f64, b: f64) -> bool {
    (a - b).abs() < FP_EPSILON
}

pub(crate) fn fp_zero(a: f64) -> bool {
    a.abs() < FP_EPSILON
}

pub(crate) fn fp_ge(a: f64, b: f64) -> bool {
    a > b || fp_eq(a, b)
}

pub(crate) fn fp_le(a: f64, b: f64) -> bool {
    a < b || fp_eq(a, b)
}

pub(crate) fn fp_gt(a: f64, b: f64) -> bool {
    a > b && !fp_eq(a, b)
}

pub(crate) fn fp_lt(a: f64, b: f64) -> bool {
    a < b && !fp_eq(a, b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn canonicalize_is_idempotent() {
        let mut p = SphericalPoint::new(3.0, -1.0);
        p.canonicalize();
        let once = p;
        p.canonicalize();
        assert_relative_eq!(once.lat, p.lat, epsilon = 1e-12);
        assert_relative_eq!(once.lon, p.lon, epsilon = 1e-12);
    }

    #[test]
    fn pole_forces_zero_longitude() {
        let p = SphericalPoint::from_degrees(90.0, 123.0);
        assert_relative_eq!(p.lon, 0.0, epsilon = 1e-12);
    }

    #[test]
    fn wrap_past_pole_flips_longitude() {
        // 100 degrees of latitude wraps past the north pole: the true
        // latitude is 80 degrees, on the opposite side of the globe.
        let mut p = SphericalPoint::new(100.0 * DEG2RAD, 10.0 * DEG2RAD);
        p.canonicalize();
        assert_relative_eq!(p.lat, 80.0 * DEG2RAD, epsilon = 1e-9);
        assert_relative_eq!(p.lon, 190.0 * DEG2RAD, epsilon = 1e-9);
    }

    #[test]
    fn distance_to_self_is_zero() {
        let p = SphericalPoint::from_degrees(12.0, 34.0);
        assert_eq!(p.distance(&p), 0.0);
    }

    #[test]
    fn distance_is_symmetric() {
        let p = SphericalPoint::from_degrees(12.0, 34.0);
        let q = SphericalPoint::from_degrees(-5.0, 100.0);
        assert_relative_eq!(p.distance(&q), q.distance(&p), epsilon = 1e-12);
    }

    #[test]
    fn vector_round_trip() {
        let p = SphericalPoint::from_degrees(12.0, 34.0);
        let v = p.to_vector();
        let q = SphericalPoint::from_vector(&v);
        assert_relative_eq!(p.lat, q.lat, epsilon = 1e-9);
        assert_relative_eq!(p.lon, q.lon, epsilon = 1e-9);
    }

    #[test]
    fn distance_m_matches_quarter_circumference_for_antipodal_quadrant() {
        // 90 degrees of great-circle arc is a quarter of the great circle.
        let d = distance_m(0.0, 0.0, 0.0, 90.0);
        let quarter_circumference = std::f64::consts::FRAC_PI_2 * EARTH_RADIUS_WGS84_SPHERE_M;
        assert_relative_eq!(d, quarter_circumference, epsilon = 1e-6);
    }
}
