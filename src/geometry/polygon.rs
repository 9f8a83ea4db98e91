//! Convex spherical polygons.
//!
//! A polygon is an ordered vertex list; the closing edge from the last
//! vertex back to the first is implicit. Containment, relationship and
//! intersection queries all reduce to the line and Euler-transform
//! primitives built elsewhere in this module — a polygon never reasons
//! about latitude/longitude directly.

use super::euler::EulerTransform;
use super::line::{LineRelationship, SphericalLine};
use super::point::{fp_gt, SphericalPoint};
use super::vector3::Vector3;
use super::FP_EPSILON;
use crate::error::{invalid_argument, HarpResult};

/// Fixed escape-rotation step for the point-in-containment retry loop (spec
/// §9 Open Question: a reproducible, RNG-free substitute for "perturb by a
/// small random rotation"). The golden angle keeps successive retries from
/// ever landing back on a previously-tried alignment.
const ESCAPE_ANGLE_RAD: f64 = 2.399963;
const MAX_ESCAPE_RETRIES: usize = 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonRelationship {
    Separate,
    Contains,
    Contained,
    Overlap,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PolygonLineRelationship {
    Separate,
    Contained,
    Overlap,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SphericalPolygon {
    pub vertices: Vec<SphericalPoint>,
}

impl SphericalPolygon {
    pub fn new(vertices: Vec<SphericalPoint>) -> Self {
        SphericalPolygon { vertices }
    }

    pub fn len(&self) -> usize {
        self.vertices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn edge(&self, i: usize) -> SphericalLine {
        let n = self.vertices.len();
        SphericalLine::from_points(&self.vertices[i], &self.vertices[(i + 1) % n])
    }

    /// Weighted sum of edge cross-products, oriented by the sign of the
    /// accumulated edge-pair rotation.
    pub fn centroid(&self) -> Vector3 {
        let n = self.vertices.len();
        let verts: Vec<Vector3> = self.vertices.iter().map(|p| p.to_vector()).collect();
        let mut crosses = Vec::with_capacity(n);
        let mut acc = Vector3::new(0.0, 0.0, 0.0);
        for i in 0..n {
            let a = verts[i];
            let b = verts[(i + 1) % n];
            let cross = a.cross(&b);
            let norm = cross.norm();
            let weight = self.vertices[i].distance(&self.vertices[(i + 1) % n]);
            if norm > 0.0 {
                acc = acc.add(&cross.scale(weight / norm));
            }
            crosses.push(cross);
        }
        let mut orientation = 0.0;
        for i in 0..n {
            orientation += crosses[i].cross(&crosses[(i + 1) % n]).dot(&verts[(i + 1) % n]);
        }
        if orientation < 0.0 {
            acc = acc.neg();
        }
        if acc.is_zero() {
            Vector3::new(1.0, 0.0, 0.0)
        } else {
            acc
        }
    }

    /// Validates the polygon: non-degenerate centroid, no non-adjacent edge
    /// pair crossing or overlapping, single-hemisphere containment around
    /// the centroid.
    pub fn check(&self) -> HarpResult<()> {
        let n = self.vertices.len();
        if n < 3 {
            return Err(invalid_argument(format!(
                "polygon must have at least 3 vertices, got {n}"
            )));
        }
        let centroid = self.centroid();
        if centroid.is_zero() {
            return Err(invalid_argument("polygon centroid is the zero vector"));
        }
        for i in 0..n {
            let edge_i = self.edge(i);
            for j in 0..n {
                if j == i || (j + 1) % n == i || (i + 1) % n == j {
                    continue;
                }
                let edge_j = self.edge(j);
                let rel = SphericalLine::relationship(&edge_i, &edge_j);
                if !matches!(rel, LineRelationship::Separate | LineRelationship::Connected) {
                    return Err(invalid_argument(format!(
                        "polygon edges {i} and {j} are not separate or connected ({rel:?})"
                    )));
                }
            }
        }
        let centroid_point = SphericalPoint::from_vector(&centroid.normalized());
        let to_origin = rotation_to_equator_origin(&centroid_point);
        for v in &self.vertices {
            let u = rotate_axis('y', -std::f64::consts::FRAC_PI_2, to_origin.apply(&v.to_vector()));
            let p = SphericalPoint::from_vector(&u);
            if !fp_gt(p.lat, 0.0) {
                return Err(invalid_argument(
                    "polygon is not strictly contained within one hemisphere around its centroid",
                ));
            }
        }
        Ok(())
    }

    /// Conservative, padded bounding box in (lat, lon-unwrapped-to-first-vertex)
    /// used only to short-circuit `contains_point` to `false`; never used to
    /// shortcut to `true`. Great-circle edges can bulge beyond the endpoint
    /// latitudes, so the box also considers each edge's spherical midpoint.
    fn bounding_box(&self) -> (f64, f64, f64, f64) {
        let ref_lon = self.vertices[0].lon;
        let two_pi = 2.0 * std::f64::consts::PI;
        let pi = std::f64::consts::PI;
        let n = self.vertices.len();
        let mut lat_min = f64::INFINITY;
        let mut lat_max = f64::NEG_INFINITY;
        let mut lon_min = f64::INFINITY;
        let mut lon_max = f64::NEG_INFINITY;
        let mut consider = |p: &SphericalPoint| {
            lat_min = lat_min.min(p.lat);
            lat_max = lat_max.max(p.lat);
            let mut lon = p.lon;
            while lon - ref_lon > pi {
                lon -= two_pi;
            }
            while lon - ref_lon < -pi {
                lon += two_pi;
            }
            lon_min = lon_min.min(lon);
            lon_max = lon_max.max(lon);
        };
        for i in 0..n {
            consider(&self.vertices[i]);
            let next = self.vertices[(i + 1) % n];
            let sum = self.vertices[i].to_vector().add(&next.to_vector());
            if !sum.is_zero() {
                consider(&SphericalPoint::from_vector(&sum.normalized()));
            }
        }
        let pad = 0.02;
        (lat_min - pad, lat_max + pad, lon_min - pad, lon_max + pad)
    }

    fn bbox_may_contain(&self, q: &SphericalPoint) -> bool {
        let (lat_min, lat_max, lon_min, lon_max) = self.bounding_box();
        // Wide polygons make this heuristic box nearly meaningless as a
        // rejection test; skip it rather than risk a false negative.
        if lat_max - lat_min > 3.0 || lon_max - lon_min > 3.0 {
            return true;
        }
        if q.lat < lat_min || q.lat > lat_max {
            return false;
        }
        let ref_lon = self.vertices[0].lon;
        let two_pi = 2.0 * std::f64::consts::PI;
        let pi = std::f64::consts::PI;
        let mut lon = q.lon;
        while lon - ref_lon > pi {
            lon -= two_pi;
        }
        while lon - ref_lon < -pi {
            lon += two_pi;
        }
        lon >= lon_min && lon <= lon_max
    }

    /// Spec §4.4.3: vertex/edge fast paths, then a rotate-to-origin ray cast
    /// along the equator from the query point to its antipode, counting
    /// edge crossings in `(0, π)`; odd means inside. Degenerate alignments
    /// (an edge exactly on the ray) are escaped by perturbing the frame
    /// around the ray axis and retrying.
    pub fn contains_point(&self, q: &SphericalPoint) -> bool {
        if self.vertices.iter().any(|v| v.equal(q)) {
            return true;
        }
        if !self.bbox_may_contain(q) {
            return false;
        }
        let n = self.vertices.len();
        for i in 0..n {
            if self.edge(i).contains_point(q) {
                return true;
            }
        }
        let to_origin = rotation_to_equator_origin(q);
        for attempt in 0..MAX_ESCAPE_RETRIES {
            let perturb = attempt as f64 * ESCAPE_ANGLE_RAD;
            let rotated: Vec<SphericalPoint> = self
                .vertices
                .iter()
                .map(|v| {
                    let u = rotate_axis('x', perturb, to_origin.apply(&v.to_vector()));
                    SphericalPoint::from_vector(&u)
                })
                .collect();
            if let Some(count) = equator_crossing_count(&rotated) {
                return count % 2 == 1;
            }
        }
        false
    }

    /// Spec §4.4.4: aggregates this polygon's per-edge relationship to
    /// `line`, refining CROSS by whether both/either endpoint lies on the
    /// crossed edge.
    pub fn line_relationship(&self, line: &SphericalLine) -> PolygonLineRelationship {
        let n = self.vertices.len();
        let mut saw_non_separate = false;
        for i in 0..n {
            let edge = self.edge(i);
            match SphericalLine::relationship(line, &edge) {
                LineRelationship::Equal => return PolygonLineRelationship::Separate,
                LineRelationship::Cross => {
                    let begin_on_edge = edge.contains_point(&line.begin());
                    let end_on_edge = edge.contains_point(&line.end());
                    if begin_on_edge && end_on_edge {
                        return PolygonLineRelationship::Contained;
                    } else if !begin_on_edge && !end_on_edge {
                        return PolygonLineRelationship::Overlap;
                    } else {
                        saw_non_separate = true;
                    }
                }
                LineRelationship::Overlap | LineRelationship::Contains | LineRelationship::Contained => {
                    saw_non_separate = true;
                }
                LineRelationship::Connected | LineRelationship::Separate => {}
            }
        }
        if saw_non_separate {
            PolygonLineRelationship::Overlap
        } else if self.contains_point(&line.begin()) {
            PolygonLineRelationship::Contained
        } else {
            PolygonLineRelationship::Separate
        }
    }

    /// Spec §4.4.5: intersects each edge of `b` against `a`, short-circuits
    /// on OVERLAP, and otherwise distinguishes CONTAINS/CONTAINED/SEPARATE
    /// via a single containment probe (sound for convex polygons, where one
    /// polygon either wholly contains the other or the two are disjoint
    /// once every edge-vs-edge test comes back SEPARATE or CONTAINED).
    pub fn relationship(a: &SphericalPolygon, b: &SphericalPolygon) -> PolygonRelationship {
        let mut any_contained = false;
        for i in 0..b.vertices.len() {
            match a.line_relationship(&b.edge(i)) {
                PolygonLineRelationship::Overlap => return PolygonRelationship::Overlap,
                PolygonLineRelationship::Contained => any_contained = true,
                PolygonLineRelationship::Separate => {}
            }
        }
        if any_contained {
            return PolygonRelationship::Contains;
        }
        if b.vertices.is_empty() {
            return PolygonRelationship::Separate;
        }
        if b.contains_point(&a.vertices[0]) {
            PolygonRelationship::Contained
        } else {
            PolygonRelationship::Separate
        }
    }

    /// Spec §4.4.6: Sutherland-Hodgman clip of `a` against each of `b`'s
    /// edge half-spaces in turn (sound because both polygons are convex).
    pub fn intersection(a: &SphericalPolygon, b: &SphericalPolygon) -> Option<SphericalPolygon> {
        if a.vertices.len() < 3 || b.vertices.len() < 3 {
            return None;
        }
        let centroid_b = b.centroid().normalized();
        let mut current = a.vertices.clone();
        let n_b = b.vertices.len();
        for i in 0..n_b {
            if current.len() < 3 {
                return None;
            }
            let b0 = b.vertices[i].to_vector();
            let b1 = b.vertices[(i + 1) % n_b].to_vector();
            let mut normal = b0.cross(&b1);
            if normal.is_zero() {
                continue;
            }
            normal = normal.normalized();
            if normal.dot(&centroid_b) < 0.0 {
                normal = normal.neg();
            }
            let clip_line = b.edge(i);
            let m = current.len();
            let mut output = Vec::with_capacity(m + 1);
            for k in 0..m {
                let cur = current[k];
                let nxt = current[(k + 1) % m];
                let cur_in = normal.dot(&cur.to_vector()) >= -FP_EPSILON;
                let nxt_in = normal.dot(&nxt.to_vector()) >= -FP_EPSILON;
                if cur_in {
                    output.push(cur);
                }
                if cur_in != nxt_in {
                    if let Some(p) = edge_plane_intersection(&cur, &nxt, &clip_line) {
                        output.push(p);
                    }
                }
            }
            current = output;
        }
        if current.len() < 3 {
            None
        } else {
            Some(SphericalPolygon::new(current))
        }
    }

    /// Spec §4.4.6: Girard's theorem on the fan of triangles `(v0, vi,
    /// vi+1)`, returning whichever of `S`/`4*pi - S` has the smaller
    /// magnitude so the result always names the ≤ hemisphere side.
    pub fn area_steradians(&self) -> f64 {
        let n = self.vertices.len();
        if n < 3 {
            return 0.0;
        }
        let v0 = self.vertices[0].to_vector();
        let mut total = 0.0;
        for i in 1..n - 1 {
            let b = self.vertices[i].to_vector();
            let c = self.vertices[i + 1].to_vector();
            total += triangle_excess(v0, b, c);
        }
        let four_pi = 4.0 * std::f64::consts::PI;
        let complement = four_pi - total;
        if total.abs() <= complement.abs() {
            total
        } else {
            complement
        }
    }

    pub fn area_m2(&self) -> f64 {
        self.area_steradians() * super::EARTH_RADIUS_WGS84_SPHERE_M * super::EARTH_RADIUS_WGS84_SPHERE_M
    }

    /// Spec §4.4.6: `area(A ∩ B) / min(area(A), area(B))`.
    pub fn overlap_fraction(a: &SphericalPolygon, b: &SphericalPolygon) -> f64 {
        let area_a = a.area_steradians().abs();
        let area_b = b.area_steradians().abs();
        let min_area = area_a.min(area_b);
        if min_area == 0.0 {
            return 0.0;
        }
        match SphericalPolygon::intersection(a, b) {
            Some(inter) => inter.area_steradians().abs() / min_area,
            None => 0.0,
        }
    }

    /// Spec §4.4.7.
    pub fn from_bounds(lat_bounds: &[f64], lon_bounds: &[f64], num_vertices: usize) -> HarpResult<SphericalPolygon> {
        if num_vertices == 2 {
            if lat_bounds.len() < 2 || lon_bounds.len() < 2 {
                return Err(invalid_argument(
                    "polygon_from_bounds requires two lat/lon corner values",
                ));
            }
            let (lat0, lat1) = (lat_bounds[0], lat_bounds[1]);
            let (lon0, lon1) = (lon_bounds[0], lon_bounds[1]);
            if (lat0 - lat1).abs() < 1e-9 || (lon0 - lon1).abs() < 1e-9 {
                return Err(invalid_argument(
                    "polygon_from_bounds: corner points coincide in latitude or longitude",
                ));
            }
            return Ok(SphericalPolygon::new(vec![
                SphericalPoint::from_degrees(lat0, lon0),
                SphericalPoint::from_degrees(lat0, lon1),
                SphericalPoint::from_degrees(lat1, lon1),
                SphericalPoint::from_degrees(lat1, lon0),
            ]));
        }
        let mut vertices: Vec<SphericalPoint> = lat_bounds
            .iter()
            .zip(lon_bounds.iter())
            .filter(|(lat, lon)| !lat.is_nan() && !lon.is_nan())
            .map(|(&lat, &lon)| SphericalPoint::from_degrees(lat, lon))
            .collect();
        if vertices.len() >= 2 && vertices[0].equal(&vertices[vertices.len() - 1]) {
            vertices.pop();
        }
        if vertices.len() < 3 {
            return Err(invalid_argument(format!(
                "polygon_from_bounds: fewer than 3 valid vertices ({})",
                vertices.len()
            )));
        }
        Ok(SphericalPolygon::new(vertices))
    }
}

fn rotate_axis(axis: char, angle: f64, v: Vector3) -> Vector3 {
    let (s, c) = angle.sin_cos();
    match axis {
        'x' => Vector3::new(v.x, c * v.y - s * v.z, s * v.y + c * v.z),
        'y' => Vector3::new(c * v.x + s * v.z, v.y, -s * v.x + c * v.z),
        'z' => Vector3::new(c * v.x - s * v.y, s * v.x + c * v.y, v.z),
        _ => v,
    }
}

/// A transform carrying `point` to the equator origin `(0,0)`, built by
/// inverting the segment transform from `point` to an arbitrary auxiliary
/// point not coincident with it.
fn rotation_to_equator_origin(point: &SphericalPoint) -> EulerTransform {
    let near_pole = point.lat.abs() > std::f64::consts::FRAC_PI_2 - 1e-6;
    let aux = if near_pole {
        SphericalPoint::new(0.0, 0.0)
    } else {
        SphericalPoint::new(std::f64::consts::FRAC_PI_2, 0.0)
    };
    EulerTransform::from_segment(point, &aux).invert()
}

/// Counts edges of `rotated` (already expressed in a frame where the query
/// point sits at `(0,0)`) that cross the equatorial ray from the origin to
/// its antipode at longitude π. Returns `None` if an edge lies exactly on
/// that ray, signalling the caller to retry with a different perturbation.
fn equator_crossing_count(rotated: &[SphericalPoint]) -> Option<usize> {
    let n = rotated.len();
    let pi = std::f64::consts::PI;
    let mut count = 0;
    for i in 0..n {
        let p = rotated[i];
        let q = rotated[(i + 1) % n];
        if p.lat == 0.0 && q.lat == 0.0 {
            return None;
        }
        let ascending = p.lat >= 0.0 && q.lat <= 0.0;
        let descending = p.lat <= 0.0 && q.lat >= 0.0;
        if !ascending && !descending {
            continue;
        }
        let edge_line = SphericalLine::from_points(&p, &q);
        let inv = edge_line.euler().invert();
        let mut node = SphericalPoint::new(0.0, (if ascending { pi } else { 0.0 }) - inv.phi);
        node.canonicalize();
        if node.lon == 0.0 || node.lon == pi {
            return None;
        }
        if node.lon > 0.0 && node.lon < pi {
            count += 1;
        }
    }
    Some(count)
}

fn edge_plane_intersection(cur: &SphericalPoint, nxt: &SphericalPoint, clip_line: &SphericalLine) -> Option<SphericalPoint> {
    let edge_line = SphericalLine::from_points(cur, nxt);
    let p = SphericalLine::intersection_point(&edge_line, clip_line);
    if p.lat.is_nan() {
        return None;
    }
    if edge_line.contains_point(&p) {
        return Some(p);
    }
    let antipode = SphericalPoint::from_vector(&p.to_vector().neg());
    if edge_line.contains_point(&antipode) {
        Some(antipode)
    } else {
        None
    }
}

/// Solid angle of the spherical triangle `(a, b, c)` via the numerically
/// stable Van Oosterom-Strackee formula (equivalent to Girard's theorem,
/// without the ill-conditioning of subtracting three separate angles).
fn triangle_excess(a: Vector3, b: Vector3, c: Vector3) -> f64 {
    let triple = a.dot(&b.cross(&c));
    let denom = 1.0 + a.dot(&b) + b.dot(&c) + c.dot(&a);
    2.0 * triple.atan2(denom)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn deg(lat: f64, lon: f64) -> SphericalPoint {
        SphericalPoint::from_degrees(lat, lon)
    }

    fn square(half_side_deg: f64) -> SphericalPolygon {
        let h = half_side_deg;
        SphericalPolygon::new(vec![deg(-h, -h), deg(-h, h), deg(h, h), deg(h, -h)])
    }

    #[test]
    fn square_is_valid() {
        assert!(square(5.0).check().is_ok());
    }

    #[test]
    fn square_contains_center_and_vertices() {
        let poly = square(5.0);
        assert!(poly.contains_point(&deg(0.0, 0.0)));
        for v in &poly.vertices {
            assert!(poly.contains_point(v));
        }
        assert!(!poly.contains_point(&deg(20.0, 20.0)));
    }

    #[test]
    fn self_overlap_fraction_is_one() {
        let poly = square(5.0);
        assert_relative_eq!(
            SphericalPolygon::overlap_fraction(&poly, &poly),
            1.0,
            epsilon = 1e-6
        );
    }

    #[test]
    fn overlap_fraction_is_symmetric() {
        let a = square(5.0);
        let b = SphericalPolygon::new(vec![deg(-2.0, -2.0), deg(-2.0, 8.0), deg(8.0, 8.0), deg(8.0, -2.0)]);
        let f_ab = SphericalPolygon::overlap_fraction(&a, &b);
        let f_ba = SphericalPolygon::overlap_fraction(&b, &a);
        assert_relative_eq!(f_ab, f_ba, epsilon = 1e-6);
    }

    #[test]
    fn area_is_positive_and_partitions_additively() {
        let poly = square(10.0);
        let area = poly.area_steradians();
        assert!(area > 0.0);

        let left = SphericalPolygon::new(vec![deg(-10.0, -10.0), deg(-10.0, 0.0), deg(10.0, 0.0), deg(10.0, -10.0)]);
        let right = SphericalPolygon::new(vec![deg(-10.0, 0.0), deg(-10.0, 10.0), deg(10.0, 10.0), deg(10.0, 0.0)]);
        let sum = left.area_steradians() + right.area_steradians();
        assert_relative_eq!(sum, area, epsilon = 1e-6);
    }

    #[test]
    fn from_bounds_two_corners_makes_rectangle() {
        let poly = SphericalPolygon::from_bounds(&[0.0, 10.0], &[0.0, 10.0], 2).unwrap();
        assert_eq!(poly.vertices.len(), 4);
        assert!(poly.contains_point(&deg(5.0, 5.0)));
    }

    #[test]
    fn from_bounds_rejects_coincident_corners() {
        assert!(SphericalPolygon::from_bounds(&[0.0, 0.0], &[0.0, 10.0], 2).is_err());
    }

    #[test]
    fn disjoint_polygons_are_separate() {
        let a = square(2.0);
        let b = SphericalPolygon::new(vec![deg(40.0, 40.0), deg(40.0, 44.0), deg(44.0, 44.0), deg(44.0, 40.0)]);
        assert_eq!(SphericalPolygon::relationship(&a, &b), PolygonRelationship::Separate);
    }

    #[test]
    fn inner_polygon_is_contained() {
        let outer = square(10.0);
        let inner = square(2.0);
        assert_eq!(
            SphericalPolygon::relationship(&outer, &inner),
            PolygonRelationship::Contains
        );
        assert_eq!(
            SphericalPolygon::relationship(&inner, &outer),
            PolygonRelationship::Contained
        );
    }
}
