//! Grid-clipping: per-cell area-fraction weights of a source footprint
//! polygon against a regular lat/lon grid.
//!
//! The overlap geometry here is deliberately **not** spherical: `(lon, lat)`
//! is treated as a Cartesian (Plate-Carrée) plane for this one purpose,
//! clipping footprints against grid cells with planar polygon algebra
//! rather than going back through the spherical-geometry engine for every
//! cell.

use crate::error::{invalid_argument, HarpResult};

/// A regular lat/lon grid defined by strictly ascending edge arrays, in
/// degrees.
#[derive(Debug, Clone, PartialEq)]
pub struct GridSpec {
    lat_edges: Vec<f64>,
    lon_edges: Vec<f64>,
}

impl GridSpec {
    pub fn new(lat_edges: Vec<f64>, lon_edges: Vec<f64>) -> HarpResult<GridSpec> {
        if lat_edges.len() < 2 {
            return Err(invalid_argument("need at least 2 latitude edges"));
        }
        if lon_edges.len() < 2 {
            return Err(invalid_argument("need at least 2 longitude edges"));
        }
        for w in lat_edges.windows(2) {
            if !(w[0] < w[1]) {
                return Err(invalid_argument(
                    "latitude edge values must be strictly ascending",
                ));
            }
        }
        for w in lon_edges.windows(2) {
            if !(w[0] < w[1]) {
                return Err(invalid_argument(
                    "longitude edge values must be strictly ascending",
                ));
            }
        }
        for &lat in &lat_edges {
            if !(-90.0..=90.0).contains(&lat) {
                return Err(invalid_argument(format!(
                    "latitude edge value {lat} must be in [-90, 90]"
                )));
            }
        }
        if lon_edges[lon_edges.len() - 1] - lon_edges[0] > 360.0 {
            return Err(invalid_argument(
                "longitude edge range cannot exceed 360 degrees",
            ));
        }
        Ok(GridSpec { lat_edges, lon_edges })
    }

    pub fn num_lat_cells(&self) -> usize {
        self.lat_edges.len() - 1
    }

    pub fn num_lon_cells(&self) -> usize {
        self.lon_edges.len() - 1
    }

    pub fn num_cells(&self) -> usize {
        self.num_lat_cells() * self.num_lon_cells()
    }

    pub fn lat_bounds(&self, lat_id: usize) -> (f64, f64) {
        (self.lat_edges[lat_id], self.lat_edges[lat_id + 1])
    }

    pub fn lon_bounds(&self, lon_id: usize) -> (f64, f64) {
        (self.lon_edges[lon_id], self.lon_edges[lon_id + 1])
    }

    /// Point-sample lookup: lower edge inclusive, upper edge exclusive,
    /// longitude wrapped into the grid's own 360-degree window first.
    pub fn cell_for_point(&self, lat_deg: f64, lon_deg: f64) -> Option<usize> {
        let lat_id = find_index(&self.lat_edges, lat_deg);
        if lat_id < 0 || lat_id >= self.num_lat_cells() as i64 {
            return None;
        }
        let wrapped = wrap(lon_deg, self.lon_edges[0], self.lon_edges[0] + 360.0);
        let lon_id = find_index(&self.lon_edges, wrapped);
        if lon_id < 0 || lon_id >= self.num_lon_cells() as i64 {
            return None;
        }
        Some(lat_id as usize * self.num_lon_cells() + lon_id as usize)
    }

    /// Spec §4.5: the per-sample cell/weight list for a polygon footprint
    /// given as (possibly NaN-padded) lat/lon vertex bound arrays. Returns
    /// an empty list for a sample with fewer than 2 usable vertices, one
    /// that falls entirely outside the grid, or one whose 360-degree
    /// longitude span straddles the equator (ambiguous pole coverage).
    pub fn cells_and_weights_for_bounds(
        &self,
        lat_bounds: &[f64],
        lon_bounds: &[f64],
    ) -> HarpResult<Vec<(usize, f64)>> {
        if lat_bounds.len() != lon_bounds.len() {
            return Err(invalid_argument(
                "latitude_bounds and longitude_bounds must have the same length",
            ));
        }
        let mut n = lat_bounds.len();
        while n > 0 && lat_bounds[n - 1].is_nan() {
            n -= 1;
        }
        let mut lat: Vec<f64> = lat_bounds[..n].to_vec();
        let mut lon: Vec<f64> = lon_bounds[..n].to_vec();

        if lat.len() > 2 && lat[0] == lat[lat.len() - 1] && lon[0] == lon[lon.len() - 1] {
            lat.pop();
            lon.pop();
        }
        if lat.len() == 2 {
            let (lat0, lat1) = (lat[0], lat[1]);
            let (lon0, lon1) = (lon[0], lon[1]);
            lat = vec![lat0, lat0, lat1, lat1];
            lon = vec![lon0, lon1, lon1, lon0];
        } else if lat.len() < 2 {
            return Ok(Vec::new());
        }

        let bounds = match make_2d_polygon(&mut lat, &mut lon, self.lon_edges[0]) {
            Some(b) => b,
            None => return Ok(Vec::new()),
        };
        let (lat_min, lat_max, lon_min0, lon_max0) = bounds;
        if lat_max <= self.lat_edges[0] || lat_min >= *self.lat_edges.last().unwrap() {
            return Ok(Vec::new());
        }

        let mut result = Vec::new();
        let mut lon_min = lon_min0;
        let mut lon_max = lon_max0;
        for pass in 0..2 {
            if pass == 1 {
                lon_min += 360.0;
                lon_max += 360.0;
                for l in lon.iter_mut() {
                    *l += 360.0;
                }
            }
            if lon_max <= self.lon_edges[0] || lon_min >= *self.lon_edges.last().unwrap() {
                continue;
            }
            self.walk_pass(&lat, &lon, &mut result);
        }
        Ok(result)
    }

    /// One pass of the edge-walk + interior-cell enumeration over an
    /// already-closed, longitude-unwrapped polygon (`lat`/`lon` end with a
    /// repeated first vertex, per [`make_2d_polygon`]).
    fn walk_pass(&self, lat: &[f64], lon: &[f64], out: &mut Vec<(usize, f64)>) {
        let num_lat_cells = self.num_lat_cells();
        let num_lon_cells = self.num_lon_cells();
        let n = lat.len();
        let offset_start = out.len();

        // min/max lat id seen per longitude column, and vice versa; offset
        // by 1 so index -1 (off-grid) and num_cells (off-grid) both fit.
        let mut min_lat_id = vec![num_lat_cells as i64; num_lon_cells + 2];
        let mut max_lat_id = vec![-1i64; num_lon_cells + 2];
        let mut min_lon_id = vec![num_lon_cells as i64; num_lat_cells + 2];
        let mut max_lon_id = vec![-1i64; num_lat_cells + 2];

        let mut record = |lat_id: i64, lon_id: i64, out: &mut Vec<(usize, f64)>| {
            if lon_id >= 0 && lon_id < num_lon_cells as i64 && lat_id >= 0 && lat_id < num_lat_cells as i64 {
                let already = lon_id < min_lon_id[(lat_id + 1) as usize]
                    || lon_id > max_lon_id[(lat_id + 1) as usize]
                    || lat_id < min_lat_id[(lon_id + 1) as usize]
                    || lat_id > max_lat_id[(lon_id + 1) as usize];
                if already {
                    let cell = lat_id as usize * num_lon_cells + lon_id as usize;
                    let weight = self.weight_for_cell(lat, lon, lat_id as usize, lon_id as usize);
                    out.push((cell, weight));
                }
            }
            if lat_id < min_lat_id[(lon_id + 1).clamp(0, num_lon_cells as i64 + 1) as usize] {
                min_lat_id[(lon_id + 1).clamp(0, num_lon_cells as i64 + 1) as usize] = lat_id;
            }
            if lat_id > max_lat_id[(lon_id + 1).clamp(0, num_lon_cells as i64 + 1) as usize] {
                max_lat_id[(lon_id + 1).clamp(0, num_lon_cells as i64 + 1) as usize] = lat_id;
            }
            if lon_id < min_lon_id[(lat_id + 1).clamp(0, num_lat_cells as i64 + 1) as usize] {
                min_lon_id[(lat_id + 1).clamp(0, num_lat_cells as i64 + 1) as usize] = lon_id;
            }
            if lon_id > max_lon_id[(lat_id + 1).clamp(0, num_lat_cells as i64 + 1) as usize] {
                max_lon_id[(lat_id + 1).clamp(0, num_lat_cells as i64 + 1) as usize] = lon_id;
            }
        };

        let mut lat_id = clamp_cell_id(find_index(&self.lat_edges, lat[0]), num_lat_cells);
        let mut lon_id = clamp_cell_id(find_index(&self.lon_edges, lon[0]), num_lon_cells);
        record(lat_id, lon_id, out);

        for j in 0..n - 1 {
            let mut latitude = lat[j];
            let mut longitude = lon[j];
            let next_latitude = lat[j + 1];
            let next_longitude = lon[j + 1];

            let next_lat_id = clamp_cell_id(find_index(&self.lat_edges, lat[j + 1]), num_lat_cells);
            let next_lon_id = clamp_cell_id(find_index(&self.lon_edges, lon[j + 1]), num_lon_cells);

            while lat_id != next_lat_id || lon_id != next_lon_id {
                if next_lat_id > lat_id {
                    let slope = (next_longitude - longitude) / (next_latitude - latitude);
                    let lat_edge = self.lat_edges[(lat_id + 1) as usize];
                    if next_lon_id > lon_id
                        && longitude + (lat_edge - latitude) * slope > self.lon_edges[(lon_id + 1) as usize]
                    {
                        latitude += (self.lon_edges[(lon_id + 1) as usize] - longitude) / slope;
                        longitude = self.lon_edges[(lon_id + 1) as usize];
                        lon_id += 1;
                    } else if next_lon_id < lon_id
                        && longitude + (lat_edge - latitude) * slope < self.lon_edges[lon_id as usize]
                    {
                        latitude += (self.lon_edges[lon_id as usize] - longitude) / slope;
                        longitude = self.lon_edges[lon_id as usize];
                        lon_id -= 1;
                    } else {
                        longitude += (lat_edge - latitude) * slope;
                        latitude = lat_edge;
                        lat_id += 1;
                    }
                } else if next_lat_id < lat_id {
                    let slope = (next_longitude - longitude) / (next_latitude - latitude);
                    let lat_edge = self.lat_edges[lat_id as usize];
                    if next_lon_id > lon_id
                        && longitude + (lat_edge - latitude) * slope > self.lon_edges[(lon_id + 1) as usize]
                    {
                        latitude += (self.lon_edges[(lon_id + 1) as usize] - longitude) / slope;
                        longitude = self.lon_edges[(lon_id + 1) as usize];
                        lon_id += 1;
                    } else if next_lon_id < lon_id
                        && longitude + (lat_edge - latitude) * slope < self.lon_edges[lon_id as usize]
                    {
                        latitude += (self.lon_edges[lon_id as usize] - longitude) / slope;
                        longitude = self.lon_edges[lon_id as usize];
                        lon_id -= 1;
                    } else {
                        longitude += (lat_edge - latitude) * slope;
                        latitude = lat_edge;
                        lat_id -= 1;
                    }
                } else {
                    let slope = (next_latitude - latitude) / (next_longitude - longitude);
                    if next_lon_id > lon_id {
                        latitude += (self.lon_edges[(lon_id + 1) as usize] - longitude) * slope;
                        longitude = self.lon_edges[(lon_id + 1) as usize];
                        lon_id += 1;
                    } else {
                        latitude += (self.lon_edges[lon_id as usize] - longitude) * slope;
                        longitude = self.lon_edges[lon_id as usize];
                        lon_id -= 1;
                    }
                }
                record(lat_id, lon_id, out);
            }
        }

        // cells fully inside the polygon that the edge walk never touched.
        for lat_row in 0..num_lat_cells as i64 {
            let lo = min_lon_id[(lat_row + 1) as usize];
            let hi = max_lon_id[(lat_row + 1) as usize];
            if lo < hi {
                for lon_col in (lo + 1)..hi {
                    if lat_row > min_lat_id[(lon_col + 1) as usize] && lat_row < max_lat_id[(lon_col + 1) as usize] {
                        let cell = lat_row as usize * num_lon_cells + lon_col as usize;
                        let already_added = out[offset_start..].iter().any(|&(c, _)| c == cell);
                        if !already_added {
                            let weight = self.weight_for_cell(lat, lon, lat_row as usize, lon_col as usize);
                            out.push((cell, weight));
                        }
                    }
                }
            }
        }
    }

    fn weight_for_cell(&self, poly_lat: &[f64], poly_lon: &[f64], lat_id: usize, lon_id: usize) -> f64 {
        let (lat_lo, lat_hi) = self.lat_bounds(lat_id);
        let (lon_lo, lon_hi) = self.lon_bounds(lon_id);
        weight_for_polygon_and_cell(poly_lat, poly_lon, lat_lo, lat_hi, lon_lo, lon_hi)
    }
}

fn clamp_cell_id(id: i64, num_cells: usize) -> i64 {
    if id == num_cells as i64 + 1 {
        num_cells as i64
    } else {
        id
    }
}

/// Returns `i` such that `edges[i] <= value < edges[i+1]`, `-1` if `value`
/// is below the first edge, or `edges.len()` (one past the last cell) if
/// `value` is at or beyond the last edge — mirroring the source library's
/// `harp_interpolate_find_index`, whose callers clamp that sentinel back
/// down to the last cell when walking a line segment into the grid's edge.
fn find_index(edges: &[f64], value: f64) -> i64 {
    let n = edges.len();
    if value < edges[0] {
        return -1;
    }
    if value >= edges[n - 1] {
        return n as i64;
    }
    let idx = edges.partition_point(|&e| e <= value);
    idx as i64 - 1
}

fn wrap(value: f64, min: f64, max: f64) -> f64 {
    let range = max - min;
    let mut v = (value - min) % range;
    if v < 0.0 {
        v += range;
    }
    v + min
}

/// Normalizes a sample polygon's longitudes so consecutive vertices stay
/// within 180 degrees of each other, wraps the whole polygon near
/// `reference_longitude`, closes it over a pole if it wraps 360 degrees of
/// longitude in a single hemisphere, and repeats the first vertex at the
/// end. Returns `None` if the wrap is ambiguous (it crosses the equator),
/// signalling the caller to skip this sample.
fn make_2d_polygon(lat: &mut Vec<f64>, lon: &mut Vec<f64>, reference_longitude: f64) -> Option<(f64, f64, f64, f64)> {
    let n = lat.len();
    if lon[0] < reference_longitude - 180.0 {
        lon[0] += 360.0;
    }
    if lon[0] >= reference_longitude + 180.0 {
        lon[0] -= 360.0;
    }

    let mut min_lon = lon[0];
    let mut max_lon = min_lon;
    let mut min_lat = lat[0];
    let mut max_lat = min_lat;

    for i in 1..n {
        while lon[i] < lon[i - 1] - 180.0 {
            lon[i] += 360.0;
        }
        while lon[i] > lon[i - 1] + 180.0 {
            lon[i] -= 360.0;
        }
        min_lat = min_lat.min(lat[i]);
        max_lat = max_lat.max(lat[i]);
        min_lon = min_lon.min(lon[i]);
        max_lon = max_lon.max(lon[i]);
    }

    let mut closing_lon = lon[0];
    while closing_lon < lon[n - 1] - 180.0 {
        closing_lon += 360.0;
    }
    while closing_lon > lon[n - 1] + 180.0 {
        closing_lon -= 360.0;
    }
    if closing_lon < min_lon {
        min_lon = closing_lon;
    } else if closing_lon > max_lon {
        max_lon = closing_lon;
    }

    if (max_lon - (min_lon + 360.0)).abs() < 1e-4 {
        if max_lat > 0.0 {
            if min_lat < 0.0 {
                return None;
            }
            max_lat = 90.0;
            lat.push(90.0);
            lon.push(*lon.last().unwrap());
            lat.push(90.0);
            lon.push(lon[0]);
        } else if min_lat < 0.0 {
            min_lat = -90.0;
            lat.push(-90.0);
            lon.push(*lon.last().unwrap());
            lat.push(-90.0);
            lon.push(lon[0]);
        }
    }

    if min_lon < reference_longitude - 360.0 {
        min_lon += 360.0;
        max_lon += 360.0;
        for l in lon.iter_mut() {
            *l += 360.0;
        }
    }
    while min_lon >= reference_longitude + 180.0 {
        min_lon -= 360.0;
        max_lon -= 360.0;
        for l in lon.iter_mut() {
            *l -= 360.0;
        }
    }

    lat.push(lat[0]);
    lon.push(lon[0]);

    Some((min_lat, max_lat, min_lon, max_lon))
}

/// Spec §4.5 step 3: Sutherland-Hodgman clip of the polygon against the
/// four half-planes bounding the cell, area computed by the planar
/// shoelace formula in the (lon, lat) Plate-Carrée plane.
fn weight_for_polygon_and_cell(
    poly_lat: &[f64],
    poly_lon: &[f64],
    lat_lo: f64,
    lat_hi: f64,
    lon_lo: f64,
    lon_hi: f64,
) -> f64 {
    if poly_lat.len() < 3 {
        return 0.0;
    }
    let mut points: Vec<(f64, f64)> = poly_lon.iter().zip(poly_lat.iter()).map(|(&x, &y)| (x, y)).collect();
    points = clip_half_plane(&points, |p| p.1 >= lat_lo, |a, b| {
        let t = (lat_lo - a.1) / (b.1 - a.1);
        (a.0 + t * (b.0 - a.0), lat_lo)
    });
    points = clip_half_plane(&points, |p| p.1 <= lat_hi, |a, b| {
        let t = (lat_hi - a.1) / (b.1 - a.1);
        (a.0 + t * (b.0 - a.0), lat_hi)
    });
    points = clip_half_plane(&points, |p| p.0 >= lon_lo, |a, b| {
        let t = (lon_lo - a.0) / (b.0 - a.0);
        (lon_lo, a.1 + t * (b.1 - a.1))
    });
    points = clip_half_plane(&points, |p| p.0 <= lon_hi, |a, b| {
        let t = (lon_hi - a.0) / (b.0 - a.0);
        (lon_hi, a.1 + t * (b.1 - a.1))
    });
    if points.len() < 3 {
        return 0.0;
    }
    let n = points.len();
    let mut area2 = 0.0;
    for i in 0..n {
        let (x0, y0) = points[i];
        let (x1, y1) = points[(i + 1) % n];
        area2 += (x0 + x1) * (y0 - y1);
    }
    let poly_area = (area2 / 2.0).abs();
    let cell_area = (lat_hi - lat_lo) * (lon_hi - lon_lo);
    poly_area / cell_area
}

fn clip_half_plane(
    points: &[(f64, f64)],
    keep: impl Fn(&(f64, f64)) -> bool,
    intersect: impl Fn(&(f64, f64), &(f64, f64)) -> (f64, f64),
) -> Vec<(f64, f64)> {
    let n = points.len();
    if n == 0 {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(n + 1);
    for i in 0..n {
        let cur = points[i];
        let nxt = points[(i + 1) % n];
        let cur_in = keep(&cur);
        let nxt_in = keep(&nxt);
        if cur_in {
            out.push(cur);
        }
        if cur_in != nxt_in {
            out.push(intersect(&cur, &nxt));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_non_ascending_edges() {
        assert!(GridSpec::new(vec![0.0, 10.0, 5.0], vec![0.0, 10.0]).is_err());
    }

    #[test]
    fn point_lookup_respects_half_open_cells() {
        let grid = GridSpec::new(vec![0.0, 45.0, 90.0], vec![0.0, 180.0, 360.0]).unwrap();
        assert_eq!(grid.cell_for_point(45.0, 10.0), Some(1 * 2 + 0));
        assert_eq!(grid.cell_for_point(44.999, 10.0), Some(0));
        assert_eq!(grid.cell_for_point(90.0, 10.0), Some(1 * 2 + 0));
    }

    #[test]
    fn point_lookup_wraps_longitude() {
        let grid = GridSpec::new(vec![0.0, 90.0], vec![0.0, 360.0]).unwrap();
        assert_eq!(grid.cell_for_point(10.0, 370.0), grid.cell_for_point(10.0, 10.0));
    }

    #[test]
    fn square_polygon_splits_into_quarter_cells() {
        let grid = GridSpec::new(vec![0.0, 5.0, 10.0], vec![0.0, 5.0, 10.0]).unwrap();
        let cells = grid
            .cells_and_weights_for_bounds(&[0.0, 0.0, 10.0, 10.0], &[0.0, 10.0, 10.0, 0.0])
            .unwrap();
        assert_eq!(cells.len(), 4);
        for (_, w) in &cells {
            assert_relative_eq!(*w, 0.25, epsilon = 1e-9);
        }
    }

    #[test]
    fn two_point_bounds_make_a_rectangle() {
        let grid = GridSpec::new(vec![0.0, 10.0], vec![0.0, 10.0]).unwrap();
        let cells = grid.cells_and_weights_for_bounds(&[0.0, 10.0], &[0.0, 10.0]).unwrap();
        assert_eq!(cells.len(), 1);
        assert_relative_eq!(cells[0].1, 1.0, epsilon = 1e-9);
    }

    #[test]
    fn polygon_outside_grid_yields_no_cells() {
        let grid = GridSpec::new(vec![0.0, 10.0], vec![0.0, 10.0]).unwrap();
        let cells = grid
            .cells_and_weights_for_bounds(&[20.0, 20.0, 30.0, 30.0], &[20.0, 30.0, 30.0, 20.0])
            .unwrap();
        assert!(cells.is_empty());
    }

    #[test]
    fn closes_over_south_pole_when_wrapping_360_in_one_hemisphere() {
        // A band entirely at latitude -80 that wraps the full 360 degrees of
        // longitude must be closed by appending two vertices at the pole
        // rather than left open.
        let mut lat = vec![-80.0, -80.0, -80.0, -80.0];
        let mut lon = vec![0.0, 90.0, 180.0, 270.0];
        let (lat_min, lat_max, _, _) = make_2d_polygon(&mut lat, &mut lon, 0.0).unwrap();
        assert_relative_eq!(lat_max, -80.0, epsilon = 1e-9);
        assert_relative_eq!(lat_min, -90.0, epsilon = 1e-9);
        // two pole vertices appended, plus the repeated first vertex to close the ring.
        assert_eq!(lat[lat.len() - 3], -90.0);
        assert_eq!(lat[lat.len() - 2], -90.0);
    }

    #[test]
    fn rejects_360_wrap_that_crosses_the_equator() {
        let mut lat = vec![-10.0, -10.0, 10.0, 10.0];
        let mut lon = vec![0.0, 90.0, 180.0, 270.0];
        assert!(make_2d_polygon(&mut lat, &mut lon, 0.0).is_none());
    }
}
