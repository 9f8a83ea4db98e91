//! A thin façade mirroring a C calling convention: a `c_int` return code
//! (`0` on success, non-zero on failure) plus a thread-local error channel a
//! caller can inspect after a non-zero return. Internal code never reads
//! this thread-local back; it always propagates [`crate::HarpResult`].

use std::cell::RefCell;
use std::os::raw::c_int;

use crate::binning::{self, CollocationRow};
use crate::error::HarpError;
use crate::geometry::point::distance_m;
use crate::geometry::SphericalPolygon;
use crate::product::Product;

thread_local! {
    static LAST_ERROR: RefCell<Option<HarpError>> = const { RefCell::new(None) };
}

/// The last error recorded on this thread by a façade function, or `0` if
/// the most recent call succeeded.
pub fn harp_errno() -> c_int {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|err| err.code()).unwrap_or(0))
}

/// The message accompanying [`harp_errno`]'s code, if any.
pub fn harp_errno_string() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|err| err.to_string()))
}

fn record<T>(result: Result<T, HarpError>) -> c_int {
    match result {
        Ok(_) => {
            LAST_ERROR.with(|e| *e.borrow_mut() = None);
            0
        }
        Err(err) => {
            let code = err.code();
            LAST_ERROR.with(|e| *e.borrow_mut() = Some(err));
            code
        }
    }
}

fn polygon_from_bounds(lat_bounds: &[f64], lon_bounds: &[f64]) -> Result<SphericalPolygon, HarpError> {
    SphericalPolygon::from_bounds(lat_bounds, lon_bounds, lat_bounds.len())
}

/// Great-circle point-to-point distance in meters.
pub fn harp_geometry_point_distance(lat1_deg: f64, lon1_deg: f64, lat2_deg: f64, lon2_deg: f64, distance_out: &mut f64) -> c_int {
    *distance_out = distance_m(lat1_deg, lon1_deg, lat2_deg, lon2_deg);
    record(Ok(()))
}

/// Point-in-polygon for a polygon given as lat/lon bound arrays.
/// `contains_out` is set to `1`/`0`.
pub fn harp_geometry_point_in_polygon(
    lat_deg: f64,
    lon_deg: f64,
    poly_lat_bounds: &[f64],
    poly_lon_bounds: &[f64],
    contains_out: &mut i32,
) -> c_int {
    let result = polygon_from_bounds(poly_lat_bounds, poly_lon_bounds).and_then(|poly| {
        poly.check()?;
        let p = crate::geometry::SphericalPoint::from_degrees(lat_deg, lon_deg);
        *contains_out = poly.contains_point(&p) as i32;
        Ok(())
    });
    record(result)
}

/// Polygon-polygon overlap yes/no. `overlaps_out` is set to `1`/`0`.
pub fn harp_geometry_polygon_overlaps(
    lat_bounds_a: &[f64],
    lon_bounds_a: &[f64],
    lat_bounds_b: &[f64],
    lon_bounds_b: &[f64],
    overlaps_out: &mut i32,
) -> c_int {
    let result = (|| {
        let a = polygon_from_bounds(lat_bounds_a, lon_bounds_a)?;
        let b = polygon_from_bounds(lat_bounds_b, lon_bounds_b)?;
        *overlaps_out = (SphericalPolygon::overlap_fraction(&a, &b) > 0.0) as i32;
        Ok(())
    })();
    record(result)
}

/// Polygon-polygon overlap fraction.
pub fn harp_geometry_polygon_overlap_fraction(
    lat_bounds_a: &[f64],
    lon_bounds_a: &[f64],
    lat_bounds_b: &[f64],
    lon_bounds_b: &[f64],
    fraction_out: &mut f64,
) -> c_int {
    let result = (|| {
        let a = polygon_from_bounds(lat_bounds_a, lon_bounds_a)?;
        let b = polygon_from_bounds(lat_bounds_b, lon_bounds_b)?;
        *fraction_out = SphericalPolygon::overlap_fraction(&a, &b);
        Ok(())
    })();
    record(result)
}

/// Polygon surface area in m².
pub fn harp_geometry_polygon_area(lat_bounds: &[f64], lon_bounds: &[f64], area_out: &mut f64) -> c_int {
    let result = polygon_from_bounds(lat_bounds, lon_bounds).map(|poly| *area_out = poly.area_m2());
    record(result)
}

/// Generic temporal binning.
pub fn harp_product_bin(product: &mut Product, k: usize, bin_index: &[usize]) -> c_int {
    record(binning::product_bin(product, k, bin_index))
}

/// Full-collapse temporal binning.
pub fn harp_product_bin_full(product: &mut Product) -> c_int {
    record(binning::product_bin_full(product))
}

/// Bin-by-variable. `K` and `bin_index` are returned through the out
/// parameters on success.
pub fn harp_product_bin_with_variable(product: &mut Product, names: &[&str], k_out: &mut usize, bin_index_out: &mut Vec<usize>) -> c_int {
    let result = binning::bin_index_by_variables(product, names).and_then(|(k, bin_index)| {
        *k_out = k;
        *bin_index_out = bin_index.clone();
        binning::product_bin(product, k, &bin_index)
    });
    record(result)
}

/// Collocated-pairs binning: note this does not itself move any
/// per-sample data into expanded rows, since that expansion is the caller's
/// responsibility for each variable it cares about (the `expansion_map`
/// returned describes which original row to use for each expanded row).
pub fn harp_product_bin_with_collocated_dataset(
    rows: &[CollocationRow],
    k_out: &mut usize,
    bin_index_out: &mut Vec<usize>,
    expansion_map_out: &mut Vec<usize>,
) -> c_int {
    let (k, bin_index, expansion_map) = binning::bin_index_by_collocation(rows);
    *k_out = k;
    *bin_index_out = bin_index;
    *expansion_map_out = expansion_map;
    0
}

/// Spatial binning.
pub fn harp_product_bin_spatial(
    product: &mut Product,
    t: usize,
    time_bin_index: &[usize],
    lat_edges: Vec<f64>,
    lon_edges: Vec<f64>,
) -> c_int {
    record(binning::product_bin_spatial(product, t, time_bin_index, lat_edges, lon_edges))
}

/// Full-spatial binning.
pub fn harp_product_bin_spatial_full(product: &mut Product, lat_edges: Vec<f64>, lon_edges: Vec<f64>) -> c_int {
    record(binning::product_bin_spatial_full(product, lat_edges, lon_edges))
}
