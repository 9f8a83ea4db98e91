//! End-to-end scenarios exercised purely through the crate's public API
//! rather than through any module's internals: each covers one full
//! temporal-binning, spatial-binning, or polygon-geometry pass the way a
//! real caller would drive it.

use approx::assert_relative_eq;

use harp_core::binning::{product_bin, product_bin_spatial};
use harp_core::geometry::{SphericalPoint, SphericalPolygon};
use harp_core::product::{DataArray, DimensionDescriptor, DimensionKind, Product, Variable};

fn time_var(name: &str, unit: Option<&str>, values: Vec<f64>) -> Variable {
    let n = values.len();
    Variable::new(
        name,
        vec![DimensionDescriptor::new(DimensionKind::Time, n)],
        unit.map(|u| u.to_string()),
        DataArray::Float64(values),
    )
    .unwrap()
}

/// A float64 variable with a NaN sample collapses to one bin, averaging
/// over only the non-NaN contributors and recording the divergent count.
#[test]
fn temporal_average_skips_nan_and_records_divergent_count() {
    let mut p = Product::new();
    p.add_variable(time_var("v", Some("K"), vec![1.0, f64::NAN, 3.0])).unwrap();

    product_bin(&mut p, 1, &[0, 0, 0]).unwrap();

    assert_eq!(p.variable("v").unwrap().data.as_f64().unwrap(), &[2.0]);
    assert_eq!(p.variable("count").unwrap().data.as_i32().unwrap(), &[3]);
    assert_eq!(p.variable("v_count").unwrap().data.as_i32().unwrap(), &[2]);
}

/// An angle variable straddling the dateline averages to exactly 180
/// degrees, with a weight equal to the vector sum's magnitude.
#[test]
fn temporal_angle_binning_wraps_correctly_around_the_dateline() {
    let mut p = Product::new();
    p.add_variable(time_var("phi", Some("degree"), vec![170.0, -170.0])).unwrap();

    product_bin(&mut p, 1, &[0, 0]).unwrap();

    let phi = p.variable("phi").unwrap().data.as_f64().unwrap()[0];
    assert!((phi.abs() - 180.0).abs() < 1e-6, "phi = {phi}");
    let expected_weight = 2.0 * 10f64.to_radians().cos();
    match &p.variable("phi_weight").unwrap().data {
        DataArray::Float32(w) => assert_relative_eq!(w[0] as f64, expected_weight, epsilon = 1e-4),
        other => panic!("expected float32 weight, got {other:?}"),
    }
}

/// Uncorrelated uncertainty propagation uses a quadrature sum, not a plain
/// average.
#[test]
fn temporal_uncertainty_binning_uses_quadrature_sum() {
    let mut p = Product::new();
    p.add_variable(time_var("v_uncertainty", Some("K"), vec![3.0, 4.0])).unwrap();

    product_bin(&mut p, 1, &[0, 0]).unwrap();

    let v = p.variable("v_uncertainty").unwrap().data.as_f64().unwrap()[0];
    assert_relative_eq!(v, 2.5, epsilon = 1e-9);
}

/// Two point samples a short distance apart land in the same single grid
/// cell and average together.
#[test]
fn spatial_point_binning_merges_samples_sharing_a_cell() {
    let mut p = Product::new();
    p.add_variable(time_var("latitude", Some("degree"), vec![45.0, 45.0])).unwrap();
    p.add_variable(time_var("longitude", Some("degree"), vec![10.0, 11.0])).unwrap();
    p.add_variable(time_var("v", Some("K"), vec![1.0, 3.0])).unwrap();

    product_bin_spatial(&mut p, 1, &[0, 0], vec![0.0, 90.0], vec![0.0, 360.0]).unwrap();

    assert_eq!(p.variable("v").unwrap().shape(), vec![1, 1, 1]);
    assert_eq!(p.variable("v").unwrap().data.as_f64().unwrap(), &[2.0]);
    match &p.variable("weight").unwrap().data {
        DataArray::Float32(w) => assert_eq!(w, &[2.0]),
        other => panic!("expected float32 weight, got {other:?}"),
    }
    assert_eq!(p.variable("count").unwrap().data.as_i32().unwrap(), &[2]);
}

/// A single footprint square split evenly across four grid cells carries
/// its value into each cell weighted by its quarter-share of the area.
#[test]
fn spatial_area_binning_splits_a_footprint_across_cells() {
    let mut p = Product::new();
    p.add_variable(
        Variable::new(
            "latitude_bounds",
            vec![
                DimensionDescriptor::new(DimensionKind::Time, 1),
                DimensionDescriptor::new(DimensionKind::Independent, 4),
            ],
            Some("degree".to_string()),
            DataArray::Float64(vec![0.0, 0.0, 10.0, 10.0]),
        )
        .unwrap(),
    )
    .unwrap();
    p.add_variable(
        Variable::new(
            "longitude_bounds",
            vec![
                DimensionDescriptor::new(DimensionKind::Time, 1),
                DimensionDescriptor::new(DimensionKind::Independent, 4),
            ],
            Some("degree".to_string()),
            DataArray::Float64(vec![0.0, 10.0, 10.0, 0.0]),
        )
        .unwrap(),
    )
    .unwrap();
    p.add_variable(time_var("v", Some("K"), vec![10.0])).unwrap();

    product_bin_spatial(&mut p, 1, &[0], vec![0.0, 5.0, 10.0], vec![0.0, 5.0, 10.0]).unwrap();

    let v = p.variable("v").unwrap();
    assert_eq!(v.shape(), vec![1, 2, 2]);
    for &x in v.data.as_f64().unwrap() {
        assert_relative_eq!(x, 10.0, epsilon = 1e-9);
    }
    match &p.variable("weight").unwrap().data {
        DataArray::Float32(w) => {
            for &x in w {
                assert_relative_eq!(x as f64, 0.25, epsilon = 1e-6);
            }
        }
        other => panic!("expected float32 weight, got {other:?}"),
    }
}

/// A footprint that wraps 360 degrees of longitude while lying entirely in
/// one hemisphere closes over the pole instead of being rejected, and the
/// closed polygon's area matches the spherical-wedge formula for the
/// portion of the polar cap it actually covers. Area is signed depending on
/// vertex winding, so this checks magnitude only.
#[test]
fn polygon_wrapping_the_pole_closes_and_reports_wedge_area() {
    let deg = SphericalPoint::from_degrees;
    // Equator arc from 0 to 240 degrees, then down to the south pole and
    // back: a spherical wedge of angle 240 degrees reaching from the
    // equator (lat_max = 0) down to the pole.
    let wedge = SphericalPolygon::new(vec![deg(0.0, 0.0), deg(0.0, 120.0), deg(0.0, 240.0), deg(-90.0, 0.0)]);
    let expected = 240f64.to_radians(); // half-lune area = dihedral angle, in steradians
    assert_relative_eq!(wedge.area_steradians().abs(), expected, epsilon = 1e-6);
}

/// A polygon's overlap fraction with itself is 1, and overlap fraction is
/// symmetric between any two polygons.
#[test]
fn overlap_fraction_self_and_symmetry() {
    let deg = SphericalPoint::from_degrees;
    let square = |h: f64| SphericalPolygon::new(vec![deg(-h, -h), deg(-h, h), deg(h, h), deg(h, -h)]);
    let a = square(5.0);
    let b = SphericalPolygon::new(vec![deg(-2.0, -2.0), deg(-2.0, 8.0), deg(8.0, 8.0), deg(8.0, -2.0)]);

    assert_relative_eq!(SphericalPolygon::overlap_fraction(&a, &a), 1.0, epsilon = 1e-6);
    assert_relative_eq!(
        SphericalPolygon::overlap_fraction(&a, &b),
        SphericalPolygon::overlap_fraction(&b, &a),
        epsilon = 1e-6
    );
}

/// A polygon's total area equals the sum of a partition into sub-polygons
/// sharing only edges.
#[test]
fn area_partitions_additively() {
    let deg = SphericalPoint::from_degrees;
    let whole = SphericalPolygon::new(vec![deg(-10.0, -10.0), deg(-10.0, 10.0), deg(10.0, 10.0), deg(10.0, -10.0)]);
    let left = SphericalPolygon::new(vec![deg(-10.0, -10.0), deg(-10.0, 0.0), deg(10.0, 0.0), deg(10.0, -10.0)]);
    let right = SphericalPolygon::new(vec![deg(-10.0, 0.0), deg(-10.0, 10.0), deg(10.0, 10.0), deg(10.0, 0.0)]);

    assert_relative_eq!(
        whole.area_steradians(),
        left.area_steradians() + right.area_steradians(),
        epsilon = 1e-6
    );
}

/// Binning at K = N with the identity bin index is a no-op on the data,
/// adding only the `count = 1` companion.
#[test]
fn binning_is_idempotent_at_k_equals_n() {
    let mut p = Product::new();
    p.add_variable(time_var("v", Some("K"), vec![1.0, 2.0, 3.0])).unwrap();

    product_bin(&mut p, 3, &[0, 1, 2]).unwrap();

    assert_eq!(p.variable("v").unwrap().data.as_f64().unwrap(), &[1.0, 2.0, 3.0]);
    assert_eq!(p.variable("count").unwrap().data.as_i32().unwrap(), &[1, 1, 1]);
}
