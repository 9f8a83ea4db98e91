//! A deliberately tiny unit table: just enough to convert the angle units
//! the binning classifier recognizes. This is not a general unit-conversion
//! graph — only the fixed conversions the binning engine itself needs.

/// Returns the factor that converts a value in `unit` to radians, or `None`
/// if the unit is not one of the recognized angle units.
pub fn angle_unit_to_radians(unit: &str) -> Option<f64> {
    match unit {
        "rad" | "radian" | "radians" => Some(1.0),
        "degree" | "degrees" | "deg" | "degree_north" | "degree_east" | "degree_south"
        | "degree_west" => Some(std::f64::consts::PI / 180.0),
        _ => None,
    }
}

/// The inverse of [`angle_unit_to_radians`].
pub fn radians_to_angle_unit(unit: &str) -> Option<f64> {
    angle_unit_to_radians(unit).map(|f| 1.0 / f)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn degree_round_trips_through_radians() {
        let to_rad = angle_unit_to_radians("degree").unwrap();
        let to_deg = radians_to_angle_unit("degree").unwrap();
        assert!((to_rad * to_deg - 1.0).abs() < 1e-12);
    }

    #[test]
    fn unknown_unit_is_none() {
        assert!(angle_unit_to_radians("kelvin").is_none());
    }
}
