//! The binning classifier: decides, per variable, whether and how it
//! participates in a bin reduction.

use crate::product::{DimensionKind, Variable};

/// How a single variable participates in a bin reduction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinType {
    /// Dropped from the output with no further processing needed.
    Skip,
    /// Dropped from the output at the end of the pass, after other
    /// variables have had a chance to reference it as a count/weight.
    Remove,
    Average,
    /// Like `Average` but the running sum is of squared values (error
    /// propagation assuming no correlation between contributors).
    Uncertainty,
    Sum,
    /// Complex-encoded circular mean (longitude, compass bearing, ...).
    Angle,
    TimeMin,
    TimeMax,
    TimeAverage,
}

/// Classifies a variable for [`crate::binning::temporal::product_bin`].
pub fn classify(var: &Variable) -> BinType {
    classify_impl(var, false)
}

/// Classifies a variable for [`crate::binning::spatial::product_bin_spatial`],
/// the spatial variant of the same rule cascade.
pub fn classify_spatial(var: &Variable) -> BinType {
    classify_impl(var, true)
}

fn classify_impl(var: &Variable, spatial: bool) -> BinType {
    if var.enum_labels.is_some() {
        return BinType::Remove;
    }
    if var.dims.iter().skip(1).any(|d| d.kind == DimensionKind::Time) {
        return BinType::Remove;
    }

    let name = var.name.as_str();
    let is_unitless = var.unit.as_deref().map(|u| u.is_empty()).unwrap_or(true);

    if name.ends_with("count") {
        // Spatial binning builds its own count/weight variables from scratch
        // rather than carrying forward per-sample ones from an earlier pass.
        if spatial {
            return BinType::Remove;
        }
        let shaped_ok = var.has_time_leading() && (name != "count" || var.dims.len() == 1);
        let typed_ok = matches!(var.data_type(), crate::product::DataType::Int32) && is_unitless;
        if shaped_ok && typed_ok {
            return BinType::Sum;
        }
        return BinType::Remove;
    }
    if name.ends_with("weight") {
        if spatial {
            return BinType::Remove;
        }
        if var.has_time_leading()
            && matches!(var.data_type(), crate::product::DataType::Float32)
            && is_unitless
        {
            return BinType::Sum;
        }
        return BinType::Remove;
    }

    if !var.has_time_leading() {
        return BinType::Skip;
    }
    if matches!(var.data_type(), crate::product::DataType::String) {
        return BinType::Remove;
    }
    if var.unit.is_none() {
        return BinType::Remove;
    }

    if spatial && (name.contains("latitude") || name.contains("longitude")) {
        return BinType::Remove;
    }

    if name.contains("_uncertainty") {
        return if spatial || name.contains("_uncertainty_systematic") {
            BinType::Average
        } else {
            BinType::Uncertainty
        };
    }
    if name.contains("_avk") {
        return BinType::Remove;
    }
    if name == "latitude_bounds" || name == "longitude_bounds" {
        if let Some(last) = var.dims.last() {
            if last.kind == DimensionKind::Independent && last.length > 2 {
                return BinType::Remove;
            }
        }
    }
    if name.contains("latitude") || name.contains("longitude") || name.contains("angle") || name.contains("direction")
    {
        return BinType::Angle;
    }
    if spatial && (name == "datetime" || name == "datetime_length") {
        return BinType::TimeAverage;
    }
    if var.dims.len() == 1 {
        if name == "datetime_start" {
            return BinType::TimeMin;
        }
        if name == "datetime_stop" {
            return BinType::TimeMax;
        }
    }
    BinType::Average
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{DataArray, DataType, DimensionDescriptor, Variable};

    fn var(name: &str, dims: Vec<DimensionDescriptor>, unit: Option<&str>, data: DataArray) -> Variable {
        Variable::new(name, dims, unit.map(|u| u.to_string()), data).unwrap()
    }

    #[test]
    fn no_time_leading_is_skip() {
        let v = var(
            "v",
            vec![DimensionDescriptor::new(DimensionKind::Independent, 3)],
            Some("K"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::Skip);
    }

    #[test]
    fn unitless_non_count_is_remove() {
        let v = var(
            "foo",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            None,
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::Remove);
    }

    #[test]
    fn plain_count_is_sum() {
        let v = var(
            "count",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            None,
            DataArray::Int32(vec![1, 1, 1]),
        );
        assert_eq!(classify(&v), BinType::Sum);
    }

    #[test]
    fn uncertainty_no_correlation() {
        let v = var(
            "v_uncertainty",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("K"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::Uncertainty);
    }

    #[test]
    fn uncertainty_systematic_is_full_correlation() {
        let v = var(
            "v_uncertainty_systematic_bias",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("K"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::Average);
    }

    #[test]
    fn longitude_is_angle() {
        let v = var(
            "longitude",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("degree"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::Angle);
    }

    #[test]
    fn datetime_start_is_time_min() {
        let v = var(
            "datetime_start",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("seconds since 2000-01-01"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::TimeMin);
    }

    #[test]
    fn spatial_removes_lat_lon() {
        let v = var(
            "latitude",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("degree"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify_spatial(&v), BinType::Remove);
    }

    #[test]
    fn spatial_datetime_is_time_average() {
        let v = var(
            "datetime",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("seconds since 2000-01-01"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify_spatial(&v), BinType::TimeAverage);
    }

    #[test]
    fn default_is_average() {
        let v = var(
            "pressure",
            vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
            Some("hPa"),
            DataArray::Float64(vec![0.0; 3]),
        );
        assert_eq!(classify(&v), BinType::Average);
    }
}
