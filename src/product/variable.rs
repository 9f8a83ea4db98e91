//! Variables: a typed, named, dense buffer with a dimension layout.

use super::dimension::{DimensionDescriptor, DimensionKind};
use super::units;
use crate::error::{invalid_argument, invalid_variable, HarpResult};

/// The six scalar kinds a [`DataArray`] can hold: a tagged variant over the
/// six scalar types, switch-dispatched rather than generic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataType {
    Int8,
    Int16,
    Int32,
    Float32,
    Float64,
    String,
}

/// The dense row-major buffer backing a [`Variable`], tagged by scalar type.
#[derive(Debug, Clone, PartialEq)]
pub enum DataArray {
    Int8(Vec<i8>),
    Int16(Vec<i16>),
    Int32(Vec<i32>),
    Float32(Vec<f32>),
    Float64(Vec<f64>),
    String(Vec<String>),
}

impl DataArray {
    pub fn data_type(&self) -> DataType {
        match self {
            DataArray::Int8(_) => DataType::Int8,
            DataArray::Int16(_) => DataType::Int16,
            DataArray::Int32(_) => DataType::Int32,
            DataArray::Float32(_) => DataType::Float32,
            DataArray::Float64(_) => DataType::Float64,
            DataArray::String(_) => DataType::String,
        }
    }

    pub fn len(&self) -> usize {
        match self {
            DataArray::Int8(v) => v.len(),
            DataArray::Int16(v) => v.len(),
            DataArray::Int32(v) => v.len(),
            DataArray::Float32(v) => v.len(),
            DataArray::Float64(v) => v.len(),
            DataArray::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_f64(&self) -> HarpResult<&[f64]> {
        match self {
            DataArray::Float64(v) => Ok(v),
            _ => Err(invalid_variable(format!(
                "expected float64 data, found {:?}",
                self.data_type()
            ))),
        }
    }

    pub fn as_f64_mut(&mut self) -> HarpResult<&mut Vec<f64>> {
        match self {
            DataArray::Float64(v) => Ok(v),
            _ => Err(invalid_variable(format!(
                "expected float64 data, found {:?}",
                self.data_type()
            ))),
        }
    }

    pub fn as_f32(&self) -> HarpResult<&[f32]> {
        match self {
            DataArray::Float32(v) => Ok(v),
            _ => Err(invalid_variable(format!(
                "expected float32 data, found {:?}",
                self.data_type()
            ))),
        }
    }

    pub fn as_i32(&self) -> HarpResult<&[i32]> {
        match self {
            DataArray::Int32(v) => Ok(v),
            _ => Err(invalid_variable(format!(
                "expected int32 data, found {:?}",
                self.data_type()
            ))),
        }
    }

    pub fn as_i32_mut(&mut self) -> HarpResult<&mut Vec<i32>> {
        match self {
            DataArray::Int32(v) => Ok(v),
            _ => Err(invalid_variable(format!(
                "expected int32 data, found {:?}",
                self.data_type()
            ))),
        }
    }

    pub fn as_string(&self) -> HarpResult<&[String]> {
        match self {
            DataArray::String(v) => Ok(v),
            _ => Err(invalid_variable(format!(
                "expected string data, found {:?}",
                self.data_type()
            ))),
        }
    }

    /// Widening conversions only (int32→float64, float32→float64,
    /// float64→float32); narrowing float64→int32 is refused since no
    /// binning path needs it.
    pub fn convert_to(&self, target: DataType) -> HarpResult<DataArray> {
        match (self, target) {
            (DataArray::Int32(v), DataType::Float64) => {
                Ok(DataArray::Float64(v.iter().map(|&x| x as f64).collect()))
            }
            (DataArray::Float32(v), DataType::Float64) => {
                Ok(DataArray::Float64(v.iter().map(|&x| x as f64).collect()))
            }
            (DataArray::Float64(v), DataType::Float32) => {
                Ok(DataArray::Float32(v.iter().map(|&x| x as f32).collect()))
            }
            (a, target) if a.data_type() == target => Ok(a.clone()),
            (a, target) => Err(invalid_variable(format!(
                "unsupported conversion from {:?} to {:?}",
                a.data_type(),
                target
            ))),
        }
    }
}

/// A named, typed, dimensioned buffer.
#[derive(Debug, Clone, PartialEq)]
pub struct Variable {
    pub name: String,
    pub dims: Vec<DimensionDescriptor>,
    pub unit: Option<String>,
    pub enum_labels: Option<Vec<String>>,
    pub data: DataArray,
}

impl Variable {
    pub fn new(
        name: impl Into<String>,
        dims: Vec<DimensionDescriptor>,
        unit: Option<String>,
        data: DataArray,
    ) -> HarpResult<Self> {
        let name = name.into();
        let mut seen_typed = std::collections::HashSet::new();
        let mut time_seen_at: Option<usize> = None;
        for (i, d) in dims.iter().enumerate() {
            if d.kind.is_typed() {
                if !seen_typed.insert(format!("{:?}", d.kind)) {
                    return Err(invalid_argument(format!(
                        "variable '{name}' has more than one {:?} dimension",
                        d.kind
                    )));
                }
                if d.kind == DimensionKind::Time {
                    time_seen_at = Some(i);
                }
            }
        }
        if let Some(pos) = time_seen_at {
            if pos != 0 {
                return Err(invalid_argument(format!(
                    "variable '{name}' has a time dimension that is not leading"
                )));
            }
        }
        let expected_len: usize = if dims.is_empty() {
            data.len()
        } else {
            dims.iter().map(|d| d.length).product()
        };
        if expected_len != data.len() {
            return Err(invalid_argument(format!(
                "variable '{name}' data length {} does not match dimension product {}",
                data.len(),
                expected_len
            )));
        }
        if matches!(data.data_type(), DataType::String) {
            // Strings only support non-combining bin rules; nothing to
            // validate at construction time beyond the shape check above.
        }
        Ok(Variable {
            name,
            dims,
            unit,
            enum_labels: None,
            data,
        })
    }

    pub fn data_type(&self) -> DataType {
        self.data.data_type()
    }

    pub fn shape(&self) -> Vec<usize> {
        self.dims.iter().map(|d| d.length).collect()
    }

    pub fn has_time_leading(&self) -> bool {
        matches!(self.dims.first(), Some(d) if d.kind == DimensionKind::Time)
    }

    pub fn dim_len(&self, kind: DimensionKind) -> Option<usize> {
        self.dims.iter().find(|d| d.kind == kind).map(|d| d.length)
    }

    /// Product of all dimensions after the leading one (the "row size" each
    /// time-leading step advances by).
    pub fn trailing_len(&self) -> usize {
        self.dims.iter().skip(1).map(|d| d.length).product::<usize>().max(1)
    }

    /// Permutes the leading dimension's rows according to `index_map`:
    /// `index_map[new_i] = old_i`. Used by the binning engine to move
    /// bin-representative rows into bin position.
    pub fn rearrange_leading(&mut self, index_map: &[usize]) -> HarpResult<()> {
        let row_len = self.trailing_len();
        macro_rules! permute {
            ($v:expr) => {{
                let mut out = Vec::with_capacity(index_map.len() * row_len);
                for &old_i in index_map {
                    let start = old_i * row_len;
                    out.extend_from_slice(&$v[start..start + row_len]);
                }
                *$v = out;
            }};
        }
        match &mut self.data {
            DataArray::Int8(v) => permute!(v),
            DataArray::Int16(v) => permute!(v),
            DataArray::Int32(v) => permute!(v),
            DataArray::Float32(v) => permute!(v),
            DataArray::Float64(v) => permute!(v),
            DataArray::String(v) => permute!(v),
        }
        if let Some(d) = self.dims.first_mut() {
            d.length = index_map.len();
        }
        Ok(())
    }

    /// Appends a trailing independent dimension of the given length,
    /// replicating each existing float64 element `length` times with the
    /// given fill value in the new slots (used to make room for the
    /// `(cos, sin)` complex encoding of Angle variables).
    pub fn add_independent_dim_f64(&mut self, length: usize, fill: f64) -> HarpResult<()> {
        let v = self.data.as_f64_mut()?;
        let mut out = Vec::with_capacity(v.len() * length);
        for &x in v.iter() {
            out.push(x);
            for _ in 1..length {
                out.push(fill);
            }
        }
        *v = out;
        self.dims.push(DimensionDescriptor::new(DimensionKind::Independent, length));
        Ok(())
    }

    /// Drops the trailing independent dimension, keeping only the provided
    /// replacement data (the caller has already reduced each row to a
    /// single scalar, e.g. by recovering an angle via `atan2`).
    pub fn replace_and_drop_trailing_independent(&mut self, replacement: Vec<f64>) -> HarpResult<()> {
        match self.dims.last() {
            Some(d) if d.kind == DimensionKind::Independent => {}
            _ => return Err(invalid_argument(format!(
                "variable '{}' has no trailing independent dimension to drop",
                self.name
            ))),
        }
        self.dims.pop();
        self.data = DataArray::Float64(replacement);
        Ok(())
    }

    pub fn convert_data_type(&mut self, target: DataType) -> HarpResult<()> {
        self.data = self.data.convert_to(target)?;
        Ok(())
    }

    /// Converts the variable's unit in place (angle units only, spec
    /// FULL-11); no-op if `target_unit` equals the current unit.
    pub fn convert_unit(&mut self, target_unit: &str) -> HarpResult<()> {
        let current = self.unit.clone().unwrap_or_default();
        if current == target_unit {
            return Ok(());
        }
        let to_rad = units::angle_unit_to_radians(&current).ok_or_else(|| {
            invalid_argument(format!("no known conversion from unit '{current}'"))
        })?;
        let from_rad = units::radians_to_angle_unit(target_unit).ok_or_else(|| {
            invalid_argument(format!("no known conversion to unit '{target_unit}'"))
        })?;
        let factor = to_rad * from_rad;
        let v = self.data.as_f64_mut()?;
        for x in v.iter_mut() {
            *x *= factor;
        }
        self.unit = Some(target_unit.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::dimension::DimensionKind as K;

    fn time_var(name: &str, values: Vec<f64>) -> Variable {
        let n = values.len();
        Variable::new(
            name,
            vec![DimensionDescriptor::new(K::Time, n)],
            Some("K".to_string()),
            DataArray::Float64(values),
        )
        .unwrap()
    }

    #[test]
    fn rejects_non_leading_time_dimension() {
        let dims = vec![
            DimensionDescriptor::new(K::Independent, 2),
            DimensionDescriptor::new(K::Time, 3),
        ];
        let err = Variable::new("v", dims, None, DataArray::Float64(vec![0.0; 6])).unwrap_err();
        assert!(matches!(err, crate::error::HarpError::InvalidArgument(_)));
    }

    #[test]
    fn rejects_duplicate_typed_dimension() {
        let dims = vec![
            DimensionDescriptor::new(K::Latitude, 2),
            DimensionDescriptor::new(K::Latitude, 2),
        ];
        let err = Variable::new("v", dims, None, DataArray::Float64(vec![0.0; 4])).unwrap_err();
        assert!(matches!(err, crate::error::HarpError::InvalidArgument(_)));
    }

    #[test]
    fn rearrange_leading_permutes_rows() {
        let mut v = time_var("v", vec![10.0, 20.0, 30.0]);
        v.rearrange_leading(&[2, 0, 1]).unwrap();
        assert_eq!(v.data.as_f64().unwrap(), &[30.0, 10.0, 20.0]);
    }

    #[test]
    fn convert_unit_degree_to_radian() {
        let mut v = Variable::new(
            "phi",
            vec![DimensionDescriptor::new(K::Time, 1)],
            Some("degree".to_string()),
            DataArray::Float64(vec![180.0]),
        )
        .unwrap();
        v.convert_unit("rad").unwrap();
        assert!((v.data.as_f64().unwrap()[0] - std::f64::consts::PI).abs() < 1e-12);
    }
}
