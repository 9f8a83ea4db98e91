//! Temporal binning: `product_bin` and the thin wrappers and bin-index
//! builders layered on top of it.

use std::collections::HashMap;

use crate::error::{invalid_argument, invalid_variable, HarpResult};
use crate::product::{DataArray, DataType, DimensionDescriptor, DimensionKind, Product, Variable};

use super::classifier::{classify, BinType};

/// Reduces `product`'s time axis from `N = bin_index.len()` samples to `K`
/// bins, aggregating each variable according to its [`BinType`] (spec
/// §4.7).
pub fn product_bin(product: &mut Product, k: usize, bin_index: &[usize]) -> HarpResult<()> {
    let n = bin_index.len();
    if let Some(time_len) = product.dimension(DimensionKind::Time) {
        if time_len != n {
            return Err(invalid_argument(format!(
                "bin_index has {n} entries but the product's time dimension is {time_len}"
            )));
        }
    }
    for (i, &b) in bin_index.iter().enumerate() {
        if b >= k {
            return Err(invalid_argument(format!("bin_index[{i}] ({b}) is out of range [0, {k})")));
        }
    }

    let mut bin_count = vec![0i32; k];
    for &b in bin_index {
        bin_count[b] += 1;
    }

    let names: Vec<String> = product.variables().map(|v| v.name.clone()).collect();
    let mut bin_types: HashMap<String, BinType> = HashMap::new();
    for name in &names {
        let var = product.variable(name).unwrap();
        let bt = classify(var);
        log::trace!("classified '{name}' as {bt:?}");
        bin_types.insert(name.clone(), bt);
    }

    ensure_global_count(product, &bin_count)?;

    let mut to_remove = Vec::new();
    for name in &names {
        if name == "count" {
            continue;
        }
        match bin_types[name] {
            BinType::Skip => continue,
            BinType::Remove => {
                to_remove.push(name.clone());
            }
            BinType::Sum => bin_sum(product, name, k, bin_index)?,
            BinType::Average | BinType::TimeAverage => bin_average_or_uncertainty(product, name, false, k, bin_index, &bin_count)?,
            BinType::Uncertainty => bin_average_or_uncertainty(product, name, true, k, bin_index, &bin_count)?,
            BinType::Angle => bin_angle(product, name, k, bin_index)?,
            BinType::TimeMin => bin_extreme(product, name, k, bin_index, true)?,
            BinType::TimeMax => bin_extreme(product, name, k, bin_index, false)?,
        }
    }
    for name in to_remove.into_iter().rev() {
        log::debug!("removing '{name}' (classified Remove)");
        product.remove_variable(&name)?;
    }
    product.set_dimension(DimensionKind::Time, k);
    Ok(())
}

/// Collapses the whole product into a single bin.
pub fn product_bin_full(product: &mut Product) -> HarpResult<()> {
    let n = product.dimension(DimensionKind::Time).unwrap_or(0);
    product_bin(product, 1, &vec![0usize; n])
}

/// Groups samples by equality of their tuple of named-variable values,
/// preserving first-seen order for bin numbering. Float comparison is by
/// bit pattern, so `NaN` groups with `NaN`, for grouping purposes only.
pub fn bin_index_by_variables(product: &Product, names: &[&str]) -> HarpResult<(usize, Vec<usize>)> {
    let vars: Vec<&Variable> = names
        .iter()
        .map(|n| {
            product
                .variable(n)
                .ok_or_else(|| invalid_variable(format!("no variable named '{n}'")))
        })
        .collect::<HarpResult<_>>()?;
    let n = vars
        .first()
        .map(|v| v.shape().first().copied().unwrap_or(0))
        .unwrap_or(0);
    for v in &vars {
        if !v.has_time_leading() {
            return Err(invalid_argument(format!(
                "variable '{}' has no time-leading dimension to group by",
                v.name
            )));
        }
    }

    let mut keys: Vec<Vec<u64>> = Vec::with_capacity(n);
    for i in 0..n {
        let mut key = Vec::with_capacity(vars.len());
        for v in &vars {
            key.push(row_key(v, i)?);
        }
        keys.push(key);
    }

    let mut seen: HashMap<Vec<u64>, usize> = HashMap::new();
    let mut bin_index = Vec::with_capacity(n);
    for key in keys {
        let next_bin = seen.len();
        let bin = *seen.entry(key).or_insert(next_bin);
        bin_index.push(bin);
    }
    Ok((seen.len(), bin_index))
}

fn row_key(v: &Variable, i: usize) -> HarpResult<u64> {
    let row_len = v.trailing_len();
    match &v.data {
        DataArray::Float64(data) => Ok(data[i * row_len].to_bits()),
        DataArray::Float32(data) => Ok(data[i * row_len].to_bits() as u64),
        DataArray::Int32(data) => Ok(data[i * row_len] as u64),
        DataArray::Int16(data) => Ok(data[i * row_len] as u64),
        DataArray::Int8(data) => Ok(data[i * row_len] as u64),
        DataArray::String(data) => {
            use std::collections::hash_map::DefaultHasher;
            use std::hash::{Hash, Hasher};
            let mut h = DefaultHasher::new();
            data[i * row_len].hash(&mut h);
            Ok(h.finish())
        }
    }
}

/// One row of a collocation table: `(this_index, other_id)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollocationRow {
    pub this_index: usize,
    pub other_id: u64,
}

/// Expands each sample of this product into one row per collocation match,
/// and assigns bins by shared `other_id`, preserving first-seen order (spec
/// FULL-13 `bin_index_by_collocation`). Returns `(K, bin_index)` along with
/// the index map needed to expand any per-sample source variable before
/// calling [`product_bin`] (`expanded[i] = this_index` of the i-th expanded
/// row).
pub fn bin_index_by_collocation(rows: &[CollocationRow]) -> (usize, Vec<usize>, Vec<usize>) {
    let mut seen: HashMap<u64, usize> = HashMap::new();
    let mut bin_index = Vec::with_capacity(rows.len());
    let mut expansion_map = Vec::with_capacity(rows.len());
    for row in rows {
        let next_bin = seen.len();
        let bin = *seen.entry(row.other_id).or_insert(next_bin);
        bin_index.push(bin);
        expansion_map.push(row.this_index);
    }
    (seen.len(), bin_index, expansion_map)
}

fn ensure_global_count(product: &mut Product, bin_count: &[i32]) -> HarpResult<()> {
    let var = Variable::new(
        "count",
        vec![DimensionDescriptor::new(DimensionKind::Time, bin_count.len())],
        None,
        DataArray::Int32(bin_count.to_vec()),
    )?;
    if product.variable("count").is_some() {
        product.replace_variable(var)
    } else {
        product.add_variable(var)
    }
}

fn f64_values(v: &Variable) -> HarpResult<Vec<f64>> {
    Ok(match &v.data {
        DataArray::Float64(x) => x.clone(),
        DataArray::Float32(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::Int32(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::Int16(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::Int8(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::String(_) => return Err(invalid_variable(format!("variable '{}' is not numeric", v.name))),
    })
}

fn broadcast_per_sample(values: &[f64], row_len: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len() * row_len);
    for &v in values {
        for _ in 0..row_len {
            out.push(v);
        }
    }
    out
}

/// Looks up a per-element pre-multiplier (weight preferred over count) for
/// `name`, broadcasting a per-time-sample companion across `row_len`
/// trailing elements. Returns which kind of companion was found, if any.
fn existing_companion(product: &Product, name: &str, row_len: usize) -> HarpResult<Option<(&'static str, Vec<f64>)>> {
    let weight_name = format!("{name}_weight");
    if let Some(v) = product.variable(&weight_name) {
        return Ok(Some(("weight", broadcast_per_sample(&f64_values(v)?, row_len))));
    }
    let count_name = format!("{name}_count");
    if let Some(v) = product.variable(&count_name) {
        return Ok(Some(("count", broadcast_per_sample(&f64_values(v)?, row_len))));
    }
    Ok(None)
}

fn bin_sum(product: &mut Product, name: &str, k: usize, bin_index: &[usize]) -> HarpResult<()> {
    let var = product.variable(name).unwrap();
    let row_len = var.trailing_len();
    let mut dims = var.dims.clone();
    if let Some(d) = dims.first_mut() {
        d.length = k;
    }
    let unit = var.unit.clone();
    let out = match &var.data {
        DataArray::Int32(data) => {
            let mut acc = vec![0i64; k * row_len];
            for (i, &b) in bin_index.iter().enumerate() {
                for r in 0..row_len {
                    acc[b * row_len + r] += data[i * row_len + r] as i64;
                }
            }
            DataArray::Int32(acc.into_iter().map(|x| x as i32).collect())
        }
        DataArray::Float32(data) => {
            let mut acc = vec![0.0f64; k * row_len];
            for (i, &b) in bin_index.iter().enumerate() {
                for r in 0..row_len {
                    acc[b * row_len + r] += data[i * row_len + r] as f64;
                }
            }
            DataArray::Float32(acc.into_iter().map(|x| x as f32).collect())
        }
        other => {
            return Err(invalid_variable(format!(
                "'{name}' classified Sum but has unsupported data type {:?}",
                other.data_type()
            )))
        }
    };
    let new_var = Variable::new(name, dims, unit, out)?;
    product.replace_variable(new_var)
}

/// Average/Uncertainty/TimeAverage share the same pre-multiply, accumulate,
/// divide pipeline; `uncertainty` selects the extra squaring/sqrt steps.
fn bin_average_or_uncertainty(
    product: &mut Product,
    name: &str,
    uncertainty: bool,
    k: usize,
    bin_index: &[usize],
    bin_count: &[i32],
) -> HarpResult<()> {
    let var = product.variable(name).unwrap();
    let row_len = var.trailing_len();
    let n = bin_index.len();
    let mut data = f64_values(var)?;
    let mut dims = var.dims.clone();
    let unit = var.unit.clone();

    let companion = existing_companion(product, name, row_len)?;
    let elem_weight = companion.as_ref().map(|(_, w)| w.clone());

    if let Some(w) = &elem_weight {
        for i in 0..data.len() {
            data[i] *= w[i];
        }
    }
    if uncertainty {
        for x in data.iter_mut() {
            *x *= *x;
        }
    }

    let mut sum = vec![0.0f64; k * row_len];
    let mut contrib_weight = vec![0.0f64; k * row_len];
    let mut contrib_count = vec![0i32; k * row_len];
    for (i, &b) in bin_index.iter().enumerate() {
        for r in 0..row_len {
            let idx = i * row_len + r;
            let val = data[idx];
            if val.is_nan() {
                continue;
            }
            let w = elem_weight.as_ref().map(|w| w[idx]).unwrap_or(1.0);
            let out_idx = b * row_len + r;
            sum[out_idx] += val;
            contrib_weight[out_idx] += w;
            contrib_count[out_idx] += 1;
        }
    }
    debug_assert_eq!(n, bin_index.len());

    if uncertainty {
        for x in sum.iter_mut() {
            *x = x.sqrt();
        }
    }

    let divisor: Vec<f64> = if elem_weight.is_some() {
        contrib_weight.clone()
    } else {
        contrib_count.iter().map(|&c| c as f64).collect()
    };
    let result: Vec<f64> = sum.iter().zip(divisor.iter()).map(|(&s, &d)| s / d).collect();

    if let Some(d) = dims.first_mut() {
        d.length = k;
    }
    let new_var = Variable::new(name, dims, unit, DataArray::Float64(result))?;
    product.replace_variable(new_var)?;

    match companion.as_ref().map(|(kind, _)| *kind) {
        Some("weight") => {
            write_weight_companion(product, name, k, row_len, &contrib_weight)?;
        }
        Some("count") => {
            write_count_companion(product, name, k, row_len, &contrib_count)?;
        }
        _ => {
            let diverges = (0..k).any(|b| contrib_count[b * row_len..(b + 1) * row_len].iter().any(|&c| c != bin_count[b]));
            if diverges {
                write_count_companion(product, name, k, row_len, &contrib_count)?;
            }
        }
    }
    Ok(())
}

fn trailing_dims_of(dims: &[DimensionDescriptor]) -> Vec<DimensionDescriptor> {
    dims.iter().skip(1).cloned().collect()
}

fn write_weight_companion(product: &mut Product, name: &str, k: usize, _row_len: usize, values: &[f64]) -> HarpResult<()> {
    let weight_name = format!("{name}_weight");
    let trailing = product.variable(name).map(|v| trailing_dims_of(&v.dims)).unwrap_or_default();
    let mut dims = vec![DimensionDescriptor::new(DimensionKind::Time, k)];
    dims.extend(trailing);
    let data = DataArray::Float32(values.iter().map(|&x| x as f32).collect());
    let var = Variable::new(&weight_name, dims, None, data)?;
    if product.variable(&weight_name).is_some() {
        product.replace_variable(var)
    } else {
        product.add_variable(var)
    }
}

fn write_count_companion(product: &mut Product, name: &str, k: usize, _row_len: usize, values: &[i32]) -> HarpResult<()> {
    let count_name = format!("{name}_count");
    let trailing = product.variable(name).map(|v| trailing_dims_of(&v.dims)).unwrap_or_default();
    let mut dims = vec![DimensionDescriptor::new(DimensionKind::Time, k)];
    dims.extend(trailing);
    let data = DataArray::Int32(values.to_vec());
    let var = Variable::new(&count_name, dims, None, data)?;
    if product.variable(&count_name).is_some() {
        product.replace_variable(var)
    } else {
        product.add_variable(var)
    }
}

fn bin_angle(product: &mut Product, name: &str, k: usize, bin_index: &[usize]) -> HarpResult<()> {
    let var = product.variable(name).unwrap();
    let orig_unit = var.unit.clone().unwrap_or_default();
    let mut rad_var = var.clone();
    rad_var.convert_data_type(DataType::Float64)?;
    rad_var.convert_unit("rad")?;
    let row_len = rad_var.trailing_len();
    let theta = rad_var.data.as_f64()?.to_vec();

    let companion = existing_companion(product, name, row_len)?;
    let elem_weight = companion.map(|(_, w)| w);

    let mut acc_cos = vec![0.0f64; k * row_len];
    let mut acc_sin = vec![0.0f64; k * row_len];
    for (i, &b) in bin_index.iter().enumerate() {
        for r in 0..row_len {
            let idx = i * row_len + r;
            let th = theta[idx];
            if th.is_nan() {
                continue;
            }
            let w = elem_weight.as_ref().map(|w| w[idx]).unwrap_or(1.0);
            let out_idx = b * row_len + r;
            acc_cos[out_idx] += w * th.cos();
            acc_sin[out_idx] += w * th.sin();
        }
    }

    let mut result = vec![0.0f64; k * row_len];
    let mut weight_out = vec![0.0f64; k * row_len];
    for j in 0..k * row_len {
        let norm = (acc_cos[j] * acc_cos[j] + acc_sin[j] * acc_sin[j]).sqrt();
        weight_out[j] = norm;
        result[j] = if norm == 0.0 { f64::NAN } else { acc_sin[j].atan2(acc_cos[j]) };
    }

    let mut dims = var.dims.clone();
    if let Some(d) = dims.first_mut() {
        d.length = k;
    }
    let mut new_var = Variable::new(name, dims, Some("rad".to_string()), DataArray::Float64(result))?;
    new_var.convert_unit(&orig_unit)?;
    product.replace_variable(new_var)?;

    write_weight_companion(product, name, k, row_len, &weight_out)
}

fn bin_extreme(product: &mut Product, name: &str, k: usize, bin_index: &[usize], minimize: bool) -> HarpResult<()> {
    let var = product.variable(name).unwrap();
    let row_len = var.trailing_len();
    let data = f64_values(var)?;
    let identity = if minimize { f64::INFINITY } else { f64::NEG_INFINITY };
    let mut acc = vec![identity; k * row_len];
    let mut touched = vec![false; k * row_len];
    for (i, &b) in bin_index.iter().enumerate() {
        for r in 0..row_len {
            let idx = i * row_len + r;
            let val = data[idx];
            if val.is_nan() {
                continue;
            }
            let out_idx = b * row_len + r;
            touched[out_idx] = true;
            acc[out_idx] = if minimize { acc[out_idx].min(val) } else { acc[out_idx].max(val) };
        }
    }
    for j in 0..acc.len() {
        if !touched[j] {
            acc[j] = f64::NAN;
        }
    }
    let mut dims = var.dims.clone();
    if let Some(d) = dims.first_mut() {
        d.length = k;
    }
    let unit = var.unit.clone();
    let new_var = Variable::new(name, dims, unit, DataArray::Float64(acc))?;
    product.replace_variable(new_var)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::{DataArray, DimensionDescriptor};

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

    #[test]
    fn e2e_average_with_nan() {
        let mut p = Product::new();
        p.add_variable(time_var("v", Some("K"), vec![1.0, f64::NAN, 3.0])).unwrap();
        product_bin(&mut p, 1, &[0, 0, 0]).unwrap();
        assert_eq!(p.variable("v").unwrap().data.as_f64().unwrap(), &[2.0]);
        assert_eq!(p.variable("count").unwrap().data.as_i32().unwrap(), &[3]);
        assert_eq!(p.variable("v_count").unwrap().data.as_i32().unwrap(), &[2]);
    }

    #[test]
    fn e2e_angle_around_dateline() {
        let mut p = Product::new();
        p.add_variable(time_var("phi", Some("degree"), vec![170.0, -170.0])).unwrap();
        product_bin(&mut p, 1, &[0, 0]).unwrap();
        let phi = p.variable("phi").unwrap().data.as_f64().unwrap()[0];
        assert!((phi - 180.0).abs() < 1e-6 || (phi + 180.0).abs() < 1e-6);
        let w = p.variable("phi_weight").unwrap();
        match &w.data {
            DataArray::Float32(v) => assert!((v[0] as f64 - 2.0 * (10f64.to_radians()).cos()).abs() < 1e-3),
            _ => panic!("expected float32 weight"),
        }
    }

    #[test]
    fn e2e_uncertainty_no_correlation() {
        let mut p = Product::new();
        p.add_variable(time_var("v_uncertainty", Some("K"), vec![3.0, 4.0])).unwrap();
        product_bin(&mut p, 1, &[0, 0]).unwrap();
        let v = p.variable("v_uncertainty").unwrap().data.as_f64().unwrap()[0];
        assert!((v - 2.5).abs() < 1e-9);
    }

    #[test]
    fn idempotent_at_k_equals_n() {
        let mut p = Product::new();
        p.add_variable(time_var("v", Some("K"), vec![1.0, 2.0, 3.0])).unwrap();
        product_bin(&mut p, 3, &[0, 1, 2]).unwrap();
        assert_eq!(p.variable("v").unwrap().data.as_f64().unwrap(), &[1.0, 2.0, 3.0]);
        assert_eq!(p.variable("count").unwrap().data.as_i32().unwrap(), &[1, 1, 1]);
    }

    #[test]
    fn sum_variable_adds_counts() {
        let mut p = Product::new();
        p.add_variable(
            Variable::new(
                "source_count",
                vec![DimensionDescriptor::new(DimensionKind::Time, 3)],
                None,
                DataArray::Int32(vec![1, 2, 3]),
            )
            .unwrap(),
        )
        .unwrap();
        product_bin(&mut p, 1, &[0, 0, 0]).unwrap();
        assert_eq!(p.variable("source_count").unwrap().data.as_i32().unwrap(), &[6]);
    }

    #[test]
    fn bin_by_variable_groups_matching_tuples() {
        let mut p = Product::new();
        p.add_variable(
            Variable::new(
                "collocation_id",
                vec![DimensionDescriptor::new(DimensionKind::Time, 4)],
                None,
                DataArray::Int32(vec![7, 7, 9, 7]),
            )
            .unwrap(),
        )
        .unwrap();
        let (k, bin_index) = bin_index_by_variables(&p, &["collocation_id"]).unwrap();
        assert_eq!(k, 2);
        assert_eq!(bin_index, vec![0, 0, 1, 0]);
    }
}
