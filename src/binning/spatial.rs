//! Spatial binning: `product_bin_spatial`, grouping samples by time bin and
//! spatial grid cell simultaneously.

use crate::error::{invalid_argument, invalid_product, invalid_variable, HarpResult};
use crate::grid::GridSpec;
use crate::product::{DataArray, DataType, DimensionDescriptor, DimensionKind, Product, Variable};

use super::classifier::{classify_spatial, BinType};

/// Reduces `product`'s time axis to `T` time bins and adds fresh `lat`/`lon`
/// grid dimensions, aggregating each variable according to its spatial
/// [`BinType`].
pub fn product_bin_spatial(
    product: &mut Product,
    t: usize,
    time_bin_index: &[usize],
    lat_edges: Vec<f64>,
    lon_edges: Vec<f64>,
) -> HarpResult<()> {
    if product.dimension(DimensionKind::Latitude).is_some() || product.dimension(DimensionKind::Longitude).is_some() {
        return Err(invalid_argument(
            "product already has a latitude or longitude dimension; spatial binning expects per-sample coordinates, not a grid",
        ));
    }
    let n = time_bin_index.len();
    if let Some(time_len) = product.dimension(DimensionKind::Time) {
        if time_len != n {
            return Err(invalid_argument(format!(
                "time_bin_index has {n} entries but the product's time dimension is {time_len}"
            )));
        }
    }
    for (i, &b) in time_bin_index.iter().enumerate() {
        if b >= t {
            return Err(invalid_argument(format!("time_bin_index[{i}] ({b}) is out of range [0, {t})")));
        }
    }

    let grid = GridSpec::new(lat_edges.clone(), lon_edges.clone())?;
    let num_lat = grid.num_lat_cells();
    let num_lon = grid.num_lon_cells();
    let num_cells = grid.num_cells();

    let contributions = sample_contributions(product, &grid)?;

    let mut time_bin_count = vec![0i32; t];
    for &b in time_bin_index {
        time_bin_count[b] += 1;
    }

    let mut global_weight = vec![0.0f64; t * num_cells];
    for (i, &b) in time_bin_index.iter().enumerate() {
        for &(cell, w) in &contributions[i] {
            global_weight[b * num_cells + cell] += w;
        }
    }

    let names: Vec<String> = product.variables().map(|v| v.name.clone()).collect();
    let mut to_remove = Vec::new();
    for name in &names {
        if name == "count" || name == "weight" {
            continue;
        }
        let bt = classify_spatial(product.variable(name).unwrap());
        log::trace!("classified '{name}' as {bt:?} (spatial)");
        match bt {
            BinType::Skip => continue,
            BinType::Remove => to_remove.push(name.clone()),
            BinType::Average => bin_average_spatial(
                product,
                name,
                t,
                num_lat,
                num_lon,
                time_bin_index,
                &contributions,
                &global_weight,
            )?,
            BinType::Angle => bin_angle_spatial(product, name, t, num_lat, num_lon, time_bin_index, &contributions)?,
            BinType::TimeMin => bin_time_only(product, name, t, time_bin_index, Extreme::Min)?,
            BinType::TimeMax => bin_time_only(product, name, t, time_bin_index, Extreme::Max)?,
            BinType::TimeAverage => bin_time_only(product, name, t, time_bin_index, Extreme::Average)?,
            BinType::Sum => {
                return Err(invalid_product(format!(
                    "'{name}' classified Sum during spatial binning, which never builds Sum variables"
                )))
            }
            BinType::Uncertainty => {
                return Err(invalid_product(format!(
                    "'{name}' classified Uncertainty during spatial binning; uncertainty variables must be removed or converted to Average before spatial binning"
                )))
            }
        }
    }
    for name in to_remove.into_iter().rev() {
        log::debug!("removing '{name}' (classified Remove, spatial)");
        product.remove_variable(&name)?;
    }

    write_count_and_weight(product, t, num_lat, num_lon, &time_bin_count, &global_weight)?;
    append_bounds(product, "latitude_bounds", DimensionKind::Latitude, num_lat, &lat_edges)?;
    append_bounds(product, "longitude_bounds", DimensionKind::Longitude, num_lon, &lon_edges)?;

    product.set_dimension(DimensionKind::Time, t);
    Ok(())
}

/// Collapses the whole product into a single time bin while spatially
/// binning.
pub fn product_bin_spatial_full(product: &mut Product, lat_edges: Vec<f64>, lon_edges: Vec<f64>) -> HarpResult<()> {
    let n = product.dimension(DimensionKind::Time).unwrap_or(0);
    product_bin_spatial(product, 1, &vec![0usize; n], lat_edges, lon_edges)
}

enum Extreme {
    Min,
    Max,
    Average,
}

/// Per-sample `(cell_index, weight)` contributions, either from footprint
/// bounds (area mode) or a single point lookup (point mode).
fn sample_contributions(product: &Product, grid: &GridSpec) -> HarpResult<Vec<Vec<(usize, f64)>>> {
    let has_bounds = matches!(
        (product.variable("latitude_bounds"), product.variable("longitude_bounds")),
        (Some(la), Some(lo))
            if la.dims.len() == 2 && la.dims[1].kind == DimensionKind::Independent
            && lo.dims.len() == 2 && lo.dims[1].kind == DimensionKind::Independent
    );

    if has_bounds {
        let lat_bounds = product.variable("latitude_bounds").unwrap();
        let lon_bounds = product.variable("longitude_bounds").unwrap();
        let m = lat_bounds.dims[1].length;
        let n = lat_bounds.dims[0].length;
        let lat_data = to_f64(lat_bounds)?;
        let lon_data = to_f64(lon_bounds)?;
        let mut out = Vec::with_capacity(n);
        for i in 0..n {
            let lat_row = &lat_data[i * m..(i + 1) * m];
            let lon_row = &lon_data[i * m..(i + 1) * m];
            out.push(grid.cells_and_weights_for_bounds(lat_row, lon_row)?);
        }
        Ok(out)
    } else {
        let lat = product
            .variable("latitude")
            .ok_or_else(|| invalid_product("spatial binning needs either latitude_bounds/longitude_bounds or latitude/longitude"))?;
        let lon = product
            .variable("longitude")
            .ok_or_else(|| invalid_product("spatial binning needs either latitude_bounds/longitude_bounds or latitude/longitude"))?;
        let lat_data = to_f64(lat)?;
        let lon_data = to_f64(lon)?;
        let mut out = Vec::with_capacity(lat_data.len());
        for i in 0..lat_data.len() {
            match grid.cell_for_point(lat_data[i], lon_data[i]) {
                Some(cell) => out.push(vec![(cell, 1.0)]),
                None => out.push(Vec::new()),
            }
        }
        Ok(out)
    }
}

fn to_f64(v: &Variable) -> HarpResult<Vec<f64>> {
    Ok(match &v.data {
        DataArray::Float64(x) => x.clone(),
        DataArray::Float32(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::Int32(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::Int16(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::Int8(x) => x.iter().map(|&y| y as f64).collect(),
        DataArray::String(_) => return Err(invalid_variable(format!("variable '{}' is not numeric", v.name))),
    })
}

fn bin_average_spatial(
    product: &mut Product,
    name: &str,
    t: usize,
    num_lat: usize,
    num_lon: usize,
    time_bin_index: &[usize],
    contributions: &[Vec<(usize, f64)>],
    global_weight: &[f64],
) -> HarpResult<()> {
    let num_cells = num_lat * num_lon;
    let var = product.variable(name).unwrap();
    let row_len = var.trailing_len();
    let data = to_f64(var)?;
    let trailing = var.dims.iter().skip(1).cloned().collect::<Vec<_>>();
    let unit = var.unit.clone();

    let mut sum = vec![0.0f64; t * num_cells * row_len];
    let mut contrib_weight = vec![0.0f64; t * num_cells * row_len];
    for (i, &b) in time_bin_index.iter().enumerate() {
        for r in 0..row_len {
            let val = data[i * row_len + r];
            if val.is_nan() {
                continue;
            }
            for &(cell, w) in &contributions[i] {
                let out_idx = (b * num_cells + cell) * row_len + r;
                sum[out_idx] += w * val;
                contrib_weight[out_idx] += w;
            }
        }
    }

    let result: Vec<f64> = sum.iter().zip(contrib_weight.iter()).map(|(&s, &w)| s / w).collect();

    let mut dims = vec![
        DimensionDescriptor::new(DimensionKind::Time, t),
        DimensionDescriptor::new(DimensionKind::Latitude, num_lat),
        DimensionDescriptor::new(DimensionKind::Longitude, num_lon),
    ];
    dims.extend(trailing);
    let new_var = Variable::new(name, dims, unit, DataArray::Float64(result))?;
    product.replace_variable(new_var)?;

    let diverges = contrib_weight
        .iter()
        .enumerate()
        .any(|(j, &w)| (w - global_weight[j / row_len]).abs() > 1e-12);
    if diverges {
        write_named_weight(product, name, t, num_lat, num_lon, row_len, &contrib_weight)?;
    }
    Ok(())
}

fn bin_angle_spatial(
    product: &mut Product,
    name: &str,
    t: usize,
    num_lat: usize,
    num_lon: usize,
    time_bin_index: &[usize],
    contributions: &[Vec<(usize, f64)>],
) -> HarpResult<()> {
    let num_cells = num_lat * num_lon;
    let var = product.variable(name).unwrap();
    let orig_unit = var.unit.clone().unwrap_or_default();
    let mut rad_var = var.clone();
    rad_var.convert_data_type(DataType::Float64)?;
    rad_var.convert_unit("rad")?;
    let row_len = rad_var.trailing_len();
    let theta = rad_var.data.as_f64()?.to_vec();
    let trailing = var.dims.iter().skip(1).cloned().collect::<Vec<_>>();

    let mut acc_cos = vec![0.0f64; t * num_cells * row_len];
    let mut acc_sin = vec![0.0f64; t * num_cells * row_len];
    for (i, &b) in time_bin_index.iter().enumerate() {
        for r in 0..row_len {
            let th = theta[i * row_len + r];
            if th.is_nan() {
                continue;
            }
            for &(cell, w) in &contributions[i] {
                let out_idx = (b * num_cells + cell) * row_len + r;
                acc_cos[out_idx] += w * th.cos();
                acc_sin[out_idx] += w * th.sin();
            }
        }
    }

    let size = t * num_cells * row_len;
    let mut result = vec![0.0f64; size];
    let mut weight_out = vec![0.0f64; size];
    for j in 0..size {
        let norm = (acc_cos[j] * acc_cos[j] + acc_sin[j] * acc_sin[j]).sqrt();
        weight_out[j] = norm;
        result[j] = if norm == 0.0 { f64::NAN } else { acc_sin[j].atan2(acc_cos[j]) };
    }

    let mut dims = vec![
        DimensionDescriptor::new(DimensionKind::Time, t),
        DimensionDescriptor::new(DimensionKind::Latitude, num_lat),
        DimensionDescriptor::new(DimensionKind::Longitude, num_lon),
    ];
    dims.extend(trailing);
    let mut new_var = Variable::new(name, dims, Some("rad".to_string()), DataArray::Float64(result))?;
    new_var.convert_unit(&orig_unit)?;
    product.replace_variable(new_var)?;

    write_named_weight(product, name, t, num_lat, num_lon, row_len, &weight_out)
}

fn bin_time_only(product: &mut Product, name: &str, t: usize, time_bin_index: &[usize], mode: Extreme) -> HarpResult<()> {
    let var = product.variable(name).unwrap();
    let row_len = var.trailing_len();
    let data = to_f64(var)?;
    let trailing = var.dims.iter().skip(1).cloned().collect::<Vec<_>>();
    let unit = var.unit.clone();

    let mut acc = vec![
        match mode {
            Extreme::Min => f64::INFINITY,
            Extreme::Max => f64::NEG_INFINITY,
            Extreme::Average => 0.0,
        };
        t * row_len
    ];
    let mut touched = vec![false; t * row_len];
    let mut count = vec![0i32; t * row_len];
    for (i, &b) in time_bin_index.iter().enumerate() {
        for r in 0..row_len {
            let val = data[i * row_len + r];
            if val.is_nan() {
                continue;
            }
            let idx = b * row_len + r;
            touched[idx] = true;
            acc[idx] = match mode {
                Extreme::Min => acc[idx].min(val),
                Extreme::Max => acc[idx].max(val),
                Extreme::Average => acc[idx] + val,
            };
            count[idx] += 1;
        }
    }
    for j in 0..acc.len() {
        if matches!(mode, Extreme::Average) {
            acc[j] /= count[j] as f64;
        }
        if !touched[j] {
            acc[j] = f64::NAN;
        }
    }

    let mut dims = vec![DimensionDescriptor::new(DimensionKind::Time, t)];
    dims.extend(trailing);
    let new_var = Variable::new(name, dims, unit, DataArray::Float64(acc))?;
    product.replace_variable(new_var)
}

fn write_named_weight(
    product: &mut Product,
    name: &str,
    t: usize,
    num_lat: usize,
    num_lon: usize,
    row_len: usize,
    values: &[f64],
) -> HarpResult<()> {
    let weight_name = format!("{name}_weight");
    let trailing = product.variable(name).map(|v| v.dims.iter().skip(3).cloned().collect::<Vec<_>>()).unwrap_or_default();
    let mut dims = vec![
        DimensionDescriptor::new(DimensionKind::Time, t),
        DimensionDescriptor::new(DimensionKind::Latitude, num_lat),
        DimensionDescriptor::new(DimensionKind::Longitude, num_lon),
    ];
    dims.extend(trailing);
    debug_assert_eq!(dims.iter().map(|d| d.length).product::<usize>(), t * num_lat * num_lon * row_len);
    let data = DataArray::Float32(values.iter().map(|&x| x as f32).collect());
    let var = Variable::new(&weight_name, dims, None, data)?;
    if product.variable(&weight_name).is_some() {
        product.replace_variable(var)
    } else {
        product.add_variable(var)
    }
}

fn write_count_and_weight(
    product: &mut Product,
    t: usize,
    num_lat: usize,
    num_lon: usize,
    time_bin_count: &[i32],
    global_weight: &[f64],
) -> HarpResult<()> {
    let count_var = Variable::new(
        "count",
        vec![DimensionDescriptor::new(DimensionKind::Time, t)],
        None,
        DataArray::Int32(time_bin_count.to_vec()),
    )?;
    if product.variable("count").is_some() {
        product.replace_variable(count_var)?;
    } else {
        product.add_variable(count_var)?;
    }

    let weight_var = Variable::new(
        "weight",
        vec![
            DimensionDescriptor::new(DimensionKind::Time, t),
            DimensionDescriptor::new(DimensionKind::Latitude, num_lat),
            DimensionDescriptor::new(DimensionKind::Longitude, num_lon),
        ],
        None,
        DataArray::Float32(global_weight.iter().map(|&x| x as f32).collect()),
    )?;
    if product.variable("weight").is_some() {
        product.replace_variable(weight_var)
    } else {
        product.add_variable(weight_var)
    }
}

fn append_bounds(product: &mut Product, name: &str, kind: DimensionKind, num_cells: usize, edges: &[f64]) -> HarpResult<()> {
    let mut data = Vec::with_capacity(num_cells * 2);
    for i in 0..num_cells {
        data.push(edges[i]);
        data.push(edges[i + 1]);
    }
    let var = Variable::new(
        name,
        vec![
            DimensionDescriptor::new(kind, num_cells),
            DimensionDescriptor::new(DimensionKind::Independent, 2),
        ],
        None,
        DataArray::Float64(data),
    )?;
    if product.variable(name).is_some() {
        product.replace_variable(var)
    } else {
        product.add_variable(var)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::product::DimensionDescriptor;

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
    fn e2e_spatial_point_binning() {
        let mut p = Product::new();
        p.add_variable(time_var("latitude", Some("degree"), vec![45.0, 45.0])).unwrap();
        p.add_variable(time_var("longitude", Some("degree"), vec![10.0, 11.0])).unwrap();
        p.add_variable(time_var("v", Some("K"), vec![1.0, 3.0])).unwrap();
        product_bin_spatial(&mut p, 1, &[0, 0], vec![0.0, 90.0], vec![0.0, 360.0]).unwrap();

        let v = p.variable("v").unwrap();
        assert_eq!(v.shape(), vec![1, 1, 1]);
        assert_eq!(v.data.as_f64().unwrap(), &[2.0]);
        let w = p.variable("weight").unwrap();
        match &w.data {
            DataArray::Float32(x) => assert_eq!(x, &[2.0]),
            _ => panic!("expected float32 weight"),
        }
        assert_eq!(p.variable("count").unwrap().data.as_i32().unwrap(), &[2]);
    }

    #[test]
    fn e2e_spatial_area_binning() {
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
            assert!((x - 10.0).abs() < 1e-9);
        }
        let w = p.variable("weight").unwrap();
        match &w.data {
            DataArray::Float32(x) => {
                for &v in x {
                    assert!((v - 0.25).abs() < 1e-6);
                }
            }
            _ => panic!("expected float32 weight"),
        }
    }
}
