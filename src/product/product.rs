//! The product: an insertion-ordered variable map plus a shared dimension
//! extent table.

use std::collections::HashMap;

use super::dimension::DimensionKind;
use super::variable::Variable;
use crate::error::{invalid_argument, invalid_variable, HarpResult};

#[derive(Debug, Clone, Default)]
pub struct Product {
    variables: Vec<Variable>,
    index: HashMap<String, usize>,
    dimensions: HashMap<DimensionKind, usize>,
}

impl Product {
    pub fn new() -> Self {
        Product::default()
    }

    pub fn variables(&self) -> impl Iterator<Item = &Variable> {
        self.variables.iter()
    }

    pub fn variable(&self, name: &str) -> Option<&Variable> {
        self.index.get(name).map(|&i| &self.variables[i])
    }

    pub fn variable_mut(&mut self, name: &str) -> Option<&mut Variable> {
        if let Some(&i) = self.index.get(name) {
            Some(&mut self.variables[i])
        } else {
            None
        }
    }

    pub fn dimension(&self, kind: DimensionKind) -> Option<usize> {
        self.dimensions.get(&kind).copied()
    }

    fn check_typed_dims_against_product(&self, var: &Variable) -> HarpResult<()> {
        for d in &var.dims {
            if !d.kind.is_typed() {
                continue;
            }
            if let Some(existing) = self.dimensions.get(&d.kind) {
                if *existing != d.length {
                    return Err(invalid_argument(format!(
                        "variable '{}' has {:?} length {} but the product's is {}",
                        var.name, d.kind, d.length, existing
                    )));
                }
            }
        }
        Ok(())
    }

    /// Adds a new variable, failing if the name is already present or a
    /// typed dimension disagrees with the product's existing extent for
    /// that kind. New typed extents are recorded on first use.
    pub fn add_variable(&mut self, var: Variable) -> HarpResult<()> {
        if self.index.contains_key(&var.name) {
            return Err(invalid_argument(format!(
                "product already has a variable named '{}'",
                var.name
            )));
        }
        self.check_typed_dims_against_product(&var)?;
        for d in &var.dims {
            if d.kind.is_typed() {
                self.dimensions.entry(d.kind).or_insert(d.length);
            }
        }
        self.index.insert(var.name.clone(), self.variables.len());
        self.variables.push(var);
        Ok(())
    }

    /// Replaces an existing variable of the same name in place, preserving
    /// its position in iteration order; the old buffer is dropped.
    pub fn replace_variable(&mut self, var: Variable) -> HarpResult<()> {
        let i = *self
            .index
            .get(&var.name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{}' to replace", var.name)))?;
        self.check_typed_dims_against_product(&var)?;
        for d in &var.dims {
            if d.kind.is_typed() {
                self.dimensions.entry(d.kind).or_insert(d.length);
            }
        }
        self.variables[i] = var;
        Ok(())
    }

    /// Removes and returns a variable by name, preserving the relative
    /// order of the remaining variables.
    pub fn remove_variable(&mut self, name: &str) -> HarpResult<Variable> {
        let i = *self
            .index
            .get(name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{name}' to remove")))?;
        let var = self.variables.remove(i);
        self.index.remove(name);
        for (_, idx) in self.index.iter_mut() {
            if *idx > i {
                *idx -= 1;
            }
        }
        Ok(var)
    }

    /// Alias for [`Product::remove_variable`]: "detach" and "remove" differ
    /// only in caller intent (detach implies the caller takes ownership of a
    /// variable it plans to reuse elsewhere), not in mechanics.
    pub fn detach_variable(&mut self, name: &str) -> HarpResult<Variable> {
        self.remove_variable(name)
    }

    /// Adds a dimensionless `Independent` dimension is per-variable (spec
    /// §6.1); this only needs to be reflected on the named variable, not on
    /// the product's shared extent table.
    pub fn add_independent_dimension(&mut self, name: &str, length: usize, fill: f64) -> HarpResult<()> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{name}'")))?;
        var.add_independent_dim_f64(length, fill)
    }

    pub fn remove_independent_dimension(&mut self, name: &str, replacement: Vec<f64>) -> HarpResult<()> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{name}'")))?;
        var.replace_and_drop_trailing_independent(replacement)
    }

    pub fn rearrange_dimension(&mut self, name: &str, index_map: &[usize]) -> HarpResult<()> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{name}'")))?;
        var.rearrange_leading(index_map)
    }

    pub fn convert_data_type(&mut self, name: &str, target: super::variable::DataType) -> HarpResult<()> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{name}'")))?;
        var.convert_data_type(target)
    }

    pub fn convert_unit(&mut self, name: &str, target_unit: &str) -> HarpResult<()> {
        let var = self
            .variable_mut(name)
            .ok_or_else(|| invalid_variable(format!("no variable named '{name}'")))?;
        var.convert_unit(target_unit)
    }

    pub fn set_dimension(&mut self, kind: DimensionKind, length: usize) {
        self.dimensions.insert(kind, length);
    }
}
