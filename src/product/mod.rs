//! The in-memory product/variable data model.
//!
//! This is the concrete implementation of the surface the binning engine
//! needs from a product abstraction. Satellite-instrument readers that
//! populate one live elsewhere; this crate ships one here so it is runnable
//! and testable standalone.

pub mod dimension;
pub mod product;
pub mod units;
pub mod variable;

pub use dimension::{DimensionDescriptor, DimensionKind};
pub use product::Product;
pub use variable::{DataArray, DataType, Variable};
