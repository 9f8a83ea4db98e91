//! The binning/resampling engine: classification and the temporal and
//! spatial reduction passes built on top of it.

pub mod classifier;
pub mod spatial;
pub mod temporal;

pub use classifier::{classify, classify_spatial, BinType};
pub use spatial::{product_bin_spatial, product_bin_spatial_full};
pub use temporal::{bin_index_by_collocation, bin_index_by_variables, product_bin, product_bin_full, CollocationRow};
