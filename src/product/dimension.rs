//! Dimension kinds and per-variable dimension descriptors.

/// The six dimension kinds a product's variables can be indexed by. Every
/// kind except `Independent` has a single product-wide extent; a variable
/// may carry at most one dimension of each typed kind, and `Independent`
/// dimensions may repeat with their own per-variable length.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DimensionKind {
    Time,
    Vertical,
    Latitude,
    Longitude,
    Spectral,
    Independent,
}

impl DimensionKind {
    pub fn is_typed(self) -> bool {
        !matches!(self, DimensionKind::Independent)
    }
}

/// One entry in a variable's ordered dimension list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DimensionDescriptor {
    pub kind: DimensionKind,
    pub length: usize,
}

impl DimensionDescriptor {
    pub fn new(kind: DimensionKind, length: usize) -> Self {
        DimensionDescriptor { kind, length }
    }
}
