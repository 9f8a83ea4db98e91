//! Error taxonomy for the geometry and binning engines.
//!
//! Mirrors the error kinds published by the original C library's
//! `harp_errno` facility (see `design notes` in the crate root docs): every
//! fallible operation here returns a [`HarpError`] rather than a bare status
//! code, and the thread-local façade in [`crate::ffi`] is the only place
//! that re-derives a C-style return code from it.

use thiserror::Error;

/// The published error kinds.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum HarpError {
    #[error("out of memory: {0}")]
    OutOfMemory(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invalid variable: {0}")]
    InvalidVariable(String),

    #[error("invalid product: {0}")]
    InvalidProduct(String),

    #[error("ingestion error: {0}")]
    Ingestion(String),

    #[error("no data: {0}")]
    NoData(String),
}

impl HarpError {
    /// A small numeric tag for the thread-local façade (`ffi` module); not
    /// part of the public error surface itself.
    pub(crate) fn code(&self) -> i32 {
        match self {
            HarpError::OutOfMemory(_) => 1,
            HarpError::InvalidArgument(_) => 2,
            HarpError::InvalidVariable(_) => 3,
            HarpError::InvalidProduct(_) => 4,
            HarpError::Ingestion(_) => 5,
            HarpError::NoData(_) => 6,
        }
    }
}

pub type HarpResult<T> = Result<T, HarpError>;

pub(crate) fn invalid_argument(msg: impl Into<String>) -> HarpError {
    HarpError::InvalidArgument(msg.into())
}

pub(crate) fn invalid_variable(msg: impl Into<String>) -> HarpError {
    HarpError::InvalidVariable(msg.into())
}

pub(crate) fn invalid_product(msg: impl Into<String>) -> HarpError {
    HarpError::InvalidProduct(msg.into())
}
