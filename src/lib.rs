//! `harp-core`: the spherical-geometry and binning/resampling engine behind
//! a harmonized atmospheric remote-sensing data model.
//!
//! # Modules
//!
//! - **[`geometry`]**: points, great-circle lines, small circles and convex
//!   spherical polygons on the WGS84 sphere, with Euler-rotation machinery,
//!   relationship classification, intersection and surface-area computation.
//! - **[`product`]**: the in-memory product/variable data model that the
//!   binning engine operates on (name, dimensioned buffer, unit).
//! - **[`grid`]**: Plate-Carrée grid-clipping — per-cell area-fraction
//!   weights of a footprint polygon against a lat/lon grid.
//! - **[`binning`]**: the classifier and the temporal/spatial binning
//!   (resampling) engines built on top of [`geometry`], [`product`] and
//!   [`grid`].
//! - **[`ffi`]**: a thin façade mirroring the published C-style return-code
//!   surface and thread-local error channel, for callers that expect that
//!   calling convention.
//!
//! Everything here is pure with respect to the [`product::Product`] it is
//! given: a call mutates its input in place (or returns a new value) and
//! never spawns background work (see the crate's design notes on
//! concurrency). Distinct products may safely be processed on distinct
//! threads.

pub mod binning;
pub mod error;
pub mod ffi;
pub mod geometry;
pub mod grid;
pub mod product;

pub use error::{HarpError, HarpResult};
