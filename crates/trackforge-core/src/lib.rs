//! Trackforge Core - Foundational types for the Trackforge pipeline
//!
//! This crate provides the types that all other Trackforge crates depend on:
//! - `TrackError` / `Result` - Error types
//! - `GeometryHasher` - Deterministic content hashing of geometric state
//! - `ScalarCurve` - 1D interpolation primitives for banking and widening
//! - Angle helpers

mod angles;
mod curve1d;
mod error;
mod hash;

pub use angles::normalize_degrees;
pub use curve1d::{scalar_curve, Interpolation, ScalarCurve};
pub use error::{Result, TrackError};
pub use hash::{round_to_grid, GeometryHasher, HashMethod, Md5Hasher, SimpleHasher, ROUNDING_GRID};
