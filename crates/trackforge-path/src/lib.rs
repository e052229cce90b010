//! Trackforge Path - Curve descriptors and fixed-step path sampling
//!
//! A track is authored as an ordered list of curve descriptors (arcs and
//! cubic beziers). This crate walks that list and produces the derived
//! `Path`: an ordered sequence of short fixed-length `PathSegment`s, each
//! carrying interpolated position/orientation/banking/widening state plus
//! the deltas to the next segment needed for continuous interpolation
//! within a segment.

mod bezier;
mod curve;
mod path;
mod segment;

pub use bezier::Bezier3;
pub use curve::{CurveDescriptor, CurveKind, Widening};
pub use path::{Overrun, Path, PathParams, Track};
pub use segment::{rotation_from_degrees, PathSegment};
