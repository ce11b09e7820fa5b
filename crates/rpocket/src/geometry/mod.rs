//! Curve model: closed line/arc curves, sampling helpers and polygon tests.

pub mod curve;
pub mod polygon;
pub mod sampling;

// Re-export public types
pub use curve::{Curve, PocketCurve, SegmentKind, Vertex, DEFAULT_ACCURACY};
pub use kurbo::{Point, Rect, Vec2};
pub use polygon::contains_point;
