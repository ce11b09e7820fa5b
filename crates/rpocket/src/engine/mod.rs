//! Pocketing engine boundary.
//!
//! An engine accumulates closed curves into a region, combines regions with
//! boolean operations and turns the result into toolpath curves. The simulator
//! and curve model never depend on a concrete engine; [`ClipperArea`] is the
//! one shipped with this crate.

pub mod clipper;
mod zigzag;

use crate::error::{check_tool_radius, PocketError};
use crate::geometry::{Curve, PocketCurve};
use serde::{Deserialize, Serialize};

pub use clipper::ClipperArea;

/// Default curve-deviation tolerance for a new region.
pub const DEFAULT_ENGINE_ACCURACY: f64 = 0.01;

/// How the pocket interior is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PocketStrategy {
    /// Successive inward offsets of the region.
    #[default]
    Spiral,
    /// Parallel back-and-forth raster passes.
    ZigZag,
    /// A single pass along the first inward offset.
    SingleOffset,
    /// Raster passes finished by one offset pass along the walls.
    ZigZagThenSingleOffset,
}

/// Geometric parameters for [`PocketEngine::make_pocket`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PocketParams {
    pub tool_radius: f64,
    /// Material left on the walls in addition to the tool radius.
    #[serde(default)]
    pub extra_offset: f64,
    /// Radial spacing between successive passes.
    pub stepover: f64,
    /// Spiral passes run from the middle outwards.
    #[serde(default)]
    pub start_from_center: bool,
    #[serde(default)]
    pub strategy: PocketStrategy,
    /// Raster direction for zig-zag passes, in degrees from the X axis.
    #[serde(default)]
    pub zig_angle: f64,
}

impl PocketParams {
    pub fn new(tool_radius: f64, stepover: f64, strategy: PocketStrategy) -> Self {
        Self {
            tool_radius,
            extra_offset: 0.0,
            stepover,
            start_from_center: false,
            strategy,
            zig_angle: 0.0,
        }
    }

    pub fn validate(&self) -> Result<(), PocketError> {
        check_tool_radius(self.tool_radius)?;
        if !self.stepover.is_finite() || self.stepover <= 0.0 {
            return Err(PocketError::InvalidStepover(self.stepover));
        }
        if !self.extra_offset.is_finite() {
            return Err(PocketError::InvalidParameter {
                name: "extra_offset",
                reason: format!("must be finite, got {}", self.extra_offset),
            });
        }
        if !self.zig_angle.is_finite() {
            return Err(PocketError::InvalidParameter {
                name: "zig_angle",
                reason: format!("must be finite, got {}", self.zig_angle),
            });
        }
        Ok(())
    }
}

/// Region accumulator that can generate pocket toolpaths.
///
/// Curves wound counter-clockwise add material to clear; clockwise curves are
/// islands. Engine failures are returned unchanged to the caller.
pub trait PocketEngine: Sized {
    /// Create an empty region with the given curve-deviation tolerance.
    fn create(accuracy: f64) -> Self;

    /// Append a curve: counter-clockwise for a boundary, clockwise for an island.
    fn add_curve(&mut self, curve: &Curve) -> Result<(), PocketError>;

    /// Append an island drawn counter-clockwise, reversing it first.
    fn add_island(&mut self, curve: &Curve) -> Result<(), PocketError> {
        self.add_curve(&curve.reversed())
    }

    /// Replace this region by its union with `other`.
    fn unite(&mut self, other: &Self) -> Result<(), PocketError>;

    /// Remove `other` from this region.
    fn subtract(&mut self, other: &Self) -> Result<(), PocketError>;

    /// The curves currently stored, reflecting any boolean operation applied.
    fn curves(&self) -> Vec<Curve>;

    /// Generate toolpath curves clearing the region. An empty region, or one too
    /// small for the tool, yields an empty list.
    fn make_pocket(&self, params: &PocketParams) -> Result<Vec<PocketCurve>, PocketError>;
}
