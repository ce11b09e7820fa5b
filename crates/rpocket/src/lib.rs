//! Pocket toolpath generation and raster verification.
//!
//! Curves built from line and arc segments describe a pocket boundary and its
//! islands. A [`PocketEngine`] turns them into clearing passes, and the
//! [`MaterialSimulator`] stamps the tool along those passes to measure how
//! much of the pocket is cleared and whether any island was gouged.

pub mod engine;
mod error;
pub mod geometry;
mod job;
pub mod simulator;
mod verify;

pub use engine::{
    ClipperArea, PocketEngine, PocketParams, PocketStrategy, DEFAULT_ENGINE_ACCURACY,
};
pub use error::PocketError;
pub use geometry::*;
pub use job::{Acceptance, VerificationJob};
pub use simulator::{
    default_resolution, simulate, CellState, MaterialSimulator, OccupancyGrid, SimulationResult,
};
pub use verify::{verify_job, verify_job_with_clipper, VerificationReport};
