//! Raster material-removal simulation.
//!
//! The cut region (boundary minus islands) is classified onto a square grid,
//! then the tool's circular footprint is stamped along every toolpath curve.
//! The resulting counts tell how much of the pocket the toolpath clears and
//! whether it ever swept over island material.

use crate::error::{check_tool_radius, PocketError};
use crate::geometry::polygon::loop_contains_point;
use crate::geometry::sampling::{sample_arc, sample_line};
use crate::geometry::{Curve, Point, SegmentKind};
use serde::Serialize;
use tracing::{debug, warn};

/// Lower bound for the default grid resolution.
pub const MIN_RESOLUTION: f64 = 0.05;

/// Default grid resolution for a tool: about five cells per tool radius.
pub fn default_resolution(tool_radius: f64) -> f64 {
    (tool_radius / 5.0).max(MIN_RESOLUTION)
}

/// State of one grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[repr(u8)]
pub enum CellState {
    /// Not part of the pocket.
    Outside = 0,
    /// Pocket material the toolpath has not reached.
    Uncut = 1,
    /// Pocket material removed by the tool.
    Cut = 2,
    /// Island material, untouched.
    Island = 3,
    /// Island material the tool swept over.
    IslandViolated = 4,
}

/// Dense row-major grid of cell states over the boundary's extent.
#[derive(Debug, Clone, Serialize)]
pub struct OccupancyGrid {
    cells: Vec<CellState>,
    cols: usize,
    rows: usize,
    /// World position of the grid's lower-left corner.
    origin: Point,
    resolution: f64,
}

impl OccupancyGrid {
    fn new(origin: Point, cols: usize, rows: usize, resolution: f64) -> Self {
        Self {
            cells: vec![CellState::Outside; cols * rows],
            cols,
            rows,
            origin,
            resolution,
        }
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn origin(&self) -> Point {
        self.origin
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    pub fn cells(&self) -> &[CellState] {
        &self.cells
    }

    /// State at column `col`, row `row`, or `None` outside the grid.
    pub fn state(&self, col: usize, row: usize) -> Option<CellState> {
        if col >= self.cols || row >= self.rows {
            return None;
        }
        Some(self.cells[row * self.cols + col])
    }

    /// World position of a cell's center.
    pub fn cell_center(&self, col: usize, row: usize) -> Point {
        Point::new(
            self.origin.x + (col as f64 + 0.5) * self.resolution,
            self.origin.y + (row as f64 + 0.5) * self.resolution,
        )
    }

    /// Number of cells in `state`.
    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|c| **c == state).count()
    }

    /// Stamp the tool disc centred at `center`.
    ///
    /// Material cells within the tool radius padded by half a cell become cut.
    /// Island cells are only violated within the unpadded radius, so the padding
    /// never manufactures violations.
    fn stamp(&mut self, center: Point, tool_radius: f64) {
        let res = self.resolution;
        let stamp_r = tool_radius + res * 0.5;
        let stamp_r2 = stamp_r * stamp_r;
        let tool_r2 = tool_radius * tool_radius;
        let (ox, oy) = (self.origin.x, self.origin.y);

        let Some((c0, c1)) = index_span(
            center.x - stamp_r - ox,
            center.x + stamp_r - ox,
            res,
            self.cols,
        ) else {
            return;
        };
        let Some((r0, r1)) = index_span(
            center.y - stamp_r - oy,
            center.y + stamp_r - oy,
            res,
            self.rows,
        ) else {
            return;
        };

        for r in r0..=r1 {
            let dy = oy + (r as f64 + 0.5) * res - center.y;
            let dy2 = dy * dy;
            if dy2 > stamp_r2 {
                continue;
            }
            let max_dx2 = stamp_r2 - dy2;
            let max_violation_dx2 = if tool_r2 > dy2 { tool_r2 - dy2 } else { -1.0 };
            for c in c0..=c1 {
                let dx = ox + (c as f64 + 0.5) * res - center.x;
                let dx2 = dx * dx;
                if dx2 > max_dx2 {
                    continue;
                }
                let cell = &mut self.cells[r * self.cols + c];
                match *cell {
                    CellState::Uncut => *cell = CellState::Cut,
                    CellState::Island if dx2 <= max_violation_dx2 => {
                        *cell = CellState::IslandViolated
                    }
                    _ => {}
                }
            }
        }
    }
}

/// Clamp the cell index range covering `[lo, hi]` (grid-relative) to `0..len`.
fn index_span(lo: f64, hi: f64, res: f64, len: usize) -> Option<(usize, usize)> {
    let first = (lo / res).floor();
    let last = (hi / res).floor();
    if len == 0 || last < 0.0 || first >= len as f64 {
        return None;
    }
    let first = first.max(0.0) as usize;
    let last = (last as usize).min(len - 1);
    (first <= last).then_some((first, last))
}

/// Outcome of one simulation run.
#[derive(Debug, Clone, Serialize)]
pub struct SimulationResult {
    /// Fraction of cuttable cells that were cut; 1.0 when nothing is cuttable.
    pub coverage: f64,
    pub total_cuttable_cells: usize,
    pub cut_cells: usize,
    /// Island cells the tool swept over. Anything above zero is a gouge.
    pub island_violation_cells: usize,
    /// The final grid, kept for diagnostic rendering.
    pub grid: OccupancyGrid,
}

impl SimulationResult {
    pub fn uncut_cells(&self) -> usize {
        self.total_cuttable_cells - self.cut_cells
    }

    pub fn uncut_fraction(&self) -> f64 {
        1.0 - self.coverage
    }
}

/// Raster simulator for one pocket: a boundary, its islands and a tool radius.
#[derive(Debug, Clone)]
pub struct MaterialSimulator {
    boundary: Curve,
    islands: Vec<Curve>,
    tool_radius: f64,
    resolution: f64,
}

impl MaterialSimulator {
    /// Create a simulator. `resolution` defaults to [`default_resolution`].
    pub fn new(
        boundary: Curve,
        islands: Vec<Curve>,
        tool_radius: f64,
        resolution: Option<f64>,
    ) -> Result<Self, PocketError> {
        check_tool_radius(tool_radius)?;
        let resolution = resolution.unwrap_or_else(|| default_resolution(tool_radius));
        if !resolution.is_finite() || resolution <= 0.0 {
            return Err(PocketError::InvalidResolution(resolution));
        }
        Ok(Self {
            boundary,
            islands,
            tool_radius,
            resolution,
        })
    }

    pub fn tool_radius(&self) -> f64 {
        self.tool_radius
    }

    pub fn resolution(&self) -> f64 {
        self.resolution
    }

    /// Classify every cell center against the boundary and islands.
    ///
    /// Returns the grid and the number of cuttable cells.
    pub fn classify(&self) -> (OccupancyGrid, usize) {
        let res = self.resolution;
        let boundary = self.boundary.linearized(res * 0.5);
        let Some(bbox) = boundary.bounding_box() else {
            return (OccupancyGrid::new(Point::ZERO, 1, 1, res), 0);
        };

        let origin = Point::new(bbox.x0 - res, bbox.y0 - res);
        let cols = (((bbox.x1 - origin.x + res) / res).ceil() as usize).max(1);
        let rows = (((bbox.y1 - origin.y + res) / res).ceil() as usize).max(1);
        let outline: Vec<Point> = boundary.points().collect();
        let islands: Vec<Vec<Point>> = self
            .islands
            .iter()
            .map(|island| island.linearized(res * 0.5).points().collect())
            .collect();

        let mut grid = OccupancyGrid::new(origin, cols, rows, res);
        let mut total_cuttable = 0;
        for row in 0..rows {
            for col in 0..cols {
                let center = grid.cell_center(col, row);
                if !loop_contains_point(&outline, center) {
                    continue;
                }
                let state = if islands.iter().any(|island| loop_contains_point(island, center)) {
                    CellState::Island
                } else {
                    total_cuttable += 1;
                    CellState::Uncut
                };
                grid.cells[row * cols + col] = state;
            }
        }
        debug!(
            cols,
            rows,
            resolution = res,
            total_cuttable,
            "classified simulation grid"
        );
        (grid, total_cuttable)
    }

    /// Stamp the tool along `toolpaths` and measure coverage and island violations.
    pub fn simulate(&self, toolpaths: &[Curve]) -> SimulationResult {
        let (mut grid, total_cuttable) = self.classify();
        let step = self.resolution * 0.5;
        let radius = self.tool_radius;

        for curve in toolpaths {
            let Some(start) = curve.start_point() else {
                continue;
            };
            grid.stamp(start, radius);
            let mut prev = start;
            for v in &curve.vertices()[1..] {
                match v.kind {
                    SegmentKind::Line => {
                        sample_line(prev, v.point, step, |p| grid.stamp(p, radius));
                    }
                    SegmentKind::CcwArc { center } => {
                        sample_arc(prev, v.point, center, true, step, |p| grid.stamp(p, radius));
                    }
                    SegmentKind::CwArc { center } => {
                        sample_arc(prev, v.point, center, false, step, |p| grid.stamp(p, radius));
                    }
                }
                prev = v.point;
            }
        }

        let mut cut_cells = 0;
        let mut island_violation_cells = 0;
        for cell in &grid.cells {
            match cell {
                CellState::Cut => cut_cells += 1,
                CellState::IslandViolated => island_violation_cells += 1,
                _ => {}
            }
        }
        let coverage = if total_cuttable > 0 {
            cut_cells as f64 / total_cuttable as f64
        } else {
            1.0
        };
        if island_violation_cells > 0 {
            warn!(island_violation_cells, "toolpath sweeps over island material");
        }

        SimulationResult {
            coverage,
            total_cuttable_cells: total_cuttable,
            cut_cells,
            island_violation_cells,
            grid,
        }
    }
}

/// Simulate `toolpaths` over the pocket `boundary` minus `islands`.
pub fn simulate(
    boundary: &Curve,
    islands: &[Curve],
    tool_radius: f64,
    toolpaths: &[Curve],
    resolution: Option<f64>,
) -> Result<SimulationResult, PocketError> {
    let simulator =
        MaterialSimulator::new(boundary.clone(), islands.to_vec(), tool_radius, resolution)?;
    Ok(simulator.simulate(toolpaths))
}
