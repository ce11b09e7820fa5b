use crate::engine::zigzag::zigzag_passes;
use crate::engine::{PocketEngine, PocketParams, PocketStrategy, DEFAULT_ENGINE_ACCURACY};
use crate::error::PocketError;
use crate::geometry::polygon::{loop_signed_area, open_loop, orient_loops};
use crate::geometry::{Curve, PocketCurve, Point};
use clipper2::{
    difference, inflate, union, EndType, JoinType, Path, PathType, Polygon, Polygons, Vertex,
};
use tracing::{debug, warn};

/// Upper bound on inward offset passes for one spiral pocket.
pub const MAX_OFFSET_PASSES: usize = 10_000;

const MITER_LIMIT: f64 = 2.0;

/// clipper2 stores coordinates as integers in hundredths of a unit.
const CLIPPER_QUANTUM: f64 = 0.01;

/// Shortest arc linearization step handed to clipper, several quanta long so
/// neighbouring samples never collapse onto the same grid point.
const MIN_LINEARIZE_STEP: f64 = 8.0 * CLIPPER_QUANTUM;

/// Pocketing engine built on clipper2 polygon offsetting and boolean operations.
///
/// Arcs are linearized at the region's accuracy (but never finer than
/// [`MIN_LINEARIZE_STEP`]) before they reach clipper, so every toolpath it
/// emits is made of line segments.
#[derive(Debug, Clone)]
pub struct ClipperArea {
    accuracy: f64,
    curves: Vec<Curve>,
}

impl ClipperArea {
    /// Create an empty region. A non-positive accuracy falls back to
    /// [`DEFAULT_ENGINE_ACCURACY`].
    pub fn new(accuracy: f64) -> Self {
        let accuracy = if accuracy.is_finite() && accuracy > 0.0 {
            accuracy
        } else {
            warn!(accuracy, "invalid region accuracy, using default");
            DEFAULT_ENGINE_ACCURACY
        };
        Self {
            accuracy,
            curves: Vec::new(),
        }
    }

    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Extra distance kept from the walls on top of the tool radius.
    ///
    /// Covers clipper's coordinate rounding on the way in and out plus the
    /// chord error of round joins, so offset passes never come closer to a
    /// wall or island than the tool radius.
    pub fn wall_clearance(&self) -> f64 {
        self.accuracy + 3.0 * CLIPPER_QUANTUM
    }

    /// Stored curves as open point loops on clipper's grid, dropping
    /// degenerate ones.
    fn loops(&self) -> Vec<Vec<Point>> {
        let step = self.accuracy.max(MIN_LINEARIZE_STEP);
        self.curves
            .iter()
            .map(|curve| {
                let points: Vec<Point> = curve.linearized(step).points().map(snap).collect();
                open_loop(&points, CLIPPER_QUANTUM * 0.5)
            })
            .filter(|lp| lp.len() >= 3)
            .collect()
    }

    /// Evaluate the stored curves into one region.
    ///
    /// Larger loops are applied first: counter-clockwise loops are added and
    /// clockwise loops cut away, so nested islands and islands poking through
    /// the boundary both behave as holes.
    fn region(&self) -> Vec<Vec<Point>> {
        let mut loops: Vec<(f64, Vec<Point>)> = self
            .loops()
            .into_iter()
            .map(|lp| (loop_signed_area(&lp), lp))
            .collect();
        loops.sort_by(|a, b| b.0.abs().total_cmp(&a.0.abs()));

        let mut region: Vec<Vec<Point>> = Vec::new();
        for (area, mut lp) in loops {
            if area > 0.0 {
                region = if region.is_empty() {
                    vec![lp]
                } else {
                    region.push(lp);
                    normalized(united(&region))
                };
            } else if area < 0.0 && !region.is_empty() {
                lp.reverse();
                region = normalized(from_polygons(&difference(
                    to_polygons(&region, PathType::Subject),
                    to_polygons(&[lp], PathType::Clip),
                )));
            }
        }
        normalized(region)
    }

    fn replace_region(&mut self, region: Vec<Vec<Point>>) {
        self.curves = orient_loops(region);
    }

    /// Offset every loop of `region` by `delta` (negative shrinks material).
    fn offset(&self, region: &[Vec<Point>], delta: f64) -> Vec<Vec<Point>> {
        if region.is_empty() {
            return Vec::new();
        }
        let result = inflate(
            to_polygons(region, PathType::Subject),
            delta,
            JoinType::Round,
            EndType::ClosedPolygon,
            MITER_LIMIT,
            self.accuracy,
        );
        let min_area = self.accuracy * self.accuracy;
        normalized(
            from_polygons(&result)
                .into_iter()
                .filter(|lp| loop_signed_area(lp).abs() > min_area)
                .collect(),
        )
    }

    fn spiral_passes(&self, first: Vec<Vec<Point>>, params: &PocketParams) -> Vec<PocketCurve> {
        let mut rings = vec![first];
        for pass in 1..=MAX_OFFSET_PASSES {
            let Some(current) = rings.last() else {
                break;
            };
            let next = self.offset(current, -params.stepover);
            if next.is_empty() {
                break;
            }
            if pass == MAX_OFFSET_PASSES {
                warn!(
                    passes = pass,
                    "spiral pocket stopped at the offset pass limit"
                );
            }
            rings.push(next);
        }
        if params.start_from_center {
            rings.reverse();
        }
        debug!(rings = rings.len(), "spiral pocket offsets");

        let mut curves = Vec::new();
        let mut last_end: Option<Point> = None;
        for ring in rings {
            for lp in ring {
                let curve = closed_curve_from(&lp, last_end);
                last_end = curve.end_point();
                curves.push(curve);
            }
        }
        curves
    }
}

impl Default for ClipperArea {
    fn default() -> Self {
        Self::new(DEFAULT_ENGINE_ACCURACY)
    }
}

impl PocketEngine for ClipperArea {
    fn create(accuracy: f64) -> Self {
        Self::new(accuracy)
    }

    fn add_curve(&mut self, curve: &Curve) -> Result<(), PocketError> {
        let finite = curve.vertices().iter().all(|v| {
            v.point.is_finite() && v.kind.center().map_or(true, |c| c.is_finite())
        });
        if !finite {
            return Err(PocketError::MalformedCurve(
                "curve has non-finite coordinates".to_string(),
            ));
        }
        debug!(
            vertices = curve.vertices().len(),
            ccw = curve.is_ccw(),
            "adding curve to region"
        );
        self.curves.push(curve.clone());
        Ok(())
    }

    fn unite(&mut self, other: &Self) -> Result<(), PocketError> {
        let (a, b) = (self.region(), other.region());
        let result = match (a.is_empty(), b.is_empty()) {
            (_, true) => a,
            (true, false) => b,
            (false, false) => united(&[a, b].concat()),
        };
        self.replace_region(normalized(result));
        Ok(())
    }

    fn subtract(&mut self, other: &Self) -> Result<(), PocketError> {
        let (a, b) = (self.region(), other.region());
        let result = if a.is_empty() || b.is_empty() {
            a
        } else {
            from_polygons(&difference(
                to_polygons(&a, PathType::Subject),
                to_polygons(&b, PathType::Clip),
            ))
        };
        self.replace_region(normalized(result));
        Ok(())
    }

    fn curves(&self) -> Vec<Curve> {
        self.curves.clone()
    }

    fn make_pocket(&self, params: &PocketParams) -> Result<Vec<PocketCurve>, PocketError> {
        params.validate()?;
        let region = self.region();
        if region.is_empty() {
            debug!("empty region, no pocket toolpath");
            return Ok(Vec::new());
        }

        let wall_offset = params.tool_radius + params.extra_offset + self.wall_clearance();
        let first = self.offset(&region, -wall_offset);
        if first.is_empty() {
            debug!(
                tool_radius = params.tool_radius,
                "region too small for the tool"
            );
            return Ok(Vec::new());
        }

        let curves = match params.strategy {
            PocketStrategy::Spiral => self.spiral_passes(first, params),
            PocketStrategy::SingleOffset => offset_curves(&first),
            PocketStrategy::ZigZag => zigzag_passes(&first, params, self.accuracy),
            PocketStrategy::ZigZagThenSingleOffset => {
                let mut curves = zigzag_passes(&first, params, self.accuracy);
                curves.extend(offset_curves(&first));
                curves
            }
        };
        debug!(
            strategy = ?params.strategy,
            curves = curves.len(),
            "generated pocket toolpath"
        );
        Ok(curves)
    }
}

/// Round a point onto clipper's grid.
fn snap(p: Point) -> Point {
    let round = |v: f64| (v / CLIPPER_QUANTUM).round() * CLIPPER_QUANTUM;
    Point::new(round(p.x), round(p.y))
}

/// Coordinate handed to clipper, which truncates toward zero when scaling to
/// its integer grid. Biasing by a quarter quantum away from zero makes the
/// truncation land on the nearest grid point instead.
fn clipper_coord(v: f64) -> f64 {
    let q = (v / CLIPPER_QUANTUM).round();
    (q + 0.25 * q.signum()) * CLIPPER_QUANTUM
}

fn to_polygons(loops: &[Vec<Point>], path_type: PathType) -> Polygons {
    let paths: Vec<Path> = loops
        .iter()
        .map(|lp| {
            let vertices: Vec<Vertex> = lp
                .iter()
                .map(|p| Vertex::new(clipper_coord(p.x), clipper_coord(p.y)))
                .collect();
            Path::new(vertices, true)
        })
        .collect();
    Polygons::new(vec![Polygon::new(paths, path_type)])
}

/// Union of loops already wound outer counter-clockwise and holes clockwise.
fn united(loops: &[Vec<Point>]) -> Vec<Vec<Point>> {
    from_polygons(&union(to_polygons(loops, PathType::Subject)))
}

fn from_polygons(polygons: &Polygons) -> Vec<Vec<Point>> {
    let mut loops = Vec::new();
    for polygon in polygons.polygons() {
        for path in polygon.paths() {
            let points: Vec<Point> = path
                .vertices()
                .iter()
                .map(|v| snap(Point::new(v.x(), v.y())))
                .collect();
            let lp = open_loop(&points, CLIPPER_QUANTUM * 0.5);
            if lp.len() >= 3 {
                loops.push(lp);
            }
        }
    }
    loops
}

/// Re-orient loops so outers run counter-clockwise and holes clockwise.
fn normalized(loops: Vec<Vec<Point>>) -> Vec<Vec<Point>> {
    orient_loops(loops)
        .iter()
        .map(|curve| {
            let points: Vec<Point> = curve.points().collect();
            open_loop(&points, 1e-9)
        })
        .collect()
}

fn offset_curves(loops: &[Vec<Point>]) -> Vec<PocketCurve> {
    let mut last_end = None;
    loops
        .iter()
        .map(|lp| {
            let curve = closed_curve_from(lp, last_end);
            last_end = curve.end_point();
            curve
        })
        .collect()
}

/// Closed line curve around `lp`, starting at the vertex nearest `near`.
fn closed_curve_from(lp: &[Point], near: Option<Point>) -> PocketCurve {
    let start = near
        .and_then(|target| {
            lp.iter()
                .enumerate()
                .min_by(|a, b| a.1.distance(target).total_cmp(&b.1.distance(target)))
                .map(|(i, _)| i)
        })
        .unwrap_or(0);
    let coords: Vec<(f64, f64)> = (0..=lp.len())
        .map(|i| lp[(start + i) % lp.len()])
        .map(|p| (p.x, p.y))
        .collect();
    Curve::from_points(&coords)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn area_of(curves: &[Curve]) -> f64 {
        curves.iter().map(|c| c.signed_area()).sum()
    }

    #[test]
    fn test_invalid_accuracy_falls_back() {
        assert_eq!(ClipperArea::new(0.0).accuracy(), DEFAULT_ENGINE_ACCURACY);
        assert_eq!(ClipperArea::new(0.5).accuracy(), 0.5);
    }

    #[test]
    fn test_rejects_non_finite_curve() {
        let mut area = ClipperArea::default();
        let bad = Curve::from_points(&[(0.0, 0.0), (f64::NAN, 1.0), (1.0, 1.0), (0.0, 0.0)]);
        assert!(matches!(
            area.add_curve(&bad),
            Err(PocketError::MalformedCurve(_))
        ));
        assert!(area.curves().is_empty());
    }

    #[test]
    fn test_curves_read_back_as_added() {
        let mut area = ClipperArea::default();
        let boundary = Curve::rect(0.0, 0.0, 10.0, 10.0);
        area.add_curve(&boundary).expect("add boundary");
        area.add_island(&Curve::square(4.0, 4.0, 2.0)).expect("add island");
        let curves = area.curves();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves[0], boundary);
        assert!(!curves[1].is_ccw());
    }

    #[test]
    fn test_region_with_island_has_hole() {
        let mut area = ClipperArea::default();
        area.add_curve(&Curve::square(0.0, 0.0, 10.0)).expect("add");
        area.add_island(&Curve::square(4.0, 4.0, 2.0)).expect("add");
        let region = area.region();
        assert_eq!(region.len(), 2);
        let total: f64 = region.iter().map(|lp| loop_signed_area(lp)).sum();
        assert!((total - 96.0).abs() < 0.05, "area {total}");
    }

    #[test]
    fn test_unite_and_subtract_replace_curves() {
        let mut a = ClipperArea::default();
        a.add_curve(&Curve::rect(0.0, 0.0, 10.0, 10.0)).expect("add");
        let mut b = ClipperArea::default();
        b.add_curve(&Curve::rect(5.0, 0.0, 10.0, 10.0)).expect("add");

        a.unite(&b).expect("unite");
        let curves = a.curves();
        assert_eq!(curves.len(), 1);
        assert!(curves[0].is_ccw());
        assert!((area_of(&curves) - 150.0).abs() < 0.05);

        let mut hole = ClipperArea::default();
        hole.add_curve(&Curve::square(2.0, 2.0, 3.0)).expect("add");
        a.subtract(&hole).expect("subtract");
        let curves = a.curves();
        assert_eq!(curves.len(), 2);
        assert_eq!(curves.iter().filter(|c| !c.is_ccw()).count(), 1);
        assert!((area_of(&curves) - 141.0).abs() < 0.05);
    }

    #[test]
    fn test_subtract_everything_leaves_empty_region() {
        let mut a = ClipperArea::default();
        a.add_curve(&Curve::square(0.0, 0.0, 5.0)).expect("add");
        let mut b = ClipperArea::default();
        b.add_curve(&Curve::square(-1.0, -1.0, 7.0)).expect("add");
        a.subtract(&b).expect("subtract");
        assert!(a.curves().is_empty());
        let params = PocketParams::new(1.0, 0.5, PocketStrategy::Spiral);
        assert!(a.make_pocket(&params).expect("pocket").is_empty());
    }

    #[test]
    fn test_tool_too_big_gives_no_toolpath() {
        let mut area = ClipperArea::default();
        area.add_curve(&Curve::square(0.0, 0.0, 4.0)).expect("add");
        let params = PocketParams::new(3.0, 1.0, PocketStrategy::Spiral);
        assert!(area.make_pocket(&params).expect("pocket").is_empty());
    }

    #[test]
    fn test_single_offset_is_one_closed_loop() {
        let mut area = ClipperArea::default();
        area.add_curve(&Curve::square(0.0, 0.0, 20.0)).expect("add");
        let params = PocketParams::new(2.0, 1.0, PocketStrategy::SingleOffset);
        let curves = area.make_pocket(&params).expect("pocket");
        assert_eq!(curves.len(), 1);
        assert!(curves[0].is_closed(1e-9));
        let bbox = curves[0].bounding_box().unwrap();
        let inset = 2.0 + area.wall_clearance();
        assert!((bbox.x0 - inset).abs() < 0.02, "x0 {}", bbox.x0);
        assert!((bbox.x1 - (20.0 - inset)).abs() < 0.02, "x1 {}", bbox.x1);
    }

    #[test]
    fn test_coordinates_survive_clipper_truncation() {
        // clipper scales by 100 and truncates toward zero.
        for v in [12.34, -12.34, 0.0, 0.07, -0.07, 25.0 + 5.0 * 0.3f64.cos()] {
            let expected = (v * 100.0).round() as i64;
            assert_eq!((clipper_coord(v) * 100.0) as i64, expected, "value {v}");
        }
        let p = snap(Point::new(1.234_9, -0.005_1));
        assert!((p.x - 1.23).abs() < 1e-12 && (p.y + 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_fine_accuracy_arc_region_offsets() {
        let mut area = ClipperArea::new(0.01);
        area.add_curve(&Curve::circle(Point::new(0.0, 0.0), 20.0))
            .expect("add");
        let loops = area.loops();
        assert_eq!(loops.len(), 1);
        // Neighbouring samples stay several grid steps apart.
        let lp = &loops[0];
        for i in 0..lp.len() {
            let d = lp[i].distance(lp[(i + 1) % lp.len()]);
            assert!(d > 2.0 * CLIPPER_QUANTUM, "samples {d} apart");
        }
        let region = area.region();
        assert_eq!(area.offset(&region, -2.0).len(), 1);
    }

    #[test]
    fn test_spiral_rings_start_near_previous_end() {
        let mut area = ClipperArea::default();
        area.add_curve(&Curve::rect(0.0, 0.0, 30.0, 20.0)).expect("add");
        let params = PocketParams::new(1.0, 2.0, PocketStrategy::Spiral);
        let rings = area.make_pocket(&params).expect("pocket");
        assert!(rings.len() > 2);
        for pair in rings.windows(2) {
            let end = pair[0].end_point().expect("non-empty");
            let start = pair[1].start_point().expect("non-empty");
            let nearest = pair[1]
                .points()
                .map(|p| p.distance(end))
                .fold(f64::INFINITY, f64::min);
            assert!((start.distance(end) - nearest).abs() < 1e-9);
            // Concentric rings of a rectangle: the hop is one stepover diagonal.
            assert!(start.distance(end) < 2.0 * 2.0_f64.sqrt() + 0.1);
        }
    }

    #[test]
    fn test_spiral_from_center_reverses_ring_order() {
        let mut area = ClipperArea::default();
        area.add_curve(&Curve::square(0.0, 0.0, 20.0)).expect("add");
        let mut params = PocketParams::new(1.0, 1.5, PocketStrategy::Spiral);
        let outside_in = area.make_pocket(&params).expect("pocket");
        params.start_from_center = true;
        let inside_out = area.make_pocket(&params).expect("pocket");
        assert!(outside_in.len() > 3);
        assert_eq!(outside_in.len(), inside_out.len());

        let span = |c: &Curve| c.bounding_box().map(|b| b.width()).unwrap_or(0.0);
        assert!(span(&outside_in[0]) > span(outside_in.last().unwrap()));
        assert!(span(&inside_out[0]) < span(inside_out.last().unwrap()));
    }

    #[test]
    fn test_rejects_bad_params() {
        let mut area = ClipperArea::default();
        area.add_curve(&Curve::square(0.0, 0.0, 20.0)).expect("add");
        let params = PocketParams::new(1.0, -1.0, PocketStrategy::Spiral);
        assert_eq!(
            area.make_pocket(&params),
            Err(PocketError::InvalidStepover(-1.0))
        );
    }
}
