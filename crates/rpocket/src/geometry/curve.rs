use crate::error::PocketError;
use crate::geometry::sampling::{arc_sweep, sample_arc, ARC_EPSILON};
use kurbo::{Point, Rect};
use serde::{Deserialize, Serialize};

/// Accuracy used by [`Curve::linearized`] when given a non-positive value.
pub const DEFAULT_ACCURACY: f64 = 0.1;

/// How a curve travels from the previous vertex to this one.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum SegmentKind {
    /// A straight line. Also used for the start vertex.
    Line,
    /// An arc turning left (counter-clockwise) around `center`.
    CcwArc { center: Point },
    /// An arc turning right (clockwise) around `center`.
    CwArc { center: Point },
}

impl SegmentKind {
    /// The same segment travelled backwards: lines stay lines, arcs swap direction.
    pub fn flipped(self) -> Self {
        match self {
            SegmentKind::Line => SegmentKind::Line,
            SegmentKind::CcwArc { center } => SegmentKind::CwArc { center },
            SegmentKind::CwArc { center } => SegmentKind::CcwArc { center },
        }
    }

    pub fn center(&self) -> Option<Point> {
        match self {
            SegmentKind::Line => None,
            SegmentKind::CcwArc { center } | SegmentKind::CwArc { center } => Some(*center),
        }
    }

    pub fn is_arc(&self) -> bool {
        !matches!(self, SegmentKind::Line)
    }
}

/// One vertex of a [`Curve`]: the end point of the segment arriving here.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Vertex {
    pub point: Point,
    pub kind: SegmentKind,
}

impl Vertex {
    pub fn line(point: Point) -> Self {
        Self {
            point,
            kind: SegmentKind::Line,
        }
    }

    pub fn ccw_arc(end: Point, center: Point) -> Self {
        Self {
            point: end,
            kind: SegmentKind::CcwArc { center },
        }
    }

    pub fn cw_arc(end: Point, center: Point) -> Self {
        Self {
            point: end,
            kind: SegmentKind::CwArc { center },
        }
    }
}

/// A 2-D path made of line and circular arc segments.
///
/// Vertex 0 is the start point. Every later vertex describes the segment from
/// its predecessor: the segment kind, its end point and, for arcs, the center.
/// Boundaries wind counter-clockwise and islands clockwise (Y-up frame).
/// Pocket toolpaths use the same representation but need not be closed.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(try_from = "RawCurve", into = "RawCurve")]
pub struct Curve {
    vertices: Vec<Vertex>,
}

/// Toolpath curve emitted by a pocketing engine.
pub type PocketCurve = Curve;

impl Curve {
    /// Start a curve at `start`.
    pub fn new(start: Point) -> Self {
        Self {
            vertices: vec![Vertex::line(start)],
        }
    }

    /// Build a curve from raw vertices. The first vertex must be a plain start point.
    pub fn from_vertices(vertices: Vec<Vertex>) -> Result<Self, PocketError> {
        if let Some(first) = vertices.first() {
            if first.kind.is_arc() {
                return Err(PocketError::MalformedCurve(
                    "the start vertex cannot carry an arc".to_string(),
                ));
            }
        }
        Ok(Self { vertices })
    }

    /// Build a line-only curve through the given points.
    pub fn from_points(points: &[(f64, f64)]) -> Self {
        Self {
            vertices: points
                .iter()
                .map(|(x, y)| Vertex::line(Point::new(*x, *y)))
                .collect(),
        }
    }

    /// Append a line to `end`. On an empty curve this sets the start point.
    pub fn line_to(mut self, end: Point) -> Self {
        self.vertices.push(Vertex::line(end));
        self
    }

    /// Append an arc to `end` around `center`. On an empty curve only the
    /// start point is recorded.
    pub fn arc_to(mut self, end: Point, center: Point, ccw: bool) -> Self {
        if self.vertices.is_empty() {
            self.vertices.push(Vertex::line(end));
        } else if ccw {
            self.vertices.push(Vertex::ccw_arc(end, center));
        } else {
            self.vertices.push(Vertex::cw_arc(end, center));
        }
        self
    }

    /// Counter-clockwise rectangle with an explicit closing vertex.
    pub fn rect(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self::from_points(&[
            (x, y),
            (x + width, y),
            (x + width, y + height),
            (x, y + height),
            (x, y),
        ])
    }

    /// Counter-clockwise square.
    pub fn square(x: f64, y: f64, size: f64) -> Self {
        Self::rect(x, y, size, size)
    }

    /// Counter-clockwise circle made of four quarter arcs.
    pub fn circle(center: Point, radius: f64) -> Self {
        let (cx, cy, r) = (center.x, center.y, radius);
        Self::new(Point::new(cx + r, cy))
            .arc_to(Point::new(cx, cy + r), center, true)
            .arc_to(Point::new(cx - r, cy), center, true)
            .arc_to(Point::new(cx, cy - r), center, true)
            .arc_to(Point::new(cx + r, cy), center, true)
    }

    pub fn vertices(&self) -> &[Vertex] {
        &self.vertices
    }

    pub fn is_empty(&self) -> bool {
        self.vertices.is_empty()
    }

    pub fn start_point(&self) -> Option<Point> {
        self.vertices.first().map(|v| v.point)
    }

    pub fn end_point(&self) -> Option<Point> {
        self.vertices.last().map(|v| v.point)
    }

    /// Number of segments (vertices after the start point).
    pub fn segment_count(&self) -> usize {
        self.vertices.len().saturating_sub(1)
    }

    /// Whether the last vertex lands within `tolerance` of the start.
    pub fn is_closed(&self, tolerance: f64) -> bool {
        match (self.vertices.first(), self.vertices.last()) {
            (Some(first), Some(last)) if self.vertices.len() >= 2 => {
                first.point.distance(last.point) <= tolerance
            }
            _ => false,
        }
    }

    pub fn is_line_only(&self) -> bool {
        self.vertices.iter().all(|v| !v.kind.is_arc())
    }

    /// Trace the same closed path in the opposite direction, flipping arcs.
    ///
    /// Reversed segment `k` (1..=N) ends at the old vertex `N - k` and takes
    /// its kind and center from the old vertex `N - k + 1`, because a segment's
    /// kind lives on its end vertex.
    pub fn reversed(&self) -> Self {
        if self.vertices.len() < 2 {
            return self.clone();
        }
        let n = self.vertices.len() - 1;

        let mut vertices = Vec::with_capacity(self.vertices.len());
        vertices.push(Vertex::line(self.vertices[0].point));
        for k in 1..=n {
            let segment = self.vertices[n - k + 1];
            let end = self.vertices[n - k];
            vertices.push(Vertex {
                point: end.point,
                kind: segment.kind.flipped(),
            });
        }
        Self { vertices }
    }

    /// Replace every arc by a chain of equal-angle line segments no longer
    /// than `accuracy` along the arc. The result holds only line vertices.
    pub fn linearized(&self, accuracy: f64) -> Self {
        let step = if accuracy.is_finite() && accuracy > 0.0 {
            accuracy
        } else {
            DEFAULT_ACCURACY
        };
        let Some(first) = self.vertices.first() else {
            return self.clone();
        };

        let mut vertices = vec![Vertex::line(first.point)];
        let mut current = first.point;
        for v in &self.vertices[1..] {
            match v.kind {
                SegmentKind::Line => vertices.push(Vertex::line(v.point)),
                SegmentKind::CcwArc { center } | SegmentKind::CwArc { center } => {
                    let ccw = matches!(v.kind, SegmentKind::CcwArc { .. });
                    if (current - center).hypot() < ARC_EPSILON {
                        vertices.push(Vertex::line(v.point));
                    } else {
                        sample_arc(current, v.point, center, ccw, step, |p| {
                            vertices.push(Vertex::line(p))
                        });
                    }
                }
            }
            current = v.point;
        }
        Self { vertices }
    }

    /// Axis-aligned box over the raw vertex positions.
    ///
    /// Arc bulges are ignored, so for arc curves this can be smaller than the
    /// true extent; linearize first when a tight box is needed.
    pub fn bounding_box(&self) -> Option<Rect> {
        let mut points = self.vertices.iter().map(|v| v.point);
        let first = points.next()?;
        Some(points.fold(Rect::from_points(first, first), |rect, p| rect.union_pt(p)))
    }

    /// Shoelace area over the vertex positions. Positive means counter-clockwise.
    pub fn signed_area(&self) -> f64 {
        let n = self.vertices.len();
        let mut sum = 0.0;
        for i in 0..n {
            let a = self.vertices[i].point;
            let b = self.vertices[(i + 1) % n].point;
            sum += a.x * b.y - b.x * a.y;
        }
        sum * 0.5
    }

    pub fn is_ccw(&self) -> bool {
        self.signed_area() > 0.0
    }

    /// Length of the path, measuring arcs along the circle.
    pub fn length(&self) -> f64 {
        let mut total = 0.0;
        for pair in self.vertices.windows(2) {
            let (prev, v) = (pair[0].point, pair[1]);
            total += match v.kind {
                SegmentKind::Line => prev.distance(v.point),
                SegmentKind::CcwArc { center } => {
                    arc_sweep(prev, v.point, center, true).length()
                }
                SegmentKind::CwArc { center } => {
                    arc_sweep(prev, v.point, center, false).length()
                }
            };
        }
        total
    }

    /// Points of the polyline, for curves that are already line-only.
    pub fn points(&self) -> impl Iterator<Item = Point> + '_ {
        self.vertices.iter().map(|v| v.point)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum ArcTag {
    Ccw,
    Cw,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawVertex {
    x: f64,
    y: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    arc: Option<ArcTag>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    center: Option<(f64, f64)>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RawCurve {
    vertices: Vec<RawVertex>,
}

impl TryFrom<RawCurve> for Curve {
    type Error = PocketError;

    fn try_from(raw: RawCurve) -> Result<Self, Self::Error> {
        let mut vertices = Vec::with_capacity(raw.vertices.len());
        for (index, v) in raw.vertices.into_iter().enumerate() {
            let point = Point::new(v.x, v.y);
            let kind = match (v.arc, v.center) {
                (None, _) => SegmentKind::Line,
                (Some(_), None) => {
                    return Err(PocketError::MalformedCurve(format!(
                        "arc vertex {index} has no center"
                    )))
                }
                (Some(ArcTag::Ccw), Some((cx, cy))) => SegmentKind::CcwArc {
                    center: Point::new(cx, cy),
                },
                (Some(ArcTag::Cw), Some((cx, cy))) => SegmentKind::CwArc {
                    center: Point::new(cx, cy),
                },
            };
            vertices.push(Vertex { point, kind });
        }
        Curve::from_vertices(vertices)
    }
}

impl From<Curve> for RawCurve {
    fn from(curve: Curve) -> Self {
        let vertices = curve
            .vertices
            .into_iter()
            .map(|v| {
                let (arc, center) = match v.kind {
                    SegmentKind::Line => (None, None),
                    SegmentKind::CcwArc { center } => {
                        (Some(ArcTag::Ccw), Some((center.x, center.y)))
                    }
                    SegmentKind::CwArc { center } => {
                        (Some(ArcTag::Cw), Some((center.x, center.y)))
                    }
                };
                RawVertex {
                    x: v.point.x,
                    y: v.point.y,
                    arc,
                    center,
                }
            })
            .collect();
        RawCurve { vertices }
    }
}
