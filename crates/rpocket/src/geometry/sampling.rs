use kurbo::Point;
use std::f64::consts::PI;

/// Radius below which an arc is treated as degenerate and produces no samples.
pub const ARC_EPSILON: f64 = 1e-10;

/// Segments shorter than this produce no samples.
pub const LINE_EPSILON: f64 = 1e-10;

/// Angular extent of an arc from `start` to `end` around `center`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ArcSweep {
    pub radius: f64,
    /// Angle of `start` relative to the center, as returned by `atan2`.
    pub start_angle: f64,
    /// Swept angle in the arc's direction, always in (0, 2π].
    pub sweep: f64,
}

impl ArcSweep {
    pub fn length(&self) -> f64 {
        self.radius * self.sweep
    }
}

/// Compute the sweep of an arc travelled counter-clockwise (`ccw`) or clockwise.
///
/// A non-positive raw difference wraps by a full turn, so coincident start and
/// end points describe a full circle.
pub fn arc_sweep(start: Point, end: Point, center: Point, ccw: bool) -> ArcSweep {
    let radius = (start - center).hypot();
    let a0 = (start.y - center.y).atan2(start.x - center.x);
    let a1 = (end.y - center.y).atan2(end.x - center.x);
    let mut sweep = if ccw { a1 - a0 } else { a0 - a1 };
    if sweep <= 0.0 {
        sweep += 2.0 * PI;
    }
    ArcSweep {
        radius,
        start_angle: a0,
        sweep,
    }
}

/// Sample a line segment every `step` units of length, excluding `p0` and
/// including `p1`.
pub fn sample_line(p0: Point, p1: Point, step: f64, mut emit: impl FnMut(Point)) {
    let delta = p1 - p0;
    let len = delta.hypot();
    if len <= LINE_EPSILON {
        return;
    }
    let n = ((len / step).ceil() as usize).max(1);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        emit(p0 + delta * t);
    }
}

/// Sample an arc every `step` units of arc length, excluding `start`.
///
/// Arcs with a radius below [`ARC_EPSILON`] emit nothing.
pub fn sample_arc(
    start: Point,
    end: Point,
    center: Point,
    ccw: bool,
    step: f64,
    mut emit: impl FnMut(Point),
) {
    let arc = arc_sweep(start, end, center, ccw);
    if arc.radius < ARC_EPSILON {
        return;
    }
    let n = ((arc.length() / step).ceil() as usize).max(1);
    let d_angle = if ccw { 1.0 } else { -1.0 } * arc.sweep / n as f64;
    for i in 1..=n {
        let a = arc.start_angle + i as f64 * d_angle;
        emit(Point::new(
            center.x + arc.radius * a.cos(),
            center.y + arc.radius * a.sin(),
        ));
    }
}
