use crate::geometry::curve::Curve;
use kurbo::Point;

/// Ray-casting point-in-polygon test against a line-only curve.
///
/// Curves with fewer than three vertices never contain anything. Running this
/// on a curve that still has arcs tests the chord polygon, not the arcs.
pub fn contains_point(curve: &Curve, point: Point) -> bool {
    let points: Vec<Point> = curve.points().collect();
    loop_contains_point(&points, point)
}

/// Ray-casting parity test on a plain point loop (implicitly closed).
pub fn loop_contains_point(points: &[Point], point: Point) -> bool {
    if points.len() < 3 {
        return false;
    }
    let mut inside = false;
    let mut j = points.len() - 1;
    for i in 0..points.len() {
        let (a, b) = (points[i], points[j]);
        if ((a.y > point.y) != (b.y > point.y))
            && (point.x < (b.x - a.x) * (point.y - a.y) / (b.y - a.y) + a.x)
        {
            inside = !inside;
        }
        j = i;
    }
    inside
}

/// Shoelace area of a point loop (implicitly closed).
pub fn loop_signed_area(points: &[Point]) -> f64 {
    let n = points.len();
    let mut sum = 0.0;
    for i in 0..n {
        let a = points[i];
        let b = points[(i + 1) % n];
        sum += a.x * b.y - b.x * a.y;
    }
    sum * 0.5
}

/// Strip an explicit closing point and consecutive duplicates from a loop.
pub fn open_loop(points: &[Point], tolerance: f64) -> Vec<Point> {
    let mut clean: Vec<Point> = Vec::with_capacity(points.len());
    for &p in points {
        match clean.last() {
            Some(prev) if prev.distance(p) <= tolerance => {}
            _ => clean.push(p),
        }
    }
    if clean.len() > 1 {
        if let (Some(first), Some(last)) = (clean.first(), clean.last()) {
            if first.distance(*last) <= tolerance {
                clean.pop();
            }
        }
    }
    clean
}

/// Turn open loops into closed line curves, outers counter-clockwise and
/// holes clockwise.
///
/// A loop's role comes from how many other loops contain it: even depth is
/// material, odd depth is a hole.
pub fn orient_loops(loops: Vec<Vec<Point>>) -> Vec<Curve> {
    let loops: Vec<Vec<Point>> = loops.into_iter().filter(|l| l.len() >= 3).collect();
    let mut curves = Vec::with_capacity(loops.len());
    for (i, lp) in loops.iter().enumerate() {
        let depth = loops
            .iter()
            .enumerate()
            .filter(|(j, other)| *j != i && loop_contains_point(other, lp[0]))
            .count();
        let want_ccw = depth % 2 == 0;
        let is_ccw = loop_signed_area(lp) > 0.0;

        let mut points = lp.clone();
        if want_ccw != is_ccw {
            points.reverse();
        }
        points.push(points[0]);
        let coords: Vec<(f64, f64)> = points.iter().map(|p| (p.x, p.y)).collect();
        curves.push(Curve::from_points(&coords));
    }
    curves
}
