//! Raster clearing passes over an already offset region.

use crate::engine::PocketParams;
use crate::geometry::polygon::loop_contains_point;
use crate::geometry::{Curve, PocketCurve, Point};
use kurbo::{Affine, Line, ParamCurveNearest};

/// A chain of connected raster rows, in raster coordinates.
struct Chain {
    points: Vec<Point>,
    last_row: usize,
}

/// Back-and-forth passes across `region` (outer loops counter-clockwise,
/// holes clockwise), rows no further apart than the stepover.
///
/// Consecutive rows are joined into one curve only when the connecting move
/// stays inside the region; otherwise a new curve starts.
pub(crate) fn zigzag_passes(
    region: &[Vec<Point>],
    params: &PocketParams,
    accuracy: f64,
) -> Vec<PocketCurve> {
    let to_raster = Affine::rotate(-params.zig_angle.to_radians());
    let from_raster = to_raster.inverse();
    let loops: Vec<Vec<Point>> = region
        .iter()
        .map(|lp| lp.iter().map(|&p| to_raster * p).collect())
        .collect();

    let (min_y, max_y) = loops
        .iter()
        .flatten()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), p| {
            (lo.min(p.y), hi.max(p.y))
        });
    let height = max_y - min_y;
    if !height.is_finite() || height <= 0.0 {
        return Vec::new();
    }

    let rows = (height / params.stepover).ceil().max(1.0) as usize;
    let spacing = height / rows as f64;
    let nudge = (spacing * 1e-3).min(accuracy);

    let mut chains: Vec<Chain> = Vec::new();
    for row in 0..=rows {
        let y = if row == 0 {
            min_y + nudge
        } else if row == rows {
            max_y - nudge
        } else {
            min_y + spacing * row as f64
        };

        for (x0, x1) in row_spans(&loops, y) {
            let (start, end) = if row % 2 == 0 {
                (Point::new(x0, y), Point::new(x1, y))
            } else {
                (Point::new(x1, y), Point::new(x0, y))
            };

            let linked = chains.iter_mut().find(|chain| {
                row > 0
                    && chain.last_row == row - 1
                    && chain.points.last().is_some_and(|&tail| {
                        move_stays_inside(&loops, tail, start, spacing, accuracy)
                    })
            });
            match linked {
                Some(chain) => {
                    chain.points.push(start);
                    chain.points.push(end);
                    chain.last_row = row;
                }
                None => chains.push(Chain {
                    points: vec![start, end],
                    last_row: row,
                }),
            }
        }
    }

    chains
        .into_iter()
        .map(|chain| {
            let coords: Vec<(f64, f64)> = chain
                .points
                .iter()
                .map(|&p| from_raster * p)
                .map(|p| (p.x, p.y))
                .collect();
            Curve::from_points(&coords)
        })
        .collect()
}

/// Inside spans of the horizontal line at `y`, left to right.
fn row_spans(loops: &[Vec<Point>], y: f64) -> Vec<(f64, f64)> {
    let mut xs: Vec<f64> = Vec::new();
    for lp in loops {
        let n = lp.len();
        for i in 0..n {
            let (a, b) = (lp[i], lp[(i + 1) % n]);
            if (a.y > y) != (b.y > y) {
                xs.push(a.x + (y - a.y) * (b.x - a.x) / (b.y - a.y));
            }
        }
    }
    xs.sort_by(f64::total_cmp);
    xs.chunks_exact(2)
        .map(|pair| (pair[0], pair[1]))
        .filter(|(x0, x1)| x1 - x0 > 1e-9)
        .collect()
}

fn inside_or_on(loops: &[Vec<Point>], p: Point, tolerance: f64) -> bool {
    let crossings = loops.iter().filter(|lp| loop_contains_point(lp, p)).count();
    if crossings % 2 == 1 {
        return true;
    }
    loops.iter().any(|lp| {
        let n = lp.len();
        (0..n).any(|i| {
            let edge = Line::new(lp[i], lp[(i + 1) % n]);
            edge.nearest(p, 1e-9).distance_sq <= tolerance * tolerance
        })
    })
}

/// Sample the straight move from `from` to `to` and check every sample is in
/// the region or on its edge.
fn move_stays_inside(
    loops: &[Vec<Point>],
    from: Point,
    to: Point,
    spacing: f64,
    accuracy: f64,
) -> bool {
    let len = from.distance(to);
    let samples = ((len / (spacing * 0.25)).ceil() as usize).max(3);
    (1..samples).all(|i| {
        let t = i as f64 / samples as f64;
        inside_or_on(loops, from.lerp(to, t), accuracy)
    })
}
