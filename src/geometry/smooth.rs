use crate::foundation::core::{BezPath, Point};

pub const DEFAULT_GRANULARITY: usize = 20;

/// Catmull-Rom smoothing through every input point.
///
/// Fewer than four points yield the plain polyline. Endpoints are duplicated so the curve
/// starts and ends exactly on the first and last sample. The input is never modified.
pub fn smooth_path(points: &[Point], granularity: usize) -> BezPath {
    let mut path = BezPath::new();
    let Some(&first) = points.first() else {
        return path;
    };

    if points.len() < 4 {
        path.move_to(first);
        for &p in &points[1..] {
            path.line_to(p);
        }
        return path;
    }

    let granularity = granularity.max(1);
    let last = points[points.len() - 1];
    let mut padded = Vec::with_capacity(points.len() + 2);
    padded.push(first);
    padded.extend_from_slice(points);
    padded.push(last);

    path.move_to(first);
    for w in padded.windows(4) {
        let (p0, p1, p2, p3) = (w[0], w[1], w[2], w[3]);
        for i in 1..granularity {
            let t = i as f64 / granularity as f64;
            path.line_to(catmull_rom(p0, p1, p2, p3, t));
        }
        path.line_to(p2);
    }
    path
}

fn catmull_rom(p0: Point, p1: Point, p2: Point, p3: Point, t: f64) -> Point {
    let tt = t * t;
    let ttt = tt * t;
    let axis = |a: f64, b: f64, c: f64, d: f64| {
        0.5 * (2.0 * b
            + (c - a) * t
            + (2.0 * a - 5.0 * b + 4.0 * c - d) * tt
            + (3.0 * b - a - 3.0 * c + d) * ttt)
    };
    Point::new(
        axis(p0.x, p1.x, p2.x, p3.x),
        axis(p0.y, p1.y, p2.y, p3.y),
    )
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/smooth.rs"]
mod tests;
