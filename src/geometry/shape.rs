use std::f64::consts::{FRAC_PI_2, FRAC_PI_6, PI};

use kurbo::Shape;

use crate::foundation::core::{BezPath, Point, Rect};
use crate::foundation::error::FlipbookError;

const TOLERANCE: f64 = 0.1;

/// Canonical shapes drawn between the first and last point of a gesture.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GeometryShape {
    Triangle,
    Circle,
    Square,
    Line,
    Arrow,
}

impl GeometryShape {
    pub const ALL: [GeometryShape; 5] = [
        GeometryShape::Triangle,
        GeometryShape::Circle,
        GeometryShape::Square,
        GeometryShape::Line,
        GeometryShape::Arrow,
    ];

    pub fn id(self) -> &'static str {
        match self {
            GeometryShape::Triangle => "triangle",
            GeometryShape::Circle => "circle",
            GeometryShape::Square => "square",
            GeometryShape::Line => "line",
            GeometryShape::Arrow => "arrow",
        }
    }

    /// Outline of this shape spanning `start` to `end`.
    ///
    /// `line_width` only matters for the arrow, whose head grows with the stroke width.
    pub fn path(self, start: Point, end: Point, line_width: f64) -> BezPath {
        match self {
            GeometryShape::Triangle => {
                let apex = Point::new((start.x + end.x) / 2.0, start.y);
                let mut p = BezPath::new();
                p.move_to(apex);
                p.line_to(end);
                p.line_to(Point::new(start.x, end.y));
                p.close_path();
                p
            }
            GeometryShape::Circle => {
                kurbo::Ellipse::from_rect(Rect::from_points(start, end)).to_path(TOLERANCE)
            }
            GeometryShape::Square => Rect::from_points(start, end).to_path(TOLERANCE),
            GeometryShape::Line => {
                let mut p = BezPath::new();
                p.move_to(start);
                p.line_to(end);
                p
            }
            GeometryShape::Arrow => arrow_path(start, end, line_width),
        }
    }
}

impl std::str::FromStr for GeometryShape {
    type Err = FlipbookError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        GeometryShape::ALL
            .into_iter()
            .find(|g| g.id() == s)
            .ok_or_else(|| FlipbookError::validation(format!("unknown shape '{s}'")))
    }
}

/// Shaft from `start` to `end` plus two head strokes at +-30 degrees.
///
/// Head length is `line_width / 60` of the shaft length.
fn arrow_path(start: Point, end: Point, line_width: f64) -> BezPath {
    let v = end - start;
    let angle = if v.x.abs() < 1.0e-7 {
        if v.y < 0.0 { -FRAC_PI_2 } else { FRAC_PI_2 }
    } else {
        (v.y / v.x).atan() + if v.x < 0.0 { PI } else { 0.0 }
    };
    let head_len = (line_width / 60.0) * v.hypot();
    let head = |delta: f64| {
        let a = PI - angle + delta;
        Point::new(end.x + head_len * a.cos(), end.y - head_len * a.sin())
    };

    let mut p = BezPath::new();
    p.move_to(start);
    p.line_to(end);
    p.move_to(end);
    p.line_to(head(FRAC_PI_6));
    p.move_to(end);
    p.line_to(head(-FRAC_PI_6));
    p
}

/// Filled disc used for single-point strokes.
pub fn dot_path(center: Point, radius: f64) -> BezPath {
    kurbo::Circle::new(center, radius.max(0.5)).to_path(TOLERANCE)
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/shape.rs"]
mod tests;
