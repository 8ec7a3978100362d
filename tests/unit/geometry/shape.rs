use super::*;
use kurbo::{PathEl, Shape};

fn points(path: &BezPath) -> Vec<Point> {
    path.elements()
        .iter()
        .filter_map(|el| match *el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(p),
            _ => None,
        })
        .collect()
}

#[test]
fn ids_round_trip_through_from_str() {
    for g in GeometryShape::ALL {
        assert_eq!(g.id().parse::<GeometryShape>().unwrap(), g);
    }
    assert!("hexagon".parse::<GeometryShape>().is_err());
}

#[test]
fn triangle_has_apex_top_middle() {
    let p = GeometryShape::Triangle.path(Point::new(0.0, 0.0), Point::new(10.0, 20.0), 4.0);
    let pts = points(&p);
    assert_eq!(pts[0], Point::new(5.0, 0.0));
    assert_eq!(pts[1], Point::new(10.0, 20.0));
    assert_eq!(pts[2], Point::new(0.0, 20.0));
}

#[test]
fn square_and_circle_fit_the_drag_rect_in_any_direction() {
    let sq = GeometryShape::Square.path(Point::new(30.0, 40.0), Point::new(10.0, 0.0), 4.0);
    assert_eq!(sq.bounding_box(), Rect::new(10.0, 0.0, 30.0, 40.0));

    let c = GeometryShape::Circle.path(Point::new(0.0, 0.0), Point::new(20.0, 10.0), 4.0);
    let bb = c.bounding_box();
    assert!((bb.x0 - 0.0).abs() < 0.2 && (bb.x1 - 20.0).abs() < 0.2);
    assert!((bb.y0 - 0.0).abs() < 0.2 && (bb.y1 - 10.0).abs() < 0.2);
}

#[test]
fn arrow_head_points_back_along_the_shaft() {
    let p = GeometryShape::Arrow.path(Point::new(0.0, 0.0), Point::new(60.0, 0.0), 10.0);
    let pts = points(&p);
    assert_eq!(pts.len(), 6);
    let (h1, h2) = (pts[3], pts[5]);
    // head length = 10/60 * 60 = 10
    assert!((h1.distance(Point::new(60.0, 0.0)) - 10.0).abs() < 1e-9);
    assert!(h1.x < 60.0 && h2.x < 60.0);
    assert!((h1.y + h2.y).abs() < 1e-9);
}

#[test]
fn vertical_arrow_does_not_divide_by_zero() {
    let p = GeometryShape::Arrow.path(Point::new(5.0, 50.0), Point::new(5.0, 0.0), 6.0);
    for pt in points(&p) {
        assert!(pt.x.is_finite() && pt.y.is_finite());
    }
}

#[test]
fn dot_is_centered() {
    let bb = dot_path(Point::new(10.0, 10.0), 3.0).bounding_box();
    assert!((bb.center().x - 10.0).abs() < 1e-6);
    assert!((bb.width() - 6.0).abs() < 0.1);
}
