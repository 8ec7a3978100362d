use super::*;
use kurbo::PathEl;

fn vertices(path: &BezPath) -> Vec<Point> {
    path.elements()
        .iter()
        .filter_map(|el| match *el {
            PathEl::MoveTo(p) | PathEl::LineTo(p) => Some(p),
            _ => None,
        })
        .collect()
}

#[test]
fn short_input_is_polyline() {
    let pts = [Point::new(0.0, 0.0), Point::new(5.0, 0.0), Point::new(5.0, 5.0)];
    assert_eq!(vertices(&smooth_path(&pts, 20)), pts.to_vec());
    assert!(smooth_path(&[], 20).elements().is_empty());
}

#[test]
fn smoothed_curve_passes_through_every_sample() {
    let pts: Vec<Point> = (0..6)
        .map(|i| Point::new(f64::from(i) * 10.0, if i % 2 == 0 { 0.0 } else { 10.0 }))
        .collect();
    let out = vertices(&smooth_path(&pts, 20));
    for p in &pts {
        assert!(out.iter().any(|q| q.distance(*p) < 1e-9), "missing {p:?}");
    }
    assert_eq!(out.first(), pts.first());
    assert_eq!(out.last(), pts.last());
    // One segment per consecutive pair (len - 1 of them), 20 vertices each, plus the move_to.
    assert_eq!(out.len(), 1 + (pts.len() - 1) * 20);
}

#[test]
fn collinear_samples_stay_on_the_line() {
    let pts: Vec<Point> = (0..5).map(|i| Point::new(f64::from(i), 2.0)).collect();
    for p in vertices(&smooth_path(&pts, 8)) {
        assert!((p.y - 2.0).abs() < 1e-9);
    }
}
