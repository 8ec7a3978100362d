use super::*;

#[test]
fn restart_keeps_only_last_point() {
    let mut b = PathBuffer::starting_at(Point::new(0.0, 0.0));
    b.push(Point::new(1.0, 1.0));
    b.push(Point::new(2.0, 3.0));
    assert_eq!(b.len(), 3);
    b.restart_from_last();
    assert_eq!(b.points(), &[Point::new(2.0, 3.0)]);
}

#[test]
fn restart_on_empty_buffer_is_noop() {
    let mut b = PathBuffer::new();
    b.restart_from_last();
    assert!(b.is_empty());
    assert_eq!(b.first(), None);
}
