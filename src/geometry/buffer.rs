use crate::foundation::core::Point;

/// Points collected during one gesture, in input order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct PathBuffer {
    points: Vec<Point>,
}

impl PathBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn starting_at(p: Point) -> Self {
        Self { points: vec![p] }
    }

    pub fn push(&mut self, p: Point) {
        self.points.push(p);
    }

    pub fn points(&self) -> &[Point] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn first(&self) -> Option<Point> {
        self.points.first().copied()
    }

    pub fn last(&self) -> Option<Point> {
        self.points.last().copied()
    }

    pub fn clear(&mut self) {
        self.points.clear();
    }

    /// Drop everything except the latest point, so the next segment continues seamlessly.
    pub fn restart_from_last(&mut self) {
        if let Some(last) = self.last() {
            self.points.clear();
            self.points.push(last);
        }
    }
}

#[cfg(test)]
#[path = "../../tests/unit/geometry/buffer.rs"]
mod tests;
