use std::collections::HashMap;

/// Axis-aligned rectangle in screen space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Rect {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,
}

impl Rect {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self { x, y, width, height }
    }

    pub fn right(&self) -> f64 {
        self.x + self.width
    }

    pub fn bottom(&self) -> f64 {
        self.y + self.height
    }

    pub fn area(&self) -> f64 {
        self.width.max(0.0) * self.height.max(0.0)
    }

    /// Overlapping region, if the rectangles share a positive area.
    pub fn intersection(&self, other: &Rect) -> Option<Rect> {
        let left = self.x.max(other.x);
        let top = self.y.max(other.y);
        let right = self.right().min(other.right());
        let bottom = self.bottom().min(other.bottom());
        if right <= left || bottom <= top {
            return None;
        }
        Some(Rect::new(left, top, right - left, bottom - top))
    }
}

/// Where the renderer currently draws each node. A node mid-transition may
/// have no rectangle; callers skip it for that sample.
pub trait GeometrySource {
    fn rect(&self, node_id: &str) -> Option<Rect>;
}

impl GeometrySource for HashMap<String, Rect> {
    fn rect(&self, node_id: &str) -> Option<Rect> {
        self.get(node_id).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn intersection_of_overlapping_rects() {
        let a = Rect::new(0.0, 0.0, 100.0, 50.0);
        let b = Rect::new(80.0, 10.0, 100.0, 100.0);
        assert_eq!(a.intersection(&b), Some(Rect::new(80.0, 10.0, 20.0, 40.0)));
        assert_eq!(a.intersection(&b).map(|r| r.area()), Some(800.0));
    }

    #[test]
    fn touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        assert_eq!(a.intersection(&Rect::new(10.0, 0.0, 10.0, 10.0)), None);
        assert_eq!(a.intersection(&Rect::new(50.0, 50.0, 1.0, 1.0)), None);
    }
}
