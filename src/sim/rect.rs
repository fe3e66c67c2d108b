//! Axis-aligned rectangles in tile space
//!
//! Used for service road corridors, steep bands and avalanche zones. Edges
//! are half-open: a rectangle covers [left, right) x [top, bottom).

use glam::Vec2;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TileRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TileRect {
    pub fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left: left.min(right),
            top: top.min(bottom),
            right: left.max(right),
            bottom: top.max(bottom),
        }
    }

    /// Smallest rectangle containing every point (None for no points)
    pub fn bounding(points: &[Vec2]) -> Option<Self> {
        let first = points.first()?;
        let (mut min, mut max) = (*first, *first);
        for p in &points[1..] {
            min = min.min(*p);
            max = max.max(*p);
        }
        Some(Self::new(min.x, min.y, max.x, max.y))
    }

    #[inline]
    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    #[inline]
    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn center(&self) -> Vec2 {
        Vec2::new(
            (self.left + self.right) * 0.5,
            (self.top + self.bottom) * 0.5,
        )
    }

    #[inline]
    pub fn contains(&self, p: Vec2) -> bool {
        p.x >= self.left && p.x < self.right && p.y >= self.top && p.y < self.bottom
    }

    /// Open-interval overlap (touching edges do not intersect)
    pub fn intersects(&self, other: &TileRect) -> bool {
        self.left < other.right
            && self.right > other.left
            && self.top < other.bottom
            && self.bottom > other.top
    }

    /// Whether any part of the rectangle lies on row `row`
    #[inline]
    pub fn covers_row(&self, row: u32) -> bool {
        self.top < (row + 1) as f32 && self.bottom > row as f32
    }

    /// Clip to the world [0, width) x [0, height)
    pub fn clamped(&self, width: f32, height: f32) -> Self {
        Self::new(
            self.left.clamp(0.0, width),
            self.top.clamp(0.0, height),
            self.right.clamp(0.0, width),
            self.bottom.clamp(0.0, height),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_normalizes_corners() {
        let r = TileRect::new(5.0, 8.0, 1.0, 2.0);
        assert_eq!(r, TileRect::new(1.0, 2.0, 5.0, 8.0));
        assert_eq!(r.width(), 4.0);
        assert_eq!(r.height(), 6.0);
    }

    #[test]
    fn test_contains_half_open() {
        let r = TileRect::new(0.0, 0.0, 2.0, 2.0);
        assert!(r.contains(Vec2::new(0.0, 0.0)));
        assert!(r.contains(Vec2::new(1.99, 1.99)));
        assert!(!r.contains(Vec2::new(2.0, 1.0)));
        assert!(!r.contains(Vec2::new(1.0, -0.01)));
    }

    #[test]
    fn test_touching_rects_do_not_intersect() {
        let a = TileRect::new(0.0, 0.0, 2.0, 2.0);
        let b = TileRect::new(2.0, 0.0, 4.0, 2.0);
        let c = TileRect::new(1.5, 1.5, 3.0, 3.0);
        assert!(!a.intersects(&b));
        assert!(a.intersects(&c));
        assert!(c.intersects(&b));
    }

    #[test]
    fn test_bounding_and_rows() {
        let r = TileRect::bounding(&[
            Vec2::new(3.0, 4.5),
            Vec2::new(1.0, 6.2),
            Vec2::new(2.0, 5.0),
        ])
        .unwrap();
        assert_eq!(r, TileRect::new(1.0, 4.5, 3.0, 6.2));
        assert!(!r.covers_row(3));
        assert!(r.covers_row(4));
        assert!(r.covers_row(6));
        assert!(!r.covers_row(7));
        assert!(TileRect::bounding(&[]).is_none());
    }

    #[test]
    fn test_clamped() {
        let r = TileRect::new(-3.0, 5.0, 4.0, 70.0).clamped(40.0, 60.0);
        assert_eq!(r, TileRect::new(0.0, 5.0, 4.0, 60.0));
    }
}
