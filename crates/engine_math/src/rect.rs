//! Axis-aligned rectangles.
//!
//! [`Rect`] stores its top-left corner and its size. Hitboxes are expressed
//! relative to an entity's position and turned into world-space rectangles
//! with [`Rect::translated`] or [`Rect::rotated_hitbox`].

use glam::Vec2;
use serde::{Deserialize, Serialize};

/// An axis-aligned rectangle given by its top-left corner and size.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Rect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl Rect {
    /// The empty rectangle at the origin.
    pub const ZERO: Self = Self::new(0.0, 0.0, 0.0, 0.0);

    #[must_use]
    pub const fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    /// Create a rectangle from its top-left corner and size.
    #[must_use]
    pub fn from_corner_size(corner: Vec2, size: Vec2) -> Self {
        Self::new(corner.x, corner.y, size.x, size.y)
    }

    /// Top-left corner.
    #[must_use]
    pub fn position(&self) -> Vec2 {
        Vec2::new(self.left, self.top)
    }

    #[must_use]
    pub fn size(&self) -> Vec2 {
        Vec2::new(self.width, self.height)
    }

    #[must_use]
    pub fn right(&self) -> f32 {
        self.left + self.width
    }

    #[must_use]
    pub fn bottom(&self) -> f32 {
        self.top + self.height
    }

    /// Returns `true` if the two rectangles overlap with a non-empty area.
    ///
    /// Rectangles that only share an edge do not intersect. Negative sizes
    /// are normalised first.
    #[must_use]
    pub fn intersects(&self, other: &Rect) -> bool {
        let (a_min, a_max) = self.bounds();
        let (b_min, b_max) = other.bounds();
        let min = a_min.max(b_min);
        let max = a_max.min(b_max);
        min.x < max.x && min.y < max.y
    }

    /// Returns `true` if `point` lies inside the rectangle.
    #[must_use]
    pub fn contains(&self, point: Vec2) -> bool {
        let (min, max) = self.bounds();
        point.x >= min.x && point.x < max.x && point.y >= min.y && point.y < max.y
    }

    /// The rectangle shifted by `offset`.
    #[must_use]
    pub fn translated(mut self, offset: Vec2) -> Self {
        self.left += offset.x;
        self.top += offset.y;
        self
    }

    /// World-space hitbox of an entity at `(x, y)` rotated by `rotation_deg`.
    ///
    /// `self` is the hitbox relative to the entity's position. The rotation is
    /// truncated to whole quarter turns (`rotation_deg / 90`); 1, 2 and 3
    /// quarter turns rotate the hitbox around the position, anything else
    /// leaves it unrotated.
    #[must_use]
    pub fn rotated_hitbox(&self, rotation_deg: f32, x: f32, y: f32) -> Self {
        match (rotation_deg / 90.0) as i32 {
            1 => Self::new(x - self.top - self.width, y + self.left, self.height, self.width),
            2 => Self::new(
                x - self.left - self.width,
                y - self.top - self.height,
                self.width,
                self.height,
            ),
            3 => Self::new(x + self.top, y - self.left - self.height, self.height, self.width),
            _ => self.translated(Vec2::new(x, y)),
        }
    }

    fn bounds(&self) -> (Vec2, Vec2) {
        let a = self.position();
        let b = a + self.size();
        (a.min(b), a.max(b))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_intersects_overlap() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(5.0, 5.0, 10.0, 10.0);
        assert!(a.intersects(&b));
        assert!(b.intersects(&a));
    }

    #[test]
    fn test_touching_edges_do_not_intersect() {
        let a = Rect::new(0.0, 0.0, 10.0, 10.0);
        let b = Rect::new(10.0, 0.0, 10.0, 10.0);
        assert!(!a.intersects(&b));
    }

    #[test]
    fn test_negative_size_is_normalised() {
        let a = Rect::new(10.0, 10.0, -10.0, -10.0);
        let b = Rect::new(5.0, 5.0, 1.0, 1.0);
        assert!(a.intersects(&b));
    }

    #[test]
    fn test_translated() {
        let r = Rect::new(1.0, 2.0, 3.0, 4.0).translated(Vec2::new(10.0, 20.0));
        assert_eq!(r, Rect::new(11.0, 22.0, 3.0, 4.0));
        assert_eq!(r.right(), 14.0);
        assert_eq!(r.bottom(), 26.0);
    }

    #[test]
    fn test_rotated_hitbox_quarter_turns() {
        let hitbox = Rect::new(1.0, 2.0, 10.0, 4.0);

        assert_eq!(hitbox.rotated_hitbox(0.0, 100.0, 50.0), Rect::new(101.0, 52.0, 10.0, 4.0));
        assert_eq!(hitbox.rotated_hitbox(90.0, 100.0, 50.0), Rect::new(88.0, 51.0, 4.0, 10.0));
        assert_eq!(hitbox.rotated_hitbox(180.0, 100.0, 50.0), Rect::new(89.0, 44.0, 10.0, 4.0));
        assert_eq!(hitbox.rotated_hitbox(270.0, 100.0, 50.0), Rect::new(102.0, 45.0, 4.0, 10.0));
    }

    #[test]
    fn test_rotation_truncates_and_wraps_to_default() {
        let hitbox = Rect::new(0.0, 0.0, 2.0, 2.0);
        // 135 degrees truncates to one quarter turn.
        assert_eq!(hitbox.rotated_hitbox(135.0, 0.0, 0.0), hitbox.rotated_hitbox(90.0, 0.0, 0.0));
        // 360 degrees is four quarter turns: unrotated.
        assert_eq!(hitbox.rotated_hitbox(360.0, 5.0, 5.0), Rect::new(5.0, 5.0, 2.0, 2.0));
    }

    #[test]
    fn test_contains() {
        let r = Rect::new(0.0, 0.0, 2.0, 2.0);
        assert!(r.contains(Vec2::new(1.0, 1.0)));
        assert!(!r.contains(Vec2::new(2.0, 1.0)));
    }

    #[test]
    fn test_rect_serialization_roundtrip() {
        let r = Rect::new(1.5, -2.0, 3.0, 4.0);
        let bytes = rmp_serde::to_vec(&r).unwrap();
        let restored: Rect = rmp_serde::from_slice(&bytes).unwrap();
        assert_eq!(r, restored);
    }
}
