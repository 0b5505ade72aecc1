//! Position and movement.

use engine_math::Vec2;
use serde::{Deserialize, Serialize};

use super::impl_component;

/// Pixel position of an entity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Position {
    pub x: i32,
    pub y: i32,
}

impl Position {
    #[must_use]
    pub const fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }

    #[must_use]
    pub fn as_vec2(&self) -> Vec2 {
        Vec2::new(self.x as f32, self.y as f32)
    }
}

impl_component!(Position, "Position");

/// Movement speed, in pixels per move.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Speed {
    pub speed: f32,
}

impl_component!(Speed, "Speed");

/// A timed move from `initial_pos` by `move_amount`.
///
/// The physics system interpolates the entity's [`Position`] over
/// `move_duration_ms` starting at `start_ms`, then removes this component.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Moving {
    pub initial_pos: Vec2,
    pub move_amount: Vec2,
    /// Always at least 1.
    pub move_duration_ms: u64,
    pub start_ms: u64,
}

impl Moving {
    /// A move starting at `start_ms`. A zero duration becomes 1 ms.
    #[must_use]
    pub fn new(initial_pos: Vec2, move_amount: Vec2, move_duration_ms: u64, start_ms: u64) -> Self {
        Self {
            initial_pos,
            move_amount,
            move_duration_ms: move_duration_ms.max(1),
            start_ms,
        }
    }

    /// Fraction of the move completed at `now_ms`, in `0.0..=1.0`.
    #[must_use]
    pub fn progress(&self, now_ms: u64) -> f32 {
        let elapsed = now_ms.saturating_sub(self.start_ms) as f64;
        (elapsed / self.move_duration_ms as f64).min(1.0) as f32
    }

    /// Where the move ends.
    #[must_use]
    pub fn target(&self) -> Vec2 {
        self.initial_pos + self.move_amount
    }
}

impl_component!(Moving, "Moving");
