//! Hitboxes.

use engine_math::Rect;
use serde::{Deserialize, Serialize};

use super::impl_component;

/// Hitbox relative to the entity's position.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct Collision {
    pub rect: Rect,
    /// Sprite the hitbox was taken from, if any.
    pub name: String,
}

impl Collision {
    #[must_use]
    pub fn new(rect: Rect) -> Self {
        Self {
            rect,
            name: String::new(),
        }
    }

    #[must_use]
    pub fn named(rect: Rect, name: impl Into<String>) -> Self {
        Self {
            rect,
            name: name.into(),
        }
    }
}

impl_component!(Collision, "Collision");

/// Entities sharing an id never collide with each other.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ExcludeCollision {
    pub id: u64,
}

impl_component!(ExcludeCollision, "ExcludeCollision");
