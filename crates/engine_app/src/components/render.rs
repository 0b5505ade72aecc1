//! Display state. Nothing here draws; it only records what a renderer would
//! need and what the animation and parallax systems update.

use engine_math::{Rect, Vec2};
use serde::{Deserialize, Serialize};

use super::impl_component;

/// A sprite: texture name, size and orientation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Renderable {
    pub texture: String,
    /// Texture size in pixels.
    pub size: Vec2,
    /// Degrees; hitboxes follow quarter turns.
    pub rotation: f32,
    pub scale: Vec2,
    /// Draw order; higher draws last.
    pub priority: i32,
    pub is_displayed: bool,
    /// Visible region of the texture, set by the animation system.
    pub texture_rect: Option<Rect>,
}

impl Renderable {
    #[must_use]
    pub fn new(texture: impl Into<String>, size: Vec2) -> Self {
        Self {
            texture: texture.into(),
            size,
            rotation: 0.0,
            scale: Vec2::ONE,
            priority: 0,
            is_displayed: true,
            texture_rect: None,
        }
    }

    #[must_use]
    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }
}

impl_component!(Renderable, "Renderable");

/// Sprite-sheet animation.
///
/// Frame `n` shows `texture_rect` shifted right by `n * tile_size.x`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Animation {
    pub texture_rect: Rect,
    pub tile_size: Vec2,
    pub frame: u32,
    /// Milliseconds between frames.
    pub speed_ms: u64,
    pub frame_count: u32,
    pub do_animation: bool,
    /// Timestamp of the last frame change.
    pub last_frame_ms: u64,
}

impl Animation {
    #[must_use]
    pub fn new(texture_rect: Rect, tile_size: Vec2, speed_ms: u64, frame_count: u32) -> Self {
        Self {
            texture_rect,
            tile_size,
            frame: 0,
            speed_ms,
            frame_count,
            do_animation: true,
            last_frame_ms: 0,
        }
    }

    /// Texture region of the current frame.
    #[must_use]
    pub fn frame_rect(&self) -> Rect {
        Rect {
            left: self.texture_rect.left + self.tile_size.x * self.frame as f32,
            ..self.texture_rect
        }
    }
}

impl_component!(Animation, "Animation");

/// Background depth of a parallax layer.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum ParallaxLayer {
    FarBackground,
    MidBackground,
    NearBackground,
}

/// A scrolling background layer. Local only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct Parallax {
    pub layer: ParallaxLayer,
    /// Pixels scrolled per frame.
    pub speed: f32,
    pub offset: Vec2,
}

impl Parallax {
    #[must_use]
    pub fn new(layer: ParallaxLayer, speed: f32) -> Self {
        Self {
            layer,
            speed,
            offset: Vec2::ZERO,
        }
    }
}

impl_component!(Parallax, "Parallax", local);
