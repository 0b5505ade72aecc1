//! # engine_math
//!
//! Math types for the R-Type engine. Re-exports [`glam`] for vector algebra
//! and defines [`Rect`], the axis-aligned rectangle used for hitboxes and
//! texture regions.

pub mod rect;

// Re-export glam types for convenience.
pub use glam::{IVec2, Vec2};

pub use rect::Rect;
