//! Gameplay state shared by every R-Type world.

use engine_ecs::EntityId;
use serde::{Deserialize, Serialize};

use super::impl_component;

/// Points earned so far.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Score {
    pub score: i32,
}

impl_component!(Score, "Score");

/// Hit points.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Health {
    pub hp: i32,
}

impl Health {
    #[must_use]
    pub fn is_dead(&self) -> bool {
        self.hp <= 0
    }
}

impl_component!(Health, "Health");

/// The ship controlled by player `id`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Player {
    pub id: usize,
}

impl_component!(Player, "Player");

/// Marks hostile entities.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct Enemy;

impl_component!(Enemy, "Enemy");

/// Points at another entity (a ship's shot, a turret's base).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Link {
    pub entity: EntityId,
}

impl_component!(Link, "Link");

/// Level scroll progress.
///
/// `progress` grows by 50 units per second since `starting_ms`, which is 0
/// until the world's first tick.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct WorldMoveProgress {
    pub starting_ms: u64,
    pub progress: u64,
    pub speed: u64,
}

impl_component!(WorldMoveProgress, "WorldMoveProgress");
