//! Events broadcast by the engine and its systems.

use engine_ecs::EntityId;
use engine_net::KeyEvent;

/// `moving` ran into `colliding` while following its [`Moving`] path.
///
/// [`Moving`]: crate::components::Moving
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollisionEvent {
    pub moving: EntityId,
    pub colliding: EntityId,
}

/// The view changed size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResizeEvent {
    pub width: u32,
    pub height: u32,
}

/// A key went down for [`World::current_player`].
///
/// [`World::current_player`]: engine_ecs::World::current_player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyPressedEvent(pub KeyEvent);

/// A key went up for [`World::current_player`].
///
/// [`World::current_player`]: engine_ecs::World::current_player
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyReleasedEvent(pub KeyEvent);

/// `player` lost their ship.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PlayerDeathEvent {
    pub player: usize,
}
