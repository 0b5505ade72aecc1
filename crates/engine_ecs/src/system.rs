//! System trait and scheduling.

use crate::world::World;

/// When a system runs within [`World::tick`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Schedule {
    /// Once per player, with [`World::current_player`] set to that player.
    #[default]
    PerPlayer,
    /// Once per frame after every per-player pass, as the own player.
    OncePerFrame,
}

/// Logic that runs over a world every frame.
///
/// Systems are owned by the world. While a system ticks it is detached from
/// the world, so `tick` receives the world mutably.
pub trait System {
    /// Called once when the system is added. Subscribe to events here.
    fn configure(&mut self, _world: &mut World) {}

    /// Called once when the system is removed.
    fn unconfigure(&mut self, _world: &mut World) {}

    /// Advance the system by one frame.
    fn tick(&mut self, world: &mut World);

    /// When this system runs.
    fn schedule(&self) -> Schedule {
        Schedule::PerPlayer
    }
}

/// Player bookkeeping for the current world.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Players {
    amount: usize,
    current: usize,
    own: usize,
}

impl Players {
    /// A single local player.
    #[must_use]
    pub fn new() -> Self {
        Self {
            amount: 1,
            current: 0,
            own: 0,
        }
    }

    /// Number of players; never below 1.
    #[must_use]
    pub fn amount(&self) -> usize {
        self.amount
    }

    /// The player systems are currently ticking for.
    #[must_use]
    pub fn current(&self) -> usize {
        self.current
    }

    /// The player controlled by this process.
    #[must_use]
    pub fn own(&self) -> usize {
        self.own
    }

    pub(crate) fn set_amount(&mut self, amount: usize) {
        self.amount = amount.max(1);
    }

    pub(crate) fn set_current(&mut self, current: usize) {
        self.current = current;
    }

    pub(crate) fn set_own(&mut self, own: usize) {
        self.own = own;
    }
}

impl Default for Players {
    fn default() -> Self {
        Self::new()
    }
}
