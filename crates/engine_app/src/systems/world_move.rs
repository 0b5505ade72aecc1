//! Level scroll progress.

use engine_ecs::{Schedule, System, World};

use crate::components::WorldMoveProgress;

/// Progress units gained per second of play.
pub const WORLD_MOVE_UNITS_PER_SECOND: u64 = 50;

/// Updates the first [`WorldMoveProgress`] in the world from the world time.
///
/// A progress whose `starting_ms` is 0 starts at the first tick it sees.
#[derive(Debug, Default)]
pub struct WorldMoveSystem;

impl System for WorldMoveSystem {
    fn tick(&mut self, world: &mut World) {
        let now = world.now_ms();
        let Some((_, (progress,))) = world.first_with::<(WorldMoveProgress,)>() else {
            return;
        };
        let mut progress = progress.get_mut();
        if progress.starting_ms == 0 {
            progress.starting_ms = now;
        }
        progress.progress =
            now.saturating_sub(progress.starting_ms) * WORLD_MOVE_UNITS_PER_SECOND / 1000;
    }

    fn schedule(&self) -> Schedule {
        Schedule::OncePerFrame
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_progress_follows_time() {
        let mut world = World::new();
        world.add_system("world_move", WorldMoveSystem).unwrap();
        let first = world.create_entity((WorldMoveProgress {
            starting_ms: 10_000,
            ..Default::default()
        },));
        let second = world.create_entity((WorldMoveProgress::default(),));

        world.set_now_ms(12_000);
        world.tick();
        assert_eq!(world.get::<WorldMoveProgress>(first).unwrap().get().progress, 100);
        assert_eq!(world.get::<WorldMoveProgress>(second).unwrap().get().progress, 0);

        world.set_now_ms(12_030);
        world.tick();
        assert_eq!(world.get::<WorldMoveProgress>(first).unwrap().get().progress, 101);
    }

    #[test]
    fn test_unstarted_progress_starts_at_first_tick() {
        let mut world = World::new();
        world.add_system("world_move", WorldMoveSystem).unwrap();
        let id = world.create_entity((WorldMoveProgress::default(),));

        world.set_now_ms(5_000);
        world.tick();
        let progress = *world.get::<WorldMoveProgress>(id).unwrap().get();
        assert_eq!((progress.starting_ms, progress.progress), (5_000, 0));

        world.set_now_ms(7_000);
        world.tick();
        assert_eq!(world.get::<WorldMoveProgress>(id).unwrap().get().progress, 100);
    }

    #[test]
    fn test_no_progress_entity_is_fine() {
        let mut world = World::new();
        world.add_system("world_move", WorldMoveSystem).unwrap();
        world.tick();
    }
}
