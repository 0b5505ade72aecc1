//! Systems shipped with the engine.
//!
//! They do not depend on which player is current, so they all run
//! [`Schedule::OncePerFrame`](engine_ecs::Schedule::OncePerFrame).

mod animation;
mod parallax;
mod physics;
mod score;
mod world_move;

pub use animation::AnimationSystem;
pub use parallax::ParallaxSystem;
pub use physics::{PhysicsSystem, collide};
pub use score::{SCORE_INCREMENT, ScoreSystem, increment_score};
pub use world_move::{WORLD_MOVE_UNITS_PER_SECOND, WorldMoveSystem};

use engine_ecs::{EcsError, World};

/// Add every engine system to `world` under its usual name.
///
/// # Errors
///
/// Returns [`EcsError::DuplicateSystem`] if one of the names is taken.
pub fn add_engine_systems(world: &mut World) -> Result<(), EcsError> {
    world.add_system("physics", PhysicsSystem)?;
    world.add_system("world_move", WorldMoveSystem)?;
    world.add_system("parallax", ParallaxSystem)?;
    world.add_system("animation", AnimationSystem)?;
    world.add_system("score", ScoreSystem)?;
    Ok(())
}
