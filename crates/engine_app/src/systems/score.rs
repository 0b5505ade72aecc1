//! Player score.

use engine_ecs::{Schedule, System, World};
use tracing::debug;

use crate::components::Score;

/// Points added by [`increment_score`].
pub const SCORE_INCREMENT: i32 = 10;

/// Owns score bookkeeping. Score display is up to the front end, so the
/// per-frame tick has nothing to do.
#[derive(Debug, Default)]
pub struct ScoreSystem;

impl System for ScoreSystem {
    fn tick(&mut self, _world: &mut World) {}

    fn schedule(&self) -> Schedule {
        Schedule::OncePerFrame
    }
}

/// Add [`SCORE_INCREMENT`] to every [`Score`] in `world`.
pub fn increment_score(world: &World) {
    for (id, (score,)) in world.query::<(Score,)>() {
        let mut score = score.get_mut();
        score.score += SCORE_INCREMENT;
        debug!(entity = %id, score = score.score, "score incremented");
    }
}
