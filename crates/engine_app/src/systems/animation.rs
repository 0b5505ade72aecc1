//! Sprite-sheet animation.

use engine_ecs::{Schedule, System, World};

use crate::components::{Animation, Renderable};

/// Advances the frame of every displayed [`Animation`] once `speed_ms` has
/// passed and stores the frame's texture region on the [`Renderable`].
#[derive(Debug, Default)]
pub struct AnimationSystem;

impl System for AnimationSystem {
    fn tick(&mut self, world: &mut World) {
        let now = world.now_ms();
        for (_, (renderable, animation)) in world.query::<(Renderable, Animation)>() {
            if !renderable.get().is_displayed || !animation.get().do_animation {
                continue;
            }
            let mut animation = animation.get_mut();
            if now.saturating_sub(animation.last_frame_ms) <= animation.speed_ms {
                continue;
            }
            animation.last_frame_ms = now;
            animation.frame += 1;
            if animation.frame >= animation.frame_count {
                animation.frame = 0;
            }
            renderable.get_mut().texture_rect = Some(animation.frame_rect());
        }
    }

    fn schedule(&self) -> Schedule {
        Schedule::OncePerFrame
    }
}

#[cfg(test)]
mod tests {
    use engine_math::{Rect, Vec2};

    use super::*;

    fn animated(world: &mut World) -> engine_ecs::EntityId {
        let mut animation =
            Animation::new(Rect::new(0.0, 16.0, 32.0, 16.0), Vec2::new(32.0, 16.0), 100, 3);
        animation.last_frame_ms = 1_000;
        world.create_entity((Renderable::new("ship", Vec2::new(96.0, 16.0)), animation))
    }

    #[test]
    fn test_frames_advance_and_wrap() {
        let mut world = World::new();
        world.add_system("animation", AnimationSystem).unwrap();
        let id = animated(&mut world);

        world.set_now_ms(1_050);
        world.tick();
        assert_eq!(world.get::<Animation>(id).unwrap().get().frame, 0);

        let mut frames = Vec::new();
        for now in [1_101, 1_202, 1_303] {
            world.set_now_ms(now);
            world.tick();
            frames.push(world.get::<Animation>(id).unwrap().get().frame);
        }
        assert_eq!(frames, vec![1, 2, 0]);
        assert_eq!(
            world.get::<Renderable>(id).unwrap().get().texture_rect,
            Some(Rect::new(0.0, 16.0, 32.0, 16.0))
        );
    }

    #[test]
    fn test_hidden_or_paused_does_not_animate() {
        let mut world = World::new();
        world.add_system("animation", AnimationSystem).unwrap();
        let hidden = animated(&mut world);
        let paused = animated(&mut world);
        world.get::<Renderable>(hidden).unwrap().get_mut().is_displayed = false;
        world.get::<Animation>(paused).unwrap().get_mut().do_animation = false;

        world.set_now_ms(5_000);
        world.tick();
        assert_eq!(world.get::<Animation>(hidden).unwrap().get().frame, 0);
        assert_eq!(world.get::<Animation>(paused).unwrap().get().frame, 0);
    }
}
