//! Scrolling background layers.

use engine_ecs::{Schedule, System, World};

use crate::components::{Parallax, Position, Renderable};

/// Scrolls every [`Parallax`] layer left by its speed, wrapping it back to
/// its own width once it has left the view.
#[derive(Debug, Default)]
pub struct ParallaxSystem;

impl System for ParallaxSystem {
    fn tick(&mut self, world: &mut World) {
        for (_, (parallax, position, renderable)) in
            world.query::<(Parallax, Position, Renderable)>()
        {
            let speed = parallax.get().speed;
            let width = renderable.get().size.x;
            let mut position = position.get_mut();
            let mut x = position.x as f32;
            if x + width <= 0.0 {
                x = width;
            }
            position.x = (x - speed) as i32;
        }
    }

    fn schedule(&self) -> Schedule {
        Schedule::OncePerFrame
    }
}
