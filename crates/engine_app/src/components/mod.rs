//! Components shipped with the engine.
//!
//! Every component here is replicated to clients except [`Parallax`], which
//! only drives local scrolling.

mod collision;
mod gameplay;
mod render;
mod spatial;

pub use collision::{Collision, ExcludeCollision};
pub use gameplay::{Enemy, Health, Link, Player, Score, WorldMoveProgress};
pub use render::{Animation, Parallax, ParallaxLayer, Renderable};
pub use spatial::{Moving, Position, Speed};

/// Implements [`engine_ecs::Component`] with a fixed wire name.
macro_rules! impl_component {
    ($ty:ty, $name:literal) => {
        impl engine_ecs::Component for $ty {
            fn type_name() -> &'static str {
                $name
            }
        }
    };
    ($ty:ty, $name:literal, local) => {
        impl engine_ecs::Component for $ty {
            fn type_name() -> &'static str {
                $name
            }

            fn replicated() -> bool {
                false
            }
        }
    };
}

pub(crate) use impl_component;
