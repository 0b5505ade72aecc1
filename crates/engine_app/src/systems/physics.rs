//! Timed movement and collision detection.

use engine_ecs::{EntityId, Schedule, System, World};
use engine_math::{Rect, Vec2};
use tracing::trace;

use crate::components::{Collision, ExcludeCollision, Moving, Position, Renderable};
use crate::events::CollisionEvent;

/// Moves every entity with [`Moving`] along its path and reports collisions.
#[derive(Debug, Default)]
pub struct PhysicsSystem;

impl System for PhysicsSystem {
    fn tick(&mut self, world: &mut World) {
        let now = world.now_ms();
        world.each::<(Moving,)>(|world, id, (moving,)| {
            let moving = *moving.get();
            move_entity(world, id, &moving, now);
        });
    }

    fn schedule(&self) -> Schedule {
        Schedule::OncePerFrame
    }
}

/// Interpolated position at `now` and how many axes have reached the target.
///
/// An axis with no movement counts as finished.
fn step(moving: &Moving, now: u64) -> (Vec2, u32) {
    let progress = moving.progress(now);
    let target = moving.target();
    let mut pos = moving.initial_pos + moving.move_amount * progress;
    let mut ended = 0;

    for (value, amount, goal) in [
        (&mut pos.x, moving.move_amount.x, target.x),
        (&mut pos.y, moving.move_amount.y, target.y),
    ] {
        let done = (amount > 0.0 && *value >= goal) || (amount < 0.0 && *value <= goal);
        if done {
            *value = goal;
        }
        if done || amount == 0.0 {
            ended += 1;
        }
    }
    (pos, ended)
}

fn move_entity(world: &mut World, id: EntityId, moving: &Moving, now: u64) {
    let (pos, ended) = step(moving, now);
    let Some(entity) = world.entity(id) else {
        return;
    };
    if !entity.has::<Position>() || !entity.has::<Renderable>() {
        return;
    }
    let (x, y) = (pos.x as i32, pos.y as i32);

    collide(world, id, x, y);

    let Some(entity) = world.entity_mut(id) else {
        return;
    };
    let Some(position) = entity.get::<Position>() else {
        return;
    };
    if !entity.has::<Moving>() {
        return;
    }
    *position.get_mut() = Position::new(x, y);

    if ended == 2 {
        entity.remove::<Moving>(true);
        trace!(entity = %id, "move finished");
    }
}

/// World-space hitbox of `collision` for an entity at `(x, y)`.
fn hitbox(collision: &Collision, renderable: Option<&Renderable>, x: i32, y: i32) -> Rect {
    match renderable {
        Some(renderable) => collision
            .rect
            .rotated_hitbox(renderable.rotation, x as f32, y as f32),
        None => collision.rect.translated(Vec2::new(x as f32, y as f32)),
    }
}

/// Test `id` at `(x, y)` against every other collidable entity and broadcast
/// a [`CollisionEvent`] for each overlap.
///
/// Entities sharing an [`ExcludeCollision`] id with `id` are skipped. Does
/// nothing if `id` has no [`Collision`]. Returns the number of hits.
pub fn collide(world: &mut World, id: EntityId, x: i32, y: i32) -> usize {
    let Some(entity) = world.entity(id) else {
        return 0;
    };
    let Some(collision) = entity.get::<Collision>() else {
        return 0;
    };
    let renderable = entity.get::<Renderable>();
    let own_box = hitbox(
        &collision.get(),
        renderable.as_ref().map(|r| r.get()).as_deref(),
        x,
        y,
    );
    let exclude = entity.get::<ExcludeCollision>().map(|e| e.get().id);

    let mut hits = Vec::new();
    for (other, (other_collision, position)) in world.query::<(Collision, Position)>() {
        if other == id {
            continue;
        }
        let Some(other_entity) = world.entity(other) else {
            continue;
        };
        let other_exclude = other_entity.get::<ExcludeCollision>().map(|e| e.get().id);
        if exclude.is_some() && exclude == other_exclude {
            continue;
        }
        let other_renderable = other_entity.get::<Renderable>();
        let position = *position.get();
        let other_box = hitbox(
            &other_collision.get(),
            other_renderable.as_ref().map(|r| r.get()).as_deref(),
            position.x,
            position.y,
        );
        if own_box.intersects(&other_box) {
            hits.push(other);
        }
    }

    for &colliding in &hits {
        world.broadcast_event(&CollisionEvent {
            moving: id,
            colliding,
        });
    }
    hits.len()
}
