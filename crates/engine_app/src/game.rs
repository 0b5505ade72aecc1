//! R-Type worlds played by the `rtype` binary.
//!
//! - `menu`: empty; waits for the lobby to fill.
//! - `game`: background layers, one ship per possible player, a few enemies.
//! - `GameOver`: empty.
//!
//! Every peer builds the same `game` world, so entity ids line up between
//! host and clients before the first update arrives.

use std::cell::RefCell;
use std::rc::Rc;

use engine_ecs::{EcsError, EntityId, Schedule, SubscriptionId, System, World};
use engine_math::{Rect, Vec2};
use engine_net::Key;
use engine_net::waiting_room::MAX_PLAYERS;
use tracing::{debug, info};

use crate::components::{
    Animation, Collision, Enemy, ExcludeCollision, Health, Link, Moving, Parallax, ParallaxLayer,
    Player, Position, Renderable, Score, Speed, WorldMoveProgress,
};
use crate::engine::Engine;
use crate::events::{CollisionEvent, KeyPressedEvent, PlayerDeathEvent};
use crate::systems::{add_engine_systems, increment_score};

pub const MENU_WORLD: &str = "menu";
pub const GAME_WORLD: &str = "game";
pub const GAME_OVER_WORLD: &str = "GameOver";

/// Time a ship takes for one step.
pub const STEP_DURATION_MS: u64 = 100;
/// Distance a shot travels before it disappears.
pub const SHOT_RANGE: f32 = 800.0;
/// Time a shot takes to cover [`SHOT_RANGE`].
pub const SHOT_DURATION_MS: u64 = 1_000;

const SHIP_GROUP: u64 = 1;
const ENEMY_GROUP: u64 = 2;

/// Register the `menu`, `game` and `GameOver` worlds on `engine`.
pub fn register_worlds(engine: &mut Engine) {
    engine.add_world_factory(MENU_WORLD, || Ok(World::new()));
    engine.add_world_factory(GAME_WORLD, game_world);
    engine.add_world_factory(GAME_OVER_WORLD, || Ok(World::new()));
}

/// Build the `game` world.
///
/// # Errors
///
/// Fails if two systems share a name.
pub fn game_world() -> Result<World, EcsError> {
    let mut world = World::new();
    add_engine_systems(&mut world)?;
    world.add_system("player_control", PlayerControlSystem::default())?;
    world.add_system("enemies", EnemySystem::default())?;

    let layers = [
        (ParallaxLayer::FarBackground, 1.0, "background_far", -3),
        (ParallaxLayer::MidBackground, 2.0, "background_mid", -2),
        (ParallaxLayer::NearBackground, 4.0, "background_near", -1),
    ];
    for (layer, speed, texture, priority) in layers {
        world.create_entity((
            Parallax::new(layer, speed),
            Position::new(0, 0),
            Renderable::new(texture, Vec2::new(800.0, 600.0)).with_priority(priority),
        ));
    }

    world.create_entity((WorldMoveProgress {
        speed: 1,
        ..Default::default()
    },));
    world.create_entity((Score::default(),));

    for id in 0..MAX_PLAYERS {
        let ship = world.create_entity((
            Player { id },
            Position::new(100, 100 + id as i32 * 120),
            Speed { speed: 40.0 },
            Health { hp: 3 },
            Renderable::new("ship", Vec2::new(33.0, 17.0)),
            Collision::named(Rect::new(0.0, 0.0, 33.0, 17.0), "ship"),
        ));
        if let Some(ship) = world.entity_mut(ship) {
            ship.add(ExcludeCollision { id: SHIP_GROUP });
        }
    }

    for (i, y) in [80, 240, 400].into_iter().enumerate() {
        let entity = world.create_entity((
            Enemy,
            Health { hp: 2 },
            Position::new(700, y),
            Renderable::new("enemy", Vec2::new(33.0, 36.0)).with_rotation(180.0),
            Collision::named(Rect::new(0.0, 0.0, 33.0, 36.0), "enemy"),
            ExcludeCollision { id: ENEMY_GROUP },
        ));
        if let Some(entity) = world.entity_mut(entity) {
            entity.add(Animation::new(
                Rect::new(0.0, 0.0, 33.0, 36.0),
                Vec2::new(33.0, 36.0),
                150 + i as u64 * 20,
                8,
            ));
        }
    }

    Ok(world)
}

fn direction(key: Key) -> Option<Vec2> {
    match key {
        Key::Left => Some(Vec2::NEG_X),
        Key::Right => Some(Vec2::X),
        Key::Up => Some(Vec2::NEG_Y),
        Key::Down => Some(Vec2::Y),
        _ => None,
    }
}

// ── Player control ─────────────────────────────────────────────────────────

/// Moves each player's ship from the keys that player pressed.
///
/// Runs once per player. Key presses are tagged with the player that was
/// current when they were broadcast, so the host applies forwarded input to
/// the right ship.
#[derive(Debug, Default)]
pub struct PlayerControlSystem {
    pressed: Rc<RefCell<Vec<(usize, Key)>>>,
    subscription: Option<SubscriptionId>,
}

impl System for PlayerControlSystem {
    fn configure(&mut self, world: &mut World) {
        let pressed = Rc::clone(&self.pressed);
        self.subscription = Some(world.subscribe(
            move |world: &mut World, _: &str, event: &KeyPressedEvent| {
                pressed
                    .borrow_mut()
                    .push((world.current_player(), event.0.code));
            },
        ));
    }

    fn unconfigure(&mut self, world: &mut World) {
        if let Some(id) = self.subscription.take() {
            world.unsubscribe::<KeyPressedEvent>(id);
        }
    }

    fn tick(&mut self, world: &mut World) {
        let player = world.current_player();
        let keys: Vec<Key> = {
            let mut pressed = self.pressed.borrow_mut();
            let (mine, others): (Vec<_>, Vec<_>) =
                pressed.drain(..).partition(|(p, _)| *p == player);
            *pressed = others;
            mine.into_iter().map(|(_, key)| key).collect()
        };
        if keys.is_empty() {
            return;
        }
        let Some(ship) = find_ship(world, player) else {
            debug!(player, "no ship for player");
            return;
        };
        let now = world.now_ms();
        for key in keys {
            if key == Key::Space {
                fire(world, ship, now);
            } else if let Some(dir) = direction(key) {
                step(world, ship, dir, now);
            }
        }
    }

    fn schedule(&self) -> Schedule {
        Schedule::PerPlayer
    }
}

fn find_ship(world: &World, player: usize) -> Option<EntityId> {
    world
        .query::<(Player,)>()
        .into_iter()
        .find(|(_, (p,))| p.get().id == player)
        .map(|(id, _)| id)
}

fn step(world: &mut World, ship: EntityId, dir: Vec2, now: u64) {
    let Some(entity) = world.entity_mut(ship) else {
        return;
    };
    let (Some(position), Some(speed)) = (entity.get::<Position>(), entity.get::<Speed>()) else {
        return;
    };
    let from = position.get().as_vec2();
    let amount = dir * speed.get().speed;
    entity.add(Moving::new(from, amount, STEP_DURATION_MS, now));
}

fn fire(world: &mut World, ship: EntityId, now: u64) {
    let Some(position) = world.get::<Position>(ship) else {
        return;
    };
    let from = position.get().as_vec2() + Vec2::new(33.0, 6.0);
    world.create_entity((
        Link { entity: ship },
        Position::new(from.x as i32, from.y as i32),
        Renderable::new("shot", Vec2::new(16.0, 4.0)),
        Collision::named(Rect::new(0.0, 0.0, 16.0, 4.0), "shot"),
        ExcludeCollision { id: SHIP_GROUP },
        Moving::new(from, Vec2::new(SHOT_RANGE, 0.0), SHOT_DURATION_MS, now),
    ));
}

// ── Enemies ────────────────────────────────────────────────────────────────

/// Resolves hits between shots, ships and enemies.
///
/// A shot that reaches an enemy costs it one hit point and disappears; a
/// destroyed enemy scores [`SCORE_INCREMENT`](crate::systems::SCORE_INCREMENT).
/// A ship that runs into an enemy loses one hit point. Shots that finished
/// their path are removed.
#[derive(Debug, Default)]
pub struct EnemySystem {
    subscription: Option<SubscriptionId>,
}

impl System for EnemySystem {
    fn configure(&mut self, world: &mut World) {
        self.subscription = Some(world.subscribe(
            |world: &mut World, _: &str, event: &CollisionEvent| on_collision(world, event),
        ));
    }

    fn unconfigure(&mut self, world: &mut World) {
        if let Some(id) = self.subscription.take() {
            world.unsubscribe::<CollisionEvent>(id);
        }
    }

    fn tick(&mut self, world: &mut World) {
        for id in world.entities_with::<(Link,)>() {
            if world.get::<Moving>(id).is_none() {
                world.remove_entity(id);
            }
        }
    }

    fn schedule(&self) -> Schedule {
        Schedule::OncePerFrame
    }
}

fn damage(world: &mut World, id: EntityId) -> bool {
    let Some(health) = world.get::<Health>(id) else {
        return false;
    };
    let mut health = health.get_mut();
    if health.is_dead() {
        return false;
    }
    health.hp -= 1;
    if health.is_dead() {
        world.remove_entity(id);
        return true;
    }
    false
}

fn on_collision(world: &mut World, event: &CollisionEvent) {
    let pending = world.pending_entity_removals();
    if pending.contains(&event.moving) || pending.contains(&event.colliding) {
        return;
    }
    let Some(target) = world.entity(event.colliding) else {
        return;
    };
    if !target.has::<Enemy>() {
        return;
    }
    let Some(mover) = world.entity(event.moving) else {
        return;
    };
    if mover.has::<Link>() {
        world.remove_entity(event.moving);
        if damage(world, event.colliding) {
            info!(enemy = %event.colliding, "enemy destroyed");
            increment_score(world);
        }
    } else if let Some(player) = mover.get::<Player>().map(|p| p.get().id)
        && damage(world, event.moving)
    {
        info!(ship = %event.moving, player, "ship destroyed");
        world.broadcast_event(&PlayerDeathEvent { player });
    }
}

#[cfg(test)]
mod tests {
    use engine_net::KeyEvent;

    use super::*;
    use crate::systems::{SCORE_INCREMENT, collide};

    fn press(world: &mut World, player: usize, key: Key) {
        world.set_current_player(player);
        world.broadcast_event(&KeyPressedEvent(KeyEvent::plain(key)));
        let own = world.own_player();
        world.set_current_player(own);
    }

    #[test]
    fn test_game_world_layout() {
        let world = game_world().unwrap();
        assert_eq!(world.query::<(Player,)>().len(), MAX_PLAYERS);
        assert_eq!(world.query::<(Enemy,)>().len(), 3);
        assert_eq!(world.query::<(Parallax,)>().len(), 3);
        assert!(world.first_with::<(Score,)>().is_some());
        assert!(world.has_system("physics"));
        assert!(world.has_system("player_control"));
    }

    #[test]
    fn test_scroll_starts_on_world_clock() {
        let mut world = game_world().unwrap();
        world.set_now_ms(1_000);
        world.tick();
        let (_, (progress,)) = world.first_with::<(WorldMoveProgress,)>().unwrap();
        assert_eq!(progress.get().starting_ms, 1_000);
        assert_eq!(progress.get().progress, 0);
    }

    #[test]
    fn test_factories_are_deterministic() {
        let a = game_world().unwrap();
        let b = game_world().unwrap();
        let ships = |w: &World| w.entities_with::<(Player,)>();
        assert_eq!(ships(&a), ships(&b));
    }

    #[test]
    fn test_each_player_moves_own_ship() {
        let mut world = game_world().unwrap();
        world.set_players_amount(2);
        world.set_now_ms(1_000);
        let ship0 = find_ship(&world, 0).unwrap();
        let ship1 = find_ship(&world, 1).unwrap();

        press(&mut world, 1, Key::Down);
        world.tick();

        assert!(world.get::<Moving>(ship0).is_none());
        let moving = *world.get::<Moving>(ship1).unwrap().get();
        assert_eq!(moving.move_amount, Vec2::new(0.0, 40.0));
        assert_eq!(moving.initial_pos, Vec2::new(100.0, 220.0));

        world.set_now_ms(1_000 + STEP_DURATION_MS);
        world.tick();
        assert_eq!(*world.get::<Position>(ship1).unwrap().get(), Position::new(100, 260));
        assert!(world.get::<Moving>(ship1).is_none());
    }

    #[test]
    fn test_keys_of_absent_players_wait() {
        let mut world = game_world().unwrap();
        world.set_players_amount(1);
        press(&mut world, 3, Key::Left);
        world.tick();
        let ship3 = find_ship(&world, 3).unwrap();
        assert!(world.get::<Moving>(ship3).is_none());
    }

    #[test]
    fn test_shot_destroys_enemy_and_scores() {
        let mut world = game_world().unwrap();
        let (enemy, _) = world.first_with::<(Enemy,)>().unwrap();
        let (score, _) = world.first_with::<(Score,)>().unwrap();
        let ship = find_ship(&world, 0).unwrap();

        for _ in 0..2 {
            fire(&mut world, ship, 0);
            let shot = *world.entities_with::<(Link,)>().last().unwrap();
            let at = *world.get::<Position>(enemy).unwrap().get();
            collide(&mut world, shot, at.x - 20, at.y - 20);
            assert!(world.pending_entity_removals().contains(&shot));
        }

        assert!(world.pending_entity_removals().contains(&enemy));
        assert_eq!(world.get::<Score>(score).unwrap().get().score, SCORE_INCREMENT);
    }

    #[test]
    fn test_destroyed_enemy_scores_once() {
        let mut world = game_world().unwrap();
        let (enemy, _) = world.first_with::<(Enemy,)>().unwrap();
        let (score, _) = world.first_with::<(Score,)>().unwrap();
        let ship = find_ship(&world, 0).unwrap();
        let at = *world.get::<Position>(enemy).unwrap().get();

        let mut shots = Vec::new();
        for _ in 0..3 {
            fire(&mut world, ship, 0);
            let shot = *world.entities_with::<(Link,)>().last().unwrap();
            collide(&mut world, shot, at.x - 20, at.y - 20);
            shots.push(shot);
        }
        // The same shot landing again is ignored too.
        collide(&mut world, shots[0], at.x - 20, at.y - 20);

        assert_eq!(world.get::<Score>(score).unwrap().get().score, SCORE_INCREMENT);
        assert_eq!(world.get::<Health>(enemy).unwrap().get().hp, 0);
        assert!(!world.pending_entity_removals().contains(&shots[2]));
    }

    #[test]
    fn test_ship_hit_by_enemy_loses_health() {
        let mut world = game_world().unwrap();
        let (enemy, _) = world.first_with::<(Enemy,)>().unwrap();
        let ship = find_ship(&world, 0).unwrap();
        let at = *world.get::<Position>(enemy).unwrap().get();

        collide(&mut world, ship, at.x - 20, at.y - 20);
        assert_eq!(world.get::<Health>(ship).unwrap().get().hp, 2);
        assert_eq!(world.get::<Health>(enemy).unwrap().get().hp, 2);
    }

    #[test]
    fn test_destroyed_ship_reports_death() {
        let mut world = game_world().unwrap();
        let deaths = Rc::new(RefCell::new(Vec::new()));
        let seen = Rc::clone(&deaths);
        world.subscribe(move |_: &mut World, _: &str, event: &PlayerDeathEvent| {
            seen.borrow_mut().push(event.player);
        });
        let (enemy, _) = world.first_with::<(Enemy,)>().unwrap();
        let ship = find_ship(&world, 0).unwrap();
        let at = *world.get::<Position>(enemy).unwrap().get();

        for _ in 0..2 {
            collide(&mut world, ship, at.x - 20, at.y - 20);
        }
        assert!(deaths.borrow().is_empty());
        collide(&mut world, ship, at.x - 20, at.y - 20);
        assert_eq!(*deaths.borrow(), vec![0]);
        assert!(world.pending_entity_removals().contains(&ship));

        collide(&mut world, ship, at.x - 20, at.y - 20);
        assert_eq!(deaths.borrow().len(), 1);
    }

    #[test]
    fn test_finished_shots_are_removed() {
        let mut world = game_world().unwrap();
        let ship = find_ship(&world, 0).unwrap();
        world.set_now_ms(0);
        fire(&mut world, ship, 0);
        let shot = *world.entities_with::<(Link,)>().last().unwrap();

        world.set_now_ms(SHOT_DURATION_MS + 1);
        world.tick();
        world.tick();
        let removed = world.flush_removals();
        assert!(removed.contains(&shot));
    }
}
