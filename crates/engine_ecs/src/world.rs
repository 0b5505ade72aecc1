//! The [`World`]: entities, events, systems and player context for one scene.
//!
//! Entities are kept in ascending id order, so queries and iteration are
//! deterministic. Entity removal is deferred until [`World::flush_removals`],
//! which the engine calls once per frame after every system has run.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::time::Duration;

use tracing::{debug, trace};

use crate::clock::Clock;
use crate::component::{Component, ComponentHandle};
use crate::entity::{Entity, EntityAllocator, EntityId};
use crate::error::EcsError;
use crate::event::{EventBus, EventSubscriber, OnEntityCreated, OnEntityDestroyed, SubscriptionId};
use crate::query::{Bundle, Query};
use crate::system::{Players, Schedule, System};

/// One scene of the game: its entities, subscribers and systems.
pub struct World {
    /// Entity ID allocator.
    allocator: EntityAllocator,
    /// Every live entity, keyed by id.
    entities: BTreeMap<EntityId, Entity>,
    /// Entities queued by [`World::remove_entity`].
    pending_removals: Vec<EntityId>,
    /// Event subscribers.
    events: EventBus,
    /// Registration order of systems.
    system_order: Vec<String>,
    /// Systems not currently ticking, keyed by name.
    systems: HashMap<String, Box<dyn System>>,
    /// Player context.
    players: Players,
    /// Frame timestamp in milliseconds, set by the engine.
    now_ms: u64,
    /// Wall clock for [`World::world_time`].
    clock: Clock,
}

impl World {
    /// Create a new empty world.
    #[must_use]
    pub fn new() -> Self {
        Self {
            allocator: EntityAllocator::new(),
            entities: BTreeMap::new(),
            pending_removals: Vec::new(),
            events: EventBus::default(),
            system_order: Vec::new(),
            systems: HashMap::new(),
            players: Players::new(),
            now_ms: 0,
            clock: Clock::new(),
        }
    }

    // ── Entities ──────────────────────────────────────────────────

    /// Add an empty entity with a freshly allocated id.
    pub fn add_entity(&mut self) -> EntityId {
        let id = self.allocator.allocate();
        self.insert_entity(Entity::new(id));
        id
    }

    /// Add an empty entity with a caller-chosen id.
    ///
    /// If an entity with this id already exists it is left untouched and its
    /// id is returned.
    pub fn add_entity_with_id(&mut self, id: EntityId) -> EntityId {
        if self.entities.contains_key(&id) {
            return id;
        }
        let id = self.allocator.reserve(id);
        self.insert_entity(Entity::new(id));
        id
    }

    /// Add an entity carrying every component in `bundle`.
    pub fn create_entity<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let id = self.allocator.allocate();
        let mut entity = Entity::new(id);
        bundle.insert_into(&mut entity);
        self.insert_entity(entity);
        id
    }

    fn insert_entity(&mut self, entity: Entity) {
        let id = entity.id();
        self.entities.insert(id, entity);
        trace!(entity = id.0, "entity added");
        if self.events.has_subscribers::<OnEntityCreated>() {
            self.broadcast_event(&OnEntityCreated { entity: id });
        }
    }

    /// Queue an entity for removal at the next [`flush_removals`](Self::flush_removals).
    pub fn remove_entity(&mut self, id: EntityId) {
        if !self.pending_removals.contains(&id) {
            self.pending_removals.push(id);
        }
    }

    /// Entities queued for removal.
    #[must_use]
    pub fn pending_entity_removals(&self) -> &[EntityId] {
        &self.pending_removals
    }

    /// Delete every queued entity that still exists.
    ///
    /// Broadcasts [`OnEntityDestroyed`] for each and returns their ids.
    pub fn flush_removals(&mut self) -> Vec<EntityId> {
        let queued = std::mem::take(&mut self.pending_removals);
        let mut removed = Vec::with_capacity(queued.len());
        for id in queued {
            if self.entities.remove(&id).is_some() {
                removed.push(id);
                self.broadcast_event(&OnEntityDestroyed { entity: id });
            }
        }
        if !removed.is_empty() {
            debug!(count = removed.len(), "flushed entity removals");
        }
        removed
    }

    /// Delete an entity immediately, bypassing the removal queue.
    ///
    /// Broadcasts [`OnEntityDestroyed`] and returns `true` if it existed.
    pub fn despawn(&mut self, id: EntityId) -> bool {
        if self.entities.remove(&id).is_none() {
            return false;
        }
        self.broadcast_event(&OnEntityDestroyed { entity: id });
        true
    }

    /// Returns `true` if the entity exists (pending removals still exist).
    #[must_use]
    pub fn entity_exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    #[must_use]
    pub fn entity(&self, id: EntityId) -> Option<&Entity> {
        self.entities.get(&id)
    }

    pub fn entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.entities.get_mut(&id)
    }

    /// Every entity, in ascending id order.
    pub fn entities(&self) -> impl Iterator<Item = &Entity> {
        self.entities.values()
    }

    /// Every entity, mutably, in ascending id order.
    pub fn entities_mut(&mut self) -> impl Iterator<Item = &mut Entity> {
        self.entities.values_mut()
    }

    /// Number of live entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    /// Shortcut for `entity(id)?.get::<T>()`.
    #[must_use]
    pub fn get<T: Component>(&self, id: EntityId) -> Option<ComponentHandle<T>> {
        self.entities.get(&id)?.get::<T>()
    }

    // ── Queries ───────────────────────────────────────────────────

    /// Every entity that has all components of `Q`, with their handles.
    #[must_use]
    pub fn query<Q: Query>(&self) -> Vec<(EntityId, Q::Item)> {
        self.entities
            .iter()
            .filter_map(|(id, entity)| Q::fetch(entity).map(|item| (*id, item)))
            .collect()
    }

    /// Call `f` for every entity matching `Q`.
    ///
    /// Matches are collected before the first call, so `f` may add or remove
    /// entities and components.
    pub fn each<Q: Query>(&mut self, mut f: impl FnMut(&mut World, EntityId, Q::Item)) {
        for (id, item) in self.query::<Q>() {
            f(self, id, item);
        }
    }

    /// Ids of every entity matching `Q`.
    #[must_use]
    pub fn entities_with<Q: Query>(&self) -> Vec<EntityId> {
        self.entities
            .iter()
            .filter(|(_, entity)| Q::matches(entity))
            .map(|(id, _)| *id)
            .collect()
    }

    /// The lowest-id entity matching `Q`.
    #[must_use]
    pub fn first_with<Q: Query>(&self) -> Option<(EntityId, Q::Item)> {
        self.entities
            .iter()
            .find_map(|(id, entity)| Q::fetch(entity).map(|item| (*id, item)))
    }

    // ── Events ────────────────────────────────────────────────────

    /// Register a subscriber for events of type `E`.
    pub fn subscribe<E: 'static>(
        &mut self,
        subscriber: impl EventSubscriber<E> + 'static,
    ) -> SubscriptionId {
        self.events.subscribe::<E>(Box::new(subscriber))
    }

    /// Remove a subscription. Returns `false` if `id` is not a live
    /// subscription for `E`.
    pub fn unsubscribe<E: 'static>(&mut self, id: SubscriptionId) -> bool {
        self.events.unsubscribe::<E>(id)
    }

    /// Returns `true` if anything is subscribed to `E`.
    #[must_use]
    pub fn has_subscribers<E: 'static>(&self) -> bool {
        self.events.has_subscribers::<E>()
    }

    /// Broadcast `event` to every subscriber of `E` with an empty name.
    pub fn broadcast_event<E: 'static>(&mut self, event: &E) -> usize {
        self.broadcast_named_event("", event)
    }

    /// Broadcast `event` under `name`. Returns the number of subscribers
    /// notified.
    pub fn broadcast_named_event<E: 'static>(&mut self, name: &str, event: &E) -> usize {
        let Some(mut set) = self.events.detach::<E>() else {
            return 0;
        };
        let mut notified = 0;
        for (id, subscriber) in &mut set.subscribers {
            if self.events.is_cancelled(*id) {
                continue;
            }
            subscriber.receive_event(self, name, event);
            notified += 1;
        }
        self.events.reattach(set);
        notified
    }

    // ── Systems ───────────────────────────────────────────────────

    /// Add a system under `name` and call its `configure`.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateSystem`] if the name is taken.
    pub fn add_system(
        &mut self,
        name: impl Into<String>,
        mut system: impl System + 'static,
    ) -> Result<(), EcsError> {
        let name = name.into();
        if self.system_order.contains(&name) {
            return Err(EcsError::DuplicateSystem(name));
        }
        system.configure(self);
        debug!(system = %name, "system added");
        self.system_order.push(name.clone());
        self.systems.insert(name, Box::new(system));
        Ok(())
    }

    /// Remove the system `name` and call its `unconfigure`.
    ///
    /// A system removed while it is ticking is unconfigured once its tick
    /// returns.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::UnknownSystem`] if no such system exists.
    pub fn remove_system(&mut self, name: &str) -> Result<(), EcsError> {
        let Some(index) = self.system_order.iter().position(|n| n == name) else {
            return Err(EcsError::UnknownSystem(name.to_string()));
        };
        self.system_order.remove(index);
        if let Some(mut system) = self.systems.remove(name) {
            system.unconfigure(self);
        }
        debug!(system = name, "system removed");
        Ok(())
    }

    /// Names of every system, in registration order.
    #[must_use]
    pub fn system_names(&self) -> &[String] {
        &self.system_order
    }

    #[must_use]
    pub fn has_system(&self, name: &str) -> bool {
        self.system_order.iter().any(|n| n == name)
    }

    /// Run every system for one frame.
    ///
    /// Per-player systems run once for each player in `0..players_amount`,
    /// with the current player set accordingly. Once-per-frame systems run
    /// afterwards with the current player restored to the own player.
    pub fn tick(&mut self) {
        let order = self.system_order.clone();
        for player in 0..self.players.amount() {
            self.players.set_current(player);
            for name in &order {
                self.tick_system(name, Schedule::PerPlayer);
            }
        }
        self.players.set_current(self.players.own());
        for name in &order {
            self.tick_system(name, Schedule::OncePerFrame);
        }
    }

    fn tick_system(&mut self, name: &str, schedule: Schedule) {
        let Some(mut system) = self.systems.remove(name) else {
            return;
        };
        if system.schedule() == schedule {
            trace!(system = name, player = self.players.current(), "tick");
            system.tick(self);
        }
        let still_registered = self.system_order.iter().any(|n| n == name);
        if still_registered && !self.systems.contains_key(name) {
            self.systems.insert(name.to_string(), system);
        } else {
            system.unconfigure(self);
        }
    }

    // ── Players ───────────────────────────────────────────────────

    #[must_use]
    pub fn players(&self) -> Players {
        self.players
    }

    #[must_use]
    pub fn players_amount(&self) -> usize {
        self.players.amount()
    }

    /// Set the number of players (clamped to at least 1).
    pub fn set_players_amount(&mut self, amount: usize) {
        self.players.set_amount(amount);
    }

    /// The player the running system ticks for.
    #[must_use]
    pub fn current_player(&self) -> usize {
        self.players.current()
    }

    #[must_use]
    pub fn own_player(&self) -> usize {
        self.players.own()
    }

    /// Set the player the next handlers run for.
    pub fn set_current_player(&mut self, current: usize) {
        self.players.set_current(current);
    }

    /// Set the player controlled by this process; also becomes current.
    pub fn set_own_player(&mut self, own: usize) {
        self.players.set_own(own);
        self.players.set_current(own);
    }

    // ── Time ──────────────────────────────────────────────────────

    /// Timestamp of the current frame in milliseconds.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.now_ms
    }

    pub fn set_now_ms(&mut self, now_ms: u64) {
        self.now_ms = now_ms;
    }

    /// Wall time elapsed since the previous call.
    pub fn world_time(&mut self) -> Duration {
        self.clock.elapsed()
    }
}

impl Default for World {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for World {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("World")
            .field("entities", &self.entities.len())
            .field("pending_removals", &self.pending_removals)
            .field("systems", &self.system_order)
            .field("players", &self.players)
            .field("now_ms", &self.now_ms)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    use serde::{Deserialize, Serialize};

    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Position {
        x: i32,
        y: i32,
    }

    impl Component for Position {
        fn type_name() -> &'static str {
            "Position"
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Speed(f32);

    impl Component for Speed {
        fn type_name() -> &'static str {
            "Speed"
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Tag;

    impl Component for Tag {
        fn type_name() -> &'static str {
            "Tag"
        }
    }

    struct Ping(u32);

    #[test]
    fn test_add_entity_allocates_from_one() {
        let mut world = World::new();
        assert_eq!(world.add_entity(), EntityId(1));
        assert_eq!(world.add_entity(), EntityId(2));
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn test_add_entity_with_id_reserves() {
        let mut world = World::new();
        assert_eq!(world.add_entity_with_id(EntityId(10)), EntityId(10));
        assert_eq!(world.add_entity(), EntityId(11));

        let entity = world.entity_mut(EntityId(10)).unwrap();
        entity.add(Tag);
        // Existing id: returned unchanged, components kept.
        assert_eq!(world.add_entity_with_id(EntityId(10)), EntityId(10));
        assert!(world.entity(EntityId(10)).unwrap().has::<Tag>());
    }

    #[test]
    fn test_remove_entity_is_deferred() {
        let mut world = World::new();
        let a = world.create_entity((Position { x: 0, y: 0 },));
        let b = world.add_entity();

        world.remove_entity(a);
        world.remove_entity(a);
        assert!(world.entity_exists(a));

        assert_eq!(world.flush_removals(), vec![a]);
        assert!(!world.entity_exists(a));
        assert!(world.entity_exists(b));
        assert!(world.flush_removals().is_empty());
    }

    #[test]
    fn test_despawn_is_immediate() {
        let mut world = World::new();
        let id = world.add_entity();
        assert!(world.despawn(id));
        assert!(!world.entity_exists(id));
        assert!(!world.despawn(id));
    }

    #[test]
    fn test_flush_skips_missing_entities() {
        let mut world = World::new();
        world.remove_entity(EntityId(99));
        assert!(world.flush_removals().is_empty());
    }

    #[test]
    fn test_query_ascending_order() {
        let mut world = World::new();
        let a = world.create_entity((Position { x: 1, y: 0 }, Speed(1.0)));
        let _b = world.create_entity((Position { x: 2, y: 0 },));
        let c = world.create_entity((Speed(3.0), Position { x: 3, y: 0 }));

        let hits: Vec<EntityId> = world
            .query::<(Position, Speed)>()
            .into_iter()
            .map(|(id, _)| id)
            .collect();
        assert_eq!(hits, vec![a, c]);
        assert_eq!(world.entities_with::<(Position,)>().len(), 3);

        let (first, (pos,)) = world.first_with::<(Position,)>().unwrap();
        assert_eq!(first, a);
        assert_eq!(pos.get().x, 1);
        assert!(world.first_with::<(Tag,)>().is_none());
    }

    #[test]
    fn test_each_three_components() {
        let mut world = World::new();
        world.create_entity((Position { x: 0, y: 0 }, Speed(2.0), Tag));
        world.create_entity((Position { x: 0, y: 0 }, Speed(2.0)));

        let mut visited = 0;
        world.each::<(Position, Speed, Tag)>(|_, _, (pos, speed, _)| {
            pos.get_mut().x += speed.get().0 as i32;
            visited += 1;
        });
        assert_eq!(visited, 1);
    }

    #[test]
    fn test_each_can_mutate_world() {
        let mut world = World::new();
        let id = world.create_entity((Position { x: 0, y: 0 }, Tag));
        world.each::<(Tag,)>(|world, id, _| {
            world.entity_mut(id).unwrap().remove::<Tag>(true);
            world.add_entity();
        });
        assert!(!world.entity(id).unwrap().has::<Tag>());
        assert_eq!(world.entity_count(), 2);
    }

    #[test]
    fn test_entity_created_and_destroyed_events() {
        let mut world = World::new();
        let log = Rc::new(RefCell::new(Vec::new()));

        let created = Rc::clone(&log);
        world.subscribe(move |_: &mut World, _: &str, e: &OnEntityCreated| {
            created.borrow_mut().push(("created", e.entity));
        });
        let destroyed = Rc::clone(&log);
        world.subscribe(move |_: &mut World, _: &str, e: &OnEntityDestroyed| {
            destroyed.borrow_mut().push(("destroyed", e.entity));
        });

        let id = world.add_entity();
        world.remove_entity(id);
        world.flush_removals();
        assert_eq!(*log.borrow(), vec![("created", id), ("destroyed", id)]);
    }

    #[test]
    fn test_created_event_sees_bundle_components() {
        let mut world = World::new();
        let saw = Rc::new(Cell::new(false));
        let flag = Rc::clone(&saw);
        world.subscribe(move |world: &mut World, _: &str, e: &OnEntityCreated| {
            flag.set(world.get::<Tag>(e.entity).is_some());
        });
        world.create_entity((Tag,));
        assert!(saw.get());
    }

    #[test]
    fn test_named_broadcast_and_unsubscribe() {
        let mut world = World::new();
        let names = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&names);
        let sub = world.subscribe(move |_: &mut World, name: &str, e: &Ping| {
            sink.borrow_mut().push(format!("{name}:{}", e.0));
        });

        assert_eq!(world.broadcast_named_event("hit", &Ping(1)), 1);
        assert_eq!(world.broadcast_event(&Ping(2)), 1);
        assert!(world.unsubscribe::<Ping>(sub));
        assert!(!world.unsubscribe::<Ping>(sub));
        assert_eq!(world.broadcast_event(&Ping(3)), 0);
        assert_eq!(*names.borrow(), vec!["hit:1".to_string(), ":2".to_string()]);
    }

    #[test]
    fn test_unsubscribe_wrong_event_type() {
        let mut world = World::new();
        let sub = world.subscribe(|_: &mut World, _: &str, _: &Ping| {});
        assert!(!world.unsubscribe::<OnEntityCreated>(sub));
        assert!(world.has_subscribers::<Ping>());
    }

    #[test]
    fn test_rebroadcast_inside_handler_does_not_recurse() {
        let mut world = World::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        world.subscribe(move |world: &mut World, _: &str, e: &Ping| {
            counter.set(counter.get() + 1);
            assert_eq!(world.broadcast_event(&Ping(e.0 + 1)), 0);
        });
        world.broadcast_event(&Ping(0));
        assert_eq!(calls.get(), 1);
        // The subscriber is still attached afterwards.
        world.broadcast_event(&Ping(0));
        assert_eq!(calls.get(), 2);
    }

    #[test]
    fn test_rebroadcast_with_pending_subscriber_keeps_cancellations() {
        let mut world = World::new();
        let late_calls = Rc::new(Cell::new(0));
        let victim_calls = Rc::new(Cell::new(0));
        let victim_id = Rc::new(Cell::new(SubscriptionId(0)));
        let added = Rc::new(Cell::new(false));

        let (late, victim, once) = (
            Rc::clone(&late_calls),
            Rc::clone(&victim_id),
            Rc::clone(&added),
        );
        world.subscribe(move |world: &mut World, _: &str, e: &Ping| {
            if once.replace(true) {
                return;
            }
            let late = Rc::clone(&late);
            world.subscribe(move |_: &mut World, _: &str, _: &Ping| {
                late.set(late.get() + 1);
            });
            assert_eq!(world.broadcast_event(&Ping(e.0 + 1)), 0);
            assert!(world.unsubscribe::<Ping>(victim.get()));
        });
        let counter = Rc::clone(&victim_calls);
        let id = world.subscribe(move |_: &mut World, _: &str, _: &Ping| {
            counter.set(counter.get() + 1);
        });
        victim_id.set(id);

        assert_eq!(world.broadcast_event(&Ping(0)), 1);
        assert_eq!((late_calls.get(), victim_calls.get()), (0, 0));

        assert_eq!(world.broadcast_event(&Ping(0)), 2);
        assert_eq!((late_calls.get(), victim_calls.get()), (1, 0));
    }

    #[test]
    fn test_unsubscribe_during_dispatch() {
        let mut world = World::new();
        let calls = Rc::new(Cell::new(0));
        let second_id = Rc::new(Cell::new(SubscriptionId(0)));

        let id_ref = Rc::clone(&second_id);
        world.subscribe(move |world: &mut World, _: &str, _: &Ping| {
            world.unsubscribe::<Ping>(id_ref.get());
        });
        let counter = Rc::clone(&calls);
        let id = world.subscribe(move |_: &mut World, _: &str, _: &Ping| {
            counter.set(counter.get() + 1);
        });
        second_id.set(id);

        assert_eq!(world.broadcast_event(&Ping(0)), 1);
        assert_eq!(calls.get(), 0);
        assert_eq!(world.broadcast_event(&Ping(0)), 1);
        assert_eq!(calls.get(), 0);
    }

    #[test]
    fn test_subscribe_during_dispatch_applies_afterwards() {
        let mut world = World::new();
        let calls = Rc::new(Cell::new(0));
        let counter = Rc::clone(&calls);
        let added = Rc::new(Cell::new(false));
        let once = Rc::clone(&added);
        world.subscribe(move |world: &mut World, _: &str, _: &Ping| {
            if !once.replace(true) {
                let counter = Rc::clone(&counter);
                world.subscribe(move |_: &mut World, _: &str, _: &Ping| {
                    counter.set(counter.get() + 1);
                });
            }
        });
        assert_eq!(world.broadcast_event(&Ping(0)), 1);
        assert_eq!(calls.get(), 0);
        assert_eq!(world.broadcast_event(&Ping(0)), 2);
        assert_eq!(calls.get(), 1);
    }

    struct Recorder {
        log: Rc<RefCell<Vec<String>>>,
        label: &'static str,
        schedule: Schedule,
    }

    impl System for Recorder {
        fn configure(&mut self, _world: &mut World) {
            self.log.borrow_mut().push(format!("configure {}", self.label));
        }

        fn unconfigure(&mut self, _world: &mut World) {
            self.log.borrow_mut().push(format!("unconfigure {}", self.label));
        }

        fn tick(&mut self, world: &mut World) {
            self.log
                .borrow_mut()
                .push(format!("{}@{}", self.label, world.current_player()));
        }

        fn schedule(&self) -> Schedule {
            self.schedule
        }
    }

    fn recorder(log: &Rc<RefCell<Vec<String>>>, label: &'static str, schedule: Schedule) -> Recorder {
        Recorder {
            log: Rc::clone(log),
            label,
            schedule,
        }
    }

    #[test]
    fn test_tick_runs_per_player_then_once() {
        let mut world = World::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        world
            .add_system("render", recorder(&log, "render", Schedule::OncePerFrame))
            .unwrap();
        world
            .add_system("physics", recorder(&log, "physics", Schedule::PerPlayer))
            .unwrap();
        world.add_system("input", recorder(&log, "input", Schedule::PerPlayer)).unwrap();
        world.set_players_amount(2);
        world.set_own_player(1);
        log.borrow_mut().clear();

        world.tick();
        assert_eq!(
            *log.borrow(),
            vec!["physics@0", "input@0", "physics@1", "input@1", "render@1"]
        );
        assert_eq!(world.current_player(), 1);
    }

    #[test]
    fn test_duplicate_and_unknown_systems() {
        let mut world = World::new();
        let log = Rc::new(RefCell::new(Vec::new()));
        world.add_system("a", recorder(&log, "a", Schedule::PerPlayer)).unwrap();
        assert!(matches!(
            world.add_system("a", recorder(&log, "a2", Schedule::PerPlayer)),
            Err(EcsError::DuplicateSystem(_))
        ));
        assert!(matches!(world.remove_system("b"), Err(EcsError::UnknownSystem(_))));
        world.remove_system("a").unwrap();
        assert!(world.system_names().is_empty());
        assert_eq!(*log.borrow(), vec!["configure a", "unconfigure a"]);
    }

    struct SelfRemoving;

    impl System for SelfRemoving {
        fn tick(&mut self, world: &mut World) {
            world.remove_system("self").unwrap();
            world.add_entity();
        }
    }

    #[test]
    fn test_system_removed_during_own_tick() {
        let mut world = World::new();
        world.add_system("self", SelfRemoving).unwrap();
        world.set_players_amount(3);
        world.tick();
        assert!(!world.has_system("self"));
        assert_eq!(world.entity_count(), 1);
    }

    #[test]
    fn test_players_amount_clamped() {
        let mut world = World::new();
        world.set_players_amount(0);
        assert_eq!(world.players_amount(), 1);
    }

    #[test]
    fn test_now_ms() {
        let mut world = World::new();
        world.set_now_ms(1234);
        assert_eq!(world.now_ms(), 1234);
        let _ = world.world_time();
    }
}
