//! Typed publish/subscribe events.
//!
//! Subscribers register for one event type `E` and receive every broadcast
//! of that type along with mutable access to the [`World`] and the name the
//! event was broadcast under.
//!
//! While the subscribers of `E` are being notified their set is detached from
//! the bus. A handler that broadcasts `E` again therefore reaches nobody, and
//! cannot recurse into itself. Subscriptions added or removed during a
//! dispatch take effect once it finishes.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::entity::EntityId;
use crate::world::World;

/// Identifies one subscription, for [`World::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionId(pub u64);

/// Receives events of type `E`.
pub trait EventSubscriber<E> {
    /// Handle one broadcast.
    fn receive_event(&mut self, world: &mut World, name: &str, event: &E);
}

impl<E, F> EventSubscriber<E> for F
where
    F: FnMut(&mut World, &str, &E),
{
    fn receive_event(&mut self, world: &mut World, name: &str, event: &E) {
        self(world, name, event);
    }
}

/// Broadcast after an entity is added to a world.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnEntityCreated {
    pub entity: EntityId,
}

/// Broadcast after a deferred entity removal is applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct OnEntityDestroyed {
    pub entity: EntityId,
}

pub(crate) struct SubscriberSet<E> {
    pub(crate) subscribers: BTreeMap<SubscriptionId, Box<dyn EventSubscriber<E>>>,
}

impl<E> SubscriberSet<E> {
    fn new() -> Self {
        Self {
            subscribers: BTreeMap::new(),
        }
    }
}

/// Per-world subscriber registry.
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: u64,
    sets: HashMap<TypeId, Box<dyn Any>>,
    owners: HashMap<SubscriptionId, TypeId>,
    dispatching: HashSet<TypeId>,
    cancelled: HashSet<SubscriptionId>,
}

impl EventBus {
    pub(crate) fn subscribe<E: 'static>(
        &mut self,
        subscriber: Box<dyn EventSubscriber<E>>,
    ) -> SubscriptionId {
        self.next_id += 1;
        let id = SubscriptionId(self.next_id);
        self.set_mut::<E>().subscribers.insert(id, subscriber);
        self.owners.insert(id, TypeId::of::<E>());
        id
    }

    pub(crate) fn unsubscribe<E: 'static>(&mut self, id: SubscriptionId) -> bool {
        let type_id = TypeId::of::<E>();
        if self.owners.get(&id) != Some(&type_id) {
            return false;
        }
        self.owners.remove(&id);
        let removed = self
            .sets
            .get_mut(&type_id)
            .and_then(|set| set.downcast_mut::<SubscriberSet<E>>())
            .and_then(|set| set.subscribers.remove(&id))
            .is_some();
        if !removed && self.dispatching.contains(&type_id) {
            self.cancelled.insert(id);
        }
        true
    }

    pub(crate) fn has_subscribers<E: 'static>(&self) -> bool {
        let type_id = TypeId::of::<E>();
        self.owners.values().any(|owner| *owner == type_id)
    }

    pub(crate) fn is_cancelled(&self, id: SubscriptionId) -> bool {
        self.cancelled.contains(&id)
    }

    /// Detach the subscriber set of `E` for dispatch. `None` while `E` is
    /// already being dispatched, so subscriptions made by a handler stay
    /// pending until the outermost dispatch reattaches.
    pub(crate) fn detach<E: 'static>(&mut self) -> Option<SubscriberSet<E>> {
        let type_id = TypeId::of::<E>();
        if self.dispatching.contains(&type_id) {
            return None;
        }
        let set = self.sets.remove(&type_id)?.downcast::<SubscriberSet<E>>().ok()?;
        self.dispatching.insert(type_id);
        Some(*set)
    }

    /// Put a detached set back, merging subscriptions made meanwhile and
    /// dropping those cancelled meanwhile.
    pub(crate) fn reattach<E: 'static>(&mut self, mut set: SubscriberSet<E>) {
        let type_id = TypeId::of::<E>();
        self.dispatching.remove(&type_id);
        if let Some(added) = self
            .sets
            .remove(&type_id)
            .and_then(|s| s.downcast::<SubscriberSet<E>>().ok())
        {
            set.subscribers.extend(added.subscribers);
        }
        let cancelled = &mut self.cancelled;
        set.subscribers.retain(|id, _| !cancelled.remove(id));
        if !set.subscribers.is_empty() {
            self.sets.insert(type_id, Box::new(set));
        }
    }

    fn set_mut<E: 'static>(&mut self) -> &mut SubscriberSet<E> {
        let entry = self
            .sets
            .entry(TypeId::of::<E>())
            .or_insert_with(|| Box::new(SubscriberSet::<E>::new()));
        match entry.downcast_mut::<SubscriberSet<E>>() {
            Some(set) => set,
            None => unreachable!("subscriber sets are keyed by their event type"),
        }
    }
}

impl fmt::Debug for EventBus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EventBus")
            .field("subscriptions", &self.owners.len())
            .field("dispatching", &self.dispatching.len())
            .finish()
    }
}
