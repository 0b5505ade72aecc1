//! Entity identifiers, allocation and the per-entity component store.
//!
//! An [`EntityId`] is a lightweight `u64` identifier. The [`Entity`] it names
//! owns one component per component type, plus the bookkeeping replication
//! needs: the list of component types removed since the last network update.

use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::component::{
    Component, ComponentCell, ComponentHandle, ComponentTypeId, ErasedComponent,
};

/// A unique entity identifier.
///
/// Entity IDs are allocated by the world that owns the entity. Clients reuse
/// the IDs chosen by the server so both sides agree on identity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

impl EntityId {
    /// The null / invalid entity sentinel.
    pub const INVALID: EntityId = EntityId(0);

    /// Create an entity id from a raw `u64` identifier.
    #[must_use]
    pub const fn from_raw(id: u64) -> Self {
        Self(id)
    }

    /// Returns the raw `u64` identifier.
    #[must_use]
    pub const fn id(self) -> u64 {
        self.0
    }

    /// Returns `true` if this is a valid (non-zero) entity.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.0 != 0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Entity({})", self.0)
    }
}

/// Allocates monotonically increasing entity IDs.
#[derive(Debug)]
pub struct EntityAllocator {
    next_id: u64,
}

impl EntityAllocator {
    /// Creates a new allocator. IDs start at 1 (0 is reserved for [`EntityId::INVALID`]).
    #[must_use]
    pub fn new() -> Self {
        Self { next_id: 1 }
    }

    /// Allocates a fresh entity ID.
    pub fn allocate(&mut self) -> EntityId {
        let id = self.next_id;
        self.next_id += 1;
        EntityId(id)
    }

    /// Claims `id` so later allocations never hand it out again.
    ///
    /// Ids below the next free id are returned unchanged.
    pub fn reserve(&mut self, id: EntityId) -> EntityId {
        if id.0 >= self.next_id {
            self.next_id = id.0 + 1;
        }
        id
    }

    /// Returns the id the next call to [`allocate`](Self::allocate) yields.
    #[must_use]
    pub fn peek(&self) -> EntityId {
        EntityId(self.next_id)
    }
}

impl Default for EntityAllocator {
    fn default() -> Self {
        Self::new()
    }
}

/// An entity and the components attached to it.
///
/// Components are keyed by [`ComponentTypeId`]; adding a component of a type
/// the entity already has replaces it.
pub struct Entity {
    id: EntityId,
    components: BTreeMap<ComponentTypeId, ErasedComponent>,
    pending_removals: Vec<ComponentTypeId>,
    clock: Clock,
}

impl Entity {
    /// Create an empty entity.
    #[must_use]
    pub fn new(id: EntityId) -> Self {
        Self {
            id,
            components: BTreeMap::new(),
            pending_removals: Vec::new(),
            clock: Clock::new(),
        }
    }

    /// This entity's id.
    #[must_use]
    pub fn id(&self) -> EntityId {
        self.id
    }

    /// Attach `component`, replacing any existing component of the same type.
    pub fn add<T: Component>(&mut self, component: T) -> ComponentHandle<T> {
        let cell = Rc::new(ComponentCell::new(component));
        self.components
            .insert(T::component_type_id(), Rc::clone(&cell) as ErasedComponent);
        ComponentHandle::new(cell)
    }

    /// Attach an already type-erased component (used by replication).
    pub fn insert_erased(&mut self, component: ErasedComponent) {
        self.components.insert(component.component_type(), component);
    }

    /// Returns `true` if the entity has a component of type `T`.
    #[must_use]
    pub fn has<T: Component>(&self) -> bool {
        self.has_type(T::component_type_id())
    }

    /// Returns `true` if the entity has a component with this wire tag.
    #[must_use]
    pub fn has_type(&self, type_id: ComponentTypeId) -> bool {
        self.components.contains_key(&type_id)
    }

    /// Returns a handle to the component of type `T`, if attached.
    #[must_use]
    pub fn get<T: Component>(&self) -> Option<ComponentHandle<T>> {
        self.components
            .get(&T::component_type_id())
            .and_then(ComponentHandle::from_erased)
    }

    /// Returns the type-erased component with this wire tag, if attached.
    #[must_use]
    pub fn get_erased(&self, type_id: ComponentTypeId) -> Option<&ErasedComponent> {
        self.components.get(&type_id)
    }

    /// Detach the component of type `T`.
    ///
    /// With `notify`, the removal is recorded so it can be replicated.
    /// Returns `true` if a component was removed.
    pub fn remove<T: Component>(&mut self, notify: bool) -> bool {
        self.remove_by_type(T::component_type_id(), notify)
    }

    /// Detach the component with this wire tag. See [`remove`](Self::remove).
    pub fn remove_by_type(&mut self, type_id: ComponentTypeId, notify: bool) -> bool {
        let removed = self.components.remove(&type_id).is_some();
        if removed && notify && !self.pending_removals.contains(&type_id) {
            self.pending_removals.push(type_id);
        }
        removed
    }

    /// Detach every component without recording removals.
    pub fn clear(&mut self) {
        self.components.clear();
    }

    /// Number of attached components.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if the entity has no components.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }

    /// Wire tags of every attached component, in ascending order.
    pub fn component_types(&self) -> impl Iterator<Item = ComponentTypeId> + '_ {
        self.components.keys().copied()
    }

    /// Every attached component.
    pub fn components(&self) -> impl Iterator<Item = &ErasedComponent> {
        self.components.values()
    }

    /// Flag every component as changed so the next update resends it.
    pub fn mark_all_changed(&self) {
        for component in self.components.values() {
            component.set_changed(true);
        }
    }

    /// Replicated components whose changed flag is set.
    pub fn changed_components(&self) -> impl Iterator<Item = &ErasedComponent> {
        self.components
            .values()
            .filter(|c| c.replicated() && c.is_changed())
    }

    /// Component types removed with `notify` since the last call to
    /// [`take_pending_removals`](Self::take_pending_removals).
    #[must_use]
    pub fn pending_removals(&self) -> &[ComponentTypeId] {
        &self.pending_removals
    }

    /// Drain the pending-removal list.
    pub fn take_pending_removals(&mut self) -> Vec<ComponentTypeId> {
        std::mem::take(&mut self.pending_removals)
    }

    /// The entity's own stopwatch.
    pub fn clock_mut(&mut self) -> &mut Clock {
        &mut self.clock
    }
}

impl fmt::Debug for Entity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.components.values().map(|c| c.type_name()).collect();
        f.debug_struct("Entity")
            .field("id", &self.id)
            .field("components", &names)
            .field("pending_removals", &self.pending_removals)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Health {
        hp: i32,
    }

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Layer(u8);

    impl Component for Layer {
        fn type_name() -> &'static str {
            "Layer"
        }

        fn replicated() -> bool {
            false
        }
    }

    #[test]
    fn test_entity_id_validity() {
        assert!(!EntityId::INVALID.is_valid());
        assert!(EntityId::from_raw(42).is_valid());
        assert_eq!(EntityId(7).to_string(), "Entity(7)");
    }

    #[test]
    fn test_allocator_produces_unique_ids() {
        let mut alloc = EntityAllocator::new();
        assert_eq!(alloc.allocate(), EntityId(1));
        assert_eq!(alloc.allocate(), EntityId(2));
        assert_eq!(alloc.allocate(), EntityId(3));
    }

    #[test]
    fn test_allocator_reserve_skips_ahead() {
        let mut alloc = EntityAllocator::new();
        assert_eq!(alloc.reserve(EntityId(10)), EntityId(10));
        assert_eq!(alloc.allocate(), EntityId(11));
        // Below next: unchanged and does not move the cursor back.
        assert_eq!(alloc.reserve(EntityId(3)), EntityId(3));
        assert_eq!(alloc.peek(), EntityId(12));
    }

    #[test]
    fn test_add_replaces_same_type() {
        let mut entity = Entity::new(EntityId(1));
        let first = entity.add(Health { hp: 3 });
        let second = entity.add(Health { hp: 5 });
        assert_eq!(entity.len(), 1);
        assert!(!first.ptr_eq(&second));
        assert_eq!(entity.get::<Health>().unwrap().get().hp, 5);
    }

    #[test]
    fn test_remove_with_notify_records_type() {
        let mut entity = Entity::new(EntityId(1));
        entity.add(Health { hp: 3 });
        entity.add(Layer(1));

        assert!(entity.remove::<Health>(true));
        assert!(entity.remove::<Layer>(false));
        assert!(!entity.remove::<Health>(true));

        assert_eq!(entity.pending_removals(), &[Health::component_type_id()]);
        assert_eq!(entity.take_pending_removals().len(), 1);
        assert!(entity.pending_removals().is_empty());
        assert!(entity.is_empty());
    }

    #[test]
    fn test_changed_components_skips_local_only() {
        let mut entity = Entity::new(EntityId(1));
        entity.add(Health { hp: 3 });
        entity.add(Layer(2));

        let changed: Vec<_> = entity.changed_components().map(|c| c.type_name()).collect();
        assert_eq!(changed, vec!["Health"]);

        for component in entity.components() {
            component.set_changed(false);
        }
        assert_eq!(entity.changed_components().count(), 0);

        entity.mark_all_changed();
        assert_eq!(entity.changed_components().count(), 1);
    }

    #[test]
    fn test_clear_does_not_record_removals() {
        let mut entity = Entity::new(EntityId(1));
        entity.add(Health { hp: 3 });
        entity.clear();
        assert!(entity.is_empty());
        assert!(entity.pending_removals().is_empty());
    }
}
