//! Component replication between the host and its clients.
//!
//! The host turns world changes into [`ClientUpdate`] payloads:
//!
//! - [`collect_changed`] — every replicated component whose changed flag is
//!   set, grouped per entity. Flags are cleared once serialised.
//! - [`collect_removed`] — component types removed with `notify`, minus any
//!   type the entity carries again.
//!
//! Clients decode payloads into [`PendingUpdate`]s against their current
//! world and [`apply`] them once the frame's systems have run.
//!
//! [`ClientUpdate`]: crate::packets::ClientUpdate

use std::fmt;

use engine_ecs::{ComponentTypeId, EntityId, ErasedComponent, World};
use tracing::{trace, warn};

use crate::error::NetError;
use crate::packets::{ComponentPayload, EntityUpdate, RemovedComponents};

/// Turns a wire tag and payload back into a component.
pub trait ComponentDecoder {
    /// Decode `bytes` as the component type tagged `type_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::UnknownComponent`] for unregistered tags, or a
    /// decode error for malformed payloads.
    fn decode(&self, type_id: ComponentTypeId, bytes: &[u8]) -> Result<ErasedComponent, NetError>;
}

/// A change to apply to one entity on a client.
pub struct PendingUpdate {
    pub entity: EntityId,
    /// Component types to detach first.
    pub remove: Vec<ComponentTypeId>,
    /// Components to attach afterwards.
    pub add: Vec<ErasedComponent>,
}

impl PendingUpdate {
    /// An update that deletes the entity.
    #[must_use]
    pub fn delete(entity: EntityId) -> Self {
        Self {
            entity,
            remove: Vec::new(),
            add: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_delete(&self) -> bool {
        self.remove.is_empty() && self.add.is_empty()
    }
}

impl fmt::Debug for PendingUpdate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let added: Vec<&str> = self.add.iter().map(|c| c.type_name()).collect();
        f.debug_struct("PendingUpdate")
            .field("entity", &self.entity)
            .field("remove", &self.remove)
            .field("add", &added)
            .finish()
    }
}

// ── Host side ───────────────────────────────────────────────────────────────

/// Serialise every changed replicated component and clear its flag.
///
/// Entities without changes are skipped.
///
/// # Errors
///
/// Fails if a component cannot be encoded.
pub fn collect_changed(world: &World) -> Result<Vec<EntityUpdate>, NetError> {
    let mut updates = Vec::new();
    for entity in world.entities() {
        let mut components = Vec::new();
        for component in entity.changed_components() {
            components.push(ComponentPayload {
                type_id: component.component_type(),
                data: component.encode()?,
            });
            component.set_changed(false);
        }
        if !components.is_empty() {
            updates.push(EntityUpdate {
                entity: entity.id(),
                components,
            });
        }
    }
    Ok(updates)
}

/// Drain every entity's pending removals.
///
/// Types the entity carries again are dropped from the list; entities left
/// with nothing to report are skipped.
pub fn collect_removed(world: &mut World) -> Vec<RemovedComponents> {
    let mut removed = Vec::new();
    for entity in world.entities_mut() {
        let pending = entity.take_pending_removals();
        let types: Vec<ComponentTypeId> = pending
            .into_iter()
            .filter(|type_id| !entity.has_type(*type_id))
            .collect();
        if !types.is_empty() {
            removed.push(RemovedComponents {
                entity: entity.id(),
                types,
            });
        }
    }
    removed
}

// ── Client side ─────────────────────────────────────────────────────────────

/// Decode an [`EntityUpdate`] against the client's world.
///
/// Components that fail to decode are skipped with a warning. Types the
/// entity already carries are queued for removal so the new values replace
/// them. Returns `None` when nothing decoded.
pub fn decode_entity_update(
    world: &World,
    decoder: &dyn ComponentDecoder,
    update: &EntityUpdate,
) -> Option<PendingUpdate> {
    let mut add = Vec::with_capacity(update.components.len());
    for payload in &update.components {
        match decoder.decode(payload.type_id, &payload.data) {
            Ok(component) => add.push(component),
            Err(err) => warn!(
                entity = update.entity.0,
                type_id = %payload.type_id,
                error = %err,
                "dropping undecodable component"
            ),
        }
    }
    if add.is_empty() {
        return None;
    }
    let remove = match world.entity(update.entity) {
        Some(entity) => add
            .iter()
            .map(|c| c.component_type())
            .filter(|type_id| entity.has_type(*type_id))
            .collect(),
        None => Vec::new(),
    };
    Some(PendingUpdate {
        entity: update.entity,
        remove,
        add,
    })
}

/// Decode a component removal. Only types the entity carries are kept.
#[must_use]
pub fn decode_removed(world: &World, removed: &RemovedComponents) -> Option<PendingUpdate> {
    let entity = world.entity(removed.entity)?;
    let remove: Vec<ComponentTypeId> = removed
        .types
        .iter()
        .copied()
        .filter(|type_id| entity.has_type(*type_id))
        .collect();
    if remove.is_empty() {
        return None;
    }
    Some(PendingUpdate {
        entity: removed.entity,
        remove,
        add: Vec::new(),
    })
}

/// Decode an entity deletion. Unknown entities yield `None`.
#[must_use]
pub fn decode_removed_entity(world: &World, entity: EntityId) -> Option<PendingUpdate> {
    world
        .entity_exists(entity)
        .then(|| PendingUpdate::delete(entity))
}

/// Apply decoded updates to the client's world, in order.
///
/// - missing entity with components to add: created with the host's id;
/// - existing entity with nothing to add or remove: deleted immediately;
/// - otherwise: listed types removed, then new components attached.
pub fn apply(world: &mut World, updates: Vec<PendingUpdate>) {
    for update in updates {
        if !world.entity_exists(update.entity) {
            if update.add.is_empty() {
                continue;
            }
            world.add_entity_with_id(update.entity);
        } else if update.is_delete() {
            world.despawn(update.entity);
            trace!(entity = update.entity.0, "replicated entity removed");
            continue;
        }
        let Some(entity) = world.entity_mut(update.entity) else {
            continue;
        };
        for type_id in &update.remove {
            entity.remove_by_type(*type_id, false);
        }
        for component in update.add {
            entity.insert_erased(component);
        }
    }
}
