//! Component registry: maps wire tags back to concrete component types.
//!
//! Replicated components travel as `(ComponentTypeId, bytes)`. A client needs
//! to know which Rust type a tag stands for before it can rebuild the
//! component, so every replicated type is registered here once.

use std::collections::HashMap;

use engine_ecs::{Component, ComponentTypeId, EcsError, ErasedComponent, decode_erased};
use engine_net::{ComponentDecoder, NetError};
use tracing::warn;

use crate::components::{
    Animation, Collision, Enemy, ExcludeCollision, Health, Link, Moving, Player, Position,
    Renderable, Score, Speed, WorldMoveProgress,
};

type DecodeFn = fn(&[u8]) -> Result<ErasedComponent, EcsError>;

/// A registered component type.
#[derive(Debug, Clone, Copy)]
pub struct ComponentInfo {
    pub name: &'static str,
    decode: DecodeFn,
}

/// Registry of component types that can arrive over the network.
#[derive(Debug, Default)]
pub struct ComponentRegistry {
    components: HashMap<ComponentTypeId, ComponentInfo>,
}

impl ComponentRegistry {
    /// Create a new empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            components: HashMap::new(),
        }
    }

    /// A registry holding every replicated engine component.
    #[must_use]
    pub fn with_engine_components() -> Self {
        let mut registry = Self::new();
        registry.register::<Position>();
        registry.register::<Speed>();
        registry.register::<Moving>();
        registry.register::<Collision>();
        registry.register::<ExcludeCollision>();
        registry.register::<Score>();
        registry.register::<Health>();
        registry.register::<Player>();
        registry.register::<Enemy>();
        registry.register::<Link>();
        registry.register::<WorldMoveProgress>();
        registry.register::<Renderable>();
        registry.register::<Animation>();
        registry
    }

    /// Register `T`. Local-only components are ignored since they never
    /// reach the wire.
    ///
    /// Returns `true` if `T` was newly registered.
    pub fn register<T: Component>(&mut self) -> bool {
        if !T::replicated() {
            return false;
        }
        let type_id = T::component_type_id();
        if let Some(existing) = self.components.get(&type_id) {
            if existing.name != T::type_name() {
                warn!(
                    %type_id,
                    existing = existing.name,
                    new = T::type_name(),
                    "component tag collision, keeping the first registration"
                );
            }
            return false;
        }
        self.components.insert(
            type_id,
            ComponentInfo {
                name: T::type_name(),
                decode: decode_erased::<T>,
            },
        );
        true
    }

    /// Returns information about a registered type.
    #[must_use]
    pub fn get(&self, type_id: ComponentTypeId) -> Option<&ComponentInfo> {
        self.components.get(&type_id)
    }

    /// Returns `true` if `type_id` is registered.
    #[must_use]
    pub fn contains(&self, type_id: ComponentTypeId) -> bool {
        self.components.contains_key(&type_id)
    }

    /// Returns the number of registered types.
    #[must_use]
    pub fn len(&self) -> usize {
        self.components.len()
    }

    /// Returns `true` if nothing is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.components.is_empty()
    }
}

impl ComponentDecoder for ComponentRegistry {
    fn decode(&self, type_id: ComponentTypeId, bytes: &[u8]) -> Result<ErasedComponent, NetError> {
        let info = self
            .components
            .get(&type_id)
            .ok_or(NetError::UnknownComponent(type_id))?;
        Ok((info.decode)(bytes)?)
    }
}
