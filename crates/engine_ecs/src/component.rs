//! Core [`Component`] trait, shared component cells and typed handles.
//!
//! Components live in reference-counted cells owned by their [`Entity`]
//! (see [`crate::entity`]). Systems receive [`ComponentHandle`]s that point
//! at those cells, so a handle stays usable while the world is borrowed
//! mutably elsewhere in the same system.
//!
//! ## Wire identity
//!
//! [`ComponentTypeId`] is derived from the component's **string name** using
//! the FNV-1a 64-bit hash algorithm. Server and client compute the same tag
//! for the same name, which is what the replication layer puts on the wire.
//!
//! ## Change tracking
//!
//! Every cell carries a *changed* flag. It starts out `true` so freshly added
//! components are replicated, is set again by [`ComponentHandle::get_mut`],
//! and is cleared by whoever serialises the component for the network.
//!
//! [`Entity`]: crate::entity::Entity

use std::any::Any;
use std::cell::{Cell, Ref, RefCell, RefMut};
use std::fmt;
use std::rc::Rc;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::EcsError;

/// A unique identifier for a component type, derived from its string name
/// using the FNV-1a 64-bit hash algorithm.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, PartialOrd, Ord)]
pub struct ComponentTypeId(pub u64);

impl ComponentTypeId {
    /// FNV-1a 64-bit offset basis.
    const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;

    /// FNV-1a 64-bit prime.
    const FNV_PRIME: u64 = 0x0100_0000_01b3;

    /// Compute the [`ComponentTypeId`] from a component's string name.
    ///
    /// # Algorithm (FNV-1a 64-bit)
    ///
    /// ```text
    /// hash = 0xcbf29ce484222325          (offset basis)
    /// for each byte in name.as_bytes():
    ///     hash = hash XOR byte
    ///     hash = hash * 0x00000100000001b3  (prime)
    /// return hash
    /// ```
    #[must_use]
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash = Self::FNV_OFFSET_BASIS;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u64;
            hash = hash.wrapping_mul(Self::FNV_PRIME);
            i += 1;
        }
        Self(hash)
    }

    /// Compute the [`ComponentTypeId`] for a Rust component type `T`.
    #[must_use]
    pub fn of<T: Component>() -> Self {
        Self::from_name(T::type_name())
    }
}

impl fmt::Display for ComponentTypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#018x}", self.0)
    }
}

/// The core component trait.
///
/// All data attached to entities implements this trait. Components must be
/// serialisable so the server can ship them to clients.
///
/// # Examples
///
/// ```rust
/// use serde::{Serialize, Deserialize};
/// use engine_ecs::Component;
///
/// #[derive(Debug, Clone, Serialize, Deserialize)]
/// struct Health {
///     hp: i32,
/// }
///
/// impl Component for Health {
///     fn type_name() -> &'static str { "Health" }
/// }
/// ```
pub trait Component: Serialize + DeserializeOwned + 'static {
    /// A human-readable name for this component type. Must be unique across
    /// the engine; it is hashed into the wire tag.
    fn type_name() -> &'static str;

    /// Whether this component is sent to clients. Local-only components
    /// (purely cosmetic state, for instance) return `false`.
    fn replicated() -> bool {
        true
    }

    /// Returns the [`ComponentTypeId`] for this component.
    fn component_type_id() -> ComponentTypeId {
        ComponentTypeId::from_name(Self::type_name())
    }
}

/// Storage cell for a single component value plus its changed flag.
#[derive(Debug)]
pub struct ComponentCell<T> {
    value: RefCell<T>,
    changed: Cell<bool>,
}

impl<T: Component> ComponentCell<T> {
    /// Wrap a value. New cells are flagged as changed.
    #[must_use]
    pub fn new(value: T) -> Self {
        Self {
            value: RefCell::new(value),
            changed: Cell::new(true),
        }
    }

    /// Decode a MessagePack payload into a fresh, changed cell.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::Decode`] if the bytes are not a valid `T`.
    pub fn decode(bytes: &[u8]) -> Result<Self, EcsError> {
        let value: T = rmp_serde::from_slice(bytes).map_err(|source| EcsError::Decode {
            component: T::type_name(),
            source,
        })?;
        Ok(Self::new(value))
    }
}

/// Object-safe view of a [`ComponentCell`], used wherever the concrete
/// component type is not known (replication, the component registry).
pub trait AnyComponent {
    /// The wire tag of the stored component.
    fn component_type(&self) -> ComponentTypeId;

    /// The human-readable name of the stored component.
    fn type_name(&self) -> &'static str;

    /// Whether the stored component is sent to clients.
    fn replicated(&self) -> bool;

    /// Whether the component changed since the flag was last cleared.
    fn is_changed(&self) -> bool;

    /// Overwrite the changed flag.
    fn set_changed(&self, changed: bool);

    /// Serialise the stored value to MessagePack.
    ///
    /// # Errors
    ///
    /// Fails if the value is mutably borrowed or cannot be encoded.
    fn encode(&self) -> Result<Vec<u8>, EcsError>;

    /// Upcast for typed downcasting.
    fn into_any(self: Rc<Self>) -> Rc<dyn Any>;
}

impl<T: Component> AnyComponent for ComponentCell<T> {
    fn component_type(&self) -> ComponentTypeId {
        T::component_type_id()
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn replicated(&self) -> bool {
        T::replicated()
    }

    fn is_changed(&self) -> bool {
        self.changed.get()
    }

    fn set_changed(&self, changed: bool) {
        self.changed.set(changed);
    }

    fn encode(&self) -> Result<Vec<u8>, EcsError> {
        let value = self
            .value
            .try_borrow()
            .map_err(|_| EcsError::BorrowConflict(T::type_name()))?;
        rmp_serde::to_vec_named(&*value).map_err(|source| EcsError::Encode {
            component: T::type_name(),
            source,
        })
    }

    fn into_any(self: Rc<Self>) -> Rc<dyn Any> {
        self
    }
}

/// A type-erased, shared component cell.
pub type ErasedComponent = Rc<dyn AnyComponent>;

/// Decode `bytes` as a `T` and wrap it in a type-erased cell.
///
/// This is the function the component registry stores per wire tag.
///
/// # Errors
///
/// Returns [`EcsError::Decode`] if the payload is not a valid `T`.
pub fn decode_erased<T: Component>(bytes: &[u8]) -> Result<ErasedComponent, EcsError> {
    Ok(Rc::new(ComponentCell::<T>::decode(bytes)?))
}

/// Typed handle to a component stored on an entity.
///
/// Handles are cheap to clone and compare by identity. Mutable access flags
/// the component as changed.
pub struct ComponentHandle<T: Component> {
    cell: Rc<ComponentCell<T>>,
}

impl<T: Component> ComponentHandle<T> {
    pub(crate) fn from_erased(cell: &ErasedComponent) -> Option<Self> {
        Rc::clone(cell)
            .into_any()
            .downcast::<ComponentCell<T>>()
            .ok()
            .map(|cell| Self { cell })
    }

    pub(crate) fn new(cell: Rc<ComponentCell<T>>) -> Self {
        Self { cell }
    }

    /// Shared access to the component.
    ///
    /// # Panics
    ///
    /// Panics if the component is currently borrowed mutably.
    #[must_use]
    pub fn get(&self) -> Ref<'_, T> {
        self.cell.value.borrow()
    }

    /// Mutable access to the component; marks it as changed.
    ///
    /// # Panics
    ///
    /// Panics if the component is currently borrowed.
    #[must_use]
    pub fn get_mut(&self) -> RefMut<'_, T> {
        self.cell.changed.set(true);
        self.cell.value.borrow_mut()
    }

    /// Whether the component changed since it was last replicated.
    #[must_use]
    pub fn is_changed(&self) -> bool {
        self.cell.changed.get()
    }

    /// Returns `true` if both handles point at the same stored component.
    #[must_use]
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.cell, &other.cell)
    }
}

impl<T: Component> Clone for ComponentHandle<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Rc::clone(&self.cell),
        }
    }
}

impl<T: Component + fmt::Debug> fmt::Debug for ComponentHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentHandle")
            .field("type", &T::type_name())
            .field("value", &self.cell.value)
            .field("changed", &self.cell.changed.get())
            .finish()
    }
}
