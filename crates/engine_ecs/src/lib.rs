//! # engine_ecs
//!
//! Entity-component-system core of the R-Type engine.
//!
//! This crate provides:
//!
//! - [`Component`] trait and [`ComponentHandle`] — typed, shared access to
//!   component data with change tracking for replication.
//! - [`Entity`] / [`EntityId`] — per-entity component stores and identifiers.
//! - [`World`] — entities, deferred removal, tuple queries, typed events and
//!   per-player system scheduling.
//! - [`EventSubscriber`] — the receiving side of world events.
//! - [`System`] — frame logic owned by a world.
//! - [`Clock`] — restartable stopwatch.

pub mod clock;
pub mod component;
pub mod entity;
pub mod error;
pub mod event;
pub mod query;
pub mod system;
pub mod world;

pub use clock::Clock;
pub use component::{
    AnyComponent, Component, ComponentCell, ComponentHandle, ComponentTypeId, ErasedComponent,
    decode_erased,
};
pub use entity::{Entity, EntityAllocator, EntityId};
pub use error::EcsError;
pub use event::{EventSubscriber, OnEntityCreated, OnEntityDestroyed, SubscriptionId};
pub use query::{Bundle, Query};
pub use system::{Players, Schedule, System};
pub use world::World;
