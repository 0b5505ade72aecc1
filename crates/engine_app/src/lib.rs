//! # engine_app
//!
//! Runtime of the R-Type engine, built on [`engine_ecs`] and [`engine_net`].
//!
//! This crate provides:
//!
//! - [`engine`] — the [`Engine`]: world factories, global entities, input,
//!   the host/client session and the frame loop.
//! - [`components`] / [`events`] — the engine's stock components and events.
//! - [`systems`] — physics, world scrolling, parallax, animation and score.
//! - [`registry`] — wire tag to component type mapping for replication.
//! - [`config`] — [`EngineConfig`] and its environment overrides.
//! - [`game`] — the demo worlds the `rtype` binary plays.
//! - [`error`] — Engine-level error types.

pub mod components;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod game;
pub mod registry;
pub mod systems;

pub use config::EngineConfig;
pub use engine::{Engine, WorldFactory};
pub use error::EngineError;
pub use registry::ComponentRegistry;
