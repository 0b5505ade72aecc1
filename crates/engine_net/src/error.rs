//! Network-layer error types.

use engine_ecs::{ComponentTypeId, EcsError};

/// Errors that can occur during network operations.
#[derive(Debug, thiserror::Error)]
pub enum NetError {
    /// Failed to encode a message to MessagePack.
    #[error("failed to encode message: {0}")]
    Encode(#[from] rmp_serde::encode::Error),

    /// Failed to decode a message from MessagePack.
    #[error("failed to decode message: {0}")]
    Decode(#[from] rmp_serde::decode::Error),

    /// Socket error.
    #[error("socket error: {0}")]
    Io(#[from] std::io::Error),

    /// Component (de)serialisation failed.
    #[error(transparent)]
    Ecs(#[from] EcsError),

    /// A replicated component carried a wire tag nobody registered.
    #[error("unknown component type {0}")]
    UnknownComponent(ComponentTypeId),

    /// The transport task is gone.
    #[error("transport channel closed")]
    ChannelClosed,

    /// A session and its transport are already running.
    #[error("network already running")]
    AlreadyRunning,
}
