//! Engine error types.

use engine_ecs::EcsError;
use engine_net::NetError;

/// Errors raised by the [`Engine`](crate::Engine).
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// No factory is registered under this name.
    #[error("unknown world {0:?}")]
    UnknownWorld(String),

    /// A network operation needs a session and there is none.
    #[error("not connected")]
    NotConnected,

    /// The operation is only valid on the host.
    #[error("only the host can do this")]
    NotHost,

    #[error(transparent)]
    Ecs(#[from] EcsError),

    #[error(transparent)]
    Net(#[from] NetError),
}
