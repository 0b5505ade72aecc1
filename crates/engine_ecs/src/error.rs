//! ECS error types.

/// Errors produced by entities, worlds and component serialisation.
#[derive(Debug, thiserror::Error)]
pub enum EcsError {
    /// Failed to encode a component to MessagePack.
    #[error("failed to encode component `{component}`: {source}")]
    Encode {
        component: &'static str,
        #[source]
        source: rmp_serde::encode::Error,
    },

    /// Failed to decode a component from MessagePack.
    #[error("failed to decode component `{component}`: {source}")]
    Decode {
        component: &'static str,
        #[source]
        source: rmp_serde::decode::Error,
    },

    /// The component was mutably borrowed while it had to be read.
    #[error("component `{0}` is already mutably borrowed")]
    BorrowConflict(&'static str),

    /// A system with the same name is already registered on the world.
    #[error("system `{0}` is already registered")]
    DuplicateSystem(String),

    /// No system with this name is registered on the world.
    #[error("unknown system `{0}`")]
    UnknownSystem(String),
}
