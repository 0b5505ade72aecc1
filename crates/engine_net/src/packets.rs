//! Packet types exchanged between the host and its clients.
//!
//! Every datagram carries one [`Packet`]. Component payloads inside
//! [`ClientUpdate`] are themselves MessagePack blobs tagged with their
//! [`ComponentTypeId`], so the packet layer never needs to know the concrete
//! component types.

use engine_ecs::{ComponentTypeId, EntityId};
use serde::{Deserialize, Serialize};

use crate::input::InputEvent;

// ── Replication payloads ────────────────────────────────────────────────────

/// One serialised component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ComponentPayload {
    /// Wire tag of the component type.
    pub type_id: ComponentTypeId,
    /// MessagePack encoding of the component value.
    pub data: Vec<u8>,
}

/// Changed components of one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub entity: EntityId,
    pub components: Vec<ComponentPayload>,
}

/// Component types removed from one entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemovedComponents {
    pub entity: EntityId,
    pub types: Vec<ComponentTypeId>,
}

/// A batch of world changes sent from the host to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum ClientUpdate {
    /// Components added or changed.
    AddComponents(Vec<EntityUpdate>),
    /// Components removed from entities that still exist.
    RemoveComponents(Vec<RemovedComponents>),
    /// Entities deleted.
    RemoveEntity(Vec<EntityId>),
}

impl ClientUpdate {
    /// Returns `true` if the update carries nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::AddComponents(updates) => updates.is_empty(),
            Self::RemoveComponents(removed) => removed.is_empty(),
            Self::RemoveEntity(ids) => ids.is_empty(),
        }
    }
}

// ── Packets ─────────────────────────────────────────────────────────────────

/// Everything that travels over the socket.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Packet {
    /// A client asks to join the lobby.
    HandshakeRequest { is_host: bool },
    /// The host's answer to [`Packet::HandshakeRequest`].
    HandshakeResponse { accepted: bool },
    /// The host asks everyone to switch to the game world.
    SwitchWorld,
    /// A peer has switched to the game world.
    SwitchWorldOkForMe,
    /// A client leaves the lobby.
    LeaveLobby,
    LeaveLobbyResponse,
    /// Tells a peer which player number it controls.
    ClientIndependentInitialization { player: usize },
    /// Player count and a snapshot of every replicated entity.
    InitializeGame {
        players: usize,
        entities: Vec<EntityUpdate>,
    },
    /// A peer has applied the initial snapshot.
    InitializeGameOkForMe,
    /// Every peer is initialised; the game starts.
    LaunchGame,
    /// Input events a client forwards to the host.
    KeyInputs { events: Vec<InputEvent> },
    /// World changes from the host.
    ClientUpdate(ClientUpdate),
    ClientUpdateAck,
    GlobalState,
    PlayerAction,
    ActionOutcome,
    Heartbeat,
    PlayerDisconnected,
    Error { message: String },
    ErrorAcknowledged,
    /// The game is over; peers reset their session.
    EndGame,
    EndGameAcknowledged,
}

impl Packet {
    /// Short name for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Self::HandshakeRequest { .. } => "HandshakeRequest",
            Self::HandshakeResponse { .. } => "HandshakeResponse",
            Self::SwitchWorld => "SwitchWorld",
            Self::SwitchWorldOkForMe => "SwitchWorldOkForMe",
            Self::LeaveLobby => "LeaveLobby",
            Self::LeaveLobbyResponse => "LeaveLobbyResponse",
            Self::ClientIndependentInitialization { .. } => "ClientIndependentInitialization",
            Self::InitializeGame { .. } => "InitializeGame",
            Self::InitializeGameOkForMe => "InitializeGameOkForMe",
            Self::LaunchGame => "LaunchGame",
            Self::KeyInputs { .. } => "KeyInputs",
            Self::ClientUpdate(_) => "ClientUpdate",
            Self::ClientUpdateAck => "ClientUpdateAck",
            Self::GlobalState => "GlobalState",
            Self::PlayerAction => "PlayerAction",
            Self::ActionOutcome => "ActionOutcome",
            Self::Heartbeat => "Heartbeat",
            Self::PlayerDisconnected => "PlayerDisconnected",
            Self::Error { .. } => "Error",
            Self::ErrorAcknowledged => "ErrorAcknowledged",
            Self::EndGame => "EndGame",
            Self::EndGameAcknowledged => "EndGameAcknowledged",
        }
    }
}
