//! # engine_net
//!
//! UDP networking for the R-Type engine: one host, up to three clients.
//!
//! This crate provides:
//!
//! - [`packets`] — every packet exchanged between host and clients.
//! - [`codec`] — MessagePack serialisation/deserialisation helpers.
//! - [`input`] — key and window events forwarded to the host.
//! - [`waiting_room`] — lobby bookkeeping on the host.
//! - [`session`] — the lobby and game protocol as a socket-free state machine.
//! - [`replication`] — turning world changes into packets and back.
//! - [`transport`] — the tokio UDP socket task.
//! - [`error`] — Network-layer error types.

pub mod codec;
pub mod error;
pub mod input;
pub mod packets;
pub mod replication;
pub mod session;
pub mod transport;
pub mod waiting_room;

pub use codec::{decode, encode};
pub use error::NetError;
pub use input::{InputEvent, Key, KeyEvent};
pub use packets::{ClientUpdate, ComponentPayload, EntityUpdate, Packet, RemovedComponents};
pub use replication::{ComponentDecoder, PendingUpdate};
pub use session::{Role, Session, SessionEvent};
pub use transport::{DEFAULT_PORT, Transport};
pub use waiting_room::{ClientInfo, ClientState, WaitingRoom};
