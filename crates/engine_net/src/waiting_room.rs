//! Lobby bookkeeping on the host.

use std::net::{IpAddr, SocketAddr};

use tracing::{debug, info};

/// Maximum number of peers in one lobby.
pub const MAX_PLAYERS: usize = 4;

/// Peers needed before the host may start.
pub const MIN_PLAYERS: usize = 2;

/// Connection state of a peer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    InLobby,
    InGame,
    Disconnected,
}

/// Everything the host knows about one peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    pub addr: SocketAddr,
    pub state: ClientState,
    pub has_switched_world: bool,
    pub is_initialized: bool,
    /// The host's own loopback entry.
    pub is_server: bool,
    pub player_number: usize,
    pub is_alive: bool,
}

impl ClientInfo {
    #[must_use]
    pub fn new(addr: SocketAddr, is_server: bool) -> Self {
        Self {
            addr,
            state: ClientState::InLobby,
            has_switched_world: false,
            is_initialized: false,
            is_server,
            player_number: 0,
            is_alive: true,
        }
    }
}

/// Peers that joined the host, in join order.
#[derive(Debug, Default)]
pub struct WaitingRoom {
    players: Vec<ClientInfo>,
    started: bool,
}

impl WaitingRoom {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a peer. Returns `false` if the lobby is full.
    pub fn add_player(&mut self, addr: SocketAddr, is_server: bool) -> bool {
        if self.is_full() {
            debug!(%addr, "lobby full, peer ignored");
            return false;
        }
        self.players.push(ClientInfo::new(addr, is_server));
        info!(%addr, is_server, players = self.players.len(), "peer joined lobby");
        true
    }

    /// Remove the first peer whose address has this IP.
    pub fn remove_player(&mut self, ip: IpAddr) -> Option<ClientInfo> {
        let index = self.players.iter().position(|p| p.addr.ip() == ip)?;
        let removed = self.players.remove(index);
        info!(addr = %removed.addr, "peer left lobby");
        Some(removed)
    }

    /// Forget every peer and the started flag.
    pub fn clear(&mut self) {
        self.players.clear();
        self.started = false;
    }

    #[must_use]
    pub fn players(&self) -> &[ClientInfo] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [ClientInfo] {
        &mut self.players
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.players.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    #[must_use]
    pub fn is_full(&self) -> bool {
        self.players.len() >= MAX_PLAYERS
    }

    /// Whether enough peers joined to start.
    #[must_use]
    pub fn is_ready_to_start(&self) -> bool {
        self.players.len() >= MIN_PLAYERS
    }

    /// Whether [`all_initialized`](Self::all_initialized) has succeeded.
    #[must_use]
    pub fn is_game_started(&self) -> bool {
        self.started
    }

    pub fn player_mut(&mut self, addr: SocketAddr) -> Option<&mut ClientInfo> {
        self.players.iter_mut().find(|p| p.addr == addr)
    }

    /// Player number assigned to the peer at `addr`.
    #[must_use]
    pub fn find_player_number(&self, addr: SocketAddr) -> Option<usize> {
        self.players
            .iter()
            .find(|p| p.addr == addr)
            .map(|p| p.player_number)
    }

    #[must_use]
    pub fn all_switched_world(&self) -> bool {
        self.players.iter().all(|p| p.has_switched_world)
    }

    /// Mark the peer playing `player_number` as dead. Returns `false` if no
    /// peer has that number.
    pub fn mark_dead(&mut self, player_number: usize) -> bool {
        let Some(player) = self
            .players
            .iter_mut()
            .find(|p| p.player_number == player_number)
        else {
            return false;
        };
        player.is_alive = false;
        info!(addr = %player.addr, player_number, "player died");
        true
    }

    #[must_use]
    pub fn all_dead(&self) -> bool {
        self.players.iter().all(|p| !p.is_alive)
    }

    /// Whether every peer applied the initial snapshot. Marks the game as
    /// started when it returns `true`.
    pub fn all_initialized(&mut self) -> bool {
        if self.players.iter().all(|p| p.is_initialized) {
            self.started = true;
            for player in &mut self.players {
                player.state = ClientState::InGame;
            }
            true
        } else {
            false
        }
    }
}
