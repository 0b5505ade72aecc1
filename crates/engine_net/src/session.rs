//! Lobby and game protocol, independent of any socket.
//!
//! A [`Session`] consumes received [`Packet`]s and produces two things:
//!
//! - outgoing packets, drained with [`Session::take_outgoing`] and handed to
//!   the transport;
//! - [`SessionEvent`]s, returned from [`Session::handle_packet`], for effects
//!   the engine must apply (switching worlds, player numbers, resets).
//!
//! The host is a member of its own lobby: it sends lobby packets to itself
//! over loopback and goes through the same handshake steps as every client.
//!
//! ## Start-up sequence
//!
//! ```text
//! host                              client
//!  |  <-- HandshakeRequest ---------  |
//!  |  --- HandshakeResponse ------->  |
//!  |  --- SwitchWorld ------------->  |   (start_game)
//!  |  <-- SwitchWorldOkForMe -------  |
//!  |  --- ClientIndependentInit --->  |   (player numbers)
//!  |  --- InitializeGame ---------->  |   (once everyone switched)
//!  |  <-- InitializeGameOkForMe ----  |
//!  |  --- LaunchGame -------------->  |   (once everyone initialised)
//! ```

use std::collections::BTreeMap;
use std::net::SocketAddr;

use engine_ecs::{EntityId, World};
use tracing::{debug, info, warn};

use crate::error::NetError;
use crate::input::InputEvent;
use crate::packets::{ClientUpdate, Packet};
use crate::replication::{self, ComponentDecoder, PendingUpdate};
use crate::waiting_room::WaitingRoom;

/// Which side of the connection this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Host,
    Client,
}

/// Effects of a packet that the engine must carry out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// Switch to the game world.
    SwitchToGame,
    /// Every peer switched: switch to the game world, then call
    /// [`Session::initialize_clients`] with it.
    InitializeClients,
    /// Number of players in the game.
    SetPlayersAmount(usize),
    /// The player this process controls.
    SetOwnPlayer(usize),
    /// Every peer is initialised and the game runs.
    GameLaunched,
    /// The host ended the game.
    ResetRequested,
}

/// Protocol state of one host or client.
#[derive(Debug)]
pub struct Session {
    role: Role,
    /// Address the host reaches itself on, or the host's address for clients.
    host: SocketAddr,
    waiting_room: WaitingRoom,
    ready_to_start: bool,
    game_started: bool,
    need_reset: bool,
    /// Host: input forwarded by each player number.
    server_events: BTreeMap<usize, Vec<InputEvent>>,
    /// Client: input waiting to be forwarded.
    client_events: Vec<InputEvent>,
    /// Client: decoded world changes waiting to be applied.
    pending_updates: Vec<PendingUpdate>,
    outbox: Vec<(SocketAddr, Packet)>,
}

impl Session {
    /// A host reachable on `local_addr`. The host joins its own lobby.
    #[must_use]
    pub fn host(local_addr: SocketAddr) -> Self {
        let mut session = Self::new(Role::Host, local_addr);
        session.waiting_room.add_player(local_addr, true);
        session
    }

    /// A client of the host at `host`. Queues the handshake request.
    #[must_use]
    pub fn client(host: SocketAddr) -> Self {
        let mut session = Self::new(Role::Client, host);
        session.outbox.push((host, Packet::HandshakeRequest { is_host: false }));
        session
    }

    fn new(role: Role, host: SocketAddr) -> Self {
        Self {
            role,
            host,
            waiting_room: WaitingRoom::new(),
            ready_to_start: false,
            game_started: false,
            need_reset: false,
            server_events: BTreeMap::new(),
            client_events: Vec::new(),
            pending_updates: Vec::new(),
            outbox: Vec::new(),
        }
    }

    // ── State ───────────────────────────────────────────────────────────────

    #[must_use]
    pub fn role(&self) -> Role {
        self.role
    }

    #[must_use]
    pub fn is_server(&self) -> bool {
        self.role == Role::Host
    }

    #[must_use]
    pub fn host_addr(&self) -> SocketAddr {
        self.host
    }

    #[must_use]
    pub fn waiting_room(&self) -> &WaitingRoom {
        &self.waiting_room
    }

    pub fn waiting_room_mut(&mut self) -> &mut WaitingRoom {
        &mut self.waiting_room
    }

    #[must_use]
    pub fn game_started(&self) -> bool {
        self.game_started
    }

    #[must_use]
    pub fn is_ready_to_start(&self) -> bool {
        self.ready_to_start
    }

    /// Whether the host asked to end the game.
    #[must_use]
    pub fn need_reset(&self) -> bool {
        self.need_reset
    }

    /// Forget every peer and all queued state.
    pub fn reset(&mut self) {
        self.need_reset = false;
        self.game_started = false;
        self.ready_to_start = false;
        self.server_events.clear();
        self.client_events.clear();
        self.pending_updates.clear();
        self.waiting_room.clear();
        info!(role = ?self.role, "session reset");
    }

    // ── Outgoing ────────────────────────────────────────────────────────────

    /// Drain every packet queued for sending.
    pub fn take_outgoing(&mut self) -> Vec<(SocketAddr, Packet)> {
        std::mem::take(&mut self.outbox)
    }

    fn send_to(&mut self, addr: SocketAddr, packet: Packet) {
        self.outbox.push((addr, packet));
    }

    /// Queue `packet` for every peer in the lobby, optionally skipping the
    /// host's own entry.
    fn send_to_all(&mut self, packet: &Packet, include_server: bool) {
        for player in self.waiting_room.players() {
            if !include_server && player.is_server {
                continue;
            }
            self.outbox.push((player.addr, packet.clone()));
        }
    }

    /// Host: tell every peer to switch to the game world.
    pub fn start_game(&mut self) {
        self.ready_to_start = true;
        info!(players = self.waiting_room.len(), "starting game");
        self.send_to_all(&Packet::SwitchWorld, true);
    }

    /// Host: send the player count and a snapshot of `world` to every peer.
    ///
    /// # Errors
    ///
    /// Fails if a component cannot be encoded.
    pub fn initialize_clients(&mut self, world: &World) -> Result<(), NetError> {
        let packet = Packet::InitializeGame {
            players: self.waiting_room.len(),
            entities: replication::collect_changed(world)?,
        };
        self.send_to_all(&packet, true);
        Ok(())
    }

    /// Host: send this frame's world changes to every client.
    ///
    /// # Errors
    ///
    /// Fails if a component cannot be encoded.
    pub fn broadcast_world_changes(
        &mut self,
        world: &mut World,
        removed_entities: &[EntityId],
    ) -> Result<(), NetError> {
        let changed = replication::collect_changed(world)?;
        if !changed.is_empty() {
            self.send_to_all(&Packet::ClientUpdate(ClientUpdate::AddComponents(changed)), false);
        }
        let removed = replication::collect_removed(world);
        if !removed.is_empty() {
            self.send_to_all(&Packet::ClientUpdate(ClientUpdate::RemoveComponents(removed)), false);
        }
        if !removed_entities.is_empty() {
            let update = ClientUpdate::RemoveEntity(removed_entities.to_vec());
            self.send_to_all(&Packet::ClientUpdate(update), false);
        }
        Ok(())
    }

    /// Host: tell every client the game is over.
    pub fn send_game_over(&mut self) {
        self.send_to_all(&Packet::EndGame, false);
    }

    /// Host in game: `player` lost their ship. Once every peer is dead the
    /// clients are told the game is over and the host requests its own
    /// reset. Returns whether the game ended.
    pub fn player_died(&mut self, player: usize) -> bool {
        if self.role != Role::Host || !self.game_started {
            return false;
        }
        if !self.waiting_room.mark_dead(player) || !self.waiting_room.all_dead() {
            return false;
        }
        info!("every player is dead, ending game");
        self.send_game_over();
        self.need_reset = true;
        true
    }

    /// Client: remember a key event for the host once the game runs.
    pub fn queue_input(&mut self, event: InputEvent) {
        if self.role == Role::Client && self.game_started && event.is_key() {
            self.client_events.push(event);
        }
    }

    /// Client: forward queued input to the host.
    pub fn flush_inputs(&mut self) {
        if self.client_events.is_empty() {
            return;
        }
        let events = std::mem::take(&mut self.client_events);
        let host = self.host;
        self.send_to(host, Packet::KeyInputs { events });
    }

    /// Host: input forwarded by each non-host player, keyed by player number.
    pub fn take_client_inputs(&mut self) -> Vec<(usize, Vec<InputEvent>)> {
        let mut inputs = Vec::new();
        for player in self.waiting_room.players() {
            if player.is_server {
                continue;
            }
            if let Some(events) = self.server_events.remove(&player.player_number) {
                inputs.push((player.player_number, events));
            }
        }
        inputs
    }

    /// Client: drain decoded world changes.
    pub fn take_pending_updates(&mut self) -> Vec<PendingUpdate> {
        std::mem::take(&mut self.pending_updates)
    }

    // ── Incoming ────────────────────────────────────────────────────────────

    /// React to one received packet.
    ///
    /// `world` is the current world, used to decode world changes against.
    pub fn handle_packet(
        &mut self,
        world: &World,
        decoder: &dyn ComponentDecoder,
        from: SocketAddr,
        packet: Packet,
    ) -> Vec<SessionEvent> {
        debug!(%from, kind = packet.kind(), "packet received");
        let mut events = Vec::new();
        match packet {
            Packet::HandshakeRequest { is_host } => self.on_handshake(from, is_host),
            Packet::HandshakeResponse { accepted } => {
                info!(%from, accepted, "handshake answered");
            }
            Packet::LeaveLobby => {
                self.waiting_room.remove_player(from.ip());
            }
            Packet::SwitchWorld => self.on_switch_world(from, &mut events),
            Packet::SwitchWorldOkForMe => self.on_switched_world(from, &mut events),
            Packet::ClientIndependentInitialization { player } => {
                events.push(SessionEvent::SetOwnPlayer(player));
            }
            Packet::InitializeGame { players, entities } => {
                events.push(SessionEvent::SetPlayersAmount(players));
                if self.role == Role::Client {
                    self.pending_updates.extend(
                        entities
                            .iter()
                            .filter_map(|u| replication::decode_entity_update(world, decoder, u)),
                    );
                }
                self.send_to(from, Packet::InitializeGameOkForMe);
            }
            Packet::InitializeGameOkForMe => self.on_initialized(from),
            Packet::LaunchGame => {
                self.game_started = true;
                info!(role = ?self.role, "game launched");
                events.push(SessionEvent::GameLaunched);
            }
            Packet::ClientUpdate(update) => self.on_client_update(world, decoder, update),
            Packet::KeyInputs { events: inputs } => self.on_key_inputs(from, inputs),
            Packet::EndGame => {
                self.need_reset = true;
                events.push(SessionEvent::ResetRequested);
            }
            Packet::Error { message } => warn!(%from, message, "peer reported an error"),
            other => debug!(%from, kind = other.kind(), "packet ignored"),
        }
        events
    }

    fn on_handshake(&mut self, from: SocketAddr, is_host: bool) {
        if self.waiting_room.is_full() {
            debug!(%from, "handshake ignored, lobby full");
            return;
        }
        self.send_to(from, Packet::HandshakeResponse { accepted: true });
        self.waiting_room.add_player(from, is_host);
    }

    fn on_switch_world(&mut self, from: SocketAddr, events: &mut Vec<SessionEvent>) {
        let switch = match self.role {
            Role::Host => self.waiting_room.all_switched_world(),
            Role::Client => true,
        };
        if switch {
            events.push(SessionEvent::SwitchToGame);
        }
        self.send_to(from, Packet::SwitchWorldOkForMe);
    }

    fn on_switched_world(&mut self, from: SocketAddr, events: &mut Vec<SessionEvent>) {
        if let Some(player) = self.waiting_room.player_mut(from) {
            player.has_switched_world = true;
        }

        let mut assignments = Vec::with_capacity(self.waiting_room.len());
        for (number, player) in self.waiting_room.players_mut().iter_mut().enumerate() {
            player.player_number = number;
            assignments.push((player.addr, number));
        }
        for (addr, player) in assignments {
            self.send_to(addr, Packet::ClientIndependentInitialization { player });
        }

        if self.waiting_room.all_switched_world() {
            info!(players = self.waiting_room.len(), "every peer switched world");
            events.push(SessionEvent::InitializeClients);
        }
    }

    fn on_initialized(&mut self, from: SocketAddr) {
        if let Some(player) = self.waiting_room.player_mut(from) {
            player.is_initialized = true;
        }
        if self.waiting_room.all_initialized() {
            self.send_to_all(&Packet::LaunchGame, true);
        }
    }

    fn on_client_update(&mut self, world: &World, decoder: &dyn ComponentDecoder, update: ClientUpdate) {
        match update {
            ClientUpdate::AddComponents(updates) => self.pending_updates.extend(
                updates
                    .iter()
                    .filter_map(|u| replication::decode_entity_update(world, decoder, u)),
            ),
            ClientUpdate::RemoveComponents(removed) => self.pending_updates.extend(
                removed
                    .iter()
                    .filter_map(|r| replication::decode_removed(world, r)),
            ),
            ClientUpdate::RemoveEntity(ids) => self.pending_updates.extend(
                ids.into_iter()
                    .filter_map(|id| replication::decode_removed_entity(world, id)),
            ),
        }
    }

    fn on_key_inputs(&mut self, from: SocketAddr, inputs: Vec<InputEvent>) {
        let Some(player) = self.waiting_room.find_player_number(from) else {
            debug!(%from, count = inputs.len(), "input from unknown peer dropped");
            return;
        };
        self.server_events.entry(player).or_default().extend(inputs);
    }
}

#[cfg(test)]
mod tests {
    use engine_ecs::{Component, ComponentTypeId, ErasedComponent, decode_erased};
    use serde::{Deserialize, Serialize};

    use super::*;
    use crate::input::{Key, KeyEvent};

    #[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
    struct Score(i32);

    impl Component for Score {
        fn type_name() -> &'static str {
            "Score"
        }
    }

    struct ScoreDecoder;

    impl ComponentDecoder for ScoreDecoder {
        fn decode(&self, type_id: ComponentTypeId, bytes: &[u8]) -> Result<ErasedComponent, NetError> {
            if type_id == Score::component_type_id() {
                Ok(decode_erased::<Score>(bytes)?)
            } else {
                Err(NetError::UnknownComponent(type_id))
            }
        }
    }

    fn addr(port: u16) -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], port))
    }

    const HOST: u16 = 4242;

    /// Deliver every queued packet between the host and its clients until
    /// nothing moves, collecting the events each side produced.
    fn pump(
        host: &mut Session,
        clients: &mut [(u16, Session)],
        world: &World,
    ) -> (Vec<SessionEvent>, Vec<Vec<SessionEvent>>) {
        let mut host_events = Vec::new();
        let mut client_events = vec![Vec::new(); clients.len()];
        loop {
            let mut moved = false;
            for (to, packet) in host.take_outgoing() {
                moved = true;
                if to == addr(HOST) {
                    host_events.extend(host.handle_packet(world, &ScoreDecoder, addr(HOST), packet));
                } else if let Some(i) = clients.iter().position(|(port, _)| addr(*port) == to) {
                    let events = clients[i].1.handle_packet(world, &ScoreDecoder, addr(HOST), packet);
                    client_events[i].extend(events);
                }
            }
            for (port, client) in clients.iter_mut() {
                for (to, packet) in client.take_outgoing() {
                    assert_eq!(to, addr(HOST));
                    moved = true;
                    host_events.extend(host.handle_packet(world, &ScoreDecoder, addr(*port), packet));
                }
            }
            if !moved {
                return (host_events, client_events);
            }
        }
    }

    #[test]
    fn test_handshake_joins_lobby() {
        let world = World::new();
        let mut host = Session::host(addr(HOST));
        let mut clients = vec![(5000, Session::client(addr(HOST)))];
        pump(&mut host, &mut clients, &world);

        assert_eq!(host.waiting_room().len(), 2);
        assert!(host.waiting_room().is_ready_to_start());
        assert!(host.waiting_room().players()[0].is_server);
    }

    #[test]
    fn test_handshake_ignored_when_full() {
        let world = World::new();
        let mut host = Session::host(addr(HOST));
        for port in 1..=4 {
            host.handle_packet(&world, &ScoreDecoder, addr(port), Packet::HandshakeRequest { is_host: false });
        }
        assert_eq!(host.waiting_room().len(), 4);
        let replies = host.take_outgoing();
        assert_eq!(replies.len(), 3);
        assert!(replies.iter().all(|(_, p)| *p == Packet::HandshakeResponse { accepted: true }));
    }

    #[test]
    fn test_full_start_sequence() {
        let mut world = World::new();
        world.create_entity((Score(0),));

        let mut host = Session::host(addr(HOST));
        let mut clients = vec![(5000, Session::client(addr(HOST))), (5001, Session::client(addr(HOST)))];
        pump(&mut host, &mut clients, &world);

        host.start_game();
        let (host_events, client_events) = pump(&mut host, &mut clients, &world);

        // The host asks the engine to switch and initialise exactly once.
        assert_eq!(
            host_events
                .iter()
                .filter(|e| **e == SessionEvent::InitializeClients)
                .count(),
            1
        );
        for events in &client_events {
            assert!(events.contains(&SessionEvent::SwitchToGame));
        }
        assert!(client_events[0].contains(&SessionEvent::SetOwnPlayer(1)));
        assert!(client_events[1].contains(&SessionEvent::SetOwnPlayer(2)));
        assert!(host_events.contains(&SessionEvent::SetOwnPlayer(0)));

        // The engine answers with the snapshot of the game world.
        host.initialize_clients(&world).unwrap();
        let (host_events, client_events) = pump(&mut host, &mut clients, &world);

        assert!(host_events.contains(&SessionEvent::SetPlayersAmount(3)));
        assert!(host_events.contains(&SessionEvent::GameLaunched));
        for (i, (_, client)) in clients.iter_mut().enumerate() {
            assert!(client_events[i].contains(&SessionEvent::SetPlayersAmount(3)));
            assert!(client_events[i].contains(&SessionEvent::GameLaunched));
            assert!(client.game_started());
            assert_eq!(client.take_pending_updates().len(), 1);
        }
        assert!(host.game_started());
        assert!(host.waiting_room().is_game_started());
        assert!(host.take_pending_updates().is_empty());
    }

    #[test]
    fn test_key_inputs_queued_per_player() {
        let world = World::new();
        let mut host = Session::host(addr(HOST));
        let mut clients = vec![(5000, Session::client(addr(HOST)))];
        pump(&mut host, &mut clients, &world);
        host.waiting_room_mut().player_mut(addr(5000)).unwrap().player_number = 1;

        let press = InputEvent::KeyPressed(KeyEvent::plain(Key::Up));
        host.handle_packet(&world, &ScoreDecoder, addr(5000), Packet::KeyInputs { events: vec![press] });
        host.handle_packet(&world, &ScoreDecoder, addr(6000), Packet::KeyInputs { events: vec![press] });

        assert_eq!(host.take_client_inputs(), vec![(1, vec![press])]);
        assert!(host.take_client_inputs().is_empty());
    }

    #[test]
    fn test_client_forwards_keys_only_in_game() {
        let world = World::new();
        let mut client = Session::client(addr(HOST));
        client.take_outgoing();

        let press = InputEvent::KeyPressed(KeyEvent::plain(Key::Space));
        client.queue_input(press);
        client.flush_inputs();
        assert!(client.take_outgoing().is_empty());

        client.handle_packet(&world, &ScoreDecoder, addr(HOST), Packet::LaunchGame);
        client.queue_input(press);
        client.queue_input(InputEvent::Resized { width: 1, height: 1 });
        client.flush_inputs();
        assert_eq!(
            client.take_outgoing(),
            vec![(addr(HOST), Packet::KeyInputs { events: vec![press] })]
        );
    }

    #[test]
    fn test_world_changes_skip_host_entry() {
        let mut world = World::new();
        let id = world.create_entity((Score(1),));
        let mut host = Session::host(addr(HOST));
        host.waiting_room_mut().add_player(addr(5000), false);

        host.broadcast_world_changes(&mut world, &[id]).unwrap();
        let out = host.take_outgoing();
        assert_eq!(out.len(), 2);
        assert!(out.iter().all(|(to, _)| *to == addr(5000)));
        assert!(matches!(out[0].1, Packet::ClientUpdate(ClientUpdate::AddComponents(_))));
        assert_eq!(out[1].1, Packet::ClientUpdate(ClientUpdate::RemoveEntity(vec![id])));

        // Nothing changed since: nothing sent.
        host.broadcast_world_changes(&mut world, &[]).unwrap();
        assert!(host.take_outgoing().is_empty());
    }

    #[test]
    fn test_end_game_requests_reset() {
        let world = World::new();
        let mut client = Session::client(addr(HOST));
        let events = client.handle_packet(&world, &ScoreDecoder, addr(HOST), Packet::EndGame);
        assert_eq!(events, vec![SessionEvent::ResetRequested]);
        assert!(client.need_reset());
        client.reset();
        assert!(!client.need_reset());
    }

    #[test]
    fn test_leave_lobby_removes_by_ip() {
        let world = World::new();
        let mut host = Session::host(addr(HOST));
        let remote = SocketAddr::from(([10, 0, 0, 7], 5000));
        host.handle_packet(&world, &ScoreDecoder, remote, Packet::HandshakeRequest { is_host: false });
        assert_eq!(host.waiting_room().len(), 2);
        host.handle_packet(&world, &ScoreDecoder, remote, Packet::LeaveLobby);
        assert_eq!(host.waiting_room().len(), 1);
    }

    #[test]
    fn test_last_death_ends_game() {
        let mut host = Session::host(addr(HOST));
        host.waiting_room_mut().add_player(addr(5000), false);
        host.waiting_room_mut().player_mut(addr(5000)).unwrap().player_number = 1;

        // Lobby deaths are ignored.
        assert!(!host.player_died(0));
        assert!(host.waiting_room().players()[0].is_alive);

        host.game_started = true;
        assert!(!host.player_died(1));
        assert!(host.take_outgoing().is_empty());
        assert!(host.player_died(0));
        assert!(host.need_reset());
        assert_eq!(host.take_outgoing(), vec![(addr(5000), Packet::EndGame)]);
    }

    #[test]
    fn test_client_ignores_deaths() {
        let mut client = Session::client(addr(HOST));
        client.take_outgoing();
        assert!(!client.player_died(0));
        assert!(!client.need_reset());
    }

    #[test]
    fn test_game_over_reaches_clients_only() {
        let mut host = Session::host(addr(HOST));
        host.waiting_room_mut().add_player(addr(5000), false);
        host.send_game_over();
        assert_eq!(host.take_outgoing(), vec![(addr(5000), Packet::EndGame)]);
    }
}
