//! The engine: world switching, global entities, input and the frame loop.
//!
//! One frame runs these steps in order:
//!
//! 1. Drop worlds replaced during the previous frame.
//! 2. Handle packets received since the last frame.
//! 3. Host in game: replay each client's forwarded input as that player.
//! 4. Handle local input (and forward key events when a client in game).
//! 5. Stamp the world time and tick the current world.
//! 6. Host in game: report ship deaths; the last one ends the game. If the
//!    game ended, switch to the game-over world, send what is queued and
//!    drop the network.
//! 7. Flush deferred entity removals.
//! 8. Client: apply world changes from the host. Host in game: send this
//!    frame's changes to every client.
//! 9. Hand queued packets to the transport.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::net::SocketAddr;
use std::rc::Rc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use engine_ecs::{Bundle, EcsError, Entity, EntityAllocator, EntityId, Query, World};
use engine_net::replication;
use engine_net::{InputEvent, Key, NetError, Packet, Role, Session, SessionEvent, Transport};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::EngineConfig;
use crate::error::EngineError;
use crate::events::{KeyPressedEvent, KeyReleasedEvent, PlayerDeathEvent, ResizeEvent};
use crate::registry::ComponentRegistry;

/// Builds a fresh world, systems included.
pub type WorldFactory = Box<dyn Fn() -> Result<World, EcsError>>;

/// Milliseconds since the Unix epoch.
#[must_use]
pub fn unix_time_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}

struct LoadedWorld {
    name: String,
    world: World,
}

struct Network {
    session: Session,
    /// `None` when packets are exchanged by hand.
    transport: Option<Transport>,
}

/// Owns the current world and drives it frame by frame.
pub struct Engine {
    config: EngineConfig,
    registry: ComponentRegistry,
    factories: BTreeMap<String, WorldFactory>,
    current: Option<LoadedWorld>,
    /// Worlds replaced this frame, dropped at the start of the next one.
    pending_destroy: Vec<LoadedWorld>,
    global_ids: EntityAllocator,
    globals: BTreeMap<EntityId, Entity>,
    players_amount: usize,
    own_player: usize,
    input: VecDeque<InputEvent>,
    network: Option<Network>,
    /// Players whose ship died this frame, filled by a subscription on the
    /// current world.
    deaths: Rc<RefCell<Vec<usize>>>,
    fullscreen: bool,
    running: bool,
    frame: u64,
    fixed_time_ms: Option<u64>,
}

impl Engine {
    /// Create an engine with no worlds.
    #[must_use]
    pub fn new(config: EngineConfig) -> Self {
        Self {
            config,
            registry: ComponentRegistry::with_engine_components(),
            factories: BTreeMap::new(),
            current: None,
            pending_destroy: Vec::new(),
            global_ids: EntityAllocator::new(),
            globals: BTreeMap::new(),
            players_amount: 1,
            own_player: 0,
            input: VecDeque::new(),
            network: None,
            deaths: Rc::new(RefCell::new(Vec::new())),
            fullscreen: false,
            running: false,
            frame: 0,
            fixed_time_ms: None,
        }
    }

    #[must_use]
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Component types accepted from the network.
    #[must_use]
    pub fn registry(&self) -> &ComponentRegistry {
        &self.registry
    }

    pub fn registry_mut(&mut self) -> &mut ComponentRegistry {
        &mut self.registry
    }

    /// Number of frames run so far.
    #[must_use]
    pub fn frame_count(&self) -> u64 {
        self.frame
    }

    // ── Worlds ──────────────────────────────────────────────────────────────

    /// Register `factory` under `name`, replacing any previous one.
    pub fn add_world_factory(
        &mut self,
        name: impl Into<String>,
        factory: impl Fn() -> Result<World, EcsError> + 'static,
    ) {
        let name = name.into();
        debug!(world = %name, "world factory added");
        self.factories.insert(name, Box::new(factory));
    }

    /// Names of every registered world, sorted.
    #[must_use]
    pub fn world_names(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    #[must_use]
    pub fn has_world(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    /// Make an empty world named `name` current.
    pub fn create_empty_world(&mut self, name: impl Into<String>) {
        self.load(name.into(), World::new());
    }

    /// Build the world `name` and make it current. The previous world is
    /// dropped at the start of the next frame.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::UnknownWorld`] if no factory has that name, or
    /// the factory's error.
    pub fn switch_world(&mut self, name: &str) -> Result<(), EngineError> {
        let factory = self
            .factories
            .get(name)
            .ok_or_else(|| EngineError::UnknownWorld(name.to_string()))?;
        let world = factory()?;
        self.load(name.to_string(), world);
        Ok(())
    }

    fn load(&mut self, name: String, mut world: World) {
        world.set_players_amount(self.players_amount);
        world.set_own_player(self.own_player);
        world.set_now_ms(self.now_ms());
        let deaths = Rc::clone(&self.deaths);
        world.subscribe(move |_: &mut World, _: &str, event: &PlayerDeathEvent| {
            deaths.borrow_mut().push(event.player);
        });
        info!(world = %name, entities = world.entity_count(), "world loaded");
        if let Some(old) = self.current.replace(LoadedWorld { name, world }) {
            self.pending_destroy.push(old);
        }
    }

    fn destroy_pending_worlds(&mut self) {
        for old in self.pending_destroy.drain(..) {
            debug!(world = %old.name, "world destroyed");
        }
    }

    /// Number of replaced worlds not yet dropped.
    #[must_use]
    pub fn pending_world_count(&self) -> usize {
        self.pending_destroy.len()
    }

    #[must_use]
    pub fn current_world_name(&self) -> Option<&str> {
        self.current.as_ref().map(|w| w.name.as_str())
    }

    #[must_use]
    pub fn world(&self) -> Option<&World> {
        self.current.as_ref().map(|w| &w.world)
    }

    pub fn world_mut(&mut self) -> Option<&mut World> {
        self.current.as_mut().map(|w| &mut w.world)
    }

    // ── Global entities ─────────────────────────────────────────────────────

    /// Create an entity that outlives world switches.
    pub fn add_global_entity<B: Bundle>(&mut self, bundle: B) -> EntityId {
        let id = self.global_ids.allocate();
        let mut entity = Entity::new(id);
        bundle.insert_into(&mut entity);
        self.globals.insert(id, entity);
        id
    }

    /// Returns `true` if the global entity existed.
    pub fn remove_global_entity(&mut self, id: EntityId) -> bool {
        self.globals.remove(&id).is_some()
    }

    #[must_use]
    pub fn global_entity(&self, id: EntityId) -> Option<&Entity> {
        self.globals.get(&id)
    }

    pub fn global_entity_mut(&mut self, id: EntityId) -> Option<&mut Entity> {
        self.globals.get_mut(&id)
    }

    #[must_use]
    pub fn global_entity_count(&self) -> usize {
        self.globals.len()
    }

    /// Call `f` for every global entity matching `Q`, in id order.
    pub fn each_global<Q: Query>(&self, mut f: impl FnMut(EntityId, Q::Item)) {
        for (id, entity) in &self.globals {
            if let Some(item) = Q::fetch(entity) {
                f(*id, item);
            }
        }
    }

    // ── Players ─────────────────────────────────────────────────────────────

    #[must_use]
    pub fn players_amount(&self) -> usize {
        self.players_amount
    }

    #[must_use]
    pub fn own_player(&self) -> usize {
        self.own_player
    }

    pub fn set_players_amount(&mut self, amount: usize) {
        self.players_amount = amount.max(1);
        let amount = self.players_amount;
        if let Some(world) = self.world_mut() {
            world.set_players_amount(amount);
        }
    }

    pub fn set_own_player(&mut self, player: usize) {
        self.own_player = player;
        if let Some(world) = self.world_mut() {
            world.set_own_player(player);
        }
    }

    // ── Time ────────────────────────────────────────────────────────────────

    /// Milliseconds since the Unix epoch, or the fixed time if one is set.
    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.fixed_time_ms.unwrap_or_else(unix_time_ms)
    }

    /// Freeze the clock at `ms`. `None` returns to the system clock.
    pub fn set_fixed_time(&mut self, ms: Option<u64>) {
        self.fixed_time_ms = ms;
    }

    // ── Input ───────────────────────────────────────────────────────────────

    /// Queue a local window or keyboard event for the next frame.
    pub fn push_input(&mut self, event: InputEvent) {
        self.input.push_back(event);
    }

    #[must_use]
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Apply one input event to the engine and the current world.
    pub fn process_event(&mut self, event: InputEvent) {
        match event {
            InputEvent::Closed => {
                info!("window closed");
                self.stop();
            }
            InputEvent::KeyPressed(key) if key.code == Key::F11 => self.toggle_fullscreen(),
            InputEvent::KeyPressed(key) => self.broadcast(&KeyPressedEvent(key)),
            InputEvent::KeyReleased(key) => self.broadcast(&KeyReleasedEvent(key)),
            InputEvent::Resized { width, height } => self.broadcast(&ResizeEvent { width, height }),
        }
    }

    /// Switch between windowed and fullscreen and announce the new size.
    pub fn toggle_fullscreen(&mut self) {
        self.fullscreen = !self.fullscreen;
        let (width, height) = self.config.view_size(self.fullscreen);
        debug!(fullscreen = self.fullscreen, width, height, "fullscreen toggled");
        self.broadcast(&ResizeEvent { width, height });
    }

    fn broadcast<E: 'static>(&mut self, event: &E) {
        if let Some(world) = self.world_mut() {
            world.broadcast_event(event);
        }
    }

    fn handle_events(&mut self) {
        while let Some(event) = self.input.pop_front() {
            if let Some(network) = self.network.as_mut() {
                network.session.queue_input(event);
            }
            self.process_event(event);
        }
    }

    /// Host in game: replay forwarded input as the player who sent it.
    fn process_clients_events(&mut self) {
        let Some(network) = self.network.as_mut() else {
            return;
        };
        if !network.session.is_server() || !network.session.game_started() {
            return;
        }
        for (player, events) in network.session.take_client_inputs() {
            if let Some(world) = self.world_mut() {
                world.set_current_player(player);
            }
            for event in events.into_iter().filter(InputEvent::is_key) {
                self.process_event(event);
            }
        }
        let own = self.own_player;
        if let Some(world) = self.world_mut() {
            world.set_current_player(own);
        }
    }

    // ── Network ─────────────────────────────────────────────────────────────

    /// Open the host socket on the configured port and join its own lobby.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::AlreadyRunning`] if a session exists, or fails if
    /// no socket can be bound.
    pub async fn host(&mut self) -> Result<SocketAddr, EngineError> {
        self.ensure_offline()?;
        let transport = Transport::bind_host(self.config.port, self.config.solo).await?;
        let addr = transport.local_addr();
        let session = Session::host(transport.loopback_addr());
        info!(%addr, solo = self.config.solo, "hosting");
        self.network = Some(Network {
            session,
            transport: Some(transport),
        });
        Ok(addr)
    }

    /// Connect to the configured host.
    ///
    /// # Errors
    ///
    /// Returns [`NetError::AlreadyRunning`] if a session exists, or fails if
    /// no socket can be bound.
    pub async fn connect(&mut self) -> Result<SocketAddr, EngineError> {
        self.ensure_offline()?;
        let host = SocketAddr::new(self.config.host, self.config.port);
        let transport = Transport::bind_client().await?;
        info!(%host, local = %transport.local_addr(), "connecting");
        self.network = Some(Network {
            session: Session::client(host),
            transport: Some(transport),
        });
        Ok(host)
    }

    fn ensure_offline(&self) -> Result<(), EngineError> {
        if self.network.is_some() {
            return Err(NetError::AlreadyRunning.into());
        }
        Ok(())
    }

    /// Use `session` without a socket. Outgoing packets stay queued in the
    /// session and incoming ones are fed with [`Engine::receive_packet`].
    pub fn attach_session(&mut self, session: Session) {
        self.network = Some(Network {
            session,
            transport: None,
        });
    }

    /// Drop the session and close its socket.
    pub fn disconnect(&mut self) {
        if let Some(network) = self.network.take() {
            info!(role = ?network.session.role(), "network reset");
        }
    }

    #[must_use]
    pub fn session(&self) -> Option<&Session> {
        self.network.as_ref().map(|n| &n.session)
    }

    pub fn session_mut(&mut self) -> Option<&mut Session> {
        self.network.as_mut().map(|n| &mut n.session)
    }

    /// Host: tell every peer in the lobby to switch to the game world.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotConnected`] without a session and
    /// [`EngineError::NotHost`] on a client.
    pub fn start_game(&mut self) -> Result<(), EngineError> {
        let network = self.network.as_mut().ok_or(EngineError::NotConnected)?;
        if !network.session.is_server() {
            return Err(EngineError::NotHost);
        }
        network.session.start_game();
        Ok(())
    }

    /// Handle one packet from `from` and apply what it asks of the engine.
    ///
    /// # Errors
    ///
    /// Returns [`EngineError::NotConnected`] without a session, or the error
    /// of a world switch the packet triggered.
    pub fn receive_packet(&mut self, from: SocketAddr, packet: Packet) -> Result<(), EngineError> {
        let network = self.network.as_mut().ok_or(EngineError::NotConnected)?;
        let empty;
        let world = match &self.current {
            Some(loaded) => &loaded.world,
            None => {
                empty = World::new();
                &empty
            }
        };
        let events = network
            .session
            .handle_packet(world, &self.registry, from, packet);
        for event in events {
            self.apply_session_event(event)?;
        }
        Ok(())
    }

    fn apply_session_event(&mut self, event: SessionEvent) -> Result<(), EngineError> {
        match event {
            SessionEvent::SwitchToGame => {
                let game = self.config.game_world.clone();
                self.switch_world(&game)?;
            }
            SessionEvent::InitializeClients => {
                let game = self.config.game_world.clone();
                self.switch_world(&game)?;
                if let (Some(network), Some(loaded)) = (self.network.as_mut(), self.current.as_ref())
                {
                    network.session.initialize_clients(&loaded.world)?;
                }
            }
            SessionEvent::SetPlayersAmount(amount) => self.set_players_amount(amount),
            SessionEvent::SetOwnPlayer(player) => self.set_own_player(player),
            SessionEvent::GameLaunched => info!(players = self.players_amount, "game launched"),
            SessionEvent::ResetRequested => debug!("reset requested"),
        }
        Ok(())
    }

    fn poll_network(&mut self) -> Result<(), EngineError> {
        let mut received = Vec::new();
        if let Some(transport) = self.network.as_mut().and_then(|n| n.transport.as_mut()) {
            while let Some(packet) = transport.try_recv() {
                received.push(packet);
            }
        }
        for (from, packet) in received {
            self.receive_packet(from, packet)?;
        }
        Ok(())
    }

    fn auto_start(&mut self) {
        let Some(wanted) = self.config.auto_start_players else {
            return;
        };
        let Some(network) = self.network.as_mut() else {
            return;
        };
        let session = &mut network.session;
        if session.is_server()
            && !session.is_ready_to_start()
            && session.waiting_room().len() >= wanted
        {
            session.start_game();
        }
    }

    fn report_deaths(&mut self) {
        let deaths = std::mem::take(&mut *self.deaths.borrow_mut());
        let Some(network) = self.network.as_mut() else {
            return;
        };
        for player in deaths {
            if network.session.player_died(player) {
                break;
            }
        }
    }

    fn reset_if_requested(&mut self) -> Result<(), EngineError> {
        if !self.network.as_ref().is_some_and(|n| n.session.need_reset()) {
            return Ok(());
        }
        let game_over = self.config.game_over_world.clone();
        if self.has_world(&game_over) {
            self.switch_world(&game_over)?;
        } else {
            self.create_empty_world(game_over);
        }
        self.flush_network()?;
        self.disconnect();
        Ok(())
    }

    fn sync_world(&mut self, removed: &[EntityId]) -> Result<(), EngineError> {
        let (Some(network), Some(loaded)) = (self.network.as_mut(), self.current.as_mut()) else {
            return Ok(());
        };
        let session = &mut network.session;
        match session.role() {
            Role::Client => {
                replication::apply(&mut loaded.world, session.take_pending_updates());
                session.flush_inputs();
            }
            Role::Host if session.game_started() => {
                session.broadcast_world_changes(&mut loaded.world, removed)?;
            }
            Role::Host => {}
        }
        Ok(())
    }

    fn flush_network(&mut self) -> Result<(), EngineError> {
        let Some(network) = self.network.as_mut() else {
            return Ok(());
        };
        let Some(transport) = network.transport.as_ref() else {
            return Ok(());
        };
        for (to, packet) in network.session.take_outgoing() {
            transport.send(to, packet)?;
        }
        Ok(())
    }

    // ── Frame loop ──────────────────────────────────────────────────────────

    /// Run one frame.
    ///
    /// # Errors
    ///
    /// Fails if a world switch fails or a packet cannot be encoded or sent.
    pub fn run_frame(&mut self) -> Result<(), EngineError> {
        self.destroy_pending_worlds();
        self.poll_network()?;
        self.auto_start();
        self.process_clients_events();
        self.handle_events();

        let now = self.now_ms();
        if let Some(world) = self.world_mut() {
            world.set_now_ms(now);
            world.tick();
        }

        self.report_deaths();
        self.reset_if_requested()?;

        let removed = self
            .world_mut()
            .map(World::flush_removals)
            .unwrap_or_default();
        self.sync_world(&removed)?;
        self.flush_network()?;

        self.frame += 1;
        Ok(())
    }

    /// Load the start world and run frames at the configured rate until
    /// [`Engine::stop`] is called or `max_ticks` frames have run.
    ///
    /// Without any world factory an empty world named `"default"` is used.
    ///
    /// # Errors
    ///
    /// Returns the first frame error.
    pub async fn run(&mut self) -> Result<(), EngineError> {
        if self.current.is_none() {
            if self.factories.is_empty() {
                self.create_empty_world("default");
            } else {
                let start = self.config.start_world.clone();
                self.switch_world(&start)?;
            }
        }

        let rate = if self.config.tick_rate > 0.0 {
            self.config.tick_rate
        } else {
            EngineConfig::default().tick_rate
        };
        let frame_duration = Duration::from_secs_f64(1.0 / rate);
        let mut interval = tokio::time::interval(frame_duration);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            tick_rate = rate,
            max_ticks = self.config.max_ticks,
            world = self.current_world_name().unwrap_or_default(),
            "engine running"
        );

        let mut frames = 0u64;
        self.running = true;
        while self.running {
            interval.tick().await;
            let start = Instant::now();
            self.run_frame()?;

            frames += 1;
            if self.config.max_ticks > 0 && frames >= self.config.max_ticks {
                info!(frames, "frame limit reached");
                break;
            }

            let elapsed = start.elapsed();
            if elapsed > frame_duration {
                warn!(
                    frame = self.frame,
                    elapsed_ms = elapsed.as_millis() as u64,
                    budget_ms = frame_duration.as_millis() as u64,
                    "frame exceeded time budget"
                );
            }
        }
        self.running = false;
        info!(frames = self.frame, "engine stopped");
        Ok(())
    }

    /// Stop [`Engine::run`] after the current frame.
    pub fn stop(&mut self) {
        self.running = false;
    }

    #[must_use]
    pub fn is_running(&self) -> bool {
        self.running
    }
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("config", &self.config)
            .field("worlds", &self.world_names())
            .field("current", &self.current_world_name())
            .field("globals", &self.globals.len())
            .field("players_amount", &self.players_amount)
            .field("own_player", &self.own_player)
            .field("frame", &self.frame)
            .finish_non_exhaustive()
    }
}
