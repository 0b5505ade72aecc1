//! Engine configuration.

use std::net::{IpAddr, Ipv4Addr};

use engine_net::DEFAULT_PORT;
use tracing::warn;

/// Environment variable overriding [`EngineConfig::port`].
pub const PORT_ENV: &str = "RTYPE_PORT";
/// Environment variable overriding [`EngineConfig::host`].
pub const HOST_ENV: &str = "RTYPE_HOST";

/// Configuration for an [`Engine`](crate::Engine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Target frames per second.
    pub tick_rate: f64,
    /// Maximum number of frames to run (0 = unlimited).
    pub max_ticks: u64,
    /// View size while windowed.
    pub window_size: (u32, u32),
    /// View size while fullscreen.
    pub fullscreen_size: (u32, u32),
    /// World [`Engine::run`](crate::Engine::run) starts in.
    pub start_world: String,
    /// World every peer switches to when the game starts.
    pub game_world: String,
    /// World shown after the host ends the game.
    pub game_over_world: String,
    /// UDP port the host listens on.
    pub port: u16,
    /// Address clients connect to.
    pub host: IpAddr,
    /// Host alone, picking the next free port if `port` is taken.
    pub solo: bool,
    /// Host: start the game once this many peers, the host included, are in
    /// the lobby. `None` waits for [`Engine::start_game`](crate::Engine::start_game).
    pub auto_start_players: Option<usize>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            tick_rate: 60.0,
            max_ticks: 0,
            window_size: (800, 600),
            fullscreen_size: (1920, 1080),
            start_world: "menu".to_string(),
            game_world: "game".to_string(),
            game_over_world: "GameOver".to_string(),
            port: DEFAULT_PORT,
            host: IpAddr::V4(Ipv4Addr::LOCALHOST),
            solo: false,
            auto_start_players: None,
        }
    }
}

impl EngineConfig {
    /// Default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_tick_rate(mut self, tick_rate: f64) -> Self {
        self.tick_rate = tick_rate;
        self
    }

    #[must_use]
    pub fn with_max_ticks(mut self, max_ticks: u64) -> Self {
        self.max_ticks = max_ticks;
        self
    }

    #[must_use]
    pub fn with_window_size(mut self, width: u32, height: u32) -> Self {
        self.window_size = (width, height);
        self
    }

    #[must_use]
    pub fn with_fullscreen_size(mut self, width: u32, height: u32) -> Self {
        self.fullscreen_size = (width, height);
        self
    }

    #[must_use]
    pub fn with_start_world(mut self, name: impl Into<String>) -> Self {
        self.start_world = name.into();
        self
    }

    #[must_use]
    pub fn with_game_world(mut self, name: impl Into<String>) -> Self {
        self.game_world = name.into();
        self
    }

    #[must_use]
    pub fn with_game_over_world(mut self, name: impl Into<String>) -> Self {
        self.game_over_world = name.into();
        self
    }

    #[must_use]
    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    #[must_use]
    pub fn with_host(mut self, host: IpAddr) -> Self {
        self.host = host;
        self
    }

    #[must_use]
    pub fn with_solo(mut self, solo: bool) -> Self {
        self.solo = solo;
        self
    }

    #[must_use]
    pub fn with_auto_start(mut self, players: usize) -> Self {
        self.auto_start_players = Some(players);
        self
    }

    /// Apply `RTYPE_PORT` and `RTYPE_HOST` if they are set. Values that do
    /// not parse are logged and ignored.
    #[must_use]
    pub fn with_env_overrides(self) -> Self {
        self.with_overrides(std::env::var(PORT_ENV).ok(), std::env::var(HOST_ENV).ok())
    }

    fn with_overrides(mut self, port: Option<String>, host: Option<String>) -> Self {
        if let Some(raw) = port {
            match raw.parse() {
                Ok(port) => self.port = port,
                Err(e) => warn!(var = PORT_ENV, value = %raw, %e, "ignoring invalid port"),
            }
        }
        if let Some(raw) = host {
            match raw.parse() {
                Ok(host) => self.host = host,
                Err(e) => warn!(var = HOST_ENV, value = %raw, %e, "ignoring invalid host"),
            }
        }
        self
    }

    /// Current view size for the given fullscreen state.
    #[must_use]
    pub fn view_size(&self, fullscreen: bool) -> (u32, u32) {
        if fullscreen {
            self.fullscreen_size
        } else {
            self.window_size
        }
    }
}
