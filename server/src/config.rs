use std::env;
use std::str::FromStr;

use crate::maze::{MAX_DIMENSION, MIN_DIMENSION};
pub use maze_shared::config::GameRules;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    /// Requested maze size; even values are rounded up to odd by the generator
    pub maze_width: usize,
    pub maze_height: usize,
    pub tick_interval_ms: u64,
    /// Fixed seed for the maze and all game randomness. `None` seeds from entropy.
    pub rng_seed: Option<u64>,
    pub max_players: usize,
    /// Largest inbound WebSocket message accepted, in bytes
    pub max_message_bytes: usize,
    /// Updates buffered per client before a slow client starts skipping them
    pub broadcast_capacity: usize,
    pub rules: GameRules,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:5555".to_string(),
            maze_width: 32,
            maze_height: 16,
            tick_interval_ms: 250,
            rng_seed: None,
            max_players: 64,
            max_message_bytes: 1024,
            broadcast_capacity: 64,
            rules: GameRules::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by any `MAZE_*` environment variables that are set.
    pub fn from_env() -> Result<Self, String> {
        let mut config = Self::default();
        if let Ok(addr) = env::var("MAZE_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(width) = parse_var("MAZE_WIDTH")? {
            config.maze_width = width;
        }
        if let Some(height) = parse_var("MAZE_HEIGHT")? {
            config.maze_height = height;
        }
        if let Some(ms) = parse_var("MAZE_TICK_MS")? {
            config.tick_interval_ms = ms;
        }
        if let Some(seed) = parse_var("MAZE_SEED")? {
            config.rng_seed = Some(seed);
        }
        if let Some(max) = parse_var("MAZE_MAX_PLAYERS")? {
            config.max_players = max;
        }
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.maze_width < MIN_DIMENSION || self.maze_height < MIN_DIMENSION {
            return Err(format!(
                "maze must be at least {MIN_DIMENSION}x{MIN_DIMENSION}"
            ));
        }
        // The generator rounds even sizes up, so the cap applies to the odd size
        if (self.maze_width | 1) > MAX_DIMENSION || (self.maze_height | 1) > MAX_DIMENSION {
            return Err(format!(
                "maze must be at most {MAX_DIMENSION}x{MAX_DIMENSION}"
            ));
        }
        if self.tick_interval_ms == 0 {
            return Err("tick_interval_ms must be > 0".to_string());
        }
        if self.max_players == 0 {
            return Err("max_players must be > 0".to_string());
        }
        if self.max_message_bytes == 0 {
            return Err("max_message_bytes must be > 0".to_string());
        }
        if self.broadcast_capacity == 0 {
            return Err("broadcast_capacity must be > 0".to_string());
        }
        self.rules.validate()
    }
}

fn parse_var<T: FromStr>(name: &str) -> Result<Option<T>, String> {
    match env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| format!("{name} has an invalid value: {raw:?}")),
        Err(_) => Ok(None),
    }
}
