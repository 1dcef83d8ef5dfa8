use crate::error::ConfigError;
use arena_shared::config::ArenaConfig;
use std::str::FromStr;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub listen_addr: String,
    pub tick_rate_hz: u32,
    /// Period between agent spawns while players are connected
    pub spawn_interval: Duration,
    /// Keep-alive ping period
    pub ping_interval: Duration,
    /// Silence after which a session is considered dead
    pub read_timeout: Duration,
    /// Upper bound on a single socket write
    pub write_timeout: Duration,
    pub max_connections: usize,
    /// Seed for agent spawn positions
    pub rng_seed: u64,
    pub arena: ArenaConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen_addr: "0.0.0.0:8080".to_string(),
            tick_rate_hz: 60,
            spawn_interval: Duration::from_secs(6),
            ping_interval: Duration::from_secs(54),
            read_timeout: Duration::from_secs(60),
            write_timeout: Duration::from_secs(10),
            max_connections: 256,
            rng_seed: 42,
            arena: ArenaConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Defaults, overridden by `ARENA_*` variables (a `.env` file is loaded first if present).
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(addr) = lookup("ARENA_LISTEN_ADDR") {
            config.listen_addr = addr;
        }
        if let Some(v) = parse_var(&lookup, "ARENA_TICK_RATE_HZ")? {
            config.tick_rate_hz = v;
        }
        if let Some(ms) = parse_var::<u64>(&lookup, "ARENA_SPAWN_INTERVAL_MS")? {
            config.spawn_interval = Duration::from_millis(ms);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ARENA_PING_INTERVAL_SECS")? {
            config.ping_interval = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ARENA_READ_TIMEOUT_SECS")? {
            config.read_timeout = Duration::from_secs(secs);
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "ARENA_WRITE_TIMEOUT_SECS")? {
            config.write_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = parse_var(&lookup, "ARENA_MAX_CONNECTIONS")? {
            config.max_connections = v;
        }
        if let Some(v) = parse_var(&lookup, "ARENA_RNG_SEED")? {
            config.rng_seed = v;
        }
        if let Some(v) = parse_var(&lookup, "ARENA_WIDTH")? {
            config.arena.width = v;
        }
        if let Some(v) = parse_var(&lookup, "ARENA_HEIGHT")? {
            config.arena.height = v;
        }

        Ok(config)
    }

    pub fn tick_duration(&self) -> Duration {
        Duration::from_secs_f64(1.0 / self.tick_rate_hz as f64)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_rate_hz == 0 {
            return Err(ConfigError::Invalid("tick_rate_hz must be > 0".to_string()));
        }
        if self.spawn_interval.is_zero()
            || self.ping_interval.is_zero()
            || self.write_timeout.is_zero()
        {
            return Err(ConfigError::Invalid(
                "spawn, ping and write intervals must be > 0".to_string(),
            ));
        }
        if self.read_timeout <= self.ping_interval {
            return Err(ConfigError::Invalid(
                "read_timeout must exceed ping_interval".to_string(),
            ));
        }
        if self.max_connections == 0 {
            return Err(ConfigError::Invalid("max_connections must be > 0".to_string()));
        }
        self.arena.validate().map_err(ConfigError::Invalid)
    }
}

fn parse_var<T: FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    var: &'static str,
) -> Result<Option<T>, ConfigError> {
    match lookup(var) {
        None => Ok(None),
        Some(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidVar { var, value }),
    }
}
