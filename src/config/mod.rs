//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;

use crate::game::EdgeMode;

/// Default bind address (the classic `localhost:8765` endpoint)
const DEFAULT_SERVER_ADDR: &str = "127.0.0.1:8765";

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Simulation steps per second
    pub tick_rate: u32,
    /// What happens when the ball leaves the field horizontally
    pub edge_mode: EdgeMode,
    /// Fixed seed for the bounce RNG (random when unset)
    pub ball_seed: Option<u64>,

    /// Max inbound messages per second per connection
    pub input_rate_limit: u32,
    /// Per-connection outbound queue depth
    pub outbound_buffer: usize,

    /// Allowed client origins for CORS (None = any)
    pub client_origin: Option<String>,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Hosting platforms provide PORT, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| DEFAULT_SERVER_ADDR.to_string()),
        };

        let edge_mode = match lookup("EDGE_MODE") {
            Some(raw) => raw.parse().map_err(|_| ConfigError::Invalid {
                var: "EDGE_MODE",
                value: raw,
            })?,
            None => EdgeMode::default(),
        };

        let ball_seed = lookup("BALL_SEED")
            .map(|raw| {
                raw.parse::<u64>().map_err(|_| ConfigError::Invalid {
                    var: "BALL_SEED",
                    value: raw,
                })
            })
            .transpose()?;

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            tick_rate: positive(&lookup, "TICK_RATE", 50)?,
            edge_mode,
            ball_seed,

            input_rate_limit: positive(&lookup, "INPUT_RATE_LIMIT", 60)?,
            outbound_buffer: positive(&lookup, "OUTBOUND_BUFFER", 64)?,

            client_origin: lookup("CLIENT_ORIGIN").filter(|s| !s.trim().is_empty()),
        })
    }
}

/// Parse a strictly positive number, using `default` when the variable is unset
fn positive<F, T>(lookup: &F, var: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr + PartialOrd + Default,
{
    let Some(raw) = lookup(var) else {
        return Ok(default);
    };

    match raw.trim().parse::<T>() {
        Ok(value) if value > T::default() => Ok(value),
        _ => Err(ConfigError::Invalid { var, value: raw }),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for {var}: {value:?}")]
    Invalid { var: &'static str, value: String },

    #[error("Invalid server address format")]
    InvalidAddress,
}
