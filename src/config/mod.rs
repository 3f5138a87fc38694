//! Configuration module - environment variable parsing

use std::env;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;

use crate::util::rate_limit::INPUT_RATE_LIMIT;
use crate::util::time::DEFAULT_TICK_RATE;

/// Application configuration loaded from environment variables
#[derive(Clone, Debug)]
pub struct Config {
    /// Server binding address
    pub server_addr: SocketAddr,
    /// Log level (trace, debug, info, warn, error)
    pub log_level: String,

    /// Root of the backend API that records game sessions
    pub arena_api_url: String,
    /// Allowed client origins for CORS, comma-separated
    pub client_origin: Option<String>,

    /// Simulation ticks per second
    pub tick_rate: u32,
    /// Bound on each backend call
    pub report_timeout: Duration,
    /// Pause between the terminal frame and the result handoff
    pub result_delay: Duration,
    /// Input events allowed per connection per second
    pub input_rate_limit: u32,
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from any key lookup; `from_env` passes the process environment
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        // Render provides PORT env var, fall back to SERVER_ADDR or default
        let server_addr = match lookup("PORT") {
            Some(port) => format!("0.0.0.0:{}", port),
            None => lookup("SERVER_ADDR").unwrap_or_else(|| "0.0.0.0:8080".to_string()),
        };

        let arena_api_url = lookup("ARENA_API_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or(ConfigError::Missing("ARENA_API_URL"))?;

        let tick_rate: u32 = parse_or(&lookup, "TICK_RATE", DEFAULT_TICK_RATE)?;
        if tick_rate == 0 {
            return Err(ConfigError::Invalid("TICK_RATE"));
        }

        Ok(Self {
            server_addr: server_addr
                .parse()
                .map_err(|_| ConfigError::InvalidAddress)?,

            log_level: lookup("LOG_LEVEL").unwrap_or_else(|| "info".to_string()),

            arena_api_url,
            client_origin: lookup("CLIENT_ORIGIN").filter(|o| !o.trim().is_empty()),

            tick_rate,
            report_timeout: Duration::from_secs(parse_or(&lookup, "REPORT_TIMEOUT_SECS", 5)?),
            result_delay: Duration::from_millis(parse_or(&lookup, "RESULT_DELAY_MS", 2000)?),
            input_rate_limit: parse_or(&lookup, "INPUT_RATE_LIMIT", INPUT_RATE_LIMIT)?,
        })
    }
}

fn parse_or<F, T>(lookup: &F, key: &'static str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|_| ConfigError::Invalid(key)),
        None => Ok(default),
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for environment variable: {0}")]
    Invalid(&'static str),

    #[error("Invalid server address format")]
    InvalidAddress,
}
