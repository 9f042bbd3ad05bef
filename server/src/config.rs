//! Server configuration parsed from environment variables.
//!
//! Every value has a default, so a bare `cargo run` serves on port 3000 with
//! no static site. Unparseable numbers fall back to their defaults.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_PORT: u16 = 3000;
pub const DEFAULT_MAX_DURATION_SECS: u64 = 30;

/// Limits applied to every relayed exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RelayConfig {
    /// Output-token cap sent to the provider. `None` sends no cap.
    pub max_tokens: Option<u32>,
    /// Wall-clock ceiling for one exchange, from request to end of body.
    pub max_duration: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self { max_tokens: None, max_duration: Duration::from_secs(DEFAULT_MAX_DURATION_SECS) }
    }
}

impl RelayConfig {
    /// Read `CHAT_MAX_TOKENS` and `RELAY_MAX_DURATION_SECS`.
    #[must_use]
    pub fn from_env() -> Self {
        Self {
            max_tokens: env_parse_opt("CHAT_MAX_TOKENS"),
            max_duration: Duration::from_secs(env_parse("RELAY_MAX_DURATION_SECS", DEFAULT_MAX_DURATION_SECS)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub port: u16,
    /// Directory served as the page shell. `None` disables static serving.
    pub site_dir: Option<PathBuf>,
    pub relay: RelayConfig,
}

impl ServerConfig {
    /// Read `PORT`, `SITE_DIR` and the relay limits.
    #[must_use]
    pub fn from_env() -> Self {
        let site_dir = std::env::var("SITE_DIR")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .map(PathBuf::from);
        Self { port: env_parse("PORT", DEFAULT_PORT), site_dir, relay: RelayConfig::from_env() }
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    env_parse_opt(key).unwrap_or(default)
}

fn env_parse_opt<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.trim().parse::<T>().ok())
}

#[cfg(test)]
#[path = "config_test.rs"]
mod tests;
