//! Client configuration management.
//!
//! Consolidates all environment variable reads. Command-line flags take
//! precedence over the environment.

use std::path::PathBuf;

pub const DEFAULT_SERVER_URL: &str = "ws://127.0.0.1:8000";

/// Complete client configuration
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// Base WebSocket URL of the game server
    pub server_url: String,
    /// Name to join with, prompted for when absent
    pub player_name: Option<String>,
    /// Room to join, prompted for when absent
    pub room: Option<String>,
    /// Use the terminal UI instead of plain text
    pub use_tui: bool,
    /// Where log records are written
    pub log_file: Option<PathBuf>,
}

/// Values given on the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub server_url: Option<String>,
    pub player_name: Option<String>,
    pub room: Option<String>,
    pub use_tui: bool,
    pub log_file: Option<PathBuf>,
}

impl ClientConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `BJ_SERVER_URL`, `BJ_PLAYER_NAME`, `BJ_ROOM`, `BJ_TUI` and
    /// `BJ_LOG_FILE`.
    pub fn from_env(overrides: ConfigOverrides) -> Self {
        let server_url = overrides
            .server_url
            .or_else(|| std::env::var("BJ_SERVER_URL").ok())
            .unwrap_or_else(|| DEFAULT_SERVER_URL.to_string());

        ClientConfig {
            server_url,
            player_name: overrides
                .player_name
                .or_else(|| std::env::var("BJ_PLAYER_NAME").ok()),
            room: overrides.room.or_else(|| std::env::var("BJ_ROOM").ok()),
            use_tui: overrides.use_tui || parse_env_or("BJ_TUI", false),
            log_file: overrides
                .log_file
                .or_else(|| std::env::var_os("BJ_LOG_FILE").map(PathBuf::from)),
        }
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), ConfigError> {
        // Built without TLS support, so only plain ws:// endpoints work.
        if !self.server_url.starts_with("ws://") {
            return Err(ConfigError::Invalid {
                var: "BJ_SERVER_URL".to_string(),
                reason: format!("'{}' must start with ws://", self.server_url),
            });
        }

        if self.server_url.contains('?') || self.server_url.contains('#') {
            return Err(ConfigError::Invalid {
                var: "BJ_SERVER_URL".to_string(),
                reason: "Must not contain a query or fragment".to_string(),
            });
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration for {var}: {reason}")]
    Invalid { var: String, reason: String },
}

/// Helper to parse environment variable with default fallback
fn parse_env_or<T>(key: &str, default: T) -> T
where
    T: std::str::FromStr,
{
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
