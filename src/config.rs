//! Client configuration and persisted local identity.

use crate::ClientId;
use crate::session::SessionRules;
use derive_getters::Getters;
use derive_more::{Display, Error};
use derive_setters::Setters;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, info, instrument};

/// Per-client settings, loaded once at startup and passed explicitly.
#[derive(Debug, Clone, PartialEq, Eq, Getters, Setters, Serialize, Deserialize)]
#[setters(prefix = "with_")]
pub struct ClientConfig {
    /// Locally generated identity.
    identity: ClientId,

    /// Name shown to other participants.
    #[serde(default = "default_display_name")]
    display_name: String,

    /// Seconds a side may take over one move.
    #[serde(default = "default_turn_limit_secs")]
    turn_limit_secs: u64,

    /// Timeouts that forfeit the game.
    #[serde(default = "default_max_timeouts")]
    max_timeouts: u8,

    /// Sqlite database backing the local document store.
    #[serde(default = "default_db_path")]
    db_path: String,
}

#[instrument]
fn default_display_name() -> String {
    "Player".to_string()
}

#[instrument]
fn default_turn_limit_secs() -> u64 {
    180
}

#[instrument]
fn default_max_timeouts() -> u8 {
    3
}

#[instrument]
fn default_db_path() -> String {
    "xiangqi_rooms.db".to_string()
}

impl ClientConfig {
    /// Creates a configuration with default settings for `identity`.
    #[instrument(skip(identity), fields(identity = %identity))]
    pub fn new(identity: ClientId) -> Self {
        Self {
            identity,
            display_name: default_display_name(),
            turn_limit_secs: default_turn_limit_secs(),
            max_timeouts: default_max_timeouts(),
            db_path: default_db_path(),
        }
    }

    /// Creates a configuration with a freshly generated identity.
    #[instrument]
    pub fn generate() -> Self {
        Self::new(ClientId::generate())
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read or parsed.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        debug!("Loading config from file");
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::new(format!("Failed to read config file: {}", e)))?;

        let config: Self = toml::from_str(&content)
            .map_err(|e| ConfigError::new(format!("Failed to parse config: {}", e)))?;

        info!(identity = %config.identity, "Config loaded successfully");
        Ok(config)
    }

    /// Writes configuration to a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or the write fails.
    #[instrument(skip(self, path), fields(path = %path.as_ref().display()))]
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::new(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path.as_ref(), content)
            .map_err(|e| ConfigError::new(format!("Failed to write config file: {}", e)))?;
        debug!("Config saved");
        Ok(())
    }

    /// Loads the config at `path`, creating it with a new identity on first run.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if an existing file is unreadable or a new one
    /// cannot be written.
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn load_or_init(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        if path.as_ref().exists() {
            return Self::from_file(path);
        }
        let config = Self::generate();
        config.save(path.as_ref())?;
        info!(identity = %config.identity, "Generated new client identity");
        Ok(config)
    }

    /// Turn clock and forfeit settings for the session state machine.
    #[instrument(skip(self))]
    pub fn session_rules(&self) -> SessionRules {
        SessionRules::new(
            chrono::TimeDelta::seconds(self.turn_limit_secs as i64),
            self.max_timeouts,
        )
    }
}

/// Configuration error.
#[derive(Debug, Clone, Display, Error)]
#[display("Config error: {} at {}:{}", message, file, line)]
pub struct ConfigError {
    /// Error message.
    pub message: String,
    /// Line number where error occurred.
    pub line: u32,
    /// Source file where error occurred.
    pub file: &'static str,
}

impl ConfigError {
    /// Creates a new configuration error.
    #[track_caller]
    #[instrument(skip(message))]
    pub fn new(message: String) -> Self {
        let loc = std::panic::Location::caller();
        Self {
            message,
            line: loc.line(),
            file: loc.file(),
        }
    }
}
