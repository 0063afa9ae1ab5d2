//! # Configuration Management Module
//!
//! Centralized configuration for the pulsemud server: type-safe TOML
//! parsing with serde, sensible defaults for every option, and async
//! load/save helpers used by the CLI.
//!
//! ## Configuration Structure
//!
//! - [`ServerConfig`] - Core server settings (name, data directory, limits)
//! - [`WorldConfig`] - Placement fallbacks (start room, void room)
//! - [`PulseConfig`] - Scheduler cadences for the five pulses
//! - [`LoggingConfig`] - Logging and debugging settings
//!
//! ## Configuration File Format
//!
//! ```toml
//! [server]
//! name = "pulsemud"
//! data_dir = "./data"
//! max_players = 100
//!
//! [world]
//! start_room = 3001
//! void_room = 1
//!
//! [pulse]
//! violence_secs = 2
//! point_secs = 75
//! affect_secs = 60
//! mobile_secs = 10
//! zone_secs = 10
//!
//! [logging]
//! level = "info"
//! file = "pulsemud.log"
//! ```

use anyhow::{anyhow, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::fs;

use crate::world::registry::WorldSettings;
use crate::world::types::RoomId;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub name: String,
    pub data_dir: String,
    pub max_players: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorldConfig {
    /// Default starting room for characters with nowhere better to go.
    pub start_room: u32,
    /// Holding room tried before the start room when a saved room is gone.
    pub void_room: u32,
}

impl WorldConfig {
    pub fn settings(&self) -> WorldSettings {
        WorldSettings {
            start_room: RoomId(self.start_room),
            void_room: RoomId(self.void_room),
        }
    }
}

/// Scheduler cadences, in seconds, for the five pulses. A missed pulse
/// causes delay, never corruption, so these are pacing knobs rather than
/// correctness ones.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PulseConfig {
    #[serde(default = "default_violence_secs")]
    pub violence_secs: u64,
    #[serde(default = "default_point_secs")]
    pub point_secs: u64,
    #[serde(default = "default_affect_secs")]
    pub affect_secs: u64,
    #[serde(default = "default_mobile_secs")]
    pub mobile_secs: u64,
    #[serde(default = "default_zone_secs")]
    pub zone_secs: u64,
}

fn default_violence_secs() -> u64 {
    2
}
fn default_point_secs() -> u64 {
    75
}
fn default_affect_secs() -> u64 {
    60
}
fn default_mobile_secs() -> u64 {
    10
}
fn default_zone_secs() -> u64 {
    10
}

impl Default for PulseConfig {
    fn default() -> Self {
        Self {
            violence_secs: default_violence_secs(),
            point_secs: default_point_secs(),
            affect_secs: default_affect_secs(),
            mobile_secs: default_mobile_secs(),
            zone_secs: default_zone_secs(),
        }
    }
}

impl PulseConfig {
    pub fn violence_interval(&self) -> Duration {
        Duration::from_secs(self.violence_secs.max(1))
    }
    pub fn point_interval(&self) -> Duration {
        Duration::from_secs(self.point_secs.max(1))
    }
    pub fn affect_interval(&self) -> Duration {
        Duration::from_secs(self.affect_secs.max(1))
    }
    pub fn mobile_interval(&self) -> Duration {
        Duration::from_secs(self.mobile_secs.max(1))
    }
    pub fn zone_interval(&self) -> Duration {
        Duration::from_secs(self.zone_secs.max(1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    pub level: String,
    pub file: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub world: WorldConfig,
    #[serde(default)]
    pub pulse: PulseConfig,
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a file
    pub async fn load(path: &str) -> Result<Self> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|e| anyhow!("Failed to read config file {}: {}", path, e))?;

        let config: Config = toml::from_str(&content)
            .map_err(|e| anyhow!("Failed to parse config file {}: {}", path, e))?;

        Ok(config)
    }

    /// Create a default configuration file
    pub async fn create_default(path: &str) -> Result<()> {
        let config = Config::default();
        let content = toml::to_string_pretty(&config)
            .map_err(|e| anyhow!("Failed to serialize default config: {}", e))?;

        fs::write(path, content)
            .await
            .map_err(|e| anyhow!("Failed to write config file {}: {}", path, e))?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Config {
            server: ServerConfig {
                name: "pulsemud".to_string(),
                data_dir: "./data".to_string(),
                max_players: 100,
            },
            world: WorldConfig {
                start_room: 3001,
                void_room: 1,
            },
            pulse: PulseConfig::default(),
            logging: LoggingConfig {
                level: "info".to_string(),
                file: Some("pulsemud.log".to_string()),
            },
        }
    }
}
