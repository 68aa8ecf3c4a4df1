//! Cadence Configuration System
//!
//! Loads, validates and persists the tunables of the playback controller.
//! Each area of the player owns a section implementing the `ConfigSection` trait.
//!
//! # Architecture
//!
//! - **Trait-based**: Each section is a type implementing `ConfigSection`
//! - **Graceful degradation**: Invalid values on load are logged, not fatal
//! - **Atomic writes**: Config files are never left in a corrupted state
//!
//! # Example
//!
//! ```rust,no_run
//! use cadence_config::{Config, ConfigManager};
//!
//! let manager = ConfigManager::new().expect("Failed to initialize config");
//! let config = manager.load().unwrap_or_else(|e| {
//!     eprintln!("Config error: {}, using defaults", e);
//!     Config::default()
//! });
//!
//! println!("Seek timeout: {:?}", config.playback.seek_timeout());
//! ```

mod error;
mod manager;
mod persistence;
mod validation;

// Config sections
mod network_config;
mod playback_config;

pub use error::{ConfigError, ConfigResult, ValidationError};
pub use manager::ConfigManager;
pub use validation::{ConfigSection, Validator};

// Re-export config sections
pub use network_config::NetworkConfig;
pub use playback_config::PlaybackConfig;

use serde::{Deserialize, Serialize};

/// Current config file format version
pub const CONFIG_VERSION: u32 = 1;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Config file format version
    pub version: u32,

    /// Playback controller timings and buffering
    pub playback: PlaybackConfig,

    /// Network source properties
    pub network: NetworkConfig,
}

impl Config {
    /// Creates a new config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Validates the entire configuration
    ///
    /// Returns all validation errors found across all sections.
    pub fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut errors = Vec::new();

        if let Err(mut e) = self.playback.validate() {
            errors.append(&mut e);
        }

        if let Err(mut e) = self.network.validate() {
            errors.append(&mut e);
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Merges this config with another, preferring values from `other`
    ///
    /// Override chain: defaults < file < env vars
    pub fn merge(&mut self, other: Config) {
        self.playback.merge(other.playback);
        self.network.merge(other.network);
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            playback: PlaybackConfig::default(),
            network: NetworkConfig::default(),
        }
    }
}
