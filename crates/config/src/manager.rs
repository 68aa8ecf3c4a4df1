//! Configuration manager - main API for config operations

use crate::persistence::ConfigPersistence;
use crate::{Config, ConfigError, ConfigResult};
use directories::ProjectDirs;
use std::path::PathBuf;
use std::str::FromStr;

/// Prefix of environment variable overrides
const ENV_PREFIX: &str = "CADENCE";

/// Main configuration manager
///
/// Primary interface for loading, saving, and managing configuration.
pub struct ConfigManager {
    persistence: ConfigPersistence,
    config_dir: PathBuf,
}

impl ConfigManager {
    /// Creates a new config manager using the default config directory
    ///
    /// - Linux: `~/.config/cadence/`
    /// - macOS: `~/Library/Application Support/cadence/`
    /// - Windows: `%APPDATA%\cadence\`
    pub fn new() -> ConfigResult<Self> {
        let config_dir = Self::default_config_dir()?;
        Self::with_directory(config_dir)
    }

    /// Creates a config manager with a custom config directory
    pub fn with_directory(config_dir: PathBuf) -> ConfigResult<Self> {
        let config_path = config_dir.join("config.toml");
        let persistence = ConfigPersistence::new(config_path);

        Ok(Self {
            persistence,
            config_dir,
        })
    }

    fn default_config_dir() -> ConfigResult<PathBuf> {
        ProjectDirs::from("", "", "cadence")
            .map(|proj_dirs| proj_dirs.config_dir().to_path_buf())
            .ok_or_else(|| ConfigError::PathResolutionError {
                reason: "Could not determine user config directory".to_string(),
            })
    }

    /// Returns the config directory path
    pub fn config_dir(&self) -> &PathBuf {
        &self.config_dir
    }

    /// Returns the full config file path
    pub fn config_path(&self) -> PathBuf {
        self.config_dir.join("config.toml")
    }

    /// Loads the configuration from file
    ///
    /// If the file doesn't exist, returns default configuration.
    /// If the file is corrupted, returns an error.
    pub fn load(&self) -> ConfigResult<Config> {
        self.persistence.load()
    }

    /// Loads the configuration, falling back to defaults on any error
    pub fn load_or_default(&self) -> Config {
        match self.load() {
            Ok(config) => config,
            Err(e) => {
                log::warn!("Failed to load config: {}, using defaults", e);
                Config::default()
            }
        }
    }

    /// Validates and saves the configuration atomically
    pub fn save(&self, config: &Config) -> ConfigResult<()> {
        self.persistence.save(config)
    }

    /// Loads the current config, applies `update_fn`, and saves the result
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// # use cadence_config::ConfigManager;
    /// # let manager = ConfigManager::new().unwrap();
    /// manager.update(|config| {
    ///     config.playback.seek_timeout_ms = 250;
    /// }).expect("Failed to update config");
    /// ```
    pub fn update<F>(&self, update_fn: F) -> ConfigResult<()>
    where
        F: FnOnce(&mut Config),
    {
        let mut config = self.load()?;
        update_fn(&mut config);
        self.save(&config)
    }

    /// Writes a default config file if one doesn't exist
    ///
    /// Returns Ok(true) if a new file was created, Ok(false) if one already exists.
    pub fn initialize(&self) -> ConfigResult<bool> {
        if self.config_path().exists() {
            log::info!(
                "Config file already exists at {}",
                self.config_path().display()
            );
            return Ok(false);
        }

        self.persistence.write_default()?;
        Ok(true)
    }

    /// Overwrites the config file with default values
    pub fn reset(&self) -> ConfigResult<()> {
        self.save(&Config::default())
    }

    /// Validates the current configuration file
    ///
    /// Returns the validation messages, empty if the file is valid.
    pub fn validate(&self) -> ConfigResult<Vec<String>> {
        let config = self.load()?;

        match config.validate() {
            Ok(()) => Ok(Vec::new()),
            Err(errors) => Ok(errors.iter().map(|e| e.to_string()).collect()),
        }
    }

    /// Loads the config and applies environment variable overrides
    ///
    /// Variables follow the pattern `CADENCE_<SECTION>_<FIELD>`,
    /// e.g. `CADENCE_PLAYBACK_SEEK_TIMEOUT_MS=250`. Unparsable values are ignored.
    pub fn load_with_env_overrides(&self) -> ConfigResult<Config> {
        let mut config = self.load()?;
        let playback = &mut config.playback;

        override_from_env("PLAYBACK", "SEEK_TIMEOUT_MS", &mut playback.seek_timeout_ms);
        override_from_env(
            "PLAYBACK",
            "DOWNLOAD_POLL_INTERVAL_MS",
            &mut playback.download_poll_interval_ms,
        );
        override_from_env(
            "PLAYBACK",
            "DOWNLOAD_HEADROOM_RATIO",
            &mut playback.download_headroom_ratio,
        );
        override_from_env(
            "PLAYBACK",
            "DOWNLOAD_SEEKABLE_THRESHOLD",
            &mut playback.download_seekable_threshold,
        );
        override_from_env("PLAYBACK", "TICK_INTERVAL_MS", &mut playback.tick_interval_ms);
        override_from_env(
            "PLAYBACK",
            "DIRECTION_CHANGE_TIMEOUT_MS",
            &mut playback.direction_change_timeout_ms,
        );
        override_from_env("PLAYBACK", "MIN_RATE", &mut playback.min_rate);
        override_from_env("PLAYBACK", "MAX_RATE", &mut playback.max_rate);
        override_from_env(
            "PLAYBACK",
            "DOWNLOAD_BUFFERING",
            &mut playback.download_buffering,
        );

        let network = &mut config.network;
        if let Ok(agent) = std::env::var(env_key("NETWORK", "USER_AGENT")) {
            network.user_agent = Some(agent);
        }
        if let Ok(referrer) = std::env::var(env_key("NETWORK", "REFERRER")) {
            network.referrer = Some(referrer);
        }
        override_from_env(
            "NETWORK",
            "CONNECTION_SPEED_KBPS",
            &mut network.connection_speed_kbps,
        );

        if let Err(errors) = config.validate() {
            log::warn!(
                "Config validation warnings after env overrides: {:?}",
                errors
            );
        }

        Ok(config)
    }
}

fn env_key(section: &str, field: &str) -> String {
    format!("{}_{}_{}", ENV_PREFIX, section, field)
}

fn override_from_env<T: FromStr>(section: &str, field: &str, target: &mut T) {
    let key = env_key(section, field);
    if let Ok(raw) = std::env::var(&key) {
        match raw.parse::<T>() {
            Ok(value) => {
                log::debug!("Config override from {}", key);
                *target = value;
            }
            Err(_) => log::warn!("Ignoring unparsable value for {}: {}", key, raw),
        }
    }
}
