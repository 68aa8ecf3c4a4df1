//! Integration tests for the configuration system

use cadence_config::{
    Config, ConfigManager, ConfigSection, NetworkConfig, PlaybackConfig, CONFIG_VERSION,
};
use tempfile::TempDir;

fn setup_test_manager() -> Result<(TempDir, ConfigManager), Box<dyn std::error::Error>> {
    let temp_dir = TempDir::new()?;
    let manager = ConfigManager::with_directory(temp_dir.path().to_path_buf())?;
    Ok((temp_dir, manager))
}

#[test]
fn test_full_lifecycle() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    let created = manager.initialize()?;
    assert!(created);

    let config = manager.load()?;
    assert_eq!(config.version, CONFIG_VERSION);

    let mut modified = config.clone();
    modified.playback.seek_timeout_ms = 300;
    modified.network.referrer = Some("https://example.org/".to_string());
    manager.save(&modified)?;

    let reloaded = manager.load()?;
    assert_eq!(reloaded.playback.seek_timeout_ms, 300);
    assert_eq!(
        reloaded.network.referrer.as_deref(),
        Some("https://example.org/")
    );

    manager.reset()?;
    let after_reset = manager.load()?;
    assert_eq!(after_reset, Config::default());

    Ok(())
}

#[test]
fn test_config_validation_integration() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;

    manager.save(&Config::default())?;
    assert!(manager.validate()?.is_empty());

    let mut invalid = Config::default();
    invalid.playback.direction_change_timeout_ms = 10;
    assert!(manager.save(&invalid).is_err());

    // The rejected save must leave the previous file intact
    assert_eq!(manager.load()?, Config::default());

    Ok(())
}

#[test]
fn test_partial_file_fills_defaults() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    std::fs::write(
        manager.config_path(),
        "[network]\nconnection_speed_kbps = 2048\n",
    )?;

    let config = manager.load()?;
    assert_eq!(config.network.connection_speed_kbps, 2048);
    assert_eq!(config.playback, PlaybackConfig::default());
    assert_eq!(config.version, CONFIG_VERSION);

    Ok(())
}

#[test]
fn test_serialization_roundtrip_through_toml() -> Result<(), Box<dyn std::error::Error>> {
    let mut config = Config::default();
    config.network.user_agent = Some("Cadence/0.1".to_string());
    config.playback.download_headroom_ratio = 1.5;

    let toml_string = toml::to_string(&config)?;
    let parsed: Config = toml::from_str(&toml_string)?;
    assert_eq!(config, parsed);

    Ok(())
}

#[test]
fn test_section_names() {
    assert_eq!(PlaybackConfig::default().section_name(), "playback");
    assert_eq!(NetworkConfig::default().section_name(), "network");
}

#[test]
fn test_env_overrides_apply_on_top_of_file() -> Result<(), Box<dyn std::error::Error>> {
    let (_temp_dir, manager) = setup_test_manager()?;
    manager.update(|config| config.playback.tick_interval_ms = 400)?;

    std::env::set_var("CADENCE_NETWORK_CONNECTION_SPEED_KBPS", "768");
    std::env::set_var("CADENCE_PLAYBACK_DOWNLOAD_BUFFERING", "false");
    let config = manager.load_with_env_overrides();
    std::env::remove_var("CADENCE_NETWORK_CONNECTION_SPEED_KBPS");
    std::env::remove_var("CADENCE_PLAYBACK_DOWNLOAD_BUFFERING");

    let config = config?;
    assert_eq!(config.playback.tick_interval_ms, 400);
    assert_eq!(config.network.connection_speed_kbps, 768);
    assert!(!config.playback.download_buffering);

    Ok(())
}
