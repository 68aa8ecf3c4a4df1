//! Playback configuration section

use crate::validation::{ConfigSection, ValidationError, Validator};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Timing and buffering behavior of the playback controller
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PlaybackConfig {
    /// Seek debounce window in milliseconds (10-2000)
    pub seek_timeout_ms: u64,

    /// Download buffering poll interval in milliseconds (50-5000)
    pub download_poll_interval_ms: u64,

    /// Headroom factor applied to the estimated time left to download (1.0-4.0)
    pub download_headroom_ratio: f64,

    /// Download fill ratio from which the session is instantly seekable (0.0-1.0)
    pub download_seekable_threshold: f64,

    /// Tick event period while playing, in milliseconds (16-5000)
    pub tick_interval_ms: u64,

    /// Upper bound on the wait for a playback direction reversal (100-30000)
    pub direction_change_timeout_ms: u64,

    /// Smallest allowed rate magnitude
    pub min_rate: f64,

    /// Largest allowed rate magnitude
    pub max_rate: f64,

    /// Ask the engine for progressive download on network sources
    pub download_buffering: bool,
}

impl PlaybackConfig {
    pub fn seek_timeout(&self) -> Duration {
        Duration::from_millis(self.seek_timeout_ms)
    }

    pub fn download_poll_interval(&self) -> Duration {
        Duration::from_millis(self.download_poll_interval_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    pub fn direction_change_timeout(&self) -> Duration {
        Duration::from_millis(self.direction_change_timeout_ms)
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            seek_timeout_ms: 100,
            download_poll_interval_ms: 200,
            download_headroom_ratio: 1.1,
            download_seekable_threshold: 1.0,
            tick_interval_ms: 200,
            direction_change_timeout_ms: 2000,
            min_rate: 0.25,
            max_rate: 4.0,
            download_buffering: true,
        }
    }
}

impl ConfigSection for PlaybackConfig {
    fn validate(&self) -> Result<(), Vec<ValidationError>> {
        let mut results = vec![
            Validator::in_range(self.seek_timeout_ms, 10, 2000, "playback.seek_timeout_ms"),
            Validator::in_range(
                self.download_poll_interval_ms,
                50,
                5000,
                "playback.download_poll_interval_ms",
            ),
            Validator::in_range(
                self.download_headroom_ratio,
                1.0,
                4.0,
                "playback.download_headroom_ratio",
            ),
            Validator::in_range(
                self.download_seekable_threshold,
                0.0,
                1.0,
                "playback.download_seekable_threshold",
            ),
            Validator::in_range(self.tick_interval_ms, 16, 5000, "playback.tick_interval_ms"),
            Validator::in_range(
                self.direction_change_timeout_ms,
                100,
                30000,
                "playback.direction_change_timeout_ms",
            ),
            Validator::in_range(self.min_rate, 0.01, 1.0, "playback.min_rate"),
            Validator::in_range(self.max_rate, 1.0, 64.0, "playback.max_rate"),
        ];

        if self.min_rate > self.max_rate {
            results.push(Err(ValidationError::with_value(
                "playback.min_rate",
                "must not exceed playback.max_rate",
                self.min_rate,
            )));
        }

        Validator::collect_errors(results)
    }

    fn merge(&mut self, other: Self) {
        self.seek_timeout_ms = other.seek_timeout_ms;
        self.download_poll_interval_ms = other.download_poll_interval_ms;
        self.download_headroom_ratio = other.download_headroom_ratio;
        self.download_seekable_threshold = other.download_seekable_threshold;
        self.tick_interval_ms = other.tick_interval_ms;
        self.direction_change_timeout_ms = other.direction_change_timeout_ms;
        self.min_rate = other.min_rate;
        self.max_rate = other.max_rate;
        self.download_buffering = other.download_buffering;
    }

    fn section_name(&self) -> &'static str {
        "playback"
    }
}
