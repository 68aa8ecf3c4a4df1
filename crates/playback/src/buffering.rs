// FILE: crates/playback/src/buffering.rs

//! Automatic pause/resume around network buffering
//!
//! Two mutually exclusive modes are handled:
//! - **Stream buffering**: the engine pushes percent updates for its jitter buffer;
//!   playback pauses below 100% and resumes at 100%.
//! - **Download buffering**: the stream is cached locally; the engine does not push
//!   progress, so the policy polls the buffered range until enough is cached.

use crate::engine::EngineHandle;
use crate::message::BufferingMode;
use cadence_config::PlaybackConfig;
use cadence_core::{EngineState, TargetState};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Which buffering cycle is active
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum BufferingPhase {
    #[default]
    Idle,
    StreamBuffering,
    DownloadBuffering,
}

/// Snapshot of the buffering policy
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BufferingState {
    mode: BufferingPhase,
    percent: u8,
    fill_ratio: f64,
    buffering_left: Option<Duration>,
    download_path: Option<PathBuf>,
}

impl BufferingState {
    pub fn mode(&self) -> BufferingPhase {
        self.mode
    }

    /// Last stream-buffering percentage
    pub fn percent(&self) -> u8 {
        self.percent
    }

    /// Fraction of the download that is cached, from the last poll
    pub fn fill_ratio(&self) -> f64 {
        self.fill_ratio
    }

    pub fn buffering_left(&self) -> Option<Duration> {
        self.buffering_left
    }

    /// Local cache file; only reported while download buffering
    pub fn download_path(&self) -> Option<&Path> {
        match self.mode {
            BufferingPhase::DownloadBuffering => self.download_path.as_deref(),
            _ => None,
        }
    }
}

/// Result of feeding a buffering message to the policy
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingOutcome {
    Unchanged,
    /// Playback is held back until buffering completes
    Suspended,
    /// Buffering completed and the caller wants to play
    Ready,
}

/// One download-buffering poll
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DownloadProgress {
    pub fill_ratio: f64,
    pub done: bool,
}

#[derive(Debug)]
pub struct BufferingPolicy {
    state: BufferingState,
    next_poll: Option<Instant>,
    /// Set once a download cycle completes; later download messages are ignored
    download_done: bool,
    poll_interval: Duration,
    headroom_ratio: f64,
    seekable_threshold: f64,
}

impl BufferingPolicy {
    pub fn new(config: &PlaybackConfig) -> Self {
        Self {
            state: BufferingState::default(),
            next_poll: None,
            download_done: false,
            poll_interval: config.download_poll_interval(),
            headroom_ratio: config.download_headroom_ratio,
            seekable_threshold: config.download_seekable_threshold,
        }
    }

    pub fn state(&self) -> &BufferingState {
        &self.state
    }

    /// True while a buffering cycle holds playback back
    pub fn is_blocking_playback(&self) -> bool {
        self.state.mode != BufferingPhase::Idle
    }

    /// False while downloading below the seekable fill threshold
    pub fn is_instantly_seekable(&self) -> bool {
        self.state.mode != BufferingPhase::DownloadBuffering
            || self.state.fill_ratio >= self.seekable_threshold
    }

    pub fn next_poll(&self) -> Option<Instant> {
        self.next_poll
    }

    pub fn poll_due(&self, now: Instant) -> bool {
        self.next_poll.is_some_and(|at| now >= at)
    }

    pub fn set_download_path(&mut self, path: PathBuf) {
        log::debug!("Download buffer file: {}", path.display());
        self.state.download_path = Some(path);
    }

    pub fn reset(&mut self) {
        self.state = BufferingState::default();
        self.next_poll = None;
        self.download_done = false;
    }

    pub fn on_buffering(
        &mut self,
        engine: &mut EngineHandle,
        target: TargetState,
        percent: u8,
        mode: BufferingMode,
        now: Instant,
    ) -> BufferingOutcome {
        match mode {
            BufferingMode::Download => self.on_download(engine, now),
            BufferingMode::Stream | BufferingMode::Timeshift | BufferingMode::Live => {
                self.on_stream(engine, target, percent)
            }
        }
    }

    fn on_download(&mut self, engine: &mut EngineHandle, now: Instant) -> BufferingOutcome {
        if self.state.mode == BufferingPhase::DownloadBuffering {
            // Progress comes from polling, not from messages
            return BufferingOutcome::Unchanged;
        }
        if self.download_done {
            log::trace!("Download already cached, ignoring download progress");
            return BufferingOutcome::Unchanged;
        }

        log::info!("Download buffering started, pausing until enough data is cached");
        self.enter(BufferingPhase::DownloadBuffering);
        engine.set_state(EngineState::Paused);
        self.next_poll = Some(now + self.poll_interval);
        BufferingOutcome::Suspended
    }

    fn on_stream(
        &mut self,
        engine: &mut EngineHandle,
        target: TargetState,
        percent: u8,
    ) -> BufferingOutcome {
        if self.state.mode == BufferingPhase::DownloadBuffering {
            log::debug!("Switching from download to stream buffering");
            self.enter(BufferingPhase::Idle);
        }
        self.download_done = false;
        self.state.percent = percent.min(100);

        if percent >= 100 {
            self.state.mode = BufferingPhase::Idle;
            if target == TargetState::Playing {
                log::debug!("Buffering done, resuming playback");
                return BufferingOutcome::Ready;
            }
            log::debug!("Buffering done, staying paused");
            return BufferingOutcome::Unchanged;
        }

        if target == TargetState::Playing && engine.requested_state() == EngineState::Playing {
            log::debug!("Buffering at {}%, pausing playback", percent);
            engine.set_state(EngineState::Paused);
        } else {
            log::trace!("Buffering at {}%", percent);
        }
        self.state.mode = BufferingPhase::StreamBuffering;
        BufferingOutcome::Suspended
    }

    /// Polls the engine for download progress
    ///
    /// The download is done once everything is cached, or once the estimated time
    /// left (with headroom) is shorter than the media left to play, or when the
    /// engine cannot estimate the time left at all.
    pub fn poll(
        &mut self,
        engine: &EngineHandle,
        duration: Duration,
        position: Duration,
        now: Instant,
    ) -> Option<DownloadProgress> {
        if self.state.mode != BufferingPhase::DownloadBuffering {
            self.next_poll = None;
            return None;
        }
        self.next_poll = Some(now + self.poll_interval);

        let range = engine.buffering_range()?;
        let fill_ratio = range.fill_ratio();
        self.state.fill_ratio = fill_ratio;

        let stats = engine.buffering();
        self.state.buffering_left = stats.and_then(|s| s.buffering_left);

        let remaining = duration.saturating_sub(position);
        let done = fill_ratio >= 1.0
            || match stats {
                Some(stats) => match stats.buffering_left {
                    Some(left) => {
                        left.as_secs_f64() * self.headroom_ratio < remaining.as_secs_f64()
                    }
                    None => true,
                },
                None => false,
            };

        if done {
            log::info!("Download buffering done at {:.0}%", fill_ratio * 100.0);
            self.state.mode = BufferingPhase::Idle;
            self.next_poll = None;
            self.download_done = true;
        }

        Some(DownloadProgress { fill_ratio, done })
    }

    fn enter(&mut self, mode: BufferingPhase) {
        self.state.mode = mode;
        self.state.percent = 0;
        self.state.fill_ratio = 0.0;
        self.state.buffering_left = None;
        self.next_poll = None;
    }
}
