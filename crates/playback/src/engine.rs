// FILE: crates/playback/src/engine.rs

//! Command surface of the external media engine
//!
//! The engine itself is a black box behind the [`Pipeline`] trait. [`EngineHandle`]
//! wraps it together with the receiving end of its status bus, logs every command
//! and remembers the lifecycle state that was last requested.

use crate::message::{BufferingMode, BusMessage};
use bitflags::bitflags;
use cadence_core::{EngineState, StreamKind, TagList};
use crossbeam_channel::Receiver;
use std::fmt;
use std::time::Duration;

/// Denominator of buffering range bounds
pub const PERCENT_MAX: u64 = 1_000_000;

/// Result of a lifecycle state request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StateChangeOutcome {
    Success,
    /// The change continues in the background; completion arrives on the bus
    Async,
    /// Succeeded, but the source is live and cannot preroll
    NoPreroll,
    Failure,
}

bitflags! {
    /// Seek behaviour flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct SeekFlags: u32 {
        /// Discard queued data so the seek takes effect immediately
        const FLUSH = 1 << 0;
        /// Land exactly on the requested time
        const ACCURATE = 1 << 1;
        /// Land on the nearest key unit
        const KEY_UNIT = 1 << 2;
    }
}

/// A seek to send to the engine
#[derive(Debug, Clone, PartialEq)]
pub struct SeekCommand {
    /// Signed playback rate to continue with
    pub rate: f64,
    pub start: Duration,
    /// End of the playback segment; `None` plays to the end of the stream
    pub stop: Option<Duration>,
    pub flags: SeekFlags,
}

impl SeekCommand {
    /// Flushing seek to `time` that keeps the direction of `rate`
    ///
    /// Reverse playback runs from `time` down to the start, so the bounds swap.
    pub fn to(time: Duration, rate: f64, accurate: bool) -> Self {
        let precision = if accurate {
            SeekFlags::ACCURATE
        } else {
            SeekFlags::KEY_UNIT
        };
        let (start, stop) = if rate > 0.0 {
            (time, None)
        } else {
            (Duration::ZERO, Some(time))
        };
        Self {
            rate,
            start,
            stop,
            flags: SeekFlags::FLUSH | precision,
        }
    }
}

/// Username and password for an authenticating source
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    pub user: String,
    pub password: String,
}

impl Credentials {
    pub fn new(user: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Properties the controller sets on the engine
#[derive(Debug, Clone, PartialEq)]
pub enum EngineProperty {
    Uri(String),
    SubtitleUri(Option<String>),
    UserAgent(String),
    Referrer(String),
    /// Connection speed hint in kbit/s
    ConnectionSpeed(u64),
    DownloadBuffering(bool),
    SourceCredentials(Credentials),
}

impl EngineProperty {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Uri(_) => "uri",
            Self::SubtitleUri(_) => "suburi",
            Self::UserAgent(_) => "user-agent",
            Self::Referrer(_) => "referrer",
            Self::ConnectionSpeed(_) => "connection-speed",
            Self::DownloadBuffering(_) => "download",
            Self::SourceCredentials(_) => "credentials",
        }
    }
}

/// Answer to a buffering statistics query
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BufferingStats {
    pub mode: BufferingMode,
    /// Estimated time until buffering completes; `None` when the engine cannot tell
    pub buffering_left: Option<Duration>,
}

/// Buffered range, in units of [`PERCENT_MAX`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BufferingRange {
    pub start: u64,
    pub stop: u64,
}

impl BufferingRange {
    /// Fraction of the stream that is available locally
    pub fn fill_ratio(&self) -> f64 {
        (self.stop.min(PERCENT_MAX) as f64) / (PERCENT_MAX as f64)
    }
}

/// Summary of the streams found while prerolling
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StreamInfo {
    pub video_streams: usize,
    pub audio_streams: usize,
    pub text_streams: usize,
    pub video_size: Option<(u32, u32)>,
    pub frame_rate: Option<f64>,
}

impl StreamInfo {
    pub fn has_video(&self) -> bool {
        self.video_streams > 0
    }

    pub fn has_audio(&self) -> bool {
        self.audio_streams > 0
    }
}

/// The external media pipeline
///
/// Queries return `None` when the engine cannot answer at the moment.
pub trait Pipeline: Send {
    fn set_state(&mut self, state: EngineState) -> StateChangeOutcome;

    /// Blocks until a pending state change settles or `timeout` expires
    fn await_state_change(&mut self, timeout: Duration) -> StateChangeOutcome;

    /// Returns false if the engine rejected the seek
    fn seek(&mut self, command: &SeekCommand) -> bool;

    fn set_property(&mut self, property: EngineProperty);

    fn query_position(&self) -> Option<Duration>;

    fn query_duration(&self) -> Option<Duration>;

    fn query_seeking(&self) -> Option<bool>;

    fn query_buffering(&self) -> Option<BufferingStats>;

    fn query_buffering_range(&self) -> Option<BufferingRange>;

    /// Index of the selected stream of `kind`
    fn current_stream(&self, kind: StreamKind) -> Option<usize>;

    fn stream_tags(&self, kind: StreamKind, index: usize) -> Option<TagList>;

    fn stream_info(&self) -> StreamInfo;

    /// Whether the current source accepts [`EngineProperty::SourceCredentials`]
    fn source_supports_credentials(&self) -> bool;
}

/// Wrapper through which every engine command is issued
pub struct EngineHandle {
    pipeline: Box<dyn Pipeline>,
    bus: Receiver<BusMessage>,
    requested: EngineState,
}

impl EngineHandle {
    pub fn new(pipeline: Box<dyn Pipeline>, bus: Receiver<BusMessage>) -> Self {
        Self {
            pipeline,
            bus,
            requested: EngineState::Null,
        }
    }

    /// The engine's status message stream
    pub fn bus(&self) -> &Receiver<BusMessage> {
        &self.bus
    }

    /// The state most recently requested through [`set_state`](Self::set_state)
    pub fn requested_state(&self) -> EngineState {
        self.requested
    }

    pub fn set_state(&mut self, state: EngineState) -> StateChangeOutcome {
        log::debug!("engine: set_state({})", state);
        self.requested = state;
        let outcome = self.pipeline.set_state(state);
        if outcome == StateChangeOutcome::Failure {
            log::warn!("engine: state change to {} failed", state);
        }
        outcome
    }

    pub fn await_state_change(&mut self, timeout: Duration) -> StateChangeOutcome {
        log::debug!("engine: waiting up to {:?} for state change", timeout);
        self.pipeline.await_state_change(timeout)
    }

    pub fn seek(&mut self, command: &SeekCommand) -> bool {
        log::debug!(
            "engine: seek rate={} start={:?} stop={:?} flags={:?}",
            command.rate,
            command.start,
            command.stop,
            command.flags
        );
        let accepted = self.pipeline.seek(command);
        if !accepted {
            log::warn!("engine: seek to {:?} rejected", command.start);
        }
        accepted
    }

    pub fn set_property(&mut self, property: EngineProperty) {
        log::debug!("engine: set_property({})", property.name());
        self.pipeline.set_property(property);
    }

    pub fn position(&self) -> Option<Duration> {
        self.pipeline.query_position()
    }

    pub fn duration(&self) -> Option<Duration> {
        self.pipeline.query_duration()
    }

    pub fn seeking(&self) -> Option<bool> {
        self.pipeline.query_seeking()
    }

    pub fn buffering(&self) -> Option<BufferingStats> {
        self.pipeline.query_buffering()
    }

    pub fn buffering_range(&self) -> Option<BufferingRange> {
        self.pipeline.query_buffering_range()
    }

    pub fn current_stream(&self, kind: StreamKind) -> Option<usize> {
        self.pipeline.current_stream(kind)
    }

    pub fn stream_tags(&self, kind: StreamKind, index: usize) -> Option<TagList> {
        self.pipeline.stream_tags(kind, index)
    }

    pub fn stream_info(&self) -> StreamInfo {
        self.pipeline.stream_info()
    }

    pub fn source_supports_credentials(&self) -> bool {
        self.pipeline.source_supports_credentials()
    }
}
