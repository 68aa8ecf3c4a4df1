// FILE: crates/playback/src/session.rs

//! Per-open playback session state

use crate::engine::{Credentials, StreamInfo};
use cadence_core::{EngineState, Mrl, PlaybackRate, Seekable, TargetState};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

/// Identifies one session; cancelled when the session is closed
///
/// Clones share the cancellation flag, so work tagged with a token can check
/// whether its session is still alive from any thread.
#[derive(Debug, Clone)]
pub struct SessionToken {
    id: u64,
    cancelled: Arc<AtomicBool>,
}

impl SessionToken {
    pub fn new(id: u64) -> Self {
        Self {
            id,
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// True if `id` names this token and it is still live
    pub fn is_current(&self, id: u64) -> bool {
        self.id == id && !self.is_cancelled()
    }
}

/// A decoder or demuxer the engine reported as missing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MissingPlugin {
    pub detail: String,
    pub description: String,
}

/// The mutable state of the open media
#[derive(Debug)]
pub struct MediaSession {
    pub(crate) token: SessionToken,
    pub(crate) mrl: Mrl,
    pub(crate) target_state: TargetState,
    /// Last lifecycle state the engine reported on the bus
    pub(crate) engine_state: EngineState,
    pub(crate) position: Duration,
    pub(crate) duration: Duration,
    pub(crate) seekable: Seekable,
    pub(crate) is_live: bool,
    pub(crate) rate: PlaybackRate,
    pub(crate) subtitle_uri: Option<String>,
    pub(crate) stream_info: Option<StreamInfo>,

    pub(crate) prerolled: bool,
    pub(crate) failed: bool,
    pub(crate) eos_emitted: bool,
    /// A direction reversal was sent but the engine has not confirmed it yet
    pub(crate) direction_pending: bool,
    pub(crate) missing_plugins: Vec<MissingPlugin>,
    pub(crate) missing_plugins_checked: bool,
    /// Applied to the source once, then dropped
    pub(crate) pending_credentials: Option<Credentials>,
    pub(crate) warned_unseekable: bool,
}

impl MediaSession {
    pub(crate) fn new(mrl: Mrl, token: SessionToken) -> Self {
        Self {
            token,
            mrl,
            target_state: TargetState::Paused,
            engine_state: EngineState::Null,
            position: Duration::ZERO,
            duration: Duration::ZERO,
            seekable: Seekable::Unknown,
            is_live: false,
            rate: PlaybackRate::NORMAL,
            subtitle_uri: None,
            stream_info: None,
            prerolled: false,
            failed: false,
            eos_emitted: false,
            direction_pending: false,
            missing_plugins: Vec::new(),
            missing_plugins_checked: false,
            pending_credentials: None,
            warned_unseekable: false,
        }
    }

    pub fn mrl(&self) -> &Mrl {
        &self.mrl
    }

    pub fn target_state(&self) -> TargetState {
        self.target_state
    }

    pub fn engine_state(&self) -> EngineState {
        self.engine_state
    }

    pub fn position(&self) -> Duration {
        self.position
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    pub fn seekable(&self) -> Seekable {
        self.seekable
    }

    pub fn is_live(&self) -> bool {
        self.is_live
    }

    pub fn rate(&self) -> PlaybackRate {
        self.rate
    }

    pub fn subtitle_uri(&self) -> Option<&str> {
        self.subtitle_uri.as_deref()
    }

    pub fn token(&self) -> &SessionToken {
        &self.token
    }

    /// Clamps `time` to the known duration; unknown durations do not clamp
    pub(crate) fn clamp_to_duration(&self, time: Duration) -> Duration {
        if self.duration.is_zero() {
            time
        } else {
            time.min(self.duration)
        }
    }

    /// Position as a fraction of the duration, 0.0 when the duration is unknown
    pub(crate) fn percent(&self) -> f64 {
        if self.duration.is_zero() {
            0.0
        } else {
            (self.position.as_secs_f64() / self.duration.as_secs_f64()).clamp(0.0, 1.0)
        }
    }

    /// Takes the stored credentials; they are valid for one use only
    pub(crate) fn take_credentials(&mut self) -> Option<Credentials> {
        self.pending_credentials.take()
    }
}
