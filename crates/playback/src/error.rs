// FILE: crates/playback/src/error.rs

use cadence_core::CoreError;
use thiserror::Error;

/// Errors returned by the controller's public API
///
/// Failures the engine reports while playing are not `PlaybackError`s; they are
/// delivered as `PlayerEvent::Error`.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum PlaybackError {
    /// Invalid MRL or rate
    #[error(transparent)]
    Invalid(#[from] CoreError),

    #[error("No media is open")]
    NoSession,

    #[error("Playback failed; open the media again")]
    SessionFailed,

    #[error("Failed to change playback direction: {0}")]
    DirectionChange(String),

    #[error("Engine rejected {command}: {reason}")]
    Command { command: String, reason: String },

    #[error("Engine bus disconnected")]
    EngineDisconnected,

    #[error("No outstanding side-flow with id {0}")]
    UnknownSideFlow(u64),

    #[error("Playback controller is gone")]
    ControllerGone,
}

impl PlaybackError {
    pub fn command(command: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Command {
            command: command.into(),
            reason: reason.into(),
        }
    }
}

pub type PlaybackResult<T> = Result<T, PlaybackError>;
