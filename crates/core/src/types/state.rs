//! Lifecycle states: what the caller wants vs. what the engine reports

use serde::{Deserialize, Serialize};
use std::fmt;

/// The state the caller asked for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TargetState {
    #[default]
    Stopped,
    Paused,
    Playing,
}

impl TargetState {
    /// The engine state that realizes this target
    pub fn engine_state(&self) -> EngineState {
        match self {
            Self::Stopped => EngineState::Null,
            Self::Paused => EngineState::Paused,
            Self::Playing => EngineState::Playing,
        }
    }
}

impl fmt::Display for TargetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stopped => write!(f, "stopped"),
            Self::Paused => write!(f, "paused"),
            Self::Playing => write!(f, "playing"),
        }
    }
}

/// Lifecycle states understood by the external engine, lowest first
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineState {
    #[default]
    Null,
    Ready,
    Paused,
    Playing,
}

impl fmt::Display for EngineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => write!(f, "NULL"),
            Self::Ready => write!(f, "READY"),
            Self::Paused => write!(f, "PAUSED"),
            Self::Playing => write!(f, "PLAYING"),
        }
    }
}

/// Public lifecycle of a session, reconciled from target and engine state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleState {
    Closed,
    Opening,
    Paused,
    Playing,
    Stopped,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Closed => write!(f, "closed"),
            Self::Opening => write!(f, "opening"),
            Self::Paused => write!(f, "paused"),
            Self::Playing => write!(f, "playing"),
            Self::Stopped => write!(f, "stopped"),
        }
    }
}

/// Tri-state seekability; unknown until the engine has been asked
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Seekable {
    #[default]
    Unknown,
    Yes,
    No,
}

impl Seekable {
    /// Unknown counts as seekable: the engine is allowed to try
    pub fn allows_seek(&self) -> bool {
        !matches!(self, Self::No)
    }
}

impl From<bool> for Seekable {
    fn from(value: bool) -> Self {
        if value {
            Self::Yes
        } else {
            Self::No
        }
    }
}
