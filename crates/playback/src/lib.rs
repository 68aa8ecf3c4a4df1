// FILE: crates/playback/src/lib.rs

//! Playback control for Cadence
//!
//! Drives an external media engine from open to close: it reconciles the state the
//! caller asked for with what the engine reports, debounces seeks, pauses around
//! buffering, classifies engine errors and suspends playback while the host answers
//! side-flows (plugin installation, mounting, authentication).
//!
//! The engine is anything implementing [`Pipeline`]; its status messages arrive as
//! [`BusMessage`] values on a channel handed to the [`LifecycleController`].

mod buffering;
mod classifier;
mod controller;
mod engine;
mod error;
mod events;
mod message;
mod metadata;
mod seek;
mod session;
mod sideflow;
mod tags;

#[cfg(test)]
mod fake;

pub use buffering::{
    BufferingOutcome, BufferingPhase, BufferingPolicy, BufferingState, DownloadProgress,
};
pub use classifier::{classify, triage, ClassifierContext, Triage};
pub use controller::LifecycleController;
pub use engine::{
    BufferingRange, BufferingStats, Credentials, EngineHandle, EngineProperty, Pipeline,
    SeekCommand, SeekFlags, StateChangeOutcome, StreamInfo, PERCENT_MAX,
};
pub use error::{PlaybackError, PlaybackResult};
pub use events::PlayerEvent;
pub use message::{
    BufferingMode, BusMessage, CoreCode, ElementMessage, EngineErrorMessage, ErrorCode,
    ErrorDomain, LibraryCode, ResourceCode, StreamCode,
};
pub use metadata::{MetadataKey, MetadataValue};
pub use seek::{PendingSeek, SeekCoordinator, SeekDone, SeekOutcome};
pub use session::{MediaSession, MissingPlugin, SessionToken};
pub use sideflow::{
    CancelReason, SideFlowCompletion, SideFlowCoordinator, SideFlowKind, SideFlowOutcome,
    SideFlowRequest, SideFlowResponder, SideFlowToken,
};
pub use tags::{PendingTags, TagAggregator, TagInbox};

pub type Result<T> = std::result::Result<T, PlaybackError>;
