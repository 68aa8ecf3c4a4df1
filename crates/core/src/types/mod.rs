//! Domain types for Cadence
//!
//! This module contains the playback domain models organized by responsibility:
//! - `media`: Media resource locators
//! - `state`: Target, engine and lifecycle states
//! - `rate`: Signed playback rate
//! - `tags`: Stream kinds, tag values and tag lists

mod media;
mod rate;
mod state;
mod tags;

// Re-export all public types
pub use media::Mrl;
pub use rate::PlaybackRate;
pub use state::{EngineState, LifecycleState, Seekable, TargetState};
pub use tags::{keys, CoverImage, ImageKind, StreamKind, TagList, TagValue};
