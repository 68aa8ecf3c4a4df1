//! Core domain types shared by the Cadence crates

pub mod error;
pub mod types;

// Re-export commonly used types
pub use error::{CoreError, ErrorKind, ErrorRecord, Result};
pub use types::{
    keys, CoverImage, EngineState, ImageKind, LifecycleState, Mrl, PlaybackRate, Seekable,
    StreamKind, TagList, TagValue, TargetState,
};
