//! Error taxonomy and error types for Cadence
//!
//! This module provides:
//! - **ErrorKind**: the closed, user-facing taxonomy every playback failure maps to
//! - **ErrorRecord**: one surfaced failure (kind, message, fatal flag), emitted exactly once
//! - **CoreError**: validation failures for the domain types in this crate
//!
//! Engine failures never travel as `Err` values of API calls; they are classified into an
//! `ErrorRecord` and delivered as an event.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Closed set of user-facing playback error kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorKind {
    // ===== Plugin/codec errors =====
    /// No demuxer or decoder is available for the file
    NoPluginForFile,
    /// The media uses a codec the engine cannot handle
    CodecNotHandled,
    /// A required engine plugin failed to load
    PluginLoadFailure,

    // ===== File errors =====
    /// The file could not be opened for an unspecified reason
    FileGeneric,
    /// Permission denied while opening the file
    FilePermission,
    /// The file is encrypted
    FileEncrypted,
    /// The file or location does not exist
    FileNotFound,
    /// The file contains no data
    EmptyFile,
    /// Reading from the media failed part-way
    ReadError,

    // ===== Device errors =====
    /// The disc is encrypted and cannot be read
    DvdEncrypted,
    /// The device (DVD/VCD drive) is missing or unusable
    InvalidDevice,

    // ===== Network errors =====
    /// Host name lookup failed
    UnknownHost,
    /// The network is unreachable
    NetworkUnreachable,
    /// The server refused the connection
    ConnectionRefused,
    /// The location is not valid or not accessible
    InvalidLocation,

    // ===== Other =====
    /// Frame capture failed
    CannotCapture,
    /// Anything that does not fit a more specific kind
    Generic,
}

impl ErrorKind {
    /// All taxonomy members, in declaration order
    pub const ALL: [ErrorKind; 17] = [
        Self::NoPluginForFile,
        Self::CodecNotHandled,
        Self::PluginLoadFailure,
        Self::FileGeneric,
        Self::FilePermission,
        Self::FileEncrypted,
        Self::FileNotFound,
        Self::EmptyFile,
        Self::ReadError,
        Self::DvdEncrypted,
        Self::InvalidDevice,
        Self::UnknownHost,
        Self::NetworkUnreachable,
        Self::ConnectionRefused,
        Self::InvalidLocation,
        Self::CannotCapture,
        Self::Generic,
    ];

    /// Returns a short message suitable for display in the UI
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::NoPluginForFile => "No plugin is available to play this file.",
            Self::CodecNotHandled => "The media uses a format that cannot be decoded.",
            Self::PluginLoadFailure => "A required playback plugin failed to load.",
            Self::FileGeneric => "The file could not be opened.",
            Self::FilePermission => "You do not have permission to open this file.",
            Self::FileEncrypted => "This file is encrypted and cannot be played back.",
            Self::FileNotFound => "Location not found.",
            Self::EmptyFile => "The file you tried to play is an empty file.",
            Self::ReadError => "There was an error reading from the media.",
            Self::DvdEncrypted => "The source seems encrypted and cannot be read.",
            Self::InvalidDevice => "The device could not be read. It may be missing or unsupported.",
            Self::UnknownHost => "The server you are trying to connect to is not known.",
            Self::NetworkUnreachable => "The network is unreachable.",
            Self::ConnectionRefused => "The server refused the connection.",
            Self::InvalidLocation => "This location is not a valid one.",
            Self::CannotCapture => "The current frame could not be captured.",
            Self::Generic => "An error occurred during playback.",
        }
    }

    /// Returns true for kinds caused by the network rather than the media itself
    pub fn is_network(&self) -> bool {
        matches!(
            self,
            Self::UnknownHost
                | Self::NetworkUnreachable
                | Self::ConnectionRefused
                | Self::InvalidLocation
        )
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::NoPluginForFile => "no plugin for file",
            Self::CodecNotHandled => "codec not handled",
            Self::PluginLoadFailure => "plugin load failure",
            Self::FileGeneric => "file error",
            Self::FilePermission => "file permission",
            Self::FileEncrypted => "file encrypted",
            Self::FileNotFound => "file not found",
            Self::EmptyFile => "empty file",
            Self::ReadError => "read error",
            Self::DvdEncrypted => "dvd encrypted",
            Self::InvalidDevice => "invalid device",
            Self::UnknownHost => "unknown host",
            Self::NetworkUnreachable => "network unreachable",
            Self::ConnectionRefused => "connection refused",
            Self::InvalidLocation => "invalid location",
            Self::CannotCapture => "cannot capture",
            Self::Generic => "generic error",
        };
        f.write_str(name)
    }
}

/// A single surfaced playback failure
///
/// Immutable once constructed. A fatal record means the engine was already forced to its
/// lowest state and a fresh `open` is required.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    kind: ErrorKind,
    message: String,
    fatal: bool,
}

impl ErrorRecord {
    pub fn new(kind: ErrorKind, message: impl Into<String>, fatal: bool) -> Self {
        Self {
            kind,
            message: message.into(),
            fatal,
        }
    }

    /// Creates a fatal record using the kind's default user message
    pub fn fatal(kind: ErrorKind) -> Self {
        Self::new(kind, kind.user_message(), true)
    }

    /// Creates a non-fatal record using the kind's default user message
    pub fn recoverable(kind: ErrorKind) -> Self {
        Self::new(kind, kind.user_message(), false)
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn is_fatal(&self) -> bool {
        self.fatal
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}{}: {}",
            self.kind,
            if self.fatal { " (fatal)" } else { "" },
            self.message
        )
    }
}

/// Validation errors for core domain types
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Media resource locator rejected
    #[error("Invalid MRL '{mrl}': {reason}")]
    InvalidMrl { mrl: String, reason: String },

    /// Playback rate rejected
    #[error("Invalid playback rate {rate}: {reason}")]
    InvalidRate { rate: f64, reason: String },
}

/// Convenience type alias for Results using CoreError
pub type Result<T> = std::result::Result<T, CoreError>;
