// FILE: crates/playback/src/message.rs

//! Status messages pushed by the engine on its bus

use cadence_core::{EngineState, StreamKind};
use std::fmt;
use std::path::PathBuf;

/// One asynchronous notification from the engine, delivered in emission order
#[derive(Debug, Clone, PartialEq)]
pub enum BusMessage {
    /// Pipeline-level lifecycle transition
    StateChanged {
        old: EngineState,
        new: EngineState,
        pending: Option<EngineState>,
    },
    Error(EngineErrorMessage),
    Eos,
    Buffering {
        percent: u8,
        mode: BufferingMode,
    },
    DurationChanged,
    /// Tags of stream `index` of `kind` changed; the payload is fetched from the engine
    TagsChanged {
        kind: StreamKind,
        index: usize,
    },
    /// An asynchronous state change or seek has completed
    AsyncDone,
    Element(ElementMessage),
}

/// How the engine is buffering, as reported with each buffering message
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BufferingMode {
    Stream,
    Download,
    Timeshift,
    Live,
}

/// Element messages the controller understands
#[derive(Debug, Clone, PartialEq)]
pub enum ElementMessage {
    /// A decoder or demuxer is missing
    MissingPlugin { detail: String, description: String },
    /// The source asks to be re-opened at another location
    Redirect { location: String },
    /// Local file the download buffer is written to
    DownloadFile { path: PathBuf },
    Other(String),
}

/// Broad origin of an engine error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorDomain {
    Core,
    Library,
    Resource,
    Stream,
}

impl fmt::Display for ErrorDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Core => write!(f, "core"),
            Self::Library => write!(f, "library"),
            Self::Resource => write!(f, "resource"),
            Self::Stream => write!(f, "stream"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CoreCode {
    MissingPlugin,
    Negotiation,
    StateChange,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LibraryCode {
    Init,
    Settings,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ResourceCode {
    NotFound,
    OpenRead,
    Read,
    Seek,
    Busy,
    NotAuthorized,
    /// The location lives on a volume that is not mounted yet
    NotMounted,
    HostNotFound,
    NetworkUnreachable,
    ConnectionRefused,
    InvalidLocation,
    Settings,
    Failed,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamCode {
    TypeNotFound,
    CodecNotFound,
    WrongType,
    NotImplemented,
    Decode,
    Demux,
    Format,
    Decrypt,
    DecryptNoKey,
    Failed,
}

/// Error code, grouped by domain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    Core(CoreCode),
    Library(LibraryCode),
    Resource(ResourceCode),
    Stream(StreamCode),
}

impl ErrorCode {
    pub fn domain(&self) -> ErrorDomain {
        match self {
            Self::Core(_) => ErrorDomain::Core,
            Self::Library(_) => ErrorDomain::Library,
            Self::Resource(_) => ErrorDomain::Resource,
            Self::Stream(_) => ErrorDomain::Stream,
        }
    }

    /// Errors caused by a decoder or demuxer that is not available
    pub fn is_missing_codec(&self) -> bool {
        matches!(
            self,
            Self::Core(CoreCode::MissingPlugin)
                | Self::Stream(
                    StreamCode::CodecNotFound
                        | StreamCode::WrongType
                        | StreamCode::NotImplemented
                        | StreamCode::TypeNotFound
                )
        )
    }
}

/// A structured error reported by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct EngineErrorMessage {
    pub code: ErrorCode,
    pub message: String,
    /// Free-form diagnostic text
    pub debug: Option<String>,
    /// HTTP status of the failed request, when the source knows it
    pub http_status: Option<u16>,
}

impl EngineErrorMessage {
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            debug: None,
            http_status: None,
        }
    }

    pub fn with_debug(mut self, debug: impl Into<String>) -> Self {
        self.debug = Some(debug.into());
        self
    }

    pub fn with_http_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    pub fn domain(&self) -> ErrorDomain {
        self.code.domain()
    }

    /// HTTP status from the structured field, falling back to the diagnostic text
    pub fn http_status(&self) -> Option<u16> {
        self.http_status
            .or_else(|| self.debug.as_deref().and_then(parse_http_status))
    }
}

impl fmt::Display for EngineErrorMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} error {:?}: {}", self.domain(), self.code, self.message)
    }
}

const KNOWN_HTTP_STATUSES: [u16; 3] = [401, 403, 404];

/// Finds a known HTTP status code as a standalone number in diagnostic text
fn parse_http_status(text: &str) -> Option<u16> {
    text.split(|c: char| !c.is_ascii_digit())
        .filter(|token| token.len() == 3)
        .filter_map(|token| token.parse::<u16>().ok())
        .find(|status| KNOWN_HTTP_STATUSES.contains(status))
}
