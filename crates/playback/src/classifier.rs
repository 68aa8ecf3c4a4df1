// FILE: crates/playback/src/classifier.rs

//! Engine error classification
//!
//! Recoverable conditions are routed to a side-flow by [`triage`]; everything
//! else is mapped onto the closed [`ErrorKind`] taxonomy by [`classify`].

use crate::message::{CoreCode, EngineErrorMessage, ErrorCode, ResourceCode, StreamCode};
use crate::session::MissingPlugin;
use cadence_core::{ErrorKind, ErrorRecord, Mrl};

/// What the controller knows when an engine error arrives
#[derive(Debug, Clone, Copy)]
pub struct ClassifierContext<'a> {
    pub mrl: &'a Mrl,
    /// A user is around to answer prompts such as mounting a volume
    pub interactive: bool,
    pub source_supports_credentials: bool,
    /// Missing-plugin notices collected for this session
    pub missing_plugins: &'a [MissingPlugin],
}

/// Where an engine error should go
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Triage {
    /// The location needs mounting first
    Mount,
    /// The source wants credentials
    Auth,
    /// Offer to install the missing plugins
    MissingPlugins,
    Report(ErrorRecord),
}

/// Decides whether a side-flow can resolve `err`; first match wins
pub fn triage(err: &EngineErrorMessage, ctx: &ClassifierContext<'_>) -> Triage {
    if err.code == ErrorCode::Resource(ResourceCode::NotMounted) && ctx.interactive {
        return Triage::Mount;
    }
    if err.http_status() == Some(401) && ctx.source_supports_credentials {
        return Triage::Auth;
    }
    if err.code.is_missing_codec() && !ctx.missing_plugins.is_empty() {
        return Triage::MissingPlugins;
    }
    Triage::Report(classify(err, ctx))
}

/// Maps an engine error to a fatal [`ErrorRecord`]
pub fn classify(err: &EngineErrorMessage, ctx: &ClassifierContext<'_>) -> ErrorRecord {
    let (kind, message) = map(err, ctx);
    log::debug!("Classified {} as {:?}", err, kind);
    match message {
        Some(message) => ErrorRecord::new(kind, message, true),
        None => ErrorRecord::fatal(kind),
    }
}

fn map(err: &EngineErrorMessage, ctx: &ClassifierContext<'_>) -> (ErrorKind, Option<String>) {
    if ctx.mrl.is_disc() {
        match err.code {
            ErrorCode::Stream(StreamCode::Decrypt | StreamCode::DecryptNoKey) => {
                return (ErrorKind::DvdEncrypted, None)
            }
            ErrorCode::Resource(_) => return (ErrorKind::InvalidDevice, None),
            _ => {}
        }
    }

    match err.http_status() {
        Some(401) | Some(403) => return (ErrorKind::FilePermission, None),
        Some(404) => return (ErrorKind::FileNotFound, None),
        _ => {}
    }

    match err.code {
        ErrorCode::Resource(code) => map_resource(code, err),
        ErrorCode::Stream(code) => map_stream(code, ctx),
        ErrorCode::Core(CoreCode::MissingPlugin) => (ErrorKind::NoPluginForFile, None),
        ErrorCode::Core(_) => (ErrorKind::Generic, Some(err.message.clone())),
        ErrorCode::Library(_) => (ErrorKind::PluginLoadFailure, Some(err.message.clone())),
    }
}

fn map_resource(code: ResourceCode, err: &EngineErrorMessage) -> (ErrorKind, Option<String>) {
    let kind = match code {
        ResourceCode::NotFound => ErrorKind::FileNotFound,
        ResourceCode::OpenRead | ResourceCode::NotAuthorized => ErrorKind::FilePermission,
        ResourceCode::Read | ResourceCode::Seek => ErrorKind::ReadError,
        ResourceCode::HostNotFound => ErrorKind::UnknownHost,
        ResourceCode::NetworkUnreachable => ErrorKind::NetworkUnreachable,
        ResourceCode::ConnectionRefused => ErrorKind::ConnectionRefused,
        ResourceCode::InvalidLocation => ErrorKind::InvalidLocation,
        ResourceCode::Busy => ErrorKind::InvalidDevice,
        ResourceCode::NotMounted | ResourceCode::Settings | ResourceCode::Failed => {
            return (ErrorKind::FileGeneric, Some(err.message.clone()))
        }
    };
    (kind, None)
}

fn map_stream(code: StreamCode, ctx: &ClassifierContext<'_>) -> (ErrorKind, Option<String>) {
    match code {
        StreamCode::TypeNotFound => (ErrorKind::NoPluginForFile, None),
        StreamCode::CodecNotFound | StreamCode::WrongType | StreamCode::NotImplemented => {
            if ctx.missing_plugins.is_empty() {
                (ErrorKind::CodecNotHandled, None)
            } else {
                let names: Vec<&str> = ctx
                    .missing_plugins
                    .iter()
                    .map(|p| p.description.as_str())
                    .collect();
                (
                    ErrorKind::CodecNotHandled,
                    Some(format!(
                        "The playback of this media requires {} which is not installed.",
                        names.join(", ")
                    )),
                )
            }
        }
        StreamCode::Decrypt | StreamCode::DecryptNoKey => (ErrorKind::FileEncrypted, None),
        StreamCode::Decode | StreamCode::Demux | StreamCode::Format | StreamCode::Failed => {
            (ErrorKind::Generic, None)
        }
    }
}
