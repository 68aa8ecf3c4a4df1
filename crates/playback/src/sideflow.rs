// FILE: crates/playback/src/sideflow.rs

//! Out-of-band decisions that suspend playback
//!
//! A side-flow asks the host something the core cannot decide on its own:
//! whether to install missing plugins, mount a location, or supply credentials.
//! At most one flow per kind is outstanding; the answer arrives later, either on
//! the control thread or from any thread through a [`SideFlowResponder`].

use crate::engine::Credentials;
use crate::error::{PlaybackError, PlaybackResult};
use cadence_core::{ErrorRecord, TargetState};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SideFlowKind {
    MissingPlugin,
    Mount,
    Auth,
}

impl fmt::Display for SideFlowKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingPlugin => write!(f, "missing-plugin"),
            Self::Mount => write!(f, "mount"),
            Self::Auth => write!(f, "auth"),
        }
    }
}

/// What the host is asked to decide
#[derive(Debug, Clone, PartialEq)]
pub enum SideFlowRequest {
    /// Offer to install plugins; `was_prerolled` is true if the media played without them
    MissingPlugin {
        details: Vec<String>,
        descriptions: Vec<String>,
        was_prerolled: bool,
    },
    /// Mount the volume holding `location`, then resume towards `restore_state`
    Mount {
        location: String,
        restore_state: TargetState,
    },
    /// Ask for credentials for the source
    Auth { context: String },
}

impl SideFlowRequest {
    pub fn kind(&self) -> SideFlowKind {
        match self {
            Self::MissingPlugin { .. } => SideFlowKind::MissingPlugin,
            Self::Mount { .. } => SideFlowKind::Mount,
            Self::Auth { .. } => SideFlowKind::Auth,
        }
    }
}

/// Handle to one outstanding side-flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SideFlowToken {
    id: u64,
    kind: SideFlowKind,
    session_id: u64,
}

impl SideFlowToken {
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn kind(&self) -> SideFlowKind {
        self.kind
    }

    pub fn session_id(&self) -> u64 {
        self.session_id
    }
}

/// The host's answer
#[derive(Debug, Clone, PartialEq)]
pub enum SideFlowOutcome {
    /// Plugin installation is under way
    Accepted,
    Declined,
    /// The volume was mounted; `location` replaces the original one if set
    Mounted { location: Option<String> },
    MountFailed(String),
    Credentials(Credentials),
}

impl SideFlowOutcome {
    fn fits(&self, kind: SideFlowKind) -> bool {
        matches!(
            (self, kind),
            (Self::Declined, _)
                | (Self::Accepted, SideFlowKind::MissingPlugin)
                | (Self::Mounted { .. } | Self::MountFailed(_), SideFlowKind::Mount)
                | (Self::Credentials(_), SideFlowKind::Auth)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CancelReason {
    /// Cancelled through the public API
    Caller,
    /// A new flow of the same kind replaced it
    Superseded,
    SessionClosed,
}

/// A finished side-flow, handed back to the controller
#[derive(Debug, Clone, PartialEq)]
pub enum SideFlowCompletion {
    Resolved {
        token: SideFlowToken,
        request: SideFlowRequest,
        outcome: SideFlowOutcome,
        /// The error the flow was started to avoid
        suspended_error: Option<ErrorRecord>,
    },
    Cancelled {
        token: SideFlowToken,
        request: SideFlowRequest,
        reason: CancelReason,
        suspended_error: Option<ErrorRecord>,
    },
}

impl SideFlowCompletion {
    pub fn token(&self) -> SideFlowToken {
        match self {
            Self::Resolved { token, .. } | Self::Cancelled { token, .. } => *token,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ReplyAction {
    Resolve(SideFlowOutcome),
    Cancel,
}

/// An answer delivered through a [`SideFlowResponder`]
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct SideFlowReply {
    pub token: SideFlowToken,
    pub action: ReplyAction,
}

/// Cloneable, thread-safe way to answer side-flows
#[derive(Debug, Clone)]
pub struct SideFlowResponder {
    replies: Sender<SideFlowReply>,
}

impl SideFlowResponder {
    pub fn resolve(&self, token: SideFlowToken, outcome: SideFlowOutcome) -> PlaybackResult<()> {
        self.send(SideFlowReply {
            token,
            action: ReplyAction::Resolve(outcome),
        })
    }

    pub fn cancel(&self, token: SideFlowToken) -> PlaybackResult<()> {
        self.send(SideFlowReply {
            token,
            action: ReplyAction::Cancel,
        })
    }

    fn send(&self, reply: SideFlowReply) -> PlaybackResult<()> {
        self.replies
            .send(reply)
            .map_err(|_| PlaybackError::ControllerGone)
    }
}

#[derive(Debug)]
struct ActiveFlow {
    token: SideFlowToken,
    request: SideFlowRequest,
    suspended_error: Option<ErrorRecord>,
}

/// Tracks outstanding side-flows, one per kind
#[derive(Debug)]
pub struct SideFlowCoordinator {
    active: HashMap<SideFlowKind, ActiveFlow>,
    next_id: u64,
    reply_tx: Sender<SideFlowReply>,
    reply_rx: Receiver<SideFlowReply>,
}

impl Default for SideFlowCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl SideFlowCoordinator {
    pub fn new() -> Self {
        let (reply_tx, reply_rx) = unbounded();
        Self {
            active: HashMap::new(),
            next_id: 1,
            reply_tx,
            reply_rx,
        }
    }

    /// Starts a flow, superseding any outstanding flow of the same kind
    ///
    /// Returns the new token and the completion of the superseded flow, if any.
    pub fn start(
        &mut self,
        session_id: u64,
        request: SideFlowRequest,
        suspended_error: Option<ErrorRecord>,
    ) -> (SideFlowToken, Option<SideFlowCompletion>) {
        let kind = request.kind();
        let superseded = self
            .active
            .get(&kind)
            .map(|flow| flow.token)
            .and_then(|old| self.cancel(old, CancelReason::Superseded));

        let token = SideFlowToken {
            id: self.next_id,
            kind,
            session_id,
        };
        self.next_id += 1;

        log::info!("Starting {} side-flow #{}", kind, token.id);
        self.active.insert(
            kind,
            ActiveFlow {
                token,
                request,
                suspended_error,
            },
        );
        (token, superseded)
    }

    /// Completes the flow named by `token`
    ///
    /// Returns `None` if the token is not outstanding. An outcome that does not fit
    /// the flow's kind counts as a decline.
    pub fn resolve(
        &mut self,
        token: SideFlowToken,
        outcome: SideFlowOutcome,
    ) -> Option<SideFlowCompletion> {
        let flow = self.take(token)?;
        let outcome = if outcome.fits(token.kind) {
            outcome
        } else {
            log::warn!(
                "Side-flow #{} ({}) got an unrelated answer, treating it as declined",
                token.id,
                token.kind
            );
            SideFlowOutcome::Declined
        };

        log::info!("Side-flow #{} ({}) resolved", token.id, token.kind);
        Some(SideFlowCompletion::Resolved {
            token,
            request: flow.request,
            outcome,
            suspended_error: flow.suspended_error,
        })
    }

    /// Cancels the flow named by `token`; a no-op for stale tokens
    pub fn cancel(
        &mut self,
        token: SideFlowToken,
        reason: CancelReason,
    ) -> Option<SideFlowCompletion> {
        let flow = self.take(token)?;
        log::info!(
            "Side-flow #{} ({}) cancelled: {:?}",
            token.id,
            token.kind,
            reason
        );
        Some(SideFlowCompletion::Cancelled {
            token,
            request: flow.request,
            reason,
            suspended_error: flow.suspended_error,
        })
    }

    pub fn cancel_all(&mut self, reason: CancelReason) -> Vec<SideFlowCompletion> {
        let mut tokens: Vec<SideFlowToken> = self.active.values().map(|f| f.token).collect();
        tokens.sort_by_key(|t| t.id);
        tokens
            .into_iter()
            .filter_map(|token| self.cancel(token, reason))
            .collect()
    }

    fn take(&mut self, token: SideFlowToken) -> Option<ActiveFlow> {
        match self.active.get(&token.kind) {
            Some(flow) if flow.token == token => self.active.remove(&token.kind),
            _ => {
                log::debug!("Side-flow #{} is no longer outstanding", token.id);
                None
            }
        }
    }

    pub fn is_active(&self, kind: SideFlowKind) -> bool {
        self.active.contains_key(&kind)
    }

    pub fn any_active(&self) -> bool {
        !self.active.is_empty()
    }

    pub fn active_token(&self, kind: SideFlowKind) -> Option<SideFlowToken> {
        self.active.get(&kind).map(|f| f.token)
    }

    pub fn responder(&self) -> SideFlowResponder {
        SideFlowResponder {
            replies: self.reply_tx.clone(),
        }
    }

    pub(crate) fn replies(&self) -> &Receiver<SideFlowReply> {
        &self.reply_rx
    }

    /// Applies a reply received from a responder
    pub(crate) fn handle_reply(&mut self, reply: SideFlowReply) -> Option<SideFlowCompletion> {
        match reply.action {
            ReplyAction::Resolve(outcome) => self.resolve(reply.token, outcome),
            ReplyAction::Cancel => self.cancel(reply.token, CancelReason::Caller),
        }
    }
}
