// FILE: crates/playback/src/events.rs

//! Public events emitted by the controller

use crate::sideflow::{CancelReason, SideFlowRequest, SideFlowToken};
use cadence_core::ErrorRecord;
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// A failure, surfaced exactly once
    Error(ErrorRecord),
    /// Playback reached the end of the media
    Eos,
    /// Tags or stream information changed
    MetadataChanged,
    Tick {
        position: Duration,
        duration: Duration,
        /// Position as a fraction of the duration
        percent: f64,
        seekable: bool,
    },
    /// Stream buffering progress, 0-100
    Buffering(u8),
    /// Download buffering fill ratio, 0.0-1.0
    DownloadBuffering(f64),
    /// The host must answer a side-flow
    SideFlowRequested {
        token: SideFlowToken,
        request: SideFlowRequest,
    },
    SideFlowCancelled {
        token: SideFlowToken,
        reason: CancelReason,
    },
}

/// Fans events out to every live subscriber
#[derive(Debug, Default)]
pub(crate) struct EventBroadcaster {
    subscribers: Vec<Sender<PlayerEvent>>,
}

impl EventBroadcaster {
    pub(crate) fn subscribe(&mut self) -> Receiver<PlayerEvent> {
        let (tx, rx) = unbounded();
        self.subscribers.push(tx);
        rx
    }

    pub(crate) fn emit(&mut self, event: PlayerEvent) {
        log::trace!("event: {:?}", event);
        self.subscribers
            .retain(|subscriber| subscriber.send(event.clone()).is_ok());
    }

    #[cfg(test)]
    pub(crate) fn subscriber_count(&self) -> usize {
        self.subscribers.len()
    }
}
