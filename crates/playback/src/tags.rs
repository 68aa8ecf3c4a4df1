// FILE: crates/playback/src/tags.rs

//! Stream tag aggregation
//!
//! Tag payloads may be produced on engine threads. They are pushed into a
//! [`TagInbox`], which schedules a single wake-up of the control thread no matter
//! how many payloads pile up, and are merged there by the [`TagAggregator`].

use crate::engine::EngineHandle;
use crate::session::SessionToken;
use cadence_core::{keys, CoverImage, StreamKind, TagList};
use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

/// A tag payload waiting to be merged on the control thread
#[derive(Debug, Clone, PartialEq)]
pub struct PendingTags {
    pub session_id: u64,
    pub kind: StreamKind,
    pub index: usize,
    pub tags: TagList,
}

#[derive(Debug)]
struct InboxShared {
    queue: Mutex<Vec<PendingTags>>,
    session: Mutex<Option<SessionToken>>,
    /// Set while a wake-up is queued and the queue has not been drained yet
    scheduled: AtomicBool,
    wake: Sender<()>,
}

/// Thread-safe entry point for tag payloads
#[derive(Debug, Clone)]
pub struct TagInbox {
    shared: Arc<InboxShared>,
}

impl TagInbox {
    /// Creates the inbox and the receiver the control thread waits on
    pub(crate) fn new() -> (Self, Receiver<()>) {
        let (wake, woken) = bounded(1);
        let inbox = Self {
            shared: Arc::new(InboxShared {
                queue: Mutex::new(Vec::new()),
                session: Mutex::new(None),
                scheduled: AtomicBool::new(false),
                wake,
            }),
        };
        (inbox, woken)
    }

    fn queue(&self) -> MutexGuard<'_, Vec<PendingTags>> {
        self.shared.queue.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn session(&self) -> MutexGuard<'_, Option<SessionToken>> {
        self.shared
            .session
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Queues tags for stream `index` of `kind`
    ///
    /// Returns false if no session is open, in which case the payload is dropped.
    pub fn push(&self, kind: StreamKind, index: usize, tags: TagList) -> bool {
        let session_id = match self.session().as_ref() {
            Some(token) if !token.is_cancelled() => token.id(),
            _ => {
                log::trace!("Dropping {} tags for stream {}: no open session", kind, index);
                return false;
            }
        };

        self.queue().push(PendingTags {
            session_id,
            kind,
            index,
            tags,
        });

        if !self.shared.scheduled.swap(true, Ordering::AcqRel) {
            match self.shared.wake.try_send(()) {
                Ok(()) | Err(TrySendError::Full(())) => {}
                Err(TrySendError::Disconnected(())) => {
                    log::debug!("Tag inbox receiver is gone");
                }
            }
        }
        true
    }

    /// Takes every queued payload that belongs to the current session
    pub(crate) fn drain(&self) -> Vec<PendingTags> {
        self.shared.scheduled.store(false, Ordering::Release);
        let drained = std::mem::take(&mut *self.queue());

        let current = self.session().clone();
        drained
            .into_iter()
            .filter(|p| current.as_ref().is_some_and(|t| t.is_current(p.session_id)))
            .collect()
    }

    pub(crate) fn activate(&self, token: SessionToken) {
        *self.session() = Some(token);
    }

    pub(crate) fn deactivate(&self) {
        *self.session() = None;
        self.queue().clear();
    }

    pub fn len(&self) -> usize {
        self.queue().len()
    }

    pub fn is_empty(&self) -> bool {
        self.queue().is_empty()
    }
}

/// Per-stream tags and their merged view
#[derive(Debug, Default)]
pub struct TagAggregator {
    video: TagList,
    audio: TagList,
    text: TagList,
    aggregate: TagList,
    /// Result of the first cover lookup; outer `None` until then
    cover: Option<Option<CoverImage>>,
}

impl TagAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merges tags for stream `index` of `kind`
    ///
    /// Tags for a stream that is not the currently selected one are discarded.
    /// Returns true if the snapshot changed.
    pub fn apply(
        &mut self,
        engine: &EngineHandle,
        kind: StreamKind,
        index: usize,
        tags: &TagList,
    ) -> bool {
        if engine.current_stream(kind) != Some(index) {
            log::debug!("Ignoring tags for deselected {} stream {}", kind, index);
            return false;
        }
        if tags.is_empty() {
            return false;
        }

        self.stream_mut(kind).merge_from(tags);
        self.rebuild();
        log::debug!("Merged {} {} tags from stream {}", tags.len(), kind, index);
        true
    }

    fn stream_mut(&mut self, kind: StreamKind) -> &mut TagList {
        match kind {
            StreamKind::Video => &mut self.video,
            StreamKind::Audio => &mut self.audio,
            StreamKind::Text => &mut self.text,
        }
    }

    fn rebuild(&mut self) {
        let mut aggregate = TagList::new();
        for kind in StreamKind::ALL {
            aggregate.merge_from(self.stream(kind));
        }
        self.aggregate = aggregate;
    }

    /// Tags of the selected stream of `kind`
    pub fn stream(&self, kind: StreamKind) -> &TagList {
        match kind {
            StreamKind::Video => &self.video,
            StreamKind::Audio => &self.audio,
            StreamKind::Text => &self.text,
        }
    }

    pub fn aggregate(&self) -> &TagList {
        &self.aggregate
    }

    /// The cover image, looked up on first request
    ///
    /// The result of that lookup, found or not, is kept until [`clear`](Self::clear);
    /// tags that arrive later never replace it.
    pub fn cover_image(&mut self) -> Option<&CoverImage> {
        let aggregate = &self.aggregate;
        self.cover
            .get_or_insert_with(|| {
                [keys::IMAGE, keys::PREVIEW_IMAGE]
                    .iter()
                    .find_map(|key| aggregate.get(key).and_then(|v| v.as_image()))
                    .cloned()
            })
            .as_ref()
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}
