// FILE: crates/playback/src/controller.rs

//! The playback lifecycle controller
//!
//! [`LifecycleController`] owns the open [`MediaSession`] and is the only consumer
//! of the engine's bus. Public calls record the caller's target state; bus
//! messages, tag wake-ups, side-flow replies and timers move the engine towards it.

use crate::buffering::{BufferingOutcome, BufferingPolicy, BufferingState};
use crate::classifier::{self, ClassifierContext, Triage};
use crate::engine::{
    Credentials, EngineHandle, EngineProperty, Pipeline, StateChangeOutcome, StreamInfo,
};
use crate::error::{PlaybackError, PlaybackResult};
use crate::events::{EventBroadcaster, PlayerEvent};
use crate::message::{BufferingMode, BusMessage, ElementMessage, EngineErrorMessage};
use crate::metadata::{self, MetadataKey, MetadataValue};
use crate::seek::{SeekCoordinator, SeekDone, SeekOutcome};
use crate::session::{MediaSession, MissingPlugin, SessionToken};
use crate::sideflow::{
    CancelReason, SideFlowCompletion, SideFlowCoordinator, SideFlowOutcome, SideFlowReply,
    SideFlowRequest, SideFlowResponder, SideFlowToken,
};
use crate::tags::{TagAggregator, TagInbox};
use cadence_config::Config;
use cadence_core::{
    CoverImage, EngineState, ErrorKind, ErrorRecord, LifecycleState, Mrl, PlaybackRate, Seekable,
    TargetState,
};
use crossbeam_channel::{select, Receiver, TryRecvError};
use std::time::{Duration, Instant};

/// Upper bound for the synchronous waits on shutdown and subtitle reload
const STATE_WAIT_TIMEOUT: Duration = Duration::from_secs(5);

pub struct LifecycleController {
    engine: EngineHandle,
    config: Config,
    session: Option<MediaSession>,
    next_session_id: u64,
    seek: SeekCoordinator,
    buffering: BufferingPolicy,
    tags: TagAggregator,
    inbox: TagInbox,
    inbox_wake: Receiver<()>,
    side_flows: SideFlowCoordinator,
    events: EventBroadcaster,
    interactive: bool,
    next_tick: Option<Instant>,
}

impl LifecycleController {
    /// Creates a controller driving `pipeline`, whose status messages arrive on `bus`
    pub fn new(pipeline: Box<dyn Pipeline>, bus: Receiver<BusMessage>, config: Config) -> Self {
        if let Err(errors) = config.validate() {
            for error in &errors {
                log::warn!("Config: {}", error);
            }
        }

        let (inbox, inbox_wake) = TagInbox::new();
        Self {
            engine: EngineHandle::new(pipeline, bus),
            seek: SeekCoordinator::new(config.playback.seek_timeout()),
            buffering: BufferingPolicy::new(&config.playback),
            config,
            session: None,
            next_session_id: 0,
            tags: TagAggregator::new(),
            inbox,
            inbox_wake,
            side_flows: SideFlowCoordinator::new(),
            events: EventBroadcaster::default(),
            interactive: true,
            next_tick: None,
        }
    }

    /// Returns a receiver for every event emitted from now on
    pub fn subscribe(&mut self) -> Receiver<PlayerEvent> {
        self.events.subscribe()
    }

    /// Whether a user can answer prompts; mount side-flows are only offered if so
    pub fn set_interactive(&mut self, interactive: bool) {
        self.interactive = interactive;
    }

    pub fn is_interactive(&self) -> bool {
        self.interactive
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    // ===== Lifecycle =====

    /// Opens `mrl`, closing any open session first
    ///
    /// The engine is asked to preroll to PAUSED; playback starts once [`play`](Self::play)
    /// is called.
    pub fn open(&mut self, mrl: &str) -> PlaybackResult<()> {
        let mrl = Mrl::parse(mrl)?;
        if self.session.is_some() {
            self.close();
        }
        self.reset_components();

        self.next_session_id += 1;
        let token = SessionToken::new(self.next_session_id);
        self.inbox.activate(token.clone());

        self.apply_network_properties(&mrl);
        self.engine.set_property(EngineProperty::Uri(mrl.to_string()));

        let mut session = MediaSession::new(mrl, token);
        match self.engine.set_state(EngineState::Paused) {
            StateChangeOutcome::NoPreroll => {
                log::info!("{} is a live source", session.mrl);
                session.is_live = true;
                session.seekable = Seekable::No;
            }
            StateChangeOutcome::Failure => {
                log::debug!("Opening {} failed, waiting for the engine's error", session.mrl);
            }
            StateChangeOutcome::Success | StateChangeOutcome::Async => {}
        }

        log::info!("Opened {} (session {})", session.mrl, session.token.id());
        self.session = Some(session);
        Ok(())
    }

    fn apply_network_properties(&mut self, mrl: &Mrl) {
        let network = &self.config.network;
        if let Some(agent) = &network.user_agent {
            self.engine.set_property(EngineProperty::UserAgent(agent.clone()));
        }
        if let Some(referrer) = &network.referrer {
            self.engine.set_property(EngineProperty::Referrer(referrer.clone()));
        }
        if network.connection_speed_kbps > 0 {
            self.engine
                .set_property(EngineProperty::ConnectionSpeed(network.connection_speed_kbps));
        }
        let download = self.config.playback.download_buffering && mrl.is_network();
        self.engine
            .set_property(EngineProperty::DownloadBuffering(download));
    }

    /// Asks for playback; deferred while buffering, a side-flow or a direction change is pending
    pub fn play(&mut self) -> PlaybackResult<()> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoSession)?;
        if session.failed {
            return Err(PlaybackError::SessionFailed);
        }
        if session.target_state == TargetState::Stopped {
            session.eos_emitted = false;
        }
        session.target_state = TargetState::Playing;
        self.start_playback();
        Ok(())
    }

    /// Pauses playback; live and unseekable sources are stopped instead
    pub fn pause(&mut self) -> PlaybackResult<()> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoSession)?;
        if session.failed {
            return Err(PlaybackError::SessionFailed);
        }
        if session.is_live || session.seekable == Seekable::No {
            log::debug!("Pausing {} stops it: the source cannot pause", session.mrl);
            return self.stop();
        }

        session.target_state = TargetState::Paused;
        if self.engine.requested_state() != EngineState::Paused {
            self.engine.set_state(EngineState::Paused);
        }
        Ok(())
    }

    /// Stops playback and brings the engine to its lowest state
    pub fn stop(&mut self) -> PlaybackResult<()> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoSession)?;
        session.target_state = TargetState::Stopped;

        self.shutdown_engine();

        if let Some(session) = self.session.as_mut() {
            session.engine_state = EngineState::Null;
            session.prerolled = false;
            session.direction_pending = false;
            session.position = Duration::ZERO;
        }
        self.seek.clear();
        self.buffering.reset();
        self.next_tick = None;
        Ok(())
    }

    /// Closes the session, cancelling every outstanding side-flow
    pub fn close(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };

        session.token.cancel();
        self.inbox.deactivate();
        if session.subtitle_uri.is_some() {
            self.engine.set_property(EngineProperty::SubtitleUri(None));
        }
        self.shutdown_engine();

        while self.inbox_wake.try_recv().is_ok() {}
        let stale_replies = self.side_flows.replies().try_iter().count();
        if stale_replies > 0 {
            log::debug!("Discarded {} side-flow replies on close", stale_replies);
        }

        for completion in self.side_flows.cancel_all(CancelReason::SessionClosed) {
            if let SideFlowCompletion::Cancelled { token, reason, .. } = completion {
                self.events
                    .emit(PlayerEvent::SideFlowCancelled { token, reason });
            }
        }

        self.reset_components();
        log::info!("Closed {}", session.mrl);
    }

    /// Moves the engine to NULL and discards whatever it still had queued
    fn shutdown_engine(&mut self) {
        if self.engine.set_state(EngineState::Null) == StateChangeOutcome::Async {
            self.engine.await_state_change(STATE_WAIT_TIMEOUT);
        }
        let stale = self.engine.bus().try_iter().count();
        if stale > 0 {
            log::debug!("Discarded {} stale bus messages", stale);
        }
    }

    fn reset_components(&mut self) {
        self.seek.clear();
        self.buffering.reset();
        self.tags.clear();
        self.next_tick = None;
    }

    /// Commands PLAYING if the caller wants it and nothing holds playback back
    fn start_playback(&mut self) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.target_state != TargetState::Playing || session.failed {
            return;
        }
        if self.engine.requested_state() == EngineState::Playing {
            return;
        }
        if self.buffering.is_blocking_playback() {
            log::debug!("Play deferred: buffering");
            return;
        }
        if self.side_flows.any_active() {
            log::debug!("Play deferred: waiting for a side-flow");
            return;
        }
        if session.direction_pending {
            log::debug!("Play deferred: direction change not confirmed yet");
            return;
        }

        self.engine.set_state(EngineState::Playing);
    }

    // ===== Seeking and rate =====

    /// Seeks to `time`; a no-op on streams that cannot seek
    pub fn seek_time(&mut self, time: Duration, accurate: bool) -> PlaybackResult<()> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoSession)?;
        if session.failed {
            return Err(PlaybackError::SessionFailed);
        }
        if !session.seekable.allows_seek() {
            if !session.warned_unseekable {
                log::warn!("Ignoring seek: {} is not seekable", session.mrl);
                session.warned_unseekable = true;
            }
            return Ok(());
        }

        let outcome =
            self.seek
                .request_seek(&mut self.engine, session, time, accurate, Instant::now());
        let target = match outcome {
            SeekOutcome::Issued(target) | SeekOutcome::Queued(target) => target,
            SeekOutcome::Ignored => return Ok(()),
            SeekOutcome::Rejected(target) => {
                return Err(PlaybackError::command(
                    "seek",
                    format!("engine refused seek to {:?}", target),
                ))
            }
        };

        session.position = target;
        session.eos_emitted = false;
        let tick = PlayerEvent::Tick {
            position: target,
            duration: session.duration,
            percent: session.percent(),
            seekable: true,
        };
        self.events.emit(tick);
        Ok(())
    }

    /// Seeks to a fraction of the duration
    pub fn seek_percent(&mut self, percent: f64) -> PlaybackResult<()> {
        let session = self.session.as_ref().ok_or(PlaybackError::NoSession)?;
        if session.duration.is_zero() {
            log::debug!("Ignoring percent seek: duration unknown");
            return Ok(());
        }
        let time = session.duration.mul_f64(percent.clamp(0.0, 1.0));
        self.seek_time(time, false)
    }

    /// Sets the playback rate; a sign change reverses the direction and blocks until confirmed
    pub fn set_rate(&mut self, rate: f64) -> PlaybackResult<()> {
        let playback = &self.config.playback;
        let rate = PlaybackRate::with_bounds(rate, playback.min_rate, playback.max_rate)?;
        let timeout = playback.direction_change_timeout();

        let session = self.session.as_mut().ok_or(PlaybackError::NoSession)?;
        if session.failed {
            return Err(PlaybackError::SessionFailed);
        }
        self.seek
            .change_rate(&mut self.engine, session, rate, timeout, Instant::now())
    }

    /// Replaces the external subtitle file
    ///
    /// On a prerolled session the engine is cycled through READY so the new
    /// subtitles are picked up, then seeks back to where it was.
    pub fn set_subtitle_uri(&mut self, uri: Option<&str>) -> PlaybackResult<()> {
        let session = self.session.as_mut().ok_or(PlaybackError::NoSession)?;
        session.subtitle_uri = uri.map(str::to_string);
        let property = EngineProperty::SubtitleUri(session.subtitle_uri.clone());

        if !session.prerolled {
            self.engine.set_property(property);
            return Ok(());
        }

        let position = self.engine.position().unwrap_or(session.position);
        log::debug!("Reloading subtitles at {:?}", position);

        self.engine.set_state(EngineState::Ready);
        self.engine.await_state_change(STATE_WAIT_TIMEOUT);
        self.engine.set_property(property);
        self.engine.set_state(EngineState::Paused);
        self.engine.await_state_change(STATE_WAIT_TIMEOUT);

        let outcome =
            self.seek
                .request_seek(&mut self.engine, session, position, true, Instant::now());
        match outcome {
            SeekOutcome::Issued(target) | SeekOutcome::Queued(target) => {
                session.position = target;
            }
            SeekOutcome::Ignored | SeekOutcome::Rejected(_) => self.start_playback(),
        }
        Ok(())
    }

    // ===== Control loop =====

    /// Waits up to `timeout` for one input, handles it, then runs due timers
    pub fn iterate(&mut self, timeout: Duration) -> PlaybackResult<()> {
        let wait = self
            .next_deadline()
            .map(|at| at.saturating_duration_since(Instant::now()).min(timeout))
            .unwrap_or(timeout);

        let bus = self.engine.bus().clone();
        let wake = self.inbox_wake.clone();
        let replies = self.side_flows.replies().clone();

        select! {
            recv(bus) -> message => match message {
                Ok(message) => self.dispatch(message),
                Err(_) => return Err(PlaybackError::EngineDisconnected),
            },
            recv(wake) -> _ => self.drain_tags(),
            recv(replies) -> reply => {
                if let Ok(reply) = reply {
                    self.handle_reply(reply);
                }
            },
            default(wait) => {},
        }

        self.run_due_timers(Instant::now());
        Ok(())
    }

    /// Handles every input that is ready without blocking; returns the number of bus messages
    pub fn process_pending(&mut self) -> PlaybackResult<usize> {
        let mut handled = 0;
        loop {
            let mut progressed = false;

            match self.engine.bus().try_recv() {
                Ok(message) => {
                    self.dispatch(message);
                    handled += 1;
                    progressed = true;
                }
                Err(TryRecvError::Empty) => {}
                Err(TryRecvError::Disconnected) => return Err(PlaybackError::EngineDisconnected),
            }

            if self.inbox_wake.try_recv().is_ok() {
                self.drain_tags();
                progressed = true;
            }

            if let Ok(reply) = self.side_flows.replies().try_recv() {
                self.handle_reply(reply);
                progressed = true;
            }

            if !progressed {
                break;
            }
        }

        self.run_due_timers(Instant::now());
        Ok(handled)
    }

    /// Runs the download poll and tick timers that are due at `now`
    pub fn run_due_timers(&mut self, now: Instant) {
        if self.buffering.poll_due(now) {
            self.poll_download(now);
        }
        if self.next_tick.is_some_and(|at| now >= at) {
            self.tick(now);
        }
    }

    fn next_deadline(&self) -> Option<Instant> {
        match (self.buffering.next_poll(), self.next_tick) {
            (Some(a), Some(b)) => Some(a.min(b)),
            (a, b) => a.or(b),
        }
    }

    fn poll_download(&mut self, now: Instant) {
        let Some(session) = self.session.as_ref() else {
            self.buffering.reset();
            return;
        };
        let position = self.engine.position().unwrap_or(session.position);
        let duration = session.duration;

        if let Some(progress) = self.buffering.poll(&self.engine, duration, position, now) {
            self.events
                .emit(PlayerEvent::DownloadBuffering(progress.fill_ratio));
            if progress.done {
                self.start_playback();
            }
        }
    }

    fn tick(&mut self, now: Instant) {
        let seekable = self.is_seekable();
        let Some(session) = self.session.as_mut() else {
            self.next_tick = None;
            return;
        };
        if session.engine_state != EngineState::Playing {
            self.next_tick = None;
            return;
        }

        if let Some(position) = self.engine.position() {
            session.position = position;
        }
        let event = PlayerEvent::Tick {
            position: session.position,
            duration: session.duration,
            percent: session.percent(),
            seekable,
        };
        self.events.emit(event);
        self.next_tick = Some(now + self.config.playback.tick_interval());
    }

    // ===== Bus dispatch =====

    fn dispatch(&mut self, message: BusMessage) {
        if self.session.is_none() {
            log::trace!("Dropping {:?}: no open session", message);
            return;
        }

        match message {
            BusMessage::StateChanged { old, new, .. } => self.on_state_changed(old, new),
            BusMessage::Error(err) => self.on_error(err),
            BusMessage::Eos => self.on_eos(),
            BusMessage::Buffering { percent, mode } => self.on_buffering(percent, mode),
            BusMessage::DurationChanged => self.on_duration_changed(),
            BusMessage::TagsChanged { kind, index } => {
                if let Some(tags) = self.engine.stream_tags(kind, index) {
                    self.inbox.push(kind, index, tags);
                }
            }
            BusMessage::AsyncDone => self.on_async_done(),
            BusMessage::Element(element) => self.on_element(element),
        }
    }

    fn on_state_changed(&mut self, old: EngineState, new: EngineState) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        log::debug!("Engine state {} -> {}", old, new);
        session.engine_state = new;

        if old == EngineState::Ready && new == EngineState::Paused && !session.prerolled {
            self.on_prerolled();
        } else if new == EngineState::Playing && self.next_tick.is_none() {
            self.next_tick = Some(Instant::now() + self.config.playback.tick_interval());
        }
    }

    /// First READY to PAUSED transition of the session
    fn on_prerolled(&mut self) {
        let duration = self.engine.duration().filter(|d| !d.is_zero());
        let seeking = self.engine.seeking();
        let info = self.engine.stream_info();

        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.prerolled = true;
        if let Some(duration) = duration {
            session.duration = duration;
        }
        if !session.is_live {
            if let Some(seeking) = seeking {
                session.seekable = Seekable::from(seeking);
            }
        }
        log::info!(
            "Prerolled {}: duration {:?}, {} video / {} audio / {} text streams",
            session.mrl,
            session.duration,
            info.video_streams,
            info.audio_streams,
            info.text_streams
        );
        session.stream_info = Some(info);

        self.events.emit(PlayerEvent::MetadataChanged);
        self.check_missing_plugins();
        self.start_playback();
    }

    /// One-shot offer to install plugins the media could play without
    fn check_missing_plugins(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.missing_plugins_checked {
            return;
        }
        session.missing_plugins_checked = true;
        if session.missing_plugins.is_empty() {
            return;
        }

        let request = missing_plugin_request(std::mem::take(&mut session.missing_plugins), true);
        self.start_side_flow(request, None);
    }

    fn on_error(&mut self, err: EngineErrorMessage) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.failed {
            log::debug!("Ignoring error after failure: {}", err);
            return;
        }
        log::debug!("Engine error: {}", err);

        let context = ClassifierContext {
            mrl: &session.mrl,
            interactive: self.interactive,
            source_supports_credentials: self.engine.source_supports_credentials(),
            missing_plugins: &session.missing_plugins,
        };
        let triage = classifier::triage(&err, &context);
        let suspended = match triage {
            Triage::Report(_) => None,
            _ => Some(classifier::classify(&err, &context)),
        };
        let location = session.mrl.to_string();
        let restore_state = session.target_state;
        let was_prerolled = session.prerolled;

        let request = match triage {
            Triage::Report(record) => return self.fail(record),
            Triage::Mount => SideFlowRequest::Mount {
                location,
                restore_state,
            },
            Triage::Auth => SideFlowRequest::Auth { context: location },
            Triage::MissingPlugins => {
                let Some(session) = self.session.as_mut() else {
                    return;
                };
                session.missing_plugins_checked = true;
                missing_plugin_request(std::mem::take(&mut session.missing_plugins), was_prerolled)
            }
        };
        self.start_side_flow(request, suspended);
    }

    /// Surfaces `record`; a fatal one first forces the engine to NULL
    fn fail(&mut self, record: ErrorRecord) {
        if record.is_fatal() {
            log::error!("Playback failed: {}", record);
            self.engine.set_state(EngineState::Null);
            if let Some(session) = self.session.as_mut() {
                session.failed = true;
                session.target_state = TargetState::Stopped;
                session.engine_state = EngineState::Null;
                session.prerolled = false;
            }
            self.seek.clear();
            self.buffering.reset();
            self.next_tick = None;
        } else {
            log::warn!("Playback problem: {}", record);
        }
        self.events.emit(PlayerEvent::Error(record));
    }

    fn on_eos(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        if session.eos_emitted {
            log::trace!("Duplicate end of stream");
            return;
        }
        session.eos_emitted = true;
        log::info!("End of stream: {}", session.mrl);
        self.events.emit(PlayerEvent::Eos);
    }

    fn on_buffering(&mut self, percent: u8, mode: BufferingMode) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        if session.is_live && mode != BufferingMode::Download {
            log::trace!("Ignoring buffering on live source");
            return;
        }

        let target = session.target_state;
        let outcome =
            self.buffering
                .on_buffering(&mut self.engine, target, percent, mode, Instant::now());
        if mode != BufferingMode::Download {
            self.events.emit(PlayerEvent::Buffering(percent.min(100)));
        }
        if outcome == BufferingOutcome::Ready {
            self.start_playback();
        }
    }

    fn on_duration_changed(&mut self) {
        let Some(duration) = self.engine.duration().filter(|d| !d.is_zero()) else {
            return;
        };
        if let Some(session) = self.session.as_mut() {
            log::debug!("Duration changed to {:?}", duration);
            session.duration = duration;
        }
    }

    fn on_async_done(&mut self) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.direction_pending = false;

        match self
            .seek
            .on_seek_done(&mut self.engine, session, Instant::now())
        {
            SeekDone::Reissued(target) => session.position = target,
            SeekDone::Idle => self.start_playback(),
        }
    }

    fn on_element(&mut self, element: ElementMessage) {
        match element {
            ElementMessage::MissingPlugin {
                detail,
                description,
            } => {
                if let Some(session) = self.session.as_mut() {
                    log::info!("Missing plugin: {}", description);
                    session.missing_plugins.push(MissingPlugin {
                        detail,
                        description,
                    });
                }
            }
            ElementMessage::Redirect { location } => {
                let restore = self
                    .session
                    .as_ref()
                    .map(|s| s.target_state)
                    .unwrap_or_default();
                log::info!("Redirected to {}", location);
                self.reopen(&location, restore);
            }
            ElementMessage::DownloadFile { path } => self.buffering.set_download_path(path),
            ElementMessage::Other(name) => log::trace!("Unhandled element message: {}", name),
        }
    }

    fn drain_tags(&mut self) {
        let mut changed = false;
        for pending in self.inbox.drain() {
            changed |= self
                .tags
                .apply(&self.engine, pending.kind, pending.index, &pending.tags);
        }
        if changed {
            self.events.emit(PlayerEvent::MetadataChanged);
        }
    }

    /// Opens `location` and restores `target`
    fn reopen(&mut self, location: &str, target: TargetState) {
        if let Err(err) = self.open(location) {
            return self.fail(ErrorRecord::new(ErrorKind::InvalidLocation, err.to_string(), true));
        }
        if target == TargetState::Playing {
            if let Err(err) = self.play() {
                log::warn!("Could not resume after re-opening {}: {}", location, err);
            }
        }
    }

    // ===== Side-flows =====

    fn start_side_flow(&mut self, request: SideFlowRequest, suspended: Option<ErrorRecord>) {
        let Some(session) = self.session.as_ref() else {
            return;
        };
        let (token, superseded) =
            self.side_flows
                .start(session.token.id(), request.clone(), suspended);
        if let Some(completion) = superseded {
            self.finish_side_flow(completion);
        }
        self.events
            .emit(PlayerEvent::SideFlowRequested { token, request });
    }

    /// Answers a side-flow from the control thread
    pub fn resolve_side_flow(
        &mut self,
        token: SideFlowToken,
        outcome: SideFlowOutcome,
    ) -> PlaybackResult<()> {
        let completion = self
            .side_flows
            .resolve(token, outcome)
            .ok_or(PlaybackError::UnknownSideFlow(token.id()))?;
        self.finish_side_flow(completion);
        Ok(())
    }

    /// Cancels a side-flow; cancelling a finished flow does nothing
    pub fn cancel_side_flow(&mut self, token: SideFlowToken) {
        if let Some(completion) = self.side_flows.cancel(token, CancelReason::Caller) {
            self.finish_side_flow(completion);
        }
    }

    /// A handle for answering side-flows from other threads
    pub fn side_flow_responder(&self) -> SideFlowResponder {
        self.side_flows.responder()
    }

    fn handle_reply(&mut self, reply: SideFlowReply) {
        if !self.is_current_session(reply.token.session_id()) {
            log::debug!("Dropping side-flow reply for a closed session");
            return;
        }
        if let Some(completion) = self.side_flows.handle_reply(reply) {
            self.finish_side_flow(completion);
        }
    }

    fn is_current_session(&self, id: u64) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.token.is_current(id))
    }

    fn finish_side_flow(&mut self, completion: SideFlowCompletion) {
        if !self.is_current_session(completion.token().session_id()) {
            return;
        }

        match completion {
            SideFlowCompletion::Cancelled {
                token,
                reason,
                suspended_error,
                ..
            } => {
                self.events
                    .emit(PlayerEvent::SideFlowCancelled { token, reason });
                match (reason, suspended_error) {
                    (CancelReason::Caller, Some(record)) => self.fail(record),
                    _ => self.start_playback(),
                }
            }
            SideFlowCompletion::Resolved {
                request,
                outcome,
                suspended_error,
                ..
            } => {
                if self.session.as_ref().is_some_and(|s| s.failed) {
                    log::debug!("Ignoring side-flow answer for a failed session");
                    return;
                }
                self.apply_outcome(request, outcome, suspended_error);
            }
        }
    }

    fn apply_outcome(
        &mut self,
        request: SideFlowRequest,
        outcome: SideFlowOutcome,
        suspended_error: Option<ErrorRecord>,
    ) {
        match (request, outcome) {
            (SideFlowRequest::MissingPlugin { .. }, SideFlowOutcome::Accepted) => {
                log::info!("Plugin installation started, stopping playback");
                self.engine.set_state(EngineState::Null);
                if let Some(session) = self.session.as_mut() {
                    session.target_state = TargetState::Stopped;
                    session.engine_state = EngineState::Null;
                    session.prerolled = false;
                }
                self.seek.clear();
                self.buffering.reset();
                self.next_tick = None;
            }
            (
                SideFlowRequest::Mount {
                    location,
                    restore_state,
                },
                SideFlowOutcome::Mounted { location: mounted },
            ) => {
                let location = mounted.unwrap_or(location);
                log::info!("Mounted, re-opening {}", location);
                self.reopen(&location, restore_state);
            }
            (SideFlowRequest::Mount { .. }, SideFlowOutcome::MountFailed(message)) => {
                self.fail(ErrorRecord::new(ErrorKind::FileGeneric, message, true));
            }
            (SideFlowRequest::Auth { .. }, SideFlowOutcome::Credentials(credentials)) => {
                self.apply_credentials(credentials);
            }
            (_, _) => {
                if let Some(record) = suspended_error {
                    self.fail(ErrorRecord::new(record.kind(), record.message(), false));
                }
                self.start_playback();
            }
        }
    }

    /// Restarts the source with credentials, which are used once and dropped
    fn apply_credentials(&mut self, credentials: Credentials) {
        let Some(session) = self.session.as_mut() else {
            return;
        };
        session.pending_credentials = Some(credentials);

        self.engine.set_state(EngineState::Ready);
        if let Some(credentials) = session.take_credentials() {
            self.engine
                .set_property(EngineProperty::SourceCredentials(credentials));
        }
        self.engine.set_state(EngineState::Paused);
        self.start_playback();
    }

    // ===== Accessors =====

    pub fn session(&self) -> Option<&MediaSession> {
        self.session.as_ref()
    }

    /// Last known position; zero when nothing is open
    pub fn position(&self) -> Duration {
        self.session
            .as_ref()
            .map(|s| s.position)
            .unwrap_or_default()
    }

    pub fn duration(&self) -> Duration {
        self.session
            .as_ref()
            .map(|s| s.duration)
            .unwrap_or_default()
    }

    /// True if seeks take effect right away
    pub fn is_seekable(&self) -> bool {
        self.session
            .as_ref()
            .is_some_and(|s| s.seekable == Seekable::Yes)
            && self.buffering.is_instantly_seekable()
    }

    pub fn lifecycle_state(&self) -> LifecycleState {
        match &self.session {
            None => LifecycleState::Closed,
            Some(s) if s.failed || s.target_state == TargetState::Stopped => {
                LifecycleState::Stopped
            }
            Some(s) if !s.prerolled => LifecycleState::Opening,
            Some(s) if s.engine_state == EngineState::Playing => LifecycleState::Playing,
            Some(_) => LifecycleState::Paused,
        }
    }

    pub fn target_state(&self) -> Option<TargetState> {
        self.session.as_ref().map(|s| s.target_state)
    }

    pub fn rate(&self) -> PlaybackRate {
        self.session
            .as_ref()
            .map(|s| s.rate)
            .unwrap_or(PlaybackRate::NORMAL)
    }

    pub fn buffering_state(&self) -> &BufferingState {
        self.buffering.state()
    }

    pub fn stream_info(&self) -> Option<&StreamInfo> {
        self.session.as_ref().and_then(|s| s.stream_info.as_ref())
    }

    pub fn metadata(&self, key: MetadataKey) -> Option<MetadataValue> {
        metadata::lookup(key, &self.tags, self.stream_info())
    }

    pub fn cover_art(&mut self) -> Option<&CoverImage> {
        self.session.as_ref()?;
        self.tags.cover_image()
    }

    /// Thread-safe entry point for tags produced outside the control thread
    pub fn tag_inbox(&self) -> TagInbox {
        self.inbox.clone()
    }

    pub fn is_side_flow_active(&self) -> bool {
        self.side_flows.any_active()
    }
}

impl Drop for LifecycleController {
    fn drop(&mut self) {
        self.close();
    }
}

fn missing_plugin_request(plugins: Vec<MissingPlugin>, was_prerolled: bool) -> SideFlowRequest {
    let (details, descriptions) = plugins
        .into_iter()
        .map(|p| (p.detail, p.description))
        .unzip();
    SideFlowRequest::MissingPlugin {
        details,
        descriptions,
        was_prerolled,
    }
}
