//! Shared fixtures for the playback integration tests
//!
//! - `RecordingPipeline`: a `Pipeline` that records every command and answers
//!   queries from a shared, test-controlled table
//! - `Harness`: a controller wired to a recording pipeline, the test's end of the
//!   bus and an event subscription

#![allow(dead_code)]

use cadence_config::Config;
use cadence_core::{EngineState, StreamKind, TagList};
use cadence_playback::{
    BufferingRange, BufferingStats, BusMessage, EngineProperty, LifecycleController, Pipeline,
    PlayerEvent, SeekCommand, SideFlowRequest, SideFlowToken, StateChangeOutcome, StreamInfo,
};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    SetState(EngineState),
    AwaitStateChange,
    Seek(SeekCommand),
    SetProperty(EngineProperty),
}

#[derive(Clone, Default)]
pub struct Calls(Arc<Mutex<Vec<Call>>>);

impl Calls {
    fn push(&self, call: Call) {
        self.0.lock().unwrap().push(call);
    }

    /// Returns and clears the recorded calls
    pub fn take(&self) -> Vec<Call> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub fn states(&self) -> Vec<EngineState> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::SetState(s) => Some(*s),
                _ => None,
            })
            .collect()
    }

    pub fn seeks(&self) -> Vec<SeekCommand> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                Call::Seek(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of PLAYING requests recorded so far
    pub fn play_commands(&self) -> usize {
        self.states()
            .into_iter()
            .filter(|s| *s == EngineState::Playing)
            .count()
    }
}

pub struct Answers {
    pub position: Option<Duration>,
    pub duration: Option<Duration>,
    pub seeking: Option<bool>,
    pub buffering: Option<BufferingStats>,
    pub range: Option<BufferingRange>,
    pub current: HashMap<StreamKind, usize>,
    pub tags: HashMap<(StreamKind, usize), TagList>,
    pub info: StreamInfo,
    pub credentials: bool,
    pub state_outcome: StateChangeOutcome,
    pub await_outcome: StateChangeOutcome,
}

impl Default for Answers {
    fn default() -> Self {
        Self {
            position: Some(Duration::ZERO),
            duration: Some(Duration::from_secs(120)),
            seeking: Some(true),
            buffering: None,
            range: None,
            current: HashMap::new(),
            tags: HashMap::new(),
            info: StreamInfo::default(),
            credentials: false,
            state_outcome: StateChangeOutcome::Async,
            await_outcome: StateChangeOutcome::Success,
        }
    }
}

#[derive(Clone, Default)]
pub struct SharedAnswers(Arc<Mutex<Answers>>);

impl SharedAnswers {
    pub fn lock(&self) -> MutexGuard<'_, Answers> {
        self.0.lock().unwrap()
    }
}

pub struct RecordingPipeline {
    calls: Calls,
    answers: SharedAnswers,
}

impl Pipeline for RecordingPipeline {
    fn set_state(&mut self, state: EngineState) -> StateChangeOutcome {
        self.calls.push(Call::SetState(state));
        self.answers.lock().state_outcome
    }

    fn await_state_change(&mut self, _timeout: Duration) -> StateChangeOutcome {
        self.calls.push(Call::AwaitStateChange);
        self.answers.lock().await_outcome
    }

    fn seek(&mut self, command: &SeekCommand) -> bool {
        self.calls.push(Call::Seek(command.clone()));
        true
    }

    fn set_property(&mut self, property: EngineProperty) {
        self.calls.push(Call::SetProperty(property));
    }

    fn query_position(&self) -> Option<Duration> {
        self.answers.lock().position
    }

    fn query_duration(&self) -> Option<Duration> {
        self.answers.lock().duration
    }

    fn query_seeking(&self) -> Option<bool> {
        self.answers.lock().seeking
    }

    fn query_buffering(&self) -> Option<BufferingStats> {
        self.answers.lock().buffering
    }

    fn query_buffering_range(&self) -> Option<BufferingRange> {
        self.answers.lock().range
    }

    fn current_stream(&self, kind: StreamKind) -> Option<usize> {
        self.answers.lock().current.get(&kind).copied()
    }

    fn stream_tags(&self, kind: StreamKind, index: usize) -> Option<TagList> {
        self.answers.lock().tags.get(&(kind, index)).cloned()
    }

    fn stream_info(&self) -> StreamInfo {
        self.answers.lock().info.clone()
    }

    fn source_supports_credentials(&self) -> bool {
        self.answers.lock().credentials
    }
}

pub struct Harness {
    pub controller: LifecycleController,
    pub calls: Calls,
    pub answers: SharedAnswers,
    pub bus: Sender<BusMessage>,
    pub events: Receiver<PlayerEvent>,
}

impl Harness {
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    pub fn with_config(config: Config) -> Self {
        let calls = Calls::default();
        let answers = SharedAnswers::default();
        let (bus, bus_rx) = unbounded();
        let pipeline = RecordingPipeline {
            calls: calls.clone(),
            answers: answers.clone(),
        };
        let mut controller = LifecycleController::new(Box::new(pipeline), bus_rx, config);
        let events = controller.subscribe();
        Self {
            controller,
            calls,
            answers,
            bus,
            events,
        }
    }

    /// Delivers `message` on the bus and lets the controller handle it
    pub fn send(&mut self, message: BusMessage) {
        self.bus.send(message).expect("bus receiver dropped");
        self.controller
            .process_pending()
            .expect("controller lost the bus");
    }

    pub fn state_changed(&mut self, old: EngineState, new: EngineState) {
        self.send(BusMessage::StateChanged {
            old,
            new,
            pending: None,
        });
    }

    /// Opens `mrl` and reports the first READY to PAUSED transition
    pub fn open_prerolled(&mut self, mrl: &str) {
        self.controller.open(mrl).expect("open failed");
        self.state_changed(EngineState::Ready, EngineState::Paused);
    }

    pub fn events(&self) -> Vec<PlayerEvent> {
        self.events.try_iter().collect()
    }

    /// Returns the side-flow request announced most recently in `events`
    pub fn find_side_flow(events: &[PlayerEvent]) -> Option<(SideFlowToken, SideFlowRequest)> {
        events.iter().rev().find_map(|event| match event {
            PlayerEvent::SideFlowRequested { token, request } => Some((*token, request.clone())),
            _ => None,
        })
    }

    pub fn errors(events: &[PlayerEvent]) -> Vec<cadence_core::ErrorRecord> {
        events
            .iter()
            .filter_map(|event| match event {
                PlayerEvent::Error(record) => Some(record.clone()),
                _ => None,
            })
            .collect()
    }
}

/// Installs a test logger once; output shows with `--nocapture`
pub fn init_logging() {
    let _ = env_logger::builder().is_test(true).try_init();
}
