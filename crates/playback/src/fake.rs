// FILE: crates/playback/src/fake.rs

//! Recording engine double for unit tests

use crate::engine::{
    BufferingRange, BufferingStats, EngineHandle, EngineProperty, Pipeline, SeekCommand,
    StateChangeOutcome, StreamInfo,
};
use crate::message::BusMessage;
use cadence_core::{EngineState, StreamKind, TagList};
use crossbeam_channel::{unbounded, Receiver, Sender};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum EngineCall {
    SetState(EngineState),
    AwaitStateChange,
    Seek(SeekCommand),
    SetProperty(EngineProperty),
}

#[derive(Clone, Default)]
pub(crate) struct CallLog(Arc<Mutex<Vec<EngineCall>>>);

impl CallLog {
    fn push(&self, call: EngineCall) {
        self.0.lock().unwrap().push(call);
    }

    /// Returns and clears the recorded calls
    pub(crate) fn take(&self) -> Vec<EngineCall> {
        std::mem::take(&mut *self.0.lock().unwrap())
    }

    pub(crate) fn seeks(&self) -> Vec<SeekCommand> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                EngineCall::Seek(cmd) => Some(cmd.clone()),
                _ => None,
            })
            .collect()
    }

    pub(crate) fn states(&self) -> Vec<EngineState> {
        self.0
            .lock()
            .unwrap()
            .iter()
            .filter_map(|c| match c {
                EngineCall::SetState(s) => Some(*s),
                _ => None,
            })
            .collect()
    }
}

pub(crate) struct Answers {
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
    pub seek_accepted: bool,
}

impl Default for Answers {
    fn default() -> Self {
        Self {
            position: Some(Duration::ZERO),
            duration: Some(Duration::from_secs(60)),
            seeking: Some(true),
            buffering: None,
            range: None,
            current: HashMap::new(),
            tags: HashMap::new(),
            info: StreamInfo::default(),
            credentials: false,
            state_outcome: StateChangeOutcome::Async,
            await_outcome: StateChangeOutcome::Success,
            seek_accepted: true,
        }
    }
}

#[derive(Clone, Default)]
pub(crate) struct SharedAnswers(Arc<Mutex<Answers>>);

impl SharedAnswers {
    pub(crate) fn lock(&self) -> MutexGuard<'_, Answers> {
        self.0.lock().unwrap()
    }
}

pub(crate) struct FakePipeline {
    calls: CallLog,
    answers: SharedAnswers,
}

impl Pipeline for FakePipeline {
    fn set_state(&mut self, state: EngineState) -> StateChangeOutcome {
        self.calls.push(EngineCall::SetState(state));
        self.answers.lock().state_outcome
    }

    fn await_state_change(&mut self, _timeout: Duration) -> StateChangeOutcome {
        self.calls.push(EngineCall::AwaitStateChange);
        self.answers.lock().await_outcome
    }

    fn seek(&mut self, command: &SeekCommand) -> bool {
        self.calls.push(EngineCall::Seek(command.clone()));
        self.answers.lock().seek_accepted
    }

    fn set_property(&mut self, property: EngineProperty) {
        self.calls.push(EngineCall::SetProperty(property));
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

/// Builds a recording pipeline plus both ends of its bus
pub(crate) fn fake_engine_parts() -> (
    Box<dyn Pipeline>,
    CallLog,
    SharedAnswers,
    Sender<BusMessage>,
    Receiver<BusMessage>,
) {
    let calls = CallLog::default();
    let answers = SharedAnswers::default();
    let (bus_tx, bus_rx) = unbounded();
    let pipeline = FakePipeline {
        calls: calls.clone(),
        answers: answers.clone(),
    };
    (Box::new(pipeline), calls, answers, bus_tx, bus_rx)
}

/// Builds a handle over a recording pipeline plus the test's end of the bus
pub(crate) fn fake_engine() -> (EngineHandle, CallLog, SharedAnswers, Sender<BusMessage>) {
    let (pipeline, calls, answers, bus_tx, bus_rx) = fake_engine_parts();
    (EngineHandle::new(pipeline, bus_rx), calls, answers, bus_tx)
}
