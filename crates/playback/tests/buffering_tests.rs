//! Integration tests for stream and download buffering

mod helpers;

use cadence_core::EngineState;
use cadence_playback::{
    BufferingMode, BufferingPhase, BufferingRange, BufferingStats, BusMessage, ElementMessage,
    PlayerEvent, PERCENT_MAX,
};
use helpers::{init_logging, Harness};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

fn buffering(percent: u8) -> BusMessage {
    BusMessage::Buffering {
        percent,
        mode: BufferingMode::Stream,
    }
}

fn download_started() -> BusMessage {
    BusMessage::Buffering {
        percent: 0,
        mode: BufferingMode::Download,
    }
}

fn downloads(events: &[PlayerEvent]) -> Vec<f64> {
    events
        .iter()
        .filter_map(|e| match e {
            PlayerEvent::DownloadBuffering(ratio) => Some(*ratio),
            _ => None,
        })
        .collect()
}

#[test]
fn test_play_during_stream_buffering_waits_for_full_buffer() {
    init_logging();
    let mut h = Harness::new();
    h.controller.open("http://example.com/good-file").unwrap();

    h.send(buffering(40));
    h.controller.play().unwrap();
    assert_eq!(h.calls.play_commands(), 0);
    assert_eq!(
        h.controller.buffering_state().mode(),
        BufferingPhase::StreamBuffering
    );

    h.send(buffering(100));
    assert_eq!(h.calls.play_commands(), 1);

    h.send(buffering(100));
    assert_eq!(h.calls.play_commands(), 1);
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);
}

#[test]
fn test_underrun_pauses_and_resumes() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/radio.ogg").unwrap();
    h.controller.play().unwrap();
    h.calls.take();
    h.events();

    h.send(buffering(20));
    assert_eq!(h.calls.states(), vec![EngineState::Paused]);
    assert_eq!(h.events(), vec![PlayerEvent::Buffering(20)]);

    h.send(buffering(60));
    assert_eq!(h.calls.states(), vec![EngineState::Paused]);

    h.send(buffering(100));
    assert_eq!(
        h.calls.states(),
        vec![EngineState::Paused, EngineState::Playing]
    );
}

#[test]
fn test_buffering_while_paused_stays_paused() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/radio.ogg").unwrap();
    h.calls.take();

    h.send(buffering(10));
    h.send(buffering(100));
    assert!(h.calls.take().is_empty());
    assert_eq!(h.controller.buffering_state().percent(), 100);
}

#[test]
fn test_download_buffering_polls_until_cached() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/movie.mp4").unwrap();
    h.controller.play().unwrap();
    h.answers.lock().range = Some(BufferingRange { start: 0, stop: 0 });

    h.send(download_started());
    assert_eq!(h.calls.states().last(), Some(&EngineState::Paused));
    assert_eq!(
        h.controller.buffering_state().mode(),
        BufferingPhase::DownloadBuffering
    );
    assert!(!h.controller.is_seekable());

    // More download messages do not restart the cycle
    h.send(download_started());
    h.controller.play().unwrap();
    assert_eq!(h.calls.play_commands(), 1);

    let start = Instant::now();
    h.controller.run_due_timers(start + Duration::from_secs(1));
    assert_eq!(downloads(&h.events()), vec![0.0]);
    assert_eq!(h.calls.play_commands(), 1);

    h.answers.lock().range = Some(BufferingRange {
        start: 0,
        stop: PERCENT_MAX,
    });
    h.controller.run_due_timers(start + Duration::from_secs(2));
    assert_eq!(downloads(&h.events()), vec![1.0]);
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);
    assert_eq!(h.calls.play_commands(), 2);

    // No further polls once done
    h.controller.run_due_timers(start + Duration::from_secs(10));
    assert!(downloads(&h.events()).is_empty());
}

#[test]
fn test_download_done_when_estimate_beats_remaining_time() {
    let mut h = Harness::new();
    h.open_prerolled("http://example.com/movie.mp4");
    h.controller.play().unwrap();
    {
        let mut answers = h.answers.lock();
        answers.range = Some(BufferingRange {
            start: 0,
            stop: PERCENT_MAX / 4,
        });
        answers.buffering = Some(BufferingStats {
            mode: BufferingMode::Download,
            buffering_left: Some(Duration::from_secs(10)),
        });
    }

    h.send(download_started());
    h.controller
        .run_due_timers(Instant::now() + Duration::from_secs(1));

    assert_eq!(downloads(&h.events()), vec![0.25]);
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);
    assert_eq!(h.calls.states().last(), Some(&EngineState::Playing));
}

#[test]
fn test_download_keeps_waiting_when_estimate_is_too_long() {
    let mut h = Harness::new();
    h.open_prerolled("http://example.com/movie.mp4");
    {
        let mut answers = h.answers.lock();
        answers.range = Some(BufferingRange {
            start: 0,
            stop: PERCENT_MAX / 2,
        });
        answers.buffering = Some(BufferingStats {
            mode: BufferingMode::Download,
            buffering_left: Some(Duration::from_secs(600)),
        });
    }

    h.send(download_started());
    h.controller
        .run_due_timers(Instant::now() + Duration::from_secs(1));

    let state = h.controller.buffering_state();
    assert_eq!(state.mode(), BufferingPhase::DownloadBuffering);
    assert_eq!(state.fill_ratio(), 0.5);
    assert_eq!(state.buffering_left(), Some(Duration::from_secs(600)));
}

#[test]
fn test_download_path_reported_while_downloading() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/movie.mp4").unwrap();
    h.send(BusMessage::Element(ElementMessage::DownloadFile {
        path: PathBuf::from("/tmp/cadence-cache/movie.mp4"),
    }));
    assert_eq!(h.controller.buffering_state().download_path(), None);

    h.send(download_started());
    assert_eq!(
        h.controller.buffering_state().download_path(),
        Some(Path::new("/tmp/cadence-cache/movie.mp4"))
    );
}

#[test]
fn test_stream_buffering_replaces_download_cycle() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/movie.mp4").unwrap();
    h.answers.lock().range = Some(BufferingRange { start: 0, stop: 0 });

    h.send(download_started());
    h.send(buffering(50));
    assert_eq!(
        h.controller.buffering_state().mode(),
        BufferingPhase::StreamBuffering
    );

    h.controller
        .run_due_timers(Instant::now() + Duration::from_secs(1));
    assert!(downloads(&h.events()).is_empty());
}

#[test]
fn test_stop_ends_buffering_cycle() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/radio.ogg").unwrap();
    h.send(buffering(30));

    h.controller.stop().unwrap();
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);

    h.calls.take();
    h.controller.play().unwrap();
    assert_eq!(h.calls.play_commands(), 1);
}

#[test]
fn test_download_message_after_completion_is_ignored() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/movie.mp4").unwrap();
    h.controller.play().unwrap();
    h.answers.lock().range = Some(BufferingRange {
        start: 0,
        stop: PERCENT_MAX,
    });

    h.send(download_started());
    h.controller
        .run_due_timers(Instant::now() + Duration::from_secs(1));
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);
    h.calls.take();
    h.events();

    // The engine keeps reporting download progress for the whole transfer
    h.send(BusMessage::Buffering {
        percent: 50,
        mode: BufferingMode::Download,
    });
    assert!(h.calls.take().is_empty());
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);

    h.controller
        .run_due_timers(Instant::now() + Duration::from_secs(5));
    assert!(downloads(&h.events()).is_empty());
    assert!(h.calls.take().is_empty());
}

#[test]
fn test_download_after_stream_switch_starts_new_cycle() {
    let mut h = Harness::new();
    h.controller.open("http://example.com/movie.mp4").unwrap();
    h.controller.play().unwrap();
    h.answers.lock().range = Some(BufferingRange {
        start: 0,
        stop: PERCENT_MAX,
    });

    h.send(download_started());
    h.controller
        .run_due_timers(Instant::now() + Duration::from_secs(1));
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);

    h.send(buffering(30));
    h.send(buffering(100));
    assert_eq!(h.controller.buffering_state().mode(), BufferingPhase::Idle);
    h.calls.take();

    h.send(download_started());
    assert_eq!(
        h.controller.buffering_state().mode(),
        BufferingPhase::DownloadBuffering
    );
    assert_eq!(h.calls.states(), vec![EngineState::Paused]);
}
