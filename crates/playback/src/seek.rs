// FILE: crates/playback/src/seek.rs

//! Seek serialization, debouncing and playback direction

use crate::engine::{EngineHandle, SeekCommand, StateChangeOutcome};
use crate::error::{PlaybackError, PlaybackResult};
use crate::session::MediaSession;
use cadence_core::{EngineState, PlaybackRate};
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A seek held back while another one is in flight
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PendingSeek {
    pub requested_time: Duration,
    pub accurate: bool,
    pub issued_at: Instant,
}

/// What happened to a seek request
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekOutcome {
    /// Sent to the engine
    Issued(Duration),
    /// Stored; sent once the in-flight seek completes
    Queued(Duration),
    /// The session is not seekable
    Ignored,
    /// The engine refused the seek
    Rejected(Duration),
}

/// What to do after the engine reported a completed seek
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SeekDone {
    /// A queued seek was sent
    Reissued(Duration),
    /// Nothing queued; the caller may resume playback
    Idle,
}

#[derive(Debug, Default)]
struct SeekState {
    pending: Option<PendingSeek>,
    /// When the seek currently in flight was sent
    last_issued: Option<Instant>,
}

/// Coordinates seek requests against seek completions
///
/// Requests and completion notifications both touch the pending seek, so it
/// lives behind a lock even though both paths normally run on the control thread.
#[derive(Debug)]
pub struct SeekCoordinator {
    state: Mutex<SeekState>,
    timeout: Duration,
}

impl SeekCoordinator {
    pub fn new(timeout: Duration) -> Self {
        Self {
            state: Mutex::new(SeekState::default()),
            timeout,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SeekState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Requests a seek to `time`
    ///
    /// The seek goes out at once if none was sent within the debounce window or
    /// `accurate` is set; otherwise it replaces whatever is already queued.
    pub fn request_seek(
        &self,
        engine: &mut EngineHandle,
        session: &MediaSession,
        time: Duration,
        accurate: bool,
        now: Instant,
    ) -> SeekOutcome {
        if !session.seekable.allows_seek() {
            return SeekOutcome::Ignored;
        }
        let time = session.clamp_to_duration(time);

        let mut state = self.lock();
        let throttled = !accurate
            && state
                .last_issued
                .is_some_and(|issued| now <= issued + self.timeout);

        if throttled {
            log::trace!("seek: throttling, queueing {:?}", time);
            state.pending = Some(PendingSeek {
                requested_time: time,
                accurate,
                issued_at: now,
            });
            return SeekOutcome::Queued(time);
        }

        state.pending = None;
        state.last_issued = Some(now);
        let outcome = Self::issue(engine, session.rate, time, accurate);
        if let SeekOutcome::Rejected(_) = outcome {
            state.last_issued = None;
        }
        outcome
    }

    /// Handles a seek completion reported by the engine
    pub fn on_seek_done(
        &self,
        engine: &mut EngineHandle,
        session: &MediaSession,
        now: Instant,
    ) -> SeekDone {
        let mut state = self.lock();
        match state.pending.take() {
            Some(pending) => {
                log::debug!("seek: issuing queued seek to {:?}", pending.requested_time);
                state.last_issued = Some(now);
                let time = session.clamp_to_duration(pending.requested_time);
                Self::issue(engine, session.rate, time, pending.accurate);
                SeekDone::Reissued(time)
            }
            None => {
                state.last_issued = None;
                SeekDone::Idle
            }
        }
    }

    /// Changes the playback rate, reversing direction if the sign flips
    ///
    /// A reversal blocks until the engine confirms the state change or `timeout`
    /// expires. On failure the session's rate is left unchanged.
    pub fn change_rate(
        &self,
        engine: &mut EngineHandle,
        session: &mut MediaSession,
        rate: PlaybackRate,
        timeout: Duration,
        now: Instant,
    ) -> PlaybackResult<()> {
        if rate == session.rate {
            return Ok(());
        }
        let reversing = !rate.same_direction(session.rate);

        let position = match engine.position() {
            Some(position) => position,
            None if reversing => {
                return Err(PlaybackError::DirectionChange(
                    "current position is unknown".to_string(),
                ))
            }
            None => session.position,
        };

        let command = SeekCommand::to(position, rate.value(), true);
        {
            let mut state = self.lock();
            state.pending = None;
            state.last_issued = Some(now);
        }

        if !engine.seek(&command) {
            self.lock().last_issued = None;
            return Err(if reversing {
                PlaybackError::DirectionChange(format!("engine refused rate {}", rate))
            } else {
                PlaybackError::command("rate change", format!("engine refused rate {}", rate))
            });
        }

        if reversing {
            match engine.await_state_change(timeout) {
                StateChangeOutcome::Success | StateChangeOutcome::NoPreroll => {}
                StateChangeOutcome::Async => {
                    log::debug!("seek: direction change still settling after {:?}", timeout);
                    session.direction_pending = true;
                }
                StateChangeOutcome::Failure => {
                    return Err(PlaybackError::DirectionChange(
                        "engine did not confirm the new direction".to_string(),
                    ));
                }
            }
        }

        log::info!("Playback rate {} -> {} at {:?}", session.rate, rate, position);
        session.rate = rate;
        session.position = position;
        Ok(())
    }

    /// Drops any queued seek without issuing it
    pub fn clear(&self) {
        let mut state = self.lock();
        state.pending = None;
        state.last_issued = None;
    }

    pub fn pending(&self) -> Option<PendingSeek> {
        self.lock().pending
    }

    /// True while a sent seek has not been reported complete
    pub fn in_flight(&self) -> bool {
        self.lock().last_issued.is_some()
    }

    fn issue(
        engine: &mut EngineHandle,
        rate: PlaybackRate,
        time: Duration,
        accurate: bool,
    ) -> SeekOutcome {
        // Seeks always settle in PAUSED; playback resumes on completion
        engine.set_state(EngineState::Paused);
        if engine.seek(&SeekCommand::to(time, rate.value(), accurate)) {
            SeekOutcome::Issued(time)
        } else {
            SeekOutcome::Rejected(time)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fake::{fake_engine, EngineCall};
    use crate::session::SessionToken;
    use cadence_core::{Mrl, Seekable};

    fn session() -> MediaSession {
        let mut s = MediaSession::new(Mrl::parse("file:///a.mkv").unwrap(), SessionToken::new(1));
        s.duration = Duration::from_secs(100);
        s.seekable = Seekable::Yes;
        s
    }

    fn coordinator() -> SeekCoordinator {
        SeekCoordinator::new(Duration::from_millis(100))
    }

    #[test]
    fn test_first_seek_is_issued_paused() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let seek = coordinator();
        let now = Instant::now();

        let outcome = seek.request_seek(&mut engine, &session(), Duration::from_secs(10), false, now);
        assert_eq!(outcome, SeekOutcome::Issued(Duration::from_secs(10)));
        let recorded = calls.take();
        assert_eq!(recorded[0], EngineCall::SetState(EngineState::Paused));
        assert!(matches!(recorded[1], EngineCall::Seek(ref c) if c.start == Duration::from_secs(10)));
        assert!(seek.in_flight());
    }

    #[test]
    fn test_rapid_seeks_coalesce_to_last() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let seek = coordinator();
        let s = session();
        let t0 = Instant::now();

        seek.request_seek(&mut engine, &s, Duration::from_secs(1), false, t0);
        let second = seek.request_seek(
            &mut engine,
            &s,
            Duration::from_secs(2),
            false,
            t0 + Duration::from_millis(20),
        );
        let third = seek.request_seek(
            &mut engine,
            &s,
            Duration::from_secs(3),
            false,
            t0 + Duration::from_millis(40),
        );
        assert_eq!(second, SeekOutcome::Queued(Duration::from_secs(2)));
        assert_eq!(third, SeekOutcome::Queued(Duration::from_secs(3)));
        assert_eq!(calls.seeks().len(), 1);

        let done = seek.on_seek_done(&mut engine, &s, t0 + Duration::from_millis(60));
        assert_eq!(done, SeekDone::Reissued(Duration::from_secs(3)));

        let seeks = calls.seeks();
        assert_eq!(seeks.len(), 2);
        assert_eq!(seeks[1].start, Duration::from_secs(3));
        assert!(seek.pending().is_none());

        assert_eq!(
            seek.on_seek_done(&mut engine, &s, t0 + Duration::from_millis(90)),
            SeekDone::Idle
        );
        assert!(!seek.in_flight());
    }

    #[test]
    fn test_seek_after_window_goes_through() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let seek = coordinator();
        let s = session();
        let t0 = Instant::now();

        seek.request_seek(&mut engine, &s, Duration::from_secs(1), false, t0);
        let late = seek.request_seek(
            &mut engine,
            &s,
            Duration::from_secs(2),
            false,
            t0 + Duration::from_millis(150),
        );
        assert_eq!(late, SeekOutcome::Issued(Duration::from_secs(2)));
        assert_eq!(calls.seeks().len(), 2);
    }

    #[test]
    fn test_accurate_seek_bypasses_debounce() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let seek = coordinator();
        let s = session();
        let t0 = Instant::now();

        seek.request_seek(&mut engine, &s, Duration::from_secs(1), false, t0);
        let outcome = seek.request_seek(&mut engine, &s, Duration::from_secs(5), true, t0);
        assert_eq!(outcome, SeekOutcome::Issued(Duration::from_secs(5)));
        assert_eq!(calls.seeks().len(), 2);
    }

    #[test]
    fn test_seek_past_end_clamps() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let outcome = coordinator().request_seek(
            &mut engine,
            &session(),
            Duration::from_secs(500),
            false,
            Instant::now(),
        );
        assert_eq!(outcome, SeekOutcome::Issued(Duration::from_secs(100)));
        assert_eq!(calls.seeks()[0].start, Duration::from_secs(100));
    }

    #[test]
    fn test_unseekable_is_ignored() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let mut s = session();
        s.seekable = Seekable::No;

        let outcome =
            coordinator().request_seek(&mut engine, &s, Duration::from_secs(5), true, Instant::now());
        assert_eq!(outcome, SeekOutcome::Ignored);
        assert!(calls.take().is_empty());
    }

    #[test]
    fn test_clear_drops_queued_seek() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let seek = coordinator();
        let s = session();
        let t0 = Instant::now();

        seek.request_seek(&mut engine, &s, Duration::from_secs(1), false, t0);
        seek.request_seek(&mut engine, &s, Duration::from_secs(2), false, t0);
        seek.clear();

        assert_eq!(seek.on_seek_done(&mut engine, &s, t0), SeekDone::Idle);
        assert_eq!(calls.seeks().len(), 1);
    }

    #[test]
    fn test_reverse_direction_swaps_bounds() {
        let (mut engine, calls, answers, _bus) = fake_engine();
        answers.lock().position = Some(Duration::from_secs(30));
        let mut s = session();

        coordinator()
            .change_rate(
                &mut engine,
                &mut s,
                PlaybackRate::new(-1.0).unwrap(),
                Duration::from_secs(2),
                Instant::now(),
            )
            .unwrap();

        let seeks = calls.seeks();
        let seek = &seeks[0];
        assert_eq!(seek.rate, -1.0);
        assert_eq!(seek.start, Duration::ZERO);
        assert_eq!(seek.stop, Some(Duration::from_secs(30)));
        assert!(calls.take().contains(&EngineCall::AwaitStateChange));
        assert_eq!(s.rate.value(), -1.0);
    }

    #[test]
    fn test_failed_reversal_keeps_rate() {
        let (mut engine, _calls, answers, _bus) = fake_engine();
        answers.lock().await_outcome = StateChangeOutcome::Failure;
        let mut s = session();

        let result = coordinator().change_rate(
            &mut engine,
            &mut s,
            PlaybackRate::new(-1.0).unwrap(),
            Duration::from_secs(2),
            Instant::now(),
        );
        assert!(matches!(result, Err(PlaybackError::DirectionChange(_))));
        assert_eq!(s.rate, PlaybackRate::NORMAL);
    }

    #[test]
    fn test_reversal_without_position_fails() {
        let (mut engine, calls, answers, _bus) = fake_engine();
        answers.lock().position = None;
        let mut s = session();

        let result = coordinator().change_rate(
            &mut engine,
            &mut s,
            PlaybackRate::new(-1.0).unwrap(),
            Duration::from_secs(2),
            Instant::now(),
        );
        assert!(result.is_err());
        assert!(calls.seeks().is_empty());
    }

    #[test]
    fn test_same_direction_rate_change_does_not_wait() {
        let (mut engine, calls, _answers, _bus) = fake_engine();
        let mut s = session();

        coordinator()
            .change_rate(
                &mut engine,
                &mut s,
                PlaybackRate::new(2.0).unwrap(),
                Duration::from_secs(2),
                Instant::now(),
            )
            .unwrap();
        assert!(!calls.take().contains(&EngineCall::AwaitStateChange));
        assert_eq!(s.rate.value(), 2.0);
    }

    #[test]
    fn test_unsettled_reversal_marks_direction_pending() {
        let (mut engine, _calls, answers, _bus) = fake_engine();
        answers.lock().await_outcome = StateChangeOutcome::Async;
        let mut s = session();

        coordinator()
            .change_rate(
                &mut engine,
                &mut s,
                PlaybackRate::new(-1.0).unwrap(),
                Duration::from_secs(2),
                Instant::now(),
            )
            .unwrap();
        assert!(s.direction_pending);
    }
}
