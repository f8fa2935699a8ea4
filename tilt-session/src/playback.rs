//! Playback scheduler - replays a recording against wall-clock time
//!
//! Frames are released by timestamp, not by count: every tick dispatches all
//! frames whose offset has already elapsed. A late tick therefore catches up
//! in one go instead of drifting, and the original rhythm is preserved no
//! matter how densely frames were captured or how often ticks arrive.

use crate::recorder::Recording;
use thiserror::Error;
use tilt_motion::ControlSink;

/// Nominal tick period (~60Hz)
pub const DEFAULT_TICK_INTERVAL_MS: u64 = 16;

/// Errors that can occur when starting playback
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackError {
    #[error("recording has no frames")]
    EmptyRecording,
}

/// Playback state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PlaybackState {
    #[default]
    Idle,
    Playing,
}

/// Outcome of one scheduler tick
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct TickOutcome {
    /// Frames handed to the sink during this tick
    pub dispatched: usize,
    /// Playback reached the last frame during this tick
    pub finished: bool,
}

/// Replays a [`Recording`] into a [`ControlSink`]
#[derive(Debug, Default)]
pub struct PlaybackScheduler {
    state: PlaybackState,
    recording: Option<Recording>,
    cursor: usize,
    started_at_ms: u64,
}

impl PlaybackScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start replaying `recording` from its first frame at `now_ms`
    ///
    /// An empty recording leaves the scheduler untouched.
    pub fn play(&mut self, recording: Recording, now_ms: u64) -> Result<(), PlaybackError> {
        if recording.is_empty() {
            return Err(PlaybackError::EmptyRecording);
        }

        tracing::debug!(frames = recording.len(), now_ms, "playback started");
        self.recording = Some(recording);
        self.cursor = 0;
        self.started_at_ms = now_ms;
        self.state = PlaybackState::Playing;
        Ok(())
    }

    /// Periodic entry point; dispatches every frame that is due at `now_ms`
    ///
    /// Does nothing while idle. Frames reach the sink in recorded order.
    pub fn on_tick<S: ControlSink + ?Sized>(&mut self, now_ms: u64, sink: &mut S) -> TickOutcome {
        let Some(recording) = self.recording.as_ref() else {
            return TickOutcome::default();
        };
        if self.state != PlaybackState::Playing {
            return TickOutcome::default();
        }

        let elapsed = now_ms.saturating_sub(self.started_at_ms);
        let frames = recording.frames();
        let mut dispatched = 0;

        while let Some(frame) = frames.get(self.cursor) {
            if frame.offset_ms > elapsed {
                break;
            }
            sink.on_control_update(frame.pair());
            self.cursor += 1;
            dispatched += 1;
        }

        let finished = self.cursor >= frames.len();
        if finished {
            tracing::debug!(frames = frames.len(), elapsed, "playback finished");
            self.state = PlaybackState::Idle;
            self.recording = None;
        }

        TickOutcome {
            dispatched,
            finished,
        }
    }

    /// Cancel playback immediately; remaining frames are abandoned
    pub fn stop(&mut self) {
        if self.state == PlaybackState::Playing {
            tracing::debug!(cursor = self.cursor, "playback stopped");
        }
        self.state = PlaybackState::Idle;
        self.recording = None;
        self.cursor = 0;
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn is_playing(&self) -> bool {
        self.state == PlaybackState::Playing
    }

    /// Fraction of frames dispatched so far (0.0 when idle)
    pub fn progress(&self) -> f32 {
        match &self.recording {
            Some(recording) if !recording.is_empty() => self.cursor as f32 / recording.len() as f32,
            _ => 0.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::recorder::RecordedFrame;
    use tilt_motion::ControlPair;

    fn three_frames() -> Recording {
        Recording::new(vec![
            RecordedFrame::new(0, 0.2, 0.3),
            RecordedFrame::new(50, 0.5, 0.6),
            RecordedFrame::new(100, 0.8, 0.1),
        ])
    }

    #[test]
    fn test_plays_in_order_then_idles() {
        let mut scheduler = PlaybackScheduler::new();
        let mut received = Vec::new();
        let mut sink = |pair: ControlPair| received.push(pair);

        scheduler.play(three_frames(), 1000).unwrap();
        assert!(scheduler.is_playing());

        let mut now = 1000;
        while scheduler.is_playing() {
            now += DEFAULT_TICK_INTERVAL_MS;
            scheduler.on_tick(now, &mut sink);
        }
        assert!(now - 1000 >= 100);

        // Ticks after completion dispatch nothing
        for _ in 0..10 {
            now += DEFAULT_TICK_INTERVAL_MS;
            assert_eq!(scheduler.on_tick(now, &mut sink).dispatched, 0);
        }

        assert_eq!(
            received,
            vec![
                ControlPair::new(0.2, 0.3),
                ControlPair::new(0.5, 0.6),
                ControlPair::new(0.8, 0.1),
            ]
        );
        assert_eq!(scheduler.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_first_frame_due_immediately() {
        let mut scheduler = PlaybackScheduler::new();
        let mut count = 0;
        let mut sink = |_: ControlPair| count += 1;

        scheduler.play(three_frames(), 0).unwrap();
        let outcome = scheduler.on_tick(0, &mut sink);
        assert_eq!(outcome.dispatched, 1);
        assert!(!outcome.finished);
        assert_eq!(count, 1);
    }

    #[test]
    fn test_late_tick_catches_up() {
        let mut scheduler = PlaybackScheduler::new();
        let mut received = Vec::new();
        let mut sink = |pair: ControlPair| received.push(pair.pitch);

        scheduler.play(three_frames(), 0).unwrap();
        let outcome = scheduler.on_tick(250, &mut sink);
        assert_eq!(
            outcome,
            TickOutcome {
                dispatched: 3,
                finished: true
            }
        );
        assert_eq!(received, vec![0.2, 0.5, 0.8]);
        assert!(!scheduler.is_playing());
    }

    #[test]
    fn test_frame_not_released_early() {
        let mut scheduler = PlaybackScheduler::new();
        let mut received = Vec::new();
        let mut sink = |pair: ControlPair| received.push(pair.pitch);

        scheduler.play(three_frames(), 0).unwrap();
        assert_eq!(scheduler.on_tick(49, &mut sink).dispatched, 1);
        assert_eq!(scheduler.on_tick(50, &mut sink).dispatched, 1);
        assert_eq!(scheduler.on_tick(99, &mut sink).dispatched, 0);
        assert!(scheduler.is_playing());
        assert_eq!(received, vec![0.2, 0.5]);
    }

    #[test]
    fn test_empty_recording_is_noop() {
        let mut scheduler = PlaybackScheduler::new();
        let mut count = 0;
        let mut sink = |_: ControlPair| count += 1;

        let result = scheduler.play(Recording::new(Vec::new()), 0);
        assert_eq!(result, Err(PlaybackError::EmptyRecording));
        assert_eq!(scheduler.state(), PlaybackState::Idle);
        scheduler.on_tick(1000, &mut sink);
        assert_eq!(count, 0);
    }

    #[test]
    fn test_stop_prevents_further_dispatch() {
        let mut scheduler = PlaybackScheduler::new();
        let mut count = 0;
        let mut sink = |_: ControlPair| count += 1;

        scheduler.play(three_frames(), 0).unwrap();
        scheduler.on_tick(10, &mut sink);
        scheduler.stop();
        for t in [50, 100, 1000] {
            assert_eq!(scheduler.on_tick(t, &mut sink), TickOutcome::default());
        }
        assert_eq!(count, 1);
        assert!(!scheduler.is_playing());

        // Idempotent
        scheduler.stop();
        assert_eq!(scheduler.state(), PlaybackState::Idle);
    }

    #[test]
    fn test_replay_restarts_from_beginning() {
        let mut scheduler = PlaybackScheduler::new();
        let mut received = Vec::new();
        let mut sink = |pair: ControlPair| received.push(pair.pitch);

        scheduler.play(three_frames(), 0).unwrap();
        scheduler.on_tick(60, &mut sink);
        scheduler.play(three_frames(), 500).unwrap();
        scheduler.on_tick(500, &mut sink);
        assert_eq!(received, vec![0.2, 0.5, 0.2]);
    }

    #[test]
    fn test_progress() {
        let mut scheduler = PlaybackScheduler::new();
        let mut sink = |_: ControlPair| {};
        assert_eq!(scheduler.progress(), 0.0);

        scheduler.play(three_frames(), 0).unwrap();
        scheduler.on_tick(60, &mut sink);
        assert!((scheduler.progress() - 2.0 / 3.0).abs() < 1e-6);
    }

    #[test]
    fn test_identical_offsets_all_dispatched() {
        let recording = Recording::new(vec![
            RecordedFrame::new(20, 0.1, 0.1),
            RecordedFrame::new(20, 0.2, 0.2),
            RecordedFrame::new(20, 0.3, 0.3),
        ]);
        let mut scheduler = PlaybackScheduler::new();
        let mut received = Vec::new();
        let mut sink = |pair: ControlPair| received.push(pair.pitch);

        scheduler.play(recording, 0).unwrap();
        assert_eq!(scheduler.on_tick(16, &mut sink).dispatched, 0);
        assert_eq!(scheduler.on_tick(32, &mut sink).dispatched, 3);
        assert_eq!(received, vec![0.1, 0.2, 0.3]);
    }
}
