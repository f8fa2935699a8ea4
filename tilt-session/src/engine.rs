//! Session engine - routes samples, commands and ticks between components
//!
//! One thread owns an [`EngineState`]; everything else talks to it through
//! [`SessionCommand`]s and listens for [`SessionEvent`]s. Because samples,
//! commands and playback ticks are all handled on that thread, the components
//! never need locking and stopping playback takes effect before the next sink
//! call could happen.

use crate::clock::Clock;
use crate::playback::{PlaybackScheduler, PlaybackState};
use crate::recorder::{FrameRecorder, RecorderState};
use crossbeam_channel::{bounded, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tilt_motion::{
    CalibrationBaseline, ControlPair, ControlSink, MotionConfig, MotionPipeline, PipelineOutput,
    PipelineStatus, RawSample,
};

/// Commands sent to the session engine
#[derive(Debug, Clone)]
pub enum SessionCommand {
    /// One reading from the sensor source
    Sample(RawSample),
    /// Drop the baseline and calibrate again
    Recalibrate,
    StartRecording,
    StopRecording,
    ToggleRecording,
    /// Discard the recording (also cancels playback)
    ClearRecording,
    Play,
    StopPlayback,
    TogglePlayback,

    // System
    Shutdown,
}

/// Snapshot of the whole session for status display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SessionSnapshot {
    pub pipeline: PipelineStatus,
    pub recorder: RecorderState,
    pub has_recording: bool,
    /// Frames captured so far, or in the finished recording
    pub recorded_frames: usize,
    pub recording_elapsed_ms: u64,
    pub playback: PlaybackState,
    pub playback_progress: f32,
}

/// Events sent from the session engine
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// State update for UI rendering
    StateUpdate(Box<SessionSnapshot>),
    /// Calibration finished and the pipeline went live
    Calibrated(CalibrationBaseline),
    /// Recording stopped with frames available for playback
    RecordingReady { frames: usize, duration_ms: u64 },
    /// Playback dispatched its last frame
    PlaybackFinished,
    /// A command was refused or failed
    Error(String),
}

/// Forwards live output to the sink and to the recorder (which ignores it unless armed)
struct Fanout<'a, S: ?Sized> {
    sink: &'a mut S,
    recorder: &'a mut FrameRecorder,
    now_ms: u64,
}

impl<S: ControlSink + ?Sized> ControlSink for Fanout<'_, S> {
    fn on_control_update(&mut self, pair: ControlPair) {
        self.sink.on_control_update(pair);
        self.recorder.capture(pair, self.now_ms);
    }
}

/// Session state (held in the engine thread)
pub struct EngineState<S: ControlSink> {
    pipeline: MotionPipeline,
    recorder: FrameRecorder,
    playback: PlaybackScheduler,
    clock: Box<dyn Clock>,
    sink: S,
    events: Vec<SessionEvent>,
}

impl<S: ControlSink> EngineState<S> {
    pub fn new(config: MotionConfig, clock: Box<dyn Clock>, sink: S) -> Self {
        Self {
            pipeline: MotionPipeline::new(config),
            recorder: FrameRecorder::new(),
            playback: PlaybackScheduler::new(),
            clock,
            sink,
            events: Vec::new(),
        }
    }

    /// Process a command
    pub fn handle_command(&mut self, cmd: SessionCommand) {
        match cmd {
            SessionCommand::Sample(sample) => self.handle_sample(&sample),
            SessionCommand::Recalibrate => self.pipeline.recalibrate(),
            SessionCommand::StartRecording => self.start_recording(),
            SessionCommand::StopRecording => self.stop_recording(),
            SessionCommand::ToggleRecording => {
                if self.recorder.is_armed() {
                    self.stop_recording();
                } else {
                    self.start_recording();
                }
            }
            SessionCommand::ClearRecording => {
                self.playback.stop();
                self.recorder.clear();
            }
            SessionCommand::Play => self.play(),
            SessionCommand::StopPlayback => self.playback.stop(),
            SessionCommand::TogglePlayback => {
                if self.playback.is_playing() {
                    self.playback.stop();
                } else {
                    self.play();
                }
            }
            SessionCommand::Shutdown => {
                self.playback.stop();
                self.stop_recording();
            }
        }
    }

    /// Periodic timer entry point; drives playback
    pub fn on_tick(&mut self) {
        if !self.playback.is_playing() {
            return;
        }
        let now = self.clock.now_ms();
        let outcome = self.playback.on_tick(now, &mut self.sink);
        if outcome.finished {
            self.events.push(SessionEvent::PlaybackFinished);
        }
    }

    fn handle_sample(&mut self, sample: &RawSample) {
        // Live output is muted while a recording plays into the same sink
        let output = if self.playback.is_playing() {
            self.pipeline.on_sample(sample, &mut |_: ControlPair| {})
        } else {
            let mut fanout = Fanout {
                sink: &mut self.sink,
                recorder: &mut self.recorder,
                now_ms: self.clock.now_ms(),
            };
            self.pipeline.on_sample(sample, &mut fanout)
        };

        if let Some(PipelineOutput::Calibrated(baseline)) = output {
            tracing::info!(?baseline, "calibrated");
            self.events.push(SessionEvent::Calibrated(baseline));
        }
    }

    fn start_recording(&mut self) {
        if self.playback.is_playing() {
            self.reject("stop playback before recording");
            return;
        }
        self.recorder.arm(self.clock.now_ms());
    }

    fn stop_recording(&mut self) {
        if !self.recorder.is_armed() {
            return;
        }
        if let Some(recording) = self.recorder.disarm() {
            tracing::info!(frames = recording.len(), duration_ms = recording.duration_ms(), "recording ready");
            self.events.push(SessionEvent::RecordingReady {
                frames: recording.len(),
                duration_ms: recording.duration_ms(),
            });
        }
    }

    fn play(&mut self) {
        if self.recorder.is_armed() {
            self.reject("stop recording before playback");
            return;
        }
        let Some(recording) = self.recorder.recording().cloned() else {
            tracing::debug!("nothing to play");
            return;
        };
        if let Err(e) = self.playback.play(recording, self.clock.now_ms()) {
            tracing::debug!(error = %e, "playback not started");
        }
    }

    fn reject(&mut self, reason: &str) {
        tracing::warn!(reason, "command rejected");
        self.events.push(SessionEvent::Error(reason.to_string()));
    }

    /// Take events produced since the last call
    pub fn drain_events(&mut self) -> Vec<SessionEvent> {
        std::mem::take(&mut self.events)
    }

    /// Generate current state for UI
    pub fn snapshot(&self) -> SessionSnapshot {
        let now = self.clock.now_ms();
        SessionSnapshot {
            pipeline: self.pipeline.status(),
            recorder: self.recorder.state(),
            has_recording: self.recorder.has_recording(),
            recorded_frames: self.recorder.frame_count(),
            recording_elapsed_ms: self.recorder.elapsed_ms(now),
            playback: self.playback.state(),
            playback_progress: self.playback.progress(),
        }
    }

    pub fn get_state(&self) -> SessionEvent {
        SessionEvent::StateUpdate(Box::new(self.snapshot()))
    }

    pub fn is_playing(&self) -> bool {
        self.playback.is_playing()
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }
}

/// Handle to communicate with the session engine
pub struct SessionEngine {
    /// Send commands to the engine thread
    pub command_tx: Sender<SessionCommand>,
    /// Receive events from the engine thread
    pub event_rx: Receiver<SessionEvent>,
    /// Shutdown flag
    shutdown: Arc<AtomicBool>,
}

impl SessionEngine {
    /// Create channels for engine communication
    /// Buffer size of 1024 absorbs sensor bursts without blocking the source
    pub fn create_channels() -> (
        Sender<SessionCommand>,
        Receiver<SessionCommand>,
        Sender<SessionEvent>,
        Receiver<SessionEvent>,
    ) {
        let (cmd_tx, cmd_rx) = bounded(1024);
        let (evt_tx, evt_rx) = bounded(1024);
        (cmd_tx, cmd_rx, evt_tx, evt_rx)
    }

    /// Create a new engine handle
    pub fn new(command_tx: Sender<SessionCommand>, event_rx: Receiver<SessionEvent>) -> Self {
        Self {
            command_tx,
            event_rx,
            shutdown: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Send a command to the engine; dropped if the queue is full
    pub fn send(&self, cmd: SessionCommand) {
        let _ = self.command_tx.try_send(cmd);
    }

    /// Check if shutdown was requested
    pub fn is_shutdown(&self) -> bool {
        self.shutdown.load(Ordering::Relaxed)
    }

    /// Request shutdown
    ///
    /// Waits for queue space instead of dropping the request; returns at once
    /// if the engine thread is already gone.
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
        let _ = self.command_tx.send(SessionCommand::Shutdown);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use tilt_motion::DEFAULT_CALIBRATION_SAMPLES;

    const REST: RawSample = RawSample {
        x: Some(0.0),
        y: Some(-9.81),
        z: Some(0.0),
    };

    type Collected = Vec<ControlPair>;

    fn engine() -> (EngineState<impl FnMut(ControlPair)>, ManualClock, std::rc::Rc<std::cell::RefCell<Collected>>) {
        let clock = ManualClock::new();
        let received = std::rc::Rc::new(std::cell::RefCell::new(Vec::new()));
        let sink_store = received.clone();
        let sink = move |pair: ControlPair| sink_store.borrow_mut().push(pair);
        let state = EngineState::new(MotionConfig::default(), Box::new(clock.clone()), sink);
        (state, clock, received)
    }

    fn calibrate<S: ControlSink>(state: &mut EngineState<S>, clock: &ManualClock) {
        for _ in 0..DEFAULT_CALIBRATION_SAMPLES {
            clock.advance(16);
            state.handle_command(SessionCommand::Sample(REST));
        }
    }

    #[test]
    fn test_calibration_event() {
        let (mut state, clock, received) = engine();
        calibrate(&mut state, &clock);
        let events = state.drain_events();
        assert!(matches!(events.as_slice(), [SessionEvent::Calibrated(_)]));
        assert!(received.borrow().is_empty());
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_record_then_play() {
        let (mut state, clock, received) = engine();
        calibrate(&mut state, &clock);

        state.handle_command(SessionCommand::StartRecording);
        for _ in 0..5 {
            clock.advance(16);
            state.handle_command(SessionCommand::Sample(REST));
        }
        state.handle_command(SessionCommand::StopRecording);
        let snapshot = state.snapshot();
        assert!(snapshot.has_recording);
        assert_eq!(snapshot.recorded_frames, 5);
        assert!(state.drain_events().iter().any(|e| matches!(
            e,
            SessionEvent::RecordingReady { frames: 5, duration_ms: 80 }
        )));

        let live: Vec<ControlPair> = received.borrow_mut().drain(..).collect();
        assert_eq!(live.len(), 5);

        state.handle_command(SessionCommand::Play);
        assert!(state.is_playing());
        while state.is_playing() {
            clock.advance(16);
            state.on_tick();
        }
        assert_eq!(*received.borrow(), live);
        assert!(state
            .drain_events()
            .iter()
            .any(|e| matches!(e, SessionEvent::PlaybackFinished)));
    }

    #[test]
    fn test_cannot_record_while_playing() {
        let (mut state, clock, _) = engine();
        calibrate(&mut state, &clock);
        state.handle_command(SessionCommand::StartRecording);
        clock.advance(16);
        state.handle_command(SessionCommand::Sample(REST));
        clock.advance(500);
        state.handle_command(SessionCommand::Sample(REST));
        state.handle_command(SessionCommand::StopRecording);
        state.drain_events();

        state.handle_command(SessionCommand::Play);
        state.handle_command(SessionCommand::StartRecording);
        assert_eq!(state.snapshot().recorder, RecorderState::Idle);
        assert!(state.snapshot().has_recording);
        assert!(matches!(state.drain_events().as_slice(), [SessionEvent::Error(_)]));
    }

    #[test]
    fn test_cannot_play_while_recording() {
        let (mut state, clock, _) = engine();
        calibrate(&mut state, &clock);
        state.handle_command(SessionCommand::StartRecording);
        state.handle_command(SessionCommand::Play);
        assert!(!state.is_playing());
        assert!(matches!(state.drain_events().last(), Some(SessionEvent::Error(_))));
    }

    #[test]
    fn test_play_without_recording_is_noop() {
        let (mut state, clock, received) = engine();
        state.handle_command(SessionCommand::Play);
        clock.advance(100);
        state.on_tick();
        assert!(!state.is_playing());
        assert!(received.borrow().is_empty());
        assert!(state.drain_events().is_empty());
    }

    #[test]
    fn test_clear_cancels_playback() {
        let (mut state, clock, received) = engine();
        calibrate(&mut state, &clock);
        state.handle_command(SessionCommand::StartRecording);
        for _ in 0..10 {
            clock.advance(16);
            state.handle_command(SessionCommand::Sample(REST));
        }
        state.handle_command(SessionCommand::StopRecording);
        received.borrow_mut().clear();

        state.handle_command(SessionCommand::Play);
        clock.advance(40);
        state.on_tick();
        let dispatched = received.borrow().len();
        assert!(dispatched > 0);

        state.handle_command(SessionCommand::ClearRecording);
        assert!(!state.is_playing());
        assert!(!state.snapshot().has_recording);
        for _ in 0..20 {
            clock.advance(16);
            state.on_tick();
        }
        assert_eq!(received.borrow().len(), dispatched);
    }

    #[test]
    fn test_live_output_muted_during_playback() {
        let (mut state, clock, received) = engine();
        calibrate(&mut state, &clock);
        state.handle_command(SessionCommand::StartRecording);
        clock.advance(16);
        state.handle_command(SessionCommand::Sample(REST));
        clock.advance(1000);
        state.handle_command(SessionCommand::Sample(REST));
        state.handle_command(SessionCommand::StopRecording);
        received.borrow_mut().clear();

        state.handle_command(SessionCommand::Play);
        for _ in 0..5 {
            state.handle_command(SessionCommand::Sample(REST));
        }
        assert!(received.borrow().is_empty());
    }

    #[test]
    fn test_toggles() {
        let (mut state, clock, _) = engine();
        calibrate(&mut state, &clock);

        state.handle_command(SessionCommand::ToggleRecording);
        assert_eq!(state.snapshot().recorder, RecorderState::Armed);
        clock.advance(16);
        state.handle_command(SessionCommand::Sample(REST));
        state.handle_command(SessionCommand::ToggleRecording);
        assert_eq!(state.snapshot().recorder, RecorderState::Idle);

        state.handle_command(SessionCommand::TogglePlayback);
        assert!(state.is_playing());
        state.handle_command(SessionCommand::TogglePlayback);
        assert!(!state.is_playing());
    }

    #[test]
    fn test_recalibrate() {
        let (mut state, clock, _) = engine();
        calibrate(&mut state, &clock);
        assert!(state.snapshot().pipeline.baseline.is_some());

        state.handle_command(SessionCommand::Recalibrate);
        let snapshot = state.snapshot();
        assert!(snapshot.pipeline.baseline.is_none());
        assert_eq!(snapshot.pipeline.calibration_progress, 0);
    }

    #[test]
    fn test_shutdown_finishes_recording() {
        let (mut state, clock, _) = engine();
        calibrate(&mut state, &clock);
        state.handle_command(SessionCommand::StartRecording);
        clock.advance(16);
        state.handle_command(SessionCommand::Sample(REST));
        state.handle_command(SessionCommand::Shutdown);
        assert_eq!(state.snapshot().recorder, RecorderState::Idle);
        assert!(state.snapshot().has_recording);
    }

    #[test]
    fn test_engine_handle() {
        let (cmd_tx, cmd_rx, _evt_tx, evt_rx) = SessionEngine::create_channels();
        let engine = SessionEngine::new(cmd_tx, evt_rx);
        engine.send(SessionCommand::Play);
        assert!(matches!(cmd_rx.try_recv(), Ok(SessionCommand::Play)));

        engine.shutdown();
        assert!(engine.is_shutdown());
        assert!(matches!(cmd_rx.try_recv(), Ok(SessionCommand::Shutdown)));
    }

    #[test]
    fn test_shutdown_after_engine_thread_gone() {
        let (cmd_tx, cmd_rx, _evt_tx, evt_rx) = SessionEngine::create_channels();
        let engine = SessionEngine::new(cmd_tx, evt_rx);
        drop(cmd_rx);

        // Returns instead of waiting on a queue nobody drains
        engine.shutdown();
        assert!(engine.is_shutdown());
    }
}
