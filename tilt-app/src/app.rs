//! Application state shown by the terminal front end

use tilt_input::Mode;
use tilt_motion::{ControlPair, PipelineState};
use tilt_session::{PlaybackState, RecorderState, SessionEvent, SessionSnapshot};

/// Width of the pitch/volume bars in characters
const BAR_WIDTH: usize = 32;

/// Message type for status bar display
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageType {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl MessageType {
    fn prefix(&self) -> &'static str {
        match self {
            MessageType::Info => "",
            MessageType::Success => "ok: ",
            MessageType::Warning => "warning: ",
            MessageType::Error => "error: ",
        }
    }
}

/// Front-end state; only ever touched by the UI thread
#[derive(Debug, Default)]
pub struct App {
    pub snapshot: Option<SessionSnapshot>,
    /// Latest control pair as seen by the output sink
    pub control: ControlPair,
    pub mode: Mode,
    pub command_buffer: String,
    pub message: Option<String>,
    pub message_type: MessageType,
    pub should_quit: bool,
}

impl App {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quit(&mut self) {
        self.should_quit = true;
    }

    pub fn handle_session_event(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::StateUpdate(snapshot) => self.snapshot = Some(*snapshot),
            SessionEvent::Calibrated(baseline) => self.set_success(format!(
                "calibrated (rest {:+.2} {:+.2} {:+.2})",
                baseline.x, baseline.y, baseline.z
            )),
            SessionEvent::RecordingReady { frames, duration_ms } => self.set_success(format!(
                "recorded {} frames ({:.1}s)",
                frames,
                duration_ms as f64 / 1000.0
            )),
            SessionEvent::PlaybackFinished => self.set_message("playback finished"),
            SessionEvent::Error(e) => self.set_warning(e),
        }
    }

    /// Set a status message (default style)
    pub fn set_message(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Info;
    }

    pub fn set_success(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Success;
    }

    pub fn set_warning(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Warning;
    }

    pub fn set_error(&mut self, msg: impl Into<String>) {
        self.message = Some(msg.into());
        self.message_type = MessageType::Error;
    }

    pub fn clear_message(&mut self) {
        self.message = None;
    }

    /// One-line summary of the session state
    pub fn status_line(&self) -> String {
        let Some(snapshot) = &self.snapshot else {
            return format!("[{}] starting...", self.mode.display_name());
        };

        let session = match (snapshot.pipeline.state, snapshot.recorder, snapshot.playback) {
            (PipelineState::AwaitingCalibration, _, _) => {
                format!("CALIBRATING {:>3}% - hold still", snapshot.pipeline.calibration_progress)
            }
            (_, RecorderState::Armed, _) => format!(
                "REC {:>5.1}s {} frames",
                snapshot.recording_elapsed_ms as f64 / 1000.0,
                snapshot.recorded_frames
            ),
            (_, _, PlaybackState::Playing) => {
                format!("PLAY {:>3.0}%", snapshot.playback_progress * 100.0)
            }
            _ if snapshot.has_recording => format!("LIVE (take: {} frames)", snapshot.recorded_frames),
            _ => "LIVE".to_string(),
        };

        format!(
            "[{}] {} | dropped {}",
            self.mode.display_name(),
            session,
            snapshot.pipeline.rejected_samples
        )
    }

    /// Bottom line: command buffer while typing, otherwise the last message
    pub fn message_line(&self) -> String {
        if self.mode == Mode::Command {
            return format!(":{}", self.command_buffer);
        }
        match &self.message {
            Some(msg) => format!("{}{}", self.message_type.prefix(), msg),
            None => "? help  r rec  p play  s stop  x clear  c calibrate  ctrl+q quit".to_string(),
        }
    }
}

/// Horizontal gauge for a value in [0, 1]
pub fn bar(label: &str, value: f32) -> String {
    let value = if value.is_finite() { value.clamp(0.0, 1.0) } else { 0.0 };
    let filled = (value * BAR_WIDTH as f32).round() as usize;
    format!(
        "{label:<6} [{}{}] {:.2}",
        "#".repeat(filled),
        "-".repeat(BAR_WIDTH - filled),
        value
    )
}

pub const HELP_TEXT: &[&str] = &[
    "r          start/stop recording",
    "p, space   play/stop the recording",
    "s          stop playback",
    "x          clear the recording",
    "c          recalibrate (hold the device still)",
    ":          command mode (rec, stop, play, clear, calibrate, help, q)",
    "ctrl+q     quit",
    "",
    "esc, ?     close help",
];

#[cfg(test)]
mod tests {
    use super::*;
    use tilt_motion::{CalibrationBaseline, PipelineStatus};

    fn live_snapshot() -> SessionSnapshot {
        SessionSnapshot {
            pipeline: PipelineStatus {
                state: PipelineState::Live,
                calibration_progress: 100,
                baseline: Some(CalibrationBaseline {
                    x: 0.0,
                    y: -9.81,
                    z: 0.0,
                }),
                last_output: None,
                accepted_samples: 40,
                rejected_samples: 2,
            },
            recorder: RecorderState::Idle,
            has_recording: false,
            recorded_frames: 0,
            recording_elapsed_ms: 0,
            playback: PlaybackState::Idle,
            playback_progress: 0.0,
        }
    }

    #[test]
    fn test_bar() {
        assert_eq!(bar("pitch", 0.0), format!("pitch  [{}] 0.00", "-".repeat(BAR_WIDTH)));
        assert_eq!(bar("vol", 1.0), format!("vol    [{}] 1.00", "#".repeat(BAR_WIDTH)));
        assert!(bar("vol", 0.5).contains(&"#".repeat(BAR_WIDTH / 2)));
        assert_eq!(bar("vol", f32::NAN), bar("vol", 0.0));
        assert_eq!(bar("vol", 3.0), bar("vol", 1.0));
    }

    #[test]
    fn test_status_line_states() {
        let mut app = App::new();
        assert!(app.status_line().contains("starting"));

        let mut snapshot = live_snapshot();
        snapshot.pipeline.state = PipelineState::AwaitingCalibration;
        snapshot.pipeline.calibration_progress = 40;
        app.handle_session_event(SessionEvent::StateUpdate(Box::new(snapshot)));
        assert!(app.status_line().contains("CALIBRATING  40%"));

        let mut snapshot = live_snapshot();
        snapshot.recorder = RecorderState::Armed;
        snapshot.recording_elapsed_ms = 1500;
        snapshot.recorded_frames = 90;
        app.handle_session_event(SessionEvent::StateUpdate(Box::new(snapshot)));
        assert!(app.status_line().contains("REC   1.5s 90 frames"));

        let mut snapshot = live_snapshot();
        snapshot.playback = PlaybackState::Playing;
        snapshot.playback_progress = 0.5;
        app.handle_session_event(SessionEvent::StateUpdate(Box::new(snapshot)));
        assert!(app.status_line().contains("PLAY  50%"));

        app.handle_session_event(SessionEvent::StateUpdate(Box::new(live_snapshot())));
        assert_eq!(app.status_line(), "[NORMAL] LIVE | dropped 2");
    }

    #[test]
    fn test_event_messages() {
        let mut app = App::new();
        app.handle_session_event(SessionEvent::RecordingReady {
            frames: 120,
            duration_ms: 2000,
        });
        assert_eq!(app.message_line(), "ok: recorded 120 frames (2.0s)");

        app.handle_session_event(SessionEvent::Error("stop recording before playback".into()));
        assert_eq!(app.message_type, MessageType::Warning);
        assert_eq!(app.message_line(), "warning: stop recording before playback");

        app.clear_message();
        assert!(app.message_line().contains("ctrl+q"));
    }

    #[test]
    fn test_command_buffer_shown() {
        let mut app = App::new();
        app.set_message("hello");
        app.mode = Mode::Command;
        app.command_buffer = "pla".to_string();
        assert_eq!(app.message_line(), ":pla");
    }
}
