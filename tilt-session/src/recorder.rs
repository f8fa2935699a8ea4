//! Frame recorder - captures timestamped control pairs while armed

use std::sync::Arc;
use tilt_motion::ControlPair;

/// One captured control pair
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RecordedFrame {
    /// Milliseconds since the recording was armed
    pub offset_ms: u64,
    pub pitch: f32,
    pub volume: f32,
}

impl RecordedFrame {
    pub fn new(offset_ms: u64, pitch: f32, volume: f32) -> Self {
        Self {
            offset_ms,
            pitch,
            volume,
        }
    }

    pub fn pair(&self) -> ControlPair {
        ControlPair::new(self.pitch, self.volume)
    }
}

/// Finished, immutable recording
///
/// Cloning is cheap (shared frames), so the playback scheduler can hold the
/// same frames the recorder owns without copying them.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    frames: Arc<[RecordedFrame]>,
}

impl Recording {
    /// Build a recording from frames in recorded order
    pub fn new(frames: Vec<RecordedFrame>) -> Self {
        Self {
            frames: frames.into(),
        }
    }

    pub fn frames(&self) -> &[RecordedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Offset of the last frame
    pub fn duration_ms(&self) -> u64 {
        self.frames.last().map_or(0, |f| f.offset_ms)
    }
}

impl From<Vec<RecordedFrame>> for Recording {
    fn from(frames: Vec<RecordedFrame>) -> Self {
        Self::new(frames)
    }
}

/// Recorder state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecorderState {
    #[default]
    Idle,
    Armed,
}

/// Captures the pipeline's output into a replayable recording
#[derive(Debug, Default)]
pub struct FrameRecorder {
    state: RecorderState,
    frames: Vec<RecordedFrame>,
    recording: Option<Recording>,
    started_at_ms: u64,
}

impl FrameRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a fresh recording at `now_ms`, discarding any previous one
    pub fn arm(&mut self, now_ms: u64) {
        self.frames.clear();
        self.recording = None;
        self.started_at_ms = now_ms;
        self.state = RecorderState::Armed;
        tracing::debug!(now_ms, "recorder armed");
    }

    /// Append a frame if armed; otherwise a no-op
    pub fn capture(&mut self, pair: ControlPair, now_ms: u64) {
        if self.state != RecorderState::Armed {
            return;
        }

        let mut offset_ms = now_ms.saturating_sub(self.started_at_ms);
        if let Some(last) = self.frames.last() {
            offset_ms = offset_ms.max(last.offset_ms);
        }
        self.frames.push(RecordedFrame::new(offset_ms, pair.pitch, pair.volume));
    }

    /// Stop capturing; a non-empty buffer becomes the available recording
    pub fn disarm(&mut self) -> Option<Recording> {
        if self.state != RecorderState::Armed {
            return self.recording.clone();
        }
        self.state = RecorderState::Idle;

        if self.frames.is_empty() {
            self.recording = None;
        } else {
            self.recording = Some(Recording::new(std::mem::take(&mut self.frames)));
        }
        tracing::debug!(
            frames = self.recording.as_ref().map_or(0, Recording::len),
            "recorder disarmed"
        );
        self.recording.clone()
    }

    /// Drop every captured frame and any finished recording
    pub fn clear(&mut self) {
        self.frames.clear();
        self.recording = None;
    }

    pub fn state(&self) -> RecorderState {
        self.state
    }

    pub fn is_armed(&self) -> bool {
        self.state == RecorderState::Armed
    }

    pub fn has_recording(&self) -> bool {
        self.recording.is_some()
    }

    pub fn recording(&self) -> Option<&Recording> {
        self.recording.as_ref()
    }

    /// Frames captured so far (while armed) or in the finished recording
    pub fn frame_count(&self) -> usize {
        match (&self.state, &self.recording) {
            (RecorderState::Armed, _) => self.frames.len(),
            (RecorderState::Idle, Some(recording)) => recording.len(),
            (RecorderState::Idle, None) => 0,
        }
    }

    /// Time since arming, 0 when idle
    pub fn elapsed_ms(&self, now_ms: u64) -> u64 {
        if self.is_armed() {
            now_ms.saturating_sub(self.started_at_ms)
        } else {
            0
        }
    }
}
