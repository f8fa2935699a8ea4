//! Performance session for Tilt - recording, playback and the engine thread
//!
//! - Recorder: captures timestamped control pairs while armed
//! - Playback: replays a recording against wall-clock time
//! - Engine: owns the pipeline, recorder and scheduler on one thread
//! - Config: persisted tuning parameters

mod clock;
mod config;
mod engine;
mod playback;
mod recorder;

pub use clock::{Clock, ManualClock, MonotonicClock};
pub use config::{Config, ConfigError};
pub use engine::{EngineState, SessionCommand, SessionEngine, SessionEvent, SessionSnapshot};
pub use playback::{PlaybackError, PlaybackScheduler, PlaybackState, TickOutcome, DEFAULT_TICK_INTERVAL_MS};
pub use recorder::{FrameRecorder, RecordedFrame, RecorderState, Recording};
