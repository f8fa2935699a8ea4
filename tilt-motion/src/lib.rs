//! Motion signal processing for Tilt
//!
//! Turns noisy accelerometer readings into two bounded control signals:
//! - Calibrator: gravity/rest baseline from the first samples of a session
//! - Smoothing: one-pole exponential low-pass per channel
//! - Tracker: spring-damper integrator that keeps each control in [0, 1]
//! - Pipeline: wires the stages together and emits (pitch, volume) pairs

mod calibration;
mod pipeline;
mod sample;
mod smoothing;
mod tracker;

pub use calibration::{CalibrationBaseline, CalibrationStatus, Calibrator, DEFAULT_CALIBRATION_SAMPLES};
pub use pipeline::{MotionConfig, MotionPipeline, PipelineOutput, PipelineState, PipelineStatus};
pub use sample::{Acceleration, Axis, ControlPair, ControlSink, MotionError, RawSample};
pub use smoothing::SmoothingFilter;
pub use tracker::{PositionState, PositionTracker, TrackerParams, CENTER_POSITION};
