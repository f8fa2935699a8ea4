//! Motion pipeline - orchestrates calibration, smoothing and tracking
//!
//! Per accepted sample:
//! 1. Calibration gate: the first samples build the gravity baseline, nothing is emitted
//! 2. Baseline removal: rest acceleration is subtracted component-wise
//! 3. Smoothing: lateral (x) and vertical (y) channels each through their own EMA
//! 4. Tracking: each smoothed channel drives its own spring-damper position
//!
//! Pitch follows the vertical channel, volume follows the lateral channel.

use crate::calibration::{CalibrationBaseline, CalibrationStatus, Calibrator, DEFAULT_CALIBRATION_SAMPLES};
use crate::sample::{ControlPair, ControlSink, MotionError, RawSample};
use crate::smoothing::SmoothingFilter;
use crate::tracker::{PositionTracker, TrackerParams};

/// Configuration for the whole motion pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct MotionConfig {
    /// Accepted samples averaged into the gravity baseline
    pub calibration_samples: usize,
    /// EMA coefficient for the vertical (pitch) channel
    pub vertical_alpha: f32,
    /// EMA coefficient for the lateral (volume) channel
    pub lateral_alpha: f32,
    /// Integrator tuning shared by both axes
    pub tracker: TrackerParams,
    /// Nominal sensor rate; the integrator steps by `1 / sample_rate_hz`
    /// regardless of actual arrival jitter
    pub sample_rate_hz: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
            vertical_alpha: 0.2,
            lateral_alpha: 0.3,
            tracker: TrackerParams::default(),
            sample_rate_hz: 60.0,
        }
    }
}

impl MotionConfig {
    /// Nominal inter-sample interval in seconds
    pub fn dt(&self) -> f32 {
        if self.sample_rate_hz.is_finite() && self.sample_rate_hz > 0.0 {
            1.0 / self.sample_rate_hz
        } else {
            1.0 / 60.0
        }
    }
}

/// Whether the pipeline is allowed to emit control values
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PipelineState {
    #[default]
    AwaitingCalibration,
    Live,
}

/// What a single processed sample produced
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PipelineOutput {
    /// Sample went into calibration; progress in percent
    Calibrating { progress: u8 },
    /// This sample completed calibration; no control pair yet
    Calibrated(CalibrationBaseline),
    /// Live control values
    Control(ControlPair),
}

/// Read-only view of the pipeline for status display
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PipelineStatus {
    pub state: PipelineState,
    pub calibration_progress: u8,
    pub baseline: Option<CalibrationBaseline>,
    pub last_output: Option<ControlPair>,
    pub accepted_samples: u64,
    pub rejected_samples: u64,
}

/// Complete motion pipeline processor
pub struct MotionPipeline {
    config: MotionConfig,
    state: PipelineState,
    calibrator: Calibrator,
    vertical_filter: SmoothingFilter,
    lateral_filter: SmoothingFilter,
    pitch_tracker: PositionTracker,
    volume_tracker: PositionTracker,
    last_output: Option<ControlPair>,
    accepted_samples: u64,
    rejected_samples: u64,
}

impl Default for MotionPipeline {
    fn default() -> Self {
        Self::new(MotionConfig::default())
    }
}

impl MotionPipeline {
    pub fn new(config: MotionConfig) -> Self {
        Self {
            state: PipelineState::AwaitingCalibration,
            calibrator: Calibrator::new(config.calibration_samples),
            vertical_filter: SmoothingFilter::new(config.vertical_alpha),
            lateral_filter: SmoothingFilter::new(config.lateral_alpha),
            pitch_tracker: PositionTracker::new(config.tracker),
            volume_tracker: PositionTracker::new(config.tracker),
            config,
            last_output: None,
            accepted_samples: 0,
            rejected_samples: 0,
        }
    }

    /// Process one raw sample through every stage
    ///
    /// Invalid samples, and live samples whose baseline-corrected vector is not
    /// finite, are reported as errors and leave all state untouched.
    pub fn process(&mut self, sample: &RawSample) -> Result<PipelineOutput, MotionError> {
        let baseline = self.calibrator.baseline();
        let checked = sample.validate().and_then(|accel| match baseline {
            // Extreme finite readings can still overflow once the baseline is removed
            Some(baseline) => baseline.correct(accel).finite(),
            None => Ok(accel),
        });
        let motion = match checked {
            Ok(motion) => motion,
            Err(e) => {
                self.rejected_samples += 1;
                return Err(e);
            }
        };
        self.accepted_samples += 1;

        // Correction only starts once the full baseline exists
        if baseline.is_none() {
            return Ok(match self.calibrator.submit(sample)? {
                CalibrationStatus::Calibrating { progress } => PipelineOutput::Calibrating { progress },
                CalibrationStatus::Complete(baseline) => {
                    self.state = PipelineState::Live;
                    tracing::debug!("motion pipeline live");
                    PipelineOutput::Calibrated(baseline)
                }
            });
        }

        let dt = self.config.dt();

        let vertical = self.vertical_filter.apply(motion.y);
        let lateral = self.lateral_filter.apply(motion.x);

        let pair = ControlPair {
            pitch: self.pitch_tracker.integrate(vertical, dt),
            volume: self.volume_tracker.integrate(lateral, dt),
        };
        self.last_output = Some(pair);
        Ok(PipelineOutput::Control(pair))
    }

    /// Sensor-source entry point: process a sample and emit to `sink` when live
    ///
    /// Malformed samples are dropped; the next sample supersedes them.
    pub fn on_sample<S: ControlSink + ?Sized>(
        &mut self,
        sample: &RawSample,
        sink: &mut S,
    ) -> Option<PipelineOutput> {
        match self.process(sample) {
            Ok(output) => {
                if let PipelineOutput::Control(pair) = output {
                    sink.on_control_update(pair);
                }
                Some(output)
            }
            Err(e) => {
                tracing::trace!(error = %e, "dropping sample");
                None
            }
        }
    }

    /// Throw away the baseline and all filter/tracker state and calibrate again
    pub fn recalibrate(&mut self) {
        self.calibrator.reset();
        self.vertical_filter.reset();
        self.lateral_filter.reset();
        self.pitch_tracker.reset();
        self.volume_tracker.reset();
        self.state = PipelineState::AwaitingCalibration;
        self.last_output = None;
        tracing::debug!("motion pipeline recalibrating");
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    pub fn is_live(&self) -> bool {
        self.state == PipelineState::Live
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn status(&self) -> PipelineStatus {
        PipelineStatus {
            state: self.state,
            calibration_progress: self.calibrator.progress(),
            baseline: self.calibrator.baseline(),
            last_output: self.last_output,
            accepted_samples: self.accepted_samples,
            rejected_samples: self.rejected_samples,
        }
    }
}
