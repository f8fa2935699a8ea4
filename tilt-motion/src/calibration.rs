//! Gravity baseline calibration
//!
//! Averages the first accepted samples of a session into a rest vector that is
//! subtracted from every later sample, leaving motion-only acceleration.

use crate::sample::{Acceleration, MotionError, RawSample};

/// Number of samples averaged into the baseline (~0.5s at a 60Hz sensor rate)
pub const DEFAULT_CALIBRATION_SAMPLES: usize = 30;

/// Rest acceleration measured during calibration
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct CalibrationBaseline {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl CalibrationBaseline {
    /// Remove the baseline from a validated sample
    pub fn correct(&self, accel: Acceleration) -> Acceleration {
        accel - Acceleration::new(self.x, self.y, self.z)
    }
}

/// Result of submitting a sample to the calibrator
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CalibrationStatus {
    /// Still collecting; progress in percent (0-100)
    Calibrating { progress: u8 },
    /// Baseline is fixed for the rest of the session
    Complete(CalibrationBaseline),
}

/// Collects rest samples until a baseline can be computed
#[derive(Debug, Clone)]
pub struct Calibrator {
    required: usize,
    count: usize,
    // f64 sums keep the mean exact enough over long calibration windows
    sum: [f64; 3],
    baseline: Option<CalibrationBaseline>,
}

impl Default for Calibrator {
    fn default() -> Self {
        Self::new(DEFAULT_CALIBRATION_SAMPLES)
    }
}

impl Calibrator {
    /// Create a calibrator that needs `required` accepted samples (at least 1)
    pub fn new(required: usize) -> Self {
        Self {
            required: required.max(1),
            count: 0,
            sum: [0.0; 3],
            baseline: None,
        }
    }

    /// Submit a raw sample
    ///
    /// Invalid samples are rejected without advancing calibration. Once the
    /// baseline exists, further samples are ignored and the same baseline is
    /// reported.
    pub fn submit(&mut self, sample: &RawSample) -> Result<CalibrationStatus, MotionError> {
        let accel = sample.validate()?;

        if let Some(baseline) = self.baseline {
            return Ok(CalibrationStatus::Complete(baseline));
        }

        self.sum[0] += accel.x as f64;
        self.sum[1] += accel.y as f64;
        self.sum[2] += accel.z as f64;
        self.count += 1;

        if self.count >= self.required {
            let n = self.count as f64;
            let baseline = CalibrationBaseline {
                x: (self.sum[0] / n) as f32,
                y: (self.sum[1] / n) as f32,
                z: (self.sum[2] / n) as f32,
            };
            self.baseline = Some(baseline);
            tracing::debug!(?baseline, samples = self.count, "calibration complete");
            Ok(CalibrationStatus::Complete(baseline))
        } else {
            Ok(CalibrationStatus::Calibrating {
                progress: self.progress(),
            })
        }
    }

    /// Calibration progress in percent
    pub fn progress(&self) -> u8 {
        ((self.count * 100) / self.required).min(100) as u8
    }

    /// Baseline, once calibration has completed
    pub fn baseline(&self) -> Option<CalibrationBaseline> {
        self.baseline
    }

    pub fn is_complete(&self) -> bool {
        self.baseline.is_some()
    }

    /// Number of accepted samples so far
    pub fn sample_count(&self) -> usize {
        self.count
    }

    /// Number of samples needed for a baseline
    pub fn required_samples(&self) -> usize {
        self.required
    }

    /// Discard all accumulated samples and the baseline
    pub fn reset(&mut self) {
        self.count = 0;
        self.sum = [0.0; 3];
        self.baseline = None;
    }
}
