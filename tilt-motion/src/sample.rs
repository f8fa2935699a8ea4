//! Sensor samples, control output and the sink they flow into

use std::fmt;
use thiserror::Error;

/// Errors raised while processing motion input
#[derive(Error, Debug, Clone, Copy, PartialEq)]
pub enum MotionError {
    /// A component was missing (`value == None`) or not a finite number
    #[error("invalid sample: {axis} component is {}", describe(.value))]
    InvalidSample { axis: Axis, value: Option<f32> },
}

fn describe(value: &Option<f32>) -> String {
    match value {
        Some(v) => format!("non-finite ({v})"),
        None => "missing".to_string(),
    }
}

/// Accelerometer axis
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Axis {
    X,
    Y,
    Z,
}

impl fmt::Display for Axis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Axis::X => "x",
            Axis::Y => "y",
            Axis::Z => "z",
        };
        f.write_str(name)
    }
}

/// Raw acceleration reading as delivered by the sensor source (gravity included)
///
/// Sources are allowed to omit components; such samples are rejected by
/// [`RawSample::validate`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct RawSample {
    pub x: Option<f32>,
    pub y: Option<f32>,
    pub z: Option<f32>,
}

impl RawSample {
    /// Sample with all three components present
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self {
            x: Some(x),
            y: Some(y),
            z: Some(z),
        }
    }

    /// Check every component and return the finite acceleration vector
    pub fn validate(&self) -> Result<Acceleration, MotionError> {
        Ok(Acceleration {
            x: component(Axis::X, self.x)?,
            y: component(Axis::Y, self.y)?,
            z: component(Axis::Z, self.z)?,
        })
    }
}

fn component(axis: Axis, value: Option<f32>) -> Result<f32, MotionError> {
    match value {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(MotionError::InvalidSample { axis, value }),
    }
}

/// Validated acceleration vector in m/s²
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Acceleration {
    pub x: f32,
    pub y: f32,
    pub z: f32,
}

impl Acceleration {
    pub fn new(x: f32, y: f32, z: f32) -> Self {
        Self { x, y, z }
    }

    /// Reject a vector that picked up a non-finite component along the way
    pub fn finite(self) -> Result<Self, MotionError> {
        RawSample::new(self.x, self.y, self.z).validate()
    }
}

impl std::ops::Sub for Acceleration {
    type Output = Acceleration;

    fn sub(self, rhs: Acceleration) -> Acceleration {
        Acceleration {
            x: self.x - rhs.x,
            y: self.y - rhs.y,
            z: self.z - rhs.z,
        }
    }
}

/// One pair of normalized control values, both in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ControlPair {
    pub pitch: f32,
    pub volume: f32,
}

impl ControlPair {
    pub fn new(pitch: f32, volume: f32) -> Self {
        Self { pitch, volume }
    }
}

impl Default for ControlPair {
    fn default() -> Self {
        Self::new(0.5, 0.5)
    }
}

/// Receiver of control updates (audio parameter setter, visualizer, recorder)
///
/// Live pipeline output and playback share this interface, so a sink cannot
/// tell a performance from its replay.
pub trait ControlSink {
    fn on_control_update(&mut self, pair: ControlPair);
}

impl<F> ControlSink for F
where
    F: FnMut(ControlPair),
{
    fn on_control_update(&mut self, pair: ControlPair) {
        self(pair)
    }
}
