//! Sensor sources feeding the session engine
//!
//! Either a recorded sample file (`x,y,z` per line) or a synthetic device that
//! rests under gravity with a slow sway and the occasional dropped reading.

use anyhow::{bail, Context};
use std::fs;
use std::path::Path;
use tilt_motion::RawSample;

/// Standard gravity, m/s^2
const GRAVITY: f32 = 9.81;

/// A stream of raw accelerometer readings
pub trait MotionSource: Send {
    /// Next reading, or `None` once the source is exhausted
    fn next_sample(&mut self) -> Option<RawSample>;
}

/// Replays samples parsed from a text file
#[derive(Debug)]
pub struct FileSource {
    samples: Vec<RawSample>,
    cursor: usize,
}

impl FileSource {
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let content =
            fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))?;
        let samples =
            parse_samples(&content).with_context(|| format!("parsing {}", path.display()))?;
        let source = Self::from_samples(samples);
        if source.is_empty() {
            bail!("{} contains no samples", path.display());
        }
        tracing::info!(path = %path.display(), samples = source.len(), "loaded sample file");
        Ok(source)
    }

    pub fn from_samples(samples: Vec<RawSample>) -> Self {
        Self { samples, cursor: 0 }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

impl MotionSource for FileSource {
    fn next_sample(&mut self) -> Option<RawSample> {
        let sample = self.samples.get(self.cursor).copied()?;
        self.cursor += 1;
        Some(sample)
    }
}

/// Parse `x,y,z` lines; a blank or `null` field is a missing component
///
/// Blank lines and `#` comments are skipped. Non-finite numbers such as `NaN`
/// are kept so the pipeline can reject them the way it rejects bad hardware
/// readings.
pub fn parse_samples(content: &str) -> anyhow::Result<Vec<RawSample>> {
    let mut samples = Vec::new();

    for (index, line) in content.lines().enumerate() {
        let line = line.split('#').next().unwrap_or("").trim();
        if line.is_empty() {
            continue;
        }

        let fields: Vec<&str> = line.split(',').collect();
        let [x, y, z] = fields.as_slice() else {
            bail!("line {}: expected 3 fields, found {}", index + 1, fields.len());
        };

        samples.push(RawSample {
            x: parse_component(x).with_context(|| format!("line {}", index + 1))?,
            y: parse_component(y).with_context(|| format!("line {}", index + 1))?,
            z: parse_component(z).with_context(|| format!("line {}", index + 1))?,
        });
    }

    Ok(samples)
}

fn parse_component(field: &str) -> anyhow::Result<Option<f32>> {
    let field = field.trim();
    if field.is_empty() || field.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value = field
        .parse::<f32>()
        .with_context(|| format!("invalid number {field:?}"))?;
    Ok(Some(value))
}

/// Synthetic handheld device
///
/// Held flat (gravity on -y) with a slow two-axis sway. Every `drop_every`-th
/// reading loses one component, cycling through the axes.
#[derive(Debug, Clone)]
pub struct SyntheticSource {
    tick: u64,
    dt: f32,
    drop_every: u64,
}

impl SyntheticSource {
    pub fn new(sample_rate_hz: f32) -> Self {
        let dt = if sample_rate_hz.is_finite() && sample_rate_hz > 0.0 {
            1.0 / sample_rate_hz
        } else {
            1.0 / 60.0
        };
        Self {
            tick: 0,
            dt,
            drop_every: 97,
        }
    }

    fn reading_at(&self, tick: u64) -> RawSample {
        let t = tick as f32 * self.dt;

        // Calibration window stays still; sway fades in afterwards
        let envelope = ((t - 1.0) / 2.0).clamp(0.0, 1.0);
        let x = envelope * (3.0 * (t * 0.9).sin() + 1.2 * (t * 2.3).sin());
        let y = -GRAVITY + envelope * (2.5 * (t * 0.6).sin() + 0.8 * (t * 3.1).cos());
        let z = 0.05 * (t * 7.0).sin();

        let mut sample = RawSample::new(x, y, z);
        if tick > 0 && tick % self.drop_every == 0 {
            match (tick / self.drop_every) % 3 {
                0 => sample.x = None,
                1 => sample.y = None,
                _ => sample.z = None,
            }
        }
        sample
    }
}

impl MotionSource for SyntheticSource {
    fn next_sample(&mut self) -> Option<RawSample> {
        let sample = self.reading_at(self.tick);
        self.tick += 1;
        Some(sample)
    }
}
