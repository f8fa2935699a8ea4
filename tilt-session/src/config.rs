//! Simple configuration persistence for Tilt
//!
//! Stores the feel parameters of the motion pipeline and the playback tick
//! period in a `key=value` text file.

use crate::playback::DEFAULT_TICK_INTERVAL_MS;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tilt_motion::{MotionConfig, TrackerParams, DEFAULT_CALIBRATION_SAMPLES};

/// Errors that can occur while loading configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("line {line}: invalid value {value:?} for {key}")]
    InvalidValue {
        line: usize,
        key: String,
        value: String,
    },
}

/// Application configuration
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    /// Accepted samples averaged into the gravity baseline
    pub calibration_samples: usize,
    /// Smoothing coefficient for the vertical (pitch) channel
    pub vertical_alpha: f32,
    /// Smoothing coefficient for the lateral (volume) channel
    pub lateral_alpha: f32,
    pub sensitivity: f32,
    pub damping: f32,
    pub centering_force: f32,
    pub restitution: f32,
    /// Nominal sensor rate in Hz
    pub sample_rate_hz: f32,
    /// Playback tick period in milliseconds
    pub tick_interval_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        let motion = MotionConfig::default();
        Self {
            calibration_samples: DEFAULT_CALIBRATION_SAMPLES,
            vertical_alpha: motion.vertical_alpha,
            lateral_alpha: motion.lateral_alpha,
            sensitivity: motion.tracker.sensitivity,
            damping: motion.tracker.damping,
            centering_force: motion.tracker.centering_force,
            restitution: motion.tracker.restitution,
            sample_rate_hz: motion.sample_rate_hz,
            tick_interval_ms: DEFAULT_TICK_INTERVAL_MS,
        }
    }
}

impl Config {
    /// Load config from the default location
    ///
    /// Returns default config if the file doesn't exist or can't be parsed.
    pub fn load() -> Self {
        let path = Self::config_path();
        match Self::load_from(&path) {
            Ok(config) => config,
            Err(ConfigError::Io(e)) if e.kind() == io::ErrorKind::NotFound => Self::default(),
            Err(e) => {
                tracing::warn!(path = %path.display(), error = %e, "using default config");
                Self::default()
            }
        }
    }

    /// Load config from a specific path
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Save config to the default location
    pub fn save(&self) -> io::Result<()> {
        let path = Self::config_path();
        self.save_to(&path)
    }

    /// Save config to a specific path
    pub fn save_to(&self, path: &Path) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, self.serialize())
    }

    /// Get the default config file path
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("tilt")
            .join("config.txt")
    }

    /// Pipeline configuration derived from these settings
    pub fn motion(&self) -> MotionConfig {
        MotionConfig {
            calibration_samples: self.calibration_samples,
            vertical_alpha: self.vertical_alpha,
            lateral_alpha: self.lateral_alpha,
            tracker: TrackerParams {
                sensitivity: self.sensitivity,
                damping: self.damping,
                centering_force: self.centering_force,
                restitution: self.restitution,
            },
            sample_rate_hz: self.sample_rate_hz,
        }
    }

    /// Playback tick period
    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// Nominal interval between sensor samples
    pub fn sample_interval(&self) -> Duration {
        Duration::from_secs_f32(self.motion().dt())
    }

    /// Parse config from simple key=value format
    fn parse(content: &str) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        for (index, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let key = key.trim();
            let value = value.trim();
            let invalid = || ConfigError::InvalidValue {
                line: index + 1,
                key: key.to_string(),
                value: value.to_string(),
            };

            match key {
                "calibration_samples" => {
                    config.calibration_samples = value
                        .parse()
                        .ok()
                        .filter(|&n: &usize| n > 0)
                        .ok_or_else(invalid)?;
                }
                "vertical_alpha" => config.vertical_alpha = parse_alpha(value).ok_or_else(invalid)?,
                "lateral_alpha" => config.lateral_alpha = parse_alpha(value).ok_or_else(invalid)?,
                "sensitivity" => config.sensitivity = parse_finite(value).ok_or_else(invalid)?,
                "damping" => config.damping = parse_unit(value).ok_or_else(invalid)?,
                "centering_force" => config.centering_force = parse_unit(value).ok_or_else(invalid)?,
                "restitution" => config.restitution = parse_unit(value).ok_or_else(invalid)?,
                "sample_rate_hz" => {
                    config.sample_rate_hz = parse_finite(value)
                        .filter(|&hz| hz > 0.0)
                        .ok_or_else(invalid)?;
                }
                "tick_interval_ms" => {
                    config.tick_interval_ms = value
                        .parse()
                        .ok()
                        .filter(|&ms: &u64| ms > 0)
                        .ok_or_else(invalid)?;
                }
                _ => {} // Ignore unknown keys
            }
        }

        Ok(config)
    }

    /// Serialize config to simple key=value format
    fn serialize(&self) -> String {
        [
            "# Tilt Configuration".to_string(),
            format!("calibration_samples={}", self.calibration_samples),
            format!("vertical_alpha={}", self.vertical_alpha),
            format!("lateral_alpha={}", self.lateral_alpha),
            format!("sensitivity={}", self.sensitivity),
            format!("damping={}", self.damping),
            format!("centering_force={}", self.centering_force),
            format!("restitution={}", self.restitution),
            format!("sample_rate_hz={}", self.sample_rate_hz),
            format!("tick_interval_ms={}", self.tick_interval_ms),
        ]
        .join("\n")
    }
}

fn parse_finite(value: &str) -> Option<f32> {
    value.parse::<f32>().ok().filter(|v| v.is_finite())
}

/// Smoothing coefficients live in (0, 1]
fn parse_alpha(value: &str) -> Option<f32> {
    parse_finite(value).filter(|&a| a > 0.0 && a <= 1.0)
}

fn parse_unit(value: &str) -> Option<f32> {
    parse_finite(value).filter(|v| (0.0..=1.0).contains(v))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_empty() {
        let config = Config::parse("").unwrap();
        assert_eq!(config, Config::default());
    }

    #[test]
    fn test_parse_values() {
        let config = Config::parse("vertical_alpha=0.25\nsensitivity=0.1\ntick_interval_ms=20").unwrap();
        assert_eq!(config.vertical_alpha, 0.25);
        assert_eq!(config.sensitivity, 0.1);
        assert_eq!(config.tick_interval(), Duration::from_millis(20));
        assert_eq!(config.lateral_alpha, Config::default().lateral_alpha);
    }

    #[test]
    fn test_parse_with_comments_and_unknown_keys() {
        let content = "# Comment\ndamping = 0.9\ncolor=blue\nnot a pair\n# Another comment";
        let config = Config::parse(content).unwrap();
        assert_eq!(config.damping, 0.9);
    }

    #[test]
    fn test_parse_invalid_value() {
        let err = Config::parse("# header\nvertical_alpha=0").unwrap_err();
        match err {
            ConfigError::InvalidValue { line, key, value } => {
                assert_eq!(line, 2);
                assert_eq!(key, "vertical_alpha");
                assert_eq!(value, "0");
            }
            other => panic!("unexpected error: {other}"),
        }

        assert!(Config::parse("calibration_samples=0").is_err());
        assert!(Config::parse("sample_rate_hz=-60").is_err());
        assert!(Config::parse("damping=NaN").is_err());
        assert!(Config::parse("tick_interval_ms=fast").is_err());
    }

    #[test]
    fn test_serialize_roundtrip() {
        let config = Config {
            calibration_samples: 45,
            vertical_alpha: 0.15,
            tick_interval_ms: 8,
            ..Config::default()
        };

        let parsed = Config::parse(&config.serialize()).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn test_motion_config() {
        let config = Config {
            centering_force: 0.1,
            sample_rate_hz: 50.0,
            ..Config::default()
        };
        let motion = config.motion();
        assert_eq!(motion.tracker.centering_force, 0.1);
        assert!((motion.dt() - 0.02).abs() < 1e-6);
        assert_eq!(Config::default().motion(), MotionConfig::default());
    }

    #[test]
    fn test_save_and_load() {
        let dir = std::env::temp_dir().join(format!("tilt-config-test-{}", std::process::id()));
        let path = dir.join("config.txt");
        let config = Config {
            restitution: 0.3,
            ..Config::default()
        };

        config.save_to(&path).unwrap();
        let loaded = Config::load_from(&path).unwrap();
        assert_eq!(loaded, config);

        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn test_load_missing_file() {
        let path = std::env::temp_dir().join("tilt-config-does-not-exist/config.txt");
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Io(_))));
    }
}
