//! Detector configuration
//!
//! All tunables live here with their defaults. A configuration is validated
//! once, before any frame is processed; a degenerate window or threshold is
//! rejected instead of silently producing nonsense.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::ConfigError;
use crate::schema::PoseLandmark;

/// Default vertical hysteresis threshold (pixels)
pub const DEFAULT_Y_THRESHOLD: f64 = 15.0;

/// Default smoothing window size (samples)
pub const DEFAULT_SMOOTH_WINDOW: usize = 5;

/// Default frame rate used to derive timestamps from frame indices
pub const DEFAULT_FALLBACK_FPS: f64 = 30.0;

/// Complete configuration for a jump processor
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpConfig {
    pub detector: DetectorConfig,
    pub signal: SignalConfig,
    pub stream: StreamConfig,
}

/// Tunables of the jump state machine
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DetectorConfig {
    /// Minimum vertical change (pixels) for takeoff and landing
    pub y_threshold: f64,
    /// Number of valid samples averaged by the smoother
    pub smooth_window: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            y_threshold: DEFAULT_Y_THRESHOLD,
            smooth_window: DEFAULT_SMOOTH_WINDOW,
        }
    }
}

impl DetectorConfig {
    pub fn new(y_threshold: f64, smooth_window: usize) -> Self {
        Self {
            y_threshold,
            smooth_window,
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.smooth_window == 0 {
            return Err(ConfigError::InvalidWindow(self.smooth_window));
        }
        if !self.y_threshold.is_finite() || self.y_threshold <= 0.0 {
            return Err(ConfigError::InvalidThreshold(self.y_threshold));
        }
        Ok(())
    }
}

/// Which landmarks define the ground-contact reference point
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferencePoint {
    /// Mean of both ankles
    #[default]
    Ankles,
    /// Mean of both heels
    Heels,
    /// Mean of both foot-index (toe) points
    FootIndex,
    /// Mean of both ankles and both foot-index points
    AnklesAndFeet,
}

impl ReferencePoint {
    /// Landmarks averaged to produce the reference point
    pub fn landmarks(&self) -> &'static [PoseLandmark] {
        match self {
            ReferencePoint::Ankles => &[PoseLandmark::LeftAnkle, PoseLandmark::RightAnkle],
            ReferencePoint::Heels => &[PoseLandmark::LeftHeel, PoseLandmark::RightHeel],
            ReferencePoint::FootIndex => {
                &[PoseLandmark::LeftFootIndex, PoseLandmark::RightFootIndex]
            }
            ReferencePoint::AnklesAndFeet => &[
                PoseLandmark::LeftAnkle,
                PoseLandmark::RightAnkle,
                PoseLandmark::LeftFootIndex,
                PoseLandmark::RightFootIndex,
            ],
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ReferencePoint::Ankles => "ankles",
            ReferencePoint::Heels => "heels",
            ReferencePoint::FootIndex => "foot_index",
            ReferencePoint::AnklesAndFeet => "ankles_and_feet",
        }
    }
}

/// Landmark extraction policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SignalConfig {
    pub reference: ReferencePoint,
    /// Landmarks reporting a visibility below this are treated as absent.
    /// Landmarks without a visibility value are always accepted.
    pub min_visibility: f32,
}

impl Default for SignalConfig {
    fn default() -> Self {
        Self {
            reference: ReferencePoint::default(),
            min_visibility: 0.0,
        }
    }
}

impl SignalConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(0.0..=1.0).contains(&self.min_visibility) {
            return Err(ConfigError::InvalidVisibility(self.min_visibility));
        }
        Ok(())
    }
}

/// Stream timing policy
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Frame rate used for frames that carry an index but no timestamp
    pub fallback_fps: f64,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            fallback_fps: DEFAULT_FALLBACK_FPS,
        }
    }
}

impl StreamConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.fallback_fps.is_finite() || self.fallback_fps <= 0.0 {
            return Err(ConfigError::InvalidFrameRate(self.fallback_fps));
        }
        Ok(())
    }
}

/// Logging settings for binaries embedding the crate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g. "info", "broadjump=debug,warn")
    pub level: String,
    /// Emit structured JSON log lines
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl JumpConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.detector.validate()?;
        self.signal.validate()?;
        self.stream.validate()
    }

    /// Parse and validate a JSON configuration
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: JumpConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json(&json)
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults_are_valid() {
        let config = JumpConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.detector.y_threshold, 15.0);
        assert_eq!(config.detector.smooth_window, 5);
        assert_eq!(config.signal.reference, ReferencePoint::Ankles);
    }

    #[test]
    fn test_rejects_empty_window() {
        let config = DetectorConfig::new(15.0, 0);
        assert!(matches!(config.validate(), Err(ConfigError::InvalidWindow(0))));
    }

    #[test]
    fn test_rejects_non_positive_threshold() {
        for threshold in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let config = DetectorConfig::new(threshold, 5);
            assert!(matches!(
                config.validate(),
                Err(ConfigError::InvalidThreshold(_))
            ));
        }
    }

    #[test]
    fn test_rejects_out_of_range_visibility() {
        let config = JumpConfig {
            signal: SignalConfig {
                min_visibility: 1.5,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InvalidVisibility(_))
        ));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = JumpConfig::from_json(r#"{"detector": {"y_threshold": 20.0}}"#).unwrap();

        assert_eq!(config.detector.y_threshold, 20.0);
        assert_eq!(config.detector.smooth_window, DEFAULT_SMOOTH_WINDOW);
        assert_eq!(config.stream.fallback_fps, DEFAULT_FALLBACK_FPS);
    }

    #[test]
    fn test_invalid_json_config_rejected() {
        assert!(matches!(
            JumpConfig::from_json(r#"{"detector": {"smooth_window": 0}}"#),
            Err(ConfigError::InvalidWindow(0))
        ));
        assert!(matches!(
            JumpConfig::from_json("not json"),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_logging_defaults() {
        let logging: LoggingConfig = serde_json::from_str(r#"{"json": true}"#).unwrap();
        assert_eq!(logging.level, "info");
        assert!(logging.json);
    }

    #[test]
    fn test_round_trip_reference_point() {
        let config = JumpConfig {
            signal: SignalConfig {
                reference: ReferencePoint::AnklesAndFeet,
                min_visibility: 0.5,
            },
            ..Default::default()
        };

        let json = config.to_json().unwrap();
        assert!(json.contains("ankles_and_feet"));
        assert_eq!(JumpConfig::from_json(&json).unwrap(), config);
    }
}
