//! pose.frame.v1 schema definition
//!
//! One record per captured frame, produced by the pose-estimation collaborator:
//! - frame dimensions (landmarks arrive normalized and are scaled by them)
//! - a timestamp and/or a frame index
//! - the detected landmarks, or no detection at all

use serde::{Deserialize, Deserializer, Serialize};

/// Current schema version
pub const SCHEMA_VERSION: &str = "pose.frame.v1";

/// MediaPipe pose landmarks (33 points, numbered as the model emits them)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PoseLandmark {
    Nose,
    LeftEyeInner,
    LeftEye,
    LeftEyeOuter,
    RightEyeInner,
    RightEye,
    RightEyeOuter,
    LeftEar,
    RightEar,
    MouthLeft,
    MouthRight,
    LeftShoulder,
    RightShoulder,
    LeftElbow,
    RightElbow,
    LeftWrist,
    RightWrist,
    LeftPinky,
    RightPinky,
    LeftIndex,
    RightIndex,
    LeftThumb,
    RightThumb,
    LeftHip,
    RightHip,
    LeftKnee,
    RightKnee,
    LeftAnkle,
    RightAnkle,
    LeftHeel,
    RightHeel,
    LeftFootIndex,
    RightFootIndex,
}

impl PoseLandmark {
    /// All landmarks in model order
    pub const ALL: [PoseLandmark; 33] = [
        PoseLandmark::Nose,
        PoseLandmark::LeftEyeInner,
        PoseLandmark::LeftEye,
        PoseLandmark::LeftEyeOuter,
        PoseLandmark::RightEyeInner,
        PoseLandmark::RightEye,
        PoseLandmark::RightEyeOuter,
        PoseLandmark::LeftEar,
        PoseLandmark::RightEar,
        PoseLandmark::MouthLeft,
        PoseLandmark::MouthRight,
        PoseLandmark::LeftShoulder,
        PoseLandmark::RightShoulder,
        PoseLandmark::LeftElbow,
        PoseLandmark::RightElbow,
        PoseLandmark::LeftWrist,
        PoseLandmark::RightWrist,
        PoseLandmark::LeftPinky,
        PoseLandmark::RightPinky,
        PoseLandmark::LeftIndex,
        PoseLandmark::RightIndex,
        PoseLandmark::LeftThumb,
        PoseLandmark::RightThumb,
        PoseLandmark::LeftHip,
        PoseLandmark::RightHip,
        PoseLandmark::LeftKnee,
        PoseLandmark::RightKnee,
        PoseLandmark::LeftAnkle,
        PoseLandmark::RightAnkle,
        PoseLandmark::LeftHeel,
        PoseLandmark::RightHeel,
        PoseLandmark::LeftFootIndex,
        PoseLandmark::RightFootIndex,
    ];

    /// Index of the landmark in the model's output array
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

/// Landmark identifier as it appears on the wire.
///
/// Names outside the MediaPipe set are kept rather than rejected so that
/// models emitting extra points do not break parsing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LandmarkName {
    Known(PoseLandmark),
    Other(String),
}

impl Default for LandmarkName {
    fn default() -> Self {
        LandmarkName::Other(String::new())
    }
}

impl From<PoseLandmark> for LandmarkName {
    fn from(landmark: PoseLandmark) -> Self {
        LandmarkName::Known(landmark)
    }
}

/// A single detected landmark in normalized image coordinates.
///
/// Coordinates that are absent, `null` or not numbers deserialize to `None`;
/// the signal builder reports such a landmark as malformed instead of the
/// whole frame failing to parse.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Landmark {
    #[serde(default)]
    pub name: LandmarkName,
    /// Horizontal position, 0-1 across the frame width
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub x: Option<f64>,
    /// Vertical position, 0-1 down the frame height
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub y: Option<f64>,
    /// Relative depth (unused by the detector)
    #[serde(
        default,
        deserialize_with = "lenient_number",
        skip_serializing_if = "Option::is_none"
    )]
    pub z: Option<f64>,
    /// Model confidence that the point is visible (0-1)
    #[serde(
        default,
        deserialize_with = "lenient_visibility",
        skip_serializing_if = "Option::is_none"
    )]
    pub visibility: Option<f32>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(value.and_then(|v| v.as_f64()))
}

fn lenient_visibility<'de, D>(deserializer: D) -> Result<Option<f32>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_number(deserializer)?.map(|v| v as f32))
}

impl Landmark {
    pub fn new(name: PoseLandmark, x: f64, y: f64) -> Self {
        Self {
            name: LandmarkName::Known(name),
            x: Some(x),
            y: Some(y),
            z: None,
            visibility: None,
        }
    }

    pub fn with_visibility(mut self, visibility: f32) -> Self {
        self.visibility = Some(visibility);
        self
    }
}

/// Landmarks found for one body in one frame
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PoseDetection {
    #[serde(default)]
    pub landmarks: Vec<Landmark>,
}

impl PoseDetection {
    pub fn new(landmarks: Vec<Landmark>) -> Self {
        Self { landmarks }
    }

    /// First landmark with the given name
    pub fn landmark(&self, name: PoseLandmark) -> Option<&Landmark> {
        self.landmarks
            .iter()
            .find(|lm| lm.name == LandmarkName::Known(name))
    }
}

/// Pixel dimensions of the frame
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameSize {
    pub width: u32,
    pub height: u32,
}

impl FrameSize {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }
}

/// Producer of the frame (for provenance and debugging)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Source {
    /// Pose model (e.g., "mediapipe-pose-full")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    /// Camera or video identifier
    #[serde(skip_serializing_if = "Option::is_none")]
    pub camera_id: Option<String>,
}

/// The pose.frame.v1 record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoseFrame {
    /// Schema version identifier
    pub schema_version: String,
    /// Position of the frame in the capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub frame_index: Option<u64>,
    /// Capture time in seconds
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<f64>,
    /// Frame dimensions in pixels
    pub frame: FrameSize,
    /// Producer information
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<Source>,
    /// Detected body, `None` when the model found nothing
    #[serde(default)]
    pub detection: Option<PoseDetection>,
}

impl PoseFrame {
    /// Frame with a detected body
    pub fn detected(timestamp: f64, frame: FrameSize, landmarks: Vec<Landmark>) -> Self {
        PoseFrame {
            schema_version: SCHEMA_VERSION.to_string(),
            frame_index: None,
            timestamp: Some(timestamp),
            frame,
            source: None,
            detection: Some(PoseDetection::new(landmarks)),
        }
    }

    /// Frame on which the model found nobody
    pub fn undetected(timestamp: f64, frame: FrameSize) -> Self {
        PoseFrame {
            schema_version: SCHEMA_VERSION.to_string(),
            frame_index: None,
            timestamp: Some(timestamp),
            frame,
            source: None,
            detection: None,
        }
    }

    pub fn with_frame_index(mut self, frame_index: u64) -> Self {
        self.frame_index = Some(frame_index);
        self
    }

    /// Validate the frame schema
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.schema_version != SCHEMA_VERSION {
            return Err(ValidationError::InvalidSchemaVersion {
                expected: SCHEMA_VERSION.to_string(),
                actual: self.schema_version.clone(),
            });
        }

        if self.frame.is_empty() {
            return Err(ValidationError::InvalidFrameSize {
                width: self.frame.width,
                height: self.frame.height,
            });
        }

        match (self.timestamp, self.frame_index) {
            (None, None) => Err(ValidationError::MissingTime),
            (Some(t), _) if !t.is_finite() || t < 0.0 => Err(ValidationError::InvalidTimestamp(t)),
            _ => Ok(()),
        }
    }
}

/// Validation errors for pose frames
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Invalid schema version: expected {expected}, got {actual}")]
    InvalidSchemaVersion { expected: String, actual: String },

    #[error("Invalid frame size: {width}x{height}")]
    InvalidFrameSize { width: u32, height: u32 },

    #[error("Frame has neither a timestamp nor a frame index")]
    MissingTime,

    #[error("Invalid timestamp: {0}")]
    InvalidTimestamp(f64),
}

impl ValidationError {
    /// Problems the processor absorbs per frame (dropped or treated as no
    /// signal) rather than rejecting the stream
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ValidationError::InvalidSchemaVersion { .. })
    }
}
