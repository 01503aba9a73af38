//! Signal building
//!
//! This module reduces a frame's landmarks to the two scalars the detector
//! works on: the vertical and horizontal pixel position of the body's
//! ground-contact reference point.
//! - Landmarks are normalized; they are scaled by the frame dimensions
//! - Missing, hidden or malformed landmarks yield a typed missing reading
//! - Nothing here fails: a bad frame is just a frame without signal

use serde::{Deserialize, Serialize};

use crate::config::{ReferencePoint, SignalConfig};
use crate::schema::{FrameSize, PoseDetection, PoseFrame, PoseLandmark};
use crate::types::FrameSample;

/// Why a frame produced no signal
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "reason", content = "landmark")]
pub enum MissingReason {
    /// The pose model found no body
    NoDetection,
    /// The frame has a zero dimension, so landmarks cannot be scaled
    EmptyFrame,
    /// A required landmark is not in the detection
    LandmarkAbsent(PoseLandmark),
    /// A required landmark has a non-finite coordinate
    LandmarkMalformed(PoseLandmark),
    /// A required landmark is below the visibility floor
    LowVisibility(PoseLandmark),
}

/// Outcome of signal building for one frame
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "status")]
pub enum SignalReading {
    Valid { vertical: f64, horizontal: f64 },
    Missing { cause: MissingReason },
}

impl SignalReading {
    fn missing(cause: MissingReason) -> Self {
        SignalReading::Missing { cause }
    }

    pub fn is_valid(&self) -> bool {
        matches!(self, SignalReading::Valid { .. })
    }

    pub fn vertical(&self) -> Option<f64> {
        match self {
            SignalReading::Valid { vertical, .. } => Some(*vertical),
            SignalReading::Missing { .. } => None,
        }
    }

    pub fn horizontal(&self) -> Option<f64> {
        match self {
            SignalReading::Valid { horizontal, .. } => Some(*horizontal),
            SignalReading::Missing { .. } => None,
        }
    }

    /// Attach a timestamp to produce the detector's input
    pub fn into_sample(self, timestamp: f64) -> FrameSample {
        FrameSample {
            timestamp,
            vertical: self.vertical(),
            horizontal: self.horizontal(),
        }
    }
}

/// Builder turning landmarks into a reference-point signal
#[derive(Debug, Clone)]
pub struct SignalBuilder {
    reference: ReferencePoint,
    min_visibility: f32,
}

impl Default for SignalBuilder {
    fn default() -> Self {
        Self::new(&SignalConfig::default())
    }
}

impl SignalBuilder {
    pub fn new(config: &SignalConfig) -> Self {
        Self {
            reference: config.reference,
            min_visibility: config.min_visibility,
        }
    }

    /// Build the signal for a pose.frame.v1 record
    pub fn build_frame(&self, frame: &PoseFrame) -> SignalReading {
        self.build(frame.detection.as_ref(), frame.frame)
    }

    /// Build the signal from a detection result and the frame dimensions.
    ///
    /// Averages the reference landmarks' coordinates after scaling them to
    /// pixels: `y * height` for the vertical signal, `x * width` for the
    /// horizontal one.
    pub fn build(&self, detection: Option<&PoseDetection>, frame: FrameSize) -> SignalReading {
        let Some(detection) = detection else {
            return SignalReading::missing(MissingReason::NoDetection);
        };

        if frame.is_empty() {
            return SignalReading::missing(MissingReason::EmptyFrame);
        }

        let width = f64::from(frame.width);
        let height = f64::from(frame.height);
        let landmarks = self.reference.landmarks();

        let mut sum_x = 0.0;
        let mut sum_y = 0.0;

        for &name in landmarks {
            let Some(landmark) = detection.landmark(name) else {
                return SignalReading::missing(MissingReason::LandmarkAbsent(name));
            };

            let (x, y) = match (landmark.x, landmark.y) {
                (Some(x), Some(y)) if x.is_finite() && y.is_finite() => (x, y),
                _ => return SignalReading::missing(MissingReason::LandmarkMalformed(name)),
            };

            if let Some(visibility) = landmark.visibility {
                if visibility < self.min_visibility {
                    return SignalReading::missing(MissingReason::LowVisibility(name));
                }
            }

            sum_x += x * width;
            sum_y += y * height;
        }

        let count = landmarks.len() as f64;
        SignalReading::Valid {
            vertical: sum_y / count,
            horizontal: sum_x / count,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Landmark;

    fn size() -> FrameSize {
        FrameSize::new(640, 480)
    }

    fn ankles(left: (f64, f64), right: (f64, f64)) -> PoseDetection {
        PoseDetection::new(vec![
            Landmark::new(PoseLandmark::LeftAnkle, left.0, left.1),
            Landmark::new(PoseLandmark::RightAnkle, right.0, right.1),
        ])
    }

    #[test]
    fn test_averages_ankles_in_pixels() {
        let builder = SignalBuilder::default();
        let detection = ankles((0.25, 0.5), (0.75, 1.0));

        let reading = builder.build(Some(&detection), size());

        // x: (160 + 480) / 2, y: (240 + 480) / 2
        assert_eq!(
            reading,
            SignalReading::Valid {
                vertical: 360.0,
                horizontal: 320.0
            }
        );
    }

    #[test]
    fn test_no_detection() {
        let reading = SignalBuilder::default().build(None, size());
        assert_eq!(
            reading,
            SignalReading::Missing {
                cause: MissingReason::NoDetection
            }
        );
        assert_eq!(reading.vertical(), None);
        assert_eq!(reading.horizontal(), None);
    }

    #[test]
    fn test_absent_landmark() {
        let detection = PoseDetection::new(vec![Landmark::new(PoseLandmark::LeftAnkle, 0.5, 0.5)]);
        let reading = SignalBuilder::default().build(Some(&detection), size());
        assert_eq!(
            reading,
            SignalReading::Missing {
                cause: MissingReason::LandmarkAbsent(PoseLandmark::RightAnkle)
            }
        );
    }

    #[test]
    fn test_malformed_landmark() {
        let detection = ankles((0.5, f64::NAN), (0.5, 0.5));
        let reading = SignalBuilder::default().build(Some(&detection), size());
        assert!(matches!(
            reading,
            SignalReading::Missing {
                cause: MissingReason::LandmarkMalformed(PoseLandmark::LeftAnkle)
            }
        ));
    }

    #[test]
    fn test_missing_coordinate_is_malformed() {
        let mut detection = ankles((0.5, 0.5), (0.5, 0.5));
        detection.landmarks[1].y = None;

        let reading = SignalBuilder::default().build(Some(&detection), size());
        assert_eq!(
            reading,
            SignalReading::Missing {
                cause: MissingReason::LandmarkMalformed(PoseLandmark::RightAnkle)
            }
        );
    }

    #[test]
    fn test_empty_frame() {
        let detection = ankles((0.5, 0.5), (0.5, 0.5));
        let reading = SignalBuilder::default().build(Some(&detection), FrameSize::new(640, 0));
        assert!(!reading.is_valid());
    }

    #[test]
    fn test_visibility_floor() {
        let builder = SignalBuilder::new(&SignalConfig {
            min_visibility: 0.5,
            ..Default::default()
        });
        let detection = PoseDetection::new(vec![
            Landmark::new(PoseLandmark::LeftAnkle, 0.5, 0.5).with_visibility(0.9),
            Landmark::new(PoseLandmark::RightAnkle, 0.5, 0.5).with_visibility(0.2),
        ]);

        let reading = builder.build(Some(&detection), size());
        assert_eq!(
            reading,
            SignalReading::Missing {
                cause: MissingReason::LowVisibility(PoseLandmark::RightAnkle)
            }
        );
    }

    #[test]
    fn test_ankles_and_feet_reference() {
        let builder = SignalBuilder::new(&SignalConfig {
            reference: ReferencePoint::AnklesAndFeet,
            ..Default::default()
        });
        let detection = PoseDetection::new(vec![
            Landmark::new(PoseLandmark::LeftAnkle, 0.25, 0.75),
            Landmark::new(PoseLandmark::RightAnkle, 0.25, 0.75),
            Landmark::new(PoseLandmark::LeftFootIndex, 0.5, 1.0),
            Landmark::new(PoseLandmark::RightFootIndex, 0.5, 1.0),
        ]);

        let reading = builder.build(Some(&detection), FrameSize::new(400, 400));
        assert_eq!(reading.vertical(), Some(350.0));
        assert_eq!(reading.horizontal(), Some(150.0));
    }

    #[test]
    fn test_into_sample() {
        let reading = SignalReading::Valid {
            vertical: 100.0,
            horizontal: 50.0,
        };
        let sample = reading.into_sample(1.5);
        assert_eq!(sample, FrameSample::detected(1.5, 100.0, 50.0));

        let sample = SignalReading::missing(MissingReason::NoDetection).into_sample(1.6);
        assert_eq!(sample, FrameSample::missing(1.6));
    }
}
