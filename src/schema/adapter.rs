//! Parsing and batch validation of pose.frame.v1 streams

use crate::error::ComputeError;
use crate::schema::frame::{PoseFrame, ValidationError};

/// Adapter for reading frame streams
pub struct FrameAdapter;

impl FrameAdapter {
    /// Parse a JSON string containing an array of PoseFrames
    pub fn parse_array(json: &str) -> Result<Vec<PoseFrame>, ComputeError> {
        let frames: Vec<PoseFrame> = serde_json::from_str(json)?;
        Ok(frames)
    }

    /// Parse NDJSON (newline-delimited JSON) containing PoseFrames
    pub fn parse_ndjson(ndjson: &str) -> Result<Vec<PoseFrame>, ComputeError> {
        let mut frames = Vec::new();
        for (line_num, line) in ndjson.lines().enumerate() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            match Self::parse_line(trimmed) {
                Ok(frame) => frames.push(frame),
                Err(e) => {
                    return Err(ComputeError::ParseError(format!(
                        "Failed to parse line {}: {}",
                        line_num + 1,
                        e
                    )));
                }
            }
        }
        Ok(frames)
    }

    /// Parse a single NDJSON line
    pub fn parse_line(line: &str) -> Result<PoseFrame, serde_json::Error> {
        serde_json::from_str(line)
    }

    /// Validate a batch of frames, returning only the failures
    pub fn validate_frames(frames: &[PoseFrame]) -> Vec<ValidationResult> {
        frames
            .iter()
            .enumerate()
            .filter_map(|(idx, frame)| {
                frame.validate().err().map(|error| ValidationResult {
                    index: idx,
                    frame_index: frame.frame_index,
                    error,
                })
            })
            .collect()
    }
}

/// A frame that failed validation
#[derive(Debug)]
pub struct ValidationResult {
    /// Position in the input
    pub index: usize,
    /// Frame index carried by the record, if any
    pub frame_index: Option<u64>,
    pub error: ValidationError,
}
