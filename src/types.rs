//! Core types for the Broadjump pipeline
//!
//! This module defines the data structures that flow through each stage of the
//! pipeline: per-frame samples, the jump state, the transient airborne context,
//! finished jump events, and the per-tick output handed back to the caller.

use serde::{Deserialize, Serialize};
use std::fmt;

/// One processed frame reduced to the two scalars the detector consumes.
///
/// `vertical` and `horizontal` are pixel coordinates of the ground-contact
/// reference point; both are `None` when nothing usable was detected.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FrameSample {
    /// Frame timestamp in seconds
    pub timestamp: f64,
    /// Vertical position (pixels, y grows downwards)
    pub vertical: Option<f64>,
    /// Horizontal position (pixels)
    pub horizontal: Option<f64>,
}

impl FrameSample {
    /// Sample for a frame with a usable reference point
    pub fn detected(timestamp: f64, vertical: f64, horizontal: f64) -> Self {
        Self {
            timestamp,
            vertical: Some(vertical),
            horizontal: Some(horizontal),
        }
    }

    /// Sample for a frame without detection
    pub fn missing(timestamp: f64) -> Self {
        Self {
            timestamp,
            vertical: None,
            horizontal: None,
        }
    }

    /// The same sample, or a missing one if either coordinate is NaN or infinite
    pub fn finite_or_missing(&self) -> Self {
        let finite = |value: Option<f64>| value.map_or(true, f64::is_finite);
        if finite(self.vertical) && finite(self.horizontal) {
            *self
        } else {
            Self::missing(self.timestamp)
        }
    }
}

/// Whether the tracked body is on the ground or in the air
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JumpState {
    #[default]
    Grounded,
    Airborne,
}

impl JumpState {
    pub fn as_str(&self) -> &'static str {
        match self {
            JumpState::Grounded => "grounded",
            JumpState::Airborne => "airborne",
        }
    }
}

impl fmt::Display for JumpState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Values captured at takeoff and consumed at landing
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AirborneContext {
    /// Timestamp of the takeoff frame (seconds)
    pub air_start_time: f64,
    /// Horizontal position at takeoff (pixels)
    pub takeoff_horizontal: f64,
    /// Smoothed vertical value at takeoff (pixels)
    pub takeoff_vertical_smoothed: f64,
}

/// A completed takeoff-to-landing cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JumpEvent {
    /// 1-based position in the event log
    pub sequence_number: u32,
    /// Takeoff timestamp (seconds)
    pub takeoff_time: f64,
    /// Landing timestamp (seconds)
    pub landing_time: f64,
    /// `landing_time - takeoff_time` (seconds)
    pub air_time: f64,
    /// Landing horizontal minus takeoff horizontal (pixels, may be negative)
    pub horizontal_displacement: f64,
}

impl JumpEvent {
    /// Close a flight: combine the takeoff context with the landing frame.
    pub fn from_flight(
        sequence_number: u32,
        takeoff: &AirborneContext,
        landing_time: f64,
        landing_horizontal: f64,
    ) -> Self {
        Self {
            sequence_number,
            takeoff_time: takeoff.air_start_time,
            landing_time,
            air_time: landing_time - takeoff.air_start_time,
            horizontal_displacement: landing_horizontal - takeoff.takeoff_horizontal,
        }
    }
}

/// Everything a caller needs after one tick: display values plus the event, if any.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TickOutput {
    /// Timestamp the tick was evaluated at
    pub timestamp: f64,
    /// State after this tick
    pub state: JumpState,
    /// Raw vertical value of this frame
    pub vertical: Option<f64>,
    /// Raw horizontal value of this frame
    pub horizontal: Option<f64>,
    /// Window mean, present only once the window is full and the frame had a signal
    pub smoothed: Option<f64>,
    /// Jump completed on this tick
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<JumpEvent>,
}

/// Frame-level counters kept by a processor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrameStats {
    /// Frames accepted and handed to the detector
    pub frames_processed: u64,
    /// Accepted frames that produced a reference point
    pub frames_with_signal: u64,
    /// Accepted frames without a usable detection
    pub frames_without_signal: u64,
    /// Frames dropped for an unusable or out-of-order timestamp
    pub frames_dropped: u64,
}

/// Report producer metadata
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportProducer {
    pub name: String,
    pub version: String,
    pub instance_id: String,
}

/// Aggregates over a session's jumps
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReportSummary {
    pub jump_count: usize,
    pub total_air_time_s: f64,
    pub longest_air_time_s: Option<f64>,
    pub mean_air_time_s: Option<f64>,
    pub total_displacement_px: f64,
    pub frames_processed: u64,
    pub frames_with_signal: u64,
    pub frames_without_signal: u64,
    pub frames_dropped: u64,
    /// The session ended mid-flight; that flight is not in `jumps`
    pub ended_airborne: bool,
}

/// Complete session report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JumpReport {
    pub report_version: String,
    pub producer: ReportProducer,
    pub computed_at_utc: String,
    pub config: crate::config::JumpConfig,
    pub summary: ReportSummary,
    pub jumps: Vec<JumpEvent>,
}
