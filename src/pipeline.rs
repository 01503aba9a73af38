//! Pipeline orchestration
//!
//! This module provides the public API for Broadjump.
//! It drives pose frames through signal building and jump detection, and
//! hands the results to the encoders.

use tracing::{trace, warn};

use crate::config::JumpConfig;
use crate::detector::JumpDetector;
use crate::encoder::{events_to_csv, ReportEncoder};
use crate::error::{ComputeError, ConfigError};
use crate::event_log::EventLog;
use crate::schema::{FrameAdapter, PoseFrame};
use crate::signal::{SignalBuilder, SignalReading};
use crate::types::{FrameSample, FrameStats, JumpEvent, JumpReport, JumpState, TickOutput};

/// Detect jumps in an NDJSON stream of pose.frame.v1 records.
///
/// # Arguments
/// * `ndjson` - One pose frame per line
/// * `config` - Detector, signal and stream settings
///
/// # Returns
/// Completed jumps in detection order. A flight still in progress at the
/// end of the stream is not included.
///
/// # Example
/// ```ignore
/// let jumps = frames_to_jumps(&ndjson, &JumpConfig::default())?;
/// ```
pub fn frames_to_jumps(ndjson: &str, config: &JumpConfig) -> Result<Vec<JumpEvent>, ComputeError> {
    let frames = FrameAdapter::parse_ndjson(ndjson)?;
    let processor = process_frames(&frames, config)?;
    Ok(processor.finish().into_events())
}

/// Detect jumps in an NDJSON stream and render them as CSV.
///
/// Returns `None` when no jump was detected.
pub fn frames_to_csv(ndjson: &str, config: &JumpConfig) -> Result<Option<String>, ComputeError> {
    let jumps = frames_to_jumps(ndjson, config)?;
    Ok(events_to_csv(&jumps))
}

/// Run a batch of frames through a fresh processor.
///
/// Every frame is validated first. A schema mismatch aborts the batch; frames
/// with a bad size or time are left to the processor, which counts them as
/// without signal or dropped.
pub fn process_frames(
    frames: &[PoseFrame],
    config: &JumpConfig,
) -> Result<JumpProcessor, ComputeError> {
    for frame in frames {
        match frame.validate() {
            Err(err) if !err.is_recoverable() => return Err(err.into()),
            _ => {}
        }
    }

    let mut processor = JumpProcessor::new(config.clone())?;
    for frame in frames {
        processor.process_frame(frame);
    }
    Ok(processor)
}

/// Stateful processor for frame-by-frame detection.
///
/// Use this when frames arrive one at a time (live capture, streaming CLI,
/// FFI callers).
pub struct JumpProcessor {
    config: JumpConfig,
    builder: SignalBuilder,
    detector: JumpDetector,
    encoder: ReportEncoder,
    stats: FrameStats,
    last_timestamp: Option<f64>,
}

impl Default for JumpProcessor {
    fn default() -> Self {
        Self {
            config: JumpConfig::default(),
            builder: SignalBuilder::default(),
            detector: JumpDetector::default(),
            encoder: ReportEncoder::new(),
            stats: FrameStats::default(),
            last_timestamp: None,
        }
    }
}

impl JumpProcessor {
    /// Create a processor; the configuration is validated before anything runs
    pub fn new(config: JumpConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let detector = JumpDetector::new(config.detector.clone())?;
        Ok(Self {
            builder: SignalBuilder::new(&config.signal),
            detector,
            encoder: ReportEncoder::new(),
            stats: FrameStats::default(),
            last_timestamp: None,
            config,
        })
    }

    /// Process one pose frame.
    ///
    /// The frame time is its timestamp, or `frame_index / fallback_fps` when it
    /// only carries an index. Returns `None` when the frame was dropped
    /// because its time is missing, invalid, or not after the previous frame.
    pub fn process_frame(&mut self, frame: &PoseFrame) -> Option<TickOutput> {
        let Some(timestamp) = self.resolve_time(frame) else {
            self.stats.frames_dropped += 1;
            warn!(
                frame_index = ?frame.frame_index,
                timestamp = ?frame.timestamp,
                "dropping frame without a usable time"
            );
            return None;
        };

        let reading = self.builder.build_frame(frame);
        if let SignalReading::Missing { cause } = reading {
            trace!(timestamp, ?cause, "no signal");
        }
        self.process_sample(&reading.into_sample(timestamp))
    }

    /// Process one already-reduced sample.
    ///
    /// Returns `None` when the sample was dropped for an out-of-order or
    /// non-finite timestamp.
    /// Non-finite signal values are treated as a missing sample.
    pub fn process_sample(&mut self, sample: &FrameSample) -> Option<TickOutput> {
        let sample = sample.finite_or_missing();
        if !self.accept_time(sample.timestamp) {
            self.stats.frames_dropped += 1;
            warn!(
                timestamp = sample.timestamp,
                previous = ?self.last_timestamp,
                "dropping out-of-order frame"
            );
            return None;
        }

        self.last_timestamp = Some(sample.timestamp);
        self.stats.frames_processed += 1;
        if sample.vertical.is_some() {
            self.stats.frames_with_signal += 1;
        } else {
            self.stats.frames_without_signal += 1;
        }

        Some(self.detector.tick(&sample))
    }

    fn resolve_time(&self, frame: &PoseFrame) -> Option<f64> {
        match (frame.timestamp, frame.frame_index) {
            (Some(t), _) => Some(t),
            (None, Some(index)) => Some(index as f64 / self.config.stream.fallback_fps),
            (None, None) => None,
        }
    }

    fn accept_time(&self, timestamp: f64) -> bool {
        if !timestamp.is_finite() || timestamp < 0.0 {
            return false;
        }
        match self.last_timestamp {
            Some(last) => timestamp > last,
            None => true,
        }
    }

    pub fn state(&self) -> JumpState {
        self.detector.state()
    }

    /// Current smoothed vertical value, once the window is full
    pub fn smoothed(&self) -> Option<f64> {
        self.detector.smoothed()
    }

    pub fn events(&self) -> &EventLog {
        self.detector.events()
    }

    pub fn stats(&self) -> &FrameStats {
        &self.stats
    }

    pub fn config(&self) -> &JumpConfig {
        &self.config
    }

    /// Time spent in the air so far by the flight in progress, 0 when grounded
    pub fn airborne_duration(&self, now: f64) -> f64 {
        self.detector
            .airborne_context()
            .map(|context| (now - context.air_start_time).max(0.0))
            .unwrap_or(0.0)
    }

    /// CSV of the jumps detected so far, `None` when there are none
    pub fn events_csv(&self) -> Option<String> {
        events_to_csv(self.events().events())
    }

    /// Session report for everything processed so far
    pub fn report(&self) -> JumpReport {
        self.encoder.encode(
            &self.config,
            &self.stats,
            self.events().events(),
            self.state() == JumpState::Airborne,
        )
    }

    /// Session report as pretty-printed JSON
    pub fn report_json(&self) -> Result<String, ComputeError> {
        serde_json::to_string_pretty(&self.report()).map_err(ComputeError::JsonError)
    }

    /// End the session and hand back the completed jumps
    pub fn finish(self) -> EventLog {
        self.detector.finish()
    }
}
