//! Output encoding
//!
//! This module turns detected jumps into the artifacts handed to callers:
//! the CSV results file, line-delimited JSON event records, and the
//! session report with producer metadata and aggregates.

use std::io::Write;

use chrono::Utc;
use uuid::Uuid;

use crate::config::JumpConfig;
use crate::error::ComputeError;
use crate::types::{FrameStats, JumpEvent, JumpReport, ReportProducer, ReportSummary};
use crate::{BROADJUMP_VERSION, PRODUCER_NAME};

/// Current report schema version
pub const REPORT_VERSION: &str = "1.0.0";

/// Header row of the results CSV
pub const CSV_HEADER: &str = "count,takeoff_time,landing_time,air_time_s,jump_distance_px";

/// Write events as CSV.
///
/// Nothing is written for an empty slice, not even the header. Returns
/// whether anything was written.
pub fn write_csv<W: Write>(events: &[JumpEvent], writer: &mut W) -> Result<bool, ComputeError> {
    if events.is_empty() {
        return Ok(false);
    }

    writeln!(writer, "{CSV_HEADER}")?;
    for event in events {
        writeln!(writer, "{}", csv_row(event))?;
    }
    writer.flush()?;
    Ok(true)
}

/// CSV document for the events, or `None` when there are none
pub fn events_to_csv(events: &[JumpEvent]) -> Option<String> {
    if events.is_empty() {
        return None;
    }

    let mut out = String::from(CSV_HEADER);
    out.push('\n');
    for event in events {
        out.push_str(&csv_row(event));
        out.push('\n');
    }
    Some(out)
}

/// One JSON object per line, one line per event
pub fn events_to_ndjson(events: &[JumpEvent]) -> Result<String, ComputeError> {
    let mut out = String::new();
    for event in events {
        out.push_str(&serde_json::to_string(event)?);
        out.push('\n');
    }
    Ok(out)
}

fn csv_row(event: &JumpEvent) -> String {
    format!(
        "{},{},{},{},{}",
        event.sequence_number,
        fixed(event.takeoff_time, 3),
        fixed(event.landing_time, 3),
        fixed(event.air_time, 3),
        fixed(event.horizontal_displacement, 2),
    )
}

/// Fixed-point rendering with `-0.000` collapsed to `0.000`
fn fixed(value: f64, decimals: usize) -> String {
    let rendered = format!("{value:.decimals$}");
    match rendered.strip_prefix('-') {
        Some(rest) if rest.chars().all(|c| c == '0' || c == '.') => rest.to_string(),
        _ => rendered,
    }
}

/// Report encoder for producing session summaries
pub struct ReportEncoder {
    instance_id: String,
}

impl Default for ReportEncoder {
    fn default() -> Self {
        Self::new()
    }
}

impl ReportEncoder {
    /// Create a new encoder with a unique instance ID
    pub fn new() -> Self {
        Self {
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    /// Create an encoder with a specific instance ID
    pub fn with_instance_id(instance_id: String) -> Self {
        Self { instance_id }
    }

    pub fn instance_id(&self) -> &str {
        &self.instance_id
    }

    /// Build the report for a session.
    ///
    /// `ended_airborne` marks a session whose last flight never landed; that
    /// flight contributes nothing to the aggregates.
    pub fn encode(
        &self,
        config: &JumpConfig,
        stats: &FrameStats,
        events: &[JumpEvent],
        ended_airborne: bool,
    ) -> JumpReport {
        let producer = ReportProducer {
            name: PRODUCER_NAME.to_string(),
            version: BROADJUMP_VERSION.to_string(),
            instance_id: self.instance_id.clone(),
        };

        JumpReport {
            report_version: REPORT_VERSION.to_string(),
            producer,
            computed_at_utc: Utc::now().to_rfc3339(),
            config: config.clone(),
            summary: summarize(stats, events, ended_airborne),
            jumps: events.to_vec(),
        }
    }

    /// Encode to pretty-printed JSON
    pub fn encode_to_json(
        &self,
        config: &JumpConfig,
        stats: &FrameStats,
        events: &[JumpEvent],
        ended_airborne: bool,
    ) -> Result<String, ComputeError> {
        let report = self.encode(config, stats, events, ended_airborne);
        serde_json::to_string_pretty(&report).map_err(ComputeError::JsonError)
    }
}

fn summarize(stats: &FrameStats, events: &[JumpEvent], ended_airborne: bool) -> ReportSummary {
    let total_air_time_s: f64 = events.iter().map(|e| e.air_time).sum();
    let longest_air_time_s = events.iter().map(|e| e.air_time).reduce(f64::max);
    let mean_air_time_s = if events.is_empty() {
        None
    } else {
        Some(total_air_time_s / events.len() as f64)
    };

    ReportSummary {
        jump_count: events.len(),
        total_air_time_s,
        longest_air_time_s,
        mean_air_time_s,
        total_displacement_px: events.iter().map(|e| e.horizontal_displacement).sum(),
        frames_processed: stats.frames_processed,
        frames_with_signal: stats.frames_with_signal,
        frames_without_signal: stats.frames_without_signal,
        frames_dropped: stats.frames_dropped,
        ended_airborne,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn event(seq: u32, takeoff: f64, landing: f64, displacement: f64) -> JumpEvent {
        JumpEvent {
            sequence_number: seq,
            takeoff_time: takeoff,
            landing_time: landing,
            air_time: landing - takeoff,
            horizontal_displacement: displacement,
        }
    }

    #[test]
    fn test_csv_rounding() {
        let events = vec![event(1, 1.0, 1.6, 60.0), event(2, 2.33333, 2.91111, -12.346)];

        let csv = events_to_csv(&events).unwrap();

        assert_eq!(
            csv,
            "count,takeoff_time,landing_time,air_time_s,jump_distance_px\n\
             1,1.000,1.600,0.600,60.00\n\
             2,2.333,2.911,0.578,-12.35\n"
        );
    }

    #[test]
    fn test_csv_skipped_without_events() {
        assert_eq!(events_to_csv(&[]), None);

        let mut buf = Vec::new();
        assert!(!write_csv(&[], &mut buf).unwrap());
        assert!(buf.is_empty());
    }

    #[test]
    fn test_write_csv_matches_string_form() {
        let events = vec![event(1, 0.5, 0.9, 3.0)];
        let mut buf = Vec::new();

        assert!(write_csv(&events, &mut buf).unwrap());
        assert_eq!(String::from_utf8(buf).unwrap(), events_to_csv(&events).unwrap());
    }

    #[test]
    fn test_negative_zero_normalized() {
        assert_eq!(fixed(-0.0001, 2), "0.00");
        assert_eq!(fixed(-0.004, 3), "-0.004");
        assert_eq!(fixed(0.0, 3), "0.000");
    }

    #[test]
    fn test_ndjson_one_line_per_event() {
        let events = vec![event(1, 1.0, 1.5, 10.0), event(2, 3.0, 3.5, 20.0)];
        let ndjson = events_to_ndjson(&events).unwrap();

        let lines: Vec<&str> = ndjson.lines().collect();
        assert_eq!(lines.len(), 2);
        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["sequence_number"], 2);
        assert_eq!(second["horizontal_displacement"], 20.0);
    }

    #[test]
    fn test_report_summary() {
        let encoder = ReportEncoder::with_instance_id("test-instance".to_string());
        let stats = FrameStats {
            frames_processed: 90,
            frames_with_signal: 80,
            frames_without_signal: 10,
            frames_dropped: 1,
        };
        let events = vec![event(1, 1.0, 1.5, 40.0), event(2, 3.0, 4.0, 20.0)];

        let report = encoder.encode(&JumpConfig::default(), &stats, &events, true);

        assert_eq!(report.report_version, REPORT_VERSION);
        assert_eq!(report.producer.name, PRODUCER_NAME);
        assert_eq!(report.producer.instance_id, "test-instance");
        assert_eq!(report.summary.jump_count, 2);
        assert_eq!(report.summary.total_air_time_s, 1.5);
        assert_eq!(report.summary.longest_air_time_s, Some(1.0));
        assert_eq!(report.summary.mean_air_time_s, Some(0.75));
        assert_eq!(report.summary.total_displacement_px, 60.0);
        assert_eq!(report.summary.frames_dropped, 1);
        assert!(report.summary.ended_airborne);
        assert_eq!(report.jumps, events);
        assert!(chrono::DateTime::parse_from_rfc3339(&report.computed_at_utc).is_ok());
    }

    #[test]
    fn test_empty_report() {
        let encoder = ReportEncoder::new();
        let json = encoder
            .encode_to_json(&JumpConfig::default(), &FrameStats::default(), &[], false)
            .unwrap();

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["summary"]["jump_count"], 0);
        assert!(value["summary"]["mean_air_time_s"].is_null());
        assert!(value["jumps"].as_array().unwrap().is_empty());
        assert_eq!(value["config"]["detector"]["y_threshold"], 15.0);
        assert!(Uuid::parse_str(encoder.instance_id()).is_ok());
    }
}
