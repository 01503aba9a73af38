use std::path::PathBuf;

use broadjump::schema::FrameAdapter;
use broadjump::{frames_to_csv, frames_to_jumps, JumpConfig, JumpProcessor, JumpState};

fn fixture(name: &str) -> String {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("fixtures")
        .join(name);
    std::fs::read_to_string(path).expect("fixture should be readable")
}

#[test]
fn single_jump_fixture_yields_one_event() {
    let jumps = frames_to_jumps(&fixture("single_jump.ndjson"), &JumpConfig::default())
        .expect("fixture should process");

    assert_eq!(jumps.len(), 1);
    let jump = &jumps[0];
    assert_eq!(jump.sequence_number, 1);
    assert_eq!(jump.takeoff_time, 1.0);
    assert_eq!(jump.landing_time, 1.6);
    assert!((jump.air_time - 0.6).abs() < 1e-9);
    assert_eq!(jump.horizontal_displacement, 60.0);
}

#[test]
fn single_jump_fixture_csv() {
    let csv = frames_to_csv(&fixture("single_jump.ndjson"), &JumpConfig::default())
        .expect("fixture should process")
        .expect("a jump should be detected");

    assert_eq!(
        csv,
        "count,takeoff_time,landing_time,air_time_s,jump_distance_px\n1,1.000,1.600,0.600,60.00\n"
    );
}

#[test]
fn fixture_gaps_and_stale_frames_are_absorbed() {
    let frames = FrameAdapter::parse_ndjson(&fixture("single_jump.ndjson")).unwrap();
    assert!(FrameAdapter::validate_frames(&frames).is_empty());

    let mut processor = JumpProcessor::default();
    let mut states = Vec::new();
    for frame in &frames {
        if let Some(tick) = processor.process_frame(frame) {
            states.push(tick.state);
        }
    }

    let stats = processor.stats();
    assert_eq!(stats.frames_processed, 18);
    assert_eq!(stats.frames_with_signal, 17);
    assert_eq!(stats.frames_without_signal, 1);
    assert_eq!(stats.frames_dropped, 1);

    // Grounded, then airborne, then grounded again; never flapping
    let transitions = states.windows(2).filter(|w| w[0] != w[1]).count();
    assert_eq!(transitions, 2);
    assert_eq!(states.last(), Some(&JumpState::Grounded));

    let report = processor.report();
    assert_eq!(report.summary.jump_count, 1);
    assert!(!report.summary.ended_airborne);
}

#[test]
fn higher_threshold_suppresses_jump() {
    let config = JumpConfig::from_json(r#"{"detector": {"y_threshold": 30.0}}"#).unwrap();

    let csv = frames_to_csv(&fixture("single_jump.ndjson"), &config).unwrap();

    assert_eq!(csv, None);
}

#[test]
fn truncated_stream_discards_flight() {
    let content = fixture("single_jump.ndjson");
    // Cut the stream before the landing frames
    let truncated = content.lines().take(14).collect::<Vec<_>>().join("\n");

    let jumps = frames_to_jumps(&truncated, &JumpConfig::default()).unwrap();

    assert!(jumps.is_empty());
}

#[test]
fn null_ankle_coordinate_only_costs_that_frame() {
    let content = fixture("single_jump.ndjson");
    let mut lines: Vec<String> = content.lines().map(str::to_string).collect();

    let mut frame: serde_json::Value = serde_json::from_str(&lines[2]).unwrap();
    assert_eq!(frame["timestamp"], 0.2);
    frame["detection"]["landmarks"][0]["x"] = serde_json::Value::Null;
    lines[2] = frame.to_string();
    let ndjson = lines.join("\n");

    let jumps = frames_to_jumps(&ndjson, &JumpConfig::default())
        .expect("a malformed landmark should not fail the stream");
    assert_eq!(jumps.len(), 1);
    assert_eq!(jumps[0].takeoff_time, 1.0);
    assert_eq!(jumps[0].landing_time, 1.6);

    let mut processor = JumpProcessor::default();
    for frame in FrameAdapter::parse_ndjson(&ndjson).unwrap() {
        processor.process_frame(&frame);
    }
    assert_eq!(processor.stats().frames_with_signal, 16);
    assert_eq!(processor.stats().frames_without_signal, 2);
}
