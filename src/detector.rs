//! Jump state machine
//!
//! Decides per frame whether the body is grounded or airborne, using the
//! smoothed vertical signal and the raw smoothing window:
//!
//! - grounded → airborne when `oldest_in_window - smoothed > y_threshold`
//!   (the reference point rose by more than the threshold across the window;
//!   image y grows downwards)
//! - airborne → grounded when `smoothed - min_in_window > y_threshold`
//!   (it dropped back by more than the threshold from its highest point)
//!
//! Landing emits a [`JumpEvent`] and records it in the detector's log.
//! Frames that yield no smoothed value are never evaluated.

use tracing::{debug, trace};

use crate::config::DetectorConfig;
use crate::error::ConfigError;
use crate::event_log::EventLog;
use crate::smoother::{Smoother, SmoothingWindow};
use crate::types::{AirborneContext, FrameSample, JumpEvent, JumpState, TickOutput};

/// Current phase; the airborne context only exists while in the air
#[derive(Debug, Clone, Copy, PartialEq)]
enum Phase {
    Grounded,
    Airborne(AirborneContext),
}

/// Single-owner jump detector: smoother, state and event log in one place
#[derive(Debug, Clone)]
pub struct JumpDetector {
    config: DetectorConfig,
    smoother: Smoother,
    phase: Phase,
    log: EventLog,
}

impl Default for JumpDetector {
    fn default() -> Self {
        Self {
            config: DetectorConfig::default(),
            smoother: Smoother::default(),
            phase: Phase::Grounded,
            log: EventLog::new(),
        }
    }
}

impl JumpDetector {
    /// Create a detector; invalid thresholds or window sizes are rejected here
    pub fn new(config: DetectorConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let smoother = Smoother::new(config.smooth_window)?;
        Ok(Self {
            config,
            smoother,
            phase: Phase::Grounded,
            log: EventLog::new(),
        })
    }

    /// Process one frame; returns the jump completed on this frame, if any
    pub fn process(&mut self, sample: &FrameSample) -> Option<JumpEvent> {
        self.tick(sample).event
    }

    /// Process one frame and return everything a display needs.
    ///
    /// A NaN or infinite coordinate makes the whole frame count as missing.
    pub fn tick(&mut self, sample: &FrameSample) -> TickOutput {
        let sample = sample.finite_or_missing();
        let smoothed = self.smoother.push(sample.vertical);

        let event = match (smoothed, sample.horizontal) {
            (Some(smoothed), Some(horizontal)) => {
                self.evaluate(smoothed, horizontal, sample.timestamp)
            }
            _ => None,
        };

        trace!(
            timestamp = sample.timestamp,
            vertical = ?sample.vertical,
            smoothed = ?smoothed,
            state = %self.state(),
            "tick"
        );

        TickOutput {
            timestamp: sample.timestamp,
            state: self.state(),
            vertical: sample.vertical,
            horizontal: sample.horizontal,
            smoothed,
            event,
        }
    }

    fn evaluate(&mut self, smoothed: f64, horizontal: f64, timestamp: f64) -> Option<JumpEvent> {
        let threshold = self.config.y_threshold;
        let window = self.smoother.window();

        match self.phase {
            Phase::Grounded => {
                let oldest = window.oldest()?;
                if oldest - smoothed > threshold {
                    debug!(
                        timestamp,
                        rise = oldest - smoothed,
                        horizontal,
                        "takeoff"
                    );
                    self.phase = Phase::Airborne(AirborneContext {
                        air_start_time: timestamp,
                        takeoff_horizontal: horizontal,
                        takeoff_vertical_smoothed: smoothed,
                    });
                }
                None
            }
            Phase::Airborne(takeoff) => {
                let lowest = window.min()?;
                if smoothed - lowest <= threshold {
                    return None;
                }

                let event = JumpEvent::from_flight(
                    self.log.next_sequence_number(),
                    &takeoff,
                    timestamp,
                    horizontal,
                );
                debug!(
                    sequence_number = event.sequence_number,
                    air_time = event.air_time,
                    displacement = event.horizontal_displacement,
                    "landing"
                );
                self.phase = Phase::Grounded;
                self.log.record(event.clone());
                Some(event)
            }
        }
    }

    pub fn state(&self) -> JumpState {
        match self.phase {
            Phase::Grounded => JumpState::Grounded,
            Phase::Airborne(_) => JumpState::Airborne,
        }
    }

    /// Takeoff data of the flight in progress
    pub fn airborne_context(&self) -> Option<&AirborneContext> {
        match &self.phase {
            Phase::Grounded => None,
            Phase::Airborne(context) => Some(context),
        }
    }

    /// Current window mean, once the window is full
    pub fn smoothed(&self) -> Option<f64> {
        self.smoother.smoothed()
    }

    pub fn window(&self) -> &SmoothingWindow {
        self.smoother.window()
    }

    pub fn events(&self) -> &EventLog {
        &self.log
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    /// Stop detecting and hand back the log.
    ///
    /// A flight still in progress is dropped; no landing is synthesized.
    pub fn finish(self) -> EventLog {
        if let Phase::Airborne(context) = self.phase {
            debug!(
                air_start_time = context.air_start_time,
                "stream ended while airborne, discarding unfinished jump"
            );
        }
        self.log
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn detector(threshold: f64, window: usize) -> JumpDetector {
        JumpDetector::new(DetectorConfig::new(threshold, window)).unwrap()
    }

    /// Raw vertical values at 0.1s steps from t=0.0: stand at 100, rise to 75,
    /// then come back down to 120.
    fn reference_jump() -> Vec<(f64, f64)> {
        vec![
            (0.0, 100.0),
            (0.1, 100.0),
            (0.2, 100.0),
            (0.3, 100.0),
            (0.4, 100.0),
            (0.5, 100.0),
            (0.6, 100.0),
            (0.7, 75.0),
            (0.8, 75.0),
            (0.9, 75.0),
            (1.0, 75.0),
            (1.1, 75.0),
            (1.2, 75.0),
            (1.3, 75.0),
            (1.4, 100.0),
            (1.5, 120.0),
            (1.6, 120.0),
        ]
    }

    fn horizontal_at(t: f64) -> f64 {
        if t < 1.05 {
            200.0
        } else if t < 1.55 {
            230.0
        } else {
            260.0
        }
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(matches!(
            JumpDetector::new(DetectorConfig::new(15.0, 0)),
            Err(ConfigError::InvalidWindow(0))
        ));
        assert!(matches!(
            JumpDetector::new(DetectorConfig::new(0.0, 5)),
            Err(ConfigError::InvalidThreshold(_))
        ));
    }

    #[test]
    fn test_reference_jump_fields() {
        let mut detector = detector(15.0, 5);
        let mut events = Vec::new();
        let mut smoothed_at = Vec::new();

        for (t, y) in reference_jump() {
            let tick = detector.tick(&FrameSample::detected(t, y, horizontal_at(t)));
            smoothed_at.push((t, tick.smoothed));
            if let Some(event) = tick.event {
                events.push(event);
            }
        }

        // Window fills at t=0.4
        assert_eq!(smoothed_at[3], (0.3, None));
        assert_eq!(smoothed_at[4], (0.4, Some(100.0)));
        assert_eq!(smoothed_at[5], (0.5, Some(100.0)));
        assert_eq!(smoothed_at[10], (1.0, Some(80.0)));
        assert_eq!(smoothed_at[16], (1.6, Some(98.0)));

        assert_eq!(events.len(), 1);
        let event = &events[0];
        assert_eq!(event.sequence_number, 1);
        assert_eq!(event.takeoff_time, 1.0);
        assert_eq!(event.landing_time, 1.6);
        assert!((event.air_time - 0.6).abs() < 1e-9);
        assert_eq!(event.horizontal_displacement, 60.0);
        assert_eq!(detector.state(), JumpState::Grounded);
        assert_eq!(detector.events().count(), 1);
    }

    #[test]
    fn test_takeoff_threshold_is_strict() {
        let mut detector = detector(15.0, 5);
        // At t=0.9 the rise is exactly 15 (100 - 85): no takeoff yet
        for (t, y) in reference_jump().into_iter().take(10) {
            detector.process(&FrameSample::detected(t, y, 200.0));
        }
        assert_eq!(detector.state(), JumpState::Grounded);
        assert_eq!(detector.smoothed(), Some(85.0));

        detector.process(&FrameSample::detected(1.0, 75.0, 200.0));
        assert_eq!(detector.state(), JumpState::Airborne);

        let context = detector.airborne_context().unwrap();
        assert_eq!(context.air_start_time, 1.0);
        assert_eq!(context.takeoff_horizontal, 200.0);
        assert_eq!(context.takeoff_vertical_smoothed, 80.0);
    }

    #[test]
    fn test_landing_threshold_is_strict() {
        let mut detector = detector(10.0, 2);
        detector.process(&FrameSample::detected(0.0, 100.0, 0.0));
        detector.process(&FrameSample::detected(0.1, 100.0, 0.0));
        // oldest 100, mean 89 -> rise 11
        detector.process(&FrameSample::detected(0.2, 78.0, 0.0));
        assert_eq!(detector.state(), JumpState::Airborne);

        // window [78, 98]: mean 88, min 78 -> drop of exactly 10
        assert_eq!(detector.process(&FrameSample::detected(0.3, 98.0, 5.0)), None);
        assert_eq!(detector.state(), JumpState::Airborne);

        // window [98, 124]: mean 111, min 98 -> drop of 13
        let event = detector
            .process(&FrameSample::detected(0.4, 124.0, 5.0))
            .unwrap();
        assert_eq!(event.takeoff_time, 0.2);
        assert_eq!(event.landing_time, 0.4);
        assert_eq!(event.horizontal_displacement, 5.0);
    }

    #[test]
    fn test_missing_frames_skip_evaluation() {
        let mut detector = detector(15.0, 5);
        for (t, y) in reference_jump().into_iter().take(10) {
            detector.process(&FrameSample::detected(t, y, 200.0));
        }
        let window_before = detector.window().clone();

        let tick = detector.tick(&FrameSample::missing(0.95));
        assert_eq!(tick.smoothed, None);
        assert_eq!(tick.event, None);
        assert_eq!(tick.state, JumpState::Grounded);
        assert_eq!(detector.window(), &window_before);
    }

    #[test]
    fn test_non_finite_values_treated_as_missing() {
        let mut detector = detector(15.0, 5);
        for i in 0..5 {
            detector.process(&FrameSample::detected(f64::from(i) / 10.0, 100.0, 200.0));
        }
        let window_before = detector.window().clone();

        let tick = detector.tick(&FrameSample::detected(0.5, f64::NAN, 0.0));
        assert_eq!(tick.vertical, None);
        assert_eq!(tick.smoothed, None);
        assert_eq!(detector.window(), &window_before);

        let tick = detector.tick(&FrameSample::detected(0.6, 100.0, f64::INFINITY));
        assert_eq!(tick.smoothed, None);
        assert_eq!(detector.window(), &window_before);

        let tick = detector.tick(&FrameSample::detected(0.7, 100.0, 200.0));
        assert_eq!(tick.smoothed, Some(100.0));
    }

    #[test]
    fn test_vertical_without_horizontal_is_pushed_not_evaluated() {
        let mut detector = detector(15.0, 5);
        for (t, y) in reference_jump().into_iter().take(10) {
            detector.process(&FrameSample::detected(t, y, 200.0));
        }

        let sample = FrameSample {
            timestamp: 1.0,
            vertical: Some(75.0),
            horizontal: None,
        };
        let tick = detector.tick(&sample);

        // Smoothed value is reported and the window advanced, but no takeoff
        assert_eq!(tick.smoothed, Some(80.0));
        assert_eq!(detector.state(), JumpState::Grounded);
        assert_eq!(detector.window().oldest(), Some(100.0));
    }

    #[test]
    fn test_no_landing_while_grounded() {
        let mut detector = detector(15.0, 3);
        // Steady descent in the image: the reference point only ever drops,
        // which would satisfy the landing predicate but must not emit anything
        for i in 0..50 {
            let t = i as f64 * 0.1;
            let y = 100.0 + i as f64 * 20.0;
            let x = i as f64 * 50.0;
            assert_eq!(detector.process(&FrameSample::detected(t, y, x)), None);
        }
        assert_eq!(detector.state(), JumpState::Grounded);
        assert!(detector.events().is_empty());
    }

    #[test]
    fn test_no_double_takeoff() {
        let mut detector = detector(15.0, 5);
        let levels = [100.0, 100.0, 100.0, 100.0, 100.0, 70.0, 70.0, 70.0];
        for (i, y) in levels.into_iter().enumerate() {
            detector.process(&FrameSample::detected(i as f64 * 0.1, y, 10.0));
        }
        assert_eq!(detector.state(), JumpState::Airborne);
        let first = *detector.airborne_context().unwrap();
        assert!((first.air_start_time - 0.7).abs() < 1e-9);

        // Window [100, 70, 70, 70, 70]: the takeoff predicate holds again
        // (100 - 76 > 15) but must not recapture the context
        detector.process(&FrameSample::detected(0.8, 70.0, 99.0));
        assert_eq!(detector.state(), JumpState::Airborne);
        assert_eq!(detector.airborne_context(), Some(&first));
    }

    #[test]
    fn test_unterminated_flight_discarded() {
        let mut detector = detector(15.0, 5);
        for (t, y) in reference_jump().into_iter().take(12) {
            detector.process(&FrameSample::detected(t, y, 200.0));
        }
        assert_eq!(detector.state(), JumpState::Airborne);

        let log = detector.finish();
        assert!(log.is_empty());
    }

    #[test]
    fn test_consecutive_jumps_are_numbered() {
        let mut detector = detector(15.0, 5);
        let mut events = Vec::new();
        // Stand, rise by 30px, come back down: takeoff on the 9th frame of
        // each cycle, landing on the 15th
        let cycle = [[100.0; 6], [70.0; 6], [100.0; 6]].concat();

        for round in 0..3 {
            for (i, y) in cycle.iter().enumerate() {
                let frame = round * cycle.len() + i;
                let sample = FrameSample::detected(frame as f64 * 0.1, *y, frame as f64 * 2.0);
                if let Some(event) = detector.process(&sample) {
                    events.push(event);
                }
            }
        }

        assert_eq!(events.len(), 3);
        let numbers: Vec<u32> = events.iter().map(|e| e.sequence_number).collect();
        assert_eq!(numbers, vec![1, 2, 3]);
        for event in &events {
            assert!((event.air_time - 0.6).abs() < 1e-9);
            assert!((event.horizontal_displacement - 12.0).abs() < 1e-9);
        }
        assert!(events
            .windows(2)
            .all(|pair| pair[0].landing_time < pair[1].landing_time));
        assert_eq!(detector.events().events(), events.as_slice());
    }
}
