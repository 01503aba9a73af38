//! Broadjump - jump detection from pose-landmark streams
//!
//! Broadjump turns a per-frame stream of body landmarks into discrete jump
//! events through a deterministic pipeline: signal building → smoothing →
//! grounded/airborne state machine → event log → CSV / report encoding.
//!
//! ## Modules
//!
//! - **Core**: `signal`, `smoother`, `detector`, `event_log`
//! - **Pipeline**: `JumpProcessor` and one-shot helpers over pose.frame.v1 streams
//! - **Output**: CSV results file, NDJSON events, session report

pub mod config;
pub mod detector;
pub mod encoder;
pub mod error;
pub mod event_log;
pub mod pipeline;
pub mod schema;
pub mod signal;
pub mod smoother;
pub mod types;

#[cfg(feature = "cli")]
pub mod logging;

// FFI bindings for C interop (always available for cdylib/staticlib builds)
pub mod ffi;

pub use config::{DetectorConfig, JumpConfig, LoggingConfig, ReferencePoint};
pub use detector::JumpDetector;
pub use error::{ComputeError, ConfigError};
pub use event_log::EventLog;
pub use pipeline::{frames_to_csv, frames_to_jumps, process_frames, JumpProcessor};
pub use signal::{SignalBuilder, SignalReading};
pub use smoother::Smoother;
pub use types::{FrameSample, JumpEvent, JumpReport, JumpState, TickOutput};

// Schema exports
pub use schema::{FrameAdapter, PoseFrame, SCHEMA_VERSION};

/// Broadjump version embedded in all reports
pub const BROADJUMP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Producer name for reports
pub const PRODUCER_NAME: &str = "broadjump-core";
