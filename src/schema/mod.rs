//! pose.frame.v1 input schema
//!
//! This module defines the per-frame records produced by the pose-estimation
//! collaborator and the helpers for reading them as NDJSON or JSON arrays.

mod adapter;
mod frame;

pub use adapter::*;
pub use frame::*;
