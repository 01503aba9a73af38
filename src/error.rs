//! Error types for Broadjump

use thiserror::Error;

use crate::schema::ValidationError;

/// Errors raised while building a detector from configuration.
///
/// These are the only errors the detection core surfaces; they occur before
/// the first frame is processed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Smoothing window must hold at least one sample, got {0}")]
    InvalidWindow(usize),

    #[error("Vertical threshold must be a positive finite number, got {0}")]
    InvalidThreshold(f64),

    #[error("Minimum landmark visibility must be within [0, 1], got {0}")]
    InvalidVisibility(f32),

    #[error("Fallback frame rate must be a positive finite number, got {0}")]
    InvalidFrameRate(f64),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Cannot read config file: {0}")]
    Io(#[from] std::io::Error),
}

/// Errors that can occur at the edges of the pipeline (parsing, encoding, I/O)
#[derive(Debug, Error)]
pub enum ComputeError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to parse frame stream: {0}")]
    ParseError(String),

    #[error("Invalid JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("Invalid frame: {0}")]
    Validation(#[from] ValidationError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
