//! Error types for FlowLab.

use thiserror::Error;

/// Main error type for FlowLab operations.
///
/// Only resource acquisition at pipeline start is fatal. Per-frame
/// anomalies (degenerate geometry, empty candidate sets) are handled
/// in place and never surface here.
#[derive(Error, Debug)]
pub enum FlowLabError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Probe error: {0}")]
    Probe(String),

    #[error("Decoder error: {0}")]
    Decoder(String),

    #[error("Encoder error: {0}")]
    Encoder(String),

    #[error("Sensor data error: {0}")]
    Sensor(String),

    #[error("Calibration incomplete: {confirmed} of 4 points confirmed")]
    CalibrationIncomplete { confirmed: usize },

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),
}

/// Result type alias for FlowLab operations.
pub type Result<T> = std::result::Result<T, FlowLabError>;
