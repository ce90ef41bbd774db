//! Error types for zonecast-model

use thiserror::Error;

/// Result type for model parsing and validation
pub type Result<T> = std::result::Result<T, ModelError>;

/// Errors raised while parsing or validating model values
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ModelError {
    /// A time-of-day string could not be parsed
    #[error("Invalid time of day: {0}")]
    InvalidClockTime(String),

    /// A schedule configuration payload is malformed or inconsistent
    #[error("Invalid schedule config: {0}")]
    InvalidScheduleConfig(String),

    /// A volume or percentage outside 0–100
    #[error("Volume out of range (0-100): {0}")]
    VolumeOutOfRange(i64),

    /// A playback mode string is not one of the known modes
    #[error("Unknown playback mode: {0}")]
    UnknownMode(String),
}
