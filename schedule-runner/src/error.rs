//! Error types for the schedule runner.

use zonecast_model::ModelError;

use crate::repository::RepositoryError;

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;

/// Errors returned by the schedule runner and its background task.
///
/// Per-zone dispatch failures never surface here; they are logged and
/// recorded as failed play events.
#[derive(Debug, thiserror::Error)]
pub enum SchedulerError {
    /// Invalid configuration or a runner assembled without a collaborator
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Schedules could not be loaded or updated
    #[error("Schedule repository error: {0}")]
    Repository(#[from] RepositoryError),

    /// A schedule's config payload is malformed
    #[error("Invalid schedule config: {0}")]
    InvalidScheduleConfig(String),

    /// The background ticker did not stop cleanly
    #[error("Shutdown error: {0}")]
    ShutdownError(String),
}

impl From<ModelError> for SchedulerError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::InvalidScheduleConfig(msg) => SchedulerError::InvalidScheduleConfig(msg),
            other => SchedulerError::InvalidScheduleConfig(other.to_string()),
        }
    }
}
