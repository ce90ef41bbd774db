//! Error types for the playback engine.

use zonecast_model::{AnnouncementId, ModelError, ZoneId};

use crate::catalog::CatalogError;
use crate::store::StoreError;

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

/// Errors returned by playback engine operations.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
    /// The zone does not exist in the zone directory
    #[error("Zone not found: {0}")]
    ZoneNotFound(ZoneId),

    /// Volume (or background volume) outside 0–100
    #[error("Invalid volume {0}: must be between 0 and 100")]
    InvalidVolume(i64),

    /// The resolved queue was empty; nothing to play
    #[error("No tracks available for zone {0}")]
    NoTracksAvailable(ZoneId),

    /// The announcement does not exist in the announcement catalog
    #[error("Announcement not found: {0}")]
    AnnouncementNotFound(AnnouncementId),

    /// A schedule config payload is malformed
    #[error("Invalid schedule config: {0}")]
    InvalidScheduleConfig(String),

    /// The "all zones" sentinel was passed where a concrete zone is required
    #[error("'{0}' is not a concrete zone; expand it before calling the engine")]
    InvalidZoneTarget(ZoneId),

    /// The engine was assembled without a required collaborator
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// A lookup collaborator failed
    #[error("Catalog error: {0}")]
    Catalog(#[from] CatalogError),

    /// The playback state repository failed
    #[error("State store error: {0}")]
    Store(#[from] StoreError),
}

impl From<ModelError> for EngineError {
    fn from(err: ModelError) -> Self {
        match err {
            ModelError::VolumeOutOfRange(volume) => EngineError::InvalidVolume(volume),
            ModelError::InvalidScheduleConfig(msg) => EngineError::InvalidScheduleConfig(msg),
            other => EngineError::InvalidScheduleConfig(other.to_string()),
        }
    }
}
