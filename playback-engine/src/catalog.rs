//! Lookup collaborators consumed by the engine
//!
//! Zones, tracks, playlists and announcements are owned by external
//! management services. The engine only reads them through these traits.

use zonecast_model::{AnnouncementId, PlaylistId, TrackId, Zone, ZoneId};

/// Errors from lookup collaborators
#[derive(Debug, Clone, thiserror::Error)]
pub enum CatalogError {
    /// The backing service could not be reached
    #[error("Catalog unavailable: {0}")]
    Unavailable(String),

    /// The backing service returned data that could not be used
    #[error("Catalog returned invalid data: {0}")]
    InvalidData(String),
}

/// Zone lookup
#[async_trait::async_trait]
pub trait ZoneDirectory: Send + Sync + std::fmt::Debug {
    /// Look up a zone by id, `Ok(None)` when it does not exist
    async fn get_zone(&self, zone_id: &ZoneId) -> Result<Option<Zone>, CatalogError>;

    /// Every zone known to the directory, used to expand "all zones"
    async fn list_zones(&self) -> Result<Vec<Zone>, CatalogError>;
}

/// Track and playlist lookup
#[async_trait::async_trait]
pub trait TrackCatalog: Send + Sync + std::fmt::Debug {
    /// Member tracks of a folder or curated playlist, `Ok(None)` when the
    /// reference does not resolve
    async fn resolve_playlist_tracks(
        &self,
        playlist_id: &PlaylistId,
    ) -> Result<Option<Vec<TrackId>>, CatalogError>;

    async fn track_exists(&self, track_id: &TrackId) -> Result<bool, CatalogError>;
}

/// Announcement lookup
#[async_trait::async_trait]
pub trait AnnouncementCatalog: Send + Sync + std::fmt::Debug {
    async fn announcement_exists(&self, announcement_id: &AnnouncementId)
        -> Result<bool, CatalogError>;
}
