//! Announcement delivery seam between the runner and the playback engine

use zonecast_engine::{EngineError, PlaybackEngine};
use zonecast_model::{AnnouncementId, ZoneId};

/// Delivers one announcement to one zone
#[async_trait::async_trait]
pub trait AnnouncementDispatch: Send + Sync + std::fmt::Debug {
    async fn dispatch(&self, zone_id: &ZoneId, announcement_id: &AnnouncementId) -> Result<(), EngineError>;
}

#[async_trait::async_trait]
impl AnnouncementDispatch for PlaybackEngine {
    async fn dispatch(&self, zone_id: &ZoneId, announcement_id: &AnnouncementId) -> Result<(), EngineError> {
        self.handle_announcement(zone_id, announcement_id).await.map(|_| ())
    }
}
