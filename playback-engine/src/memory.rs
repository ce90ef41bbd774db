//! In-memory lookup collaborators
//!
//! Useful for embedding the engine without external services and for tests.

use std::collections::{HashMap, HashSet};

use tokio::sync::RwLock;
use zonecast_model::{AnnouncementId, PlaylistId, TrackId, Zone, ZoneId};

use crate::catalog::{AnnouncementCatalog, CatalogError, TrackCatalog, ZoneDirectory};

#[derive(Debug, Default)]
struct CatalogData {
    zones: Vec<Zone>,
    playlists: HashMap<PlaylistId, Vec<TrackId>>,
    tracks: HashSet<TrackId>,
    announcements: HashSet<AnnouncementId>,
}

/// Zone directory, track catalog and announcement catalog in one map
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    data: RwLock<CatalogData>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone(mut self, zone: Zone) -> Self {
        self.data.get_mut().zones.push(zone);
        self
    }

    /// Register a playlist; its tracks become known to the catalog
    pub fn with_playlist(mut self, playlist_id: &str, tracks: &[&str]) -> Self {
        let tracks: Vec<TrackId> = tracks.iter().map(|id| TrackId::new(*id)).collect();
        let data = self.data.get_mut();
        data.tracks.extend(tracks.iter().cloned());
        data.playlists.insert(PlaylistId::new(playlist_id), tracks);
        self
    }

    pub fn with_announcement(mut self, announcement_id: &str) -> Self {
        self.data
            .get_mut()
            .announcements
            .insert(AnnouncementId::new(announcement_id));
        self
    }

    pub async fn add_zone(&self, zone: Zone) {
        self.data.write().await.zones.push(zone);
    }

    /// Remove a zone; the engine drops its lock the next time the zone is addressed
    pub async fn remove_zone(&self, zone_id: &ZoneId) {
        self.data.write().await.zones.retain(|zone| &zone.id != zone_id);
    }

    /// Replace a playlist's members
    pub async fn set_playlist(&self, playlist_id: PlaylistId, tracks: Vec<TrackId>) {
        let mut data = self.data.write().await;
        data.tracks.extend(tracks.iter().cloned());
        data.playlists.insert(playlist_id, tracks);
    }

    pub async fn add_announcement(&self, announcement_id: AnnouncementId) {
        self.data.write().await.announcements.insert(announcement_id);
    }
}

#[async_trait::async_trait]
impl ZoneDirectory for MemoryCatalog {
    async fn get_zone(&self, zone_id: &ZoneId) -> Result<Option<Zone>, CatalogError> {
        Ok(self
            .data
            .read()
            .await
            .zones
            .iter()
            .find(|zone| &zone.id == zone_id)
            .cloned())
    }

    async fn list_zones(&self) -> Result<Vec<Zone>, CatalogError> {
        Ok(self.data.read().await.zones.clone())
    }
}

#[async_trait::async_trait]
impl TrackCatalog for MemoryCatalog {
    async fn resolve_playlist_tracks(
        &self,
        playlist_id: &PlaylistId,
    ) -> Result<Option<Vec<TrackId>>, CatalogError> {
        Ok(self.data.read().await.playlists.get(playlist_id).cloned())
    }

    async fn track_exists(&self, track_id: &TrackId) -> Result<bool, CatalogError> {
        Ok(self.data.read().await.tracks.contains(track_id))
    }
}

#[async_trait::async_trait]
impl AnnouncementCatalog for MemoryCatalog {
    async fn announcement_exists(
        &self,
        announcement_id: &AnnouncementId,
    ) -> Result<bool, CatalogError> {
        Ok(self.data.read().await.announcements.contains(announcement_id))
    }
}
