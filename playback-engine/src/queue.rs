//! Queue building from playlist references
//!
//! Resolves folder/playlist references into an ordered, de-duplicated list
//! of tracks. Unresolvable references are skipped with a warning; an empty
//! result means "nothing to play" and is left to the caller to interpret.

use std::collections::HashSet;
use std::sync::Arc;

use rand::seq::SliceRandom;
use zonecast_model::{PlaylistId, TrackId};

use crate::catalog::TrackCatalog;

/// Builds play queues from playlist references
#[derive(Debug, Clone)]
pub struct QueueBuilder {
    catalog: Arc<dyn TrackCatalog>,
}

impl QueueBuilder {
    pub fn new(catalog: Arc<dyn TrackCatalog>) -> Self {
        Self { catalog }
    }

    pub fn catalog(&self) -> &Arc<dyn TrackCatalog> {
        &self.catalog
    }

    /// Resolve `playlist_ids` into a queue
    ///
    /// Tracks are concatenated in playlist order, duplicates are dropped
    /// keeping the first occurrence, then the whole queue is shuffled if
    /// requested.
    pub async fn build_queue(&self, playlist_ids: &[PlaylistId], shuffle: bool) -> Vec<TrackId> {
        let mut all_tracks = Vec::new();

        for playlist_id in playlist_ids {
            match self.catalog.resolve_playlist_tracks(playlist_id).await {
                Ok(Some(tracks)) => {
                    tracing::trace!("Playlist {} resolved to {} tracks", playlist_id, tracks.len());
                    all_tracks.extend(tracks);
                }
                Ok(None) => {
                    tracing::warn!("Playlist {} not found, skipping", playlist_id);
                }
                Err(e) => {
                    tracing::warn!("Failed to resolve playlist {}: {}, skipping", playlist_id, e);
                }
            }
        }

        let mut queue = dedupe_preserving_order(all_tracks);
        if shuffle {
            shuffle_tracks(&mut queue);
        }

        tracing::debug!(
            "Built queue of {} tracks from {} playlists (shuffle: {})",
            queue.len(),
            playlist_ids.len(),
            shuffle
        );

        queue
    }
}

/// Remove duplicate track ids, keeping first-seen order
pub fn dedupe_preserving_order(tracks: Vec<TrackId>) -> Vec<TrackId> {
    let mut seen = HashSet::with_capacity(tracks.len());
    tracks
        .into_iter()
        .filter(|track| seen.insert(track.clone()))
        .collect()
}

/// Uniform random permutation in place
pub fn shuffle_tracks(tracks: &mut [TrackId]) {
    tracks.shuffle(&mut rand::rng());
}
