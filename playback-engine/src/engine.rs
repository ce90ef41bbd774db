//! Per-zone playback state machine
//!
//! ```text
//!              start_with_*                 pause
//!   Stopped ───────────────▶ Playing ◀──────────────▶ Paused
//!                              │  ▲          resume
//!         handle_announcement  │  │ resume_after_announcement / next / previous
//!                              ▼  │
//!                      AnnouncementPlaying
//! ```
//!
//! Every mutating operation runs under the zone's exclusive lock: the state
//! is loaded, mutated, saved and broadcast before the lock is released.
//! Operations on different zones never wait on each other.

use std::sync::Arc;

use tokio::sync::OwnedMutexGuard;
use zonecast_model::{
    AnnouncementId, PlaybackState, PlaylistId, StatePatch, TrackId, Zone, ZoneId,
};

use crate::broadcast::{BroadcastError, Broadcaster, NullBroadcaster};
use crate::catalog::{AnnouncementCatalog, TrackCatalog, ZoneDirectory};
use crate::config::EngineConfig;
use crate::error::{EngineError, Result};
use crate::queue::{shuffle_tracks, QueueBuilder};
use crate::store::{MemoryStateRepository, PlaybackStateRepository, ZoneLocks};

/// A zone's state checked out under its exclusive lock
struct ZoneSession {
    _guard: OwnedMutexGuard<()>,
    state: PlaybackState,
}

/// Playback engine driving every zone's state machine
///
/// # Example
///
/// ```rust,ignore
/// use std::sync::Arc;
/// use zonecast_engine::{MemoryCatalog, PlaybackEngine};
///
/// let catalog = Arc::new(MemoryCatalog::new().with_zone(Zone::new("lobby", "Lobby")));
/// let engine = PlaybackEngine::builder()
///     .with_zone_directory(catalog.clone())
///     .with_track_catalog(catalog.clone())
///     .with_announcement_catalog(catalog)
///     .build()?;
///
/// engine.start_with_playlists(&ZoneId::new("lobby"), &[PlaylistId::new("p1")], false).await?;
/// engine.next(&ZoneId::new("lobby")).await?;
/// ```
#[derive(Debug)]
pub struct PlaybackEngine {
    zones: Arc<dyn ZoneDirectory>,
    queue_builder: QueueBuilder,
    announcements: Arc<dyn AnnouncementCatalog>,
    repository: Arc<dyn PlaybackStateRepository>,
    broadcaster: Arc<dyn Broadcaster>,
    locks: ZoneLocks,
    config: EngineConfig,
}

impl PlaybackEngine {
    pub fn builder() -> PlaybackEngineBuilder {
        PlaybackEngineBuilder::new()
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn zone_directory(&self) -> &Arc<dyn ZoneDirectory> {
        &self.zones
    }

    // ------------------------------------------------------------------
    // Transport
    // ------------------------------------------------------------------

    /// Start playback from playlist references
    ///
    /// Returns `NoTracksAvailable` and leaves the zone untouched when the
    /// references resolve to nothing.
    pub async fn start_with_playlists(
        &self,
        zone_id: &ZoneId,
        playlist_ids: &[PlaylistId],
        shuffle: bool,
    ) -> Result<PlaybackState> {
        let mut session = self.open(zone_id).await?;

        let queue = self.queue_builder.build_queue(playlist_ids, shuffle).await;
        if queue.is_empty() {
            tracing::warn!("No tracks found for playlists {:?} on zone {}", playlist_ids, zone_id);
            return Err(EngineError::NoTracksAvailable(zone_id.clone()));
        }

        let state = &mut session.state;
        load_queue(state, queue);
        state.source_playlist_ids = playlist_ids.to_vec();
        state.shuffle = shuffle;

        tracing::info!(
            "Started playback on zone {} with {} tracks",
            zone_id,
            state.queue.len()
        );
        self.commit(session).await
    }

    /// Start playback from an explicit track list
    ///
    /// The queue is the literal list (optionally shuffled). Playlist sources
    /// are cleared, so a shuffled loop replays the same tracks.
    pub async fn start_with_tracks(
        &self,
        zone_id: &ZoneId,
        track_ids: Vec<TrackId>,
        shuffle: bool,
    ) -> Result<PlaybackState> {
        let mut session = self.open(zone_id).await?;

        if track_ids.is_empty() {
            tracing::warn!("No tracks provided for zone {}", zone_id);
            return Err(EngineError::NoTracksAvailable(zone_id.clone()));
        }

        let catalog = self.queue_builder.catalog();
        for track_id in &track_ids {
            match catalog.track_exists(track_id).await {
                Ok(true) => {}
                Ok(false) => tracing::warn!("Track {} queued on zone {} is not in the catalog", track_id, zone_id),
                Err(e) => tracing::warn!("Could not verify track {}: {}", track_id, e),
            }
        }

        let mut queue = track_ids;
        if shuffle {
            shuffle_tracks(&mut queue);
        }

        let state = &mut session.state;
        load_queue(state, queue);
        state.source_playlist_ids.clear();
        state.shuffle = shuffle;

        tracing::info!(
            "Started playback on zone {} with {} tracks",
            zone_id,
            state.queue.len()
        );
        self.commit(session).await
    }

    /// Advance to the next track, wrapping to the start of the queue
    ///
    /// On wrap with shuffle enabled and playlist sources present, the queue
    /// is rebuilt from those sources so each loop plays in a fresh order.
    pub async fn next(&self, zone_id: &ZoneId) -> Result<PlaybackState> {
        let mut session = self.open(zone_id).await?;
        let state = &mut session.state;

        if state.queue.is_empty() {
            return Err(EngineError::NoTracksAvailable(zone_id.clone()));
        }

        state.queue_position += 1;

        if state.queue_position >= state.queue.len() {
            state.queue_position = 0;

            if state.shuffle && !state.source_playlist_ids.is_empty() {
                let rebuilt = self
                    .queue_builder
                    .build_queue(&state.source_playlist_ids, true)
                    .await;
                if rebuilt.is_empty() {
                    tracing::warn!(
                        "Playlist sources for zone {} no longer resolve, keeping current queue",
                        zone_id
                    );
                } else {
                    tracing::debug!("Rebuilt shuffled queue for zone {} on loop", zone_id);
                    state.queue = rebuilt;
                }
            }
        }

        select_queued_track(state);
        tracing::info!("Next track on zone {}: position {}", zone_id, state.queue_position);
        self.commit(session).await
    }

    /// Step back one track, or restart the current one when past the
    /// restart threshold
    pub async fn previous(&self, zone_id: &ZoneId) -> Result<PlaybackState> {
        let mut session = self.open(zone_id).await?;
        let state = &mut session.state;

        if state.position_seconds > self.config.restart_threshold_seconds {
            state.position_seconds = 0;
            tracing::debug!("Restarting current track on zone {}", zone_id);
            return self.commit(session).await;
        }

        if state.queue.is_empty() {
            return Err(EngineError::NoTracksAvailable(zone_id.clone()));
        }

        state.queue_position = match state.queue_position {
            0 => state.queue.len() - 1,
            position => (position - 1).min(state.queue.len() - 1),
        };

        select_queued_track(state);
        tracing::info!("Previous track on zone {}: position {}", zone_id, state.queue_position);
        self.commit(session).await
    }

    pub async fn pause(&self, zone_id: &ZoneId) -> Result<PlaybackState> {
        self.update_state(zone_id, StatePatch::new().playing(false)).await
    }

    pub async fn resume(&self, zone_id: &ZoneId) -> Result<PlaybackState> {
        self.update_state(zone_id, StatePatch::new().playing(true)).await
    }

    /// Set the zone volume, rejecting values outside 0–100
    pub async fn set_volume(&self, zone_id: &ZoneId, volume: i64) -> Result<PlaybackState> {
        if !(0..=100).contains(&volume) {
            return Err(EngineError::InvalidVolume(volume));
        }
        self.update_state(zone_id, StatePatch::new().volume(volume)).await
    }

    /// Seek within the current item; negative offsets clamp to zero
    pub async fn seek(&self, zone_id: &ZoneId, position_seconds: i64) -> Result<PlaybackState> {
        self.update_state(zone_id, StatePatch::new().position(position_seconds.max(0)))
            .await
    }

    // ------------------------------------------------------------------
    // Announcements
    // ------------------------------------------------------------------

    /// Interrupt music with an announcement
    ///
    /// The queue cursor is left alone so music resumes where it stopped.
    pub async fn handle_announcement(
        &self,
        zone_id: &ZoneId,
        announcement_id: &AnnouncementId,
    ) -> Result<PlaybackState> {
        self.ensure_concrete(zone_id)?;
        if !self.announcements.announcement_exists(announcement_id).await? {
            tracing::error!("Announcement {} not found", announcement_id);
            return Err(EngineError::AnnouncementNotFound(announcement_id.clone()));
        }

        let mut session = self.open(zone_id).await?;
        let state = &mut session.state;
        state.current_announcement_id = Some(announcement_id.clone());
        state.current_track_id = None;
        state.position_seconds = 0;
        state.is_playing = true;

        tracing::info!("Playing announcement {} on zone {}", announcement_id, zone_id);
        self.commit(session).await
    }

    /// Return to music after an announcement finishes
    pub async fn resume_after_announcement(&self, zone_id: &ZoneId) -> Result<PlaybackState> {
        let mut session = self.open(zone_id).await?;
        let state = &mut session.state;

        state.current_announcement_id = None;
        if state.current_track_id.is_none() && !state.queue.is_empty() {
            if state.queue_position >= state.queue.len() {
                state.queue_position = 0;
            }
            state.current_track_id = state.queued_track().cloned();
        }
        state.is_playing = true;

        tracing::info!("Resumed music on zone {}", zone_id);
        self.commit(session).await
    }

    // ------------------------------------------------------------------
    // Generic updates and queries
    // ------------------------------------------------------------------

    /// Apply a field-level patch
    ///
    /// The "all zones" sentinel is rejected; callers expand it first.
    pub async fn update_state(&self, zone_id: &ZoneId, patch: StatePatch) -> Result<PlaybackState> {
        self.ensure_concrete(zone_id)?;
        patch.validate()?;

        let mut session = self.open(zone_id).await?;
        patch.apply(&mut session.state)?;
        self.commit(session).await
    }

    /// Current state of a zone without mutating it
    ///
    /// `Ok(None)` when the zone exists but has never received a command.
    pub async fn state(&self, zone_id: &ZoneId) -> Result<Option<PlaybackState>> {
        self.lookup_zone(zone_id).await?;
        Ok(self.repository.load(zone_id).await?)
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn ensure_concrete(&self, zone_id: &ZoneId) -> Result<()> {
        if zone_id.is_all_zones() {
            tracing::warn!("Engine called with '{}'; expand at the caller", zone_id);
            return Err(EngineError::InvalidZoneTarget(zone_id.clone()));
        }
        Ok(())
    }

    async fn lookup_zone(&self, zone_id: &ZoneId) -> Result<Zone> {
        self.ensure_concrete(zone_id)?;
        self.zones
            .get_zone(zone_id)
            .await?
            .ok_or_else(|| EngineError::ZoneNotFound(zone_id.clone()))
    }

    /// Lock the zone and load its state, creating it on first use
    async fn open(&self, zone_id: &ZoneId) -> Result<ZoneSession> {
        let zone = match self.lookup_zone(zone_id).await {
            Ok(zone) => zone,
            Err(e @ EngineError::ZoneNotFound(_)) => {
                self.locks.remove(zone_id);
                return Err(e);
            }
            Err(e) => return Err(e),
        };
        let guard = self.locks.acquire(zone_id).await;

        let state = match self.repository.load(zone_id).await? {
            Some(state) => state,
            None => {
                tracing::debug!("Creating playback state for zone {}", zone_id);
                self.initial_state(&zone)
            }
        };

        Ok(ZoneSession {
            _guard: guard,
            state,
        })
    }

    fn initial_state(&self, zone: &Zone) -> PlaybackState {
        let mut state = PlaybackState::new(zone.id.clone()).with_volume(zone.default_volume);
        state.announcement_interval_minutes = self.config.announcement_interval_minutes;
        state.fade_duration_seconds = self.config.fade_duration_seconds;
        state.background_volume_percent = self.config.background_volume_percent;
        state
    }

    /// Persist and broadcast, then release the zone lock
    async fn commit(&self, session: ZoneSession) -> Result<PlaybackState> {
        let ZoneSession { _guard, mut state } = session;
        state.touch();

        debug_assert!(state.is_exclusive());
        debug_assert!(state.is_position_valid());

        self.repository.save(&state).await?;
        self.broadcast(&state).await;
        Ok(state)
    }

    async fn broadcast(&self, state: &PlaybackState) {
        match self.broadcaster.publish(&state.zone_id, state).await {
            Ok(()) => {}
            Err(BroadcastError::NoSubscribers(topic)) => {
                tracing::debug!("No subscribers for {}", topic);
            }
            Err(e) => {
                tracing::error!("Error broadcasting state for zone {}: {}", state.zone_id, e);
            }
        }
    }
}

/// Replace the queue and start at its first track
fn load_queue(state: &mut PlaybackState, queue: Vec<TrackId>) {
    state.queue = queue;
    state.queue_position = 0;
    state.current_track_id = state.queue.first().cloned();
    state.current_announcement_id = None;
    state.is_playing = true;
    state.position_seconds = 0;
}

/// Make the track at the cursor current, ending any announcement
fn select_queued_track(state: &mut PlaybackState) {
    state.current_track_id = state.queued_track().cloned();
    state.current_announcement_id = None;
    state.position_seconds = 0;
}

/// Builder for [`PlaybackEngine`]
#[derive(Debug, Default)]
pub struct PlaybackEngineBuilder {
    zones: Option<Arc<dyn ZoneDirectory>>,
    tracks: Option<Arc<dyn TrackCatalog>>,
    announcements: Option<Arc<dyn AnnouncementCatalog>>,
    repository: Option<Arc<dyn PlaybackStateRepository>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    config: EngineConfig,
}

impl PlaybackEngineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_zone_directory(mut self, zones: Arc<dyn ZoneDirectory>) -> Self {
        self.zones = Some(zones);
        self
    }

    pub fn with_track_catalog(mut self, tracks: Arc<dyn TrackCatalog>) -> Self {
        self.tracks = Some(tracks);
        self
    }

    pub fn with_announcement_catalog(mut self, announcements: Arc<dyn AnnouncementCatalog>) -> Self {
        self.announcements = Some(announcements);
        self
    }

    /// Defaults to [`MemoryStateRepository`]
    pub fn with_repository(mut self, repository: Arc<dyn PlaybackStateRepository>) -> Self {
        self.repository = Some(repository);
        self
    }

    /// Defaults to [`NullBroadcaster`]
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    pub fn with_config(mut self, config: EngineConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<PlaybackEngine> {
        self.config.validate()?;

        let zones = self
            .zones
            .ok_or_else(|| EngineError::Configuration("zone directory is required".to_string()))?;
        let tracks = self
            .tracks
            .ok_or_else(|| EngineError::Configuration("track catalog is required".to_string()))?;
        let announcements = self.announcements.ok_or_else(|| {
            EngineError::Configuration("announcement catalog is required".to_string())
        })?;

        Ok(PlaybackEngine {
            zones,
            queue_builder: QueueBuilder::new(tracks),
            announcements,
            repository: self
                .repository
                .unwrap_or_else(|| Arc::new(MemoryStateRepository::new())),
            broadcaster: self.broadcaster.unwrap_or_else(|| Arc::new(NullBroadcaster)),
            locks: ZoneLocks::new(),
            config: self.config,
        })
    }
}
