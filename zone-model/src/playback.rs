//! Per-zone playback state record
//!
//! One [`PlaybackState`] exists per zone. It is created lazily on the first
//! playback command and only ever mutated by the playback engine.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::ModelError;
use crate::id_types::{AnnouncementId, PlaylistId, TrackId, ZoneId};

/// What a zone is allowed to play
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlaybackMode {
    #[serde(rename = "music")]
    MusicOnly,
    #[serde(rename = "music+announcements")]
    MusicAndAnnouncements,
    #[serde(rename = "announcements")]
    AnnouncementsOnly,
}

impl PlaybackMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaybackMode::MusicOnly => "music",
            PlaybackMode::MusicAndAnnouncements => "music+announcements",
            PlaybackMode::AnnouncementsOnly => "announcements",
        }
    }
}

impl Default for PlaybackMode {
    fn default() -> Self {
        PlaybackMode::MusicAndAnnouncements
    }
}

impl fmt::Display for PlaybackMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlaybackMode {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "music" => Ok(PlaybackMode::MusicOnly),
            "music+announcements" => Ok(PlaybackMode::MusicAndAnnouncements),
            "announcements" => Ok(PlaybackMode::AnnouncementsOnly),
            other => Err(ModelError::UnknownMode(other.to_string())),
        }
    }
}

/// Derived playback status of a zone
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", content = "id", rename_all = "snake_case")]
pub enum PlaybackStatus {
    Stopped,
    Playing(TrackId),
    Paused(TrackId),
    AnnouncementPlaying(AnnouncementId),
}

/// Mutable playback record for one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaybackState {
    pub zone_id: ZoneId,
    pub queue: Vec<TrackId>,
    pub queue_position: usize,
    pub current_track_id: Option<TrackId>,
    pub current_announcement_id: Option<AnnouncementId>,
    pub is_playing: bool,
    pub position_seconds: u32,
    pub volume: u8,
    /// Playlist references the queue was built from, used to rebuild on loop
    pub source_playlist_ids: Vec<PlaylistId>,
    pub shuffle: bool,
    pub repeat: bool,
    pub mode: PlaybackMode,
    pub announcement_interval_minutes: u32,
    pub fade_duration_seconds: u32,
    pub background_volume_percent: u8,
    pub last_updated: DateTime<Utc>,
}

impl PlaybackState {
    /// Create a stopped state for a zone with default settings
    pub fn new(zone_id: ZoneId) -> Self {
        Self {
            zone_id,
            queue: Vec::new(),
            queue_position: 0,
            current_track_id: None,
            current_announcement_id: None,
            is_playing: false,
            position_seconds: 0,
            volume: 70,
            source_playlist_ids: Vec::new(),
            shuffle: false,
            repeat: false,
            mode: PlaybackMode::default(),
            announcement_interval_minutes: 30,
            fade_duration_seconds: 3,
            background_volume_percent: 30,
            last_updated: Utc::now(),
        }
    }

    pub fn with_volume(mut self, volume: u8) -> Self {
        self.volume = volume.min(100);
        self
    }

    /// Derive the state-machine status from the record's fields
    pub fn status(&self) -> PlaybackStatus {
        if let Some(announcement) = &self.current_announcement_id {
            return PlaybackStatus::AnnouncementPlaying(announcement.clone());
        }
        match (&self.current_track_id, self.is_playing) {
            (Some(track), true) => PlaybackStatus::Playing(track.clone()),
            (Some(track), false) => PlaybackStatus::Paused(track.clone()),
            (None, _) => PlaybackStatus::Stopped,
        }
    }

    /// Track at the queue cursor, if the queue is non-empty
    pub fn queued_track(&self) -> Option<&TrackId> {
        self.queue.get(self.queue_position)
    }

    /// Whether the queue cursor points inside the queue (or the queue is empty)
    pub fn is_position_valid(&self) -> bool {
        self.queue.is_empty() || self.queue_position < self.queue.len()
    }

    /// Whether a track and an announcement are never current at the same time
    pub fn is_exclusive(&self) -> bool {
        !(self.current_track_id.is_some() && self.current_announcement_id.is_some())
    }

    pub fn touch(&mut self) {
        self.last_updated = Utc::now();
    }
}
