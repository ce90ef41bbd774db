//! Control-surface commands
//!
//! A [`ZoneCommand`] is one playback operation addressed to a
//! [`ZoneTarget`](zonecast_engine::ZoneTarget). Commands deserialize from
//! the `action`-tagged JSON a control surface sends:
//!
//! ```json
//! { "action": "setVolume", "volume": 40 }
//! { "action": "startPlaylists", "playlistIds": ["p1"], "shuffle": true }
//! ```

use serde::{Deserialize, Serialize};
use zonecast_engine::{EngineError, PlaybackEngine, Result as EngineResult};
use zonecast_model::{AnnouncementId, PlaybackState, PlaylistId, StatePatch, TrackId, ZoneId};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum ZoneCommand {
    StartPlaylists {
        playlist_ids: Vec<PlaylistId>,
        #[serde(default)]
        shuffle: bool,
    },
    StartTracks {
        track_ids: Vec<TrackId>,
        #[serde(default)]
        shuffle: bool,
    },
    Next,
    Previous,
    Pause,
    Resume,
    SetVolume {
        volume: i64,
    },
    Seek {
        position_seconds: i64,
    },
    PlayAnnouncement {
        announcement_id: AnnouncementId,
    },
    ResumeAfterAnnouncement,
    Update {
        patch: StatePatch,
    },
}

impl ZoneCommand {
    /// Reject commands that would fail identically on every zone
    pub fn validate(&self) -> EngineResult<()> {
        match self {
            ZoneCommand::SetVolume { volume } if !(0..=100).contains(volume) => {
                Err(EngineError::InvalidVolume(*volume))
            }
            ZoneCommand::Update { patch } => Ok(patch.validate()?),
            _ => Ok(()),
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            ZoneCommand::StartPlaylists { .. } => "startPlaylists",
            ZoneCommand::StartTracks { .. } => "startTracks",
            ZoneCommand::Next => "next",
            ZoneCommand::Previous => "previous",
            ZoneCommand::Pause => "pause",
            ZoneCommand::Resume => "resume",
            ZoneCommand::SetVolume { .. } => "setVolume",
            ZoneCommand::Seek { .. } => "seek",
            ZoneCommand::PlayAnnouncement { .. } => "playAnnouncement",
            ZoneCommand::ResumeAfterAnnouncement => "resumeAfterAnnouncement",
            ZoneCommand::Update { .. } => "update",
        }
    }

    /// Run against one concrete zone
    pub(crate) async fn execute(&self, engine: &PlaybackEngine, zone_id: &ZoneId) -> EngineResult<PlaybackState> {
        match self {
            ZoneCommand::StartPlaylists { playlist_ids, shuffle } => {
                engine.start_with_playlists(zone_id, playlist_ids, *shuffle).await
            }
            ZoneCommand::StartTracks { track_ids, shuffle } => {
                engine.start_with_tracks(zone_id, track_ids.clone(), *shuffle).await
            }
            ZoneCommand::Next => engine.next(zone_id).await,
            ZoneCommand::Previous => engine.previous(zone_id).await,
            ZoneCommand::Pause => engine.pause(zone_id).await,
            ZoneCommand::Resume => engine.resume(zone_id).await,
            ZoneCommand::SetVolume { volume } => engine.set_volume(zone_id, *volume).await,
            ZoneCommand::Seek { position_seconds } => engine.seek(zone_id, *position_seconds).await,
            ZoneCommand::PlayAnnouncement { announcement_id } => {
                engine.handle_announcement(zone_id, announcement_id).await
            }
            ZoneCommand::ResumeAfterAnnouncement => engine.resume_after_announcement(zone_id).await,
            ZoneCommand::Update { patch } => engine.update_state(zone_id, patch.clone()).await,
        }
    }
}
