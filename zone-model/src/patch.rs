//! Field-level updates to a zone's playback state

use serde::{Deserialize, Serialize};

use crate::error::{ModelError, Result};
use crate::playback::{PlaybackMode, PlaybackState};

/// A partial update to a [`PlaybackState`]
///
/// Only fields that are `Some` are applied. Queue, cursor and current
/// track/announcement change only through the engine's transport operations.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct StatePatch {
    pub is_playing: Option<bool>,
    pub position_seconds: Option<i64>,
    pub volume: Option<i64>,
    pub mode: Option<PlaybackMode>,
    pub shuffle: Option<bool>,
    pub repeat: Option<bool>,
    pub announcement_interval_minutes: Option<u32>,
    pub fade_duration_seconds: Option<u32>,
    pub background_volume_percent: Option<i64>,
}

impl StatePatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn playing(mut self, is_playing: bool) -> Self {
        self.is_playing = Some(is_playing);
        self
    }

    pub fn position(mut self, seconds: i64) -> Self {
        self.position_seconds = Some(seconds);
        self
    }

    pub fn volume(mut self, volume: i64) -> Self {
        self.volume = Some(volume);
        self
    }

    pub fn mode(mut self, mode: PlaybackMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = Some(shuffle);
        self
    }

    pub fn repeat(mut self, repeat: bool) -> Self {
        self.repeat = Some(repeat);
        self
    }

    pub fn announcement_interval_minutes(mut self, minutes: u32) -> Self {
        self.announcement_interval_minutes = Some(minutes);
        self
    }

    pub fn fade_duration_seconds(mut self, seconds: u32) -> Self {
        self.fade_duration_seconds = Some(seconds);
        self
    }

    pub fn background_volume_percent(mut self, percent: i64) -> Self {
        self.background_volume_percent = Some(percent);
        self
    }

    /// Whether the patch carries no fields at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Check percentage fields are within 0–100
    pub fn validate(&self) -> Result<()> {
        for value in [self.volume, self.background_volume_percent].into_iter().flatten() {
            if !(0..=100).contains(&value) {
                return Err(ModelError::VolumeOutOfRange(value));
            }
        }
        Ok(())
    }

    /// Validate and apply the patch, leaving `state` untouched on error
    ///
    /// Negative positions are clamped to zero.
    pub fn apply(&self, state: &mut PlaybackState) -> Result<()> {
        self.validate()?;

        if let Some(is_playing) = self.is_playing {
            state.is_playing = is_playing;
        }
        if let Some(position) = self.position_seconds {
            state.position_seconds = position.clamp(0, u32::MAX as i64) as u32;
        }
        if let Some(volume) = self.volume {
            state.volume = volume as u8;
        }
        if let Some(mode) = self.mode {
            state.mode = mode;
        }
        if let Some(shuffle) = self.shuffle {
            state.shuffle = shuffle;
        }
        if let Some(repeat) = self.repeat {
            state.repeat = repeat;
        }
        if let Some(minutes) = self.announcement_interval_minutes {
            state.announcement_interval_minutes = minutes;
        }
        if let Some(seconds) = self.fade_duration_seconds {
            state.fade_duration_seconds = seconds;
        }
        if let Some(percent) = self.background_volume_percent {
            state.background_volume_percent = percent as u8;
        }
        Ok(())
    }
}
