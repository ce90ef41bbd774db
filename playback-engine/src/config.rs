//! Configuration for the playback engine

use serde::{Deserialize, Serialize};

use crate::error::{EngineError, Result};

/// Engine behavior and defaults for lazily created zone state
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// `previous` restarts the current track instead of stepping back when
    /// the playback offset is past this many seconds
    /// Default: 3
    pub restart_threshold_seconds: u32,

    /// Announcement interval for new zone state
    /// Default: 30
    pub announcement_interval_minutes: u32,

    /// Ducking fade for new zone state
    /// Default: 3
    pub fade_duration_seconds: u32,

    /// Music volume while an announcement plays, for new zone state
    /// Default: 30
    pub background_volume_percent: u8,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            restart_threshold_seconds: 3,
            announcement_interval_minutes: 30,
            fade_duration_seconds: 3,
            background_volume_percent: 30,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.background_volume_percent > 100 {
            return Err(EngineError::InvalidVolume(self.background_volume_percent as i64));
        }
        Ok(())
    }
}
