//! Zone description as provided by the zone directory

use serde::{Deserialize, Serialize};

use crate::id_types::ZoneId;

/// An addressable playback target (a physical area with one or more speakers)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Zone {
    pub id: ZoneId,
    pub name: String,
    /// Volume applied when the zone's playback state is first created
    pub default_volume: u8,
}

impl Zone {
    pub fn new(id: impl Into<ZoneId>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            default_volume: 70,
        }
    }

    pub fn with_default_volume(mut self, volume: u8) -> Self {
        self.default_volume = volume.min(100);
        self
    }
}
