//! Zone targeting for control surfaces
//!
//! Control surfaces accept either a concrete zone or the `"all-zones"`
//! sentinel. The sentinel is expanded here, at the boundary; the engine
//! itself only ever sees concrete zones.

use std::fmt;
use std::str::FromStr;

use zonecast_model::{ZoneId, ALL_ZONES};

use crate::catalog::ZoneDirectory;
use crate::error::Result;

/// A control-surface zone selector
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ZoneTarget {
    AllZones,
    Zone(ZoneId),
}

impl ZoneTarget {
    /// Resolve to the concrete zones this target addresses
    pub async fn expand(&self, directory: &dyn ZoneDirectory) -> Result<Vec<ZoneId>> {
        match self {
            ZoneTarget::Zone(zone_id) => Ok(vec![zone_id.clone()]),
            ZoneTarget::AllZones => {
                let zones = directory.list_zones().await?;
                tracing::debug!("Expanded {} to {} zones", ALL_ZONES, zones.len());
                Ok(zones.into_iter().map(|zone| zone.id).collect())
            }
        }
    }
}

impl From<ZoneId> for ZoneTarget {
    fn from(zone_id: ZoneId) -> Self {
        if zone_id.is_all_zones() {
            ZoneTarget::AllZones
        } else {
            ZoneTarget::Zone(zone_id)
        }
    }
}

impl FromStr for ZoneTarget {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(ZoneId::new(s).into())
    }
}

impl fmt::Display for ZoneTarget {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ZoneTarget::AllZones => f.write_str(ALL_ZONES),
            ZoneTarget::Zone(zone_id) => write!(f, "{}", zone_id),
        }
    }
}
