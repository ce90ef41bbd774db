//! Playback state persistence and per-zone serialization
//!
//! ```text
//! PlaybackEngine
//! ├── ZoneLocks: DashMap<ZoneId, Arc<Mutex<()>>>   (one writer per zone)
//! └── PlaybackStateRepository                      (load/save by zone)
//!     └── MemoryStateRepository: RwLock<HashMap<ZoneId, PlaybackState>>
//! ```
//!
//! A zone's guard is held from load through save and broadcast, so two
//! mutating operations on the same zone never interleave while operations
//! on different zones run in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};
use zonecast_model::{PlaybackState, ZoneId};

/// Errors from the playback state repository
#[derive(Debug, Clone, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached
    #[error("State store unavailable: {0}")]
    Unavailable(String),

    /// A write was rejected by the backing store
    #[error("Failed to save state for zone {zone_id}: {reason}")]
    WriteFailed { zone_id: ZoneId, reason: String },
}

/// Persistence boundary for per-zone playback state
#[async_trait::async_trait]
pub trait PlaybackStateRepository: Send + Sync + std::fmt::Debug {
    async fn load(&self, zone_id: &ZoneId) -> Result<Option<PlaybackState>, StoreError>;

    async fn save(&self, state: &PlaybackState) -> Result<(), StoreError>;
}

/// In-memory state repository
#[derive(Debug, Default)]
pub struct MemoryStateRepository {
    states: RwLock<HashMap<ZoneId, PlaybackState>>,
}

impl MemoryStateRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of zones with stored state
    pub async fn len(&self) -> usize {
        self.states.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.states.read().await.is_empty()
    }
}

#[async_trait::async_trait]
impl PlaybackStateRepository for MemoryStateRepository {
    async fn load(&self, zone_id: &ZoneId) -> Result<Option<PlaybackState>, StoreError> {
        Ok(self.states.read().await.get(zone_id).cloned())
    }

    async fn save(&self, state: &PlaybackState) -> Result<(), StoreError> {
        self.states
            .write()
            .await
            .insert(state.zone_id.clone(), state.clone());
        Ok(())
    }
}

/// Table of per-zone exclusive locks
///
/// Locks are created on first use. Entries for zones that leave the
/// directory are dropped through [`ZoneLocks::remove`].
#[derive(Debug, Default)]
pub struct ZoneLocks {
    locks: DashMap<ZoneId, Arc<Mutex<()>>>,
}

impl ZoneLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to a zone
    pub async fn acquire(&self, zone_id: &ZoneId) -> OwnedMutexGuard<()> {
        // Clone the Arc out so the shard lock is released before awaiting
        let lock = self
            .locks
            .entry(zone_id.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .value()
            .clone();
        lock.lock_owned().await
    }

    /// Drop a zone's lock unless someone holds or awaits it
    ///
    /// Returns whether the entry is gone.
    pub fn remove(&self, zone_id: &ZoneId) -> bool {
        self.locks
            .remove_if(zone_id, |_, lock| Arc::strong_count(lock) == 1);
        !self.locks.contains_key(zone_id)
    }

    /// Number of zones currently in the table
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}
