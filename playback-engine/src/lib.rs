//! Zonecast playback engine
//!
//! Owns the per-zone playback state machine: queue building from playlists,
//! transport controls, announcement interruption and resumption, and
//! generic field-level updates. Collaborators are injected as traits:
//!
//! ```text
//! ┌────────────────┐      ┌──────────────────┐
//! │ ZoneDirectory  │◀─────│                  │─────▶ PlaybackStateRepository
//! │ TrackCatalog   │◀─────│  PlaybackEngine  │
//! │ AnnouncementCat│◀─────│                  │─────▶ Broadcaster ("playback_{zone}")
//! └────────────────┘      └──────────────────┘
//!                                 │
//!                            ZoneLocks (one mutex per zone)
//! ```
//!
//! In-memory implementations of every collaborator live in [`memory`],
//! [`store`], [`broadcast`] and [`audit`].

pub mod audit;
pub mod broadcast;
pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod memory;
pub mod queue;
pub mod store;
pub mod target;

pub use audit::{MemoryPlayEventLog, PlayEventLog, PlayEventLogError};
pub use broadcast::{
    zone_topic, BroadcastError, Broadcaster, ChannelBroadcaster, GlobalEvent, NullBroadcaster,
    DEFAULT_CHANNEL_CAPACITY, GLOBAL_TOPIC,
};
pub use catalog::{AnnouncementCatalog, CatalogError, TrackCatalog, ZoneDirectory};
pub use config::EngineConfig;
pub use engine::{PlaybackEngine, PlaybackEngineBuilder};
pub use error::{EngineError, Result};
pub use memory::MemoryCatalog;
pub use queue::{dedupe_preserving_order, shuffle_tracks, QueueBuilder};
pub use store::{MemoryStateRepository, PlaybackStateRepository, StoreError, ZoneLocks};
pub use target::ZoneTarget;
