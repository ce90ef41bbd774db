//! # Zonecast - background music and announcements for retail zones
//!
//! Each zone of a store plays a music queue built from playlists; scheduled
//! or on-demand announcements interrupt the music and hand back to it where
//! it stopped.
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use zonecast::{MemoryCatalog, ZoneCommand, ZoneTarget, ZonecastSystem};
//!
//! let catalog = Arc::new(
//!     MemoryCatalog::new()
//!         .with_zone(Zone::new("floor", "Shop Floor"))
//!         .with_playlist("morning", &["t1", "t2"])
//!         .with_announcement("closing-soon"),
//! );
//! let system = ZonecastSystem::builder().with_catalog(catalog).build()?;
//!
//! let start = ZoneCommand::StartPlaylists {
//!     playlist_ids: vec![PlaylistId::new("morning")],
//!     shuffle: true,
//! };
//! system.apply(&ZoneTarget::AllZones, &start).await?;
//! system.start_scheduler().await?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! zonecast (system, settings, logging)
//!     ↓
//! zonecast-scheduler (evaluator, runner, ticker)
//!     ↓
//! zonecast-engine (per-zone state machine, broadcaster)
//!     ↓
//! zonecast-model (data types)
//! ```

pub mod command;
pub mod error;
pub mod logging;
pub mod settings;
pub mod system;

pub use command::ZoneCommand;
pub use error::{Result, ZonecastError};
pub use logging::{init_logging, init_logging_from_env, LoggingError, LoggingMode};
pub use settings::{SchedulerSettings, Settings};
pub use system::{ZoneOutcome, ZonecastSystem, ZonecastSystemBuilder};

// Re-export commonly used types from the member crates
pub use zonecast_engine::{
    EngineConfig, EngineError, GlobalEvent, MemoryCatalog, PlaybackEngine, ZoneTarget,
};
pub use zonecast_model::{
    AnnouncementId, PlaybackMode, PlaybackState, PlaybackStatus, PlaylistId, Schedule,
    ScheduleConfig, ScheduleId, StatePatch, TrackId, Zone, ZoneId,
};
pub use zonecast_scheduler::{
    MemoryScheduleRepository, SchedulerConfig, SchedulerError, TickReport,
};
