//! Zonecast data model
//!
//! Plain data types shared by the playback engine and the schedule runner:
//!
//! - **Identifiers**: [`ZoneId`], [`TrackId`], [`PlaylistId`], [`AnnouncementId`], [`ScheduleId`]
//! - **Playback**: [`PlaybackState`] (one per zone), [`PlaybackStatus`], [`StatePatch`]
//! - **Scheduling**: [`Schedule`] with its [`ScheduleConfig`] variants
//! - **Audit**: [`PlayEvent`]
//!
//! Nothing in this crate performs I/O or holds locks.

pub mod clock;
pub mod error;
pub mod id_types;
pub mod patch;
pub mod play_event;
pub mod playback;
pub mod schedule;
pub mod zone;

pub use clock::{seconds_since_midnight, weekday_index, ClockTime, QuietHours};
pub use error::{ModelError, Result};
pub use id_types::{AnnouncementId, PlaylistId, ScheduleId, TrackId, ZoneId, ALL_ZONES};
pub use patch::StatePatch;
pub use play_event::{PlayEvent, PlayEventKind, PlayEventStatus};
pub use playback::{PlaybackMode, PlaybackState, PlaybackStatus};
pub use schedule::{
    DateTimeConfig, DateTimeSlot, IntervalConfig, RepeatRule, Schedule, ScheduleConfig,
    TimelineConfig, TimelineCue,
};
pub use zone::Zone;
