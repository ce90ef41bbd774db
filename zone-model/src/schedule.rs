//! Announcement schedules
//!
//! A [`Schedule`] pairs a firing rule ([`ScheduleConfig`]) with a set of
//! target zones. The config is stored by the management side as a
//! `type`-tagged JSON object:
//!
//! ```json
//! { "type": "interval", "intervalMinutes": 60, "announcementIds": ["a1"],
//!   "avoidRepeat": true, "quietHoursStart": "22:00", "quietHoursEnd": "08:00" }
//! { "type": "timeline", "cycleDurationMinutes": 30,
//!   "announcements": [{ "announcementId": "a1", "timestampSeconds": 300 }] }
//! { "type": "datetime", "dateTimeSlots": [{ "announcementId": "a1",
//!   "date": "2024-01-01", "time": "09:00", "repeat": "weekly", "repeatDays": [1] }] }
//! ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::clock::{ClockTime, QuietHours};
use crate::error::{ModelError, Result};
use crate::id_types::{AnnouncementId, ScheduleId, ZoneId};

fn default_interval_minutes() -> u32 {
    60
}

fn default_cycle_minutes() -> u32 {
    60
}

fn default_true() -> bool {
    true
}

/// Fires every N minutes outside quiet hours
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntervalConfig {
    #[serde(default = "default_interval_minutes")]
    pub interval_minutes: u32,
    #[serde(default)]
    pub announcement_ids: Vec<AnnouncementId>,
    /// Rotate through `announcement_ids` instead of always playing the first
    #[serde(default)]
    pub avoid_repeat: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_start: Option<ClockTime>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub quiet_hours_end: Option<ClockTime>,
}

impl IntervalConfig {
    pub fn new(interval_minutes: u32, announcement_ids: Vec<AnnouncementId>) -> Self {
        Self {
            interval_minutes,
            announcement_ids,
            avoid_repeat: false,
            quiet_hours_start: None,
            quiet_hours_end: None,
        }
    }

    pub fn with_quiet_hours(mut self, start: ClockTime, end: ClockTime) -> Self {
        self.quiet_hours_start = Some(start);
        self.quiet_hours_end = Some(end);
        self
    }

    pub fn with_avoid_repeat(mut self, avoid_repeat: bool) -> Self {
        self.avoid_repeat = avoid_repeat;
        self
    }

    /// Quiet-hours window, present only when both ends are configured
    pub fn quiet_hours(&self) -> Option<QuietHours> {
        match (self.quiet_hours_start, self.quiet_hours_end) {
            (Some(start), Some(end)) => Some(QuietHours::new(start, end)),
            _ => None,
        }
    }
}

/// An announcement placed at an offset inside a timeline cycle
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineCue {
    pub announcement_id: AnnouncementId,
    #[serde(default)]
    pub timestamp_seconds: u32,
}

/// Fires at fixed offsets inside a cycle that repeats from midnight
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TimelineConfig {
    #[serde(default = "default_cycle_minutes")]
    pub cycle_duration_minutes: u32,
    #[serde(default)]
    pub announcements: Vec<TimelineCue>,
}

impl TimelineConfig {
    pub fn cycle_seconds(&self) -> u32 {
        self.cycle_duration_minutes.saturating_mul(60)
    }
}

/// Calendar repeat rule for a date/time slot
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RepeatRule {
    #[default]
    None,
    Daily,
    Weekly,
    Monthly,
    Yearly,
}

/// A calendar slot: a start date, a time of day and an optional repeat rule
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeSlot {
    pub announcement_id: AnnouncementId,
    pub date: NaiveDate,
    pub time: ClockTime,
    #[serde(default)]
    pub repeat: RepeatRule,
    /// Weekdays for weekly repeats, 0 = Sunday through 6 = Saturday
    #[serde(default)]
    pub repeat_days: Vec<u8>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<NaiveDate>,
}

impl DateTimeSlot {
    pub fn once(announcement_id: AnnouncementId, date: NaiveDate, time: ClockTime) -> Self {
        Self {
            announcement_id,
            date,
            time,
            repeat: RepeatRule::None,
            repeat_days: Vec::new(),
            end_date: None,
        }
    }

    pub fn repeating(mut self, repeat: RepeatRule) -> Self {
        self.repeat = repeat;
        self
    }

    pub fn on_days(mut self, days: Vec<u8>) -> Self {
        self.repeat_days = days;
        self
    }

    pub fn until(mut self, end_date: NaiveDate) -> Self {
        self.end_date = Some(end_date);
        self
    }

    /// Why this slot can never fire, if it is unusable
    ///
    /// Covers an end date before the start date, a weekly repeat without
    /// `repeatDays`, and weekday indexes outside 0-6. Sibling slots in the
    /// same schedule are unaffected.
    pub fn problem(&self) -> Option<String> {
        if let Some(end) = self.end_date {
            if end < self.date {
                return Some(format!("ends ({}) before it starts ({})", end, self.date));
            }
        }
        if self.repeat == RepeatRule::Weekly && self.repeat_days.is_empty() {
            return Some("weekly repeat has no repeatDays".to_string());
        }
        if let Some(day) = self.repeat_days.iter().find(|day| **day > 6) {
            return Some(format!("repeatDays entry {} is not 0-6", day));
        }
        None
    }
}

/// Fires at explicit calendar slots
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateTimeConfig {
    #[serde(default)]
    pub date_time_slots: Vec<DateTimeSlot>,
}

/// The three mutually exclusive firing rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ScheduleConfig {
    Interval(IntervalConfig),
    Timeline(TimelineConfig),
    #[serde(rename = "datetime")]
    DateTime(DateTimeConfig),
}

impl ScheduleConfig {
    /// Parse and validate a raw JSON config payload
    pub fn from_value(value: serde_json::Value) -> Result<Self> {
        let config: ScheduleConfig = serde_json::from_value(value)
            .map_err(|e| ModelError::InvalidScheduleConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn kind(&self) -> &'static str {
        match self {
            ScheduleConfig::Interval(_) => "interval",
            ScheduleConfig::Timeline(_) => "timeline",
            ScheduleConfig::DateTime(_) => "datetime",
        }
    }

    /// Check the internal consistency of the config
    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(ModelError::InvalidScheduleConfig(msg));

        match self {
            ScheduleConfig::Interval(config) => {
                if config.interval_minutes == 0 {
                    return invalid("intervalMinutes must be greater than 0".to_string());
                }
                if config.quiet_hours_start.is_some() != config.quiet_hours_end.is_some() {
                    return invalid(
                        "quietHoursStart and quietHoursEnd must be set together".to_string(),
                    );
                }
            }
            ScheduleConfig::Timeline(config) => {
                if config.cycle_duration_minutes == 0 {
                    return invalid("cycleDurationMinutes must be greater than 0".to_string());
                }
            }
            // Slot-level problems only disable the slot itself, see `DateTimeSlot::problem`
            ScheduleConfig::DateTime(_) => {}
        }
        Ok(())
    }

    /// Every announcement referenced by the config, in declaration order
    pub fn announcement_ids(&self) -> Vec<AnnouncementId> {
        match self {
            ScheduleConfig::Interval(config) => config.announcement_ids.clone(),
            ScheduleConfig::Timeline(config) => config
                .announcements
                .iter()
                .map(|cue| cue.announcement_id.clone())
                .collect(),
            ScheduleConfig::DateTime(config) => config
                .date_time_slots
                .iter()
                .map(|slot| slot.announcement_id.clone())
                .collect(),
        }
    }
}

/// A rule describing when to fire which announcements on which zones
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Schedule {
    pub id: ScheduleId,
    pub name: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Higher fires first within a tick
    #[serde(default)]
    pub priority: i32,
    /// Whether the owning client account is active
    #[serde(default = "default_true")]
    pub owner_active: bool,
    pub config: ScheduleConfig,
    #[serde(default)]
    pub zone_ids: Vec<ZoneId>,
    #[serde(default)]
    pub last_executed_at: Option<DateTime<Utc>>,
}

impl Schedule {
    pub fn new(id: impl Into<ScheduleId>, name: impl Into<String>, config: ScheduleConfig) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            priority: 0,
            owner_active: true,
            config,
            zone_ids: Vec::new(),
            last_executed_at: None,
        }
    }

    pub fn with_zones(mut self, zones: impl IntoIterator<Item = ZoneId>) -> Self {
        self.zone_ids = zones.into_iter().collect();
        self
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_last_executed_at(mut self, at: DateTime<Utc>) -> Self {
        self.last_executed_at = Some(at);
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Enabled and owned by an active client
    pub fn is_active(&self) -> bool {
        self.enabled && self.owner_active
    }
}
