//! Time-of-day values and quiet-hours windows
//!
//! Schedules carry wall-clock times as strings (`"22:00"`, `"7:30 PM"`).
//! [`ClockTime`] parses both 24-hour and 12-hour forms and serializes back
//! to 24-hour `HH:MM` (or `HH:MM:SS` when seconds are set).

use std::fmt;
use std::str::FromStr;

use chrono::{Datelike, NaiveDate, NaiveTime, Timelike};
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ModelError;

const SECONDS_PER_DAY: u32 = 24 * 60 * 60;

/// A wall-clock time of day
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ClockTime(NaiveTime);

impl ClockTime {
    pub fn new(time: NaiveTime) -> Self {
        Self(time)
    }

    /// Build from hour and minute, returning `None` when out of range
    pub fn from_hm(hour: u32, minute: u32) -> Option<Self> {
        NaiveTime::from_hms_opt(hour, minute, 0).map(Self)
    }

    pub fn time(&self) -> NaiveTime {
        self.0
    }

    /// Seconds elapsed since midnight
    pub fn seconds_from_midnight(&self) -> u32 {
        self.0.num_seconds_from_midnight()
    }

    /// Minutes elapsed since midnight, ignoring seconds
    pub fn minutes_from_midnight(&self) -> u32 {
        self.0.hour() * 60 + self.0.minute()
    }

    fn parse_24h(s: &str) -> Option<NaiveTime> {
        NaiveTime::parse_from_str(s, "%H:%M")
            .or_else(|_| NaiveTime::parse_from_str(s, "%H:%M:%S"))
            .ok()
    }

    fn parse_12h(s: &str, pm: bool) -> Option<NaiveTime> {
        let (hour, minute) = s.split_once(':')?;
        let hour: u32 = hour.trim().parse().ok()?;
        let minute: u32 = minute.trim().parse().ok()?;
        if !(1..=12).contains(&hour) {
            return None;
        }
        let hour = match (hour, pm) {
            (12, false) => 0,
            (12, true) => 12,
            (h, true) => h + 12,
            (h, false) => h,
        };
        NaiveTime::from_hms_opt(hour, minute, 0)
    }
}

impl FromStr for ClockTime {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let upper = trimmed.to_ascii_uppercase();

        let parsed = if let Some(rest) = upper.strip_suffix("PM") {
            Self::parse_12h(rest.trim_end(), true)
        } else if let Some(rest) = upper.strip_suffix("AM") {
            Self::parse_12h(rest.trim_end(), false)
        } else {
            Self::parse_24h(trimmed)
        };

        parsed
            .map(Self)
            .ok_or_else(|| ModelError::InvalidClockTime(s.to_string()))
    }
}

impl fmt::Display for ClockTime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.0.second() == 0 {
            write!(f, "{}", self.0.format("%H:%M"))
        } else {
            write!(f, "{}", self.0.format("%H:%M:%S"))
        }
    }
}

impl Serialize for ClockTime {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ClockTime {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A daily time window during which interval announcements are suppressed
///
/// Both ends are inclusive. When `start > end` the window spans midnight,
/// e.g. 22:00–08:00 covers late evening and early morning.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuietHours {
    pub start: ClockTime,
    pub end: ClockTime,
}

impl QuietHours {
    pub fn new(start: ClockTime, end: ClockTime) -> Self {
        Self { start, end }
    }

    /// Whether the window spans midnight
    pub fn is_overnight(&self) -> bool {
        self.start > self.end
    }

    /// Check whether a time of day falls inside the window
    pub fn contains(&self, time: NaiveTime) -> bool {
        let start = self.start.time();
        let end = self.end.time();
        if start <= end {
            start <= time && time <= end
        } else {
            time >= start || time <= end
        }
    }
}

/// Weekday index using 0 = Sunday through 6 = Saturday
pub fn weekday_index(date: NaiveDate) -> u8 {
    date.weekday().num_days_from_sunday() as u8
}

/// Seconds since midnight for a time of day, clamped to one day
pub fn seconds_since_midnight(time: NaiveTime) -> u32 {
    time.num_seconds_from_midnight() % SECONDS_PER_DAY
}
