//! Configuration for the schedule runner
//!
//! The tolerance windows decide how close to a configured offset or slot a
//! tick has to land for the schedule to count as due. They only make sense
//! relative to the tick interval: widening the interval without widening
//! the tolerances makes timeline and datetime schedules miss their slots.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};

use crate::error::{Result, SchedulerError};

/// Configuration for the [`ScheduleRunner`](crate::ScheduleRunner) and its ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SchedulerConfig {
    /// How often the background task calls `tick`
    /// Default: 60 seconds
    pub tick_interval: Duration,

    /// A timeline cue fires when the cycle position is within this distance
    /// Default: 30 seconds
    pub timeline_tolerance: Duration,

    /// A datetime slot fires when the minute of day is within this distance
    /// (whole minutes)
    /// Default: 1 minute
    pub datetime_tolerance: Duration,

    /// Upper bound on a single (zone, announcement) dispatch
    /// Default: 10 seconds
    pub dispatch_timeout: Duration,

    /// Offset of the site's wall clock from UTC, used for time-of-day rules
    /// Default: UTC
    pub utc_offset: FixedOffset,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(60),
            timeline_tolerance: Duration::from_secs(30),
            datetime_tolerance: Duration::from_secs(60),
            dispatch_timeout: Duration::from_secs(10),
            utc_offset: Utc.fix(),
        }
    }
}

impl SchedulerConfig {
    /// Create a new SchedulerConfig with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Short ticks and timeouts for tests and demos
    pub fn fast_ticks() -> Self {
        Self {
            tick_interval: Duration::from_millis(100),
            dispatch_timeout: Duration::from_secs(1),
            ..Default::default()
        }
    }

    /// Evaluate wall-clock rules in a fixed offset from UTC
    pub fn with_utc_offset(mut self, offset: FixedOffset) -> Self {
        self.utc_offset = offset;
        self
    }

    /// Offset in whole seconds east of UTC, rejecting out-of-range values
    pub fn with_utc_offset_seconds(self, seconds: i32) -> Result<Self> {
        let offset = FixedOffset::east_opt(seconds).ok_or_else(|| {
            SchedulerError::Configuration(format!("UTC offset {}s is out of range", seconds))
        })?;
        Ok(self.with_utc_offset(offset))
    }

    pub fn with_tick_interval(mut self, interval: Duration) -> Self {
        self.tick_interval = interval;
        self
    }

    pub fn with_dispatch_timeout(mut self, timeout: Duration) -> Self {
        self.dispatch_timeout = timeout;
        self
    }

    /// Timeline tolerance in whole seconds
    pub fn timeline_tolerance_seconds(&self) -> i64 {
        self.timeline_tolerance.as_secs() as i64
    }

    /// Datetime tolerance in whole minutes
    pub fn datetime_tolerance_minutes(&self) -> i64 {
        (self.datetime_tolerance.as_secs() / 60) as i64
    }

    /// Validate the configuration and return any issues
    pub fn validate(&self) -> Result<()> {
        if self.tick_interval.is_zero() {
            return Err(SchedulerError::Configuration(
                "Tick interval must be greater than 0".to_string(),
            ));
        }

        if self.dispatch_timeout.is_zero() {
            return Err(SchedulerError::Configuration(
                "Dispatch timeout must be greater than 0".to_string(),
            ));
        }

        if self.datetime_tolerance.as_secs() % 60 != 0 {
            return Err(SchedulerError::Configuration(
                "Datetime tolerance must be a whole number of minutes".to_string(),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = SchedulerConfig::default();
        assert_eq!(config.tick_interval, Duration::from_secs(60));
        assert_eq!(config.timeline_tolerance_seconds(), 30);
        assert_eq!(config.datetime_tolerance_minutes(), 1);
        assert_eq!(config.utc_offset.local_minus_utc(), 0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets_validate() {
        assert!(SchedulerConfig::fast_ticks().validate().is_ok());
    }

    #[test]
    fn test_zero_tick_rejected() {
        let config = SchedulerConfig::default().with_tick_interval(Duration::ZERO);
        assert!(matches!(config.validate(), Err(SchedulerError::Configuration(_))));
    }

    #[test]
    fn test_fractional_datetime_tolerance_rejected() {
        let config = SchedulerConfig {
            datetime_tolerance: Duration::from_secs(90),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_utc_offset_seconds() {
        let config = SchedulerConfig::new().with_utc_offset_seconds(-5 * 3600).unwrap();
        assert_eq!(config.utc_offset.local_minus_utc(), -18000);
        assert!(SchedulerConfig::new().with_utc_offset_seconds(100_000).is_err());
    }
}
