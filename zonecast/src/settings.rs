//! Settings file
//!
//! Settings are read from `<config_dir>/zonecast/settings.json` (or an
//! explicit path). A missing file means defaults; every field is optional:
//!
//! ```json
//! {
//!   "logMode": "development",
//!   "engine": { "restartThresholdSeconds": 3, "backgroundVolumePercent": 30 },
//!   "scheduler": { "tickIntervalSeconds": 60, "utcOffsetMinutes": -300 }
//! }
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use zonecast_engine::EngineConfig;
use zonecast_scheduler::SchedulerConfig;

use crate::error::{Result, ZonecastError};
use crate::logging::LoggingMode;

/// Scheduler section of the settings file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SchedulerSettings {
    pub tick_interval_seconds: u64,
    pub timeline_tolerance_seconds: u64,
    pub datetime_tolerance_minutes: u64,
    pub dispatch_timeout_seconds: u64,
    /// Site wall clock relative to UTC
    pub utc_offset_minutes: i32,
}

impl Default for SchedulerSettings {
    fn default() -> Self {
        let config = SchedulerConfig::default();
        Self {
            tick_interval_seconds: config.tick_interval.as_secs(),
            timeline_tolerance_seconds: config.timeline_tolerance.as_secs(),
            datetime_tolerance_minutes: config.datetime_tolerance.as_secs() / 60,
            dispatch_timeout_seconds: config.dispatch_timeout.as_secs(),
            utc_offset_minutes: config.utc_offset.local_minus_utc() / 60,
        }
    }
}

impl SchedulerSettings {
    pub fn to_config(&self) -> Result<SchedulerConfig> {
        let config = SchedulerConfig {
            tick_interval: Duration::from_secs(self.tick_interval_seconds),
            timeline_tolerance: Duration::from_secs(self.timeline_tolerance_seconds),
            datetime_tolerance: Duration::from_secs(self.datetime_tolerance_minutes * 60),
            dispatch_timeout: Duration::from_secs(self.dispatch_timeout_seconds),
            ..SchedulerConfig::default()
        }
        .with_utc_offset_seconds(self.utc_offset_minutes.saturating_mul(60))?;
        config.validate()?;
        Ok(config)
    }
}

/// Everything configurable about a [`ZonecastSystem`](crate::ZonecastSystem)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Settings {
    pub log_mode: LoggingMode,
    pub engine: EngineConfig,
    pub scheduler: SchedulerSettings,
}

impl Settings {
    /// `<config_dir>/zonecast/settings.json`
    pub fn default_path() -> Result<PathBuf> {
        let base = dirs::config_dir().ok_or(ZonecastError::NoConfigDir)?;
        Ok(base.join("zonecast").join("settings.json"))
    }

    /// Load from the default location
    pub fn load() -> Result<Self> {
        Self::load_from(Self::default_path()?)
    }

    /// Load from `path`, falling back to defaults when the file is absent
    pub fn load_from(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = match std::fs::read_to_string(path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No settings at {}, using defaults", path.display());
                return Ok(Self::default());
            }
            Err(e) => return Err(e.into()),
        };

        let settings: Settings = serde_json::from_str(&raw).map_err(|e| ZonecastError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        settings.validate().map_err(|e| ZonecastError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        tracing::info!("Loaded settings from {}", path.display());
        Ok(settings)
    }

    /// Write as pretty JSON, creating parent directories
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| ZonecastError::Settings {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        std::fs::write(path, json)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        self.engine.validate()?;
        self.scheduler.to_config()?;
        Ok(())
    }

    pub fn engine_config(&self) -> EngineConfig {
        self.engine.clone()
    }

    pub fn scheduler_config(&self) -> Result<SchedulerConfig> {
        self.scheduler.to_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_path() -> PathBuf {
        std::env::temp_dir()
            .join(format!("zonecast-{}", uuid::Uuid::new_v4()))
            .join("settings.json")
    }

    #[test]
    fn test_defaults_round_through_config() {
        let settings = Settings::default();
        let config = settings.scheduler_config().unwrap();
        assert_eq!(config, SchedulerConfig::default());
        assert_eq!(settings.log_mode, LoggingMode::Silent);
    }

    #[test]
    fn test_missing_file_is_default() {
        let settings = Settings::load_from(temp_path()).unwrap();
        assert_eq!(settings, Settings::default());
    }

    #[test]
    fn test_partial_file() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(
            &path,
            r#"{"logMode":"json","scheduler":{"utcOffsetMinutes":-300},"engine":{"restartThresholdSeconds":5}}"#,
        )
        .unwrap();

        let settings = Settings::load_from(&path).unwrap();
        assert_eq!(settings.log_mode, LoggingMode::Json);
        assert_eq!(settings.engine.restart_threshold_seconds, 5);
        assert_eq!(settings.engine.background_volume_percent, 30);

        let config = settings.scheduler_config().unwrap();
        assert_eq!(config.utc_offset.local_minus_utc(), -300 * 60);
        assert_eq!(config.tick_interval, Duration::from_secs(60));
    }

    #[test]
    fn test_invalid_file_reports_path() {
        let path = temp_path();
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, r#"{"scheduler":{"tickIntervalSeconds":0}}"#).unwrap();

        let err = Settings::load_from(&path).unwrap_err();
        assert!(matches!(err, ZonecastError::Settings { path: p, .. } if p == path));
    }

    #[test]
    fn test_save_then_load() {
        let path = temp_path();
        let mut settings = Settings::default();
        settings.scheduler.dispatch_timeout_seconds = 3;
        settings.save_to(&path).unwrap();
        assert_eq!(Settings::load_from(&path).unwrap(), settings);
    }
}
