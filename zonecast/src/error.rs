use std::path::PathBuf;

use thiserror::Error;
use zonecast_engine::EngineError;
use zonecast_scheduler::SchedulerError;

use crate::logging::LoggingError;

pub type Result<T> = std::result::Result<T, ZonecastError>;

#[derive(Error, Debug)]
pub enum ZonecastError {
    #[error("Playback error: {0}")]
    Engine(#[from] EngineError),

    #[error("Scheduler error: {0}")]
    Scheduler(#[from] SchedulerError),

    #[error("Logging error: {0}")]
    Logging(#[from] LoggingError),

    #[error("Invalid settings in {path}: {reason}")]
    Settings { path: PathBuf, reason: String },

    #[error("Settings I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("No configuration directory available on this platform")]
    NoConfigDir,

    #[error("Scheduler is already running")]
    SchedulerRunning,
}
