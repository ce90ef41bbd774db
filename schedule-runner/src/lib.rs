//! Zonecast schedule runner
//!
//! Decides when announcement schedules are due and injects their
//! announcements into the target zones through the playback engine.
//!
//! - [`ScheduleEvaluator`]: pure due-ness checks for interval, timeline and
//!   datetime schedules
//! - [`AnnouncementSelector`]: which announcement an interval firing plays
//! - [`ScheduleRunner`]: one `tick(now)`, with per-zone failure isolation
//! - [`SchedulerTask`]: the periodic background loop calling `tick`
//!
//! # Example
//!
//! ```rust,ignore
//! let runner = Arc::new(
//!     ScheduleRunner::builder()
//!         .with_schedules(schedules)
//!         .with_dispatcher(engine)
//!         .with_broadcaster(broadcaster)
//!         .build()?,
//! );
//! let task = SchedulerTask::start(runner);
//! // ...
//! task.shutdown().await?;
//! ```

pub mod config;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod repository;
pub mod runner;
pub mod selection;
pub mod task;

pub use config::SchedulerConfig;
pub use dispatch::AnnouncementDispatch;
pub use error::{Result, SchedulerError};
pub use evaluator::ScheduleEvaluator;
pub use repository::{MemoryScheduleRepository, RepositoryError, ScheduleRepository};
pub use runner::{ScheduleOutcome, ScheduleRunner, ScheduleRunnerBuilder, SkipReason, TickReport};
pub use selection::AnnouncementSelector;
pub use task::SchedulerTask;
