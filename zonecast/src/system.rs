//! ZonecastSystem - wiring of engine, runner and broadcaster
//!
//! ```text
//!  control surface ──ZoneTarget + ZoneCommand──▶ ZonecastSystem
//!                                                  │ expand "all-zones"
//!                                                  ▼
//!                     SchedulerTask ──tick──▶ ScheduleRunner ──▶ PlaybackEngine ──▶ ChannelBroadcaster
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::future::join_all;
use tokio::sync::{broadcast, Mutex};
use zonecast_engine::{
    AnnouncementCatalog, ChannelBroadcaster, GlobalEvent, MemoryCatalog, MemoryPlayEventLog,
    PlayEventLog, PlaybackEngine, PlaybackStateRepository, Result as EngineResult, TrackCatalog,
    ZoneDirectory, ZoneTarget,
};
use zonecast_model::{PlayEvent, PlaybackState, Schedule, ZoneId};
use zonecast_scheduler::{
    MemoryScheduleRepository, ScheduleRepository, ScheduleRunner, SchedulerTask, TickReport,
};

use crate::command::ZoneCommand;
use crate::error::{Result, ZonecastError};
use crate::settings::Settings;

/// Result of a command on one zone of a target
#[derive(Debug)]
pub struct ZoneOutcome {
    pub zone_id: ZoneId,
    pub result: EngineResult<PlaybackState>,
}

impl ZoneOutcome {
    pub fn is_ok(&self) -> bool {
        self.result.is_ok()
    }
}

/// Main entry point: playback control, scheduling and state subscriptions
///
/// # Example
///
/// ```rust,ignore
/// let system = ZonecastSystem::builder()
///     .with_catalog(catalog)
///     .with_settings(Settings::load()?)
///     .build()?;
///
/// system.apply(&ZoneTarget::AllZones, &ZoneCommand::SetVolume { volume: 40 }).await?;
/// system.start_scheduler().await?;
/// ```
#[derive(Debug)]
pub struct ZonecastSystem {
    engine: Arc<PlaybackEngine>,
    runner: Arc<ScheduleRunner>,
    broadcaster: Arc<ChannelBroadcaster>,
    play_events: Arc<dyn PlayEventLog>,
    zones: Arc<dyn ZoneDirectory>,
    scheduler_task: Mutex<Option<SchedulerTask>>,
    settings: Settings,
}

impl ZonecastSystem {
    pub fn builder() -> ZonecastSystemBuilder {
        ZonecastSystemBuilder::new()
    }

    pub fn engine(&self) -> &Arc<PlaybackEngine> {
        &self.engine
    }

    pub fn runner(&self) -> &Arc<ScheduleRunner> {
        &self.runner
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Concrete zones a target addresses
    pub async fn resolve(&self, target: &ZoneTarget) -> Result<Vec<ZoneId>> {
        Ok(target.expand(self.zones.as_ref()).await?)
    }

    /// Run a command on every zone of a target
    ///
    /// Commands that are invalid regardless of zone fail up front. Otherwise
    /// each zone gets its own outcome; one zone failing does not affect the
    /// others.
    pub async fn apply(&self, target: &ZoneTarget, command: &ZoneCommand) -> Result<Vec<ZoneOutcome>> {
        command.validate()?;
        let zone_ids = self.resolve(target).await?;

        let results = join_all(
            zone_ids
                .iter()
                .map(|zone_id| self.execute(zone_id, command)),
        )
        .await;

        let outcomes: Vec<ZoneOutcome> = zone_ids
            .into_iter()
            .zip(results)
            .map(|(zone_id, result)| ZoneOutcome { zone_id, result })
            .collect();

        let failed = outcomes.iter().filter(|outcome| !outcome.is_ok()).count();
        if failed > 0 {
            tracing::warn!(
                "{} failed on {} of {} zones for target {}",
                command.name(),
                failed,
                outcomes.len(),
                target
            );
        }
        Ok(outcomes)
    }

    async fn execute(&self, zone_id: &ZoneId, command: &ZoneCommand) -> EngineResult<PlaybackState> {
        let ZoneCommand::PlayAnnouncement { announcement_id } = command else {
            return command.execute(&self.engine, zone_id).await;
        };

        let mut event = PlayEvent::instant(announcement_id.clone(), zone_id.clone(), Utc::now());
        let result = command.execute(&self.engine, zone_id).await;
        match &result {
            Ok(_) => event.mark_delivered(Utc::now()),
            Err(e) => event.mark_failed(e.to_string()),
        }
        if let Err(e) = self.play_events.record(&event).await {
            tracing::warn!("Failed to record play event {}: {}", event.id, e);
        }
        result
    }

    /// Current state of a zone, `None` before its first command
    pub async fn state(&self, zone_id: &ZoneId) -> Result<Option<PlaybackState>> {
        Ok(self.engine.state(zone_id).await?)
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// State snapshots published after every change on a zone
    pub fn subscribe(&self, zone_id: &ZoneId) -> broadcast::Receiver<PlaybackState> {
        self.broadcaster.subscribe(zone_id)
    }

    /// Schedule executions and other global notifications
    pub fn subscribe_global(&self) -> broadcast::Receiver<GlobalEvent> {
        self.broadcaster.subscribe_global()
    }

    // ========================================================================
    // Scheduling
    // ========================================================================

    /// Start the periodic scheduler
    pub async fn start_scheduler(&self) -> Result<()> {
        let mut task = self.scheduler_task.lock().await;
        if task.as_ref().is_some_and(SchedulerTask::is_running) {
            return Err(ZonecastError::SchedulerRunning);
        }
        *task = Some(SchedulerTask::start(Arc::clone(&self.runner)));
        Ok(())
    }

    /// Stop the periodic scheduler if it is running
    pub async fn stop_scheduler(&self) -> Result<()> {
        let task = self.scheduler_task.lock().await.take();
        if let Some(task) = task {
            task.shutdown().await?;
        }
        Ok(())
    }

    pub async fn is_scheduler_running(&self) -> bool {
        self.scheduler_task
            .lock()
            .await
            .as_ref()
            .is_some_and(SchedulerTask::is_running)
    }

    /// Run one scheduler tick immediately
    pub async fn tick_now(&self) -> Result<TickReport> {
        Ok(self.runner.tick(Utc::now()).await?)
    }

    /// Countdown until a schedule is next due
    pub fn next_due_in(&self, schedule: &Schedule) -> Option<Duration> {
        self.runner.evaluator().next_due_in(schedule, Utc::now())
    }

    /// Stop background work
    pub async fn shutdown(self) -> Result<()> {
        self.stop_scheduler().await
    }
}

/// Builder for [`ZonecastSystem`]
#[derive(Debug, Default)]
pub struct ZonecastSystemBuilder {
    zones: Option<Arc<dyn ZoneDirectory>>,
    tracks: Option<Arc<dyn TrackCatalog>>,
    announcements: Option<Arc<dyn AnnouncementCatalog>>,
    state_repository: Option<Arc<dyn PlaybackStateRepository>>,
    schedules: Option<Arc<dyn ScheduleRepository>>,
    play_events: Option<Arc<dyn PlayEventLog>>,
    settings: Settings,
}

impl ZonecastSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Use one in-memory catalog for zones, tracks and announcements
    pub fn with_catalog(self, catalog: Arc<MemoryCatalog>) -> Self {
        self.with_zone_directory(catalog.clone())
            .with_track_catalog(catalog.clone())
            .with_announcement_catalog(catalog)
    }

    pub fn with_zone_directory(mut self, zones: Arc<dyn ZoneDirectory>) -> Self {
        self.zones = Some(zones);
        self
    }

    pub fn with_track_catalog(mut self, tracks: Arc<dyn TrackCatalog>) -> Self {
        self.tracks = Some(tracks);
        self
    }

    pub fn with_announcement_catalog(mut self, announcements: Arc<dyn AnnouncementCatalog>) -> Self {
        self.announcements = Some(announcements);
        self
    }

    pub fn with_state_repository(mut self, repository: Arc<dyn PlaybackStateRepository>) -> Self {
        self.state_repository = Some(repository);
        self
    }

    /// Defaults to an empty [`MemoryScheduleRepository`]
    pub fn with_schedules(mut self, schedules: Arc<dyn ScheduleRepository>) -> Self {
        self.schedules = Some(schedules);
        self
    }

    /// Defaults to [`MemoryPlayEventLog`]
    pub fn with_play_event_log(mut self, play_events: Arc<dyn PlayEventLog>) -> Self {
        self.play_events = Some(play_events);
        self
    }

    pub fn with_settings(mut self, settings: Settings) -> Self {
        self.settings = settings;
        self
    }

    pub fn build(self) -> Result<ZonecastSystem> {
        self.settings.validate()?;

        let broadcaster = Arc::new(ChannelBroadcaster::new());

        let mut engine = PlaybackEngine::builder()
            .with_broadcaster(broadcaster.clone())
            .with_config(self.settings.engine_config());
        if let Some(zones) = self.zones {
            engine = engine.with_zone_directory(zones);
        }
        if let Some(tracks) = self.tracks {
            engine = engine.with_track_catalog(tracks);
        }
        if let Some(announcements) = self.announcements {
            engine = engine.with_announcement_catalog(announcements);
        }
        if let Some(repository) = self.state_repository {
            engine = engine.with_repository(repository);
        }
        let engine = Arc::new(engine.build()?);

        let play_events = self
            .play_events
            .unwrap_or_else(|| Arc::new(MemoryPlayEventLog::new()));
        let schedules = self
            .schedules
            .unwrap_or_else(|| Arc::new(MemoryScheduleRepository::new()));

        let runner = Arc::new(
            ScheduleRunner::builder()
                .with_schedules(schedules)
                .with_dispatcher(engine.clone())
                .with_broadcaster(broadcaster.clone())
                .with_play_event_log(play_events.clone())
                .with_config(self.settings.scheduler_config()?)
                .build()?,
        );

        tracing::info!("Zonecast system ready");

        Ok(ZonecastSystem {
            zones: Arc::clone(engine.zone_directory()),
            engine,
            runner,
            broadcaster,
            play_events,
            scheduler_task: Mutex::new(None),
            settings: self.settings,
        })
    }
}
