//! Schedule runner
//!
//! One `tick` evaluates every active schedule and fires the due ones:
//!
//! ```text
//! tick(now)
//!  ├─ schedule A ─ is_due? ─ select announcements ─┬─ (zone 1, ann) ─ dispatch ─┐
//!  │                                               └─ (zone 2, ann) ─ dispatch ─┤
//!  │                                                                            ▼
//!  │                                          publish ScheduleExecuted, mark lastExecutedAt
//!  └─ schedule B ─ ...   (schedules and pairs run concurrently)
//! ```
//!
//! Every dispatch is bounded by `dispatch_timeout` and recorded as a
//! [`PlayEvent`]. A failed or stuck zone never blocks its siblings, and
//! never prevents `lastExecutedAt` from being written.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures::future::join_all;
use zonecast_engine::{Broadcaster, GlobalEvent, MemoryPlayEventLog, NullBroadcaster, PlayEventLog};
use zonecast_model::{AnnouncementId, PlayEvent, Schedule, ScheduleId, ZoneId};

use crate::config::SchedulerConfig;
use crate::dispatch::AnnouncementDispatch;
use crate::error::{Result, SchedulerError};
use crate::evaluator::ScheduleEvaluator;
use crate::repository::ScheduleRepository;
use crate::selection::AnnouncementSelector;

/// Why a schedule did not fire in a tick
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    Inactive,
    InvalidConfig,
    NotDue,
    AlreadyFired,
    NoZones,
}

/// Result of evaluating one schedule in a tick
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleOutcome {
    Skipped {
        schedule_id: ScheduleId,
        reason: SkipReason,
    },
    Fired {
        schedule_id: ScheduleId,
        delivered: usize,
        failed: usize,
    },
}

/// Summary of one tick
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub evaluated: usize,
    pub fired: Vec<ScheduleId>,
    pub delivered: usize,
    pub failed: usize,
    pub outcomes: Vec<ScheduleOutcome>,
}

impl TickReport {
    fn from_outcomes(outcomes: Vec<ScheduleOutcome>) -> Self {
        let mut report = TickReport {
            evaluated: outcomes.len(),
            ..Default::default()
        };
        for outcome in &outcomes {
            if let ScheduleOutcome::Fired {
                schedule_id,
                delivered,
                failed,
            } = outcome
            {
                report.fired.push(schedule_id.clone());
                report.delivered += delivered;
                report.failed += failed;
            }
        }
        report.outcomes = outcomes;
        report
    }

    pub fn skipped(&self, reason: SkipReason) -> usize {
        self.outcomes
            .iter()
            .filter(|outcome| matches!(outcome, ScheduleOutcome::Skipped { reason: r, .. } if *r == reason))
            .count()
    }
}

/// Evaluates schedules and dispatches due announcements
#[derive(Debug)]
pub struct ScheduleRunner {
    schedules: Arc<dyn ScheduleRepository>,
    dispatcher: Arc<dyn AnnouncementDispatch>,
    broadcaster: Arc<dyn Broadcaster>,
    play_events: Arc<dyn PlayEventLog>,
    evaluator: ScheduleEvaluator,
    selector: AnnouncementSelector,
    config: SchedulerConfig,
}

impl ScheduleRunner {
    pub fn builder() -> ScheduleRunnerBuilder {
        ScheduleRunnerBuilder::new()
    }

    pub fn config(&self) -> &SchedulerConfig {
        &self.config
    }

    pub fn evaluator(&self) -> &ScheduleEvaluator {
        &self.evaluator
    }

    /// Evaluate every active schedule at `now` and fire the due ones
    ///
    /// Fails only when the schedule list cannot be loaded.
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<TickReport> {
        let mut schedules = self.schedules.enabled_schedules().await?;
        schedules.sort_by(|a, b| b.priority.cmp(&a.priority));

        let outcomes = join_all(schedules.iter().map(|schedule| self.run_schedule(schedule, now))).await;
        let report = TickReport::from_outcomes(outcomes);

        tracing::info!(
            "Checked {} schedules, executed {} ({} delivered, {} failed)",
            report.evaluated,
            report.fired.len(),
            report.delivered,
            report.failed
        );
        Ok(report)
    }

    async fn run_schedule(&self, schedule: &Schedule, now: DateTime<Utc>) -> ScheduleOutcome {
        let skip = |reason| ScheduleOutcome::Skipped {
            schedule_id: schedule.id.clone(),
            reason,
        };

        if !schedule.is_active() {
            return skip(SkipReason::Inactive);
        }

        if let Err(e) = schedule.config.validate() {
            tracing::warn!("Skipping schedule {} ({}): {}", schedule.id, schedule.name, e);
            return skip(SkipReason::InvalidConfig);
        }

        if !self.evaluator.is_due(schedule, now) {
            return skip(SkipReason::NotDue);
        }

        if self.evaluator.fired_in_current_window(schedule, now) {
            tracing::debug!("Schedule {} already fired in this window", schedule.id);
            return skip(SkipReason::AlreadyFired);
        }

        let zone_ids = unique_zones(&schedule.zone_ids);
        if zone_ids.is_empty() {
            tracing::warn!("Schedule {} has no target zones", schedule.id);
            return skip(SkipReason::NoZones);
        }

        let due = self.evaluator.pending_announcements(schedule, now);
        let announcements = self.selector.select(schedule, due);
        if announcements.is_empty() {
            tracing::warn!("Schedule {} is due but has no announcements to play", schedule.id);
        }

        let pairs = zone_ids.iter().flat_map(|zone_id| {
            announcements
                .iter()
                .map(move |announcement_id| (zone_id, announcement_id))
        });
        let results = join_all(
            pairs.map(|(zone_id, announcement_id)| self.dispatch_one(schedule, zone_id, announcement_id, now)),
        )
        .await;

        let delivered = results.iter().filter(|ok| **ok).count();
        let failed = results.len() - delivered;

        self.announce_execution(schedule, &zone_ids, now).await;

        if let Err(e) = self.schedules.mark_executed(&schedule.id, now).await {
            tracing::error!("Failed to record execution of schedule {}: {}", schedule.id, e);
        }

        tracing::info!(
            "Executed schedule {} on {} zones ({} delivered, {} failed)",
            schedule.name,
            zone_ids.len(),
            delivered,
            failed
        );

        ScheduleOutcome::Fired {
            schedule_id: schedule.id.clone(),
            delivered,
            failed,
        }
    }

    /// Deliver one announcement to one zone, recording the attempt
    async fn dispatch_one(
        &self,
        schedule: &Schedule,
        zone_id: &ZoneId,
        announcement_id: &AnnouncementId,
        now: DateTime<Utc>,
    ) -> bool {
        let mut event = PlayEvent::scheduled(
            schedule.id.clone(),
            announcement_id.clone(),
            zone_id.clone(),
            now,
        );
        self.record(&event).await;

        let outcome = tokio::time::timeout(
            self.config.dispatch_timeout,
            self.dispatcher.dispatch(zone_id, announcement_id),
        )
        .await;

        let delivered = match outcome {
            Ok(Ok(())) => {
                event.mark_delivered(Utc::now());
                true
            }
            Ok(Err(e)) => {
                tracing::error!(
                    "Failed to play announcement {} on zone {}: {}",
                    announcement_id,
                    zone_id,
                    e
                );
                event.mark_failed(e.to_string());
                false
            }
            Err(_) => {
                tracing::error!(
                    "Announcement {} on zone {} timed out after {:?}",
                    announcement_id,
                    zone_id,
                    self.config.dispatch_timeout
                );
                event.mark_failed(format!("timed out after {:?}", self.config.dispatch_timeout));
                false
            }
        };

        self.record(&event).await;
        delivered
    }

    async fn record(&self, event: &PlayEvent) {
        if let Err(e) = self.play_events.record(event).await {
            tracing::warn!("Failed to record play event {}: {}", event.id, e);
        }
    }

    async fn announce_execution(&self, schedule: &Schedule, zone_ids: &[ZoneId], now: DateTime<Utc>) {
        let event = GlobalEvent::ScheduleExecuted {
            schedule_id: schedule.id.clone(),
            schedule_name: schedule.name.clone(),
            zone_ids: zone_ids.to_vec(),
            executed_at: now,
            triggered_by: "schedule".to_string(),
        };
        if let Err(e) = self.broadcaster.publish_global(&event).await {
            tracing::debug!("Schedule {} execution notification not sent: {}", schedule.name, e);
        }
    }
}

fn unique_zones(zone_ids: &[ZoneId]) -> Vec<ZoneId> {
    let mut unique: Vec<ZoneId> = Vec::with_capacity(zone_ids.len());
    for zone_id in zone_ids {
        if !unique.contains(zone_id) {
            unique.push(zone_id.clone());
        }
    }
    unique
}

/// Builder for [`ScheduleRunner`]
#[derive(Debug, Default)]
pub struct ScheduleRunnerBuilder {
    schedules: Option<Arc<dyn ScheduleRepository>>,
    dispatcher: Option<Arc<dyn AnnouncementDispatch>>,
    broadcaster: Option<Arc<dyn Broadcaster>>,
    play_events: Option<Arc<dyn PlayEventLog>>,
    config: SchedulerConfig,
}

impl ScheduleRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedules(mut self, schedules: Arc<dyn ScheduleRepository>) -> Self {
        self.schedules = Some(schedules);
        self
    }

    pub fn with_dispatcher(mut self, dispatcher: Arc<dyn AnnouncementDispatch>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    /// Defaults to [`NullBroadcaster`]
    pub fn with_broadcaster(mut self, broadcaster: Arc<dyn Broadcaster>) -> Self {
        self.broadcaster = Some(broadcaster);
        self
    }

    /// Defaults to [`MemoryPlayEventLog`]
    pub fn with_play_event_log(mut self, play_events: Arc<dyn PlayEventLog>) -> Self {
        self.play_events = Some(play_events);
        self
    }

    pub fn with_config(mut self, config: SchedulerConfig) -> Self {
        self.config = config;
        self
    }

    pub fn build(self) -> Result<ScheduleRunner> {
        self.config.validate()?;

        let schedules = self.schedules.ok_or_else(|| {
            SchedulerError::Configuration("schedule repository is required".to_string())
        })?;
        let dispatcher = self
            .dispatcher
            .ok_or_else(|| SchedulerError::Configuration("dispatcher is required".to_string()))?;

        Ok(ScheduleRunner {
            schedules,
            dispatcher,
            broadcaster: self.broadcaster.unwrap_or_else(|| Arc::new(NullBroadcaster)),
            play_events: self
                .play_events
                .unwrap_or_else(|| Arc::new(MemoryPlayEventLog::new())),
            evaluator: ScheduleEvaluator::new(&self.config),
            selector: AnnouncementSelector::new(),
            config: self.config,
        })
    }
}
