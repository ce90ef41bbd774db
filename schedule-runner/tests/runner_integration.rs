//! Integration tests for the schedule runner.
//!
//! These drive `ScheduleRunner::tick` with explicit timestamps against a
//! real playback engine (or a scripted dispatcher) and verify:
//! - Firing into every target zone and recording `lastExecutedAt`
//! - Per-zone failure and timeout isolation
//! - Global execution events and play-event audit records
//! - The background ticker lifecycle

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Duration as ChronoDuration, NaiveDate, TimeZone, Utc};
use tokio::sync::Mutex;
use zonecast_engine::{
    ChannelBroadcaster, EngineError, GlobalEvent, MemoryCatalog, MemoryPlayEventLog,
    PlayEventLog, PlayEventLogError, PlaybackEngine,
};
use zonecast_model::{
    AnnouncementId, DateTimeConfig, DateTimeSlot, IntervalConfig, PlayEventStatus, PlaylistId,
    RepeatRule, Schedule, ScheduleConfig, ScheduleId, TimelineConfig, TimelineCue, TrackId, Zone,
    ZoneId,
};
use zonecast_scheduler::{
    AnnouncementDispatch, MemoryScheduleRepository, ScheduleRunner, SchedulerConfig,
    SchedulerTask, SkipReason,
};

// ============================================================================
// Test Helpers
// ============================================================================

fn noon() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
}

fn zones(raw: &[&str]) -> Vec<ZoneId> {
    raw.iter().map(|id| ZoneId::new(*id)).collect()
}

fn announcements(raw: &[&str]) -> Vec<AnnouncementId> {
    raw.iter().map(|id| AnnouncementId::new(*id)).collect()
}

fn interval_schedule(id: &str, anns: &[&str], targets: &[&str]) -> Schedule {
    Schedule::new(
        id,
        format!("Interval {}", id),
        ScheduleConfig::Interval(IntervalConfig::new(60, announcements(anns))),
    )
    .with_zones(zones(targets))
}

struct Harness {
    engine: Arc<PlaybackEngine>,
    schedules: Arc<MemoryScheduleRepository>,
    broadcaster: Arc<ChannelBroadcaster>,
    play_events: Arc<MemoryPlayEventLog>,
    runner: Arc<ScheduleRunner>,
}

fn create_harness(schedules: Vec<Schedule>, config: SchedulerConfig) -> Harness {
    let catalog = Arc::new(
        MemoryCatalog::new()
            .with_zone(Zone::new("z1", "Front"))
            .with_zone(Zone::new("z2", "Back"))
            .with_playlist("p1", &["t1", "t2", "t3"])
            .with_announcement("a1")
            .with_announcement("a2")
            .with_announcement("a3"),
    );
    let broadcaster = Arc::new(ChannelBroadcaster::new());
    let engine = Arc::new(
        PlaybackEngine::builder()
            .with_zone_directory(catalog.clone())
            .with_track_catalog(catalog.clone())
            .with_announcement_catalog(catalog)
            .with_broadcaster(broadcaster.clone())
            .build()
            .expect("Failed to build engine"),
    );
    let schedules = Arc::new(MemoryScheduleRepository::with_schedules(schedules));
    let play_events = Arc::new(MemoryPlayEventLog::new());
    let runner = Arc::new(
        ScheduleRunner::builder()
            .with_schedules(schedules.clone())
            .with_dispatcher(engine.clone())
            .with_broadcaster(broadcaster.clone())
            .with_play_event_log(play_events.clone())
            .with_config(config)
            .build()
            .expect("Failed to build runner"),
    );

    Harness {
        engine,
        schedules,
        broadcaster,
        play_events,
        runner,
    }
}

/// Dispatcher that records calls and never returns for one zone
#[derive(Debug, Default)]
struct ScriptedDispatcher {
    calls: Mutex<Vec<(ZoneId, AnnouncementId)>>,
}

#[async_trait::async_trait]
impl AnnouncementDispatch for ScriptedDispatcher {
    async fn dispatch(&self, zone_id: &ZoneId, announcement_id: &AnnouncementId) -> Result<(), EngineError> {
        self.calls
            .lock()
            .await
            .push((zone_id.clone(), announcement_id.clone()));
        if zone_id.as_str() == "stuck" {
            std::future::pending::<()>().await;
        }
        Ok(())
    }
}

/// Play-event log whose backend is always down
#[derive(Debug, Default)]
struct OfflinePlayEventLog;

#[async_trait::async_trait]
impl PlayEventLog for OfflinePlayEventLog {
    async fn record(&self, _event: &zonecast_model::PlayEvent) -> Result<(), PlayEventLogError> {
        Err(PlayEventLogError::Unavailable("audit database offline".to_string()))
    }
}

// ============================================================================
// Firing
// ============================================================================

#[tokio::test]
async fn test_interval_fires_into_every_zone() {
    let harness = create_harness(
        vec![interval_schedule("s1", &["a1"], &["z1", "z2"])],
        SchedulerConfig::default(),
    );
    let z1 = ZoneId::new("z1");
    harness
        .engine
        .start_with_playlists(&z1, &[PlaylistId::new("p1")], false)
        .await
        .unwrap();
    harness.engine.next(&z1).await.unwrap();
    let mut global_rx = harness.broadcaster.subscribe_global();

    let report = harness.runner.tick(noon()).await.unwrap();
    assert_eq!(report.fired, vec![ScheduleId::new("s1")]);
    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 0);

    for zone in zones(&["z1", "z2"]) {
        let state = harness.engine.state(&zone).await.unwrap().unwrap();
        assert_eq!(state.current_announcement_id, Some(AnnouncementId::new("a1")));
        assert_eq!(state.current_track_id, None);
    }

    // Music resumes where it was interrupted
    let state = harness.engine.resume_after_announcement(&z1).await.unwrap();
    assert_eq!(state.current_track_id, Some(TrackId::new("t2")));

    let stored = harness.schedules.get(&ScheduleId::new("s1")).await.unwrap();
    assert_eq!(stored.last_executed_at, Some(noon()));

    let event = tokio::time::timeout(Duration::from_secs(1), global_rx.recv())
        .await
        .expect("Timeout waiting for global event")
        .expect("Channel closed");
    match event {
        GlobalEvent::ScheduleExecuted {
            schedule_id,
            zone_ids,
            executed_at,
            triggered_by,
            ..
        } => {
            assert_eq!(schedule_id, ScheduleId::new("s1"));
            assert_eq!(zone_ids, zones(&["z1", "z2"]));
            assert_eq!(executed_at, noon());
            assert_eq!(triggered_by, "schedule");
        }
    }

    assert_eq!(
        harness
            .play_events
            .count_with_status(PlayEventStatus::Delivered)
            .await,
        2
    );
}

#[tokio::test]
async fn test_interval_does_not_refire_before_elapsed() {
    let harness = create_harness(
        vec![interval_schedule("s1", &["a1"], &["z1"])],
        SchedulerConfig::default(),
    );

    let first = harness.runner.tick(noon()).await.unwrap();
    assert_eq!(first.fired.len(), 1);

    let second = harness
        .runner
        .tick(noon() + ChronoDuration::minutes(1))
        .await
        .unwrap();
    assert!(second.fired.is_empty());
    assert_eq!(second.skipped(SkipReason::NotDue), 1);

    let later = harness
        .runner
        .tick(noon() + ChronoDuration::minutes(60))
        .await
        .unwrap();
    assert_eq!(later.fired.len(), 1);
}

#[tokio::test]
async fn test_datetime_slot_fires_once_per_window() {
    let slot = DateTimeSlot::once(
        AnnouncementId::new("a2"),
        NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
        "12:00".parse().unwrap(),
    )
    .repeating(RepeatRule::Daily);
    let schedule = Schedule::new(
        "s2",
        "Opening",
        ScheduleConfig::DateTime(DateTimeConfig {
            date_time_slots: vec![slot],
        }),
    )
    .with_zones(zones(&["z1"]));
    let harness = create_harness(vec![schedule], SchedulerConfig::default());

    let mut fired = 0;
    for minute in -2..=2 {
        let report = harness
            .runner
            .tick(noon() + ChronoDuration::minutes(minute))
            .await
            .unwrap();
        fired += report.fired.len();
    }
    assert_eq!(fired, 1);

    let next_day = harness
        .runner
        .tick(noon() + ChronoDuration::days(1))
        .await
        .unwrap();
    assert_eq!(next_day.fired.len(), 1);
}

#[tokio::test]
async fn test_timeline_cues_a_minute_apart_both_fire() {
    let schedule = Schedule::new(
        "s4",
        "Store tour",
        ScheduleConfig::Timeline(TimelineConfig {
            cycle_duration_minutes: 30,
            announcements: vec![
                TimelineCue {
                    announcement_id: AnnouncementId::new("a1"),
                    timestamp_seconds: 300,
                },
                TimelineCue {
                    announcement_id: AnnouncementId::new("a2"),
                    timestamp_seconds: 360,
                },
            ],
        }),
    )
    .with_zones(zones(&["z1"]));
    let harness = create_harness(vec![schedule], SchedulerConfig::default());

    let ten = Utc.with_ymd_and_hms(2024, 1, 1, 10, 0, 0).unwrap();
    for minute in 4..=8 {
        harness
            .runner
            .tick(ten + ChronoDuration::minutes(minute))
            .await
            .unwrap();
    }

    let delivered: Vec<AnnouncementId> = harness
        .play_events
        .events()
        .await
        .into_iter()
        .filter(|event| event.status == PlayEventStatus::Delivered)
        .map(|event| event.announcement_id)
        .collect();
    assert_eq!(delivered, announcements(&["a1", "a2"]));
}

#[tokio::test]
async fn test_unusable_slot_does_not_silence_siblings() {
    let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
    let noon_slot = "12:00".parse().unwrap();
    let schedule = Schedule::new(
        "s5",
        "Calendar",
        ScheduleConfig::DateTime(DateTimeConfig {
            date_time_slots: vec![
                DateTimeSlot::once(AnnouncementId::new("a3"), start, noon_slot)
                    .repeating(RepeatRule::Weekly),
                DateTimeSlot::once(AnnouncementId::new("a1"), start, noon_slot)
                    .repeating(RepeatRule::Daily),
            ],
        }),
    )
    .with_zones(zones(&["z1"]));
    let harness = create_harness(vec![schedule], SchedulerConfig::default());

    let report = harness.runner.tick(noon()).await.unwrap();
    assert_eq!(report.fired, vec![ScheduleId::new("s5")]);
    assert_eq!(report.skipped(SkipReason::InvalidConfig), 0);

    let state = harness.engine.state(&ZoneId::new("z1")).await.unwrap().unwrap();
    assert_eq!(state.current_announcement_id, Some(AnnouncementId::new("a1")));
}

#[tokio::test]
async fn test_play_event_log_outage_does_not_block_delivery() {
    let harness = create_harness(Vec::new(), SchedulerConfig::default());
    let schedules = Arc::new(MemoryScheduleRepository::with_schedules(vec![interval_schedule(
        "s1",
        &["a1"],
        &["z1"],
    )]));
    let runner = ScheduleRunner::builder()
        .with_schedules(schedules.clone())
        .with_dispatcher(harness.engine.clone())
        .with_play_event_log(Arc::new(OfflinePlayEventLog))
        .build()
        .unwrap();

    let report = runner.tick(noon()).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(
        schedules.get(&ScheduleId::new("s1")).await.unwrap().last_executed_at,
        Some(noon())
    );
    let state = harness.engine.state(&ZoneId::new("z1")).await.unwrap().unwrap();
    assert_eq!(state.current_announcement_id, Some(AnnouncementId::new("a1")));
}

#[tokio::test]
async fn test_avoid_repeat_rotates_across_ticks() {
    let config = IntervalConfig::new(60, announcements(&["a1", "a2", "a3"])).with_avoid_repeat(true);
    let schedule = Schedule::new("s1", "Rotation", ScheduleConfig::Interval(config))
        .with_zones(zones(&["z1"]));
    let harness = create_harness(vec![schedule], SchedulerConfig::default());

    let mut played = Vec::new();
    for hour in 0..4 {
        harness
            .runner
            .tick(noon() + ChronoDuration::hours(hour))
            .await
            .unwrap();
        let state = harness.engine.state(&ZoneId::new("z1")).await.unwrap().unwrap();
        played.push(state.current_announcement_id.unwrap());
    }
    assert_eq!(played, announcements(&["a1", "a2", "a3", "a1"]));
}

// ============================================================================
// Skips and failure isolation
// ============================================================================

#[tokio::test]
async fn test_unknown_zone_does_not_block_siblings() {
    let harness = create_harness(
        vec![interval_schedule("s1", &["a1"], &["ghost", "z1"])],
        SchedulerConfig::default(),
    );

    let report = harness.runner.tick(noon()).await.unwrap();
    assert_eq!(report.delivered, 1);
    assert_eq!(report.failed, 1);

    let z1 = harness.engine.state(&ZoneId::new("z1")).await.unwrap().unwrap();
    assert_eq!(z1.current_announcement_id, Some(AnnouncementId::new("a1")));

    let stored = harness.schedules.get(&ScheduleId::new("s1")).await.unwrap();
    assert_eq!(stored.last_executed_at, Some(noon()));

    let failed: Vec<_> = harness
        .play_events
        .for_zone(&ZoneId::new("ghost"))
        .await;
    assert_eq!(failed.len(), 1);
    assert_eq!(failed[0].status, PlayEventStatus::Failed);
    assert!(failed[0].error_message.as_deref().unwrap_or_default().contains("ghost"));
}

#[tokio::test]
async fn test_missing_announcement_is_a_failed_dispatch() {
    let harness = create_harness(
        vec![interval_schedule("s1", &["retired"], &["z1"])],
        SchedulerConfig::default(),
    );
    let report = harness.runner.tick(noon()).await.unwrap();
    assert_eq!(report.fired.len(), 1);
    assert_eq!(report.failed, 1);
}

#[tokio::test]
async fn test_schedule_without_zones_is_skipped() {
    let harness = create_harness(
        vec![interval_schedule("s1", &["a1"], &[])],
        SchedulerConfig::default(),
    );

    let report = harness.runner.tick(noon()).await.unwrap();
    assert!(report.fired.is_empty());
    assert_eq!(report.skipped(SkipReason::NoZones), 1);

    let stored = harness.schedules.get(&ScheduleId::new("s1")).await.unwrap();
    assert_eq!(stored.last_executed_at, None);
}

#[tokio::test]
async fn test_invalid_and_inactive_schedules_are_skipped() {
    let mut invalid = interval_schedule("bad", &["a1"], &["z1"]);
    if let ScheduleConfig::Interval(config) = &mut invalid.config {
        config.interval_minutes = 0;
    }
    let mut orphaned = interval_schedule("orphan", &["a1"], &["z1"]);
    orphaned.owner_active = false;
    let harness = create_harness(
        vec![
            invalid,
            orphaned,
            interval_schedule("off", &["a1"], &["z1"]).disabled(),
            interval_schedule("ok", &["a2"], &["z2"]),
        ],
        SchedulerConfig::default(),
    );

    let report = harness.runner.tick(noon()).await.unwrap();
    assert_eq!(report.evaluated, 2);
    assert_eq!(report.fired, vec![ScheduleId::new("ok")]);
    assert_eq!(report.skipped(SkipReason::InvalidConfig), 1);
    assert!(harness.engine.state(&ZoneId::new("z1")).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stuck_zone_times_out() {
    let dispatcher = Arc::new(ScriptedDispatcher::default());
    let schedules = Arc::new(MemoryScheduleRepository::with_schedules([interval_schedule(
        "s1",
        &["a1"],
        &["stuck", "z1", "z2"],
    )]));
    let runner = ScheduleRunner::builder()
        .with_schedules(schedules.clone())
        .with_dispatcher(dispatcher.clone())
        .with_config(SchedulerConfig::default().with_dispatch_timeout(Duration::from_millis(50)))
        .build()
        .unwrap();

    let report = tokio::time::timeout(Duration::from_secs(2), runner.tick(noon()))
        .await
        .expect("tick stalled on a stuck zone")
        .unwrap();

    assert_eq!(report.delivered, 2);
    assert_eq!(report.failed, 1);
    assert_eq!(dispatcher.calls.lock().await.len(), 3);
    assert_eq!(
        schedules.get(&ScheduleId::new("s1")).await.unwrap().last_executed_at,
        Some(noon())
    );
}

// ============================================================================
// Background task
// ============================================================================

#[tokio::test]
async fn test_scheduler_task_lifecycle() {
    let harness = create_harness(
        vec![interval_schedule("s1", &["a1"], &["z1"])],
        SchedulerConfig::fast_ticks(),
    );

    let task = SchedulerTask::start(harness.runner.clone());
    assert!(task.is_running());

    tokio::time::sleep(Duration::from_millis(350)).await;
    assert!(task.tick_count() >= 2);

    task.shutdown().await.expect("shutdown failed");

    // The hourly schedule fired on the first tick only
    assert_eq!(harness.play_events.events().await.len(), 1);
    let state = harness.engine.state(&ZoneId::new("z1")).await.unwrap().unwrap();
    assert_eq!(state.current_announcement_id, Some(AnnouncementId::new("a1")));
}
