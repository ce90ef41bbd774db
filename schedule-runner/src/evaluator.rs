//! Schedule evaluation
//!
//! Decides whether a schedule is due at a given instant and which
//! announcements it contributes. Evaluation is pure: nothing here reads
//! or writes shared state, so schedules can be evaluated concurrently.
//!
//! Wall-clock rules (quiet hours, timeline cycles, calendar slots) are
//! evaluated in the site's fixed UTC offset from [`SchedulerConfig`].

use std::time::Duration;

use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, NaiveTime, Timelike, Utc};
use zonecast_model::{
    seconds_since_midnight, weekday_index, AnnouncementId, DateTimeConfig, DateTimeSlot,
    IntervalConfig, RepeatRule, Schedule, ScheduleConfig, TimelineConfig, TimelineCue,
};

use crate::config::SchedulerConfig;

/// Evaluates schedules against the current time
#[derive(Debug, Clone)]
pub struct ScheduleEvaluator {
    timeline_tolerance_seconds: i64,
    datetime_tolerance_minutes: i64,
    utc_offset: FixedOffset,
}

impl ScheduleEvaluator {
    pub fn new(config: &SchedulerConfig) -> Self {
        Self {
            timeline_tolerance_seconds: config.timeline_tolerance_seconds(),
            datetime_tolerance_minutes: config.datetime_tolerance_minutes(),
            utc_offset: config.utc_offset,
        }
    }

    fn local(&self, now: DateTime<Utc>) -> DateTime<FixedOffset> {
        now.with_timezone(&self.utc_offset)
    }

    /// Whether the schedule should fire at `now`
    pub fn is_due(&self, schedule: &Schedule, now: DateTime<Utc>) -> bool {
        let local = self.local(now);
        match &schedule.config {
            ScheduleConfig::Interval(config) => {
                self.interval_due(config, schedule.last_executed_at, now, local.time())
            }
            ScheduleConfig::Timeline(config) => !self.due_cues(config, local.time()).is_empty(),
            ScheduleConfig::DateTime(config) => {
                !self.due_slots(config, local.date_naive(), local.time()).is_empty()
            }
        }
    }

    /// Announcements the schedule contributes at `now`
    ///
    /// Interval schedules contribute every listed announcement (selection
    /// happens afterwards); timeline and datetime schedules contribute only
    /// the cues or slots that matched. Empty when the schedule is not due.
    pub fn due_announcements(&self, schedule: &Schedule, now: DateTime<Utc>) -> Vec<AnnouncementId> {
        let local = self.local(now);
        let ids: Vec<AnnouncementId> = match &schedule.config {
            ScheduleConfig::Interval(config) => {
                if !self.interval_due(config, schedule.last_executed_at, now, local.time()) {
                    return Vec::new();
                }
                config.announcement_ids.clone()
            }
            ScheduleConfig::Timeline(config) => self
                .due_cues(config, local.time())
                .into_iter()
                .map(|cue| cue.announcement_id.clone())
                .collect(),
            ScheduleConfig::DateTime(config) => self
                .due_slots(config, local.date_naive(), local.time())
                .into_iter()
                .map(|slot| slot.announcement_id.clone())
                .collect(),
        };
        unique_ids(ids)
    }

    /// Due announcements that the previous firing has not already covered
    ///
    /// A timeline cue or datetime slot counts as covered when it was also
    /// matching at `lastExecutedAt` and that firing lies inside the same
    /// tolerance window. Cues and slots are tracked independently, so a cue
    /// that comes due shortly after a sibling still fires. Interval
    /// schedules return the same list as [`Self::due_announcements`].
    pub fn pending_announcements(&self, schedule: &Schedule, now: DateTime<Utc>) -> Vec<AnnouncementId> {
        let local = self.local(now);
        let previous = self.recent_firing(schedule, now);
        let ids: Vec<AnnouncementId> = match &schedule.config {
            ScheduleConfig::Interval(_) => return self.due_announcements(schedule, now),
            ScheduleConfig::Timeline(config) => self
                .due_cues(config, local.time())
                .into_iter()
                .filter(|cue| !previous.is_some_and(|prev| self.cue_matches(config, cue, prev.time())))
                .map(|cue| cue.announcement_id.clone())
                .collect(),
            ScheduleConfig::DateTime(config) => self
                .due_slots(config, local.date_naive(), local.time())
                .into_iter()
                .filter(|slot| {
                    !previous.is_some_and(|prev| self.slot_matches(slot, prev.date_naive(), prev.time()))
                })
                .map(|slot| slot.announcement_id.clone())
                .collect(),
        };
        unique_ids(ids)
    }

    /// Time remaining until the schedule is next due
    ///
    /// Zero when due now. Interval schedules count down from
    /// `lastExecutedAt` (quiet hours are not taken into account); timeline
    /// schedules count to the nearest upcoming cue. `None` for datetime
    /// schedules and timelines without cues.
    pub fn next_due_in(&self, schedule: &Schedule, now: DateTime<Utc>) -> Option<Duration> {
        match &schedule.config {
            ScheduleConfig::Interval(config) => {
                let Some(last) = schedule.last_executed_at else {
                    return Some(Duration::ZERO);
                };
                let interval = i64::from(config.interval_minutes) * 60;
                let elapsed = (now - last).num_seconds();
                Some(Duration::from_secs((interval - elapsed).max(0) as u64))
            }
            ScheduleConfig::Timeline(config) => {
                let cycle = i64::from(config.cycle_seconds());
                if cycle == 0 || config.announcements.is_empty() {
                    return None;
                }
                let position = i64::from(seconds_since_midnight(self.local(now).time())) % cycle;
                if !self.due_cues(config, self.local(now).time()).is_empty() {
                    return Some(Duration::ZERO);
                }
                config
                    .announcements
                    .iter()
                    .map(|cue| (i64::from(cue.timestamp_seconds) % cycle - position).rem_euclid(cycle))
                    .min()
                    .map(|secs| Duration::from_secs(secs as u64))
            }
            ScheduleConfig::DateTime(_) => None,
        }
    }

    /// Whether every cue or slot matching at `now` was already covered by
    /// the previous firing
    ///
    /// Tolerance windows are wider than a single instant, so consecutive
    /// ticks can land in the same window. `false` when nothing matches.
    /// Interval schedules handle repeats through their elapsed-time rule
    /// and always return `false`.
    pub fn fired_in_current_window(&self, schedule: &Schedule, now: DateTime<Utc>) -> bool {
        let Some(previous) = self.recent_firing(schedule, now) else {
            return false;
        };
        let local = self.local(now);
        match &schedule.config {
            ScheduleConfig::Interval(_) => false,
            ScheduleConfig::Timeline(config) => {
                let due = self.due_cues(config, local.time());
                !due.is_empty() && due.iter().all(|cue| self.cue_matches(config, cue, previous.time()))
            }
            ScheduleConfig::DateTime(config) => {
                let due = self.due_slots(config, local.date_naive(), local.time());
                !due.is_empty()
                    && due
                        .iter()
                        .all(|slot| self.slot_matches(slot, previous.date_naive(), previous.time()))
            }
        }
    }

    /// Local time of `lastExecutedAt` when it is recent enough to share a
    /// tolerance window with `now`
    fn recent_firing(&self, schedule: &Schedule, now: DateTime<Utc>) -> Option<DateTime<FixedOffset>> {
        let last = schedule.last_executed_at?;
        let since = (now - last).num_seconds();
        if since < 0 {
            return None;
        }
        let within = match &schedule.config {
            ScheduleConfig::Interval(_) => false,
            ScheduleConfig::Timeline(_) => since <= 2 * self.timeline_tolerance_seconds,
            ScheduleConfig::DateTime(_) => since < (2 * self.datetime_tolerance_minutes + 1) * 60,
        };
        within.then(|| self.local(last))
    }

    fn interval_due(
        &self,
        config: &IntervalConfig,
        last_executed_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
        local_time: NaiveTime,
    ) -> bool {
        if let Some(quiet) = config.quiet_hours() {
            if quiet.contains(local_time) {
                return false;
            }
        }

        match last_executed_at {
            None => true,
            Some(last) => (now - last).num_seconds() >= i64::from(config.interval_minutes) * 60,
        }
    }

    fn due_cues<'a>(&self, config: &'a TimelineConfig, local_time: NaiveTime) -> Vec<&'a TimelineCue> {
        config
            .announcements
            .iter()
            .filter(|cue| self.cue_matches(config, cue, local_time))
            .collect()
    }

    fn cue_matches(&self, config: &TimelineConfig, cue: &TimelineCue, local_time: NaiveTime) -> bool {
        let cycle = i64::from(config.cycle_seconds());
        if cycle == 0 {
            return false;
        }
        let position = i64::from(seconds_since_midnight(local_time)) % cycle;
        let target = i64::from(cue.timestamp_seconds) % cycle;
        let distance = (position - target).abs();
        // Offsets near the cycle boundary match across the wrap
        distance.min(cycle - distance) <= self.timeline_tolerance_seconds
    }

    fn due_slots<'a>(
        &self,
        config: &'a DateTimeConfig,
        date: NaiveDate,
        local_time: NaiveTime,
    ) -> Vec<&'a DateTimeSlot> {
        config
            .date_time_slots
            .iter()
            .filter(|slot| self.slot_matches(slot, date, local_time))
            .collect()
    }

    fn slot_matches(&self, slot: &DateTimeSlot, date: NaiveDate, local_time: NaiveTime) -> bool {
        if let Some(problem) = slot.problem() {
            tracing::debug!("Ignoring slot for announcement {}: {}", slot.announcement_id, problem);
            return false;
        }
        if slot.end_date.is_some_and(|end| date > end) {
            return false;
        }

        let now_minute = i64::from(local_time.hour() * 60 + local_time.minute());
        let slot_minute = i64::from(slot.time.minutes_from_midnight());
        if (now_minute - slot_minute).abs() > self.datetime_tolerance_minutes {
            return false;
        }

        match slot.repeat {
            RepeatRule::None => date == slot.date,
            RepeatRule::Daily => date >= slot.date,
            RepeatRule::Weekly => {
                date >= slot.date && slot.repeat_days.contains(&weekday_index(date))
            }
            RepeatRule::Monthly => date >= slot.date && date.day() == slot.date.day(),
            RepeatRule::Yearly => {
                date >= slot.date && date.month() == slot.date.month() && date.day() == slot.date.day()
            }
        }
    }
}

impl Default for ScheduleEvaluator {
    fn default() -> Self {
        Self::new(&SchedulerConfig::default())
    }
}

fn unique_ids(ids: Vec<AnnouncementId>) -> Vec<AnnouncementId> {
    let mut unique = Vec::with_capacity(ids.len());
    for id in ids {
        if !unique.contains(&id) {
            unique.push(id);
        }
    }
    unique
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use rstest::rstest;
    use zonecast_model::{ClockTime, TimelineCue};

    fn at(y: i32, m: u32, d: u32, h: u32, min: u32, s: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, h, min, s).unwrap()
    }

    fn clock(raw: &str) -> ClockTime {
        raw.parse().unwrap()
    }

    fn interval_schedule(minutes: u32) -> Schedule {
        Schedule::new(
            "s1",
            "Hourly promo",
            ScheduleConfig::Interval(IntervalConfig::new(minutes, vec![AnnouncementId::new("a1")])),
        )
    }

    fn timeline_schedule(cycle_minutes: u32, offsets: &[(&str, u32)]) -> Schedule {
        Schedule::new(
            "s2",
            "Timeline",
            ScheduleConfig::Timeline(TimelineConfig {
                cycle_duration_minutes: cycle_minutes,
                announcements: offsets
                    .iter()
                    .map(|(id, ts)| TimelineCue {
                        announcement_id: AnnouncementId::new(*id),
                        timestamp_seconds: *ts,
                    })
                    .collect(),
            }),
        )
    }

    fn datetime_schedule(slot: DateTimeSlot) -> Schedule {
        Schedule::new(
            "s3",
            "Calendar",
            ScheduleConfig::DateTime(DateTimeConfig {
                date_time_slots: vec![slot],
            }),
        )
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[rstest]
    #[case(59, false)]
    #[case(60, true)]
    #[case(61, true)]
    fn test_interval_elapsed_boundary(#[case] minutes_ago: i64, #[case] expected: bool) {
        let now = at(2024, 1, 1, 12, 0, 0);
        let schedule = interval_schedule(60).with_last_executed_at(now - ChronoDuration::minutes(minutes_ago));
        assert_eq!(ScheduleEvaluator::default().is_due(&schedule, now), expected);
    }

    #[test]
    fn test_interval_without_history_is_due() {
        let schedule = interval_schedule(60);
        let evaluator = ScheduleEvaluator::default();
        assert!(evaluator.is_due(&schedule, at(2024, 1, 1, 12, 0, 0)));
        assert_eq!(
            evaluator.next_due_in(&schedule, at(2024, 1, 1, 12, 0, 0)),
            Some(Duration::ZERO)
        );
    }

    #[rstest]
    #[case(23, 30, false)]
    #[case(2, 0, false)]
    #[case(8, 0, false)]
    #[case(9, 0, true)]
    #[case(21, 59, true)]
    fn test_interval_overnight_quiet_hours(#[case] hour: u32, #[case] minute: u32, #[case] expected: bool) {
        let config = IntervalConfig::new(60, vec![AnnouncementId::new("a1")])
            .with_quiet_hours(clock("22:00"), clock("08:00"));
        let schedule = Schedule::new("s1", "Quiet", ScheduleConfig::Interval(config));
        let now = at(2024, 1, 1, hour, minute, 0);
        assert_eq!(ScheduleEvaluator::default().is_due(&schedule, now), expected);
    }

    #[test]
    fn test_quiet_hours_use_site_offset() {
        let config = IntervalConfig::new(60, vec![AnnouncementId::new("a1")])
            .with_quiet_hours(clock("22:00"), clock("08:00"));
        let schedule = Schedule::new("s1", "Quiet", ScheduleConfig::Interval(config));
        let evaluator = ScheduleEvaluator::new(
            &SchedulerConfig::default().with_utc_offset_seconds(-5 * 3600).unwrap(),
        );

        // 03:00 UTC is 22:00 at UTC-5
        assert!(!evaluator.is_due(&schedule, at(2024, 1, 1, 3, 0, 0)));
        // 14:00 UTC is 09:00 at UTC-5
        assert!(evaluator.is_due(&schedule, at(2024, 1, 1, 14, 0, 0)));
    }

    #[test]
    fn test_interval_countdown() {
        let now = at(2024, 1, 1, 12, 0, 0);
        let schedule = interval_schedule(30).with_last_executed_at(now - ChronoDuration::minutes(20));
        assert_eq!(
            ScheduleEvaluator::default().next_due_in(&schedule, now),
            Some(Duration::from_secs(600))
        );
    }

    #[rstest]
    // 10:05:00 is 300s into a 30-minute cycle
    #[case(10, 5, 0, true)]
    #[case(10, 5, 30, true)]
    #[case(10, 4, 30, true)]
    #[case(10, 5, 31, false)]
    #[case(10, 35, 10, true)]
    #[case(10, 20, 0, false)]
    fn test_timeline_tolerance(#[case] h: u32, #[case] m: u32, #[case] s: u32, #[case] expected: bool) {
        let schedule = timeline_schedule(30, &[("a1", 300)]);
        assert_eq!(
            ScheduleEvaluator::default().is_due(&schedule, at(2024, 1, 1, h, m, s)),
            expected
        );
    }

    #[test]
    fn test_timeline_selects_matching_cues_only() {
        let schedule = timeline_schedule(60, &[("a1", 0), ("a2", 1800), ("a3", 1810)]);
        let evaluator = ScheduleEvaluator::default();

        let due = evaluator.due_announcements(&schedule, at(2024, 1, 1, 9, 30, 5));
        assert_eq!(due, vec![AnnouncementId::new("a2"), AnnouncementId::new("a3")]);

        // Offset 0 matches from the tail end of the previous cycle
        let due = evaluator.due_announcements(&schedule, at(2024, 1, 1, 9, 59, 45));
        assert_eq!(due, vec![AnnouncementId::new("a1")]);
    }

    #[test]
    fn test_timeline_next_due() {
        let schedule = timeline_schedule(60, &[("a1", 600), ("a2", 2400)]);
        let evaluator = ScheduleEvaluator::default();
        assert_eq!(
            evaluator.next_due_in(&schedule, at(2024, 1, 1, 9, 20, 0)),
            Some(Duration::from_secs(1200))
        );
        assert_eq!(
            evaluator.next_due_in(&schedule, at(2024, 1, 1, 9, 50, 0)),
            Some(Duration::from_secs(1200))
        );
    }

    #[test]
    fn test_weekly_monday_rule() {
        // 2024-01-01 is a Monday
        let slot = DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 1, 1), clock("09:00"))
            .repeating(RepeatRule::Weekly)
            .on_days(vec![1]);
        let schedule = datetime_schedule(slot);
        let evaluator = ScheduleEvaluator::default();

        for week in 0..8 {
            let monday = at(2024, 1, 1, 9, 0, 0) + ChronoDuration::weeks(week);
            assert!(evaluator.is_due(&schedule, monday), "week {}", week);
            for offset in 1..7 {
                let other = monday + ChronoDuration::days(offset);
                assert!(!evaluator.is_due(&schedule, other), "week {} day +{}", week, offset);
            }
        }
        // Before the start date
        assert!(!evaluator.is_due(&schedule, at(2023, 12, 25, 9, 0, 0)));
    }

    #[rstest]
    #[case(8, 59, true)]
    #[case(9, 1, true)]
    #[case(9, 2, false)]
    #[case(8, 58, false)]
    fn test_datetime_minute_tolerance(#[case] hour: u32, #[case] minute: u32, #[case] expected: bool) {
        let slot = DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 3, 5), clock("9:00 AM"));
        let schedule = datetime_schedule(slot);
        assert_eq!(
            ScheduleEvaluator::default().is_due(&schedule, at(2024, 3, 5, hour, minute, 30)),
            expected
        );
    }

    #[rstest]
    #[case(RepeatRule::None, date(2024, 3, 5), true)]
    #[case(RepeatRule::None, date(2024, 3, 6), false)]
    #[case(RepeatRule::Daily, date(2024, 7, 19), true)]
    #[case(RepeatRule::Daily, date(2024, 3, 4), false)]
    #[case(RepeatRule::Monthly, date(2024, 4, 5), true)]
    #[case(RepeatRule::Monthly, date(2024, 4, 6), false)]
    #[case(RepeatRule::Yearly, date(2025, 3, 5), true)]
    #[case(RepeatRule::Yearly, date(2025, 4, 5), false)]
    fn test_datetime_repeat_rules(#[case] repeat: RepeatRule, #[case] on: NaiveDate, #[case] expected: bool) {
        let slot = DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 3, 5), clock("14:00"))
            .repeating(repeat);
        let schedule = datetime_schedule(slot);
        let now = Utc.from_utc_datetime(&on.and_hms_opt(14, 0, 0).unwrap());
        assert_eq!(ScheduleEvaluator::default().is_due(&schedule, now), expected);
    }

    #[test]
    fn test_datetime_end_date_inclusive() {
        let slot = DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 3, 1), clock("14:00"))
            .repeating(RepeatRule::Daily)
            .until(date(2024, 3, 10));
        let schedule = datetime_schedule(slot);
        let evaluator = ScheduleEvaluator::default();
        assert!(evaluator.is_due(&schedule, at(2024, 3, 10, 14, 0, 0)));
        assert!(!evaluator.is_due(&schedule, at(2024, 3, 11, 14, 0, 0)));
    }

    #[test]
    fn test_fired_in_current_window() {
        let slot = DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 3, 5), clock("14:00"));
        let fired_at = at(2024, 3, 5, 13, 59, 10);
        let schedule = datetime_schedule(slot).with_last_executed_at(fired_at);
        let evaluator = ScheduleEvaluator::default();

        assert!(evaluator.fired_in_current_window(&schedule, at(2024, 3, 5, 14, 0, 10)));
        assert!(evaluator.fired_in_current_window(&schedule, at(2024, 3, 5, 14, 1, 10)));
        assert!(!evaluator.fired_in_current_window(&schedule, at(2024, 3, 5, 14, 2, 10)));

        let interval = interval_schedule(1).with_last_executed_at(fired_at);
        assert!(!evaluator.fired_in_current_window(&interval, at(2024, 3, 5, 13, 59, 20)));
    }

    #[test]
    fn test_neighbouring_cues_are_tracked_separately() {
        // Cues at 300s and 360s of a 30-minute cycle, first one fired at 10:05:00
        let schedule = timeline_schedule(30, &[("a1", 300), ("a2", 360)])
            .with_last_executed_at(at(2024, 1, 1, 10, 5, 0));
        let evaluator = ScheduleEvaluator::default();

        let now = at(2024, 1, 1, 10, 5, 30);
        assert_eq!(evaluator.due_announcements(&schedule, now).len(), 2);
        assert!(!evaluator.fired_in_current_window(&schedule, now));
        assert_eq!(evaluator.pending_announcements(&schedule, now), vec![AnnouncementId::new("a2")]);

        let now = at(2024, 1, 1, 10, 6, 0);
        assert!(!evaluator.fired_in_current_window(&schedule, now));
        assert_eq!(evaluator.pending_announcements(&schedule, now), vec![AnnouncementId::new("a2")]);

        // Same cue seconds later is covered
        let schedule = schedule.with_last_executed_at(at(2024, 1, 1, 10, 6, 0));
        assert!(evaluator.fired_in_current_window(&schedule, at(2024, 1, 1, 10, 6, 20)));
        assert!(evaluator.pending_announcements(&schedule, at(2024, 1, 1, 10, 6, 20)).is_empty());
    }

    #[test]
    fn test_neighbouring_slots_are_tracked_separately() {
        let config = DateTimeConfig {
            date_time_slots: vec![
                DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 3, 5), clock("14:00")),
                DateTimeSlot::once(AnnouncementId::new("a2"), date(2024, 3, 5), clock("14:02")),
            ],
        };
        let schedule = Schedule::new("s3", "Calendar", ScheduleConfig::DateTime(config))
            .with_last_executed_at(at(2024, 3, 5, 14, 0, 0));
        let evaluator = ScheduleEvaluator::default();

        let now = at(2024, 3, 5, 14, 1, 0);
        assert!(!evaluator.fired_in_current_window(&schedule, now));
        assert_eq!(evaluator.pending_announcements(&schedule, now), vec![AnnouncementId::new("a2")]);
    }

    #[test]
    fn test_unusable_slot_leaves_siblings_due() {
        let config = DateTimeConfig {
            date_time_slots: vec![
                DateTimeSlot::once(AnnouncementId::new("broken"), date(2024, 3, 5), clock("14:00"))
                    .repeating(RepeatRule::Weekly),
                DateTimeSlot::once(AnnouncementId::new("reversed"), date(2024, 3, 5), clock("14:00"))
                    .until(date(2024, 3, 1)),
                DateTimeSlot::once(AnnouncementId::new("a1"), date(2024, 3, 5), clock("14:00")),
            ],
        };
        let schedule = Schedule::new("s3", "Calendar", ScheduleConfig::DateTime(config));
        assert!(schedule.config.validate().is_ok());

        let due = ScheduleEvaluator::default().due_announcements(&schedule, at(2024, 3, 5, 14, 0, 0));
        assert_eq!(due, vec![AnnouncementId::new("a1")]);
    }

    #[test]
    fn test_due_announcements_deduplicated() {
        let schedule = timeline_schedule(60, &[("a1", 0), ("a1", 10)]);
        let due = ScheduleEvaluator::default().due_announcements(&schedule, at(2024, 1, 1, 9, 0, 5));
        assert_eq!(due, vec![AnnouncementId::new("a1")]);
    }
}
