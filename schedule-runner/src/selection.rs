//! Announcement selection for interval schedules
//!
//! An interval schedule lists several announcements but plays one per
//! firing. With `avoidRepeat` the selector rotates through the list per
//! schedule; without it the first announcement is always chosen.
//! Timeline and datetime schedules play every announcement that matched.

use dashmap::DashMap;
use zonecast_model::{AnnouncementId, Schedule, ScheduleConfig, ScheduleId};

/// Picks which due announcements a firing actually plays
#[derive(Debug, Default)]
pub struct AnnouncementSelector {
    cursors: DashMap<ScheduleId, usize>,
}

impl AnnouncementSelector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Narrow `due` down to what this firing plays
    pub fn select(&self, schedule: &Schedule, due: Vec<AnnouncementId>) -> Vec<AnnouncementId> {
        let ScheduleConfig::Interval(config) = &schedule.config else {
            return due;
        };
        if due.is_empty() {
            return due;
        }

        let index = if config.avoid_repeat {
            let mut cursor = self.cursors.entry(schedule.id.clone()).or_insert(0);
            let index = *cursor % due.len();
            *cursor = index + 1;
            index
        } else {
            0
        };

        due.into_iter().nth(index).into_iter().collect()
    }

    /// Forget the rotation position of a schedule
    pub fn reset(&self, schedule_id: &ScheduleId) {
        self.cursors.remove(schedule_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zonecast_model::{IntervalConfig, TimelineConfig, TimelineCue};

    fn ids(raw: &[&str]) -> Vec<AnnouncementId> {
        raw.iter().map(|id| AnnouncementId::new(*id)).collect()
    }

    fn interval(avoid_repeat: bool) -> Schedule {
        Schedule::new(
            "s1",
            "Promo",
            ScheduleConfig::Interval(
                IntervalConfig::new(30, ids(&["a", "b", "c"])).with_avoid_repeat(avoid_repeat),
            ),
        )
    }

    #[test]
    fn test_first_without_avoid_repeat() {
        let selector = AnnouncementSelector::new();
        let schedule = interval(false);
        for _ in 0..3 {
            assert_eq!(selector.select(&schedule, ids(&["a", "b", "c"])), ids(&["a"]));
        }
    }

    #[test]
    fn test_round_robin_with_avoid_repeat() {
        let selector = AnnouncementSelector::new();
        let schedule = interval(true);
        let picks: Vec<_> = (0..4)
            .flat_map(|_| selector.select(&schedule, ids(&["a", "b", "c"])))
            .collect();
        assert_eq!(picks, ids(&["a", "b", "c", "a"]));

        selector.reset(&schedule.id);
        assert_eq!(selector.select(&schedule, ids(&["a", "b", "c"])), ids(&["a"]));
    }

    #[test]
    fn test_rotation_survives_shrinking_list() {
        let selector = AnnouncementSelector::new();
        let schedule = interval(true);
        selector.select(&schedule, ids(&["a", "b", "c"]));
        selector.select(&schedule, ids(&["a", "b", "c"]));
        assert_eq!(selector.select(&schedule, ids(&["a", "b"])), ids(&["a"]));
    }

    #[test]
    fn test_timeline_plays_everything_due() {
        let selector = AnnouncementSelector::new();
        let schedule = Schedule::new(
            "s2",
            "Timeline",
            ScheduleConfig::Timeline(TimelineConfig {
                cycle_duration_minutes: 60,
                announcements: vec![TimelineCue {
                    announcement_id: AnnouncementId::new("a"),
                    timestamp_seconds: 0,
                }],
            }),
        );
        assert_eq!(selector.select(&schedule, ids(&["a", "b"])), ids(&["a", "b"]));
    }
}
