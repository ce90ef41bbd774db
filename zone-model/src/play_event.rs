//! Audit records for announcement injections

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::id_types::{AnnouncementId, ScheduleId, ZoneId};

/// Delivery status of an announcement injection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayEventStatus {
    Pending,
    Delivered,
    Playing,
    Completed,
    Failed,
}

/// How the injection was triggered
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PlayEventKind {
    Instant,
    Scheduled,
}

/// One announcement-injection attempt on one zone
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayEvent {
    pub id: Uuid,
    pub schedule_id: Option<ScheduleId>,
    pub announcement_id: AnnouncementId,
    pub zone_id: ZoneId,
    pub kind: PlayEventKind,
    pub status: PlayEventStatus,
    pub created_at: DateTime<Utc>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub error_message: Option<String>,
}

impl PlayEvent {
    /// A pending event for a schedule-triggered injection
    pub fn scheduled(
        schedule_id: ScheduleId,
        announcement_id: AnnouncementId,
        zone_id: ZoneId,
        at: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            schedule_id: Some(schedule_id),
            announcement_id,
            zone_id,
            kind: PlayEventKind::Scheduled,
            status: PlayEventStatus::Pending,
            created_at: at,
            delivered_at: None,
            completed_at: None,
            error_message: None,
        }
    }

    /// A pending event for an operator-triggered injection
    pub fn instant(announcement_id: AnnouncementId, zone_id: ZoneId, at: DateTime<Utc>) -> Self {
        Self {
            schedule_id: None,
            kind: PlayEventKind::Instant,
            ..Self::scheduled(ScheduleId::new(""), announcement_id, zone_id, at)
        }
    }

    pub fn mark_delivered(&mut self, at: DateTime<Utc>) {
        self.status = PlayEventStatus::Delivered;
        self.delivered_at = Some(at);
    }

    pub fn mark_completed(&mut self, at: DateTime<Utc>) {
        self.status = PlayEventStatus::Completed;
        self.completed_at = Some(at);
    }

    pub fn mark_failed(&mut self, error: impl Into<String>) {
        self.status = PlayEventStatus::Failed;
        self.error_message = Some(error.into());
    }
}
