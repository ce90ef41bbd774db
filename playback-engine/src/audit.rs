//! Play-event recording
//!
//! Each announcement injection attempt can be recorded as a [`PlayEvent`].
//! Recording is an observable side effect only; failures are logged by the
//! caller and never abort playback.

use tokio::sync::RwLock;
use zonecast_model::{PlayEvent, PlayEventStatus, ZoneId};

/// Errors from a play-event log
#[derive(Debug, Clone, thiserror::Error)]
pub enum PlayEventLogError {
    /// The backing log could not be reached
    #[error("Play event log unavailable: {0}")]
    Unavailable(String),

    /// The log refused to store the event
    #[error("Play event {event_id} rejected: {reason}")]
    Rejected { event_id: String, reason: String },
}

/// Sink for play-event audit records
#[async_trait::async_trait]
pub trait PlayEventLog: Send + Sync + std::fmt::Debug {
    /// Insert or replace an event by id
    async fn record(&self, event: &PlayEvent) -> Result<(), PlayEventLogError>;
}

/// In-memory play-event log
#[derive(Debug, Default)]
pub struct MemoryPlayEventLog {
    events: RwLock<Vec<PlayEvent>>,
}

impl MemoryPlayEventLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn events(&self) -> Vec<PlayEvent> {
        self.events.read().await.clone()
    }

    pub async fn for_zone(&self, zone_id: &ZoneId) -> Vec<PlayEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| &event.zone_id == zone_id)
            .cloned()
            .collect()
    }

    pub async fn count_with_status(&self, status: PlayEventStatus) -> usize {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.status == status)
            .count()
    }
}

#[async_trait::async_trait]
impl PlayEventLog for MemoryPlayEventLog {
    async fn record(&self, event: &PlayEvent) -> Result<(), PlayEventLogError> {
        let mut events = self.events.write().await;
        match events.iter_mut().find(|existing| existing.id == event.id) {
            Some(existing) => *existing = event.clone(),
            None => events.push(event.clone()),
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use zonecast_model::AnnouncementId;

    #[tokio::test]
    async fn test_record_replaces_by_id() {
        let log = MemoryPlayEventLog::new();
        let mut event = PlayEvent::instant(AnnouncementId::new("a1"), ZoneId::new("z1"), Utc::now());

        log.record(&event).await.unwrap();
        event.mark_delivered(Utc::now());
        log.record(&event).await.unwrap();

        let events = log.events().await;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].status, PlayEventStatus::Delivered);
        assert_eq!(log.count_with_status(PlayEventStatus::Pending).await, 0);
        assert_eq!(log.for_zone(&ZoneId::new("z1")).await.len(), 1);
    }
}
