//! Schedule persistence seam

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use zonecast_model::{Schedule, ScheduleId};

/// Failures of a [`ScheduleRepository`]
#[derive(Debug, Clone, thiserror::Error)]
pub enum RepositoryError {
    #[error("Schedule repository unavailable: {0}")]
    Unavailable(String),

    #[error("Schedule not found: {0}")]
    ScheduleNotFound(ScheduleId),
}

/// Source of schedules and sink for their execution timestamps
#[async_trait::async_trait]
pub trait ScheduleRepository: Send + Sync + std::fmt::Debug {
    /// Schedules that are enabled and owned by an active client
    async fn enabled_schedules(&self) -> Result<Vec<Schedule>, RepositoryError>;

    /// Persist `lastExecutedAt` for a schedule
    async fn mark_executed(&self, schedule_id: &ScheduleId, at: DateTime<Utc>) -> Result<(), RepositoryError>;
}

/// In-memory schedule table
#[derive(Debug, Default)]
pub struct MemoryScheduleRepository {
    schedules: RwLock<Vec<Schedule>>,
}

impl MemoryScheduleRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_schedules(schedules: impl IntoIterator<Item = Schedule>) -> Self {
        Self {
            schedules: RwLock::new(schedules.into_iter().collect()),
        }
    }

    /// Insert or replace a schedule by id
    pub async fn upsert(&self, schedule: Schedule) {
        let mut schedules = self.schedules.write().await;
        match schedules.iter_mut().find(|existing| existing.id == schedule.id) {
            Some(existing) => *existing = schedule,
            None => schedules.push(schedule),
        }
    }

    pub async fn remove(&self, schedule_id: &ScheduleId) -> Option<Schedule> {
        let mut schedules = self.schedules.write().await;
        let index = schedules.iter().position(|schedule| &schedule.id == schedule_id)?;
        Some(schedules.remove(index))
    }

    pub async fn get(&self, schedule_id: &ScheduleId) -> Option<Schedule> {
        self.schedules
            .read()
            .await
            .iter()
            .find(|schedule| &schedule.id == schedule_id)
            .cloned()
    }

    pub async fn all(&self) -> Vec<Schedule> {
        self.schedules.read().await.clone()
    }
}

#[async_trait::async_trait]
impl ScheduleRepository for MemoryScheduleRepository {
    async fn enabled_schedules(&self) -> Result<Vec<Schedule>, RepositoryError> {
        Ok(self
            .schedules
            .read()
            .await
            .iter()
            .filter(|schedule| schedule.is_active())
            .cloned()
            .collect())
    }

    async fn mark_executed(&self, schedule_id: &ScheduleId, at: DateTime<Utc>) -> Result<(), RepositoryError> {
        let mut schedules = self.schedules.write().await;
        let schedule = schedules
            .iter_mut()
            .find(|schedule| &schedule.id == schedule_id)
            .ok_or_else(|| RepositoryError::ScheduleNotFound(schedule_id.clone()))?;
        schedule.last_executed_at = Some(at);
        Ok(())
    }
}
