//! State broadcasting to external subscribers
//!
//! The engine publishes a full [`PlaybackState`] snapshot after every
//! successful mutation, keyed by zone. Schedule firings go to a separate
//! global topic. Publishing is best-effort: the engine logs failures and
//! never propagates them to the caller.
//!
//! [`ChannelBroadcaster`] is an in-process implementation backed by
//! `tokio::sync::broadcast`, one channel per zone topic plus one global
//! channel. A transport adapter (WebSocket fan-out, message bus) can
//! implement [`Broadcaster`] directly instead.

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use zonecast_model::{PlaybackState, ScheduleId, ZoneId};

/// Default buffer size for each broadcast channel
pub const DEFAULT_CHANNEL_CAPACITY: usize = 64;

/// Topic name for a zone's playback updates
pub fn zone_topic(zone_id: &ZoneId) -> String {
    format!("playback_{}", zone_id)
}

/// Topic name for system-wide events
pub const GLOBAL_TOPIC: &str = "global_events";

/// Events published on the global topic
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GlobalEvent {
    /// A schedule fired and its announcements were dispatched
    ScheduleExecuted {
        schedule_id: ScheduleId,
        schedule_name: String,
        zone_ids: Vec<ZoneId>,
        executed_at: DateTime<Utc>,
        triggered_by: String,
    },
}

/// Errors from a broadcast publish
#[derive(Debug, Clone, thiserror::Error)]
pub enum BroadcastError {
    /// Nobody is listening on the topic
    #[error("No subscribers on topic {0}")]
    NoSubscribers(String),

    /// The transport rejected the message
    #[error("Broadcast transport error: {0}")]
    Transport(String),
}

/// Abstract publish interface
#[async_trait::async_trait]
pub trait Broadcaster: Send + Sync + std::fmt::Debug {
    /// Publish a zone's current state snapshot
    async fn publish(&self, zone_id: &ZoneId, snapshot: &PlaybackState) -> Result<(), BroadcastError>;

    /// Publish an event on the global topic
    async fn publish_global(&self, event: &GlobalEvent) -> Result<(), BroadcastError>;
}

/// Broadcaster that drops everything
#[derive(Debug, Default, Clone, Copy)]
pub struct NullBroadcaster;

#[async_trait::async_trait]
impl Broadcaster for NullBroadcaster {
    async fn publish(&self, _zone_id: &ZoneId, _snapshot: &PlaybackState) -> Result<(), BroadcastError> {
        Ok(())
    }

    async fn publish_global(&self, _event: &GlobalEvent) -> Result<(), BroadcastError> {
        Ok(())
    }
}

/// In-process broadcaster backed by tokio broadcast channels
#[derive(Debug)]
pub struct ChannelBroadcaster {
    zones: DashMap<ZoneId, broadcast::Sender<PlaybackState>>,
    global: broadcast::Sender<GlobalEvent>,
    capacity: usize,
}

impl ChannelBroadcaster {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CHANNEL_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (global, _rx) = broadcast::channel(capacity);
        Self {
            zones: DashMap::new(),
            global,
            capacity,
        }
    }

    /// Subscribe to a zone's state snapshots
    pub fn subscribe(&self, zone_id: &ZoneId) -> broadcast::Receiver<PlaybackState> {
        self.zones
            .entry(zone_id.clone())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe()
    }

    /// Subscribe to global events
    pub fn subscribe_global(&self) -> broadcast::Receiver<GlobalEvent> {
        self.global.subscribe()
    }

    /// Number of live receivers on a zone topic
    pub fn subscriber_count(&self, zone_id: &ZoneId) -> usize {
        self.zones
            .get(zone_id)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }
}

impl Default for ChannelBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl Broadcaster for ChannelBroadcaster {
    async fn publish(&self, zone_id: &ZoneId, snapshot: &PlaybackState) -> Result<(), BroadcastError> {
        let Some(sender) = self.zones.get(zone_id) else {
            return Err(BroadcastError::NoSubscribers(zone_topic(zone_id)));
        };
        sender
            .send(snapshot.clone())
            .map(|_| ())
            .map_err(|_| BroadcastError::NoSubscribers(zone_topic(zone_id)))
    }

    async fn publish_global(&self, event: &GlobalEvent) -> Result<(), BroadcastError> {
        self.global
            .send(event.clone())
            .map(|_| ())
            .map_err(|_| BroadcastError::NoSubscribers(GLOBAL_TOPIC.to_string()))
    }
}
