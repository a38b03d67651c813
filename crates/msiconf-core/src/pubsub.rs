use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;
use tokio::sync::broadcast::{self, error::RecvError, error::TryRecvError};
use tracing::{debug, warn};
use uuid::Uuid;

pub const DEFAULT_CAPACITY: usize = 1024;

/// Topic names published by this crate.
pub mod topics {
    pub const PROCESSING_CONFIG_GENERATED: &str = "processing_config.generated";
    pub const DATASET_METADATA_UPDATED: &str = "dataset.metadata_updated";
}

#[derive(Debug, Error)]
pub enum PubSubError {
    #[error("bus capacity must be greater than zero")]
    ZeroCapacity,
}

#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub id: Uuid,
    pub topic: String,
    pub payload: Value,
    pub published_at: DateTime<Utc>,
}

/// In-process publish/subscribe bus. Each topic is a bounded broadcast
/// channel created on first subscription.
pub struct PubSub {
    topics: DashMap<String, broadcast::Sender<Event>>,
    capacity: usize,
}

impl PubSub {
    pub fn new(capacity: usize) -> Result<Self, PubSubError> {
        if capacity == 0 {
            return Err(PubSubError::ZeroCapacity);
        }
        Ok(Self {
            topics: DashMap::new(),
            capacity,
        })
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn subscribe(&self, topic: &str) -> Subscription {
        let receiver = self
            .topics
            .entry(topic.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .subscribe();
        debug!(topic, "subscribed");
        Subscription {
            topic: topic.to_string(),
            receiver,
        }
    }

    /// Publishes `payload` on `topic` and returns how many subscribers received it.
    pub fn publish(&self, topic: &str, payload: Value) -> usize {
        let Some(sender) = self.topics.get(topic) else {
            debug!(topic, "no subscribers; event dropped");
            return 0;
        };

        let event = Event {
            id: Uuid::new_v4(),
            topic: topic.to_string(),
            payload,
            published_at: Utc::now(),
        };

        match sender.send(event) {
            Ok(delivered) => delivered,
            Err(_) => {
                debug!(topic, "all subscribers gone; event dropped");
                0
            }
        }
    }

    pub fn subscriber_count(&self, topic: &str) -> usize {
        self.topics
            .get(topic)
            .map(|sender| sender.receiver_count())
            .unwrap_or(0)
    }

    pub fn topics(&self) -> Vec<String> {
        let mut names: Vec<String> = self.topics.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }
}

impl Default for PubSub {
    fn default() -> Self {
        Self {
            topics: DashMap::new(),
            capacity: DEFAULT_CAPACITY,
        }
    }
}

pub struct Subscription {
    topic: String,
    receiver: broadcast::Receiver<Event>,
}

impl Subscription {
    /// Waits for the next event. Returns `None` once the bus has been dropped.
    pub async fn recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged behind");
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    pub fn try_recv(&mut self) -> Option<Event> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(skipped)) => {
                    warn!(topic = %self.topic, skipped, "subscriber lagged behind");
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }
}
