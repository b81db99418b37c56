//! Topic-based event bus implementation.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

use super::types::TurnEvent;
use crate::snapshot::BattleSnapshot;

/// Topics for event routing
#[derive(Debug, Clone, Copy, Hash, Eq, PartialEq, Serialize, Deserialize)]
pub enum Topic {
    /// Full battle snapshots
    Snapshot,
    /// Turn and round notices
    Turn,
}

/// Event wrapper that carries the topic and typed event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Event {
    Snapshot(Box<BattleSnapshot>),
    Turn(TurnEvent),
}

impl Event {
    pub fn topic(&self) -> Topic {
        match self {
            Event::Snapshot(_) => Topic::Snapshot,
            Event::Turn(_) => Topic::Turn,
        }
    }
}

/// Topic-based event bus
///
/// Each topic owns a broadcast channel created up front, so subscribing never
/// fails. Publishing with no subscribers is not an error.
#[derive(Clone)]
pub struct EventBus {
    snapshot: broadcast::Sender<Event>,
    turn: broadcast::Sender<Event>,
}

impl EventBus {
    /// Creates a new event bus with default capacity for each topic
    pub fn new() -> Self {
        Self::with_capacity(64)
    }

    /// Creates a new event bus with specified capacity per topic
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            snapshot: broadcast::channel(capacity).0,
            turn: broadcast::channel(capacity).0,
        }
    }

    fn sender(&self, topic: Topic) -> &broadcast::Sender<Event> {
        match topic {
            Topic::Snapshot => &self.snapshot,
            Topic::Turn => &self.turn,
        }
    }

    /// Publish an event to its corresponding topic
    pub fn publish(&self, event: Event) {
        let topic = event.topic();
        if self.sender(topic).send(event).is_err() {
            tracing::trace!("No subscribers for topic {:?}", topic);
        }
    }

    /// Subscribe to a specific topic
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.sender(topic).subscribe()
    }

    /// Subscribe to multiple topics
    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> HashMap<Topic, broadcast::Receiver<Event>> {
        topics
            .iter()
            .map(|&topic| (topic, self.subscribe(topic)))
            .collect()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
