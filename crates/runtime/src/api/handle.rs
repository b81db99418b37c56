//! Cloneable façade for issuing commands to a running battle.
//!
//! [`EngineHandle`] hides channel plumbing and offers async helpers for
//! declaring actions, cancelling, and streaming events from specific topics.
use tokio::sync::{broadcast, mpsc, oneshot};

use battle_core::{BattleId, DeclaredAction};

use super::errors::{Result, RuntimeError};
use crate::events::{Event, EventBus, Topic};
use crate::snapshot::BattleSnapshot;
use crate::workers::Command;

/// Client-facing handle to one engine-controlled battle.
#[derive(Clone)]
pub struct EngineHandle {
    battle_id: BattleId,
    command_tx: mpsc::Sender<Command>,
    event_bus: EventBus,
}

impl EngineHandle {
    pub(crate) fn new(
        battle_id: BattleId,
        command_tx: mpsc::Sender<Command>,
        event_bus: EventBus,
    ) -> Self {
        Self {
            battle_id,
            command_tx,
            event_bus,
        }
    }

    pub fn battle_id(&self) -> BattleId {
        self.battle_id
    }

    /// Declares an action for the round currently in preparation.
    ///
    /// The worker validates it with the same rules the store uses; a
    /// rejection comes back as [`RuntimeError::Rejected`].
    pub async fn declare_action(&self, declared: DeclaredAction) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::DeclareAction {
                declared,
                reply: reply_tx,
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)?
    }

    /// Asks the engine to abort the battle.
    ///
    /// The acknowledgement is the terminal result itself, which arrives on
    /// the completion channel with an `aborted` outcome.
    pub async fn cancel(&self, reason: impl Into<String>) -> Result<()> {
        self.command_tx
            .send(Command::Cancel {
                reason: reason.into(),
            })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)
    }

    /// Captures the current battle state without waiting for the next
    /// published snapshot.
    pub async fn query_snapshot(&self) -> Result<BattleSnapshot> {
        let (reply_tx, reply_rx) = oneshot::channel();

        self.command_tx
            .send(Command::QuerySnapshot { reply: reply_tx })
            .await
            .map_err(|_| RuntimeError::CommandChannelClosed)?;

        reply_rx.await.map_err(RuntimeError::ReplyChannelClosed)
    }

    /// Subscribe to events from a specific topic
    ///
    /// # Topics
    ///
    /// - `Topic::Snapshot` - full battle snapshots, one per resolved turn
    /// - `Topic::Turn` - lightweight turn and round notices
    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.event_bus.subscribe(topic)
    }

    pub fn subscribe_multiple(
        &self,
        topics: &[Topic],
    ) -> std::collections::HashMap<Topic, broadcast::Receiver<Event>> {
        self.event_bus.subscribe_multiple(topics)
    }

    pub fn event_bus(&self) -> &EventBus {
        &self.event_bus
    }
}
