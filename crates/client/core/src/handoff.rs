//! Moves battle authority from the store to the engine and back.
//!
//! [`HandoffCoordinator::launch`] takes the battle out of the store and
//! spawns the engine worker. The returned [`BattleSession`] feeds engine
//! snapshots into the store until the terminal result arrives, then hands
//! control back. The store lock is held only for the duration of a single
//! update, never across an await on the engine.

use std::sync::Arc;

use tokio::sync::{Mutex, broadcast, oneshot};
use tokio::task::JoinHandle;
use tracing::{info, warn};

use battle_core::{BattleId, BattleResult, DeclaredAction, ProtocolError};
use battle_runtime::{
    ActionProvider, BattleCompletion, BattleRuntime, EngineHandle, Event, EventBus, OracleBundle,
    RewardOracle, RuntimeConfig, RuntimeError, Topic,
};

use crate::error::HandoffError;
use crate::scope::UpdateScope;
use crate::store::{BattleStore, CancelRequest};

pub struct HandoffCoordinator {
    config: RuntimeConfig,
    oracles: OracleBundle,
    provider: Option<Arc<dyn ActionProvider>>,
    rewards: Option<Arc<dyn RewardOracle>>,
}

impl HandoffCoordinator {
    pub fn new(config: RuntimeConfig, oracles: OracleBundle) -> Self {
        Self {
            config,
            oracles,
            provider: None,
            rewards: None,
        }
    }

    pub fn with_action_provider(mut self, provider: impl ActionProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn with_shared_action_provider(mut self, provider: Arc<dyn ActionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_rewards(mut self, rewards: impl RewardOracle + 'static) -> Self {
        self.rewards = Some(Arc::new(rewards));
        self
    }

    pub fn with_shared_rewards(mut self, rewards: Arc<dyn RewardOracle>) -> Self {
        self.rewards = Some(rewards);
        self
    }

    /// Transfers control out of `store` and starts the engine.
    pub async fn launch(&self, store: &Mutex<BattleStore>) -> Result<BattleSession, HandoffError> {
        let handoff = store.lock().await.transfer_control_to_engine()?;
        let battle_id = handoff.battle_id;

        // Subscribe before the worker exists so its first snapshot is not
        // missed.
        let event_bus = EventBus::with_capacity(self.config.event_buffer_size);
        let snapshots = event_bus.subscribe(Topic::Snapshot);

        let mut builder = BattleRuntime::builder()
            .config(self.config.clone())
            .oracles(self.oracles.clone())
            .event_bus(event_bus);
        if let Some(provider) = &self.provider {
            builder = builder.shared_action_provider(Arc::clone(provider));
        }
        if let Some(rewards) = &self.rewards {
            builder = builder.shared_rewards(Arc::clone(rewards));
        }

        let link = builder.launch(handoff)?;
        info!(target: "client::handoff", battle_id = %battle_id, "engine launched");

        Ok(BattleSession {
            handle: link.handle,
            snapshots,
            completion: link.completion,
            join: link.join,
        })
    }

    /// Runs the full store → engine → store cycle and returns the result.
    pub async fn run_battle(&self, store: &Mutex<BattleStore>) -> Result<BattleResult, HandoffError> {
        self.launch(store).await?.drive(store, |_| {}).await
    }
}

/// One engine-controlled battle, from handoff to terminal result.
pub struct BattleSession {
    handle: EngineHandle,
    snapshots: broadcast::Receiver<Event>,
    completion: oneshot::Receiver<BattleCompletion>,
    join: JoinHandle<()>,
}

impl BattleSession {
    pub fn battle_id(&self) -> BattleId {
        self.handle.battle_id()
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    /// Sends a declaration for a round the engine has opened.
    pub async fn declare_action(&self, declared: DeclaredAction) -> Result<(), HandoffError> {
        self.handle.declare_action(declared).await?;
        Ok(())
    }

    /// Asks the engine to abort. The store is updated only when the
    /// resulting terminal message arrives through [`Self::drive`].
    pub async fn cancel(
        &self,
        store: &Mutex<BattleStore>,
        reason: impl Into<String>,
    ) -> Result<(), HandoffError> {
        let request = store.lock().await.request_cancel(reason)?;
        match request {
            CancelRequest::ForwardToEngine { battle_id, reason } => {
                if battle_id != self.battle_id() {
                    return Err(ProtocolError::UnknownBattle {
                        expected: Some(self.battle_id()),
                        received: battle_id,
                    }
                    .into());
                }
                self.handle.cancel(reason).await?;
            }
            CancelRequest::Completed { .. } => {}
        }
        Ok(())
    }

    /// Mirrors snapshots into `store` until the terminal result arrives,
    /// then returns control to the store.
    ///
    /// `on_update` is called with the scope of every store change.
    pub async fn drive<F>(
        self,
        store: &Mutex<BattleStore>,
        mut on_update: F,
    ) -> Result<BattleResult, HandoffError>
    where
        F: FnMut(UpdateScope),
    {
        let BattleSession {
            handle,
            mut snapshots,
            mut completion,
            join,
        } = self;
        let battle_id = handle.battle_id();

        let received = loop {
            tokio::select! {
                // Queued snapshots are applied before the terminal message.
                biased;

                event = snapshots.recv() => match event {
                    Ok(Event::Snapshot(snapshot)) => {
                        let scope = store.lock().await.apply_snapshot(&snapshot)?;
                        if !scope.is_empty() {
                            on_update(scope);
                        }
                    }
                    Ok(Event::Turn(_)) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Every snapshot is a full copy, so the next one
                        // catches the store up.
                        warn!(target: "client::handoff", battle_id = %battle_id, skipped, "snapshot stream lagged");
                    }
                    Err(broadcast::error::RecvError::Closed) => break (&mut completion).await,
                },
                outcome = &mut completion => break outcome,
            }
        };

        let completion = received.map_err(RuntimeError::CompletionLost)?;
        let result = completion.result.clone();
        let scope = store.lock().await.receive_result(completion)?;
        on_update(scope);

        join.await.map_err(RuntimeError::WorkerJoin)?;
        info!(
            target: "client::handoff",
            battle_id = %battle_id,
            outcome = %result.outcome,
            "battle handed back to store"
        );
        Ok(result)
    }
}
