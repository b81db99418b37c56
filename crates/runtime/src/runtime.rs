//! Engine launcher.
//!
//! [`BattleRuntime`] takes an [`EngineHandoff`], spawns the worker that owns
//! it, and returns an [`EngineLink`] holding the command handle, the one-shot
//! completion receiver, and the worker's join handle.

use std::env;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::info;

use battle_core::{BattleConfig, BattleId, BattlePhase};

use crate::api::{
    ActionProvider, EngineHandle, FrontlineActionProvider, NoRewards, Result, RewardOracle,
    RuntimeError,
};
use crate::events::{Event, EventBus, Topic};
use crate::handoff::{BattleCompletion, EngineHandoff};
use crate::oracle::OracleBundle;
use crate::workers::{BattleWorker, Command, WorkerSettings};

/// Runtime configuration shared across the launcher and workers.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Rules for battles the client sets up. The engine itself always runs
    /// with the config carried inside the handed-off state.
    pub battle: BattleConfig,
    pub event_buffer_size: usize,
    pub command_buffer_size: usize,
    /// Pause between resolved turns, for presentation.
    pub turn_delay: Duration,
    /// How long a round under engine control waits for store declarations
    /// before the action provider fills the gaps.
    pub preparation_window: Duration,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            battle: BattleConfig::default(),
            event_buffer_size: 64,
            command_buffer_size: 32,
            turn_delay: Duration::ZERO,
            preparation_window: Duration::ZERO,
        }
    }
}

impl RuntimeConfig {
    /// Create configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // Battle rules
        if let Some(rounds) = read_env::<u32>("BATTLE_MAX_ROUNDS") {
            config.battle.max_rounds = rounds.max(1);
        }
        if let Some(seed) = read_env::<u64>("BATTLE_SEED") {
            config.battle.seed = Some(seed);
        }
        if let Some(tie_break) = read_env::<u32>("BATTLE_TIE_BREAK_MAX") {
            config.battle.tie_break_max = tie_break;
        }

        // Pacing
        if let Some(ms) = read_env::<u64>("BATTLE_TURN_DELAY_MS") {
            config.turn_delay = Duration::from_millis(ms);
        }
        if let Some(ms) = read_env::<u64>("BATTLE_PREPARATION_WINDOW_MS") {
            config.preparation_window = Duration::from_millis(ms);
        }

        // Channels
        if let Some(capacity) = read_env::<usize>("BATTLE_EVENT_BUFFER") {
            config.event_buffer_size = capacity.max(1);
        }
        if let Some(capacity) = read_env::<usize>("BATTLE_COMMAND_BUFFER") {
            config.command_buffer_size = capacity.max(1);
        }

        config
    }
}

fn read_env<T>(key: &str) -> Option<T>
where
    T: std::str::FromStr,
{
    env::var(key).ok()?.parse().ok()
}

/// Entry point for launching engine-controlled battles.
pub struct BattleRuntime;

impl BattleRuntime {
    pub fn builder() -> RuntimeBuilder {
        RuntimeBuilder::new()
    }
}

/// Everything the store needs to talk to one running battle.
pub struct EngineLink {
    pub handle: EngineHandle,
    /// Resolves exactly once with the terminal result.
    pub completion: oneshot::Receiver<BattleCompletion>,
    pub join: JoinHandle<()>,
}

impl EngineLink {
    pub fn battle_id(&self) -> BattleId {
        self.handle.battle_id()
    }

    pub fn handle(&self) -> EngineHandle {
        self.handle.clone()
    }

    pub fn subscribe(&self, topic: Topic) -> broadcast::Receiver<Event> {
        self.handle.subscribe(topic)
    }

    /// Waits for the terminal result and the worker's exit.
    pub async fn wait(self) -> Result<BattleCompletion> {
        let completion = self.completion.await.map_err(RuntimeError::CompletionLost)?;
        self.join.await.map_err(RuntimeError::WorkerJoin)?;
        Ok(completion)
    }
}

/// Builder for engine launches with flexible configuration.
pub struct RuntimeBuilder {
    config: RuntimeConfig,
    oracles: Option<OracleBundle>,
    provider: Option<Arc<dyn ActionProvider>>,
    rewards: Option<Arc<dyn RewardOracle>>,
    event_bus: Option<EventBus>,
}

impl RuntimeBuilder {
    fn new() -> Self {
        Self {
            config: RuntimeConfig::default(),
            oracles: None,
            provider: None,
            rewards: None,
            event_bus: None,
        }
    }

    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = config;
        self
    }

    pub fn oracles(mut self, oracles: OracleBundle) -> Self {
        self.oracles = Some(oracles);
        self
    }

    /// Provider for units left undeclared when a round opens under engine
    /// control. Defaults to [`FrontlineActionProvider`].
    pub fn action_provider(mut self, provider: impl ActionProvider + 'static) -> Self {
        self.provider = Some(Arc::new(provider));
        self
    }

    pub fn shared_action_provider(mut self, provider: Arc<dyn ActionProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn rewards(mut self, rewards: impl RewardOracle + 'static) -> Self {
        self.rewards = Some(Arc::new(rewards));
        self
    }

    pub fn shared_rewards(mut self, rewards: Arc<dyn RewardOracle>) -> Self {
        self.rewards = Some(rewards);
        self
    }

    /// Publishes on an existing bus, so callers can subscribe before the
    /// worker emits its first snapshot.
    pub fn event_bus(mut self, event_bus: EventBus) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Spawns the worker that takes ownership of `handoff`.
    ///
    /// Must be called from within a Tokio runtime. The handed-off battle has
    /// to be in preparation (or idle, in which case the engine starts it).
    pub fn launch(self, handoff: EngineHandoff) -> Result<EngineLink> {
        let EngineHandoff { battle_id, state } = handoff;

        if state.battle_id != battle_id {
            return Err(RuntimeError::HandoffMismatch {
                declared: battle_id,
                actual: state.battle_id,
            });
        }
        if !matches!(
            state.current_phase,
            BattlePhase::Preparation | BattlePhase::Idle
        ) || state.result.is_some()
        {
            return Err(RuntimeError::InvalidHandoff {
                battle_id,
                phase: state.current_phase,
            });
        }

        let RuntimeBuilder {
            config,
            oracles,
            provider,
            rewards,
            event_bus,
        } = self;

        let (command_tx, command_rx) = mpsc::channel(config.command_buffer_size.max(1));
        let (completion_tx, completion_rx) = oneshot::channel();
        let event_bus =
            event_bus.unwrap_or_else(|| EventBus::with_capacity(config.event_buffer_size));

        let worker = BattleWorker::new(
            state,
            oracles.unwrap_or_default(),
            provider.unwrap_or_else(|| Arc::new(FrontlineActionProvider)),
            rewards.unwrap_or_else(|| Arc::new(NoRewards)),
            WorkerSettings {
                turn_delay: config.turn_delay,
                preparation_window: config.preparation_window,
            },
            command_rx,
            event_bus.clone(),
            completion_tx,
        );

        info!(target: "runtime", battle_id = %battle_id, "launching battle engine");
        let join = tokio::spawn(worker.run());

        Ok(EngineLink {
            handle: EngineHandle::new(battle_id, command_tx, event_bus),
            completion: completion_rx,
            join,
        })
    }
}

impl Default for RuntimeBuilder {
    fn default() -> Self {
        Self::new()
    }
}
