//! Battle worker that owns a handed-off battle until it ends.
//!
//! Receives commands from [`crate::EngineHandle`], drives the engine one turn
//! slot at a time, and publishes a snapshot after every state change. The
//! terminal result is sent once on a one-shot channel and the task exits.
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, oneshot};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use battle_core::{
    BattleEngine, BattlePhase, BattleState, DeclaredAction, TurnOutcome, UnitAction,
};

use crate::api::{ActionProvider, RewardOracle, Result, RuntimeError};
use crate::events::{Event, EventBus, TurnEvent};
use crate::handoff::BattleCompletion;
use crate::oracle::OracleBundle;
use crate::snapshot::BattleSnapshot;

/// Commands that can be sent to the battle worker.
pub enum Command {
    /// Declare an action for the round in preparation.
    DeclareAction {
        declared: DeclaredAction,
        reply: oneshot::Sender<Result<()>>,
    },
    /// Abort the battle. Acknowledged by the terminal result.
    Cancel { reason: String },
    /// Capture the current state.
    QuerySnapshot {
        reply: oneshot::Sender<BattleSnapshot>,
    },
}

#[derive(Clone, Copy, Debug)]
pub(crate) struct WorkerSettings {
    pub turn_delay: Duration,
    pub preparation_window: Duration,
}

pub(crate) struct BattleWorker {
    state: BattleState,
    oracles: OracleBundle,
    provider: Arc<dyn ActionProvider>,
    rewards: Arc<dyn RewardOracle>,
    settings: WorkerSettings,
    command_rx: mpsc::Receiver<Command>,
    commands_open: bool,
    event_bus: EventBus,
    completion_tx: Option<oneshot::Sender<BattleCompletion>>,
    sequence: u64,
}

impl BattleWorker {
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn new(
        state: BattleState,
        oracles: OracleBundle,
        provider: Arc<dyn ActionProvider>,
        rewards: Arc<dyn RewardOracle>,
        settings: WorkerSettings,
        command_rx: mpsc::Receiver<Command>,
        event_bus: EventBus,
        completion_tx: oneshot::Sender<BattleCompletion>,
    ) -> Self {
        Self {
            state,
            oracles,
            provider,
            rewards,
            settings,
            command_rx,
            commands_open: true,
            event_bus,
            completion_tx: Some(completion_tx),
            sequence: 0,
        }
    }

    pub(crate) async fn run(mut self) {
        let battle_id = self.state.battle_id;
        info!(
            target: "runtime::worker",
            battle_id = %battle_id,
            round = self.state.current_round,
            "engine took control"
        );
        self.event_bus.publish(Event::Turn(TurnEvent::EngineStarted {
            battle_id,
            round: self.state.current_round,
        }));
        if self.state.current_phase == BattlePhase::Idle {
            self.start_battle();
        } else {
            self.publish_snapshot();
        }

        while !self.state.is_over() {
            self.drain_commands();
            if self.state.is_over() {
                break;
            }

            match self.state.current_phase {
                BattlePhase::Idle => self.start_battle(),
                BattlePhase::Preparation => self.prepare_round().await,
                BattlePhase::Execution => self.step().await,
                BattlePhase::Resolution | BattlePhase::BattleOver => {
                    // The engine never rests in resolution; treat it as a
                    // stalled battle rather than spinning.
                    warn!(
                        target: "runtime::worker",
                        battle_id = %battle_id,
                        phase = %self.state.current_phase,
                        "worker found battle in a transient phase"
                    );
                    self.abort("engine stalled in a transient phase");
                }
            }
        }

        self.complete();
        debug!(target: "runtime::worker", battle_id = %battle_id, "worker exiting");
    }

    fn start_battle(&mut self) {
        let env = self.oracles.as_env();
        let mut engine = BattleEngine::new(&mut self.state, env);
        if let Err(error) = engine.start() {
            warn!(target: "runtime::worker", %error, "failed to start battle");
            engine.abort(format!("failed to start: {error}"));
        }
        self.publish_snapshot();
    }

    /// Waits for store declarations, fills the rest from the provider, and
    /// enters execution.
    async fn prepare_round(&mut self) {
        let deadline = Instant::now() + self.settings.preparation_window;

        while self.commands_open && !self.state.all_units_have_actions() {
            tokio::select! {
                cmd = self.command_rx.recv() => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => self.commands_open = false,
                },
                _ = tokio::time::sleep_until(deadline) => break,
            }
            if self.state.is_over() {
                return;
            }
        }

        for unit in self.state.pending_units() {
            let action = match self.provider.provide_action(unit, &self.state).await {
                Ok(action) => action,
                Err(error) => {
                    warn!(target: "runtime::worker", unit = %unit, %error, "provider failed, defending");
                    UnitAction::defend()
                }
            };
            self.declare_with_fallback(DeclaredAction::new(unit, action));
        }

        let env = self.oracles.as_env();
        let mut engine = BattleEngine::new(&mut self.state, env);
        if let Err(error) = engine.begin_execution() {
            warn!(target: "runtime::worker", %error, "could not enter execution");
            engine.abort(format!("could not enter execution: {error}"));
        }
        drop(engine);
        self.publish_snapshot();
    }

    fn declare_with_fallback(&mut self, declared: DeclaredAction) {
        let unit = declared.unit_id;
        let env = self.oracles.as_env();
        let mut engine = BattleEngine::new(&mut self.state, env);
        if let Err(error) = engine.declare_action(declared) {
            debug!(target: "runtime::worker", unit = %unit, %error, "provided action rejected, defending");
            if let Err(error) = engine.declare_action(DeclaredAction::new(unit, UnitAction::defend())) {
                warn!(target: "runtime::worker", unit = %unit, %error, "fallback declaration rejected");
            }
        }
    }

    /// Resolves one turn slot, publishes the result, and paces the next one.
    async fn step(&mut self) {
        let battle_id = self.state.battle_id;
        let round = self.state.current_round;

        let env = self.oracles.as_env();
        let mut engine = BattleEngine::new(&mut self.state, env);
        let outcome = engine.execute_next_turn();
        drop(engine);

        match outcome {
            Ok(outcome) => self.publish_turn(round, &outcome),
            Err(error) => {
                warn!(target: "runtime::worker", battle_id = %battle_id, %error, "turn failed");
                self.abort(format!("turn failed: {error}"));
                return;
            }
        }
        self.publish_snapshot();

        if !self.state.is_over() && !self.settings.turn_delay.is_zero() {
            self.pause(self.settings.turn_delay).await;
        }
    }

    /// Sleeps between turns while still serving commands.
    async fn pause(&mut self, delay: Duration) {
        let sleep = tokio::time::sleep(delay);
        tokio::pin!(sleep);

        loop {
            tokio::select! {
                _ = &mut sleep => break,
                cmd = self.command_rx.recv(), if self.commands_open => match cmd {
                    Some(cmd) => self.handle_command(cmd),
                    None => self.commands_open = false,
                },
            }
            if self.state.is_over() {
                break;
            }
        }
    }

    fn drain_commands(&mut self) {
        while self.commands_open {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(mpsc::error::TryRecvError::Empty) => break,
                Err(mpsc::error::TryRecvError::Disconnected) => self.commands_open = false,
            }
        }
    }

    fn handle_command(&mut self, cmd: Command) {
        match cmd {
            Command::DeclareAction { declared, reply } => {
                let env = self.oracles.as_env();
                let mut engine = BattleEngine::new(&mut self.state, env);
                let result = engine
                    .declare_action(declared)
                    .map(|_| ())
                    .map_err(RuntimeError::from);
                drop(engine);
                if result.is_ok() {
                    self.publish_snapshot();
                }
                if reply.send(result).is_err() {
                    debug!("reply channel closed (caller dropped)");
                }
            }
            Command::Cancel { reason } => {
                info!(
                    target: "runtime::worker",
                    battle_id = %self.state.battle_id,
                    %reason,
                    "cancel requested"
                );
                self.abort(reason);
            }
            Command::QuerySnapshot { reply } => {
                let snapshot = BattleSnapshot::capture(&self.state, self.sequence);
                if reply.send(snapshot).is_err() {
                    debug!("reply channel closed (caller dropped)");
                }
            }
        }
    }

    fn abort(&mut self, reason: impl Into<String>) {
        let env = self.oracles.as_env();
        let mut engine = BattleEngine::new(&mut self.state, env);
        if engine.abort(reason) {
            drop(engine);
            self.publish_snapshot();
        }
    }

    fn publish_turn(&self, round: u32, outcome: &TurnOutcome) {
        let battle_id = self.state.battle_id;
        self.event_bus.publish(Event::Turn(TurnEvent::TurnResolved {
            battle_id,
            round,
            unit: outcome.unit,
            skipped: outcome.skipped,
        }));
        if outcome.round_complete {
            self.event_bus
                .publish(Event::Turn(TurnEvent::RoundCompleted { battle_id, round }));
        }
    }

    fn publish_snapshot(&mut self) -> BattleSnapshot {
        self.sequence += 1;
        let snapshot = BattleSnapshot::capture(&self.state, self.sequence);
        self.event_bus
            .publish(Event::Snapshot(Box::new(snapshot.clone())));
        snapshot
    }

    fn complete(&mut self) {
        let battle_id = self.state.battle_id;
        let Some(result) = self.state.result.clone() else {
            warn!(target: "runtime::worker", battle_id = %battle_id, "worker exiting without a result");
            return;
        };

        let rewards = self.rewards.compute(&result, &self.state);
        let final_snapshot = self.publish_snapshot();
        self.event_bus
            .publish(Event::Turn(TurnEvent::BattleFinished {
                battle_id,
                outcome: result.outcome,
            }));

        info!(
            target: "runtime::worker",
            battle_id = %battle_id,
            outcome = %result.outcome,
            round = result.round,
            "battle completed"
        );

        let Some(completion_tx) = self.completion_tx.take() else {
            return;
        };
        let completion = BattleCompletion {
            battle_id,
            result,
            rewards,
            final_snapshot,
        };
        if completion_tx.send(completion).is_err() {
            warn!(target: "runtime::worker", battle_id = %battle_id, "completion receiver dropped");
        }
    }
}
