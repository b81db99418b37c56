//! Round state machine and action resolution pipeline.
//!
//! The [`BattleEngine`] is the only writer of a [`BattleState`] once a battle
//! has started. Both the UI store (during preparation) and the runtime worker
//! (from execution onward) drive the same engine, so the rules never fork.
//!
//! Phases advance `idle -> preparation -> execution -> resolution ->
//! {preparation | battle_over}`. Every unit defeat runs the end-condition
//! check immediately, so a finished battle short-circuits the rest of the
//! round.

mod effects;
mod errors;
mod pipeline;
mod turns;

pub use errors::PhaseError;

use tracing::info;

use crate::env::BattleEnv;
use crate::error::ValidationError;
use crate::passive::{PassiveTriggerRegistry, TriggerEvent, TriggerTiming};
use crate::state::{
    BattleOutcome, BattlePhase, BattleResult, BattleState, DeclaredAction, LogEntryKind, SkipReason,
    UnitAction, UnitId,
};

/// What happened in one turn slot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TurnOutcome {
    pub unit: UnitId,
    /// `None` if the unit acted.
    pub skipped: Option<SkipReason>,
    /// True if this slot was the last of its round.
    pub round_complete: bool,
    /// Set once the battle has ended.
    pub battle_over: Option<BattleOutcome>,
}

impl TurnOutcome {
    pub fn acted(&self) -> bool {
        self.skipped.is_none()
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct RoundSummary {
    pub round: u32,
    pub turns: Vec<TurnOutcome>,
    pub battle_over: Option<BattleOutcome>,
}

pub struct BattleEngine<'a> {
    state: &'a mut BattleState,
    env: BattleEnv<'a>,
    registry: PassiveTriggerRegistry,
}

impl<'a> BattleEngine<'a> {
    pub fn new(state: &'a mut BattleState, env: BattleEnv<'a>) -> Self {
        let registry = PassiveTriggerRegistry::from_state(state, env.skills);
        Self {
            state,
            env,
            registry,
        }
    }

    pub fn state(&self) -> &BattleState {
        self.state
    }

    pub fn registry(&self) -> &PassiveTriggerRegistry {
        &self.registry
    }

    /// Opens the battle: fires battle-start passives, computes the first turn
    /// order, and enters preparation.
    pub fn start(&mut self) -> Result<(), PhaseError> {
        self.expect_phase(BattlePhase::Idle)?;

        let battle_id = self.state.battle_id;
        self.state.log(LogEntryKind::BattleStart { battle_id });
        info!(
            target: "battle::engine",
            battle_id = %battle_id,
            units = self.state.units.len(),
            seed = self.state.rng.seed,
            "battle started"
        );

        self.fire_triggers(TriggerTiming::BattleStart, &TriggerEvent::new(), 0);
        if self.check_and_finish() {
            return Ok(());
        }
        self.open_round();
        Ok(())
    }

    /// Records one unit's action for the current round.
    ///
    /// Rejected declarations leave the unit pending.
    pub fn declare_action(
        &mut self,
        declared: DeclaredAction,
    ) -> Result<Option<UnitAction>, ValidationError> {
        self.state.declare_action(declared, self.env.skills)
    }

    /// Moves from preparation to execution once every living unit has an
    /// action.
    pub fn begin_execution(&mut self) -> Result<(), PhaseError> {
        self.expect_phase(BattlePhase::Preparation)?;
        let pending = self.state.pending_units();
        if !pending.is_empty() {
            return Err(PhaseError::ActionsPending { pending });
        }
        self.state.current_phase = BattlePhase::Execution;
        self.state.current_turn_index = 0;
        Ok(())
    }

    /// Ends the battle with an aborted result. Returns false if it had
    /// already ended.
    pub fn abort(&mut self, reason: impl Into<String>) -> bool {
        if self.state.result.is_some() {
            return false;
        }
        self.finish(BattleOutcome::Aborted, reason.into());
        true
    }

    pub fn result(&self) -> Option<&BattleResult> {
        self.state.result.as_ref()
    }

    fn expect_phase(&self, expected: BattlePhase) -> Result<(), PhaseError> {
        let actual = self.state.current_phase;
        if actual == BattlePhase::BattleOver && expected != BattlePhase::BattleOver {
            return Err(PhaseError::BattleOver);
        }
        if actual != expected {
            return Err(PhaseError::UnexpectedPhase { expected, actual });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests;
