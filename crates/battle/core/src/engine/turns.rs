//! Turn order and round bookkeeping.

use arrayvec::ArrayVec;
use tracing::{debug, info};

use crate::config::BattleConfig;
use crate::env::roll_context;
use crate::state::{BattlePhase, LogEntryKind, StatKind, TickOutcome, UnitId};

use super::{BattleEngine, PhaseError, RoundSummary, TurnOutcome};

impl<'a> BattleEngine<'a> {
    /// Orders the living units by modified speed plus a bounded random
    /// tie-break, highest first. Equal priorities keep unit-id order.
    pub fn calculate_turn_order(&mut self) -> ArrayVec<UnitId, { BattleConfig::MAX_UNITS }> {
        let living: Vec<(UnitId, u32)> = self
            .state
            .units
            .values()
            .filter(|unit| unit.is_alive())
            .map(|unit| (unit.id, unit.modified_attribute(StatKind::Speed)))
            .collect();

        let tie_break_max = self.state.config.tie_break_max;
        let mut ranked: Vec<(UnitId, u64)> = Vec::with_capacity(living.len());
        for (id, speed) in living {
            let seed = self.state.rng.next_seed(id, roll_context::TIE_BREAK);
            let wobble = self.env.rng.range(seed, 0, tie_break_max);
            ranked.push((id, u64::from(speed) + u64::from(wobble)));
        }
        ranked.sort_by(|a, b| b.1.cmp(&a.1));

        ranked.into_iter().map(|(id, _)| id).collect()
    }

    /// Resolves the unit at the current turn slot, then advances.
    pub fn execute_next_turn(&mut self) -> Result<TurnOutcome, PhaseError> {
        self.expect_phase(BattlePhase::Execution)?;

        // Every living unit is in the order, and an execution phase implies
        // both sides still stand, so the slot exists.
        let Some(&unit) = self.state.turn_order.get(self.state.current_turn_index) else {
            return Err(PhaseError::UnexpectedPhase {
                expected: BattlePhase::Execution,
                actual: BattlePhase::Resolution,
            });
        };

        let skipped = self.resolve_turn(unit);
        let round_complete = if self.state.is_over() {
            true
        } else {
            self.next_turn()
        };

        Ok(TurnOutcome {
            unit,
            skipped,
            round_complete,
            battle_over: self.state.result.as_ref().map(|result| result.outcome),
        })
    }

    /// Runs every remaining turn of the current round. Enters execution
    /// first if the battle is still in preparation.
    pub fn execute_round(&mut self) -> Result<RoundSummary, PhaseError> {
        if self.state.current_phase == BattlePhase::Preparation {
            self.begin_execution()?;
        }
        self.expect_phase(BattlePhase::Execution)?;

        let mut summary = RoundSummary {
            round: self.state.current_round,
            ..RoundSummary::default()
        };
        loop {
            let outcome = self.execute_next_turn()?;
            let done = outcome.round_complete;
            summary.battle_over = outcome.battle_over;
            summary.turns.push(outcome);
            if done {
                return Ok(summary);
            }
        }
    }

    /// Advances the turn index. Running past the end of the order resolves
    /// the round. Returns true if the round ended.
    pub fn next_turn(&mut self) -> bool {
        self.state.current_turn_index += 1;
        if self.state.current_turn_index < self.state.turn_order.len() {
            return false;
        }
        self.state.current_phase = BattlePhase::Resolution;
        if !self.check_and_finish() {
            self.next_round();
        }
        true
    }

    /// Starts the next round: ticks status effects on every living unit,
    /// then recomputes turn order and reopens preparation.
    pub fn next_round(&mut self) {
        self.state.current_round += 1;
        self.state.unit_actions.clear();
        if self.check_and_finish() {
            return;
        }

        let living: Vec<UnitId> = self
            .state
            .units
            .values()
            .filter(|unit| unit.is_alive())
            .map(|unit| unit.id)
            .collect();

        for id in living {
            let Some(unit) = self.state.unit_mut(id) else {
                continue;
            };
            let ticks = unit.process_turn_start_effects();

            for tick in ticks {
                let hp_delta = match tick.outcome {
                    TickOutcome::Damaged(outcome) => -i64::from(outcome.damage_applied),
                    TickOutcome::Healed(outcome) => i64::from(outcome.healing_applied),
                    TickOutcome::Stunned | TickOutcome::Passive => 0,
                };
                let remaining_hp = self
                    .state
                    .unit(id)
                    .map(|unit| unit.stats().current_hp)
                    .unwrap_or_default();
                self.state.log(LogEntryKind::StatusTick {
                    unit: id,
                    effect: tick.effect_id.clone(),
                    hp_delta,
                    remaining_hp,
                });
                if tick.expired {
                    self.state.log(LogEntryKind::StatusExpired {
                        unit: id,
                        effect: tick.effect_id.clone(),
                    });
                }

                if let TickOutcome::Damaged(outcome) = tick.outcome
                    && outcome.is_defeated
                    && outcome.damage_applied > 0
                {
                    debug!(
                        target: "battle::engine",
                        unit = %id,
                        effect = %tick.effect_id,
                        "unit succumbed to a status effect"
                    );
                    self.handle_defeat(id, tick.source, 0);
                }
            }

            if self.state.is_over() {
                return;
            }
        }

        self.open_round();
    }

    /// Recomputes turn order and enters preparation for the current round.
    pub(super) fn open_round(&mut self) {
        self.state.turn_order = self.calculate_turn_order();
        self.state.current_turn_index = 0;
        self.state.current_phase = BattlePhase::Preparation;
        let turn_order = self.state.turn_order.to_vec();
        info!(
            target: "battle::engine",
            battle_id = %self.state.battle_id,
            round = self.state.current_round,
            units = turn_order.len(),
            "round started"
        );
        self.state.log(LogEntryKind::RoundStart { turn_order });
    }

    /// Runs the end-condition check and finishes the battle if it is over.
    /// Returns true if the battle is over.
    pub(super) fn check_and_finish(&mut self) -> bool {
        if self.state.result.is_some() {
            return true;
        }
        let condition = self.state.check_battle_end_conditions();
        match condition.outcome() {
            Some(outcome) => {
                self.finish(outcome, condition.reason().to_owned());
                true
            }
            None => false,
        }
    }
}
