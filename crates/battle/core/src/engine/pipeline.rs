//! Per-turn action resolution.

use tracing::{debug, info, warn};

use crate::env::{
    DamageInput, DamageType, RollSource, SeededRolls, SkillDefinition, SkillEffect, SkillTarget,
    roll_context,
};
use crate::error::ResourceError;
use crate::passive::{TriggerEvent, TriggerTiming};
use crate::state::{
    ActionType, AttributeModifier, BattleOutcome, BattlePhase, BattleResult, EffectDuration,
    LogEntryKind, SkipReason, StatKind, StatusEffect, UnitAction, UnitId,
};

use super::BattleEngine;

/// Effect id of the defend stance buff.
pub const DEFEND_EFFECT_ID: &str = "defend";

impl<'a> BattleEngine<'a> {
    /// Resolves one unit's turn slot. Returns the skip reason if the unit did
    /// not act.
    pub(super) fn resolve_turn(&mut self, id: UnitId) -> Option<SkipReason> {
        let action = self.state.unit_actions.remove(&id);
        let (alive, stunned) = match self.state.unit(id) {
            Some(unit) => (unit.is_alive(), unit.is_stunned()),
            None => (false, false),
        };

        let skip = if !alive {
            Some(SkipReason::Defeated)
        } else if stunned {
            Some(SkipReason::Stunned)
        } else if action.is_none() {
            Some(SkipReason::NoAction)
        } else {
            None
        };
        if let Some(reason) = skip {
            return self.skip(id, reason);
        }
        let action = action?;

        let turn_event = TriggerEvent::from_source(id);
        self.fire_triggers(TriggerTiming::TurnStart, &turn_event, 0);
        if !self.is_alive(id) {
            return self.skip(id, SkipReason::Defeated);
        }
        if self.state.is_over() {
            return self.skip(id, SkipReason::NoTarget);
        }

        let skipped = match action.action_type {
            ActionType::Attack => self.resolve_attack(id, &action),
            ActionType::Defend => self.resolve_defend(id),
            ActionType::Skill => self.resolve_skill(id, &action),
        };
        if let Some(reason) = skipped {
            return self.skip(id, reason);
        }

        if !self.state.is_over() && self.is_alive(id) {
            self.fire_triggers(TriggerTiming::TurnEnd, &turn_event, 0);
        }
        None
    }

    fn skip(&mut self, unit: UnitId, reason: SkipReason) -> Option<SkipReason> {
        debug!(target: "battle::engine", unit = %unit, reason = %reason, "turn skipped");
        self.state.log(LogEntryKind::TurnSkipped { unit, reason });
        Some(reason)
    }

    fn resolve_attack(&mut self, id: UnitId, action: &UnitAction) -> Option<SkipReason> {
        let Some(target) = self.select_hostile_target(id, &action.target_ids) else {
            return Some(SkipReason::NoTarget);
        };

        let mut event = TriggerEvent::between(id, target);
        event.action_type = Some(ActionType::Attack);
        event.damage_type = Some(DamageType::Physical);

        self.fire_triggers(TriggerTiming::BeforeAnyAttack, &event, 0);
        self.fire_triggers(TriggerTiming::BeforeNormalAttack, &event, 0);
        if self.state.is_over() || !self.is_alive(id) || !self.is_alive(target) {
            return None;
        }

        self.strike(id, target, 100, &event);

        self.fire_triggers(TriggerTiming::AfterAnyAttack, &event, 0);
        self.fire_triggers(TriggerTiming::AfterNormalAttack, &event, 0);
        None
    }

    fn resolve_defend(&mut self, id: UnitId) -> Option<SkipReason> {
        let config = &self.state.config;
        let stance = StatusEffect::stat_modifier(
            DEFEND_EFFECT_ID,
            AttributeModifier::percent(StatKind::Defense, config.defend_bonus_percent),
            EffectDuration::Turns(config.defend_duration),
        )
        .with_source(id);

        let unit = self.state.unit_mut(id)?;
        unit.add_status_effect(stance);
        self.state.log(LogEntryKind::Defend { unit: id });
        None
    }

    fn resolve_skill(&mut self, id: UnitId, action: &UnitAction) -> Option<SkipReason> {
        let env = self.env;
        let Some(skill) = action.skill_id.as_ref().and_then(|skill| env.skills.skill(skill)) else {
            warn!(
                target: "battle::engine",
                unit = %id,
                skill = ?action.skill_id,
                "declared skill missing from catalog"
            );
            return Some(SkipReason::NoAction);
        };

        let target = match skill.target {
            SkillTarget::Enemy => self.select_hostile_target(id, &action.target_ids),
            SkillTarget::Ally => self.select_ally_target(id, &action.target_ids),
            SkillTarget::Caster => Some(id),
        };
        let Some(target) = target else {
            return Some(SkipReason::NoTarget);
        };

        let unit = self.state.unit_mut(id)?;
        let available = unit.stats().current_mp;
        if !unit.consume_mp(skill.mp_cost) {
            let error = ResourceError::InsufficientMp {
                unit: id,
                required: skill.mp_cost,
                available,
            };
            warn!(target: "battle::engine", %error, skill = %skill.id, "skill fizzled");
            self.state.log(LogEntryKind::InsufficientMp {
                unit: id,
                skill: skill.id.clone(),
                required: skill.mp_cost,
                available,
            });
            return Some(SkipReason::InsufficientMp);
        }
        self.state.log(LogEntryKind::SkillUsed {
            unit: id,
            skill: skill.id.clone(),
            mp_cost: skill.mp_cost,
        });

        let mut event = TriggerEvent::between(id, target);
        event.action_type = Some(ActionType::Skill);
        event.damage_type = Some(skill.damage_type);
        event.is_skill = true;
        event.skill_id = Some(skill.id.clone());

        let damaging = skill.effect.is_damaging();
        if damaging {
            self.fire_triggers(TriggerTiming::BeforeAnyAttack, &event, 0);
        }
        self.fire_triggers(TriggerTiming::BeforeSkillAttack, &event, 0);
        if self.state.is_over() || !self.is_alive(id) || !self.is_alive(target) {
            return None;
        }

        self.apply_skill_effect(id, target, skill, &event);

        if damaging {
            self.fire_triggers(TriggerTiming::AfterAnyAttack, &event, 0);
        }
        self.fire_triggers(TriggerTiming::AfterSkillAttack, &event, 0);
        None
    }

    fn apply_skill_effect(
        &mut self,
        caster: UnitId,
        target: UnitId,
        skill: &SkillDefinition,
        event: &TriggerEvent,
    ) {
        match &skill.effect {
            SkillEffect::Damage { power_percent } => {
                self.strike(caster, target, *power_percent, event);
            }
            SkillEffect::Heal { amount } => {
                if let Some(unit) = self.state.unit_mut(target) {
                    let outcome = unit.heal(*amount);
                    self.state.log(LogEntryKind::Healed {
                        unit: target,
                        amount: outcome.healing_applied,
                        current_hp: outcome.current_hp,
                    });
                }
            }
            SkillEffect::RestoreMp { amount } => {
                if let Some(unit) = self.state.unit_mut(target) {
                    let outcome = unit.recover_mp(*amount);
                    self.state.log(LogEntryKind::MpRestored {
                        unit: target,
                        amount: outcome.recovered,
                        current_mp: outcome.current_mp,
                    });
                }
            }
            SkillEffect::ApplyStatus(effect) => {
                self.apply_status(target, effect.clone().with_source(caster));
            }
        }
    }

    pub(super) fn apply_status(&mut self, target: UnitId, effect: StatusEffect) {
        let effect_id = effect.id.clone();
        let source = effect.source;
        if let Some(unit) = self.state.unit_mut(target) {
            unit.add_status_effect(effect);
            self.state.log(LogEntryKind::StatusApplied {
                unit: target,
                effect: effect_id,
                source,
            });
        }
    }

    /// One damage exchange, including crit/dodge rolls and the damage-side
    /// triggers. `event` describes the enclosing action.
    fn strike(&mut self, attacker: UnitId, target: UnitId, power_percent: u32, event: &TriggerEvent) {
        let (Some(attack), Some(defense)) = (
            self.state
                .unit(attacker)
                .map(|unit| unit.modified_attribute(StatKind::Attack)),
            self.state
                .unit(target)
                .map(|unit| unit.modified_attribute(StatKind::Defense)),
        ) else {
            return;
        };

        let env = self.env;
        let crit_roll =
            SeededRolls::new(env.rng, &mut self.state.rng, attacker, roll_context::CRITICAL)
                .roll_unit();
        let dodge_roll =
            SeededRolls::new(env.rng, &mut self.state.rng, attacker, roll_context::DODGE)
                .roll_unit();
        let damage_type = event.damage_type.unwrap_or_default();
        let roll = env.damage.compute(&DamageInput {
            attack,
            defense,
            power_percent,
            damage_type,
            crit_roll,
            dodge_roll,
        });

        if roll.is_dodged {
            self.state.log(LogEntryKind::Dodged { attacker, target });
            self.fire_triggers(TriggerTiming::OnDodge, event, 0);
            return;
        }

        let Some(unit) = self.state.unit_mut(target) else {
            return;
        };
        let outcome = unit.take_damage(roll.amount);
        self.state.log(LogEntryKind::Attack {
            attacker,
            target,
            damage: outcome.damage_applied,
            remaining_hp: outcome.remaining_hp,
            is_critical: roll.is_critical,
            skill: event.skill_id.clone(),
        });

        let mut hit = event.clone();
        hit.damage = Some(outcome.damage_applied);
        hit.is_critical = roll.is_critical;

        if roll.is_critical {
            self.fire_triggers(TriggerTiming::OnCrit, &hit, 0);
        }
        self.fire_triggers(TriggerTiming::OnAnyDamage, &hit, 0);
        let typed = match damage_type {
            DamageType::Physical => TriggerTiming::OnPhysicalDamage,
            DamageType::Magical => TriggerTiming::OnMagicalDamage,
        };
        self.fire_triggers(typed, &hit, 0);
        self.fire_triggers(TriggerTiming::AfterDamage, &hit, 0);

        if outcome.is_defeated && outcome.damage_applied > 0 {
            self.handle_defeat(target, Some(attacker), 0);
        }
    }

    /// First declared target still standing on the opposing side, otherwise
    /// the nearest living enemy (front lane first, then row).
    fn select_hostile_target(&mut self, id: UnitId, declared: &[UnitId]) -> Option<UnitId> {
        let side = self.state.unit(id)?.side.opponent();
        let chosen = declared
            .iter()
            .copied()
            .find(|target| {
                self.state
                    .unit(*target)
                    .is_some_and(|unit| unit.is_alive() && unit.side == side)
            })
            .or_else(|| {
                self.state
                    .formations
                    .get(side)
                    .units()
                    .find(|candidate| self.is_alive(*candidate))
            })?;

        if let Some(&original) = declared.first()
            && original != chosen
        {
            self.state.log(LogEntryKind::Retargeted {
                unit: id,
                from: original,
                to: chosen,
            });
        }
        Some(chosen)
    }

    /// First declared living ally, otherwise the caster itself.
    fn select_ally_target(&self, id: UnitId, declared: &[UnitId]) -> Option<UnitId> {
        let side = self.state.unit(id)?.side;
        declared
            .iter()
            .copied()
            .find(|target| {
                self.state
                    .unit(*target)
                    .is_some_and(|unit| unit.is_alive() && unit.side == side)
            })
            .or(Some(id))
    }

    /// Logs a defeat, fires death/kill passives, and ends the battle if a
    /// side was wiped.
    pub(super) fn handle_defeat(&mut self, unit: UnitId, by: Option<UnitId>, depth: u8) {
        self.state.log(LogEntryKind::UnitDefeated { unit, by });
        info!(
            target: "battle::engine",
            unit = %unit,
            by = ?by,
            round = self.state.current_round,
            "unit defeated"
        );

        let event = TriggerEvent {
            source: by,
            target: Some(unit),
            ..TriggerEvent::default()
        };
        self.fire_triggers(TriggerTiming::OnDeath, &event, depth);
        if by.is_some() {
            self.fire_triggers(TriggerTiming::OnKill, &event, depth);
        }
        self.check_and_finish();
    }

    /// Records the terminal result and enters `battle_over`.
    pub(super) fn finish(&mut self, outcome: BattleOutcome, reason: String) {
        if self.state.result.is_some() {
            return;
        }
        let round = self.state.current_round;
        info!(
            target: "battle::engine",
            battle_id = %self.state.battle_id,
            outcome = %outcome,
            round,
            reason = %reason,
            "battle ended"
        );
        self.state.result = Some(BattleResult {
            outcome,
            reason: reason.clone(),
            round,
        });
        self.state.current_phase = BattlePhase::BattleOver;
        self.state.unit_actions.clear();
        self.state.log(LogEntryKind::BattleEnd { outcome, reason });
        if outcome != BattleOutcome::Aborted {
            self.fire_triggers(TriggerTiming::BattleEnd, &TriggerEvent::new(), 0);
        }
    }

    pub(super) fn is_alive(&self, id: UnitId) -> bool {
        self.state.unit(id).is_some_and(|unit| unit.is_alive())
    }
}
