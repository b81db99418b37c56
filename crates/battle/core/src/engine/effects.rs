//! Passive trigger dispatch.

use tracing::{debug, trace};

use crate::env::{SeededRolls, roll_context};
use crate::passive::{
    EffectTarget, PassiveEffect, PassiveSkill, TriggerEvent, TriggerScope, TriggerTiming,
    can_trigger_passive_skill, create_trigger_context,
};
use crate::state::{LogEntryKind, UnitId};

use super::BattleEngine;

impl<'a> BattleEngine<'a> {
    /// Fires every registered passive for `timing` whose owner is in scope
    /// and whose checks pass.
    ///
    /// Passive effects can themselves cause damage and deaths, which fire
    /// further timings one level deeper. Chains stop at the configured
    /// maximum depth.
    pub(super) fn fire_triggers(&mut self, timing: TriggerTiming, event: &TriggerEvent, depth: u8) {
        if depth >= self.state.config.max_trigger_depth {
            debug!(
                target: "battle::passive",
                timing = %timing,
                depth,
                "trigger chain depth limit reached"
            );
            return;
        }

        let candidates: Vec<(UnitId, _)> = self
            .registry
            .passives_for(timing)
            .iter()
            .filter(|(owner, _)| match timing.scope() {
                TriggerScope::Actor => event.source == Some(*owner),
                TriggerScope::Target => event.target == Some(*owner),
                TriggerScope::Everyone => true,
            })
            .cloned()
            .collect();

        let env = self.env;
        for (owner, skill_id) in candidates {
            if self.state.is_over() && timing != TriggerTiming::BattleEnd {
                return;
            }
            let Some(skill) = env.skills.passive(&skill_id) else {
                continue;
            };
            let Some(unit) = self.state.units.get(&owner) else {
                continue;
            };
            if unit.is_defeated() && !timing.fires_for_defeated() {
                continue;
            }

            let ctx = create_trigger_context(unit, event, &self.state.units);
            let mut rolls =
                SeededRolls::new(env.rng, &mut self.state.rng, owner, roll_context::TRIGGER);
            if !can_trigger_passive_skill(skill, &ctx, &mut rolls) {
                trace!(
                    target: "battle::passive",
                    unit = %owner,
                    skill = %skill.id,
                    timing = %timing,
                    "passive checks failed"
                );
                continue;
            }

            debug!(
                target: "battle::passive",
                unit = %owner,
                skill = %skill.id,
                timing = %timing,
                depth,
                "passive triggered"
            );
            self.state.log(LogEntryKind::PassiveTriggered {
                unit: owner,
                skill: skill.id.clone(),
                timing,
            });
            self.apply_passive_effect(owner, skill, event, depth + 1);
        }
    }

    fn apply_passive_effect(
        &mut self,
        owner: UnitId,
        skill: &PassiveSkill,
        event: &TriggerEvent,
        depth: u8,
    ) {
        let recipient = match skill.target {
            EffectTarget::Owner => Some(owner),
            EffectTarget::Source => event.source,
            EffectTarget::Target => event.target,
        };
        let Some(recipient) = recipient.filter(|id| self.is_alive(*id)) else {
            return;
        };

        match &skill.effect {
            PassiveEffect::DealDamage { amount } => {
                let Some(unit) = self.state.unit_mut(recipient) else {
                    return;
                };
                let outcome = unit.take_damage(*amount);
                self.state.log(LogEntryKind::Attack {
                    attacker: owner,
                    target: recipient,
                    damage: outcome.damage_applied,
                    remaining_hp: outcome.remaining_hp,
                    is_critical: false,
                    skill: Some(skill.id.clone()),
                });

                let mut hit = TriggerEvent::between(owner, recipient);
                hit.damage = Some(outcome.damage_applied);
                hit.skill_id = Some(skill.id.clone());
                self.fire_triggers(TriggerTiming::OnAnyDamage, &hit, depth);
                self.fire_triggers(TriggerTiming::AfterDamage, &hit, depth);

                if outcome.is_defeated && outcome.damage_applied > 0 {
                    self.handle_defeat(recipient, Some(owner), depth);
                }
            }
            PassiveEffect::Heal { amount } => {
                if let Some(unit) = self.state.unit_mut(recipient) {
                    let outcome = unit.heal(*amount);
                    self.state.log(LogEntryKind::Healed {
                        unit: recipient,
                        amount: outcome.healing_applied,
                        current_hp: outcome.current_hp,
                    });
                }
            }
            PassiveEffect::RestoreMp { amount } => {
                if let Some(unit) = self.state.unit_mut(recipient) {
                    let outcome = unit.recover_mp(*amount);
                    self.state.log(LogEntryKind::MpRestored {
                        unit: recipient,
                        amount: outcome.recovered,
                        current_mp: outcome.current_mp,
                    });
                }
            }
            PassiveEffect::ApplyStatus(effect) => {
                self.apply_status(recipient, effect.clone().with_source(owner));
            }
        }
    }
}
