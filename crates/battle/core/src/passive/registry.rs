use std::collections::BTreeMap;

use tracing::warn;

use crate::env::SkillOracle;
use crate::passive::TriggerTiming;
use crate::state::{BattleState, SkillId, UnitId};

/// Passive skills of every unit in one battle, indexed by timing.
///
/// Rebuilt from the roster whenever a [`crate::engine::BattleEngine`] is
/// created over a state. Owners are kept in unit-id order.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PassiveTriggerRegistry {
    by_timing: BTreeMap<TriggerTiming, Vec<(UnitId, SkillId)>>,
}

impl PassiveTriggerRegistry {
    pub fn from_state(state: &BattleState, skills: &dyn SkillOracle) -> Self {
        let mut by_timing: BTreeMap<TriggerTiming, Vec<(UnitId, SkillId)>> = BTreeMap::new();
        for unit in state.units.values() {
            for passive_id in &unit.passives {
                match skills.passive(passive_id) {
                    Some(passive) => by_timing
                        .entry(passive.timing)
                        .or_default()
                        .push((unit.id, passive_id.clone())),
                    None => warn!(
                        target: "battle::passive",
                        unit = %unit.id,
                        passive = %passive_id,
                        "unknown passive skill ignored"
                    ),
                }
            }
        }
        Self { by_timing }
    }

    /// Registered `(owner, skill)` pairs for a timing.
    pub fn passives_for(&self, timing: TriggerTiming) -> &[(UnitId, SkillId)] {
        self.by_timing
            .get(&timing)
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.by_timing.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_timing.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SkillCatalog;
    use crate::passive::{PassiveEffect, PassiveSkill};
    use crate::state::{BattleId, GridPosition, Side, Unit, UnitStats};

    #[test]
    fn indexes_known_passives_by_timing() {
        let catalog = SkillCatalog::new().with_passive(PassiveSkill::new(
            "thorns",
            "Thorns",
            TriggerTiming::AfterDamage,
            PassiveEffect::DealDamage { amount: 3 },
        ));
        let unit = Unit::new(
            UnitId(1),
            "knight",
            Side::Player,
            UnitStats::new(10, 1, 1, 1, 0),
            GridPosition::default(),
        )
        .unwrap()
        .with_passive("thorns")
        .with_passive("missing");
        let state = BattleState::builder(BattleId(1)).unit(unit).build().unwrap();

        let registry = PassiveTriggerRegistry::from_state(&state, &catalog);
        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.passives_for(TriggerTiming::AfterDamage),
            &[(UnitId(1), SkillId::from("thorns"))]
        );
        assert!(registry.passives_for(TriggerTiming::OnKill).is_empty());
    }
}
