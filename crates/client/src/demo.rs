//! Built-in skirmish used by the `battle` binary.

use async_trait::async_trait;

use battle_core::{
    AttributeModifier, BattleConfig, BattleId, BattleState, DamageType, EffectDuration,
    EffectTarget, GridPosition, PassiveEffect, PassiveSkill, Side, SkillCatalog,
    SkillDefinition, SkillEffect, SkillOracle, SkillTarget, StatKind, StatusEffect,
    TriggerConditions, TriggerTiming, Unit, UnitAction, UnitId, UnitStats,
};
use battle_runtime::{ActionProvider, FrontlineActionProvider, Result};

pub struct Skirmish {
    pub state: BattleState,
    pub catalog: SkillCatalog,
}

pub fn catalog() -> SkillCatalog {
    SkillCatalog::new()
        .with_skill(SkillDefinition::new(
            "fireball",
            "Fireball",
            12,
            SkillTarget::Enemy,
            SkillEffect::Damage { power_percent: 150 },
        ))
        .with_skill(
            SkillDefinition::new(
                "venom_strike",
                "Venom Strike",
                8,
                SkillTarget::Enemy,
                SkillEffect::ApplyStatus(StatusEffect::poison("venom", 6, 3)),
            )
            .with_damage_type(DamageType::Physical),
        )
        .with_skill(SkillDefinition::new(
            "mend",
            "Mend",
            10,
            SkillTarget::Ally,
            SkillEffect::Heal { amount: 35 },
        ))
        .with_passive(
            PassiveSkill::new(
                "riposte",
                "Riposte",
                TriggerTiming::AfterDamage,
                PassiveEffect::DealDamage { amount: 8 },
            )
            .with_probability(0.5)
            .with_range(1)
            .targeting(EffectTarget::Source),
        )
        .with_passive(
            PassiveSkill::new(
                "last_stand",
                "Last Stand",
                TriggerTiming::TurnStart,
                PassiveEffect::ApplyStatus(StatusEffect::stat_modifier(
                    "last_stand",
                    AttributeModifier::percent(StatKind::Attack, 50),
                    EffectDuration::Turns(2),
                )),
            )
            .with_conditions(TriggerConditions {
                hp_percent_below: Some(30),
                ..TriggerConditions::none()
            }),
        )
        .with_passive(PassiveSkill::new(
            "bounty",
            "Bounty",
            TriggerTiming::OnKill,
            PassiveEffect::RestoreMp { amount: 10 },
        ))
}

/// Three adventurers against a goblin pack.
pub fn skirmish(battle_id: BattleId, config: BattleConfig) -> anyhow::Result<Skirmish> {
    let cell = |row, col| GridPosition::new(row, col);

    let units = [
        Unit::new(
            UnitId(1),
            "Knight",
            Side::Player,
            UnitStats::new(140, 28, 18, 9, 0),
            cell(0, 1)?,
        )?
        .with_passive("riposte"),
        Unit::new(
            UnitId(2),
            "Mage",
            Side::Player,
            UnitStats::new(80, 34, 6, 12, 40),
            cell(1, 0)?,
        )?
        .with_skill("fireball")
        .with_passive("bounty"),
        Unit::new(
            UnitId(3),
            "Cleric",
            Side::Player,
            UnitStats::new(90, 14, 10, 8, 50),
            cell(1, 2)?,
        )?
        .with_skill("mend"),
        Unit::new(
            UnitId(11),
            "Goblin",
            Side::Enemy,
            UnitStats::new(70, 20, 8, 11, 0),
            cell(0, 0)?,
        )?,
        Unit::new(
            UnitId(12),
            "Goblin Shaman",
            Side::Enemy,
            UnitStats::new(60, 16, 6, 10, 30),
            cell(1, 1)?,
        )?
        .with_skill("venom_strike"),
        Unit::new(
            UnitId(13),
            "Goblin Chief",
            Side::Enemy,
            UnitStats::new(120, 26, 14, 7, 0),
            cell(0, 2)?,
        )?
        .with_passive("last_stand"),
    ];

    let state = BattleState::builder(battle_id)
        .config(config)
        .units(units)
        .build()?;

    Ok(Skirmish {
        state,
        catalog: catalog(),
    })
}

/// Casts the first known skill the unit can afford, otherwise falls back to
/// [`FrontlineActionProvider`].
pub struct SkirmishPlanner {
    catalog: SkillCatalog,
}

impl SkirmishPlanner {
    pub fn new(catalog: SkillCatalog) -> Self {
        Self { catalog }
    }

    fn pick_skill(&self, unit: UnitId, state: &BattleState) -> Option<UnitAction> {
        let caster = state.unit(unit)?;
        caster.skills.iter().find_map(|id| {
            let skill = self.catalog.skill(id)?;
            if skill.mp_cost > caster.stats().current_mp {
                return None;
            }
            let target = match skill.target {
                SkillTarget::Caster => caster.id,
                SkillTarget::Ally => state
                    .living_units(caster.side)
                    .filter(|ally| ally.stats().current_hp < ally.stats().max_hp)
                    .min_by_key(|ally| ally.hp_percent())?
                    .id,
                SkillTarget::Enemy => state.living_units(caster.side.opponent()).next()?.id,
            };
            Some(UnitAction::skill(id.clone(), vec![target]))
        })
    }
}

#[async_trait]
impl ActionProvider for SkirmishPlanner {
    async fn provide_action(&self, unit: UnitId, state: &BattleState) -> Result<UnitAction> {
        match self.pick_skill(unit, state) {
            Some(action) => Ok(action),
            None => FrontlineActionProvider.provide_action(unit, state).await,
        }
    }
}
