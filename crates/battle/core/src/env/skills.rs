//! Skill catalog oracle.

use std::collections::BTreeMap;

use crate::env::DamageType;
use crate::passive::PassiveSkill;
use crate::state::{SkillId, StatusEffect};

/// Who an active skill is aimed at.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkillTarget {
    Enemy,
    Ally,
    Caster,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkillEffect {
    /// Attack scaled by `power_percent` of the caster's attack.
    Damage { power_percent: u32 },
    Heal { amount: u32 },
    ApplyStatus(StatusEffect),
    RestoreMp { amount: u32 },
}

impl SkillEffect {
    pub const fn is_damaging(&self) -> bool {
        matches!(self, Self::Damage { .. })
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SkillDefinition {
    pub id: SkillId,
    pub name: String,
    pub mp_cost: u32,
    pub damage_type: DamageType,
    pub target: SkillTarget,
    pub effect: SkillEffect,
}

impl SkillDefinition {
    pub fn new(
        id: impl Into<SkillId>,
        name: impl Into<String>,
        mp_cost: u32,
        target: SkillTarget,
        effect: SkillEffect,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            mp_cost,
            damage_type: DamageType::Magical,
            target,
            effect,
        }
    }

    #[must_use]
    pub fn with_damage_type(mut self, damage_type: DamageType) -> Self {
        self.damage_type = damage_type;
        self
    }
}

/// Read-only access to active and passive skill definitions.
pub trait SkillOracle: Send + Sync {
    fn skill(&self, id: &SkillId) -> Option<&SkillDefinition>;
    fn passive(&self, id: &SkillId) -> Option<&PassiveSkill>;
}

/// In-memory skill catalog.
#[derive(Clone, Debug, Default)]
pub struct SkillCatalog {
    skills: BTreeMap<SkillId, SkillDefinition>,
    passives: BTreeMap<SkillId, PassiveSkill>,
}

impl SkillCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_skill(mut self, skill: SkillDefinition) -> Self {
        self.insert_skill(skill);
        self
    }

    #[must_use]
    pub fn with_passive(mut self, passive: PassiveSkill) -> Self {
        self.insert_passive(passive);
        self
    }

    pub fn insert_skill(&mut self, skill: SkillDefinition) {
        self.skills.insert(skill.id.clone(), skill);
    }

    pub fn insert_passive(&mut self, passive: PassiveSkill) {
        self.passives.insert(passive.id.clone(), passive);
    }
}

impl SkillOracle for SkillCatalog {
    fn skill(&self, id: &SkillId) -> Option<&SkillDefinition> {
        self.skills.get(id)
    }

    fn passive(&self, id: &SkillId) -> Option<&PassiveSkill> {
        self.passives.get(id)
    }
}
