//! Conditional passive skills keyed by battle events.
//!
//! A passive is registered under one [`TriggerTiming`]. When the pipeline
//! reaches that timing it builds a [`TriggerContext`] per candidate owner and
//! asks [`can_trigger_passive_skill`] whether the skill fires. All checks are
//! ANDed; an absent check passes.
mod conditions;
mod context;
mod registry;
mod timing;

pub use crate::env::RollSource;
pub use conditions::TriggerConditions;
pub use context::{TriggerContext, TriggerEvent, create_trigger_context};
pub use registry::PassiveTriggerRegistry;
pub use timing::{TriggerScope, TriggerTiming};

use crate::state::{SkillId, StatusEffect};

/// Which unit a passive effect lands on, relative to the firing event.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectTarget {
    /// The passive's owner.
    #[default]
    Owner,
    /// The event source (usually the attacker).
    Source,
    /// The event target.
    Target,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum PassiveEffect {
    DealDamage { amount: u32 },
    Heal { amount: u32 },
    RestoreMp { amount: u32 },
    ApplyStatus(StatusEffect),
}

#[derive(Clone, Debug, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PassiveSkill {
    pub id: SkillId,
    pub name: String,
    pub timing: TriggerTiming,
    /// Chance in `[0, 1]`. `None` always passes.
    pub probability: Option<f64>,
    /// Maximum lane distance between event source and target.
    pub range: Option<u32>,
    pub conditions: TriggerConditions,
    pub effect: PassiveEffect,
    pub target: EffectTarget,
}

impl PassiveSkill {
    pub fn new(
        id: impl Into<SkillId>,
        name: impl Into<String>,
        timing: TriggerTiming,
        effect: PassiveEffect,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            timing,
            probability: None,
            range: None,
            conditions: TriggerConditions::default(),
            effect,
            target: EffectTarget::Owner,
        }
    }

    #[must_use]
    pub fn with_probability(mut self, probability: f64) -> Self {
        self.probability = Some(probability);
        self
    }

    #[must_use]
    pub fn with_range(mut self, range: u32) -> Self {
        self.range = Some(range);
        self
    }

    #[must_use]
    pub fn with_conditions(mut self, conditions: TriggerConditions) -> Self {
        self.conditions = conditions;
        self
    }

    #[must_use]
    pub fn targeting(mut self, target: EffectTarget) -> Self {
        self.target = target;
        self
    }
}

/// Decides whether `skill` fires for the given context.
///
/// Checks run in order: probability, lane range, conditions. The probability
/// draw fails when it is not strictly below the skill's chance, so a chance
/// of 0 never fires and a chance of 1 always does.
pub fn can_trigger_passive_skill(
    skill: &PassiveSkill,
    ctx: &TriggerContext<'_>,
    rolls: &mut dyn RollSource,
) -> bool {
    if let Some(probability) = skill.probability
        && rolls.roll_unit() >= probability
    {
        return false;
    }

    if let Some(range) = skill.range
        && let Some(target) = ctx.target
    {
        let source = ctx.source.unwrap_or(ctx.unit);
        if source.grid_position.lane_distance(&target.grid_position) > range {
            return false;
        }
    }

    skill.conditions.evaluate(ctx)
}
