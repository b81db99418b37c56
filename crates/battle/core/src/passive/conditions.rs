use crate::env::DamageType;
use crate::passive::TriggerContext;
use crate::state::{ActionType, Side};

/// Optional guards on a passive skill. An absent field always passes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct TriggerConditions {
    /// Owner's HP percent must not exceed this value.
    pub hp_percent_below: Option<u32>,
    /// Owner's MP percent must be at least this value.
    pub mp_percent_above: Option<u32>,
    /// The event target must exist and fight for this side.
    pub target_type: Option<Side>,
    /// The event's action type (attack or skill) must match.
    pub action_type: Option<ActionType>,
    /// The event's damage category must match.
    pub damage_type: Option<DamageType>,
}

impl TriggerConditions {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn evaluate(&self, ctx: &TriggerContext<'_>) -> bool {
        if let Some(threshold) = self.hp_percent_below
            && !ctx.unit.hp_at_most_percent(threshold)
        {
            return false;
        }
        if let Some(threshold) = self.mp_percent_above
            && !ctx.unit.mp_at_least_percent(threshold)
        {
            return false;
        }
        if let Some(side) = self.target_type
            && ctx.target.is_none_or(|target| target.side != side)
        {
            return false;
        }
        if let Some(action_type) = self.action_type
            && ctx.action_type != Some(action_type)
        {
            return false;
        }
        if let Some(damage_type) = self.damage_type
            && ctx.damage_type != Some(damage_type)
        {
            return false;
        }
        true
    }
}
