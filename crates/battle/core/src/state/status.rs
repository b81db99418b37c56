//! Status effect system for units.
//!
//! Status effects are timed (or permanent) conditions that either act at the
//! owner's turn start (poison, regeneration, stun) or silently adjust derived
//! attributes through [`AttributeModifier`]s.
//!
//! # Turn-based Duration
//!
//! Effects store `remaining_turns`, decremented once per turn-start tick of
//! the owner. An effect is purged the tick its counter reaches zero;
//! [`EffectDuration::Permanent`] effects never expire on their own.

use crate::state::{DamageOutcome, EffectId, HealOutcome, UnitId};

/// Attribute a modifier can target.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatKind {
    Attack,
    Defense,
    Speed,
    MaxHp,
    MaxMp,
}

/// How a modifier combines with the base stat.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ModifierOp {
    /// Adds `value` directly.
    Flat,
    /// Adds `value` percent of the *base* stat (never of the modified value).
    PercentOfBase,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AttributeModifier {
    pub stat: StatKind,
    pub op: ModifierOp,
    pub value: i32,
}

impl AttributeModifier {
    pub const fn flat(stat: StatKind, value: i32) -> Self {
        Self {
            stat,
            op: ModifierOp::Flat,
            value,
        }
    }

    pub const fn percent(stat: StatKind, value: i32) -> Self {
        Self {
            stat,
            op: ModifierOp::PercentOfBase,
            value,
        }
    }

    /// Signed contribution of this modifier for the given base value.
    pub fn contribution(&self, base: u32) -> i64 {
        match self.op {
            ModifierOp::Flat => i64::from(self.value),
            ModifierOp::PercentOfBase => i64::from(base) * i64::from(self.value) / 100,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum EffectDuration {
    /// Expires after this many turn-start ticks.
    Turns(u32),
    /// Never expires on its own.
    Permanent,
}

/// Kind-specific payload of a status effect.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum StatusEffectKind {
    /// Deals `value` damage at each turn start.
    Poison { value: u32 },

    /// Restores `value` HP at each turn start.
    Regeneration { value: u32 },

    /// Prevents the owner from acting for the round it ticks in.
    Stun,

    /// No turn-start action. Only feeds modified attributes.
    StatModifier(AttributeModifier),
}

impl StatusEffectKind {
    pub const fn label(&self) -> &'static str {
        match self {
            Self::Poison { .. } => "poison",
            Self::Regeneration { .. } => "regeneration",
            Self::Stun => "stun",
            Self::StatModifier(_) => "stat_modifier",
        }
    }
}

/// A single status effect instance attached to a unit.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusEffect {
    pub id: EffectId,
    pub kind: StatusEffectKind,
    pub duration: EffectDuration,
    /// Ticks left before expiry. Ignored for permanent effects.
    pub remaining_turns: u32,
    /// Extra modifiers carried alongside the kind (e.g. a poison that also
    /// weakens attack).
    pub modifiers: Vec<AttributeModifier>,
    /// Unit that applied the effect, credited for kills it causes.
    pub source: Option<UnitId>,
}

impl StatusEffect {
    pub fn new(id: impl Into<EffectId>, kind: StatusEffectKind, duration: EffectDuration) -> Self {
        let remaining_turns = match duration {
            EffectDuration::Turns(turns) => turns,
            EffectDuration::Permanent => 0,
        };
        Self {
            id: id.into(),
            kind,
            duration,
            remaining_turns,
            modifiers: Vec::new(),
            source: None,
        }
    }

    pub fn poison(id: impl Into<EffectId>, value: u32, turns: u32) -> Self {
        Self::new(id, StatusEffectKind::Poison { value }, EffectDuration::Turns(turns))
    }

    pub fn regeneration(id: impl Into<EffectId>, value: u32, turns: u32) -> Self {
        Self::new(
            id,
            StatusEffectKind::Regeneration { value },
            EffectDuration::Turns(turns),
        )
    }

    pub fn stun(id: impl Into<EffectId>, turns: u32) -> Self {
        Self::new(id, StatusEffectKind::Stun, EffectDuration::Turns(turns))
    }

    pub fn stat_modifier(
        id: impl Into<EffectId>,
        modifier: AttributeModifier,
        duration: EffectDuration,
    ) -> Self {
        Self::new(id, StatusEffectKind::StatModifier(modifier), duration)
    }

    #[must_use]
    pub fn with_source(mut self, source: UnitId) -> Self {
        self.source = Some(source);
        self
    }

    #[must_use]
    pub fn with_modifier(mut self, modifier: AttributeModifier) -> Self {
        self.modifiers.push(modifier);
        self
    }

    pub const fn is_permanent(&self) -> bool {
        matches!(self.duration, EffectDuration::Permanent)
    }

    /// Active while turns remain, or forever if permanent.
    pub const fn is_active(&self) -> bool {
        self.is_permanent() || self.remaining_turns > 0
    }

    /// Headline number of the effect (tick damage, tick heal, or modifier
    /// value). Zero for stun.
    pub fn magnitude(&self) -> i64 {
        match self.kind {
            StatusEffectKind::Poison { value } | StatusEffectKind::Regeneration { value } => {
                i64::from(value)
            }
            StatusEffectKind::Stun => 0,
            StatusEffectKind::StatModifier(modifier) => i64::from(modifier.value),
        }
    }

    /// All attribute modifiers this effect contributes.
    pub fn attribute_modifiers(&self) -> impl Iterator<Item = &AttributeModifier> {
        let own = match &self.kind {
            StatusEffectKind::StatModifier(modifier) => Some(modifier),
            _ => None,
        };
        own.into_iter().chain(self.modifiers.iter())
    }

    /// Decrements the counter of a timed effect. Returns true if it expired.
    pub(crate) fn tick_down(&mut self) -> bool {
        if self.is_permanent() {
            return false;
        }
        self.remaining_turns = self.remaining_turns.saturating_sub(1);
        self.remaining_turns == 0
    }
}

/// What one effect did during a turn-start tick.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TickOutcome {
    Damaged(DamageOutcome),
    Healed(HealOutcome),
    Stunned,
    /// Modifier-only effect, nothing happened at tick time.
    Passive,
}

/// Per-effect result of [`crate::state::Unit::process_turn_start_effects`].
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct StatusTick {
    pub effect_id: EffectId,
    pub kind: StatusEffectKind,
    pub outcome: TickOutcome,
    /// `None` for permanent effects.
    pub remaining_turns: Option<u32>,
    pub expired: bool,
    pub source: Option<UnitId>,
}
