//! Per-combatant state and its self-contained operations.
//!
//! Every HP/MP mutation clamps to the unit's maxima so the invariant
//! `0 <= current <= max` holds after any call, and `is_defeated` is derived
//! from `current_hp == 0` rather than stored.

use std::collections::BTreeMap;

use crate::error::InvariantViolation;
use crate::state::{
    EffectId, GridPosition, Side, SkillId, StatKind, StatusEffect, StatusEffectKind, StatusTick,
    TickOutcome, UnitId,
};

/// Base stats of a unit. Only the `current_*` fields change during a battle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitStats {
    pub current_hp: u32,
    pub max_hp: u32,
    pub attack: u32,
    pub defense: u32,
    pub speed: u32,
    pub current_mp: u32,
    pub max_mp: u32,
}

impl UnitStats {
    /// Stats at full HP and MP.
    pub const fn new(max_hp: u32, attack: u32, defense: u32, speed: u32, max_mp: u32) -> Self {
        Self {
            current_hp: max_hp,
            max_hp,
            attack,
            defense,
            speed,
            current_mp: max_mp,
            max_mp,
        }
    }

    #[must_use]
    pub const fn with_current_hp(mut self, current_hp: u32) -> Self {
        self.current_hp = current_hp;
        self
    }

    #[must_use]
    pub const fn with_current_mp(mut self, current_mp: u32) -> Self {
        self.current_mp = current_mp;
        self
    }

    const fn base(&self, stat: StatKind) -> u32 {
        match stat {
            StatKind::Attack => self.attack,
            StatKind::Defense => self.defense,
            StatKind::Speed => self.speed,
            StatKind::MaxHp => self.max_hp,
            StatKind::MaxMp => self.max_mp,
        }
    }
}

/// Result of [`Unit::take_damage`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DamageOutcome {
    pub damage_applied: u32,
    pub remaining_hp: u32,
    pub is_defeated: bool,
}

/// Result of [`Unit::heal`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HealOutcome {
    pub healing_applied: u32,
    pub current_hp: u32,
    pub is_full_health: bool,
}

/// Result of [`Unit::recover_mp`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct MpOutcome {
    pub recovered: u32,
    pub current_mp: u32,
    pub is_full: bool,
}

/// Inbound units are rebuilt through [`Unit::new`], so HP, MP and grid
/// bounds hold for deserialized values too.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(try_from = "UnitRecord"))]
pub struct Unit {
    pub id: UnitId,
    pub name: String,
    pub side: Side,
    stats: UnitStats,
    status_effects: BTreeMap<EffectId, StatusEffect>,
    pub grid_position: GridPosition,
    /// Active skills this unit may declare.
    pub skills: Vec<SkillId>,
    /// Passive skills registered for trigger matching.
    pub passives: Vec<SkillId>,
    /// Set by a stun tick, cleared at the next turn-start processing.
    stunned: bool,
}

impl Unit {
    pub fn new(
        id: UnitId,
        name: impl Into<String>,
        side: Side,
        stats: UnitStats,
        grid_position: GridPosition,
    ) -> Result<Self, InvariantViolation> {
        if stats.current_hp > stats.max_hp {
            return Err(InvariantViolation::ResourceOutOfRange {
                unit: id,
                resource: "hp",
                current: stats.current_hp,
                max: stats.max_hp,
            });
        }
        if stats.current_mp > stats.max_mp {
            return Err(InvariantViolation::ResourceOutOfRange {
                unit: id,
                resource: "mp",
                current: stats.current_mp,
                max: stats.max_mp,
            });
        }
        if !grid_position.is_in_bounds() {
            return Err(InvariantViolation::PositionOutOfBounds {
                row: grid_position.row,
                col: grid_position.col,
            });
        }

        Ok(Self {
            id,
            name: name.into(),
            side,
            stats,
            status_effects: BTreeMap::new(),
            grid_position,
            skills: Vec::new(),
            passives: Vec::new(),
            stunned: false,
        })
    }

    #[must_use]
    pub fn with_skill(mut self, skill: impl Into<SkillId>) -> Self {
        self.skills.push(skill.into());
        self
    }

    #[must_use]
    pub fn with_passive(mut self, passive: impl Into<SkillId>) -> Self {
        self.passives.push(passive.into());
        self
    }

    pub fn stats(&self) -> &UnitStats {
        &self.stats
    }

    pub fn is_defeated(&self) -> bool {
        self.stats.current_hp == 0
    }

    pub fn is_alive(&self) -> bool {
        !self.is_defeated()
    }

    pub fn is_stunned(&self) -> bool {
        self.stunned
    }

    pub fn hp_percent(&self) -> u32 {
        percent_of(self.stats.current_hp, self.stats.max_hp)
    }

    pub fn mp_percent(&self) -> u32 {
        percent_of(self.stats.current_mp, self.stats.max_mp)
    }

    /// Whether current HP is at most `percent` of max HP, without rounding.
    pub fn hp_at_most_percent(&self, percent: u32) -> bool {
        u64::from(self.stats.current_hp) * 100 <= u64::from(percent) * u64::from(self.stats.max_hp)
    }

    /// Whether current MP is at least `percent` of max MP, without rounding.
    /// A unit without an MP pool only meets a zero threshold.
    pub fn mp_at_least_percent(&self, percent: u32) -> bool {
        if self.stats.max_mp == 0 {
            return percent == 0;
        }
        u64::from(self.stats.current_mp) * 100 >= u64::from(percent) * u64::from(self.stats.max_mp)
    }

    pub fn knows_skill(&self, skill: &SkillId) -> bool {
        self.skills.contains(skill)
    }

    /// Applies damage clamped to the remaining HP.
    pub fn take_damage(&mut self, amount: u32) -> DamageOutcome {
        let applied = amount.min(self.stats.current_hp);
        self.stats.current_hp -= applied;
        DamageOutcome {
            damage_applied: applied,
            remaining_hp: self.stats.current_hp,
            is_defeated: self.is_defeated(),
        }
    }

    /// Restores HP clamped to the missing amount. Defeated units are not
    /// revived by healing.
    pub fn heal(&mut self, amount: u32) -> HealOutcome {
        let applied = if self.is_defeated() {
            0
        } else {
            amount.min(self.stats.max_hp.saturating_sub(self.stats.current_hp))
        };
        self.stats.current_hp += applied;
        HealOutcome {
            healing_applied: applied,
            current_hp: self.stats.current_hp,
            is_full_health: self.stats.current_hp == self.stats.max_hp,
        }
    }

    /// Spends MP. Returns false without mutating if the unit cannot afford it.
    pub fn consume_mp(&mut self, cost: u32) -> bool {
        if self.stats.current_mp < cost {
            return false;
        }
        self.stats.current_mp -= cost;
        true
    }

    pub fn recover_mp(&mut self, amount: u32) -> MpOutcome {
        let applied = amount.min(self.stats.max_mp.saturating_sub(self.stats.current_mp));
        self.stats.current_mp += applied;
        MpOutcome {
            recovered: applied,
            current_mp: self.stats.current_mp,
            is_full: self.stats.current_mp == self.stats.max_mp,
        }
    }

    /// Inserts an effect, replacing any previous effect with the same id.
    pub fn add_status_effect(&mut self, effect: StatusEffect) -> Option<StatusEffect> {
        self.status_effects.insert(effect.id.clone(), effect)
    }

    pub fn remove_status_effect(&mut self, id: &EffectId) -> Option<StatusEffect> {
        self.status_effects.remove(id)
    }

    pub fn status_effect(&self, id: &EffectId) -> Option<&StatusEffect> {
        self.status_effects.get(id)
    }

    pub fn active_status_effects(&self) -> impl Iterator<Item = &StatusEffect> {
        self.status_effects.values().filter(|effect| effect.is_active())
    }

    /// Runs every active effect's turn-start action, then decrements timed
    /// effects and purges the ones that reach zero.
    ///
    /// Effects are processed in id order so replays are deterministic.
    pub fn process_turn_start_effects(&mut self) -> Vec<StatusTick> {
        self.stunned = false;

        let ids: Vec<EffectId> = self
            .status_effects
            .iter()
            .filter(|(_, effect)| effect.is_active())
            .map(|(id, _)| id.clone())
            .collect();

        let mut ticks = Vec::with_capacity(ids.len());
        for id in ids {
            let Some(kind) = self.status_effects.get(&id).map(|effect| effect.kind) else {
                continue;
            };

            let outcome = match kind {
                StatusEffectKind::Poison { value } => TickOutcome::Damaged(self.take_damage(value)),
                StatusEffectKind::Regeneration { value } => TickOutcome::Healed(self.heal(value)),
                StatusEffectKind::Stun => {
                    self.stunned = true;
                    TickOutcome::Stunned
                }
                StatusEffectKind::StatModifier(_) => TickOutcome::Passive,
            };

            let Some(effect) = self.status_effects.get_mut(&id) else {
                continue;
            };
            let expired = effect.tick_down();
            let remaining_turns = (!effect.is_permanent()).then_some(effect.remaining_turns);
            let source = effect.source;
            if expired {
                self.status_effects.remove(&id);
            }

            ticks.push(StatusTick {
                effect_id: id,
                kind,
                outcome,
                remaining_turns,
                expired,
                source,
            });
        }
        ticks
    }

    /// Base stat plus all active modifiers, floored at zero.
    pub fn modified_attribute(&self, stat: StatKind) -> u32 {
        let base = self.stats.base(stat);
        let bonus: i64 = self
            .active_status_effects()
            .flat_map(|effect| effect.attribute_modifiers())
            .filter(|modifier| modifier.stat == stat)
            .map(|modifier| modifier.contribution(base))
            .sum();
        (i64::from(base) + bonus).clamp(0, i64::from(u32::MAX)) as u32
    }

    /// Field-wise update from a newer copy of the same unit, reusing this
    /// value's allocations. Returns true if anything changed.
    pub fn merge_from(&mut self, newer: &Unit) -> bool {
        if self == newer {
            return false;
        }
        self.name.clone_from(&newer.name);
        self.side = newer.side;
        self.stats = newer.stats;
        self.status_effects.clone_from(&newer.status_effects);
        self.grid_position = newer.grid_position;
        self.skills.clone_from(&newer.skills);
        self.passives.clone_from(&newer.passives);
        self.stunned = newer.stunned;
        true
    }
}

#[cfg(feature = "serde")]
#[derive(serde::Deserialize)]
struct UnitRecord {
    id: UnitId,
    name: String,
    side: Side,
    stats: UnitStats,
    status_effects: BTreeMap<EffectId, StatusEffect>,
    grid_position: GridPosition,
    skills: Vec<SkillId>,
    passives: Vec<SkillId>,
    stunned: bool,
}

#[cfg(feature = "serde")]
impl TryFrom<UnitRecord> for Unit {
    type Error = InvariantViolation;

    fn try_from(record: UnitRecord) -> Result<Self, Self::Error> {
        let mut unit = Unit::new(
            record.id,
            record.name,
            record.side,
            record.stats,
            record.grid_position,
        )?;
        unit.status_effects = record.status_effects;
        unit.skills = record.skills;
        unit.passives = record.passives;
        unit.stunned = record.stunned;
        Ok(unit)
    }
}

fn percent_of(current: u32, max: u32) -> u32 {
    if max == 0 {
        return 0;
    }
    (u64::from(current) * 100 / u64::from(max)) as u32
}
