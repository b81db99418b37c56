//! Damage formula oracle.
//!
//! The exact numbers are owned by the content layer. The engine only hands
//! over modified attack/defense plus pre-drawn crit and dodge rolls, so the
//! formula itself stays pure.

#[derive(
    Clone,
    Copy,
    Debug,
    Default,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum DamageType {
    #[default]
    Physical,
    Magical,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DamageInput {
    /// Attacker's modified attack.
    pub attack: u32,
    /// Defender's modified defense.
    pub defense: u32,
    /// Scaling applied to attack (100 for a normal attack).
    pub power_percent: u32,
    pub damage_type: DamageType,
    /// Uniform `[0, 1)` draw for the critical check.
    pub crit_roll: f64,
    /// Uniform `[0, 1)` draw for the dodge check.
    pub dodge_roll: f64,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DamageRoll {
    pub amount: u32,
    pub is_critical: bool,
    pub is_dodged: bool,
}

pub trait DamageOracle: Send + Sync {
    fn compute(&self, input: &DamageInput) -> DamageRoll;
}

/// Subtractive formula: `max(1, attack * power% - defense)`, with optional
/// crit multiplier and dodge chance. Both chances default to zero.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct StandardDamageTable {
    pub crit_chance: f64,
    pub crit_multiplier_percent: u32,
    pub dodge_chance: f64,
}

impl StandardDamageTable {
    pub const DEFAULT_CRIT_MULTIPLIER_PERCENT: u32 = 150;

    pub const fn new() -> Self {
        Self {
            crit_chance: 0.0,
            crit_multiplier_percent: Self::DEFAULT_CRIT_MULTIPLIER_PERCENT,
            dodge_chance: 0.0,
        }
    }

    #[must_use]
    pub const fn with_crit_chance(mut self, chance: f64) -> Self {
        self.crit_chance = chance;
        self
    }

    #[must_use]
    pub const fn with_dodge_chance(mut self, chance: f64) -> Self {
        self.dodge_chance = chance;
        self
    }
}

impl Default for StandardDamageTable {
    fn default() -> Self {
        Self::new()
    }
}

impl DamageOracle for StandardDamageTable {
    fn compute(&self, input: &DamageInput) -> DamageRoll {
        if input.dodge_roll < self.dodge_chance {
            return DamageRoll {
                amount: 0,
                is_critical: false,
                is_dodged: true,
            };
        }

        let scaled = u64::from(input.attack) * u64::from(input.power_percent) / 100;
        let base = scaled.saturating_sub(u64::from(input.defense)).max(1);
        let is_critical = input.crit_roll < self.crit_chance;
        let amount = if is_critical {
            base * u64::from(self.crit_multiplier_percent) / 100
        } else {
            base
        };

        DamageRoll {
            amount: amount.min(u64::from(u32::MAX)) as u32,
            is_critical,
            is_dodged: false,
        }
    }
}
