//! Traits describing read-only battle data.
//!
//! Oracles expose the damage formula, the skill catalog, and the random
//! source. The [`BattleEnv`] aggregate bundles them so the engine can reach
//! everything it needs without coupling to concrete implementations.
mod damage;
mod rng;
mod skills;

pub use damage::{DamageInput, DamageOracle, DamageRoll, DamageType, StandardDamageTable};
pub use rng::{
    PcgRng, RngOracle, RollSource, ScriptedRolls, SeededRolls, compute_seed, roll_context,
};
pub use skills::{SkillCatalog, SkillDefinition, SkillEffect, SkillOracle, SkillTarget};

/// Aggregates the read-only oracles required by the action pipeline.
#[derive(Clone, Copy)]
pub struct BattleEnv<'a> {
    pub damage: &'a dyn DamageOracle,
    pub skills: &'a dyn SkillOracle,
    pub rng: &'a dyn RngOracle,
}

impl<'a> BattleEnv<'a> {
    pub fn new(
        damage: &'a dyn DamageOracle,
        skills: &'a dyn SkillOracle,
        rng: &'a dyn RngOracle,
    ) -> Self {
        Self {
            damage,
            skills,
            rng,
        }
    }
}

impl core::fmt::Debug for BattleEnv<'_> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("BattleEnv").finish_non_exhaustive()
    }
}
