//! Shared ownership of the read-only battle oracles.
//!
//! The engine borrows its oracles through [`battle_core::BattleEnv`]; the
//! worker task outlives any borrow the caller could hand it, so the runtime
//! keeps them behind `Arc` and lends them out per step.
use std::sync::Arc;

use battle_core::{
    BattleEnv, DamageOracle, PcgRng, RngOracle, SkillCatalog, SkillOracle, StandardDamageTable,
};

#[derive(Clone)]
pub struct OracleBundle {
    pub damage: Arc<dyn DamageOracle>,
    pub skills: Arc<dyn SkillOracle>,
    pub rng: Arc<dyn RngOracle>,
}

impl OracleBundle {
    pub fn new(
        damage: Arc<dyn DamageOracle>,
        skills: Arc<dyn SkillOracle>,
        rng: Arc<dyn RngOracle>,
    ) -> Self {
        Self {
            damage,
            skills,
            rng,
        }
    }

    /// Standard damage table and PCG rolls over the given skill catalog.
    pub fn standard(catalog: SkillCatalog) -> Self {
        Self::new(
            Arc::new(StandardDamageTable::default()),
            Arc::new(catalog),
            Arc::new(PcgRng),
        )
    }

    pub fn as_env(&self) -> BattleEnv<'_> {
        BattleEnv::new(
            self.damage.as_ref(),
            self.skills.as_ref(),
            self.rng.as_ref(),
        )
    }
}

impl Default for OracleBundle {
    fn default() -> Self {
        Self::standard(SkillCatalog::new())
    }
}

impl std::fmt::Debug for OracleBundle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OracleBundle").finish_non_exhaustive()
    }
}
