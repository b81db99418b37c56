//! Rewards attached to the terminal result.
//!
//! The engine computes rewards once, when the battle ends, so the store can
//! apply them together with the final unit states.
use battle_core::{BattleOutcome, BattleResult, BattleState, Side};
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RewardPayload {
    pub experience: u32,
    pub gold: u32,
    pub items: Vec<String>,
}

impl RewardPayload {
    pub fn is_empty(&self) -> bool {
        self.experience == 0 && self.gold == 0 && self.items.is_empty()
    }
}

pub trait RewardOracle: Send + Sync {
    fn compute(&self, result: &BattleResult, state: &BattleState) -> RewardPayload;
}

/// Grants nothing.
pub struct NoRewards;

impl RewardOracle for NoRewards {
    fn compute(&self, _result: &BattleResult, _state: &BattleState) -> RewardPayload {
        RewardPayload::default()
    }
}

/// Flat experience and gold per defeated enemy, paid on victory only.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PerEnemyRewards {
    pub experience: u32,
    pub gold: u32,
}

impl RewardOracle for PerEnemyRewards {
    fn compute(&self, result: &BattleResult, state: &BattleState) -> RewardPayload {
        if result.outcome != BattleOutcome::Victory {
            return RewardPayload::default();
        }
        let defeated = state
            .units
            .values()
            .filter(|unit| unit.side == Side::Enemy && unit.is_defeated())
            .count() as u32;
        RewardPayload {
            experience: self.experience.saturating_mul(defeated),
            gold: self.gold.saturating_mul(defeated),
            items: Vec::new(),
        }
    }
}
