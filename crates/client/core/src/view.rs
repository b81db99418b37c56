//! What the battle screen should show right now.

use battle_core::{BattleId, BattlePhase, BattleResult};

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StoreView {
    /// No battle has been started.
    Inactive,
    /// The store owns the battle and accepts declarations.
    Preparing { battle_id: BattleId, round: u32 },
    /// Control was handed to the engine and no snapshot arrived yet. Units
    /// are hidden rather than rendered from stale pre-handoff data.
    AwaitingEngine { battle_id: BattleId },
    /// The engine is running and the store mirrors its snapshots.
    Live {
        battle_id: BattleId,
        round: u32,
        phase: BattlePhase,
    },
    /// The battle ended and control is back with the store.
    Finished {
        battle_id: BattleId,
        result: BattleResult,
    },
}

impl StoreView {
    pub fn battle_id(&self) -> Option<BattleId> {
        match self {
            Self::Inactive => None,
            Self::Preparing { battle_id, .. }
            | Self::AwaitingEngine { battle_id }
            | Self::Live { battle_id, .. }
            | Self::Finished { battle_id, .. } => Some(*battle_id),
        }
    }

    pub fn shows_units(&self) -> bool {
        !matches!(self, Self::Inactive | Self::AwaitingEngine { .. })
    }
}
