//! Event payloads published by the battle worker.

use battle_core::{BattleId, BattleOutcome, SkipReason, UnitId};
use serde::{Deserialize, Serialize};

/// Lightweight per-turn notices.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum TurnEvent {
    /// The engine took over a battle.
    EngineStarted { battle_id: BattleId, round: u32 },

    /// One turn slot was resolved.
    TurnResolved {
        battle_id: BattleId,
        round: u32,
        unit: UnitId,
        /// `None` if the unit acted.
        skipped: Option<SkipReason>,
    },

    /// Every slot of a round was resolved.
    RoundCompleted { battle_id: BattleId, round: u32 },

    /// The battle reached a terminal state.
    BattleFinished {
        battle_id: BattleId,
        outcome: BattleOutcome,
    },
}

impl TurnEvent {
    pub fn battle_id(&self) -> BattleId {
        match self {
            Self::EngineStarted { battle_id, .. }
            | Self::TurnResolved { battle_id, .. }
            | Self::RoundCompleted { battle_id, .. }
            | Self::BattleFinished { battle_id, .. } => *battle_id,
        }
    }
}
