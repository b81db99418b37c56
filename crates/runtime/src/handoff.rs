//! Messages that move battle authority between the store and the engine.
use serde::{Deserialize, Serialize};

use battle_core::{BattleId, BattleResult, BattleState, Unit};

use crate::api::RewardPayload;
use crate::snapshot::BattleSnapshot;

/// Store to engine: the battle state, transferred by value.
///
/// After sending a handoff the store no longer mutates its copy; the engine
/// worker is the only writer until it answers with a [`BattleCompletion`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EngineHandoff {
    pub battle_id: BattleId,
    pub state: BattleState,
}

impl EngineHandoff {
    pub fn new(state: BattleState) -> Self {
        Self {
            battle_id: state.battle_id,
            state,
        }
    }
}

/// Engine to store: the terminal message of a battle. Sent exactly once.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BattleCompletion {
    pub battle_id: BattleId,
    pub result: BattleResult,
    pub rewards: RewardPayload,
    pub final_snapshot: BattleSnapshot,
}

impl BattleCompletion {
    /// Final unit states, used to sync HP/MP back into the party.
    pub fn final_units(&self) -> &[Unit] {
        &self.final_snapshot.units
    }
}
