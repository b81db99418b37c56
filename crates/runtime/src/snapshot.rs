//! Read-only battle snapshots streamed from the engine to the store.
use serde::{Deserialize, Serialize};

use battle_core::{
    BattleId, BattlePhase, BattleResult, BattleState, LogEntry, Unit, UnitAction, UnitId,
};

/// Full copy of the observable battle state at one point in time.
///
/// Snapshots are delivered at least once and may arrive more than once.
/// `sequence` increases by one for every snapshot a worker publishes, so a
/// receiver can drop anything it has already applied.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct BattleSnapshot {
    pub battle_id: BattleId,
    pub sequence: u64,
    pub phase: BattlePhase,
    pub round: u32,
    pub result: Option<BattleResult>,
    pub turn_order: Vec<UnitId>,
    pub current_turn_unit: Option<UnitId>,
    pub units: Vec<Unit>,
    pub unit_actions: Vec<(UnitId, UnitAction)>,
    /// Complete log. Receivers replace their copy wholesale.
    pub log: Vec<LogEntry>,
}

impl BattleSnapshot {
    pub fn capture(state: &BattleState, sequence: u64) -> Self {
        Self {
            battle_id: state.battle_id,
            sequence,
            phase: state.current_phase,
            round: state.current_round,
            result: state.result.clone(),
            turn_order: state.turn_order.to_vec(),
            current_turn_unit: state.current_turn_unit(),
            units: state.units.values().cloned().collect(),
            unit_actions: state
                .unit_actions
                .iter()
                .map(|(id, action)| (*id, action.clone()))
                .collect(),
            log: state.battle_log.entries().to_vec(),
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub fn is_terminal(&self) -> bool {
        self.result.is_some()
    }

    /// Serializes the snapshot for transports that carry text frames.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}
