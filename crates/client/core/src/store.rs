//! Reactive battle store.
//!
//! The store is the single writer of a battle while it is being prepared.
//! Handing the battle to the engine moves the [`BattleState`] out of the
//! store and clears every store-held copy of units, formations, turn order
//! and declarations, so nothing stale can be rendered. From then on the store
//! only mirrors engine snapshots until the terminal result brings control
//! back.

use std::collections::BTreeMap;
use std::fmt;

use tracing::{error, info, warn};

use battle_core::{
    BattleEngine, BattleId, BattleLog, BattlePhase, BattleResult, BattleState, ControlMode,
    DeclaredAction, Formations, GridPosition, LogEntryKind, PhaseError, ProtocolError, Unit,
    UnitAction, UnitId, ValidationError,
};
use battle_runtime::{
    BattleCompletion, BattleSnapshot, EngineHandoff, OracleBundle, RewardPayload,
};

use crate::error::StoreError;
use crate::scope::UpdateScope;
use crate::view::StoreView;

/// Phase marker as the store reports it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StorePhase {
    Battle(BattlePhase),
    /// Control was handed to the engine and no snapshot has arrived yet.
    EngineControlled,
}

impl StorePhase {
    pub fn battle_phase(&self) -> Option<BattlePhase> {
        match self {
            Self::Battle(phase) => Some(*phase),
            Self::EngineControlled => None,
        }
    }

    pub fn is_engine_controlled(&self) -> bool {
        matches!(self, Self::EngineControlled)
    }
}

impl Default for StorePhase {
    fn default() -> Self {
        Self::Battle(BattlePhase::Idle)
    }
}

impl fmt::Display for StorePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Battle(phase) => write!(f, "{phase}"),
            Self::EngineControlled => f.write_str("engine_controlled"),
        }
    }
}

/// How a cancel request must be carried out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CancelRequest {
    /// The store owned the battle and aborted it itself.
    Completed {
        result: BattleResult,
        scope: UpdateScope,
    },
    /// The engine owns the battle. Send the reason to the engine and wait for
    /// its terminal result; the store state is left untouched.
    ForwardToEngine { battle_id: BattleId, reason: String },
}

pub struct BattleStore {
    oracles: OracleBundle,
    control_mode: ControlMode,
    is_active: bool,
    battle_id: Option<BattleId>,
    /// Authoritative state. Present only while the store holds control.
    state: Option<BattleState>,

    // Engine mirror, filled from snapshots after a handoff.
    phase: StorePhase,
    round: u32,
    units: BTreeMap<UnitId, Unit>,
    formations: Formations,
    turn_order: Vec<UnitId>,
    current_turn_unit: Option<UnitId>,
    unit_actions: BTreeMap<UnitId, UnitAction>,
    log: BattleLog,
    last_sequence: Option<u64>,

    result: Option<BattleResult>,
    /// Set only by the terminal message.
    rewards: Option<RewardPayload>,
    final_units: Vec<Unit>,
}

impl BattleStore {
    pub fn new(oracles: OracleBundle) -> Self {
        Self {
            oracles,
            control_mode: ControlMode::Store,
            is_active: false,
            battle_id: None,
            state: None,
            phase: StorePhase::default(),
            round: 0,
            units: BTreeMap::new(),
            formations: Formations::default(),
            turn_order: Vec::new(),
            current_turn_unit: None,
            unit_actions: BTreeMap::new(),
            log: BattleLog::new(),
            last_sequence: None,
            result: None,
            rewards: None,
            final_units: Vec::new(),
        }
    }

    // ===== queries =====

    pub fn control_mode(&self) -> ControlMode {
        self.control_mode
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn battle_id(&self) -> Option<BattleId> {
        self.battle_id
    }

    pub fn current_phase(&self) -> StorePhase {
        match &self.state {
            Some(state) => StorePhase::Battle(state.current_phase),
            None => self.phase,
        }
    }

    pub fn round(&self) -> u32 {
        self.state
            .as_ref()
            .map_or(self.round, |state| state.current_round)
    }

    pub fn units(&self) -> &BTreeMap<UnitId, Unit> {
        match &self.state {
            Some(state) => &state.units,
            None => &self.units,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units().get(&id)
    }

    /// Formation grid. Empty while the engine holds control.
    pub fn formations(&self) -> &Formations {
        match &self.state {
            Some(state) => &state.formations,
            None => &self.formations,
        }
    }

    pub fn turn_order(&self) -> &[UnitId] {
        match &self.state {
            Some(state) => state.turn_order.as_slice(),
            None => &self.turn_order,
        }
    }

    pub fn current_turn_unit(&self) -> Option<UnitId> {
        match &self.state {
            Some(state) => state.current_turn_unit(),
            None => self.current_turn_unit,
        }
    }

    pub fn unit_actions(&self) -> &BTreeMap<UnitId, UnitAction> {
        match &self.state {
            Some(state) => &state.unit_actions,
            None => &self.unit_actions,
        }
    }

    /// Living units still waiting for a declaration.
    pub fn pending_units(&self) -> Vec<UnitId> {
        self.state
            .as_ref()
            .map(BattleState::pending_units)
            .unwrap_or_default()
    }

    pub fn log(&self) -> &BattleLog {
        match &self.state {
            Some(state) => &state.battle_log,
            None => &self.log,
        }
    }

    pub fn result(&self) -> Option<&BattleResult> {
        self.result.as_ref()
    }

    pub fn rewards(&self) -> Option<&RewardPayload> {
        self.rewards.as_ref()
    }

    /// Unit states at the end of the last finished battle, for persisting
    /// HP and MP back into the party.
    pub fn final_units(&self) -> &[Unit] {
        &self.final_units
    }

    pub fn last_sequence(&self) -> Option<u64> {
        self.last_sequence
    }

    pub fn state(&self) -> Option<&BattleState> {
        self.state.as_ref()
    }

    pub fn view(&self) -> StoreView {
        let Some(battle_id) = self.battle_id else {
            return StoreView::Inactive;
        };

        match self.control_mode {
            ControlMode::Engine if self.last_sequence.is_none() => {
                StoreView::AwaitingEngine { battle_id }
            }
            ControlMode::Engine => StoreView::Live {
                battle_id,
                round: self.round,
                phase: self
                    .phase
                    .battle_phase()
                    .unwrap_or(BattlePhase::Execution),
            },
            ControlMode::Store => match &self.result {
                Some(result) if !self.is_active => StoreView::Finished {
                    battle_id,
                    result: result.clone(),
                },
                _ => StoreView::Preparing {
                    battle_id,
                    round: self.round(),
                },
            },
        }
    }

    // ===== store-authority operations =====

    /// Takes ownership of a freshly built battle and opens its first round.
    pub fn start_battle(&mut self, mut state: BattleState) -> Result<UpdateScope, StoreError> {
        if self.control_mode == ControlMode::Engine {
            return Err(self.engine_owns("start_battle").into());
        }
        if self.is_active
            && let Some(battle_id) = self.battle_id
        {
            return Err(ProtocolError::BattleInProgress { battle_id }.into());
        }

        BattleEngine::new(&mut state, self.oracles.as_env()).start()?;

        self.reset_mirror();
        self.result = None;
        self.rewards = None;
        self.final_units.clear();
        self.battle_id = Some(state.battle_id);
        self.is_active = true;

        info!(
            target: "client::store",
            battle_id = %state.battle_id,
            units = state.units.len(),
            "battle started in store"
        );

        if let Some(result) = state.result.clone() {
            // Nothing to fight; the battle ended while opening.
            self.final_units = state.units.values().cloned().collect();
            self.result = Some(result);
            self.is_active = false;
        }
        self.state = Some(state);
        Ok(UpdateScope::ALL)
    }

    /// Moves a unit to another cell of its own formation.
    pub fn place_unit(&mut self, unit: UnitId, to: GridPosition) -> Result<UpdateScope, StoreError> {
        self.guard_store_authority("place_unit")?;
        let Some(state) = self.state.as_mut() else {
            return Err(ProtocolError::NoActiveBattle.into());
        };
        if state.current_phase != BattlePhase::Preparation {
            return Err(ValidationError::WrongPhase {
                phase: state.current_phase,
            }
            .into());
        }

        state.move_unit(unit, to)?;
        Ok(UpdateScope::FORMATION | UpdateScope::UNITS)
    }

    /// Records a declaration for the round in preparation. A rejected
    /// declaration leaves the unit pending.
    pub fn declare_action(&mut self, declared: DeclaredAction) -> Result<UpdateScope, StoreError> {
        self.guard_store_authority("declare_action")?;
        let Some(state) = self.state.as_mut() else {
            return Err(ProtocolError::NoActiveBattle.into());
        };

        BattleEngine::new(state, self.oracles.as_env()).declare_action(declared)?;
        Ok(UpdateScope::ACTIONS)
    }

    /// Hands the battle to the engine.
    ///
    /// Requires the preparation phase with every living unit declared. On
    /// success the store keeps no copy of units, formations, turn order or
    /// declarations, and reports the engine-controlled phase marker.
    pub fn transfer_control_to_engine(&mut self) -> Result<EngineHandoff, StoreError> {
        self.guard_store_authority("transfer_control_to_engine")?;
        let Some(state) = self.state.as_ref() else {
            return Err(ProtocolError::NoActiveBattle.into());
        };
        if state.current_phase != BattlePhase::Preparation {
            return Err(ProtocolError::NotInPreparation {
                phase: state.current_phase,
            }
            .into());
        }
        let pending = state.pending_units();
        if !pending.is_empty() {
            return Err(PhaseError::ActionsPending { pending }.into());
        }

        let Some(mut state) = self.state.take() else {
            return Err(ProtocolError::NoActiveBattle.into());
        };
        let battle_id = state.battle_id;
        state.log(LogEntryKind::ControlTransferred {
            battle_id,
            mode: ControlMode::Engine,
        });

        self.reset_mirror();
        self.round = state.current_round;
        self.log = state.battle_log.clone();
        self.control_mode = ControlMode::Engine;
        self.phase = StorePhase::EngineControlled;

        info!(
            target: "client::store",
            battle_id = %battle_id,
            round = state.current_round,
            "control transferred to engine"
        );
        Ok(EngineHandoff::new(state))
    }

    /// Cancels the active battle.
    ///
    /// Under store control the battle is aborted immediately. Under engine
    /// control nothing is mutated here; the request must travel to the
    /// engine, which answers with an aborted terminal result.
    pub fn request_cancel(
        &mut self,
        reason: impl Into<String>,
    ) -> Result<CancelRequest, StoreError> {
        let reason = reason.into();
        let Some(battle_id) = self.battle_id.filter(|_| self.is_active) else {
            return Err(ProtocolError::NoActiveBattle.into());
        };

        if self.control_mode == ControlMode::Engine {
            info!(target: "client::store", battle_id = %battle_id, %reason, "forwarding cancel to engine");
            return Ok(CancelRequest::ForwardToEngine { battle_id, reason });
        }

        let Some(state) = self.state.as_mut() else {
            return Err(ProtocolError::NoActiveBattle.into());
        };
        BattleEngine::new(state, self.oracles.as_env()).abort(reason);
        let Some(result) = state.result.clone() else {
            return Err(ProtocolError::NoActiveBattle.into());
        };

        self.final_units = state.units.values().cloned().collect();
        self.result = Some(result.clone());
        self.is_active = false;
        Ok(CancelRequest::Completed {
            result,
            scope: UpdateScope::PHASE
                | UpdateScope::RESULT
                | UpdateScope::ACTIONS
                | UpdateScope::LOG,
        })
    }

    // ===== engine-authority messages =====

    /// Mirrors an engine snapshot.
    ///
    /// Phase, round, result, turn order and log are replaced wholesale; unit
    /// records are merged field by field so any unit the UI holds keeps its
    /// identity. Duplicate or stale snapshots are dropped.
    pub fn apply_snapshot(&mut self, snapshot: &BattleSnapshot) -> Result<UpdateScope, StoreError> {
        self.expect_engine_control("apply_snapshot")?;
        self.expect_battle(snapshot.battle_id)?;

        if let Some(last) = self.last_sequence
            && snapshot.sequence <= last
        {
            warn!(
                target: "client::store",
                sequence = snapshot.sequence,
                last,
                "stale snapshot dropped"
            );
            return Ok(UpdateScope::empty());
        }

        Ok(self.mirror(snapshot))
    }

    /// Applies the terminal message and takes control back.
    ///
    /// Accepted exactly once per battle.
    pub fn receive_result(&mut self, completion: BattleCompletion) -> Result<UpdateScope, StoreError> {
        if self.control_mode != ControlMode::Engine {
            if self.battle_id == Some(completion.battle_id) && self.rewards.is_some() {
                let error = ProtocolError::ResultAlreadyReceived {
                    battle_id: completion.battle_id,
                };
                error!(target: "client::store", %error, "duplicate terminal result");
                return Err(error.into());
            }
            self.expect_engine_control("receive_result")?;
        }
        self.expect_battle(completion.battle_id)?;

        let mut scope = UpdateScope::PHASE | UpdateScope::RESULT | UpdateScope::CONTROL;
        let newer = self
            .last_sequence
            .is_none_or(|last| completion.final_snapshot.sequence > last);
        if newer {
            scope |= self.mirror(&completion.final_snapshot);
        }

        let BattleCompletion {
            battle_id,
            result,
            rewards,
            final_snapshot,
        } = completion;

        self.final_units = final_snapshot.units;
        self.phase = StorePhase::Battle(BattlePhase::BattleOver);
        self.control_mode = ControlMode::Store;
        self.is_active = false;
        self.log.push(result.round, LogEntryKind::ControlTransferred {
            battle_id,
            mode: ControlMode::Store,
        });

        info!(
            target: "client::store",
            battle_id = %battle_id,
            outcome = %result.outcome,
            round = result.round,
            "terminal result received, control returned to store"
        );
        self.result = Some(result);
        self.rewards = Some(rewards);
        Ok(scope | UpdateScope::LOG)
    }

    // ===== internals =====

    fn guard_store_authority(&self, operation: &'static str) -> Result<(), ProtocolError> {
        if self.control_mode == ControlMode::Engine {
            let error = self.engine_owns(operation);
            error!(target: "client::store", %error, "store mutation rejected");
            return Err(error);
        }
        if !self.is_active || self.state.is_none() {
            return Err(ProtocolError::NoActiveBattle);
        }
        Ok(())
    }

    fn engine_owns(&self, operation: &'static str) -> ProtocolError {
        ProtocolError::EngineOwnsBattle {
            battle_id: self.battle_id.unwrap_or_default(),
            operation,
        }
    }

    fn expect_engine_control(&self, operation: &'static str) -> Result<(), ProtocolError> {
        if self.control_mode == ControlMode::Engine {
            return Ok(());
        }
        let error = ProtocolError::NotEngineControlled {
            operation,
            mode: self.control_mode,
        };
        error!(target: "client::store", %error, "engine message outside engine control");
        Err(error)
    }

    fn expect_battle(&self, received: BattleId) -> Result<(), ProtocolError> {
        if self.battle_id == Some(received) {
            return Ok(());
        }
        let error = ProtocolError::UnknownBattle {
            expected: self.battle_id,
            received,
        };
        error!(target: "client::store", %error, "message for another battle");
        Err(error)
    }

    fn mirror(&mut self, snapshot: &BattleSnapshot) -> UpdateScope {
        let mut scope = UpdateScope::empty();

        let phase = StorePhase::Battle(snapshot.phase);
        if self.phase != phase {
            self.phase = phase;
            scope |= UpdateScope::PHASE;
        }
        if self.round != snapshot.round {
            self.round = snapshot.round;
            scope |= UpdateScope::ROUND;
        }
        if self.turn_order != snapshot.turn_order
            || self.current_turn_unit != snapshot.current_turn_unit
        {
            self.turn_order.clone_from(&snapshot.turn_order);
            self.current_turn_unit = snapshot.current_turn_unit;
            scope |= UpdateScope::TURN_ORDER;
        }

        for unit in &snapshot.units {
            match self.units.get_mut(&unit.id) {
                Some(existing) => {
                    if existing.merge_from(unit) {
                        scope |= UpdateScope::UNITS;
                    }
                }
                None => {
                    self.units.insert(unit.id, unit.clone());
                    scope |= UpdateScope::UNITS;
                }
            }
        }

        let actions: BTreeMap<UnitId, UnitAction> = snapshot.unit_actions.iter().cloned().collect();
        if self.unit_actions != actions {
            self.unit_actions = actions;
            scope |= UpdateScope::ACTIONS;
        }
        if self.log.entries() != snapshot.log.as_slice() {
            self.log = BattleLog::from_entries(snapshot.log.clone());
            scope |= UpdateScope::LOG;
        }
        if self.result != snapshot.result {
            self.result.clone_from(&snapshot.result);
            scope |= UpdateScope::RESULT;
        }

        self.last_sequence = Some(snapshot.sequence);
        scope
    }

    fn reset_mirror(&mut self) {
        self.phase = StorePhase::default();
        self.round = 0;
        self.units.clear();
        self.formations = Formations::default();
        self.turn_order.clear();
        self.current_turn_unit = None;
        self.unit_actions.clear();
        self.log = BattleLog::new();
        self.last_sequence = None;
    }
}

impl fmt::Debug for BattleStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BattleStore")
            .field("control_mode", &self.control_mode)
            .field("is_active", &self.is_active)
            .field("battle_id", &self.battle_id)
            .field("phase", &self.current_phase())
            .field("round", &self.round())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{BattleConfig, SkillCatalog, Side, UnitStats};

    const HERO: UnitId = UnitId(1);
    const SLIME: UnitId = UnitId(2);

    fn battle() -> BattleState {
        let hero = Unit::new(
            HERO,
            "hero",
            Side::Player,
            UnitStats::new(100, 30, 10, 10, 0),
            GridPosition::new(0, 0).unwrap(),
        )
        .unwrap();
        let slime = Unit::new(
            SLIME,
            "slime",
            Side::Enemy,
            UnitStats::new(50, 10, 10, 5, 0),
            GridPosition::new(1, 0).unwrap(),
        )
        .unwrap();
        BattleState::builder(BattleId(9))
            .config(BattleConfig::default().with_seed(3).with_tie_break_max(0))
            .unit(hero)
            .unit(slime)
            .build()
            .unwrap()
    }

    fn store() -> BattleStore {
        BattleStore::new(OracleBundle::standard(SkillCatalog::new()))
    }

    #[test]
    fn start_opens_preparation() {
        let mut store = store();
        assert_eq!(store.view(), StoreView::Inactive);

        let scope = store.start_battle(battle()).unwrap();
        assert_eq!(scope, UpdateScope::ALL);
        assert!(store.is_active());
        assert_eq!(store.current_phase(), StorePhase::Battle(BattlePhase::Preparation));
        assert_eq!(store.view(), StoreView::Preparing {
            battle_id: BattleId(9),
            round: 1,
        });
        assert_eq!(store.pending_units(), vec![HERO, SLIME]);
    }

    #[test]
    fn second_start_is_rejected_while_active() {
        let mut store = store();
        store.start_battle(battle()).unwrap();
        let error = store.start_battle(battle()).unwrap_err();
        assert!(matches!(
            error,
            StoreError::Protocol(ProtocolError::BattleInProgress { .. })
        ));
    }

    #[test]
    fn place_unit_moves_within_own_formation() {
        let mut store = store();
        store.start_battle(battle()).unwrap();

        let to = GridPosition::new(2, 1).unwrap();
        let scope = store.place_unit(HERO, to).unwrap();
        assert!(scope.has_board_changes());
        assert_eq!(store.formations().get(Side::Player).unit_at(to), Some(HERO));
        assert_eq!(store.unit(HERO).unwrap().grid_position, to);
    }

    #[test]
    fn rejected_declaration_keeps_unit_pending() {
        let mut store = store();
        store.start_battle(battle()).unwrap();

        let error = store
            .declare_action(DeclaredAction::new(HERO, UnitAction::attack(UnitId(77))))
            .unwrap_err();
        assert!(matches!(
            error,
            StoreError::Validation(ValidationError::UnknownTarget(UnitId(77)))
        ));
        assert!(store.pending_units().contains(&HERO));
    }

    #[test]
    fn transfer_requires_every_declaration() {
        let mut store = store();
        store.start_battle(battle()).unwrap();
        store
            .declare_action(DeclaredAction::new(HERO, UnitAction::attack(SLIME)))
            .unwrap();

        let error = store.transfer_control_to_engine().unwrap_err();
        assert!(matches!(
            error,
            StoreError::Phase(PhaseError::ActionsPending { ref pending }) if pending == &vec![SLIME]
        ));
        assert_eq!(store.control_mode(), ControlMode::Store);
    }

    #[test]
    fn local_cancel_aborts_without_engine() {
        let mut store = store();
        store.start_battle(battle()).unwrap();

        let request = store.request_cancel("player fled").unwrap();
        let CancelRequest::Completed { result, .. } = request else {
            panic!("store-owned battle must abort locally");
        };
        assert_eq!(result.outcome, battle_core::BattleOutcome::Aborted);
        assert!(!store.is_active());
        assert_eq!(store.final_units().len(), 2);
        assert!(matches!(store.view(), StoreView::Finished { .. }));
    }

    #[test]
    fn store_phase_renders_engine_marker() {
        assert_eq!(StorePhase::EngineControlled.to_string(), "engine_controlled");
        assert_eq!(
            StorePhase::Battle(BattlePhase::BattleOver).to_string(),
            "battle_over"
        );
    }
}
