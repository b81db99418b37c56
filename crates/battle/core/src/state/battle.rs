use std::collections::BTreeMap;

use arrayvec::ArrayVec;

use crate::config::BattleConfig;
use crate::env::{SkillOracle, compute_seed};
use crate::error::{InvariantViolation, ValidationError};
use crate::state::{
    BattleId, BattleLog, DeclaredAction, Formations, GridPosition, LogEntryKind, Side, Unit,
    UnitAction, UnitId,
};

/// Stage of the round state machine.
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
pub enum BattlePhase {
    #[default]
    Idle,
    Preparation,
    Execution,
    Resolution,
    BattleOver,
}

/// Terminal result of a battle.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BattleOutcome {
    Victory,
    Defeat,
    Draw,
    /// Cancelled by a control message (e.g. the player fled).
    Aborted,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleResult {
    pub outcome: BattleOutcome,
    pub reason: String,
    /// Round in which the battle ended.
    pub round: u32,
}

/// Result of [`BattleState::check_battle_end_conditions`].
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum EndCondition {
    Victory,
    Defeat,
    Draw,
    None,
}

impl EndCondition {
    pub const fn outcome(self) -> Option<BattleOutcome> {
        match self {
            Self::Victory => Some(BattleOutcome::Victory),
            Self::Defeat => Some(BattleOutcome::Defeat),
            Self::Draw => Some(BattleOutcome::Draw),
            Self::None => None,
        }
    }

    pub const fn reason(self) -> &'static str {
        match self {
            Self::Victory => "all enemy units defeated",
            Self::Defeat => "all player units defeated",
            Self::Draw => "round limit reached",
            Self::None => "",
        }
    }
}

/// Seed and draw cursor for every random roll in one battle.
///
/// Each roll derives its own seed from `(seed, cursor, actor, context)`, so
/// replaying a battle with the same seed and the same declarations yields the
/// same rolls.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct RngState {
    pub seed: u64,
    pub cursor: u64,
}

impl RngState {
    /// Uses the configured seed, or a fresh random one when unseeded.
    pub fn new(seed: Option<u64>) -> Self {
        Self {
            seed: seed.unwrap_or_else(rand::random),
            cursor: 0,
        }
    }

    /// Derives the seed for the next roll and advances the cursor.
    pub fn next_seed(&mut self, actor: UnitId, context: u32) -> u64 {
        let seed = compute_seed(self.seed, self.cursor, actor.0, context);
        self.cursor += 1;
        seed
    }
}

/// Canonical state of one battle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleState {
    pub battle_id: BattleId,
    pub units: BTreeMap<UnitId, Unit>,
    pub formations: Formations,
    /// Starts at 1 and only increases.
    pub current_round: u32,
    pub current_phase: BattlePhase,
    /// Recomputed once per round; never contains a unit that was defeated
    /// when the round started.
    pub turn_order: ArrayVec<UnitId, { BattleConfig::MAX_UNITS }>,
    pub current_turn_index: usize,
    /// Cleared at every round boundary.
    pub unit_actions: BTreeMap<UnitId, UnitAction>,
    pub battle_log: BattleLog,
    pub result: Option<BattleResult>,
    pub rng: RngState,
    pub config: BattleConfig,
}

impl BattleState {
    /// Creates a state with no units.
    pub fn empty(battle_id: BattleId, config: BattleConfig) -> Self {
        Self {
            battle_id,
            units: BTreeMap::new(),
            formations: Formations::default(),
            current_round: 1,
            current_phase: BattlePhase::Idle,
            turn_order: ArrayVec::new(),
            current_turn_index: 0,
            unit_actions: BTreeMap::new(),
            battle_log: BattleLog::new(),
            result: None,
            rng: RngState::new(config.seed),
            config,
        }
    }

    pub fn builder(battle_id: BattleId) -> BattleSetup {
        BattleSetup::new(battle_id)
    }

    pub fn unit(&self, id: UnitId) -> Option<&Unit> {
        self.units.get(&id)
    }

    pub fn unit_mut(&mut self, id: UnitId) -> Option<&mut Unit> {
        self.units.get_mut(&id)
    }

    /// Adds a unit and places it in its side's formation.
    pub fn add_unit(&mut self, unit: Unit) -> Result<(), InvariantViolation> {
        if self.units.contains_key(&unit.id) {
            return Err(InvariantViolation::DuplicateUnit(unit.id));
        }
        self.formations.place(unit.side, unit.id, unit.grid_position)?;
        self.units.insert(unit.id, unit);
        Ok(())
    }

    /// Moves a unit to another cell of its own formation.
    pub fn move_unit(&mut self, id: UnitId, to: GridPosition) -> Result<(), InvariantViolation> {
        self.formations.relocate(id, to)?;
        if let Some(unit) = self.units.get_mut(&id) {
            unit.grid_position = to;
        }
        Ok(())
    }

    pub fn living_units(&self, side: Side) -> impl Iterator<Item = &Unit> {
        self.units
            .values()
            .filter(move |unit| unit.side == side && unit.is_alive())
    }

    /// Living units that have not declared an action yet.
    pub fn pending_units(&self) -> Vec<UnitId> {
        self.units
            .values()
            .filter(|unit| unit.is_alive() && !self.unit_actions.contains_key(&unit.id))
            .map(|unit| unit.id)
            .collect()
    }

    pub fn all_units_have_actions(&self) -> bool {
        self.pending_units().is_empty()
    }

    /// Records a declaration during preparation. A rejected declaration
    /// leaves the previous one (if any) untouched.
    pub fn declare_action(
        &mut self,
        declared: DeclaredAction,
        skills: &dyn SkillOracle,
    ) -> Result<Option<UnitAction>, ValidationError> {
        if self.current_phase != BattlePhase::Preparation {
            return Err(ValidationError::WrongPhase {
                phase: self.current_phase,
            });
        }
        declared.action.validate(declared.unit_id, &self.units, skills)?;
        Ok(self.unit_actions.insert(declared.unit_id, declared.action))
    }

    /// Evaluates the terminal conditions in fixed priority order: player
    /// wipe, then enemy wipe, then the round ceiling.
    pub fn check_battle_end_conditions(&self) -> EndCondition {
        if self.living_units(Side::Player).next().is_none() {
            EndCondition::Defeat
        } else if self.living_units(Side::Enemy).next().is_none() {
            EndCondition::Victory
        } else if self.current_round > self.config.max_rounds {
            EndCondition::Draw
        } else {
            EndCondition::None
        }
    }

    pub fn current_turn_unit(&self) -> Option<UnitId> {
        match self.current_phase {
            BattlePhase::Execution => self.turn_order.get(self.current_turn_index).copied(),
            _ => None,
        }
    }

    pub fn is_over(&self) -> bool {
        self.current_phase == BattlePhase::BattleOver
    }

    /// Appends a log entry stamped with the current round.
    pub fn log(&mut self, kind: LogEntryKind) {
        self.battle_log.push(self.current_round, kind);
    }
}

/// Builder for a battle's initial state.
#[derive(Clone, Debug)]
pub struct BattleSetup {
    battle_id: BattleId,
    config: BattleConfig,
    units: Vec<Unit>,
}

impl BattleSetup {
    pub fn new(battle_id: BattleId) -> Self {
        Self {
            battle_id,
            config: BattleConfig::default(),
            units: Vec::new(),
        }
    }

    #[must_use]
    pub fn config(mut self, config: BattleConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn unit(mut self, unit: Unit) -> Self {
        self.units.push(unit);
        self
    }

    #[must_use]
    pub fn units(mut self, units: impl IntoIterator<Item = Unit>) -> Self {
        self.units.extend(units);
        self
    }

    /// Places every unit, failing on the first formation conflict.
    pub fn build(self) -> Result<BattleState, InvariantViolation> {
        let mut state = BattleState::empty(self.battle_id, self.config);
        for unit in self.units {
            state.add_unit(unit)?;
        }
        Ok(state)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::SkillCatalog;
    use crate::state::UnitStats;

    fn unit(id: u32, side: Side, col: u8) -> Unit {
        Unit::new(
            UnitId(id),
            format!("u{id}"),
            side,
            UnitStats::new(50, 10, 5, 5, 0),
            GridPosition::new(0, col).unwrap(),
        )
        .unwrap()
    }

    fn state() -> BattleState {
        BattleState::builder(BattleId(1))
            .config(BattleConfig::default().with_seed(7))
            .unit(unit(1, Side::Player, 0))
            .unit(unit(2, Side::Enemy, 0))
            .unit(unit(3, Side::Enemy, 1))
            .build()
            .unwrap()
    }

    #[test]
    fn builder_rejects_duplicate_ids() {
        let err = BattleState::builder(BattleId(1))
            .unit(unit(1, Side::Player, 0))
            .unit(unit(1, Side::Enemy, 1))
            .build()
            .unwrap_err();
        assert_eq!(err, InvariantViolation::DuplicateUnit(UnitId(1)));
    }

    #[test]
    fn end_conditions_follow_priority_order() {
        let mut s = state();
        assert_eq!(s.check_battle_end_conditions(), EndCondition::None);

        for id in [2, 3] {
            s.unit_mut(UnitId(id)).unwrap().take_damage(999);
        }
        assert_eq!(s.check_battle_end_conditions(), EndCondition::Victory);

        // Full wipe on both sides resolves as defeat.
        s.unit_mut(UnitId(1)).unwrap().take_damage(999);
        assert_eq!(s.check_battle_end_conditions(), EndCondition::Defeat);
    }

    #[test]
    fn round_ceiling_is_a_draw() {
        let mut s = state();
        s.current_round = s.config.max_rounds + 1;
        assert_eq!(s.check_battle_end_conditions(), EndCondition::Draw);
    }

    #[test]
    fn declarations_require_preparation() {
        let mut s = state();
        let catalog = SkillCatalog::new();
        let declared = DeclaredAction::new(UnitId(1), UnitAction::attack(UnitId(2)));
        assert_eq!(
            s.declare_action(declared.clone(), &catalog),
            Err(ValidationError::WrongPhase {
                phase: BattlePhase::Idle
            })
        );

        s.current_phase = BattlePhase::Preparation;
        s.declare_action(declared, &catalog).unwrap();
        assert_eq!(s.pending_units(), vec![UnitId(2), UnitId(3)]);
        assert!(!s.all_units_have_actions());
    }

    #[test]
    fn invalid_declaration_keeps_unit_pending() {
        let mut s = state();
        s.current_phase = BattlePhase::Preparation;
        let catalog = SkillCatalog::new();
        let err = s
            .declare_action(
                DeclaredAction::new(UnitId(1), UnitAction::attack(UnitId(99))),
                &catalog,
            )
            .unwrap_err();
        assert_eq!(err, ValidationError::UnknownTarget(UnitId(99)));
        assert!(s.pending_units().contains(&UnitId(1)));

        let err = s
            .declare_action(
                DeclaredAction::new(UnitId(1), UnitAction::skill("fireball", vec![UnitId(2)])),
                &catalog,
            )
            .unwrap_err();
        assert!(matches!(err, ValidationError::UnknownSkill { .. }));
    }

    #[test]
    fn seeded_rng_is_reproducible() {
        let mut a = RngState::new(Some(42));
        let mut b = RngState::new(Some(42));
        for _ in 0..5 {
            assert_eq!(a.next_seed(UnitId(1), 0), b.next_seed(UnitId(1), 0));
        }
        assert_eq!(a.cursor, 5);
    }
}
