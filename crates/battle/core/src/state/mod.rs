//! Authoritative battle state representation.
//!
//! This module owns the data structures that describe combatants, their
//! formations, declared actions, and the append-only battle log. Runtime
//! layers clone or query this state but mutate it through the engine or the
//! self-contained [`Unit`] operations.
pub mod action;
pub mod battle;
pub mod common;
pub mod formation;
pub mod log;
pub mod status;
pub mod unit;

pub use action::{ActionType, DeclaredAction, UnitAction};
pub use battle::{
    BattleOutcome, BattlePhase, BattleResult, BattleSetup, BattleState, EndCondition, RngState,
};
pub use common::{BattleId, ControlMode, EffectId, GridPosition, Side, SkillId, UnitId};
pub use formation::{Formation, Formations};
pub use log::{BattleLog, LogEntry, LogEntryKind, SkipReason};
pub use status::{
    AttributeModifier, EffectDuration, ModifierOp, StatKind, StatusEffect, StatusEffectKind,
    StatusTick, TickOutcome,
};
pub use unit::{DamageOutcome, HealOutcome, MpOutcome, Unit, UnitStats};
