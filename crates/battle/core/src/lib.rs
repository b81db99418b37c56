//! Deterministic turn-based battle rules shared by the store and the engine.
//!
//! `battle-core` defines the canonical combat rules (units, formations,
//! status effects, passive triggers, phase machine) and exposes pure APIs
//! that are reused by both the reactive UI store during preparation and the
//! battle engine worker from execution onward. All state mutation flows
//! through [`engine::BattleEngine`] or the self-contained [`state::Unit`]
//! operations.
pub mod config;
pub mod engine;
pub mod env;
pub mod error;
pub mod passive;
pub mod state;

pub use config::BattleConfig;
pub use engine::{BattleEngine, PhaseError, RoundSummary, TurnOutcome};
pub use env::{
    BattleEnv, DamageInput, DamageOracle, DamageRoll, DamageType, PcgRng, RngOracle,
    SkillCatalog, SkillDefinition, SkillEffect, SkillOracle, SkillTarget, StandardDamageTable,
};
pub use error::{
    BattleError, ErrorSeverity, InvariantViolation, ProtocolError, ResourceError,
    ValidationError,
};
pub use passive::{
    EffectTarget, PassiveEffect, PassiveSkill, PassiveTriggerRegistry, RollSource,
    TriggerConditions, TriggerContext, TriggerEvent, TriggerScope, TriggerTiming,
    can_trigger_passive_skill, create_trigger_context,
};
pub use state::{
    ActionType, AttributeModifier, BattleId, BattleLog, BattleOutcome, BattlePhase, BattleResult,
    BattleSetup, BattleState, ControlMode, DamageOutcome, DeclaredAction, EffectDuration,
    EffectId, EndCondition, Formation, Formations, GridPosition, HealOutcome, LogEntry,
    LogEntryKind, ModifierOp, MpOutcome, RngState, Side, SkillId, SkipReason, StatKind,
    StatusEffect, StatusEffectKind, StatusTick, TickOutcome, Unit, UnitAction, UnitId, UnitStats,
};
