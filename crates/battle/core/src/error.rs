//! Common error infrastructure for battle-core.
//!
//! Every failure a battle can surface falls into one of four classes, and
//! callers route on the class rather than on individual variants:
//!
//! - **Validation**: a declaration is rejected locally and not recorded; the
//!   declaring unit stays pending.
//! - **Resource**: logged and turned into a no-op action by the pipeline.
//! - **Invariant**: a broken data contract (grid bounds, duplicate ids).
//! - **Protocol**: the single-writer handoff between store and engine was
//!   violated.
//!
//! Invariant and protocol failures indicate a desync bug, never a gameplay
//! event, and are always surfaced to the caller.

use crate::state::{BattleId, BattlePhase, ControlMode, Side, SkillId, UnitId};

/// Severity class of a battle error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ErrorSeverity {
    /// Invalid declaration. Rejected without mutation.
    Validation,

    /// Not enough of a consumable resource. Logged, action becomes a no-op.
    Resource,

    /// Data contract broken (formation bounds, uniqueness, stat ranges).
    Invariant,

    /// Store/engine authority protocol broken.
    Protocol,
}

impl ErrorSeverity {
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Validation => "validation",
            Self::Resource => "resource",
            Self::Invariant => "invariant",
            Self::Protocol => "protocol",
        }
    }

    /// Returns true if the error signals a programming-contract failure.
    pub const fn is_contract_failure(&self) -> bool {
        matches!(self, Self::Invariant | Self::Protocol)
    }
}

/// Common trait for all battle-core errors.
pub trait BattleError: core::fmt::Display + core::fmt::Debug {
    /// Returns the severity class of this error.
    fn severity(&self) -> ErrorSeverity;
}

/// A declared action was rejected.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ValidationError {
    #[error("actions can only be declared during preparation (current phase: {phase})")]
    WrongPhase { phase: BattlePhase },

    #[error("unit {0} is not part of this battle")]
    UnknownUnit(UnitId),

    #[error("unit {0} is defeated and cannot act")]
    UnitDefeated(UnitId),

    #[error("target {0} is not part of this battle")]
    UnknownTarget(UnitId),

    #[error("unit {unit} declared an attack without a target")]
    MissingTargets { unit: UnitId },

    #[error("unit {unit} declared a skill action without a skill id")]
    MissingSkill { unit: UnitId },

    #[error("skill '{skill}' does not exist")]
    UnknownSkill { skill: SkillId },

    #[error("unit {unit} does not know skill '{skill}'")]
    SkillNotLearned { unit: UnitId, skill: SkillId },
}

impl BattleError for ValidationError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }
}

/// A unit lacked the resources to perform its declared action.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ResourceError {
    #[error("unit {unit} needs {required} MP but has {available}")]
    InsufficientMp {
        unit: UnitId,
        required: u32,
        available: u32,
    },
}

impl BattleError for ResourceError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Resource
    }
}

/// Battle data broke a structural invariant.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum InvariantViolation {
    #[error("grid position ({row}, {col}) is outside the 3x3 formation")]
    PositionOutOfBounds { row: u8, col: u8 },

    #[error("unit {0} already occupies a formation cell")]
    DuplicateUnit(UnitId),

    #[error("{side} cell ({row}, {col}) is already occupied by {occupant}")]
    CellOccupied {
        side: Side,
        row: u8,
        col: u8,
        occupant: UnitId,
    },

    #[error("unit {0} has no formation cell")]
    NotInFormation(UnitId),

    #[error("unit {unit} has {resource} {current} above its maximum {max}")]
    ResourceOutOfRange {
        unit: UnitId,
        resource: &'static str,
        current: u32,
        max: u32,
    },
}

impl BattleError for InvariantViolation {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Invariant
    }
}

/// The store/engine single-writer protocol was violated.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    #[error("{operation} rejected: {battle_id} is controlled by the engine")]
    EngineOwnsBattle {
        battle_id: BattleId,
        operation: &'static str,
    },

    #[error("message for {received} does not match the active battle {expected:?}")]
    UnknownBattle {
        expected: Option<BattleId>,
        received: BattleId,
    },

    #[error("{operation} requires engine control (current mode: {mode})")]
    NotEngineControlled {
        operation: &'static str,
        mode: ControlMode,
    },

    #[error("terminal result for {battle_id} was already received")]
    ResultAlreadyReceived { battle_id: BattleId },

    #[error("control handoff requires the preparation phase (current phase: {phase})")]
    NotInPreparation { phase: BattlePhase },

    #[error("no battle is active")]
    NoActiveBattle,

    #[error("{battle_id} is still in progress")]
    BattleInProgress { battle_id: BattleId },
}

impl BattleError for ProtocolError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Protocol
    }
}
