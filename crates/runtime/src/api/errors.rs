//! Unified error types surfaced by the runtime API.
//!
//! Wraps failures from worker coordination, rejected declarations, and action
//! providers so clients can bubble them up with consistent context.
use thiserror::Error;
use tokio::sync::oneshot;

use battle_core::{
    BattleError, BattleId, BattlePhase, ErrorSeverity, UnitId, ValidationError,
};

pub type Result<T> = std::result::Result<T, RuntimeError>;

#[derive(Debug, Error)]
pub enum RuntimeError {
    #[error("battle worker command channel closed")]
    CommandChannelClosed,

    #[error("battle worker reply channel closed")]
    ReplyChannelClosed(#[source] oneshot::error::RecvError),

    #[error("battle worker dropped without sending a terminal result")]
    CompletionLost(#[source] oneshot::error::RecvError),

    #[error("battle worker join failed")]
    WorkerJoin(#[source] tokio::task::JoinError),

    #[error("handoff for {battle_id} requires the preparation phase (current phase: {phase})")]
    InvalidHandoff {
        battle_id: BattleId,
        phase: BattlePhase,
    },

    #[error("handoff names {declared} but carries state for {actual}")]
    HandoffMismatch {
        declared: BattleId,
        actual: BattleId,
    },

    #[error("declaration rejected: {0}")]
    Rejected(#[from] ValidationError),

    #[error("action provider failed for unit {unit}: {message}")]
    Provider { unit: UnitId, message: String },
}

impl BattleError for RuntimeError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Rejected(_) | Self::Provider { .. } => ErrorSeverity::Validation,
            _ => ErrorSeverity::Protocol,
        }
    }
}
