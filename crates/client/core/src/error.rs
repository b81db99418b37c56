//! Errors surfaced by the store and the handoff coordinator.
use thiserror::Error;

use battle_core::{
    BattleError, ErrorSeverity, InvariantViolation, PhaseError, ProtocolError, ValidationError,
};
use battle_runtime::RuntimeError;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Invariant(#[from] InvariantViolation),

    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    #[error(transparent)]
    Phase(#[from] PhaseError),
}

impl BattleError for StoreError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Validation(error) => error.severity(),
            Self::Invariant(error) => error.severity(),
            Self::Protocol(error) => error.severity(),
            Self::Phase(error) => error.severity(),
        }
    }
}

#[derive(Debug, Error)]
pub enum HandoffError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<ProtocolError> for HandoffError {
    fn from(error: ProtocolError) -> Self {
        Self::Store(StoreError::Protocol(error))
    }
}

impl BattleError for HandoffError {
    fn severity(&self) -> ErrorSeverity {
        match self {
            Self::Store(error) => error.severity(),
            Self::Runtime(error) => error.severity(),
        }
    }
}
