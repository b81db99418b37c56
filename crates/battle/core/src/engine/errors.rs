use crate::error::{BattleError, ErrorSeverity};
use crate::state::{BattlePhase, UnitId};

/// A phase transition was attempted out of order.
#[derive(Clone, Debug, PartialEq, Eq, thiserror::Error)]
pub enum PhaseError {
    #[error("expected phase {expected}, battle is in {actual}")]
    UnexpectedPhase {
        expected: BattlePhase,
        actual: BattlePhase,
    },

    #[error("cannot start execution: {} unit(s) have not declared an action", pending.len())]
    ActionsPending { pending: Vec<UnitId> },

    #[error("battle is over")]
    BattleOver,
}

impl BattleError for PhaseError {
    fn severity(&self) -> ErrorSeverity {
        ErrorSeverity::Validation
    }
}
