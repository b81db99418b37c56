//! Worker tasks that back the runtime orchestration.
//!
//! One battle worker runs per engine-controlled battle and owns that battle's
//! state for its whole lifetime.

mod battle;

pub(crate) use battle::{BattleWorker, Command, WorkerSettings};
