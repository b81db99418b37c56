//! Battle engine runtime.
//!
//! Once the UI store finishes preparation it hands the whole battle state to
//! this crate. A dedicated worker task becomes the only writer of that state,
//! drives the [`battle_core::BattleEngine`] through execution and further
//! rounds, and streams snapshots back until the battle ends. The terminal
//! result travels on a one-shot channel so it is delivered exactly once.
//!
//! Modules are organized by responsibility:
//! - [`runtime`] hosts the launcher, its builder and configuration
//! - [`api`] exposes the types downstream clients interact with
//! - [`events`] provides the topic-based event bus for snapshots and turns
//! - [`oracle`] bundles the shared read-only battle data
//! - [`snapshot`] and [`handoff`] define the messages crossing the boundary
pub mod api;
pub mod events;
pub mod handoff;
pub mod oracle;
pub mod runtime;
pub mod snapshot;

mod workers;

pub use api::{
    ActionProvider, DefendActionProvider, EngineHandle, FrontlineActionProvider, NoRewards,
    PerEnemyRewards, Result, RewardOracle, RewardPayload, RuntimeError,
};
pub use events::{Event, EventBus, Topic, TurnEvent};
pub use handoff::{BattleCompletion, EngineHandoff};
pub use oracle::OracleBundle;
pub use runtime::{BattleRuntime, EngineLink, RuntimeBuilder, RuntimeConfig};
pub use snapshot::BattleSnapshot;
