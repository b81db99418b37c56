//! Public runtime API surface.
//!
//! This module gathers the types exposed to consumers of the runtime crate so
//! other layers can stay focused on orchestration and the worker loop.

pub mod errors;
pub mod handle;
pub mod providers;
pub mod rewards;

pub use errors::{Result, RuntimeError};
pub use handle::EngineHandle;
pub use providers::{ActionProvider, DefendActionProvider, FrontlineActionProvider};
pub use rewards::{NoRewards, PerEnemyRewards, RewardOracle, RewardPayload};
