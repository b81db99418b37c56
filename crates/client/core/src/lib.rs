//! UI-facing battle store and the control handoff to the battle engine.
//!
//! The [`BattleStore`] owns a battle while the player prepares it. When
//! execution starts the [`HandoffCoordinator`] moves authority to a
//! `battle-runtime` worker, feeds engine snapshots back into the store, and
//! returns control once the terminal result arrives. Every store update
//! reports an [`UpdateScope`] so renderers can redraw selectively.
pub mod error;
pub mod handoff;
pub mod scope;
pub mod store;
pub mod view;

pub use error::{HandoffError, StoreError};
pub use handoff::{BattleSession, HandoffCoordinator};
pub use scope::UpdateScope;
pub use store::{BattleStore, CancelRequest, StorePhase};
pub use view::StoreView;
