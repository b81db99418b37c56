//! Topic-based event bus for engine output.
//!
//! Snapshots and per-turn notices go to separate topics so a consumer that
//! only renders the board is not woken for every turn event, and vice versa.

mod bus;
mod types;

pub use bus::{Event, EventBus, Topic};
pub use types::TurnEvent;
