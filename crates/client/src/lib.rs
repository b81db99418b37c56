//! Battle client composition root.
//!
//! ```text
//! Client
//!   ├─→ BattleStore          (preparation, mirrored engine view)
//!   ├─→ ActionProvider       (chooses declarations)
//!   └─→ HandoffCoordinator   (store → engine → store)
//! ```
//!
//! [`Client::run`] opens a battle in a fresh store, declares the first
//! round, hands control to the engine and waits for the terminal result.

mod builder;
pub mod demo;

pub use builder::ClientBuilder;

use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::Mutex;
use tracing::debug;

use battle_core::{BattleResult, BattleState, DeclaredAction, Unit};
use battle_runtime::{ActionProvider, OracleBundle, RewardPayload};
use client_core::{BattleStore, HandoffCoordinator};

/// What a finished battle leaves behind for the party.
#[derive(Debug, Clone)]
pub struct BattleReport {
    pub result: BattleResult,
    pub rewards: RewardPayload,
    pub final_units: Vec<Unit>,
    pub log_entries: usize,
}

pub struct Client {
    oracles: OracleBundle,
    planner: Arc<dyn ActionProvider>,
    coordinator: HandoffCoordinator,
}

impl Client {
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// Plays one battle to completion.
    pub async fn run(&self, state: BattleState) -> Result<BattleReport> {
        let store = Mutex::new(BattleStore::new(self.oracles.clone()));

        {
            let mut store = store.lock().await;
            store.start_battle(state)?;
            if let Some(result) = store.result().cloned() {
                // Ended while opening; nothing to hand over.
                return Ok(report(&store, result));
            }
            self.declare_pending(&mut store).await?;
        }

        let session = self.coordinator.launch(&store).await?;
        let result = session
            .drive(&store, |scope| debug!(target: "client", ?scope, "store updated"))
            .await?;

        let store = store.into_inner();
        Ok(report(&store, result))
    }

    async fn declare_pending(&self, store: &mut BattleStore) -> Result<()> {
        let mut declarations = Vec::new();
        {
            let state = store.state().context("store holds no battle")?;
            for unit in state.pending_units() {
                let action = self.planner.provide_action(unit, state).await?;
                declarations.push(DeclaredAction::new(unit, action));
            }
        }
        for declared in declarations {
            store.declare_action(declared)?;
        }
        Ok(())
    }
}

fn report(store: &BattleStore, result: BattleResult) -> BattleReport {
    BattleReport {
        result,
        rewards: store.rewards().cloned().unwrap_or_default(),
        final_units: store.final_units().to_vec(),
        log_entries: store.log().len(),
    }
}
