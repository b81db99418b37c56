//! Client builder with dependency injection pattern.

use std::sync::Arc;

use anyhow::{Context, Result};

use battle_core::SkillCatalog;
use battle_runtime::{
    ActionProvider, FrontlineActionProvider, NoRewards, OracleBundle, RewardOracle,
    RuntimeConfig,
};
use client_core::HandoffCoordinator;

use crate::Client;

/// Builder for constructing a [`Client`].
///
/// The skill catalog is required; everything else falls back to a default.
#[derive(Default)]
pub struct ClientBuilder {
    config: Option<RuntimeConfig>,
    catalog: Option<SkillCatalog>,
    planner: Option<Arc<dyn ActionProvider>>,
    rewards: Option<Arc<dyn RewardOracle>>,
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runtime configuration. Defaults to [`RuntimeConfig::from_env`].
    pub fn config(mut self, config: RuntimeConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Skill and passive definitions shared by the store and the engine.
    pub fn catalog(mut self, catalog: SkillCatalog) -> Self {
        self.catalog = Some(catalog);
        self
    }

    /// Chooses actions for every pending unit, in the store for the first
    /// round and in the engine for later ones.
    pub fn planner(mut self, planner: impl ActionProvider + 'static) -> Self {
        self.planner = Some(Arc::new(planner));
        self
    }

    pub fn rewards(mut self, rewards: impl RewardOracle + 'static) -> Self {
        self.rewards = Some(Arc::new(rewards));
        self
    }

    pub fn build(self) -> Result<Client> {
        let catalog = self
            .catalog
            .context("Skill catalog is required. Use .catalog() to set it.")?;
        let config = self.config.unwrap_or_else(RuntimeConfig::from_env);
        let oracles = OracleBundle::standard(catalog);
        let planner = self
            .planner
            .unwrap_or_else(|| Arc::new(FrontlineActionProvider));
        let rewards = self.rewards.unwrap_or_else(|| Arc::new(NoRewards));

        let coordinator = HandoffCoordinator::new(config, oracles.clone())
            .with_shared_action_provider(Arc::clone(&planner))
            .with_shared_rewards(rewards);

        Ok(Client {
            oracles,
            planner,
            coordinator,
        })
    }
}
