//! Battle client binary.
//!
//! Sets up a skirmish, declares the opening round in the store, lets the
//! engine play it out and prints the outcome.
//!
//! Configuration is read from the environment (and `.env`), see
//! [`RuntimeConfig::from_env`]. `RUST_LOG` controls log output.

use anyhow::Result;
use tracing::info;

use battle_client::Client;
use battle_client::demo::{self, SkirmishPlanner};
use battle_core::BattleId;
use battle_runtime::{PerEnemyRewards, RuntimeConfig};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (silently ignore if not found)
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = RuntimeConfig::from_env();
    let skirmish = demo::skirmish(BattleId(1), config.battle.clone())?;
    info!(units = skirmish.state.units.len(), "skirmish ready");

    let client = Client::builder()
        .config(config)
        .planner(SkirmishPlanner::new(skirmish.catalog.clone()))
        .rewards(PerEnemyRewards {
            experience: 25,
            gold: 10,
        })
        .catalog(skirmish.catalog)
        .build()?;

    let report = client.run(skirmish.state).await?;

    println!(
        "{} in round {}: {}",
        report.result.outcome, report.result.round, report.result.reason
    );
    for unit in &report.final_units {
        println!(
            "  {:<14} {:>6} hp {:>3}/{:<3} mp {:>3}/{}",
            unit.name,
            unit.side,
            unit.stats().current_hp,
            unit.stats().max_hp,
            unit.stats().current_mp,
            unit.stats().max_mp,
        );
    }
    if !report.rewards.is_empty() {
        println!(
            "rewards: {} xp, {} gold",
            report.rewards.experience, report.rewards.gold
        );
    }
    info!(log_entries = report.log_entries, "battle finished");

    Ok(())
}
