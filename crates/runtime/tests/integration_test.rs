use std::time::Duration;

use battle_core::{
    BattleConfig, BattleEngine, BattleId, BattleOutcome, BattlePhase, BattleState, DeclaredAction,
    GridPosition, LogEntryKind, SkillCatalog, Side, Unit, UnitAction, UnitId, UnitStats,
    ValidationError,
};
use battle_runtime::{
    BattleRuntime, EngineHandoff, Event, OracleBundle, PerEnemyRewards, RuntimeConfig,
    RuntimeError, Topic, TurnEvent,
};

const HERO: UnitId = UnitId(1);
const SLIME: UnitId = UnitId(2);

fn unit(id: UnitId, side: Side, stats: UnitStats) -> Unit {
    Unit::new(
        id,
        format!("unit-{}", id.0),
        side,
        stats,
        GridPosition::new(0, 0).expect("in bounds"),
    )
    .expect("valid unit")
}

/// Hero (100hp, 30atk, 10def, 10spd) against a slime (50hp, 10atk, 10def,
/// 5spd), deterministic turn order.
fn duel(hero_hp: u32, slime_hp: u32) -> BattleState {
    BattleState::builder(BattleId(42))
        .config(BattleConfig::default().with_seed(11).with_tie_break_max(0))
        .unit(unit(HERO, Side::Player, UnitStats::new(hero_hp, 30, 10, 10, 0)))
        .unit(unit(SLIME, Side::Enemy, UnitStats::new(slime_hp, 10, 10, 5, 0)))
        .build()
        .expect("battle")
}

/// Runs the store side of preparation: start, declare, ready for handoff.
fn prepared(mut state: BattleState, oracles: &OracleBundle) -> EngineHandoff {
    let mut engine = BattleEngine::new(&mut state, oracles.as_env());
    engine.start().expect("start");
    engine
        .declare_action(DeclaredAction::new(HERO, UnitAction::attack(SLIME)))
        .expect("hero declares");
    engine
        .declare_action(DeclaredAction::new(SLIME, UnitAction::attack(HERO)))
        .expect("slime declares");
    EngineHandoff::new(state)
}

#[tokio::test]
async fn engine_runs_handed_off_battle_to_victory() {
    let oracles = OracleBundle::standard(SkillCatalog::new());
    let handoff = prepared(duel(100, 50), &oracles);

    let link = BattleRuntime::builder()
        .oracles(oracles)
        .rewards(PerEnemyRewards {
            experience: 10,
            gold: 3,
        })
        .launch(handoff)
        .expect("launch");
    let mut snapshots = link.subscribe(Topic::Snapshot);

    let completion = link.wait().await.expect("completion");

    assert_eq!(completion.battle_id, BattleId(42));
    assert_eq!(completion.result.outcome, BattleOutcome::Victory);
    assert_eq!(completion.result.round, 3);
    assert_eq!(completion.rewards.experience, 10);
    assert_eq!(completion.rewards.gold, 3);

    let hero = completion
        .final_snapshot
        .unit(HERO)
        .expect("hero in final snapshot");
    assert_eq!(hero.stats().current_hp, 98);
    assert_eq!(completion.final_snapshot.phase, BattlePhase::BattleOver);

    let mut last_sequence = 0;
    while let Ok(event) = snapshots.try_recv() {
        if let Event::Snapshot(snapshot) = event {
            assert!(snapshot.sequence > last_sequence, "sequence must grow");
            last_sequence = snapshot.sequence;
        }
    }
    assert_eq!(last_sequence, completion.final_snapshot.sequence);
}

#[tokio::test]
async fn turn_events_cover_every_resolved_slot() {
    let oracles = OracleBundle::standard(SkillCatalog::new());
    let handoff = prepared(duel(100, 50), &oracles);

    let link = BattleRuntime::builder()
        .oracles(oracles)
        .launch(handoff)
        .expect("launch");
    let mut turns = link.subscribe(Topic::Turn);
    let completion = link.wait().await.expect("completion");

    let mut resolved = Vec::new();
    let mut finished = None;
    while let Ok(Event::Turn(event)) = turns.try_recv() {
        match event {
            TurnEvent::TurnResolved { unit, .. } => resolved.push(unit),
            TurnEvent::BattleFinished { outcome, .. } => finished = Some(outcome),
            _ => {}
        }
    }

    // Hero strikes three times; the slime acts in rounds one and two.
    assert_eq!(resolved, vec![HERO, SLIME, HERO, SLIME, HERO]);
    assert_eq!(finished, Some(completion.result.outcome));
}

#[tokio::test]
async fn cancel_ends_battle_as_aborted() {
    let oracles = OracleBundle::standard(SkillCatalog::new());
    let handoff = prepared(duel(10_000, 10_000), &oracles);

    let config = RuntimeConfig {
        turn_delay: Duration::from_secs(60),
        ..RuntimeConfig::default()
    };
    let link = BattleRuntime::builder()
        .config(config)
        .oracles(oracles)
        .launch(handoff)
        .expect("launch");

    link.handle.cancel("player fled").await.expect("cancel sent");
    let handle = link.handle();
    let completion = link.wait().await.expect("completion");

    assert_eq!(completion.result.outcome, BattleOutcome::Aborted);
    assert_eq!(completion.result.reason, "player fled");
    assert!(completion.rewards.is_empty());

    // The worker has exited, so control is back with the caller.
    assert!(matches!(
        handle.query_snapshot().await,
        Err(RuntimeError::CommandChannelClosed)
    ));
}

#[tokio::test]
async fn launch_rejects_state_outside_preparation() {
    let oracles = OracleBundle::standard(SkillCatalog::new());
    let mut state = duel(100, 50);
    state.current_phase = BattlePhase::Execution;

    let error = BattleRuntime::builder()
        .oracles(oracles)
        .launch(EngineHandoff::new(state))
        .err()
        .expect("launch must fail");

    assert!(matches!(
        error,
        RuntimeError::InvalidHandoff {
            phase: BattlePhase::Execution,
            ..
        }
    ));
}

#[tokio::test(start_paused = true)]
async fn declarations_arrive_during_preparation_window() {
    let oracles = OracleBundle::standard(SkillCatalog::new());
    let state = duel(100, 50);

    let config = RuntimeConfig {
        preparation_window: Duration::from_secs(5),
        ..RuntimeConfig::default()
    };
    // Idle handoff: the engine opens the battle itself.
    let link = BattleRuntime::builder()
        .config(config)
        .oracles(oracles)
        .launch(EngineHandoff::new(state))
        .expect("launch");

    let rejected = link
        .handle
        .declare_action(DeclaredAction::new(HERO, UnitAction::attack(UnitId(99))))
        .await;
    assert!(matches!(
        rejected,
        Err(RuntimeError::Rejected(ValidationError::UnknownTarget(UnitId(99))))
    ));

    link.handle
        .declare_action(DeclaredAction::new(HERO, UnitAction::defend()))
        .await
        .expect("hero defends");
    link.handle
        .declare_action(DeclaredAction::new(SLIME, UnitAction::attack(HERO)))
        .await
        .expect("slime attacks");

    let completion = link.wait().await.expect("completion");

    let defended_in_round_one = completion.final_snapshot.log.iter().any(|entry| {
        entry.round == 1 && matches!(entry.kind, LogEntryKind::Defend { unit } if unit == HERO)
    });
    assert!(defended_in_round_one);
    // Later rounds were declared by the frontline provider.
    assert_eq!(completion.result.outcome, BattleOutcome::Victory);
}
