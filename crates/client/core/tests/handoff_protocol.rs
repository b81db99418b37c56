use std::time::Duration;

use tokio::sync::Mutex;

use battle_core::{
    BattleConfig, BattleId, BattleOutcome, BattlePhase, BattleResult, BattleState, ControlMode,
    DeclaredAction, GridPosition, LogEntryKind, ProtocolError, SkillCatalog, Side, Unit,
    UnitAction, UnitId, UnitStats,
};
use battle_runtime::{
    BattleCompletion, BattleSnapshot, OracleBundle, RewardPayload, RuntimeConfig,
};
use client_core::{
    BattleStore, HandoffCoordinator, StoreError, StorePhase, StoreView, UpdateScope,
};

const HERO: UnitId = UnitId(1);
const SLIME: UnitId = UnitId(2);
const BATTLE: BattleId = BattleId(5);

fn unit(id: UnitId, side: Side, hp: u32, attack: u32, speed: u32) -> Unit {
    Unit::new(
        id,
        format!("unit-{}", id.0),
        side,
        UnitStats::new(hp, attack, 10, speed, 0),
        GridPosition::new(0, 0).expect("in bounds"),
    )
    .expect("valid unit")
}

fn battle(hero_hp: u32, slime_hp: u32) -> BattleState {
    BattleState::builder(BATTLE)
        .config(BattleConfig::default().with_seed(21).with_tie_break_max(0))
        .unit(unit(HERO, Side::Player, hero_hp, 30, 10))
        .unit(unit(SLIME, Side::Enemy, slime_hp, 10, 5))
        .build()
        .expect("battle")
}

fn oracles() -> OracleBundle {
    OracleBundle::standard(SkillCatalog::new())
}

/// Store with a started battle and both units declared.
fn prepared_store(hero_hp: u32, slime_hp: u32) -> BattleStore {
    let mut store = BattleStore::new(oracles());
    store
        .start_battle(battle(hero_hp, slime_hp))
        .expect("start");
    store
        .declare_action(DeclaredAction::new(HERO, UnitAction::attack(SLIME)))
        .expect("hero declares");
    store
        .declare_action(DeclaredAction::new(SLIME, UnitAction::attack(HERO)))
        .expect("slime declares");
    store
}

#[test]
fn handoff_clears_store_copies_and_marks_engine_control() {
    let mut store = prepared_store(100, 50);
    let log_before = store.log().len();

    let handoff = store.transfer_control_to_engine().expect("handoff");

    assert_eq!(handoff.battle_id, BATTLE);
    assert_eq!(handoff.state.units.len(), 2);
    assert_eq!(handoff.state.current_phase, BattlePhase::Preparation);

    assert_eq!(store.control_mode(), ControlMode::Engine);
    assert_eq!(store.current_phase(), StorePhase::EngineControlled);
    assert_eq!(store.current_phase().to_string(), "engine_controlled");
    assert!(store.units().is_empty());
    assert!(store.formations().is_empty());
    assert!(store.turn_order().is_empty());
    assert!(store.unit_actions().is_empty());
    assert_eq!(store.view(), StoreView::AwaitingEngine { battle_id: BATTLE });
    assert!(!store.view().shows_units());

    // Exactly one system entry records the transfer.
    assert_eq!(store.log().len(), log_before + 1);
    assert!(matches!(
        store.log().last().expect("entry").kind,
        LogEntryKind::ControlTransferred {
            battle_id: BATTLE,
            mode: ControlMode::Engine
        }
    ));
}

#[test]
fn store_mutations_are_rejected_while_engine_controls() {
    let mut store = prepared_store(100, 50);
    store.transfer_control_to_engine().expect("handoff");

    let declare = store
        .declare_action(DeclaredAction::new(HERO, UnitAction::defend()))
        .expect_err("declare must fail");
    let place = store
        .place_unit(HERO, GridPosition::new(1, 1).expect("in bounds"))
        .expect_err("place must fail");
    let transfer = store
        .transfer_control_to_engine()
        .expect_err("second handoff must fail");
    let start = store
        .start_battle(battle(100, 50))
        .expect_err("start must fail");

    for error in [declare, place, transfer, start] {
        assert!(
            matches!(
                error,
                StoreError::Protocol(ProtocolError::EngineOwnsBattle {
                    battle_id: BATTLE,
                    ..
                })
            ),
            "unexpected error: {error:?}"
        );
    }
}

#[test]
fn snapshots_require_engine_control_and_matching_battle() {
    let mut store = prepared_store(100, 50);
    let snapshot = BattleSnapshot::capture(store.state().expect("store state"), 1);

    let early = store.apply_snapshot(&snapshot).expect_err("store mode");
    assert!(matches!(
        early,
        StoreError::Protocol(ProtocolError::NotEngineControlled {
            mode: ControlMode::Store,
            ..
        })
    ));

    let handoff = store.transfer_control_to_engine().expect("handoff");
    let mut foreign = BattleSnapshot::capture(&handoff.state, 1);
    foreign.battle_id = BattleId(999);

    let error = store.apply_snapshot(&foreign).expect_err("foreign battle");
    assert!(matches!(
        error,
        StoreError::Protocol(ProtocolError::UnknownBattle {
            expected: Some(BATTLE),
            received: BattleId(999),
        })
    ));
}

#[test]
fn snapshots_merge_units_in_place_and_drop_duplicates() {
    let mut store = prepared_store(100, 50);
    let mut engine_state = store.transfer_control_to_engine().expect("handoff").state;

    let first = BattleSnapshot::capture(&engine_state, 1);
    let scope = store.apply_snapshot(&first).expect("first snapshot");
    assert!(scope.contains(UpdateScope::UNITS | UpdateScope::PHASE | UpdateScope::LOG));
    assert!(matches!(store.view(), StoreView::Live { .. }));

    let held: *const Unit = store.unit(HERO).expect("hero mirrored");

    engine_state
        .unit_mut(HERO)
        .expect("hero")
        .take_damage(15);
    let second = BattleSnapshot::capture(&engine_state, 2);
    let scope = store.apply_snapshot(&second).expect("second snapshot");

    assert!(scope.contains(UpdateScope::UNITS));
    let hero = store.unit(HERO).expect("hero mirrored");
    assert_eq!(hero.stats().current_hp, 85);
    assert!(std::ptr::eq(held, hero), "unit record must be merged in place");

    // At-least-once delivery: repeats and stale copies change nothing.
    assert_eq!(store.apply_snapshot(&second).expect("duplicate"), UpdateScope::empty());
    assert_eq!(store.apply_snapshot(&first).expect("stale"), UpdateScope::empty());
    assert_eq!(store.unit(HERO).expect("hero").stats().current_hp, 85);
    assert_eq!(store.last_sequence(), Some(2));
}

#[test]
fn terminal_result_is_accepted_exactly_once() {
    let mut store = prepared_store(100, 50);
    let mut engine_state = store.transfer_control_to_engine().expect("handoff").state;
    engine_state.unit_mut(SLIME).expect("slime").take_damage(50);

    let completion = BattleCompletion {
        battle_id: BATTLE,
        result: BattleResult {
            outcome: BattleOutcome::Victory,
            reason: "all enemies defeated".to_string(),
            round: 1,
        },
        rewards: RewardPayload {
            experience: 12,
            ..RewardPayload::default()
        },
        final_snapshot: BattleSnapshot::capture(&engine_state, 1),
    };

    let scope = store.receive_result(completion.clone()).expect("result");
    assert!(scope.contains(UpdateScope::CONTROL | UpdateScope::RESULT));

    assert_eq!(store.control_mode(), ControlMode::Store);
    assert!(!store.is_active());
    assert_eq!(store.rewards().map(|r| r.experience), Some(12));
    assert_eq!(store.final_units().len(), 2);
    assert!(matches!(store.view(), StoreView::Finished { .. }));

    let error = store.receive_result(completion).expect_err("second result");
    assert!(matches!(
        error,
        StoreError::Protocol(ProtocolError::ResultAlreadyReceived { battle_id: BATTLE })
    ));
}

#[test]
fn snapshot_survives_the_wire() {
    let mut store = prepared_store(100, 50);
    let engine_state = store.transfer_control_to_engine().expect("handoff").state;

    let json = BattleSnapshot::capture(&engine_state, 1)
        .to_json()
        .expect("serialize");
    let decoded = BattleSnapshot::from_json(&json).expect("deserialize");

    store.apply_snapshot(&decoded).expect("apply");
    assert_eq!(store.units().len(), 2);
    assert_eq!(store.round(), 1);
}

#[tokio::test]
async fn coordinator_runs_full_handoff_cycle() {
    let store = Mutex::new(prepared_store(100, 50));
    let coordinator = HandoffCoordinator::new(RuntimeConfig::default(), oracles());

    let session = coordinator.launch(&store).await.expect("launch");
    assert_eq!(
        store.lock().await.current_phase(),
        StorePhase::EngineControlled
    );

    let mut scopes = Vec::new();
    let result = session
        .drive(&store, |scope| scopes.push(scope))
        .await
        .expect("drive");

    assert_eq!(result.outcome, BattleOutcome::Victory);
    assert!(scopes.iter().any(|scope| scope.contains(UpdateScope::UNITS)));
    assert!(scopes.last().is_some_and(|scope| scope.contains(UpdateScope::CONTROL)));

    let store = store.lock().await;
    assert_eq!(store.control_mode(), ControlMode::Store);
    assert!(!store.is_active());
    assert_eq!(store.result(), Some(&result));
    let slime = store
        .final_units()
        .iter()
        .find(|unit| unit.id == SLIME)
        .expect("slime in final units");
    assert!(slime.is_defeated());
    assert!(matches!(
        store.log().last().expect("entry").kind,
        LogEntryKind::ControlTransferred {
            mode: ControlMode::Store,
            ..
        }
    ));
}

#[tokio::test]
async fn cancel_travels_through_engine() {
    let store = Mutex::new(prepared_store(10_000, 10_000));
    let config = RuntimeConfig {
        turn_delay: Duration::from_secs(60),
        ..RuntimeConfig::default()
    };
    let coordinator = HandoffCoordinator::new(config, oracles());

    let session = coordinator.launch(&store).await.expect("launch");
    session.cancel(&store, "player fled").await.expect("cancel");

    // The engine still owns the battle until it acknowledges.
    assert_eq!(store.lock().await.control_mode(), ControlMode::Engine);

    let result = session.drive(&store, |_| {}).await.expect("drive");
    assert_eq!(result.outcome, BattleOutcome::Aborted);
    assert_eq!(result.reason, "player fled");

    let store = store.lock().await;
    assert_eq!(store.control_mode(), ControlMode::Store);
    assert!(matches!(store.view(), StoreView::Finished { .. }));
}
