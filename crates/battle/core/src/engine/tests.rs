use super::*;
use crate::config::BattleConfig;
use crate::env::{
    PcgRng, SkillCatalog, SkillDefinition, SkillEffect, SkillTarget, StandardDamageTable,
};
use crate::passive::{EffectTarget, PassiveEffect, PassiveSkill};
use crate::state::{
    BattleId, GridPosition, LogEntryKind, Side, StatKind, StatusEffect, Unit, UnitStats,
};

const A: UnitId = UnitId(1);
const B: UnitId = UnitId(2);
const C: UnitId = UnitId(3);

fn unit(id: UnitId, side: Side, row: u8, col: u8, stats: UnitStats) -> Unit {
    Unit::new(
        id,
        format!("unit-{}", id.0),
        side,
        stats,
        GridPosition::new(row, col).unwrap(),
    )
    .unwrap()
}

fn config() -> BattleConfig {
    BattleConfig::default().with_seed(11).with_tie_break_max(0)
}

fn duel() -> BattleState {
    BattleState::builder(BattleId(1))
        .config(config())
        .unit(unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 10, 0)))
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(50, 10, 10, 5, 0)))
        .build()
        .unwrap()
}

fn env<'a>(catalog: &'a SkillCatalog, damage: &'a StandardDamageTable) -> BattleEnv<'a> {
    BattleEnv::new(damage, catalog, &PcgRng)
}

fn declare(engine: &mut BattleEngine<'_>, unit: UnitId, action: UnitAction) {
    engine
        .declare_action(DeclaredAction::new(unit, action))
        .unwrap();
}

fn hits_on(state: &BattleState, target: UnitId) -> Vec<u32> {
    state
        .battle_log
        .iter()
        .filter_map(|entry| match &entry.kind {
            LogEntryKind::Attack {
                target: t,
                remaining_hp,
                ..
            } if *t == target => Some(*remaining_hp),
            _ => None,
        })
        .collect()
}

#[test]
fn start_enters_preparation_with_round_start_entry() {
    let mut state = duel();
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    assert_eq!(engine.start(), Err(PhaseError::UnexpectedPhase {
        expected: BattlePhase::Idle,
        actual: BattlePhase::Preparation,
    }));

    assert_eq!(state.current_phase, BattlePhase::Preparation);
    assert_eq!(state.current_round, 1);
    assert_eq!(state.turn_order.as_slice(), &[A, B]);
    assert_eq!(state.battle_log.last().unwrap().kind.tag(), "round_start");
}

#[test]
fn execution_requires_every_living_unit_to_declare() {
    let mut state = duel();
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::attack(B));

    assert_eq!(
        engine.begin_execution(),
        Err(PhaseError::ActionsPending { pending: vec![B] })
    );
    declare(&mut engine, B, UnitAction::defend());
    engine.begin_execution().unwrap();
    assert!(engine.declare_action(DeclaredAction::new(A, UnitAction::defend())).is_err());
}

#[test]
fn three_attacks_defeat_the_last_enemy() {
    let mut state = duel();
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();

    for _ in 0..3 {
        if engine.state().is_over() {
            break;
        }
        declare(&mut engine, A, UnitAction::attack(B));
        declare(&mut engine, B, UnitAction::attack(A));
        engine.execute_round().unwrap();
    }

    assert_eq!(hits_on(&state, B), vec![30, 10, 0]);
    assert!(state.unit(B).unwrap().is_defeated());
    let result = state.result.as_ref().unwrap();
    assert_eq!(result.outcome, BattleOutcome::Victory);
    assert_eq!(result.round, 3);
    assert_eq!(state.current_phase, BattlePhase::BattleOver);
    // B died before its third turn and never struck back that round.
    assert_eq!(hits_on(&state, A), vec![99, 98]);
}

#[test]
fn turn_order_excludes_defeated_units() {
    let mut state = BattleState::builder(BattleId(2))
        .config(BattleConfig::default().with_seed(5))
        .unit(unit(A, Side::Player, 0, 0, UnitStats::new(10, 1, 1, 3, 0)))
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(10, 1, 1, 9, 0)))
        .unit(unit(C, Side::Enemy, 1, 0, UnitStats::new(10, 1, 1, 6, 0)))
        .build()
        .unwrap();
    state.unit_mut(C).unwrap().take_damage(10);

    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    for _ in 0..50 {
        let order = engine.calculate_turn_order();
        assert_eq!(order.len(), 2);
        assert!(!order.contains(&C));
    }
}

#[test]
fn stunned_unit_skips_its_slot() {
    let mut state = duel();
    state
        .unit_mut(A)
        .unwrap()
        .add_status_effect(StatusEffect::stun("stun", 1));
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();

    // Round 1: the stun has not ticked yet.
    declare(&mut engine, A, UnitAction::attack(B));
    declare(&mut engine, B, UnitAction::defend());
    let round = engine.execute_round().unwrap();
    assert!(round.turns.iter().all(TurnOutcome::acted));

    // Round 2: the stun ticks at round start and A loses its slot.
    declare(&mut engine, A, UnitAction::attack(B));
    declare(&mut engine, B, UnitAction::defend());
    let round = engine.execute_round().unwrap();
    assert_eq!(round.turns[0].skipped, Some(SkipReason::Stunned));
    assert!(state.unit_actions.is_empty());
}

#[test]
fn insufficient_mp_turns_skill_into_no_op() {
    let mut state = BattleState::builder(BattleId(3))
        .config(config())
        .unit(
            unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 10, 10))
                .with_skill("meteor"),
        )
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(50, 10, 10, 5, 0)))
        .build()
        .unwrap();
    let catalog = SkillCatalog::new().with_skill(SkillDefinition::new(
        "meteor",
        "Meteor",
        50,
        SkillTarget::Enemy,
        SkillEffect::Damage { power_percent: 300 },
    ));
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::skill("meteor", vec![B]));
    declare(&mut engine, B, UnitAction::defend());

    let round = engine.execute_round().unwrap();
    assert_eq!(round.turns[0].skipped, Some(SkipReason::InsufficientMp));
    assert!(round.battle_over.is_none());
    assert_eq!(state.unit(A).unwrap().stats().current_mp, 10);
    assert_eq!(state.unit(B).unwrap().stats().current_hp, 50);
    assert!(
        state
            .battle_log
            .iter()
            .any(|entry| entry.kind.tag() == "insufficient_mp")
    );
}

#[test]
fn skill_spends_mp_and_applies_status() {
    let mut state = BattleState::builder(BattleId(3))
        .config(config())
        .unit(
            unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 10, 20))
                .with_skill("venom"),
        )
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(50, 10, 10, 5, 0)))
        .build()
        .unwrap();
    let catalog = SkillCatalog::new().with_skill(SkillDefinition::new(
        "venom",
        "Venom",
        5,
        SkillTarget::Enemy,
        SkillEffect::ApplyStatus(StatusEffect::poison("poison", 10, 3)),
    ));
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::skill("venom", vec![B]));
    declare(&mut engine, B, UnitAction::defend());
    engine.execute_round().unwrap();

    let b = state.unit(B).unwrap();
    assert_eq!(state.unit(A).unwrap().stats().current_mp, 15);
    // Poison ticked once at the start of round 2.
    assert_eq!(b.stats().current_hp, 40);
    assert_eq!(b.status_effect(&"poison".into()).unwrap().source, Some(A));
}

#[test]
fn defend_raises_defense_until_next_round() {
    let mut state = duel();
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::defend());
    declare(&mut engine, B, UnitAction::attack(A));
    engine.execute_round().unwrap();

    // 10 attack vs 15 defense still deals the minimum of 1.
    assert_eq!(hits_on(&state, A), vec![99]);
    assert_eq!(state.unit(A).unwrap().modified_attribute(StatKind::Defense), 10);
    assert!(state.unit(A).unwrap().active_status_effects().next().is_none());
}

#[test]
fn thorns_passive_reflects_damage_to_attacker() {
    let mut state = BattleState::builder(BattleId(4))
        .config(config())
        .unit(unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 10, 0)))
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(50, 10, 10, 5, 0)).with_passive("thorns"))
        .build()
        .unwrap();
    let catalog = SkillCatalog::new().with_passive(
        PassiveSkill::new(
            "thorns",
            "Thorns",
            TriggerTiming::AfterDamage,
            PassiveEffect::DealDamage { amount: 5 },
        )
        .targeting(EffectTarget::Source),
    );
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::attack(B));
    declare(&mut engine, B, UnitAction::defend());
    engine.execute_round().unwrap();

    assert_eq!(state.unit(A).unwrap().stats().current_hp, 95);
    assert!(state.battle_log.iter().any(|entry| matches!(
        &entry.kind,
        LogEntryKind::PassiveTriggered { unit, timing: TriggerTiming::AfterDamage, .. } if *unit == B
    )));
}

#[test]
fn mutual_retaliation_stops_at_depth_limit() {
    let thorns = PassiveSkill::new(
        "thorns",
        "Thorns",
        TriggerTiming::AfterDamage,
        PassiveEffect::DealDamage { amount: 1 },
    )
    .targeting(EffectTarget::Source);
    let mut state = BattleState::builder(BattleId(5))
        .config(config())
        .unit(unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 10, 0)).with_passive("thorns"))
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(100, 10, 10, 5, 0)).with_passive("thorns"))
        .build()
        .unwrap();
    let catalog = SkillCatalog::new().with_passive(thorns);
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::attack(B));
    declare(&mut engine, B, UnitAction::defend());
    engine.execute_round().unwrap();

    let triggered = state
        .battle_log
        .iter()
        .filter(|entry| entry.kind.tag() == "passive_triggered")
        .count();
    assert_eq!(triggered, usize::from(BattleConfig::DEFAULT_MAX_TRIGGER_DEPTH));
}

#[test]
fn dead_declared_target_is_retargeted_to_front_lane() {
    let mut state = BattleState::builder(BattleId(6))
        .config(config())
        .unit(unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 10, 0)))
        .unit(unit(UnitId(4), Side::Player, 1, 0, UnitStats::new(100, 30, 10, 8, 0)))
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(10, 10, 10, 5, 0)))
        .unit(unit(C, Side::Enemy, 2, 1, UnitStats::new(50, 10, 10, 4, 0)))
        .build()
        .unwrap();
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::attack(B));
    declare(&mut engine, UnitId(4), UnitAction::attack(B));
    declare(&mut engine, B, UnitAction::defend());
    declare(&mut engine, C, UnitAction::defend());
    engine.execute_round().unwrap();

    assert!(state.unit(B).unwrap().is_defeated());
    assert_eq!(state.unit(C).unwrap().stats().current_hp, 30);
    assert!(state.battle_log.iter().any(|entry| matches!(
        entry.kind,
        LogEntryKind::Retargeted { from, to, .. } if from == B && to == C
    )));
}

#[test]
fn round_ceiling_ends_in_draw() {
    let mut state = duel();
    state.config.max_rounds = 1;
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::defend());
    declare(&mut engine, B, UnitAction::defend());
    let round = engine.execute_round().unwrap();

    assert_eq!(round.battle_over, Some(BattleOutcome::Draw));
    assert_eq!(
        engine.execute_next_turn(),
        Err(PhaseError::BattleOver)
    );
}

#[test]
fn poison_kill_at_round_start_credits_source() {
    let mut state = duel();
    state
        .unit_mut(B)
        .unwrap()
        .add_status_effect(StatusEffect::poison("poison", 50, 2).with_source(A));
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::defend());
    declare(&mut engine, B, UnitAction::defend());
    let round = engine.execute_round().unwrap();

    assert_eq!(round.battle_over, Some(BattleOutcome::Victory));
    assert!(state.battle_log.iter().any(|entry| matches!(
        entry.kind,
        LogEntryKind::UnitDefeated { unit, by: Some(by) } if unit == B && by == A
    )));
}

#[test]
fn abort_is_terminal_and_idempotent() {
    let mut state = duel();
    let catalog = SkillCatalog::new();
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    assert!(engine.abort("player fled"));
    assert!(!engine.abort("again"));

    let result = state.result.as_ref().unwrap();
    assert_eq!(result.outcome, BattleOutcome::Aborted);
    assert_eq!(result.reason, "player fled");
    assert_eq!(state.current_phase, BattlePhase::BattleOver);
}

#[test]
fn actor_killed_by_own_turn_start_passive_is_skipped() {
    let mut state = BattleState::builder(BattleId(7))
        .config(config())
        .unit(
            unit(A, Side::Player, 0, 0, UnitStats::new(20, 30, 10, 10, 0))
                .with_passive("blood_pact"),
        )
        .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(50, 10, 10, 5, 0)))
        .build()
        .unwrap();
    let catalog = SkillCatalog::new().with_passive(PassiveSkill::new(
        "blood_pact",
        "Blood Pact",
        TriggerTiming::TurnStart,
        PassiveEffect::DealDamage { amount: 50 },
    ));
    let damage = StandardDamageTable::new();
    let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
    engine.start().unwrap();
    declare(&mut engine, A, UnitAction::attack(B));
    declare(&mut engine, B, UnitAction::defend());
    engine.begin_execution().unwrap();

    let outcome = engine.execute_next_turn().unwrap();
    assert_eq!(outcome.unit, A);
    assert_eq!(outcome.skipped, Some(SkipReason::Defeated));
    assert!(!outcome.acted());
    assert_eq!(outcome.battle_over, Some(BattleOutcome::Defeat));

    assert!(hits_on(&state, B).is_empty());
    assert!(state.battle_log.iter().any(|entry| matches!(
        entry.kind,
        LogEntryKind::TurnSkipped { unit, reason: SkipReason::Defeated } if unit == A
    )));
}

#[test]
fn battle_end_passives_fire_on_victory_but_not_on_abort() {
    fn run(abort: bool) -> bool {
        let mut state = BattleState::builder(BattleId(6))
            .config(config())
            .unit(
                unit(A, Side::Player, 0, 0, UnitStats::new(100, 60, 10, 10, 0))
                    .with_passive("second_wind"),
            )
            .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(50, 10, 10, 5, 0)))
            .build()
            .unwrap();
        let catalog = SkillCatalog::new().with_passive(PassiveSkill::new(
            "second_wind",
            "Second Wind",
            TriggerTiming::BattleEnd,
            PassiveEffect::Heal { amount: 5 },
        ));
        let damage = StandardDamageTable::new();
        let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
        engine.start().unwrap();
        if abort {
            engine.abort("player fled");
        } else {
            declare(&mut engine, A, UnitAction::attack(B));
            declare(&mut engine, B, UnitAction::defend());
            engine.execute_round().unwrap();
        }
        state.battle_log.iter().any(|entry| {
            matches!(
                entry.kind,
                LogEntryKind::PassiveTriggered { timing: TriggerTiming::BattleEnd, .. }
            )
        })
    }

    assert!(run(false));
    assert!(!run(true));
}

#[test]
fn same_seed_replays_identically() {
    fn run() -> Vec<LogEntryKind> {
        let mut state = BattleState::builder(BattleId(7))
            .config(BattleConfig::default().with_seed(1234))
            .unit(unit(A, Side::Player, 0, 0, UnitStats::new(100, 30, 10, 5, 0)))
            .unit(unit(B, Side::Enemy, 0, 0, UnitStats::new(100, 25, 10, 5, 0)))
            .build()
            .unwrap();
        let catalog = SkillCatalog::new();
        let damage = StandardDamageTable::new().with_crit_chance(0.3).with_dodge_chance(0.2);
        let mut engine = BattleEngine::new(&mut state, env(&catalog, &damage));
        engine.start().unwrap();
        while !engine.state().is_over() {
            declare(&mut engine, A, UnitAction::attack(B));
            declare(&mut engine, B, UnitAction::attack(A));
            engine.execute_round().unwrap();
        }
        state.battle_log.iter().map(|entry| entry.kind.clone()).collect()
    }

    assert_eq!(run(), run());
}
