//! Asynchronous abstraction for sourcing unit intent.
//!
//! When a round opens under engine control, every living unit that has no
//! declaration by the end of the preparation window gets one from an
//! [`ActionProvider`]. Implementations can wrap AI policies, scripted
//! fixtures, or a remote player.
use async_trait::async_trait;
use battle_core::{BattleState, UnitAction, UnitId};

use super::errors::{Result, RuntimeError};

#[async_trait]
pub trait ActionProvider: Send + Sync {
    /// Provide an action for `unit` based on a read-only view of the battle.
    async fn provide_action(&self, unit: UnitId, state: &BattleState) -> Result<UnitAction>;
}

/// Always defends. Used as the fallback when another provider fails.
pub struct DefendActionProvider;

#[async_trait]
impl ActionProvider for DefendActionProvider {
    async fn provide_action(&self, _unit: UnitId, _state: &BattleState) -> Result<UnitAction> {
        Ok(UnitAction::defend())
    }
}

/// Attacks the first living enemy in lane order, front column first.
///
/// Defends when no enemy is left standing.
pub struct FrontlineActionProvider;

#[async_trait]
impl ActionProvider for FrontlineActionProvider {
    async fn provide_action(&self, unit: UnitId, state: &BattleState) -> Result<UnitAction> {
        let actor = state.unit(unit).ok_or_else(|| RuntimeError::Provider {
            unit,
            message: "unit is not part of the battle".to_string(),
        })?;

        let target = state
            .formations
            .get(actor.side.opponent())
            .units()
            .find(|id| state.unit(*id).is_some_and(|target| target.is_alive()));

        Ok(match target {
            Some(target) => UnitAction::attack(target),
            None => UnitAction::defend(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use battle_core::{ActionType, BattleId, GridPosition, Side, Unit, UnitStats};

    fn unit(id: u32, side: Side, col: u8) -> Unit {
        Unit::new(
            UnitId(id),
            format!("u{id}"),
            side,
            UnitStats::new(50, 10, 5, 5, 0),
            GridPosition { row: 0, col },
        )
        .expect("valid unit")
    }

    #[tokio::test]
    async fn frontline_targets_nearest_living_enemy() {
        let mut state = BattleState::builder(BattleId(1))
            .unit(unit(1, Side::Player, 0))
            .unit(unit(2, Side::Enemy, 0))
            .unit(unit(3, Side::Enemy, 2))
            .build()
            .expect("battle");
        state.unit_mut(UnitId(2)).expect("front").take_damage(50);

        let action = FrontlineActionProvider
            .provide_action(UnitId(1), &state)
            .await
            .expect("action");

        assert_eq!(action, UnitAction::attack(UnitId(3)));
    }

    #[tokio::test]
    async fn defend_provider_always_defends() {
        let state = BattleState::builder(BattleId(1))
            .unit(unit(1, Side::Player, 0))
            .build()
            .expect("battle");

        let action = DefendActionProvider
            .provide_action(UnitId(1), &state)
            .await
            .expect("action");
        assert_eq!(action.action_type, ActionType::Defend);
    }
}
