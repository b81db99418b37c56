use std::collections::BTreeMap;

use crate::env::DamageType;
use crate::state::{ActionType, SkillId, Unit, UnitId};

/// Owned description of an event, built by the pipeline before a timing
/// fires.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TriggerEvent {
    pub source: Option<UnitId>,
    pub target: Option<UnitId>,
    pub damage: Option<u32>,
    pub healing: Option<u32>,
    pub is_critical: bool,
    pub is_skill: bool,
    pub skill_id: Option<SkillId>,
    pub action_type: Option<ActionType>,
    pub damage_type: Option<DamageType>,
    /// Free-form data for content-specific conditions.
    pub extra: BTreeMap<String, i64>,
}

impl TriggerEvent {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn between(source: UnitId, target: UnitId) -> Self {
        Self {
            source: Some(source),
            target: Some(target),
            ..Self::default()
        }
    }

    pub fn from_source(source: UnitId) -> Self {
        Self {
            source: Some(source),
            ..Self::default()
        }
    }
}

/// Borrowed view of an event from the point of view of one passive owner.
#[derive(Clone, Copy, Debug)]
pub struct TriggerContext<'a> {
    /// Owner of the passive being evaluated.
    pub unit: &'a Unit,
    pub source: Option<&'a Unit>,
    pub target: Option<&'a Unit>,
    pub damage: Option<u32>,
    pub healing: Option<u32>,
    pub is_critical: bool,
    pub is_skill: bool,
    pub skill_id: Option<&'a SkillId>,
    pub action_type: Option<ActionType>,
    pub damage_type: Option<DamageType>,
    pub extra: &'a BTreeMap<String, i64>,
}

/// Resolves the event's unit references against the roster.
pub fn create_trigger_context<'a>(
    unit: &'a Unit,
    event: &'a TriggerEvent,
    units: &'a BTreeMap<UnitId, Unit>,
) -> TriggerContext<'a> {
    TriggerContext {
        unit,
        source: event.source.and_then(|id| units.get(&id)),
        target: event.target.and_then(|id| units.get(&id)),
        damage: event.damage,
        healing: event.healing,
        is_critical: event.is_critical,
        is_skill: event.is_skill,
        skill_id: event.skill_id.as_ref(),
        action_type: event.action_type,
        damage_type: event.damage_type,
        extra: &event.extra,
    }
}
