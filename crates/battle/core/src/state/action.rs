//! Declared per-unit actions.
//!
//! One [`UnitAction`] is declared per living unit during preparation and
//! consumed exactly once during execution.

use std::collections::BTreeMap;

use crate::env::SkillOracle;
use crate::error::ValidationError;
use crate::state::{SkillId, Unit, UnitId};

#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ActionType {
    Attack,
    Defend,
    Skill,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct UnitAction {
    pub action_type: ActionType,
    pub target_ids: Vec<UnitId>,
    pub skill_id: Option<SkillId>,
}

impl UnitAction {
    pub fn attack(target: UnitId) -> Self {
        Self {
            action_type: ActionType::Attack,
            target_ids: vec![target],
            skill_id: None,
        }
    }

    pub fn defend() -> Self {
        Self {
            action_type: ActionType::Defend,
            target_ids: Vec::new(),
            skill_id: None,
        }
    }

    pub fn skill(skill: impl Into<SkillId>, targets: Vec<UnitId>) -> Self {
        Self {
            action_type: ActionType::Skill,
            target_ids: targets,
            skill_id: Some(skill.into()),
        }
    }

    /// Checks the declaration against the current roster and skill catalog.
    ///
    /// Targets that are already defeated are accepted here; the pipeline
    /// retargets them at execution time.
    pub fn validate(
        &self,
        unit_id: UnitId,
        units: &BTreeMap<UnitId, Unit>,
        skills: &dyn SkillOracle,
    ) -> Result<(), ValidationError> {
        let unit = units
            .get(&unit_id)
            .ok_or(ValidationError::UnknownUnit(unit_id))?;
        if unit.is_defeated() {
            return Err(ValidationError::UnitDefeated(unit_id));
        }

        if let Some(unknown) = self.target_ids.iter().find(|id| !units.contains_key(*id)) {
            return Err(ValidationError::UnknownTarget(*unknown));
        }

        match self.action_type {
            ActionType::Attack if self.target_ids.is_empty() => {
                Err(ValidationError::MissingTargets { unit: unit_id })
            }
            ActionType::Attack | ActionType::Defend => Ok(()),
            ActionType::Skill => {
                let skill = self
                    .skill_id
                    .as_ref()
                    .ok_or(ValidationError::MissingSkill { unit: unit_id })?;
                if skills.skill(skill).is_none() {
                    return Err(ValidationError::UnknownSkill {
                        skill: skill.clone(),
                    });
                }
                if !unit.knows_skill(skill) {
                    return Err(ValidationError::SkillNotLearned {
                        unit: unit_id,
                        skill: skill.clone(),
                    });
                }
                Ok(())
            }
        }
    }
}

/// A declaration as it travels from the store to the engine.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct DeclaredAction {
    pub unit_id: UnitId,
    pub action: UnitAction,
}

impl DeclaredAction {
    pub fn new(unit_id: UnitId, action: UnitAction) -> Self {
        Self { unit_id, action }
    }
}
