//! Append-only battle log.
//!
//! Entries are typed; the human-readable `message` is rendered from the
//! kind when the entry is pushed so consumers never parse strings.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::passive::TriggerTiming;
use crate::state::{BattleId, BattleOutcome, ControlMode, EffectId, SkillId, UnitId};

/// Why a unit's turn slot produced no action.
#[derive(
    Clone, Copy, Debug, PartialEq, Eq, Hash, strum::Display, strum::EnumString, strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SkipReason {
    Defeated,
    Stunned,
    NoAction,
    NoTarget,
    InsufficientMp,
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum LogEntryKind {
    BattleStart {
        battle_id: BattleId,
    },
    RoundStart {
        turn_order: Vec<UnitId>,
    },
    StatusTick {
        unit: UnitId,
        effect: EffectId,
        /// Signed HP change (negative for damage).
        hp_delta: i64,
        remaining_hp: u32,
    },
    StatusExpired {
        unit: UnitId,
        effect: EffectId,
    },
    StatusApplied {
        unit: UnitId,
        effect: EffectId,
        source: Option<UnitId>,
    },
    TurnSkipped {
        unit: UnitId,
        reason: SkipReason,
    },
    Attack {
        attacker: UnitId,
        target: UnitId,
        damage: u32,
        remaining_hp: u32,
        is_critical: bool,
        skill: Option<SkillId>,
    },
    Dodged {
        attacker: UnitId,
        target: UnitId,
    },
    Defend {
        unit: UnitId,
    },
    SkillUsed {
        unit: UnitId,
        skill: SkillId,
        mp_cost: u32,
    },
    Healed {
        unit: UnitId,
        amount: u32,
        current_hp: u32,
    },
    MpRestored {
        unit: UnitId,
        amount: u32,
        current_mp: u32,
    },
    InsufficientMp {
        unit: UnitId,
        skill: SkillId,
        required: u32,
        available: u32,
    },
    PassiveTriggered {
        unit: UnitId,
        skill: SkillId,
        timing: TriggerTiming,
    },
    UnitDefeated {
        unit: UnitId,
        by: Option<UnitId>,
    },
    Retargeted {
        unit: UnitId,
        from: UnitId,
        to: UnitId,
    },
    BattleEnd {
        outcome: BattleOutcome,
        reason: String,
    },
    /// System marker appended by the store when authority moves.
    ControlTransferred {
        battle_id: BattleId,
        mode: ControlMode,
    },
}

impl LogEntryKind {
    /// Short machine-readable type tag, stable across releases.
    pub const fn tag(&self) -> &'static str {
        match self {
            Self::BattleStart { .. } => "battle_start",
            Self::RoundStart { .. } => "round_start",
            Self::StatusTick { .. } => "status_tick",
            Self::StatusExpired { .. } => "status_expired",
            Self::StatusApplied { .. } => "status_applied",
            Self::TurnSkipped { .. } => "turn_skipped",
            Self::Attack { .. } => "attack",
            Self::Dodged { .. } => "dodged",
            Self::Defend { .. } => "defend",
            Self::SkillUsed { .. } => "skill_used",
            Self::Healed { .. } => "healed",
            Self::MpRestored { .. } => "mp_restored",
            Self::InsufficientMp { .. } => "insufficient_mp",
            Self::PassiveTriggered { .. } => "passive_triggered",
            Self::UnitDefeated { .. } => "unit_defeated",
            Self::Retargeted { .. } => "retargeted",
            Self::BattleEnd { .. } => "battle_end",
            Self::ControlTransferred { .. } => "control_transferred",
        }
    }
}

impl fmt::Display for LogEntryKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BattleStart { battle_id } => write!(f, "{battle_id} begins"),
            Self::RoundStart { turn_order } => {
                write!(f, "round starts with {} units in order", turn_order.len())
            }
            Self::StatusTick {
                unit,
                effect,
                hp_delta,
                remaining_hp,
            } => write!(f, "{effect} on {unit}: {hp_delta:+} hp ({remaining_hp} left)"),
            Self::StatusExpired { unit, effect } => write!(f, "{effect} on {unit} wore off"),
            Self::StatusApplied { unit, effect, .. } => write!(f, "{unit} is affected by {effect}"),
            Self::TurnSkipped { unit, reason } => write!(f, "{unit} skips its turn ({reason})"),
            Self::Attack {
                attacker,
                target,
                damage,
                remaining_hp,
                is_critical,
                ..
            } => {
                let crit = if *is_critical { " critical" } else { "" };
                write!(
                    f,
                    "{attacker} deals {damage}{crit} damage to {target} ({remaining_hp} hp left)"
                )
            }
            Self::Dodged { attacker, target } => write!(f, "{target} dodges {attacker}"),
            Self::Defend { unit } => write!(f, "{unit} braces for impact"),
            Self::SkillUsed { unit, skill, mp_cost } => {
                write!(f, "{unit} uses {skill} ({mp_cost} mp)")
            }
            Self::Healed {
                unit,
                amount,
                current_hp,
            } => write!(f, "{unit} recovers {amount} hp ({current_hp})"),
            Self::MpRestored {
                unit,
                amount,
                current_mp,
            } => write!(f, "{unit} recovers {amount} mp ({current_mp})"),
            Self::InsufficientMp {
                unit,
                skill,
                required,
                available,
            } => write!(f, "{unit} lacks mp for {skill} ({available}/{required})"),
            Self::PassiveTriggered { unit, skill, timing } => {
                write!(f, "{unit} triggers {skill} on {timing}")
            }
            Self::UnitDefeated { unit, by: Some(by) } => write!(f, "{unit} is defeated by {by}"),
            Self::UnitDefeated { unit, by: None } => write!(f, "{unit} is defeated"),
            Self::Retargeted { unit, from, to } => {
                write!(f, "{unit} switches target from {from} to {to}")
            }
            Self::BattleEnd { outcome, reason } => write!(f, "battle over: {outcome} ({reason})"),
            Self::ControlTransferred { battle_id, mode } => {
                write!(f, "{battle_id} control transferred to {mode}")
            }
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct LogEntry {
    pub id: u64,
    pub timestamp: DateTime<Utc>,
    pub round: u32,
    pub message: String,
    pub kind: LogEntryKind,
}

/// Append-only log. Entry ids are dense and monotonically increasing.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleLog {
    entries: Vec<LogEntry>,
    next_id: u64,
}

impl BattleLog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rebuilds a log from entries received elsewhere. Later pushes continue
    /// after the highest id present.
    pub fn from_entries(entries: Vec<LogEntry>) -> Self {
        let next_id = entries.iter().map(|entry| entry.id + 1).max().unwrap_or(0);
        Self { entries, next_id }
    }

    pub fn push(&mut self, round: u32, kind: LogEntryKind) -> &LogEntry {
        let entry = LogEntry {
            id: self.next_id,
            timestamp: Utc::now(),
            round,
            message: kind.to_string(),
            kind,
        };
        self.next_id += 1;
        self.entries.push(entry);
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    /// Entries appended after the entry with `id`.
    pub fn since(&self, id: u64) -> &[LogEntry] {
        let start = self.entries.partition_point(|entry| entry.id <= id);
        &self.entries[start..]
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn last(&self) -> Option<&LogEntry> {
        self.entries.last()
    }

    pub fn iter(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_dense_and_messages_rendered() {
        let mut log = BattleLog::new();
        log.push(1, LogEntryKind::Defend { unit: UnitId(4) });
        log.push(
            1,
            LogEntryKind::TurnSkipped {
                unit: UnitId(5),
                reason: SkipReason::Stunned,
            },
        );
        let ids: Vec<_> = log.iter().map(|entry| entry.id).collect();
        assert_eq!(ids, vec![0, 1]);
        assert_eq!(log.entries()[1].message, "#5 skips its turn (stunned)");
        assert_eq!(log.entries()[1].kind.tag(), "turn_skipped");
        assert_eq!(log.since(0).len(), 1);
    }

    #[test]
    fn rebuilt_log_continues_ids() {
        let mut source = BattleLog::new();
        source.push(1, LogEntryKind::Defend { unit: UnitId(1) });
        source.push(1, LogEntryKind::Defend { unit: UnitId(2) });

        let mut copy = BattleLog::from_entries(source.entries().to_vec());
        let id = copy.push(2, LogEntryKind::Defend { unit: UnitId(3) }).id;
        assert_eq!(id, 2);
        assert_eq!(copy.len(), 3);
    }
}
