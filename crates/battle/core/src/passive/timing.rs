/// Event keys a passive skill can be registered under.
#[derive(
    Clone,
    Copy,
    Debug,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    strum::Display,
    strum::EnumString,
    strum::AsRefStr,
)]
#[strum(serialize_all = "snake_case")]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TriggerTiming {
    TurnStart,
    TurnEnd,
    BeforeAnyAttack,
    AfterAnyAttack,
    BeforeNormalAttack,
    AfterNormalAttack,
    BeforeSkillAttack,
    AfterSkillAttack,
    OnAnyDamage,
    OnPhysicalDamage,
    OnMagicalDamage,
    AfterDamage,
    OnDodge,
    OnCrit,
    OnKill,
    OnDeath,
    BattleStart,
    BattleEnd,
}

/// Whose passives are consulted when a timing fires.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum TriggerScope {
    /// The acting unit (event source).
    Actor,
    /// The unit on the receiving end (event target).
    Target,
    /// Every living unit on the field.
    Everyone,
}

impl TriggerTiming {
    pub const fn scope(self) -> TriggerScope {
        match self {
            Self::TurnStart
            | Self::TurnEnd
            | Self::BeforeAnyAttack
            | Self::AfterAnyAttack
            | Self::BeforeNormalAttack
            | Self::AfterNormalAttack
            | Self::BeforeSkillAttack
            | Self::AfterSkillAttack
            | Self::OnCrit
            | Self::OnKill => TriggerScope::Actor,
            Self::OnAnyDamage
            | Self::OnPhysicalDamage
            | Self::OnMagicalDamage
            | Self::AfterDamage
            | Self::OnDodge
            | Self::OnDeath => TriggerScope::Target,
            Self::BattleStart | Self::BattleEnd => TriggerScope::Everyone,
        }
    }

    /// Timings whose owner may already be defeated when they fire.
    pub const fn fires_for_defeated(self) -> bool {
        matches!(self, Self::OnDeath)
    }
}
