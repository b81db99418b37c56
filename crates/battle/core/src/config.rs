/// Battle configuration constants and tunable parameters.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct BattleConfig {
    /// Round ceiling. A battle whose round counter exceeds this ends in a draw.
    pub max_rounds: u32,

    /// Inclusive upper bound of the random tie-break added to speed when
    /// computing turn order. Zero makes turn order depend on speed alone.
    pub tie_break_max: u32,

    /// Seed for every random roll in the battle. `None` draws a fresh seed
    /// when the battle state is built.
    #[cfg_attr(feature = "serde", serde(default))]
    pub seed: Option<u64>,

    /// Defense bonus (percent of base defense) granted by the defend action.
    pub defend_bonus_percent: i32,

    /// Number of turn-start ticks the defend bonus survives.
    pub defend_duration: u32,

    /// Maximum nesting of passive triggers fired by other passive effects.
    pub max_trigger_depth: u8,
}

impl BattleConfig {
    // ===== compile-time constants used as type parameters =====
    /// Formation grid edge length (rows and columns).
    pub const GRID_SIZE: usize = 3;
    /// Maximum number of units in one battle (two full 3×3 grids).
    pub const MAX_UNITS: usize = 2 * Self::GRID_SIZE * Self::GRID_SIZE;

    // ===== runtime-tunable defaults =====
    pub const DEFAULT_MAX_ROUNDS: u32 = 30;
    pub const DEFAULT_TIE_BREAK_MAX: u32 = 10;
    pub const DEFAULT_DEFEND_BONUS_PERCENT: i32 = 50;
    pub const DEFAULT_DEFEND_DURATION: u32 = 1;
    pub const DEFAULT_MAX_TRIGGER_DEPTH: u8 = 3;

    pub fn new() -> Self {
        Self {
            max_rounds: Self::DEFAULT_MAX_ROUNDS,
            tie_break_max: Self::DEFAULT_TIE_BREAK_MAX,
            seed: None,
            defend_bonus_percent: Self::DEFAULT_DEFEND_BONUS_PERCENT,
            defend_duration: Self::DEFAULT_DEFEND_DURATION,
            max_trigger_depth: Self::DEFAULT_MAX_TRIGGER_DEPTH,
        }
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: u32) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn with_tie_break_max(mut self, tie_break_max: u32) -> Self {
        self.tie_break_max = tie_break_max;
        self
    }
}

impl Default for BattleConfig {
    fn default() -> Self {
        Self::new()
    }
}
