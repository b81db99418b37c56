//! RNG oracle for deterministic random number generation.
//!
//! The oracle is stateless: every roll derives a one-off seed from the
//! battle seed and a draw cursor kept in [`crate::state::RngState`]. Fixing
//! the battle seed therefore makes turn-order tie-breaks, trigger probability
//! rolls, and crit/dodge checks fully reproducible, while an unseeded battle
//! draws a fresh seed and behaves randomly.

use crate::state::{RngState, UnitId};

/// RNG oracle for deterministic random number generation.
///
/// Implementations must be deterministic and produce the same values
/// given the same seed.
pub trait RngOracle: Send + Sync {
    /// Generate a random u32 value from a seed.
    fn next_u32(&self, seed: u64) -> u32;

    /// Generate a random value in range [min, max] inclusive.
    fn range(&self, seed: u64, min: u32, max: u32) -> u32 {
        if min >= max {
            return min;
        }
        let span = u64::from(max - min) + 1;
        min + (u64::from(self.next_u32(seed)) % span) as u32
    }

    /// Uniform draw in `[0, 1)`.
    fn unit_interval(&self, seed: u64) -> f64 {
        f64::from(self.next_u32(seed)) / (f64::from(u32::MAX) + 1.0)
    }
}

/// PCG random number generator (PCG-XSH-RR, 64-bit state, 32-bit output).
#[derive(Clone, Copy, Debug, Default)]
pub struct PcgRng;

impl PcgRng {
    const MULTIPLIER: u64 = 6364136223846793005;
    const INCREMENT: u64 = 1442695040888963407;

    #[inline]
    fn pcg_step(state: u64) -> u64 {
        state
            .wrapping_mul(Self::MULTIPLIER)
            .wrapping_add(Self::INCREMENT)
    }

    #[inline]
    fn pcg_output(state: u64) -> u32 {
        let xorshifted = (((state >> 18) ^ state) >> 27) as u32;
        let rot = (state >> 59) as u32;
        xorshifted.rotate_right(rot)
    }
}

impl RngOracle for PcgRng {
    fn next_u32(&self, seed: u64) -> u32 {
        Self::pcg_output(Self::pcg_step(seed))
    }
}

/// Mixes the battle seed, draw cursor, acting unit, and roll context into a
/// per-roll seed.
///
/// Use distinct `context` values when one step needs several independent
/// rolls (see [`roll_context`]).
pub fn compute_seed(battle_seed: u64, cursor: u64, actor_id: u32, context: u32) -> u64 {
    let mut hash = battle_seed;
    hash ^= cursor.wrapping_mul(0x9e3779b97f4a7c15);
    hash ^= u64::from(actor_id).wrapping_mul(0x517cc1b727220a95);
    hash ^= u64::from(context).wrapping_mul(0x85ebca6b);

    // avalanche
    hash ^= hash >> 33;
    hash = hash.wrapping_mul(0xff51afd7ed558ccd);
    hash ^= hash >> 33;
    hash
}

/// Context tags passed to [`compute_seed`].
pub mod roll_context {
    pub const TIE_BREAK: u32 = 0;
    pub const CRITICAL: u32 = 1;
    pub const DODGE: u32 = 2;
    pub const TRIGGER: u32 = 3;
}

/// Source of uniform `[0, 1)` draws for probability checks.
pub trait RollSource {
    fn roll_unit(&mut self) -> f64;
}

/// Draws from the battle's seeded RNG on behalf of one unit.
pub struct SeededRolls<'a> {
    oracle: &'a dyn RngOracle,
    state: &'a mut RngState,
    actor: UnitId,
    context: u32,
}

impl<'a> SeededRolls<'a> {
    pub fn new(
        oracle: &'a dyn RngOracle,
        state: &'a mut RngState,
        actor: UnitId,
        context: u32,
    ) -> Self {
        Self {
            oracle,
            state,
            actor,
            context,
        }
    }
}

impl RollSource for SeededRolls<'_> {
    fn roll_unit(&mut self) -> f64 {
        let seed = self.state.next_seed(self.actor, self.context);
        self.oracle.unit_interval(seed)
    }
}

/// Fixed sequence of draws, cycled. Handy for forcing outcomes in tests and
/// tools.
#[derive(Clone, Debug)]
pub struct ScriptedRolls {
    values: Vec<f64>,
    next: usize,
}

impl ScriptedRolls {
    pub fn new(values: impl Into<Vec<f64>>) -> Self {
        Self {
            values: values.into(),
            next: 0,
        }
    }
}

impl RollSource for ScriptedRolls {
    fn roll_unit(&mut self) -> f64 {
        if self.values.is_empty() {
            return 0.0;
        }
        let value = self.values[self.next % self.values.len()];
        self.next += 1;
        value
    }
}
