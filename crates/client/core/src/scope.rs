//! Fine-grained change tracking for store updates.

use bitflags::bitflags;

bitflags! {
    /// Tracks which parts of the store changed in one update.
    ///
    /// Widgets skip redrawing sections whose flag is not set.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct UpdateScope: u32 {
        /// Phase marker changed (including the engine-controlled marker).
        const PHASE      = 0b0000_0000_0001;

        /// Round counter advanced.
        const ROUND      = 0b0000_0000_0010;

        /// At least one unit record changed.
        const UNITS      = 0b0000_0000_0100;

        /// Turn order or the unit currently acting changed.
        const TURN_ORDER = 0b0000_0000_1000;

        /// Declared actions changed.
        const ACTIONS    = 0b0000_0001_0000;

        /// Battle log grew or was replaced.
        const LOG        = 0b0000_0010_0000;

        /// Terminal result arrived.
        const RESULT     = 0b0000_0100_0000;

        /// Control moved between store and engine.
        const CONTROL    = 0b0000_1000_0000;

        /// A formation cell changed.
        const FORMATION  = 0b0001_0000_0000;

        /// Everything changed (full rebuild).
        const ALL = Self::PHASE.bits()
                  | Self::ROUND.bits()
                  | Self::UNITS.bits()
                  | Self::TURN_ORDER.bits()
                  | Self::ACTIONS.bits()
                  | Self::LOG.bits()
                  | Self::RESULT.bits()
                  | Self::CONTROL.bits()
                  | Self::FORMATION.bits();
    }
}

impl UpdateScope {
    /// Returns true if the board (units or formation) needs a redraw.
    pub fn has_board_changes(&self) -> bool {
        self.intersects(Self::UNITS | Self::FORMATION)
    }
}

impl Default for UpdateScope {
    fn default() -> Self {
        Self::empty()
    }
}
