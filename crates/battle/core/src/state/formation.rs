//! Fixed 3x3 formations, one per side.
//!
//! A unit id occupies at most one cell across both grids combined. All
//! placement goes through [`Formations::place`], which enforces that.

use crate::config::BattleConfig;
use crate::error::InvariantViolation;
use crate::state::{GridPosition, Side, UnitId};

const N: usize = BattleConfig::GRID_SIZE;

#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Formation {
    pub side: Side,
    grid: [[Option<UnitId>; N]; N],
}

impl Formation {
    pub const fn new(side: Side) -> Self {
        Self {
            side,
            grid: [[None; N]; N],
        }
    }

    pub fn unit_at(&self, position: GridPosition) -> Option<UnitId> {
        if !position.is_in_bounds() {
            return None;
        }
        self.grid[position.row as usize][position.col as usize]
    }

    pub fn position_of(&self, unit: UnitId) -> Option<GridPosition> {
        self.cells()
            .find(|(_, occupant)| *occupant == unit)
            .map(|(position, _)| position)
    }

    /// Occupants in lane order: front column first, then by row.
    pub fn units(&self) -> impl Iterator<Item = UnitId> + '_ {
        self.cells().map(|(_, unit)| unit)
    }

    pub fn is_empty(&self) -> bool {
        self.cells().next().is_none()
    }

    fn cells(&self) -> impl Iterator<Item = (GridPosition, UnitId)> + '_ {
        (0..N).flat_map(move |col| {
            (0..N).filter_map(move |row| {
                self.grid[row][col].map(|unit| {
                    (
                        GridPosition {
                            row: row as u8,
                            col: col as u8,
                        },
                        unit,
                    )
                })
            })
        })
    }
}

/// The player and enemy formations of one battle.
#[derive(Clone, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Formations {
    pub player: Formation,
    pub enemy: Formation,
}

impl Default for Formations {
    fn default() -> Self {
        Self {
            player: Formation::new(Side::Player),
            enemy: Formation::new(Side::Enemy),
        }
    }
}

impl Formations {
    pub fn get(&self, side: Side) -> &Formation {
        match side {
            Side::Player => &self.player,
            Side::Enemy => &self.enemy,
        }
    }

    fn get_mut(&mut self, side: Side) -> &mut Formation {
        match side {
            Side::Player => &mut self.player,
            Side::Enemy => &mut self.enemy,
        }
    }

    /// Places a unit, rejecting out-of-bounds cells, occupied cells, and ids
    /// already present in either grid.
    pub fn place(
        &mut self,
        side: Side,
        unit: UnitId,
        position: GridPosition,
    ) -> Result<(), InvariantViolation> {
        if !position.is_in_bounds() {
            return Err(InvariantViolation::PositionOutOfBounds {
                row: position.row,
                col: position.col,
            });
        }
        if self.locate(unit).is_some() {
            return Err(InvariantViolation::DuplicateUnit(unit));
        }
        let formation = self.get_mut(side);
        if let Some(occupant) = formation.unit_at(position) {
            return Err(InvariantViolation::CellOccupied {
                side,
                row: position.row,
                col: position.col,
                occupant,
            });
        }
        formation.grid[position.row as usize][position.col as usize] = Some(unit);
        Ok(())
    }

    /// Clears the cell held by `unit`, returning where it stood.
    pub fn remove(&mut self, unit: UnitId) -> Option<(Side, GridPosition)> {
        let (side, position) = self.locate(unit)?;
        self.get_mut(side).grid[position.row as usize][position.col as usize] = None;
        Some((side, position))
    }

    /// Moves an already placed unit to a new cell on its own side.
    pub fn relocate(&mut self, unit: UnitId, to: GridPosition) -> Result<(), InvariantViolation> {
        let (side, from) = self
            .locate(unit)
            .ok_or(InvariantViolation::NotInFormation(unit))?;
        self.remove(unit);
        if let Err(err) = self.place(side, unit, to) {
            self.get_mut(side).grid[from.row as usize][from.col as usize] = Some(unit);
            return Err(err);
        }
        Ok(())
    }

    pub fn locate(&self, unit: UnitId) -> Option<(Side, GridPosition)> {
        [&self.player, &self.enemy]
            .into_iter()
            .find_map(|formation| formation.position_of(unit).map(|pos| (formation.side, pos)))
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    pub fn is_empty(&self) -> bool {
        self.player.is_empty() && self.enemy.is_empty()
    }
}
