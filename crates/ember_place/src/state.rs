//! Mutable placement state: block locations and grid occupancy.
//!
//! `block_locs` is the primary index (block → location); the grid occupancy
//! is the lazily maintained inverse (location → block), touched only when a
//! move commits. During move evaluation only `block_locs` reflects the
//! tentative positions, so from-scratch cost queries stay consistent.

use crate::error::PlaceError;
use crate::ids::{BlockId, MacroId, PinId};
use crate::macros::PlacementMacro;
use crate::netlist::PlaceNetlist;
use ember_device::{DeviceGrid, Location};
use serde::{Deserialize, Serialize};

/// One relocated block within a proposed move.
#[derive(Clone, Copy, Debug)]
pub struct MovedBlock {
    /// The block being moved.
    pub block: BlockId,
    /// Where it was.
    pub old_loc: Location,
    /// Where it is proposed to go.
    pub new_loc: Location,
}

/// Scratchpad describing the blocks (and, in timing mode, pins) touched by
/// the move currently being evaluated.
///
/// Owned by `try_swap` between the move proposal and the terminating
/// commit/revert; always cleared before control returns to the annealer.
#[derive(Debug, Default)]
pub struct BlocksAffected {
    /// The blocks relocated by this move.
    pub moved: Vec<MovedBlock>,
    /// Sink pins whose connection delay was re-evaluated (filled by the
    /// timing-delta engine).
    pub affected_pins: Vec<PinId>,
}

impl BlocksAffected {
    /// Creates an empty scratchpad.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a block relocation.
    pub fn push(&mut self, block: BlockId, old_loc: Location, new_loc: Location) {
        self.moved.push(MovedBlock {
            block,
            old_loc,
            new_loc,
        });
    }

    /// Whether `block` is one of the moved blocks.
    pub fn contains_block(&self, block: BlockId) -> bool {
        self.moved.iter().any(|m| m.block == block)
    }

    /// Clears both the moved-block list and the affected-pin list.
    pub fn clear(&mut self) {
        self.moved.clear();
        self.affected_pins.clear();
    }
}

/// Occupancy of one grid tile: a block (or empty) per sub-tile slot.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GridSlots {
    /// Occupant of each sub-tile slot.
    pub slots: Vec<Option<BlockId>>,
    /// Count of non-empty slots.
    pub usage: usize,
}

/// The mutable placement state threaded through the annealer.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacerState {
    block_locs: Vec<Location>,
    /// Inverse lookup, indexed `[x][y]`.
    grid_blocks: Vec<Vec<GridSlots>>,
    macros: Vec<PlacementMacro>,
    macro_of: Vec<Option<MacroId>>,
}

impl PlacerState {
    /// Builds the placement state from an initial placement.
    ///
    /// `initial` must give one in-bounds location per block, with no two
    /// blocks sharing a slot; type legality is verified separately by the
    /// placement consistency check.
    pub fn new(
        netlist: &PlaceNetlist,
        grid: &DeviceGrid,
        initial: Vec<Location>,
        macros: Vec<PlacementMacro>,
    ) -> Result<Self, PlaceError> {
        if initial.len() != netlist.block_count() {
            return Err(PlaceError::InitialPlacement(format!(
                "{} locations given for {} blocks",
                initial.len(),
                netlist.block_count()
            )));
        }

        let mut grid_blocks: Vec<Vec<GridSlots>> = (0..grid.width())
            .map(|x| {
                (0..grid.height())
                    .map(|y| GridSlots {
                        slots: vec![None; grid.tile_type_at(x, y).capacity],
                        usage: 0,
                    })
                    .collect()
            })
            .collect();

        for (iblk, &loc) in initial.iter().enumerate() {
            let block = BlockId::from_raw(iblk as u32);
            if loc.x >= grid.width() || loc.y >= grid.height() {
                return Err(PlaceError::InitialPlacement(format!(
                    "block {} placed off-grid at {}",
                    netlist.block(block).name,
                    loc
                )));
            }
            let tile = &mut grid_blocks[loc.x][loc.y];
            if loc.subtile >= tile.slots.len() {
                return Err(PlaceError::InitialPlacement(format!(
                    "block {} placed at {} but the tile has capacity {}",
                    netlist.block(block).name,
                    loc,
                    tile.slots.len()
                )));
            }
            if let Some(other) = tile.slots[loc.subtile] {
                return Err(PlaceError::InitialPlacement(format!(
                    "blocks {} and {} both placed at {}",
                    netlist.block(other).name,
                    netlist.block(block).name,
                    loc
                )));
            }
            tile.slots[loc.subtile] = Some(block);
            tile.usage += 1;
        }

        let mut macro_of = vec![None; netlist.block_count()];
        for m in &macros {
            for member in &m.members {
                macro_of[member.block.index()] = Some(m.id);
            }
        }

        Ok(Self {
            block_locs: initial,
            grid_blocks,
            macros,
            macro_of,
        })
    }

    /// The current location of a block.
    pub fn block_location(&self, block: BlockId) -> Location {
        self.block_locs[block.index()]
    }

    /// All block locations, indexed by block.
    pub fn block_locations(&self) -> &[Location] {
        &self.block_locs
    }

    /// The committed occupant of a grid slot.
    pub fn grid_block(&self, x: usize, y: usize, subtile: usize) -> Option<BlockId> {
        self.grid_blocks[x][y].slots[subtile]
    }

    /// The committed number of occupied sub-tiles at a grid position.
    pub fn usage(&self, x: usize, y: usize) -> usize {
        self.grid_blocks[x][y].usage
    }

    /// All placement macros.
    pub fn macros(&self) -> &[PlacementMacro] {
        &self.macros
    }

    /// The macro containing `block`, if any.
    pub fn macro_of(&self, block: BlockId) -> Option<MacroId> {
        self.macro_of[block.index()]
    }

    /// The macro with the given ID.
    pub fn placement_macro(&self, id: MacroId) -> &PlacementMacro {
        &self.macros[id.index()]
    }

    /// Tentatively applies a move to the primary index only. The grid
    /// inverse is untouched until [`commit_move`](Self::commit_move).
    pub fn apply_move(&mut self, affected: &BlocksAffected) {
        for m in &affected.moved {
            self.block_locs[m.block.index()] = m.new_loc;
        }
    }

    /// Restores the primary index to its pre-move positions.
    pub fn revert_move(&mut self, affected: &BlocksAffected) {
        for m in &affected.moved {
            self.block_locs[m.block.index()] = m.old_loc;
        }
    }

    /// Updates the grid inverse after an accepted move.
    ///
    /// The old slot is released only while it still names the moved block,
    /// so chains of blocks exchanging slots within one move resolve to a
    /// consistent occupancy.
    pub fn commit_move(&mut self, affected: &BlocksAffected) {
        for m in &affected.moved {
            let from = &mut self.grid_blocks[m.old_loc.x][m.old_loc.y];
            if from.slots[m.old_loc.subtile] == Some(m.block) {
                from.slots[m.old_loc.subtile] = None;
                from.usage -= 1;
            }
            let to = &mut self.grid_blocks[m.new_loc.x][m.new_loc.y];
            if to.slots[m.new_loc.subtile].is_none() {
                to.usage += 1;
            }
            to.slots[m.new_loc.subtile] = Some(m.block);
        }
    }

    /// Number of blocks tracked by this state.
    pub fn block_count(&self) -> usize {
        self.block_locs.len()
    }
}
