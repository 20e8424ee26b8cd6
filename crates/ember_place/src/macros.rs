//! Rigid placement macros.
//!
//! A macro is a group of blocks (e.g. a carry chain) whose relative offsets
//! from a head block are invariant: whenever any member moves, every member
//! moves by the same displacement. The head is always member 0 with a zero
//! offset.

use crate::ids::{BlockId, MacroId};
use ember_device::Location;
use serde::{Deserialize, Serialize};

/// A fixed displacement of a macro member from the macro head.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct MacroOffset {
    /// x displacement in tiles.
    pub dx: i32,
    /// y displacement in tiles.
    pub dy: i32,
    /// Sub-tile displacement.
    pub dsub: i32,
}

impl MacroOffset {
    /// Creates an offset from its components.
    pub fn new(dx: i32, dy: i32, dsub: i32) -> Self {
        Self { dx, dy, dsub }
    }

    /// Applies this offset to a head location, returning `None` if any
    /// coordinate would go negative.
    pub fn apply(self, head: Location) -> Option<Location> {
        let x = head.x as i64 + self.dx as i64;
        let y = head.y as i64 + self.dy as i64;
        let subtile = head.subtile as i64 + self.dsub as i64;
        if x < 0 || y < 0 || subtile < 0 {
            return None;
        }
        Some(Location::new(x as usize, y as usize, subtile as usize))
    }
}

/// One member of a placement macro.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct MacroMember {
    /// The member block.
    pub block: BlockId,
    /// The member's fixed offset from the macro head.
    pub offset: MacroOffset,
}

/// A rigid group of blocks placed as a unit.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacementMacro {
    /// The unique ID of this macro.
    pub id: MacroId,
    /// The members; member 0 is the head with a zero offset.
    pub members: Vec<MacroMember>,
}

impl PlacementMacro {
    /// Creates a macro from a head block and the remaining members.
    ///
    /// The head gets offset zero; it must not also appear in `tail`.
    pub fn new(id: MacroId, head: BlockId, tail: Vec<MacroMember>) -> Self {
        let mut members = Vec::with_capacity(1 + tail.len());
        members.push(MacroMember {
            block: head,
            offset: MacroOffset::default(),
        });
        members.extend(tail);
        Self { id, members }
    }

    /// The head block of this macro.
    pub fn head(&self) -> BlockId {
        self.members[0].block
    }

    /// Number of member blocks.
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the macro has no members (never true for a well-formed macro).
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }
}
