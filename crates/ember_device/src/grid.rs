//! The two-dimensional heterogeneous device grid.
//!
//! The grid is a W×H array of tiles. Each tile has a [`PhysicalTileType`]
//! with a sub-tile capacity (I/O columns and similar resources hold more than
//! one block per tile) and a set of compatible logical block types. The grid
//! is static during placement; block occupancy is tracked by the placer.

use crate::chan::ChannelWidths;
use crate::ids::{LogicalTypeId, PhysicalTypeId};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A placement location: grid coordinates plus a sub-tile slot.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub struct Location {
    /// Column index in the device grid.
    pub x: usize,
    /// Row index in the device grid.
    pub y: usize,
    /// Sub-tile slot within the tile at `(x, y)`.
    pub subtile: usize,
}

impl Location {
    /// Creates a location from its components.
    pub fn new(x: usize, y: usize, subtile: usize) -> Self {
        Self { x, y, subtile }
    }
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {}, {})", self.x, self.y, self.subtile)
    }
}

/// A physical tile type: what a grid position can hold.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PhysicalTileType {
    /// The unique ID of this tile type.
    pub id: PhysicalTypeId,
    /// Human-readable type name (e.g. "clb", "io", "dsp").
    pub name: String,
    /// Number of sub-tile slots, each of which can hold one block.
    pub capacity: usize,
    /// Logical block types that may be placed in this tile's sub-tiles.
    pub compatible: Vec<LogicalTypeId>,
}

impl PhysicalTileType {
    /// Returns whether a block of `logical` type may occupy `subtile` of this
    /// tile type.
    pub fn is_subtile_compatible(&self, logical: LogicalTypeId, subtile: usize) -> bool {
        subtile < self.capacity && self.compatible.contains(&logical)
    }
}

/// A logical block type as seen by the netlist (e.g. a clustered logic block,
/// an I/O pad, a RAM block).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LogicalBlockType {
    /// The unique ID of this logical type.
    pub id: LogicalTypeId,
    /// Human-readable type name.
    pub name: String,
}

/// The device grid: tile types at every position, plus routing channel
/// capacities.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeviceGrid {
    width: usize,
    height: usize,
    tile_types: Vec<PhysicalTileType>,
    logical_types: Vec<LogicalBlockType>,
    /// Tile type at each grid position, indexed `[x][y]`.
    tiles: Vec<Vec<PhysicalTypeId>>,
    chan: ChannelWidths,
}

impl DeviceGrid {
    /// Creates a grid where every tile has the same type.
    ///
    /// `tile_type` becomes type 0; additional types can be registered with
    /// [`add_tile_type`](Self::add_tile_type) and painted onto positions with
    /// [`set_tile`](Self::set_tile).
    pub fn homogeneous(
        width: usize,
        height: usize,
        mut tile_type: PhysicalTileType,
        logical_types: Vec<LogicalBlockType>,
        chan: ChannelWidths,
    ) -> Self {
        assert!(width >= 3 && height >= 3, "grid must fit routing channels");
        tile_type.id = PhysicalTypeId::from_raw(0);
        let tiles = vec![vec![PhysicalTypeId::from_raw(0); height]; width];
        Self {
            width,
            height,
            tile_types: vec![tile_type],
            logical_types,
            tiles,
            chan,
        }
    }

    /// Registers an additional tile type and returns its ID.
    pub fn add_tile_type(&mut self, mut tile_type: PhysicalTileType) -> PhysicalTypeId {
        let id = PhysicalTypeId::from_raw(self.tile_types.len() as u32);
        tile_type.id = id;
        self.tile_types.push(tile_type);
        id
    }

    /// Sets the tile type at a grid position.
    pub fn set_tile(&mut self, x: usize, y: usize, ttype: PhysicalTypeId) {
        self.tiles[x][y] = ttype;
    }

    /// Grid width (number of columns).
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid height (number of rows).
    pub fn height(&self) -> usize {
        self.height
    }

    /// The tile type at `(x, y)`.
    pub fn tile_type_at(&self, x: usize, y: usize) -> &PhysicalTileType {
        &self.tile_types[self.tiles[x][y].index()]
    }

    /// The tile type with the given ID.
    pub fn tile_type(&self, id: PhysicalTypeId) -> &PhysicalTileType {
        &self.tile_types[id.index()]
    }

    /// The logical block type with the given ID.
    pub fn logical_type(&self, id: LogicalTypeId) -> &LogicalBlockType {
        &self.logical_types[id.index()]
    }

    /// All registered logical block types.
    pub fn logical_types(&self) -> &[LogicalBlockType] {
        &self.logical_types
    }

    /// The routing channel capacities of this device.
    pub fn chan(&self) -> &ChannelWidths {
        &self.chan
    }

    /// The largest legal range limit for a displacement move on this grid.
    pub fn max_range_limit(&self) -> f32 {
        (self.width - 1).max(self.height - 1) as f32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_logic_type() -> PhysicalTileType {
        PhysicalTileType {
            id: PhysicalTypeId::from_raw(0),
            name: "clb".into(),
            capacity: 1,
            compatible: vec![LogicalTypeId::from_raw(0)],
        }
    }

    fn make_grid() -> DeviceGrid {
        DeviceGrid::homogeneous(
            6,
            4,
            make_logic_type(),
            vec![LogicalBlockType {
                id: LogicalTypeId::from_raw(0),
                name: "lb".into(),
            }],
            ChannelWidths::uniform(6, 4, 8),
        )
    }

    #[test]
    fn dimensions() {
        let grid = make_grid();
        assert_eq!(grid.width(), 6);
        assert_eq!(grid.height(), 4);
        assert_eq!(grid.max_range_limit(), 5.0);
    }

    #[test]
    fn homogeneous_tile_types() {
        let grid = make_grid();
        for x in 0..6 {
            for y in 0..4 {
                assert_eq!(grid.tile_type_at(x, y).name, "clb");
            }
        }
    }

    #[test]
    fn heterogeneous_tiles() {
        let mut grid = make_grid();
        let io = grid.add_tile_type(PhysicalTileType {
            id: PhysicalTypeId::from_raw(0),
            name: "io".into(),
            capacity: 4,
            compatible: vec![LogicalTypeId::from_raw(1)],
        });
        grid.set_tile(0, 0, io);
        assert_eq!(grid.tile_type_at(0, 0).name, "io");
        assert_eq!(grid.tile_type_at(0, 0).capacity, 4);
        assert_eq!(grid.tile_type_at(1, 0).name, "clb");
    }

    #[test]
    fn subtile_compatibility() {
        let ttype = PhysicalTileType {
            id: PhysicalTypeId::from_raw(0),
            name: "io".into(),
            capacity: 2,
            compatible: vec![LogicalTypeId::from_raw(1)],
        };
        assert!(ttype.is_subtile_compatible(LogicalTypeId::from_raw(1), 0));
        assert!(ttype.is_subtile_compatible(LogicalTypeId::from_raw(1), 1));
        // Out-of-range subtile
        assert!(!ttype.is_subtile_compatible(LogicalTypeId::from_raw(1), 2));
        // Incompatible logical type
        assert!(!ttype.is_subtile_compatible(LogicalTypeId::from_raw(0), 0));
    }

    #[test]
    fn location_display() {
        assert_eq!(format!("{}", Location::new(3, 1, 0)), "(3, 1, 0)");
    }

    #[test]
    #[should_panic(expected = "routing channels")]
    fn rejects_degenerate_grid() {
        DeviceGrid::homogeneous(
            2,
            4,
            make_logic_type(),
            vec![],
            ChannelWidths::uniform(2, 4, 8),
        );
    }

    #[test]
    fn serde_roundtrip() {
        let grid = make_grid();
        let json = serde_json::to_string(&grid).unwrap();
        let back: DeviceGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back.width(), 6);
        assert_eq!(back.tile_type_at(3, 2).name, "clb");
    }
}
