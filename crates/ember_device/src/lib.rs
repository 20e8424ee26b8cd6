//! Device grid and channel model for the ember placement engine.
//!
//! This crate defines the static picture of the target device that the
//! placer optimizes against: a two-dimensional heterogeneous grid of tiles
//! ([`DeviceGrid`]), the tile and logical block type system
//! ([`PhysicalTileType`], [`LogicalBlockType`]), placement coordinates
//! ([`Location`]), and routing channel capacities ([`ChannelWidths`]).
//!
//! Nothing here changes during annealing; block occupancy and costs live in
//! `ember_place`.

#![warn(missing_docs)]

pub mod chan;
pub mod grid;
pub mod ids;

pub use chan::ChannelWidths;
pub use grid::{DeviceGrid, Location, LogicalBlockType, PhysicalTileType};
pub use ids::{LogicalTypeId, PhysicalTypeId};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reexports_available() {
        let _ = Location::new(1, 1, 0);
        let _ = ChannelWidths::uniform(4, 4, 8);
        let _ = PhysicalTypeId::from_raw(0);
        let _ = LogicalTypeId::from_raw(0);
    }
}
