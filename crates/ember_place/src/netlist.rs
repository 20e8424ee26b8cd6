//! The clustered netlist as the placer sees it.
//!
//! Blocks, nets, and pins are stored in flat arenas indexed by the dense IDs
//! from [`crate::ids`]. Each net's pin list starts with its driver (index 0),
//! followed by its sinks (indices 1..), matching how per-connection cost
//! arrays are laid out. Nets flagged as ignored (global signals such as
//! clocks) contribute nothing to placement cost.
//!
//! All adjacency is fixed before annealing starts; the netlist is read-only
//! inside the optimizer.

use crate::ids::{BlockId, NetId, PinId};
use ember_device::LogicalTypeId;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Whether a pin drives its net or is driven by it.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug, Serialize, Deserialize)]
pub enum PinKind {
    /// The single source of the net.
    Driver,
    /// A destination of the net.
    Sink,
}

/// A placeable logical unit (a pre-clustered logic block).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceBlock {
    /// The unique ID of this block.
    pub id: BlockId,
    /// Human-readable block name.
    pub name: String,
    /// The logical block type, which constrains where it may be placed.
    pub logical_type: LogicalTypeId,
    /// All pins on this block, in block-pin-index order.
    pub pins: Vec<PinId>,
}

/// A net: one driver pin plus zero or more sink pins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceNet {
    /// The unique ID of this net.
    pub id: NetId,
    /// Human-readable net name.
    pub name: String,
    /// Pins on this net; index 0 is the driver, 1.. are the sinks.
    pub pins: Vec<PinId>,
    /// Ignored nets (global signals) contribute no placement cost.
    pub is_ignored: bool,
}

/// A pin connecting one block to one net.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct PlacePin {
    /// The unique ID of this pin.
    pub id: PinId,
    /// Driver or sink.
    pub kind: PinKind,
    /// The block this pin belongs to.
    pub block: BlockId,
    /// The net this pin connects to.
    pub net: NetId,
    /// Position of this pin within its net's pin list.
    pub net_index: usize,
    /// Position of this pin within its block's pin list; this is the pin
    /// index handed to the delay model.
    pub block_pin_index: usize,
}

/// The placement netlist: flat arenas of blocks, nets, and pins.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlaceNetlist {
    /// All blocks.
    pub blocks: Vec<PlaceBlock>,
    /// All nets.
    pub nets: Vec<PlaceNet>,
    /// All pins.
    pub pins: Vec<PlacePin>,
    /// Auxiliary index: block name to ID (rebuilt on deserialization).
    #[serde(skip)]
    block_by_name: HashMap<String, BlockId>,
    /// Auxiliary index: net name to ID (rebuilt on deserialization).
    #[serde(skip)]
    net_by_name: HashMap<String, NetId>,
}

impl PlaceNetlist {
    /// Creates an empty netlist.
    pub fn new() -> Self {
        Self {
            blocks: Vec::new(),
            nets: Vec::new(),
            pins: Vec::new(),
            block_by_name: HashMap::new(),
            net_by_name: HashMap::new(),
        }
    }

    /// Adds a block of the given logical type and returns its ID.
    pub fn add_block(&mut self, name: impl Into<String>, logical_type: LogicalTypeId) -> BlockId {
        let id = BlockId::from_raw(self.blocks.len() as u32);
        let name = name.into();
        self.block_by_name.insert(name.clone(), id);
        self.blocks.push(PlaceBlock {
            id,
            name,
            logical_type,
            pins: Vec::new(),
        });
        id
    }

    /// Adds a net driven by `driver` with the given sink blocks, creating one
    /// pin per connection. Returns the net's ID.
    pub fn add_net(
        &mut self,
        name: impl Into<String>,
        driver: BlockId,
        sinks: &[BlockId],
    ) -> NetId {
        let net_id = NetId::from_raw(self.nets.len() as u32);
        let name = name.into();
        self.net_by_name.insert(name.clone(), net_id);

        let mut net_pins = Vec::with_capacity(1 + sinks.len());
        net_pins.push(self.add_pin(PinKind::Driver, driver, net_id, 0));
        for (i, &sink) in sinks.iter().enumerate() {
            net_pins.push(self.add_pin(PinKind::Sink, sink, net_id, 1 + i));
        }

        self.nets.push(PlaceNet {
            id: net_id,
            name,
            pins: net_pins,
            is_ignored: false,
        });
        net_id
    }

    fn add_pin(&mut self, kind: PinKind, block: BlockId, net: NetId, net_index: usize) -> PinId {
        let id = PinId::from_raw(self.pins.len() as u32);
        let block_pin_index = self.blocks[block.index()].pins.len();
        self.blocks[block.index()].pins.push(id);
        self.pins.push(PlacePin {
            id,
            kind,
            block,
            net,
            net_index,
            block_pin_index,
        });
        id
    }

    /// Marks a net as ignored: it will contribute no placement cost.
    pub fn mark_ignored(&mut self, net: NetId) {
        self.nets[net.index()].is_ignored = true;
    }

    /// Returns the block with the given ID.
    pub fn block(&self, id: BlockId) -> &PlaceBlock {
        &self.blocks[id.index()]
    }

    /// Returns the net with the given ID.
    pub fn net(&self, id: NetId) -> &PlaceNet {
        &self.nets[id.index()]
    }

    /// Returns the pin with the given ID.
    pub fn pin(&self, id: PinId) -> &PlacePin {
        &self.pins[id.index()]
    }

    /// Returns the pin at position `ipin` of the net (0 is the driver).
    pub fn net_pin(&self, net: NetId, ipin: usize) -> PinId {
        self.nets[net.index()].pins[ipin]
    }

    /// Returns the block driving the net.
    pub fn net_driver_block(&self, net: NetId) -> BlockId {
        let driver = self.nets[net.index()].pins[0];
        self.pins[driver.index()].block
    }

    /// Returns the sink pins of the net.
    pub fn net_sinks(&self, net: NetId) -> &[PinId] {
        &self.nets[net.index()].pins[1..]
    }

    /// Number of sinks on the net (its fanout).
    pub fn num_sinks(&self, net: NetId) -> usize {
        self.nets[net.index()].pins.len() - 1
    }

    /// Total pin count of the net (driver + sinks).
    pub fn net_pin_count(&self, net: NetId) -> usize {
        self.nets[net.index()].pins.len()
    }

    /// All pins on the block.
    pub fn block_pins(&self, block: BlockId) -> &[PinId] {
        &self.blocks[block.index()].pins
    }

    /// Number of blocks.
    pub fn block_count(&self) -> usize {
        self.blocks.len()
    }

    /// Number of nets.
    pub fn net_count(&self) -> usize {
        self.nets.len()
    }

    /// Number of pins.
    pub fn pin_count(&self) -> usize {
        self.pins.len()
    }

    /// Looks up a block by name.
    pub fn block_by_name(&self, name: &str) -> Option<BlockId> {
        self.block_by_name.get(name).copied()
    }

    /// Looks up a net by name.
    pub fn net_by_name(&self, name: &str) -> Option<NetId> {
        self.net_by_name.get(name).copied()
    }

    /// Counts driver→sink connections across all non-ignored nets.
    pub fn count_connections(&self) -> usize {
        self.nets
            .iter()
            .filter(|net| !net.is_ignored)
            .map(|net| net.pins.len() - 1)
            .sum()
    }

    /// Rebuilds auxiliary name indices after deserialization.
    pub fn rebuild_indices(&mut self) {
        self.block_by_name.clear();
        for block in &self.blocks {
            self.block_by_name.insert(block.name.clone(), block.id);
        }
        self.net_by_name.clear();
        for net in &self.nets {
            self.net_by_name.insert(net.name.clone(), net.id);
        }
    }
}

impl Default for PlaceNetlist {
    fn default() -> Self {
        Self::new()
    }
}
