//! Shared fixtures and mock collaborators for unit tests.

use crate::ids::{NetId, PinId};
use crate::netlist::{PinKind, PlaceNetlist};
use crate::timing::{DelayModel, TimingAnalyzer};
use ember_device::{
    ChannelWidths, DeviceGrid, LogicalBlockType, LogicalTypeId, PhysicalTileType, PhysicalTypeId,
};
use std::collections::HashMap;

/// A homogeneous grid of single-capacity logic tiles with the given channel
/// track count everywhere.
pub(crate) fn uniform_grid(width: usize, height: usize, tracks: u32) -> DeviceGrid {
    DeviceGrid::homogeneous(
        width,
        height,
        PhysicalTileType {
            id: PhysicalTypeId::from_raw(0),
            name: "clb".into(),
            capacity: 1,
            compatible: vec![LogicalTypeId::from_raw(0)],
        },
        vec![LogicalBlockType {
            id: LogicalTypeId::from_raw(0),
            name: "lb".into(),
        }],
        ChannelWidths::uniform(width, height, tracks),
    )
}

/// The canonical small test device: 4×4, unit channels.
pub(crate) fn grid_4x4() -> DeviceGrid {
    uniform_grid(4, 4, 1)
}

/// Delay model charging `unit` per tile of Manhattan distance.
pub(crate) struct ManhattanDelay {
    pub unit: f32,
}

impl DelayModel for ManhattanDelay {
    fn delay(&self, x1: usize, y1: usize, _pin1: usize, x2: usize, y2: usize, _pin2: usize) -> f32 {
        let dx = x1.abs_diff(x2);
        let dy = y1.abs_diff(y2);
        (dx + dy) as f32 * self.unit
    }
}

/// A scriptable stand-in for the STA facade.
///
/// Criticalities default to `default_crit` and can be overridden per
/// connection; every sink pin is reported as modified on each update, which
/// is a legal (superset) answer.
pub(crate) struct MockAnalyzer {
    all_sink_pins: Vec<PinId>,
    crit: HashMap<(u32, usize), f32>,
    default_crit: f32,
    /// When set, reported instead of the full sink-pin list.
    pub modified_override: Option<Vec<PinId>>,
    /// Every pin ever invalidated, in order; never cleared.
    pub invalidated: Vec<PinId>,
    /// Number of `reset_invalidation` calls observed.
    pub resets: usize,
    /// Number of `update_slacks` calls observed.
    pub slack_updates: usize,
    /// The exponent passed to the most recent criticality update.
    pub last_exponent: f32,
}

impl MockAnalyzer {
    pub(crate) fn new(netlist: &PlaceNetlist, default_crit: f32) -> Self {
        let all_sink_pins = netlist
            .pins
            .iter()
            .filter(|p| p.kind == PinKind::Sink)
            .map(|p| p.id)
            .collect();
        Self {
            all_sink_pins,
            crit: HashMap::new(),
            default_crit,
            modified_override: None,
            invalidated: Vec::new(),
            resets: 0,
            slack_updates: 0,
            last_exponent: 0.0,
        }
    }

    pub(crate) fn set_criticality(&mut self, net: NetId, ipin: usize, crit: f32) {
        self.crit.insert((net.as_raw(), ipin), crit);
    }
}

impl TimingAnalyzer for MockAnalyzer {
    fn update_slacks(&mut self) {
        self.slack_updates += 1;
    }

    fn update_criticalities(&mut self, exponent: f32) {
        self.last_exponent = exponent;
    }

    fn criticality(&self, net: NetId, ipin: usize) -> f32 {
        *self
            .crit
            .get(&(net.as_raw(), ipin))
            .unwrap_or(&self.default_crit)
    }

    fn pins_with_modified_criticality(&self) -> Vec<PinId> {
        match &self.modified_override {
            Some(pins) => pins.clone(),
            None => self.all_sink_pins.clone(),
        }
    }

    fn invalidate(&mut self, pin: PinId) {
        self.invalidated.push(pin);
    }

    fn reset_invalidation(&mut self) {
        self.resets += 1;
    }
}
