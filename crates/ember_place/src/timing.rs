//! External timing interfaces: the delay oracle and the STA facade.
//!
//! The placer does not compute delays or slacks itself. It consumes a
//! [`DelayModel`] that prices any point-to-point connection from grid
//! coordinates and pin indices, and a [`TimingAnalyzer`] that owns slack
//! propagation and per-connection criticalities. Both are invoked
//! synchronously and must not retain references into placer state across
//! calls.

use crate::error::PlaceError;
use crate::ids::{NetId, PinId};
use crate::netlist::PlaceNetlist;
use ember_device::{DeviceGrid, Location};

/// Black-box estimate of the signal delay between two placed pins.
pub trait DelayModel {
    /// Expected delay from the source pin at `(x1, y1)` to the sink pin at
    /// `(x2, y2)`. Pin indices identify the pins within their blocks.
    ///
    /// Must return a non-negative value; the placer aborts on a negative
    /// delay.
    fn delay(
        &self,
        x1: usize,
        y1: usize,
        pin1: usize,
        x2: usize,
        y2: usize,
        pin2: usize,
    ) -> f32;
}

/// Facade over an external static timing analyzer.
///
/// The placer drives it in a fixed rhythm: edges invalidated as moves
/// commit, then [`update_slacks`](Self::update_slacks) +
/// [`update_criticalities`](Self::update_criticalities) at the configured
/// cadence, then [`reset_invalidation`](Self::reset_invalidation) once the
/// new criticalities have been folded into the timing cost.
pub trait TimingAnalyzer {
    /// Re-runs timing analysis to refresh slacks from the committed
    /// connection delays.
    fn update_slacks(&mut self);

    /// Recomputes per-connection criticalities, sharpened by raising them to
    /// `exponent`.
    ///
    /// The first call must report every sink pin as modified so the placer
    /// can seed its timing costs.
    fn update_criticalities(&mut self, exponent: f32);

    /// Criticality of the `ipin`-th connection of `net`, in `[0, 1]`.
    fn criticality(&self, net: NetId, ipin: usize) -> f32;

    /// Sink pins whose criticality changed in the last
    /// [`update_criticalities`](Self::update_criticalities) call.
    fn pins_with_modified_criticality(&self) -> Vec<PinId>;

    /// Marks the timing-graph edges feeding `pin` as stale. Called for each
    /// connection whose delay actually changed, before the move commits.
    fn invalidate(&mut self, pin: PinId);

    /// Clears invalidation state after a criticality update has consumed it.
    fn reset_invalidation(&mut self);
}

/// The timing-driven collaborators bundled for one placement run.
pub struct TimingContext<'a> {
    /// The point-to-point delay oracle.
    pub delay_model: &'a dyn DelayModel,
    /// The STA facade.
    pub analyzer: &'a mut dyn TimingAnalyzer,
}

/// Computes the delay of one driver→sink connection at the current block
/// locations. Ignored nets are global signals and carry zero delay.
pub(crate) fn comp_td_connection_delay(
    netlist: &PlaceNetlist,
    grid: &DeviceGrid,
    locs: &[Location],
    delay_model: &dyn DelayModel,
    net: NetId,
    ipin: usize,
) -> Result<f32, PlaceError> {
    if netlist.net(net).is_ignored {
        return Ok(0.0);
    }

    let source_pin = netlist.pin(netlist.net_pin(net, 0));
    let sink_pin = netlist.pin(netlist.net_pin(net, ipin));

    let source_loc = locs[source_pin.block.index()];
    let sink_loc = locs[sink_pin.block.index()];

    let delay = delay_model.delay(
        source_loc.x,
        source_loc.y,
        source_pin.block_pin_index,
        sink_loc.x,
        sink_loc.y,
        sink_pin.block_pin_index,
    );

    if delay < 0.0 {
        let type_pin_name = |pin: &crate::netlist::PlacePin| {
            let block = netlist.block(pin.block);
            format!(
                "{}.{}",
                grid.logical_type(block.logical_type).name,
                pin.block_pin_index
            )
        };
        return Err(PlaceError::NegativeDelay {
            delay,
            source_name: type_pin_name(source_pin),
            source_x: source_loc.x,
            source_y: source_loc.y,
            sink: type_pin_name(sink_pin),
            sink_x: sink_loc.x,
            sink_y: sink_loc.y,
        });
    }

    Ok(delay)
}
