//! The timing cost engine: per-connection costs, move deltas, and totals.
//!
//! Committed state holds the delay and `criticality × delay` cost of every
//! driver→sink connection at the accepted block positions. During move
//! evaluation, re-priced connections go into `proposed_*` shadows; a commit
//! copies them into committed state and a revert discards them. Both paths
//! leave every shadow entry invalid (NaN) afterwards.
//!
//! Totals are always derived through [`ConnectionTimingCosts`], a
//! connection → net → total reduction that caches per-net sums and
//! recomputes only the nets whose connections changed. Because the
//! incremental and from-scratch paths sum in exactly the same shape (sinks
//! in pin order, then nets in net order), their results are bit-identical;
//! a plain running delta would not be, since floating-point addition is
//! order dependent.

use crate::error::PlaceError;
use crate::ids::{NetId, PinId};
use crate::netlist::{PinKind, PlaceNetlist};
use crate::state::BlocksAffected;
use crate::timing::{comp_td_connection_delay, DelayModel, TimingAnalyzer};
use ember_device::{DeviceGrid, Location};

/// Shadow entries carry this between moves; NaN is unambiguous because real
/// delays and costs are non-negative.
pub(crate) const INVALID_DELAY: f32 = f32::NAN;

/// The timing cost of one connection. Both the incremental and from-scratch
/// paths must price connections through this one expression, so that their
/// results can be compared for exact equality.
#[inline]
fn conn_cost(criticality: f32, delay: f32) -> f64 {
    criticality as f64 * delay as f64
}

/// Per-connection timing costs with cached per-net sums.
///
/// Writing a connection marks its net dirty; [`total_cost`](Self::total_cost)
/// re-sums dirty nets (sinks in pin order) and then totals all nets in net
/// order, reproducing the exact operation order of a from-scratch pass.
#[derive(Clone, Debug)]
pub(crate) struct ConnectionTimingCosts {
    /// `[net][ipin]` connection costs; slot 0 (the driver) is unused.
    conn: Vec<Vec<f64>>,
    net_sums: Vec<f64>,
    dirty: Vec<NetId>,
    is_dirty: Vec<bool>,
    ignored: Vec<bool>,
}

impl ConnectionTimingCosts {
    pub(crate) fn new(netlist: &PlaceNetlist) -> Self {
        let num_nets = netlist.net_count();
        let mut conn = Vec::with_capacity(num_nets);
        let mut dirty = Vec::with_capacity(num_nets);
        let mut is_dirty = vec![false; num_nets];
        let mut ignored = vec![false; num_nets];

        for net in &netlist.nets {
            let i = net.id.index();
            ignored[i] = net.is_ignored;
            let mut row = vec![0.0; net.pins.len()];
            if !net.is_ignored {
                // Unpriced connections poison the total until they are set.
                for slot in row.iter_mut().skip(1) {
                    *slot = f64::NAN;
                }
                dirty.push(net.id);
                is_dirty[i] = true;
            }
            conn.push(row);
        }

        Self {
            conn,
            net_sums: vec![0.0; num_nets],
            dirty,
            is_dirty,
            ignored,
        }
    }

    pub(crate) fn get(&self, net: NetId, ipin: usize) -> f64 {
        self.conn[net.index()][ipin]
    }

    pub(crate) fn set(&mut self, net: NetId, ipin: usize, cost: f64) {
        let i = net.index();
        self.conn[i][ipin] = cost;
        if !self.is_dirty[i] {
            self.is_dirty[i] = true;
            self.dirty.push(net);
        }
    }

    /// Re-totals the grand sum: dirty per-net sums first (sinks in pin
    /// order), then all nets in net order.
    pub(crate) fn total_cost(&mut self) -> f64 {
        for idx in 0..self.dirty.len() {
            let net = self.dirty[idx];
            let i = net.index();
            let mut net_sum = 0.0;
            for &c in self.conn[i].iter().skip(1) {
                net_sum += c;
            }
            self.net_sums[i] = net_sum;
            self.is_dirty[i] = false;
        }
        self.dirty.clear();

        let mut total = 0.0;
        for i in 0..self.net_sums.len() {
            if !self.ignored[i] {
                total += self.net_sums[i];
            }
        }
        total
    }
}

/// Committed and shadow timing state for every connection.
#[derive(Clone, Debug)]
pub(crate) struct TimingCostState {
    /// Committed connection delays `[net][ipin]` (slot 0 unused).
    pub connection_delay: Vec<Vec<f32>>,
    /// Proposed delays for connections touched by the current move;
    /// `INVALID_DELAY` otherwise.
    pub proposed_connection_delay: Vec<Vec<f32>>,
    /// Committed connection timing costs with hierarchical totals.
    pub connection_timing_cost: ConnectionTimingCosts,
    /// Proposed timing costs for the current move; NaN otherwise.
    pub proposed_connection_timing_cost: Vec<Vec<f64>>,
}

impl TimingCostState {
    pub(crate) fn new(netlist: &PlaceNetlist) -> Self {
        let connection_delay: Vec<Vec<f32>> = netlist
            .nets
            .iter()
            .map(|net| vec![0.0; net.pins.len()])
            .collect();
        let proposed_connection_delay: Vec<Vec<f32>> = netlist
            .nets
            .iter()
            .map(|net| vec![INVALID_DELAY; net.pins.len()])
            .collect();
        let proposed_connection_timing_cost: Vec<Vec<f64>> = netlist
            .nets
            .iter()
            .map(|net| vec![f64::NAN; net.pins.len()])
            .collect();

        Self {
            connection_delay,
            proposed_connection_delay,
            connection_timing_cost: ConnectionTimingCosts::new(netlist),
            proposed_connection_timing_cost,
        }
    }

    /// Prices every connection at the current committed block positions.
    /// Run once after initial placement.
    pub(crate) fn comp_td_connection_delays(
        &mut self,
        netlist: &PlaceNetlist,
        grid: &DeviceGrid,
        locs: &[Location],
        delay_model: &dyn DelayModel,
    ) -> Result<(), PlaceError> {
        for net in &netlist.nets {
            for ipin in 1..net.pins.len() {
                self.connection_delay[net.id.index()][ipin] =
                    comp_td_connection_delay(netlist, grid, locs, delay_model, net.id, ipin)?;
            }
        }
        Ok(())
    }

    /// Accumulates the timing-cost delta contributed by one pin of a moved
    /// block.
    ///
    /// A moved driver re-prices every sink of its net; a moved sink
    /// re-prices only itself, and only when its driver did not also move
    /// (the driver's pass already counted that connection, and counting it
    /// here again would double the delta).
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn update_td_delta_costs(
        &mut self,
        netlist: &PlaceNetlist,
        grid: &DeviceGrid,
        locs: &[Location],
        delay_model: &dyn DelayModel,
        criticalities: &dyn TimingAnalyzer,
        net: NetId,
        pin: PinId,
        affected: &mut BlocksAffected,
        delta_timing_cost: &mut f64,
    ) -> Result<(), PlaceError> {
        let i = net.index();
        if netlist.pin(pin).kind == PinKind::Driver {
            // The driver moved: every point-to-point delay on the net changes.
            for ipin in 1..netlist.net_pin_count(net) {
                let temp_delay =
                    comp_td_connection_delay(netlist, grid, locs, delay_model, net, ipin)?;
                self.proposed_connection_delay[i][ipin] = temp_delay;

                let proposed = conn_cost(criticalities.criticality(net, ipin), temp_delay);
                self.proposed_connection_timing_cost[i][ipin] = proposed;
                *delta_timing_cost += proposed - self.connection_timing_cost.get(net, ipin);

                affected.affected_pins.push(netlist.net_pin(net, ipin));
            }
        } else if !driven_by_moved_block(netlist, net, affected) {
            let ipin = netlist.pin(pin).net_index;

            let temp_delay =
                comp_td_connection_delay(netlist, grid, locs, delay_model, net, ipin)?;
            self.proposed_connection_delay[i][ipin] = temp_delay;

            let proposed = conn_cost(criticalities.criticality(net, ipin), temp_delay);
            self.proposed_connection_timing_cost[i][ipin] = proposed;
            *delta_timing_cost += proposed - self.connection_timing_cost.get(net, ipin);

            affected.affected_pins.push(pin);
        }
        Ok(())
    }

    /// Copies the proposed delays and costs of every connection touched by
    /// the accepted move into committed state, resetting the shadows.
    pub(crate) fn commit_td_cost(&mut self, netlist: &PlaceNetlist, affected: &BlocksAffected) {
        for moved in &affected.moved {
            for &pin_id in netlist.block_pins(moved.block) {
                let pin = netlist.pin(pin_id);
                let net = pin.net;
                if netlist.net(net).is_ignored {
                    continue;
                }

                if pin.kind == PinKind::Driver {
                    for ipin in 1..netlist.net_pin_count(net) {
                        self.commit_connection(net, ipin);
                    }
                } else if !driven_by_moved_block(netlist, net, affected) {
                    // Guarded so a connection is never committed twice.
                    self.commit_connection(net, pin.net_index);
                }
            }
        }
    }

    fn commit_connection(&mut self, net: NetId, ipin: usize) {
        let i = net.index();
        self.connection_delay[i][ipin] = self.proposed_connection_delay[i][ipin];
        self.proposed_connection_delay[i][ipin] = INVALID_DELAY;
        self.connection_timing_cost
            .set(net, ipin, self.proposed_connection_timing_cost[i][ipin]);
        self.proposed_connection_timing_cost[i][ipin] = f64::NAN;
    }

    /// Discards the proposed delays and costs of a rejected move. Committed
    /// state is untouched.
    pub(crate) fn revert_td_cost(&mut self, netlist: &PlaceNetlist, affected: &BlocksAffected) {
        for &pin_id in &affected.affected_pins {
            let pin = netlist.pin(pin_id);
            let i = pin.net.index();
            self.proposed_connection_delay[i][pin.net_index] = INVALID_DELAY;
            self.proposed_connection_timing_cost[i][pin.net_index] = f64::NAN;
        }
    }

    /// Marks STA edges stale for every connection whose delay actually
    /// changed. Must run before [`commit_td_cost`](Self::commit_td_cost):
    /// it detects change by comparing the proposed and committed delays.
    pub(crate) fn invalidate_affected_connection_delays(
        &self,
        netlist: &PlaceNetlist,
        affected: &BlocksAffected,
        analyzer: &mut dyn TimingAnalyzer,
    ) {
        for &pin_id in &affected.affected_pins {
            // A connection can keep its delay across a move (e.g. a sink
            // relocated to the same dx/dy from its driver); skipping those
            // minimizes the next incremental STA update.
            let pin = netlist.pin(pin_id);
            let i = pin.net.index();
            if self.proposed_connection_delay[i][pin.net_index]
                != self.connection_delay[i][pin.net_index]
            {
                analyzer.invalidate(pin_id);
            }
        }
    }

    /// Incrementally refreshes timing costs after a criticality update:
    /// only connections whose criticality changed are re-priced, then the
    /// grand total is re-derived hierarchically. Bit-identical to
    /// [`comp_td_costs`](Self::comp_td_costs).
    pub(crate) fn update_td_costs(
        &mut self,
        netlist: &PlaceNetlist,
        analyzer: &dyn TimingAnalyzer,
    ) -> f64 {
        for pin_id in analyzer.pins_with_modified_criticality() {
            let pin = netlist.pin(pin_id);
            if pin.kind == PinKind::Driver {
                continue;
            }
            let net = pin.net;
            if netlist.net(net).is_ignored {
                continue;
            }
            let ipin = pin.net_index;
            let cost = conn_cost(
                analyzer.criticality(net, ipin),
                self.connection_delay[net.index()][ipin],
            );
            self.connection_timing_cost.set(net, ipin, cost);
        }

        self.connection_timing_cost.total_cost()
    }

    /// Re-prices every connection from the committed delays and current
    /// criticalities. Reference path for drift checks and verification.
    pub(crate) fn comp_td_costs(
        &mut self,
        netlist: &PlaceNetlist,
        analyzer: &dyn TimingAnalyzer,
    ) -> f64 {
        for net in &netlist.nets {
            if net.is_ignored {
                continue;
            }
            for ipin in 1..net.pins.len() {
                let cost = conn_cost(
                    analyzer.criticality(net.id, ipin),
                    self.connection_delay[net.id.index()][ipin],
                );
                self.connection_timing_cost.set(net.id, ipin, cost);
            }
        }

        self.connection_timing_cost.total_cost()
    }
}

/// Whether the net's driver block is part of the current move.
pub(crate) fn driven_by_moved_block(
    netlist: &PlaceNetlist,
    net: NetId,
    affected: &BlocksAffected,
) -> bool {
    affected.contains_block(netlist.net_driver_block(net))
}
