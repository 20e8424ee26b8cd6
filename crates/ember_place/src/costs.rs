//! Cost bookkeeping: committed per-net costs, shadow buffers for the move
//! under evaluation, and the running totals.
//!
//! Committed state (`net_cost`, `bb_coords`, `bb_num_on_edges`) always
//! reflects the last accepted move. The `ts_*` shadows hold the tentative
//! values for the move being evaluated; `proposed_net_cost` doubles as the
//! affected-net mark (−1 means unmarked). Between moves every shadow entry
//! is back at its cleared value and every `bb_updated_before` flag is
//! `NotYet`; both the accept and reject paths restore this before
//! returning to the annealer.

use crate::bbox::{self, BbUpdate, BoundingBox, EdgeCounts};
use crate::chan_cost::ChanCostFactors;
use crate::ids::NetId;
use crate::netlist::PlaceNetlist;
use ember_device::{DeviceGrid, Location};
use serde::{Deserialize, Serialize};

/// Cut-off for incremental bounding-box updates: nets with fewer sinks use
/// the brute-force box calculator instead.
pub(crate) const SMALL_NET: usize = 4;

/// Relative tolerance for drift between incrementally maintained costs and
/// from-scratch recomputation.
pub(crate) const ERROR_TOL: f64 = 0.01;

/// Moves between periodic from-scratch cost recomputations that bound
/// accumulated floating-point round-off.
pub(crate) const MAX_MOVES_BEFORE_RECOMPUTE: usize = 500_000;

/// Cap on the inverse timing cost used for normalization, so very lax
/// timing constraints cannot blow up the cost blend.
pub(crate) const MAX_INV_TIMING_COST: f64 = 1e9;

/// Per-net bounding-box validity during one move evaluation.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub(crate) enum BbUpdateState {
    /// The committed box is current; no shadow exists yet.
    NotYet,
    /// The shadow holds an incrementally updated box.
    UpdatedOnce,
    /// The shadow was rebuilt from scratch; do not update it again.
    FromScratch,
}

/// The three running cost totals.
///
/// Individual move deltas are computed in `f64` and accumulated in `f64`
/// so that a single move's small delta is not swallowed by the magnitude
/// of the overall cost on large designs.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct CostTotals {
    /// The blended scalar objective (normalized in timing-driven mode).
    pub cost: f64,
    /// Total channel-weighted bounding-box cost.
    pub bb_cost: f64,
    /// Total timing cost (criticality × delay summed over connections).
    pub timing_cost: f64,
}

/// Inverses of the totals captured at the last outer iteration, used to
/// normalize the two objectives against each other.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct PrevInverseCosts {
    /// `1 / bb_cost` at normalization time.
    pub bb_cost: f64,
    /// `min(1 / timing_cost, MAX_INV_TIMING_COST)` at normalization time.
    pub timing_cost: f64,
}

/// Committed and shadow cost state for every net.
pub(crate) struct CostState {
    pub net_cost: Vec<f64>,
    pub proposed_net_cost: Vec<f64>,
    pub bb_coords: Vec<BoundingBox>,
    pub bb_num_on_edges: Vec<EdgeCounts>,
    pub ts_bb_coord_new: Vec<BoundingBox>,
    pub ts_bb_edge_new: Vec<EdgeCounts>,
    pub ts_nets_to_update: Vec<NetId>,
    pub bb_updated_before: Vec<BbUpdateState>,
}

impl CostState {
    pub(crate) fn new(num_nets: usize) -> Self {
        Self {
            net_cost: vec![-1.0; num_nets],
            proposed_net_cost: vec![-1.0; num_nets],
            bb_coords: vec![BoundingBox::default(); num_nets],
            bb_num_on_edges: vec![EdgeCounts::default(); num_nets],
            ts_bb_coord_new: vec![BoundingBox::default(); num_nets],
            ts_bb_edge_new: vec![EdgeCounts::default(); num_nets],
            ts_nets_to_update: Vec::with_capacity(num_nets),
            bb_updated_before: vec![BbUpdateState::NotYet; num_nets],
        }
    }

    /// Loads every net's committed bounding box and cost from scratch and
    /// returns the total. Large nets get edge counts so later moves can
    /// update them incrementally.
    pub(crate) fn comp_bb_cost_normal(
        &mut self,
        netlist: &PlaceNetlist,
        locs: &[Location],
        grid: &DeviceGrid,
        fac: &ChanCostFactors,
    ) -> f64 {
        let mut cost = 0.0;
        for net in &netlist.nets {
            if net.is_ignored {
                continue;
            }
            let i = net.id.index();
            if netlist.num_sinks(net.id) >= SMALL_NET {
                let (bb, edges) = bbox::bb_from_scratch(netlist, locs, grid, net.id);
                self.bb_coords[i] = bb;
                self.bb_num_on_edges[i] = edges;
            } else {
                self.bb_coords[i] = bbox::bb_non_updateable(netlist, locs, grid, net.id);
            }
            self.net_cost[i] = bbox::net_cost(net.pins.len(), &self.bb_coords[i], fac);
            cost += self.net_cost[i];
        }
        cost
    }

    /// Marks a net as affected by the current move, once.
    pub(crate) fn record_affected_net(&mut self, net: NetId) {
        if self.proposed_net_cost[net.index()] < 0.0 {
            self.ts_nets_to_update.push(net);
            // Flag to say we've marked this net.
            self.proposed_net_cost[net.index()] = 1.0;
        }
    }

    /// Updates the shadow bounding box of `net` for one moved pin.
    ///
    /// Small nets are recomputed brute-force; large nets go through the
    /// incremental ladder, falling back to a from-scratch rebuild when a
    /// shrinking edge loses its last pin.
    pub(crate) fn update_net_bb(
        &mut self,
        net: NetId,
        netlist: &PlaceNetlist,
        locs: &[Location],
        grid: &DeviceGrid,
        old_xy: (usize, usize),
        new_xy: (usize, usize),
    ) {
        let i = net.index();
        if netlist.num_sinks(net) < SMALL_NET {
            // Brute-force recomputation is faster for small nets.
            if self.bb_updated_before[i] == BbUpdateState::NotYet {
                self.ts_bb_coord_new[i] = bbox::bb_non_updateable(netlist, locs, grid, net);
            }
            return;
        }

        let xold = bbox::clamp_coord(old_xy.0, grid.width());
        let yold = bbox::clamp_coord(old_xy.1, grid.height());
        let xnew = bbox::clamp_coord(new_xy.0, grid.width());
        let ynew = bbox::clamp_coord(new_xy.1, grid.height());

        let (curr_bb, curr_edge) = match self.bb_updated_before[i] {
            // Rebuilt from scratch already; the box is definitely right.
            BbUpdateState::FromScratch => return,
            BbUpdateState::NotYet => (self.bb_coords[i], self.bb_num_on_edges[i]),
            BbUpdateState::UpdatedOnce => (self.ts_bb_coord_new[i], self.ts_bb_edge_new[i]),
        };

        match bbox::update_bb(curr_bb, curr_edge, xold, yold, xnew, ynew) {
            BbUpdate::Updated(bb, edges) => {
                self.ts_bb_coord_new[i] = bb;
                self.ts_bb_edge_new[i] = edges;
                self.bb_updated_before[i] = BbUpdateState::UpdatedOnce;
            }
            BbUpdate::NeedsFromScratch => {
                let (bb, edges) = bbox::bb_from_scratch(netlist, locs, grid, net);
                self.ts_bb_coord_new[i] = bb;
                self.ts_bb_edge_new[i] = edges;
                self.bb_updated_before[i] = BbUpdateState::FromScratch;
            }
        }
    }

    /// Prices every affected net's shadow box and returns the total
    /// bounding-box cost delta for the move. Called once per move, after
    /// all pin displacements have been folded into the shadows.
    pub(crate) fn finalize_affected_net_costs(
        &mut self,
        netlist: &PlaceNetlist,
        fac: &ChanCostFactors,
    ) -> f64 {
        let mut bb_delta = 0.0;
        for idx in 0..self.ts_nets_to_update.len() {
            let net = self.ts_nets_to_update[idx];
            let i = net.index();
            self.proposed_net_cost[i] =
                bbox::net_cost(netlist.net_pin_count(net), &self.ts_bb_coord_new[i], fac);
            bb_delta += self.proposed_net_cost[i] - self.net_cost[i];
        }
        bb_delta
    }

    /// Commits the shadows of every affected net and clears the move marks.
    pub(crate) fn update_move_nets(&mut self, netlist: &PlaceNetlist) {
        for idx in 0..self.ts_nets_to_update.len() {
            let net = self.ts_nets_to_update[idx];
            let i = net.index();
            self.bb_coords[i] = self.ts_bb_coord_new[i];
            if netlist.num_sinks(net) >= SMALL_NET {
                self.bb_num_on_edges[i] = self.ts_bb_edge_new[i];
            }
            self.net_cost[i] = self.proposed_net_cost[i];
            // Negative proposed_net_cost doubles as the unmarked flag.
            self.proposed_net_cost[i] = -1.0;
            self.bb_updated_before[i] = BbUpdateState::NotYet;
        }
        self.ts_nets_to_update.clear();
    }

    /// Discards the shadows of every affected net and clears the move marks.
    pub(crate) fn reset_move_nets(&mut self) {
        for idx in 0..self.ts_nets_to_update.len() {
            let i = self.ts_nets_to_update[idx].index();
            self.proposed_net_cost[i] = -1.0;
            self.bb_updated_before[i] = BbUpdateState::NotYet;
        }
        self.ts_nets_to_update.clear();
    }

    /// Re-totals the committed per-net costs. The boxes themselves are
    /// already correct; this only squeezes out accumulated round-off in
    /// the running sum.
    pub(crate) fn recompute_bb_cost(&self, netlist: &PlaceNetlist) -> f64 {
        let mut cost = 0.0;
        for net in &netlist.nets {
            if !net.is_ignored {
                cost += self.net_cost[net.id.index()];
            }
        }
        cost
    }
}

/// From-scratch verification pass: prices every non-ignored net with the
/// simple box calculator, without touching any committed state. Returns the
/// total cost and the channel-factor-free wirelength estimate.
pub(crate) fn comp_bb_cost_check(
    netlist: &PlaceNetlist,
    locs: &[Location],
    grid: &DeviceGrid,
    fac: &ChanCostFactors,
) -> (f64, f64) {
    let mut cost = 0.0;
    let mut expected_wirelength = 0.0;
    for net in &netlist.nets {
        if net.is_ignored {
            continue;
        }
        let bb = bbox::bb_non_updateable(netlist, locs, grid, net.id);
        cost += bbox::net_cost(net.pins.len(), &bb, fac);
        expected_wirelength += bbox::wirelength_estimate(net.pins.len(), &bb);
    }
    (cost, expected_wirelength)
}
