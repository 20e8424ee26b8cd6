//! Per-net bounding boxes and the wirelength cost model.
//!
//! Every net's cost is derived from the axis-aligned bounding box of its
//! pins, scaled by an expected crossing count for its fanout and by the
//! channel-capacity factors. Three box calculators exist:
//!
//! - [`bb_from_scratch`] walks all pins and also counts how many lie on each
//!   box edge, so later moves can be applied incrementally;
//! - [`bb_non_updateable`] skips the edge counts (cheaper; used for small
//!   nets and for verification);
//! - [`update_bb`] adjusts an existing box for a single pin displacement,
//!   bailing out when a depopulated edge forces a full recomputation.
//!
//! Pin coordinates are clamped to `[1, dim − 2]`: routing channels exist
//! only inside the device perimeter, so pushing I/O pins one tile inward
//! does not change which channels a box crosses.

use crate::chan_cost::ChanCostFactors;
use crate::ids::NetId;
use crate::netlist::PlaceNetlist;
use ember_device::{DeviceGrid, Location};
use serde::{Deserialize, Serialize};

/// Expected crossing counts for nets with 1..=50 pins, from ICCAD 94
/// pp. 690-695 with linear interpolation. Multiplied into the bounding-box
/// span to better estimate wirelength for higher-fanout nets.
const CROSS_COUNT: [f64; 50] = [
    1.0, 1.0, 1.0, 1.0828, 1.1536, 1.2206, 1.2823, 1.3385, 1.3991, 1.4493, 1.4974, 1.5455, 1.5937,
    1.6418, 1.6899, 1.7304, 1.7709, 1.8114, 1.8519, 1.8924, 1.9288, 1.9652, 2.0015, 2.0379,
    2.0743, 2.1061, 2.1379, 2.1698, 2.2016, 2.2334, 2.2646, 2.2958, 2.3271, 2.3583, 2.3895,
    2.4187, 2.4479, 2.4772, 2.5064, 2.5356, 2.5610, 2.5864, 2.6117, 2.6371, 2.6625, 2.6887,
    2.7148, 2.7410, 2.7671, 2.7933,
];

/// A net's bounding box in clamped grid coordinates.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct BoundingBox {
    /// Leftmost clamped pin column.
    pub xmin: usize,
    /// Bottom clamped pin row.
    pub ymin: usize,
    /// Rightmost clamped pin column.
    pub xmax: usize,
    /// Top clamped pin row.
    pub ymax: usize,
}

/// How many pins lie exactly on each edge of a bounding box.
///
/// Needed to decide whether moving a pin off an edge shrinks the box or
/// leaves it propped up by another pin.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Default, Serialize, Deserialize)]
pub struct EdgeCounts {
    /// Pins on the `xmin` edge.
    pub xmin: usize,
    /// Pins on the `ymin` edge.
    pub ymin: usize,
    /// Pins on the `xmax` edge.
    pub xmax: usize,
    /// Pins on the `ymax` edge.
    pub ymax: usize,
}

/// Outcome of an incremental bounding-box update.
#[derive(Clone, Copy, Debug)]
pub(crate) enum BbUpdate {
    /// The box (and edge counts) after applying the displacement.
    Updated(BoundingBox, EdgeCounts),
    /// The moved pin was alone on a shrinking edge; the box must be rebuilt
    /// from scratch.
    NeedsFromScratch,
}

/// Clamps a pin coordinate into the channel-bearing interior of the grid.
pub(crate) fn clamp_coord(v: usize, dim: usize) -> usize {
    v.min(dim - 2).max(1)
}

/// Expected crossing count of a net with `num_pins` total pins,
/// extrapolating linearly beyond the table.
pub(crate) fn crossing_count(num_pins: usize) -> f64 {
    if num_pins > 50 {
        2.7933 + 0.02616 * (num_pins - 50) as f64
    } else {
        CROSS_COUNT[num_pins - 1]
    }
}

/// Computes a net's bounding box and edge counts from block locations alone.
///
/// Use when no valid box exists for the net (initial load) or after an
/// incremental update reports a depopulated edge.
pub(crate) fn bb_from_scratch(
    netlist: &PlaceNetlist,
    locs: &[Location],
    grid: &DeviceGrid,
    net: NetId,
) -> (BoundingBox, EdgeCounts) {
    let driver = netlist.net_driver_block(net);
    let loc = locs[driver.index()];
    let x = clamp_coord(loc.x, grid.width());
    let y = clamp_coord(loc.y, grid.height());

    let (mut xmin, mut xmax, mut ymin, mut ymax) = (x, x, y, y);
    let (mut xmin_edge, mut xmax_edge, mut ymin_edge, mut ymax_edge) = (1, 1, 1, 1);

    for &pin in netlist.net_sinks(net) {
        let loc = locs[netlist.pin(pin).block.index()];
        let x = clamp_coord(loc.x, grid.width());
        let y = clamp_coord(loc.y, grid.height());

        if x == xmin {
            xmin_edge += 1;
        }
        if x == xmax {
            // xmin can equal xmax, so this is not an else-branch of the above
            xmax_edge += 1;
        } else if x < xmin {
            xmin = x;
            xmin_edge = 1;
        } else if x > xmax {
            xmax = x;
            xmax_edge = 1;
        }

        if y == ymin {
            ymin_edge += 1;
        }
        if y == ymax {
            ymax_edge += 1;
        } else if y < ymin {
            ymin = y;
            ymin_edge = 1;
        } else if y > ymax {
            ymax = y;
            ymax_edge = 1;
        }
    }

    (
        BoundingBox {
            xmin,
            ymin,
            xmax,
            ymax,
        },
        EdgeCounts {
            xmin: xmin_edge,
            ymin: ymin_edge,
            xmax: xmax_edge,
            ymax: ymax_edge,
        },
    )
}

/// Computes a net's bounding box without edge counts.
///
/// Cheaper than [`bb_from_scratch`]; used for small nets (which never take
/// the incremental path) and for verification passes.
pub(crate) fn bb_non_updateable(
    netlist: &PlaceNetlist,
    locs: &[Location],
    grid: &DeviceGrid,
    net: NetId,
) -> BoundingBox {
    let driver = netlist.net_driver_block(net);
    let loc = locs[driver.index()];
    let (mut xmin, mut xmax) = (loc.x, loc.x);
    let (mut ymin, mut ymax) = (loc.y, loc.y);

    for &pin in netlist.net_sinks(net) {
        let loc = locs[netlist.pin(pin).block.index()];
        if loc.x < xmin {
            xmin = loc.x;
        } else if loc.x > xmax {
            xmax = loc.x;
        }
        if loc.y < ymin {
            ymin = loc.y;
        } else if loc.y > ymax {
            ymax = loc.y;
        }
    }

    BoundingBox {
        xmin: clamp_coord(xmin, grid.width()),
        ymin: clamp_coord(ymin, grid.height()),
        xmax: clamp_coord(xmax, grid.width()),
        ymax: clamp_coord(ymax, grid.height()),
    }
}

/// Applies a single pin displacement to an existing bounding box.
///
/// Coordinates must already be clamped. Returns
/// [`BbUpdate::NeedsFromScratch`] when the pin leaves an edge it was alone
/// on while the box is shrinking in that direction; the box coordinate and
/// edge information for the net must be valid before this is called.
pub(crate) fn update_bb(
    curr_bb: BoundingBox,
    curr_edge: EdgeCounts,
    xold: usize,
    yold: usize,
    xnew: usize,
    ynew: usize,
) -> BbUpdate {
    let mut bb = BoundingBox::default();
    let mut edge = EdgeCounts::default();

    if xnew < xold {
        // Move to left: xmax side may shrink.
        if xold == curr_bb.xmax {
            if curr_edge.xmax == 1 {
                return BbUpdate::NeedsFromScratch;
            }
            edge.xmax = curr_edge.xmax - 1;
            bb.xmax = curr_bb.xmax;
        } else {
            bb.xmax = curr_bb.xmax;
            edge.xmax = curr_edge.xmax;
        }

        if xnew < curr_bb.xmin {
            bb.xmin = xnew;
            edge.xmin = 1;
        } else if xnew == curr_bb.xmin {
            bb.xmin = xnew;
            edge.xmin = curr_edge.xmin + 1;
        } else {
            bb.xmin = curr_bb.xmin;
            edge.xmin = curr_edge.xmin;
        }
    } else if xnew > xold {
        // Move to right: xmin side may shrink.
        if xold == curr_bb.xmin {
            if curr_edge.xmin == 1 {
                return BbUpdate::NeedsFromScratch;
            }
            edge.xmin = curr_edge.xmin - 1;
            bb.xmin = curr_bb.xmin;
        } else {
            bb.xmin = curr_bb.xmin;
            edge.xmin = curr_edge.xmin;
        }

        if xnew > curr_bb.xmax {
            bb.xmax = xnew;
            edge.xmax = 1;
        } else if xnew == curr_bb.xmax {
            bb.xmax = xnew;
            edge.xmax = curr_edge.xmax + 1;
        } else {
            bb.xmax = curr_bb.xmax;
            edge.xmax = curr_edge.xmax;
        }
    } else {
        bb.xmin = curr_bb.xmin;
        bb.xmax = curr_bb.xmax;
        edge.xmin = curr_edge.xmin;
        edge.xmax = curr_edge.xmax;
    }

    if ynew < yold {
        // Move down: ymax side may shrink.
        if yold == curr_bb.ymax {
            if curr_edge.ymax == 1 {
                return BbUpdate::NeedsFromScratch;
            }
            edge.ymax = curr_edge.ymax - 1;
            bb.ymax = curr_bb.ymax;
        } else {
            bb.ymax = curr_bb.ymax;
            edge.ymax = curr_edge.ymax;
        }

        if ynew < curr_bb.ymin {
            bb.ymin = ynew;
            edge.ymin = 1;
        } else if ynew == curr_bb.ymin {
            bb.ymin = ynew;
            edge.ymin = curr_edge.ymin + 1;
        } else {
            bb.ymin = curr_bb.ymin;
            edge.ymin = curr_edge.ymin;
        }
    } else if ynew > yold {
        // Move up: ymin side may shrink.
        if yold == curr_bb.ymin {
            if curr_edge.ymin == 1 {
                return BbUpdate::NeedsFromScratch;
            }
            edge.ymin = curr_edge.ymin - 1;
            bb.ymin = curr_bb.ymin;
        } else {
            bb.ymin = curr_bb.ymin;
            edge.ymin = curr_edge.ymin;
        }

        if ynew > curr_bb.ymax {
            bb.ymax = ynew;
            edge.ymax = 1;
        } else if ynew == curr_bb.ymax {
            bb.ymax = ynew;
            edge.ymax = curr_edge.ymax + 1;
        } else {
            bb.ymax = curr_bb.ymax;
            edge.ymax = curr_edge.ymax;
        }
    } else {
        bb.ymin = curr_bb.ymin;
        bb.ymax = curr_bb.ymax;
        edge.ymin = curr_edge.ymin;
        edge.ymax = curr_edge.ymax;
    }

    BbUpdate::Updated(bb, edge)
}

/// Wiring cost of one net: span along each axis times the crossing count,
/// weighted by the channel-capacity factor covering that span.
pub(crate) fn net_cost(num_pins: usize, bb: &BoundingBox, fac: &ChanCostFactors) -> f64 {
    let crossing = crossing_count(num_pins);
    (bb.xmax - bb.xmin + 1) as f64 * crossing * fac.chanx(bb.ymax, bb.ymin - 1)
        + (bb.ymax - bb.ymin + 1) as f64 * crossing * fac.chany(bb.xmax, bb.xmin - 1)
}

/// Channel-factor-free wirelength estimate for one net.
pub(crate) fn wirelength_estimate(num_pins: usize, bb: &BoundingBox) -> f64 {
    let crossing = crossing_count(num_pins);
    (bb.xmax - bb.xmin + 1) as f64 * crossing + (bb.ymax - bb.ymin + 1) as f64 * crossing
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_device::{
        ChannelWidths, LogicalBlockType, LogicalTypeId, PhysicalTileType, PhysicalTypeId,
    };
    use ember_diagnostics::DiagnosticSink;

    fn make_grid(width: usize, height: usize) -> DeviceGrid {
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
            ChannelWidths::uniform(width, height, 1),
        )
    }

    fn lb() -> LogicalTypeId {
        LogicalTypeId::from_raw(0)
    }

    #[test]
    fn crossing_table_endpoints() {
        assert_eq!(crossing_count(1), 1.0);
        assert_eq!(crossing_count(2), 1.0);
        assert_eq!(crossing_count(4), 1.0828);
        assert_eq!(crossing_count(50), 2.7933);
        // Linear extrapolation past the table
        assert!((crossing_count(60) - (2.7933 + 0.02616 * 10.0)).abs() < 1e-12);
    }

    #[test]
    fn clamp_pushes_perimeter_pins_inward() {
        assert_eq!(clamp_coord(0, 8), 1);
        assert_eq!(clamp_coord(1, 8), 1);
        assert_eq!(clamp_coord(6, 8), 6);
        assert_eq!(clamp_coord(7, 8), 6);
    }

    #[test]
    fn from_scratch_counts_coincident_extrema_twice() {
        // A single-tile net: every pin sits on all four edges.
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", lb());
        let b = nl.add_block("b", lb());
        let net = nl.add_net("n", a, &[b]);
        let grid = make_grid(8, 8);
        let locs = vec![
            Location::new(3, 3, 0),
            Location::new(3, 3, 0),
        ];

        let (bb, edges) = bb_from_scratch(&nl, &locs, &grid, net);
        assert_eq!(bb, BoundingBox { xmin: 3, ymin: 3, xmax: 3, ymax: 3 });
        assert_eq!(edges, EdgeCounts { xmin: 2, ymin: 2, xmax: 2, ymax: 2 });
    }

    #[test]
    fn from_scratch_edges() {
        let mut nl = PlaceNetlist::new();
        let d = nl.add_block("d", lb());
        let s0 = nl.add_block("s0", lb());
        let s1 = nl.add_block("s1", lb());
        let s2 = nl.add_block("s2", lb());
        let net = nl.add_net("n", d, &[s0, s1, s2]);
        let grid = make_grid(10, 10);
        let mut locs = vec![Location::new(0, 0, 0); 4];
        locs[d.index()] = Location::new(2, 4, 0);
        locs[s0.index()] = Location::new(6, 4, 0);
        locs[s1.index()] = Location::new(6, 7, 0);
        locs[s2.index()] = Location::new(4, 2, 0);

        let (bb, edges) = bb_from_scratch(&nl, &locs, &grid, net);
        assert_eq!(bb, BoundingBox { xmin: 2, ymin: 2, xmax: 6, ymax: 7 });
        assert_eq!(edges, EdgeCounts { xmin: 1, ymin: 1, xmax: 2, ymax: 1 });
    }

    #[test]
    fn non_updateable_matches_from_scratch_coords() {
        let mut nl = PlaceNetlist::new();
        let d = nl.add_block("d", lb());
        let s0 = nl.add_block("s0", lb());
        let s1 = nl.add_block("s1", lb());
        let net = nl.add_net("n", d, &[s0, s1]);
        let grid = make_grid(9, 9);
        let locs = vec![
            Location::new(8, 0, 0), // clamped to (7, 1)
            Location::new(3, 5, 0),
            Location::new(1, 2, 0),
        ];

        let (bb, _) = bb_from_scratch(&nl, &locs, &grid, net);
        let bb2 = bb_non_updateable(&nl, &locs, &grid, net);
        assert_eq!(bb, bb2);
        assert_eq!(bb2, BoundingBox { xmin: 1, ymin: 1, xmax: 7, ymax: 5 });
    }

    #[test]
    fn incremental_grow_right() {
        let curr = BoundingBox { xmin: 2, ymin: 2, xmax: 5, ymax: 5 };
        let edges = EdgeCounts { xmin: 2, ymin: 1, xmax: 1, ymax: 2 };
        // Interior pin moves right past xmax, same row.
        match update_bb(curr, edges, 3, 3, 7, 3) {
            BbUpdate::Updated(bb, e) => {
                assert_eq!(bb, BoundingBox { xmin: 2, ymin: 2, xmax: 7, ymax: 5 });
                assert_eq!(e.xmax, 1);
                assert_eq!(e.xmin, 2);
                assert_eq!(e.ymin, 1);
                assert_eq!(e.ymax, 2);
            }
            BbUpdate::NeedsFromScratch => panic!("unexpected rebuild"),
        }
    }

    #[test]
    fn incremental_onto_extremum_bumps_count() {
        let curr = BoundingBox { xmin: 2, ymin: 2, xmax: 5, ymax: 5 };
        let edges = EdgeCounts { xmin: 2, ymin: 1, xmax: 1, ymax: 2 };
        match update_bb(curr, edges, 3, 3, 5, 3) {
            BbUpdate::Updated(bb, e) => {
                assert_eq!(bb.xmax, 5);
                assert_eq!(e.xmax, 2);
            }
            BbUpdate::NeedsFromScratch => panic!("unexpected rebuild"),
        }
    }

    #[test]
    fn pickup_of_lone_extremum_forces_rebuild() {
        // Pins at x = {3 (moving), 5, 5}: driver at 5, sinks at 3 and 5.
        let mut nl = PlaceNetlist::new();
        let d = nl.add_block("d", lb());
        let s0 = nl.add_block("s0", lb());
        let s1 = nl.add_block("s1", lb());
        let net = nl.add_net("n", d, &[s0, s1]);
        let grid = make_grid(8, 8);
        let mut locs = vec![Location::new(0, 0, 0); 3];
        locs[d.index()] = Location::new(5, 4, 0);
        locs[s0.index()] = Location::new(3, 4, 0);
        locs[s1.index()] = Location::new(5, 4, 0);

        let (bb, edges) = bb_from_scratch(&nl, &locs, &grid, net);
        assert_eq!(bb.xmin, 3);
        assert_eq!(edges.xmin, 1);

        // Moving the x=3 sink right: it was alone on xmin.
        assert!(matches!(
            update_bb(bb, edges, 3, 4, 6, 4),
            BbUpdate::NeedsFromScratch
        ));

        // After the move, a rebuild sees xmin=5 (two pins) and xmax=6 (one).
        locs[s0.index()] = Location::new(6, 4, 0);
        let (bb, edges) = bb_from_scratch(&nl, &locs, &grid, net);
        assert_eq!(bb.xmin, 5);
        assert_eq!(bb.xmax, 6);
        assert_eq!(edges.xmin, 2);
        assert_eq!(edges.xmax, 1);
    }

    #[test]
    fn two_block_net_cost_on_unit_channels() {
        // Blocks at (1,1) and (2,2) with unit channel widths and exponent 1:
        // cost = (dx+1)·1·1 + (dy+1)·1·1 = 2 + 2 = 4.
        let grid = make_grid(4, 4);
        let sink = DiagnosticSink::new();
        let fac = ChanCostFactors::new(&grid, 1.0, &sink);
        let bb = BoundingBox { xmin: 1, ymin: 1, xmax: 2, ymax: 2 };
        assert_eq!(net_cost(2, &bb, &fac), 4.0);
    }

    #[test]
    fn wirelength_estimate_no_channel_weighting() {
        let bb = BoundingBox { xmin: 1, ymin: 1, xmax: 3, ymax: 2 };
        // 5 pins: crossing 1.1536, spans 3 and 2.
        let expect = 3.0 * 1.1536 + 2.0 * 1.1536;
        assert!((wirelength_estimate(5, &bb) - expect).abs() < 1e-12);
    }
}
