//! End-of-run (and post-initial-load) placement verification.
//!
//! Checks that the incremental machinery has not confused the data
//! structures: the grid occupancy and the block locations must agree about
//! every block, every block must sit in a compatible slot, macros must hold
//! their relative offsets, and the running cost totals must match a
//! from-scratch recomputation within the drift tolerance. Every violation
//! is reported individually through the diagnostic sink, then the total is
//! returned as one error.

use crate::anneal::Placer;
use crate::costs::{comp_bb_cost_check, ERROR_TOL};
use crate::error::PlaceError;
use crate::timing::TimingAnalyzer;
use ember_diagnostics::{Category, Diagnostic, DiagnosticCode};

impl Placer<'_> {
    /// Verifies the full placement invariant set. Emits one diagnostic per
    /// violation and fails with the violation count if any were found.
    pub(crate) fn check_place(
        &self,
        analyzer: Option<&dyn TimingAnalyzer>,
    ) -> Result<(), PlaceError> {
        let mut errors = 0;
        errors += self.check_block_placement_consistency();
        errors += self.check_macro_placement_consistency();
        errors += self.check_placement_costs(analyzer);

        if errors == 0 {
            self.sink.emit(Diagnostic::note(
                DiagnosticCode::new(Category::Placement, 100),
                "Completed placement consistency check successfully.",
            ));
            Ok(())
        } else {
            Err(PlaceError::ConsistencyCheck { errors })
        }
    }

    /// Grid/location agreement, capacity limits, slot compatibility, and
    /// one-placement-per-block accounting.
    fn check_block_placement_consistency(&self) -> usize {
        let mut errors = 0;
        let mut bdone = vec![0usize; self.netlist.block_count()];

        for x in 0..self.grid.width() {
            for y in 0..self.grid.height() {
                let tile = self.grid.tile_type_at(x, y);
                let usage = self.state.usage(x, y);
                if usage > tile.capacity {
                    self.sink.emit(Diagnostic::error(
                        DiagnosticCode::new(Category::Placement, 201),
                        format!("block at grid location ({x},{y}) overused, usage is {usage}"),
                    ));
                    errors += 1;
                }

                let mut usage_check = 0;
                for k in 0..tile.capacity {
                    let Some(bnum) = self.state.grid_block(x, y, k) else {
                        continue;
                    };
                    let block = self.netlist.block(bnum);

                    if !tile.is_subtile_compatible(block.logical_type, k) {
                        self.sink.emit(Diagnostic::error(
                            DiagnosticCode::new(Category::Placement, 202),
                            format!(
                                "block {} type ({}) does not match grid location ({x},{y}) type ({})",
                                block.name,
                                self.grid.logical_type(block.logical_type).name,
                                tile.name
                            ),
                        ));
                        errors += 1;
                    }

                    let loc = self.state.block_location(bnum);
                    if loc.x != x || loc.y != y || loc.subtile != k {
                        self.sink.emit(Diagnostic::error(
                            DiagnosticCode::new(Category::Placement, 203),
                            format!(
                                "block {}'s location is {} but found in grid at ({x},{y},{k})",
                                block.name, loc
                            ),
                        ));
                        errors += 1;
                    }

                    usage_check += 1;
                    bdone[bnum.index()] += 1;
                }

                if usage_check != usage {
                    self.sink.emit(Diagnostic::error(
                        DiagnosticCode::new(Category::Placement, 204),
                        format!(
                            "location ({x},{y}) usage is {usage}, but has actual usage {usage_check}"
                        ),
                    ));
                    errors += 1;
                }
            }
        }

        for (i, &count) in bdone.iter().enumerate() {
            if count != 1 {
                self.sink.emit(Diagnostic::error(
                    DiagnosticCode::new(Category::Placement, 205),
                    format!(
                        "block {} listed {count} times in the grid",
                        self.netlist.blocks[i].name
                    ),
                ));
                errors += 1;
            }
        }

        errors
    }

    /// Every macro member must sit exactly at head location + offset, in
    /// both the primary index and the grid inverse.
    fn check_macro_placement_consistency(&self) -> usize {
        let mut errors = 0;

        for pm in self.state.macros() {
            let head_loc = self.state.block_location(pm.head());

            for member in &pm.members {
                let expected = member.offset.apply(head_loc).filter(|pos| {
                    pos.x < self.grid.width()
                        && pos.y < self.grid.height()
                        && pos.subtile < self.grid.tile_type_at(pos.x, pos.y).capacity
                });
                let Some(pos) = expected else {
                    self.sink.emit(Diagnostic::error(
                        DiagnosticCode::new(Category::Placement, 206),
                        format!(
                            "macro {} member {} offset leaves the grid",
                            pm.id,
                            self.netlist.block(member.block).name
                        ),
                    ));
                    errors += 1;
                    continue;
                };

                if self.state.block_location(member.block) != pos {
                    self.sink.emit(Diagnostic::error(
                        DiagnosticCode::new(Category::Placement, 206),
                        format!(
                            "block {} in macro {} is not placed in the proper orientation",
                            self.netlist.block(member.block).name,
                            pm.id
                        ),
                    ));
                    errors += 1;
                }

                if self.state.grid_block(pos.x, pos.y, pos.subtile) != Some(member.block) {
                    self.sink.emit(Diagnostic::error(
                        DiagnosticCode::new(Category::Placement, 206),
                        format!(
                            "grid does not hold block {} of macro {} at {}",
                            self.netlist.block(member.block).name,
                            pm.id,
                            pos
                        ),
                    ));
                    errors += 1;
                }
            }
        }

        errors
    }

    /// Running totals must match from-scratch recomputation within the
    /// drift tolerance.
    fn check_placement_costs(&self, analyzer: Option<&dyn TimingAnalyzer>) -> usize {
        let mut errors = 0;

        let (bb_cost_check, _) = comp_bb_cost_check(
            self.netlist,
            self.state.block_locations(),
            self.grid,
            &self.chan_fac,
        );
        if (bb_cost_check - self.totals.bb_cost).abs() > self.totals.bb_cost * ERROR_TOL {
            self.sink.emit(Diagnostic::error(
                DiagnosticCode::new(Category::Placement, 207),
                format!(
                    "bb_cost_check: {bb_cost_check} and bb_cost: {} differ in check_place",
                    self.totals.bb_cost
                ),
            ));
            errors += 1;
        }

        if let (Some(td), Some(analyzer)) = (self.td.as_ref(), analyzer) {
            // Pure re-total: criticality × committed delay, summed per net
            // then across nets.
            let mut timing_cost_check = 0.0f64;
            for net in &self.netlist.nets {
                if net.is_ignored {
                    continue;
                }
                let mut net_cost = 0.0f64;
                for ipin in 1..net.pins.len() {
                    net_cost += analyzer.criticality(net.id, ipin) as f64
                        * td.connection_delay[net.id.index()][ipin] as f64;
                }
                timing_cost_check += net_cost;
            }

            if (timing_cost_check - self.totals.timing_cost).abs()
                > self.totals.timing_cost * ERROR_TOL
            {
                self.sink.emit(Diagnostic::error(
                    DiagnosticCode::new(Category::Placement, 208),
                    format!(
                        "timing_cost_check: {timing_cost_check} and timing_cost: {} differ in check_place",
                        self.totals.timing_cost
                    ),
                ));
                errors += 1;
            }
        }

        errors
    }
}
