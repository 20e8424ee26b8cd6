//! The move evaluator: propose, price, accept or revert.
//!
//! `try_swap` is the annealing hot path. A proposed relocation is applied
//! tentatively to the primary location index only; every net reachable from
//! a moved block is re-priced through the shadow buffers; the blended cost
//! delta decides acceptance. Commit updates the grid inverse and promotes
//! the shadows; revert restores the locations and discards them. Either way
//! the shadow state is back to cleared before control returns.

use crate::anneal::Placer;
use crate::costs::PrevInverseCosts;
use crate::error::PlaceError;
use crate::move_gen::{MoveContext, MoveGenerator, MoveOutcome, MoveStats, Proposal};
use crate::timing::TimingContext;
use rand::rngs::StdRng;
use rand::Rng;

/// Metropolis acceptance test: downhill always, uphill with probability
/// `exp(−Δc / t)`, and never uphill at zero temperature.
pub(crate) fn assess_swap(rng: &mut StdRng, delta_c: f64, t: f64) -> MoveOutcome {
    if delta_c <= 0.0 {
        return MoveOutcome::Accepted;
    }

    if t == 0.0 {
        return MoveOutcome::Rejected;
    }

    let fnum: f64 = rng.gen();
    let prob_fac = (-delta_c / t).exp();
    if prob_fac > fnum {
        return MoveOutcome::Accepted;
    }

    MoveOutcome::Rejected
}

/// Blends the two cost deltas into one normalized delta. In timing-driven
/// mode both components are scaled by the inverses captured at the last
/// temperature, so the delta is relative to 1.
pub(crate) fn blend_delta(
    bb_delta: f64,
    timing_delta: f64,
    timing_tradeoff: f32,
    prev_inverse: &PrevInverseCosts,
) -> f64 {
    (1.0 - timing_tradeoff as f64) * bb_delta * prev_inverse.bb_cost
        + timing_tradeoff as f64 * timing_delta * prev_inverse.timing_cost
}

impl Placer<'_> {
    /// Proposes, evaluates, and resolves one move. Returns whether it was
    /// accepted, rejected, or aborted; cost totals are updated on
    /// acceptance.
    pub(crate) fn try_swap(
        &mut self,
        t: f64,
        rlim: f32,
        move_gen: &mut dyn MoveGenerator,
        mut timing: Option<&mut TimingContext<'_>>,
    ) -> Result<MoveOutcome, PlaceError> {
        self.counters.swaps_called += 1;

        let timing_mode = self.td.is_some();

        // Occasionally lift the range limit entirely, to escape local
        // minima the window cannot see out of.
        let mut rlim = rlim;
        if self.config.rlim_escape_fraction > 0.0
            && self.rng.gen::<f32>() < self.config.rlim_escape_fraction
        {
            rlim = f32::INFINITY;
        }

        let proposal = {
            let ctx = MoveContext {
                netlist: self.netlist,
                grid: self.grid,
                state: &self.state,
            };
            move_gen.propose(&ctx, &mut self.blocks_affected, rlim, &mut self.rng)
        };

        let mut delta_c = 0.0;
        let mut bb_delta_c = 0.0;
        let mut timing_delta_c = 0.0;

        let outcome = if proposal == Proposal::Abort {
            // Proposed move is not legal; give up on this move.
            self.log_aborted_move(t)?;
            MoveOutcome::Aborted
        } else {
            // The move is applied to the primary location index first so
            // the cost engines see the tentative positions; the grid
            // inverse is only updated if the move is accepted.
            let stats_header = self.capture_move_stats_header();
            self.state.apply_move(&self.blocks_affected);

            let (bb_d, td_d) =
                self.find_affected_nets_and_update_costs(timing.as_mut().map(|tc| &mut **tc))?;
            bb_delta_c = bb_d;
            timing_delta_c = td_d;

            delta_c = if timing_mode {
                blend_delta(
                    bb_delta_c,
                    timing_delta_c,
                    self.config.timing_tradeoff,
                    &self.prev_inverse,
                )
            } else {
                bb_delta_c
            };

            let outcome = assess_swap(&mut self.rng, delta_c, t);

            if outcome == MoveOutcome::Accepted {
                self.totals.cost += delta_c;
                self.totals.bb_cost += bb_delta_c;

                if let Some(tc) = timing.as_mut() {
                    self.totals.timing_cost += timing_delta_c;

                    if let Some(td) = self.td.as_mut() {
                        // Invalidation relies on proposed != committed
                        // delays, so it must precede the commit.
                        td.invalidate_affected_connection_delays(
                            self.netlist,
                            &self.blocks_affected,
                            &mut *tc.analyzer,
                        );
                        td.commit_td_cost(self.netlist, &self.blocks_affected);
                    }
                }

                self.costs.update_move_nets(self.netlist);
                self.state.commit_move(&self.blocks_affected);
            } else {
                self.costs.reset_move_nets();
                self.state.revert_move(&self.blocks_affected);

                if let Some(td) = self.td.as_mut() {
                    td.revert_td_cost(self.netlist, &self.blocks_affected);
                }
            }

            if let Some((from_blk, to_blk, from_type, to_type, blk_count)) = stats_header {
                let label = match outcome {
                    MoveOutcome::Accepted => "ACCEPTED",
                    _ => "REJECTED",
                };
                if let Some(log) = self.move_stats.as_mut() {
                    log.log_move(
                        t,
                        from_blk,
                        to_blk,
                        &from_type,
                        &to_type,
                        blk_count,
                        delta_c,
                        bb_delta_c,
                        timing_delta_c,
                        label,
                        "",
                    )?;
                }
            }

            outcome
        };

        let stats = MoveStats {
            outcome,
            delta_cost_norm: delta_c,
            delta_bb_cost_norm: bb_delta_c * self.prev_inverse.bb_cost,
            delta_timing_cost_norm: timing_delta_c * self.prev_inverse.timing_cost,
            delta_bb_cost_abs: bb_delta_c,
            delta_timing_cost_abs: timing_delta_c,
        };
        move_gen.process_outcome(&stats);

        self.blocks_affected.clear();

        Ok(outcome)
    }

    /// Walks every pin of every moved block, marking each reachable net
    /// once, updating its shadow bounding box, and (in timing mode)
    /// accumulating the per-connection timing delta. Returns the
    /// bounding-box and timing cost deltas.
    fn find_affected_nets_and_update_costs(
        &mut self,
        mut timing: Option<&mut TimingContext<'_>>,
    ) -> Result<(f64, f64), PlaceError> {
        let netlist = self.netlist;
        let grid = self.grid;
        let mut timing_delta_c = 0.0;

        for imoved in 0..self.blocks_affected.moved.len() {
            let moved = self.blocks_affected.moved[imoved];

            for &pin_id in netlist.block_pins(moved.block) {
                let net = netlist.pin(pin_id).net;

                // Global nets span the whole chip and do not affect costs.
                if netlist.net(net).is_ignored {
                    continue;
                }

                self.costs.record_affected_net(net);

                // The net cost itself is priced later, once per net.
                self.costs.update_net_bb(
                    net,
                    netlist,
                    self.state.block_locations(),
                    grid,
                    (moved.old_loc.x, moved.old_loc.y),
                    (moved.new_loc.x, moved.new_loc.y),
                );

                if let Some(tc) = timing.as_mut() {
                    if let Some(td) = self.td.as_mut() {
                        td.update_td_delta_costs(
                            netlist,
                            grid,
                            self.state.block_locations(),
                            tc.delay_model,
                            &*tc.analyzer,
                            net,
                            pin_id,
                            &mut self.blocks_affected,
                            &mut timing_delta_c,
                        )?;
                    }
                }
            }
        }

        let bb_delta_c = self
            .costs
            .finalize_affected_net_costs(netlist, &self.chan_fac);

        Ok((bb_delta_c, timing_delta_c))
    }

    /// Snapshot of the move-stats row header, taken before the move is
    /// applied (so the target occupant is the pre-move one). `None` when
    /// logging is off.
    fn capture_move_stats_header(&self) -> Option<(i64, i64, String, String, usize)> {
        self.move_stats.as_ref()?;
        let first = self.blocks_affected.moved.first()?;

        let from_type = self
            .grid
            .logical_type(self.netlist.block(first.block).logical_type)
            .name
            .clone();
        let occupant = self
            .state
            .grid_block(first.new_loc.x, first.new_loc.y, first.new_loc.subtile);
        let (to_blk, to_type) = match occupant {
            Some(b) => (
                b.as_raw() as i64,
                self.grid
                    .logical_type(self.netlist.block(b).logical_type)
                    .name
                    .clone(),
            ),
            None => (-1, "EMPTY".to_string()),
        };

        Some((
            first.block.as_raw() as i64,
            to_blk,
            from_type,
            to_type,
            self.blocks_affected.moved.len(),
        ))
    }

    /// Logs an aborted proposal when move-stats logging is on.
    fn log_aborted_move(&mut self, t: f64) -> Result<(), PlaceError> {
        if let Some(log) = self.move_stats.as_mut() {
            log.log_move(
                t,
                -1,
                -1,
                "-",
                "-",
                0,
                f64::NAN,
                f64::NAN,
                f64::NAN,
                "ABORTED",
                "illegal move",
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bbox;
    use crate::config::{PlaceAlgorithm, PlacerConfig};
    use crate::costs::BbUpdateState;
    use crate::ids::BlockId;
    use crate::netlist::PlaceNetlist;
    use crate::testing::{uniform_grid, ManhattanDelay, MockAnalyzer};
    use ember_device::{DeviceGrid, Location, LogicalTypeId};
    use ember_diagnostics::DiagnosticSink;
    use rand::SeedableRng;

    fn lb() -> LogicalTypeId {
        LogicalTypeId::from_raw(0)
    }

    /// Replays a fixed list of relocations, then aborts.
    struct ScriptedMoves {
        moves: Vec<Vec<(BlockId, Location)>>,
        next: usize,
    }

    impl ScriptedMoves {
        fn new(moves: Vec<Vec<(BlockId, Location)>>) -> Self {
            Self { moves, next: 0 }
        }
    }

    impl MoveGenerator for ScriptedMoves {
        fn propose(
            &mut self,
            ctx: &MoveContext<'_>,
            affected: &mut crate::state::BlocksAffected,
            _rlim: f32,
            _rng: &mut StdRng,
        ) -> Proposal {
            let Some(step) = self.moves.get(self.next) else {
                return Proposal::Abort;
            };
            for &(block, to) in step {
                affected.push(block, ctx.state.block_location(block), to);
            }
            self.next += 1;
            Proposal::Valid
        }

        fn process_outcome(&mut self, _stats: &MoveStats) {}
    }

    #[test]
    fn downhill_always_accepted() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(assess_swap(&mut rng, -1.0, 5.0), MoveOutcome::Accepted);
        assert_eq!(assess_swap(&mut rng, 0.0, 5.0), MoveOutcome::Accepted);
        assert_eq!(assess_swap(&mut rng, -1.0, 0.0), MoveOutcome::Accepted);
    }

    #[test]
    fn zero_temperature_rejects_uphill() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert_eq!(assess_swap(&mut rng, 1e-9, 0.0), MoveOutcome::Rejected);
        }
    }

    #[test]
    fn uphill_acceptance_matches_boltzmann_probability() {
        let mut rng = StdRng::seed_from_u64(123);
        let delta = 1.0;
        let t = 1.0;
        let trials = 1_000_000u32;
        let mut accepted = 0u32;
        for _ in 0..trials {
            if assess_swap(&mut rng, delta, t) == MoveOutcome::Accepted {
                accepted += 1;
            }
        }
        let p = (-delta / t).exp();
        let sigma = (p * (1.0 - p) / trials as f64).sqrt();
        let observed = accepted as f64 / trials as f64;
        assert!(
            (observed - p).abs() < 3.0 * sigma,
            "observed {observed}, expected {p} ± {}",
            3.0 * sigma
        );
    }

    #[test]
    fn blended_delta_cancels_symmetric_components() {
        // With tradeoff 0.5 and unit inverses, +2 wiring and −2 timing
        // cancel exactly: the move is accepted at any temperature.
        let prev = PrevInverseCosts {
            bb_cost: 1.0,
            timing_cost: 1.0,
        };
        let delta = blend_delta(2.0, -2.0, 0.5, &prev);
        assert_eq!(delta, 0.0);
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(assess_swap(&mut rng, delta, 0.0), MoveOutcome::Accepted);
        assert_eq!(assess_swap(&mut rng, delta, 1e-30), MoveOutcome::Accepted);
    }

    fn two_block_placer<'a>(
        nl: &'a PlaceNetlist,
        grid: &'a DeviceGrid,
        sink: &'a DiagnosticSink,
    ) -> Placer<'a> {
        let mut placer = Placer::new(
            nl,
            grid,
            vec![Location::new(1, 1, 0), Location::new(2, 2, 0)],
            vec![],
            PlacerConfig::default(),
            sink,
        )
        .unwrap();
        let mut timing = None;
        placer.load_initial_costs(&mut timing).unwrap();
        placer
    }

    #[test]
    fn trivial_two_block_swap_is_free_and_accepted() {
        // Grid 4×4, unit channels, cost exponent 1, one net a→b:
        // net cost = (Δx+1)·crossing(2) + (Δy+1)·crossing(2) = 2 + 2 = 4.
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", lb());
        let b = nl.add_block("b", lb());
        nl.add_net("n", a, &[b]);
        let grid = uniform_grid(4, 4, 1);
        let sink = DiagnosticSink::new();
        let mut placer = two_block_placer(&nl, &grid, &sink);
        assert_eq!(placer.totals.bb_cost, 4.0);

        // Swapping the two blocks leaves the bounding box unchanged.
        let mut gen = ScriptedMoves::new(vec![vec![
            (a, Location::new(2, 2, 0)),
            (b, Location::new(1, 1, 0)),
        ]]);
        let outcome = placer.try_swap(0.0, 3.0, &mut gen, None).unwrap();
        assert_eq!(outcome, MoveOutcome::Accepted);
        assert_eq!(placer.counters.accepted, 0); // tallied by the inner loop
        assert_eq!(placer.totals.bb_cost, 4.0);
        assert_eq!(placer.state.block_location(a), Location::new(2, 2, 0));
        assert_eq!(placer.state.block_location(b), Location::new(1, 1, 0));
        assert_eq!(placer.state.grid_block(2, 2, 0), Some(a));
        assert_eq!(placer.state.grid_block(1, 1, 0), Some(b));
    }

    #[test]
    fn rejected_move_leaves_state_byte_identical() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", lb());
        let b = nl.add_block("b", lb());
        let c = nl.add_block("c", lb());
        nl.add_net("n0", a, &[b]);
        nl.add_net("n1", b, &[c]);
        let grid = uniform_grid(6, 6, 1);
        let sink = DiagnosticSink::new();
        let mut placer = Placer::new(
            &nl,
            &grid,
            vec![
                Location::new(1, 1, 0),
                Location::new(2, 1, 0),
                Location::new(2, 2, 0),
            ],
            vec![],
            PlacerConfig::default(),
            &sink,
        )
        .unwrap();
        let mut timing = None;
        placer.load_initial_costs(&mut timing).unwrap();

        let locs_before = placer.state.block_locations().to_vec();
        let net_cost_before = placer.costs.net_cost.clone();
        let bb_before = placer.costs.bb_coords.clone();
        let totals_before = placer.totals;

        // Stretch b far away: strictly uphill, rejected at t = 0.
        let uphill = vec![vec![(b, Location::new(4, 4, 0))]];
        for _ in 0..3 {
            let mut gen = ScriptedMoves::new(uphill.clone());
            let outcome = placer.try_swap(0.0, 5.0, &mut gen, None).unwrap();
            assert_eq!(outcome, MoveOutcome::Rejected);

            assert_eq!(placer.state.block_locations(), &locs_before[..]);
            assert_eq!(placer.costs.net_cost, net_cost_before);
            assert_eq!(placer.costs.bb_coords, bb_before);
            assert_eq!(placer.totals.bb_cost.to_bits(), totals_before.bb_cost.to_bits());
            assert_eq!(placer.totals.cost.to_bits(), totals_before.cost.to_bits());
            // Shadows cleared between moves.
            assert!(placer.costs.ts_nets_to_update.is_empty());
            assert!(placer.costs.proposed_net_cost.iter().all(|&c| c == -1.0));
            assert!(placer
                .costs
                .bb_updated_before
                .iter()
                .all(|&s| s == BbUpdateState::NotYet));
        }
    }

    #[test]
    fn aborted_proposal_changes_nothing() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", lb());
        let b = nl.add_block("b", lb());
        nl.add_net("n", a, &[b]);
        let grid = uniform_grid(4, 4, 1);
        let sink = DiagnosticSink::new();
        let mut placer = two_block_placer(&nl, &grid, &sink);
        let totals_before = placer.totals;

        let mut gen = ScriptedMoves::new(vec![]);
        let outcome = placer.try_swap(1.0, 3.0, &mut gen, None).unwrap();
        assert_eq!(outcome, MoveOutcome::Aborted);
        assert_eq!(placer.totals.bb_cost, totals_before.bb_cost);
        assert_eq!(placer.counters.swaps_called, 1);
        assert!(placer.blocks_affected.moved.is_empty());
    }

    #[test]
    fn committed_boxes_match_from_scratch_after_moves() {
        // A net large enough for incremental updates plus small nets.
        let mut nl = PlaceNetlist::new();
        let blocks: Vec<_> = (0..6).map(|i| nl.add_block(format!("b{i}"), lb())).collect();
        nl.add_net("wide", blocks[0], &blocks[1..6].to_vec());
        nl.add_net("pair", blocks[2], &[blocks[3]]);
        let grid = uniform_grid(8, 8, 2);
        let sink = DiagnosticSink::new();
        let initial = vec![
            Location::new(1, 1, 0),
            Location::new(3, 2, 0),
            Location::new(5, 5, 0),
            Location::new(2, 6, 0),
            Location::new(6, 3, 0),
            Location::new(4, 4, 0),
        ];
        let mut placer = Placer::new(
            &nl,
            &grid,
            initial,
            vec![],
            PlacerConfig {
                seed: 13,
                ..PlacerConfig::default()
            },
            &sink,
        )
        .unwrap();
        let mut timing = None;
        placer.load_initial_costs(&mut timing).unwrap();

        let mut gen = crate::move_gen::UniformMoveGenerator::new();
        for _ in 0..500 {
            placer.try_swap(0.5, 6.0, &mut gen, None).unwrap();
        }

        for net in &nl.nets {
            let (bb, edges) = bbox::bb_from_scratch(
                &nl,
                placer.state.block_locations(),
                &grid,
                net.id,
            );
            if nl.num_sinks(net.id) >= crate::costs::SMALL_NET {
                assert_eq!(placer.costs.bb_coords[net.id.index()], bb);
                assert_eq!(placer.costs.bb_num_on_edges[net.id.index()], edges);
            } else {
                assert_eq!(placer.costs.bb_coords[net.id.index()], bb);
            }
        }

        // Running total within tolerance of a from-scratch recomputation.
        let (check, _) = crate::costs::comp_bb_cost_check(
            &nl,
            placer.state.block_locations(),
            &grid,
            &placer.chan_fac,
        );
        assert!((placer.totals.bb_cost - check).abs() <= check * crate::costs::ERROR_TOL);
    }

    #[test]
    fn long_move_sequence_keeps_timing_totals_bit_identical() {
        // Thousands of timing-driven moves interleaved with criticality
        // updates: the incremental total must stay bit-identical to a
        // from-scratch recomputation, not merely close.
        let mut nl = PlaceNetlist::new();
        let blocks: Vec<_> = (0..6).map(|i| nl.add_block(format!("b{i}"), lb())).collect();
        nl.add_net("wide", blocks[0], &blocks[1..6].to_vec());
        nl.add_net("pair0", blocks[1], &[blocks[2]]);
        nl.add_net("pair1", blocks[4], &[blocks[5], blocks[0]]);
        let grid = uniform_grid(8, 8, 2);
        let sink = DiagnosticSink::new();
        let config = PlacerConfig {
            algorithm: PlaceAlgorithm::PathTimingDriven,
            seed: 21,
            ..PlacerConfig::default()
        };
        let initial = vec![
            Location::new(1, 1, 0),
            Location::new(3, 2, 0),
            Location::new(5, 5, 0),
            Location::new(2, 6, 0),
            Location::new(6, 3, 0),
            Location::new(4, 4, 0),
        ];
        let mut placer = Placer::new(&nl, &grid, initial, vec![], config, &sink).unwrap();
        let dm = ManhattanDelay { unit: 0.25 };
        let mut analyzer = MockAnalyzer::new(&nl, 0.8);
        let mut timing = Some(crate::timing::TimingContext {
            delay_model: &dm,
            analyzer: &mut analyzer,
        });
        placer.load_initial_costs(&mut timing).unwrap();

        let mut gen = crate::move_gen::UniformMoveGenerator::new();
        let mut tc = timing;
        for round in 0..20u32 {
            for _ in 0..500 {
                placer.try_swap(0.8, 7.0, &mut gen, tc.as_mut()).unwrap();
            }
            // Two STA refreshes per round, as criticalities drift.
            for bump in 0..2u32 {
                if let Some(tc) = tc.as_mut() {
                    placer.recompute_criticalities(1.0 + (round + bump) as f32 * 0.1, tc);
                }
            }

            if let Some(td) = placer.td.as_mut() {
                if let Some(tc) = tc.as_ref() {
                    let incremental = td.update_td_costs(&nl, &*tc.analyzer);
                    let mut scratch = td.clone();
                    let from_scratch = scratch.comp_td_costs(&nl, &*tc.analyzer);
                    assert_eq!(incremental.to_bits(), from_scratch.to_bits());
                }
            }
        }
    }

    #[test]
    fn timing_driven_swap_commits_and_invalidates() {
        let mut nl = PlaceNetlist::new();
        let a = nl.add_block("a", lb());
        let b = nl.add_block("b", lb());
        let c = nl.add_block("c", lb());
        nl.add_net("n0", a, &[b, c]);
        let grid = uniform_grid(6, 6, 1);
        let sink = DiagnosticSink::new();
        let config = PlacerConfig {
            algorithm: PlaceAlgorithm::PathTimingDriven,
            timing_tradeoff: 0.5,
            ..PlacerConfig::default()
        };
        let mut placer = Placer::new(
            &nl,
            &grid,
            vec![
                Location::new(1, 1, 0),
                Location::new(2, 2, 0),
                Location::new(3, 3, 0),
            ],
            vec![],
            config,
            &sink,
        )
        .unwrap();
        let dm = ManhattanDelay { unit: 1.0 };
        let mut analyzer = MockAnalyzer::new(&nl, 1.0);
        let mut timing = Some(TimingContext {
            delay_model: &dm,
            analyzer: &mut analyzer,
        });
        placer.load_initial_costs(&mut timing).unwrap();
        let timing_before = placer.totals.timing_cost;
        assert_eq!(timing_before, 6.0); // a→b 2 + a→c 4

        // Pull b next to a: downhill in both objectives.
        let mut gen = ScriptedMoves::new(vec![vec![(b, Location::new(1, 2, 0))]]);
        let mut tc = timing;
        let outcome = placer
            .try_swap(0.0, 5.0, &mut gen, tc.as_mut())
            .unwrap();
        drop(tc);
        assert_eq!(outcome, MoveOutcome::Accepted);
        assert_eq!(placer.totals.timing_cost, 5.0);

        // The changed connection was invalidated before commit.
        assert_eq!(analyzer.invalidated, vec![nl.net_pin(crate::ids::NetId::from_raw(0), 1)]);

        // Committed delay matches the new location.
        let td = placer.td.as_ref().unwrap();
        assert_eq!(td.connection_delay[0][1], 1.0);
        assert!(td.proposed_connection_delay[0][1].is_nan());
    }
}
