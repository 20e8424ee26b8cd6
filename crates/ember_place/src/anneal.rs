//! The annealing controller.
//!
//! [`Placer`] owns all mutable placement state and drives the classic
//! simulated-annealing structure: an adaptive starting temperature, an outer
//! loop that cools according to the configured schedule and adapts the move
//! range limit, an inner loop of range-limited moves, and a final
//! zero-temperature quench. Timing-driven runs periodically re-run the
//! external STA and re-blend the two cost objectives.

use crate::chan_cost::ChanCostFactors;
use crate::config::{AnnealSchedule, EffortScaling, PlaceAlgorithm, PlacerConfig};
use crate::costs::{
    comp_bb_cost_check, CostState, CostTotals, PrevInverseCosts, ERROR_TOL,
    MAX_INV_TIMING_COST, MAX_MOVES_BEFORE_RECOMPUTE,
};
use crate::error::PlaceError;
use crate::macros::PlacementMacro;
use crate::move_gen::{MoveGenerator, MoveOutcome};
use crate::netlist::PlaceNetlist;
use crate::report::{
    save_placement, snapshot_filename, MoveStatsLog, PlacementReport, SwapCounters,
    TemperatureStats,
};
use crate::state::{BlocksAffected, PlacerState};
use crate::timing::TimingContext;
use crate::timing_cost::TimingCostState;
use ember_device::{DeviceGrid, Location};
use ember_diagnostics::{Category, Diagnostic, DiagnosticCode, DiagnosticSink};
use rand::rngs::StdRng;
use rand::SeedableRng;

/// The final range limit: 1 is the smallest value that can still make
/// progress, since a range limit of 0 would not allow any displacement.
const FINAL_RLIM: f32 = 1.0;

/// Effectively infinite temperature used while sampling the starting
/// temperature: essentially every move is accepted.
const STARTING_T_SAMPLE_TEMP: f64 = 1e30;

/// Evolving annealing-schedule state.
#[derive(Clone, Copy, Debug)]
pub(crate) struct AnnealState {
    /// Current temperature.
    pub t: f64,
    /// Current range limit for moves.
    pub rlim: f32,
    /// Precomputed `1 / (initial_rlim − FINAL_RLIM)`, used to interpolate
    /// the criticality exponent as the range limit shrinks.
    pub inverse_delta_rlim: f32,
    /// Current cooling factor.
    pub alpha: f32,
    /// Temperature to restart from (Dusty schedule).
    pub restart_t: f64,
    /// Current criticality-sharpening exponent.
    pub crit_exponent: f32,
    /// Maximum inner move limit.
    pub move_lim_max: usize,
    /// Inner move limit for the next temperature.
    pub move_lim: usize,
}

/// Per-temperature accumulators for the annealing statistics.
#[derive(Clone, Copy, Debug, Default)]
pub(crate) struct PlacerStats {
    pub av_cost: f64,
    pub av_bb_cost: f64,
    pub av_timing_cost: f64,
    pub sum_of_squares: f64,
    pub success_sum: usize,
}

/// The simulated-annealing placement core.
///
/// Construct with an initial (legal) placement, then call
/// [`run`](Self::run) with a move generator and, for timing-driven mode,
/// the timing collaborators.
pub struct Placer<'a> {
    pub(crate) netlist: &'a PlaceNetlist,
    pub(crate) grid: &'a DeviceGrid,
    pub(crate) sink: &'a DiagnosticSink,
    pub(crate) config: PlacerConfig,
    pub(crate) state: PlacerState,
    pub(crate) chan_fac: ChanCostFactors,
    pub(crate) costs: CostState,
    pub(crate) td: Option<TimingCostState>,
    pub(crate) totals: CostTotals,
    pub(crate) prev_inverse: PrevInverseCosts,
    pub(crate) rng: StdRng,
    pub(crate) counters: SwapCounters,
    pub(crate) blocks_affected: BlocksAffected,
    pub(crate) move_stats: Option<MoveStatsLog>,
}

impl<'a> Placer<'a> {
    /// Creates a placer over an initial placement.
    ///
    /// Validates the configuration, precomputes the channel cost factors,
    /// and allocates every cost structure (timing structures only in
    /// timing-driven mode). Fails fast on bad options or an illegal
    /// initial placement.
    pub fn new(
        netlist: &'a PlaceNetlist,
        grid: &'a DeviceGrid,
        initial: Vec<Location>,
        macros: Vec<PlacementMacro>,
        config: PlacerConfig,
        sink: &'a DiagnosticSink,
    ) -> Result<Self, PlaceError> {
        config.validate()?;

        let state = PlacerState::new(netlist, grid, initial, macros)?;
        let chan_fac = ChanCostFactors::new(grid, config.place_cost_exp, sink);
        let costs = CostState::new(netlist.net_count());
        let td = match config.algorithm {
            PlaceAlgorithm::PathTimingDriven => Some(TimingCostState::new(netlist)),
            PlaceAlgorithm::BoundingBox => None,
        };
        let move_stats = match &config.move_stats_file {
            Some(path) => Some(MoveStatsLog::create(path)?),
            None => None,
        };
        let rng = StdRng::seed_from_u64(config.seed);

        Ok(Self {
            netlist,
            grid,
            sink,
            config,
            state,
            chan_fac,
            costs,
            td,
            totals: CostTotals::default(),
            prev_inverse: PrevInverseCosts::default(),
            rng,
            counters: SwapCounters::default(),
            blocks_affected: BlocksAffected::new(),
            move_stats,
        })
    }

    /// The current placement state (block locations and grid occupancy).
    pub fn state(&self) -> &PlacerState {
        &self.state
    }

    /// The current cost totals.
    pub fn totals(&self) -> CostTotals {
        self.totals
    }

    /// Runs the full annealing schedule and returns the placement report.
    ///
    /// `timing` must be provided when (and only used when) the configured
    /// algorithm is timing-driven.
    pub fn run(
        &mut self,
        move_gen: &mut dyn MoveGenerator,
        timing: Option<TimingContext<'_>>,
    ) -> Result<PlacementReport, PlaceError> {
        let timing_mode = self.config.algorithm == PlaceAlgorithm::PathTimingDriven;
        if timing_mode && timing.is_none() {
            return Err(PlaceError::InvalidConfig(
                "timing-driven placement requires a delay model and timing analyzer".into(),
            ));
        }
        let mut timing = if timing_mode { timing } else { None };

        let num_connections = self.load_initial_costs(&mut timing)?;
        self.check_place(timing.as_ref().map(|tc| &*tc.analyzer))?;

        if self.config.placement_saves_per_temperature >= 1 {
            let path = self.config.placement_save_dir.join(snapshot_filename(0, 0));
            save_placement(&path, self.netlist, &self.state, self.grid)?;
        }

        // Moves per temperature, scaled by design (and optionally device)
        // size.
        let num_blocks = self.netlist.block_count();
        let mut move_lim = match self.config.effort_scaling {
            EffortScaling::Circuit => {
                (self.config.inner_num as f64 * (num_blocks as f64).powf(1.3333)) as usize
            }
            EffortScaling::DeviceCircuit => {
                let device_size = (self.grid.width() * self.grid.height()) as f64;
                (self.config.inner_num as f64
                    * device_size.powf(2.0 / 3.0)
                    * (num_blocks as f64).powf(2.0 / 3.0)) as usize
            }
        };
        if move_lim == 0 {
            move_lim = 1;
        }

        let inner_recompute_limit = recompute_limit(move_lim, self.config.inner_loop_recompute_divider);
        let quench_recompute_limit = recompute_limit(move_lim, self.config.quench_recompute_divider);

        let first_rlim = self.grid.max_range_limit();
        let first_t = self.starting_t(move_lim, first_rlim, move_gen, &mut timing)?;
        let first_crit_exponent = if timing_mode {
            self.config.td_place_exp_first
        } else {
            0.0
        };
        let mut anneal = init_annealing_state(
            &self.config.schedule,
            first_t,
            first_rlim,
            move_lim,
            first_crit_exponent,
        );

        let mut outer_crit_iter_count = 1usize;
        let mut moves_since_cost_recompute = 0usize;
        let mut tot_iter = 0usize;
        let mut num_temps = 0usize;
        let mut temperatures = Vec::new();

        // Outer loop of the simulated annealing.
        loop {
            if timing_mode {
                // The blended cost is normalized; reset it each temperature.
                self.totals.cost = 1.0;
            }

            self.outer_loop_recompute_criticalities(
                &mut timing,
                anneal.crit_exponent,
                &mut outer_crit_iter_count,
            );

            let mut stats = PlacerStats::default();
            self.placement_inner_loop(
                anneal.t,
                num_temps,
                anneal.rlim,
                anneal.move_lim,
                anneal.crit_exponent,
                inner_recompute_limit,
                &mut stats,
                &mut moves_since_cost_recompute,
                move_gen,
                &mut timing,
            )?;

            tot_iter += anneal.move_lim;
            let (success_rate, std_dev) = calc_placer_stats(&mut stats, &self.totals, anneal.move_lim);
            num_temps += 1;

            temperatures.push(TemperatureStats {
                temp_num: num_temps,
                t: anneal.t,
                av_cost: stats.av_cost,
                av_bb_cost: stats.av_bb_cost,
                av_timing_cost: stats.av_timing_cost,
                success_rate,
                std_dev,
                rlim: anneal.rlim,
                crit_exponent: anneal.crit_exponent,
                alpha: anneal.alpha,
                tot_moves: tot_iter,
            });

            if !update_annealing_state(
                &mut anneal,
                success_rate,
                self.totals.cost,
                self.netlist.net_count(),
                &self.config.schedule,
                timing_mode,
                self.config.td_place_exp_first,
                self.config.td_place_exp_last,
                self.grid.max_range_limit(),
            ) {
                break;
            }
        }

        // Quench: accept only downhill moves, at the full move limit.
        {
            self.outer_loop_recompute_criticalities(
                &mut timing,
                anneal.crit_exponent,
                &mut outer_crit_iter_count,
            );

            anneal.t = 0.0;
            let mut stats = PlacerStats::default();
            self.placement_inner_loop(
                anneal.t,
                num_temps,
                anneal.rlim,
                move_lim,
                anneal.crit_exponent,
                quench_recompute_limit,
                &mut stats,
                &mut moves_since_cost_recompute,
                move_gen,
                &mut timing,
            )?;

            tot_iter += move_lim;
            let (success_rate, std_dev) = calc_placer_stats(&mut stats, &self.totals, move_lim);
            num_temps += 1;

            temperatures.push(TemperatureStats {
                temp_num: num_temps,
                t: anneal.t,
                av_cost: stats.av_cost,
                av_bb_cost: stats.av_bb_cost,
                av_timing_cost: stats.av_timing_cost,
                success_rate,
                std_dev,
                rlim: anneal.rlim,
                crit_exponent: anneal.crit_exponent,
                alpha: anneal.alpha,
                tot_moves: tot_iter,
            });
        }

        if self.config.placement_saves_per_temperature >= 1 {
            let path = self
                .config
                .placement_save_dir
                .join(snapshot_filename(num_temps + 1, 0));
            save_placement(&path, self.netlist, &self.state, self.grid)?;
        }

        // Final timing estimate at the last criticality exponent.
        if let Some(tc) = timing.as_mut() {
            self.recompute_criticalities(anneal.crit_exponent, tc);
        }

        self.check_place(timing.as_ref().map(|tc| &*tc.analyzer))?;

        let (_, estimated_wirelength) = comp_bb_cost_check(
            self.netlist,
            self.state.block_locations(),
            self.grid,
            &self.chan_fac,
        );

        Ok(PlacementReport {
            cost: self.totals.cost,
            bb_cost: self.totals.bb_cost,
            timing_cost: self.totals.timing_cost,
            estimated_wirelength,
            num_connections,
            moves_per_temperature: move_lim,
            num_temperatures: num_temps,
            swaps: self.counters,
            temperatures,
        })
    }

    /// Loads the bounding boxes, costs, and (in timing mode) connection
    /// delays and criticalities of the initial placement. Returns the
    /// number of point-to-point connections.
    pub(crate) fn load_initial_costs(
        &mut self,
        timing: &mut Option<TimingContext<'_>>,
    ) -> Result<usize, PlaceError> {
        self.totals.bb_cost = self.costs.comp_bb_cost_normal(
            self.netlist,
            self.state.block_locations(),
            self.grid,
            &self.chan_fac,
        );

        if let Some(tc) = timing.as_mut() {
            let num_connections = self.netlist.count_connections();

            if let Some(td) = self.td.as_mut() {
                td.comp_td_connection_delays(
                    self.netlist,
                    self.grid,
                    self.state.block_locations(),
                    tc.delay_model,
                )?;
            }
            self.recompute_criticalities(self.config.td_place_exp_first, tc);

            self.prev_inverse.timing_cost = 1.0 / self.totals.timing_cost;
            self.prev_inverse.bb_cost = 1.0 / self.totals.bb_cost;
            // The blended cost is normalized to 1 at each temperature.
            self.totals.cost = 1.0;
            Ok(num_connections)
        } else {
            self.totals.cost = self.totals.bb_cost;
            self.totals.timing_cost = 0.0;
            self.prev_inverse.bb_cost = 0.0;
            self.prev_inverse.timing_cost = 0.0;
            Ok(0)
        }
    }

    /// Finds the starting temperature: one batch of essentially-always-
    /// accepted moves, then 20× the standard deviation of the accepted
    /// costs. A fixed (User) schedule skips the sampling.
    fn starting_t(
        &mut self,
        max_moves: usize,
        rlim: f32,
        move_gen: &mut dyn MoveGenerator,
        timing: &mut Option<TimingContext<'_>>,
    ) -> Result<f64, PlaceError> {
        if let AnnealSchedule::User { init_t, .. } = self.config.schedule {
            return Ok(init_t as f64);
        }

        let move_lim = max_moves.min(self.netlist.block_count());
        let mut num_accepted = 0usize;
        let mut av = 0.0f64;
        let mut sum_of_squares = 0.0f64;

        for _ in 0..move_lim {
            let outcome =
                self.try_swap(STARTING_T_SAMPLE_TEMP, rlim, move_gen, timing.as_mut())?;
            match outcome {
                MoveOutcome::Accepted => {
                    num_accepted += 1;
                    av += self.totals.cost;
                    sum_of_squares += self.totals.cost * self.totals.cost;
                    self.counters.accepted += 1;
                }
                MoveOutcome::Aborted => self.counters.aborted += 1,
                MoveOutcome::Rejected => self.counters.rejected += 1,
            }
        }

        if num_accepted != 0 {
            av /= num_accepted as f64;
        } else {
            av = 0.0;
        }

        let std_dev = get_std_dev(num_accepted, sum_of_squares, av);

        if num_accepted != move_lim {
            self.sink.emit(Diagnostic::warning(
                DiagnosticCode::new(Category::Warning, 110),
                format!("Starting t: {num_accepted} of {move_lim} configurations accepted."),
            ));
        }

        Ok(20.0 * std_dev)
    }

    /// Timing-mode bookkeeping at the top of each outer iteration: re-run
    /// STA at the configured cadence, then refresh the normalization
    /// inverses used to blend the two objectives.
    fn outer_loop_recompute_criticalities(
        &mut self,
        timing: &mut Option<TimingContext<'_>>,
        crit_exponent: f32,
        outer_crit_iter_count: &mut usize,
    ) {
        let Some(tc) = timing.as_mut() else { return };

        if *outer_crit_iter_count >= self.config.recompute_crit_iter as usize
            || self.config.inner_loop_recompute_divider != 0
        {
            self.recompute_criticalities(crit_exponent, tc);
            *outer_crit_iter_count = 0;
        }
        *outer_crit_iter_count += 1;

        self.prev_inverse.bb_cost = 1.0 / self.totals.bb_cost;
        self.prev_inverse.timing_cost = (1.0 / self.totals.timing_cost).min(MAX_INV_TIMING_COST);
    }

    /// Re-runs STA, sharpens criticalities, and folds the new
    /// criticalities into the timing cost.
    pub(crate) fn recompute_criticalities(
        &mut self,
        crit_exponent: f32,
        tc: &mut TimingContext<'_>,
    ) {
        tc.analyzer.update_slacks();
        tc.analyzer.update_criticalities(crit_exponent);
        if let Some(td) = self.td.as_mut() {
            self.totals.timing_cost = td.update_td_costs(self.netlist, &*tc.analyzer);
        }
        tc.analyzer.reset_invalidation();
    }

    /// One temperature's worth of moves.
    #[allow(clippy::too_many_arguments)]
    fn placement_inner_loop(
        &mut self,
        t: f64,
        temp_num: usize,
        rlim: f32,
        move_lim: usize,
        crit_exponent: f32,
        recompute_limit: usize,
        stats: &mut PlacerStats,
        moves_since_cost_recompute: &mut usize,
        move_gen: &mut dyn MoveGenerator,
        timing: &mut Option<TimingContext<'_>>,
    ) -> Result<(), PlaceError> {
        let mut inner_crit_iter_count = 1usize;
        let mut inner_placement_save_count = 0usize;

        for inner_iter in 0..move_lim {
            let outcome = self.try_swap(t, rlim, move_gen, timing.as_mut())?;
            match outcome {
                MoveOutcome::Accepted => {
                    stats.success_sum += 1;
                    stats.av_cost += self.totals.cost;
                    stats.av_bb_cost += self.totals.bb_cost;
                    stats.av_timing_cost += self.totals.timing_cost;
                    stats.sum_of_squares += self.totals.cost * self.totals.cost;
                    self.counters.accepted += 1;
                }
                MoveOutcome::Aborted => self.counters.aborted += 1,
                MoveOutcome::Rejected => self.counters.rejected += 1,
            }

            if let Some(tc) = timing.as_mut() {
                // Mid-temperature STA refresh; expensive, so rationed, and
                // never on the last move of the temperature.
                if inner_crit_iter_count >= recompute_limit && inner_iter != move_lim - 1 {
                    inner_crit_iter_count = 0;
                    self.recompute_criticalities(crit_exponent, tc);
                }
                inner_crit_iter_count += 1;
            }

            // Bound accumulated round-off in the incrementally updated
            // totals; drift past the tolerance is a bug in the
            // incremental code.
            *moves_since_cost_recompute += 1;
            if *moves_since_cost_recompute > MAX_MOVES_BEFORE_RECOMPUTE {
                self.recompute_costs_from_scratch(timing)?;
                *moves_since_cost_recompute = 0;
            }

            let saves = self.config.placement_saves_per_temperature as usize;
            if saves >= 1 && inner_iter > 0 {
                let interval = (move_lim / saves).max(1);
                if (inner_iter + 1) % interval == 0 {
                    let path = self
                        .config
                        .placement_save_dir
                        .join(snapshot_filename(temp_num + 1, inner_placement_save_count));
                    save_placement(&path, self.netlist, &self.state, self.grid)?;
                    inner_placement_save_count += 1;
                }
            }
        }

        Ok(())
    }

    /// Recomputes both totals from scratch and fails if the incrementally
    /// maintained values drifted past the tolerance.
    pub(crate) fn recompute_costs_from_scratch(
        &mut self,
        timing: &mut Option<TimingContext<'_>>,
    ) -> Result<(), PlaceError> {
        let new_bb_cost = self.costs.recompute_bb_cost(self.netlist);
        if (new_bb_cost - self.totals.bb_cost).abs() > self.totals.bb_cost * ERROR_TOL {
            return Err(PlaceError::CostDrift {
                kind: "bb",
                new_cost: new_bb_cost,
                old_cost: self.totals.bb_cost,
            });
        }
        self.totals.bb_cost = new_bb_cost;

        if let Some(tc) = timing.as_mut() {
            if let Some(td) = self.td.as_mut() {
                let new_timing_cost = td.comp_td_costs(self.netlist, &*tc.analyzer);
                if (new_timing_cost - self.totals.timing_cost).abs()
                    > self.totals.timing_cost * ERROR_TOL
                {
                    return Err(PlaceError::CostDrift {
                        kind: "timing",
                        new_cost: new_timing_cost,
                        old_cost: self.totals.timing_cost,
                    });
                }
                self.totals.timing_cost = new_timing_cost;
            }
        } else {
            self.totals.cost = new_bb_cost;
        }

        Ok(())
    }
}

/// Mid-temperature recompute cadence: `divider` refreshes per temperature,
/// or effectively never when the divider is zero.
fn recompute_limit(move_lim: usize, divider: u32) -> usize {
    if divider != 0 {
        (0.5 + move_lim as f32 / divider as f32) as usize
    } else {
        move_lim + 1
    }
}

pub(crate) fn init_annealing_state(
    schedule: &AnnealSchedule,
    t: f64,
    rlim: f32,
    move_lim_max: usize,
    crit_exponent: f32,
) -> AnnealState {
    let alpha = match *schedule {
        AnnealSchedule::User { alpha_t, .. } => alpha_t,
        AnnealSchedule::Auto => 0.8,
        AnnealSchedule::Dusty { alpha_min, .. } => alpha_min,
    };
    let move_lim_max = move_lim_max.max(1);
    let move_lim = match *schedule {
        AnnealSchedule::Dusty { success_target, .. } => {
            ((move_lim_max as f32 * success_target) as usize).max(1)
        }
        _ => move_lim_max,
    };
    AnnealState {
        t,
        rlim,
        inverse_delta_rlim: 1.0 / (rlim - FINAL_RLIM),
        alpha,
        restart_t: t,
        crit_exponent,
        move_lim_max,
        move_lim,
    }
}

/// Sample standard deviation over `n` points with the given sum of squares
/// and mean. Double precision throughout: round-off is a real problem in
/// the starting-temperature estimate on big circuits.
pub(crate) fn get_std_dev(n: usize, sum_x_squared: f64, av_x: f64) -> f64 {
    if n <= 1 {
        return 0.0;
    }
    let variance = (sum_x_squared - n as f64 * av_x * av_x) / (n as f64 - 1.0);
    if variance > 0.0 {
        variance.sqrt()
    } else {
        // Very small variances sometimes round negative.
        0.0
    }
}

/// Finalizes one temperature's statistics and returns the success rate and
/// standard deviation of the accepted-move costs.
pub(crate) fn calc_placer_stats(
    stats: &mut PlacerStats,
    totals: &CostTotals,
    move_lim: usize,
) -> (f32, f64) {
    let success_rate = stats.success_sum as f32 / move_lim as f32;
    if stats.success_sum == 0 {
        stats.av_cost = totals.cost;
        stats.av_bb_cost = totals.bb_cost;
        stats.av_timing_cost = totals.timing_cost;
    } else {
        stats.av_cost /= stats.success_sum as f64;
        stats.av_bb_cost /= stats.success_sum as f64;
        stats.av_timing_cost /= stats.success_sum as f64;
    }
    let std_dev = get_std_dev(stats.success_sum, stats.sum_of_squares, stats.av_cost);
    (success_rate, std_dev)
}

/// Advances the annealing schedule after one outer iteration.
///
/// Returns `false` when the exit criterion is met. Each schedule keeps its
/// historical quirks: `User` adjusts only the temperature, and `Auto`
/// exits before the range-limit update on the iteration that trips the
/// exit test.
#[allow(clippy::too_many_arguments)]
pub(crate) fn update_annealing_state(
    state: &mut AnnealState,
    success_rate: f32,
    cost: f64,
    num_nets: usize,
    schedule: &AnnealSchedule,
    timing_mode: bool,
    exp_first: f32,
    exp_last: f32,
    max_rlim: f32,
) -> bool {
    if let AnnealSchedule::User {
        exit_t, alpha_t, ..
    } = *schedule
    {
        state.t *= alpha_t as f64;
        return state.t >= exit_t as f64;
    }

    // May be NaN when there are no nets; both automatic schedules treat
    // that as "exit now".
    let t_exit = 0.005 * cost / num_nets as f64;

    if let AnnealSchedule::Dusty {
        alpha_max,
        alpha_decay,
        success_min,
        success_target,
        ..
    } = *schedule
    {
        let restart_temp = state.t < t_exit || t_exit.is_nan();
        if success_rate < success_min || restart_temp {
            if state.alpha > alpha_max {
                return false;
            }
            // Take a half step back from the restart temperature and slow
            // the cooling.
            state.t = state.restart_t / (state.alpha as f64).sqrt();
            state.alpha = 1.0 - (1.0 - state.alpha) * alpha_decay;
        } else {
            if success_rate > success_target {
                state.restart_t = state.t;
            }
            state.t *= state.alpha as f64;
        }
        state.move_lim = ((state.move_lim_max as f32 * (success_target / success_rate)) as usize)
            .min(state.move_lim_max)
            .max(1);
    } else {
        // Auto schedule: pick alpha from the success rate.
        state.alpha = if success_rate > 0.96 {
            0.5
        } else if success_rate > 0.8 {
            0.9
        } else if success_rate > 0.15 || state.rlim > 1.0 {
            0.95
        } else {
            0.8
        };
        state.t *= state.alpha as f64;

        if state.t < t_exit || t_exit.is_nan() {
            return false;
        }
    }

    update_rlim(state, success_rate, max_rlim);

    if timing_mode {
        // As the range limit shrinks we are fine-tuning an already-good
        // placement, so the exponent climbs to focus on the most critical
        // connections.
        state.crit_exponent = (1.0 - (state.rlim - FINAL_RLIM) * state.inverse_delta_rlim)
            * (exp_last - exp_first)
            + exp_first;
    }

    true
}

/// Keeps the acceptance probability near 0.44 by widening or narrowing the
/// move window; floating point so low temperatures transition gradually.
fn update_rlim(state: &mut AnnealState, success_rate: f32, max_rlim: f32) {
    state.rlim *= 1.0 - 0.44 + success_rate;
    state.rlim = state.rlim.min(max_rlim).max(FINAL_RLIM);
}
