//! Placement reports, snapshots, and the move-stats log.
//!
//! The annealer is a library: instead of printing its status table it
//! records one [`TemperatureStats`] row per temperature into the final
//! [`PlacementReport`]. Placement snapshots and the per-move CSV log are the
//! only files the placer writes, and only when configured to.

use crate::netlist::PlaceNetlist;
use crate::state::PlacerState;
use ember_device::DeviceGrid;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;

/// Running totals of move outcomes.
#[derive(Clone, Copy, Debug, Default, Serialize, Deserialize)]
pub struct SwapCounters {
    /// Moves applied and kept.
    pub accepted: usize,
    /// Moves evaluated and undone.
    pub rejected: usize,
    /// Proposals that never produced a legal move.
    pub aborted: usize,
    /// Total `try_swap` invocations.
    pub swaps_called: usize,
}

impl SwapCounters {
    /// Total move attempts (accepted + rejected + aborted).
    pub fn total_attempts(&self) -> usize {
        self.accepted + self.rejected + self.aborted
    }
}

/// One status row of the annealing run.
#[derive(Clone, Copy, Debug, Serialize, Deserialize)]
pub struct TemperatureStats {
    /// 1-based temperature number (the quench is the last one).
    pub temp_num: usize,
    /// Temperature during this iteration.
    pub t: f64,
    /// Average blended cost over accepted moves.
    pub av_cost: f64,
    /// Average bounding-box cost over accepted moves.
    pub av_bb_cost: f64,
    /// Average timing cost over accepted moves.
    pub av_timing_cost: f64,
    /// Fraction of attempted moves accepted.
    pub success_rate: f32,
    /// Standard deviation of the accepted-move costs.
    pub std_dev: f64,
    /// Range limit in force during this iteration.
    pub rlim: f32,
    /// Criticality-sharpening exponent in force.
    pub crit_exponent: f32,
    /// Cooling factor after this iteration.
    pub alpha: f32,
    /// Total moves attempted so far.
    pub tot_moves: usize,
}

/// Summary of a completed placement run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacementReport {
    /// Final blended cost.
    pub cost: f64,
    /// Final bounding-box cost.
    pub bb_cost: f64,
    /// Final timing cost (zero in bounding-box mode).
    pub timing_cost: f64,
    /// Channel-factor-free wirelength estimate of the final placement.
    pub estimated_wirelength: f64,
    /// Point-to-point connections in the design (non-ignored nets).
    pub num_connections: usize,
    /// Moves per temperature used by the run.
    pub moves_per_temperature: usize,
    /// Number of temperatures, including the quench.
    pub num_temperatures: usize,
    /// Move outcome totals.
    pub swaps: SwapCounters,
    /// Per-temperature status rows.
    pub temperatures: Vec<TemperatureStats>,
}

/// Writes the current placement to a `.place` snapshot file.
///
/// Format: a header naming the grid size, then one line per block with its
/// name, location, and block number.
pub(crate) fn save_placement(
    path: &Path,
    netlist: &PlaceNetlist,
    state: &PlacerState,
    grid: &DeviceGrid,
) -> io::Result<()> {
    let mut w = BufWriter::new(File::create(path)?);
    writeln!(
        w,
        "Array size: {} x {} logic blocks",
        grid.width(),
        grid.height()
    )?;
    writeln!(w)?;
    writeln!(w, "#block name\tx\ty\tsubblk\tblock number")?;
    writeln!(w, "#----------\t--\t--\t------\t------------")?;
    for block in &netlist.blocks {
        let loc = state.block_location(block.id);
        writeln!(
            w,
            "{}\t{}\t{}\t{}\t#{}",
            block.name, loc.x, loc.y, loc.subtile, block.id
        )?;
    }
    w.flush()
}

/// Per-temperature snapshot filename: `placement_{temp:03}_{save:03}.place`.
pub(crate) fn snapshot_filename(temp_idx: usize, save_idx: usize) -> String {
    format!("placement_{temp_idx:03}_{save_idx:03}.place")
}

/// Appends one CSV row per proposed move to a log file.
pub(crate) struct MoveStatsLog {
    w: BufWriter<File>,
}

impl MoveStatsLog {
    /// Creates the log file and writes the header row.
    pub(crate) fn create(path: &Path) -> io::Result<Self> {
        let mut w = BufWriter::new(File::create(path)?);
        writeln!(
            w,
            "temp,from_blk,to_blk,from_type,to_type,\
             blk_count,\
             delta_cost,delta_bb_cost,delta_td_cost,\
             outcome,reason"
        )?;
        Ok(Self { w })
    }

    /// Logs one evaluated (or aborted) move.
    #[allow(clippy::too_many_arguments)]
    pub(crate) fn log_move(
        &mut self,
        temp: f64,
        from_blk: i64,
        to_blk: i64,
        from_type: &str,
        to_type: &str,
        blk_count: usize,
        delta_cost: f64,
        delta_bb_cost: f64,
        delta_td_cost: f64,
        outcome: &str,
        reason: &str,
    ) -> io::Result<()> {
        writeln!(
            self.w,
            "{temp},{from_blk},{to_blk},{from_type},{to_type},{blk_count},\
             {delta_cost},{delta_bb_cost},{delta_td_cost},{outcome},{reason}"
        )
    }
}
