//! Placer options and annealing schedules.
//!
//! All options are validated once, when the placer is constructed; bad
//! values fail fast with [`PlaceError::InvalidConfig`] rather than surfacing
//! deep inside the annealing loop.

use crate::error::PlaceError;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Which objective the annealer optimizes.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum PlaceAlgorithm {
    /// Wirelength only: channel-weighted bounding-box cost.
    BoundingBox,
    /// Wirelength blended with path timing cost (criticality × delay).
    PathTimingDriven,
}

/// How the moves-per-temperature budget scales.
#[derive(Clone, Copy, PartialEq, Eq, Debug, Serialize, Deserialize)]
pub enum EffortScaling {
    /// Proportional to `num_blocks^(4/3)`.
    Circuit,
    /// Proportional to `device_size^(2/3) · num_blocks^(2/3)`; performs more
    /// moves on lightly utilized devices, where the search space is larger.
    DeviceCircuit,
}

/// The annealing schedule: how temperature evolves and when to stop.
#[derive(Clone, Copy, PartialEq, Debug, Serialize, Deserialize)]
pub enum AnnealSchedule {
    /// A manual fixed schedule with fixed alpha and exit criteria.
    User {
        /// Starting temperature.
        init_t: f32,
        /// Stop once the temperature drops below this.
        exit_t: f32,
        /// Temperature decay factor applied each outer iteration.
        alpha_t: f32,
    },
    /// Automatic schedule: alpha varies with the move success ratio, and the
    /// exit temperature scales with the current cost per net.
    Auto,
    /// Restarting schedule: jumps back to a warmer temperature and slows the
    /// cooling whenever the success ratio collapses.
    Dusty {
        /// Initial (fastest) cooling factor.
        alpha_min: f32,
        /// Terminate once alpha has decayed past this.
        alpha_max: f32,
        /// How quickly `1 - alpha` shrinks on each restart.
        alpha_decay: f32,
        /// Restart when the success ratio falls below this.
        success_min: f32,
        /// Success ratio the schedule steers the move limit toward.
        success_target: f32,
    },
}

impl Default for AnnealSchedule {
    fn default() -> Self {
        AnnealSchedule::Auto
    }
}

/// Options controlling a placement run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PlacerConfig {
    /// Objective to optimize.
    pub algorithm: PlaceAlgorithm,
    /// Blend between wirelength and timing cost in timing-driven mode;
    /// 0 is pure wirelength, 1 is pure timing.
    pub timing_tradeoff: f32,
    /// Exponent applied to the inverse average channel capacity when
    /// weighting bounding-box spans; larger values penalize narrow channels
    /// more on anisotropic architectures.
    pub place_cost_exp: f32,
    /// Scales the number of moves per temperature.
    pub inner_num: f32,
    /// How the moves-per-temperature budget scales with design/device size.
    pub effort_scaling: EffortScaling,
    /// Fraction of moves proposed with an unbounded range limit, to help
    /// escape local minima.
    pub rlim_escape_fraction: f32,
    /// Criticality-sharpening exponent at the start of annealing.
    pub td_place_exp_first: f32,
    /// Criticality-sharpening exponent once the range limit has shrunk to
    /// its final value.
    pub td_place_exp_last: f32,
    /// Recompute criticalities every this many outer iterations.
    pub recompute_crit_iter: u32,
    /// When non-zero, re-run timing analysis `divider` times per temperature
    /// (mid-inner-loop). Zero disables mid-temperature recomputation.
    pub inner_loop_recompute_divider: u32,
    /// Like `inner_loop_recompute_divider`, but for the final quench.
    pub quench_recompute_divider: u32,
    /// The annealing schedule.
    pub schedule: AnnealSchedule,
    /// Seed for the single RNG stream shared by move generation and
    /// acceptance sampling.
    pub seed: u64,
    /// When ≥ 1, dump the placement to a `.place` file this many times per
    /// temperature (plus an initial and a final dump). Zero disables saves.
    pub placement_saves_per_temperature: u32,
    /// Directory placement snapshots are written into.
    pub placement_save_dir: PathBuf,
    /// When set, log one CSV row per proposed move to this file.
    pub move_stats_file: Option<PathBuf>,
}

impl Default for PlacerConfig {
    fn default() -> Self {
        Self {
            algorithm: PlaceAlgorithm::BoundingBox,
            timing_tradeoff: 0.5,
            place_cost_exp: 1.0,
            inner_num: 1.0,
            effort_scaling: EffortScaling::Circuit,
            rlim_escape_fraction: 0.0,
            td_place_exp_first: 1.0,
            td_place_exp_last: 8.0,
            recompute_crit_iter: 1,
            inner_loop_recompute_divider: 0,
            quench_recompute_divider: 0,
            schedule: AnnealSchedule::Auto,
            seed: 0,
            placement_saves_per_temperature: 0,
            placement_save_dir: PathBuf::from("."),
            move_stats_file: None,
        }
    }
}

impl PlacerConfig {
    /// Validates all options, returning the first problem found.
    pub fn validate(&self) -> Result<(), PlaceError> {
        if !(0.0..=1.0).contains(&self.timing_tradeoff) {
            return Err(PlaceError::InvalidConfig(format!(
                "timing_tradeoff must be within [0, 1], got {}",
                self.timing_tradeoff
            )));
        }
        if self.place_cost_exp < 0.0 {
            return Err(PlaceError::InvalidConfig(format!(
                "place_cost_exp must be non-negative, got {}",
                self.place_cost_exp
            )));
        }
        if !(self.inner_num > 0.0) {
            return Err(PlaceError::InvalidConfig(format!(
                "inner_num must be positive, got {}",
                self.inner_num
            )));
        }
        if !(0.0..=1.0).contains(&self.rlim_escape_fraction) {
            return Err(PlaceError::InvalidConfig(format!(
                "rlim_escape_fraction must be within [0, 1], got {}",
                self.rlim_escape_fraction
            )));
        }
        if self.td_place_exp_first < 0.0 || self.td_place_exp_last < 0.0 {
            return Err(PlaceError::InvalidConfig(format!(
                "criticality exponents must be non-negative, got {} and {}",
                self.td_place_exp_first, self.td_place_exp_last
            )));
        }
        if self.recompute_crit_iter == 0 {
            return Err(PlaceError::InvalidConfig(
                "recompute_crit_iter must be at least 1".into(),
            ));
        }
        match self.schedule {
            AnnealSchedule::User {
                init_t,
                exit_t,
                alpha_t,
            } => {
                if !(init_t > 0.0) || !(exit_t > 0.0) {
                    return Err(PlaceError::InvalidConfig(format!(
                        "user schedule temperatures must be positive, got init_t {init_t} exit_t {exit_t}"
                    )));
                }
                if !(0.0 < alpha_t && alpha_t < 1.0) {
                    return Err(PlaceError::InvalidConfig(format!(
                        "user schedule alpha_t must be within (0, 1), got {alpha_t}"
                    )));
                }
            }
            AnnealSchedule::Auto => {}
            AnnealSchedule::Dusty {
                alpha_min,
                alpha_max,
                alpha_decay,
                success_min,
                success_target,
            } => {
                if !(0.0 < alpha_min && alpha_min <= alpha_max && alpha_max < 1.0) {
                    return Err(PlaceError::InvalidConfig(format!(
                        "dusty schedule requires 0 < alpha_min <= alpha_max < 1, got {alpha_min} and {alpha_max}"
                    )));
                }
                if !(0.0 < alpha_decay && alpha_decay < 1.0) {
                    return Err(PlaceError::InvalidConfig(format!(
                        "dusty schedule alpha_decay must be within (0, 1), got {alpha_decay}"
                    )));
                }
                if !(0.0..=1.0).contains(&success_min) || !(0.0..=1.0).contains(&success_target) {
                    return Err(PlaceError::InvalidConfig(format!(
                        "dusty schedule success ratios must be within [0, 1], got {success_min} and {success_target}"
                    )));
                }
            }
        }
        Ok(())
    }
}
