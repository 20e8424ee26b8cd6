//! Simulated-annealing placement core for the ember FPGA flow.
//!
//! This crate takes a pre-clustered netlist ([`PlaceNetlist`]), a device
//! model (`ember_device`), and a legal initial placement, and optimizes
//! block locations to minimize a composite cost: channel-weighted
//! bounding-box wirelength, optionally blended with a path-timing cost
//! (criticality × delay per connection) driven by an external static timing
//! analyzer.
//!
//! # Usage
//!
//! ```ignore
//! use ember_place::{Placer, PlacerConfig, UniformMoveGenerator};
//!
//! let mut placer = Placer::new(&netlist, &grid, initial, macros, config, &sink)?;
//! let mut move_gen = UniformMoveGenerator::new();
//! let report = placer.run(&mut move_gen, None)?;
//! println!("final wiring cost: {}", report.bb_cost);
//! ```
//!
//! # Architecture
//!
//! - [`netlist`] / [`macros`] — blocks, nets, pins, rigid placement macros
//! - [`state`] — block locations (primary) and grid occupancy (inverse)
//! - [`config`] — placer options and annealing schedules
//! - [`move_gen`] — pluggable move proposal; uniform displacement default
//! - [`timing`] — external delay-model and STA interfaces
//! - [`anneal`] — the annealing controller and cost engines behind it
//! - [`report`] — run statistics, snapshots, move logs
//!
//! The cost machinery (bounding boxes, channel factors, incremental timing
//! costs, shadow buffers) is internal: it is exercised through
//! [`Placer::run`] and verified by the built-in consistency checks.

#![warn(missing_docs)]

pub mod anneal;
pub mod config;
pub mod error;
pub mod ids;
pub mod macros;
pub mod move_gen;
pub mod netlist;
pub mod report;
pub mod state;
pub mod timing;

mod bbox;
mod chan_cost;
mod checks;
mod costs;
mod swap;
mod timing_cost;

#[cfg(test)]
pub(crate) mod testing;

pub use anneal::Placer;
pub use config::{AnnealSchedule, EffortScaling, PlaceAlgorithm, PlacerConfig};
pub use costs::{CostTotals, PrevInverseCosts};
pub use error::PlaceError;
pub use ids::{BlockId, MacroId, NetId, PinId};
pub use macros::{MacroMember, MacroOffset, PlacementMacro};
pub use move_gen::{
    MoveContext, MoveGenerator, MoveOutcome, MoveStats, Proposal, UniformMoveGenerator,
};
pub use netlist::{PinKind, PlaceBlock, PlaceNet, PlaceNetlist, PlacePin};
pub use report::{PlacementReport, SwapCounters, TemperatureStats};
pub use state::{BlocksAffected, MovedBlock, PlacerState};
pub use timing::{DelayModel, TimingAnalyzer, TimingContext};
