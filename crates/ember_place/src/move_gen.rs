//! Move proposal: the pluggable generator interface and the default
//! uniform random displacement.
//!
//! A generator fills the [`BlocksAffected`] scratchpad with a tentative
//! relocation (one block, a block swap, or a whole macro) and reports
//! [`Proposal::Valid`] or [`Proposal::Abort`]. Aborted proposals may leave
//! the scratchpad partially filled; the move evaluator clears it. After each
//! move the generator is told the outcome, so adaptive generators can steer
//! future proposals.

use crate::ids::BlockId;
use crate::netlist::PlaceNetlist;
use crate::state::{BlocksAffected, PlacerState};
use ember_device::{DeviceGrid, Location};
use rand::rngs::StdRng;
use rand::Rng;

/// How many random targets to try before giving up on a proposal.
const FIND_TO_TRIES: usize = 50;

/// Result of a single annealing move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum MoveOutcome {
    /// The move was applied and committed.
    Accepted,
    /// The move was evaluated and undone.
    Rejected,
    /// No legal move could be formed; nothing was evaluated.
    Aborted,
}

/// Result of asking a generator for a move.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Proposal {
    /// The scratchpad holds a legal tentative relocation.
    Valid,
    /// The generator could not form a legal move.
    Abort,
}

/// Statistics about an evaluated move, fed back to the generator.
#[derive(Clone, Copy, Debug)]
pub struct MoveStats {
    /// Outcome of the move.
    pub outcome: MoveOutcome,
    /// Blended, normalized cost delta.
    pub delta_cost_norm: f64,
    /// Normalized bounding-box cost delta.
    pub delta_bb_cost_norm: f64,
    /// Normalized timing cost delta.
    pub delta_timing_cost_norm: f64,
    /// Absolute bounding-box cost delta.
    pub delta_bb_cost_abs: f64,
    /// Absolute timing cost delta.
    pub delta_timing_cost_abs: f64,
}

/// Read-only placement context handed to a generator.
pub struct MoveContext<'a> {
    /// The netlist being placed.
    pub netlist: &'a PlaceNetlist,
    /// The device grid.
    pub grid: &'a DeviceGrid,
    /// Current placement state (committed occupancy, tentative locations).
    pub state: &'a PlacerState,
}

/// A pluggable move-proposal heuristic.
pub trait MoveGenerator {
    /// Proposes a tentative relocation into `affected`, displacing blocks at
    /// most `rlim` tiles (Chebyshev distance).
    fn propose(
        &mut self,
        ctx: &MoveContext<'_>,
        affected: &mut BlocksAffected,
        rlim: f32,
        rng: &mut StdRng,
    ) -> Proposal;

    /// Notifies the generator of the outcome of its last proposal.
    fn process_outcome(&mut self, stats: &MoveStats);
}

/// The default generator: uniform random displacement within the range
/// limit.
///
/// Picks a random block, then a random compatible target within `rlim`.
/// An occupied target becomes a swap when the occupant can legally take the
/// vacated slot; macros move rigidly and only into empty space.
#[derive(Debug, Default)]
pub struct UniformMoveGenerator;

impl UniformMoveGenerator {
    /// Creates the generator.
    pub fn new() -> Self {
        Self
    }
}

impl MoveGenerator for UniformMoveGenerator {
    fn propose(
        &mut self,
        ctx: &MoveContext<'_>,
        affected: &mut BlocksAffected,
        rlim: f32,
        rng: &mut StdRng,
    ) -> Proposal {
        let num_blocks = ctx.netlist.block_count();
        if num_blocks == 0 {
            return Proposal::Abort;
        }

        let block = BlockId::from_raw(rng.gen_range(0..num_blocks as u32));
        let from = ctx.state.block_location(block);
        let ltype = ctx.netlist.block(block).logical_type;

        // Clamp before the cast so an unbounded rlim stays finite.
        let range = rlim.min(ctx.grid.max_range_limit()).max(1.0) as usize;
        let xlo = from.x.saturating_sub(range);
        let xhi = (from.x + range).min(ctx.grid.width() - 1);
        let ylo = from.y.saturating_sub(range);
        let yhi = (from.y + range).min(ctx.grid.height() - 1);

        for _ in 0..FIND_TO_TRIES {
            let to_x = rng.gen_range(xlo..=xhi);
            let to_y = rng.gen_range(ylo..=yhi);
            let tile = ctx.grid.tile_type_at(to_x, to_y);
            if tile.capacity == 0 {
                continue;
            }
            let to_sub = rng.gen_range(0..tile.capacity);
            let to = Location::new(to_x, to_y, to_sub);
            if to == from || !tile.is_subtile_compatible(ltype, to_sub) {
                continue;
            }
            return build_move(ctx, affected, block, from, to);
        }

        Proposal::Abort
    }

    fn process_outcome(&mut self, _stats: &MoveStats) {}
}

fn build_move(
    ctx: &MoveContext<'_>,
    affected: &mut BlocksAffected,
    block: BlockId,
    from: Location,
    to: Location,
) -> Proposal {
    if let Some(macro_id) = ctx.state.macro_of(block) {
        return build_macro_move(ctx, affected, macro_id, from, to);
    }

    match ctx.state.grid_block(to.x, to.y, to.subtile) {
        None => {
            affected.push(block, from, to);
            Proposal::Valid
        }
        Some(occupant) => {
            // Swapping with a macro member would tear the macro apart.
            if ctx.state.macro_of(occupant).is_some() {
                return Proposal::Abort;
            }
            let from_tile = ctx.grid.tile_type_at(from.x, from.y);
            let occupant_type = ctx.netlist.block(occupant).logical_type;
            if !from_tile.is_subtile_compatible(occupant_type, from.subtile) {
                return Proposal::Abort;
            }
            affected.push(block, from, to);
            affected.push(occupant, to, from);
            Proposal::Valid
        }
    }
}

/// Relocates every member of a macro by the displacement chosen for the
/// picked member. Valid only when every target slot is compatible and
/// either empty or being vacated by the macro itself.
fn build_macro_move(
    ctx: &MoveContext<'_>,
    affected: &mut BlocksAffected,
    macro_id: crate::ids::MacroId,
    from: Location,
    to: Location,
) -> Proposal {
    let dx = to.x as i64 - from.x as i64;
    let dy = to.y as i64 - from.y as i64;
    let dsub = to.subtile as i64 - from.subtile as i64;

    let pm = ctx.state.placement_macro(macro_id);
    for member in &pm.members {
        let cur = ctx.state.block_location(member.block);
        let nx = cur.x as i64 + dx;
        let ny = cur.y as i64 + dy;
        let nsub = cur.subtile as i64 + dsub;
        if nx < 0
            || ny < 0
            || nsub < 0
            || nx as usize >= ctx.grid.width()
            || ny as usize >= ctx.grid.height()
        {
            return Proposal::Abort;
        }
        let target = Location::new(nx as usize, ny as usize, nsub as usize);

        let tile = ctx.grid.tile_type_at(target.x, target.y);
        let member_type = ctx.netlist.block(member.block).logical_type;
        if !tile.is_subtile_compatible(member_type, target.subtile) {
            return Proposal::Abort;
        }
        match ctx.state.grid_block(target.x, target.y, target.subtile) {
            None => {}
            // A slot another member is about to vacate is fine.
            Some(occupant) if ctx.state.macro_of(occupant) == Some(macro_id) => {}
            Some(_) => return Proposal::Abort,
        }

        affected.push(member.block, cur, target);
    }

    Proposal::Valid
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ids::MacroId;
    use crate::macros::{MacroMember, MacroOffset, PlacementMacro};
    use crate::testing::uniform_grid;
    use ember_device::LogicalTypeId;
    use rand::SeedableRng;

    fn lb() -> LogicalTypeId {
        LogicalTypeId::from_raw(0)
    }

    fn blocks_netlist(n: usize) -> PlaceNetlist {
        let mut nl = PlaceNetlist::new();
        for i in 0..n {
            nl.add_block(format!("b{i}"), lb());
        }
        nl
    }

    #[test]
    fn proposes_moves_within_range_limit() {
        let grid = uniform_grid(8, 8, 1);
        let nl = blocks_netlist(4);
        let state = PlacerState::new(
            &nl,
            &grid,
            vec![
                Location::new(4, 4, 0),
                Location::new(1, 1, 0),
                Location::new(6, 6, 0),
                Location::new(2, 5, 0),
            ],
            vec![],
        )
        .unwrap();
        let ctx = MoveContext {
            netlist: &nl,
            grid: &grid,
            state: &state,
        };

        let mut gen = UniformMoveGenerator::new();
        let mut rng = StdRng::seed_from_u64(7);
        let mut affected = BlocksAffected::new();

        let mut proposals = 0;
        for _ in 0..200 {
            affected.clear();
            if gen.propose(&ctx, &mut affected, 2.0, &mut rng) == Proposal::Valid {
                proposals += 1;
                for m in &affected.moved {
                    let dx = m.old_loc.x.abs_diff(m.new_loc.x);
                    let dy = m.old_loc.y.abs_diff(m.new_loc.y);
                    assert!(dx <= 2 && dy <= 2, "displacement {dx},{dy} exceeds rlim");
                    assert_ne!(m.old_loc, m.new_loc);
                }
            }
        }
        assert!(proposals > 0);
    }

    #[test]
    fn occupied_target_becomes_swap() {
        let grid = uniform_grid(4, 4, 1);
        let nl = blocks_netlist(2);
        // Only two blocks adjacent on a tiny grid: swaps must show up.
        let state = PlacerState::new(
            &nl,
            &grid,
            vec![Location::new(1, 1, 0), Location::new(2, 1, 0)],
            vec![],
        )
        .unwrap();
        let ctx = MoveContext {
            netlist: &nl,
            grid: &grid,
            state: &state,
        };

        let mut gen = UniformMoveGenerator::new();
        let mut rng = StdRng::seed_from_u64(3);
        let mut affected = BlocksAffected::new();

        let mut saw_swap = false;
        for _ in 0..300 {
            affected.clear();
            if gen.propose(&ctx, &mut affected, 3.0, &mut rng) == Proposal::Valid
                && affected.moved.len() == 2
            {
                let a = &affected.moved[0];
                let b = &affected.moved[1];
                assert_eq!(a.old_loc, b.new_loc);
                assert_eq!(a.new_loc, b.old_loc);
                saw_swap = true;
                break;
            }
        }
        assert!(saw_swap);
    }

    #[test]
    fn macro_moves_rigidly() {
        let grid = uniform_grid(8, 8, 1);
        let nl = blocks_netlist(2);
        let m = PlacementMacro::new(
            MacroId::from_raw(0),
            BlockId::from_raw(0),
            vec![MacroMember {
                block: BlockId::from_raw(1),
                offset: MacroOffset::new(0, 1, 0),
            }],
        );
        let state = PlacerState::new(
            &nl,
            &grid,
            vec![Location::new(3, 3, 0), Location::new(3, 4, 0)],
            vec![m],
        )
        .unwrap();
        let ctx = MoveContext {
            netlist: &nl,
            grid: &grid,
            state: &state,
        };

        let mut gen = UniformMoveGenerator::new();
        let mut rng = StdRng::seed_from_u64(11);
        let mut affected = BlocksAffected::new();

        let mut checked = false;
        for _ in 0..200 {
            affected.clear();
            if gen.propose(&ctx, &mut affected, 3.0, &mut rng) == Proposal::Valid {
                assert_eq!(affected.moved.len(), 2, "macro must move as a unit");
                let head = affected.moved.iter().find(|m| m.block == BlockId::from_raw(0)).unwrap();
                let tail = affected.moved.iter().find(|m| m.block == BlockId::from_raw(1)).unwrap();
                assert_eq!(tail.new_loc.x, head.new_loc.x);
                assert_eq!(tail.new_loc.y, head.new_loc.y + 1);
                checked = true;
                break;
            }
        }
        assert!(checked);
    }

    #[test]
    fn incompatible_targets_abort() {
        // Block of type 1 on a grid whose tiles accept only type 0: after
        // the placed tile itself, nothing is compatible.
        let grid = uniform_grid(4, 4, 1);
        let mut nl = PlaceNetlist::new();
        nl.add_block("odd", LogicalTypeId::from_raw(1));
        let state =
            PlacerState::new(&nl, &grid, vec![Location::new(1, 1, 0)], vec![]).unwrap();
        let ctx = MoveContext {
            netlist: &nl,
            grid: &grid,
            state: &state,
        };

        let mut gen = UniformMoveGenerator::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut affected = BlocksAffected::new();
        assert_eq!(gen.propose(&ctx, &mut affected, 3.0, &mut rng), Proposal::Abort);
    }

    #[test]
    fn empty_netlist_aborts() {
        let grid = uniform_grid(4, 4, 1);
        let nl = PlaceNetlist::new();
        let state = PlacerState::new(&nl, &grid, vec![], vec![]).unwrap();
        let ctx = MoveContext {
            netlist: &nl,
            grid: &grid,
            state: &state,
        };
        let mut gen = UniformMoveGenerator::new();
        let mut rng = StdRng::seed_from_u64(1);
        let mut affected = BlocksAffected::new();
        assert_eq!(gen.propose(&ctx, &mut affected, 1.0, &mut rng), Proposal::Abort);
    }

    #[test]
    fn same_seed_same_proposals() {
        let grid = uniform_grid(8, 8, 1);
        let nl = blocks_netlist(5);
        let locs: Vec<_> = (0..5).map(|i| Location::new(1 + i, 2, 0)).collect();
        let state = PlacerState::new(&nl, &grid, locs, vec![]).unwrap();
        let ctx = MoveContext {
            netlist: &nl,
            grid: &grid,
            state: &state,
        };

        let run = |seed: u64| {
            let mut rng = StdRng::seed_from_u64(seed);
            let mut gen = UniformMoveGenerator::new();
            let mut affected = BlocksAffected::new();
            let mut log = Vec::new();
            for _ in 0..20 {
                affected.clear();
                if gen.propose(&ctx, &mut affected, 4.0, &mut rng) == Proposal::Valid {
                    log.push(
                        affected
                            .moved
                            .iter()
                            .map(|m| (m.block, m.new_loc))
                            .collect::<Vec<_>>(),
                    );
                }
            }
            log
        };
        assert_eq!(run(42), run(42));
    }
}
