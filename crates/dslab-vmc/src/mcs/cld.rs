use log::trace;

use crate::algorithms::clock::Clock;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::mcs::McsState;
use crate::solver::{Lit, PbConstraint, SolveResult};

/// CLD: while some undecided literal can be satisfied together with all satisfied ones, absorb the literals
/// satisfied by the new model. The clause over undecided literals is removable and lives for a single call.
pub fn extend(ctx: &mut SolverContext, fixed: &[Lit], state: &mut McsState, clock: &Clock) -> Result<bool> {
    state.absorb_satisfied();
    loop {
        if state.undecided.is_empty() {
            return Ok(true);
        }
        if clock.timed_out() {
            return Ok(false);
        }
        ctx.solver.set_timeout(clock.solver_timeout());
        let id = ctx.solver.add_removable(PbConstraint::clause(state.undecided.clone()))?;
        let mut assumptions = fixed.to_vec();
        assumptions.extend_from_slice(&state.satisfied);
        let result = ctx.solve(&assumptions);
        ctx.solver.remove_constraints(&[id]);
        match result {
            SolveResult::Sat(model) => {
                state.model = model;
                state.absorb_satisfied();
                trace!(
                    "CLD: {} satisfied, {} undecided",
                    state.satisfied.len(),
                    state.undecided.len()
                );
            }
            SolveResult::Unsat(_) => return Ok(true),
            SolveResult::Unknown => return Ok(false),
        }
    }
}
