use log::trace;

use crate::algorithms::clock::Clock;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::mcs::McsState;
use crate::solver::{Lit, SolveResult};

/// LBX: tests undecided literals one at a time. A literal which can not be satisfied together with the satisfied
/// ones belongs to the MCS and is assumed false afterwards.
pub fn extend(ctx: &mut SolverContext, fixed: &[Lit], state: &mut McsState, clock: &Clock) -> Result<bool> {
    state.absorb_satisfied();
    let mut falsified: Vec<Lit> = Vec::new();
    while let Some(lit) = state.undecided.pop() {
        if state.model.lit_value(lit) {
            state.satisfied.push(lit);
            continue;
        }
        if clock.timed_out() {
            state.undecided.push(lit);
            state.undecided.extend(falsified);
            return Ok(false);
        }
        ctx.solver.set_timeout(clock.solver_timeout());
        let mut assumptions = fixed.to_vec();
        assumptions.extend_from_slice(&state.satisfied);
        assumptions.extend(falsified.iter().map(|&l| !l));
        assumptions.push(lit);
        match ctx.solve(&assumptions) {
            SolveResult::Sat(model) => {
                state.satisfied.push(lit);
                state.model = model;
                state.absorb_satisfied();
            }
            SolveResult::Unsat(_) => {
                trace!("LBX: {} is in the MCS", lit);
                falsified.push(lit);
            }
            SolveResult::Unknown => {
                state.undecided.push(lit);
                state.undecided.extend(falsified);
                return Ok(false);
            }
        }
    }
    state.undecided = falsified;
    Ok(true)
}
