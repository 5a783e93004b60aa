use log::info;

use crate::algorithms::heuristic;
use crate::algorithms::state::AlgorithmState;
use crate::config::VmcConfig;
use crate::encoding::SolverContext;
use crate::error::{Result, VmcError};
use crate::solver::{Model, SolveResult};

/// Minimizes one objective: after each solution the objective is bounded by its cost minus one (in scaled units)
/// until the formula becomes unsatisfiable.
pub fn linear_search(ctx: &mut SolverContext, config: &VmcConfig, seed: u64, state: &mut AlgorithmState) -> Result<()> {
    let index = config.linear_search_objective;
    if index >= ctx.objectives.len() {
        return Err(VmcError::Config(format!(
            "objective {} does not exist, there are {} objectives",
            index,
            ctx.objectives.len()
        )));
    }
    let mut current: Option<Model> = if config.heuristic_seeding {
        heuristic::initial_model(ctx, config, seed, state)?
    } else {
        None
    };
    loop {
        if let Some(model) = current.take() {
            let allocation = ctx.allocation(&model)?;
            state.record(allocation, ctx.costs(&model))?;
            let cost = ctx.objectives[index].scaled_value(&model);
            if ctx.solver.add_constraint(ctx.objectives[index].at_most(cost - 1)).is_err() {
                info!("Linear search proved optimality of {}", ctx.objectives[index].kind());
                return Ok(());
            }
        }
        if state.clock.timed_out() {
            return Ok(());
        }
        ctx.solver.set_timeout(state.clock.solver_timeout());
        match ctx.solve(&[]) {
            SolveResult::Sat(model) => current = Some(model),
            SolveResult::Unsat(_) => {
                info!("Linear search proved optimality of {}", ctx.objectives[index].kind());
                return Ok(());
            }
            SolveResult::Unknown => return Ok(()),
        }
    }
}
