//! Guided improvement algorithm.

use log::{debug, info};

use crate::algorithms::heuristic;
use crate::algorithms::state::AlgorithmState;
use crate::config::VmcConfig;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::solver::{ConstraintId, Lit, Model, PbConstraint, SolveResult};

fn record(ctx: &SolverContext, state: &mut AlgorithmState, model: &Model) -> Result<()> {
    let allocation = ctx.allocation(model)?;
    state.record(allocation, ctx.costs(model))?;
    Ok(())
}

/// Adds removable constraints asking for a point which dominates the given costs. `better[i]` implies a strict
/// improvement of objective `i`, the literals are free again once the constraints are removed.
fn require_domination(ctx: &mut SolverContext, costs: &[i64], better: &[Lit]) -> Result<Vec<ConstraintId>> {
    let mut ids = Vec::new();
    for ((objective, &cost), &lit) in ctx.objectives.iter().zip(costs).zip(better) {
        ids.push(ctx.solver.add_removable(objective.at_most(cost))?);
        ids.push(ctx.solver.add_removable(objective.at_most(cost - 1).implied_by(lit))?);
    }
    ids.push(ctx.solver.add_removable(PbConstraint::clause(better.to_vec()))?);
    Ok(ids)
}

/// Forbids the region dominated by (or equal to) the given costs for good. Fails if nothing is left. Each call
/// takes one new variable per objective, so variables grow with the number of Pareto-optimal points.
fn block_dominated(ctx: &mut SolverContext, costs: &[i64]) -> Result<()> {
    let mut escape: Vec<Lit> = Vec::new();
    for (objective, &cost) in ctx.objectives.iter().zip(costs) {
        let better = ctx.solver.new_lit();
        ctx.solver.add_constraint(objective.at_most(cost - 1).implied_by(better))?;
        escape.push(better);
    }
    ctx.solver.add_constraint(PbConstraint::clause(escape))?;
    Ok(())
}

/// Finds a feasible point, improves it until no point dominates it, archives it and excludes its dominated region.
/// Repeats until the formula becomes unsatisfiable, then the archive holds the whole Pareto front.
pub fn guided_improvement(
    ctx: &mut SolverContext,
    config: &VmcConfig,
    seed: u64,
    state: &mut AlgorithmState,
) -> Result<()> {
    let better: Vec<Lit> = (0..ctx.objectives.len()).map(|_| ctx.solver.new_lit()).collect();
    let mut initial = if config.heuristic_seeding {
        heuristic::initial_model(ctx, config, seed, state)?
    } else {
        None
    };
    let mut found = 0;
    loop {
        if state.clock.timed_out() {
            return Ok(());
        }
        let mut model = match initial.take() {
            Some(model) => model,
            None => {
                ctx.solver.set_timeout(state.clock.solver_timeout());
                match ctx.solve(&[]) {
                    SolveResult::Sat(model) => model,
                    SolveResult::Unsat(_) => {
                        info!("Guided improvement found all {} Pareto-optimal points", found);
                        return Ok(());
                    }
                    SolveResult::Unknown => return Ok(()),
                }
            }
        };

        loop {
            let costs = ctx.scaled_costs(&model);
            if state.clock.timed_out() {
                return record(ctx, state, &model);
            }
            let ids = require_domination(ctx, &costs, &better)?;
            ctx.solver.set_timeout(state.clock.solver_timeout());
            let result = ctx.solve(&[]);
            ctx.solver.remove_constraints(&ids);
            match result {
                SolveResult::Sat(improved) => {
                    debug!("Improved {:?} to {:?}", costs, ctx.scaled_costs(&improved));
                    model = improved;
                }
                SolveResult::Unsat(_) => break,
                SolveResult::Unknown => return record(ctx, state, &model),
            }
        }

        record(ctx, state, &model)?;
        found += 1;
        let costs = ctx.scaled_costs(&model);
        if block_dominated(ctx, &costs).is_err() {
            info!("Guided improvement found all {} Pareto-optimal points", found);
            return Ok(());
        }
    }
}
