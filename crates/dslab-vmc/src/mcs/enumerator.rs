//! Enumeration of Pareto-optimal solutions via MCSs.

use log::{debug, info};

use crate::algorithms::clock::Clock;
use crate::algorithms::state::AlgorithmState;
use crate::config::{McsConfig, VmcConfig};
use crate::encoding::SolverContext;
use crate::error::{Result, VmcError};
use crate::hashing::HashPartitioner;
use crate::mcs::diversification::DiversificationPaths;
use crate::mcs::stratification::stratify;
use crate::mcs::{extend, soft_literals, McsOutcome, McsState, SoftLiteral};
use crate::model::Allocation;
use crate::solver::{Lit, Model, PbConstraint, SolveResult};

pub struct ParetoMcsEnumerator {
    config: McsConfig,
    softs: Vec<SoftLiteral>,
    partitions: Vec<Vec<Lit>>,
    hash: Option<HashPartitioner>,
    history: Vec<Vec<Lit>>,
    complete: bool,
}

impl ParetoMcsEnumerator {
    pub fn new(ctx: &SolverContext, config: &VmcConfig, seed: u64) -> Self {
        let softs = soft_literals(&ctx.objectives);
        let partitions = if config.mcs.stratify {
            stratify(&softs, config.mcs.max_partitions)
        } else {
            vec![softs.iter().map(|soft| soft.lit).collect()]
        };
        let hash = if config.hashing.enabled {
            Some(HashPartitioner::new(ctx.vars.placement_lits(), &config.hashing, seed))
        } else {
            None
        };
        debug!(
            "MCS enumeration over {} soft literals in {} partitions",
            softs.len(),
            partitions.len()
        );
        Self {
            config: config.mcs.clone(),
            softs,
            partitions,
            hash,
            history: Vec::new(),
            complete: false,
        }
    }

    pub fn soft_literals(&self) -> &[SoftLiteral] {
        &self.softs
    }

    pub fn partitions(&self) -> &[Vec<Lit>] {
        &self.partitions
    }

    /// Blocked MCSs in the order they were found.
    pub fn history(&self) -> &[Vec<Lit>] {
        &self.history
    }

    /// True when the whole space was explored, so the found solutions cover the Pareto front.
    pub fn is_complete(&self) -> bool {
        self.complete
    }

    pub fn hash(&self) -> Option<&HashPartitioner> {
        self.hash.as_ref()
    }

    /// Enumerates MCSs until the space is exhausted or the deadline of the state is reached. Every solution is
    /// recorded in the state.
    pub fn enumerate(&mut self, ctx: &mut SolverContext, state: &mut AlgorithmState) -> Result<()> {
        if let Some(hash) = self.hash.as_mut() {
            if hash.regenerate(ctx.solver.as_mut()).is_err() {
                self.complete = true;
            }
        }
        if self.config.diversify && !self.complete {
            self.enumerate_diversified(ctx, state)?;
        }
        while !self.complete && !state.clock.timed_out() {
            let fixed = self.hash_assumptions();
            match self.find_mcs(ctx, &fixed, &state.clock)? {
                McsOutcome::Found { mcs, model } => self.accept(ctx, state, mcs, model)?,
                McsOutcome::Unsatisfiable { core } => {
                    let more_cells = match self.hash.as_mut() {
                        Some(hash) if !core.is_empty() => hash.cell_exhausted(ctx.solver.as_mut()).unwrap_or(false),
                        _ => false,
                    };
                    if !more_cells {
                        self.complete = true;
                    }
                }
                McsOutcome::Interrupted { model } => {
                    self.record_interrupted(ctx, state, model)?;
                    break;
                }
            }
        }
        if self.complete {
            info!("MCS enumeration complete after {} MCSs", self.history.len());
        } else {
            info!("MCS enumeration stopped after {} MCSs", self.history.len());
        }
        Ok(())
    }

    fn enumerate_diversified(&mut self, ctx: &mut SolverContext, state: &mut AlgorithmState) -> Result<()> {
        let mut heaviest = self.softs.clone();
        heaviest.sort_by(|a, b| b.weight.total_cmp(&a.weight).then(a.lit.cmp(&b.lit)));
        let lits = heaviest
            .iter()
            .take(self.config.diversification_literals)
            .map(|soft| soft.lit)
            .collect();
        let mut paths = DiversificationPaths::new(lits);
        while let Some(path) = paths.next_path() {
            if self.complete || state.clock.timed_out() {
                break;
            }
            let mut fixed = self.hash_assumptions();
            fixed.extend_from_slice(&path);
            match self.find_mcs(ctx, &fixed, &state.clock)? {
                McsOutcome::Found { mcs, model } => {
                    debug!("Diversification path {:?} produced an MCS of size {}", path, mcs.len());
                    paths.record(path, true);
                    self.accept(ctx, state, mcs, model)?;
                }
                McsOutcome::Unsatisfiable { core } => {
                    if core.is_empty() {
                        self.complete = true;
                    } else if core.iter().all(|lit| path.contains(lit)) {
                        let prefix = path
                            .iter()
                            .rposition(|lit| core.contains(lit))
                            .map_or(path.len(), |pos| pos + 1);
                        paths.mark_dead(path[..prefix].to_vec());
                    }
                    paths.record(path, false);
                }
                McsOutcome::Interrupted { model } => {
                    self.record_interrupted(ctx, state, model)?;
                    break;
                }
            }
        }
        debug!("Diversification finished at depth {}", paths.depth());
        Ok(())
    }

    fn hash_assumptions(&self) -> Vec<Lit> {
        self.hash.as_ref().map_or_else(Vec::new, |hash| hash.assumptions())
    }

    fn accept(
        &mut self,
        ctx: &mut SolverContext,
        state: &mut AlgorithmState,
        mcs: Vec<Lit>,
        model: Model,
    ) -> Result<()> {
        let allocation = ctx.allocation(&model)?;
        let costs = ctx.costs(&model);
        debug!("Found MCS of size {} with costs {:?}", mcs.len(), costs);
        state.record(allocation, costs)?;
        self.block(ctx, mcs);
        if let Some(hash) = self.hash.as_mut() {
            if hash.record_solution(ctx.solver.as_mut()).is_err() {
                self.complete = true;
            }
        }
        Ok(())
    }

    /// Archives the feasible model of an interrupted search. It is not an MCS, so nothing is blocked.
    fn record_interrupted(&self, ctx: &SolverContext, state: &mut AlgorithmState, model: Option<Model>) -> Result<()> {
        if let Some(model) = model {
            let costs = ctx.costs(&model);
            debug!("Search interrupted, keeping the last model with costs {:?}", costs);
            state.record(ctx.allocation(&model)?, costs)?;
        }
        Ok(())
    }

    /// Adds the hard clause requiring at least one literal of the MCS to be satisfied.
    fn block(&mut self, ctx: &mut SolverContext, mcs: Vec<Lit>) {
        let clause = PbConstraint::clause(mcs.clone());
        self.history.push(mcs);
        if ctx.solver.add_constraint(clause).is_err() {
            self.complete = true;
        }
    }

    /// Computes one MCS under the fixed assumptions, going through the partitions from the heaviest one. A partition
    /// which runs out of its conflict budget is merged into the next one, the last partition has no budget.
    pub fn find_mcs(&self, ctx: &mut SolverContext, fixed: &[Lit], clock: &Clock) -> Result<McsOutcome> {
        ctx.solver.set_max_conflicts(None);
        ctx.solver.set_timeout(clock.solver_timeout());
        let model = match ctx.solve(fixed) {
            SolveResult::Sat(model) => model,
            SolveResult::Unsat(core) => return Ok(McsOutcome::Unsatisfiable { core }),
            SolveResult::Unknown => return Ok(McsOutcome::Interrupted { model: None }),
        };

        let mut state = McsState::new(model);
        let mut mcs = Vec::new();
        let mut carried: Vec<Lit> = Vec::new();
        for (i, partition) in self.partitions.iter().enumerate() {
            let last = i + 1 == self.partitions.len();
            state.undecided = std::mem::take(&mut carried);
            state.undecided.extend_from_slice(partition);
            let budget = if last { None } else { Some(self.config.partition_conflicts) };
            ctx.solver.set_max_conflicts(budget);
            let completed = extend(self.config.algorithm, ctx, fixed, &mut state, clock)?;
            if completed {
                mcs.append(&mut state.undecided);
            } else if last || clock.timed_out() {
                ctx.solver.set_max_conflicts(None);
                return Ok(McsOutcome::Interrupted {
                    model: Some(state.model),
                });
            } else {
                debug!(
                    "Partition {} ran out of conflicts, merging {} literals into the next one",
                    i,
                    state.undecided.len()
                );
                carried = std::mem::take(&mut state.undecided);
            }
        }
        ctx.solver.set_max_conflicts(None);
        Ok(McsOutcome::Found {
            mcs,
            model: state.model,
        })
    }

    /// Repairs a partial allocation: its mappings are kept unless they belong to an unsat core, then the result is
    /// improved to an MCS under the kept mappings. Nothing is blocked, so the call does not affect enumeration.
    pub fn repair(&self, ctx: &mut SolverContext, partial: &Allocation, clock: &Clock) -> Result<Option<Allocation>> {
        let mut assumptions = ctx.vars.mapping_lits(&ctx.instance, partial)?;
        loop {
            if clock.timed_out() {
                return Ok(None);
            }
            ctx.solver.set_timeout(clock.solver_timeout());
            match ctx.solve(&assumptions) {
                SolveResult::Sat(_) => break,
                SolveResult::Unsat(core) => {
                    if core.is_empty() {
                        if !assumptions.is_empty() && matches!(ctx.solve(&[]), SolveResult::Sat(_)) {
                            return Err(VmcError::UnexpectedState(
                                "unsat core implicates no assumption of a satisfiable formula".to_string(),
                            ));
                        }
                        return Ok(None);
                    }
                    if core.iter().any(|lit| !assumptions.contains(lit)) {
                        return Err(VmcError::UnexpectedState(
                            "unsat core contains literals which were not assumed".to_string(),
                        ));
                    }
                    debug!("Dropping {} mappings named by the core", core.len());
                    assumptions.retain(|lit| !core.contains(lit));
                }
                SolveResult::Unknown => return Ok(None),
            }
        }
        match self.find_mcs(ctx, &assumptions, clock)? {
            McsOutcome::Found { model, .. } => Ok(Some(ctx.allocation(&model)?)),
            McsOutcome::Interrupted { model: Some(model) } => Ok(Some(ctx.allocation(&model)?)),
            _ => Ok(None),
        }
    }
}
