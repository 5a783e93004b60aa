//! Entry point running a search strategy on an instance.

use std::io::Write;
use std::rc::Rc;
use std::time::Instant;

use log::info;

use crate::algorithms::archive::{ArchivedPoint, ParetoArchive};
use crate::algorithms::clock::Clock;
use crate::algorithms::guided_improvement::guided_improvement;
use crate::algorithms::heuristic::bin_packing;
use crate::algorithms::linear_search::linear_search;
use crate::algorithms::pareto_mcs::pareto_mcs;
use crate::algorithms::progress::ProgressLog;
use crate::algorithms::state::AlgorithmState;
use crate::algorithms::SearchStrategy;
use crate::config::VmcConfig;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::model::{Allocation, Instance};
use crate::solver::{PbSolver, SatSolver};

pub type SolverFactory = Box<dyn Fn() -> Box<dyn PbSolver>>;

/// Runs the configured strategy and accumulates non-dominated solutions over runs.
pub struct Allocator {
    instance: Rc<Instance>,
    config: VmcConfig,
    strategy: SearchStrategy,
    solver_factory: SolverFactory,
    archive: ParetoArchive,
    best_costs: Vec<f64>,
    progress: Option<ProgressLog>,
    found: bool,
}

impl Allocator {
    pub fn new(instance: Rc<Instance>, config: VmcConfig, strategy: SearchStrategy) -> Self {
        Self {
            instance,
            config,
            strategy,
            solver_factory: Box::new(|| -> Box<dyn PbSolver> { Box::new(SatSolver::new()) }),
            archive: ParetoArchive::new(),
            best_costs: Vec::new(),
            progress: None,
            found: false,
        }
    }

    /// Replaces the solver used by exact strategies.
    pub fn set_solver_factory(&mut self, factory: SolverFactory) {
        self.solver_factory = factory;
    }

    /// Enables progress output, see [`ProgressLog`].
    pub fn set_progress_sink(&mut self, sink: Box<dyn Write>) {
        self.progress = Some(ProgressLog::new(sink));
    }

    pub fn config(&self) -> &VmcConfig {
        &self.config
    }

    /// Single run with the configured seed and timeout.
    pub fn allocate(&mut self) -> Result<()> {
        let clock = Clock::new(self.config.timeout);
        self.run(clock, self.config.seed)
    }

    /// Runs the strategy with `seeds` consecutive seeds. Run `i` may last until `(i + 1) * timeout` from the start,
    /// so time left by a quick run is carried forward. Archives of all runs are merged.
    pub fn allocate_multiple_seeds(&mut self, seeds: usize) -> Result<()> {
        let start = Instant::now();
        for i in 0..seeds {
            let deadline = (i + 1) as f64 * self.config.timeout;
            info!("Run {} of {}", i + 1, seeds);
            self.run(Clock::with_deadline(start, deadline), self.config.seed + i as u64)?;
        }
        Ok(())
    }

    fn run(&mut self, clock: Clock, seed: u64) -> Result<()> {
        info!("Starting {:?} with seed {}", self.strategy, seed);
        let mut state = AlgorithmState::new(clock, self.progress.take());
        let result = match self.strategy {
            SearchStrategy::BinPacking => bin_packing(&self.instance, &self.config, seed, &mut state),
            SearchStrategy::LinearSearch => self.with_context(&mut state, |ctx, config, state| {
                linear_search(ctx, config, seed, state)
            }),
            SearchStrategy::GuidedImprovement => self.with_context(&mut state, |ctx, config, state| {
                guided_improvement(ctx, config, seed, state)
            }),
            SearchStrategy::ParetoMcs => {
                self.with_context(&mut state, |ctx, config, state| pareto_mcs(ctx, config, seed, state))
            }
        };
        info!(
            "Finished {:?} in {:.3}s: {} feasible points, {} non-dominated",
            self.strategy,
            state.clock.elapsed(),
            state.discovered(),
            state.archive().len()
        );
        let found = state.found_solution();
        let (archive, best_costs, mut progress) = state.finish();
        let separated = progress.as_mut().map_or(Ok(()), |progress| progress.separator());
        self.progress = progress;
        self.found |= found;
        self.archive.merge(archive);
        if self.best_costs.is_empty() {
            self.best_costs = best_costs;
        } else {
            for (best, cost) in self.best_costs.iter_mut().zip(best_costs) {
                *best = best.min(cost);
            }
        }
        result?;
        separated?;
        Ok(())
    }

    /// Encodes the instance with a fresh solver and runs `f` on it. A trivially unsatisfiable instance is reported
    /// and leaves the state empty.
    fn with_context<F>(&self, state: &mut AlgorithmState, f: F) -> Result<()>
    where
        F: FnOnce(&mut SolverContext, &VmcConfig, &mut AlgorithmState) -> Result<()>,
    {
        match SolverContext::build(self.instance.clone(), (self.solver_factory)(), &self.config) {
            Ok(mut ctx) => f(&mut ctx, &self.config, state),
            Err(_) => {
                info!("Instance is unsatisfiable");
                Ok(())
            }
        }
    }

    /// Allocations of the non-dominated archive.
    pub fn allocations(&self) -> Vec<Allocation> {
        self.archive.allocations()
    }

    /// Objective values of the non-dominated archive.
    pub fn populations(&self) -> Vec<Vec<f64>> {
        self.archive.costs()
    }

    pub fn points(&self) -> &[ArchivedPoint] {
        self.archive.points()
    }

    pub fn found_solution(&self) -> bool {
        self.found
    }

    pub fn best_costs(&self) -> &[f64] {
        &self.best_costs
    }

    pub fn clear(&mut self) {
        self.archive.clear();
        self.best_costs.clear();
        self.found = false;
    }
}
