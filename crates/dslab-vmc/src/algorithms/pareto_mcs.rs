use crate::algorithms::heuristic;
use crate::algorithms::state::AlgorithmState;
use crate::config::VmcConfig;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::mcs::ParetoMcsEnumerator;

/// Enumerates Pareto-MCSs, optionally archiving a bin-packing solution first.
pub fn pareto_mcs(ctx: &mut SolverContext, config: &VmcConfig, seed: u64, state: &mut AlgorithmState) -> Result<()> {
    if config.heuristic_seeding {
        let instance = ctx.instance.clone();
        heuristic::bin_packing(&instance, config, seed, state)?;
    }
    let mut enumerator = ParetoMcsEnumerator::new(ctx, config, seed);
    enumerator.enumerate(ctx, state)
}
