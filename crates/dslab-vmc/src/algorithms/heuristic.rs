//! Bin-packing as a standalone strategy and as a source of initial solutions for exact algorithms.

use std::rc::Rc;

use log::{debug, info};

use crate::algorithms::state::AlgorithmState;
use crate::binpacking::{BinPacker, PackingResult, VmOrder};
use crate::config::VmcConfig;
use crate::encoding::SolverContext;
use crate::error::Result;
use crate::model::{Allocation, Instance};
use crate::objective;
use crate::solver::{Model, SolveResult};

fn vm_order(config: &VmcConfig, seed: u64) -> VmOrder {
    if config.bin_packing.shuffle {
        VmOrder::Shuffled(seed)
    } else {
        VmOrder::Decreasing
    }
}

fn pack(instance: &Rc<Instance>, config: &VmcConfig, seed: u64, state: &AlgorithmState) -> Option<Allocation> {
    let mut packer = BinPacker::new(instance.clone(), config.bin_packing.ordering);
    packer.set_timeout(state.clock.remaining_time());
    match packer.pack(&vm_order(config, seed)) {
        PackingResult::Complete(allocation) if instance.is_feasible(&allocation) => Some(allocation),
        PackingResult::Complete(allocation) => {
            debug!("Bin-packing solution {} violates the instance constraints", allocation);
            None
        }
        PackingResult::Partial { leftover, .. } => {
            info!("Bin-packing left {} VMs unplaced", leftover.len());
            None
        }
    }
}

pub fn bin_packing(instance: &Rc<Instance>, config: &VmcConfig, seed: u64, state: &mut AlgorithmState) -> Result<()> {
    if let Some(allocation) = pack(instance, config, seed, state) {
        let costs = objective::evaluate(instance, &allocation, config.wastage);
        state.record(allocation, costs)?;
    }
    Ok(())
}

/// Finds a model of the encoding which agrees with the bin-packing solution, if there is one.
pub fn initial_model(
    ctx: &mut SolverContext,
    config: &VmcConfig,
    seed: u64,
    state: &AlgorithmState,
) -> Result<Option<Model>> {
    let allocation = match pack(&ctx.instance, config, seed, state) {
        Some(allocation) => allocation,
        None => return Ok(None),
    };
    let assumptions = ctx.vars.mapping_lits(&ctx.instance, &allocation)?;
    ctx.solver.set_timeout(state.clock.solver_timeout());
    match ctx.solve(&assumptions) {
        SolveResult::Sat(model) => Ok(Some(model)),
        _ => {
            debug!("Bin-packing solution violates the encoding, starting from scratch");
            Ok(None)
        }
    }
}
