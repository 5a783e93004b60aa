//! Objective functions: energy, resource wastage and migration cost.

pub mod energy;
pub mod function;
pub mod migration;
pub mod wastage;

pub use function::{ObjectiveFunction, ObjectiveKind};

use crate::encoding::VariableMap;
use crate::error::Contradiction;
use crate::model::{Allocation, Instance};
use crate::solver::PbSolver;

/// Builds the objectives of the instance in fixed order: energy, wastage (if enabled), migration (if there is a
/// pre-existing placement). Wastage linearization adds auxiliary variables and constraints to the solver.
pub fn build_objectives(
    instance: &Instance,
    vars: &VariableMap,
    solver: &mut dyn PbSolver,
    with_wastage: bool,
    precision: u32,
) -> Result<Vec<ObjectiveFunction>, Contradiction> {
    let mut objectives = vec![energy::energy_objective(instance, vars, precision)];
    if with_wastage {
        objectives.push(wastage::wastage_objective(instance, vars, solver, precision)?);
    }
    if let Some(migration) = migration::migration_objective(instance, vars, precision) {
        objectives.push(migration);
    }
    Ok(objectives)
}

/// Computes objective values of a complete allocation in the same order as [`build_objectives`].
pub fn evaluate(instance: &Instance, allocation: &Allocation, with_wastage: bool) -> Vec<f64> {
    let mut costs = vec![energy::energy(instance, allocation)];
    if with_wastage {
        costs.push(wastage::wastage(instance, allocation));
    }
    if instance.has_pre_mappings() {
        costs.push(migration::migration(instance, allocation));
    }
    costs
}
