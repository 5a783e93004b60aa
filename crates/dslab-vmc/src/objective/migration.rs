use crate::encoding::VariableMap;
use crate::model::{Allocation, Instance};
use crate::objective::function::{ObjectiveFunction, ObjectiveKind};

/// Memory of pre-existing VMs which leave their original machine. Defined only when there is a pre-existing
/// placement.
pub fn migration_objective(instance: &Instance, vars: &VariableMap, precision: u32) -> Option<ObjectiveFunction> {
    if !instance.has_pre_mappings() {
        return None;
    }
    let mut lits = Vec::new();
    let mut coeffs = Vec::new();
    for vm in 0..instance.vm_count() {
        if let Some(pm) = instance.original_pm(vm) {
            lits.push(!vars.placement(vm, pm));
            coeffs.push(instance.vm(vm).memory as f64);
        }
    }
    Some(ObjectiveFunction::new(ObjectiveKind::Migration, lits, coeffs, precision))
}

pub fn migration(instance: &Instance, allocation: &Allocation) -> f64 {
    instance.migrated_memory(allocation) as f64
}
