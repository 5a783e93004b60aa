//! Energy consumption objective.
//!
//! Each powered machine consumes its idle power plus the share of its idle-to-max range proportional to the CPU
//! load. Both parts are linear in decision variables: `idle * power[pm] + (max - idle) * cpu[vm] / cpu[pm] *
//! placement[vm][pm]`.

use crate::encoding::VariableMap;
use crate::model::{Allocation, Instance};
use crate::objective::function::{ObjectiveFunction, ObjectiveKind};

pub fn energy_objective(instance: &Instance, vars: &VariableMap, precision: u32) -> ObjectiveFunction {
    let mut lits = Vec::new();
    let mut coeffs = Vec::new();
    for (pos, pm) in instance.pms().iter().enumerate() {
        lits.push(vars.power(pos));
        coeffs.push(pm.idle_power);
        let dynamic = pm.max_power - pm.idle_power;
        for (vm_pos, vm) in instance.vms().iter().enumerate() {
            lits.push(vars.placement(vm_pos, pos));
            coeffs.push(dynamic * pm.cpu_share(vm.cpu as u64));
        }
    }
    ObjectiveFunction::new(ObjectiveKind::Energy, lits, coeffs, precision)
}

pub fn energy(instance: &Instance, allocation: &Allocation) -> f64 {
    let mut cpu_used = vec![0u64; instance.pm_count()];
    let mut powered = vec![false; instance.pm_count()];
    for mapping in allocation.mappings() {
        if let (Some(vm), Some(pm)) = (instance.vm_position(mapping.vm_id), instance.pm_position(mapping.pm_id)) {
            cpu_used[pm] += instance.vm(vm).cpu as u64;
            powered[pm] = true;
        }
    }
    instance
        .pms()
        .iter()
        .enumerate()
        .filter(|(pos, _)| powered[*pos])
        .map(|(pos, pm)| pm.power(pm.cpu_share(cpu_used[pos])))
        .sum()
}
