//! Resource wastage objective.
//!
//! Wastage of a machine is the absolute difference of its normalized leftover CPU and memory, which equals
//! `|sum(d[vm] * placement[vm][pm])|` with `d[vm] = memory[vm] / memory[pm] - cpu[vm] / cpu[pm]`.
//! The absolute value is linearized with a sign variable per machine and two auxiliary variables per placement:
//! `placement = plus XOR minus`, `plus -> sign`, `minus -> !sign`, so the objective is `sum(d * plus - d * minus)`.
//! The sign is tied to the actual sign of the sum by two guarded constraints over integer-scaled `d`.

use crate::encoding::VariableMap;
use crate::error::Contradiction;
use crate::model::{Allocation, Instance};
use crate::objective::function::{ObjectiveFunction, ObjectiveKind};
use crate::solver::{PbConstraint, PbSolver};

pub fn wastage_objective(
    instance: &Instance,
    vars: &VariableMap,
    solver: &mut dyn PbSolver,
    precision: u32,
) -> Result<ObjectiveFunction, Contradiction> {
    let mut lits = Vec::new();
    let mut coeffs = Vec::new();
    for (pos, pm) in instance.pms().iter().enumerate() {
        let sign = solver.new_lit();
        let mut sum_lits = Vec::new();
        let mut sum_coeffs = Vec::new();
        for (vm_pos, vm) in instance.vms().iter().enumerate() {
            // d * cpu[pm] * memory[pm], exact in integers
            let scaled = vm.memory as i64 * pm.cpu as i64 - vm.cpu as i64 * pm.memory as i64;
            if scaled == 0 {
                continue;
            }
            let placed = vars.placement(vm_pos, pos);
            let plus = solver.new_lit();
            let minus = solver.new_lit();
            solver.add_constraint(PbConstraint::clause(vec![!placed, plus, minus]))?;
            solver.add_constraint(PbConstraint::clause(vec![placed, !plus]))?;
            solver.add_constraint(PbConstraint::clause(vec![placed, !minus]))?;
            solver.add_constraint(PbConstraint::clause(vec![!plus, !minus]))?;
            solver.add_constraint(PbConstraint::clause(vec![!plus, sign]))?;
            solver.add_constraint(PbConstraint::clause(vec![!minus, !sign]))?;

            let d = pm.memory_share(vm.memory) - pm.cpu_share(vm.cpu as u64);
            lits.push(plus);
            coeffs.push(d);
            lits.push(minus);
            coeffs.push(-d);
            sum_lits.push(placed);
            sum_coeffs.push(scaled);
        }
        if sum_lits.is_empty() {
            continue;
        }
        solver.add_constraint(PbConstraint::at_least(sum_lits.clone(), sum_coeffs.clone(), 0).implied_by(sign))?;
        solver.add_constraint(PbConstraint::at_most(sum_lits, sum_coeffs, 0).implied_by(!sign))?;
    }
    Ok(ObjectiveFunction::new(ObjectiveKind::Wastage, lits, coeffs, precision))
}

pub fn wastage(instance: &Instance, allocation: &Allocation) -> f64 {
    let mut cpu_used = vec![0u64; instance.pm_count()];
    let mut memory_used = vec![0u64; instance.pm_count()];
    for mapping in allocation.mappings() {
        if let (Some(vm), Some(pm)) = (instance.vm_position(mapping.vm_id), instance.pm_position(mapping.pm_id)) {
            cpu_used[pm] += instance.vm(vm).cpu as u64;
            memory_used[pm] += instance.vm(vm).memory;
        }
    }
    instance
        .pms()
        .iter()
        .enumerate()
        .map(|(pos, pm)| (pm.memory_share(memory_used[pos]) - pm.cpu_share(cpu_used[pos])).abs())
        .sum()
}
