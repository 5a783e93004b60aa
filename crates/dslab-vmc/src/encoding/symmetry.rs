//! Symmetry breaking for interchangeable VMs.
//!
//! VMs with equal footprint, anti-colocation class, pre-existing machine and platform restrictions can be permuted
//! in any solution without changing feasibility or objectives. Members of such a group are forced to occupy machines
//! in non-decreasing order (strictly increasing for anti-colocatable members of one job, which can never share a
//! machine).

use std::collections::BTreeMap;

use crate::encoding::variables::VariableMap;
use crate::error::Contradiction;
use crate::model::Instance;
use crate::solver::{PbConstraint, PbSolver};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord)]
struct GroupKey {
    cpu: u32,
    memory: u64,
    anti_colocation_job: Option<u32>,
    original_pm: Option<usize>,
    unallowed_pms: Vec<u32>,
}

/// Returns groups of interchangeable VMs (by position), only groups with at least two members.
pub fn symmetric_groups(instance: &Instance) -> Vec<(bool, Vec<usize>)> {
    let mut groups: BTreeMap<GroupKey, Vec<usize>> = BTreeMap::new();
    for (pos, vm) in instance.vms().iter().enumerate() {
        let key = GroupKey {
            cpu: vm.cpu,
            memory: vm.memory,
            anti_colocation_job: if vm.anti_colocatable { Some(vm.job_id) } else { None },
            original_pm: instance.original_pm(pos),
            unallowed_pms: vm.unallowed_pms.iter().copied().collect(),
        };
        groups.entry(key).or_default().push(pos);
    }
    groups
        .into_iter()
        .filter(|(_, members)| members.len() > 1)
        .map(|(key, members)| (key.anti_colocation_job.is_some(), members))
        .collect()
}

pub fn break_symmetries(
    instance: &Instance,
    vars: &VariableMap,
    solver: &mut dyn PbSolver,
) -> Result<usize, Contradiction> {
    let groups = symmetric_groups(instance);
    for (strict, members) in &groups {
        let allowed: Vec<usize> = (0..instance.pm_count())
            .filter(|&pm| instance.can_ever_host(members[0], pm))
            .collect();
        order_group(members, &allowed, *strict, vars, solver)?;
    }
    Ok(groups.len())
}

fn order_group(
    members: &[usize],
    allowed: &[usize],
    strict: bool,
    vars: &VariableMap,
    solver: &mut dyn PbSolver,
) -> Result<(), Contradiction> {
    for pair in members.windows(2) {
        let (prev, next) = (pair[0], pair[1]);
        for k in 0..allowed.len() {
            // next on allowed[k] implies prev on one of the preceding machines
            let bound = if strict { k } else { k + 1 };
            let mut lits: Vec<_> = allowed[..bound].iter().map(|&pm| vars.placement(prev, pm)).collect();
            lits.push(!vars.placement(next, allowed[k]));
            solver.add_constraint(PbConstraint::clause(lits))?;
        }
    }
    if strict {
        let n = allowed.len();
        let size = members.len();
        for (i, &vm) in members.iter().enumerate() {
            for (k, &pm) in allowed.iter().enumerate() {
                if k < i || k + size > n + i {
                    solver.add_constraint(PbConstraint::unit(!vars.placement(vm, pm)))?;
                }
            }
        }
    }
    Ok(())
}
