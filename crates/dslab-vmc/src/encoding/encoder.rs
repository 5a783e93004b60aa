//! Hard constraints of the consolidation problem.

use log::debug;

use crate::encoding::symmetry;
use crate::encoding::variables::VariableMap;
use crate::error::Contradiction;
use crate::model::Instance;
use crate::solver::{PbConstraint, PbSolver};

/// Builds variables and hard constraints of an instance.
///
/// Constraints are added in a fixed order: aggregate capacity bound, platform eligibility, exactly-one placement,
/// per-machine capacity, power linkage, anti-colocation, migration budget and (optionally) symmetry breaking.
/// Any step may fail with [`Contradiction`], which means that the instance is unsatisfiable.
pub struct Encoder {
    break_symmetries: bool,
}

impl Encoder {
    pub fn new(break_symmetries: bool) -> Self {
        Self { break_symmetries }
    }

    pub fn encode(&self, instance: &Instance, solver: &mut dyn PbSolver) -> Result<VariableMap, Contradiction> {
        let vars = VariableMap::new(solver, instance.vm_count(), instance.pm_count());
        self.encode_aggregate_bound(instance, &vars, solver)?;
        self.encode_platform(instance, &vars, solver)?;
        self.encode_exactly_one(instance, &vars, solver)?;
        self.encode_capacity(instance, &vars, solver)?;
        self.encode_power_linkage(instance, &vars, solver)?;
        self.encode_anti_colocation(instance, &vars, solver)?;
        self.encode_migration_budget(instance, &vars, solver)?;
        if self.break_symmetries {
            let groups = symmetry::break_symmetries(instance, &vars, solver)?;
            debug!("Broke symmetries of {} VM groups", groups);
        }
        debug!(
            "Encoded {} VMs on {} PMs: {} variables, {} constraints",
            instance.vm_count(),
            instance.pm_count(),
            solver.num_vars(),
            solver.num_constraints()
        );
        Ok(vars)
    }

    /// Powered machines must cover the total demand.
    fn encode_aggregate_bound(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        let power: Vec<_> = (0..instance.pm_count()).map(|pm| vars.power(pm)).collect();
        let cpu = instance.pms().iter().map(|pm| pm.cpu as i64).collect();
        solver.add_constraint(PbConstraint::at_least(
            power.clone(),
            cpu,
            instance.total_cpu_demand() as i64,
        ))?;
        let memory = instance.pms().iter().map(|pm| pm.memory as i64).collect();
        solver.add_constraint(PbConstraint::at_least(
            power,
            memory,
            instance.total_memory_demand() as i64,
        ))
    }

    fn encode_platform(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        let mut forbidden = 0;
        for vm in 0..instance.vm_count() {
            for pm in 0..instance.pm_count() {
                if !instance.can_ever_host(vm, pm) {
                    solver.add_constraint(PbConstraint::unit(!vars.placement(vm, pm)))?;
                    forbidden += 1;
                }
            }
        }
        debug!("Forbidden {} placements", forbidden);
        Ok(())
    }

    fn encode_exactly_one(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        for vm in 0..instance.vm_count() {
            solver.add_constraint(PbConstraint::exactly_one(vars.vm_lits(vm))).map_err(|err| {
                debug!("VM {} can not be placed anywhere", instance.vm(vm).id);
                err
            })?;
        }
        Ok(())
    }

    fn encode_capacity(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        for (pos, pm) in instance.pms().iter().enumerate() {
            let mut lits = vars.pm_lits(pos);
            lits.push(vars.power(pos));

            let mut cpu: Vec<i64> = instance.vms().iter().map(|vm| vm.cpu as i64).collect();
            cpu.push(-(pm.cpu as i64));
            solver.add_constraint(PbConstraint::at_most(lits.clone(), cpu, 0))?;

            let mut memory: Vec<i64> = instance.vms().iter().map(|vm| vm.memory as i64).collect();
            memory.push(-(pm.memory as i64));
            solver.add_constraint(PbConstraint::at_most(lits, memory, 0))?;
        }
        Ok(())
    }

    /// A machine is powered on if and only if it hosts some VM.
    fn encode_power_linkage(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        for pm in 0..instance.pm_count() {
            let power = vars.power(pm);
            for vm in 0..instance.vm_count() {
                solver.add_constraint(PbConstraint::clause(vec![!vars.placement(vm, pm), power]))?;
            }
            let mut hosted = vars.pm_lits(pm);
            hosted.push(!power);
            solver.add_constraint(PbConstraint::clause(hosted))?;
        }
        Ok(())
    }

    fn encode_anti_colocation(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        for job in instance.jobs().iter().filter(|job| job.has_anti_colocation()) {
            let members: Vec<usize> = job
                .anti_colocatable_vms()
                .filter_map(|vm| instance.vm_position(vm.id))
                .collect();
            for pm in 0..instance.pm_count() {
                let lits = members.iter().map(|&vm| vars.placement(vm, pm)).collect();
                solver.add_constraint(PbConstraint::at_most_one(lits))?;
            }
        }
        Ok(())
    }

    /// Memory of pre-existing VMs which leave their machine is limited by the budget.
    fn encode_migration_budget(
        &self,
        instance: &Instance,
        vars: &VariableMap,
        solver: &mut dyn PbSolver,
    ) -> Result<(), Contradiction> {
        if !instance.has_pre_mappings() {
            return Ok(());
        }
        let mut lits = Vec::new();
        let mut memory = Vec::new();
        for vm in 0..instance.vm_count() {
            if let Some(pm) = instance.original_pm(vm) {
                lits.push(!vars.placement(vm, pm));
                memory.push(instance.vm(vm).memory as i64);
            }
        }
        let budget = instance.migration_budget();
        debug!("Migration budget: {}", budget);
        solver.add_constraint(PbConstraint::at_most(lits, memory, budget as i64))
    }
}
