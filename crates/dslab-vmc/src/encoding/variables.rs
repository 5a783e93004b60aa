use crate::error::{Result, VmcError};
use crate::model::{Allocation, Instance};
use crate::solver::{Lit, Model, PbSolver, Var};

/// Decision variables of the encoding: one per (VM, PM) pair meaning "VM is placed on PM" and one per PM meaning
/// "PM is powered on".
#[derive(Clone, Debug)]
pub struct VariableMap {
    placement: Vec<Vec<Var>>,
    power: Vec<Var>,
}

impl VariableMap {
    pub fn new(solver: &mut dyn PbSolver, vm_count: usize, pm_count: usize) -> Self {
        let placement = (0..vm_count)
            .map(|_| (0..pm_count).map(|_| solver.new_var()).collect())
            .collect();
        let power = (0..pm_count).map(|_| solver.new_var()).collect();
        Self { placement, power }
    }

    pub fn placement(&self, vm: usize, pm: usize) -> Lit {
        self.placement[vm][pm].pos_lit()
    }

    pub fn power(&self, pm: usize) -> Lit {
        self.power[pm].pos_lit()
    }

    pub fn vm_count(&self) -> usize {
        self.placement.len()
    }

    pub fn pm_count(&self) -> usize {
        self.power.len()
    }

    pub fn vm_lits(&self, vm: usize) -> Vec<Lit> {
        self.placement[vm].iter().map(|v| v.pos_lit()).collect()
    }

    pub fn pm_lits(&self, pm: usize) -> Vec<Lit> {
        self.placement.iter().map(|row| row[pm].pos_lit()).collect()
    }

    pub fn placement_lits(&self) -> Vec<Lit> {
        self.placement.iter().flatten().map(|v| v.pos_lit()).collect()
    }

    /// Reads the allocation from a model of the encoding.
    pub fn decode(&self, instance: &Instance, model: &Model) -> Result<Allocation> {
        let mut allocation = Allocation::new();
        for (vm, row) in self.placement.iter().enumerate() {
            let pm = row.iter().position(|&var| model.value(var)).ok_or_else(|| {
                VmcError::UnexpectedState(format!("model does not place VM {}", instance.vm(vm).id))
            })?;
            allocation.assign(instance.vm(vm).id, instance.pm(pm).id);
        }
        Ok(allocation)
    }

    /// Returns placement literals which are true for the mappings of the allocation.
    pub fn mapping_lits(&self, instance: &Instance, allocation: &Allocation) -> Result<Vec<Lit>> {
        allocation
            .mappings()
            .map(|m| {
                let vm = instance
                    .vm_position(m.vm_id)
                    .ok_or_else(|| VmcError::InvalidInstance(format!("unknown VM {}", m.vm_id)))?;
                let pm = instance
                    .pm_position(m.pm_id)
                    .ok_or_else(|| VmcError::InvalidInstance(format!("unknown PM {}", m.pm_id)))?;
                Ok(self.placement(vm, pm))
            })
            .collect()
    }
}
