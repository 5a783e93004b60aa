use std::collections::BTreeSet;

use crate::model::Instance;

/// Resources taken on a single machine during a bin-packing run.
#[derive(Clone, Debug)]
pub struct MachineUsage {
    pub pm: usize,
    pub vms: Vec<usize>,
    pub cpu_used: u64,
    pub memory_used: u64,
    /// Jobs which already have an anti-colocatable VM on the machine.
    pub anti_colocated_jobs: BTreeSet<u32>,
}

impl MachineUsage {
    pub fn new(pm: usize) -> Self {
        Self {
            pm,
            vms: Vec::new(),
            cpu_used: 0,
            memory_used: 0,
            anti_colocated_jobs: BTreeSet::new(),
        }
    }

    /// Checks capacity, anti-colocation and platform constraints.
    pub fn can_host(&self, instance: &Instance, vm: usize) -> bool {
        let pm = instance.pm(self.pm);
        let vm = instance.vm(vm);
        if !vm.is_allowed_on(pm.id) {
            return false;
        }
        if vm.anti_colocatable && self.anti_colocated_jobs.contains(&vm.job_id) {
            return false;
        }
        pm.fits(self.cpu_used + vm.cpu as u64, self.memory_used + vm.memory)
    }

    pub fn place(&mut self, instance: &Instance, vm: usize) {
        let resources = instance.vm(vm);
        self.cpu_used += resources.cpu as u64;
        self.memory_used += resources.memory;
        if resources.anti_colocatable {
            self.anti_colocated_jobs.insert(resources.job_id);
        }
        self.vms.push(vm);
    }

    pub fn remove(&mut self, instance: &Instance, vm: usize) {
        if let Some(pos) = self.vms.iter().position(|&v| v == vm) {
            self.vms.swap_remove(pos);
            let resources = instance.vm(vm);
            self.cpu_used -= resources.cpu as u64;
            self.memory_used -= resources.memory;
            if resources.anti_colocatable {
                self.anti_colocated_jobs.remove(&resources.job_id);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.vms.is_empty()
    }

    pub fn leftover_cpu(&self, instance: &Instance) -> u64 {
        instance.pm(self.pm).cpu as u64 - self.cpu_used
    }

    pub fn leftover_memory(&self, instance: &Instance) -> u64 {
        instance.pm(self.pm).memory - self.memory_used
    }
}
