//! Validated problem instance.

use std::collections::BTreeMap;

use rustc_hash::FxHashMap;

use crate::error::{Result, VmcError};
use crate::model::job::Job;
use crate::model::machine::PhysicalMachine;
use crate::model::mapping::Allocation;
use crate::model::vm::VirtualMachine;

/// Property of a feasible allocation violated by some allocation.
#[derive(Clone, Debug, PartialEq)]
pub enum Violation {
    Unassigned { vm_id: u32 },
    UnknownVm { vm_id: u32 },
    UnknownPm { vm_id: u32, pm_id: u32 },
    CpuExceeded { pm_id: u32, used: u64, capacity: u64 },
    MemoryExceeded { pm_id: u32, used: u64, capacity: u64 },
    AntiColocation { job_id: u32, pm_id: u32 },
    Forbidden { vm_id: u32, pm_id: u32 },
    MigrationBudget { migrated: u64, budget: u64 },
}

/// Consolidation problem instance: machines, jobs, pre-existing placement and migration budget.
///
/// Built once and never mutated afterwards. Machines and VMs are addressed by their position (dense index) inside the
/// instance, IDs are used only at the boundary and in logs.
#[derive(Clone, Debug)]
pub struct Instance {
    pms: Vec<PhysicalMachine>,
    jobs: Vec<Job>,
    vms: Vec<VirtualMachine>,
    pm_positions: FxHashMap<u32, usize>,
    vm_positions: FxHashMap<u32, usize>,
    pre_mappings: Allocation,
    original_pms: Vec<Option<usize>>,
    max_migration_percentile: f64,
}

impl Instance {
    pub fn new(
        pms: Vec<PhysicalMachine>,
        jobs: Vec<Job>,
        pre_mappings: Allocation,
        max_migration_percentile: f64,
    ) -> Result<Self> {
        if !(0.0..=1.0).contains(&max_migration_percentile) {
            return Err(VmcError::InvalidInstance(format!(
                "migration percentile {} is out of [0, 1]",
                max_migration_percentile
            )));
        }
        let mut pm_positions = FxHashMap::default();
        for (pos, pm) in pms.iter().enumerate() {
            if pm.cpu == 0 || pm.memory == 0 {
                return Err(VmcError::InvalidInstance(format!("PM {} has zero capacity", pm.id)));
            }
            if pm.max_power < pm.idle_power {
                return Err(VmcError::InvalidInstance(format!(
                    "PM {} has max power below idle power",
                    pm.id
                )));
            }
            if pm_positions.insert(pm.id, pos).is_some() {
                return Err(VmcError::InvalidInstance(format!("duplicate PM ID {}", pm.id)));
            }
        }

        let mut vms = Vec::new();
        let mut vm_positions = FxHashMap::default();
        for job in &jobs {
            for vm in &job.vms {
                if vm.job_id != job.id {
                    return Err(VmcError::InvalidInstance(format!(
                        "VM {} belongs to job {} but is listed in job {}",
                        vm.id, vm.job_id, job.id
                    )));
                }
                if vm_positions.insert(vm.id, vms.len()).is_some() {
                    return Err(VmcError::InvalidInstance(format!("duplicate VM ID {}", vm.id)));
                }
                vms.push(vm.clone());
            }
        }

        let mut original_pms = vec![None; vms.len()];
        for mapping in pre_mappings.mappings() {
            let vm = *vm_positions.get(&mapping.vm_id).ok_or_else(|| {
                VmcError::InvalidInstance(format!("pre-existing mapping of unknown VM {}", mapping.vm_id))
            })?;
            let pm = *pm_positions.get(&mapping.pm_id).ok_or_else(|| {
                VmcError::InvalidInstance(format!(
                    "VM {} is pre-mapped to unknown PM {}",
                    mapping.vm_id, mapping.pm_id
                ))
            })?;
            original_pms[vm] = Some(pm);
        }

        Ok(Self {
            pms,
            jobs,
            vms,
            pm_positions,
            vm_positions,
            pre_mappings,
            original_pms,
            max_migration_percentile,
        })
    }

    pub fn pms(&self) -> &[PhysicalMachine] {
        &self.pms
    }

    pub fn vms(&self) -> &[VirtualMachine] {
        &self.vms
    }

    pub fn jobs(&self) -> &[Job] {
        &self.jobs
    }

    pub fn pm(&self, pos: usize) -> &PhysicalMachine {
        &self.pms[pos]
    }

    pub fn vm(&self, pos: usize) -> &VirtualMachine {
        &self.vms[pos]
    }

    pub fn pm_count(&self) -> usize {
        self.pms.len()
    }

    pub fn vm_count(&self) -> usize {
        self.vms.len()
    }

    pub fn pm_position(&self, pm_id: u32) -> Option<usize> {
        self.pm_positions.get(&pm_id).copied()
    }

    pub fn vm_position(&self, vm_id: u32) -> Option<usize> {
        self.vm_positions.get(&vm_id).copied()
    }

    pub fn pre_mappings(&self) -> &Allocation {
        &self.pre_mappings
    }

    /// Migration cost is only defined when there is a pre-existing placement.
    pub fn has_pre_mappings(&self) -> bool {
        !self.pre_mappings.is_empty()
    }

    /// Position of the PM hosting the VM (by position) in the pre-existing placement.
    pub fn original_pm(&self, vm: usize) -> Option<usize> {
        self.original_pms[vm]
    }

    pub fn max_migration_percentile(&self) -> f64 {
        self.max_migration_percentile
    }

    pub fn total_memory(&self) -> u64 {
        self.pms.iter().map(|pm| pm.memory).sum()
    }

    pub fn total_cpu_demand(&self) -> u64 {
        self.vms.iter().map(|vm| vm.cpu as u64).sum()
    }

    pub fn total_memory_demand(&self) -> u64 {
        self.vms.iter().map(|vm| vm.memory).sum()
    }

    /// Maximum memory of pre-existing VMs which can be migrated.
    pub fn migration_budget(&self) -> u64 {
        (self.max_migration_percentile * self.total_memory() as f64).floor() as u64
    }

    /// Checks platform and capacity constraints of a single VM against an empty machine.
    pub fn can_ever_host(&self, vm: usize, pm: usize) -> bool {
        let vm = &self.vms[vm];
        let pm = &self.pms[pm];
        vm.is_allowed_on(pm.id) && pm.fits(vm.cpu as u64, vm.memory)
    }

    /// Memory of pre-existing VMs which are placed differently by the allocation.
    pub fn migrated_memory(&self, allocation: &Allocation) -> u64 {
        self.pre_mappings
            .mappings()
            .filter(|m| allocation.pm_of(m.vm_id) != Some(m.pm_id))
            .filter_map(|m| self.vm_position(m.vm_id))
            .map(|pos| self.vms[pos].memory)
            .sum()
    }

    /// Returns all violated properties of the allocation, empty if the allocation is feasible.
    pub fn validate_allocation(&self, allocation: &Allocation) -> Vec<Violation> {
        let mut violations = Vec::new();
        for vm in &self.vms {
            if !allocation.contains_vm(vm.id) {
                violations.push(Violation::Unassigned { vm_id: vm.id });
            }
        }

        let mut usage: BTreeMap<usize, (u64, u64)> = BTreeMap::new();
        let mut anti_colocated: BTreeMap<(u32, u32), u32> = BTreeMap::new();
        for mapping in allocation.mappings() {
            let vm = match self.vm_position(mapping.vm_id) {
                Some(pos) => &self.vms[pos],
                None => {
                    violations.push(Violation::UnknownVm { vm_id: mapping.vm_id });
                    continue;
                }
            };
            let pm = match self.pm_position(mapping.pm_id) {
                Some(pos) => pos,
                None => {
                    violations.push(Violation::UnknownPm {
                        vm_id: vm.id,
                        pm_id: mapping.pm_id,
                    });
                    continue;
                }
            };
            if !vm.is_allowed_on(mapping.pm_id) {
                violations.push(Violation::Forbidden {
                    vm_id: vm.id,
                    pm_id: mapping.pm_id,
                });
            }
            let entry = usage.entry(pm).or_insert((0, 0));
            entry.0 += vm.cpu as u64;
            entry.1 += vm.memory;
            if vm.anti_colocatable {
                *anti_colocated.entry((vm.job_id, mapping.pm_id)).or_insert(0) += 1;
            }
        }

        for (pm, (cpu, memory)) in usage {
            let pm = &self.pms[pm];
            if cpu > pm.cpu as u64 {
                violations.push(Violation::CpuExceeded {
                    pm_id: pm.id,
                    used: cpu,
                    capacity: pm.cpu as u64,
                });
            }
            if memory > pm.memory {
                violations.push(Violation::MemoryExceeded {
                    pm_id: pm.id,
                    used: memory,
                    capacity: pm.memory,
                });
            }
        }
        for ((job_id, pm_id), count) in anti_colocated {
            if count > 1 {
                violations.push(Violation::AntiColocation { job_id, pm_id });
            }
        }

        if self.has_pre_mappings() {
            let migrated = self.migrated_memory(allocation);
            let budget = self.migration_budget();
            if migrated > budget {
                violations.push(Violation::MigrationBudget { migrated, budget });
            }
        }
        violations
    }

    pub fn is_feasible(&self, allocation: &Allocation) -> bool {
        self.validate_allocation(allocation).is_empty()
    }
}
