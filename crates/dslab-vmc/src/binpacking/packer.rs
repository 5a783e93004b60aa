//! Bin-packing engine.
//!
//! Machines are kept in an arena of [`MachineUsage`] entries and ordered by a heap of their indices, so speculative
//! repacking during the migration phase only needs to clone both structures and drop the copy on failure.

use std::collections::BTreeSet;
use std::rc::Rc;
use std::time::Instant;

use log::{debug, trace};
use priority_queue::DoublePriorityQueue;

use crate::algorithms::clock::NO_TIMEOUT;
use crate::binpacking::ordering::{MachineKey, PackingOrder, VmOrder};
use crate::binpacking::usage::MachineUsage;
use crate::error::{Result, VmcError};
use crate::model::{Allocation, Instance};

/// Outcome of a packing run.
#[derive(Clone, Debug, PartialEq)]
pub enum PackingResult {
    Complete(Allocation),
    /// Some VM could not be placed: VMs placed so far and IDs of VMs which were not placed.
    Partial { allocation: Allocation, leftover: Vec<u32> },
}

impl PackingResult {
    pub fn is_complete(&self) -> bool {
        matches!(self, PackingResult::Complete(_))
    }

    pub fn allocation(&self) -> &Allocation {
        match self {
            PackingResult::Complete(allocation) => allocation,
            PackingResult::Partial { allocation, .. } => allocation,
        }
    }

    /// Returns the allocation if all VMs were placed.
    pub fn into_complete(self) -> Option<Allocation> {
        match self {
            PackingResult::Complete(allocation) => Some(allocation),
            PackingResult::Partial { .. } => None,
        }
    }
}

#[derive(Clone)]
struct PackingState {
    usages: Vec<MachineUsage>,
    queue: DoublePriorityQueue<usize, MachineKey>,
    placement: Vec<Option<usize>>,
}

impl PackingState {
    fn allocation(&self, instance: &Instance) -> Allocation {
        let mut allocation = Allocation::new();
        for (vm, pm) in self.placement.iter().enumerate() {
            if let Some(pm) = pm {
                allocation.assign(instance.vm(vm).id, instance.pm(*pm).id);
            }
        }
        allocation
    }
}

pub struct BinPacker {
    instance: Rc<Instance>,
    order: PackingOrder,
    original_pms: Vec<Option<usize>>,
    max_migration_percentile: f64,
    timeout: f64,
}

impl BinPacker {
    /// Creates packer using pre-existing mappings and migration budget of the instance.
    pub fn new(instance: Rc<Instance>, order: PackingOrder) -> Self {
        let original_pms = (0..instance.vm_count()).map(|vm| instance.original_pm(vm)).collect();
        let max_migration_percentile = instance.max_migration_percentile();
        Self {
            instance,
            order,
            original_pms,
            max_migration_percentile,
            timeout: NO_TIMEOUT,
        }
    }

    /// Replaces pre-existing mappings and migration budget used by subsequent runs.
    pub fn reconfigure(&mut self, pre_mappings: &Allocation, max_migration_percentile: f64) -> Result<()> {
        if !(0.0..=1.0).contains(&max_migration_percentile) {
            return Err(VmcError::InvalidInstance(format!(
                "migration percentile {} is out of [0, 1]",
                max_migration_percentile
            )));
        }
        self.original_pms = self.positions_of(pre_mappings)?;
        self.max_migration_percentile = max_migration_percentile;
        Ok(())
    }

    /// Limits the duration of the migration phase of each run.
    pub fn set_timeout(&mut self, timeout: f64) {
        self.timeout = timeout;
    }

    pub fn order(&self) -> PackingOrder {
        self.order
    }

    pub fn pack(&self, vm_order: &VmOrder) -> PackingResult {
        self.run(&self.original_pms, vm_order, true)
    }

    /// Completes a partial allocation: its mappings are kept where feasible and the rest of VMs is packed greedily.
    pub fn repair(&self, partial: &Allocation, vm_order: &VmOrder) -> Result<PackingResult> {
        let fixed = self.positions_of(partial)?;
        Ok(self.run(&fixed, vm_order, false))
    }

    fn positions_of(&self, allocation: &Allocation) -> Result<Vec<Option<usize>>> {
        let mut positions = vec![None; self.instance.vm_count()];
        for mapping in allocation.mappings() {
            let vm = self
                .instance
                .vm_position(mapping.vm_id)
                .ok_or_else(|| VmcError::InvalidInstance(format!("unknown VM {}", mapping.vm_id)))?;
            let pm = self
                .instance
                .pm_position(mapping.pm_id)
                .ok_or_else(|| VmcError::InvalidInstance(format!("unknown PM {}", mapping.pm_id)))?;
            positions[vm] = Some(pm);
        }
        Ok(positions)
    }

    fn run(&self, original_pms: &[Option<usize>], vm_order: &VmOrder, migrate: bool) -> PackingResult {
        let started = Instant::now();
        let instance = self.instance.as_ref();
        let sequence = vm_order.sequence(instance);
        let mut state = self.initial_state();

        for &vm in &sequence {
            if let Some(pm) = original_pms[vm] {
                if state.usages[pm].can_host(instance, vm) {
                    self.place(&mut state, vm, pm);
                } else {
                    debug!(
                        "VM {} can not stay on PM {}, it will be migrated",
                        instance.vm(vm).id,
                        instance.pm(pm).id
                    );
                }
            }
        }

        // pre-existing VMs displaced from their machines are migrations as well
        let budget = self.migration_budget();
        let mut forced = 0;
        let mut over_budget = Vec::new();
        for (i, &vm) in sequence.iter().enumerate() {
            if state.placement[vm].is_some() {
                continue;
            }
            let memory = instance.vm(vm).memory;
            if migrate && original_pms[vm].is_some() && forced + memory > budget {
                debug!(
                    "Moving VM {} exceeds migration budget {}, it stays unplaced",
                    instance.vm(vm).id,
                    budget
                );
                over_budget.push(vm);
                continue;
            }
            match self.find_host(&mut state, vm) {
                Some(pm) => {
                    trace!("VM {} -> PM {}", instance.vm(vm).id, instance.pm(pm).id);
                    self.place(&mut state, vm, pm);
                    if migrate && original_pms[vm].is_some() {
                        forced += memory;
                    }
                }
                None => {
                    let leftover: Vec<u32> = over_budget
                        .iter()
                        .chain(sequence[i..].iter().filter(|&&v| state.placement[v].is_none()))
                        .map(|&v| instance.vm(v).id)
                        .collect();
                    debug!(
                        "No machine can host VM {}, {} VMs left unplaced",
                        instance.vm(vm).id,
                        leftover.len()
                    );
                    return PackingResult::Partial {
                        allocation: state.allocation(instance),
                        leftover,
                    };
                }
            }
        }
        if !over_budget.is_empty() {
            return PackingResult::Partial {
                allocation: state.allocation(instance),
                leftover: over_budget.iter().map(|&vm| instance.vm(vm).id).collect(),
            };
        }

        if migrate {
            self.migrate(&mut state, original_pms, started);
        }
        PackingResult::Complete(state.allocation(instance))
    }

    fn initial_state(&self) -> PackingState {
        let instance = self.instance.as_ref();
        let usages: Vec<MachineUsage> = (0..instance.pm_count()).map(MachineUsage::new).collect();
        let mut queue = DoublePriorityQueue::new();
        for usage in &usages {
            queue.push(usage.pm, self.order.key(instance, usage));
        }
        PackingState {
            usages,
            queue,
            placement: vec![None; instance.vm_count()],
        }
    }

    /// Pops machines until one can host the VM, then restores the rest of popped entries.
    fn find_host(&self, state: &mut PackingState, vm: usize) -> Option<usize> {
        let mut popped = Vec::new();
        let mut found = None;
        while let Some((pm, key)) = state.queue.pop_min() {
            if state.usages[pm].can_host(&self.instance, vm) {
                found = Some((pm, key));
                break;
            }
            popped.push((pm, key));
        }
        for (pm, key) in popped {
            state.queue.push(pm, key);
        }
        found.map(|(pm, _)| pm)
    }

    fn place(&self, state: &mut PackingState, vm: usize, pm: usize) {
        state.usages[pm].place(&self.instance, vm);
        state.placement[vm] = Some(pm);
        state.queue.push(pm, self.order.key(&self.instance, &state.usages[pm]));
    }

    /// Memory of pre-existing VMs which may be moved, relative to the capacity of all machines.
    fn migration_budget(&self) -> u64 {
        (self.max_migration_percentile * self.instance.total_memory() as f64).floor() as u64
    }

    fn migrated_memory(&self, state: &PackingState, original_pms: &[Option<usize>]) -> u64 {
        original_pms
            .iter()
            .enumerate()
            .filter(|(vm, original)| original.is_some() && state.placement[*vm] != **original)
            .map(|(vm, _)| self.instance.vm(vm).memory)
            .sum()
    }

    fn migration_delta(&self, original_pms: &[Option<usize>], vm: usize, from: usize, to: usize) -> i64 {
        match original_pms[vm] {
            Some(original) => {
                let memory = self.instance.vm(vm).memory as i64;
                (to != original) as i64 * memory - (from != original) as i64 * memory
            }
            None => 0,
        }
    }

    /// Closes machines starting from the least used one while the residents fit elsewhere within the budget.
    fn migrate(&self, state: &mut PackingState, original_pms: &[Option<usize>], started: Instant) {
        let instance = self.instance.as_ref();
        let has_original = original_pms.iter().any(|pm| pm.is_some());
        let budget = if has_original {
            let reduced_capacity: u64 = state
                .usages
                .iter()
                .filter(|usage| !usage.is_empty())
                .map(|usage| instance.pm(usage.pm).memory)
                .sum();
            (self.max_migration_percentile * reduced_capacity as f64).floor() as u64
        } else {
            u64::MAX
        };
        if budget == 0 {
            debug!("Migration budget is zero, skipping migration phase");
            return;
        }

        let mut migrated = self.migrated_memory(state, original_pms);
        let mut tried = BTreeSet::new();
        loop {
            if started.elapsed().as_secs_f64() >= self.timeout {
                debug!("Migration phase stopped by timeout");
                break;
            }
            let candidate = state
                .usages
                .iter()
                .filter(|usage| !usage.is_empty() && !tried.contains(&usage.pm))
                .min_by_key(|usage| (usage.cpu_used, usage.memory_used, instance.pm(usage.pm).id))
                .map(|usage| usage.pm);
            let candidate = match candidate {
                Some(pm) => pm,
                None => break,
            };
            tried.insert(candidate);

            let mut trial = state.clone();
            for usage in &state.usages {
                if usage.is_empty() || usage.pm == candidate {
                    trial.queue.remove(&usage.pm);
                }
            }
            let mut residents = trial.usages[candidate].vms.clone();
            residents.sort_by_key(|&vm| {
                let resources = instance.vm(vm);
                std::cmp::Reverse((resources.cpu, resources.memory, resources.job_id, resources.index))
            });

            let mut delta = 0;
            let mut moved_all = true;
            for vm in residents {
                trial.usages[candidate].remove(instance, vm);
                trial.placement[vm] = None;
                match self.find_host(&mut trial, vm) {
                    Some(pm) => {
                        self.place(&mut trial, vm, pm);
                        delta += self.migration_delta(original_pms, vm, candidate, pm);
                    }
                    None => {
                        moved_all = false;
                        break;
                    }
                }
            }

            let total = migrated as i64 + delta;
            if moved_all && total <= budget.min(i64::MAX as u64) as i64 {
                debug!(
                    "Closed PM {}, migrated memory {} of {}",
                    instance.pm(candidate).id,
                    total,
                    budget
                );
                *state = trial;
                migrated = total as u64;
            } else {
                debug!("Keeping PM {} powered on", instance.pm(candidate).id);
            }
        }
    }
}
