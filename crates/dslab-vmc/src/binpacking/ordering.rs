//! Orders of machines and VMs used by the packer.

use std::cmp::Reverse;

use ordered_float::OrderedFloat;
use rand::prelude::*;
use rand_pcg::Pcg64;
use serde::{Deserialize, Serialize};

use crate::binpacking::usage::MachineUsage;
use crate::model::Instance;

/// Rule used to choose the machine for the next VM.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackingOrder {
    /// Machine with the least leftover CPU share, ties broken by leftover memory and ID.
    BestFit,
    /// Machines in the order of decreasing capacity, ties broken by ID.
    FirstFit,
}

/// Priority of a machine, the machine with the smallest key is tried first.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub struct MachineKey {
    primary: OrderedFloat<f64>,
    secondary: i64,
    id: u32,
}

impl PackingOrder {
    pub fn key(&self, instance: &Instance, usage: &MachineUsage) -> MachineKey {
        let pm = instance.pm(usage.pm);
        match self {
            PackingOrder::BestFit => MachineKey {
                primary: OrderedFloat(pm.cpu_share(usage.leftover_cpu(instance))),
                secondary: usage.leftover_memory(instance) as i64,
                id: pm.id,
            },
            PackingOrder::FirstFit => MachineKey {
                primary: OrderedFloat(-(pm.cpu as f64)),
                secondary: -(pm.memory as i64),
                id: pm.id,
            },
        }
    }
}

/// Order in which VMs are packed.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum VmOrder {
    /// Decreasing (CPU, memory, job, index).
    Decreasing,
    /// Random permutation generated from the seed.
    Shuffled(u64),
    /// VMs with given IDs first, the rest in decreasing order.
    Custom(Vec<u32>),
}

impl VmOrder {
    /// Returns VM positions in packing order.
    pub fn sequence(&self, instance: &Instance) -> Vec<usize> {
        let mut decreasing: Vec<usize> = (0..instance.vm_count()).collect();
        decreasing.sort_by_key(|&pos| {
            let vm = instance.vm(pos);
            Reverse((vm.cpu, vm.memory, vm.job_id, vm.index))
        });
        match self {
            VmOrder::Decreasing => decreasing,
            VmOrder::Shuffled(seed) => {
                let mut rng = Pcg64::seed_from_u64(*seed);
                decreasing.shuffle(&mut rng);
                decreasing
            }
            VmOrder::Custom(ids) => {
                let mut listed = vec![false; instance.vm_count()];
                let mut sequence = Vec::with_capacity(instance.vm_count());
                for pos in ids.iter().filter_map(|&id| instance.vm_position(id)) {
                    if !listed[pos] {
                        listed[pos] = true;
                        sequence.push(pos);
                    }
                }
                sequence.extend(decreasing.into_iter().filter(|&pos| !listed[pos]));
                sequence
            }
        }
    }
}
