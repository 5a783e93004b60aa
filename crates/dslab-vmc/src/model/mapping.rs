//! Mappings and allocations.

use std::collections::BTreeMap;
use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::error::{Result, VmcError};

/// Placement of a single VM onto a PM, both referenced by ID.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Mapping {
    pub vm_id: u32,
    pub pm_id: u32,
}

impl Mapping {
    pub fn new(vm_id: u32, pm_id: u32) -> Self {
        Self { vm_id, pm_id }
    }
}

/// Set of mappings where each VM appears at most once.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Allocation {
    mappings: BTreeMap<u32, u32>,
}

impl Allocation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds allocation from mappings, failing if some VM is mapped twice.
    pub fn from_mappings<I: IntoIterator<Item = Mapping>>(mappings: I) -> Result<Self> {
        let mut allocation = Self::new();
        for mapping in mappings {
            if allocation.assign(mapping.vm_id, mapping.pm_id).is_some() {
                return Err(VmcError::InvalidInstance(format!("VM {} is mapped twice", mapping.vm_id)));
            }
        }
        Ok(allocation)
    }

    /// Places VM onto PM, returns the previous PM of the VM if there was one.
    pub fn assign(&mut self, vm_id: u32, pm_id: u32) -> Option<u32> {
        self.mappings.insert(vm_id, pm_id)
    }

    pub fn remove(&mut self, vm_id: u32) -> Option<u32> {
        self.mappings.remove(&vm_id)
    }

    pub fn pm_of(&self, vm_id: u32) -> Option<u32> {
        self.mappings.get(&vm_id).copied()
    }

    pub fn contains_vm(&self, vm_id: u32) -> bool {
        self.mappings.contains_key(&vm_id)
    }

    pub fn len(&self) -> usize {
        self.mappings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.mappings.is_empty()
    }

    /// Iterates over mappings in increasing VM ID order.
    pub fn mappings(&self) -> impl Iterator<Item = Mapping> + '_ {
        self.mappings.iter().map(|(&vm_id, &pm_id)| Mapping { vm_id, pm_id })
    }

    pub fn vms_on(&self, pm_id: u32) -> Vec<u32> {
        self.mappings
            .iter()
            .filter(|(_, &pm)| pm == pm_id)
            .map(|(&vm, _)| vm)
            .collect()
    }

    /// Returns IDs of PMs hosting at least one VM.
    pub fn used_pms(&self) -> Vec<u32> {
        let mut pms: Vec<u32> = self.mappings.values().copied().collect();
        pms.sort_unstable();
        pms.dedup();
        pms
    }
}

impl Display for Allocation {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let parts: Vec<String> = self.mappings().map(|m| format!("{}->{}", m.vm_id, m.pm_id)).collect();
        write!(f, "[{}]", parts.join(", "))
    }
}
