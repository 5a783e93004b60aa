use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// Virtual machine to be placed.
///
/// Anti-colocatable VMs of the same job can not share a physical machine. Machines from `unallowed_pms` can not host
/// the VM at all (platform constraint).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VirtualMachine {
    pub id: u32,
    pub job_id: u32,
    pub index: u32,
    pub cpu: u32,
    pub memory: u64,
    pub anti_colocatable: bool,
    #[serde(default)]
    pub unallowed_pms: BTreeSet<u32>,
}

impl VirtualMachine {
    pub fn new(id: u32, job_id: u32, index: u32, cpu: u32, memory: u64, anti_colocatable: bool) -> Self {
        Self {
            id,
            job_id,
            index,
            cpu,
            memory,
            anti_colocatable,
            unallowed_pms: BTreeSet::new(),
        }
    }

    pub fn with_unallowed_pms<I: IntoIterator<Item = u32>>(mut self, pms: I) -> Self {
        self.unallowed_pms.extend(pms);
        self
    }

    /// Checks the platform constraint only.
    pub fn is_allowed_on(&self, pm_id: u32) -> bool {
        !self.unallowed_pms.contains(&pm_id)
    }
}
