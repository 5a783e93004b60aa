use serde::{Deserialize, Serialize};

use crate::model::vm::VirtualMachine;

/// Ordered group of virtual machines.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Job {
    pub id: u32,
    pub vms: Vec<VirtualMachine>,
}

impl Job {
    pub fn new(id: u32, vms: Vec<VirtualMachine>) -> Self {
        Self { id, vms }
    }

    pub fn anti_colocatable_vms(&self) -> impl Iterator<Item = &VirtualMachine> {
        self.vms.iter().filter(|vm| vm.anti_colocatable)
    }

    pub fn has_anti_colocation(&self) -> bool {
        self.vms.iter().filter(|vm| vm.anti_colocatable).count() > 1
    }
}
