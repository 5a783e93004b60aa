//! Physical machine.

use serde::{Deserialize, Serialize};

/// Physical machine with CPU/memory capacity and a linear power curve.
///
/// The machine consumes `idle_power` when powered on and not loaded, and `max_power` under full CPU load.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicalMachine {
    pub id: u32,
    pub cpu: u32,
    pub memory: u64,
    pub idle_power: f64,
    pub max_power: f64,
}

impl PhysicalMachine {
    pub fn new(id: u32, cpu: u32, memory: u64, idle_power: f64, max_power: f64) -> Self {
        Self {
            id,
            cpu,
            memory,
            idle_power,
            max_power,
        }
    }

    /// Returns power consumption of powered on machine with given CPU load in range [0, 1].
    pub fn power(&self, cpu_load: f64) -> f64 {
        self.idle_power + cpu_load.min(1.) * (self.max_power - self.idle_power)
    }

    /// Returns the share of machine CPU taken by `cpu` units.
    pub fn cpu_share(&self, cpu: u64) -> f64 {
        cpu as f64 / self.cpu as f64
    }

    /// Returns the share of machine memory taken by `memory` units.
    pub fn memory_share(&self, memory: u64) -> f64 {
        memory as f64 / self.memory as f64
    }

    pub fn fits(&self, cpu: u64, memory: u64) -> bool {
        cpu <= self.cpu as u64 && memory <= self.memory
    }
}
