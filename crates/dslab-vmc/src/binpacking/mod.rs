//! Greedy bin-packing of VMs onto machines.

pub mod ordering;
pub mod packer;
pub mod usage;

pub use ordering::{MachineKey, PackingOrder, VmOrder};
pub use packer::{BinPacker, PackingResult};
pub use usage::MachineUsage;
