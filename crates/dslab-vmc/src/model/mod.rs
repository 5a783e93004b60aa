//! Domain model of the consolidation problem.

pub mod instance;
pub mod job;
pub mod machine;
pub mod mapping;
pub mod vm;

pub use instance::{Instance, Violation};
pub use job::Job;
pub use machine::PhysicalMachine;
pub use mapping::{Allocation, Mapping};
pub use vm::VirtualMachine;
