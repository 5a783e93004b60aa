#![doc = include_str!("../README.md")]

pub mod algorithms;
pub mod binpacking;
pub mod config;
pub mod encoding;
pub mod error;
pub mod hashing;
pub mod mcs;
pub mod model;
pub mod objective;
pub mod solver;

pub use algorithms::allocator::Allocator;
pub use algorithms::SearchStrategy;
pub use config::VmcConfig;
pub use error::{Contradiction, Result, VmcError};
pub use model::{Allocation, Instance, Job, Mapping, PhysicalMachine, VirtualMachine};
