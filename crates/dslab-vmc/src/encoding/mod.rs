//! Translation of an instance into pseudo-Boolean variables and constraints.

pub mod context;
pub mod encoder;
pub mod symmetry;
pub mod variables;

pub use context::SolverContext;
pub use encoder::Encoder;
pub use variables::VariableMap;
