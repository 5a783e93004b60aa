//! Error types.

use std::fmt::{Display, Formatter};

/// Signals that adding a constraint made the formula trivially unsatisfiable.
///
/// This is not a defect: the caller should treat the instance (or the current branch of the search) as unsatisfiable.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Contradiction;

impl Display for Contradiction {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str("formula is trivially unsatisfiable")
    }
}

impl std::error::Error for Contradiction {}

/// Crate-wide error type.
#[derive(Debug)]
pub enum VmcError {
    /// The domain model violates its invariants.
    InvalidInstance(String),
    /// The formula became unsatisfiable while it was expected to stay satisfiable.
    Contradiction,
    /// Internal state which should never be reached, e.g. an unsat core which implicates no assumption.
    UnexpectedState(String),
    /// Configuration could not be parsed or contains values out of range.
    Config(String),
    Io(std::io::Error),
}

impl Display for VmcError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            VmcError::InvalidInstance(msg) => write!(f, "invalid instance: {}", msg),
            VmcError::Contradiction => write!(f, "{}", Contradiction),
            VmcError::UnexpectedState(msg) => write!(f, "unexpected state: {}", msg),
            VmcError::Config(msg) => write!(f, "invalid config: {}", msg),
            VmcError::Io(err) => write!(f, "io error: {}", err),
        }
    }
}

impl std::error::Error for VmcError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            VmcError::Io(err) => Some(err),
            _ => None,
        }
    }
}

impl From<Contradiction> for VmcError {
    fn from(_: Contradiction) -> Self {
        VmcError::Contradiction
    }
}

impl From<std::io::Error> for VmcError {
    fn from(err: std::io::Error) -> Self {
        VmcError::Io(err)
    }
}

impl From<serde_yaml::Error> for VmcError {
    fn from(err: serde_yaml::Error) -> Self {
        VmcError::Config(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, VmcError>;
