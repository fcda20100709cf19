pub mod capacitance;
pub mod circuit;
pub mod object;

use crate::numerics::linear::SolveError;
use thiserror::Error;

/// Fatal configuration errors, surfaced at setup before any stepping.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("capacitance matrix is singular; conductor geometry is degenerate")]
    SingularCapacitance,
    #[error("bias constraint system is singular; check circuit membership")]
    SingularBias,
    #[error("object {0} selects no mesh cells")]
    EmptyObject(usize),
    #[error("objects {0} and {1} share mesh cells")]
    OverlappingObjects(usize, usize),
    #[error("circuit references undefined object {0}")]
    UnknownObject(usize),
    #[error("object {0} is a member of more than one circuit")]
    SharedObject(usize),
    #[error("circuit {circuit} has {members} members but {biases} bias offsets")]
    BiasCountMismatch {
        circuit: usize,
        members: usize,
        biases: usize,
    },
    #[error("objects require a fixed exterior potential reference")]
    NoReference,
    #[error("field solve during setup failed: {0}")]
    FieldSolve(#[from] SolveError),
}
