//! Numerical kernel of a rigid body simulator.
//!
//! The crate is split into the orientation algebra on SO(3) ([`rotation`]) and a frictional
//! contact solver that reformulates contact constraints as a box constrained linear
//! complementarity problem ([`lcp`], driven by [`ContactSolver`]).

mod contact;
pub mod io;
pub mod lcp;
pub mod rotation;

pub use self::contact::*;
pub use self::lcp::{SolveResult, Status, ValidationFailure};
pub use self::rotation::{SO3Matrix, SO3Quaternion, SO3Vector, Tangent, SO3};

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error("Size mismatch error: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("Matrix is not square: {rows}x{cols}")]
    NonSquareMatrix { rows: usize, cols: usize },
    #[error("Invalid parameter: {name:?}")]
    InvalidParameter { name: String },
    #[error("Matrix is not a valid rotation")]
    InvalidRotation,
    #[error("Complementarity solve error: {status:?} after {iterations} iterations")]
    LcpSolveError { status: Status, iterations: u32 },
    #[error("Solution rejected: {reason}")]
    InvalidSolution {
        #[from]
        reason: ValidationFailure,
    },
    #[error("Error loading configuration")]
    LoadConfig {
        #[from]
        source: io::LoadConfigError,
    },
}

impl Error {
    /// Whether this error signals a numerical failure of the solve rather than misuse of the API.
    ///
    /// Recoverable errors correspond to an unsuccessful solve. The caller decides how to degrade,
    /// for instance by dropping contact forces for the step or retrying with another mode.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            Error::LcpSolveError { .. } | Error::InvalidSolution { .. }
        )
    }
}

impl From<SolveResult> for Error {
    fn from(result: SolveResult) -> Error {
        Error::LcpSolveError {
            status: result.status,
            iterations: result.iterations,
        }
    }
}
