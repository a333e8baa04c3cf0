//! Solvers for box constrained linear complementarity problems.
//!
//! A box LCP asks for `x` such that, with `w = A x + b`, every component satisfies
//! `l_i <= x_i <= u_i` together with
//!
//! - `w_i >= 0` if `x_i = l_i`,
//! - `w_i <= 0` if `x_i = u_i`,
//! - `w_i = 0` if `l_i < x_i < u_i`.
//!
//! Bounds may depend on the solution itself through a friction index: the bounds of such a
//! variable are scaled by the value of another (normal) variable. See [`BoxLcp`].

mod formulation;
mod lemke;
mod pgs;
mod pivoting;
mod projection;
mod validation;

pub use formulation::*;
pub use lemke::*;
pub use pgs::*;
pub use pivoting::*;
pub use projection::*;
pub use validation::*;

/// Outcome of a back end solve.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Status {
    Success,
    /// Complementary pivoting left the feasible region along an unbounded ray. The problem has
    /// no solution or the matrix is not copositive-plus.
    RayTermination,
    MaximumIterationsExceeded,
    /// A linear subsystem could not be solved to the required accuracy.
    SingularMatrix,
    /// Pivoting revisited a previous basis without making progress.
    Cycling,
    NanDetected,
}

#[derive(Clone, Debug, PartialEq)]
pub struct SolveResult {
    /// Number of pivots, sweeps or outer iterations performed.
    pub iterations: u32,
    /// Solve status.
    pub status: Status,
}

impl SolveResult {
    pub fn success(iterations: u32) -> Self {
        SolveResult {
            iterations,
            status: Status::Success,
        }
    }

    pub fn failure(status: Status, iterations: u32) -> Self {
        SolveResult { iterations, status }
    }

    pub fn is_success(&self) -> bool {
        self.status == Status::Success
    }
}

/// A solver for a [`BoxLcp`].
pub trait LcpSolver {
    /// Solves the problem starting from zero and returns the solution along with the solve
    /// result info.
    fn solve(&self, problem: &BoxLcp) -> (Vec<f64>, SolveResult) {
        let mut x = vec![0.0; problem.dim()];
        let result = self.solve_with(problem, &mut x);
        (x, result)
    }

    /// Solve the problem given an initial guess `x` and return the solve result info.
    ///
    /// Solvers that do not benefit from an initial guess overwrite `x` entirely.
    fn solve_with(&self, problem: &BoxLcp, x: &mut [f64]) -> SolveResult;
}
