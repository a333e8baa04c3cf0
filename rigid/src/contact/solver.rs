use log::{debug, warn};
use na::{DMatrix, DVector};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::lcp::{
    BlockPivoting, DirectSolver, Formulation, LcpSolver, Lemke, PgsParams, ProjectedGaussSeidel,
    SolutionValidator, SolveResult,
};
use crate::{ContactSet, Error};

/// Back end used to solve the canonical contact problem.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum SolverMode {
    /// Pivoting methods, exact up to round-off.
    Direct,
    /// Projected Gauss-Seidel.
    Iterative,
}

impl Default for SolverMode {
    fn default() -> Self {
        SolverMode::Direct
    }
}

/// Contact solver parameters.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SolverParams {
    /// Maximum number of pivots for Lemke and block pivoting. `None` allows 50 pivots per
    /// unknown.
    pub max_pivots: Option<usize>,
    pub pivot_tolerance: f64,
    /// Feasibility tolerance of block pivoting relative to the magnitude of `b`.
    pub feasibility_tolerance: f64,
    /// Added to the diagonal of the canonical matrix (constraint force mixing).
    pub regularization: f64,
    pub pgs: PgsParams,
    /// Absolute tolerance used to accept a solution against the original system.
    pub validation_tolerance: f64,
    /// Retry with the iterative mode when the direct mode fails.
    pub fallback_to_iterative: bool,
}

impl Default for SolverParams {
    fn default() -> Self {
        SolverParams {
            max_pivots: None,
            pivot_tolerance: 1e-12,
            feasibility_tolerance: 1e-10,
            regularization: 1e-12,
            pgs: PgsParams::default(),
            validation_tolerance: 1e-4,
            fallback_to_iterative: false,
        }
    }
}

impl SolverParams {
    pub fn validate(&self) -> Result<(), Error> {
        let positive = [
            ("pivot_tolerance", self.pivot_tolerance),
            ("feasibility_tolerance", self.feasibility_tolerance),
            ("pgs.tolerance", self.pgs.tolerance),
            ("validation_tolerance", self.validation_tolerance),
        ];
        for (name, value) in positive.iter() {
            if !value.is_finite() || *value <= 0.0 {
                return Err(Error::InvalidParameter {
                    name: name.to_string(),
                });
            }
        }
        if !self.regularization.is_finite() || self.regularization < 0.0 {
            return Err(Error::InvalidParameter {
                name: "regularization".to_string(),
            });
        }
        if !(self.pgs.relaxation > 0.0 && self.pgs.relaxation < 2.0) {
            return Err(Error::InvalidParameter {
                name: "pgs.relaxation".to_string(),
            });
        }
        Ok(())
    }

    fn max_pivots(&self, n: usize) -> usize {
        self.max_pivots.unwrap_or(50 * n.max(1))
    }
}

/// Contact forces returned by a successful solve.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactSolution {
    /// Unknowns in native contact layout.
    pub x: DVector<f64>,
    /// Mode that produced the solution. Differs from the requested mode after a fallback.
    pub mode: SolverMode,
    pub result: SolveResult,
    contacts: ContactSet,
}

impl ContactSolution {
    pub fn normal_force(&self, contact: usize) -> f64 {
        self.x[self.contacts.normal_index(contact)]
    }

    pub fn friction_forces(&self, contact: usize) -> &[f64] {
        let k = self.contacts.num_friction_dirs();
        let start = self.contacts.friction_index(contact, 0);
        &self.x.as_slice()[start..start + k]
    }
}

/// An independent contact problem.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactIsland {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub contacts: ContactSet,
}

/// Solver for frictional contact forces.
///
/// The native system `(A, b)` is reordered into a canonical box LCP, solved by the requested
/// back end, mapped back to native ordering and finally checked against the original system.
/// The solver holds no state between calls.
#[derive(Clone, Debug, PartialEq)]
pub struct ContactSolver {
    params: SolverParams,
}

impl ContactSolver {
    pub fn new(params: SolverParams) -> Result<Self, Error> {
        params.validate()?;
        Ok(ContactSolver { params })
    }

    pub fn params(&self) -> &SolverParams {
        &self.params
    }

    /// Solve for contact forces `x` such that `w = A x + b` is complementary to `x`.
    ///
    /// Numerical failures and rejected solutions produce recoverable errors
    /// (see [`Error::is_recoverable`]). Malformed input is reported before any numerical work.
    pub fn solve(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        contacts: &ContactSet,
        mode: SolverMode,
    ) -> Result<ContactSolution, Error> {
        match mode {
            SolverMode::Direct => match self.solve_impl(a, b, contacts, mode, None) {
                Err(err) if err.is_recoverable() && self.params.fallback_to_iterative => {
                    warn!("Direct contact solve failed ({}); retrying iteratively", err);
                    self.solve_impl(a, b, contacts, SolverMode::Iterative, None)
                }
                result => result,
            },
            SolverMode::Iterative => self.solve_impl(a, b, contacts, mode, None),
        }
    }

    /// Solve iteratively starting from `guess`, given in native layout.
    pub fn solve_with_guess(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        contacts: &ContactSet,
        guess: &DVector<f64>,
    ) -> Result<ContactSolution, Error> {
        self.solve_impl(a, b, contacts, SolverMode::Iterative, Some(guess))
    }

    /// Solve independent islands in parallel.
    ///
    /// Results are returned in the order of `islands`.
    pub fn solve_islands(
        &self,
        islands: &[ContactIsland],
        mode: SolverMode,
    ) -> Vec<Result<ContactSolution, Error>> {
        islands
            .par_iter()
            .map(|island| self.solve(&island.a, &island.b, &island.contacts, mode))
            .collect()
    }

    fn direct_solver(&self, n: usize) -> DirectSolver {
        let max_pivots = self.params.max_pivots(n);
        DirectSolver {
            lemke: Lemke {
                max_pivots,
                pivot_tolerance: self.params.pivot_tolerance,
            },
            pivoting: BlockPivoting {
                max_iterations: max_pivots,
                tolerance: self.params.feasibility_tolerance,
            },
        }
    }

    fn solve_impl(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        contacts: &ContactSet,
        mode: SolverMode,
        guess: Option<&DVector<f64>>,
    ) -> Result<ContactSolution, Error> {
        let Formulation { problem, projector } =
            Formulation::build(a, b, contacts, self.params.regularization)?;
        let n = problem.dim();

        let mut x = match guess {
            Some(guess) => projector.canonicalize(guess.as_slice())?.as_slice().to_vec(),
            None => vec![0.0; n],
        };

        debug!(
            "Solving contact problem: {} contacts, {} friction directions, {} unknowns, {:?} mode",
            contacts.num_contacts,
            contacts.num_friction_dirs(),
            n,
            mode
        );

        let result = match mode {
            SolverMode::Direct => self.direct_solver(n).solve_with(&problem, &mut x),
            SolverMode::Iterative => {
                ProjectedGaussSeidel::new(self.params.pgs).solve_with(&problem, &mut x)
            }
        };

        if !result.is_success() {
            debug!(
                "Contact solve failed: {:?} after {} iterations",
                result.status, result.iterations
            );
            return Err(result.into());
        }

        let x = projector.project(&x)?;
        if let Err(reason) =
            SolutionValidator::new(self.params.validation_tolerance).validate(a, b, &x, contacts)
        {
            warn!("Rejected contact solution reported as successful: {}", reason);
            return Err(reason.into());
        }

        debug!(
            "Contact solve succeeded in {} iterations",
            result.iterations
        );

        Ok(ContactSolution {
            x,
            mode,
            result,
            contacts: *contacts,
        })
    }
}

/// Solve a contact problem with default parameters.
///
/// Equivalent to `ContactSolver::new(SolverParams::default())?.solve(a, b, contacts, mode)`.
pub fn solve_contacts(
    a: &DMatrix<f64>,
    b: &DVector<f64>,
    contacts: &ContactSet,
    mode: SolverMode,
) -> Result<ContactSolution, Error> {
    ContactSolver::new(SolverParams::default())?.solve(a, b, contacts, mode)
}
