use log::{debug, trace};
use na::{DMatrix, DVector};
use utils::dense::{gather, principal_submatrix, scatter, submatrix};
use utils::{all_finite, inf_norm};

use super::{BoxLcp, LcpSolver, Lemke, SolveResult, Status};

/// Number of non-improving full block exchanges tolerated before falling back to single
/// principal pivots.
const EXCHANGE_BUDGET: usize = 3;

/// Singular values below this fraction of the largest are dropped when solving for free
/// variables.
const SINGULAR_VALUE_CUTOFF: f64 = 1e-10;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
enum Active {
    Lower,
    Upper,
    Free,
    /// Lower and upper bounds of an independent variable coincide.
    Fixed,
}

/// Block principal pivoting for box LCPs.
///
/// Each iteration guesses which variables sit at a bound, solves for the remaining free
/// variables and then exchanges every variable that violates its bound or its sign condition.
/// When full exchanges stop reducing the number of infeasibilities, only the infeasible variable
/// with the largest index is exchanged.
///
/// A variable with a friction index that sits at a bound is substituted by its bound
/// coefficient times the referenced variable, so dependent bounds are satisfied exactly by the
/// linear solve instead of being lagged behind the normal forces.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct BlockPivoting {
    pub max_iterations: usize,
    /// Feasibility tolerance relative to the magnitude of `b`.
    pub tolerance: f64,
}

impl BlockPivoting {
    /// Solve the box LCP.
    ///
    /// Variables strictly inside their bounds in `x` start out free, so a previous solution
    /// serves as a warm start.
    pub fn solve(&self, problem: &BoxLcp, x: &mut [f64]) -> SolveResult {
        let n = problem.dim();
        if n == 0 {
            return SolveResult::success(0);
        }

        let a = &problem.a;
        let b = problem.b.as_slice();
        let tol = self.tolerance * (1.0 + inf_norm(b.iter().cloned()));
        let all: Vec<usize> = (0..n).collect();

        let mut state: Vec<Active> = (0..n)
            .map(|i| {
                let (l, u) = problem.bounds(i, x);
                let dependent = problem.findex[i].is_some();
                if !dependent && l == u {
                    Active::Fixed
                } else if x[i] > l + tol && x[i] < u - tol {
                    Active::Free
                } else if dependent || l.is_finite() {
                    Active::Lower
                } else if u.is_finite() {
                    Active::Upper
                } else {
                    Active::Free
                }
            })
            .collect();

        let mut fewest_infeasible = usize::MAX;
        let mut budget = EXCHANGE_BUDGET;

        for iter in 1..=self.max_iterations {
            let iter = iter as u32;

            // Express x = x0 + P y in terms of the free variables y.
            let free: Vec<usize> = (0..n).filter(|&i| state[i] == Active::Free).collect();
            let mut column = vec![0; n];
            for (k, &i) in free.iter().enumerate() {
                column[i] = k;
            }

            let mut x0 = DVector::zeros(n);
            let mut p = DMatrix::zeros(n, free.len());
            for i in 0..n {
                match (state[i], problem.findex[i]) {
                    (Active::Free, _) => p[(i, column[i])] = 1.0,
                    (Active::Lower, None) | (Active::Fixed, None) => x0[i] = problem.lo[i],
                    (Active::Upper, None) => x0[i] = problem.hi[i],
                    _ => {}
                }
            }
            for i in 0..n {
                if let (Some(j), false) = (problem.findex[i], state[i] == Active::Free) {
                    let coef = if state[i] == Active::Upper {
                        problem.hi[i]
                    } else {
                        problem.lo[i]
                    };
                    if state[j] == Active::Free {
                        p[(i, column[j])] = coef;
                    } else {
                        x0[i] = coef * x0[j].max(0.0);
                    }
                }
            }

            let mut next_x = x0.clone();
            if !free.is_empty() {
                let a_free = submatrix(a, &free, &all);
                let rhs = -(gather(b, &free) + &a_free * &x0);
                let y = match solve_subsystem(&a_free * &p, &rhs) {
                    Some(y) => y,
                    None => return SolveResult::failure(Status::SingularMatrix, iter),
                };
                next_x += &p * y;
            }
            x.copy_from_slice(next_x.as_slice());

            if !all_finite(x.iter()) {
                return SolveResult::failure(Status::NanDetected, iter);
            }

            let w = problem.residual(x);

            let mut infeasible = Vec::new();
            for i in 0..n {
                let (l, u) = problem.bounds(i, x);
                let next = match state[i] {
                    Active::Free if x[i] < l - tol => Active::Lower,
                    Active::Free if x[i] > u + tol => Active::Upper,
                    Active::Lower if w[i] < -tol && l != u => Active::Free,
                    Active::Upper if w[i] > tol && l != u => Active::Free,
                    _ => continue,
                };
                infeasible.push((i, next));
            }

            trace!(
                "Block pivoting iteration {}: {} free, {} infeasible",
                iter,
                free.len(),
                infeasible.len()
            );

            if infeasible.is_empty() {
                for i in 0..n {
                    let (l, u) = problem.bounds(i, x);
                    x[i] = x[i].max(l).min(u);
                }
                return SolveResult::success(iter);
            }

            if infeasible.len() < fewest_infeasible {
                fewest_infeasible = infeasible.len();
                budget = EXCHANGE_BUDGET;
            } else if budget > 0 {
                budget -= 1;
            } else {
                // Single principal pivot on the last infeasible variable.
                infeasible.drain(..infeasible.len() - 1);
            }

            for (i, next) in infeasible {
                state[i] = next;
            }
        }

        debug!(
            "Block pivoting did not terminate within {} iterations",
            self.max_iterations
        );
        SolveResult::failure(Status::MaximumIterationsExceeded, self.max_iterations as u32)
    }
}

/// Solve `M y = rhs` in the least squares sense, discarding near-null directions.
fn solve_subsystem(m: DMatrix<f64>, rhs: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = m.svd(true, true);
    let eps = SINGULAR_VALUE_CUTOFF * svd.singular_values.max();
    svd.solve(rhs, eps).ok()
}

/// Direct mode for contact problems.
///
/// Standard LCPs go straight to [`Lemke`]. Otherwise the variables with fixed bounds are first
/// solved for in isolation, and the result warm starts [`BlockPivoting`] on the full problem.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct DirectSolver {
    pub lemke: Lemke,
    pub pivoting: BlockPivoting,
}

impl LcpSolver for DirectSolver {
    fn solve_with(&self, problem: &BoxLcp, x: &mut [f64]) -> SolveResult {
        if problem.dim() == 0 {
            return SolveResult::success(0);
        }

        if problem.is_standard() {
            let (z, result) = self.lemke.solve(&problem.a, problem.b.as_slice());
            x.copy_from_slice(&z);
            return result;
        }

        x.iter_mut().for_each(|x| *x = 0.0);
        let mut iterations = 0;

        if problem.has_dependent_bounds() {
            let independent = problem.independent_indices();
            let sub = BoxLcp {
                a: principal_submatrix(&problem.a, &independent),
                b: gather(problem.b.as_slice(), &independent),
                lo: independent.iter().map(|&i| problem.lo[i]).collect(),
                hi: independent.iter().map(|&i| problem.hi[i]).collect(),
                findex: vec![None; independent.len()],
            };
            let mut x_sub = vec![0.0; independent.len()];
            let result = self.solve_with(&sub, &mut x_sub);
            iterations += result.iterations;
            if !result.is_success() {
                return SolveResult::failure(result.status, iterations);
            }
            scatter(&x_sub, &independent, x);
        }

        let result = self.pivoting.solve(problem, x);
        SolveResult {
            iterations: iterations + result.iterations,
            status: result.status,
        }
    }
}
