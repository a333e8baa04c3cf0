use log::{debug, trace};
use serde::{Deserialize, Serialize};
use utils::{all_finite, inf_norm};

use super::{BoxLcp, LcpSolver, SolveResult, Status};

#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PgsParams {
    /// Maximum number of sweeps.
    pub max_iterations: u32,
    /// Convergence threshold on the largest update of a sweep, relative to the magnitude of the
    /// iterate.
    pub tolerance: f64,
    /// Successive over-relaxation factor in `(0, 2)`.
    pub relaxation: f64,
}

impl Default for PgsParams {
    fn default() -> Self {
        PgsParams {
            max_iterations: 500,
            tolerance: 1e-10,
            relaxation: 1.0,
        }
    }
}

/// Projected Gauss-Seidel.
///
/// Sweeps over the variables in order, relaxing each one towards a zero residual and projecting
/// it onto its bounds. Dependent bounds are evaluated with the latest iterate, so a normal force
/// updated earlier in the same sweep immediately rescales the friction box of its contact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ProjectedGaussSeidel {
    pub params: PgsParams,
}

impl ProjectedGaussSeidel {
    pub fn new(params: PgsParams) -> Self {
        ProjectedGaussSeidel { params }
    }
}

impl LcpSolver for ProjectedGaussSeidel {
    fn solve_with(&self, problem: &BoxLcp, x: &mut [f64]) -> SolveResult {
        let PgsParams {
            max_iterations,
            tolerance,
            relaxation,
        } = self.params;
        let n = problem.dim();
        if n == 0 {
            return SolveResult::success(0);
        }

        // Start from a feasible point.
        for i in 0..n {
            let (l, u) = problem.bounds(i, x);
            x[i] = x[i].max(l).min(u);
        }

        for iter in 1..=max_iterations {
            let mut max_delta = 0.0_f64;
            for i in 0..n {
                let (l, u) = problem.bounds(i, x);
                let aii = problem.a[(i, i)];
                let next = if aii > 0.0 {
                    let r = problem.b[i]
                        + problem
                            .a
                            .row(i)
                            .iter()
                            .zip(x.iter())
                            .map(|(&a, &x)| a * x)
                            .sum::<f64>();
                    x[i] - relaxation * r / aii
                } else {
                    // No diagonal to relax against. Rest at the bound closest to zero.
                    0.0
                };
                let next = next.max(l).min(u);
                max_delta = max_delta.max((next - x[i]).abs());
                x[i] = next;
            }

            if !all_finite(x.iter()) {
                debug!("Projected Gauss-Seidel: non-finite iterate at sweep {}", iter);
                return SolveResult::failure(Status::NanDetected, iter);
            }

            let scale = 1.0_f64.max(inf_norm(x.iter().cloned()));
            trace!("PGS sweep {}: max update {:.3e}", iter, max_delta);
            if max_delta <= tolerance * scale {
                debug!("Projected Gauss-Seidel converged in {} sweeps", iter);
                return SolveResult::success(iter);
            }
        }

        debug!(
            "Projected Gauss-Seidel did not converge in {} sweeps",
            max_iterations
        );
        SolveResult::failure(Status::MaximumIterationsExceeded, max_iterations)
    }
}
