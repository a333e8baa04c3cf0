use std::collections::HashSet;

use log::{debug, trace};
use na::DMatrix;
use utils::all_finite;

use super::{SolveResult, Status};

/// Lemke's complementary pivoting method for the standard LCP
/// `x >= 0`, `w = M x + q >= 0`, `xᵀw = 0`.
///
/// Terminates with a solution whenever `M` is copositive-plus (e.g. positive semi-definite) and
/// the problem is feasible. Otherwise the method ends on a secondary ray, which is reported as
/// [`Status::RayTermination`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Lemke {
    pub max_pivots: usize,
    /// Pivot elements with magnitude below this value are skipped in the ratio test.
    pub pivot_tolerance: f64,
}

impl Lemke {
    pub fn solve(&self, m: &DMatrix<f64>, q: &[f64]) -> (Vec<f64>, SolveResult) {
        let n = q.len();
        debug_assert_eq!(m.shape(), (n, n));

        if !all_finite(q) || !all_finite(m.iter()) {
            return (vec![0.0; n], SolveResult::failure(Status::NanDetected, 0));
        }

        // The trivial solution.
        if q.iter().all(|&qi| qi >= 0.0) {
            return (vec![0.0; n], SolveResult::success(0));
        }

        let mut tableau = Tableau::new(m, q);
        let artificial = tableau.artificial();

        // The artificial variable enters and the most violated row leaves.
        let row = q
            .iter()
            .enumerate()
            .fold((0, f64::INFINITY), |(best, min), (i, &qi)| {
                if qi < min {
                    (i, qi)
                } else {
                    (best, min)
                }
            })
            .0;
        let leaving = tableau.pivot(row, artificial);
        let mut entering = tableau.complement(leaving);

        let mut visited = HashSet::new();
        for pivots in 1..=self.max_pivots {
            let pivots = pivots as u32;
            let row = match tableau.ratio_test(entering, self.pivot_tolerance) {
                Some(row) => row,
                None => {
                    debug!("Lemke: ray termination after {} pivots", pivots);
                    return (vec![0.0; n], SolveResult::failure(Status::RayTermination, pivots));
                }
            };

            let leaving = tableau.pivot(row, entering);
            trace!(
                "Lemke pivot {}: variable {} enters, variable {} leaves",
                pivots,
                entering,
                leaving
            );

            if leaving == artificial {
                let z = tableau.solution();
                if !all_finite(&z) {
                    return (z, SolveResult::failure(Status::NanDetected, pivots));
                }
                return (z, SolveResult::success(pivots));
            }

            if !visited.insert(tableau.basis_key()) {
                debug!("Lemke: basis revisited after {} pivots", pivots);
                return (vec![0.0; n], SolveResult::failure(Status::Cycling, pivots));
            }

            entering = tableau.complement(leaving);
        }

        (
            vec![0.0; n],
            SolveResult::failure(Status::MaximumIterationsExceeded, self.max_pivots as u32),
        )
    }
}

/// Dense tableau for the system `I w - M z - e z_0 = q`.
///
/// Columns are laid out as `[w_0 .. w_{n-1}, z_0 .. z_{n-1}, z_0 (artificial), rhs]`.
struct Tableau {
    t: DMatrix<f64>,
    /// Basic variable of each row.
    basis: Vec<usize>,
    n: usize,
}

impl Tableau {
    fn new(m: &DMatrix<f64>, q: &[f64]) -> Self {
        let n = q.len();
        let mut t = DMatrix::zeros(n, 2 * n + 2);
        for i in 0..n {
            t[(i, i)] = 1.0;
            for j in 0..n {
                t[(i, n + j)] = -m[(i, j)];
            }
            t[(i, 2 * n)] = -1.0;
            t[(i, 2 * n + 1)] = q[i];
        }
        Tableau {
            t,
            basis: (0..n).collect(),
            n,
        }
    }

    fn artificial(&self) -> usize {
        2 * self.n
    }

    fn rhs(&self) -> usize {
        2 * self.n + 1
    }

    /// The complementary partner of a `w` or `z` variable.
    fn complement(&self, var: usize) -> usize {
        if var < self.n {
            var + self.n
        } else {
            var - self.n
        }
    }

    /// Minimum ratio test for the entering column.
    ///
    /// Ties prefer the artificial variable to leave, then the largest pivot element.
    fn ratio_test(&self, col: usize, tol: f64) -> Option<usize> {
        let rhs = self.rhs();
        let artificial = self.artificial();
        let mut best: Option<(usize, f64, f64)> = None;
        for i in 0..self.n {
            let d = self.t[(i, col)];
            if d <= tol {
                continue;
            }
            let ratio = self.t[(i, rhs)] / d;
            best = match best {
                None => Some((i, ratio, d)),
                Some((bi, br, bd)) => {
                    if ratio < br - tol {
                        Some((i, ratio, d))
                    } else if ratio <= br + tol
                        && self.basis[bi] != artificial
                        && (self.basis[i] == artificial || d > bd)
                    {
                        Some((i, ratio, d))
                    } else {
                        best
                    }
                }
            };
        }
        best.map(|(i, _, _)| i)
    }

    /// Pivot on `(row, col)` and return the variable leaving the basis.
    fn pivot(&mut self, row: usize, col: usize) -> usize {
        let cols = self.t.ncols();
        let p = self.t[(row, col)];
        for j in 0..cols {
            self.t[(row, j)] /= p;
        }
        for i in 0..self.n {
            if i == row {
                continue;
            }
            let f = self.t[(i, col)];
            if f != 0.0 {
                for j in 0..cols {
                    let v = self.t[(row, j)];
                    self.t[(i, j)] -= f * v;
                }
            }
        }
        std::mem::replace(&mut self.basis[row], col)
    }

    fn basis_key(&self) -> Vec<usize> {
        let mut key = self.basis.clone();
        key.sort_unstable();
        key
    }

    fn solution(&self) -> Vec<f64> {
        let rhs = self.rhs();
        let mut z = vec![0.0; self.n];
        for (i, &var) in self.basis.iter().enumerate() {
            if var >= self.n && var < 2 * self.n {
                z[var - self.n] = self.t[(i, rhs)].max(0.0);
            }
        }
        z
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn lemke() -> Lemke {
        Lemke {
            max_pivots: 100,
            pivot_tolerance: 1e-12,
        }
    }

    fn residual(m: &DMatrix<f64>, z: &[f64], q: &[f64]) -> Vec<f64> {
        (0..q.len())
            .map(|i| q[i] + (0..z.len()).map(|j| m[(i, j)] * z[j]).sum::<f64>())
            .collect()
    }

    #[test]
    fn single_variable() {
        let m = DMatrix::from_element(1, 1, 1.0);
        let (z, result) = lemke().solve(&m, &[-5.0]);
        assert!(result.is_success());
        assert_relative_eq!(z[0], 5.0);
    }

    #[test]
    fn trivial_solution() {
        let m = DMatrix::identity(3, 3);
        let (z, result) = lemke().solve(&m, &[1.0, 0.0, 2.0]);
        assert_eq!(result, SolveResult::success(0));
        assert_eq!(z, vec![0.0; 3]);
    }

    #[test]
    fn positive_definite_interior() {
        let m = DMatrix::from_row_slice(2, 2, &[2.0, 1.0, 1.0, 2.0]);
        let (z, result) = lemke().solve(&m, &[-5.0, -6.0]);
        assert!(result.is_success());
        assert_relative_eq!(z[0], 4.0 / 3.0, epsilon = 1e-12);
        assert_relative_eq!(z[1], 7.0 / 3.0, epsilon = 1e-12);
    }

    #[test]
    fn mixed_active_set() {
        // The second variable is pushed to zero by coupling.
        let m = DMatrix::from_row_slice(2, 2, &[1.0, 2.0, 2.0, 1.0]);
        let q = [-1.0, 1.0];
        let (z, result) = lemke().solve(&m, &q);
        assert!(result.is_success());
        let w = residual(&m, &z, &q);
        for (&z, &w) in z.iter().zip(w.iter()) {
            assert!(z >= 0.0);
            assert!(w >= -1e-12);
            assert!((z * w).abs() < 1e-12);
        }
        assert_relative_eq!(z[0], 1.0, epsilon = 1e-12);
        assert_eq!(z[1], 0.0);
    }

    #[test]
    fn infeasible_ends_on_ray() {
        let m = DMatrix::from_row_slice(2, 2, &[1.0, -1.0, -1.0, 1.0]);
        let (_, result) = lemke().solve(&m, &[-1.0, -1.0]);
        assert_eq!(result.status, Status::RayTermination);
    }

    #[test]
    fn random_positive_semi_definite() {
        let mut rng = utils::random::seeded_rng();
        for &(n, rank) in &[(4, 4), (6, 3), (8, 8)] {
            let m = utils::random::random_psd_matrix(&mut rng, n, rank);
            // Build q from a known complementary point so the problem is feasible.
            let x: Vec<f64> = (0..n).map(|i| if i % 2 == 0 { 1.0 } else { 0.0 }).collect();
            let mx = residual(&m, &x, &vec![0.0; n]);
            let q: Vec<f64> = (0..n)
                .map(|i| if i % 2 == 0 { -mx[i] } else { 0.5 - mx[i] })
                .collect();

            let (z, result) = lemke().solve(&m, &q);
            assert!(result.is_success(), "{:?}", result);
            let w = residual(&m, &z, &q);
            for (&z, &w) in z.iter().zip(w.iter()) {
                assert!(z >= 0.0);
                assert!(w >= -1e-9);
                assert!((z * w).abs() < 1e-9);
            }
        }
    }

    #[test]
    fn nan_is_reported() {
        let m = DMatrix::from_element(1, 1, f64::NAN);
        let (_, result) = lemke().solve(&m, &[-1.0]);
        assert_eq!(result.status, Status::NanDetected);
    }

    #[test]
    fn empty_problem() {
        let (z, result) = lemke().solve(&DMatrix::zeros(0, 0), &[]);
        assert!(z.is_empty());
        assert!(result.is_success());
    }
}
