use log::debug;
use na::{DMatrix, DVector};
use utils::dense::{gather, is_symmetric, permute_symmetric};
use utils::zip;

use super::SolutionProjector;
use crate::{ContactSet, Error};

/// A box constrained LCP with optionally dependent bounds.
///
/// Variable `i` is bounded by `[lo[i], hi[i]]` unless `findex[i]` refers to another variable
/// `j`, in which case the bounds are `[lo[i] * x_j, hi[i] * x_j]` with `x_j` clamped to be
/// non-negative. This is how friction variables are tied to the normal force of their contact.
#[derive(Clone, Debug, PartialEq)]
pub struct BoxLcp {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub lo: Vec<f64>,
    pub hi: Vec<f64>,
    pub findex: Vec<Option<usize>>,
}

impl BoxLcp {
    /// A standard LCP: every variable is bounded by `[0, ∞)`.
    pub fn standard(a: DMatrix<f64>, b: DVector<f64>) -> Result<Self, Error> {
        let n = b.len();
        Self::new(
            a,
            b,
            vec![0.0; n],
            vec![f64::INFINITY; n],
            vec![None; n],
        )
    }

    pub fn new(
        a: DMatrix<f64>,
        b: DVector<f64>,
        lo: Vec<f64>,
        hi: Vec<f64>,
        findex: Vec<Option<usize>>,
    ) -> Result<Self, Error> {
        if a.nrows() != a.ncols() {
            return Err(Error::NonSquareMatrix {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let n = a.nrows();
        for len in [b.len(), lo.len(), hi.len(), findex.len()] {
            if len != n {
                return Err(Error::SizeMismatch {
                    expected: n,
                    actual: len,
                });
            }
        }

        for (&l, &u, f) in zip!(lo.iter(), hi.iter(), findex.iter()) {
            if l.is_nan() || u.is_nan() || l > u {
                return Err(Error::InvalidParameter {
                    name: "bounds".to_string(),
                });
            }
            if let Some(j) = *f {
                // Dependent bounds scale a referenced independent variable.
                if j >= n || findex[j].is_some() || !l.is_finite() || !u.is_finite() {
                    return Err(Error::InvalidParameter {
                        name: "findex".to_string(),
                    });
                }
            }
        }

        Ok(BoxLcp {
            a,
            b,
            lo,
            hi,
            findex,
        })
    }

    pub fn dim(&self) -> usize {
        self.b.len()
    }

    pub fn has_dependent_bounds(&self) -> bool {
        self.findex.iter().any(Option::is_some)
    }

    /// Whether all bounds are `[0, ∞)`.
    pub fn is_standard(&self) -> bool {
        !self.has_dependent_bounds()
            && self.lo.iter().all(|&l| l == 0.0)
            && self.hi.iter().all(|&u| u == f64::INFINITY)
    }

    /// Indices of variables whose bounds do not depend on the solution.
    pub fn independent_indices(&self) -> Vec<usize> {
        self.findex
            .iter()
            .enumerate()
            .filter_map(|(i, f)| if f.is_none() { Some(i) } else { None })
            .collect()
    }

    /// Indices of variables with bounds given by a friction index.
    pub fn dependent_indices(&self) -> Vec<usize> {
        self.findex
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.map(|_| i))
            .collect()
    }

    /// Effective bounds of variable `i` at the point `x`.
    pub fn bounds(&self, i: usize, x: &[f64]) -> (f64, f64) {
        match self.findex[i] {
            Some(j) => {
                let scale = x[j].max(0.0);
                (self.lo[i] * scale, self.hi[i] * scale)
            }
            None => (self.lo[i], self.hi[i]),
        }
    }

    /// Updates the effective lower and upper bounds at the point `x`.
    pub fn update_bounds(&self, x: &[f64], l: &mut [f64], u: &mut [f64]) {
        for (i, (l, u)) in l.iter_mut().zip(u.iter_mut()).enumerate() {
            let (lo, hi) = self.bounds(i, x);
            *l = lo;
            *u = hi;
        }
    }

    /// Computes `w = A x + b`.
    pub fn residual(&self, x: &[f64]) -> DVector<f64> {
        &self.a * DVector::from_column_slice(x) + &self.b
    }
}

/// Canonical box LCP built from a native contact system, along with the map back to native
/// ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct Formulation {
    pub problem: BoxLcp,
    pub projector: SolutionProjector,
}

impl Formulation {
    /// Reorder a native contact system so that each normal force precedes its friction
    /// components, and attach the bounds of the friction polygon.
    ///
    /// Normal variables are bounded by `[0, ∞)`. Friction variables are bounded by
    /// `[-mu x_n, mu x_n]` through a friction index pointing at the normal variable of the same
    /// contact. `regularization` is added to the diagonal of the reordered matrix.
    pub fn build(
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        contacts: &ContactSet,
        regularization: f64,
    ) -> Result<Self, Error> {
        contacts.check_system(a, b)?;
        if !regularization.is_finite() || regularization < 0.0 {
            return Err(Error::InvalidParameter {
                name: "regularization".to_string(),
            });
        }

        // Pivoting and Gauss-Seidel only converge reliably for (nearly) symmetric systems.
        let scale = 1.0_f64.max(utils::inf_norm(a.iter().cloned()));
        if !is_symmetric(a, 1e-8 * scale) {
            debug!("Contact matrix is not symmetric; solver convergence is not guaranteed");
        }

        let projector = SolutionProjector::new(contacts);
        let perm = projector.permutation();

        let mut ca = permute_symmetric(a, perm);
        for i in 0..ca.nrows() {
            ca[(i, i)] += regularization;
        }
        let cb = gather(b.as_slice(), perm);

        let n = perm.len();
        let k = contacts.num_friction_dirs();
        let mut lo = vec![0.0; n];
        let mut hi = vec![f64::INFINITY; n];
        let mut findex = vec![None; n];
        for contact in 0..contacts.num_contacts {
            let normal = contact * (1 + k);
            for dir in 0..k {
                let i = normal + 1 + dir;
                lo[i] = -contacts.mu;
                hi[i] = contacts.mu;
                findex[i] = Some(normal);
            }
        }

        Ok(Formulation {
            problem: BoxLcp::new(ca, cb, lo, hi, findex)?,
            projector,
        })
    }
}
