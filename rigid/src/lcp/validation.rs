use na::{DMatrix, DVector};
use thiserror::Error;

use crate::ContactSet;

/// Reason a contact solution was rejected.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ValidationFailure {
    #[error("system has {actual} rows or components where {expected} were expected")]
    SizeMismatch { expected: usize, actual: usize },
    #[error("non-finite value in component {index}")]
    NonFinite { index: usize },
    #[error("negative normal force {value} at contact {index}")]
    NegativeNormalForce { index: usize, value: f64 },
    #[error("negative normal residual {value} at contact {index}")]
    NegativeResidual { index: usize, value: f64 },
    #[error("complementarity violated at component {index}: {product}")]
    Complementarity { index: usize, product: f64 },
    #[error("friction component {index} with value {value} exceeds the friction bound {bound}")]
    FrictionBound { index: usize, value: f64, bound: f64 },
}

/// Checks a native contact solution against the original, untransformed system.
///
/// For normal components this tests `x >= -ε`, `w >= -ε` and `|x w| <= ε`, where
/// `w = A x + b`. Friction components are tested against the box `[-mu x_n, mu x_n]` of their
/// contact: they must lie inside it up to `ε` and satisfy the box complementarity conditions
/// `(x - lo) max(w, 0) <= ε` and `(hi - x) max(-w, 0) <= ε`.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SolutionValidator {
    pub tolerance: f64,
}

impl Default for SolutionValidator {
    fn default() -> Self {
        SolutionValidator { tolerance: 1e-4 }
    }
}

impl SolutionValidator {
    pub fn new(tolerance: f64) -> Self {
        SolutionValidator { tolerance }
    }

    pub fn is_valid(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        x: &DVector<f64>,
        contacts: &ContactSet,
    ) -> bool {
        self.validate(a, b, x, contacts).is_ok()
    }

    pub fn validate(
        &self,
        a: &DMatrix<f64>,
        b: &DVector<f64>,
        x: &DVector<f64>,
        contacts: &ContactSet,
    ) -> Result<(), ValidationFailure> {
        let eps = self.tolerance;
        let n = contacts.dim();
        let (rows, cols) = a.shape();
        for actual in [rows, cols, b.len(), x.len()] {
            if actual != n {
                return Err(ValidationFailure::SizeMismatch { expected: n, actual });
            }
        }

        if let Some(index) = x.iter().position(|v| !v.is_finite()) {
            return Err(ValidationFailure::NonFinite { index });
        }

        let w = a * x + b;
        if let Some(index) = w.iter().position(|v| !v.is_finite()) {
            return Err(ValidationFailure::NonFinite { index });
        }

        for c in 0..contacts.num_contacts {
            let i = contacts.normal_index(c);
            let (xn, wn) = (x[i], w[i]);
            if xn < -eps {
                return Err(ValidationFailure::NegativeNormalForce {
                    index: c,
                    value: xn,
                });
            }
            if wn < -eps {
                return Err(ValidationFailure::NegativeResidual {
                    index: c,
                    value: wn,
                });
            }
            if (xn * wn).abs() > eps {
                return Err(ValidationFailure::Complementarity {
                    index: i,
                    product: xn * wn,
                });
            }

            let bound = contacts.mu * xn.max(0.0);
            for dir in 0..contacts.num_friction_dirs() {
                let k = contacts.friction_index(c, dir);
                let (xf, wf) = (x[k], w[k]);
                if xf.abs() > bound + eps {
                    return Err(ValidationFailure::FrictionBound {
                        index: k,
                        value: xf,
                        bound,
                    });
                }
                let lower = (xf + bound) * wf.max(0.0);
                let upper = (bound - xf) * (-wf).max(0.0);
                if lower > eps || upper > eps {
                    return Err(ValidationFailure::Complementarity {
                        index: k,
                        product: lower.max(upper),
                    });
                }
            }
        }

        Ok(())
    }
}
