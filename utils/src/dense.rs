//! Gather and scatter helpers for dense matrices and vectors.
//!
//! Pivoting solvers repeatedly work on principal submatrices selected by an index set. These
//! helpers keep that bookkeeping out of the solvers themselves.

use na::{DMatrix, DVector};

/// Extract the principal submatrix of `a` with rows and columns given by `indices`.
pub fn principal_submatrix(a: &DMatrix<f64>, indices: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(indices.len(), indices.len(), |i, j| {
        a[(indices[i], indices[j])]
    })
}

/// Extract the submatrix of `a` with the given `rows` and `cols`.
pub fn submatrix(a: &DMatrix<f64>, rows: &[usize], cols: &[usize]) -> DMatrix<f64> {
    DMatrix::from_fn(rows.len(), cols.len(), |i, j| a[(rows[i], cols[j])])
}

/// Collect the entries of `v` at `indices` into a new vector.
pub fn gather(v: &[f64], indices: &[usize]) -> DVector<f64> {
    DVector::from_iterator(indices.len(), indices.iter().map(|&i| v[i]))
}

/// Write `src` into `dst` at the positions given by `indices`.
///
/// # Panics
///
/// This function panics if `src` and `indices` have different lengths.
pub fn scatter(src: &[f64], indices: &[usize], dst: &mut [f64]) {
    assert_eq!(src.len(), indices.len());
    for (&s, &i) in src.iter().zip(indices.iter()) {
        dst[i] = s;
    }
}

/// Symmetrically permute `a` so that `out[(i, j)] = a[(perm[i], perm[j])]`.
pub fn permute_symmetric(a: &DMatrix<f64>, perm: &[usize]) -> DMatrix<f64> {
    principal_submatrix(a, perm)
}

/// Check that `a` is square and symmetric up to the absolute tolerance `tol`.
pub fn is_symmetric(a: &DMatrix<f64>, tol: f64) -> bool {
    if a.nrows() != a.ncols() {
        return false;
    }
    let n = a.nrows();
    (0..n).all(|i| (i + 1..n).all(|j| (a[(i, j)] - a[(j, i)]).abs() <= tol))
}
