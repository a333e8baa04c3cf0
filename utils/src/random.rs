//! Deterministic random data for tests and benchmarks.

use na::{DMatrix, Vector3};
use rand::distributions::Uniform;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// A random number generator with a fixed seed.
pub fn seeded_rng() -> StdRng {
    SeedableRng::from_seed([3; 32])
}

/// Generate a random vector of triplets with components in `[-1, 1)`.
pub fn random_vectors(n: usize) -> Vec<Vector3<f64>> {
    let mut rng = seeded_rng();
    (0..n).map(|_| random_vector(&mut rng, 1.0)).collect()
}

/// Sample a vector with components uniformly distributed in `[-scale, scale)`.
pub fn random_vector<R: Rng + ?Sized>(rng: &mut R, scale: f64) -> Vector3<f64> {
    let range = Uniform::new(-scale, scale);
    Vector3::new(rng.sample(range), rng.sample(range), rng.sample(range))
}

/// Sample a unit vector.
///
/// Samples falling too close to the origin are rejected to avoid amplifying round-off.
pub fn random_unit_vector<R: Rng + ?Sized>(rng: &mut R) -> Vector3<f64> {
    loop {
        let v = random_vector(rng, 1.0);
        let norm = v.norm();
        if norm > 1e-3 && norm <= 1.0 {
            return v / norm;
        }
    }
}

/// Build a random symmetric positive semi-definite `n x n` matrix of rank at most `rank`.
///
/// The matrix is assembled as `J Jᵀ` for a random `n x rank` matrix `J`, which mirrors how a
/// Delassus operator is built from a contact Jacobian.
pub fn random_psd_matrix<R: Rng + ?Sized>(rng: &mut R, n: usize, rank: usize) -> DMatrix<f64> {
    let range = Uniform::new(-1.0, 1.0);
    let j = DMatrix::from_fn(n, rank, |_, _| rng.sample(range));
    &j * j.transpose()
}
