//! Orientation algebra on the rotation group SO(3).
//!
//! All representations implement the [`SO3`] trait, which exposes the group operations together
//! with the exponential and logarithm maps between the group and its tangent space so(3).
//! Tangent vectors are plain 3-vectors (angular displacements), converted to and from skew
//! symmetric matrices with [`hat`] and [`vee`].
//!
//! [`SO3Matrix`] is the canonical representation. The other variants convert through it.

mod axis_angle;
mod matrix;
mod quaternion;

pub use axis_angle::*;
pub use matrix::*;
pub use quaternion::*;

use na::{Matrix3, RealField, Vector3};
use rand::distributions::Uniform;
use rand::Rng;

/// An element of the Lie algebra so(3) expressed in vector form.
pub type Tangent<T> = Vector3<T>;

/// Angle below which series expansions replace the closed form expressions.
pub(crate) const SMALL_ANGLE: f64 = 1e-6;

/// Common interface for all representations of a rotation in three dimensions.
///
/// Required methods are pure. In-place counterparts like [`invert`](SO3::invert) and
/// [`set_exp`](SO3::set_exp) are provided on top of them.
pub trait SO3<T: RealField + Copy>: Clone + std::fmt::Debug {
    /// The identity rotation.
    fn identity() -> Self;

    /// Build this representation from a 3x3 rotation matrix.
    ///
    /// The matrix is trusted to be orthonormal with unit determinant.
    fn from_rotation_matrix_unchecked(mat: Matrix3<T>) -> Self;

    /// The 3x3 rotation matrix of this rotation.
    fn to_rotation_matrix(&self) -> Matrix3<T>;

    /// Group composition `self * other`: `other` is applied first.
    fn compose(&self, other: &Self) -> Self;

    /// The inverse rotation.
    fn inverse(&self) -> Self;

    /// Apply this rotation to a vector.
    fn rotate(&self, v: &Vector3<T>) -> Vector3<T>;

    /// Exponential map from so(3) to SO(3).
    fn exp(tangent: &Tangent<T>) -> Self;

    /// Logarithm map from SO(3) to so(3).
    ///
    /// The returned vector has norm in `[0, π]`.
    fn log(&self) -> Tangent<T>;

    fn invert(&mut self) {
        *self = self.inverse();
    }

    fn set_identity(&mut self) {
        *self = Self::identity();
    }

    /// Exact comparison against the identity matrix.
    ///
    /// Round-off from repeated composition will make this return `false` for rotations that are
    /// only numerically close to the identity. Use [`is_approx_identity`](SO3::is_approx_identity)
    /// for those.
    fn is_identity(&self) -> bool {
        self.to_rotation_matrix() == Matrix3::identity()
    }

    /// Whether every entry of the rotation matrix is within `eps` of the identity.
    fn is_approx_identity(&self, eps: T) -> bool {
        (self.to_rotation_matrix() - Matrix3::identity()).amax() <= eps
    }

    fn set_exp(&mut self, tangent: &Tangent<T>) {
        *self = Self::exp(tangent);
    }

    fn get_log(&self) -> Tangent<T> {
        self.log()
    }

    /// Replace this rotation with a random one.
    ///
    /// The rotation is obtained by exponentiating a tangent vector with a uniformly random axis and
    /// a rotation angle uniformly distributed in `[0, π)`. This is not the Haar measure on SO(3).
    fn set_random<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        *self = Self::exp(&random_tangent(rng));
    }

    /// Convert to another representation of the same rotation.
    fn convert<R: SO3<T>>(&self) -> R {
        R::from_rotation_matrix_unchecked(self.to_rotation_matrix())
    }

    /// Right plus: perturb this rotation by `tau` expressed in the local frame.
    fn rplus(&self, tau: &Tangent<T>) -> Self {
        self.compose(&Self::exp(tau))
    }

    /// Right minus: the local tangent taking `other` to `self`, i.e. `Log(other⁻¹ self)`.
    fn rminus(&self, other: &Self) -> Tangent<T> {
        other.inverse().compose(self).log()
    }

    /// Rotation angle in `[0, π]`.
    fn angle(&self) -> T {
        self.log().norm()
    }

    /// Geodesic distance between two rotations.
    fn angular_distance(&self, other: &Self) -> T {
        self.rminus(other).norm()
    }
}

/// Map a vector to the skew symmetric matrix representing the cross product `v × ·`.
pub fn hat<T: RealField + Copy>(v: &Vector3<T>) -> Matrix3<T> {
    v.cross_matrix()
}

/// Inverse of [`hat`].
///
/// Only the skew symmetric part of `m` contributes: `vee(m) = vee((m - mᵀ) / 2)`.
pub fn vee<T: RealField + Copy>(m: &Matrix3<T>) -> Vector3<T> {
    let half = na::convert::<f64, T>(0.5);
    Vector3::new(
        (m[(2, 1)] - m[(1, 2)]) * half,
        (m[(0, 2)] - m[(2, 0)]) * half,
        (m[(1, 0)] - m[(0, 1)]) * half,
    )
}

/// Coefficients `(1 - cos θ) / θ²` and `(θ - sin θ) / θ³` shared by the SO(3) Jacobians.
fn jacobian_coefficients<T: RealField + Copy>(theta: T) -> (T, T) {
    let one = na::one::<T>();
    if theta < na::convert::<f64, T>(SMALL_ANGLE) {
        let theta2 = theta * theta;
        (
            na::convert::<f64, T>(0.5) - theta2 / na::convert::<f64, T>(24.0),
            one / na::convert::<f64, T>(6.0) - theta2 / na::convert::<f64, T>(120.0),
        )
    } else {
        let theta2 = theta * theta;
        ((one - theta.cos()) / theta2, (theta - theta.sin()) / (theta2 * theta))
    }
}

/// Left Jacobian of SO(3).
///
/// Maps a perturbation of the tangent to the corresponding perturbation of `Exp(tau)` expressed in
/// the global frame.
pub fn left_jacobian<T: RealField + Copy>(tau: &Tangent<T>) -> Matrix3<T> {
    let (a, b) = jacobian_coefficients(tau.norm());
    let k = hat(tau);
    Matrix3::identity() + k * a + k * k * b
}

/// Right Jacobian of SO(3).
///
/// Maps a perturbation of the tangent to the corresponding perturbation of `Exp(tau)` expressed in
/// the local frame.
pub fn right_jacobian<T: RealField + Copy>(tau: &Tangent<T>) -> Matrix3<T> {
    let (a, b) = jacobian_coefficients(tau.norm());
    let k = hat(tau);
    Matrix3::identity() - k * a + k * k * b
}

/// Advance an orientation by a body-frame angular velocity over a time step.
pub fn integrate_rotation<T, R>(rotation: &R, angular_velocity: &Vector3<T>, dt: T) -> R
where
    T: RealField + Copy,
    R: SO3<T>,
{
    rotation.rplus(&(angular_velocity * dt))
}

/// Sample a tangent vector with a uniformly random direction and norm in `[0, π)`.
pub fn random_tangent<T, R>(rng: &mut R) -> Tangent<T>
where
    T: RealField + Copy,
    R: Rng + ?Sized,
{
    let unit = Uniform::new_inclusive(-1.0_f64, 1.0);
    let axis = loop {
        let v = Vector3::new(rng.sample(unit), rng.sample(unit), rng.sample(unit));
        let norm = v.norm();
        if norm > 1e-3 && norm <= 1.0 {
            break v / norm;
        }
    };
    let angle: f64 = rng.gen_range(0.0..std::f64::consts::PI);
    (axis * angle).map(|x| na::convert::<f64, T>(x))
}
