use std::ops::{Mul, MulAssign};

use na::{Matrix3, RealField, Rotation3, Unit, UnitQuaternion, Vector3};

use super::{hat, vee, Tangent, SMALL_ANGLE, SO3};
use crate::Error;

/// Distance from π below which the logarithm recovers the axis from the symmetric part of the
/// matrix instead of the skew symmetric part.
const NEAR_PI: f64 = 1e-3;

/// Default tolerance used to validate rotation matrices passed to [`SO3Matrix::from_matrix`].
pub const ORTHONORMALITY_TOLERANCE: f64 = 1e-9;

/// A rotation represented by a 3x3 orthonormal matrix with unit determinant.
///
/// Equality is exact element-wise comparison. Use
/// [`angular_distance`](SO3::angular_distance) to compare rotations that went through different
/// floating point computations.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SO3Matrix<T: RealField + Copy> {
    mat: Matrix3<T>,
}

impl<T: RealField + Copy> Default for SO3Matrix<T> {
    fn default() -> Self {
        Self::identity()
    }
}

impl<T: RealField + Copy> SO3Matrix<T> {
    /// Construct a rotation from a raw matrix, verifying that it belongs to SO(3).
    ///
    /// The matrix is accepted if `‖MᵀM - I‖_∞` and `|det M - 1|` are both within
    /// [`ORTHONORMALITY_TOLERANCE`]. Accepted matrices are re-orthonormalized so that small
    /// deviations do not accumulate.
    pub fn from_matrix(mat: Matrix3<T>) -> Result<Self, Error> {
        Self::from_matrix_eps(mat, na::convert::<f64, T>(ORTHONORMALITY_TOLERANCE))
    }

    /// Same as [`from_matrix`](Self::from_matrix) with a custom tolerance.
    pub fn from_matrix_eps(mat: Matrix3<T>, eps: T) -> Result<Self, Error> {
        if !mat.iter().all(|x| x.is_finite()) || !is_rotation_matrix(&mat, eps) {
            return Err(Error::InvalidRotation);
        }
        let mut rot = SO3Matrix { mat };
        rot.orthonormalize();
        Ok(rot)
    }

    /// Construct a rotation from a raw matrix without any checks.
    ///
    /// The caller is responsible for passing an orthonormal matrix with unit determinant.
    pub fn from_matrix_unchecked(mat: Matrix3<T>) -> Self {
        SO3Matrix { mat }
    }

    /// Rotation by `angle` radians about `axis` using the right hand rule.
    pub fn from_axis_angle(axis: &Unit<Vector3<T>>, angle: T) -> Self {
        Self::exp(&(axis.as_ref() * angle))
    }

    pub fn from_quaternion(quat: &UnitQuaternion<T>) -> Self {
        SO3Matrix {
            mat: quat.to_rotation_matrix().into_inner(),
        }
    }

    pub fn rotation_matrix(&self) -> &Matrix3<T> {
        &self.mat
    }

    /// Replace the underlying matrix without any checks.
    pub fn set_rotation_matrix_unchecked(&mut self, mat: Matrix3<T>) {
        self.mat = mat;
    }

    pub fn to_quaternion(&self) -> UnitQuaternion<T> {
        UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(self.mat))
    }

    /// Project the matrix back onto SO(3).
    ///
    /// Repeated compositions slowly lose orthonormality to round-off. This applies Gram-Schmidt to
    /// the first two columns and completes the frame with their cross product.
    pub fn orthonormalize(&mut self) {
        let c0 = self.mat.column(0).normalize();
        let c1 = self.mat.column(1);
        let c1 = (c1 - c0 * c0.dot(&c1)).normalize();
        let c2 = c0.cross(&c1);
        self.mat = Matrix3::from_columns(&[c0, c1, c2]);
    }

    /// Maximum absolute deviation of `RᵀR` from the identity.
    pub fn orthonormality_error(&self) -> T {
        (self.mat.transpose() * self.mat - Matrix3::identity()).amax()
    }
}

/// Check that `mat` is orthonormal with unit determinant within `eps`.
pub fn is_rotation_matrix<T: RealField + Copy>(mat: &Matrix3<T>, eps: T) -> bool {
    let orth = (mat.transpose() * mat - Matrix3::identity()).amax();
    orth <= eps && (mat.determinant() - na::one::<T>()).abs() <= eps
}

impl<T: RealField + Copy> SO3<T> for SO3Matrix<T> {
    fn identity() -> Self {
        SO3Matrix {
            mat: Matrix3::identity(),
        }
    }

    fn from_rotation_matrix_unchecked(mat: Matrix3<T>) -> Self {
        SO3Matrix { mat }
    }

    fn to_rotation_matrix(&self) -> Matrix3<T> {
        self.mat
    }

    fn compose(&self, other: &Self) -> Self {
        SO3Matrix {
            mat: self.mat * other.mat,
        }
    }

    fn inverse(&self) -> Self {
        SO3Matrix {
            mat: self.mat.transpose(),
        }
    }

    fn invert(&mut self) {
        self.mat.transpose_mut();
    }

    fn rotate(&self, v: &Vector3<T>) -> Vector3<T> {
        self.mat * v
    }

    /// Rodrigues' formula:
    ///
    /// `R = I + sin(θ)/θ [ω]× + (1 - cos(θ))/θ² [ω]×²` where `θ = ‖ω‖`.
    fn exp(tangent: &Tangent<T>) -> Self {
        let one = na::one::<T>();
        let half = na::convert::<f64, T>(0.5);
        let theta2 = tangent.norm_squared();
        let theta = theta2.sqrt();
        let (a, b) = if theta < na::convert::<f64, T>(SMALL_ANGLE) {
            (
                one - theta2 / na::convert::<f64, T>(6.0),
                half - theta2 / na::convert::<f64, T>(24.0),
            )
        } else {
            // 1 - cos(θ) = 2 sin²(θ/2) avoids cancellation for small angles.
            let s = (theta * half).sin() / theta;
            (theta.sin() / theta, s * s * na::convert::<f64, T>(2.0))
        };
        let k = hat(tangent);
        SO3Matrix {
            mat: Matrix3::identity() + k * a + k * k * b,
        }
    }

    /// Inverse of Rodrigues' formula.
    ///
    /// The angle is recovered with `atan2` from the skew symmetric and trace parts, which is
    /// accurate over the whole range `[0, π]`. Near `θ = 0` a series expansion is used and near
    /// `θ = π` the axis is extracted from the symmetric part `cos(θ) I + (1 - cos(θ)) a aᵀ`.
    fn log(&self) -> Tangent<T> {
        let one = na::one::<T>();
        let half = na::convert::<f64, T>(0.5);
        let r = &self.mat;

        // vee(R - Rᵀ) = 2 sin(θ) a, where a is the unit axis.
        let skew = vee(&(r - r.transpose()));
        let sin2 = skew.norm();
        let cos2 = r.trace() - one;
        let theta = sin2.atan2(cos2);

        if theta < na::convert::<f64, T>(SMALL_ANGLE) {
            // θ / (2 sin(θ)) ≈ (1 + θ²/6) / 2
            skew * (half * (one + theta * theta / na::convert::<f64, T>(6.0)))
        } else if T::pi() - theta < na::convert::<f64, T>(NEAR_PI) {
            let cos = cos2 * half;
            let sym = (r + r.transpose()) * half;
            let aat = (sym - Matrix3::identity() * cos) / (one - cos);
            let k = aat.diagonal().imax();
            let mut axis: Vector3<T> = aat.column(k) / aat[(k, k)].sqrt();
            axis.normalize_mut();
            if axis.dot(&skew) < na::zero::<T>() {
                axis = -axis;
            }
            axis * theta
        } else {
            skew * (theta / sin2)
        }
    }
}

impl<T: RealField + Copy> Mul for SO3Matrix<T> {
    type Output = SO3Matrix<T>;
    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(&rhs)
    }
}

impl<T: RealField + Copy> Mul<&SO3Matrix<T>> for &SO3Matrix<T> {
    type Output = SO3Matrix<T>;
    fn mul(self, rhs: &SO3Matrix<T>) -> Self::Output {
        self.compose(rhs)
    }
}

impl<T: RealField + Copy> MulAssign for SO3Matrix<T> {
    fn mul_assign(&mut self, rhs: Self) {
        self.mat *= rhs.mat;
    }
}

impl<T: RealField + Copy> Mul<Vector3<T>> for SO3Matrix<T> {
    type Output = Vector3<T>;
    fn mul(self, rhs: Vector3<T>) -> Self::Output {
        self.rotate(&rhs)
    }
}

impl<T: RealField + Copy> Mul<&Vector3<T>> for &SO3Matrix<T> {
    type Output = Vector3<T>;
    fn mul(self, rhs: &Vector3<T>) -> Self::Output {
        self.rotate(rhs)
    }
}

impl<T: RealField + Copy> From<UnitQuaternion<T>> for SO3Matrix<T> {
    fn from(quat: UnitQuaternion<T>) -> Self {
        Self::from_quaternion(&quat)
    }
}

impl<T: RealField + Copy> From<Rotation3<T>> for SO3Matrix<T> {
    fn from(rot: Rotation3<T>) -> Self {
        SO3Matrix {
            mat: rot.into_inner(),
        }
    }
}

impl<T: RealField + Copy> From<SO3Matrix<T>> for Matrix3<T> {
    fn from(rot: SO3Matrix<T>) -> Self {
        rot.mat
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use std::f64::consts::PI;

    fn rng() -> rand::rngs::StdRng {
        rand::rngs::StdRng::seed_from_u64(7)
    }

    #[test]
    fn exp_of_zero_is_identity() {
        let r = SO3Matrix::<f64>::exp(&Vector3::zeros());
        assert!(r.is_identity());
        assert_eq!(r, SO3Matrix::identity());
    }

    #[test]
    fn default_is_a_valid_rotation() {
        let r = SO3Matrix::<f64>::default();
        assert!(is_rotation_matrix(r.rotation_matrix(), 1e-12));
    }

    #[test]
    fn exp_quarter_turn() {
        let r = SO3Matrix::exp(&Vector3::new(0.0, 0.0, PI / 2.0));
        assert_relative_eq!(
            r * Vector3::new(1.0, 0.0, 0.0),
            Vector3::new(0.0, 1.0, 0.0),
            epsilon = 1e-15
        );
    }

    #[test]
    fn exp_matches_nalgebra() {
        let mut rng = rng();
        for _ in 0..50 {
            let t = super::super::random_tangent::<f64, _>(&mut rng);
            let expected = Rotation3::from_scaled_axis(t).into_inner();
            assert_relative_eq!(
                *SO3Matrix::exp(&t).rotation_matrix(),
                expected,
                epsilon = 1e-13
            );
        }
    }

    #[test]
    fn log_exp_round_trip() {
        let mut rng = rng();
        for _ in 0..200 {
            let t = super::super::random_tangent::<f64, _>(&mut rng);
            let r = SO3Matrix::exp(&t);
            assert_relative_eq!(r.log(), t, epsilon = 1e-10);
        }
    }

    #[test]
    fn log_small_angles() {
        for &angle in &[0.0, 1e-12, 1e-8, 1e-6, 1e-4] {
            let t = Vector3::new(0.3, -0.4, 1.2).normalize() * angle;
            let r = SO3Matrix::exp(&t);
            assert_relative_eq!(r.log(), t, epsilon = 1e-15, max_relative = 1e-9);
        }
    }

    #[test]
    fn log_near_pi() {
        let axis = Vector3::new(1.0, 2.0, -2.0).normalize();
        for &angle in &[PI, PI - 1e-12, PI - 1e-8, PI - 1e-5, PI - 2e-3] {
            let t = axis * angle;
            let r = SO3Matrix::exp(&t);
            let log = r.log();
            assert_relative_eq!(log.norm(), angle, epsilon = 1e-9);
            // At exactly π both axis directions are valid.
            if angle < PI {
                assert_relative_eq!(log, t, epsilon = 1e-7);
            } else {
                assert_relative_eq!(log.normalize().dot(&axis).abs(), 1.0, epsilon = 1e-12);
            }
            assert!(SO3Matrix::exp(&log).angular_distance(&r) < 1e-7);
        }
    }

    #[test]
    fn log_of_half_turns_about_coordinate_axes() {
        for i in 0..3 {
            let mut diag = Vector3::from_element(-1.0_f64);
            diag[i] = 1.0;
            let r = SO3Matrix::from_matrix(Matrix3::from_diagonal(&diag)).unwrap();
            let log = r.log();
            assert_relative_eq!(log.norm(), PI, epsilon = 1e-12);
            assert_relative_eq!(log[i].abs(), PI, epsilon = 1e-12);
        }
    }

    #[test]
    fn group_closure() {
        let mut rng = rng();
        let mut r1 = SO3Matrix::<f64>::identity();
        let mut r2 = SO3Matrix::<f64>::identity();
        for _ in 0..100 {
            r1.set_random(&mut rng);
            r2.set_random(&mut rng);
            let r = r1 * r2;
            assert!(r.orthonormality_error() < 1e-12);
            assert_relative_eq!(r.rotation_matrix().determinant(), 1.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn inverse_laws() {
        let mut rng = rng();
        let mut r = SO3Matrix::<f64>::identity();
        r.set_random(&mut rng);
        assert!((r * r.inverse()).is_approx_identity(1e-14));

        let original = r;
        r.invert();
        assert_eq!(r, original.inverse());
        r.invert();
        assert_eq!(r, original);
    }

    #[test]
    fn inverse_does_not_mutate_receiver() {
        let r = SO3Matrix::exp(&Vector3::new(0.1, 0.2, 0.3));
        let copy = r;
        let _ = r.inverse();
        assert_eq!(r, copy);
    }

    #[test]
    fn from_matrix_rejects_non_rotations() {
        let scaled = Matrix3::identity() * 2.0;
        assert!(matches!(
            SO3Matrix::from_matrix(scaled),
            Err(Error::InvalidRotation)
        ));

        let reflection = Matrix3::from_diagonal(&Vector3::new(1.0, 1.0, -1.0));
        assert!(matches!(
            SO3Matrix::from_matrix(reflection),
            Err(Error::InvalidRotation)
        ));

        let mut nan = Matrix3::identity();
        nan[(0, 1)] = f64::NAN;
        assert!(SO3Matrix::from_matrix(nan).is_err());

        let valid = *SO3Matrix::exp(&Vector3::new(0.5, -0.5, 0.1)).rotation_matrix();
        assert!(SO3Matrix::from_matrix(valid).is_ok());
    }

    #[test]
    fn orthonormalize_removes_drift() {
        let step = SO3Matrix::exp(&Vector3::new(0.013, -0.007, 0.021));
        let mut r = SO3Matrix::identity();
        for _ in 0..10_000 {
            r *= step;
        }
        let before = r;
        r.orthonormalize();
        assert!(r.orthonormality_error() < 1e-14);
        assert_relative_eq!(r.rotation_matrix().determinant(), 1.0, epsilon = 1e-14);
        // The projection only removes round-off.
        assert!(r.angular_distance(&before) < 1e-10);
    }

    #[test]
    fn identity_test_is_exact() {
        let mut r = SO3Matrix::exp(&Vector3::new(1e-9, 0.0, 0.0));
        assert!(!r.is_identity());
        assert!(r.is_approx_identity(1e-8));
        r.set_identity();
        assert!(r.is_identity());
    }

    #[test]
    fn quaternion_and_axis_angle_construction() {
        let axis = Unit::new_normalize(Vector3::new(1.0, -1.0, 0.5));
        let angle = 1.3;
        let from_aa = SO3Matrix::from_axis_angle(&axis, angle);
        let quat = UnitQuaternion::from_axis_angle(&axis, angle);
        let from_quat = SO3Matrix::from_quaternion(&quat);
        assert_relative_eq!(
            *from_aa.rotation_matrix(),
            *from_quat.rotation_matrix(),
            epsilon = 1e-14
        );
        assert!(from_aa.to_quaternion().angle_to(&quat) < 1e-7);
    }
}
