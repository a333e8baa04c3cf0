use std::ops::Mul;

use na::{Matrix3, RealField, Rotation3, UnitQuaternion, Vector3};

use super::{SO3Matrix, Tangent, SO3};

/// A rotation represented by a unit quaternion.
///
/// This is a conversion target for [`SO3Matrix`]. The exponential and logarithm maps delegate to
/// the scaled axis conversions of [`UnitQuaternion`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SO3Quaternion<T: RealField + Copy> {
    quat: UnitQuaternion<T>,
}

impl<T: RealField + Copy> SO3Quaternion<T> {
    pub fn new(quat: UnitQuaternion<T>) -> Self {
        SO3Quaternion { quat }
    }

    pub fn quaternion(&self) -> &UnitQuaternion<T> {
        &self.quat
    }
}

impl<T: RealField + Copy> SO3<T> for SO3Quaternion<T> {
    fn identity() -> Self {
        SO3Quaternion {
            quat: UnitQuaternion::identity(),
        }
    }

    fn from_rotation_matrix_unchecked(mat: Matrix3<T>) -> Self {
        SO3Quaternion {
            quat: UnitQuaternion::from_rotation_matrix(&Rotation3::from_matrix_unchecked(mat)),
        }
    }

    fn to_rotation_matrix(&self) -> Matrix3<T> {
        self.quat.to_rotation_matrix().into_inner()
    }

    fn compose(&self, other: &Self) -> Self {
        SO3Quaternion {
            quat: self.quat * other.quat,
        }
    }

    fn inverse(&self) -> Self {
        SO3Quaternion {
            quat: self.quat.inverse(),
        }
    }

    fn rotate(&self, v: &Vector3<T>) -> Vector3<T> {
        self.quat.transform_vector(v)
    }

    fn exp(tangent: &Tangent<T>) -> Self {
        SO3Quaternion {
            quat: UnitQuaternion::from_scaled_axis(*tangent),
        }
    }

    fn log(&self) -> Tangent<T> {
        // `q` and `-q` are the same rotation. Pick the hemisphere with a non-negative scalar part
        // so the angle stays within [0, π].
        let quat = if self.quat.w < na::zero::<T>() {
            UnitQuaternion::new_unchecked(-self.quat.into_inner())
        } else {
            self.quat
        };
        quat.scaled_axis()
    }
}

impl<T: RealField + Copy> Mul for SO3Quaternion<T> {
    type Output = SO3Quaternion<T>;
    fn mul(self, rhs: Self) -> Self::Output {
        self.compose(&rhs)
    }
}

impl<T: RealField + Copy> From<SO3Matrix<T>> for SO3Quaternion<T> {
    fn from(rot: SO3Matrix<T>) -> Self {
        SO3Quaternion {
            quat: rot.to_quaternion(),
        }
    }
}

impl<T: RealField + Copy> From<SO3Quaternion<T>> for SO3Matrix<T> {
    fn from(rot: SO3Quaternion<T>) -> Self {
        SO3Matrix::from_quaternion(&rot.quat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn agrees_with_matrix_representation() {
        let mut rng = utils::random::seeded_rng();
        for _ in 0..50 {
            let a = super::super::random_tangent::<f64, _>(&mut rng);
            let b = super::super::random_tangent::<f64, _>(&mut rng);
            let qa = SO3Quaternion::exp(&a);
            let qb = SO3Quaternion::exp(&b);
            let ma = SO3Matrix::exp(&a);
            let mb = SO3Matrix::exp(&b);

            assert_relative_eq!(
                (qa * qb).to_rotation_matrix(),
                (ma * mb).to_rotation_matrix(),
                epsilon = 1e-12
            );
            assert_relative_eq!(qa.log(), ma.log(), epsilon = 1e-9);

            let v = Vector3::new(0.2, -1.0, 0.7);
            assert_relative_eq!(qa.rotate(&v), ma.rotate(&v), epsilon = 1e-12);
        }
    }

    #[test]
    fn conversion_round_trip() {
        let m = SO3Matrix::exp(&Vector3::new(-0.3, 1.1, 0.4));
        let q: SO3Quaternion<f64> = m.into();
        let back: SO3Matrix<f64> = q.convert();
        assert!(back.angular_distance(&m) < 1e-12);
    }

    #[test]
    fn log_stays_in_principal_range() {
        let q = SO3Quaternion::new(UnitQuaternion::new_unchecked(-UnitQuaternion::from_scaled_axis(
            Vector3::new(0.0, 0.5, 0.0),
        )
        .into_inner()));
        assert_relative_eq!(q.log(), Vector3::new(0.0, 0.5, 0.0), epsilon = 1e-14);
    }
}
