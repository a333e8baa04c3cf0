use na::{Matrix3, RealField, Unit, Vector3};

use super::{SO3Matrix, Tangent, SO3};

/// A rotation represented by its rotation vector: the unit axis scaled by the angle.
///
/// The stored vector is kept in the principal range with norm at most π, so it coincides with
/// the logarithm of the rotation. Composition goes through [`SO3Matrix`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct SO3Vector<T: RealField + Copy> {
    vec: Vector3<T>,
}

impl<T: RealField + Copy> SO3Vector<T> {
    /// Build from a rotation vector, wrapping the angle into `[0, π]`.
    pub fn new(vec: Vector3<T>) -> Self {
        SO3Vector { vec: wrap(vec) }
    }

    pub fn from_axis_angle(axis: &Unit<Vector3<T>>, angle: T) -> Self {
        Self::new(axis.as_ref() * angle)
    }

    /// Unit axis and angle of this rotation, or `None` for the identity.
    pub fn axis_angle(&self) -> Option<(Unit<Vector3<T>>, T)> {
        Unit::try_new_and_get(self.vec, na::zero::<T>())
    }

    pub fn vector(&self) -> &Vector3<T> {
        &self.vec
    }
}

/// Map a rotation vector to an equivalent one with norm in `[0, π]`.
fn wrap<T: RealField + Copy>(vec: Vector3<T>) -> Vector3<T> {
    let angle = vec.norm();
    if angle <= T::pi() {
        return vec;
    }
    let two_pi = T::two_pi();
    let wrapped = angle - two_pi * (angle / two_pi).round();
    // `wrapped` lies in [-π, π]; a negative angle flips the axis.
    vec * (wrapped / angle)
}

impl<T: RealField + Copy> SO3<T> for SO3Vector<T> {
    fn identity() -> Self {
        SO3Vector {
            vec: Vector3::zeros(),
        }
    }

    fn from_rotation_matrix_unchecked(mat: Matrix3<T>) -> Self {
        SO3Vector {
            vec: SO3Matrix::from_matrix_unchecked(mat).log(),
        }
    }

    fn to_rotation_matrix(&self) -> Matrix3<T> {
        SO3Matrix::exp(&self.vec).to_rotation_matrix()
    }

    fn compose(&self, other: &Self) -> Self {
        let mat = SO3Matrix::exp(&self.vec).compose(&SO3Matrix::exp(&other.vec));
        SO3Vector { vec: mat.log() }
    }

    fn inverse(&self) -> Self {
        SO3Vector { vec: -self.vec }
    }

    fn rotate(&self, v: &Vector3<T>) -> Vector3<T> {
        SO3Matrix::exp(&self.vec).rotate(v)
    }

    fn exp(tangent: &Tangent<T>) -> Self {
        Self::new(*tangent)
    }

    fn log(&self) -> Tangent<T> {
        self.vec
    }
}

impl<T: RealField + Copy> From<SO3Vector<T>> for SO3Matrix<T> {
    fn from(rot: SO3Vector<T>) -> Self {
        SO3Matrix::exp(&rot.vec)
    }
}

impl<T: RealField + Copy> From<SO3Matrix<T>> for SO3Vector<T> {
    fn from(rot: SO3Matrix<T>) -> Self {
        SO3Vector { vec: rot.log() }
    }
}
