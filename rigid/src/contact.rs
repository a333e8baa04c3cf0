mod solver;

pub use solver::*;

use na::{DMatrix, DVector, Matrix3, Vector2, Vector3};

use crate::rotation::{SO3Matrix, SO3};
use crate::Error;

/// Shape of a contact problem.
///
/// Each contact carries one normal force unknown and, when friction is active, `num_dir`
/// friction unknowns sharing the coefficient `mu`. Unknowns are laid out with all normal forces
/// first, followed by friction components grouped by contact.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct ContactSet {
    pub num_contacts: usize,
    pub mu: f64,
    pub num_dir: usize,
}

impl ContactSet {
    pub fn new(num_contacts: usize, mu: f64, num_dir: usize) -> Self {
        ContactSet {
            num_contacts,
            mu,
            num_dir,
        }
    }

    pub fn frictionless(num_contacts: usize) -> Self {
        Self::new(num_contacts, 0.0, 0)
    }

    /// Friction unknowns are present only when both `mu` and `num_dir` are non-zero.
    pub fn has_friction(&self) -> bool {
        self.mu > 0.0 && self.num_dir > 0
    }

    /// Number of friction unknowns per contact.
    pub fn num_friction_dirs(&self) -> usize {
        if self.has_friction() {
            self.num_dir
        } else {
            0
        }
    }

    /// Total number of unknowns.
    pub fn dim(&self) -> usize {
        self.num_contacts * (1 + self.num_friction_dirs())
    }

    pub fn normal_index(&self, contact: usize) -> usize {
        contact
    }

    pub fn friction_index(&self, contact: usize, dir: usize) -> usize {
        self.num_contacts + contact * self.num_friction_dirs() + dir
    }

    pub fn validate(&self) -> Result<(), Error> {
        if !self.mu.is_finite() || self.mu < 0.0 {
            return Err(Error::InvalidParameter {
                name: "mu".to_string(),
            });
        }
        Ok(())
    }

    /// Check that `(A, b)` is a well formed system for this contact set.
    pub fn check_system(&self, a: &DMatrix<f64>, b: &DVector<f64>) -> Result<(), Error> {
        self.validate()?;
        if a.nrows() != a.ncols() {
            return Err(Error::NonSquareMatrix {
                rows: a.nrows(),
                cols: a.ncols(),
            });
        }
        let n = self.dim();
        if a.nrows() != n {
            return Err(Error::SizeMismatch {
                expected: n,
                actual: a.nrows(),
            });
        }
        if b.len() != n {
            return Err(Error::SizeMismatch {
                expected: n,
                actual: b.len(),
            });
        }
        Ok(())
    }
}

/// Normal and tangent frame at each point of contact.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ContactBasis {
    pub normals: Vec<Vector3<f64>>,
    pub tangents: Vec<Vector3<f64>>,
}

impl ContactBasis {
    pub fn new() -> ContactBasis {
        ContactBasis {
            normals: Vec::new(),
            tangents: Vec::new(),
        }
    }

    /// Check if the basis is empty. It may be empty if uninitialized or when there are no
    /// contacts.
    pub fn is_empty(&self) -> bool {
        self.normals.is_empty()
    }

    pub fn len(&self) -> usize {
        self.normals.len()
    }

    /// Rebuild the basis from unit normals.
    pub fn update_from_normals(&mut self, normals: Vec<Vector3<f64>>) {
        self.tangents.clear();
        self.tangents.resize(normals.len(), Vector3::zeros());
        self.normals = normals;

        for (n, t) in self.normals.iter().zip(self.tangents.iter_mut()) {
            // Find the axis that is most aligned with the normal, then use the next axis for the
            // tangent.
            let tangent_axis = (n.iamax() + 1) % 3;
            t[tangent_axis] = 1.0;

            // Project out the normal component.
            *t -= n * n[tangent_axis];
            t.normalize_mut();
        }
    }

    /// Rotation taking vectors from physical space to contact space.
    ///
    /// The rows of the matrix are the normal, the tangent and the bitangent `n × t`.
    ///
    /// # Panics
    ///
    /// This function panics if `contact_index` is not less than [`ContactBasis::len`].
    pub fn contact_basis_matrix(&self, contact_index: usize) -> SO3Matrix<f64> {
        let n = self.normals[contact_index];
        let t = self.tangents[contact_index];
        let b = n.cross(&t);
        SO3Matrix::from_matrix_unchecked(Matrix3::from_rows(&[
            n.transpose(),
            t.transpose(),
            b.transpose(),
        ]))
    }

    /// Transform a vector at the given contact point index to contact coordinates.
    pub fn to_contact_coordinates(&self, v: &Vector3<f64>, contact_index: usize) -> Vector3<f64> {
        self.contact_basis_matrix(contact_index).rotate(v)
    }

    /// Transform a vector at the given contact point index to physical coordinates.
    pub fn from_contact_coordinates(
        &self,
        v: &Vector3<f64>,
        contact_index: usize,
    ) -> Vector3<f64> {
        self.contact_basis_matrix(contact_index).inverse().rotate(v)
    }

    /// Transform a given stacked vector of vectors in physical space
    /// to stacked 2D vectors in the tangent space of the contact point.
    pub fn to_tangent_space<'a>(
        &'a self,
        physical: &'a [Vector3<f64>],
    ) -> impl Iterator<Item = Vector2<f64>> + 'a {
        physical.iter().enumerate().map(move |(i, v)| {
            let c = self.to_contact_coordinates(v, i);
            Vector2::new(c[1], c[2])
        })
    }

    /// Transform a given stacked vector of vectors in contact space to vectors in physical space.
    pub fn from_tangent_space<'a>(
        &'a self,
        contact: &'a [Vector2<f64>],
    ) -> impl Iterator<Item = Vector3<f64>> + 'a {
        contact
            .iter()
            .enumerate()
            .map(move |(i, v)| self.from_contact_coordinates(&Vector3::new(0.0, v[0], v[1]), i))
    }

    /// Directions spanning the friction polygon at a contact.
    ///
    /// The tangent is rotated about the normal in `num_dir` equal steps over a half turn. Each
    /// direction is paired with its opposite through the symmetric box bounds of its friction
    /// component.
    ///
    /// # Panics
    ///
    /// This function panics if `contact_index` is not less than [`ContactBasis::len`].
    pub fn friction_directions(&self, contact_index: usize, num_dir: usize) -> Vec<Vector3<f64>> {
        let n = self.normals[contact_index];
        let t = self.tangents[contact_index];
        let step = std::f64::consts::PI / num_dir as f64;
        (0..num_dir)
            .map(|k| SO3Matrix::exp(&(n * (step * k as f64))).rotate(&t))
            .collect()
    }

    /// Dense contact Jacobian mapping stacked contact point velocities to constraint space.
    ///
    /// Rows follow the native layout of `contacts`. Column block `3 i..3 i + 3` holds contact
    /// point `i`.
    pub fn contact_jacobian(&self, contacts: &ContactSet) -> Result<DMatrix<f64>, Error> {
        if contacts.num_contacts != self.len() {
            return Err(Error::SizeMismatch {
                expected: self.len(),
                actual: contacts.num_contacts,
            });
        }

        let mut jac = DMatrix::zeros(contacts.dim(), 3 * self.len());
        let k = contacts.num_friction_dirs();
        for c in 0..self.len() {
            jac.fixed_view_mut::<1, 3>(contacts.normal_index(c), 3 * c)
                .copy_from(&self.normals[c].transpose());
            for (dir, d) in self.friction_directions(c, k).iter().enumerate() {
                jac.fixed_view_mut::<1, 3>(contacts.friction_index(c, dir), 3 * c)
                    .copy_from(&d.transpose());
            }
        }
        Ok(jac)
    }
}
