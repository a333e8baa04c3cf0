#![allow(dead_code)]

use na::{DMatrix, DVector, Matrix3, Vector3};
use rigid::rotation::hat;
use rigid::{ContactBasis, ContactSet, Error, SO3Matrix, SO3};

pub fn init_logger() {
    let _ = env_logger::Builder::from_env("RIGID_LOG")
        .is_test(true)
        .try_init();
}

/// A contact problem assembled from the velocities and inverse mass of the bodies in contact.
///
/// The constraint space velocity after applying impulses `x` is `A x + b` with `A = J M⁻¹ Jᵀ`
/// and `b = J u`.
#[derive(Clone, Debug)]
pub struct ContactSystem {
    pub a: DMatrix<f64>,
    pub b: DVector<f64>,
    pub contacts: ContactSet,
    pub jacobian: DMatrix<f64>,
    pub inv_mass: DMatrix<f64>,
    pub velocity: DVector<f64>,
}

impl ContactSystem {
    /// `point_jacobian` maps generalized velocities to stacked contact point velocities.
    pub fn assemble(
        normals: Vec<Vector3<f64>>,
        point_jacobian: DMatrix<f64>,
        inv_mass: DMatrix<f64>,
        velocity: DVector<f64>,
        mu: f64,
        num_dir: usize,
    ) -> Result<ContactSystem, Error> {
        let contacts = ContactSet::new(normals.len(), mu, num_dir);
        let mut basis = ContactBasis::new();
        basis.update_from_normals(normals);

        let jacobian = basis.contact_jacobian(&contacts)? * point_jacobian;
        let a = &jacobian * &inv_mass * jacobian.transpose();
        let b = &jacobian * &velocity;
        Ok(ContactSystem {
            a,
            b,
            contacts,
            jacobian,
            inv_mass,
            velocity,
        })
    }

    /// Generalized velocity after applying contact impulses `x` given in native layout.
    pub fn final_velocity(&self, x: &DVector<f64>) -> DVector<f64> {
        &self.velocity + &self.inv_mass * (self.jacobian.transpose() * x)
    }
}

/// A point mass touching one or more surfaces.
pub fn particle_system(
    mass: f64,
    velocity: Vector3<f64>,
    normals: &[Vector3<f64>],
    mu: f64,
    num_dir: usize,
) -> Result<ContactSystem, Error> {
    let n = normals.len();
    let mut point_jacobian = DMatrix::zeros(3 * n, 3);
    for c in 0..n {
        point_jacobian
            .fixed_view_mut::<3, 3>(3 * c, 0)
            .copy_from(&Matrix3::identity());
    }
    ContactSystem::assemble(
        normals.to_vec(),
        point_jacobian,
        DMatrix::identity(3, 3) / mass,
        DVector::from_column_slice(velocity.as_slice()),
        mu,
        num_dir,
    )
}

/// A solid box with uniform density.
#[derive(Clone, Debug)]
pub struct RigidBox {
    pub mass: f64,
    pub half_extents: Vector3<f64>,
    pub orientation: SO3Matrix<f64>,
    pub position: Vector3<f64>,
}

impl RigidBox {
    /// Inverse inertia tensor in world coordinates.
    pub fn inverse_inertia(&self) -> Matrix3<f64> {
        let h = self.half_extents.component_mul(&self.half_extents);
        let body = Vector3::new(h[1] + h[2], h[0] + h[2], h[0] + h[1]) * (self.mass / 3.0);
        let r = self.orientation.rotation_matrix();
        r * Matrix3::from_diagonal(&body.map(|i| 1.0 / i)) * r.transpose()
    }

    /// World positions of the four corners on the bottom face (negative local `y`).
    pub fn bottom_corners(&self) -> Vec<Vector3<f64>> {
        let h = self.half_extents;
        let mut corners = Vec::with_capacity(4);
        for sx in [-1.0, 1.0] {
            for sz in [-1.0, 1.0] {
                let local = Vector3::new(sx * h[0], -h[1], sz * h[2]);
                corners.push(self.position + self.orientation.rotate(&local));
            }
        }
        corners
    }

    /// Contact problem for the bottom corners touching a ground plane with upward normal.
    ///
    /// Generalized velocities are stacked as `[v; ω]`.
    pub fn ground_contact(
        &self,
        linear: Vector3<f64>,
        angular: Vector3<f64>,
        mu: f64,
        num_dir: usize,
    ) -> Result<ContactSystem, Error> {
        let corners = self.bottom_corners();
        let mut point_jacobian = DMatrix::zeros(3 * corners.len(), 6);
        for (c, p) in corners.iter().enumerate() {
            let r = p - self.position;
            point_jacobian
                .fixed_view_mut::<3, 3>(3 * c, 0)
                .copy_from(&Matrix3::identity());
            point_jacobian
                .fixed_view_mut::<3, 3>(3 * c, 3)
                .copy_from(&(-hat(&r)));
        }

        let mut inv_mass = DMatrix::zeros(6, 6);
        inv_mass
            .fixed_view_mut::<3, 3>(0, 0)
            .copy_from(&(Matrix3::identity() / self.mass));
        inv_mass
            .fixed_view_mut::<3, 3>(3, 3)
            .copy_from(&self.inverse_inertia());

        let mut velocity = DVector::zeros(6);
        velocity.fixed_rows_mut::<3>(0).copy_from(&linear);
        velocity.fixed_rows_mut::<3>(3).copy_from(&angular);

        ContactSystem::assemble(
            vec![Vector3::y(); corners.len()],
            point_jacobian,
            inv_mass,
            velocity,
            mu,
            num_dir,
        )
    }
}

/// The box used throughout the contact tests: tilted about the vertical axis and resting on the
/// ground plane `y = 0`.
pub fn resting_box() -> RigidBox {
    RigidBox {
        mass: 2.0,
        half_extents: Vector3::new(0.5, 0.25, 0.5),
        orientation: SO3Matrix::exp(&Vector3::new(0.0, 0.3, 0.0)),
        position: Vector3::new(0.0, 0.25, 0.0),
    }
}
