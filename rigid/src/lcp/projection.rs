use na::DVector;

use crate::{ContactSet, Error};

/// Maps between the native contact ordering and the canonical interleaved ordering.
///
/// The native ordering stores all normal forces first, followed by the friction components
/// grouped by contact: `[n_0, .., n_{c-1}, f_00, .., f_0k, f_10, ..]`. The canonical ordering
/// interleaves them: `[n_0, f_00, .., f_0k, n_1, f_10, ..]`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SolutionProjector {
    /// Native index of each canonical variable.
    permutation: Vec<usize>,
}

impl SolutionProjector {
    pub fn new(contacts: &ContactSet) -> Self {
        let k = contacts.num_friction_dirs();
        let mut permutation = Vec::with_capacity(contacts.dim());
        for contact in 0..contacts.num_contacts {
            permutation.push(contacts.normal_index(contact));
            permutation.extend((0..k).map(|dir| contacts.friction_index(contact, dir)));
        }
        SolutionProjector { permutation }
    }

    pub fn dim(&self) -> usize {
        self.permutation.len()
    }

    pub fn permutation(&self) -> &[usize] {
        &self.permutation
    }

    /// Map a canonical vector back to native contact ordering.
    pub fn project(&self, canonical: &[f64]) -> Result<DVector<f64>, Error> {
        self.check_size(canonical.len())?;
        let mut native = DVector::zeros(self.dim());
        for (&c, &i) in canonical.iter().zip(self.permutation.iter()) {
            native[i] = c;
        }
        Ok(native)
    }

    /// Map a vector in native contact ordering to canonical ordering.
    pub fn canonicalize(&self, native: &[f64]) -> Result<DVector<f64>, Error> {
        self.check_size(native.len())?;
        Ok(DVector::from_iterator(
            self.dim(),
            self.permutation.iter().map(|&i| native[i]),
        ))
    }

    fn check_size(&self, actual: usize) -> Result<(), Error> {
        if actual != self.dim() {
            return Err(Error::SizeMismatch {
                expected: self.dim(),
                actual,
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn interleaved_permutation() {
        let p = SolutionProjector::new(&ContactSet::new(2, 1.0, 2));
        assert_eq!(p.permutation(), &[0, 2, 3, 1, 4, 5]);

        let p = SolutionProjector::new(&ContactSet::new(3, 0.0, 4));
        assert_eq!(p.permutation(), &[0, 1, 2]);
    }

    #[test]
    fn project_inverts_canonicalize() -> Result<(), Error> {
        let contacts = ContactSet::new(3, 0.8, 3);
        let p = SolutionProjector::new(&contacts);
        let native: Vec<f64> = (0..contacts.dim()).map(|i| i as f64 * 1.5 - 4.0).collect();
        let canonical = p.canonicalize(&native)?;
        assert_ne!(canonical.as_slice(), native.as_slice());
        assert_eq!(p.project(canonical.as_slice())?.as_slice(), native.as_slice());
        Ok(())
    }

    #[test]
    fn wrong_size_is_rejected() {
        let p = SolutionProjector::new(&ContactSet::new(2, 1.0, 1));
        assert!(matches!(
            p.project(&[0.0; 3]),
            Err(Error::SizeMismatch {
                expected: 4,
                actual: 3
            })
        ));
    }

    #[test]
    fn empty_contact_set() -> Result<(), Error> {
        let p = SolutionProjector::new(&ContactSet::frictionless(0));
        assert_eq!(p.project(&[])?.len(), 0);
        Ok(())
    }
}
