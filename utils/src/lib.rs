//! Convenience functions and utilities shared by the solvers and their tests.

pub mod dense;
pub mod random;
pub mod zip;

/// Infinity norm of the given sequence of values.
///
/// Returns zero for an empty sequence. NaN values are propagated so that callers can detect them
/// with a single check.
pub fn inf_norm<I>(iter: I) -> f64
where
    I: IntoIterator<Item = f64>,
{
    iter.into_iter().fold(0.0, |acc, x| {
        if x.is_nan() || acc.is_nan() {
            f64::NAN
        } else {
            acc.max(x.abs())
        }
    })
}

/// Returns `true` if all given values are finite (neither NaN nor infinite).
pub fn all_finite<'a, I>(iter: I) -> bool
where
    I: IntoIterator<Item = &'a f64>,
{
    iter.into_iter().all(|x| x.is_finite())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn inf_norm_test() {
        assert_eq!(inf_norm(vec![1.0, -3.5, 2.0]), 3.5);
        assert_eq!(inf_norm(Vec::new()), 0.0);
        assert!(inf_norm(vec![1.0, f64::NAN, 2.0]).is_nan());
    }

    #[test]
    fn all_finite_test() {
        assert!(all_finite(&[0.0, 1.0, -2.0]));
        assert!(!all_finite(&[0.0, f64::INFINITY]));
        assert!(!all_finite(&[f64::NAN]));
    }
}
