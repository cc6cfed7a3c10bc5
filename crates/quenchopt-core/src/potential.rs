//! Potential (energy and gradient) oracle interface.
//!
//! The optimizers know nothing about what a configuration represents. They
//! only ever ask a [`Potential`] for the energy and gradient at a flat
//! vector of coordinates.
//!
//! # Contract
//!
//! - `energy_gradient` must be a deterministic function of its input.
//! - The returned gradient must have the same dimension as the input.
//! - Failures are reported through [`PotentialError`]; the optimizers treat a
//!   failed evaluation during step-size control like a rejected step.

use crate::{
    error::{PotentialError, PotentialResult},
    types::{all_finite, DVector, Scalar},
};
use num_traits::Float;
use std::cell::Cell;
use std::fmt::{self, Debug};

/// Energy/gradient oracle.
pub trait Potential<T: Scalar> {
    /// Evaluates the energy and its gradient at `position`.
    fn energy_gradient(&self, position: &DVector<T>) -> PotentialResult<(T, DVector<T>)>;

    /// Evaluates only the energy.
    ///
    /// # Default Implementation
    ///
    /// Calls `energy_gradient` and discards the gradient.
    fn energy(&self, position: &DVector<T>) -> PotentialResult<T> {
        self.energy_gradient(position).map(|(energy, _)| energy)
    }
}

impl<T: Scalar, P: Potential<T> + ?Sized> Potential<T> for &P {
    fn energy_gradient(&self, position: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        (**self).energy_gradient(position)
    }

    fn energy(&self, position: &DVector<T>) -> PotentialResult<T> {
        (**self).energy(position)
    }
}

impl<T: Scalar, P: Potential<T> + ?Sized> Potential<T> for Box<P> {
    fn energy_gradient(&self, position: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        (**self).energy_gradient(position)
    }

    fn energy(&self, position: &DVector<T>) -> PotentialResult<T> {
        (**self).energy(position)
    }
}

/// Adapts a closure into a [`Potential`].
///
/// # Example
///
/// ```
/// use quenchopt_core::potential::{Potential, PotentialFn};
/// use quenchopt_core::types::DVector;
///
/// let pot = PotentialFn::new(|x: &DVector<f64>| Ok((x.norm_squared(), x * 2.0)));
/// let (e, g) = pot.energy_gradient(&DVector::from_vec(vec![1.0, 2.0])).unwrap();
/// assert_eq!(e, 5.0);
/// assert_eq!(g[1], 4.0);
/// ```
pub struct PotentialFn<F> {
    f: F,
}

impl<F> PotentialFn<F> {
    /// Wraps `f`.
    pub fn new<T>(f: F) -> Self
    where
        T: Scalar,
        F: Fn(&DVector<T>) -> PotentialResult<(T, DVector<T>)>,
    {
        Self { f }
    }
}

impl<F> Debug for PotentialFn<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PotentialFn").finish_non_exhaustive()
    }
}

impl<T, F> Potential<T> for PotentialFn<F>
where
    T: Scalar,
    F: Fn(&DVector<T>) -> PotentialResult<(T, DVector<T>)>,
{
    fn energy_gradient(&self, position: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        (self.f)(position)
    }
}

/// Wrapper counting the number of oracle evaluations.
#[derive(Debug)]
pub struct CountingPotential<P> {
    /// The underlying potential
    pub inner: P,
    calls: Cell<usize>,
}

impl<P> CountingPotential<P> {
    /// Creates a new counting wrapper around a potential.
    pub fn new(inner: P) -> Self {
        Self {
            inner,
            calls: Cell::new(0),
        }
    }

    /// Returns the number of evaluations so far.
    pub fn calls(&self) -> usize {
        self.calls.get()
    }

    /// Resets the counter to zero.
    pub fn reset_count(&self) {
        self.calls.set(0);
    }
}

impl<T: Scalar, P: Potential<T>> Potential<T> for CountingPotential<P> {
    fn energy_gradient(&self, position: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        self.calls.set(self.calls.get() + 1);
        self.inner.energy_gradient(position)
    }

    fn energy(&self, position: &DVector<T>) -> PotentialResult<T> {
        self.calls.set(self.calls.get() + 1);
        self.inner.energy(position)
    }
}

/// A configuration together with its energy and gradient.
///
/// Optimizers keep their current point in this form so that the energy and
/// gradient are always those of `position`.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct EvaluatedPoint<T: Scalar> {
    /// Coordinates
    pub position: DVector<T>,
    /// Energy at `position`
    pub energy: T,
    /// Gradient at `position`
    pub gradient: DVector<T>,
}

impl<T: Scalar> EvaluatedPoint<T> {
    /// Bundles a position with an already known energy and gradient.
    pub fn new(position: DVector<T>, energy: T, gradient: DVector<T>) -> Self {
        Self {
            position,
            energy,
            gradient,
        }
    }

    /// Evaluates `potential` at `position`, checking the gradient dimension.
    pub fn evaluate<P>(potential: &P, position: DVector<T>) -> PotentialResult<Self>
    where
        P: Potential<T> + ?Sized,
    {
        let (energy, gradient) = potential.energy_gradient(&position)?;
        if gradient.len() != position.len() {
            return Err(PotentialError::dimension_mismatch(
                position.len(),
                gradient.len(),
            ));
        }
        Ok(Self {
            position,
            energy,
            gradient,
        })
    }

    /// Fails with [`PotentialError::NonFinite`] if the energy or any
    /// gradient component is NaN or infinite.
    pub fn ensure_finite(&self) -> PotentialResult<()> {
        if !<T as Float>::is_finite(self.energy) {
            return Err(PotentialError::non_finite("energy"));
        }
        if !all_finite(&self.gradient) {
            return Err(PotentialError::non_finite("gradient"));
        }
        Ok(())
    }

    /// Number of coordinates.
    pub fn dimension(&self) -> usize {
        self.position.len()
    }
}

/// Utilities for checking gradient implementations.
pub struct GradientChecker;

impl GradientChecker {
    /// Checks an analytic gradient against central finite differences.
    ///
    /// The step for coordinate `i` is `cbrt(eps) * max(1, |x_i|)`.
    ///
    /// # Returns
    ///
    /// A tuple of (passes, max_error) where max_error is the largest
    /// component-wise absolute difference.
    pub fn check_gradient<T, P>(
        potential: &P,
        point: &DVector<T>,
        tol: T,
    ) -> PotentialResult<(bool, T)>
    where
        T: Scalar,
        P: Potential<T> + ?Sized,
    {
        let (_, analytic) = potential.energy_gradient(point)?;
        if analytic.len() != point.len() {
            return Err(PotentialError::dimension_mismatch(point.len(), analytic.len()));
        }

        let base_step = <T as Float>::cbrt(T::EPSILON);
        let two = <T as Scalar>::from_f64(2.0);
        let mut max_error = T::zero();
        let mut probe = point.clone();

        for i in 0..point.len() {
            let xi = point[i];
            let h = base_step * <T as Float>::max(T::one(), <T as Float>::abs(xi));

            probe[i] = xi + h;
            let e_plus = potential.energy(&probe)?;
            probe[i] = xi - h;
            let e_minus = potential.energy(&probe)?;
            probe[i] = xi;

            let fd = (e_plus - e_minus) / (two * h);
            max_error = <T as Float>::max(max_error, <T as Float>::abs(fd - analytic[i]));
        }

        Ok((max_error < tol, max_error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic() -> impl Potential<f64> {
        PotentialFn::new(|x: &DVector<f64>| Ok((x.norm_squared(), x * 2.0)))
    }

    #[test]
    fn test_counting_potential() {
        let counting = CountingPotential::new(quadratic());
        let x = DVector::from_vec(vec![1.0, 1.0]);

        counting.energy_gradient(&x).unwrap();
        counting.energy(&x).unwrap();
        assert_eq!(counting.calls(), 2);

        counting.reset_count();
        assert_eq!(counting.calls(), 0);
    }

    #[test]
    fn test_evaluated_point_checks_dimension() {
        let bad = PotentialFn::new(|_: &DVector<f64>| Ok((0.0, DVector::zeros(2))));
        let err = EvaluatedPoint::evaluate(&bad, DVector::zeros(3)).unwrap_err();
        assert!(matches!(
            err,
            PotentialError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));

        let good = EvaluatedPoint::evaluate(&quadratic(), DVector::from_vec(vec![1.0, 2.0]))
            .unwrap();
        assert_eq!(good.energy, 5.0);
        assert_eq!(good.dimension(), 2);
    }

    #[test]
    fn test_ensure_finite_names_the_quantity() {
        let x = DVector::from_vec(vec![1.0, 2.0]);
        assert!(EvaluatedPoint::new(x.clone(), 1.0, x.clone()).ensure_finite().is_ok());

        let err = EvaluatedPoint::new(x.clone(), f64::NAN, x.clone())
            .ensure_finite()
            .unwrap_err();
        assert!(matches!(&err, PotentialError::NonFinite { what } if what == "energy"));

        let gradient = DVector::from_vec(vec![0.0, f64::NEG_INFINITY]);
        let err = EvaluatedPoint::new(x, 1.0, gradient).ensure_finite().unwrap_err();
        assert_eq!(err.to_string(), "Potential returned a non-finite gradient");
    }

    #[test]
    fn test_gradient_checker() {
        let x = DVector::from_vec(vec![0.3, -1.2, 4.0]);
        let (ok, err) = GradientChecker::check_gradient(&quadratic(), &x, 1e-6).unwrap();
        assert!(ok, "max error {err}");

        let wrong = PotentialFn::new(|x: &DVector<f64>| Ok((x.norm_squared(), x.clone())));
        let (ok, err) = GradientChecker::check_gradient(&wrong, &x, 1e-6).unwrap();
        assert!(!ok);
        assert!(err > 1.0);
    }

    #[test]
    fn test_reference_forwarding() {
        let pot = quadratic();
        let by_ref = &pot;
        let boxed: Box<dyn Potential<f64>> = Box::new(quadratic());
        let x = DVector::from_vec(vec![2.0]);
        assert_eq!(by_ref.energy(&x).unwrap(), 4.0);
        assert_eq!(boxed.energy(&x).unwrap(), 4.0);
    }
}
