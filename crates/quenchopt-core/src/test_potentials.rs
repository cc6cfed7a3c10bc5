//! Reference potentials for tests and benchmarks.
//!
//! Enabled with the `test-utils` feature.

use crate::{
    error::{PotentialError, PotentialResult},
    potential::Potential,
    types::{DVector, Scalar},
};

/// `f(x) = sum(x_i^2)`, gradient `2x`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SumOfSquares;

impl<T: Scalar> Potential<T> for SumOfSquares {
    fn energy_gradient(&self, x: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        let two = <T as Scalar>::from_f64(2.0);
        Ok((x.dot(x), x * two))
    }
}

/// `f(x) = sum(w_i * x_i^2)`, an ill-conditioned separable quadratic.
#[derive(Debug, Clone)]
pub struct WeightedQuadratic<T: Scalar> {
    /// Per-coordinate curvature
    pub weights: DVector<T>,
}

impl<T: Scalar> WeightedQuadratic<T> {
    /// Creates the quadratic with the given weights.
    pub fn new(weights: DVector<T>) -> Self {
        Self { weights }
    }
}

impl<T: Scalar> Potential<T> for WeightedQuadratic<T> {
    fn energy_gradient(&self, x: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        if x.len() != self.weights.len() {
            return Err(PotentialError::dimension_mismatch(self.weights.len(), x.len()));
        }
        let two = <T as Scalar>::from_f64(2.0);
        let wx = self.weights.component_mul(x);
        Ok((wx.dot(x), wx * two))
    }
}

/// The chained Rosenbrock function
/// `f(x) = sum_i 100 (x_{i+1} - x_i^2)^2 + (1 - x_i)^2`, minimum at all ones.
#[derive(Debug, Clone, Copy, Default)]
pub struct Rosenbrock;

impl<T: Scalar> Potential<T> for Rosenbrock {
    fn energy_gradient(&self, x: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        let n = x.len();
        let hundred = <T as Scalar>::from_f64(100.0);
        let two = <T as Scalar>::from_f64(2.0);
        let four = <T as Scalar>::from_f64(4.0);

        let mut energy = T::zero();
        let mut gradient = DVector::zeros(n);
        for i in 0..n.saturating_sub(1) {
            let a = x[i + 1] - x[i] * x[i];
            let b = T::one() - x[i];
            energy += hundred * a * a + b * b;
            gradient[i] -= four * hundred * x[i] * a + two * b;
            gradient[i + 1] += two * hundred * a;
        }
        Ok((energy, gradient))
    }
}

/// Every configuration other than `origin` has a huge energy.
///
/// The gradient is a constant vector of ones, so the optimizer never
/// believes it has converged and every proposed step is rejected.
#[derive(Debug, Clone)]
pub struct AlwaysUphill<T: Scalar> {
    /// The only configuration with a low energy
    pub origin: DVector<T>,
}

impl<T: Scalar> AlwaysUphill<T> {
    /// Creates the potential around `origin`.
    pub fn new(origin: DVector<T>) -> Self {
        Self { origin }
    }
}

impl<T: Scalar> Potential<T> for AlwaysUphill<T> {
    fn energy_gradient(&self, x: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        let energy = if *x == self.origin {
            T::zero()
        } else {
            <T as Scalar>::from_f64(1e6)
        };
        Ok((energy, DVector::from_element(x.len(), T::one())))
    }
}

/// Fails to evaluate anywhere except at `origin`.
#[derive(Debug, Clone)]
pub struct FailingPotential<T: Scalar> {
    /// The only configuration that can be evaluated
    pub origin: DVector<T>,
}

impl<T: Scalar> FailingPotential<T> {
    /// Creates the potential around `origin`.
    pub fn new(origin: DVector<T>) -> Self {
        Self { origin }
    }
}

impl<T: Scalar> Potential<T> for FailingPotential<T> {
    fn energy_gradient(&self, x: &DVector<T>) -> PotentialResult<(T, DVector<T>)> {
        if *x == self.origin {
            Ok((T::zero(), DVector::from_element(x.len(), T::one())))
        } else {
            Err(PotentialError::evaluation("configuration outside the valid domain"))
        }
    }
}
