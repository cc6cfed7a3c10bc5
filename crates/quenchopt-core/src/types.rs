//! Type definitions and aliases for energy minimization.
//!
//! This module provides the scalar trait the optimizers are generic over,
//! the vector alias used for configurations and gradients, and the small
//! numeric helpers shared by every crate in the workspace.

use nalgebra::{Dyn, OVector, RealField, Scalar as NalgebraScalar};
use num_traits::{Float, FromPrimitive};
use std::fmt::{Debug, Display};

/// Trait for scalar types used in optimization (f32 or f64).
///
/// This trait combines all the numeric traits required by the L-BFGS
/// engine: nalgebra's field operations for vector arithmetic and
/// `num_traits::Float` for the elementary functions.
pub trait Scalar:
    NalgebraScalar
    + RealField
    + Float
    + FromPrimitive
    + Display
    + Debug
    + Default
    + Copy
    + Send
    + Sync
    + 'static
{
    /// Machine epsilon for this scalar type.
    const EPSILON: Self;

    /// Default tolerance on the rms gradient.
    const DEFAULT_TOLERANCE: Self;

    /// Smallest initial inverse-Hessian scale accepted without a reset.
    const MIN_H0: Self;

    /// Substitute for an exactly zero energy in relative energy mode.
    const ZERO_ENERGY_GUARD: Self;

    /// Convert from f64 (for constants).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_f64(v: f64) -> Self {
        <Self as FromPrimitive>::from_f64(v).expect("Failed to convert from f64")
    }

    /// Convert from usize (for dimension-dependent quantities).
    ///
    /// # Panics
    ///
    /// Panics if the conversion fails.
    fn from_usize(v: usize) -> Self {
        <Self as FromPrimitive>::from_usize(v).expect("Failed to convert from usize")
    }
}

impl Scalar for f32 {
    const EPSILON: Self = f32::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-4;
    const MIN_H0: Self = 1e-10;
    // 1e-100 underflows in single precision.
    const ZERO_ENERGY_GUARD: Self = 1e-30;
}

impl Scalar for f64 {
    const EPSILON: Self = f64::EPSILON;
    const DEFAULT_TOLERANCE: Self = 1e-6;
    const MIN_H0: Self = 1e-10;
    const ZERO_ENERGY_GUARD: Self = 1e-100;
}

/// Type alias for a dynamically-sized vector.
///
/// Configurations, gradients and curvature pairs are all stored as `DVector`s
/// of the same dimension N.
pub type DVector<T> = OVector<T, Dyn>;

/// Root-mean-square of the components of `gradient`: `||g|| / sqrt(N)`.
///
/// Returns zero for an empty vector.
pub fn rms<T: Scalar>(gradient: &DVector<T>) -> T {
    if gradient.is_empty() {
        return T::zero();
    }
    gradient.norm() / <T as Float>::sqrt(<T as Scalar>::from_usize(gradient.len()))
}

/// Returns `true` if every component of `v` is finite.
pub fn all_finite<T: Scalar>(v: &DVector<T>) -> bool {
    v.iter().all(|x| <T as Float>::is_finite(*x))
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    #[test]
    fn test_scalar_conversions() {
        assert_eq!(<f64 as Scalar>::from_f64(0.5), 0.5);
        assert_eq!(<f32 as Scalar>::from_f64(0.5), 0.5_f32);
        assert_eq!(<f64 as Scalar>::from_usize(7), 7.0);
    }

    #[test]
    fn test_rms() {
        let g = DVector::from_vec(vec![3.0, 4.0, 0.0, 0.0]);
        assert_relative_eq!(rms(&g), 5.0 / 2.0, epsilon = 1e-15);

        let empty = DVector::<f64>::zeros(0);
        assert_eq!(rms(&empty), 0.0);
    }

    #[test]
    fn test_all_finite() {
        assert!(all_finite(&DVector::from_vec(vec![1.0, -2.0])));
        assert!(!all_finite(&DVector::from_vec(vec![1.0, f64::NAN])));
        assert!(!all_finite(&DVector::from_vec(vec![f64::INFINITY])));
    }

    proptest! {
        #[test]
        fn prop_rms_bounded_by_max_component(
            values in prop::collection::vec(-1e3f64..1e3, 1..20),
        ) {
            let g = DVector::from_vec(values);
            let max = g.amax();
            let value = rms(&g);
            prop_assert!(value >= 0.0);
            prop_assert!(value <= max * (1.0 + 1e-12));
        }
    }
}
