//! Live state of an L-BFGS run.

use quenchopt_core::{
    potential::EvaluatedPoint,
    types::{rms, DVector, Scalar},
};

/// Current point and counters of a single run.
///
/// The energy, gradient and rms gradient always belong to the same
/// position: the point can only be replaced as a whole through
/// [`OptimizerState::set_point`], which recomputes the rms.
#[derive(Debug, Clone)]
pub struct OptimizerState<T: Scalar> {
    point: EvaluatedPoint<T>,
    rms: T,

    /// Completed iterations
    pub iteration: usize,

    /// Potential evaluations, including the initial one
    pub function_calls: usize,

    /// Consecutive step-size control failures
    pub failures: usize,
}

impl<T: Scalar> OptimizerState<T> {
    /// Creates the state of a run starting at `point`.
    pub fn new(point: EvaluatedPoint<T>, function_calls: usize) -> Self {
        let rms = rms(&point.gradient);
        Self {
            point,
            rms,
            iteration: 0,
            function_calls,
            failures: 0,
        }
    }

    /// The current point.
    pub fn point(&self) -> &EvaluatedPoint<T> {
        &self.point
    }

    /// Current configuration.
    pub fn position(&self) -> &DVector<T> {
        &self.point.position
    }

    /// Energy at the current configuration.
    pub fn energy(&self) -> T {
        self.point.energy
    }

    /// Gradient at the current configuration.
    pub fn gradient(&self) -> &DVector<T> {
        &self.point.gradient
    }

    /// Rms gradient at the current configuration.
    pub fn rms(&self) -> T {
        self.rms
    }

    /// Number of coordinates.
    pub fn dimension(&self) -> usize {
        self.point.dimension()
    }

    /// Moves to `point`.
    pub fn set_point(&mut self, point: EvaluatedPoint<T>) {
        debug_assert_eq!(point.dimension(), self.dimension());
        self.rms = rms(&point.gradient);
        self.point = point;
    }
}
